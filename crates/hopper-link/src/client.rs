//! TCP link to the environment process

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

use hopper_core::util::safe_truncate;
use hopper_core::{Action, Environment, HopperError, Result, Transition, NUM_STATES};

use crate::message::RawReply;

/// How many characters of a rejected payload end up in the log
const LOGGED_PAYLOAD_CHARS: usize = 120;

/// Link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub host: String,
    pub port: u16,
    /// Per-receive timeout; 0 waits forever
    pub receive_timeout_ms: u64,
    /// Receives allowed per step before giving up with a desync
    pub max_parse_attempts: u32,
    pub max_message_bytes: usize,
    pub num_states: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2037,
            receive_timeout_ms: 5000,
            max_parse_attempts: 32,
            max_message_bytes: 1024,
            num_states: NUM_STATES,
        }
    }
}

impl LinkConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn receive_timeout(&self) -> Option<Duration> {
        (self.receive_timeout_ms > 0).then(|| Duration::from_millis(self.receive_timeout_ms))
    }
}

/// Request/response link over any byte stream
pub struct EnvLink<S = TcpStream> {
    stream: S,
    config: LinkConfig,
    buf: Vec<u8>,
    /// An abandoned step may still have a reply in flight
    reply_owed: bool,
}

impl EnvLink<TcpStream> {
    /// Connect to the environment.
    ///
    /// Failure here is fatal to a run; there is no usable default link.
    pub async fn connect(config: LinkConfig) -> Result<Self> {
        let endpoint = config.endpoint();
        info!("Connecting to environment at {}", endpoint);

        let stream = TcpStream::connect(&endpoint)
            .await
            .map_err(|e| HopperError::Connect(format!("{endpoint}: {e}")))?;
        stream.set_nodelay(true).map_err(HopperError::Transport)?;

        info!("Connection established");
        Ok(Self::from_stream(stream, config))
    }
}

impl<S> EnvLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn from_stream(stream: S, config: LinkConfig) -> Self {
        let buf = vec![0; config.max_message_bytes.max(1)];
        Self {
            stream,
            config,
            buf,
            reply_owed: false,
        }
    }

    /// Whether the next step first waits for a reply to an abandoned one
    pub fn is_reply_owed(&self) -> bool {
        self.reply_owed
    }

    /// Send the action label as-is
    async fn send_action(&mut self, action: Action) -> Result<()> {
        trace!("-> {}", action);
        self.stream
            .write_all(action.label().as_bytes())
            .await
            .map_err(HopperError::Transport)?;
        self.stream.flush().await.map_err(HopperError::Transport)
    }

    /// One receive: up to `max_message_bytes` of text
    async fn receive_payload(&mut self) -> Result<String> {
        let read = self.stream.read(&mut self.buf);
        let n = match self.config.receive_timeout() {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| HopperError::Timeout(format!("no reply within {limit:?}")))?,
            None => read.await,
        }
        .map_err(HopperError::Transport)?;

        if n == 0 {
            return Err(HopperError::Closed);
        }

        std::str::from_utf8(&self.buf[..n])
            .map(|s| s.trim().to_string())
            .map_err(|e| HopperError::InvalidPayload(format!("reply is not UTF-8: {e}")))
    }

    /// Keep receiving until a reply with the expected shape arrives
    async fn receive_reply(&mut self) -> Result<RawReply> {
        let attempts = self.config.max_parse_attempts.max(1);
        for attempt in 1..=attempts {
            let payload = self.receive_payload().await?;
            match RawReply::parse(&payload) {
                Ok(reply) => {
                    trace!("<- {}", payload);
                    return Ok(reply);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        "Discarding malformed reply ({}): {}",
                        e,
                        safe_truncate(&payload, LOGGED_PAYLOAD_CHARS)
                    );
                }
            }
        }
        debug!("Giving up after {} malformed replies", attempts);
        Err(HopperError::ProtocolDesync { attempts })
    }

    /// Swallow the late reply to an abandoned step, waiting at most one receive timeout.
    ///
    /// Without this the late reply would be read as the answer to the next action.
    async fn discard_owed_reply(&mut self) -> Result<()> {
        self.reply_owed = false;
        match self.receive_payload().await {
            Ok(payload) => {
                debug!(
                    "Discarded late reply: {}",
                    safe_truncate(&payload, LOGGED_PAYLOAD_CHARS)
                );
                Ok(())
            }
            Err(HopperError::InvalidPayload(e)) => {
                debug!("Discarded late reply: {}", e);
                Ok(())
            }
            Err(HopperError::Timeout(_)) => {
                warn!("Late reply never arrived, resuming");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<S> Environment for EnvLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn step(&mut self, action: Action) -> Result<Transition> {
        if self.reply_owed {
            self.discard_owed_reply().await?;
        }

        self.send_action(action).await?;
        let reply = match self.receive_reply().await {
            Ok(reply) => reply,
            Err(e) => {
                // Only a bounded wait can tell whether the reply is still coming
                let abandoned =
                    matches!(e, HopperError::Timeout(_) | HopperError::ProtocolDesync { .. });
                self.reply_owed = abandoned && self.config.receive_timeout().is_some();
                return Err(e);
            }
        };
        reply.decode(self.config.num_states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn test_config() -> LinkConfig {
        LinkConfig {
            receive_timeout_ms: 200,
            max_parse_attempts: 3,
            ..LinkConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = LinkConfig::default();
        assert_eq!(config.endpoint(), "127.0.0.1:2037");
        assert_eq!(config.num_states, 96);
        assert_eq!(config.receive_timeout(), Some(Duration::from_secs(5)));

        let forever = LinkConfig {
            receive_timeout_ms: 0,
            ..LinkConfig::default()
        };
        assert!(forever.receive_timeout().is_none());
    }

    #[tokio::test]
    async fn test_step_over_duplex() {
        let (client, mut server) = duplex(1024);
        let mut link = EnvLink::from_stream(client, test_config());

        let peer = tokio::spawn(async move {
            let mut buf = [0u8; 16];
            let n = server.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"jump");
            server
                .write_all(b"{'estado': '0001001', 'recompensa': 5}")
                .await
                .unwrap();
            server
        });

        let t = link.step(Action::Jump).await.unwrap();
        assert_eq!(t.next_state.index(), 9);
        assert_eq!(t.reward, 5.0);
        drop(peer.await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_peer_is_transport_failure() {
        let (client, server) = duplex(64);
        drop(server);
        let mut link = EnvLink::from_stream(client, test_config());
        let err = link.step(Action::Left).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let (client, _server) = duplex(64);
        let mut link = EnvLink::from_stream(client, test_config());
        let err = link.step(Action::Left).await.unwrap_err();
        assert!(matches!(err, HopperError::Timeout(_)));
        assert!(link.is_reply_owed());
    }

    #[tokio::test]
    async fn test_late_reply_is_discarded_before_next_step() {
        let (client, mut server) = duplex(1024);
        let mut link = EnvLink::from_stream(client, test_config());

        let err = link.step(Action::Left).await.unwrap_err();
        assert!(matches!(err, HopperError::Timeout(_)));

        // Late answer to "left", then a prompt answer to "jump"
        let peer = tokio::spawn(async move {
            server
                .write_all(b"{'state': '0000001', 'reward': -1}")
                .await
                .unwrap();
            let mut buf = [0u8; 16];
            let mut sent = Vec::new();
            while !sent.ends_with(b"jump") {
                let n = server.read(&mut buf).await.unwrap();
                sent.extend_from_slice(&buf[..n]);
            }
            server
                .write_all(b"{'state': '0000010', 'reward': 300}")
                .await
                .unwrap();
            (server, sent)
        });

        let t = link.step(Action::Jump).await.unwrap();
        assert_eq!(t.next_state.index(), 2);
        assert_eq!(t.reward, 300.0);
        assert!(!link.is_reply_owed());

        let (_server, sent) = peer.await.unwrap();
        assert_eq!(sent, b"leftjump");
    }

    #[tokio::test]
    async fn test_missing_late_reply_only_delays_next_step() {
        let (client, mut server) = duplex(1024);
        let mut link = EnvLink::from_stream(client, test_config());

        let err = link.step(Action::Left).await.unwrap_err();
        assert!(matches!(err, HopperError::Timeout(_)));

        let peer = tokio::spawn(async move {
            let mut buf = [0u8; 16];
            let mut sent = Vec::new();
            while !sent.ends_with(b"right") {
                let n = server.read(&mut buf).await.unwrap();
                sent.extend_from_slice(&buf[..n]);
            }
            server
                .write_all(b"{'state': '0000100', 'reward': -1}")
                .await
                .unwrap();
            server
        });

        let t = link.step(Action::Right).await.unwrap();
        assert_eq!(t.next_state.index(), 4);
        drop(peer.await.unwrap());
    }
}
