//! Environment reply parsing and field-name normalization
//!
//! The environment answers every action with a small mapping literal such as
//! `{'state': '0010110', 'reward': -1}`. Keys may be single-, double- or
//! un-quoted and may arrive in either naming (see [`FIELD_SYNONYMS`]).

use std::collections::BTreeMap;

use thiserror::Error;

use hopper_core::{HopperError, State, Transition};

/// Canonical wire field names
pub mod fields {
    pub const STATE: &str = "state";
    pub const REWARD: &str = "reward";
}

/// Localized key -> canonical key
pub const FIELD_SYNONYMS: &[(&str, &str)] = &[
    ("estado", fields::STATE),
    ("recompensa", fields::REWARD),
];

/// A scalar value inside a reply mapping
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Other(String),
}

/// Why a payload did not have the expected mapping shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ShapeError(pub String);

/// A reply carrying both canonical fields, values still undecoded
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub state: Value,
    pub reward: Value,
}

impl RawReply {
    /// Parse a payload and normalize its keys.
    ///
    /// A `ShapeError` means the payload should be discarded and another one received.
    pub fn parse(payload: &str) -> Result<Self, ShapeError> {
        let mut map = normalize(parse_mapping(payload)?);
        let state = map
            .remove(fields::STATE)
            .ok_or_else(|| ShapeError("missing state field".to_string()))?;
        let reward = map
            .remove(fields::REWARD)
            .ok_or_else(|| ShapeError("missing reward field".to_string()))?;
        Ok(Self { state, reward })
    }

    /// Decode field values into a transition.
    ///
    /// Unlike shape errors these are not retried: the peer sent a complete
    /// reply whose contents are unusable.
    pub fn decode(&self, num_states: usize) -> hopper_core::Result<Transition> {
        let next_state = match &self.state {
            Value::Str(bits) => State::from_bits(bits, num_states)?,
            other => {
                return Err(HopperError::InvalidPayload(format!(
                    "state must be a bit-string, got {other:?}"
                )))
            }
        };
        let reward = match &self.reward {
            Value::Num(n) => *n,
            Value::Str(s) => s.trim().parse::<f64>().map_err(|e| {
                HopperError::InvalidPayload(format!("reward {s:?}: {e}"))
            })?,
            Value::Other(s) => {
                return Err(HopperError::InvalidPayload(format!(
                    "reward must be numeric, got {s}"
                )))
            }
        };
        Ok(Transition::new(next_state, reward))
    }
}

/// Rename localized keys to their canonical form
pub fn normalize(map: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            let canonical = FIELD_SYNONYMS
                .iter()
                .find(|(alias, _)| *alias == key)
                .map_or(key, |(_, canonical)| (*canonical).to_string());
            (canonical, value)
        })
        .collect()
}

/// Parse a flat `{key: value, ...}` literal
pub fn parse_mapping(payload: &str) -> Result<BTreeMap<String, Value>, ShapeError> {
    let mut parser = Parser {
        chars: payload.trim().chars().collect(),
        pos: 0,
    };
    let map = parser.mapping()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(ShapeError("trailing data after mapping".to_string()));
    }
    Ok(map)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: char) -> Result<(), ShapeError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(ShapeError(format!("expected '{want}', found '{c}'"))),
            None => Err(ShapeError(format!("expected '{want}', found end of input"))),
        }
    }

    fn mapping(&mut self) -> Result<BTreeMap<String, Value>, ShapeError> {
        self.expect('{')?;
        let mut map = BTreeMap::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(map);
            }
            let key = self.key()?;
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(map),
                Some(c) => return Err(ShapeError(format!("unexpected '{c}' in mapping"))),
                None => return Err(ShapeError("unterminated mapping".to_string())),
            }
        }
    }

    fn key(&mut self) -> Result<String, ShapeError> {
        self.skip_ws();
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                self.quoted(q)
            }
            Some(c) if c.is_alphabetic() || c == '_' => Ok(self.bare_word()),
            Some(c) => Err(ShapeError(format!("unexpected '{c}' at key position"))),
            None => Err(ShapeError("unterminated mapping".to_string())),
        }
    }

    fn value(&mut self) -> Result<Value, ShapeError> {
        self.skip_ws();
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                self.quoted(q).map(Value::Str)
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                let token = self.bare_word();
                token
                    .parse::<f64>()
                    .map(Value::Num)
                    .map_err(|_| ShapeError(format!("bad number {token:?}")))
            }
            Some(c) if c.is_alphabetic() => Ok(Value::Other(self.bare_word())),
            Some(c) => Err(ShapeError(format!("unexpected '{c}' at value position"))),
            None => Err(ShapeError("missing value".to_string())),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, ShapeError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err(ShapeError("unterminated string".to_string())),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(ShapeError("unterminated string".to_string())),
            }
        }
    }

    fn bare_word(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && !matches!(c, ',' | ':' | '}'))
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}
