//! Hopper Link - Environment protocol implementation
//!
//! This crate talks to the environment process: it sends action labels and
//! parses the loosely structured state/reward replies that come back.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod message;

pub use client::{EnvLink, LinkConfig};
pub use message::{RawReply, FIELD_SYNONYMS};
