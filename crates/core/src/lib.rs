//! # TaskForge Core
//!
//! Domain types, traits, and error definitions for the TaskForge refinement
//! agent. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The model transport is defined as a trait here; the HTTP implementation
//! lives in `taskforge-gateway`. This enables:
//! - Swapping backends via configuration
//! - Easy testing with scripted mock transports
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod task;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GatewayError, MemoryError, ReportError, Result};
pub use message::{ContentBlock, Message, MessageContent, Role};
pub use task::{MetadataValue, Task};
pub use transport::{ChatTransport, TransportReply};
