//! Shared types for talking to an A2A chat backend.
//!
//! This crate defines the conversation data model (messages, roles,
//! statuses), the request payload sent to the backend, and the transport
//! traits that a dispatcher implementation must satisfy. The streaming
//! logic itself lives elsewhere, so that every transport (HTTP, scripted
//! test doubles, ...) feeds the same decoder.
//!
//! Types in this crate don't define any behavior beyond small accessors.

#![deny(missing_docs)]

mod error;
mod message;
mod request;
mod transport;

pub use error::*;
pub use message::*;
pub use request::*;
pub use transport::*;
