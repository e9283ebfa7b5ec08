//! An out-of-the-box chat client for A2A backends that stream their
//! replies.
//!
//! The crate includes a CLI tool for using in the terminal. And you can
//! also use it as a library to bring a streaming chat into your own host
//! apps.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod client;

pub use client::{ChatClient, ChatClientBuilder};

/// Re-exports of [`a2a_chat_core`] crate.
pub mod core {
    pub use a2a_chat_core::*;
}

/// Re-exports of [`a2a_chat_http`] crate.
pub mod http {
    pub use a2a_chat_http::*;
}

/// Re-exports of [`a2a_chat_model`] crate.
pub mod model {
    pub use a2a_chat_model::*;
}
