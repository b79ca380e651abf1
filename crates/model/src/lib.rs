//! An abstraction layer over text generation engines.
//!
//! The agent only ever asks an engine for one thing: given a conversation
//! prefix, produce the next assistant continuation. This crate fixes the
//! shape of that request and of the streamed response, so that the agent
//! can drive any backend (a hosted chat completion API, a local model, a
//! scripted fake for tests) without touching the orchestration code.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
