//! Core logic of the agent: conversation branches, the tool protocol and
//! the turn loop that ties them together.
//!
//! Every turn goes through the same steps. The chat agent is asked, off
//! the record, whether a tool is needed. If so, the tool agent picks the
//! tools and their parameters, the tools run and their traces are added to
//! the chat. Finally the chat agent replies.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod assessor;
pub mod branch;
mod error;
pub mod extract;
mod model_client;
pub mod planner;
pub mod prompts;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentStage};
pub use branch::{Branch, Role};
pub use error::{AgentError, GenerationError};
pub use model_client::{ModelClient, ModelClientResponse};
