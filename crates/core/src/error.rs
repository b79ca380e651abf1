use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};

use polyagent_model::{ErrorKind, ModelProviderError};
use thiserror::Error;

use crate::tool::ToolExecutionError;

/// Errors that abort a turn.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A planned invocation names a tool that is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// A tool failed while executing.
    #[error(transparent)]
    ToolExecution(#[from] ToolExecutionError),
    /// The generation engine failed to produce a continuation.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// The generation engine failed to produce a continuation.
pub struct GenerationError {
    step: String,
    source: Box<dyn ModelProviderError>,
}

impl GenerationError {
    #[inline]
    pub(crate) fn new<S: Into<String>>(
        step: S,
        source: Box<dyn ModelProviderError>,
    ) -> Self {
        Self {
            step: step.into(),
            source,
        }
    }

    /// Returns the name of the generation step that failed.
    #[inline]
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Returns the kind of the underlying provider error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

impl Debug for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationError")
            .field("step", &self.step)
            .field("kind", &self.kind())
            .field("source", &self.source)
            .finish()
    }
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "generation of `{}` failed ({}): {}",
            self.step,
            self.kind(),
            self.source
        )
    }
}

impl StdError for GenerationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}
