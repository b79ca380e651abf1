//! Tool call supports.

mod error;
mod function;
mod invoker;
mod object;
mod output;
mod registry;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind, ToolExecutionError};
pub use function::FunctionTool;
pub use invoker::{Invoker, Trace};
pub use object::ToolObject;
pub use output::ToolOutput;
pub use registry::Registry;

/// The result of a tool call.
///
/// The value is rendered into the conversation as the tool's return value.
/// Strings are rendered as they are, other values as compact JSON.
pub type ToolResult = Result<Value, Error>;

/// A tool that can be called by the agent.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The agent calls a tool with a set of named parameters extracted from
/// generated text. The parameters are deserialized into [`Tool::Input`], so
/// a struct with named fields is the natural input type.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// Anything written to `output` during the call is captured and shown to
    /// the model next to the return value.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn execute(
        &self,
        input: Self::Input,
        output: ToolOutput,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
