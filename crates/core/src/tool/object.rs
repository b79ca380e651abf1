use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use super::{Error, Tool, ToolOutput, ToolResult};

/// A type-erased [`Tool`].
pub trait ToolObject: Send + Sync + 'static {
    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Returns the text block that presents this tool to the model.
    fn info(&self) -> String {
        format!(
            "------------\nGPA_TOOL\nName       :    {}\nDescription:    {}\nParameters :    {}\n\n",
            self.name(),
            self.description().trim(),
            self.parameter_schema(),
        )
    }

    /// Executes the tool with JSON arguments.
    fn execute(
        self: Arc<Self>,
        arguments: Value,
        output: ToolOutput,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    #[inline]
    fn execute(
        self: Arc<Self>,
        arguments: Value,
        output: ToolOutput,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        let input: T::Input = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => {
                let reason = format!("{err}");
                return Box::pin(std::future::ready(ToolResult::Err(
                    Error::invalid_input().with_reason(reason),
                )));
            }
        };
        let span = debug_span!("tool execute", tool = self.0.name());
        Box::pin(self.0.execute(input, output).instrument(span))
    }
}
