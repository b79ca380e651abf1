use std::marker::PhantomData;

use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::tool::{Tool, ToolOutput, ToolResult};

/// A [`Tool`] backed by a closure.
///
/// The parameter schema is derived from the input type, so the input type
/// documents the named parameters the tool accepts:
///
/// ```
/// use polyagent_core::tool::{FunctionTool, ToolResult};
/// use schemars::JsonSchema;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct AddParameters {
///     a: i64,
///     b: i64,
/// }
///
/// let add = FunctionTool::new(
///     "add",
///     "Adds two integers.",
///     |input: AddParameters, _output| async move {
///         ToolResult::Ok(json!(input.a + input.b))
///     },
/// );
/// # let _ = add;
/// ```
pub struct FunctionTool<I, F> {
    name: String,
    description: String,
    parameter_schema: Value,
    f: F,
    _input: PhantomData<fn(I)>,
}

impl<I, F, Fut> FunctionTool<I, F>
where
    I: DeserializeOwned + JsonSchema + 'static,
    F: Fn(I, ToolOutput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    /// Creates a tool from a closure.
    pub fn new<N: Into<String>, D: Into<String>>(
        name: N,
        description: D,
        f: F,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema: schema_for!(I).to_value(),
            f,
            _input: PhantomData,
        }
    }
}

impl<I, F, Fut> Tool for FunctionTool<I, F>
where
    I: DeserializeOwned + JsonSchema + 'static,
    F: Fn(I, ToolOutput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    type Input = I;

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[inline]
    fn execute(
        &self,
        input: I,
        output: ToolOutput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        (self.f)(input, output)
    }
}
