use std::fmt::{self, Display};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::tool::{Error, ToolExecutionError, ToolObject, ToolOutput};

/// The rendered record of one tool call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trace {
    /// Everything the tool wrote to its output sink.
    pub stdout: String,
    /// The return value of the tool.
    pub value: Value,
}

impl Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stdout: {}\nreturn: ", self.stdout)?;
        match &self.value {
            Value::String(text) => f.write_str(text)?,
            value => write!(f, "{value}")?,
        }
        f.write_str("\n\n")
    }
}

/// Calls tools and captures what they produce.
#[derive(Clone, Copy, Debug, Default)]
pub struct Invoker;

impl Invoker {
    /// Calls `tool` with `parameters` as its named arguments.
    ///
    /// The call runs in its own task, so a panicking tool fails like any
    /// other tool. Must be called within a tokio runtime.
    ///
    /// Failures are never swallowed: an argument set the tool cannot accept
    /// and an error returned by the tool both surface as
    /// [`ToolExecutionError`].
    pub async fn invoke(
        &self,
        tool: Arc<dyn ToolObject>,
        parameters: Map<String, Value>,
    ) -> Result<Trace, ToolExecutionError> {
        let name = tool.name().to_owned();
        let output = ToolOutput::default();
        trace!("invoking `{name}` with args: {parameters:?}");

        let task =
            tokio::spawn(tool.execute(Value::Object(parameters), output.clone()));
        let result = match task.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                Err(Error::execution_error().with_reason("the tool panicked"))
            }
            Err(err) => Err(Error::execution_error().with_reason(err.to_string())),
        };
        match result {
            Ok(value) => Ok(Trace {
                stdout: output.contents(),
                value,
            }),
            Err(source) => {
                warn!("tool `{name}` failed: {source}");
                Err(ToolExecutionError { tool: name, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::tool::{Error, ErrorKind, FunctionTool, Registry, ToolResult};

    #[derive(Deserialize, JsonSchema)]
    struct DivideParameters {
        a: f64,
        b: f64,
    }

    fn registry() -> Registry {
        let mut registry = Registry::default();
        registry.register(FunctionTool::new(
            "divide",
            "Divides `a` by `b`.",
            |input: DivideParameters, output: ToolOutput| async move {
                output.println(format!("dividing {} by {}", input.a, input.b));
                if input.b == 0.0 {
                    return Err(Error::execution_error()
                        .with_reason("division by zero"));
                }
                Ok(json!(input.a / input.b))
            },
        ));
        registry.register(FunctionTool::new(
            "greet",
            "Greets someone.",
            |input: Map<String, Value>, _output| async move {
                let name = input.get("name").and_then(Value::as_str);
                ToolResult::Ok(json!(format!(
                    "Hello, {}!",
                    name.unwrap_or("stranger")
                )))
            },
        ));
        registry
    }

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_trace() {
        let registry = registry();

        let tool = registry.resolve("divide").unwrap();
        let trace = Invoker
            .invoke(tool, params(json!({ "a": 9, "b": 2 })))
            .await
            .unwrap();
        assert_eq!(trace.stdout, "dividing 9 by 2\n");
        assert_eq!(trace.to_string(), "stdout: dividing 9 by 2\n\nreturn: 4.5\n\n");

        let tool = registry.resolve("greet").unwrap();
        let trace = Invoker
            .invoke(tool, params(json!({ "name": "Ada" })))
            .await
            .unwrap();
        assert_eq!(trace.to_string(), "stdout: \nreturn: Hello, Ada!\n\n");
    }

    #[tokio::test]
    async fn test_failures_propagate() {
        let registry = registry();

        let tool = registry.resolve("divide").unwrap();
        let err = Invoker
            .invoke(tool, params(json!({ "a": 1, "b": 0 })))
            .await
            .unwrap_err();
        assert_eq!(err.tool, "divide");
        assert_eq!(err.source.kind(), ErrorKind::ExecutionError);

        let tool = registry.resolve("divide").unwrap();
        let err = Invoker
            .invoke(tool, params(json!({ "a": 1 })))
            .await
            .unwrap_err();
        assert_eq!(err.source.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut registry = Registry::default();
        registry.register(FunctionTool::new(
            "crash",
            "Panics halfway.",
            |_: Map<String, Value>, output: ToolOutput| async move {
                output.println("before the crash");
                if true {
                    panic!("crashed");
                }
                ToolResult::Ok(Value::Null)
            },
        ));

        let tool = registry.resolve("crash").unwrap();
        let err = Invoker.invoke(tool, Map::new()).await.unwrap_err();
        assert_eq!(err.tool, "crash");
        assert_eq!(err.source.kind(), ErrorKind::ExecutionError);
        assert_eq!(err.source.reason(), "the tool panicked");
    }
}
