use std::path::Path;

use polyagent_core::tool::{Error as ToolError, Tool, ToolOutput, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use tokio::task::spawn_blocking;

const MAX_MATCHES: usize = 50;

/// Parameters of [`GlobTool`].
#[derive(Deserialize, JsonSchema)]
pub struct GlobToolParameters {
    #[schemars(description = "The glob pattern, must be relative to `path`.")]
    pattern: String,
    #[schemars(description = "Absolute path to search in.")]
    path: String,
}

/// A tool for finding files using glob patterns.
///
/// Returns the matched paths as a list. At most 50 paths are returned.
pub struct GlobTool {
    parameter_schema: Value,
}

impl GlobTool {
    /// Creates a new glob tool.
    #[inline]
    pub fn new() -> Self {
        GlobTool {
            parameter_schema: schema_for!(GlobToolParameters).to_value(),
        }
    }
}

impl Default for GlobTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for GlobTool {
    type Input = GlobToolParameters;

    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Finds files and directories using glob patterns. Supports the \
         standard syntax like *, ? and ** for recursive searches."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: GlobToolParameters,
        output: ToolOutput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move {
            if Path::new(&input.pattern).is_absolute() {
                return Err(ToolError::invalid_input()
                    .with_reason("`pattern` must be relative to `path`"));
            }
            if !Path::new(&input.path).is_absolute() {
                return Err(ToolError::invalid_input()
                    .with_reason("`path` must be absolute"));
            }

            let mut pattern = input.path;
            if !pattern.ends_with('/') {
                pattern.push('/');
            }
            pattern.push_str(&input.pattern);
            let paths = glob::glob(&pattern).map_err(|err| {
                ToolError::invalid_input().with_reason(err.to_string())
            })?;

            let (matches, truncated) = spawn_blocking(move || {
                let mut paths = paths.flatten();
                let matches: Vec<Value> = paths
                    .by_ref()
                    .take(MAX_MATCHES)
                    .map(|path| Value::String(path.to_string_lossy().into_owned()))
                    .collect();
                (matches, paths.next().is_some())
            })
            .await
            .map_err(|_| {
                ToolError::execution_error().with_reason("failed to execute glob")
            })?;

            if truncated {
                output.println(format!(
                    "only the first {MAX_MATCHES} matches are listed"
                ));
            }
            Ok(Value::Array(matches))
        }
    }
}
