use std::env;
use std::io;
use std::process::Output;
use std::sync::Arc;

use polyagent_core::tool::{Error as ToolError, Tool, ToolOutput, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::oneshot;

type ApprovalFn = Arc<dyn Fn(ShellToolApproval) + Send + Sync>;

/// Parameters of [`ShellTool`].
#[derive(Deserialize, JsonSchema)]
pub struct ShellToolParameters {
    #[schemars(description = "The command line to run.")]
    cmdline: String,
}

/// A pending request to run a command line.
///
/// The command runs only after [`ShellToolApproval::approve`] is called.
/// Dropping the request rejects the command.
pub struct ShellToolApproval {
    cmdline: String,
    reply: oneshot::Sender<bool>,
}

impl ShellToolApproval {
    /// Returns the command line the agent wants to run.
    #[inline]
    pub fn cmdline(&self) -> &str {
        &self.cmdline
    }

    /// Lets the command run.
    #[inline]
    pub fn approve(self) {
        self.reply.send(true).ok();
    }

    /// Refuses to run the command.
    #[inline]
    pub fn reject(self) {
        self.reply.send(false).ok();
    }
}

/// A tool for running shell commands.
///
/// Every command line is handed to the approval callback first. The standard
/// output of the command is returned. The standard error and a non-zero exit
/// status go to the tool output.
pub struct ShellTool {
    parameter_schema: Value,
    on_request: ApprovalFn,
}

impl ShellTool {
    /// Creates a new shell tool that asks `on_request` before running
    /// anything.
    #[inline]
    pub fn new(
        on_request: impl Fn(ShellToolApproval) + Send + Sync + 'static,
    ) -> Self {
        ShellTool {
            parameter_schema: schema_for!(ShellToolParameters).to_value(),
            on_request: Arc::new(on_request),
        }
    }
}

impl Tool for ShellTool {
    type Input = ShellToolParameters;

    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Runs a command line in the host shell and returns what it prints. \
         Keep the command line on a single line."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ShellToolParameters,
        output: ToolOutput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let (reply, approved) = oneshot::channel();
        (self.on_request)(ShellToolApproval {
            cmdline: input.cmdline.clone(),
            reply,
        });
        async move {
            if !approved.await.unwrap_or(false) {
                info!("command rejected: `{}`", input.cmdline);
                return Err(ToolError::execution_error()
                    .with_reason("the user rejected the command"));
            }
            debug!("running `{}`", input.cmdline);
            let result = run_command_line(&input.cmdline).await.map_err(|err| {
                ToolError::execution_error().with_reason(format!("{err}"))
            })?;
            Ok(Value::String(report(result, &output)))
        }
    }
}

#[inline]
fn create_command_with_inferred_shell() -> Command {
    let Some(shell) = env::var_os("SHELL") else {
        return Command::new("/bin/sh");
    };
    Command::new(shell)
}

#[inline]
async fn run_command_line(cmdline: &str) -> Result<Output, io::Error> {
    create_command_with_inferred_shell()
        .arg("-c")
        .arg(cmdline)
        .kill_on_drop(true)
        .output()
        .await
}

fn report(result: Output, output: &ToolOutput) -> String {
    if !result.stderr.is_empty() {
        output.print(String::from_utf8_lossy(&result.stderr));
    }
    if !result.status.success() {
        output.println(result.status.to_string());
    }
    String::from_utf8_lossy(&result.stdout).into_owned()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn approving() -> ShellTool {
        ShellTool::new(ShellToolApproval::approve)
    }

    fn parameters(cmdline: &str) -> ShellToolParameters {
        ShellToolParameters {
            cmdline: cmdline.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_run_command_line() {
        let output = ToolOutput::default();
        let result = approving()
            .execute(parameters("echo 'Hello, World!'"), output.clone())
            .await;
        assert_eq!(result.unwrap(), json!("Hello, World!\n"));
        assert_eq!(output.contents(), "");
    }

    #[tokio::test]
    async fn test_stderr_and_status() {
        let output = ToolOutput::default();
        let result = approving()
            .execute(parameters("echo oops >&2; exit 3"), output.clone())
            .await;
        assert_eq!(result.unwrap(), json!(""));
        let contents = output.contents();
        assert!(contents.starts_with("oops\n"));
        assert!(contents.contains("exit status"));
    }

    #[tokio::test]
    async fn test_rejected_command_does_not_run() {
        let marker = env::temp_dir()
            .join(format!("polyagent-shell-{}", std::process::id()));
        let cmdline = format!("touch '{}'", marker.display());

        let seen = Arc::new(std::sync::Mutex::new(vec![]));
        let tool = ShellTool::new({
            let seen = Arc::clone(&seen);
            move |approval: ShellToolApproval| {
                seen.lock().unwrap().push(approval.cmdline().to_owned());
                approval.reject();
            }
        });
        let err = tool
            .execute(parameters(&cmdline), ToolOutput::default())
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "the user rejected the command");
        assert_eq!(*seen.lock().unwrap(), [cmdline.clone()]);
        assert!(!marker.exists());

        // Dropping the request counts as a rejection.
        let tool = ShellTool::new(drop);
        let result = tool
            .execute(parameters(&cmdline), ToolOutput::default())
            .await;
        assert!(result.is_err());
        assert!(!marker.exists());
    }
}
