//! A set of built-in tools that models can use.

mod glob;
mod shell;

pub use glob::{GlobTool, GlobToolParameters};
pub use shell::{ShellTool, ShellToolApproval, ShellToolParameters};
