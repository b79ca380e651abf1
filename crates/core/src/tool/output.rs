use std::fmt::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// A sink for the incidental output of a tool call.
///
/// Every call gets a fresh sink. Clones write into the same buffer, so the
/// sink can be moved into spawned tasks. Use it like standard output:
///
/// ```
/// use std::fmt::Write as _;
///
/// use polyagent_core::tool::ToolOutput;
///
/// let mut output = ToolOutput::default();
/// output.println("checking the cache");
/// write!(output, "{} hits", 3).unwrap();
/// assert_eq!(output.contents(), "checking the cache\n3 hits");
/// ```
#[derive(Clone, Debug, Default)]
pub struct ToolOutput {
    buf: Arc<Mutex<String>>,
}

impl ToolOutput {
    /// Writes `text` without a trailing newline.
    #[inline]
    pub fn print<S: AsRef<str>>(&self, text: S) {
        self.lock().push_str(text.as_ref());
    }

    /// Writes `text` followed by a newline.
    #[inline]
    pub fn println<S: AsRef<str>>(&self, text: S) {
        let mut buf = self.lock();
        buf.push_str(text.as_ref());
        buf.push('\n');
    }

    /// Returns everything written so far.
    #[inline]
    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.buf.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Write for ToolOutput {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.print(s);
        Ok(())
    }
}
