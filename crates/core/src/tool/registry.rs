use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AgentError;
use crate::tool::object::{ToolObject, ToolObjectImpl};
use crate::tool::Tool;

const NO_TOOLS_INFO: &str = "No tools are available.";

/// The toolset of an agent, keyed by tool name.
///
/// Registering a tool under a name that is already taken replaces the
/// previous tool, which keeps its position in the listing.
#[derive(Clone, Default)]
pub struct Registry {
    tools: HashMap<String, Arc<dyn ToolObject>>,
    order: Vec<String>,
}

impl Registry {
    /// Registers a tool.
    pub fn register<T: Tool>(&mut self, tool: T) {
        self.register_object(Arc::new(ToolObjectImpl(tool)));
    }

    /// Registers a type-erased tool.
    pub fn register_object(&mut self, tool: Arc<dyn ToolObject>) {
        let name = tool.name().to_owned();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!("tool `{name}` has been replaced");
        } else {
            self.order.push(name);
        }
    }

    /// Looks up a tool by name.
    #[inline]
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ToolObject>, AgentError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::UnknownTool(name.to_owned()))
    }

    /// Returns whether a tool named `name` is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Returns the names of all tools in registration order.
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no tools are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Describes the whole toolset for the tool agent.
    pub fn toolset_info(&self) -> String {
        if self.is_empty() {
            return NO_TOOLS_INFO.to_owned();
        }
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.info())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
