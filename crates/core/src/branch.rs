//! Conversation branches.
//!
//! A [`Branch`] is an append-only conversation state. Branches never share
//! history: [`Branch::fork`] copies everything, so the two branches evolve
//! independently afterwards.

use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use polyagent_model::ModelMessage;

/// A callback that observes turns appended to a visible branch.
pub type Observer = Arc<dyn Fn(&str, Role) + Send + Sync>;

/// The author of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// System instructions.
    System,
    /// The user.
    User,
    /// The assistant, including tool traces rendered on its behalf.
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A role-tagged text segment of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Returns the role of this turn.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text of this turn.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn to_model_message(&self) -> ModelMessage {
        let content = self.content.clone();
        match self.role {
            Role::System => ModelMessage::System(content),
            Role::User => ModelMessage::User(content),
            Role::Assistant => ModelMessage::Assistant(content),
        }
    }
}

/// An independent, append-only conversation state.
///
/// Besides the turns, a branch carries a visibility flag and a set of named
/// results. Turns appended while the branch is visible are reported to the
/// observer, if any. Named results hold values captured from generation
/// steps, so that nested steps can pass data out to their caller.
#[derive(Clone)]
pub struct Branch {
    turns: Vec<Turn>,
    results: HashMap<String, String>,
    visible: bool,
    observer: Option<Observer>,
}

impl Default for Branch {
    fn default() -> Self {
        Self {
            turns: vec![],
            results: HashMap::new(),
            visible: true,
            observer: None,
        }
    }
}

impl Branch {
    /// Creates an empty branch that is not observed.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty branch that reports appended turns to
    /// `observer`.
    #[inline]
    pub fn with_observer(observer: Observer) -> Self {
        Self {
            observer: Some(observer),
            ..Default::default()
        }
    }

    /// Derives a new branch from this one.
    ///
    /// Turns and named results are copied, and the new branch starts with
    /// the visibility this branch has at the time of the call.
    #[inline]
    pub fn fork(&self) -> Branch {
        self.clone()
    }

    /// Appends a turn.
    pub fn append<S: Into<String>>(&mut self, role: Role, content: S) {
        let content = content.into();
        if self.visible {
            if let Some(observer) = &self.observer {
                observer(&content, role);
            }
        }
        self.turns.push(Turn { role, content });
    }

    /// Sets the visibility for as long as the returned guard lives.
    ///
    /// The previous visibility is restored when the guard is dropped, which
    /// also happens when a `?` leaves the scope early.
    #[inline]
    pub fn with_visibility(&mut self, visible: bool) -> VisibilityGuard<'_> {
        let previous = self.visible;
        self.visible = visible;
        VisibilityGuard {
            branch: self,
            previous,
        }
    }

    /// Sets the visibility until it is changed again.
    #[inline]
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Returns whether appended turns are currently observed.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Stores a named result, replacing the previous value.
    #[inline]
    pub fn set_result<K: Into<String>, V: Into<String>>(
        &mut self,
        name: K,
        value: V,
    ) {
        self.results.insert(name.into(), value.into());
    }

    /// Returns the last value stored under `name`.
    #[inline]
    pub fn result(&self, name: &str) -> Option<&str> {
        self.results.get(name).map(String::as_str)
    }

    /// Returns all turns in order.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the last turn.
    #[inline]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Returns the number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if the branch has no turns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn to_model_messages(&self) -> Vec<ModelMessage> {
        self.turns.iter().map(Turn::to_model_message).collect()
    }
}

impl Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("turns", &self.turns)
            .field("results", &self.results)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`Branch::with_visibility`].
pub struct VisibilityGuard<'a> {
    branch: &'a mut Branch,
    previous: bool,
}

impl Deref for VisibilityGuard<'_> {
    type Target = Branch;

    #[inline]
    fn deref(&self) -> &Branch {
        self.branch
    }
}

impl DerefMut for VisibilityGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Branch {
        self.branch
    }
}

impl Drop for VisibilityGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.branch.visible = self.previous;
    }
}

#[cfg(test)]
mod proptests;
