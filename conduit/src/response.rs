use serde::{Deserialize, Serialize};

/// What the transport should do after delivering a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Keep the conversation open and wait for the next input
    Continue,
    /// Close the conversation
    End,
}

/// Outcome of processing one input or rendering one screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    text: String,
    action: Action,
    next_flow: Option<String>,
}

impl Response {
    pub fn new(text: impl Into<String>, action: Action) -> Self {
        Self {
            text: text.into(),
            action,
            next_flow: None,
        }
    }

    pub fn continue_with(text: impl Into<String>) -> Self {
        Self::new(text, Action::Continue)
    }

    pub fn end(text: impl Into<String>) -> Self {
        Self::new(text, Action::End)
    }

    /// Reply with `text` now and hand the conversation over to the flow
    /// registered as `flow` on the next request.
    pub fn transition_to(text: impl Into<String>, flow: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: Action::Continue,
            next_flow: Some(flow.into()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn next_flow(&self) -> Option<&str> {
        self.next_flow.as_deref()
    }

    pub fn is_continue(&self) -> bool {
        self.action == Action::Continue
    }

    pub fn is_end(&self) -> bool {
        self.action == Action::End
    }

    pub fn is_transition(&self) -> bool {
        self.next_flow.is_some()
    }

    /// The same text as a plain `continue` reply, with any flow hand-off removed.
    pub fn into_continue(self) -> Self {
        Self::continue_with(self.text)
    }
}
