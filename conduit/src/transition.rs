use std::sync::Arc;

use crate::{error::Result, response::Response, session::Session};

/// Side effect attached to a transition. Returning a response ends handling
/// for this request and skips navigation.
pub type TransitionAction =
    Arc<dyn Fn(&str, &mut Session) -> Result<Option<Response>> + Send + Sync>;

/// Where a transition moves the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    State(String),
    Back,
}

/// Rule executed when a state receives matching input
#[derive(Clone, Default)]
pub struct Transition {
    target: Option<Target>,
    action: Option<TransitionAction>,
}

impl Transition {
    /// Navigate to `state`
    pub fn to(state: impl Into<String>) -> Self {
        Self {
            target: Some(Target::State(state.into())),
            action: None,
        }
    }

    /// Navigate to the previously visited state
    pub fn back() -> Self {
        Self {
            target: Some(Target::Back),
            action: None,
        }
    }

    /// Run `action` without navigating afterwards
    pub fn action<F>(action: F) -> Self
    where
        F: Fn(&str, &mut Session) -> Result<Option<Response>> + Send + Sync + 'static,
    {
        Self {
            target: None,
            action: Some(Arc::new(action)),
        }
    }

    /// Run `action` first, then navigate unless it produced a response
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&str, &mut Session) -> Result<Option<Response>> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn execute(&self, input: &str, session: &mut Session) -> Result<Option<Response>> {
        if let Some(action) = &self.action {
            if let Some(response) = action(input, session)? {
                return Ok(Some(response));
            }
        }

        match &self.target {
            Some(Target::State(state)) => session.navigate_to(state.as_str()),
            Some(Target::Back) => session.go_back(),
            None => {}
        }

        Ok(None)
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("target", &self.target)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}
