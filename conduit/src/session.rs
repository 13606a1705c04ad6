use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::Result;

/// Placeholder state name for a session no flow has touched yet
pub const INITIAL_STATE: &str = "initial";

/// Navigation depth used when no configuration is applied
pub const DEFAULT_MAX_NAVIGATION_DEPTH: usize = 10;

/// Data keys reserved by the request handler
pub mod session_keys {
    /// Name of the flow driving the conversation
    pub const CURRENT_FLOW: &str = "current_flow";
    /// Name of the flow to switch to on the next request
    pub const PENDING_FLOW_TRANSITION: &str = "pending_flow_transition";
}

fn now() -> DateTime<Utc> {
    // Persisted timestamps have second precision.
    Utc::now().trunc_subsecs(0)
}

fn default_max_navigation_depth() -> usize {
    DEFAULT_MAX_NAVIGATION_DEPTH
}

/// Conversation state carried between requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub subscriber_id: String,
    pub routing_key: String,
    #[serde(default = "initial_state")]
    pub current_state: String,
    #[serde(default)]
    pub navigation_stack: Vec<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default = "now", with = "chrono::serde::ts_seconds")]
    pub started_at: DateTime<Utc>,
    #[serde(default = "now", with = "chrono::serde::ts_seconds")]
    pub last_activity_at: DateTime<Utc>,
    #[serde(skip, default = "default_max_navigation_depth")]
    max_navigation_depth: usize,
}

fn initial_state() -> String {
    INITIAL_STATE.to_string()
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        subscriber_id: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        let started_at = now();
        Self {
            id: id.into(),
            subscriber_id: subscriber_id.into(),
            routing_key: routing_key.into(),
            current_state: initial_state(),
            navigation_stack: Vec::new(),
            data: Map::new(),
            started_at,
            last_activity_at: started_at,
            max_navigation_depth: DEFAULT_MAX_NAVIGATION_DEPTH,
        }
    }

    pub fn with_max_navigation_depth(mut self, depth: usize) -> Self {
        self.set_max_navigation_depth(depth);
        self
    }

    pub fn set_max_navigation_depth(&mut self, depth: usize) {
        self.max_navigation_depth = depth;
        self.truncate_history();
    }

    pub fn max_navigation_depth(&self) -> usize {
        self.max_navigation_depth
    }

    /// True until a flow has resolved the first state
    pub fn is_uninitialized(&self) -> bool {
        self.current_state.is_empty() || self.current_state == INITIAL_STATE
    }

    /// Move to `state`, remembering the current one for back navigation
    pub fn navigate_to(&mut self, state: impl Into<String>) {
        if !self.is_uninitialized() {
            let previous = std::mem::take(&mut self.current_state);
            self.navigation_stack.push(previous);
            self.truncate_history();
        }
        self.current_state = state.into();
        self.touch();
    }

    /// Return to the previously visited state. No-op without history.
    pub fn go_back(&mut self) {
        if let Some(previous) = self.navigation_stack.pop() {
            self.current_state = previous;
        }
        self.touch();
    }

    pub fn can_go_back(&self) -> bool {
        !self.navigation_stack.is_empty()
    }

    /// Forget the current flow position, e.g. before handing over to another flow
    pub fn reset_position(&mut self) {
        self.current_state = initial_state();
        self.navigation_stack.clear();
    }

    pub fn duration(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.is_expired_at(Utc::now(), ttl)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        (now - self.last_activity_at)
            .to_std()
            .map(|idle| idle > ttl)
            .unwrap_or(false)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key.into(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn truncate_history(&mut self) {
        let len = self.navigation_stack.len();
        if len > self.max_navigation_depth {
            self.navigation_stack.drain(..len - self.max_navigation_depth);
        }
    }

    fn touch(&mut self) {
        self.last_activity_at = now();
    }
}
