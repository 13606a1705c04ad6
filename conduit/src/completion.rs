use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::{error::Result, session::Session};

/// Snapshot of a conversation that reached an `end` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSession {
    pub session_id: String,
    pub subscriber_id: String,
    pub routing_key: String,
    pub final_state: String,
    pub data: Map<String, Value>,
    pub duration_seconds: i64,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompletedSession {
    pub fn from_session(session: &Session, completed: bool) -> Self {
        Self {
            session_id: session.id.clone(),
            subscriber_id: session.subscriber_id.clone(),
            routing_key: session.routing_key.clone(),
            final_state: session.current_state.clone(),
            data: session.data.clone(),
            duration_seconds: session.duration().num_seconds(),
            completed,
            started_at: session.started_at,
            completed_at: completed.then(Utc::now),
        }
    }
}

/// Receives every conversation that ended normally
///
/// Errors returned here are logged by the request handler and never change
/// the reply.
#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn session_completed(&self, session: CompletedSession) -> Result<()>;
}

/// Writes completed sessions to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCompletionSink;

#[async_trait]
impl CompletionSink for LoggingCompletionSink {
    async fn session_completed(&self, session: CompletedSession) -> Result<()> {
        let data = Value::Object(session.data.clone());
        info!(
            session_id = %session.session_id,
            subscriber_id = %session.subscriber_id,
            final_state = %session.final_state,
            duration_seconds = session.duration_seconds,
            data = %data,
            "Session completed"
        );
        Ok(())
    }
}
