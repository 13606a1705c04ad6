use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{Middleware, Next, RequestContext};
use crate::error::Result;

/// Attribute listing the lifecycle events emitted for the request
pub const TRACKED_EVENTS: &str = "tracked_events";

pub const SESSION_STARTED: &str = "session_started";
pub const SESSION_ENDED: &str = "session_ended";

/// Emits `session_started` / `session_ended` lifecycle events
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionTrackingMiddleware;

impl SessionTrackingMiddleware {
    pub fn new() -> Self {
        Self
    }

    fn track(ctx: &mut RequestContext, event: &str) {
        let subscriber_id = ctx
            .session
            .as_ref()
            .map(|s| s.subscriber_id.as_str())
            .unwrap_or(ctx.request.subscriber_id.as_str());
        info!(
            event,
            session_id = %ctx.request.session_id,
            subscriber_id = %subscriber_id,
            "Track"
        );

        let events = ctx
            .attributes
            .entry(TRACKED_EVENTS.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(events) = events {
            events.push(Value::String(event.to_string()));
        }
    }
}

#[async_trait]
impl Middleware for SessionTrackingMiddleware {
    fn name(&self) -> &str {
        "session_tracking"
    }

    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<()> {
        let fresh = ctx
            .session
            .as_ref()
            .is_some_and(|session| session.navigation_stack.is_empty());
        if fresh {
            Self::track(ctx, SESSION_STARTED);
        }

        next.run(ctx).await?;

        if ctx.response.as_ref().is_some_and(|r| r.is_end()) {
            Self::track(ctx, SESSION_ENDED);
        }
        Ok(())
    }
}
