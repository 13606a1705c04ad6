use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::{Middleware, Next, RequestContext};
use crate::{error::Result, response::Response, storage::CounterStore};

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";

/// Caps requests per subscriber within a fixed window
pub struct RateLimitMiddleware {
    counters: Arc<dyn CounterStore>,
    max_requests: u64,
    window: Duration,
}

impl RateLimitMiddleware {
    pub fn new(counters: Arc<dyn CounterStore>, max_requests: u64, window: Duration) -> Self {
        Self {
            counters,
            max_requests,
            window,
        }
    }

    fn key(subscriber_id: &str) -> String {
        format!("throttle:{subscriber_id}")
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &str {
        "rate_limit"
    }

    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<()> {
        if ctx.request.subscriber_id.is_empty() {
            return next.run(ctx).await;
        }

        let count = self
            .counters
            .increment(&Self::key(&ctx.request.subscriber_id), self.window)
            .await?;

        if count > self.max_requests {
            warn!(
                subscriber_id = %ctx.request.subscriber_id,
                count,
                max_requests = self.max_requests,
                "Rate limit exceeded"
            );
            ctx.response = Some(Response::end(RATE_LIMITED_MESSAGE));
            return Ok(());
        }

        next.run(ctx).await
    }
}
