use async_trait::async_trait;
use std::time::Instant;
use tracing::{Instrument, info};
use uuid::Uuid;

use super::{Middleware, Next, RequestContext};
use crate::error::Result;

/// Attribute holding the correlation id of the request
pub const CORRELATION_ID: &str = "correlation_id";

/// Logs each request and its outcome inside a correlation-id span
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<()> {
        let correlation_id = Uuid::new_v4().to_string();
        ctx.attributes
            .insert(CORRELATION_ID.to_string(), correlation_id.clone().into());

        let span = tracing::info_span!("ussd_request", correlation_id = %correlation_id);

        async move {
            let started = Instant::now();
            info!(
                session_id = %ctx.request.session_id,
                subscriber_id = %ctx.request.subscriber_id,
                input = ?ctx.request.input,
                "USSD request"
            );

            let result = next.run(ctx).await;

            let duration_ms = (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0;
            info!(
                session_id = %ctx.request.session_id,
                duration_ms,
                action = ?ctx.response.as_ref().map(|r| r.action()),
                ok = result.is_ok(),
                "USSD response"
            );
            result
        }
        .instrument(span)
        .await
    }
}
