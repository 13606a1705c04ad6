//! Request middleware.
//!
//! A [`MiddlewareChain`] wraps the core request processing (the
//! [`Endpoint`]) in an ordered list of [`Middleware`]s. The first middleware
//! registered is the outermost: it sees the request first and the response
//! last. Each middleware receives a [`Next`] and must call
//! [`Next::run`] to continue; returning without doing so short-circuits every
//! inner middleware and the endpoint.

pub mod logging;
pub mod rate_limit;
pub mod session_tracking;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::MiddlewareConfig,
    error::Result,
    provider::ParsedRequest,
    response::Response,
    session::Session,
    storage::CounterStore,
};

pub use logging::LoggingMiddleware;
pub use rate_limit::RateLimitMiddleware;
pub use session_tracking::SessionTrackingMiddleware;

/// Mutable state shared by every middleware and the endpoint for one request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request: ParsedRequest,
    pub session: Option<Session>,
    pub response: Option<Response>,
    /// Free-form values middlewares pass to each other
    pub attributes: HashMap<String, Value>,
}

impl RequestContext {
    pub fn new(request: ParsedRequest) -> Self {
        Self {
            request,
            session: None,
            response: None,
            attributes: HashMap::new(),
        }
    }
}

/// Core request processing at the centre of the chain
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext) -> Result<()>;
}

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<()>;
}

/// The rest of the chain, as seen from one middleware
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub async fn run(self, ctx: &mut RequestContext) -> Result<()> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                let next = Next {
                    middlewares: rest,
                    endpoint: self.endpoint,
                };
                current.handle(ctx, next).await
            }
            None => self.endpoint.call(ctx).await,
        }
    }
}

/// Ordered middleware registrations
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the chain described by the configuration, in order
    pub fn from_config(entries: &[MiddlewareConfig], counters: Arc<dyn CounterStore>) -> Self {
        entries
            .iter()
            .fold(Self::new(), |chain, entry| match entry {
                MiddlewareConfig::Logging => chain.with(LoggingMiddleware::new()),
                MiddlewareConfig::RateLimit {
                    max_requests,
                    window_secs,
                } => chain.with(RateLimitMiddleware::new(
                    counters.clone(),
                    *max_requests,
                    Duration::from_secs(*window_secs),
                )),
                MiddlewareConfig::SessionTracking => chain.with(SessionTrackingMiddleware::new()),
            })
    }

    /// Append a middleware inside the ones already registered
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.push(Arc::new(middleware));
        self
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    pub fn clear(&mut self) {
        self.middlewares.clear();
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Run `ctx` through every middleware and finally `endpoint`
    pub async fn run(&self, ctx: &mut RequestContext, endpoint: &dyn Endpoint) -> Result<()> {
        Next {
            middlewares: &self.middlewares,
            endpoint,
        }
        .run(ctx)
        .await
    }
}
