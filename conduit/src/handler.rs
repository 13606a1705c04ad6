//! RequestHandler: turns one gateway callback into one reply.
//!
//! Each call runs the whole round trip for a single request:
//!
//! 1. parse the raw callback with the [`Provider`];
//! 2. look up the session (or start a new one) and run the
//!    [`MiddlewareChain`], whose endpoint
//!    * answers expired sessions with the expiry message,
//!    * picks the flow (pending hand-off, then current flow, then router),
//!    * processes the input and defers any cross-flow hand-off to the next
//!      request,
//!    * deletes ended sessions (after the completion sink saw them) or writes
//!      the session back with the configured TTL;
//! 3. format the reply with the provider.
//!
//! Any error along the way is logged and answered with the configured
//! "unavailable" message. If the provider cannot format that reply either,
//! the bare message text is returned. Nothing is persisted for a request that
//! failed.
//!
//! ## Cross-flow hand-off
//! USSD has no server-initiated messages, so a response carrying a
//! `next_flow` is delivered as a plain `continue` reply and the target flow
//! is recorded under `pending_flow_transition`. The next request, whatever
//! its input, renders the target flow's initial state.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    completion::{CompletedSession, CompletionSink, LoggingCompletionSink},
    config::ConduitConfig,
    error::{ConduitError, Result},
    flow::Flow,
    middleware::{Endpoint, MiddlewareChain, RequestContext},
    provider::{AfricasTalkingProvider, ParsedRequest, Provider, RawRequest},
    response::Response,
    router::Router,
    session::{Session, session_keys},
    storage::{CounterStore, InMemoryCounterStore, SessionStore},
};

/// Entry point for gateway callbacks
#[derive(Clone)]
pub struct RequestHandler {
    provider: Arc<dyn Provider>,
    chain: MiddlewareChain,
    conversation: Conversation,
}

impl RequestHandler {
    pub fn builder(router: Router, store: Arc<dyn SessionStore>) -> RequestHandlerBuilder {
        RequestHandlerBuilder::new(router, store)
    }

    pub fn config(&self) -> &ConduitConfig {
        &self.conversation.config
    }

    /// Process one callback and return the reply in the gateway's format
    pub async fn process(&self, raw: &RawRequest) -> String {
        match self.try_process(raw).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    error = %e,
                    configuration_error = e.is_configuration_error(),
                    "Error processing request"
                );
                let response = Response::end(self.conversation.config.unavailable_message.clone());
                match self.provider.format(&response).await {
                    Ok(reply) => reply,
                    Err(format_error) => {
                        error!(error = %format_error, "Failed to format error reply");
                        response.text().to_string()
                    }
                }
            }
        }
    }

    async fn try_process(&self, raw: &RawRequest) -> Result<String> {
        let request = self.provider.parse(raw).await?;
        let session = self.conversation.load_or_create(&request).await?;

        let mut ctx = RequestContext::new(request);
        ctx.session = Some(session);
        self.chain.run(&mut ctx, &self.conversation).await?;

        let response = ctx
            .response
            .unwrap_or_else(|| Response::end(self.conversation.config.unavailable_message.clone()));
        self.provider.format(&response).await
    }
}

/// Builder for [`RequestHandler`]
pub struct RequestHandlerBuilder {
    router: Router,
    store: Arc<dyn SessionStore>,
    config: ConduitConfig,
    provider: Arc<dyn Provider>,
    completion_sink: Arc<dyn CompletionSink>,
    counters: Arc<dyn CounterStore>,
    chain: Option<MiddlewareChain>,
}

impl RequestHandlerBuilder {
    pub fn new(router: Router, store: Arc<dyn SessionStore>) -> Self {
        Self {
            router,
            store,
            config: ConduitConfig::default(),
            provider: Arc::new(AfricasTalkingProvider::new()),
            completion_sink: Arc::new(LoggingCompletionSink),
            counters: Arc::new(InMemoryCounterStore::new()),
            chain: None,
        }
    }

    pub fn config(mut self, config: ConduitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn completion_sink(mut self, sink: Arc<dyn CompletionSink>) -> Self {
        self.completion_sink = sink;
        self
    }

    /// Counter store for rate limiting entries in the configured middleware
    pub fn counter_store(mut self, counters: Arc<dyn CounterStore>) -> Self {
        self.counters = counters;
        self
    }

    /// Use this chain instead of the one described by the configuration
    pub fn middleware(mut self, chain: MiddlewareChain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn build(self) -> RequestHandler {
        let chain = self
            .chain
            .unwrap_or_else(|| MiddlewareChain::from_config(&self.config.middleware, self.counters));

        RequestHandler {
            provider: self.provider,
            chain,
            conversation: Conversation {
                router: Arc::new(self.router),
                store: self.store,
                completion_sink: self.completion_sink,
                config: self.config,
            },
        }
    }
}

/// The endpoint of the middleware chain
#[derive(Clone)]
struct Conversation {
    router: Arc<Router>,
    store: Arc<dyn SessionStore>,
    completion_sink: Arc<dyn CompletionSink>,
    config: ConduitConfig,
}

impl Conversation {
    async fn load_or_create(&self, request: &ParsedRequest) -> Result<Session> {
        let session = match self.store.get(&request.session_id).await? {
            Some(session) => session,
            None => {
                info!(
                    session_id = %request.session_id,
                    subscriber_id = %request.subscriber_id,
                    service_code = %request.routing_key,
                    "Creating new session"
                );
                Session::new(
                    request.session_id.clone(),
                    request.subscriber_id.clone(),
                    request.routing_key.clone(),
                )
            }
        };
        Ok(session.with_max_navigation_depth(self.config.max_navigation_depth))
    }

    async fn respond(&self, session: &mut Session, request: &ParsedRequest) -> Result<Response> {
        if session.is_expired(self.config.session_ttl()) {
            info!(session_id = %session.id, "Session expired");
            self.store.delete(&session.id).await?;
            return Ok(Response::end(self.config.expired_message.clone()));
        }

        let mut response = self.run_flow(session, request)?;

        if let Some(next_flow) = response.next_flow().map(str::to_string) {
            // fail now rather than on the next request
            self.router.flow(&next_flow)?;
            debug!(session_id = %session.id, next_flow = %next_flow, "Deferring flow transition");
            session.set(session_keys::PENDING_FLOW_TRANSITION, &next_flow)?;
            response = response.into_continue();
        }

        if response.is_end() {
            if self.config.save_sessions {
                self.complete(session).await;
            }
            self.store.delete(&session.id).await?;
        } else {
            self.store.set(session, self.config.session_ttl()).await?;
        }

        Ok(response)
    }

    fn run_flow(&self, session: &mut Session, request: &ParsedRequest) -> Result<Response> {
        let pending = match session.remove(session_keys::PENDING_FLOW_TRANSITION) {
            None => None,
            Some(Value::String(flow_name)) => Some(flow_name),
            Some(other) => {
                warn!(
                    session_id = %session.id,
                    pending = %other,
                    "Malformed pending flow transition"
                );
                return Err(ConduitError::UnknownFlow(other.to_string()));
            }
        };

        if let Some(flow_name) = pending {
            let flow = self.router.flow(&flow_name)?;
            info!(session_id = %session.id, flow = %flow_name, "Switching flow");
            session.reset_position();
            session.set(session_keys::CURRENT_FLOW, &flow_name)?;
            return flow.process(session, None);
        }

        let current_flow = session
            .get_str(session_keys::CURRENT_FLOW)
            .map(str::to_string);
        let flow: Arc<Flow> = match current_flow {
            Some(flow_name) => self.router.flow(&flow_name)?,
            None => {
                let flow = self.router.find_flow(&request.routing_key)?;
                session.set(session_keys::CURRENT_FLOW, flow.name())?;
                flow
            }
        };

        flow.process(session, request.input.as_deref())
    }

    async fn complete(&self, session: &Session) {
        let snapshot = CompletedSession::from_session(session, true);
        if let Err(e) = self.completion_sink.session_completed(snapshot).await {
            warn!(session_id = %session.id, error = %e, "Failed to save completed session");
        }
    }
}

#[async_trait]
impl Endpoint for Conversation {
    async fn call(&self, ctx: &mut RequestContext) -> Result<()> {
        let mut session = match ctx.session.take() {
            Some(session) => session,
            None => self.load_or_create(&ctx.request).await?,
        };

        let response = self.respond(&mut session, &ctx.request).await?;

        ctx.session = Some(session);
        ctx.response = Some(response);
        Ok(())
    }
}
