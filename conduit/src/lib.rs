pub mod completion;
pub mod config;
pub mod display;
pub mod error;
pub mod flow;
pub mod handler;
pub mod middleware;
pub mod provider;
pub mod response;
pub mod router;
pub mod session;
pub mod state;
pub mod storage;
pub mod transition;
pub mod validator;

// Re-export commonly used types
pub use completion::{CompletedSession, CompletionSink, LoggingCompletionSink};
pub use config::{ConduitConfig, MiddlewareConfig};
pub use display::{DisplayBuilder, MenuBuilder};
pub use error::{ConduitError, Result};
pub use flow::{Flow, FlowBuilder};
pub use handler::{RequestHandler, RequestHandlerBuilder};
pub use middleware::{
    Endpoint, LoggingMiddleware, Middleware, MiddlewareChain, Next, RateLimitMiddleware,
    RequestContext, SessionTrackingMiddleware,
};
pub use provider::{AfricasTalkingProvider, ParsedRequest, Provider, RawRequest};
pub use response::{Action, Response};
pub use router::{FlowRegistry, Router, RouterBuilder};
pub use session::{INITIAL_STATE, Session, session_keys};
pub use state::{State, StateBuilder};
pub use storage::{
    CounterStore, InMemoryCounterStore, InMemorySessionStore, SessionStore,
};
pub use transition::{Target, Transition};
pub use validator::{ValidationResult, Validator};
