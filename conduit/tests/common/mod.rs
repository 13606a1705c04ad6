#![allow(dead_code)]

use async_trait::async_trait;
use conduit::{
    AfricasTalkingProvider, CompletedSession, CompletionSink, ConduitError, Flow, ParsedRequest,
    Provider, RawRequest, Response, Result, Session, SessionStore, State, Transition, validator,
};
use std::sync::Mutex;
use std::time::Duration;

pub const SERVICE_CODE: &str = "*123#";
pub const PHONE: &str = "+254712345678";

/// Africa's Talking style callback parameters
pub fn request(session_id: &str, text: &str) -> RawRequest {
    [
        ("sessionId", session_id),
        ("phoneNumber", PHONE),
        ("serviceCode", SERVICE_CODE),
        ("networkCode", "63902"),
        ("text", text),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn welcome_flow() -> Flow {
    Flow::builder("welcome_flow")
        .initial_state("welcome")
        .state(
            State::builder("welcome")
                .display("Welcome\n1. A\n2. Exit\n3. Loans")
                .on("1", Transition::to("a"))
                .on(
                    "2",
                    Transition::action(|_, _| Ok(Some(Response::end("Thanks for visiting")))),
                )
                .on(
                    "3",
                    Transition::action(|_, _| {
                        Ok(Some(Response::transition_to("Opening loans...", "loans_flow")))
                    }),
                )
                .build(),
        )
        .state(State::builder("a").display("Screen A\n0. Back").build())
        .build()
        .expect("welcome flow is valid")
}

pub fn loans_flow() -> Flow {
    Flow::builder("loans_flow")
        .initial_state("amount")
        .state(
            State::builder("amount")
                .display("Loans\nEnter amount:")
                .validate(validator::numeric())
                .validate(validator::greater_than(0))
                .on_valid(|input, session| {
                    session.set("amount", input.parse::<f64>().unwrap_or_default())?;
                    Ok(None)
                })
                .on_any(Transition::to("confirm"))
                .build(),
        )
        .state(
            State::builder("confirm")
                .render(|session| {
                    let amount: f64 = session.get("amount").unwrap_or_default();
                    Ok(format!("Borrow {amount}?\n1. Yes"))
                })
                .on("1", Transition::action(|_, _| Ok(Some(Response::end("Loan approved")))))
                .build(),
        )
        .build()
        .expect("loans flow is valid")
}

/// Store whose every call fails
pub struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn get(&self, _session_id: &str) -> Result<Option<Session>> {
        Err(ConduitError::Storage("connection refused".to_string()))
    }

    async fn set(&self, _session: &Session, _ttl: Duration) -> Result<()> {
        Err(ConduitError::Storage("connection refused".to_string()))
    }

    async fn delete(&self, _session_id: &str) -> Result<()> {
        Err(ConduitError::Storage("connection refused".to_string()))
    }
}

/// Completion sink that remembers what it was given
#[derive(Default)]
pub struct RecordingSink {
    pub completed: Mutex<Vec<CompletedSession>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.completed.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionSink for RecordingSink {
    async fn session_completed(&self, session: CompletedSession) -> Result<()> {
        self.completed.lock().unwrap().push(session);
        Ok(())
    }
}

/// Completion sink that always fails
pub struct FailingSink;

#[async_trait]
impl CompletionSink for FailingSink {
    async fn session_completed(&self, _session: CompletedSession) -> Result<()> {
        Err(ConduitError::Storage("database unavailable".to_string()))
    }
}

/// Provider that parses like Africa's Talking but cannot format any reply
pub struct UnformattableProvider;

#[async_trait]
impl Provider for UnformattableProvider {
    async fn parse(&self, raw: &RawRequest) -> Result<ParsedRequest> {
        AfricasTalkingProvider::new().parse(raw).await
    }

    async fn format(&self, _response: &Response) -> Result<String> {
        Err(ConduitError::MalformedRequest("reply encoder offline".to_string()))
    }
}
