use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::{ConduitError, Result},
    response::Response,
    session::{INITIAL_STATE, Session},
    state::State,
    transition::Target,
};

/// An immutable conversation state machine
#[derive(Debug)]
pub struct Flow {
    name: String,
    initial_state: String,
    states: HashMap<String, State>,
}

impl Flow {
    pub fn builder(name: impl Into<String>) -> FlowBuilder {
        FlowBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    fn resolve(&self, name: &str) -> Result<&State> {
        self.states
            .get(name)
            .ok_or_else(|| ConduitError::UnknownState(name.to_string()))
    }

    /// Advance the conversation by one input.
    ///
    /// A response produced while handling `input` is returned as is.
    /// Otherwise the state the session ends up in is rendered.
    pub fn process(&self, session: &mut Session, input: Option<&str>) -> Result<Response> {
        if session.is_uninitialized() {
            session.current_state = self.initial_state.clone();
        }

        let state = self.resolve(&session.current_state)?;

        if let Some(input) = input.filter(|i| !i.is_empty()) {
            debug!(
                flow = %self.name,
                state = %state.name(),
                input = %input,
                "Handling input"
            );
            if let Some(response) = state.handle_input(input, session, self)? {
                return Ok(response);
            }
        }

        self.resolve(&session.current_state)?.render(session)
    }
}

/// Builder for [`Flow`]
pub struct FlowBuilder {
    name: String,
    initial_state: Option<String>,
    states: HashMap<String, State>,
}

impl FlowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_state: None,
            states: HashMap::new(),
        }
    }

    pub fn initial_state(mut self, name: impl Into<String>) -> Self {
        self.initial_state = Some(name.into());
        self
    }

    /// Add a state. The first one added is the initial state unless set explicitly.
    pub fn state(mut self, state: State) -> Self {
        if self.initial_state.is_none() && self.states.is_empty() {
            self.initial_state = Some(state.name().to_string());
        }
        self.states.insert(state.name().to_string(), state);
        self
    }

    /// Check the definition and freeze it
    pub fn build(self) -> Result<Flow> {
        let initial_state = self.initial_state.ok_or_else(|| {
            ConduitError::InvalidFlow(format!("flow '{}' has no states", self.name))
        })?;

        if !self.states.contains_key(&initial_state) {
            return Err(ConduitError::InvalidFlow(format!(
                "flow '{}' starts at undefined state '{}'",
                self.name, initial_state
            )));
        }

        if let Some(reserved) = self
            .states
            .keys()
            .find(|name| name.is_empty() || name.as_str() == INITIAL_STATE)
        {
            return Err(ConduitError::InvalidFlow(format!(
                "flow '{}' uses reserved state name '{}'",
                self.name, reserved
            )));
        }

        for state in self.states.values() {
            for transition in state.transitions() {
                if let Some(Target::State(target)) = transition.target() {
                    if !self.states.contains_key(target) {
                        return Err(ConduitError::InvalidFlow(format!(
                            "state '{}' in flow '{}' transitions to undefined state '{}'",
                            state.name(),
                            self.name,
                            target
                        )));
                    }
                }
            }
        }

        Ok(Flow {
            name: self.name,
            initial_state,
            states: self.states,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::Transition;

    fn banking_flow() -> Flow {
        Flow::builder("banking")
            .initial_state("welcome")
            .state(
                State::builder("welcome")
                    .display("Welcome to TestBank\n1. Check Balance\n2. Exit")
                    .on("1", Transition::to("check_balance"))
                    .on(
                        "2",
                        Transition::action(|_, _| {
                            Ok(Some(Response::end("Thank you for banking with us!")))
                        }),
                    )
                    .build(),
            )
            .state(
                State::builder("check_balance")
                    .render(|session| {
                        let balance: i64 = session.get("balance").unwrap_or(1000);
                        Ok(format!("Your balance is KES {balance}\n\n0. Back"))
                    })
                    .build(),
            )
            .build()
            .unwrap()
    }

    fn session() -> Session {
        Session::new("test123", "254712345678", "*123#")
    }

    #[test]
    fn test_renders_initial_state() {
        let flow = banking_flow();
        let mut session = session();

        let response = flow.process(&mut session, None).unwrap();
        assert!(response.text().contains("Welcome to TestBank"));
        assert!(response.is_continue());
        assert_eq!(session.current_state, "welcome");
    }

    #[test]
    fn test_navigation_renders_new_state() {
        let flow = banking_flow();
        let mut session = session();
        flow.process(&mut session, None).unwrap();

        let response = flow.process(&mut session, Some("1")).unwrap();
        assert_eq!(session.current_state, "check_balance");
        assert!(response.text().contains("Your balance is KES 1000"));
    }

    #[test]
    fn test_end_action_is_returned_verbatim() {
        let flow = banking_flow();
        let mut session = session();
        flow.process(&mut session, None).unwrap();

        let response = flow.process(&mut session, Some("2")).unwrap();
        assert!(response.is_end());
        assert_eq!(response.text(), "Thank you for banking with us!");
    }

    #[test]
    fn test_back_navigation_with_zero() {
        let flow = banking_flow();
        let mut session = session();
        flow.process(&mut session, None).unwrap();
        flow.process(&mut session, Some("1")).unwrap();

        let response = flow.process(&mut session, Some("0")).unwrap();
        assert_eq!(session.current_state, "welcome");
        assert!(response.text().contains("Welcome to TestBank"));
    }

    #[test]
    fn test_home_returns_to_initial_state() {
        let flow = banking_flow();
        let mut session = session();
        flow.process(&mut session, None).unwrap();
        flow.process(&mut session, Some("1")).unwrap();

        let response = flow.process(&mut session, Some("00")).unwrap();
        assert_eq!(session.current_state, "welcome");
        assert!(response.text().starts_with("Welcome to TestBank"));
    }

    #[test]
    fn test_empty_input_only_renders() {
        let flow = banking_flow();
        let mut session = session();
        flow.process(&mut session, None).unwrap();
        flow.process(&mut session, Some("1")).unwrap();

        let response = flow.process(&mut session, Some("")).unwrap();
        assert_eq!(session.current_state, "check_balance");
        assert!(response.text().contains("balance"));
    }

    #[test]
    fn test_unmatched_input_rerenders_same_state() {
        let flow = banking_flow();
        let mut session = session();
        let first = flow.process(&mut session, None).unwrap();

        // No catch-all on welcome: the input is dropped and the screen repeats.
        let second = flow.process(&mut session, Some("9")).unwrap();
        assert_eq!(first, second);
        assert_eq!(session.current_state, "welcome");
        assert!(session.navigation_stack.is_empty());
    }

    #[test]
    fn test_unknown_current_state_is_an_error() {
        let flow = banking_flow();
        let mut session = session();
        session.current_state = "vanished".to_string();

        let err = flow.process(&mut session, Some("1")).unwrap_err();
        assert!(matches!(err, ConduitError::UnknownState(ref s) if s == "vanished"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_navigation_to_undefined_state_from_action_fails_on_render() {
        let flow = Flow::builder("broken")
            .state(
                State::builder("start")
                    .on(
                        "1",
                        Transition::action(|_, session| {
                            session.navigate_to("nowhere");
                            Ok(None)
                        }),
                    )
                    .build(),
            )
            .build()
            .unwrap();
        let mut session = session();

        let err = flow.process(&mut session, Some("1")).unwrap_err();
        assert!(matches!(err, ConduitError::UnknownState(_)));
    }

    #[test]
    fn test_build_rejects_undefined_targets() {
        let result = Flow::builder("broken")
            .state(State::builder("start").on("1", Transition::to("missing")).build())
            .build();
        assert!(matches!(result, Err(ConduitError::InvalidFlow(_))));

        let result = Flow::builder("broken")
            .initial_state("nope")
            .state(State::builder("start").build())
            .build();
        assert!(matches!(result, Err(ConduitError::InvalidFlow(_))));

        assert!(Flow::builder("empty").build().is_err());
    }

    #[test]
    fn test_build_rejects_reserved_state_names() {
        let result = Flow::builder("placeholder")
            .state(
                State::builder(INITIAL_STATE)
                    .display("Start\n1. Next")
                    .on("1", Transition::to("next"))
                    .build(),
            )
            .state(State::builder("next").display("Next\n0. Back").build())
            .build();
        assert!(matches!(result, Err(ConduitError::InvalidFlow(_))));

        let result = Flow::builder("unnamed")
            .state(State::builder("").display("Blank").build())
            .build();
        assert!(matches!(result, Err(ConduitError::InvalidFlow(_))));
    }

    #[test]
    fn test_first_state_is_default_initial() {
        let flow = Flow::builder("simple")
            .state(State::builder("first").display("1").build())
            .state(State::builder("second").display("2").build())
            .build()
            .unwrap();
        assert_eq!(flow.initial_state(), "first");
    }
}
