use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::Result,
    flow::Flow,
    response::Response,
    session::Session,
    transition::Transition,
    validator::{self, Validator},
};

/// Input that returns to the previous screen when history exists
pub const BACK_INPUT: &str = "0";
/// Input that returns to the flow's initial screen
pub const HOME_INPUT: &str = "00";

pub type RenderFn = Arc<dyn Fn(&Session) -> Result<String> + Send + Sync>;
pub type BeforeRenderFn = Arc<dyn Fn(&mut Session) -> Result<()> + Send + Sync>;
pub type OnValidFn = Arc<dyn Fn(&str, &mut Session) -> Result<Option<Response>> + Send + Sync>;
pub type OnInvalidFn = Arc<dyn Fn(&str, &str, &mut Session) -> Result<Response> + Send + Sync>;

/// One screen of a flow
pub struct State {
    name: String,
    render: Option<RenderFn>,
    transitions: HashMap<String, Transition>,
    catch_all: Option<Transition>,
    validators: Vec<Validator>,
    before_render: Vec<BeforeRenderFn>,
    on_valid: Option<OnValidFn>,
    on_invalid: Option<OnInvalidFn>,
}

impl State {
    pub fn builder(name: impl Into<String>) -> StateBuilder {
        StateBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every transition on this state, catch-all included
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values().chain(self.catch_all.iter())
    }

    /// Produce the screen text for `session`
    pub fn render(&self, session: &mut Session) -> Result<Response> {
        for callback in &self.before_render {
            callback(session)?;
        }

        let text = match &self.render {
            Some(render) => render(session)?,
            None => format!("No content defined for state: {}", self.name),
        };

        Ok(Response::continue_with(text))
    }

    /// Apply `input` to the session.
    ///
    /// Returns `Ok(None)` when handling only moved the session (or did
    /// nothing); the caller then renders whatever state is current.
    pub fn handle_input(
        &self,
        input: &str,
        session: &mut Session,
        flow: &Flow,
    ) -> Result<Option<Response>> {
        if let Some(transition) = self.transitions.get(input) {
            return transition.execute(input, session);
        }

        if input == BACK_INPUT && session.can_go_back() {
            session.go_back();
            return Ok(None);
        }
        if input == HOME_INPUT {
            session.navigate_to(flow.initial_state());
            return Ok(None);
        }

        if let Err(message) = validator::run_all(&self.validators, input, session) {
            return match &self.on_invalid {
                Some(on_invalid) => on_invalid(input, &message, session).map(Some),
                None => Ok(Some(Response::continue_with(message))),
            };
        }

        if let Some(on_valid) = &self.on_valid {
            if let Some(response) = on_valid(input, session)? {
                return Ok(Some(response));
            }
        }

        match &self.catch_all {
            Some(transition) => transition.execute(input, session),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("transitions", &self.transitions)
            .field("catch_all", &self.catch_all)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Builder for [`State`]
pub struct StateBuilder {
    state: State,
}

impl StateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: State {
                name: name.into(),
                render: None,
                transitions: HashMap::new(),
                catch_all: None,
                validators: Vec::new(),
                before_render: Vec::new(),
                on_valid: None,
                on_invalid: None,
            },
        }
    }

    /// Fixed screen text
    pub fn display(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.render(move |_| Ok(text.clone()))
    }

    /// Screen text computed from the session
    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&Session) -> Result<String> + Send + Sync + 'static,
    {
        self.state.render = Some(Arc::new(render));
        self
    }

    /// Bind an exact input. Takes precedence over validators and the
    /// reserved back/home inputs.
    pub fn on(mut self, input: impl Into<String>, transition: Transition) -> Self {
        self.state.transitions.insert(input.into(), transition);
        self
    }

    /// Bind any input not matched exactly
    pub fn on_any(mut self, transition: Transition) -> Self {
        self.state.catch_all = Some(transition);
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.state.validators.push(validator);
        self
    }

    pub fn before_render<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Session) -> Result<()> + Send + Sync + 'static,
    {
        self.state.before_render.push(Arc::new(callback));
        self
    }

    pub fn on_valid<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &mut Session) -> Result<Option<Response>> + Send + Sync + 'static,
    {
        self.state.on_valid = Some(Arc::new(callback));
        self
    }

    /// Called with the input and the first validation message
    pub fn on_invalid<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &str, &mut Session) -> Result<Response> + Send + Sync + 'static,
    {
        self.state.on_invalid = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> State {
        self.state
    }
}
