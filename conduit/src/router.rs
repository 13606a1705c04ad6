use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::{ConduitError, Result},
    flow::Flow,
};

/// Strip everything but digits, so `*123#` and `123` name the same service
pub fn normalize_service_code(code: &str) -> String {
    code.chars().filter(char::is_ascii_digit).collect()
}

/// Flows addressable by name
#[derive(Debug, Default, Clone)]
pub struct FlowRegistry {
    flows: HashMap<String, Arc<Flow>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, flow: Flow) {
        self.flows.insert(flow.name().to_string(), Arc::new(flow));
    }

    pub fn get(&self, name: &str) -> Result<Arc<Flow>> {
        self.flows
            .get(name)
            .cloned()
            .ok_or_else(|| ConduitError::UnknownFlow(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flows.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.flows.keys().map(String::as_str)
    }
}

/// Maps service codes to the flows that start conversations
#[derive(Debug, Clone)]
pub struct Router {
    registry: FlowRegistry,
    routes: HashMap<String, String>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Flow that starts a conversation dialled on `service_code`
    pub fn find_flow(&self, service_code: &str) -> Result<Arc<Flow>> {
        let flow_name = self
            .routes
            .get(&normalize_service_code(service_code))
            .ok_or_else(|| ConduitError::UnroutedServiceCode(service_code.to_string()))?;
        self.registry.get(flow_name)
    }

    /// Flow registered under `name`
    pub fn flow(&self, name: &str) -> Result<Arc<Flow>> {
        self.registry.get(name)
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }
}

/// Collects flows and routes before any request is served
#[derive(Debug, Default)]
pub struct RouterBuilder {
    registry: FlowRegistry,
    routes: Vec<(String, String)>,
}

impl RouterBuilder {
    /// Make `flow` reachable by name, e.g. as a cross-flow target
    pub fn register(mut self, flow: Flow) -> Self {
        self.registry.register(flow);
        self
    }

    /// Start conversations on `service_code` with the flow named `flow_name`
    pub fn route(mut self, service_code: impl AsRef<str>, flow_name: impl Into<String>) -> Self {
        self.routes
            .push((service_code.as_ref().to_string(), flow_name.into()));
        self
    }

    pub fn build(self) -> Result<Router> {
        let mut routes = HashMap::new();
        for (service_code, flow_name) in self.routes {
            if !self.registry.contains(&flow_name) {
                return Err(ConduitError::UnknownFlow(flow_name));
            }
            let key = normalize_service_code(&service_code);
            if key.is_empty() {
                return Err(ConduitError::Config(format!(
                    "service code '{service_code}' contains no digits"
                )));
            }
            routes.insert(key, flow_name);
        }

        Ok(Router {
            registry: self.registry,
            routes,
        })
    }
}
