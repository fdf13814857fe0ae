//! Reducer-based session store.
//!
//! Session data is grouped into namespaces ("action groups"), each with
//! default state and reducers keyed by event. A fresh [`SessionStore`] is
//! built for every request from the data the transport carried back.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parlance_core::RegistrationError;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::events::EventKey;

/// Returns the next sub-state, or `None` to leave it untouched.
pub type Reducer = Arc<dyn Fn(&Value, &Value) -> Option<Value> + Send + Sync>;

/// A namespace of session state and the reducers that own it.
pub struct ActionGroup {
    namespace: String,
    defaults: Value,
    reducers: Vec<(EventKey, Reducer)>,
}

impl ActionGroup {
    pub fn new(namespace: impl Into<String>, defaults: Value) -> Self {
        Self {
            namespace: namespace.into(),
            defaults,
            reducers: Vec::new(),
        }
    }

    /// Register `reducer` for `event`. Called with the current sub-state and
    /// the dispatched payload (`Value::Null` when none).
    pub fn on<F>(mut self, event: impl Into<EventKey>, reducer: F) -> Self
    where
        F: Fn(&Value, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.reducers.push((event.into(), Arc::new(reducer)));
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// All action groups of an application, frozen once it starts.
#[derive(Default)]
pub struct ReducerRegistry {
    defaults: IndexMap<String, Value>,
    reducers: HashMap<EventKey, Vec<(String, Reducer)>>,
    started: bool,
}

impl ReducerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action group. After [`mark_started`](Self::mark_started) the
    /// group is ignored with a warning.
    pub fn register_group(&mut self, group: ActionGroup) -> Result<(), RegistrationError> {
        if self.started {
            warn!(
                namespace = %group.namespace,
                "Action groups may only be added before start; ignoring"
            );
            return Ok(());
        }
        if self.defaults.contains_key(&group.namespace) {
            return Err(RegistrationError::DuplicateActionGroup(group.namespace));
        }

        for (event, reducer) in group.reducers {
            self.reducers
                .entry(event)
                .or_default()
                .push((group.namespace.clone(), reducer));
        }
        debug!(namespace = %group.namespace, "Action group registered");
        self.defaults.insert(group.namespace, group.defaults);
        Ok(())
    }

    pub fn mark_started(&mut self) {
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.defaults.contains_key(namespace)
    }

    fn reducers_for(&self, event: &EventKey) -> &[(String, Reducer)] {
        self.reducers.get(event).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Per-request session state.
pub struct SessionStore<'a> {
    registry: &'a ReducerRegistry,
    state: Map<String, Value>,
    outbound: Map<String, Value>,
}

impl<'a> SessionStore<'a> {
    /// Group defaults, overlaid key by key with the carried session data.
    pub fn new(registry: &'a ReducerRegistry, carried: &Map<String, Value>) -> Self {
        let mut state: Map<String, Value> = registry
            .defaults
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in carried {
            state.insert(key.clone(), value.clone());
        }
        Self {
            registry,
            state,
            outbound: carried.clone(),
        }
    }

    /// Run every reducer registered for `event`, in registration order, then
    /// copy the whole state onto the outbound session data.
    pub fn dispatch(&mut self, event: impl Into<EventKey>, payload: &Value) {
        let event = event.into();
        let registry = self.registry;
        let reducers = registry.reducers_for(&event);
        if reducers.is_empty() {
            return;
        }

        for (namespace, reducer) in reducers {
            let current = self.state.get(namespace).unwrap_or(&Value::Null);
            match reducer(current, payload) {
                Some(next) => {
                    self.state.insert(namespace.clone(), next);
                }
                None => warn!(
                    namespace = %namespace,
                    event = %event,
                    "Reducer did not return a new state"
                ),
            }
        }

        for (key, value) in &self.state {
            self.outbound.insert(key.clone(), value.clone());
        }
    }

    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    pub fn get(&self, namespace: &str) -> Option<&Value> {
        self.state.get(namespace)
    }

    /// Session data to hand back to the transport.
    pub fn outbound(&self) -> &Map<String, Value> {
        &self.outbound
    }

    pub fn into_outbound(self) -> Map<String, Value> {
        self.outbound
    }
}
