use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{RegistrationError, RouteError};
use crate::payload::Payload;
use crate::sink::ResultSink;

pub type DirectHandler =
    dyn Fn(Option<Payload>) -> anyhow::Result<Option<Payload>> + Send + Sync;
pub type DeferredHandler = dyn Fn(Option<Payload>, ResultSink) + Send + Sync;

/// A native action the web side can call.
#[derive(Clone)]
pub enum Action {
    /// Produces its result before returning.
    Direct(Arc<DirectHandler>),
    /// Receives a [`ResultSink`] and settles it whenever it is done.
    Deferred(Arc<DeferredHandler>),
}

impl Action {
    pub fn direct<F>(handler: F) -> Self
    where
        F: Fn(Option<Payload>) -> anyhow::Result<Option<Payload>> + Send + Sync + 'static,
    {
        Action::Direct(Arc::new(handler))
    }

    pub fn deferred<F>(handler: F) -> Self
    where
        F: Fn(Option<Payload>, ResultSink) + Send + Sync + 'static,
    {
        Action::Deferred(Arc::new(handler))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Direct(_) => f.write_str("Action::Direct"),
            Action::Deferred(_) => f.write_str("Action::Deferred"),
        }
    }
}

/// A named, flat group of actions.
#[derive(Debug, Clone)]
pub struct ActionsSet {
    name: String,
    actions: HashMap<String, Action>,
}

impl ActionsSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_native<F>(mut self, action: &str, handler: F) -> Result<Self, RegistrationError>
    where
        F: Fn(Option<Payload>) -> anyhow::Result<Option<Payload>> + Send + Sync + 'static,
    {
        self.insert(action, Action::direct(handler))?;
        Ok(self)
    }

    pub fn add_native_callback<F>(
        mut self,
        action: &str,
        handler: F,
    ) -> Result<Self, RegistrationError>
    where
        F: Fn(Option<Payload>, ResultSink) + Send + Sync + 'static,
    {
        self.insert(action, Action::deferred(handler))?;
        Ok(self)
    }

    /// Add an action. An existing action of the same name is never replaced.
    pub fn insert(&mut self, action: &str, handler: Action) -> Result<(), RegistrationError> {
        if self.actions.contains_key(action) {
            return Err(RegistrationError::DuplicateAction {
                namespace: self.name.clone(),
                action: action.to_string(),
            });
        }
        self.actions.insert(action.to_string(), handler);
        Ok(())
    }

    pub fn get(&self, action: &str) -> Option<&Action> {
        self.actions.get(action)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Namespace → action table. Built up front, then only read.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    sets: HashMap<String, ActionsSet>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single action, creating its namespace on first use.
    pub fn register(
        &mut self,
        namespace: &str,
        action: &str,
        handler: Action,
    ) -> Result<(), RegistrationError> {
        self.sets
            .entry(namespace.to_string())
            .or_insert_with(|| ActionsSet::new(namespace))
            .insert(action, handler)
    }

    /// Attach a whole set under its own name.
    pub fn insert_set(&mut self, set: ActionsSet) -> Result<(), RegistrationError> {
        if self.sets.contains_key(set.name()) {
            return Err(RegistrationError::DuplicateNamespace {
                namespace: set.name().to_string(),
            });
        }
        self.sets.insert(set.name().to_string(), set);
        Ok(())
    }

    pub fn lookup(&self, namespace: &str, action: &str) -> Result<&Action, RouteError> {
        let set = self
            .sets
            .get(namespace)
            .ok_or_else(|| RouteError::MissingNamespace {
                namespace: namespace.to_string(),
                action: action.to_string(),
            })?;
        set.get(action).ok_or_else(|| RouteError::MissingAction {
            namespace: namespace.to_string(),
            action: action.to_string(),
        })
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }
}
