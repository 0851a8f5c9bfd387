use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use questgate_core::outcome::OutcomeStore;
use questgate_core::world::LocationFactory;

use crate::config::SessionConfig;
use crate::instance::EventInstance;
use crate::scheduler::HookScheduler;
use crate::script::EventScript;

#[derive(Debug)]
pub enum DirectoryError {
    /// An instance with this name is still live.
    NameInUse(String),
    /// The live-instance cap was reached.
    TooManyInstances(usize),
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameInUse(name) => write!(f, "instance name already in use: {name}"),
            Self::TooManyInstances(cap) => {
                write!(f, "live instance cap reached: {cap}")
            },
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Registry of live event instances for one event, keyed by name.
///
/// Owns the collaborators the instances share: the location factory, the
/// outcome store, and the deferred hook scheduler. Disposing an instance
/// reliably frees its name for reuse.
pub struct EventDirectory {
    config: SessionConfig,
    instances: Mutex<HashMap<String, Arc<EventInstance>>>,
    scheduler: HookScheduler,
    locations: Arc<dyn LocationFactory>,
    outcomes: Arc<dyn OutcomeStore>,
}

impl EventDirectory {
    pub fn new(
        config: SessionConfig,
        locations: Arc<dyn LocationFactory>,
        outcomes: Arc<dyn OutcomeStore>,
    ) -> Arc<Self> {
        config.validate();
        Arc::new(Self {
            config,
            instances: Mutex::new(HashMap::new()),
            scheduler: HookScheduler::new(),
            locations,
            outcomes,
        })
    }

    /// Create a live instance named `name`, driven by `script`.
    pub fn create_instance(
        self: &Arc<Self>,
        name: &str,
        script: Box<dyn EventScript>,
    ) -> Result<Arc<EventInstance>, DirectoryError> {
        let mut instances = self.instances.lock().unwrap();
        if instances.contains_key(name) {
            return Err(DirectoryError::NameInUse(name.to_string()));
        }
        if instances.len() >= self.config.limits.max_live_instances {
            return Err(DirectoryError::TooManyInstances(
                self.config.limits.max_live_instances,
            ));
        }
        let instance = EventInstance::new(
            name.to_string(),
            Arc::downgrade(self),
            script,
            Duration::from_millis(self.config.limits.slow_hook_warn_millis),
        );
        instances.insert(name.to_string(), Arc::clone(&instance));
        tracing::info!(event = %self.config.event_name, instance = name, "event instance created");
        Ok(instance)
    }

    pub fn instance(&self, name: &str) -> Option<Arc<EventInstance>> {
        self.instances.lock().unwrap().get(name).map(Arc::clone)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.lock().unwrap().len()
    }

    /// Dispose the named instance, if still live.
    pub fn dispose_instance(&self, name: &str) {
        if let Some(instance) = self.instance(name) {
            instance.dispose();
        }
    }

    /// Drop the directory's reference to `name`. Called from
    /// [`EventInstance::dispose`]; the name becomes reusable immediately.
    pub(crate) fn forget_instance(&self, name: &str) {
        if self.instances.lock().unwrap().remove(name).is_some() {
            tracing::debug!(event = %self.config.event_name, instance = name, "name released");
        }
    }

    pub fn event_name(&self) -> &str {
        &self.config.event_name
    }

    pub fn channel(&self) -> u16 {
        self.config.channel
    }

    pub(crate) fn scheduler(&self) -> &HookScheduler {
        &self.scheduler
    }

    pub(crate) fn locations(&self) -> &Arc<dyn LocationFactory> {
        &self.locations
    }

    pub(crate) fn outcomes(&self) -> &Arc<dyn OutcomeStore> {
        &self.outcomes
    }
}
