use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use questgate_core::outcome::OutcomeStore;
use questgate_core::test_helpers::{FakeLocationFactory, MemoryOutcomeStore};
use questgate_core::world::LocationFactory;

use crate::config::SessionConfig;
use crate::directory::EventDirectory;
use crate::instance::EventInstance;
use crate::script::{EventScript, HookArg, ScriptError};

#[derive(Default)]
struct StubScriptInner {
    values: HashMap<String, Value>,
    faults: Vec<String>,
    calls: Mutex<Vec<(String, Vec<HookArg>)>>,
}

/// Recording script double: returns canned values per hook name, faults on
/// request, and treats every other name as unimplemented.
#[derive(Clone, Default)]
pub(crate) struct StubScript {
    inner: Arc<StubScriptInner>,
}

impl StubScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, hook: &str, value: Value) -> Self {
        let inner = Arc::get_mut(&mut self.inner).expect("configure before sharing");
        inner.values.insert(hook.to_string(), value);
        self
    }

    pub fn with_fault(mut self, hook: &str) -> Self {
        let inner = Arc::get_mut(&mut self.inner).expect("configure before sharing");
        inner.faults.push(hook.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn call_count(&self, hook: &str) -> usize {
        self.inner
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == hook)
            .count()
    }

    pub fn args_of_last(&self, hook: &str) -> Option<Vec<HookArg>> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == hook)
            .map(|(_, args)| args.clone())
    }
}

impl EventScript for StubScript {
    fn invoke(
        &self,
        name: &str,
        _instance: &EventInstance,
        args: &[HookArg],
    ) -> Result<Option<Value>, ScriptError> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .push((name.to_string(), args.to_vec()));
        if self.inner.faults.iter().any(|f| f == name) {
            return Err(ScriptError::Fault(format!("{name} blew up")));
        }
        Ok(self.inner.values.get(name).cloned())
    }
}

pub(crate) struct TestWorld {
    pub directory: Arc<EventDirectory>,
    pub locations: Arc<FakeLocationFactory>,
    pub outcomes: Arc<MemoryOutcomeStore>,
}

/// Directory wired to in-memory fakes and a default config.
pub(crate) fn test_world() -> TestWorld {
    test_world_with(SessionConfig::default())
}

pub(crate) fn test_world_with(config: SessionConfig) -> TestWorld {
    let locations = Arc::new(FakeLocationFactory::new());
    let outcomes = Arc::new(MemoryOutcomeStore::new());
    let locations_dyn = Arc::clone(&locations) as Arc<dyn LocationFactory>;
    let outcomes_dyn = Arc::clone(&outcomes) as Arc<dyn OutcomeStore>;
    TestWorld {
        directory: EventDirectory::new(config, locations_dyn, outcomes_dyn),
        locations,
        outcomes,
    }
}
