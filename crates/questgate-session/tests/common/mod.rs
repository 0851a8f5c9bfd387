use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use questgate_core::geometry::Point;
use questgate_core::ids::LocationId;
use questgate_core::outcome::OutcomeStore;
use questgate_core::test_helpers::{FakeLocation, FakeLocationFactory, MemoryOutcomeStore};
use questgate_core::world::LocationFactory;

use questgate_session::config::SessionConfig;
use questgate_session::directory::EventDirectory;
use questgate_session::instance::EventInstance;
use questgate_session::script::{EventScript, HookArg, ScriptError};

pub const ARENA: LocationId = 7;

/// A directory wired to in-memory fakes, with one arena location whose
/// entry points sit above and to the left of the usual gate area.
pub struct Harness {
    pub directory: Arc<EventDirectory>,
    pub outcomes: Arc<MemoryOutcomeStore>,
    pub arena: Arc<FakeLocation>,
}

pub fn harness() -> Harness {
    harness_with(SessionConfig::default())
}

pub fn harness_with(config: SessionConfig) -> Harness {
    let locations = Arc::new(FakeLocationFactory::new());
    let arena = FakeLocation::new(ARENA, vec![Point::new(500, 200), Point::new(400, 300)]);
    locations.insert(Arc::clone(&arena));
    let outcomes = Arc::new(MemoryOutcomeStore::new());

    let locations_dyn = Arc::clone(&locations) as Arc<dyn LocationFactory>;
    let outcomes_dyn = Arc::clone(&outcomes) as Arc<dyn OutcomeStore>;
    let directory = EventDirectory::new(config, locations_dyn, outcomes_dyn);

    Harness {
        directory,
        outcomes,
        arena,
    }
}

/// A stage script in the shape real events take: entry stamps the stage,
/// clearing the arena opens its gates, finishing the run records every
/// member as a winner. Clonable handle over shared state, so tests keep a
/// copy while the instance owns another.
#[derive(Clone)]
pub struct GauntletScript {
    log: Arc<Mutex<Vec<String>>>,
}

impl GauntletScript {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn count(&self, hook: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|h| *h == hook).count()
    }
}

impl EventScript for GauntletScript {
    fn invoke(
        &self,
        name: &str,
        instance: &EventInstance,
        _args: &[HookArg],
    ) -> Result<Option<Value>, ScriptError> {
        self.log.lock().unwrap().push(name.to_string());
        match name {
            "playerEntry" => {
                if instance.property("stage").is_none() {
                    instance.set_property("stage", "1");
                }
                Ok(None)
            },
            "monsterValue" => Ok(Some(json!(5))),
            "allMonstersDead" => {
                let map = instance
                    .map_instance(ARENA)
                    .map_err(|e| ScriptError::Fault(e.to_string()))?;
                map.open_all_obstacles();
                Ok(None)
            },
            "playerRevive" => {
                if instance.property("hardcore").as_deref() == Some("true") {
                    Ok(Some(json!(false)))
                } else {
                    Ok(None)
                }
            },
            "clearPQ" => {
                for player in instance.players() {
                    instance.save_winner(player);
                }
                Ok(None)
            },
            _ => Ok(None),
        }
    }
}
