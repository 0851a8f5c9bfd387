use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use serde_json::Value;

use questgate_core::ids::{ActorId, LocationId, PlayerId, TemplateId};
use questgate_core::outcome::WinnerRecord;
use questgate_core::world::LocationError;

use crate::directory::EventDirectory;
use crate::map_instance::MapInstance;
use crate::script::{EventScript, HookArg, HookDispatcher};

#[derive(Debug)]
pub enum InstanceError {
    /// The instance (or its directory) has been disposed.
    Disposed,
    Location(LocationError),
}

impl std::fmt::Display for InstanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disposed => write!(f, "instance is disposed"),
            Self::Location(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InstanceError {}

impl From<LocationError> for InstanceError {
    fn from(e: LocationError) -> Self {
        Self::Location(e)
    }
}

struct EventTimer {
    started_at: Instant,
    duration: Duration,
}

/// One ephemeral, isolated event session: membership, kill counts,
/// instance properties, its private map instances, and the hook boundary
/// to the event script.
///
/// Lifecycle is Created -> Active -> Disposed, with Disposed terminal:
/// after `dispose` every mutating call is a no-op and every query returns
/// its empty/zero default.
pub struct EventInstance {
    name: String,
    directory: Weak<EventDirectory>,
    self_ref: Weak<EventInstance>,
    dispatcher: HookDispatcher,
    players: Mutex<Vec<PlayerId>>,
    monsters: Mutex<Vec<ActorId>>,
    kill_counts: Mutex<HashMap<PlayerId, u32>>,
    properties: Mutex<HashMap<String, String>>,
    map_instances: Mutex<Vec<Arc<MapInstance>>>,
    timer: Mutex<Option<EventTimer>>,
    disposed: AtomicBool,
}

impl EventInstance {
    pub(crate) fn new(
        name: String,
        directory: Weak<EventDirectory>,
        script: Box<dyn EventScript>,
        slow_hook_warn: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            name,
            directory,
            self_ref: self_ref.clone(),
            dispatcher: HookDispatcher::new(script, slow_hook_warn),
            players: Mutex::new(Vec::new()),
            monsters: Mutex::new(Vec::new()),
            kill_counts: Mutex::new(HashMap::new()),
            properties: Mutex::new(HashMap::new()),
            map_instances: Mutex::new(Vec::new()),
            timer: Mutex::new(None),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_live(&self) -> bool {
        !self.disposed.load(Ordering::Acquire)
    }

    // ---- membership ------------------------------------------------------

    /// Add `player` to the instance and fire the `playerEntry` hook.
    pub fn register_player(&self, player: PlayerId) {
        if !self.is_live() {
            return;
        }
        {
            let mut players = self.players.lock().unwrap();
            if players.contains(&player) {
                return;
            }
            players.push(player);
        }
        self.dispatch_hook("playerEntry", &[HookArg::Player(player)]);
    }

    pub fn unregister_player(&self, player: PlayerId) {
        if !self.is_live() {
            return;
        }
        self.players.lock().unwrap().retain(|&p| p != player);
    }

    /// Snapshot of current members.
    pub fn players(&self) -> Vec<PlayerId> {
        self.players.lock().unwrap().clone()
    }

    pub fn player_count(&self) -> usize {
        self.players.lock().unwrap().len()
    }

    pub fn has_player(&self, player: PlayerId) -> bool {
        self.players.lock().unwrap().contains(&player)
    }

    pub fn register_monster(&self, monster: ActorId) {
        if !self.is_live() {
            return;
        }
        let mut monsters = self.monsters.lock().unwrap();
        if !monsters.contains(&monster) {
            monsters.push(monster);
        }
    }

    /// Remove `monster`; removing the last one fires `allMonstersDead`
    /// exactly once. Unregistering from an already-empty set does not
    /// re-fire the hook.
    pub fn unregister_monster(&self, monster: ActorId) {
        if !self.is_live() {
            return;
        }
        let now_empty = {
            let mut monsters = self.monsters.lock().unwrap();
            let before = monsters.len();
            monsters.retain(|&m| m != monster);
            before > monsters.len() && monsters.is_empty()
        };
        if now_empty {
            self.dispatch_hook("allMonstersDead", &[]);
        }
    }

    pub fn monster_count(&self) -> usize {
        self.monsters.lock().unwrap().len()
    }

    // ---- lifecycle hooks -------------------------------------------------

    pub fn player_killed(&self, player: PlayerId) {
        self.dispatch_hook("playerDead", &[HookArg::Player(player)]);
    }

    /// Ask the script whether `player` may revive. Defaults to allowing the
    /// revive when the hook is absent, faults, or returns a non-boolean.
    pub fn revive_player(&self, player: PlayerId) -> bool {
        self.dispatch_hook("playerRevive", &[HookArg::Player(player)])
            .and_then(|value| value.as_bool())
            .unwrap_or(true)
    }

    pub fn player_disconnected(&self, player: PlayerId) {
        self.dispatch_hook("playerDisconnected", &[HookArg::Player(player)]);
    }

    pub fn remove_player(&self, player: PlayerId) {
        self.dispatch_hook("playerExit", &[HookArg::Player(player)]);
    }

    pub fn left_party(&self, player: PlayerId) {
        self.dispatch_hook("leftParty", &[HookArg::Player(player)]);
    }

    pub fn disband_party(&self) {
        self.dispatch_hook("disbandParty", &[]);
    }

    /// Conclude the event (e.g. warp winners to a finish map).
    pub fn finish(&self) {
        self.dispatch_hook("clearPQ", &[]);
    }

    pub fn kill_by_count(&self, player: PlayerId) {
        self.dispatch_hook("addKillCount", &[HookArg::Player(player)]);
    }

    // ---- kill counts -----------------------------------------------------

    /// Credit `player` for a killed monster. The script's `monsterValue`
    /// hook prices the kill; a missing or non-numeric result leaves the
    /// count unchanged. Negative values saturate at zero.
    pub fn monster_killed(&self, player: PlayerId, monster: TemplateId) {
        if !self.is_live() {
            return;
        }
        let value = self
            .dispatch_hook(
                "monsterValue",
                &[HookArg::Player(player), HookArg::Monster(monster)],
            )
            .and_then(|value| value.as_i64());
        let Some(value) = value else {
            tracing::debug!(
                instance = %self.name,
                player,
                monster,
                "monsterValue returned no number; kill not counted"
            );
            return;
        };
        let mut counts = self.kill_counts.lock().unwrap();
        let count = counts.entry(player).or_insert(0);
        *count = if value >= 0 {
            count.saturating_add(value.min(i64::from(u32::MAX)) as u32)
        } else {
            count.saturating_sub(value.unsigned_abs().min(u64::from(u32::MAX)) as u32)
        };
    }

    pub fn kill_count(&self, player: PlayerId) -> u32 {
        self.kill_counts
            .lock()
            .unwrap()
            .get(&player)
            .copied()
            .unwrap_or(0)
    }

    // ---- event timer -----------------------------------------------------

    pub fn start_event_timer(&self, duration: Duration) {
        if !self.is_live() {
            return;
        }
        *self.timer.lock().unwrap() = Some(EventTimer {
            started_at: Instant::now(),
            duration,
        });
    }

    /// Started means a positive duration with a recorded start instant.
    pub fn is_timer_started(&self) -> bool {
        self.timer
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|t| !t.duration.is_zero())
    }

    /// Milliseconds until the timer expires; negative once it has. `None`
    /// when no timer was started.
    pub fn time_left_millis(&self) -> Option<i64> {
        self.timer.lock().unwrap().as_ref().map(|t| {
            t.duration.as_millis() as i64 - t.started_at.elapsed().as_millis() as i64
        })
    }

    // ---- instance properties ---------------------------------------------

    /// Set an instance property, returning the previous value.
    pub fn set_property(&self, key: &str, value: &str) -> Option<String> {
        if !self.is_live() {
            return None;
        }
        self.properties
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string())
    }

    pub fn property(&self, key: &str) -> Option<String> {
        self.properties.lock().unwrap().get(key).cloned()
    }

    // ---- map instances ---------------------------------------------------

    /// The map instance for `location`, binding a private location copy on
    /// first use. A copy freshly loaded by the factory gets its interactive
    /// objects shuffled when the `shuffleInteractives` property is `"true"`.
    pub fn map_instance(&self, location: LocationId) -> Result<Arc<MapInstance>, InstanceError> {
        if !self.is_live() {
            return Err(InstanceError::Disposed);
        }
        if let Some(existing) = self
            .map_instances
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.location_id() == location)
        {
            return Ok(Arc::clone(existing));
        }
        let directory = self.directory.upgrade().ok_or(InstanceError::Disposed)?;
        let was_loaded = directory.locations().is_loaded(location);
        let copy = directory.locations().get_or_load(location)?;
        if !was_loaded && self.property("shuffleInteractives").as_deref() == Some("true") {
            copy.shuffle_interactives();
        }
        // Re-check under the lock: another caller may have bound the same
        // location while the copy was loading.
        let mut map_instances = self.map_instances.lock().unwrap();
        if let Some(existing) = map_instances.iter().find(|m| m.location_id() == location) {
            return Ok(Arc::clone(existing));
        }
        let map = Arc::new(MapInstance::new(self.self_ref.clone(), copy));
        map_instances.push(Arc::clone(&map));
        Ok(map)
    }

    pub(crate) fn forget_map_instance(&self, map: &Arc<MapInstance>) {
        self.map_instances
            .lock()
            .unwrap()
            .retain(|m| !Arc::ptr_eq(m, map));
    }

    // ---- scheduling, outcomes, dispatch ----------------------------------

    /// Ask the process-wide scheduler to fire `hook` (with this instance as
    /// sole argument) once after `delay`. The callback discards itself if
    /// the instance is disposed before it fires.
    pub fn schedule(&self, hook: &str, delay: Duration) {
        if !self.is_live() {
            return;
        }
        let Some(directory) = self.directory.upgrade() else {
            return;
        };
        directory
            .scheduler()
            .schedule(self.self_ref.clone(), hook, delay);
    }

    /// Persist `player` as a winner of this instance's event.
    pub fn save_winner(&self, player: PlayerId) {
        if !self.is_live() {
            return;
        }
        let Some(directory) = self.directory.upgrade() else {
            return;
        };
        let record = WinnerRecord {
            event: directory.event_name().to_string(),
            instance: self.name.clone(),
            player,
            channel: directory.channel(),
        };
        if let Err(e) = directory.outcomes().record_winner(&record) {
            tracing::error!(
                instance = %self.name,
                player,
                error = %e,
                "failed to persist winner"
            );
        }
    }

    pub(crate) fn dispatch_hook(&self, name: &str, args: &[HookArg]) -> Option<Value> {
        self.dispatcher.dispatch(name, self, args)
    }

    // ---- disposal --------------------------------------------------------

    /// Terminal teardown: invalidates hook dispatch, disposes owned map
    /// instances, clears all state, and frees the name in the directory.
    /// Idempotent; never blocks on an in-flight hook call.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.dispatcher.retire();
        let maps: Vec<Arc<MapInstance>> = {
            let mut map_instances = self.map_instances.lock().unwrap();
            map_instances.drain(..).collect()
        };
        for map in &maps {
            map.dispose();
        }
        self.players.lock().unwrap().clear();
        self.monsters.lock().unwrap().clear();
        self.kill_counts.lock().unwrap().clear();
        self.properties.lock().unwrap().clear();
        *self.timer.lock().unwrap() = None;
        if let Some(directory) = self.directory.upgrade() {
            directory.forget_instance(&self.name);
        }
        tracing::info!(instance = %self.name, "event instance disposed");
    }
}
