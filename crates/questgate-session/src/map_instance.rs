use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;

use questgate_core::geometry::Point;
use questgate_core::ids::{LocationId, ObstacleId, PlayerId};
use questgate_core::world::{Location, ProxyActor};

use crate::instance::EventInstance;
use crate::obstacle::{Obstacle, ObstacleConfig, ObstacleError};
use crate::script::HookArg;

/// One private location copy owned by an event instance: movement gating,
/// per-player property bags, and the obstacle registry.
///
/// Obstacles are owned exclusively by the map instance and disposed with it.
pub struct MapInstance {
    owner: Weak<EventInstance>,
    location: Arc<dyn Location>,
    obstacles: Mutex<HashMap<ObstacleId, Obstacle>>,
    player_properties: Mutex<HashMap<PlayerId, HashMap<String, Value>>>,
    last_positions: Mutex<HashMap<PlayerId, Point>>,
    movement_listening: AtomicBool,
    level_limit: AtomicI32,
    disposed: AtomicBool,
}

impl MapInstance {
    pub(crate) fn new(owner: Weak<EventInstance>, location: Arc<dyn Location>) -> Self {
        Self {
            owner,
            location,
            obstacles: Mutex::new(HashMap::new()),
            player_properties: Mutex::new(HashMap::new()),
            last_positions: Mutex::new(HashMap::new()),
            movement_listening: AtomicBool::new(false),
            level_limit: AtomicI32::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn location_id(&self) -> LocationId {
        self.location.id()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    // ---- movement gating -------------------------------------------------

    pub fn listen_for_movement(&self) {
        if !self.is_disposed() {
            self.movement_listening.store(true, Ordering::Release);
        }
    }

    pub fn stop_listening(&self) {
        self.movement_listening.store(false, Ordering::Release);
    }

    pub fn is_listening(&self) -> bool {
        self.movement_listening.load(Ordering::Acquire)
    }

    /// Handle one movement event for `player` at `position`.
    ///
    /// At most the first closed obstacle containing `position` reacts: a
    /// player with no recorded history is treated as having spawned inside
    /// and is kicked back to the nearest entry point; otherwise a fresh
    /// crossing relocates the player through the nearest entry point in one
    /// of the crossing directions. Either reaction fires the
    /// `playerHitObstacle` hook. The player's last position is recorded
    /// afterward regardless of outcome.
    pub fn on_movement(&self, player: PlayerId, position: Point) {
        if self.is_disposed() || !self.is_listening() {
            return;
        }
        let previous = self.last_positions.lock().unwrap().get(&player).copied();
        let mut hit = None;
        {
            let obstacles = self.obstacles.lock().unwrap();
            for (&id, obstacle) in obstacles.iter() {
                if obstacle.is_open() || !obstacle.rect().contains(position) {
                    continue;
                }
                match previous {
                    None => {
                        if let Some(entry) = self.location.nearest_entry(position) {
                            self.location.warp(player, entry);
                        }
                        hit = Some(id);
                    },
                    Some(prev) => {
                        if obstacle.rect().contains(prev) {
                            // Already inside this obstacle; not a fresh entry.
                            continue;
                        }
                        let directions = obstacle.collision(prev, position);
                        if !directions.is_empty()
                            && let Some(exit) =
                                self.location.nearest_entry_toward(position, &directions)
                        {
                            self.location.warp(player, exit);
                        }
                        hit = Some(id);
                    },
                }
                break;
            }
        }
        if let Some(id) = hit {
            tracing::debug!(player, obstacle = id, "player hit obstacle");
            self.dispatch(
                "playerHitObstacle",
                &[HookArg::Player(player), HookArg::Obstacle(id)],
            );
        }
        self.last_positions.lock().unwrap().insert(player, position);
    }

    // ---- per-player properties -------------------------------------------

    pub fn set_player_property(&self, player: PlayerId, key: &str, value: Value) {
        if self.is_disposed() || !self.is_member(player) {
            return;
        }
        self.player_properties
            .lock()
            .unwrap()
            .entry(player)
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn set_player_property_if_absent(&self, player: PlayerId, key: &str, value: Value) {
        if self.is_disposed() || !self.is_member(player) {
            return;
        }
        self.player_properties
            .lock()
            .unwrap()
            .entry(player)
            .or_default()
            .entry(key.to_string())
            .or_insert(value);
    }

    /// Set `key` for every current member of the owning instance.
    pub fn set_property_for_all(&self, key: &str, value: Value) {
        if self.is_disposed() {
            return;
        }
        let Some(owner) = self.owner.upgrade() else {
            return;
        };
        // Snapshot membership before taking the table lock.
        let members = owner.players();
        let mut properties = self.player_properties.lock().unwrap();
        for player in members {
            properties
                .entry(player)
                .or_default()
                .insert(key.to_string(), value.clone());
        }
    }

    /// Reads never create a per-player table.
    pub fn player_property(&self, player: PlayerId, key: &str) -> Option<Value> {
        self.player_properties
            .lock()
            .unwrap()
            .get(&player)
            .and_then(|table| table.get(key))
            .cloned()
    }

    pub fn player_has_property(&self, player: PlayerId, key: &str) -> bool {
        self.player_properties
            .lock()
            .unwrap()
            .get(&player)
            .is_some_and(|table| table.contains_key(key))
    }

    /// Whether any member's table holds `key`.
    pub fn property_exists(&self, key: &str) -> bool {
        self.player_properties
            .lock()
            .unwrap()
            .values()
            .any(|table| table.contains_key(key))
    }

    pub fn players_with_property(&self, key: &str) -> HashSet<PlayerId> {
        self.player_properties
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, table)| table.contains_key(key))
            .map(|(&player, _)| player)
            .collect()
    }

    // ---- obstacle registry -----------------------------------------------

    /// Register an obstacle under `id`, validating its configuration.
    /// Replaces any previous obstacle with the same id.
    pub fn register_obstacle(
        &self,
        id: ObstacleId,
        proxy: Box<dyn ProxyActor>,
        config: ObstacleConfig,
    ) -> Result<(), ObstacleError> {
        if self.is_disposed() {
            return Ok(());
        }
        let obstacle = Obstacle::new(proxy, config)?;
        if let Some(previous) = self.obstacles.lock().unwrap().insert(id, obstacle) {
            previous.dispose();
        }
        Ok(())
    }

    pub fn remove_obstacle(&self, id: ObstacleId) -> bool {
        let removed = self.obstacles.lock().unwrap().remove(&id);
        match removed {
            Some(obstacle) => {
                obstacle.dispose();
                true
            },
            None => false,
        }
    }

    pub fn obstacle_is_open(&self, id: ObstacleId) -> Option<bool> {
        self.obstacles
            .lock()
            .unwrap()
            .get(&id)
            .map(Obstacle::is_open)
    }

    pub fn open_all_obstacles(&self) {
        self.for_each_obstacle(Obstacle::open);
    }

    pub fn close_all_obstacles(&self) {
        self.for_each_obstacle(Obstacle::close);
    }

    pub fn toggle_all_obstacles(&self) {
        self.for_each_obstacle(Obstacle::toggle);
    }

    pub fn reset_all_obstacles(&self) {
        self.for_each_obstacle(Obstacle::reset);
    }

    pub fn remove_all_obstacles(&self) {
        let drained: Vec<Obstacle> = {
            let mut obstacles = self.obstacles.lock().unwrap();
            obstacles.drain().map(|(_, o)| o).collect()
        };
        for obstacle in &drained {
            obstacle.dispose();
        }
    }

    fn for_each_obstacle(&self, op: impl Fn(&Obstacle)) {
        if self.is_disposed() {
            return;
        }
        for obstacle in self.obstacles.lock().unwrap().values() {
            op(obstacle);
        }
    }

    // ---- level limit -----------------------------------------------------

    pub fn level_limit(&self) -> i32 {
        self.level_limit.load(Ordering::Acquire)
    }

    pub fn set_level_limit(&self, limit: i32) {
        if !self.is_disposed() {
            self.level_limit.store(limit, Ordering::Release);
        }
    }

    // ---- disposal --------------------------------------------------------

    /// Detach from the owning instance, release the location copy, clear
    /// all per-player state, dispose the obstacles, and fire the `dispose`
    /// hook. Idempotent.
    pub fn dispose(self: &Arc<Self>) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.movement_listening.store(false, Ordering::Release);
        if let Some(owner) = self.owner.upgrade() {
            owner.forget_map_instance(self);
        }
        self.location.detach_instance();
        self.player_properties.lock().unwrap().clear();
        self.last_positions.lock().unwrap().clear();
        self.remove_all_obstacles();
        self.dispatch("dispose", &[]);
    }

    fn is_member(&self, player: PlayerId) -> bool {
        self.owner
            .upgrade()
            .is_some_and(|instance| instance.has_player(player))
    }

    fn dispatch(&self, name: &str, args: &[HookArg]) {
        if let Some(owner) = self.owner.upgrade() {
            owner.dispatch_hook(name, args);
        }
    }
}
