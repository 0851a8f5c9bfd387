pub mod geometry;
pub mod ids;
pub mod outcome;
pub mod world;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::geometry::{Direction, Point, Rect};
    use crate::ids::{LocationId, PlayerId, TemplateId};
    use crate::outcome::{OutcomeError, OutcomeStore, WinnerRecord};
    use crate::world::{Location, LocationError, LocationFactory, ProxyActor};

    /// In-memory location copy that records warps and answers entry-point
    /// queries from a fixed list.
    pub struct FakeLocation {
        id: LocationId,
        entries: Vec<Point>,
        warps: Mutex<Vec<(PlayerId, Point)>>,
        shuffled: AtomicBool,
        detached: AtomicBool,
    }

    impl FakeLocation {
        pub fn new(id: LocationId, entries: Vec<Point>) -> Arc<Self> {
            Arc::new(Self {
                id,
                entries,
                warps: Mutex::new(Vec::new()),
                shuffled: AtomicBool::new(false),
                detached: AtomicBool::new(false),
            })
        }

        /// All warps recorded so far, in order.
        pub fn warps(&self) -> Vec<(PlayerId, Point)> {
            self.warps.lock().unwrap().clone()
        }

        pub fn was_shuffled(&self) -> bool {
            self.shuffled.load(Ordering::Acquire)
        }

        pub fn was_detached(&self) -> bool {
            self.detached.load(Ordering::Acquire)
        }
    }

    impl Location for FakeLocation {
        fn id(&self) -> LocationId {
            self.id
        }

        fn nearest_entry(&self, near: Point) -> Option<Point> {
            self.entries
                .iter()
                .copied()
                .min_by_key(|e| e.distance_sq(near))
        }

        fn nearest_entry_toward(
            &self,
            near: Point,
            directions: &HashSet<Direction>,
        ) -> Option<Point> {
            self.entries
                .iter()
                .copied()
                .filter(|e| {
                    let dx = i64::from(e.x - near.x);
                    let dy = i64::from(e.y - near.y);
                    directions.iter().any(|d| {
                        let (ux, uy) = d.unit();
                        dx * ux + dy * uy > 0
                    })
                })
                .min_by_key(|e| e.distance_sq(near))
        }

        fn warp(&self, player: PlayerId, to: Point) {
            self.warps.lock().unwrap().push((player, to));
        }

        fn shuffle_interactives(&self) {
            self.shuffled.store(true, Ordering::Release);
        }

        fn detach_instance(&self) {
            self.detached.store(true, Ordering::Release);
        }
    }

    /// Factory over a fixed set of [`FakeLocation`]s, tracking first loads.
    #[derive(Default)]
    pub struct FakeLocationFactory {
        locations: Mutex<HashMap<LocationId, Arc<FakeLocation>>>,
        loaded: Mutex<HashSet<LocationId>>,
    }

    impl FakeLocationFactory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, location: Arc<FakeLocation>) {
            self.locations
                .lock()
                .unwrap()
                .insert(location.id(), location);
        }
    }

    impl LocationFactory for FakeLocationFactory {
        fn get_or_load(&self, id: LocationId) -> Result<Arc<dyn Location>, LocationError> {
            let location = self
                .locations
                .lock()
                .unwrap()
                .get(&id)
                .map(Arc::clone)
                .ok_or(LocationError::Unknown(id))?;
            self.loaded.lock().unwrap().insert(id);
            Ok(location)
        }

        fn is_loaded(&self, id: LocationId) -> bool {
            self.loaded.lock().unwrap().contains(&id)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct FakeProxyState {
        position: Point,
        active: bool,
        resets: usize,
    }

    /// Proxy actor with externally observable state via [`ProxyProbe`].
    pub struct FakeProxy {
        template: TemplateId,
        rect: Rect,
        state: Arc<Mutex<FakeProxyState>>,
    }

    /// Shared view of a [`FakeProxy`]'s state for assertions.
    #[derive(Clone)]
    pub struct ProxyProbe {
        state: Arc<Mutex<FakeProxyState>>,
    }

    impl ProxyProbe {
        pub fn position(&self) -> Point {
            self.state.lock().unwrap().position
        }

        pub fn is_active(&self) -> bool {
            self.state.lock().unwrap().active
        }

        pub fn resets(&self) -> usize {
            self.state.lock().unwrap().resets
        }
    }

    impl FakeProxy {
        /// An inactive proxy whose bounding rectangle is `rect`.
        pub fn new(template: TemplateId, rect: Rect) -> (Self, ProxyProbe) {
            let state = Arc::new(Mutex::new(FakeProxyState {
                position: Point::default(),
                active: false,
                resets: 0,
            }));
            let probe = ProxyProbe {
                state: Arc::clone(&state),
            };
            (
                Self {
                    template,
                    rect,
                    state,
                },
                probe,
            )
        }
    }

    impl ProxyActor for FakeProxy {
        fn template_id(&self) -> TemplateId {
            self.template
        }

        fn position(&self) -> Point {
            self.state.lock().unwrap().position
        }

        fn set_position(&mut self, to: Point) {
            self.state.lock().unwrap().position = to;
        }

        fn is_active(&self) -> bool {
            self.state.lock().unwrap().active
        }

        fn set_active(&mut self, active: bool) {
            self.state.lock().unwrap().active = active;
        }

        fn bounds(&self) -> Rect {
            self.rect
        }

        fn reset_state_tag(&mut self) {
            self.state.lock().unwrap().resets += 1;
        }
    }

    /// Outcome store that appends records to memory; optionally fails.
    #[derive(Default)]
    pub struct MemoryOutcomeStore {
        records: Mutex<Vec<WinnerRecord>>,
        failures: AtomicUsize,
        fail_writes: AtomicBool,
    }

    impl MemoryOutcomeStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn records(&self) -> Vec<WinnerRecord> {
            self.records.lock().unwrap().clone()
        }

        pub fn failures(&self) -> usize {
            self.failures.load(Ordering::Acquire)
        }

        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::Release);
        }
    }

    impl OutcomeStore for MemoryOutcomeStore {
        fn record_winner(&self, record: &WinnerRecord) -> Result<(), OutcomeError> {
            if self.fail_writes.load(Ordering::Acquire) {
                self.failures.fetch_add(1, Ordering::AcqRel);
                return Err(OutcomeError::WriteFailed("store in failure mode".into()));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }
}
