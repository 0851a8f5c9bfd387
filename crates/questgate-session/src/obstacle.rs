use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use questgate_core::geometry::{Direction, Point, Rect, entry_vector};
use questgate_core::ids::TemplateId;
use questgate_core::world::ProxyActor;

/// Construction parameters for an [`Obstacle`].
///
/// `open_position: None` makes opening destroy the proxy instead of
/// relocating it; a later `close` respawns it at `closed_position`.
#[derive(Debug, Clone)]
pub struct ObstacleConfig {
    pub closed_position: Point,
    pub open_position: Option<Point>,
    pub default_closed: bool,
    pub directions: HashSet<Direction>,
}

impl ObstacleConfig {
    /// Closed-by-default obstacle reacting to all four directions.
    pub fn closed_at(closed_position: Point) -> Self {
        Self {
            closed_position,
            open_position: None,
            default_closed: true,
            directions: Direction::all(),
        }
    }

    pub fn with_open_position(mut self, open: Point) -> Self {
        self.open_position = Some(open);
        self
    }

    pub fn with_default_closed(mut self, default_closed: bool) -> Self {
        self.default_closed = default_closed;
        self
    }

    pub fn with_directions(mut self, directions: HashSet<Direction>) -> Self {
        self.directions = directions;
        self
    }
}

#[derive(Debug)]
pub enum ObstacleError {
    /// The proxy's bounding rectangle has no interior.
    DegenerateBounds(Rect),
}

impl std::fmt::Display for ObstacleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DegenerateBounds(r) => {
                write!(
                    f,
                    "obstacle bounding rectangle has no interior: {}x{} at ({}, {})",
                    r.width, r.height, r.x, r.y
                )
            },
        }
    }
}

impl std::error::Error for ObstacleError {}

/// A rectangular gate realized by a single proxy actor.
///
/// The proxy's liveness and position together encode the logical state:
/// open means the proxy is inactive, or relocated to `open_position` when
/// one is configured. At most one proxy exists per obstacle.
pub struct Obstacle {
    proxy: Mutex<Box<dyn ProxyActor>>,
    rect: Rect,
    template: TemplateId,
    closed_position: Point,
    open_position: Option<Point>,
    default_closed: AtomicBool,
    directions: HashSet<Direction>,
}

impl Obstacle {
    /// Validates the bounding rectangle and performs the initial proxy
    /// placement per `default_closed`.
    pub fn new(mut proxy: Box<dyn ProxyActor>, config: ObstacleConfig) -> Result<Self, ObstacleError> {
        let rect = proxy.bounds();
        if rect.is_degenerate() {
            return Err(ObstacleError::DegenerateBounds(rect));
        }
        match config.open_position {
            Some(open) => {
                proxy.set_position(if config.default_closed {
                    config.closed_position
                } else {
                    open
                });
                proxy.set_active(true);
            },
            None => {
                proxy.set_position(config.closed_position);
                proxy.set_active(config.default_closed);
            },
        }
        Ok(Self {
            template: proxy.template_id(),
            proxy: Mutex::new(proxy),
            rect,
            closed_position: config.closed_position,
            open_position: config.open_position,
            default_closed: AtomicBool::new(config.default_closed),
            directions: config.directions,
        })
    }

    /// Open the gate: remove the proxy, then respawn it at `open_position`
    /// when one is configured.
    pub fn open(&self) {
        let mut proxy = self.proxy.lock().unwrap();
        if proxy.is_active() {
            proxy.set_active(false);
        }
        if let Some(open) = self.open_position {
            proxy.set_position(open);
            proxy.reset_state_tag();
            proxy.set_active(true);
        }
    }

    /// Close the gate: always ends with an active proxy at `closed_position`.
    pub fn close(&self) {
        let mut proxy = self.proxy.lock().unwrap();
        proxy.set_position(self.closed_position);
        if !proxy.is_active() {
            proxy.reset_state_tag();
            proxy.set_active(true);
        }
    }

    pub fn toggle(&self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn reset(&self) {
        if self.is_default_closed() {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn is_open(&self) -> bool {
        let proxy = self.proxy.lock().unwrap();
        !proxy.is_active() || self.open_position == Some(proxy.position())
    }

    /// Directions a fresh crossing from `prev` to `cur` entered from,
    /// restricted to the directions this obstacle reacts to.
    pub fn collision(&self, prev: Point, cur: Point) -> HashSet<Direction> {
        match entry_vector(&self.rect, prev, cur) {
            None => HashSet::new(),
            Some((vx, vy)) => self
                .directions
                .iter()
                .copied()
                .filter(|d| {
                    let (ux, uy) = d.unit();
                    vx * ux + vy * uy != 0
                })
                .collect(),
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn template_id(&self) -> TemplateId {
        self.template
    }

    pub fn is_default_closed(&self) -> bool {
        self.default_closed.load(Ordering::Acquire)
    }

    pub fn set_default_closed(&self, default_closed: bool) {
        self.default_closed.store(default_closed, Ordering::Release);
    }

    /// Remove the proxy from the world. The obstacle is unusable afterward.
    pub fn dispose(&self) {
        let mut proxy = self.proxy.lock().unwrap();
        if proxy.is_active() {
            proxy.set_active(false);
        }
    }
}
