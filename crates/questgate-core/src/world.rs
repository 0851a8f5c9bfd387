use std::collections::HashSet;
use std::sync::Arc;

use crate::geometry::{Direction, Point, Rect};
use crate::ids::{LocationId, PlayerId, TemplateId};

/// A private copy of one world location, bound to a single map instance.
///
/// The world layer owns pathing and spawn-point data; this contract only
/// exposes what movement gating needs: entry-point lookup and repositioning.
pub trait Location: Send + Sync {
    fn id(&self) -> LocationId;

    /// Nearest valid entry point to `near`.
    fn nearest_entry(&self, near: Point) -> Option<Point>;

    /// Nearest valid entry point lying in one of `directions` from `near`.
    fn nearest_entry_toward(&self, near: Point, directions: &HashSet<Direction>) -> Option<Point>;

    /// Reposition a player within this location copy.
    fn warp(&self, player: PlayerId, to: Point);

    /// Shuffle interactive-object placement. Invoked at most once, right
    /// after the copy is first loaded.
    fn shuffle_interactives(&self);

    /// Release the copy when its owning map instance is disposed.
    fn detach_instance(&self);
}

/// Loads (and caches) private location copies.
pub trait LocationFactory: Send + Sync {
    fn get_or_load(&self, id: LocationId) -> Result<Arc<dyn Location>, LocationError>;

    /// Whether `id` has already been loaded by a prior `get_or_load`.
    fn is_loaded(&self, id: LocationId) -> bool;
}

#[derive(Debug)]
pub enum LocationError {
    Unknown(LocationId),
    LoadFailed { id: LocationId, reason: String },
}

impl std::fmt::Display for LocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "unknown location: {id}"),
            Self::LoadFailed { id, reason } => {
                write!(f, "failed to load location {id}: {reason}")
            },
        }
    }
}

impl std::error::Error for LocationError {}

/// A world object used purely as the physical realization of an obstacle.
///
/// Activation spawns the proxy into its owning location; deactivation
/// removes it. The bounding rectangle is fixed for the proxy's lifetime.
pub trait ProxyActor: Send {
    fn template_id(&self) -> TemplateId;

    fn position(&self) -> Point;

    fn set_position(&mut self, to: Point);

    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    fn bounds(&self) -> Rect;

    /// Reset the proxy's internal animation/state tag.
    fn reset_state_tag(&mut self);
}
