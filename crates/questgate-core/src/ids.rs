/// Unique identifier for a player in the world.
pub type PlayerId = u64;

/// Unique identifier for a spawned non-player actor (monster).
pub type ActorId = u64;

/// Identifier of an obstacle within one map instance.
pub type ObstacleId = u32;

/// Identifier of a location in the persistent world.
pub type LocationId = u32;

/// Identifier of a proxy-actor template.
pub type TemplateId = u32;
