use uuid::Uuid;
use vane_serializer::{Identifier, Vec3};

/// A non-player entity owned by a dimension. The core only announces
/// these to joining players; it never moves them.
#[derive(Clone, Debug)]
pub struct EntityState {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub kind: Identifier,
    pub entity_type: i32,
    pub position: Vec3,
    /// `[0, 360)`.
    pub yaw: f32,
    /// `[-90, 90]`.
    pub pitch: f32,
}

impl EntityState {
    pub fn new(
        entity_id: i32,
        kind: Identifier,
        entity_type: i32,
        position: Vec3,
    ) -> EntityState {
        EntityState {
            entity_id,
            uuid: Uuid::new_v4(),
            kind,
            entity_type,
            position,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}
