pub mod ext;
pub mod primitive;
pub mod serde;

pub use crate::serde::{Deserialize, Error, InternalSizer, Result, Serialize};
pub use primitive::{
    clamp_pitch, quantize_angle, wrap_yaw, BlockPos, Identifier, VarInt, Vec3,
};
