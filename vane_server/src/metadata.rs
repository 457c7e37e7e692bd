//! Entity metadata assembly. Each entry is `(index: u8, type: varint,
//! value)`; the list terminates with 0xFF.

use vane_serializer::{Serialize, VarInt};

const TYPE_BYTE: i32 = 0;
const TYPE_POSE: i32 = 21;

const INDEX_ENTITY_FLAGS: u8 = 0;
const INDEX_POSE: u8 = 6;
const INDEX_SKIN_LAYERS: u8 = 17;
const INDEX_MAIN_HAND: u8 = 18;

const FLAG_SNEAKING: u8 = 0x02;
const FLAG_SPRINTING: u8 = 0x08;

pub const POSE_STANDING: i32 = 0;
pub const POSE_SNEAKING: i32 = 5;

const TERMINATOR: u8 = 0xFF;

pub struct EntityDataBuilder {
    out: Vec<u8>,
}

impl EntityDataBuilder {
    pub fn new() -> EntityDataBuilder {
        EntityDataBuilder { out: Vec::new() }
    }

    pub fn byte(mut self, index: u8, value: u8) -> Self {
        self.out.push(index);
        let _ = VarInt::from(TYPE_BYTE).serialize(&mut self.out);
        self.out.push(value);
        self
    }

    pub fn pose(mut self, pose: i32) -> Self {
        self.out.push(INDEX_POSE);
        let _ = VarInt::from(TYPE_POSE).serialize(&mut self.out);
        let _ = VarInt::from(pose).serialize(&mut self.out);
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.out.push(TERMINATOR);
        self.out
    }
}

impl Default for EntityDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The metadata set a player broadcasts: posture flags, pose, skin
/// layers, and main hand.
pub fn player_metadata(skin_layers: u8, main_hand: u8, sneaking: bool, sprinting: bool) -> Vec<u8> {
    let mut flags = 0u8;
    if sneaking {
        flags |= FLAG_SNEAKING;
    }
    if sprinting {
        flags |= FLAG_SPRINTING;
    }
    EntityDataBuilder::new()
        .byte(INDEX_ENTITY_FLAGS, flags)
        .pose(if sneaking { POSE_SNEAKING } else { POSE_STANDING })
        .byte(INDEX_SKIN_LAYERS, skin_layers)
        .byte(INDEX_MAIN_HAND, main_hand)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_terminates_and_orders_entries() {
        let data = player_metadata(0x7F, 1, true, false);
        assert_eq!(*data.last().unwrap(), 0xFF);
        assert_eq!(data[0], INDEX_ENTITY_FLAGS);
        assert_eq!(data[2], FLAG_SNEAKING);
        // pose entry follows: index 6, type 21, value 5
        assert_eq!(data[3], INDEX_POSE);
        assert_eq!(data[4], 21);
        assert_eq!(data[5], POSE_SNEAKING as u8);
    }
}
