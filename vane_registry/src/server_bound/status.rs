use crate::{Error, ProtocolState, Result};
use std::io::Read;
use vane_serializer::{Deserialize, VarInt};

pub const STATUS_REQUEST: i32 = 0x00;
pub const PING_REQUEST: i32 = 0x01;

#[derive(Clone, Debug)]
pub struct StatusRequest;

/// Eight opaque bytes the client expects echoed back verbatim.
#[derive(Clone, Debug)]
pub struct PingRequest {
    pub payload: i64,
}

#[derive(Debug)]
pub enum ServerboundStatus {
    StatusRequest(StatusRequest),
    PingRequest(PingRequest),
}

impl ServerboundStatus {
    pub fn decode<R: Read>(id: VarInt, reader: &mut R) -> Result<Self> {
        match id.val() {
            STATUS_REQUEST => Ok(Self::StatusRequest(StatusRequest)),
            PING_REQUEST => Ok(Self::PingRequest(PingRequest {
                payload: i64::deserialize(reader)?,
            })),
            other => Err(Error::UnexpectedPacket(ProtocolState::Status, other)),
        }
    }
}
