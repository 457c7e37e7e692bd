use crate::mappings::packet_ids;
use std::io::Write;
use vane_serializer::{Result, Serialize};

/// The status document, already rendered to JSON by the embedder's
/// `get_status` callback.
#[derive(Clone, Debug)]
pub struct StatusResponse {
    pub json: String,
}

impl Serialize for StatusResponse {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.json.serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct PongResponse {
    pub payload: i64,
}

impl Serialize for PongResponse {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.payload.serialize(writer)
    }
}

packet_ids! {
    StatusResponse = 0x00;
    PongResponse = 0x01;
}
