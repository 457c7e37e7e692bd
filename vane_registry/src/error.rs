use std::fmt::{Display, Formatter};

/// The five wire dialects. Wait-ack sub-states are a connection-level
/// refinement; on the wire they speak the dialect named here.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ProtocolState {
    Handshake,
    Status,
    Login,
    Configuration,
    Play,
}

impl Display for ProtocolState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug)]
pub enum Error {
    /// A packet id with no handler in the current state. Fatal to the
    /// connection; no state transition occurs.
    UnexpectedPacket(ProtocolState, i32),
    SerializerError(vane_serializer::Error),
    NbtError(vane_nbt::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnexpectedPacket(state, id) => {
                write!(f, "Unexpected packet id {:#04x} in state {}.", id, state)
            }
            Error::SerializerError(serde) => write!(f, "{}", serde),
            Error::NbtError(nbt) => write!(f, "{}", nbt),
        }
    }
}

impl std::error::Error for Error {}

impl From<vane_serializer::Error> for Error {
    fn from(error: vane_serializer::Error) -> Self {
        Error::SerializerError(error)
    }
}

impl From<vane_nbt::Error> for Error {
    fn from(error: vane_nbt::Error) -> Self {
        Error::NbtError(error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
