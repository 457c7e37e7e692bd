use std::fmt::{Display, Formatter};
use vane_serializer::Identifier;

#[derive(Debug)]
pub enum Error {
    /// A mutator ran after `finalize`.
    RegistryFrozen,
    /// `get_network_data`/`get_network_tags` ran before `finalize`.
    NotFinalized,
    /// A `#reference` walk revisited a tag.
    CircularTag(Identifier, Identifier),
    /// A `#reference` named a tag that does not exist in its category.
    UnknownTagReference(Identifier, String),
    /// A tag value named an entry absent from the category's id map.
    UnknownTagEntry(Identifier, Identifier, String),
    JsonError(serde_json::Error),
    NbtError(vane_nbt::Error),
    PacketError(vane_registry::Error),
    MalformedData(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::RegistryFrozen => {
                write!(f, "The registry is frozen; mutation after finalize is not allowed.")
            }
            Error::NotFinalized => {
                write!(f, "Network packets are only available after finalize.")
            }
            Error::CircularTag(category, tag) => {
                write!(f, "Circular tag reference in {} at {}.", category, tag)
            }
            Error::UnknownTagReference(category, reference) => {
                write!(f, "Tag reference {} does not exist in {}.", reference, category)
            }
            Error::UnknownTagEntry(category, tag, value) => write!(
                f,
                "Tag {} in {} names unknown entry {}.",
                tag, category, value
            ),
            Error::JsonError(json) => write!(f, "{}", json),
            Error::NbtError(nbt) => write!(f, "{}", nbt),
            Error::PacketError(packet) => write!(f, "{}", packet),
            Error::MalformedData(detail) => write!(f, "Malformed registry data: {}", detail),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::JsonError(error)
    }
}

impl From<vane_nbt::Error> for Error {
    fn from(error: vane_nbt::Error) -> Self {
        Error::NbtError(error)
    }
}

impl From<vane_registry::Error> for Error {
    fn from(error: vane_registry::Error) -> Self {
        Error::PacketError(error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
