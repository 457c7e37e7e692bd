use std::fmt::{Display, Formatter};
use vane_serializer::{BlockPos, Identifier};

#[derive(Debug)]
pub enum Error {
    /// A section needed more than 8 bits per entry.
    PaletteOverflow,
    /// A region chunk used a compression scheme other than zlib (2).
    UnsupportedChunkCompression(u8),
    /// A block position outside the chunk's vertical range.
    PositionOutOfRange(BlockPos),
    /// A layer or palette block with no state-table entry.
    UnknownBlock(Identifier),
    /// A region chunk NBT tree missing a required field.
    MissingField(&'static str),
    NbtError(vane_nbt::Error),
    IoError(std::io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::PaletteOverflow => {
                write!(f, "Section palette exceeded the 8-bit indirect ceiling.")
            }
            Error::UnsupportedChunkCompression(scheme) => {
                write!(f, "Unsupported region chunk compression scheme {}.", scheme)
            }
            Error::PositionOutOfRange(pos) => {
                write!(f, "Block position {} is outside the chunk column.", pos)
            }
            Error::UnknownBlock(block) => {
                write!(f, "Block {} has no entry in the state table.", block)
            }
            Error::MissingField(field) => {
                write!(f, "Region chunk data is missing `{}`.", field)
            }
            Error::NbtError(nbt) => write!(f, "{}", nbt),
            Error::IoError(io_error) => write!(f, "{}", io_error),
        }
    }
}

impl std::error::Error for Error {}

impl From<vane_nbt::Error> for Error {
    fn from(error: vane_nbt::Error) -> Self {
        Error::NbtError(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IoError(error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
