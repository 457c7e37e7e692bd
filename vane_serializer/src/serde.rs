use std::fmt::{Display, Formatter};
use std::io::{Read, Write};
use std::num::TryFromIntError;
use std::string::FromUtf8Error;

/// Defines an error type generic over the possible failures coming out of
/// wire serialization. Short reads are always reported as `UnexpectedEnd`
/// so framing code can distinguish "wait for more bytes" from corruption.
#[derive(Debug)]
pub enum Error {
    /// The reader ran out of bytes mid-value.
    UnexpectedEnd,
    /// The bytes were present but did not form a legal value.
    Malformed(String),
    /// An underlying `std::io::Error` other than a short read.
    IoError(std::io::Error),
    /// A length or index did not fit the target integer width.
    TryFromIntError(TryFromIntError),
    /// A length-prefixed string held invalid UTF-8.
    FromUtf8Error(FromUtf8Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnexpectedEnd => write!(f, "Unexpected end of buffer during deserialization."),
            Error::Malformed(detail) => write!(f, "Malformed wire data: {}", detail),
            Error::IoError(io_error) => write!(f, "Io error during serialization: {}", io_error),
            Error::TryFromIntError(int_error) => {
                write!(f, "Integer conversion failed during serialization: {}", int_error)
            }
            Error::FromUtf8Error(utf8_error) => {
                write!(f, "Failed to parse utf8 string data: {}", utf8_error)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEnd
        } else {
            Error::IoError(error)
        }
    }
}

impl From<TryFromIntError> for Error {
    fn from(error: TryFromIntError) -> Self {
        Error::TryFromIntError(error)
    }
}

impl From<FromUtf8Error> for Error {
    fn from(error: FromUtf8Error) -> Self {
        Error::FromUtf8Error(error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents an object which is serializable based on the Minecraft
/// big-endian wire specification.
pub trait Serialize {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()>;

    /// The exact number of bytes `serialize` will emit. Used to
    /// pre-condition buffers holding the serialized form. Scalars override
    /// this with constants; composites fall back to a counting pass.
    fn size(&self) -> Result<i32> {
        let mut sizer = InternalSizer::default();
        self.serialize(&mut sizer)?;
        Ok(sizer.current_size())
    }
}

/// Used for sizing values which don't pre-broadcast their encoded length.
#[derive(Default)]
pub struct InternalSizer {
    current_size: i32,
}

impl InternalSizer {
    pub fn current_size(&self) -> i32 {
        self.current_size
    }
}

impl Write for InternalSizer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.current_size += buf.len() as i32;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Represents an object which is deserializable based on the Minecraft
/// big-endian wire specification.
pub trait Deserialize: Sized {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self>;
}
