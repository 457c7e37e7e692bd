//! Binary NBT, the tagged tree format Minecraft uses for chunk storage,
//! registry payloads, and play-phase text components.
//!
//! The codec covers the tag set the protocol actually exchanges: scalars
//! (1-6), strings (8), lists (9), compounds (10), and the int/long arrays
//! (11, 12). Anything else is reported as [`Error::UnknownTag`] with the
//! byte offset the decoder stopped at.

use std::fmt::{Display, Formatter};
use std::string::FromUtf8Error;

pub mod decode;
pub mod encode;
mod infer;

pub use decode::{parse, parse_nameless};
pub use encode::{encode, encode_nameless};
pub use infer::from_json;

pub const TAG_END: u8 = 0;
pub const TAG_BYTE: u8 = 1;
pub const TAG_SHORT: u8 = 2;
pub const TAG_INT: u8 = 3;
pub const TAG_LONG: u8 = 4;
pub const TAG_FLOAT: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_STRING: u8 = 8;
pub const TAG_LIST: u8 = 9;
pub const TAG_COMPOUND: u8 = 10;
pub const TAG_INT_ARRAY: u8 = 11;
pub const TAG_LONG_ARRAY: u8 = 12;

#[derive(Debug)]
pub enum Error {
    /// The payload ended mid-value.
    UnexpectedEnd,
    /// A tag id outside the supported set, with the offset it was read at.
    UnknownTag(u8, usize),
    /// A list whose elements do not share one tag type.
    ListOfMixedTypes,
    /// A string payload holding invalid UTF-8 (Java's mutated CESU-8
    /// corner cases included; they are rejected rather than repaired).
    FromUtf8Error(FromUtf8Error),
    /// A JSON value with no NBT representation (e.g. `null`).
    UnrepresentableJson(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnexpectedEnd => write!(f, "Unexpected end of NBT payload."),
            Error::UnknownTag(tag, offset) => {
                write!(f, "Unknown NBT tag id {} at offset {}.", tag, offset)
            }
            Error::ListOfMixedTypes => {
                write!(f, "NBT lists must hold elements of a single tag type.")
            }
            Error::FromUtf8Error(utf8_error) => {
                write!(f, "Invalid UTF-8 in NBT string: {}", utf8_error)
            }
            Error::UnrepresentableJson(detail) => {
                write!(f, "JSON value has no NBT representation: {}", detail)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<FromUtf8Error> for Error {
    fn from(error: FromUtf8Error) -> Self {
        Error::FromUtf8Error(error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// One node of an NBT tree. Compounds preserve insertion order so that
/// encoding is deterministic.
#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    List(Vec<Tag>),
    Compound(Vec<(String, Tag)>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn tag_id(&self) -> u8 {
        match self {
            Tag::Byte(_) => TAG_BYTE,
            Tag::Short(_) => TAG_SHORT,
            Tag::Int(_) => TAG_INT,
            Tag::Long(_) => TAG_LONG,
            Tag::Float(_) => TAG_FLOAT,
            Tag::Double(_) => TAG_DOUBLE,
            Tag::String(_) => TAG_STRING,
            Tag::List(_) => TAG_LIST,
            Tag::Compound(_) => TAG_COMPOUND,
            Tag::IntArray(_) => TAG_INT_ARRAY,
            Tag::LongArray(_) => TAG_LONG_ARRAY,
        }
    }

    /// Compound member lookup by key; `None` on non-compounds.
    pub fn get(&self, key: &str) -> Option<&Tag> {
        match self {
            Tag::Compound(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, tag)| tag),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Tag::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Tag::Byte(value) => Some(*value as i32),
            Tag::Short(value) => Some(*value as i32),
            Tag::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            Tag::LongArray(values) => Some(values),
            _ => None,
        }
    }
}

/// Convenience constructor for compounds built inline.
pub fn compound<const N: usize>(entries: [(&str, Tag); N]) -> Tag {
    Tag::Compound(
        entries
            .into_iter()
            .map(|(name, tag)| (name.to_string(), tag))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_structure_and_scalar_types() {
        let tree = compound([
            ("byte", Tag::Byte(-7)),
            ("short", Tag::Short(300)),
            ("int", Tag::Int(70000)),
            ("long", Tag::Long(1 << 40)),
            ("float", Tag::Float(0.5)),
            ("double", Tag::Double(-2.25)),
            ("string", Tag::String("hello".to_string())),
            (
                "list",
                Tag::List(vec![Tag::Int(1), Tag::Int(2), Tag::Int(3)]),
            ),
            (
                "nested",
                compound([("inner", Tag::String("deep".to_string()))]),
            ),
            ("ints", Tag::IntArray(vec![1, -1, i32::MAX])),
            ("longs", Tag::LongArray(vec![i64::MIN, 0, i64::MAX])),
        ]);

        let bytes = encode("root", &tree).unwrap();
        let (name, decoded, offset) = parse(&bytes).unwrap();
        assert_eq!(name, "root");
        assert_eq!(decoded, tree);
        assert_eq!(offset, bytes.len());
    }

    #[test]
    fn nameless_root_round_trips() {
        let tree = compound([("translate", Tag::String("disconnect.timeout".to_string()))]);
        let bytes = encode_nameless(&tree).unwrap();
        let (decoded, offset) = parse_nameless(&bytes).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(offset, bytes.len());
    }

    #[test]
    fn unknown_tags_carry_their_offset() {
        // Root compound, one entry tagged 7 (byte array, unsupported).
        let bytes = [10, 0, 0, 7, 0, 1, b'x'];
        match parse(&bytes) {
            // The unsupported tag byte sits at index 3.
            Err(Error::UnknownTag(7, offset)) => assert_eq!(offset, 3),
            other => panic!("expected UnknownTag, got {:?}", other),
        }
    }

    #[test]
    fn mixed_lists_fail_to_encode() {
        let tree = compound([("bad", Tag::List(vec![Tag::Int(1), Tag::Byte(2)]))]);
        assert!(matches!(
            encode("root", &tree),
            Err(Error::ListOfMixedTypes)
        ));
    }

    #[test]
    fn empty_list_encodes_with_end_tag_type() {
        let tree = compound([("empty", Tag::List(Vec::new()))]);
        let bytes = encode("", &tree).unwrap();
        let (_, decoded, _) = parse(&bytes).unwrap();
        assert_eq!(decoded.get("empty"), Some(&Tag::List(Vec::new())));
    }

    #[test]
    fn truncated_payload_is_unexpected_end() {
        let tree = compound([("long", Tag::Long(12345))]);
        let bytes = encode("root", &tree).unwrap();
        assert!(matches!(
            parse(&bytes[..bytes.len() - 2]),
            Err(Error::UnexpectedEnd)
        ));
    }
}
