use crate::primitive::VarInt;
use crate::serde::{Deserialize, Result, Serialize};
use std::io::{Read, Write};

/// A greedy `Vec<T>` consumes the reader to its end. Packet bodies are
/// handed to handlers as bounded cursors, so "to the end" means "to the
/// end of the current packet".
impl<T: Deserialize> Deserialize for Vec<T> {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let mut remaining_bytes = Vec::new();
        let length = reader.read_to_end(&mut remaining_bytes)? as u64;
        let mut cursor = std::io::Cursor::new(remaining_bytes);

        let mut items: Vec<T> = Vec::new();
        while cursor.position() < length {
            items.push(T::deserialize(&mut cursor)?);
        }
        Ok(items)
    }
}

impl<T: Serialize> Serialize for Vec<T> {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        for item in self {
            item.serialize(writer)?;
        }
        Ok(())
    }

    fn size(&self) -> Result<i32> {
        self.iter().try_fold(0, |total, item| Ok(total + item.size()?))
    }
}

/// A `(VarInt, Vec<T>)` pair is the length-prefixed collection form; the
/// varint is read first and bounds the element count.
impl<T: Deserialize> Deserialize for (VarInt, Vec<T>) {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let length = VarInt::deserialize(reader)?;
        let mut items = Vec::with_capacity(usize::try_from(length)?);
        for _ in 0..length.val() {
            items.push(T::deserialize(reader)?);
        }
        Ok((length, items))
    }
}

impl<T: Serialize> Serialize for (VarInt, Vec<T>) {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.0.serialize(writer)?;
        self.1.serialize(writer)
    }

    fn size(&self) -> Result<i32> {
        Ok(self.0.size()? + self.1.size()?)
    }
}

/// A flag-prefixed optional: one boolean, then the value when present.
impl<T: Deserialize> Deserialize for (bool, Option<T>) {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let present = bool::deserialize(reader)?;
        if present {
            Ok((true, Some(T::deserialize(reader)?)))
        } else {
            Ok((false, None))
        }
    }
}

impl<T: Serialize> Serialize for (bool, Option<T>) {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.0.serialize(writer)?;
        match &self.1 {
            Some(item) => item.serialize(writer),
            None => Ok(()),
        }
    }

    fn size(&self) -> Result<i32> {
        match &self.1 {
            Some(item) => Ok(1 + item.size()?),
            None => Ok(1),
        }
    }
}

/// Reads a varint-length-prefixed byte payload.
pub fn read_byte_array<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let length = usize::try_from(VarInt::deserialize(reader)?)?;
    let mut bytes = vec![0u8; length];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Writes a varint-length-prefixed byte payload.
pub fn write_byte_array<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    VarInt::try_from(bytes.len())?.serialize(writer)?;
    writer.write_all(bytes)?;
    Ok(())
}

/// Reads whatever bytes remain in the current packet body.
pub fn read_remaining<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

pub fn byte_array_size(bytes: &[u8]) -> Result<i32> {
    Ok(VarInt::try_from(bytes.len())?.size()? + bytes.len() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn prefixed_collections_round_trip() {
        let original = (VarInt::from(3), vec![5i32, -1, 1000]);
        let mut buffer = Vec::new();
        original.serialize(&mut buffer).unwrap();
        let decoded: (VarInt, Vec<i32>) =
            Deserialize::deserialize(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(decoded.1, original.1);
    }

    #[test]
    fn flagged_options_round_trip() {
        let mut buffer = Vec::new();
        (true, Some(42i64)).serialize(&mut buffer).unwrap();
        let decoded: (bool, Option<i64>) =
            Deserialize::deserialize(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(decoded, (true, Some(42)));

        let mut buffer = Vec::new();
        (false, None::<i64>).serialize(&mut buffer).unwrap();
        let decoded: (bool, Option<i64>) =
            Deserialize::deserialize(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(decoded, (false, None));
    }

    #[test]
    fn byte_arrays_round_trip() {
        let mut buffer = Vec::new();
        write_byte_array(&mut buffer, &[1, 2, 3, 4]).unwrap();
        let decoded = read_byte_array(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(decoded, vec![1, 2, 3, 4]);
    }
}
