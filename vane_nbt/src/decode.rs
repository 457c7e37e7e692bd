use crate::{
    Error, Result, Tag, TAG_BYTE, TAG_COMPOUND, TAG_DOUBLE, TAG_END, TAG_FLOAT, TAG_INT,
    TAG_INT_ARRAY, TAG_LIST, TAG_LONG, TAG_LONG_ARRAY, TAG_SHORT, TAG_STRING,
};

/// Parses a named root, returning `(root_name, tree, offset)` where
/// `offset` is the index of the first unread byte.
pub fn parse(bytes: &[u8]) -> Result<(String, Tag, usize)> {
    let mut reader = Reader { bytes, pos: 0 };
    let tag_offset = reader.pos;
    let tag_id = reader.byte()?;
    let name = reader.string()?;
    let root = reader.payload(tag_id, tag_offset)?;
    Ok((name, root, reader.pos))
}

/// Parses a nameless root (`tag, payload`), returning `(tree, offset)`.
pub fn parse_nameless(bytes: &[u8]) -> Result<(Tag, usize)> {
    let mut reader = Reader { bytes, pos: 0 };
    let tag_offset = reader.pos;
    let tag_id = reader.byte()?;
    let root = reader.payload(tag_id, tag_offset)?;
    Ok((root, reader.pos))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8> {
        let value = *self.bytes.get(self.pos).ok_or(Error::UnexpectedEnd)?;
        self.pos += 1;
        Ok(value)
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(count).ok_or(Error::UnexpectedEnd)?;
        let slice = self.bytes.get(self.pos..end).ok_or(Error::UnexpectedEnd)?;
        self.pos = end;
        Ok(slice)
    }

    fn short(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn int(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn long(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn string(&mut self) -> Result<String> {
        let length = self.short()? as u16 as usize;
        Ok(String::from_utf8(self.take(length)?.to_vec())?)
    }

    fn payload(&mut self, tag_id: u8, tag_offset: usize) -> Result<Tag> {
        Ok(match tag_id {
            TAG_BYTE => Tag::Byte(self.byte()? as i8),
            TAG_SHORT => Tag::Short(self.short()?),
            TAG_INT => Tag::Int(self.int()?),
            TAG_LONG => Tag::Long(self.long()?),
            TAG_FLOAT => Tag::Float(f32::from_bits(self.int()? as u32)),
            TAG_DOUBLE => Tag::Double(f64::from_bits(self.long()? as u64)),
            TAG_STRING => Tag::String(self.string()?),
            TAG_LIST => {
                let element_offset = self.pos;
                let element_type = self.byte()?;
                let count = self.int()?;
                if count <= 0 {
                    Tag::List(Vec::new())
                } else {
                    if element_type == TAG_END {
                        // A non-empty list cannot hold end tags.
                        return Err(Error::UnknownTag(TAG_END, element_offset));
                    }
                    let mut items = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        items.push(self.payload(element_type, element_offset)?);
                    }
                    Tag::List(items)
                }
            }
            TAG_COMPOUND => {
                let mut entries = Vec::new();
                loop {
                    let child_offset = self.pos;
                    let child_id = self.byte()?;
                    if child_id == TAG_END {
                        break;
                    }
                    let name = self.string()?;
                    let child = self.payload(child_id, child_offset)?;
                    entries.push((name, child));
                }
                Tag::Compound(entries)
            }
            TAG_INT_ARRAY => {
                let count = self.int()?.max(0) as usize;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(self.int()?);
                }
                Tag::IntArray(values)
            }
            TAG_LONG_ARRAY => {
                let count = self.int()?.max(0) as usize;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(self.long()?);
                }
                Tag::LongArray(values)
            }
            other => return Err(Error::UnknownTag(other, tag_offset)),
        })
    }
}
