use crate::{Error, Result, Tag, TAG_COMPOUND, TAG_END};

/// Encodes a named root: `tag, name, payload`. The vanilla on-disk and
/// pre-1.20.2 network forms use this shape.
pub fn encode(root_name: &str, root: &Tag) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.push(root.tag_id());
    write_string(&mut out, root_name);
    write_payload(&mut out, root)?;
    Ok(out)
}

/// Encodes a nameless root: `tag, payload`, with the name length and bytes
/// omitted. Used by clientbound packets carrying NBT (registry payloads,
/// play-phase text components).
pub fn encode_nameless(root: &Tag) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.push(root.tag_id());
    write_payload(&mut out, root)?;
    Ok(out)
}

fn write_string(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value.as_bytes());
}

fn write_payload(out: &mut Vec<u8>, tag: &Tag) -> Result<()> {
    match tag {
        Tag::Byte(value) => out.push(*value as u8),
        Tag::Short(value) => out.extend_from_slice(&value.to_be_bytes()),
        Tag::Int(value) => out.extend_from_slice(&value.to_be_bytes()),
        Tag::Long(value) => out.extend_from_slice(&value.to_be_bytes()),
        Tag::Float(value) => out.extend_from_slice(&value.to_be_bytes()),
        Tag::Double(value) => out.extend_from_slice(&value.to_be_bytes()),
        Tag::String(value) => write_string(out, value),
        Tag::List(items) => {
            let element_type = items.first().map(Tag::tag_id).unwrap_or(TAG_END);
            if items.iter().any(|item| item.tag_id() != element_type) {
                return Err(Error::ListOfMixedTypes);
            }
            out.push(element_type);
            out.extend_from_slice(&(items.len() as i32).to_be_bytes());
            for item in items {
                write_payload(out, item)?;
            }
        }
        Tag::Compound(entries) => {
            for (name, child) in entries {
                out.push(child.tag_id());
                write_string(out, name);
                write_payload(out, child)?;
            }
            out.push(TAG_END);
        }
        Tag::IntArray(values) => {
            out.extend_from_slice(&(values.len() as i32).to_be_bytes());
            for value in values {
                out.extend_from_slice(&value.to_be_bytes());
            }
        }
        Tag::LongArray(values) => {
            out.extend_from_slice(&(values.len() as i32).to_be_bytes());
            for value in values {
                out.extend_from_slice(&value.to_be_bytes());
            }
        }
    }
    Ok(())
}

/// The byte cost of a named-root encoding without materializing it.
pub fn encoded_size(root_name: &str, root: &Tag) -> usize {
    1 + 2 + root_name.len() + payload_size(root)
}

fn payload_size(tag: &Tag) -> usize {
    match tag {
        Tag::Byte(_) => 1,
        Tag::Short(_) => 2,
        Tag::Int(_) | Tag::Float(_) => 4,
        Tag::Long(_) | Tag::Double(_) => 8,
        Tag::String(value) => 2 + value.len(),
        Tag::List(items) => 1 + 4 + items.iter().map(payload_size).sum::<usize>(),
        Tag::Compound(entries) => {
            entries
                .iter()
                .map(|(name, child)| 1 + 2 + name.len() + payload_size(child))
                .sum::<usize>()
                + 1
        }
        Tag::IntArray(values) => 4 + values.len() * 4,
        Tag::LongArray(values) => 4 + values.len() * 8,
    }
}

/// A root compound is the only shape the game will accept for most
/// surfaces; callers that require it can assert cheaply.
pub fn is_compound_root(bytes: &[u8]) -> bool {
    bytes.first() == Some(&TAG_COMPOUND)
}
