use crate::{Error, Result, Tag};
use serde_json::Value;

/// Maps a generic JSON value onto its natural NBT form: booleans become
/// bytes, integral numbers become ints (longs past 32 bits), fractional
/// numbers become doubles, arrays become homogeneous lists, objects become
/// compounds. Registry data-pack payloads arrive through this path.
pub fn from_json(value: &Value) -> Result<Tag> {
    Ok(match value {
        Value::Bool(flag) => Tag::Byte(if *flag { 1 } else { 0 }),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                match i32::try_from(integer) {
                    Ok(narrow) => Tag::Int(narrow),
                    Err(_) => Tag::Long(integer),
                }
            } else if let Some(float) = number.as_f64() {
                Tag::Double(float)
            } else {
                return Err(Error::UnrepresentableJson(number.to_string()));
            }
        }
        Value::String(text) => Tag::String(text.clone()),
        Value::Array(items) => {
            let converted = items.iter().map(from_json).collect::<Result<Vec<_>>>()?;
            if let Some(first) = converted.first() {
                let element_type = first.tag_id();
                if converted.iter().any(|item| item.tag_id() != element_type) {
                    return Err(Error::ListOfMixedTypes);
                }
            }
            Tag::List(converted)
        }
        Value::Object(entries) => Tag::Compound(
            entries
                .iter()
                .map(|(name, child)| Ok((name.clone(), from_json(child)?)))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Null => {
            return Err(Error::UnrepresentableJson("null".to_string()));
        }
    })
}
