use crate::mappings::{packet_ids, RawNbt};
use crate::shared::KnownPack;
use std::io::Write;
use vane_serializer::{Identifier, Result, Serialize, VarInt};

#[derive(Clone, Debug)]
pub struct CustomPayload {
    pub channel: Identifier,
    pub data: Vec<u8>,
}

impl Serialize for CustomPayload {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.channel.serialize(writer)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Disconnect {
    pub reason: RawNbt,
}

impl Serialize for Disconnect {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.reason.serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct FinishConfiguration;

impl Serialize for FinishConfiguration {
    fn serialize<W: Write>(&self, _: &mut W) -> Result<()> {
        Ok(())
    }

    fn size(&self) -> Result<i32> {
        Ok(0)
    }
}

#[derive(Clone, Debug)]
pub struct KeepAlive {
    pub id: i64,
}

impl Serialize for KeepAlive {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.id.serialize(writer)
    }
}

/// One data-pack category: `string(category), varint(count), then per
/// entry the identifier and a flag-prefixed NBT payload`. The sentinel
/// "default" entry travels as `has_payload = false`.
#[derive(Clone, Debug)]
pub struct RegistryData {
    pub category: Identifier,
    pub entries: Vec<(Identifier, Option<RawNbt>)>,
}

impl Serialize for RegistryData {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.category.serialize(writer)?;
        VarInt::try_from(self.entries.len())?.serialize(writer)?;
        for (identifier, payload) in &self.entries {
            identifier.serialize(writer)?;
            match payload {
                Some(nbt) => {
                    true.serialize(writer)?;
                    nbt.serialize(writer)?;
                }
                None => false.serialize(writer)?,
            }
        }
        Ok(())
    }
}

/// All tag tables in one packet, values as resolved network ids.
#[derive(Clone, Debug)]
pub struct UpdateTags {
    pub categories: Vec<TagCategory>,
}

#[derive(Clone, Debug)]
pub struct TagCategory {
    pub category: Identifier,
    pub tags: Vec<(Identifier, Vec<i32>)>,
}

impl Serialize for UpdateTags {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::try_from(self.categories.len())?.serialize(writer)?;
        for category in &self.categories {
            category.category.serialize(writer)?;
            VarInt::try_from(category.tags.len())?.serialize(writer)?;
            for (tag, values) in &category.tags {
                tag.serialize(writer)?;
                VarInt::try_from(values.len())?.serialize(writer)?;
                for value in values {
                    VarInt::from(*value).serialize(writer)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct UpdateEnabledFeatures {
    pub features: Vec<Identifier>,
}

impl Serialize for UpdateEnabledFeatures {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::try_from(self.features.len())?.serialize(writer)?;
        for feature in &self.features {
            feature.serialize(writer)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SelectKnownPacks {
    pub packs: Vec<KnownPack>,
}

impl Serialize for SelectKnownPacks {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::try_from(self.packs.len())?.serialize(writer)?;
        for pack in &self.packs {
            pack.serialize(writer)?;
        }
        Ok(())
    }
}

/// Crash-report context lines shown by the client on errors.
#[derive(Clone, Debug, Default)]
pub struct CustomReportDetails {
    pub details: Vec<(String, String)>,
}

impl Serialize for CustomReportDetails {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::try_from(self.details.len())?.serialize(writer)?;
        for (title, description) in &self.details {
            title.serialize(writer)?;
            description.serialize(writer)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ServerLinks {
    pub links: Vec<ServerLink>,
}

/// A built-in-labelled link row in the client's pause menu.
#[derive(Clone, Debug)]
pub struct ServerLink {
    pub built_in_label: i32,
    pub url: String,
}

impl Serialize for ServerLinks {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::try_from(self.links.len())?.serialize(writer)?;
        for link in &self.links {
            true.serialize(writer)?; // built-in label
            VarInt::from(link.built_in_label).serialize(writer)?;
            link.url.serialize(writer)?;
        }
        Ok(())
    }
}

packet_ids! {
    CustomPayload = 0x01;
    Disconnect = 0x02;
    FinishConfiguration = 0x03;
    KeepAlive = 0x04;
    RegistryData = 0x07;
    UpdateEnabledFeatures = 0x0C;
    UpdateTags = 0x0D;
    SelectKnownPacks = 0x0E;
    CustomReportDetails = 0x0F;
    ServerLinks = 0x10;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet_buffer;

    #[test]
    fn registry_data_encodes_default_entries_without_payloads() {
        let packet = RegistryData {
            category: Identifier::minecraft("dimension_type"),
            entries: vec![
                (Identifier::minecraft("overworld"), None),
                (
                    Identifier::minecraft("custom"),
                    Some(RawNbt::from_tag(&vane_nbt::compound([(
                        "has_skylight",
                        vane_nbt::Tag::Byte(1),
                    )]))
                    .unwrap()),
                ),
            ],
        };

        let buffer = packet_buffer(&packet).unwrap();
        assert_eq!(buffer[0], 0x07);
        // category string + count 2 follow; first entry flag false.
        let text = String::from_utf8_lossy(&buffer);
        assert!(text.contains("minecraft:dimension_type"));
        assert!(text.contains("minecraft:overworld"));
    }

    #[test]
    fn update_tags_writes_nested_counts() {
        let packet = UpdateTags {
            categories: vec![TagCategory {
                category: Identifier::minecraft("block"),
                tags: vec![(Identifier::minecraft("mineable/axe"), vec![5, 9])],
            }],
        };
        let buffer = packet_buffer(&packet).unwrap();
        assert_eq!(buffer[0], 0x0D);
        assert_eq!(buffer[1], 1); // one category
    }
}
