use std::io::{Read, Write};
use uuid::Uuid;
use vane_serializer::{Deserialize, Result, Serialize, VarInt};

/// The authenticated identity of a player. The serde shape matches the
/// session server's `hasJoined` response (`id` arrives as hyphenless hex,
/// which the uuid crate parses directly); the wire shape is the
/// `login_finished` profile block.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GameProfile {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<ProfileProperty>,
}

impl GameProfile {
    pub fn offline(id: Uuid, name: String) -> GameProfile {
        GameProfile {
            id,
            name,
            properties: Vec::new(),
        }
    }

    /// The skin blob, when the session server attached one.
    pub fn textures(&self) -> Option<&ProfileProperty> {
        self.properties.iter().find(|prop| prop.name == "textures")
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Serialize for GameProfile {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.id.serialize(writer)?;
        self.name.serialize(writer)?;
        VarInt::try_from(self.properties.len())?.serialize(writer)?;
        for property in &self.properties {
            property.name.serialize(writer)?;
            property.value.serialize(writer)?;
            (property.signature.is_some(), property.signature.clone()).serialize(writer)?;
        }
        Ok(())
    }

    fn size(&self) -> Result<i32> {
        let mut size = 16 + self.name.size()? + VarInt::try_from(self.properties.len())?.size()?;
        for property in &self.properties {
            size += property.name.size()?;
            size += property.value.size()?;
            size += (property.signature.is_some(), property.signature.clone()).size()?;
        }
        Ok(size)
    }
}

impl Deserialize for GameProfile {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let id = Uuid::deserialize(reader)?;
        let name = String::deserialize(reader)?;
        let (_, entries): (VarInt, Vec<RawProperty>) = Deserialize::deserialize(reader)?;
        Ok(GameProfile {
            id,
            name,
            properties: entries.into_iter().map(|raw| raw.0).collect(),
        })
    }
}

struct RawProperty(ProfileProperty);

impl Deserialize for RawProperty {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let name = String::deserialize(reader)?;
        let value = String::deserialize(reader)?;
        let (_, signature): (bool, Option<String>) = Deserialize::deserialize(reader)?;
        Ok(RawProperty(ProfileProperty {
            name,
            value,
            signature,
        }))
    }
}

/// One entry of the known-packs negotiation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KnownPack {
    pub namespace: String,
    pub id: String,
    pub version: String,
}

impl KnownPack {
    pub fn core(version: &str) -> KnownPack {
        KnownPack {
            namespace: "minecraft".to_string(),
            id: "core".to_string(),
            version: version.to_string(),
        }
    }
}

impl Serialize for KnownPack {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.namespace.serialize(writer)?;
        self.id.serialize(writer)?;
        self.version.serialize(writer)
    }

    fn size(&self) -> Result<i32> {
        Ok(self.namespace.size()? + self.id.size()? + self.version.size()?)
    }
}

impl Deserialize for KnownPack {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(KnownPack {
            namespace: String::deserialize(reader)?,
            id: String::deserialize(reader)?,
            version: String::deserialize(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn game_profile_wire_round_trip() {
        let profile = GameProfile {
            id: Uuid::new_v4(),
            name: "Alex".to_string(),
            properties: vec![ProfileProperty {
                name: "textures".to_string(),
                value: "base64".to_string(),
                signature: Some("sig".to_string()),
            }],
        };

        let mut buffer = Vec::new();
        profile.serialize(&mut buffer).unwrap();
        assert_eq!(buffer.len() as i32, profile.size().unwrap());

        let decoded = GameProfile::deserialize(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(decoded.id, profile.id);
        assert_eq!(decoded.name, "Alex");
        assert_eq!(decoded.properties.len(), 1);
        assert_eq!(decoded.properties[0].signature.as_deref(), Some("sig"));
    }

    #[test]
    fn session_server_json_parses_hyphenless_uuids() {
        let profile: GameProfile = serde_json::from_str(
            r#"{"id":"3f1b8e0c2a944bd1a3a68d5fd1d5bafe","name":"Alex",
                "properties":[{"name":"textures","value":"blob"}]}"#,
        )
        .unwrap();
        assert_eq!(profile.name, "Alex");
        assert!(profile.textures().is_some());
        assert!(profile.textures().unwrap().signature.is_none());
    }
}
