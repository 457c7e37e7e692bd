use vane_nbt::Tag;
use vane_registry::RawNbt;

/// A chat text component. Login-phase surfaces want it as JSON; the
/// configuration and play phases want the NBT form.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Text {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extra: Vec<Text>,
}

impl Text {
    pub fn literal<S: Into<String>>(content: S) -> Text {
        Text {
            text: Some(content.into()),
            ..Text::default()
        }
    }

    /// A translation-key component, e.g. `disconnect.timeout`.
    pub fn translate<S: Into<String>>(key: S) -> Text {
        Text {
            translate: Some(key.into()),
            ..Text::default()
        }
    }

    pub fn color<S: Into<String>>(mut self, color: S) -> Text {
        self.color = Some(color.into());
        self
    }

    pub fn push_extra(&mut self, extra: Text) {
        self.extra.push(extra);
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"text\":\"\"}".to_string())
    }

    pub fn to_nbt(&self) -> Tag {
        let mut entries = Vec::new();
        if let Some(text) = &self.text {
            entries.push(("text".to_string(), Tag::String(text.clone())));
        }
        if let Some(translate) = &self.translate {
            entries.push(("translate".to_string(), Tag::String(translate.clone())));
        }
        if let Some(color) = &self.color {
            entries.push(("color".to_string(), Tag::String(color.clone())));
        }
        if let Some(bold) = self.bold {
            entries.push(("bold".to_string(), Tag::Byte(bold as i8)));
        }
        if !self.extra.is_empty() {
            entries.push((
                "extra".to_string(),
                Tag::List(self.extra.iter().map(Text::to_nbt).collect()),
            ));
        }
        if entries.is_empty() {
            entries.push(("text".to_string(), Tag::String(String::new())));
        }
        Tag::Compound(entries)
    }

    pub fn to_raw_nbt(&self) -> RawNbt {
        RawNbt::from_tag(&self.to_nbt()).unwrap_or(RawNbt(vec![vane_nbt::TAG_COMPOUND, 0]))
    }
}

impl From<&str> for Text {
    fn from(content: &str) -> Text {
        Text::literal(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_components_render_minimal_json() {
        assert_eq!(Text::literal("hi").to_json(), r#"{"text":"hi"}"#);
        assert_eq!(
            Text::translate("disconnect.timeout").to_json(),
            r#"{"translate":"disconnect.timeout"}"#
        );
    }

    #[test]
    fn nbt_form_carries_styling_and_extras() {
        let mut text = Text::literal("Failed: ").color("red");
        text.push_extra(Text::literal("details"));
        let tag = text.to_nbt();
        assert_eq!(
            tag.get("color"),
            Some(&Tag::String("red".to_string()))
        );
        assert!(matches!(tag.get("extra"), Some(Tag::List(items)) if items.len() == 1));
    }
}
