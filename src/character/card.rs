use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SPEC_V2: &str = "chara_card_v2";
pub const SPEC_VERSION_V2: &str = "2.0";

/// Character card following the v2 specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterCard {
    pub spec: String,
    pub spec_version: String,
    pub data: CharacterData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterData {
    pub name: String,
    pub description: String,
    pub personality: String,
    pub scenario: String,
    pub first_mes: String,
    pub mes_example: String,

    // Optional fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_history_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_greetings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_book: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Flat pre-v2 layout, as produced by older card sites.
#[derive(Deserialize)]
struct LegacyCard {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    personality: String,
    #[serde(default)]
    scenario: String,
    #[serde(default)]
    first_mes: String,
    #[serde(default)]
    mes_example: String,
    #[serde(default)]
    creator_notes: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    creator: Option<String>,
}

impl From<LegacyCard> for CharacterCard {
    fn from(legacy: LegacyCard) -> Self {
        CharacterCard {
            spec: SPEC_V2.to_string(),
            spec_version: SPEC_VERSION_V2.to_string(),
            data: CharacterData {
                name: legacy.name,
                description: legacy.description,
                personality: legacy.personality,
                scenario: legacy.scenario,
                first_mes: legacy.first_mes,
                mes_example: legacy.mes_example,
                creator_notes: legacy.creator_notes,
                system_prompt: None,
                post_history_instructions: None,
                alternate_greetings: None,
                tags: legacy.tags,
                creator: legacy.creator,
                character_version: None,
                character_book: None,
                extensions: None,
            },
        }
    }
}

impl CharacterCard {
    /// Interpret a decoded JSON document as a card.
    ///
    /// Documents with a `chara_card_v*` spec tag and a `data` object are read
    /// as v2; anything else is treated as the flat legacy layout and upgraded.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let is_versioned = value
            .get("spec")
            .and_then(Value::as_str)
            .is_some_and(|spec| spec.starts_with("chara_card_v"))
            && value.get("data").is_some_and(Value::is_object);

        if is_versioned {
            CharacterCard::deserialize(value)
        } else {
            LegacyCard::deserialize(value).map(CharacterCard::from)
        }
    }

    /// Collect problems that make the card unusable.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.spec.starts_with("chara_card_v") {
            errors.push(format!(
                "Invalid spec field: expected '{}', got '{}'",
                SPEC_V2, self.spec
            ));
        }

        if self.data.name.trim().is_empty() {
            errors.push("Character name is required and cannot be empty".to_string());
        }

        if self.data.description.trim().is_empty() && self.data.personality.trim().is_empty() {
            errors.push("Either description or personality must be provided".to_string());
        }

        if self.data.first_mes.trim().is_empty() {
            errors.push("First message (first_mes) cannot be empty".to_string());
        }

        errors
    }

    /// Default file name when exporting this card as a PNG.
    pub fn export_file_name(&self) -> String {
        let stem: String = self
            .data
            .name
            .trim()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let stem = if stem.is_empty() {
            "character".to_string()
        } else {
            stem
        };
        format!("{stem}_card.png")
    }

    /// One-line description for terminal output.
    pub fn summary(&self) -> String {
        let mut summary = format!("{} ({} {})", self.data.name, self.spec, self.spec_version);
        if let Some(tags) = self.data.tags.as_ref().filter(|t| !t.is_empty()) {
            summary.push_str(&format!(" [{}]", tags.join(", ")));
        }
        summary
    }
}
