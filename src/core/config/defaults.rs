use crate::character::codec::{DecodeOptions, EncodeOptions};
use crate::character::png_text::CrcCheck;
use crate::core::config::data::Config;

impl Config {
    pub fn verify_crc(&self) -> bool {
        self.verify_crc.unwrap_or(true)
    }

    pub fn replace_existing(&self) -> bool {
        self.replace_existing.unwrap_or(true)
    }

    pub fn pretty(&self) -> bool {
        self.pretty.unwrap_or(false)
    }

    pub fn validate_cards(&self) -> bool {
        self.validate_cards.unwrap_or(true)
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            replace_existing: self.replace_existing(),
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            crc_check: if self.verify_crc() {
                CrcCheck::Verify
            } else {
                CrcCheck::Skip
            },
        }
    }

    /// Update a setting by its command-line key (e.g. `verify-crc`).
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let slot = self.slot_mut(key)?;
        *slot = Some(parse_bool(value)?);
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        *self.slot_mut(key)? = None;
        Ok(())
    }

    fn slot_mut(&mut self, key: &str) -> Result<&mut Option<bool>, String> {
        match key {
            "verify-crc" => Ok(&mut self.verify_crc),
            "replace-existing" => Ok(&mut self.replace_existing),
            "pretty" => Ok(&mut self.pretty),
            "validate-cards" => Ok(&mut self.validate_cards),
            _ => Err(format!("Unknown config key: {key}")),
        }
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("Expected on/off, got '{value}'")),
    }
}
