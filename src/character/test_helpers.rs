// Test helpers for PNG and character card tests
// Chunk CRCs here come from crc32fast so the crate's own CRC is checked
// against an independent implementation.

#[cfg(test)]
pub(crate) mod helpers {
    use crate::character::card::{CharacterCard, CharacterData};
    use crate::character::png_text::PNG_SIGNATURE;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    pub const TEST_IHDR: [u8; 13] = [
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00,
    ];

    pub const TEST_IDAT: [u8; 12] = [
        0x78, 0xDA, 0x63, 0x60, 0x60, 0x60, 0x00, 0x00, 0x00, 0x04, 0x00, 0x01,
    ];

    /// Signature, IHDR, IDAT and IEND for a 1x1 RGB image.
    pub fn minimal_png() -> Vec<u8> {
        build_png(None, true)
    }

    /// Minimal PNG with an optional `chara` tEXt chunk between IHDR and IDAT.
    pub fn build_png(chara_payload: Option<&[u8]>, valid_crc: bool) -> Vec<u8> {
        let mut png = Vec::new();
        png.extend_from_slice(&PNG_SIGNATURE);
        png.extend_from_slice(&chunk(*b"IHDR", &TEST_IHDR, true));
        if let Some(payload) = chara_payload {
            let mut text_data = Vec::new();
            text_data.extend_from_slice(b"chara");
            text_data.push(0);
            text_data.extend_from_slice(payload);
            png.extend_from_slice(&chunk(*b"tEXt", &text_data, valid_crc));
        }
        png.extend_from_slice(&chunk(*b"IDAT", &TEST_IDAT, true));
        png.extend_from_slice(&chunk(*b"IEND", &[], true));
        png
    }

    pub fn chunk(chunk_type: [u8; 4], data: &[u8], valid_crc: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + data.len());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(&chunk_type);
        out.extend_from_slice(data);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&chunk_type);
        hasher.update(data);
        let mut crc = hasher.finalize();
        if !valid_crc {
            crc ^= 0xFFFF_FFFF;
        }
        out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    /// Create a test character card with the given name and greeting
    pub fn create_test_character(name: &str, greeting: &str) -> CharacterCard {
        CharacterCard {
            spec: "chara_card_v2".to_string(),
            spec_version: "2.0".to_string(),
            data: CharacterData {
                name: name.to_string(),
                description: format!("Test character {}", name),
                personality: "Friendly and helpful".to_string(),
                scenario: "Testing environment".to_string(),
                first_mes: greeting.to_string(),
                mes_example: "{{user}}: Hi\n{{char}}: Hello!".to_string(),
                creator_notes: None,
                system_prompt: Some(format!("You are {}.", name)),
                post_history_instructions: None,
                alternate_greetings: None,
                tags: None,
                creator: None,
                character_version: None,
                character_book: None,
                extensions: None,
            },
        }
    }

    /// Temporary directory holding `image.png` (a minimal PNG) and
    /// `card.json` for the given character.
    /// Cleaned up when the TempDir is dropped.
    pub fn create_temp_workspace(card: &CharacterCard) -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let image_path = temp_dir.path().join("image.png");
        let card_path = temp_dir.path().join("card.json");
        fs::write(&image_path, minimal_png()).unwrap();
        fs::write(&card_path, serde_json::to_string(card).unwrap()).unwrap();
        (temp_dir, image_path, card_path)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::character::png_text::chunks;

        #[test]
        fn test_minimal_png_shape() {
            let png = minimal_png();
            let types: Vec<String> = chunks(&png)
                .unwrap()
                .map(|c| c.unwrap().type_name())
                .collect();
            assert_eq!(types, ["IHDR", "IDAT", "IEND"]);
            assert_eq!(png.len(), 8 + 25 + 24 + 12);
        }

        #[test]
        fn test_create_temp_workspace() {
            let card = create_test_character("TempTest", "Hi!");
            let (_dir, image, card_path) = create_temp_workspace(&card);
            assert!(image.exists());
            let contents = fs::read_to_string(card_path).unwrap();
            let loaded: CharacterCard = serde_json::from_str(&contents).unwrap();
            assert_eq!(loaded.data.name, "TempTest");
        }
    }
}
