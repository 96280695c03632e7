// Integration tests for character card workflows
// These tests go from files on disk through the codec and back

#[cfg(test)]
mod integration_tests {

    use crate::character::card::CharacterCard;
    use crate::character::codec::{self, CardCodecError, DecodeOptions, EncodeOptions};
    use crate::character::loader::{
        embed_card_file, load_card_value, validate_card, write_atomic, CardLoadError,
    };
    use crate::character::png_text::{chunks, CrcCheck, CHUNK_OVERHEAD};
    use crate::character::test_helpers::helpers::{
        create_temp_workspace, create_test_character, minimal_png,
    };
    use crate::character::CharacterData;
    use std::fs;

    #[tokio::test]
    async fn test_export_then_import_workflow() {
        // export card → write PNG → import PNG → same card back

        let mut character = create_test_character("Workflow", "Hello from PNG!");
        character.data.tags = Some(vec!["test".to_string(), "png".to_string()]);
        character.data.alternate_greetings = Some(vec!["Hey!".to_string()]);
        let (dir, image, card_path) = create_temp_workspace(&character);

        let value = load_card_value(&card_path, DecodeOptions::default())
            .await
            .unwrap();
        let bytes = embed_card_file(&value, &image, EncodeOptions::default())
            .await
            .unwrap();
        let out_path = dir.path().join(character.export_file_name());
        write_atomic(&out_path, &bytes).unwrap();

        let imported = load_card_value(&out_path, DecodeOptions::default())
            .await
            .unwrap();
        let card = validate_card(&imported).unwrap();
        assert_eq!(card, character);
    }

    #[test]
    fn test_output_layout_matches_chunk_overhead() {
        let card = create_test_character("Sizer", "Hi");
        let png = minimal_png();
        let encoded = codec::encode(&card, &png).unwrap();

        let json = serde_json::to_vec(&card).unwrap();
        let base64_len = json.len().div_ceil(3) * 4;
        let expected = png.len() + CHUNK_OVERHEAD + "chara".len() + 1 + base64_len;
        assert_eq!(encoded.len(), expected);

        // Everything before the inserted chunk is the original minus IEND.
        let iend_len = CHUNK_OVERHEAD;
        assert_eq!(
            &encoded.as_bytes()[..png.len() - iend_len],
            &png[..png.len() - iend_len]
        );
        assert!(encoded.as_bytes().ends_with(&png[png.len() - iend_len..]));
    }

    #[test]
    fn test_repeated_exports_do_not_accumulate() {
        let png = minimal_png();
        let mut current = png.clone();
        for i in 0..5 {
            let card = create_test_character(&format!("Gen {i}"), "Hi");
            current = codec::encode(&card, &current).unwrap().into_bytes();
        }

        let text_chunks = chunks(&current)
            .unwrap()
            .map(|c| c.unwrap())
            .filter(|c| c.has_keyword("chara"))
            .count();
        assert_eq!(text_chunks, 1);

        let decoded: CharacterCard =
            codec::decode_as(&current, DecodeOptions::default()).unwrap();
        assert_eq!(decoded.data.name, "Gen 4");
        assert_eq!(codec::strip(&current).unwrap(), png);
    }

    #[test]
    fn test_legacy_card_survives_round_trip() {
        let legacy = serde_json::json!({
            "name": "Old Timer",
            "description": "From an older card site",
            "first_mes": "Howdy",
            "char_persona": "kept verbatim"
        });
        let encoded = codec::encode(&legacy, &minimal_png()).unwrap();
        let decoded = codec::decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, legacy);

        let card = validate_card(&decoded).unwrap();
        assert_eq!(
            card.data,
            CharacterData {
                name: "Old Timer".to_string(),
                description: "From an older card site".to_string(),
                personality: String::new(),
                scenario: String::new(),
                first_mes: "Howdy".to_string(),
                mes_example: String::new(),
                creator_notes: None,
                system_prompt: None,
                post_history_instructions: None,
                alternate_greetings: None,
                tags: None,
                creator: None,
                character_version: None,
                character_book: None,
                extensions: None,
            }
        );
    }

    #[tokio::test]
    async fn test_truncated_export_needs_lenient_read() {
        let card = create_test_character("Cut", "Hi");
        let (dir, image, _card_path) = create_temp_workspace(&card);
        let value = serde_json::to_value(&card).unwrap();
        let bytes = embed_card_file(&value, &image, EncodeOptions::default())
            .await
            .unwrap();

        let truncated = &bytes[..bytes.len() - 5];
        let path = dir.path().join("cut.png");
        fs::write(&path, truncated).unwrap();

        // IEND is cut short, so the strict reader rejects the file.
        let err = load_card_value(&path, DecodeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CardLoadError::InvalidPng(_)));

        // The chara chunk before it is whole and a lenient read recovers it.
        let lenient = DecodeOptions {
            crc_check: CrcCheck::Skip,
        };
        let value_back = load_card_value(&path, lenient).await.unwrap();
        assert_eq!(value_back, value);

        // Re-exporting from the damaged file is refused.
        assert!(matches!(
            codec::encode(&value, truncated),
            Err(CardCodecError::Format(_))
        ));
    }
}
