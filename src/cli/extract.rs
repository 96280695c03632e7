use std::error::Error;
use std::path::PathBuf;

use tracing::warn;

use crate::character::loader::{load_card_value, validate_card, write_atomic};
use crate::character::png_text::CrcCheck;
use crate::core::config::{path_display, Config};

pub struct ExtractRequest {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub pretty: bool,
    pub lenient: bool,
}

/// Decode the card in `request.file` and print it or write it to
/// `request.output`. Returns the JSON text.
pub async fn extract_card(
    request: &ExtractRequest,
    config: &Config,
) -> Result<String, Box<dyn Error>> {
    let mut options = config.decode_options();
    if request.lenient {
        options.crc_check = CrcCheck::Skip;
    }

    let value = load_card_value(&request.file, options).await?;

    if config.validate_cards() {
        if let Err(e) = validate_card(&value) {
            // Still hand out the data; the user may want to repair it.
            warn!(file = %request.file.display(), "Extracted card failed validation");
            eprintln!("⚠️  {e}");
        }
    }

    let json = if request.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };

    match &request.output {
        Some(path) => {
            let mut contents = json.clone();
            contents.push('\n');
            write_atomic(path, contents.as_bytes())?;
            eprintln!("✅ Wrote character card JSON to {}", path_display(path));
        }
        None => println!("{json}"),
    }
    Ok(json)
}
