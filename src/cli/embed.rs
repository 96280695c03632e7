use std::error::Error;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::character::loader::{
    embed_card_file, ensure_distinct_output, load_card_value, validate_card, write_atomic,
};
use crate::character::CharacterCard;
use crate::core::config::Config;

pub struct EmbedRequest {
    pub card: PathBuf,
    pub image: PathBuf,
    pub output: Option<PathBuf>,
    /// Fail if the image already carries a card instead of replacing it.
    pub no_replace: bool,
    pub validate: bool,
}

/// Embed the card at `request.card` into a copy of `request.image`.
///
/// Returns the path written.
pub async fn embed_card(request: &EmbedRequest, config: &Config) -> Result<PathBuf, Box<dyn Error>> {
    let value = load_card_value(&request.card, config.decode_options()).await?;

    let card = if request.validate {
        Some(validate_card(&value)?)
    } else {
        match CharacterCard::from_value(&value) {
            Ok(card) => Some(card),
            Err(e) => {
                warn!(error = %e, "Card does not follow the v2 layout; embedding as-is");
                None
            }
        }
    };

    let output = match &request.output {
        Some(path) => path.clone(),
        None => default_output(&request.image, card.as_ref()),
    };
    ensure_distinct_output(&request.image, &output)?;

    let mut options = config.encode_options();
    if request.no_replace {
        options.replace_existing = false;
    }

    let bytes = embed_card_file(&value, &request.image, options).await?;
    write_atomic(&output, &bytes)?;
    Ok(output)
}

fn default_output(image: &Path, card: Option<&CharacterCard>) -> PathBuf {
    let file_name = card
        .map(CharacterCard::export_file_name)
        .unwrap_or_else(|| "character_card.png".to_string());
    image.with_file_name(file_name)
}
