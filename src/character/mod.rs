pub mod card;
pub mod codec;
pub mod crc;
pub mod loader;
pub mod png_text;

#[cfg(test)]
pub(crate) mod test_helpers;
#[cfg(test)]
mod tests_integration;

// Re-exports for internal module use
pub use card::CharacterCard;
#[cfg(test)]
pub use card::CharacterData;
pub use codec::{decode, encode, CardCodecError};
