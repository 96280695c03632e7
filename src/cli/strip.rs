use std::error::Error;
use std::path::{Path, PathBuf};

use crate::character::codec;
use crate::character::loader::{ensure_distinct_output, read_file, write_atomic};

/// Write a copy of `file` with every embedded card removed.
pub async fn strip_card(file: &Path, output: Option<&Path>) -> Result<PathBuf, Box<dyn Error>> {
    let bytes = read_file(file).await?;
    if !codec::quick_check(&bytes) {
        eprintln!("⚠️  {} does not appear to contain a character card", file.display());
    }
    let stripped = codec::strip(&bytes)?;

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = file
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("image");
            file.with_file_name(format!("{stem}_stripped.png"))
        }
    };
    ensure_distinct_output(file, &output)?;
    write_atomic(&output, &stripped)?;
    Ok(output)
}
