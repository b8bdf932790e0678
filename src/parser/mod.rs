pub mod dot_splat;

use std::path::Path;

use crate::error::LoadError;
use crate::splat::SplatDataset;

/// Loads a dataset, picking the decoder from the file extension.
pub fn load_dataset(path: &Path) -> Result<SplatDataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "splat" => dot_splat::load_splat_file(path),
        _ => Err(LoadError::UnsupportedFormat(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_dataset(Path::new("scene.ply")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(_)));
    }
}
