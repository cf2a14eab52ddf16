//! Image input references and loading.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::InputError;

/// Keys checked, in order, when the input is a record rather than a path.
pub const PATH_KEYS: [&str; 5] = ["path", "name", "file_path", "tempfile", "orig_name"];

/// A reference to an image: a plain path or a record carrying one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageInput {
    Path(PathBuf),
    Record(Map<String, Value>),
}

impl ImageInput {
    /// Resolve to a filesystem path, if the input names one.
    pub fn resolve(&self) -> Option<PathBuf> {
        match self {
            ImageInput::Path(path) if path.as_os_str().is_empty() => None,
            ImageInput::Path(path) => Some(path.clone()),
            ImageInput::Record(fields) => PATH_KEYS
                .iter()
                .filter_map(|key| fields.get(*key).and_then(Value::as_str))
                .find(|value| !value.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

impl From<&str> for ImageInput {
    fn from(path: &str) -> Self {
        ImageInput::Path(PathBuf::from(path))
    }
}

impl From<String> for ImageInput {
    fn from(path: String) -> Self {
        ImageInput::Path(PathBuf::from(path))
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        ImageInput::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Path(path)
    }
}

impl From<Map<String, Value>> for ImageInput {
    fn from(fields: Map<String, Value>) -> Self {
        ImageInput::Record(fields)
    }
}

/// Resolve and decode an input into an image.
pub fn load_image(input: &ImageInput) -> Result<DynamicImage, InputError> {
    let path = input.resolve().ok_or(InputError::Unresolvable)?;
    if !path.is_file() {
        return Err(InputError::NotFound(path));
    }

    let bytes = std::fs::read(&path).map_err(|_| InputError::NotFound(path.clone()))?;
    image::load_from_memory(&bytes).map_err(|source| InputError::Decode { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use serde_json::json;

    fn record(value: Value) -> ImageInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_path_resolution() {
        assert_eq!(ImageInput::from("shot.png").resolve(), Some(PathBuf::from("shot.png")));
        assert_eq!(ImageInput::from("").resolve(), None);
    }

    #[test]
    fn test_record_resolution_order() {
        let input = record(json!({"file_path": "/b.png", "name": "/a.png"}));
        assert_eq!(input.resolve(), Some(PathBuf::from("/a.png")));

        let input = record(json!({"path": "", "tempfile": "/tmp/x.png"}));
        assert_eq!(input.resolve(), Some(PathBuf::from("/tmp/x.png")));

        let input = record(json!({"path": 3, "size": 10}));
        assert_eq!(input.resolve(), None);
    }

    #[test]
    fn test_untagged_deserialize() {
        let input: ImageInput = serde_json::from_str("\"a.png\"").unwrap();
        assert_eq!(input, ImageInput::Path(PathBuf::from("a.png")));

        let input: ImageInput = serde_json::from_str(r#"{"orig_name": "b.png"}"#).unwrap();
        assert!(matches!(input, ImageInput::Record(_)));
    }

    #[test]
    fn test_load_missing_and_unresolvable() {
        let err = load_image(&ImageInput::from("/nonexistent/coinscan.png")).unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));

        let err = load_image(&record(json!({}))).unwrap_err();
        assert!(matches!(err, InputError::Unresolvable));
    }

    #[test]
    fn test_load_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let err = load_image(&ImageInput::from(path)).unwrap_err();
        assert!(matches!(err, InputError::Decode { .. }));
    }

    #[test]
    fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digits.png");
        GrayImage::from_pixel(20, 10, Luma([200])).save(&path).unwrap();

        let image = load_image(&ImageInput::from(path.as_path())).unwrap();
        assert_eq!((image.width(), image.height()), (20, 10));
    }
}
