use crate::error::ImageError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists an inline image under `name` and returns the stored file name.
    async fn persist(&self, name: &str, base64_image: &str) -> Result<String, ImageError>;
}

#[derive(Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Accepts bare base64 or a `data:<mime>;base64,` URL.
pub fn decode_image(base64_image: &str) -> Result<DecodedImage, ImageError> {
    let trimmed = base64_image.trim();
    let (mime, body) = match trimmed.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest.split_once(',').ok_or(ImageError::InvalidData)?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or(ImageError::InvalidData)?;
            (mime, body)
        }
        None => ("image/jpeg", trimmed),
    };
    let bytes = STANDARD.decode(body).map_err(|_| ImageError::InvalidData)?;
    if bytes.is_empty() {
        return Err(ImageError::InvalidData);
    }
    Ok(DecodedImage {
        extension: extension_for(mime),
        bytes,
    })
}

/// Names come from untrusted payloads and end up as file names.
pub fn validate_image_name(name: &str) -> Result<(), ImageError> {
    let bad = name.is_empty()
        || name.contains(['/', '\\', '\0'])
        || name.contains("..")
        || name.starts_with('.');
    if bad {
        return Err(ImageError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn prepare(name: &str, base64_image: &str, max_bytes: usize) -> Result<(String, Vec<u8>), ImageError> {
    validate_image_name(name)?;
    let decoded = decode_image(base64_image)?;
    if decoded.bytes.len() > max_bytes {
        return Err(ImageError::TooLarge);
    }
    Ok((format!("{}.{}", name, decoded.extension), decoded.bytes))
}

pub struct FsImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl FsImageStore {
    pub async fn open(dir: impl AsRef<Path>, max_bytes: usize) -> Result<Self, ImageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ImageError::Io(e.to_string()))?;
        Ok(Self { dir, max_bytes })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn persist(&self, name: &str, base64_image: &str) -> Result<String, ImageError> {
        let (filename, bytes) = prepare(name, base64_image, self.max_bytes)?;
        tokio::fs::write(self.dir.join(&filename), bytes)
            .await
            .map_err(|e| ImageError::Io(e.to_string()))?;
        Ok(filename)
    }
}

#[derive(Clone)]
pub struct InMemoryImageStore {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail: Arc<AtomicBool>,
    max_bytes: usize,
}

impl Default for InMemoryImageStore {
    fn default() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            fail: Arc::new(AtomicBool::new(false)),
            max_bytes: usize::MAX,
        }
    }
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failure(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn get(&self, filename: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(filename).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.lock().await.len()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn persist(&self, name: &str, base64_image: &str) -> Result<String, ImageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ImageError::Io("injected".to_string()));
        }
        let (filename, bytes) = prepare(name, base64_image, self.max_bytes)?;
        self.files.lock().await.insert(filename.clone(), bytes);
        Ok(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn decodes_data_urls_and_bare_base64() {
        let png = decode_image("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(png.extension, "png");
        assert_eq!(png.bytes, b"hello");
        let bare = decode_image("aGVsbG8=").unwrap();
        assert_eq!(bare.extension, "jpg");
        assert_eq!(decode_image("data:image/png,aGVsbG8="), Err(ImageError::InvalidData));
        assert_eq!(decode_image("%%%"), Err(ImageError::InvalidData));
        assert_eq!(decode_image(""), Err(ImageError::InvalidData));
    }

    #[test]
    fn rejects_path_like_names() {
        for name in ["", "../x", "a/b", "a\\b", ".hidden"] {
            assert!(validate_image_name(name).is_err(), "{name}");
        }
        assert!(validate_image_name("Xk3-_ab9").is_ok());
    }

    #[tokio::test]
    async fn fs_store_writes_named_file() {
        let dir = tempdir().unwrap();
        let store = FsImageStore::open(dir.path().join("photos"), 1024)
            .await
            .unwrap();
        let filename = store
            .persist("abc", "data:image/webp;base64,aGVsbG8=")
            .await
            .unwrap();
        assert_eq!(filename, "abc.webp");
        let written = std::fs::read(store.dir().join(&filename)).unwrap();
        assert_eq!(written, b"hello");
    }

    #[tokio::test]
    async fn fs_store_enforces_size_limit() {
        let dir = tempdir().unwrap();
        let store = FsImageStore::open(dir.path(), 2).await.unwrap();
        assert_eq!(
            store.persist("abc", "aGVsbG8=").await,
            Err(ImageError::TooLarge)
        );
    }
}
