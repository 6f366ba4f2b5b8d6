/// Avatar upload pipeline
///
/// Uploads are screened on filename and size before any decoding, then
/// decoded, stretched to exactly [`AVATAR_SIZE`]×[`AVATAR_SIZE`] and stored
/// as PNG. Aspect ratio is not preserved.
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::avatar;
///
/// # async fn example(upload: Vec<u8>) -> Result<(), avatar::AvatarError> {
/// avatar::check_filename("me.jpg")?;
/// avatar::check_size(upload.len())?;
/// let png = avatar::process(upload).await?;
/// # Ok(())
/// # }
/// ```

use image::{imageops::FilterType, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Largest accepted upload in bytes
pub const MAX_AVATAR_BYTES: usize = 1_000_000;

/// Edge length of the stored image
pub const AVATAR_SIZE: u32 = 250;

/// Accepted filename extensions (case-sensitive)
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

pub const CONTENT_TYPE: &str = "image/png";

/// Avatar pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("Please upload an image")]
    UnsupportedType,

    #[error("File too large")]
    TooLarge,

    #[error("Could not read image: {0}")]
    Decode(String),

    #[error("Could not encode image: {0}")]
    Encode(String),

    #[error("Image task failed: {0}")]
    TaskFailed(String),
}

impl AvatarError {
    /// Whether the upload itself was at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AvatarError::UnsupportedType | AvatarError::TooLarge | AvatarError::Decode(_)
        )
    }
}

pub fn check_filename(filename: &str) -> Result<(), AvatarError> {
    if ALLOWED_EXTENSIONS.iter().any(|ext| filename.ends_with(ext)) {
        Ok(())
    } else {
        Err(AvatarError::UnsupportedType)
    }
}

pub fn check_size(len: usize) -> Result<(), AvatarError> {
    if len > MAX_AVATAR_BYTES {
        Err(AvatarError::TooLarge)
    } else {
        Ok(())
    }
}

/// Decodes, resizes and re-encodes as PNG
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>, AvatarError> {
    let image = image::load_from_memory(bytes).map_err(|e| AvatarError::Decode(e.to_string()))?;
    debug!(
        width = image.width(),
        height = image.height(),
        "Decoded avatar upload"
    );

    let resized = image.resize_exact(AVATAR_SIZE, AVATAR_SIZE, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AvatarError::Encode(e.to_string()))?;

    Ok(out.into_inner())
}

/// [`normalize`] on the blocking pool
pub async fn process(bytes: Vec<u8>) -> Result<Vec<u8>, AvatarError> {
    tokio::task::spawn_blocking(move || normalize(&bytes))
        .await
        .map_err(|e| AvatarError::TaskFailed(e.to_string()))?
}
