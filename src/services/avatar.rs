//! Avatar processing
//!
//! Uploaded profile pictures are decoded and bounded to a 300×300 box,
//! preserving aspect ratio. Images already inside the box pass through
//! byte-for-byte; larger ones are downscaled and re-encoded.

use image::ImageFormat;
use std::io::Cursor;

/// Side length of the bounding box avatars are resized into
pub const MAX_AVATAR_EDGE: u32 = 300;

/// Error types for avatar processing
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    /// Data is not a decodable image
    #[error("Unsupported or corrupt image: {0}")]
    InvalidImage(String),
}

/// A processed avatar ready for storage
#[derive(Debug, Clone)]
pub struct ProcessedAvatar {
    pub data: Vec<u8>,
    /// File extension matching the encoded format
    pub extension: &'static str,
}

/// Decode an uploaded image and fit it into the avatar bounding box.
///
/// Aspect ratio is preserved: a 600×400 upload becomes 300×200. PNG
/// sources stay PNG (alpha survives); everything else is re-encoded as
/// JPEG when downscaling is needed.
pub fn process_avatar(data: &[u8]) -> Result<ProcessedAvatar, AvatarError> {
    let format =
        image::guess_format(data).map_err(|e| AvatarError::InvalidImage(e.to_string()))?;
    let extension = extension_for(format)?;

    let img = image::load_from_memory_with_format(data, format)
        .map_err(|e| AvatarError::InvalidImage(e.to_string()))?;

    if img.width() <= MAX_AVATAR_EDGE && img.height() <= MAX_AVATAR_EDGE {
        return Ok(ProcessedAvatar {
            data: data.to_vec(),
            extension,
        });
    }

    let resized = img.thumbnail(MAX_AVATAR_EDGE, MAX_AVATAR_EDGE);

    let mut buf = Cursor::new(Vec::new());
    let extension = match format {
        ImageFormat::Png => {
            resized
                .write_to(&mut buf, ImageFormat::Png)
                .map_err(|e| AvatarError::InvalidImage(e.to_string()))?;
            "png"
        }
        _ => {
            // The JPEG encoder rejects alpha channels
            image::DynamicImage::ImageRgb8(resized.to_rgb8())
                .write_to(&mut buf, ImageFormat::Jpeg)
                .map_err(|e| AvatarError::InvalidImage(e.to_string()))?;
            "jpg"
        }
    };

    Ok(ProcessedAvatar {
        data: buf.into_inner(),
        extension,
    })
}

fn extension_for(format: ImageFormat) -> Result<&'static str, AvatarError> {
    match format {
        ImageFormat::Png => Ok("png"),
        ImageFormat::Jpeg => Ok("jpg"),
        ImageFormat::WebP => Ok("webp"),
        other => Err(AvatarError::InvalidImage(format!(
            "Unsupported image format: {:?}",
            other
        ))),
    }
}
