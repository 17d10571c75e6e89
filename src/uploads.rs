use std::path::Path;

use image::ImageFormat;
use rand::Rng;

pub const ALLOWED_IMAGE_EXTS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Profile pictures are small avatars; recipe photos stay large.
pub const PROFILE_MAX_DIM: u32 = 256;
pub const RECIPE_MAX_DIM: u32 = 1200;

pub const PROFILE_DIR: &str = "profile_pics";
pub const RECIPE_DIR: &str = "recipe_pics";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Invalid image type. Please upload jpg, jpeg, png, or webp.")]
    InvalidType,

    #[error("Could not read image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Could not store image: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate, downscale, and persist an uploaded image.
///
/// The extension must be on the allow-list (checked before any decode or
/// write). The stored name is a random hex string plus the original
/// extension, so user-supplied names never reach the filesystem and
/// collisions are vanishingly unlikely. The image is scaled to fit within
/// `max_dim` on both axes, preserving aspect ratio and never upscaling.
/// Returns the generated filename; associating it with a user or recipe is
/// the caller's job, and any file it replaces is left behind.
pub fn save_image(
    bytes: &[u8],
    original_name: &str,
    uploads_root: &Path,
    folder: &str,
    max_dim: u32,
) -> Result<String, ImageError> {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .filter(|e| ALLOWED_IMAGE_EXTS.contains(&e.as_str()))
        .ok_or(ImageError::InvalidType)?;

    let filename = format!("{}.{ext}", random_hex(16));

    let img = image::load_from_memory(bytes)?;
    // thumbnail() scales in both directions; images already within the
    // bounds are stored untouched
    let resized = if img.width() <= max_dim && img.height() <= max_dim {
        img
    } else {
        img.thumbnail(max_dim, max_dim)
    };

    let dir = uploads_root.join(folder);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(&filename);
    let format = ImageFormat::from_extension(&ext).ok_or(ImageError::InvalidType)?;
    resized.save_with_format(&path, format)?;

    Ok(filename)
}

fn random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| format!("{:x}", rng.gen_range(0..16)))
        .collect()
}
