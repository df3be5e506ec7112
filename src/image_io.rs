use image::RgbaImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed export file name; collisions get a timestamp suffix instead.
pub const EXPORT_FILE_NAME: &str = "screenshot.png";

#[derive(Error, Debug)]
pub enum FramerError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode an image file into RGBA pixels.
pub fn load_rgba(path: &Path) -> Result<RgbaImage, FramerError> {
    let img = image::open(path)?;
    Ok(img.to_rgba8())
}

pub fn save_png(img: &RgbaImage, path: &Path) -> Result<(), FramerError> {
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Accepted input formats (the native stand-in for an `image/*` filter).
pub fn is_image_file(path: &Path) -> bool {
    if let Some(extension) = path.extension() {
        if let Some(ext_str) = extension.to_str() {
            let ext_lower = ext_str.to_lowercase();
            matches!(ext_lower.as_str(), "jpg" | "jpeg" | "png" | "webp" | "bmp")
        } else {
            false
        }
    } else {
        false
    }
}

/// Path for the next export into `dir`. Uses the fixed name when free; if a
/// previous export already took it, appends a UTC timestamp to the stem so
/// repeated exports never overwrite each other.
pub fn unique_export_path(dir: &Path) -> PathBuf {
    let candidate = dir.join(EXPORT_FILE_NAME);
    if !candidate.exists() {
        return candidate;
    }
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("screenshot_{}.png", timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("test.jpg")));
        assert!(is_image_file(Path::new("test.jpeg")));
        assert!(is_image_file(Path::new("test.png")));
        assert!(is_image_file(Path::new("test.webp")));
        assert!(is_image_file(Path::new("test.bmp")));
        assert!(is_image_file(Path::new("TEST.PNG"))); // Test case insensitive
        assert!(!is_image_file(Path::new("test.txt")));
        assert!(!is_image_file(Path::new("test")));
        assert!(!is_image_file(Path::new("test.mp4")));
    }

    #[test]
    fn export_path_uses_fixed_name_when_free() {
        let dir = std::env::temp_dir().join(format!("framer-test-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();

        assert_eq!(unique_export_path(&dir), dir.join(EXPORT_FILE_NAME));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn export_path_avoids_existing_file() {
        let dir = std::env::temp_dir().join(format!("framer-test-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(EXPORT_FILE_NAME), b"taken").unwrap();

        let next = unique_export_path(&dir);
        assert_ne!(next, dir.join(EXPORT_FILE_NAME));
        assert_eq!(next.extension().and_then(|e| e.to_str()), Some("png"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
