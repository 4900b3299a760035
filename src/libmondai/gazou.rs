use image::imageops::FilterType;
use image::RgbaImage;
use log::{debug, warn};
use std::path::Path;

pub const MAX_WIDTH: u32 = 800;
pub const MAX_HEIGHT: u32 = 400;

#[derive(Debug)]
pub enum Preview {
    Fitted(RgbaImage),
    Placeholder(String),
}

/// Scales `(width, height)` so it fits the box, keeping the aspect ratio.
/// Small images are scaled up too.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let ratio = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    (
        ((width as f64 * ratio) as u32).max(1),
        ((height as f64 * ratio) as u32).max(1),
    )
}

pub fn load_preview(path: Option<&Path>) -> Preview {
    let path = match path {
        Some(path) if path.exists() => path,
        _ => return Preview::Placeholder(String::from("No image")),
    };
    match image::open(path) {
        Ok(img) => {
            let (width, height) = fit_dimensions(img.width(), img.height(), MAX_WIDTH, MAX_HEIGHT);
            debug!(
                "[Image] {:?}: {}x{} -> {}x{}",
                path,
                img.width(),
                img.height(),
                width,
                height
            );
            Preview::Fitted(img.resize_exact(width, height, FilterType::Lanczos3).to_rgba8())
        }
        Err(err) => {
            warn!("[Image] Cannot load {:?}: {}", path, err);
            Preview::Placeholder(format!("Failed to load image: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn wide_image_is_bound_by_width() {
        assert_eq!(fit_dimensions(1600, 400, 800, 400), (800, 200));
    }

    #[test]
    fn tall_image_is_bound_by_height() {
        assert_eq!(fit_dimensions(300, 600, 800, 400), (200, 400));
    }

    #[test]
    fn small_image_is_scaled_up() {
        assert_eq!(fit_dimensions(100, 100, 800, 400), (400, 400));
    }

    #[test]
    fn absent_path_is_no_image() {
        assert!(matches!(load_preview(None), Preview::Placeholder(text) if text == "No image"));
        assert!(matches!(
            load_preview(Some(Path::new("/no/such/file.png"))),
            Preview::Placeholder(text) if text == "No image"
        ));
    }

    #[test]
    fn undecodable_file_gets_failure_text() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"definitely not a png").unwrap();
        match load_preview(Some(file.path())) {
            Preview::Placeholder(text) => assert!(text.starts_with("Failed to load image")),
            Preview::Fitted(_) => panic!("garbage decoded as an image"),
        }
    }

    #[test]
    fn decodable_file_is_fitted() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        RgbaImage::new(40, 10).save(file.path()).unwrap();
        match load_preview(Some(file.path())) {
            Preview::Fitted(img) => assert_eq!(img.dimensions(), (800, 200)),
            Preview::Placeholder(text) => panic!("{text}"),
        }
    }
}
