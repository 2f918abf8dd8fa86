// Copyright @yucwang 2026

use crate::core::error::RenderError;
use crate::sensors::film::Color8;

/// Writes row-major 8-bit pixels; the format follows the file extension.
pub fn write_png_to_file(pixels: &[Color8], width: usize, height: usize, file_path: &str) -> Result<(), RenderError> {
    if pixels.len() != width * height {
        return Err(RenderError::Image(format!(
            "{} pixels for a {}x{} image", pixels.len(), width, height
        )));
    }
    let bytes: Vec<u8> = pixels.iter().flat_map(|c| [c.r, c.g, c.b, c.a]).collect();
    image::save_buffer(file_path, &bytes, width as u32, height as u32, image::ColorType::Rgba8)
        .map_err(|e| RenderError::Image(e.to_string()))?;
    log::info!("Image written to: {}.", file_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_image_crate() {
        let pixels = vec![Color8::new(10, 20, 30), Color8::new(200, 100, 0)];
        let path = std::env::temp_dir().join("spectravox_image_utils_test.png");
        let path = path.to_string_lossy().to_string();
        write_png_to_file(&pixels, 2, 1, &path).unwrap();

        let read = image::open(&path).unwrap().to_rgba8();
        assert_eq!(read.dimensions(), (2, 1));
        assert_eq!(read.get_pixel(1, 0).0, [200, 100, 0, 255]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let pixels = vec![Color8::default(); 3];
        assert!(matches!(write_png_to_file(&pixels, 2, 2, "unused.png"), Err(RenderError::Image(_))));
    }
}
