/* Copyright 2020 @TwoCookingMice */

use crate::core::error::RenderError;
use crate::math::bitmap::Bitmap;

use exr::prelude::write_rgb_file;

// Write the linear film as an RGB OpenEXR image
pub fn write_exr_to_file(image: &Bitmap, file_path: &str) -> Result<(), RenderError> {
    log::info!("Starting writing openexr images: {}.", file_path);

    let width = image.width();
    let pixels = image.raw_copy();
    write_rgb_file(file_path, width, image.height(), |x, y| {
        let p = pixels[y * width + x];
        (p.0, p.1, p.2)
    })
    .map_err(|e| RenderError::Image(e.to_string()))?;

    log::info!("EXR written to: {}.", file_path);
    Ok(())
}
