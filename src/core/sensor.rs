// Copyright @yucwang 2026

use crate::core::path::PathVertex;
use crate::math::constants::Float;
use crate::sensors::film::{ Color8, FilmPixel };

/// Builds the camera vertex for one screen cell and sample.
pub trait Lens: Sync {
    fn lens_sample(&self, px: Float, py: Float, u: Float, v: Float, rho: Float) -> PathVertex;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn describe(&self) -> String {
        String::from("Lens")
    }
}

/// Accumulates resolved radiance into a cell and reads it back for display.
pub trait SensorStage: Sync {
    fn sensor_response(&self,
                       pixel: &mut FilmPixel,
                       rho: Float,
                       weight: Float,
                       pdf: Float,
                       power: Float,
                       sample_count: u32);
    fn tonemap_out(&self, pixel: &FilmPixel) -> Color8;
}
