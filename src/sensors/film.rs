// Copyright @yucwang 2026

use crate::core::sensor::SensorStage;
use crate::math::constants::{Float, Vector3f};
use crate::math::spectrum::{response_integrals, spectral_to_rgb};

/// Running mean of linear RGB for one screen cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilmPixel {
    pub mean: Vector3f,
}

impl Default for FilmPixel {
    fn default() -> Self {
        Self { mean: Vector3f::zeros() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color8 {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Maps normalised wavelengths to RGB through three response curves, each
/// scaled to unit integral so a flat unit spectrum resolves to white.
pub struct SpectralFilm {
    exposure: Float,
    channel_norm: Vector3f,
}

impl Default for SpectralFilm {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SpectralFilm {
    pub fn new(exposure: Float) -> Self {
        Self {
            exposure,
            channel_norm: response_integrals(1024),
        }
    }

    pub fn exposure(&self) -> Float {
        self.exposure
    }

    pub fn response_rgb(&self, rho: Float) -> Vector3f {
        spectral_to_rgb(rho).component_div(&self.channel_norm)
    }
}

fn encode_channel(v: Float) -> u8 {
    let mapped = v.max(0.0) / (1.0 + v.max(0.0));
    (mapped.powf(1.0 / 2.2) * 255.0).round().clamp(0.0, 255.0) as u8
}

impl SensorStage for SpectralFilm {
    fn sensor_response(&self,
                       pixel: &mut FilmPixel,
                       rho: Float,
                       weight: Float,
                       pdf: Float,
                       power: Float,
                       sample_count: u32) {
        let energy = if pdf > 0.0 { weight * power / pdf } else { 0.0 };
        let energy = if energy.is_finite() { energy } else { 0.0 };
        let rgb = self.response_rgb(rho) * energy;
        let n = sample_count as Float;
        pixel.mean = (pixel.mean * n + rgb) / (n + 1.0);
    }

    fn tonemap_out(&self, pixel: &FilmPixel) -> Color8 {
        let c = pixel.mean * self.exposure;
        Color8::new(encode_channel(c.x), encode_channel(c.y), encode_channel(c.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_weights_every_sample_equally() {
        let film = SpectralFilm::default();
        let mut pixel = FilmPixel::default();
        film.sensor_response(&mut pixel, 0.5, 1.0, 1.0, 2.0, 0);
        film.sensor_response(&mut pixel, 0.5, 0.0, 1.0, 2.0, 1);
        let single = film.response_rgb(0.5) * 2.0;
        assert!((pixel.mean - single * 0.5).norm() < 1e-5);
    }

    #[test]
    fn flat_spectrum_resolves_to_grey() {
        let film = SpectralFilm::default();
        let mut pixel = FilmPixel::default();
        let steps = 512;
        for i in 0..steps {
            let rho = (i as Float + 0.5) / steps as Float;
            film.sensor_response(&mut pixel, rho, 1.0, 1.0, 1.0, i);
        }
        assert!((pixel.mean.x - 1.0).abs() < 0.02);
        assert!((pixel.mean.y - 1.0).abs() < 0.02);
        assert!((pixel.mean.z - 1.0).abs() < 0.02);
    }

    #[test]
    fn tonemap_is_monotonic_and_bounded() {
        let film = SpectralFilm::default();
        let dark = film.tonemap_out(&FilmPixel::default());
        assert_eq!(dark, Color8::new(0, 0, 0));
        let bright = film.tonemap_out(&FilmPixel { mean: Vector3f::new(1e6, 1.0, 0.1) });
        assert_eq!(bright.r, 255);
        assert!(bright.g > bright.b);
        assert_eq!(bright.a, 255);
    }

    #[test]
    fn zero_pdf_contributes_nothing() {
        let film = SpectralFilm::default();
        let mut pixel = FilmPixel::default();
        film.sensor_response(&mut pixel, 0.5, 1.0, 0.0, 1.0, 0);
        assert_eq!(pixel.mean, Vector3f::zeros());
    }
}
