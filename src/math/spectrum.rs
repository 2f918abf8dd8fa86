// Copyright 2020 @TwoCookingMice

//! Scalar spectral curves over the normalised visible range.
//!
//! Wavelengths are carried as `rho` in `[0, 1]`, mapped linearly onto
//! `[LAMBDA_MIN_NM, LAMBDA_MAX_NM]`.

use super::constants::{Float, Vector3f};

pub const LAMBDA_MIN_NM: Float = 380.0;
pub const LAMBDA_MAX_NM: Float = 720.0;

/// Film response white point; default wavelength for fresh path vertices.
pub const WHITE_POINT: Float = 0.5;

pub fn to_nanometers(rho: Float) -> Float {
    LAMBDA_MIN_NM + rho.clamp(0.0, 1.0) * (LAMBDA_MAX_NM - LAMBDA_MIN_NM)
}

pub fn gaussian(x: Float, mu: Float, sigma: Float) -> Float {
    let d = (x - mu) / sigma;
    (-0.5 * d * d).exp()
}

/// Reflectance curve: a flat base plus one Gaussian lobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralResponse {
    pub base: Float,
    pub amplitude: Float,
    pub peak: Float,
    pub width: Float,
}

impl Default for SpectralResponse {
    fn default() -> Self {
        Self { base: 0.5, amplitude: 0.0, peak: WHITE_POINT, width: 0.1 }
    }
}

impl SpectralResponse {
    pub fn new(base: Float, amplitude: Float, peak: Float, width: Float) -> Self {
        Self { base, amplitude, peak, width: width.max(1e-3) }
    }

    pub fn flat(value: Float) -> Self {
        Self::new(value, 0.0, WHITE_POINT, 0.1)
    }

    // Kept strictly below one so every bounce loses energy.
    pub fn eval(&self, rho: Float) -> Float {
        (self.base + self.amplitude * gaussian(rho, self.peak, self.width)).clamp(0.0, 0.98)
    }
}

/// Relative sky radiance at `rho` for an exit direction with vertical
/// component `dir_y`.
pub fn sky_radiance(rho: Float, dir_y: Float) -> Float {
    if dir_y < 0.0 {
        return 0.25;
    }
    let zenith = 1.4 - 0.8 * rho;
    let t = dir_y.min(1.0);
    (1.0 - t) + t * zenith
}

/// Unnormalised RGB film response curves.
pub fn spectral_to_rgb(rho: Float) -> Vector3f {
    Vector3f::new(
        gaussian(rho, 0.78, 0.09),
        gaussian(rho, 0.5, 0.09),
        gaussian(rho, 0.2, 0.09),
    )
}

/// Integral of each response curve over `[0, 1]` (midpoint rule).
pub fn response_integrals(steps: usize) -> Vector3f {
    let steps = steps.max(1);
    let dx = 1.0 / steps as Float;
    (0..steps).fold(Vector3f::zeros(), |acc, i| {
        acc + spectral_to_rgb((i as Float + 0.5) * dx) * dx
    })
}
