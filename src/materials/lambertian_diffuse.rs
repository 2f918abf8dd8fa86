// Copyright @yucwang 2023

use crate::core::material::ScatterRecord;
use crate::math::constants::{ INV_PI, Float, Vector2f };
use crate::math::spectrum::SpectralResponse;
use crate::math::warp::{ sample_cosine_hemisphere, sample_cosine_hemisphere_pdf };

/// Cosine-weighted direction about the local `+z` normal.
pub fn diffuse_surface_sample(u: Vector2f) -> ScatterRecord {
    let dir = sample_cosine_hemisphere(&u);
    let cos_theta = dir.z;
    ScatterRecord {
        dir,
        pdf: sample_cosine_hemisphere_pdf(cos_theta),
        cos_theta,
    }
}

/// Lambertian BRDF value at `rho`.
pub fn diffuse_lambert_reflection(response: &SpectralResponse, rho: Float) -> Float {
    response.eval(rho) * INV_PI
}
