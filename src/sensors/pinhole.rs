// Copyright @yucwang 2026

use crate::core::path::PathVertex;
use crate::core::sensor::Lens;
use crate::math::constants::{Float, Vector3f};

pub struct PinholeLens {
    origin: Vector3f,
    forward: Vector3f,
    right: Vector3f,
    up: Vector3f,
    tan_half_fov_y: Float,
    aspect: Float,
    width: usize,
    height: usize,
    jitter: bool,
}

impl PinholeLens {
    pub fn new(origin: Vector3f,
               target: Vector3f,
               up: Vector3f,
               fov_y_radians: Float,
               width: usize,
               height: usize) -> Self {
        let forward = (target - origin).normalize();
        let right = forward.cross(&up).normalize();
        let up = right.cross(&forward).normalize();
        let aspect = if height > 0 { width as Float / height as Float } else { 1.0 };

        Self {
            origin,
            forward,
            right,
            up,
            tan_half_fov_y: (0.5 * fov_y_radians).tan(),
            aspect,
            width,
            height,
            jitter: true,
        }
    }

    /// With jitter off every sample goes through the cell centre.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn origin(&self) -> Vector3f {
        self.origin
    }
}

impl Lens for PinholeLens {
    fn lens_sample(&self, px: Float, py: Float, u: Float, v: Float, rho: Float) -> PathVertex {
        let (u, v) = if self.jitter { (u, v) } else { (0.5, 0.5) };
        let sx = (px + u) / self.width.max(1) as Float;
        let sy = (py + v) / self.height.max(1) as Float;

        let cx = (2.0 * sx - 1.0) * self.aspect * self.tan_half_fov_y;
        let cy = (1.0 - 2.0 * sy) * self.tan_half_fov_y;
        let dir = (self.right * cx + self.up * cy + self.forward).normalize();

        PathVertex {
            dir,
            ori: self.origin,
            rho_sample: rho,
            ..PathVertex::default()
        }
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn describe(&self) -> String {
        format!("PinholeLens {}x{} at {:?}", self.width, self.height, self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinhole_center_ray() {
        let lens = PinholeLens::new(Vector3f::new(0.0, 0.0, 0.0),
                                    Vector3f::new(0.0, 0.0, -1.0),
                                    Vector3f::new(0.0, 1.0, 0.0),
                                    std::f32::consts::FRAC_PI_2,
                                    4, 4).with_jitter(false);

        let vt = lens.lens_sample(1.5, 1.5, 0.1, 0.9, 0.3);
        assert!(vt.dir.x.abs() < 1e-6);
        assert!(vt.dir.y.abs() < 1e-6);
        assert!((vt.dir.z + 1.0).abs() < 1e-6);
        assert_eq!(vt.rho_sample, 0.3);
        assert_eq!(vt.pdf, 1.0);
        assert!(vt.material.is_none());
    }

    #[test]
    fn top_left_cell_looks_up_and_left() {
        let lens = PinholeLens::new(Vector3f::zeros(),
                                    Vector3f::new(0.0, 0.0, -1.0),
                                    Vector3f::new(0.0, 1.0, 0.0),
                                    1.0, 8, 8);
        let vt = lens.lens_sample(0.0, 0.0, 0.5, 0.5, 0.5);
        assert!(vt.dir.x < 0.0);
        assert!(vt.dir.y > 0.0);
    }
}
