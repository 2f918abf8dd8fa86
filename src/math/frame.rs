// Copyright @yucwang 2023

use crate::math::constants::{ Vector3f };

/// Orthonormal shading basis; `z` is the surface normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: Vector3f,
    pub y: Vector3f,
    pub z: Vector3f
}

impl Default for Frame {
    fn default() -> Self {
        Frame {
            x: Vector3f::new(1.0, 0.0, 0.0),
            y: Vector3f::new(0.0, 1.0, 0.0),
            z: Vector3f::new(0.0, 0.0, 1.0)
        }
    }
}

impl Frame {
    pub fn from_normal(n: &Vector3f) -> Frame {
        let up = if n.z.abs() < 0.999 {
            Vector3f::new(0.0, 0.0, 1.0)
        } else {
            Vector3f::new(1.0, 0.0, 0.0)
        };
        let tangent = n.cross(&up).normalize();
        let bitangent = n.cross(&tangent).normalize();
        Frame {
            x: tangent,
            y: bitangent,
            z: *n
        }
    }

    pub fn to_local(&self, v: &Vector3f) -> Vector3f {
        Vector3f::new(v.dot(&self.x), v.dot(&self.y), v.dot(&self.z))
    }

    pub fn from_local(&self, v: &Vector3f) -> Vector3f {
        v.x * self.x + v.y * self.y + v.z * self.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_axis_aligned_normals() {
        for n in [Vector3f::new(1.0, 0.0, 0.0), Vector3f::new(0.0, -1.0, 0.0), Vector3f::new(0.0, 0.0, 1.0)] {
            let frame = Frame::from_normal(&n);
            assert!(frame.x.dot(&frame.y).abs() < 1e-5);
            assert!(frame.x.dot(&frame.z).abs() < 1e-5);

            let up = frame.from_local(&Vector3f::new(0.0, 0.0, 1.0));
            assert!((up - n).norm() < 1e-5);

            let v = Vector3f::new(0.3, -0.2, 0.9).normalize();
            let back = frame.to_local(&frame.from_local(&v));
            assert!((back - v).norm() < 1e-5);
        }
    }
}
