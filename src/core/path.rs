// Copyright @yucwang 2026

//! Bounded per-ray vertex buffer and its weight resolution.

use crate::core::error::RenderError;
use crate::core::material::MaterialLabel;
use crate::math::constants::{ Float, Vector3f, SQUARE_3 };
use crate::math::spectrum::WHITE_POINT;

/// One bounce record. `material` is the registry label of the struck cell
/// and `None` for vertices that did not strike a surface (sky escape, lens).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathVertex {
    pub dir: Vector3f,
    pub ori: Vector3f,
    // Every sensor cell is sampled exactly once per pass, so lens vertices
    // start at probability one.
    pub pdf: Float,
    pub rho_sample: Float,
    pub rho_weight: Float,
    pub power: Float,
    pub material: Option<MaterialLabel>,
}

impl Default for PathVertex {
    fn default() -> Self {
        Self {
            dir: Vector3f::new(0.0, 0.0, 1.0),
            ori: Vector3f::zeros(),
            pdf: 1.0,
            rho_sample: WHITE_POINT,
            rho_weight: 1.0,
            power: 1.0,
            material: None,
        }
    }
}

impl PathVertex {
    pub fn new(dir: Vector3f, ori: Vector3f, pdf: Float, rho_sample: Float, rho_weight: Float, power: Float) -> Self {
        Self { dir, ori, pdf, rho_sample, rho_weight, power, material: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Tracing,
    Absorbed,
    Escaped,
}

/// Single-sample estimator terms folded over a finished path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedWeights {
    pub rho: Float,
    pub pdf: Float,
    pub response: Float,
    pub power: Float,
}

impl ResolvedWeights {
    pub fn estimate(&self) -> Float {
        if self.pdf <= 0.0 {
            return 0.0;
        }
        let value = self.response * self.power / self.pdf;
        if value.is_finite() { value } else { 0.0 }
    }
}

/// Worst-case number of cells a ray crosses corner to corner.
pub fn capacity_for_resolution(resolution: u32) -> usize {
    ((resolution.max(1) as Float) * SQUARE_3).ceil() as usize
}

#[derive(Debug, Clone)]
pub struct Path {
    vertices: Vec<PathVertex>,
    capacity: usize,
    state: PathState,
}

impl Path {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
            capacity,
            state: PathState::Tracing,
        }
    }

    pub fn for_resolution(resolution: u32) -> Self {
        Self::with_capacity(capacity_for_resolution(resolution))
    }

    /// Appends a vertex. Overflow is a contract violation; the vertex is
    /// not dropped silently.
    pub fn push(&mut self, vt: PathVertex) -> Result<(), RenderError> {
        if self.vertices.len() >= self.capacity {
            log::error!("path buffer overflow at {} vertices", self.capacity);
            return Err(RenderError::PathOverflow { capacity: self.capacity });
        }
        self.vertices.push(vt);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.state = PathState::Tracing;
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    pub fn state(&self) -> PathState {
        self.state
    }

    pub fn set_state(&mut self, state: PathState) {
        self.state = state;
    }

    /// Running product over the vertices in traversal order. Only escaped
    /// paths reach an emitter, so every other path resolves to zero power.
    pub fn resolve_weights(&self) -> ResolvedWeights {
        let mut resolved = ResolvedWeights {
            rho: WHITE_POINT,
            pdf: 1.0,
            response: 1.0,
            power: 1.0,
        };
        for vt in &self.vertices {
            resolved.rho = vt.rho_sample;
            resolved.pdf *= vt.pdf;
            resolved.response *= vt.rho_weight;
            resolved.power *= vt.power;
        }
        if self.state != PathState::Escaped || self.vertices.is_empty() {
            resolved.power = 0.0;
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(pdf: Float, rho_weight: Float, power: Float) -> PathVertex {
        PathVertex::new(Vector3f::new(0.0, 1.0, 0.0), Vector3f::zeros(), pdf, 0.25, rho_weight, power)
    }

    #[test]
    fn capacity_matches_grid_diagonal() {
        assert_eq!(capacity_for_resolution(1024), 1774);
        assert_eq!(capacity_for_resolution(1), 2);
        assert_eq!(Path::for_resolution(64).capacity(), 111);
    }

    #[test]
    fn resolve_compounds_bounces() {
        let mut path = Path::with_capacity(4);
        path.push(vertex(0.5, 0.25, 1.0)).unwrap();
        path.push(vertex(0.2, 0.1, 1.0)).unwrap();
        path.push(vertex(1.0, 1.0, 3.0)).unwrap();
        path.set_state(PathState::Escaped);

        let w = path.resolve_weights();
        assert!((w.pdf - 0.1).abs() < 1e-6);
        assert!((w.response - 0.025).abs() < 1e-6);
        assert!((w.power - 3.0).abs() < 1e-6);
        assert!((w.estimate() - 0.75).abs() < 1e-5);
        assert_eq!(w.rho, 0.25);
    }

    #[test]
    fn absorbed_paths_carry_no_power() {
        let mut path = Path::with_capacity(2);
        path.push(vertex(0.5, 0.25, 1.0)).unwrap();
        path.set_state(PathState::Absorbed);
        assert_eq!(path.resolve_weights().power, 0.0);
        assert_eq!(path.resolve_weights().estimate(), 0.0);
    }

    #[test]
    fn overflow_is_reported_not_truncated() {
        let mut path = Path::with_capacity(1);
        path.push(vertex(1.0, 1.0, 1.0)).unwrap();
        match path.push(vertex(1.0, 1.0, 1.0)) {
            Err(RenderError::PathOverflow { capacity }) => assert_eq!(capacity, 1),
            other => panic!("expected overflow, got {:?}", other),
        }
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn clear_resets_for_reuse() {
        let mut path = Path::with_capacity(2);
        path.push(vertex(1.0, 1.0, 1.0)).unwrap();
        path.set_state(PathState::Escaped);
        path.clear();
        assert!(path.is_empty());
        assert_eq!(path.state(), PathState::Tracing);
        assert_eq!(path.capacity(), 2);
    }
}
