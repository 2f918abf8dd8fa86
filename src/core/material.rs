// Copyright @yucwang 2026

//! Tagged material variants and the scene-owned registry they live in.

use crate::materials::lambertian_diffuse::{ diffuse_lambert_reflection, diffuse_surface_sample };
use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::math::spectrum::SpectralResponse;

/// Cell label stored in the voxel grid. `0` marks an empty cell.
pub type MaterialLabel = u8;

pub const EMPTY_LABEL: MaterialLabel = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Diffuse,
}

impl MaterialKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "diffuse" | "lambertian" => Some(MaterialKind::Diffuse),
            _ => None,
        }
    }
}

/// Outgoing direction drawn in the local shading frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterRecord {
    pub dir: Vector3f,
    pub pdf: Float,
    pub cos_theta: Float,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    name: String,
    kind: MaterialKind,
    response: SpectralResponse,
}

impl Material {
    pub fn diffuse(name: &str, response: SpectralResponse) -> Self {
        Self { name: name.to_string(), kind: MaterialKind::Diffuse, response }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    pub fn response(&self) -> &SpectralResponse {
        &self.response
    }

    pub fn sample(&self, u: Vector2f) -> ScatterRecord {
        match self.kind {
            MaterialKind::Diffuse => diffuse_surface_sample(u),
        }
    }

    /// BRDF value at wavelength `rho`.
    pub fn eval(&self, rho: Float) -> Float {
        match self.kind {
            MaterialKind::Diffuse => diffuse_lambert_reflection(&self.response, rho),
        }
    }
}

/// Materials indexed by grid label; label `n` refers to the `n`-th material
/// added (1-based).
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: Vec<Material>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self { materials: Vec::new() }
    }

    pub fn add(&mut self, material: Material) -> Option<MaterialLabel> {
        if self.materials.len() >= MaterialLabel::MAX as usize {
            return None;
        }
        self.materials.push(material);
        Some(self.materials.len() as MaterialLabel)
    }

    pub fn get(&self, label: MaterialLabel) -> Option<&Material> {
        if label == EMPTY_LABEL {
            return None;
        }
        self.materials.get(label as usize - 1)
    }

    pub fn label_of(&self, name: &str) -> Option<MaterialLabel> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(|idx| (idx + 1) as MaterialLabel)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_labels_are_one_based() {
        let mut registry = MaterialRegistry::new();
        let clay = registry.add(Material::diffuse("clay", SpectralResponse::flat(0.5))).unwrap();
        let moss = registry.add(Material::diffuse("moss", SpectralResponse::new(0.1, 0.6, 0.45, 0.08))).unwrap();
        assert_eq!(clay, 1);
        assert_eq!(moss, 2);
        assert_eq!(registry.get(clay).unwrap().name(), "clay");
        assert_eq!(registry.label_of("moss"), Some(2));
        assert!(registry.get(EMPTY_LABEL).is_none());
        assert!(registry.get(3).is_none());
    }

    #[test]
    fn material_kind_names() {
        assert_eq!(MaterialKind::from_name("diffuse"), Some(MaterialKind::Diffuse));
        assert_eq!(MaterialKind::from_name("glass"), None);
    }
}
