// Copyright @yucwang 2021

use crate::core::error::RenderError;
use crate::core::material::MaterialRegistry;
use crate::emitters::sky::Sky;
use crate::volumes::grid::VolumeGrid;

/// Voxel grid, the materials its labels refer to, and the sky.
#[derive(Debug, Clone)]
pub struct Scene {
    grid: VolumeGrid,
    materials: MaterialRegistry,
    sky: Sky,
}

impl Scene {
    /// Fails when an occupied cell carries a label with no material.
    pub fn new(grid: VolumeGrid, materials: MaterialRegistry, sky: Sky) -> Result<Self, RenderError> {
        if let Some(label) = grid.labels().find(|&l| materials.get(l).is_none()) {
            log::error!("grid references unknown material label {}", label);
            return Err(RenderError::UnsupportedMaterial(label));
        }
        log::info!(
            "scene: {}^3 grid, {} occupied cells, {} materials",
            grid.resolution(),
            grid.occupied_count(),
            materials.len()
        );
        Ok(Self { grid, materials, sky })
    }

    #[cfg(test)]
    pub(crate) fn new_unchecked(grid: VolumeGrid, materials: MaterialRegistry, sky: Sky) -> Self {
        Self { grid, materials, sky }
    }

    pub fn grid(&self) -> &VolumeGrid {
        &self.grid
    }

    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    pub fn sky(&self) -> &Sky {
        &self.sky
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::material::Material;
    use crate::math::spectrum::SpectralResponse;
    use crate::volumes::grid::GridTransform;

    #[test]
    fn unknown_labels_are_rejected() {
        let mut grid = VolumeGrid::new(2, GridTransform::default()).unwrap();
        grid.set_cell([0, 0, 0], 3);
        let mut materials = MaterialRegistry::new();
        materials.add(Material::diffuse("clay", SpectralResponse::flat(0.5)));
        match Scene::new(grid, materials, Sky::default()) {
            Err(RenderError::UnsupportedMaterial(label)) => assert_eq!(label, 3),
            other => panic!("expected unsupported material, got {:?}", other.map(|_| ())),
        }
    }
}
