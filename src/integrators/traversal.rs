// Copyright @yucwang 2026

//! Marches camera paths through the voxel grid, scattering off occupied
//! cells until the path is absorbed or escapes to the sky.

use crate::core::error::RenderError;
use crate::core::path::{ Path, PathState, PathVertex };
use crate::core::rng::LcgRng;
use crate::core::scene::Scene;
use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::math::frame::Frame;
use crate::volumes::grid::{ CellStatus, CellStep, VolumeGrid, Voxel };

/// Isosurface cache value for a cell whose first grid hit is not known yet.
/// Zero is a valid cached distance (surface on the grid boundary).
pub const ISOSURFACE_UNSET: Float = -1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraversalSettings {
    pub max_bounces: u32,
    pub absorption_epsilon: Float,
    pub use_isosurface_cache: bool,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self {
            max_bounces: 8,
            absorption_epsilon: 1e-4,
            use_isosurface_cache: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
    /// Loop iterations, the sky termination included.
    pub bounces: u32,
    pub first_hit: Option<Voxel>,
}

/// Walks from `cell` (with the ray at `pos`) until an occupied cell is found
/// or the ray leaves the grid. A masked start cell is skipped once.
fn march(grid: &VolumeGrid,
         mut cell: Voxel,
         pos: &mut Vector3f,
         dir: &Vector3f,
         mut masked: bool) -> Option<Voxel> {
    loop {
        if !masked && grid.test_cell_state(cell) == CellStatus::Occupied {
            return Some(cell);
        }
        masked = false;
        match grid.step_cell(cell, pos, dir) {
            CellStep::Next(next) => cell = next,
            CellStep::Exited => return None,
            CellStep::Degenerate => {
                log::debug!("degenerate cell step at {:?} along {:?}, leaving grid", cell, dir);
                return None;
            }
        }
    }
}

/// Traces one camera path. `camera` seeds the ray and the wavelength;
/// vertices are appended to `path`, which must be empty on entry.
/// `isosurface` is the memoised first-hit distance for the screen cell the
/// camera vertex belongs to.
pub fn iterate(scene: &Scene,
               camera: &PathVertex,
               path: &mut Path,
               isosurface: &mut Float,
               rng: &mut LcgRng,
               settings: &TraversalSettings) -> Result<TraceStats, RenderError> {
    let grid = scene.grid();
    let rho = camera.rho_sample;
    let max_vertices = path.capacity().min(settings.max_bounces as usize + 1);

    let mut ori = camera.ori;
    let mut dir = camera.dir;
    let mut throughput = camera.rho_weight;
    let mut stats = TraceStats::default();
    let mut primary = true;
    // Cell the ray is leaving after a scatter; it is masked for one test.
    let mut resume: Option<Voxel> = None;

    path.set_state(PathState::Tracing);
    loop {
        stats.bounces += 1;

        let mut hit = None;
        if let Some(cell) = resume.take() {
            hit = march(grid, cell, &mut ori, &dir, true);
        } else if let Some(entry) = grid.enter(&ori, &dir) {
            ori = entry.pos;
            if primary && settings.use_isosurface_cache && *isosurface >= 0.0 {
                let jump = (*isosurface - grid.cell_diagonal()).max(0.0);
                ori = entry.pos + dir * jump;
            }
            let cell = grid.voxel_at(&ori);
            hit = march(grid, cell, &mut ori, &dir, false);
            if let Some(cell) = hit {
                let (pos, _) = grid.entry_face(cell, &ori, &dir);
                if primary && settings.use_isosurface_cache && *isosurface < 0.0 {
                    *isosurface = (pos - entry.pos).norm();
                }
            }
        }

        let cell = match hit {
            Some(cell) => cell,
            None => {
                let (radiance, pdf) = scene.sky().eval(rho, &dir);
                let sky = PathVertex {
                    dir,
                    ori: scene.sky().project(&ori, &dir),
                    pdf,
                    rho_sample: rho,
                    rho_weight: 1.0,
                    power: radiance,
                    material: None,
                };
                path.push(sky)?;
                path.set_state(PathState::Escaped);
                return Ok(stats);
            }
        };

        if primary {
            stats.first_hit = Some(cell);
        }
        primary = false;

        let (pos, normal) = grid.entry_face(cell, &ori, &dir);
        let label = grid.material_label(cell).unwrap_or_default();
        let material = match scene.materials().get(label) {
            Some(material) => material,
            None => {
                log::error!("cell {:?} carries unsupported material label {}", cell, label);
                return Err(RenderError::UnsupportedMaterial(label));
            }
        };

        let u = Vector2f::new(rng.next_f32(), rng.next_f32());
        let record = material.sample(u);
        let rho_weight = material.eval(rho) * record.cos_theta;
        if record.pdf > 0.0 {
            throughput *= rho_weight / record.pdf;
        }

        if !(throughput > settings.absorption_epsilon)
            || !(record.pdf > 0.0)
            || path.len() + 1 >= max_vertices {
            path.set_state(PathState::Absorbed);
            return Ok(stats);
        }

        dir = Frame::from_normal(&normal).from_local(&record.dir).normalize();
        ori = pos;
        path.push(PathVertex {
            dir,
            ori: pos,
            pdf: record.pdf,
            rho_sample: rho,
            rho_weight,
            power: 1.0,
            material: Some(label),
        })?;
        resume = Some(cell);
    }
}
