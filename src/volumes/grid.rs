// Copyright @yucwang 2026

use crate::core::error::RenderError;
use crate::core::material::{ MaterialLabel, EMPTY_LABEL };
use crate::math::aabb::AABB;
use crate::math::constants::{ Float, Vector3f, FLOAT_MAX };
use crate::math::ray::Ray3f;

/// Largest supported resolution per axis; path capacities are sized for it.
pub const MAX_GRID_RESOLUTION: u32 = 1024;

/// Integer voxel coordinates, non-negative by construction.
pub type Voxel = [u32; 3];

/// Object-space placement of the grid: `pos` is the centre of the bounding
/// box and `scale` its extent along each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTransform {
    pub pos: Vector3f,
    pub scale: Vector3f,
}

impl Default for GridTransform {
    fn default() -> Self {
        Self { pos: Vector3f::zeros(), scale: Vector3f::new(1.0, 1.0, 1.0) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Empty,
    Occupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStep {
    Next(Voxel),
    /// Crossed the outer boundary of the grid.
    Exited,
    /// No boundary ahead along the direction (zero or NaN components).
    Degenerate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridEntry {
    pub pos: Vector3f,
    pub t: Float,
}

#[derive(Debug, Clone)]
pub struct VolumeGrid {
    resolution: u32,
    labels: Vec<MaterialLabel>,
    transform: GridTransform,
    bbox: AABB,
    occupied: usize,
}

impl VolumeGrid {
    pub fn new(resolution: u32, transform: GridTransform) -> Result<Self, RenderError> {
        if resolution == 0 || resolution > MAX_GRID_RESOLUTION {
            return Err(RenderError::InvalidGrid(format!(
                "resolution {} outside 1..={}", resolution, MAX_GRID_RESOLUTION
            )));
        }
        if (0..3).any(|a| !(transform.scale[a] > 0.0) || !transform.scale[a].is_finite()) {
            return Err(RenderError::InvalidGrid(format!("non-positive scale {:?}", transform.scale)));
        }

        let cells = (resolution as usize).pow(3);
        let half = transform.scale * 0.5;
        Ok(Self {
            resolution,
            labels: vec![EMPTY_LABEL; cells],
            transform,
            bbox: AABB::new(transform.pos - half, transform.pos + half),
            occupied: 0,
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn transform(&self) -> &GridTransform {
        &self.transform
    }

    pub fn bbox(&self) -> &AABB {
        &self.bbox
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied
    }

    pub fn cell_size(&self) -> Vector3f {
        self.transform.scale / self.resolution as Float
    }

    pub fn cell_diagonal(&self) -> Float {
        self.cell_size().norm()
    }

    fn index(&self, v: Voxel) -> usize {
        let r = self.resolution as usize;
        (v[2] as usize * r + v[1] as usize) * r + v[0] as usize
    }

    pub fn in_range(&self, v: Voxel) -> bool {
        v.iter().all(|&c| c < self.resolution)
    }

    pub fn set_cell(&mut self, v: Voxel, label: MaterialLabel) {
        if !self.in_range(v) {
            return;
        }
        let idx = self.index(v);
        let was_occupied = self.labels[idx] != EMPTY_LABEL;
        self.labels[idx] = label;
        match (was_occupied, label != EMPTY_LABEL) {
            (false, true) => self.occupied += 1,
            (true, false) => self.occupied -= 1,
            _ => {}
        }
    }

    pub fn material_label(&self, v: Voxel) -> Option<MaterialLabel> {
        if !self.in_range(v) {
            return None;
        }
        match self.labels[self.index(v)] {
            EMPTY_LABEL => None,
            label => Some(label),
        }
    }

    pub fn test_cell_state(&self, v: Voxel) -> CellStatus {
        match self.material_label(v) {
            Some(_) => CellStatus::Occupied,
            None => CellStatus::Empty,
        }
    }

    /// Labels of all occupied cells.
    pub fn labels(&self) -> impl Iterator<Item = MaterialLabel> + '_ {
        self.labels.iter().copied().filter(|&l| l != EMPTY_LABEL)
    }

    /// Position relative to the lower grid corner, normalised to `[0, 1]`.
    pub fn uvw(&self, p: &Vector3f) -> Vector3f {
        let rel = (p - self.transform.pos) + self.transform.scale * 0.5;
        rel.component_div(&self.transform.scale)
    }

    /// Floors scaled UVW coordinates into the grid. Out-of-range and NaN
    /// components are clamped so the result is always a valid cell.
    pub fn voxel_at(&self, p: &Vector3f) -> Voxel {
        let scaled = self.uvw(p) * self.resolution as Float;
        let max = (self.resolution - 1) as Float;
        let mut v = [0u32; 3];
        for axis in 0..3 {
            let c = scaled[axis].floor();
            if !c.is_finite() {
                log::debug!("non-finite voxel coordinate {} on axis {}, clamping", c, axis);
                continue;
            }
            v[axis] = c.clamp(0.0, max) as u32;
        }
        v
    }

    pub fn cell_bounds(&self, v: Voxel) -> AABB {
        let size = self.cell_size();
        let min = self.bbox.p_min + Vector3f::new(
            v[0] as Float * size.x,
            v[1] as Float * size.y,
            v[2] as Float * size.z,
        );
        AABB::new(min, min + size)
    }

    /// Where a ray starting at `ori` first lies within the grid bounds.
    pub fn enter(&self, ori: &Vector3f, dir: &Vector3f) -> Option<GridEntry> {
        if !(dir.norm_squared() > 0.0) {
            return if self.bbox.contains(ori) {
                Some(GridEntry { pos: *ori, t: 0.0 })
            } else {
                None
            };
        }
        let ray = Ray3f::new(*ori, *dir, Some(0.0), None);
        let (t_min, _) = self.bbox.ray_intersect_range(&ray)?;
        Some(GridEntry { pos: ray.at(t_min), t: t_min })
    }

    /// Moves `ori` to the exit boundary of cell `v` and returns the
    /// neighbour across it.
    pub fn step_cell(&self, v: Voxel, ori: &mut Vector3f, dir: &Vector3f) -> CellStep {
        let bounds = self.cell_bounds(v);
        let mut best_t = FLOAT_MAX;
        let mut best_axis = None;
        for axis in 0..3 {
            let d = dir[axis];
            if !(d.abs() > 1e-12) {
                continue;
            }
            let boundary = if d > 0.0 { bounds.p_max[axis] } else { bounds.p_min[axis] };
            let t = ((boundary - ori[axis]) / d).max(0.0);
            if t < best_t {
                best_t = t;
                best_axis = Some(axis);
            }
        }

        let axis = match best_axis {
            Some(axis) if best_t.is_finite() => axis,
            _ => return CellStep::Degenerate,
        };

        *ori += dir * best_t;
        let positive = dir[axis] > 0.0;
        ori[axis] = if positive { bounds.p_max[axis] } else { bounds.p_min[axis] };

        let mut next = v;
        if positive {
            if v[axis] + 1 >= self.resolution {
                return CellStep::Exited;
            }
            next[axis] += 1;
        } else {
            if v[axis] == 0 {
                return CellStep::Exited;
            }
            next[axis] -= 1;
        }
        CellStep::Next(next)
    }

    /// Face of cell `v` through which a ray travelling along `dir` entered
    /// it, found by walking back from `ori`. Returns the point on that face
    /// and its outward normal.
    pub fn entry_face(&self, v: Voxel, ori: &Vector3f, dir: &Vector3f) -> (Vector3f, Vector3f) {
        let bounds = self.cell_bounds(v);
        let mut best_t = FLOAT_MAX;
        let mut best_axis = None;
        for axis in 0..3 {
            let d = dir[axis];
            if !(d.abs() > 1e-12) {
                continue;
            }
            let near = if d > 0.0 { bounds.p_min[axis] } else { bounds.p_max[axis] };
            let t = ((ori[axis] - near) / d).max(0.0);
            if t < best_t {
                best_t = t;
                best_axis = Some(axis);
            }
        }

        match best_axis {
            Some(axis) if best_t.is_finite() => {
                let positive = dir[axis] > 0.0;
                let mut pos = ori - dir * best_t;
                pos[axis] = if positive { bounds.p_min[axis] } else { bounds.p_max[axis] };
                let mut normal = Vector3f::zeros();
                normal[axis] = if positive { -1.0 } else { 1.0 };
                (pos, normal)
            }
            _ => (*ori, Vector3f::new(0.0, 0.0, 1.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid(resolution: u32) -> VolumeGrid {
        VolumeGrid::new(resolution, GridTransform::default()).unwrap()
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert!(VolumeGrid::new(0, GridTransform::default()).is_err());
        assert!(VolumeGrid::new(MAX_GRID_RESOLUTION + 1, GridTransform::default()).is_err());
        let flat = GridTransform { pos: Vector3f::zeros(), scale: Vector3f::new(1.0, 0.0, 1.0) };
        assert!(VolumeGrid::new(4, flat).is_err());
    }

    #[test]
    fn occupancy_bookkeeping() {
        let mut grid = unit_grid(4);
        grid.set_cell([1, 2, 3], 2);
        grid.set_cell([1, 2, 3], 1);
        grid.set_cell([9, 0, 0], 1);
        assert_eq!(grid.occupied_count(), 1);
        assert_eq!(grid.test_cell_state([1, 2, 3]), CellStatus::Occupied);
        assert_eq!(grid.material_label([1, 2, 3]), Some(1));
        assert_eq!(grid.test_cell_state([0, 0, 0]), CellStatus::Empty);
        grid.set_cell([1, 2, 3], EMPTY_LABEL);
        assert_eq!(grid.occupied_count(), 0);
        assert_eq!(grid.labels().count(), 0);
    }

    #[test]
    fn voxel_coordinates_are_floored_and_clamped() {
        let grid = unit_grid(4);
        assert_eq!(grid.voxel_at(&Vector3f::new(-0.5, -0.5, -0.5)), [0, 0, 0]);
        assert_eq!(grid.voxel_at(&Vector3f::new(0.5, 0.5, 0.5)), [3, 3, 3]);
        assert_eq!(grid.voxel_at(&Vector3f::new(-0.2, 0.01, 0.3)), [1, 2, 3]);
        assert_eq!(grid.voxel_at(&Vector3f::new(-7.0, 9.0, Float::NAN)), [0, 3, 0]);
    }

    #[test]
    fn entry_from_outside_and_inside() {
        let grid = unit_grid(4);
        let outside = grid.enter(&Vector3f::new(-2.0, 0.1, 0.1), &Vector3f::new(1.0, 0.0, 0.0)).unwrap();
        assert!((outside.t - 1.5).abs() < 1e-5);
        assert!((outside.pos.x + 0.5).abs() < 1e-5);

        let inside = grid.enter(&Vector3f::new(0.1, 0.1, 0.1), &Vector3f::new(0.0, 1.0, 0.0)).unwrap();
        assert_eq!(inside.t, 0.0);

        assert!(grid.enter(&Vector3f::new(-2.0, 2.0, 0.0), &Vector3f::new(1.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn marching_an_empty_grid_terminates() {
        let grid = unit_grid(8);
        let dir = Vector3f::new(0.3, 0.5, 0.81).normalize();
        let entry = grid.enter(&Vector3f::new(-1.0, -1.0, -1.5), &dir).unwrap();
        let mut ori = entry.pos;
        let mut cell = grid.voxel_at(&ori);
        let mut steps = 0;
        loop {
            match grid.step_cell(cell, &mut ori, &dir) {
                CellStep::Next(next) => cell = next,
                CellStep::Exited => break,
                CellStep::Degenerate => panic!("unexpected degenerate step"),
            }
            steps += 1;
            assert!(steps <= 3 * 8);
        }
        let b = grid.bbox();
        assert!((0..3).all(|a| ori[a] >= b.p_min[a] - 1e-4 && ori[a] <= b.p_max[a] + 1e-4));
    }

    #[test]
    fn degenerate_direction_is_reported() {
        let grid = unit_grid(4);
        let mut ori = Vector3f::new(0.1, 0.1, 0.1);
        assert_eq!(grid.step_cell([2, 2, 2], &mut ori, &Vector3f::zeros()), CellStep::Degenerate);
        let nan = Vector3f::new(Float::NAN, 0.0, 0.0);
        assert_eq!(grid.step_cell([2, 2, 2], &mut ori, &nan), CellStep::Degenerate);
    }

    #[test]
    fn entry_face_walks_back_to_the_crossed_face() {
        let grid = unit_grid(2);
        let dir = Vector3f::new(1.0, 0.2, 0.0).normalize();
        let (pos, normal) = grid.entry_face([1, 0, 0], &Vector3f::new(0.2, -0.2, 0.1), &dir);
        assert_eq!(normal, Vector3f::new(-1.0, 0.0, 0.0));
        assert!(pos.x.abs() < 1e-6);
        assert!(pos.y < -0.2);
    }
}
