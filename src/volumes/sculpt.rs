// Copyright @yucwang 2026

//! Fills simple solids into a grid. Coordinates are normalised grid space
//! (`[0, 1]` per axis); a cell is filled when its centre lies inside.

use crate::core::material::MaterialLabel;
use crate::math::constants::{ Float, Vector3f };
use crate::volumes::grid::VolumeGrid;

fn cell_centre(v: [u32; 3], resolution: u32) -> Vector3f {
    let inv = 1.0 / resolution as Float;
    Vector3f::new(
        (v[0] as Float + 0.5) * inv,
        (v[1] as Float + 0.5) * inv,
        (v[2] as Float + 0.5) * inv,
    )
}

fn fill_where<F>(grid: &mut VolumeGrid, label: MaterialLabel, inside: F) -> usize
where
    F: Fn(&Vector3f) -> bool,
{
    let res = grid.resolution();
    let mut filled = 0;
    for z in 0..res {
        for y in 0..res {
            for x in 0..res {
                let v = [x, y, z];
                if inside(&cell_centre(v, res)) {
                    grid.set_cell(v, label);
                    filled += 1;
                }
            }
        }
    }
    filled
}

pub fn fill_sphere(grid: &mut VolumeGrid, center: Vector3f, radius: Float, label: MaterialLabel) -> usize {
    let r2 = radius * radius;
    fill_where(grid, label, |p| (p - center).norm_squared() <= r2)
}

pub fn fill_box(grid: &mut VolumeGrid, min: Vector3f, max: Vector3f, label: MaterialLabel) -> usize {
    fill_where(grid, label, |p| (0..3).all(|a| p[a] >= min[a] && p[a] <= max[a]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volumes::grid::{ CellStatus, GridTransform };

    #[test]
    fn box_covers_expected_cells() {
        let mut grid = VolumeGrid::new(4, GridTransform::default()).unwrap();
        let filled = fill_box(&mut grid, Vector3f::new(0.0, 0.0, 0.0), Vector3f::new(0.5, 0.5, 1.0), 1);
        assert_eq!(filled, 2 * 2 * 4);
        assert_eq!(grid.occupied_count(), 16);
        assert_eq!(grid.test_cell_state([1, 1, 3]), CellStatus::Occupied);
        assert_eq!(grid.test_cell_state([2, 1, 3]), CellStatus::Empty);
    }

    #[test]
    fn sphere_is_centred() {
        let mut grid = VolumeGrid::new(8, GridTransform::default()).unwrap();
        fill_sphere(&mut grid, Vector3f::new(0.5, 0.5, 0.5), 0.3, 1);
        assert_eq!(grid.test_cell_state([3, 4, 3]), CellStatus::Occupied);
        assert_eq!(grid.test_cell_state([0, 0, 0]), CellStatus::Empty);
        assert!(grid.occupied_count() > 0);
    }
}
