// Copyright @yucwang 2026

use crate::core::rng::LcgRng;
use crate::core::strata::SpectralStrata;
use crate::integrators::traversal::ISOSURFACE_UNSET;
use crate::math::constants::Float;
use crate::renderers::tiles::{TileLayout, TileMask};
use crate::sensors::film::FilmPixel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Interactive editing with a small sample budget.
    Edit,
    Accumulate,
}

impl RenderMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "edit" => Some(RenderMode::Edit),
            "accumulate" => Some(RenderMode::Accumulate),
            _ => None,
        }
    }
}

/// Everything tracked for one screen cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellState {
    pub samples: u32,
    pub isosurface: Float,
    pub strata: SpectralStrata,
    pub film: FilmPixel,
}

impl Default for CellState {
    fn default() -> Self {
        Self {
            samples: 0,
            isosurface: ISOSURFACE_UNSET,
            strata: SpectralStrata::default(),
            film: FilmPixel::default(),
        }
    }
}

impl CellState {
    pub fn reset(&mut self) {
        self.samples = 0;
        self.isosurface = ISOSURFACE_UNSET;
        self.strata.init();
        self.film = FilmPixel::default();
    }
}

/// Per-session sampling state. Allocated once; resets reuse the storage.
/// Cells are stored tile-major (see `TileLayout`) and every tile has its own
/// random stream, so a tile's work touches only its own slice.
pub struct RenderState {
    layout: TileLayout,
    cells: Vec<CellState>,
    rngs: Vec<LcgRng>,
    mask: TileMask,
    mode: RenderMode,
}

impl RenderState {
    pub fn new(layout: TileLayout, seed: u64, mode: RenderMode) -> Self {
        let tiles = layout.tile_count();
        Self {
            cells: vec![CellState::default(); layout.slot_count()],
            rngs: (0..tiles as u64).map(|t| LcgRng::for_stream(seed, t)).collect(),
            mask: TileMask::new(tiles),
            layout,
            mode,
        }
    }

    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn mask(&self) -> &TileMask {
        &self.mask
    }

    /// Switches mode; a real transition wipes all sampling state. Returns
    /// whether the mode changed.
    pub fn set_render_mode(&mut self, mode: RenderMode) -> bool {
        if mode == self.mode {
            return false;
        }
        log::info!("render mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.clear_render_state();
        true
    }

    /// Resets counters, isosurface caches, strata and film, and marks every
    /// tile active. Random streams keep advancing.
    pub fn clear_render_state(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.reset();
        }
        self.mask.reset_all_active();
    }

    pub fn cell(&self, x: usize, y: usize) -> &CellState {
        &self.cells[self.layout.slot_of_cell(x, y)]
    }

    pub fn cell_mut(&mut self, x: usize, y: usize) -> &mut CellState {
        let slot = self.layout.slot_of_cell(x, y);
        &mut self.cells[slot]
    }

    /// Mask plus one `(cells, rng)` pair per tile, in tile order.
    pub fn split_tiles_mut(&mut self) -> (&TileMask, Vec<(&mut [CellState], &mut LcgRng)>) {
        let area = self.layout.tile_area();
        let tiles = self.cells.chunks_mut(area).zip(self.rngs.iter_mut()).collect();
        (&self.mask, tiles)
    }

    pub fn total_samples(&self) -> u64 {
        let mut total = 0;
        for y in 0..self.layout.height() {
            for x in 0..self.layout.width() {
                total += self.cell(x, y).samples as u64;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RenderState {
        RenderState::new(TileLayout::new(6, 4, 2, 2).unwrap(), 1, RenderMode::Edit)
    }

    #[test]
    fn clear_is_idempotent() {
        let mut st = state();
        {
            let cell = st.cell_mut(5, 3);
            cell.samples = 12;
            cell.isosurface = 0.0;
            cell.strata.update(4.0);
        }
        st.mask().remove(3);

        st.clear_render_state();
        let once: Vec<CellState> = (0..4).flat_map(|y| (0..6).map(move |x| (x, y)))
            .map(|(x, y)| *st.cell(x, y))
            .collect();
        st.clear_render_state();
        let twice: Vec<CellState> = (0..4).flat_map(|y| (0..6).map(move |x| (x, y)))
            .map(|(x, y)| *st.cell(x, y))
            .collect();

        assert_eq!(once, twice);
        assert_eq!(*st.cell(5, 3), CellState::default());
        assert_eq!(st.mask().active_count(), 4);
    }

    #[test]
    fn mode_transition_resets_only_on_change() {
        let mut st = state();
        st.cell_mut(0, 0).samples = 3;
        assert!(!st.set_render_mode(RenderMode::Edit));
        assert_eq!(st.cell(0, 0).samples, 3);
        assert!(st.set_render_mode(RenderMode::Accumulate));
        assert_eq!(st.cell(0, 0).samples, 0);
        assert_eq!(st.mode(), RenderMode::Accumulate);
    }

    #[test]
    fn tile_slices_match_layout() {
        let mut st = state();
        st.cell_mut(4, 3).samples = 7;
        let layout = st.layout().clone();
        let (mask, tiles) = st.split_tiles_mut();
        assert_eq!(tiles.len(), mask.count());
        let tile = layout.tile_of_cell(4, 3);
        let local = layout.slot_of_cell(4, 3) - tile * layout.tile_area();
        assert_eq!(tiles[tile].0[local].samples, 7);
    }
}
