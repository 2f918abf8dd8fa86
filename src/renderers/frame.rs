// Copyright @yucwang 2026

//! Double-buffered output shared between tile workers and a presenter.

use crate::renderers::tiles::TileLayout;
use crate::sensors::film::Color8;
use std::sync::atomic::{AtomicBool, Ordering};

/// Workers write the tile-major `live` buffer and raise `draw_finished` for
/// each tile they complete. A tile with its flag raised is not redrawn until
/// the presenter copies `live` into the row-major `back` buffer, which it
/// may only do while `present_ready` is set.
pub struct FrameBuffers {
    layout: TileLayout,
    live: Vec<Color8>,
    back: Vec<Color8>,
    present_ready: AtomicBool,
    draw_finished: Vec<AtomicBool>,
}

impl FrameBuffers {
    pub fn new(layout: TileLayout) -> Self {
        Self {
            live: vec![Color8::default(); layout.slot_count()],
            back: vec![Color8::default(); layout.width() * layout.height()],
            present_ready: AtomicBool::new(false),
            draw_finished: (0..layout.tile_count()).map(|_| AtomicBool::new(false)).collect(),
            layout,
        }
    }

    pub fn present_ready(&self) -> bool {
        self.present_ready.load(Ordering::Acquire)
    }

    pub fn set_present_ready(&self) {
        self.present_ready.store(true, Ordering::Release);
    }

    pub fn draw_finished(&self, tile: usize) -> bool {
        self.draw_finished[tile].load(Ordering::Acquire)
    }

    /// Per-tile slices of the live buffer and the tile flags.
    pub fn split_tiles_mut(&mut self) -> (Vec<&mut [Color8]>, &[AtomicBool]) {
        let area = self.layout.tile_area();
        (self.live.chunks_mut(area).collect(), &self.draw_finished)
    }

    /// Copies the live buffer into the back buffer and releases every tile
    /// for redraw. Does nothing unless the frame is ready.
    pub fn snapshot(&mut self) -> bool {
        if !self.present_ready.swap(false, Ordering::AcqRel) {
            return false;
        }
        let width = self.layout.width();
        for y in 0..self.layout.height() {
            for x in 0..width {
                self.back[y * width + x] = self.live[self.layout.slot_of_cell(x, y)];
            }
        }
        for flag in self.draw_finished.iter() {
            flag.store(false, Ordering::Release);
        }
        true
    }

    /// Row-major pixels of the last snapshot.
    pub fn pixels(&self) -> &[Color8] {
        &self.back
    }

    pub fn width(&self) -> usize {
        self.layout.width()
    }

    pub fn height(&self) -> usize {
        self.layout.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_waits_for_ready_flag() {
        let layout = TileLayout::new(4, 2, 2, 1).unwrap();
        let mut frame = FrameBuffers::new(layout.clone());
        {
            let (mut live, flags) = frame.split_tiles_mut();
            live[1][0] = Color8::new(9, 8, 7);
            flags[1].store(true, Ordering::Release);
        }
        assert!(!frame.snapshot());
        assert_eq!(frame.pixels()[2], Color8::default());
        assert!(frame.draw_finished(1));

        frame.set_present_ready();
        assert!(frame.snapshot());
        assert_eq!(frame.pixels()[2], Color8::new(9, 8, 7));
        assert!(!frame.draw_finished(1));
        assert!(!frame.present_ready());
    }
}
