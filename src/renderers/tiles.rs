// Copyright @yucwang 2026

//! Screen partitioning, the shared active-tile mask and the worker dispatch
//! that drives per-tile work.

use crate::core::error::RenderError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

/// Screen cells shaded together in one batch.
pub const LANES: usize = 8;

/// Splits a `width x height` screen into `tiles_x x tiles_y` tiles. Per-cell
/// storage is tile-major: a cell lives at `tile * tile_area + local`, so
/// every tile owns one contiguous slice. Edge tiles may leave slots unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayout {
    width: usize,
    height: usize,
    tiles_x: usize,
    tiles_y: usize,
    tile_w: usize,
    tile_h: usize,
}

/// Up to `LANES` cells of one tile. Only the first `len` lanes are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBatch {
    pub tile: usize,
    pub len: usize,
    pub x: [u32; LANES],
    pub y: [u32; LANES],
    /// Offset inside the tile's slice.
    pub local: [usize; LANES],
}

impl TileLayout {
    pub fn new(width: usize, height: usize, tiles_x: usize, tiles_y: usize) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidLayout(format!("empty screen {}x{}", width, height)));
        }
        if tiles_x == 0 || tiles_y == 0 || tiles_x > width || tiles_y > height {
            return Err(RenderError::InvalidLayout(format!(
                "{}x{} tiles do not fit a {}x{} screen", tiles_x, tiles_y, width, height
            )));
        }
        Ok(Self {
            width,
            height,
            tiles_x,
            tiles_y,
            tile_w: (width + tiles_x - 1) / tiles_x,
            tile_h: (height + tiles_y - 1) / tiles_y,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_x * self.tiles_y
    }

    pub fn tile_area(&self) -> usize {
        self.tile_w * self.tile_h
    }

    /// Length of a tile-major per-cell array.
    pub fn slot_count(&self) -> usize {
        self.tile_count() * self.tile_area()
    }

    pub fn tile_of_cell(&self, x: usize, y: usize) -> usize {
        (y / self.tile_h) * self.tiles_x + x / self.tile_w
    }

    pub fn slot_of_cell(&self, x: usize, y: usize) -> usize {
        let local = (y % self.tile_h) * self.tile_w + x % self.tile_w;
        self.tile_of_cell(x, y) * self.tile_area() + local
    }

    /// Screen rectangle `[x0, x1) x [y0, y1)` covered by `tile`; empty when
    /// the tile lies past the screen edge.
    pub fn tile_rect(&self, tile: usize) -> (usize, usize, usize, usize) {
        let x0 = (tile % self.tiles_x) * self.tile_w;
        let y0 = (tile / self.tiles_x) * self.tile_h;
        let x1 = (x0 + self.tile_w).min(self.width);
        let y1 = (y0 + self.tile_h).min(self.height);
        (x0.min(x1), y0.min(y1), x1, y1)
    }

    pub fn batches(&self, tile: usize) -> TileBatches {
        let (x0, y0, x1, y1) = self.tile_rect(tile);
        TileBatches { tile, tile_w: self.tile_w, x0, y0, x1, y1, next: 0 }
    }
}

/// Iterator over the batches of one tile, row by row.
pub struct TileBatches {
    tile: usize,
    tile_w: usize,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    next: usize,
}

impl Iterator for TileBatches {
    type Item = CellBatch;

    fn next(&mut self) -> Option<CellBatch> {
        let w = self.x1 - self.x0;
        let total = w * (self.y1 - self.y0);
        if self.next >= total {
            return None;
        }
        let mut batch = CellBatch {
            tile: self.tile,
            len: 0,
            x: [0; LANES],
            y: [0; LANES],
            local: [0; LANES],
        };
        while batch.len < LANES && self.next < total {
            let lx = self.next % w;
            let ly = self.next / w;
            batch.x[batch.len] = (self.x0 + lx) as u32;
            batch.y[batch.len] = (self.y0 + ly) as u32;
            batch.local[batch.len] = ly * self.tile_w + lx;
            batch.len += 1;
            self.next += 1;
        }
        Some(batch)
    }
}

/// Atomic set of tiles that still need samples. One bit per tile across as
/// many words as the tile count needs.
#[derive(Debug)]
pub struct TileMask {
    words: Vec<AtomicU64>,
    count: usize,
}

impl TileMask {
    /// All `count` tiles start active.
    pub fn new(count: usize) -> Self {
        let words = (0..(count + 63) / 64).map(|_| AtomicU64::new(0)).collect();
        let mask = Self { words, count };
        mask.reset_all_active();
        mask
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset_all_active(&self) {
        for (i, word) in self.words.iter().enumerate() {
            let bits = (self.count - i * 64).min(64);
            let value = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
            word.store(value, Ordering::Release);
        }
    }

    pub fn insert(&self, tile: usize) {
        if tile < self.count {
            self.words[tile / 64].fetch_or(1u64 << (tile % 64), Ordering::AcqRel);
        }
    }

    pub fn remove(&self, tile: usize) {
        if tile < self.count {
            self.words[tile / 64].fetch_and(!(1u64 << (tile % 64)), Ordering::AcqRel);
        }
    }

    pub fn contains(&self, tile: usize) -> bool {
        tile < self.count && self.words[tile / 64].load(Ordering::Acquire) & (1u64 << (tile % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| w.load(Ordering::Acquire) == 0)
    }

    pub fn active_count(&self) -> usize {
        self.words.iter().map(|w| w.load(Ordering::Acquire).count_ones() as usize).sum()
    }
}

/// Runs `work` once for every tile whose bit is set in `mask`. There is one
/// worker per `scratch` entry and tile `i` is bound to worker
/// `i % scratch.len()`, which reuses its scratch across calls. Returns the
/// summed counts or the first error any worker hit.
pub fn for_each_active_tile<T, W, F>(mask: &TileMask,
                                     tiles: &mut [T],
                                     scratch: &mut [W],
                                     work: F) -> Result<u64, RenderError>
where
    T: Send,
    W: Send,
    F: Fn(&mut W, usize, &mut T) -> Result<u64, RenderError> + Sync,
{
    if scratch.is_empty() {
        log::error!("tile dispatch without worker scratch");
        return Err(RenderError::InvalidLayout("no worker scratch".to_string()));
    }
    let workers = scratch.len().min(tiles.len()).max(1);
    let mut buckets: Vec<Vec<(usize, &mut T)>> = (0..workers).map(|_| Vec::new()).collect();
    for (tile, item) in tiles.iter_mut().enumerate() {
        if mask.contains(tile) {
            buckets[tile % workers].push((tile, item));
        }
    }

    let run = |scratch: &mut W, bucket: Vec<(usize, &mut T)>| -> Result<u64, RenderError> {
        let mut total = 0;
        for (tile, item) in bucket {
            total += work(scratch, tile, item)?;
        }
        Ok(total)
    };

    let run = &run;
    if workers == 1 {
        return match buckets.pop() {
            Some(bucket) => run(&mut scratch[0], bucket),
            None => Ok(0),
        };
    }

    thread::scope(|scope| {
        let handles: Vec<_> = buckets
            .into_iter()
            .zip(scratch.iter_mut())
            .filter(|(bucket, _)| !bucket.is_empty())
            .map(|(bucket, scratch)| scope.spawn(move || run(scratch, bucket)))
            .collect();
        let mut total = 0;
        let mut first_err = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(n)) => total += n,
                Ok(Err(e)) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
                Err(payload) => std::panic::resume_unwind(payload),
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(total),
        }
    })
}
