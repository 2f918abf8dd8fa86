// Copyright @yucwang 2026

use crate::core::error::RenderError;
use crate::core::path::Path;
use crate::core::rng::LcgRng;
use crate::core::scene::Scene;
use crate::core::sensor::{Lens, SensorStage};
use crate::integrators::traversal::{self, TraversalSettings};
use crate::math::bitmap::Bitmap;
use crate::math::constants::Float;
use crate::renderers::frame::FrameBuffers;
use crate::renderers::state::{CellState, RenderMode, RenderState};
use crate::renderers::tiles::{for_each_active_tile, CellBatch, TileLayout, TileMask, LANES};
use crate::sensors::film::Color8;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Per-lane work. Everything except `SpectralPathTrace` is a diagnostic
/// pattern fed to the sensor with unit weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingMode {
    SpectralPathTrace,
    FilmResponse,
    Xor,
    And,
    Noise,
    Hyperbola,
}

impl ShadingMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "spectral" => Some(ShadingMode::SpectralPathTrace),
            "film_response" => Some(ShadingMode::FilmResponse),
            "xor" => Some(ShadingMode::Xor),
            "and" => Some(ShadingMode::And),
            "noise" => Some(ShadingMode::Noise),
            "hyperbola" => Some(ShadingMode::Hyperbola),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorSettings {
    pub edit_samples: u32,
    pub accumulate_samples: u32,
    pub max_depth: u32,
    pub tiles_x: usize,
    pub tiles_y: usize,
    pub workers: usize,
    pub seed: u64,
    pub shading: ShadingMode,
    pub mode: RenderMode,
    pub isosurface_cache: bool,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            edit_samples: 16,
            accumulate_samples: 256,
            max_depth: 8,
            tiles_x: 4,
            tiles_y: 4,
            workers: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            seed: 0,
            shading: ShadingMode::SpectralPathTrace,
            mode: RenderMode::Edit,
            isosurface_cache: true,
        }
    }
}

impl IntegratorSettings {
    pub fn max_samples(&self, mode: RenderMode) -> u32 {
        match mode {
            RenderMode::Edit => self.edit_samples,
            RenderMode::Accumulate => self.accumulate_samples,
        }
    }

    pub fn traversal(&self) -> TraversalSettings {
        TraversalSettings {
            max_bounces: self.max_depth,
            use_isosurface_cache: self.isosurface_cache,
            ..TraversalSettings::default()
        }
    }
}

struct ShadeContext<'a> {
    scene: &'a Scene,
    lens: &'a dyn Lens,
    sensor: &'a dyn SensorStage,
    layout: &'a TileLayout,
    mask: &'a TileMask,
    draw_finished: &'a [AtomicBool],
    traversal: TraversalSettings,
    shading: ShadingMode,
    max_samples: u32,
}

struct TileWork<'a> {
    cells: &'a mut [CellState],
    rng: &'a mut LcgRng,
    colors: &'a mut [Color8],
}

/// Synthetic wavelength for the diagnostic shading modes.
fn pattern_rho(mode: ShadingMode, x: u32, y: u32, width: usize, height: usize, rng: &mut LcgRng) -> Float {
    match mode {
        ShadingMode::FilmResponse => (x as Float + 0.5) / width.max(1) as Float,
        ShadingMode::Xor => ((x ^ y) & 0xff) as Float / 255.0,
        ShadingMode::And => ((x & y) & 0xff) as Float / 255.0,
        ShadingMode::Noise => rng.next_f32(),
        ShadingMode::Hyperbola => {
            let dx = x as Float - 0.5 * width as Float;
            let dy = y as Float - 0.5 * height as Float;
            ((dx * dy).abs() / 64.0).fract()
        }
        ShadingMode::SpectralPathTrace => 0.5,
    }
}

/// Shades one batch. Lanes whose cell is saturated are skipped and drop the
/// tile from the mask; returns `(samples taken, any lane still hungry)`.
fn shade_batch(ctx: &ShadeContext<'_>,
               paths: &mut [Path],
               batch: &CellBatch,
               work: &mut TileWork<'_>) -> Result<(u64, bool), RenderError> {
    let mut colors = [Color8::default(); LANES];
    let mut shaded = [false; LANES];
    let mut taken = 0;
    let mut hungry = false;

    for lane in 0..batch.len {
        let cell = &mut work.cells[batch.local[lane]];
        if cell.samples >= ctx.max_samples {
            ctx.mask.remove(batch.tile);
            continue;
        }

        let (x, y) = (batch.x[lane], batch.y[lane]);
        match ctx.shading {
            ShadingMode::SpectralPathTrace => {
                let [s0, s1, s2, s3] = work.rng.next4();
                let spectral = cell.strata.draw_sample(s0, s1);
                let camera = ctx.lens.lens_sample(x as Float, y as Float, s2, s3, spectral.rho);
                let path = &mut paths[lane];
                path.clear();
                traversal::iterate(ctx.scene, &camera, path, &mut cell.isosurface, work.rng, &ctx.traversal)?;
                let w = path.resolve_weights();
                ctx.sensor.sensor_response(&mut cell.film, w.rho, w.response, w.pdf * spectral.pdf, w.power, cell.samples);
                cell.strata.update(w.estimate());
                path.clear();
            }
            mode => {
                let rho = pattern_rho(mode, x, y, ctx.layout.width(), ctx.layout.height(), work.rng);
                ctx.sensor.sensor_response(&mut cell.film, rho, 1.0, 1.0, 1.0, cell.samples);
            }
        }
        colors[lane] = ctx.sensor.tonemap_out(&cell.film);
        shaded[lane] = true;
        cell.samples += 1;
        taken += 1;
        hungry |= cell.samples < ctx.max_samples;
    }

    for lane in 0..batch.len {
        if shaded[lane] {
            work.colors[batch.local[lane]] = colors[lane];
        }
    }
    Ok((taken, hungry))
}

fn shade_tile(ctx: &ShadeContext<'_>,
              paths: &mut [Path],
              tile: usize,
              work: &mut TileWork<'_>) -> Result<u64, RenderError> {
    if ctx.draw_finished[tile].load(Ordering::Acquire) {
        return Ok(0);
    }
    let mut taken = 0;
    let mut hungry = false;
    for batch in ctx.layout.batches(tile) {
        let (n, batch_hungry) = shade_batch(ctx, paths, &batch, work)?;
        taken += n;
        if batch_hungry {
            ctx.mask.insert(tile);
            hungry = true;
        }
    }
    if !hungry {
        ctx.mask.remove(tile);
    }
    ctx.draw_finished[tile].store(true, Ordering::Release);
    Ok(taken)
}

/// Adaptive tiled renderer: each `dispatch` takes at most one sample for
/// every cell of every active, undrawn tile.
pub struct TileRenderer {
    scene: Scene,
    lens: Box<dyn Lens>,
    sensor: Box<dyn SensorStage>,
    settings: IntegratorSettings,
    state: RenderState,
    frame: FrameBuffers,
    /// `LANES` path buffers per worker, allocated once per session.
    paths: Vec<Vec<Path>>,
    cycles: u64,
}

impl TileRenderer {
    pub fn new(scene: Scene,
               lens: Box<dyn Lens>,
               sensor: Box<dyn SensorStage>,
               settings: IntegratorSettings) -> Result<Self, RenderError> {
        let layout = TileLayout::new(lens.width(), lens.height(), settings.tiles_x, settings.tiles_y)?;
        if settings.tiles_x * settings.tiles_y > 64 {
            log::warn!("{} tiles exceed one mask word", settings.tiles_x * settings.tiles_y);
        }
        log::info!(
            "TileRenderer: {}, {}x{} tiles, {} workers, {:?} shading",
            lens.describe(),
            settings.tiles_x,
            settings.tiles_y,
            settings.workers,
            settings.shading
        );
        let resolution = scene.grid().resolution();
        let paths: Vec<Vec<Path>> = (0..settings.workers.max(1))
            .map(|_| (0..LANES).map(|_| Path::for_resolution(resolution)).collect())
            .collect();
        Ok(Self {
            scene,
            lens,
            sensor,
            state: RenderState::new(layout.clone(), settings.seed, settings.mode),
            frame: FrameBuffers::new(layout),
            paths,
            settings,
            cycles: 0,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn settings(&self) -> &IntegratorSettings {
        &self.settings
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn frame(&self) -> &FrameBuffers {
        &self.frame
    }

    pub fn lens(&self) -> &dyn Lens {
        self.lens.as_ref()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn mode(&self) -> RenderMode {
        self.state.mode()
    }

    pub fn max_samples(&self) -> u32 {
        self.settings.max_samples(self.state.mode())
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) -> bool {
        self.state.set_render_mode(mode)
    }

    pub fn clear_render_state(&mut self) {
        self.state.clear_render_state();
    }

    pub fn is_converged(&self) -> bool {
        self.state.mask().is_empty()
    }

    /// One sampling pass over the active tiles. Returns the number of
    /// samples taken.
    pub fn dispatch(&mut self) -> Result<u64, RenderError> {
        let max_samples = self.settings.max_samples(self.state.mode());
        let traversal = self.settings.traversal();

        let (live, draw_finished) = self.frame.split_tiles_mut();
        let layout = self.state.layout().clone();
        let (mask, tiles) = self.state.split_tiles_mut();
        let mut work: Vec<TileWork<'_>> = tiles
            .into_iter()
            .zip(live)
            .map(|((cells, rng), colors)| TileWork { cells, rng, colors })
            .collect();

        let ctx = ShadeContext {
            scene: &self.scene,
            lens: self.lens.as_ref(),
            sensor: self.sensor.as_ref(),
            layout: &layout,
            mask,
            draw_finished,
            traversal,
            shading: self.settings.shading,
            max_samples,
        };

        let taken = for_each_active_tile(
            mask,
            &mut work,
            &mut self.paths,
            |paths, tile, item| shade_tile(&ctx, paths, tile, item),
        )?;

        if taken > 0 {
            self.frame.set_present_ready();
        }
        self.cycles += 1;
        log::debug!("dispatch {}: {} samples, {} tiles active", self.cycles, taken, self.state.mask().active_count());
        Ok(taken)
    }

    /// Presenter side of the handshake; see `FrameBuffers::snapshot`.
    pub fn snapshot(&mut self) -> bool {
        self.frame.snapshot()
    }

    /// Row-major 8-bit pixels of the last snapshot.
    pub fn pixels(&self) -> &[Color8] {
        self.frame.pixels()
    }

    /// Linear mean RGB of every cell.
    pub fn resolve_hdr(&self) -> Bitmap {
        let layout = self.state.layout();
        let mut bitmap = Bitmap::new(layout.width(), layout.height());
        for y in 0..layout.height() {
            for x in 0..layout.width() {
                bitmap[(x, y)] = self.state.cell(x, y).film.mean;
            }
        }
        bitmap
    }

    /// Dispatches and snapshots until every tile is done or `max_cycles`
    /// passes have run. Returns the number of passes.
    pub fn run_until_converged(&mut self, max_cycles: u64) -> Result<u64, RenderError> {
        let layout = self.state.layout();
        let target = (layout.width() * layout.height()) as u64 * self.max_samples() as u64;
        let progress = ProgressBar::new(target);
        progress.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} samples")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut cycles = 0;
        while !self.is_converged() && cycles < max_cycles {
            let taken = self.dispatch()?;
            self.snapshot();
            progress.inc(taken);
            cycles += 1;
        }
        progress.finish_and_clear();

        if self.is_converged() {
            log::info!("converged after {} passes, {} samples", cycles, self.state.total_samples());
        } else {
            log::warn!("stopped after {} passes with {} tiles active", cycles, self.state.mask().active_count());
        }
        Ok(cycles)
    }
}
