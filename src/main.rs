// Copyright 2020 TwoCookingMice

use spectravox::core::scene_loader::load_scene;
use spectravox::io::{exr_utils, image_utils};
use spectravox::renderers::state::RenderMode;
use spectravox::renderers::tiled::TileRenderer;

use std::env;

fn main() {
    env::set_var("RUST_LOG", "info");
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <scene.xml> <output.png> [--spp N] [--mode edit|accumulate] [--seed N] [--workers N] [--max-cycles N] [--hdr out.exr]", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = &args[2];
    let mut spp_override: Option<u32> = None;
    let mut mode_override: Option<RenderMode> = None;
    let mut seed_override: Option<u64> = None;
    let mut workers_override: Option<usize> = None;
    let mut max_cycles: u64 = 100_000;
    let mut hdr_path: Option<String> = None;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--spp" => {
                i += 1;
                spp_override = args.get(i).and_then(|v| v.parse::<u32>().ok());
            }
            "--mode" => {
                i += 1;
                mode_override = args.get(i).and_then(|v| RenderMode::from_name(v));
            }
            "--seed" => {
                i += 1;
                seed_override = args.get(i).and_then(|v| v.parse::<u64>().ok());
            }
            "--workers" => {
                i += 1;
                workers_override = args.get(i).and_then(|v| v.parse::<usize>().ok());
            }
            "--max-cycles" => {
                i += 1;
                max_cycles = args.get(i).and_then(|v| v.parse::<u64>().ok()).unwrap_or(max_cycles);
            }
            "--hdr" => {
                i += 1;
                hdr_path = args.get(i).cloned();
            }
            other => log::warn!("ignoring argument {}", other),
        }
        i += 1;
    }

    let loaded = match load_scene(input_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("failed to load scene {}: {}", input_path, e);
            std::process::exit(1);
        }
    };

    let mut settings = loaded.settings;
    if let Some(mode) = mode_override {
        settings.mode = mode;
    }
    if let Some(spp) = spp_override {
        match settings.mode {
            RenderMode::Edit => settings.edit_samples = spp,
            RenderMode::Accumulate => settings.accumulate_samples = spp,
        }
    }
    if let Some(seed) = seed_override {
        settings.seed = seed;
    }
    if let Some(workers) = workers_override {
        settings.workers = workers.max(1);
    }

    let mut renderer = match TileRenderer::new(loaded.scene, Box::new(loaded.lens), Box::new(loaded.film), settings) {
        Ok(renderer) => renderer,
        Err(e) => {
            log::error!("failed to set up renderer: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = renderer.run_until_converged(max_cycles) {
        log::error!("rendering stopped: {}", e);
        std::process::exit(2);
    }

    let frame = renderer.frame();
    if let Err(e) = image_utils::write_png_to_file(renderer.pixels(), frame.width(), frame.height(), output_path) {
        log::error!("{}", e);
        std::process::exit(3);
    }
    if let Some(path) = hdr_path {
        if let Err(e) = exr_utils::write_exr_to_file(&renderer.resolve_hdr(), &path) {
            log::error!("{}", e);
            std::process::exit(3);
        }
    }
}
