use spectravox::core::path::{Path, PathState};
use spectravox::core::rng::LcgRng;
use spectravox::core::scene_loader::load_scene;
use spectravox::core::sensor::Lens;
use spectravox::core::strata::SpectralStrata;
use spectravox::integrators::traversal::{self, ISOSURFACE_UNSET};
use spectravox::math::constants::Float;
use spectravox::math::spectrum::to_nanometers;
use std::env;

fn main() {
    env::set_var("RUST_LOG", "info");
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <scene.xml> <x> <y> [--samples N] [--seed N] [--max-depth N]", args[0]);
        std::process::exit(1);
    }

    let scene_path = &args[1];
    let x: usize = args[2].parse().unwrap_or(0);
    let y: usize = args[3].parse().unwrap_or(0);

    let mut samples: u32 = 1;
    let mut seed: Option<u64> = None;
    let mut max_depth: Option<u32> = None;

    let mut i = 4;
    while i < args.len() {
        match args[i].as_str() {
            "--samples" => {
                i += 1;
                samples = args.get(i).and_then(|v| v.parse::<u32>().ok()).unwrap_or(samples);
            }
            "--seed" => {
                i += 1;
                seed = args.get(i).and_then(|v| v.parse::<u64>().ok());
            }
            "--max-depth" => {
                i += 1;
                max_depth = args.get(i).and_then(|v| v.parse::<u32>().ok());
            }
            _ => {}
        }
        i += 1;
    }

    let loaded = match load_scene(scene_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("failed to load scene: {}", e);
            std::process::exit(1);
        }
    };
    let scene = &loaded.scene;
    let lens = &loaded.lens;
    if x >= lens.width() || y >= lens.height() {
        eprintln!("Pixel out of bounds: ({}, {}) for size {}x{}", x, y, lens.width(), lens.height());
        std::process::exit(2);
    }

    let mut settings = loaded.settings.traversal();
    if let Some(depth) = max_depth {
        settings.max_bounces = depth;
    }
    let seed = seed.unwrap_or(loaded.settings.seed);
    let mut rng = LcgRng::for_stream(seed, (y * lens.width() + x) as u64);
    let mut strata = SpectralStrata::default();
    let mut isosurface = ISOSURFACE_UNSET;
    let mut path = Path::for_resolution(scene.grid().resolution());

    println!("trace_pixel: scene={} cell=({}, {}) {}", scene_path, x, y, lens.describe());

    let mut sum: Float = 0.0;
    for sample in 0..samples {
        let [s0, s1, s2, s3] = rng.next4();
        let spectral = strata.draw_sample(s0, s1);
        let camera = lens.lens_sample(x as Float, y as Float, s2, s3, spectral.rho);
        path.clear();
        let stats = match traversal::iterate(scene, &camera, &mut path, &mut isosurface, &mut rng, &settings) {
            Ok(stats) => stats,
            Err(e) => {
                eprintln!("sample {}: traversal failed: {}", sample, e);
                std::process::exit(3);
            }
        };

        println!(
            "sample {}: rho={:.4} ({:.1} nm) spectral_pdf={:.4} bounces={} first_hit={:?} isosurface={:.5}",
            sample, spectral.rho, to_nanometers(spectral.rho), spectral.pdf, stats.bounces, stats.first_hit, isosurface
        );
        for (k, vt) in path.vertices().iter().enumerate() {
            let material = vt.material.and_then(|l| scene.materials().get(l)).map(|m| m.name()).unwrap_or("<sky>");
            println!(
                "  vertex {}: p=({:.5}, {:.5}, {:.5}) d=({:.5}, {:.5}, {:.5}) pdf={:.5} weight={:.5} power={:.5} material={}",
                k, vt.ori.x, vt.ori.y, vt.ori.z, vt.dir.x, vt.dir.y, vt.dir.z, vt.pdf, vt.rho_weight, vt.power, material
            );
        }

        let w = path.resolve_weights();
        let state = match path.state() {
            PathState::Escaped => "escaped",
            PathState::Absorbed => "absorbed",
            PathState::Tracing => "tracing",
        };
        let estimate = w.estimate() / spectral.pdf;
        sum += estimate;
        println!(
            "  {} rho={:.4} pdf={:.5} response={:.5} power={:.5} estimate={:.5}",
            state, w.rho, w.pdf, w.response, w.power, estimate
        );
        strata.update(w.estimate());
    }

    if samples > 0 {
        println!("mean estimate over {} samples: {:.6}", samples, sum / samples as Float);
    }
}
