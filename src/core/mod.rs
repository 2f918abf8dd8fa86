// Copyright @yucwang 2021

pub mod error;
pub mod material;
pub mod path;
pub mod rng;
pub mod scene;
pub mod scene_loader;
pub mod sensor;
pub mod strata;
