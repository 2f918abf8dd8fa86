// Copyright @yucwang 2026

pub mod film;
pub mod pinhole;
