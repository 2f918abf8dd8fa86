// Copyright @yucwang 2021

pub mod frame;
pub mod state;
pub mod tiled;
pub mod tiles;
