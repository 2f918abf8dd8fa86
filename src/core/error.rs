// Copyright @yucwang 2026

//! Error types for rendering and scene loading.

use thiserror::Error;

/// Rendering error. `UnsupportedMaterial` and `PathOverflow` are invariant
/// violations; callers must stop rendering when they see them.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("unsupported material label {0}")]
    UnsupportedMaterial(u8),

    #[error("path buffer overflow (capacity {capacity})")]
    PathOverflow { capacity: usize },

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("invalid tile layout: {0}")]
    InvalidLayout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(String),
}

#[derive(Error, Debug)]
pub enum SceneLoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Render(#[from] RenderError),
}
