//! Diagram Layout
//!
//! Computes coordinates for a statement's operator tree and the canvas size
//! needed to draw it. Sizing comes from a [`LayoutConfig`].

mod config;
mod engine;

pub use config::{LayoutConfig, LayoutConfigError};
pub use engine::{CanvasSize, LayoutEngine};

#[cfg(test)]
mod tests;
