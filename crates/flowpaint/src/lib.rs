//! flowpaint - flow field painting engine
//!
//! This crate implements the painting core of a flow map editor:
//! - [`spatial`] - BVH over mesh triangles
//! - [`raycast`] - Ray casting against the BVH (Moller-Trumbore)
//! - [`tangent_space`] - Per-vertex tangent frames and world-to-surface projection
//! - [`view`] - Screen / scene / texel mapping with pan, zoom and cover-fit
//! - [`field`] - The flow field buffer and its on-disk encoding
//! - [`brush`] - Falloff-weighted stamp rasterizer with seamless wraparound
//! - [`session`] - Stroke lifecycle for 2D pointer and 3D surface input
//! - [`history`] / [`params`] - Undo/redo commands and the parameter registry
//!
//! Everything is single-threaded and synchronous; the UI layer drives the
//! session with explicit calls and receives dirty rectangles back.

pub mod brush;
pub mod constants;
pub mod field;
pub mod history;
pub mod mesh;
pub mod params;
pub mod raycast;
pub mod session;
pub mod spatial;
pub mod surface;
pub mod tangent_space;
pub mod types;
pub mod validation;
pub mod view;

pub use brush::*;
pub use constants::*;
pub use field::*;
pub use history::*;
pub use mesh::*;
pub use params::*;
pub use raycast::*;
pub use session::*;
pub use spatial::*;
pub use surface::*;
pub use tangent_space::*;
pub use types::*;
pub use validation::*;
pub use view::*;

pub use flowpaint_config as config;
