//! Scene data: geometry, materials, instances and the scene itself.
//!
//! - `geometry` holds CPU triangle meshes and the torus generator
//! - `instance` holds per-mesh transformation data
//! - `material` describes matcap materials and texture handles
//! - `model` holds vertex layouts and GPU mesh buffers
//! - `scene_graph` is the container every visible mesh is inserted into
//! - `texture` wraps GPU textures

pub mod geometry;
pub mod instance;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
