//! donut-greeting
//!
//! An extruded 3D greeting surrounded by a hundred matcap-shaded donuts,
//! viewed through a damped orbit camera. Runs natively and, compiled to
//! WASM, in a browser page with a `<canvas class="webgl">`.
//!
//! High-level modules
//! - `assembly`: the scene context; builds the meshes once the font arrives
//! - `camera`: camera, projection, uniforms and orbit controls
//! - `config`: the scene configuration and its two presets
//! - `context`: the window and the GPU device/queue/surface
//! - `data_structures`: geometry, instances, materials, textures and the scene
//! - `debug`: the debug panel bound to one camera axis
//! - `flow`: the render loop and the winit event loop
//! - `pipelines`: the matcap render pipeline
//! - `render`: instanced batching and drawing with wgpu
//! - `resources`: asset loading, typeface fonts and text extrusion
//! - `viewport`: viewport size and the capped-density render target
//!

pub mod assembly;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod debug;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod viewport;

pub use config::SceneConfig;
pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run(SceneConfig::default()).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
