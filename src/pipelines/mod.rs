//! Render pipelines. Every mesh in the scene is shaded by the matcap pipeline.

pub mod matcap;
