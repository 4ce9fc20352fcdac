//! Scene assembly: the application context every handler works on.
//!
//! [`SceneContext`] owns the one scene, camera, projection and render target
//! of the program. It is created synchronously at startup, before any asset
//! has arrived, and is then driven by the event loop: viewport changes go to
//! [`SceneContext::on_resize`], the font result to
//! [`SceneContext::on_font_loaded`], debug edits to
//! [`SceneContext::debug_set`] and each redraw to [`SceneContext::frame`].

use std::{collections::HashMap, rc::Rc};

use cgmath::{Deg, Vector3};
use rand::Rng;

use crate::{
    camera::{Camera, FOV_Y_DEGREES, OrbitControls, Projection, Z_FAR, Z_NEAR},
    config::SceneConfig,
    data_structures::{
        geometry::Geometry,
        instance::Instance,
        material::{ColorSpace, MatcapMaterial},
        scene_graph::{Mesh, MeshKind, Scene},
    },
    debug::DebugPanel,
    flow::{FrameScheduler, RenderLoop, SceneRenderer},
    resources::{font::Font, text::extrude_text, texture::TextureLoader},
    viewport::{RenderTarget, Viewport},
};

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("the font result was already delivered")]
    FontAlreadyDelivered,
    #[error("{user} refers to unknown material {material:?}")]
    UnknownMaterial { user: String, material: String },
    #[error("failed to extrude {text:?}")]
    Extrusion {
        text: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Uniform in `[-half, half)`.
fn symmetric<R: Rng>(rng: &mut R, half: f32) -> f32 {
    if half > 0.0 {
        rng.random_range(-half..half)
    } else {
        0.0
    }
}

/// Where the single font load stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontState {
    Pending,
    Loaded,
    Failed,
}

pub struct SceneContext {
    pub scene: Scene,
    pub camera: Camera,
    pub projection: Projection,
    pub target: RenderTarget,
    pub controls: OrbitControls,
    pub textures: TextureLoader,
    debug: Option<DebugPanel>,
    materials: HashMap<String, Rc<MatcapMaterial>>,
    font_state: FontState,
    config: SceneConfig,
}

impl SceneContext {
    /// Sets up camera, projection, render target and damped controls for
    /// `viewport`, and requests every matcap in the config.
    pub fn new(config: SceneConfig, viewport: Viewport) -> Result<Self, AssemblyError> {
        let camera = Camera::new(config.camera.position);
        let projection = Projection::new(
            viewport.physical_width.max(1),
            viewport.physical_height.max(1),
            Deg(FOV_Y_DEGREES),
            Z_NEAR,
            Z_FAR,
        );
        let target = RenderTarget::new(viewport);
        let controls = OrbitControls::new(viewport.physical_height, projection.fovy()).with_damping();

        let mut scene = Scene::new();
        scene.attach_camera();

        let mut textures = TextureLoader::new();
        let materials: HashMap<String, Rc<MatcapMaterial>> = config
            .materials
            .iter()
            .map(|m| {
                let matcap = textures.load(&m.matcap, ColorSpace::Srgb);
                (m.name.clone(), Rc::new(MatcapMaterial::new(&m.name, matcap)))
            })
            .collect();

        let unknown = config
            .lines
            .iter()
            .map(|line| (format!("text {:?}", line.text), &line.material))
            .chain(std::iter::once(("donuts".to_string(), &config.donuts.material)))
            .find(|(_, material)| !materials.contains_key(*material));
        if let Some((user, material)) = unknown {
            return Err(AssemblyError::UnknownMaterial {
                user,
                material: material.clone(),
            });
        }

        let debug = config
            .debug_panel
            .clone()
            .map(|panel| DebugPanel::new(panel, &camera));

        log::info!(
            "scene '{}' set up at {}x{} (pixel ratio {})",
            config.title,
            viewport.width,
            viewport.height,
            target.pixel_ratio()
        );

        Ok(Self {
            scene,
            camera,
            projection,
            target,
            controls,
            textures,
            debug,
            materials,
            font_state: FontState::Pending,
            config,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn font_state(&self) -> FontState {
        self.font_state
    }

    pub fn debug_panel(&self) -> Option<&DebugPanel> {
        self.debug.as_ref()
    }

    /// Re-derives aspect ratio and render target size. Returns whether the
    /// target changed; zero-sized or repeated viewports change nothing.
    pub fn on_resize(&mut self, viewport: Viewport) -> bool {
        if viewport.is_empty() {
            log::debug!("ignoring resize to {}x{}", viewport.width, viewport.height);
            return false;
        }
        self.projection.resize(viewport.physical_width, viewport.physical_height);
        // Cursor positions arrive in physical pixels
        self.controls.set_viewport_height(viewport.physical_height);
        let changed = self.target.resize(viewport);
        if changed {
            let (w, h) = self.target.drawing_buffer_size();
            log::info!("resized to {}x{} ({}x{} px)", viewport.width, viewport.height, w, h);
        }
        changed
    }

    /// Consumes the font load result. On success the text meshes and the
    /// donuts are built and inserted; on failure the scene stays empty. The
    /// result is accepted once. Returns the number of meshes inserted.
    pub fn on_font_loaded<R: Rng>(
        &mut self,
        result: anyhow::Result<Font>,
        rng: &mut R,
    ) -> Result<usize, AssemblyError> {
        if self.font_state != FontState::Pending {
            return Err(AssemblyError::FontAlreadyDelivered);
        }
        match result {
            Err(e) => {
                self.font_state = FontState::Failed;
                log::warn!("font {} failed to load, text stays hidden: {:#}", self.config.font, e);
                Ok(0)
            }
            Ok(font) => {
                self.font_state = FontState::Loaded;
                self.build_meshes(&font, rng)
            }
        }
    }

    fn material(&self, user: &str, name: &str) -> Result<Rc<MatcapMaterial>, AssemblyError> {
        self.materials
            .get(name)
            .cloned()
            .ok_or_else(|| AssemblyError::UnknownMaterial {
                user: user.to_string(),
                material: name.to_string(),
            })
    }

    fn build_meshes<R: Rng>(&mut self, font: &Font, rng: &mut R) -> Result<usize, AssemblyError> {
        // Every text mesh is built before any is inserted, so a failure leaves the scene untouched
        let mut text_meshes = Vec::with_capacity(self.config.lines.len());
        for line in &self.config.lines {
            let material = self.material(&format!("text {:?}", line.text), &line.material)?;
            let size = line.size.unwrap_or(self.config.style.size);
            let geometry =
                extrude_text(font, &line.text, &self.config.style, size).map_err(|source| {
                    AssemblyError::Extrusion {
                        text: line.text.clone(),
                        source,
                    }
                })?;
            text_meshes.push(
                Mesh::new(&line.text, MeshKind::Text, Rc::new(geometry), material)
                    .with_transform(Instance::at(Vector3::new(0.0, line.y_offset, 0.0))),
            );
        }
        let donut_material = self.material("donuts", &self.config.donuts.material)?;

        let inserted = text_meshes.len();
        for mesh in text_meshes {
            self.scene.add(mesh);
        }

        let donuts = &self.config.donuts;
        let torus = Rc::new(Geometry::torus(
            donuts.radius,
            donuts.tube,
            donuts.radial_segments,
            donuts.tubular_segments,
        ));
        let half = donuts.spread / 2.0;
        for i in 0..donuts.count {
            let position = Vector3::new(
                symmetric(rng, half),
                symmetric(rng, half),
                symmetric(rng, half),
            );
            let scale: f32 = rng.random();
            self.scene.add(
                Mesh::new(
                    &format!("donut {}", i),
                    MeshKind::Decoration,
                    Rc::clone(&torus),
                    Rc::clone(&donut_material),
                )
                .with_transform(Instance::at(position).with_uniform_scale(scale)),
            );
        }

        log::info!(
            "scene built: {} text meshes, {} donuts",
            inserted,
            donuts.count
        );
        Ok(inserted + donuts.count)
    }

    /// Applies a debug panel edit. `None` when the panel is disabled.
    pub fn debug_set(&mut self, value: f32) -> Option<f32> {
        let panel = self.debug.as_mut()?;
        Some(panel.set(value, &mut self.camera))
    }

    /// Nudges the debug value by whole steps.
    pub fn debug_nudge(&mut self, steps: i32) -> Option<f32> {
        let panel = self.debug.as_mut()?;
        Some(panel.nudge(steps, &mut self.camera))
    }

    /// Runs one iteration of `render_loop` over this context.
    pub fn frame<R: SceneRenderer, S: FrameScheduler + ?Sized>(
        &mut self,
        render_loop: &mut RenderLoop,
        renderer: &mut R,
        scheduler: &S,
    ) -> Result<bool, R::Error> {
        render_loop.frame(
            &mut self.controls,
            &mut self.camera,
            &self.scene,
            &self.projection,
            renderer,
            scheduler,
        )
    }
}
