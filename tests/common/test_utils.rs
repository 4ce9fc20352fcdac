#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use donut_greeting::{
    assembly::SceneContext,
    camera::{Camera, Controls, Projection},
    config::SceneConfig,
    data_structures::scene_graph::Scene,
    flow::{FrameScheduler, SceneRenderer},
    resources::font::Font,
    viewport::{RenderTarget, Viewport},
};
use rand::{SeedableRng, rngs::StdRng};

/// A tiny block font. `o` has a hole, `e` a curved side; everything it lacks
/// falls back to the `?` box.
pub const TEST_FONT: &str = r#"{
    "familyName": "Test Blocks",
    "resolution": 1000,
    "underlineThickness": 50,
    "boundingBox": { "yMin": -200, "xMin": 0, "yMax": 800, "xMax": 600 },
    "glyphs": {
        "?": { "ha": 500, "x_min": 50, "x_max": 450, "o": "m 50 0 l 450 0 l 450 700 l 50 700 l 50 0" },
        "I": { "ha": 300, "x_min": 50, "x_max": 250, "o": "m 50 0 l 250 0 l 250 700 l 50 700 z" },
        "o": { "ha": 500, "x_min": 50, "x_max": 450, "o": "m 50 0 l 450 0 l 450 500 l 50 500 l 50 0 m 150 100 l 150 400 l 350 400 l 350 100 l 150 100" },
        "e": { "ha": 500, "x_min": 50, "x_max": 600, "o": "m 50 0 l 450 0 q 450 500 600 250 l 50 500 l 50 0" },
        "-": { "ha": 400, "x_min": 50, "x_max": 350, "o": "m 50 250 l 350 250 l 350 330 l 50 330 l 50 250" },
        " ": { "ha": 250, "x_min": 0, "x_max": 0 }
    }
}"#;

pub fn test_font() -> Font {
    Font::from_json(TEST_FONT).unwrap()
}

pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(0x2025)
}

pub fn viewport(width: u32, height: u32) -> Viewport {
    Viewport::new(width, height, 1.0)
}

pub fn signed_context() -> SceneContext {
    SceneContext::new(SceneConfig::signed_greeting().with_seed(7), viewport(800, 600)).unwrap()
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    ControlsUpdate,
    Render { camera: [f32; 3], meshes: usize },
    Schedule,
    Resize { size: (u32, u32) },
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Moves the camera `step` along z on every update.
pub struct RecordingControls {
    pub log: CallLog,
    pub step: f32,
}

impl Controls for RecordingControls {
    fn update(&mut self, camera: &mut Camera) -> bool {
        self.log.borrow_mut().push(Call::ControlsUpdate);
        camera.position.z += self.step;
        self.step != 0.0
    }
}

#[derive(Debug, PartialEq)]
pub struct SurfaceGone;

pub struct RecordingRenderer {
    pub log: CallLog,
    /// Frames (0-based) whose render call fails.
    pub fail_on: Vec<usize>,
    renders: usize,
}

impl RecordingRenderer {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_on: Vec::new(),
            renders: 0,
        }
    }
}

impl SceneRenderer for RecordingRenderer {
    type Error = SurfaceGone;

    fn render(&mut self, scene: &Scene, camera: &Camera, _projection: &Projection) -> Result<(), SurfaceGone> {
        self.log.borrow_mut().push(Call::Render {
            camera: camera.position.into(),
            meshes: scene.len(),
        });
        let frame = self.renders;
        self.renders += 1;
        if self.fail_on.contains(&frame) {
            Err(SurfaceGone)
        } else {
            Ok(())
        }
    }

    fn resize(&mut self, target: &RenderTarget) {
        self.log.borrow_mut().push(Call::Resize {
            size: target.drawing_buffer_size(),
        });
    }
}

pub struct RecordingScheduler {
    pub log: CallLog,
}

impl FrameScheduler for RecordingScheduler {
    fn schedule(&self) {
        self.log.borrow_mut().push(Call::Schedule);
    }
}
