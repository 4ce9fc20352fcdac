//! Scene configuration.
//!
//! Everything that differs between the greeting variants lives in a
//! [`SceneConfig`]: where the camera starts, which matcaps are loaded, which
//! lines of text are extruded and where they sit, how the donuts are
//! scattered, and whether the debug control is shown. The assembly code only
//! ever reads from this structure.

use crate::camera::Axis;

/// Where the camera starts. The orbit target is always the origin.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraPose {
    pub position: [f32; 3],
}

/// A matcap material: a name other entries refer to and the image backing it.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialConfig {
    pub name: String,
    pub matcap: String,
}

impl MaterialConfig {
    pub fn new(name: &str, matcap: &str) -> Self {
        Self {
            name: name.to_string(),
            matcap: matcap.to_string(),
        }
    }
}

/// Extrusion parameters shared by every line of text.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub depth: f32,
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_offset: f32,
    pub bevel_segments: u32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 0.5,
            depth: 0.2,
            curve_segments: 5,
            bevel_enabled: true,
            bevel_thickness: 0.03,
            bevel_size: 0.02,
            bevel_offset: 0.0,
            bevel_segments: 3,
        }
    }
}

/// One extruded line of text.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub y_offset: f32,
    pub material: String,
    /// Overrides [`TextStyle::size`] for this line only.
    pub size: Option<f32>,
}

impl TextLine {
    pub fn new(text: &str, y_offset: f32, material: &str) -> Self {
        Self {
            text: text.to_string(),
            y_offset,
            material: material.to_string(),
            size: None,
        }
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }
}

/// The scattered torus meshes.
#[derive(Clone, Debug, PartialEq)]
pub struct DonutConfig {
    pub count: usize,
    /// Edge length of the cube (centred on the origin) positions are drawn from.
    pub spread: f32,
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
    pub material: String,
}

impl DonutConfig {
    pub fn new(material: &str) -> Self {
        Self {
            count: 100,
            spread: 10.0,
            radius: 0.3,
            tube: 0.2,
            radial_segments: 20,
            tubular_segments: 45,
            material: material.to_string(),
        }
    }
}

/// A numeric control bound to one axis of the camera position.
#[derive(Clone, Debug, PartialEq)]
pub struct DebugPanelConfig {
    pub label: String,
    pub axis: Axis,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for DebugPanelConfig {
    fn default() -> Self {
        Self {
            label: "camera z".to_string(),
            axis: Axis::Z,
            min: 0.0,
            max: 10.0,
            step: 0.001,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub title: String,
    pub camera: CameraPose,
    pub font: String,
    pub materials: Vec<MaterialConfig>,
    pub style: TextStyle,
    pub lines: Vec<TextLine>,
    pub donuts: DonutConfig,
    pub debug_panel: Option<DebugPanelConfig>,
    /// Fixed seed for the donut scatter; a clock-derived seed is used otherwise.
    pub seed: Option<u64>,
    pub clear_colour: wgpu::Color,
}

impl SceneConfig {
    /// Two lines over a single matcap, no debug control.
    pub fn greeting() -> Self {
        Self {
            title: "Happy New Year".to_string(),
            camera: CameraPose {
                position: [1.0, 1.0, 3.0],
            },
            font: "fonts/helvetiker_regular.typeface.json".to_string(),
            materials: vec![MaterialConfig::new("matcap-8", "textures/matcaps/8.png")],
            style: TextStyle::default(),
            lines: vec![
                TextLine::new("Firstya R.A", 0.0, "matcap-8"),
                TextLine::new("Happpy New Year - 2025", 1.0, "matcap-8").with_size(0.3),
            ],
            donuts: DonutConfig::new("matcap-8"),
            debug_panel: None,
            seed: None,
            clear_colour: wgpu::Color::BLACK,
        }
    }

    /// Three lines including the signature, donuts in their own matcap and a
    /// debug control on the camera depth.
    pub fn signed_greeting() -> Self {
        Self {
            title: "Happy New Year - 2025".to_string(),
            camera: CameraPose {
                position: [1.0, 1.0, 4.0],
            },
            font: "fonts/helvetiker_regular.typeface.json".to_string(),
            materials: vec![
                MaterialConfig::new("matcap-8", "textures/matcaps/8.png"),
                MaterialConfig::new("matcap-3", "textures/matcaps/3.png"),
            ],
            style: TextStyle::default(),
            lines: vec![
                TextLine::new("Firstya R.A", 0.0, "matcap-8"),
                TextLine::new("Happy New Year - 2025", 1.0, "matcap-8"),
                TextLine::new("- Philoo", -1.5, "matcap-8"),
            ],
            donuts: DonutConfig::new("matcap-3"),
            debug_panel: Some(DebugPanelConfig::default()),
            seed: None,
            clear_colour: wgpu::Color::BLACK,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::signed_greeting()
    }
}
