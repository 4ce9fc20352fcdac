//! Matcap materials and the texture handles they reference.

/// Identifies a texture requested through a [`TextureLoader`](crate::resources::texture::TextureLoader).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) usize);

/// How the texel values of an image are to be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// Gamma-encoded colour, decoded to linear when sampled.
    Srgb,
    #[default]
    Linear,
}

impl ColorSpace {
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// A texture that may still be loading. Usable right away: until the image
/// arrives the renderer samples a white placeholder.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureHandle {
    pub id: TextureId,
    pub path: String,
    pub color_space: ColorSpace,
}

/// Surface shading from a matcap image looked up by the view-space normal.
#[derive(Clone, Debug, PartialEq)]
pub struct MatcapMaterial {
    pub name: String,
    pub matcap: TextureHandle,
}

impl MatcapMaterial {
    pub fn new(name: &str, matcap: TextureHandle) -> Self {
        Self {
            name: name.to_string(),
            matcap,
        }
    }
}
