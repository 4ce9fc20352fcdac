//! Fire-and-forget texture requests.
//!
//! [`TextureLoader::load`] hands back a [`TextureHandle`] immediately. The
//! request is queued and later drained by the event loop, which fetches the
//! image in the background and uploads it once it arrives. Until then the
//! renderer samples a placeholder, so a texture that never arrives only
//! costs its shading, never the frame.

use std::collections::HashMap;

use crate::data_structures::material::{ColorSpace, TextureHandle, TextureId};

#[derive(Debug, Default)]
pub struct TextureLoader {
    handles: Vec<TextureHandle>,
    by_path: HashMap<(String, ColorSpace), TextureId>,
    pending: Vec<TextureHandle>,
}

impl TextureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the image at `path`. Requesting the same path and colour
    /// space twice returns the same handle without fetching again.
    pub fn load(&mut self, path: &str, color_space: ColorSpace) -> TextureHandle {
        let key = (path.to_string(), color_space);
        if let Some(id) = self.by_path.get(&key) {
            return self.handles[id.0].clone();
        }
        let handle = TextureHandle {
            id: TextureId(self.handles.len()),
            path: path.to_string(),
            color_space,
        };
        log::debug!("texture {:?} requested from {}", handle.id, path);
        self.by_path.insert(key, handle.id);
        self.handles.push(handle.clone());
        self.pending.push(handle.clone());
        handle
    }

    /// Drains the requests not yet handed to a fetcher.
    pub fn take_requests(&mut self) -> Vec<TextureHandle> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_shares_handle() {
        let mut loader = TextureLoader::new();
        let a = loader.load("textures/matcaps/8.png", ColorSpace::Srgb);
        let b = loader.load("textures/matcaps/8.png", ColorSpace::Srgb);
        let c = loader.load("textures/matcaps/3.png", ColorSpace::Srgb);
        assert_eq!(a, b);
        assert_ne!(a.id, c.id);
        assert_eq!(loader.len(), 2);
    }

    #[test]
    fn requests_drain_once() {
        let mut loader = TextureLoader::new();
        loader.load("textures/matcaps/8.png", ColorSpace::Srgb);
        assert_eq!(loader.take_requests().len(), 1);
        assert!(loader.take_requests().is_empty());
        loader.load("textures/matcaps/8.png", ColorSpace::Srgb);
        assert!(loader.take_requests().is_empty());
    }
}
