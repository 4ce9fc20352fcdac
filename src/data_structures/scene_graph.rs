//! The scene: a flat list of meshes plus the camera attachment.
//!
//! Meshes reference their geometry and material through `Rc`, so the hundred
//! donuts hold one torus and one material between them. Each insertion bumps
//! a revision counter the renderer uses to rebuild its instance batches.

use std::rc::Rc;

use crate::data_structures::{geometry::Geometry, instance::Instance, material::MatcapMaterial};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshKind {
    Text,
    Decoration,
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub kind: MeshKind,
    pub geometry: Rc<Geometry>,
    pub material: Rc<MatcapMaterial>,
    pub transform: Instance,
}

impl Mesh {
    pub fn new(
        name: &str,
        kind: MeshKind,
        geometry: Rc<Geometry>,
        material: Rc<MatcapMaterial>,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            geometry,
            material,
            transform: Instance::new(),
        }
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
    camera_attached: bool,
    revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a mesh and returns its index.
    pub fn add(&mut self, mesh: Mesh) -> usize {
        log::trace!("scene add {:?} '{}'", mesh.kind, mesh.name);
        self.meshes.push(mesh);
        self.revision += 1;
        self.meshes.len() - 1
    }

    /// Makes the camera part of the graph.
    pub fn attach_camera(&mut self) {
        self.camera_attached = true;
    }

    pub fn has_camera(&self) -> bool {
        self.camera_attached
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn count(&self, kind: MeshKind) -> usize {
        self.meshes.iter().filter(|m| m.kind == kind).count()
    }

    pub fn of_kind(&self, kind: MeshKind) -> impl Iterator<Item = &Mesh> {
        self.meshes.iter().filter(move |m| m.kind == kind)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
