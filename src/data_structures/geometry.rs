//! CPU-side triangle geometry.
//!
//! A [`Geometry`] is built once and never mutated after it is placed in the
//! scene; meshes hold it behind an `Rc` so any number of them can share it.

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};

use crate::data_structures::model::ModelVertex;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub label: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// `None` for a geometry without vertices.
    pub fn bounding_box(&self) -> Option<Aabb> {
        let first: Point3<f32> = self.vertices.first()?.position.into();
        let bounds = self.vertices.iter().fold(
            Aabb {
                min: first,
                max: first,
            },
            |mut acc, v| {
                acc.min.x = acc.min.x.min(v.position[0]);
                acc.min.y = acc.min.y.min(v.position[1]);
                acc.min.z = acc.min.z.min(v.position[2]);
                acc.max.x = acc.max.x.max(v.position[0]);
                acc.max.y = acc.max.y.max(v.position[1]);
                acc.max.z = acc.max.z.max(v.position[2]);
                acc
            },
        );
        Some(bounds)
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        for v in &mut self.vertices {
            v.position[0] += offset.x;
            v.position[1] += offset.y;
            v.position[2] += offset.z;
        }
    }

    /// Moves the geometry so its bounding-box centre sits on the local origin.
    pub fn center(&mut self) -> &mut Self {
        if let Some(bounds) = self.bounding_box() {
            self.translate(-bounds.center().to_vec());
        }
        self
    }

    /// A ring torus lying in the XY plane around the Z axis.
    ///
    /// `radius` is the distance from the centre of the torus to the centre of
    /// the tube, `tube` the radius of the tube itself.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial_segments = radial_segments.max(2);
        let tubular_segments = tubular_segments.max(3);
        let mut geometry = Geometry::new("torus");
        geometry
            .vertices
            .reserve(((radial_segments + 1) * (tubular_segments + 1)) as usize);

        for j in 0..=radial_segments {
            let v = j as f32 / radial_segments as f32 * 2.0 * PI;
            for i in 0..=tubular_segments {
                let u = i as f32 / tubular_segments as f32 * 2.0 * PI;
                let ring = radius + tube * v.cos();
                let position = Vector3::new(ring * u.cos(), ring * u.sin(), tube * v.sin());
                let center = Vector3::new(radius * u.cos(), radius * u.sin(), 0.0);
                let normal = (position - center).normalize();
                geometry.vertices.push(ModelVertex {
                    position: position.into(),
                    normal: normal.into(),
                });
            }
        }

        let row = tubular_segments + 1;
        for j in 1..=radial_segments {
            for i in 1..=tubular_segments {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torus_has_expected_topology() {
        let torus = Geometry::torus(0.3, 0.2, 20, 45);
        assert_eq!(torus.vertices.len(), 21 * 46);
        assert_eq!(torus.indices.len(), 20 * 45 * 6);
        assert!(torus.indices.iter().all(|&i| (i as usize) < torus.vertices.len()));
    }

    #[test]
    fn torus_bounds_follow_radius_and_tube() {
        let torus = Geometry::torus(0.3, 0.2, 20, 45);
        let bounds = torus.bounding_box().unwrap();
        assert!((bounds.max.x - 0.5).abs() < 1e-4);
        assert!((bounds.min.x + 0.5).abs() < 1e-4);
        assert!((bounds.max.z - 0.2).abs() < 1e-2);
    }

    #[test]
    fn centering_moves_bounds_to_origin() {
        let mut geometry = Geometry::torus(1.0, 0.5, 8, 12);
        geometry.translate(Vector3::new(3.0, -2.0, 0.5));
        geometry.center();
        let center = geometry.bounding_box().unwrap().center();
        assert!(center.to_vec().magnitude() < 1e-5);
    }

    #[test]
    fn empty_geometry_has_no_bounds() {
        let mut geometry = Geometry::new("empty");
        assert!(geometry.bounding_box().is_none());
        geometry.center();
        assert!(geometry.is_empty());
    }
}
