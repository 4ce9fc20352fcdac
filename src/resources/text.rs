//! Extruded text meshes.
//!
//! The laid-out glyph outlines are flattened into closed contours, sorted
//! into outer shapes and holes, then swept along +Z through a stack of
//! layers. With bevelling on, the stack rounds the front and back edges off
//! along a quarter circle; the flat caps at either end are triangulated with
//! lyon.

use std::f32::consts::FRAC_PI_2;

use cgmath::{InnerSpace, Vector2, Vector3};
use lyon_path::{Path, math::point};
use lyon_tessellation::{BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers};

use crate::{
    config::TextStyle,
    data_structures::{geometry::Geometry, model::ModelVertex},
    resources::font::{Font, OutlineCommand},
};

const EPSILON: f32 = 1e-6;
const MAX_MITER: f32 = 2.0;

type Contour = Vec<Vector2<f32>>;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Layer {
    z: f32,
    /// How far the contour is pushed outward at this layer.
    offset: f32,
}

/// Builds the extruded, centred mesh for `text`.
///
/// `size` overrides the style's font size. A string with nothing drawable
/// (only spaces, or glyphs the font lacks) yields an empty geometry.
pub fn extrude_text(font: &Font, text: &str, style: &TextStyle, size: f32) -> anyhow::Result<Geometry> {
    let commands = font.layout(text, size);
    let contours = orient(flatten(&commands, style.curve_segments.max(1)));
    let mut geometry = Geometry::new(text);
    if contours.is_empty() {
        log::warn!("text {:?} has no drawable outline", text);
        return Ok(geometry);
    }

    let layers = layers(style);
    let miters: Vec<Vec<Vector2<f32>>> = contours.iter().map(|c| miters(c)).collect();

    let (front, back) = match (layers.first(), layers.last()) {
        (Some(front), Some(back)) => (*front, *back),
        _ => return Ok(geometry),
    };
    add_caps(&mut geometry, &contours, &miters, front, back)?;
    for (contour, miters) in contours.iter().zip(&miters) {
        for pair in layers.windows(2) {
            add_side(&mut geometry, contour, miters, pair[0], pair[1]);
        }
    }

    geometry.center();
    log::debug!(
        "extruded {:?}: {} contours, {} triangles",
        text,
        contours.len(),
        geometry.triangle_count()
    );
    Ok(geometry)
}

fn layers(style: &TextStyle) -> Vec<Layer> {
    if !style.bevel_enabled || style.bevel_segments == 0 {
        return vec![
            Layer { z: 0.0, offset: 0.0 },
            Layer {
                z: style.depth,
                offset: 0.0,
            },
        ];
    }

    let segments = style.bevel_segments;
    let ring = |s: u32| {
        let t = s as f32 / segments as f32 * FRAC_PI_2;
        (
            style.bevel_thickness * t.cos(),
            style.bevel_size * t.sin() + style.bevel_offset,
        )
    };
    let full = style.bevel_size + style.bevel_offset;

    let mut layers = Vec::with_capacity(2 * segments as usize + 2);
    layers.extend((0..segments).map(|s| {
        let (dz, offset) = ring(s);
        Layer { z: -dz, offset }
    }));
    layers.push(Layer { z: 0.0, offset: full });
    layers.push(Layer {
        z: style.depth,
        offset: full,
    });
    layers.extend((0..segments).rev().map(|s| {
        let (dz, offset) = ring(s);
        Layer {
            z: style.depth + dz,
            offset,
        }
    }));
    layers
}

/// Flattens outline commands into closed polylines, one per `MoveTo`.
fn flatten(commands: &[OutlineCommand], divisions: u32) -> Vec<Contour> {
    let mut contours = Vec::new();
    let mut current: Contour = Vec::new();

    for command in commands {
        let from = current.last().copied();
        match *command {
            OutlineCommand::MoveTo(p) => {
                if !current.is_empty() {
                    contours.push(std::mem::take(&mut current));
                }
                current.push(Vector2::new(p.x, p.y));
            }
            OutlineCommand::LineTo(p) => current.push(Vector2::new(p.x, p.y)),
            OutlineCommand::QuadTo { ctrl, to } => {
                let p0 = from.unwrap_or(Vector2::new(ctrl.x, ctrl.y));
                let p1 = Vector2::new(ctrl.x, ctrl.y);
                let p2 = Vector2::new(to.x, to.y);
                current.extend((1..=divisions).map(|k| {
                    let t = k as f32 / divisions as f32;
                    let u = 1.0 - t;
                    p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t)
                }));
            }
            OutlineCommand::CubicTo { ctrl1, ctrl2, to } => {
                let p0 = from.unwrap_or(Vector2::new(ctrl1.x, ctrl1.y));
                let p1 = Vector2::new(ctrl1.x, ctrl1.y);
                let p2 = Vector2::new(ctrl2.x, ctrl2.y);
                let p3 = Vector2::new(to.x, to.y);
                current.extend((1..=divisions).map(|k| {
                    let t = k as f32 / divisions as f32;
                    let u = 1.0 - t;
                    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
                }));
            }
        }
    }
    if !current.is_empty() {
        contours.push(current);
    }

    contours.into_iter().filter_map(clean).collect()
}

/// Drops repeated points and the duplicated closing point. Contours that
/// enclose no area are discarded.
fn clean(contour: Contour) -> Option<Contour> {
    let mut points: Contour = Vec::with_capacity(contour.len());
    for p in contour {
        if points.last().is_none_or(|last| (p - *last).magnitude2() > EPSILON * EPSILON) {
            points.push(p);
        }
    }
    while points.len() > 1 && (points[0] - points[points.len() - 1]).magnitude2() <= EPSILON * EPSILON {
        points.pop();
    }
    (points.len() >= 3 && signed_area(&points).abs() > EPSILON).then_some(points)
}

fn signed_area(contour: &[Vector2<f32>]) -> f32 {
    let n = contour.len();
    (0..n)
        .map(|i| {
            let a = contour[i];
            let b = contour[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f32>()
        * 0.5
}

fn contains(contour: &[Vector2<f32>], p: Vector2<f32>) -> bool {
    let n = contour.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (contour[i], contour[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Winds outer contours counter-clockwise and holes clockwise. A contour is
/// a hole when it sits inside an odd number of other contours.
fn orient(contours: Vec<Contour>) -> Vec<Contour> {
    let depths: Vec<usize> = contours
        .iter()
        .enumerate()
        .map(|(i, contour)| {
            contours
                .iter()
                .enumerate()
                .filter(|&(j, other)| j != i && contains(other, contour[0]))
                .count()
        })
        .collect();

    contours
        .into_iter()
        .zip(depths)
        .map(|(mut contour, depth)| {
            let is_hole = depth % 2 == 1;
            if (signed_area(&contour) > 0.0) == is_hole {
                contour.reverse();
            }
            contour
        })
        .collect()
}

fn edge_normal(a: Vector2<f32>, b: Vector2<f32>) -> Vector2<f32> {
    let d = b - a;
    let len = d.magnitude();
    if len <= EPSILON {
        return Vector2::new(0.0, 0.0);
    }
    Vector2::new(d.y, -d.x) / len
}

/// Per-vertex outward offset directions, scaled so that moving every vertex
/// by `miter * offset` moves each edge outward by `offset`.
fn miters(contour: &[Vector2<f32>]) -> Vec<Vector2<f32>> {
    let n = contour.len();
    (0..n)
        .map(|i| {
            let prev = contour[(i + n - 1) % n];
            let cur = contour[i];
            let next = contour[(i + 1) % n];
            let n_in = edge_normal(prev, cur);
            let n_out = edge_normal(cur, next);
            let sum = n_in + n_out;
            if sum.magnitude2() <= EPSILON {
                return n_out;
            }
            let dir = sum.normalize();
            let cos = dir.dot(n_out).max(1.0 / MAX_MITER);
            dir / cos
        })
        .collect()
}

fn push(geometry: &mut Geometry, p: Vector2<f32>, z: f32, normal: Vector3<f32>) -> u32 {
    let idx = geometry.vertices.len() as u32;
    geometry.vertices.push(ModelVertex {
        position: [p.x, p.y, z],
        normal: normal.into(),
    });
    idx
}

fn add_caps(
    geometry: &mut Geometry,
    contours: &[Contour],
    miters: &[Vec<Vector2<f32>>],
    front: Layer,
    back: Layer,
) -> anyhow::Result<()> {
    let mut builder = Path::builder();
    for (contour, miters) in contours.iter().zip(miters) {
        let mut points = contour.iter().zip(miters).map(|(p, m)| *p + *m * front.offset);
        if let Some(first) = points.next() {
            builder.begin(point(first.x, first.y));
            for p in points {
                builder.line_to(point(p.x, p.y));
            }
            builder.end(true);
        }
    }
    let path = builder.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            &path,
            &FillOptions::non_zero(),
            &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| v.position().to_array()),
        )
        .map_err(|e| anyhow::anyhow!("cap tessellation failed: {:?}", e))?;

    // Both end layers sit at the same offset, so one triangulation serves both caps
    let cap_points: Vec<Vector2<f32>> = buffers.vertices.iter().map(|v| Vector2::new(v[0], v[1])).collect();

    for (layer, normal) in [(front, -Vector3::unit_z()), (back, Vector3::unit_z())] {
        let base = geometry.vertices.len() as u32;
        for p in &cap_points {
            push(geometry, *p, layer.z, normal);
        }
        for tri in buffers.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            let ccw = signed_area(&[
                cap_points[a as usize],
                cap_points[b as usize],
                cap_points[c as usize],
            ]) > 0.0;
            // Counter-clockwise seen from the side the cap faces
            let flip = ccw == (normal.z < 0.0);
            if flip {
                geometry.indices.extend_from_slice(&[base + a, base + c, base + b]);
            } else {
                geometry.indices.extend_from_slice(&[base + a, base + b, base + c]);
            }
        }
    }
    Ok(())
}

fn add_side(geometry: &mut Geometry, contour: &[Vector2<f32>], miters: &[Vector2<f32>], from: Layer, to: Layer) {
    let n = contour.len();
    for i in 0..n {
        let j = (i + 1) % n;
        let a = (contour[i] + miters[i] * from.offset).extend(from.z);
        let b = (contour[j] + miters[j] * from.offset).extend(from.z);
        let c = (contour[j] + miters[j] * to.offset).extend(to.z);
        let d = (contour[i] + miters[i] * to.offset).extend(to.z);

        let normal = {
            let n = (b - a).cross(d - a);
            if n.magnitude2() > EPSILON * EPSILON {
                n.normalize()
            } else {
                edge_normal(contour[i], contour[j]).extend(0.0)
            }
        };
        let base = geometry.vertices.len() as u32;
        for p in [a, b, c, d] {
            push(geometry, p.truncate(), p.z, normal);
        }
        geometry
            .indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point2;

    use super::*;

    fn square(x: f32, y: f32, side: f32) -> Vec<OutlineCommand> {
        vec![
            OutlineCommand::MoveTo(Point2::new(x, y)),
            OutlineCommand::LineTo(Point2::new(x + side, y)),
            OutlineCommand::LineTo(Point2::new(x + side, y + side)),
            OutlineCommand::LineTo(Point2::new(x, y + side)),
            OutlineCommand::LineTo(Point2::new(x, y)),
        ]
    }

    #[test]
    fn flatten_drops_closing_duplicate() {
        let contours = flatten(&square(0.0, 0.0, 1.0), 5);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 4);
    }

    #[test]
    fn flatten_subdivides_curves() {
        let commands = [
            OutlineCommand::MoveTo(Point2::new(0.0, 0.0)),
            OutlineCommand::QuadTo {
                ctrl: Point2::new(1.0, 1.0),
                to: Point2::new(2.0, 0.0),
            },
        ];
        let contours = flatten(&commands, 5);
        assert_eq!(contours[0].len(), 6);
        assert!((contours[0][5] - Vector2::new(2.0, 0.0)).magnitude() < 1e-6);
    }

    #[test]
    fn holes_wind_opposite_to_outer_contours() {
        // Both squares start out clockwise
        let mut commands = square(0.0, 0.0, 4.0);
        commands.extend(square(1.0, 1.0, 2.0));
        let mut contours = flatten(&commands, 1);
        for contour in &mut contours {
            contour.reverse();
        }
        let oriented = orient(contours);
        assert!(signed_area(&oriented[0]) > 0.0);
        assert!(signed_area(&oriented[1]) < 0.0);
    }

    #[test]
    fn miters_push_square_corners_diagonally() {
        let contour = orient(flatten(&square(0.0, 0.0, 1.0), 1)).remove(0);
        let miters = miters(&contour);
        for (p, m) in contour.iter().zip(&miters) {
            assert!((m.magnitude() - 2f32.sqrt()).abs() < 1e-5);
            // Outward means away from the centre
            let centre = Vector2::new(0.5, 0.5);
            assert!((*p + *m - centre).magnitude() > (*p - centre).magnitude());
        }
    }

    #[test]
    fn bevel_layers_span_thickness_on_both_sides() {
        let style = TextStyle::default();
        let layers = layers(&style);
        assert_eq!(layers.len(), 2 * style.bevel_segments as usize + 2);
        assert!((layers[0].z + style.bevel_thickness).abs() < 1e-6);
        assert!((layers[layers.len() - 1].z - style.depth - style.bevel_thickness).abs() < 1e-6);
        assert!(layers.windows(2).all(|w| w[0].z <= w[1].z));
    }

    #[test]
    fn flat_layers_without_bevel() {
        let style = TextStyle {
            bevel_enabled: false,
            ..TextStyle::default()
        };
        assert_eq!(
            layers(&style),
            vec![Layer { z: 0.0, offset: 0.0 }, Layer { z: 0.2, offset: 0.0 }]
        );
    }
}
