use approx::assert_relative_eq;
use cgmath::{InnerSpace, Vector3};
use donut_greeting::{config::TextStyle, resources::text::extrude_text};

use crate::common::test_utils::test_font;

mod common;

fn flat() -> TextStyle {
    TextStyle {
        bevel_enabled: false,
        ..TextStyle::default()
    }
}

#[test]
fn extruded_text_is_centred_on_the_origin() {
    let font = test_font();
    for text in ["I", "o", "Ie-", "Happy New Year - 2025", "two\nlines"] {
        let geometry = extrude_text(&font, text, &TextStyle::default(), 0.5).unwrap();
        let bounds = geometry.bounding_box().unwrap();
        let centre = bounds.center();
        for c in [centre.x, centre.y, centre.z] {
            assert!(c.abs() < 1e-4, "{:?} centred at {:?}", text, centre);
        }
    }
}

#[test]
fn holes_are_cut_out_of_the_caps() {
    let font = test_font();
    let solid = extrude_text(&font, "?", &flat(), 1.0).unwrap();
    let ring = extrude_text(&font, "o", &flat(), 1.0).unwrap();

    // A box is two triangles per cap plus four side quads
    assert_eq!(solid.triangle_count(), 2 * 2 + 4 * 2);
    assert!(ring.triangle_count() > solid.triangle_count());
    // The ring has eight side quads, four outside and four in the hole
    let side_triangles = 8 * 2;
    let cap_triangles = ring.triangle_count() - side_triangles;
    assert_eq!(cap_triangles % 2, 0);
    assert!(cap_triangles >= 2 * 8);
}

#[test]
fn depth_includes_bevel_thickness() {
    let font = test_font();
    let bevelled = extrude_text(&font, "I", &TextStyle::default(), 0.5).unwrap();
    let bounds = bevelled.bounding_box().unwrap();
    assert_relative_eq!(bounds.min.z, -0.13, epsilon = 1e-5);
    assert_relative_eq!(bounds.max.z, 0.13, epsilon = 1e-5);

    let plain = extrude_text(&font, "I", &flat(), 0.5).unwrap();
    let bounds = plain.bounding_box().unwrap();
    assert_relative_eq!(bounds.min.z, -0.1, epsilon = 1e-5);
    assert_relative_eq!(bounds.max.z, 0.1, epsilon = 1e-5);
}

#[test]
fn bevel_grows_the_outline() {
    let font = test_font();
    let style = TextStyle::default();
    let plain = extrude_text(&font, "I", &flat(), 0.5).unwrap().bounding_box().unwrap();
    let bevelled = extrude_text(&font, "I", &style, 0.5).unwrap().bounding_box().unwrap();

    let grow = 2.0 * (style.bevel_size + style.bevel_offset);
    assert_relative_eq!(bevelled.size().x, plain.size().x + grow, epsilon = 1e-4);
    assert_relative_eq!(bevelled.size().y, plain.size().y + grow, epsilon = 1e-4);
}

#[test]
fn size_scales_the_outline() {
    let font = test_font();
    let small = extrude_text(&font, "I", &flat(), 0.5).unwrap().bounding_box().unwrap();
    let large = extrude_text(&font, "I", &flat(), 1.0).unwrap().bounding_box().unwrap();

    assert_relative_eq!(small.size().x, 0.1, epsilon = 1e-5);
    assert_relative_eq!(small.size().y, 0.35, epsilon = 1e-5);
    assert_relative_eq!(large.size().y, 2.0 * small.size().y, epsilon = 1e-5);
    // Depth does not scale with the font size
    assert_relative_eq!(large.size().z, small.size().z, epsilon = 1e-5);
}

#[test]
fn blank_text_yields_empty_geometry() {
    let font = test_font();
    for text in ["", " ", "   "] {
        let geometry = extrude_text(&font, text, &TextStyle::default(), 0.5).unwrap();
        assert!(geometry.is_empty(), "{:?} produced triangles", text);
        assert!(geometry.bounding_box().is_none());
    }
}

#[test]
fn normals_are_unit_length() {
    let font = test_font();
    let geometry = extrude_text(&font, "Ioe-", &TextStyle::default(), 0.5).unwrap();
    assert!(!geometry.is_empty());
    for vertex in &geometry.vertices {
        let normal = Vector3::from(vertex.normal);
        assert_relative_eq!(normal.magnitude(), 1.0, epsilon = 1e-4);
    }
}

#[test]
fn indices_stay_in_bounds() {
    let font = test_font();
    let geometry = extrude_text(&font, "Happy New Year - 2025", &TextStyle::default(), 0.5).unwrap();
    let count = geometry.vertices.len() as u32;
    assert_eq!(geometry.indices.len() % 3, 0);
    assert!(geometry.indices.iter().all(|&i| i < count));
}
