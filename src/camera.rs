//! Camera, perspective projection and orbit controls.
//!
//! The camera always looks at its target; [`OrbitControls`] moves it on a
//! sphere around that target. With damping enabled, input is not applied at
//! once: every [`Controls::update`] consumes a fraction of the pending motion,
//! so the camera keeps easing after the mouse is released.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector2, Vector3};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::ModifiersState,
};

/// Vertical field of view of the scene camera.
pub const FOV_Y_DEGREES: f32 = 75.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

// Keeps the polar angle off the poles where `look_at` degenerates.
const POLAR_EPSILON: f32 = 1e-6;
// Pending motion below this is dropped instead of decaying forever.
const REST_EPSILON: f32 = 1e-6;

/// One axis of a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn get(self, point: &Point3<f32>) -> f32 {
        match self {
            Axis::X => point.x,
            Axis::Y => point.y,
            Axis::Z => point.z,
        }
    }

    pub fn set(self, point: &mut Point3<f32>, value: f32) {
        match self {
            Axis::X => point.x = value,
            Axis::Y => point.y = value,
            Axis::Z => point.z = value,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P) -> Self {
        Self {
            position: position.into(),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Recomputes the aspect ratio. Zero-area sizes leave the projection untouched.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("ignoring projection resize to {}x{}", width, height);
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Camera data as the matcap shader sees it.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view: [[f32; 4]; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view: Matrix4::identity().into(),
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        let view = camera.calc_matrix();
        self.view_position = camera.position.to_homogeneous().into();
        self.view = view.into();
        self.view_proj = (projection.calc_matrix() * view).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything that moves the camera once per frame before it is rendered.
pub trait Controls {
    /// Applies pending motion. Returns `true` if the camera moved.
    fn update(&mut self, camera: &mut Camera) -> bool;
}

/// What a held mouse button does while the cursor moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    Rotate,
    Pan,
}

/// Orbit-style controls around `target`.
///
/// Left drag rotates, right drag (or left drag with ctrl, shift or meta
/// held) pans, the wheel dollies. Pan moves the target and the camera
/// together in the view plane.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    // Pending pan in screen pixels, converted to world units on update
    pan_pixels: Vector2<f32>,
    drag: Option<(MouseButton, Drag)>,
    modifiers: ModifiersState,
    cursor: Option<PhysicalPosition<f64>>,
    viewport_height: f32,
    fovy: Rad<f32>,
}

impl OrbitControls {
    pub fn new(viewport_height: u32, fovy: Rad<f32>) -> Self {
        Self {
            target: Point3::new(0.0, 0.0, 0.0),
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_pixels: Vector2::new(0.0, 0.0),
            drag: None,
            modifiers: ModifiersState::empty(),
            cursor: None,
            viewport_height: viewport_height.max(1) as f32,
            fovy,
        }
    }

    pub fn with_damping(mut self) -> Self {
        self.enable_damping = true;
        self
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        if height > 0 {
            self.viewport_height = height as f32;
        }
    }

    /// Queues a rotation around the vertical axis.
    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    /// Queues a rotation towards the top pole.
    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Moves towards the target by `factor` (< 1) or away from it (> 1).
    pub fn dolly(&mut self, factor: f32) {
        if factor > 0.0 {
            self.scale *= factor;
        }
    }

    /// A full viewport height of drag is one full turn.
    pub fn on_drag(&mut self, dx: f32, dy: f32) {
        let per_pixel = 2.0 * PI / self.viewport_height * self.rotate_speed;
        self.rotate_left(dx * per_pixel);
        self.rotate_up(dy * per_pixel);
    }

    /// Queues a pan by a cursor movement in pixels. Dragging right or down
    /// drags the scene along with the cursor.
    pub fn on_pan(&mut self, dx: f32, dy: f32) {
        self.pan_pixels += Vector2::new(dx, dy) * self.pan_speed;
    }

    /// Each line scrolled up moves 5% closer; scrolling down moves away.
    pub fn on_scroll(&mut self, lines: f32) -> bool {
        if lines == 0.0 || !lines.is_finite() {
            return false;
        }
        let step = 0.95f32.powf(self.zoom_speed * lines.abs());
        self.dolly(if lines > 0.0 { step } else { 1.0 / step });
        true
    }

    pub fn set_modifiers(&mut self, modifiers: ModifiersState) {
        self.modifiers = modifiers;
    }

    /// Starts or ends a drag. Returns `true` if the button is one the controls use.
    pub fn on_button(&mut self, button: MouseButton, state: ElementState) -> bool {
        match state {
            ElementState::Pressed => {
                let panning_modifier = self.modifiers.control_key()
                    || self.modifiers.shift_key()
                    || self.modifiers.super_key();
                let drag = match button {
                    MouseButton::Left if panning_modifier => Drag::Pan,
                    MouseButton::Left => Drag::Rotate,
                    MouseButton::Right => Drag::Pan,
                    _ => return false,
                };
                self.drag = Some((button, drag));
                true
            }
            ElementState::Released => match self.drag {
                Some((held, _)) if held == button => {
                    self.drag = None;
                    true
                }
                _ => false,
            },
        }
    }

    /// Tracks the cursor; moves only while a button is held.
    pub fn on_cursor_moved(&mut self, position: PhysicalPosition<f64>) -> bool {
        let previous = self.cursor.replace(position);
        let (Some((_, drag)), Some(previous)) = (self.drag, previous) else {
            return false;
        };
        let dx = (position.x - previous.x) as f32;
        let dy = (position.y - previous.y) as f32;
        match drag {
            Drag::Rotate => self.on_drag(dx, dy),
            Drag::Pan => self.on_pan(dx, dy),
        }
        true
    }

    pub fn is_at_rest(&self) -> bool {
        self.delta_theta.abs() < REST_EPSILON
            && self.delta_phi.abs() < REST_EPSILON
            && (self.scale - 1.0).abs() < REST_EPSILON
            && self.pan_pixels.magnitude() < REST_EPSILON
    }

    /// Consumes mouse input. Returns `true` if the event was used.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                self.set_modifiers(modifiers.state());
                false
            }
            WindowEvent::MouseInput { button, state, .. } => self.on_button(*button, *state),
            WindowEvent::CursorMoved { position, .. } => self.on_cursor_moved(*position),
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 100.0,
                };
                self.on_scroll(lines)
            }
            _ => false,
        }
    }

    /// World-space shift of the target for `pixels` of pan seen from `camera`.
    fn pan_offset(&self, camera: &Camera, pixels: Vector2<f32>) -> Vector3<f32> {
        let offset = camera.position - self.target;
        let forward = -offset;
        let right = forward.cross(camera.up);
        if right.magnitude2() <= f32::EPSILON || forward.magnitude2() <= f32::EPSILON {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        let right = right.normalize();
        let up = right.cross(forward).normalize();
        // Height of the view frustum at the target, spread over the viewport
        let per_pixel = 2.0 * offset.magnitude() * (self.fovy.0 / 2.0).tan() / self.viewport_height;
        (-right * pixels.x + up * pixels.y) * per_pixel
    }
}

impl Controls for OrbitControls {
    fn update(&mut self, camera: &mut Camera) -> bool {
        camera.target = self.target;
        if self.is_at_rest() {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.scale = 1.0;
            self.pan_pixels = Vector2::new(0.0, 0.0);
            return false;
        }

        let applied = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        let pan = self.pan_offset(camera, self.pan_pixels * applied);
        let offset = camera.position - self.target;
        self.target += pan;
        camera.target = self.target;

        let radius = offset.magnitude();
        let new_offset = if radius <= f32::EPSILON {
            offset
        } else {
            let mut theta = offset.x.atan2(offset.z);
            let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
            theta += self.delta_theta * applied;
            phi += self.delta_phi * applied;
            let phi = phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
            let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
            Vector3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            )
        };
        let new_position = self.target + new_offset;

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.delta_theta *= keep;
            self.delta_phi *= keep;
            self.pan_pixels *= keep;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_pixels = Vector2::new(0.0, 0.0);
        }
        self.scale = 1.0;

        let moved = (new_position - camera.position).magnitude2() > REST_EPSILON * REST_EPSILON;
        camera.position = new_position;
        moved
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::Deg;

    use super::*;

    fn controls() -> OrbitControls {
        OrbitControls::new(600, Deg(FOV_Y_DEGREES).into())
    }

    fn at(x: f64, y: f64) -> PhysicalPosition<f64> {
        PhysicalPosition::new(x, y)
    }

    #[test]
    fn damping_applies_five_percent_and_keeps_the_rest() {
        let mut camera = Camera::new((0.0, 0.0, 3.0));
        let mut controls = controls().with_damping();
        controls.rotate_left(-0.4);

        assert!(controls.update(&mut camera));
        let theta = camera.position.x.atan2(camera.position.z);
        assert_relative_eq!(theta, 0.4 * 0.05, epsilon = 1e-5);
        assert_relative_eq!(controls.delta_theta, 0.4 * 0.95, epsilon = 1e-6);

        assert!(controls.update(&mut camera));
        let theta = camera.position.x.atan2(camera.position.z);
        assert_relative_eq!(theta, 0.4 * (0.05 + 0.95 * 0.05), epsilon = 1e-5);
        let radius = (camera.position - Point3::new(0.0, 0.0, 0.0)).magnitude();
        assert_relative_eq!(radius, 3.0, epsilon = 1e-4);
    }

    #[test]
    fn without_damping_motion_is_applied_at_once() {
        let mut camera = Camera::new((0.0, 0.0, 3.0));
        let mut controls = controls();
        controls.rotate_left(-PI / 2.0);

        assert!(controls.update(&mut camera));
        assert_relative_eq!(camera.position.x, 3.0, epsilon = 1e-4);
        assert!(camera.position.z.abs() < 1e-4);
        assert!(controls.is_at_rest());
        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn idle_update_leaves_position_untouched() {
        let mut camera = Camera::new((1.0, 1.0, 3.0));
        let mut controls = controls().with_damping();
        camera.position.z = 7.25;

        assert!(!controls.update(&mut camera));
        assert_eq!(camera.position, Point3::new(1.0, 1.0, 7.25));
    }

    #[test]
    fn drag_of_a_quarter_height_turns_a_quarter() {
        let mut camera = Camera::new((0.0, 0.0, 3.0));
        let mut controls = controls();
        controls.on_drag(150.0, 0.0);

        assert_relative_eq!(controls.delta_theta, -PI / 2.0, epsilon = 1e-6);
        controls.update(&mut camera);
        assert_relative_eq!(camera.position.x, -3.0, epsilon = 1e-4);
        assert!(camera.position.z.abs() < 1e-4);
    }

    #[test]
    fn cursor_rotates_only_while_left_button_is_held() {
        let mut controls = controls();
        assert!(!controls.on_cursor_moved(at(10.0, 10.0)));
        assert!(!controls.on_cursor_moved(at(70.0, 10.0)));
        assert!(controls.is_at_rest());

        assert!(controls.on_button(MouseButton::Left, ElementState::Pressed));
        assert!(controls.on_cursor_moved(at(130.0, 40.0)));
        let per_pixel = 2.0 * PI / 600.0;
        assert_relative_eq!(controls.delta_theta, -60.0 * per_pixel, epsilon = 1e-6);
        assert_relative_eq!(controls.delta_phi, -30.0 * per_pixel, epsilon = 1e-6);

        assert!(controls.on_button(MouseButton::Left, ElementState::Released));
        assert!(!controls.on_cursor_moved(at(500.0, 500.0)));
        assert_relative_eq!(controls.delta_theta, -60.0 * per_pixel, epsilon = 1e-6);
    }

    #[test]
    fn unused_buttons_are_ignored() {
        let mut controls = controls();
        assert!(!controls.on_button(MouseButton::Middle, ElementState::Pressed));
        assert!(!controls.on_button(MouseButton::Left, ElementState::Released));
        controls.on_cursor_moved(at(0.0, 0.0));
        assert!(!controls.on_cursor_moved(at(50.0, 0.0)));
    }

    #[test]
    fn wheel_notch_dollies_by_five_percent() {
        let mut camera = Camera::new((0.0, 0.0, 4.0));
        let mut controls = controls();

        assert!(controls.on_scroll(1.0));
        controls.update(&mut camera);
        assert_relative_eq!(camera.position.z, 4.0 * 0.95, epsilon = 1e-4);

        assert!(controls.on_scroll(-1.0));
        controls.update(&mut camera);
        assert_relative_eq!(camera.position.z, 4.0, epsilon = 1e-4);

        assert!(!controls.on_scroll(0.0));
        assert!(controls.is_at_rest());
    }

    #[test]
    fn polar_angle_stays_off_the_poles() {
        let mut camera = Camera::new((0.0, 0.0, 3.0));
        let mut controls = controls();
        controls.rotate_up(10.0);
        controls.update(&mut camera);

        assert!(camera.position.x.is_finite() && camera.position.z.is_finite());
        assert_relative_eq!(camera.position.y, 3.0, epsilon = 1e-4);
        let view = camera.calc_matrix();
        assert!(view.x.x.is_finite());

        controls.rotate_up(-20.0);
        controls.update(&mut camera);
        assert_relative_eq!(camera.position.y, -3.0, epsilon = 1e-4);
    }

    #[test]
    fn distance_is_clamped() {
        let mut camera = Camera::new((0.0, 0.0, 4.0));
        let mut controls = controls();
        controls.min_distance = 2.0;
        controls.max_distance = 6.0;

        controls.dolly(0.1);
        controls.update(&mut camera);
        assert_relative_eq!(camera.position.z, 2.0, epsilon = 1e-4);

        controls.dolly(100.0);
        controls.update(&mut camera);
        assert_relative_eq!(camera.position.z, 6.0, epsilon = 1e-4);
    }

    #[test]
    fn right_drag_pans_target_and_camera_together() {
        let mut camera = Camera::new((0.0, 0.0, 3.0));
        let mut controls = controls();
        controls.on_cursor_moved(at(100.0, 100.0));
        assert!(controls.on_button(MouseButton::Right, ElementState::Pressed));
        assert!(controls.on_cursor_moved(at(200.0, 150.0)));

        assert!(controls.update(&mut camera));
        let per_pixel = 2.0 * 3.0 * (Rad::from(Deg(FOV_Y_DEGREES)).0 / 2.0).tan() / 600.0;
        // The scene follows the cursor: the target moves left and up
        assert_relative_eq!(controls.target.x, -100.0 * per_pixel, epsilon = 1e-5);
        assert_relative_eq!(controls.target.y, 50.0 * per_pixel, epsilon = 1e-5);
        assert_relative_eq!(controls.target.z, 0.0, epsilon = 1e-5);
        assert_eq!(camera.target, controls.target);
        let offset = camera.position - camera.target;
        assert_relative_eq!(offset.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(offset.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(offset.z, 3.0, epsilon = 1e-5);
        assert!(controls.is_at_rest());
    }

    #[test]
    fn modified_left_drag_pans() {
        let mut controls = controls();
        controls.set_modifiers(ModifiersState::SHIFT);
        controls.on_cursor_moved(at(0.0, 0.0));
        controls.on_button(MouseButton::Left, ElementState::Pressed);
        controls.on_cursor_moved(at(30.0, 0.0));

        assert_eq!(controls.pan_pixels, Vector2::new(30.0, 0.0));
        assert_eq!(controls.delta_theta, 0.0);
    }

    #[test]
    fn pan_is_damped() {
        let mut camera = Camera::new((0.0, 0.0, 3.0));
        let mut controls = controls().with_damping();
        controls.on_pan(-100.0, 0.0);

        controls.update(&mut camera);
        let per_pixel = 2.0 * 3.0 * (Rad::from(Deg(FOV_Y_DEGREES)).0 / 2.0).tan() / 600.0;
        assert_relative_eq!(controls.target.x, 100.0 * per_pixel * 0.05, epsilon = 1e-5);
        assert_relative_eq!(controls.pan_pixels.x, -95.0, epsilon = 1e-4);
        assert_relative_eq!(camera.position.x, controls.target.x, epsilon = 1e-5);
    }

    #[test]
    fn projection_ignores_zero_sized_resize() {
        let mut projection = Projection::new(800, 600, Deg(FOV_Y_DEGREES), Z_NEAR, Z_FAR);
        projection.resize(0, 600);
        assert!((projection.aspect() - 800.0 / 600.0).abs() < 1e-6);
    }
}
