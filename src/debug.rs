//! The debug panel: one numeric control bound to an axis of the camera
//! position.
//!
//! On the web the control is an `<input type="range">` appended to the page;
//! its `input` events come back to the event loop as
//! [`SceneEvent::DebugInput`](crate::flow::SceneEvent). Natively there is no
//! widget, so the bracket and page keys nudge the value instead.

use winit::{
    event::{ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{camera::Camera, config::DebugPanelConfig};

#[derive(Clone, Debug)]
pub struct DebugPanel {
    config: DebugPanelConfig,
    value: f32,
}

impl DebugPanel {
    /// Starts out showing the camera's current value.
    pub fn new(config: DebugPanelConfig, camera: &Camera) -> Self {
        let mut panel = Self { config, value: 0.0 };
        panel.value = panel.snap(panel.config.axis.get(&camera.position));
        panel
    }

    pub fn config(&self) -> &DebugPanelConfig {
        &self.config
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Clamps to the range, then to the nearest step.
    fn snap(&self, value: f32) -> f32 {
        let DebugPanelConfig { min, max, step, .. } = self.config;
        let value = value.clamp(min, max);
        if step <= 0.0 {
            return value;
        }
        let steps = ((value - min) as f64 / step as f64).round();
        // Dividing by a whole-number inverse keeps decimal steps exact
        let inverse = 1.0 / step as f64;
        let offset = if (inverse - inverse.round()).abs() < 1e-3 {
            steps / inverse.round()
        } else {
            steps * step as f64
        };
        (min + offset as f32).clamp(min, max)
    }

    /// The value printed with as many decimals as the step has.
    pub fn value_text(&self) -> String {
        let step = self.config.step.to_string();
        let decimals = step.split_once('.').map_or(0, |(_, frac)| frac.len());
        format!("{:.*}", decimals, self.value)
    }

    /// Writes `value` to the camera and returns what was actually applied.
    /// Non-finite input leaves the camera alone.
    pub fn set(&mut self, value: f32, camera: &mut Camera) -> f32 {
        if !value.is_finite() {
            log::debug!("{}: ignoring {}", self.config.label, value);
            return self.value;
        }
        self.value = self.snap(value);
        self.config.axis.set(&mut camera.position, self.value);
        log::debug!("{} = {}", self.config.label, self.value);
        self.value
    }

    /// Moves the value by a whole number of steps from where the camera is now.
    pub fn nudge(&mut self, steps: i32, camera: &mut Camera) -> f32 {
        let current = self.config.axis.get(&camera.position);
        self.set(current + steps as f32 * self.config.step, camera)
    }

    /// `[`/`]` move by 100 steps, PageDown/PageUp by 1000.
    pub fn steps_for_key(event: &KeyEvent) -> Option<i32> {
        if event.state != ElementState::Pressed {
            return None;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::BracketLeft) => Some(-100),
            PhysicalKey::Code(KeyCode::BracketRight) => Some(100),
            PhysicalKey::Code(KeyCode::PageDown) => Some(-1000),
            PhysicalKey::Code(KeyCode::PageUp) => Some(1000),
            _ => None,
        }
    }
}

/// The range input shown on the page.
#[cfg(target_arch = "wasm32")]
pub struct DebugSlider {
    input: web_sys::HtmlInputElement,
}

#[cfg(target_arch = "wasm32")]
impl DebugSlider {
    /// Moves the slider to the panel's value after an edit from elsewhere.
    pub fn show(&self, panel: &DebugPanel) {
        self.input.set_value(&panel.value_text());
    }
}

/// Appends the range input for `panel` to the page body.
#[cfg(target_arch = "wasm32")]
pub fn mount(
    panel: &DebugPanel,
    proxy: winit::event_loop::EventLoopProxy<crate::flow::SceneEvent>,
) -> anyhow::Result<DebugSlider> {
    use wasm_bindgen::{JsCast, closure::Closure};

    let js = |e: wasm_bindgen::JsValue| anyhow::anyhow!("{:?}", e);
    let config = panel.config();
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| anyhow::anyhow!("no document"))?;
    let body = document.body().ok_or_else(|| anyhow::anyhow!("no body"))?;

    let container = document.create_element("div").map_err(js)?;
    container.set_class_name("debug-panel");
    container
        .set_attribute(
            "style",
            "position:fixed;top:8px;right:8px;padding:6px 10px;background:#1f1f1f;color:#eee;font:12px sans-serif",
        )
        .map_err(js)?;
    let label = document.create_element("label").map_err(js)?;
    label.set_text_content(Some(&config.label));

    let input: web_sys::HtmlInputElement = document
        .create_element("input")
        .map_err(js)?
        .dyn_into()
        .map_err(|_| anyhow::anyhow!("created element is not an input"))?;
    input.set_type("range");
    input.set_min(&config.min.to_string());
    input.set_max(&config.max.to_string());
    input.set_step(&config.step.to_string());
    input.set_value(&panel.value_text());

    let source = input.clone();
    let on_input = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
        if let Ok(value) = source.value().parse::<f32>() {
            if let Err(e) = proxy.send_event(crate::flow::SceneEvent::DebugInput(value)) {
                log::warn!("event loop closed, dropping slider input: {:?}", e.0);
            }
        }
    });
    input
        .add_event_listener_with_callback("input", on_input.as_ref().unchecked_ref())
        .map_err(js)?;
    // The listener lives as long as the page
    on_input.forget();

    label.append_child(&input).map_err(js)?;
    container.append_child(&label).map_err(js)?;
    body.append_child(&container).map_err(js)?;
    Ok(DebugSlider { input })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::camera::Axis;

    fn panel(camera: &Camera) -> DebugPanel {
        DebugPanel::new(DebugPanelConfig::default(), camera)
    }

    #[test]
    fn edits_are_clamped_to_range() {
        let mut camera = Camera::new((1.0, 1.0, 4.0));
        let mut panel = panel(&camera);
        assert_eq!(panel.set(42.0, &mut camera), 10.0);
        assert_eq!(camera.position.z, 10.0);
        assert_eq!(panel.set(-3.0, &mut camera), 0.0);
        assert_eq!(camera.position.z, 0.0);
    }

    #[test]
    fn edits_snap_to_step() {
        let mut camera = Camera::new((1.0, 1.0, 4.0));
        let mut panel = panel(&camera);
        assert_relative_eq!(panel.set(2.34567, &mut camera), 2.346, epsilon = 1e-5);
    }

    #[test]
    fn only_the_bound_axis_changes() {
        let mut camera = Camera::new((1.0, 1.0, 4.0));
        let config = DebugPanelConfig {
            axis: Axis::Y,
            ..DebugPanelConfig::default()
        };
        let mut panel = DebugPanel::new(config, &camera);
        panel.set(5.0, &mut camera);
        assert_eq!((camera.position.x, camera.position.y, camera.position.z), (1.0, 5.0, 4.0));
    }

    #[test]
    fn nan_is_ignored() {
        let mut camera = Camera::new((1.0, 1.0, 4.0));
        let mut panel = panel(&camera);
        assert_eq!(panel.set(f32::NAN, &mut camera), 4.0);
        assert_eq!(camera.position.z, 4.0);
    }

    #[test]
    fn grid_values_are_exact() {
        let mut camera = Camera::new((1.0, 1.0, 4.0));
        let mut panel = panel(&camera);
        assert_eq!(panel.value(), 4.0);
        assert_eq!(panel.set(6.5, &mut camera), 6.5);
        assert_eq!(panel.set(9.25, &mut camera), 9.25);
    }

    #[test]
    fn value_text_uses_step_precision() {
        let mut camera = Camera::new((1.0, 1.0, 4.0));
        let mut panel = panel(&camera);
        assert_eq!(panel.value_text(), "4.000");
        panel.nudge(1000, &mut camera);
        assert_eq!(panel.value_text(), "5.000");
        panel.set(2.34567, &mut camera);
        assert_eq!(panel.value_text(), "2.346");

        let coarse = DebugPanelConfig {
            step: 1.0,
            ..DebugPanelConfig::default()
        };
        let panel = DebugPanel::new(coarse, &camera);
        assert_eq!(panel.value_text(), "2");
    }

    #[test]
    fn nudge_moves_by_steps() {
        let mut camera = Camera::new((1.0, 1.0, 4.0));
        let mut panel = panel(&camera);
        assert_relative_eq!(panel.nudge(100, &mut camera), 4.1, epsilon = 1e-5);
        assert_relative_eq!(panel.nudge(-1000, &mut camera), 3.1, epsilon = 1e-5);
    }
}
