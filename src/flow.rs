//! Render loop and application event loop.
//!
//! This module wires the [`SceneContext`] to winit. Everything runs on the
//! event loop thread: asset loads are awaited elsewhere (a tokio runtime
//! natively, `spawn_local` on the web) and come back as [`SceneEvent`]s, so
//! the scene is only ever touched from one place.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window, the scene context and the renderer, then
//!    starts the font and matcap loads
//! 2. every `RedrawRequested` runs one [`RenderLoop::frame`]: controls update,
//!    render, schedule the next frame
//! 3. `FontLoaded` builds the text and donuts once; `TextureLoaded` swaps a
//!    matcap in for its placeholder
//! 4. `CloseRequested` stops the loop and exits

use std::{fmt::Debug, sync::Arc};

use instant::{Duration, Instant};
use rand::{SeedableRng, rngs::SmallRng};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    assembly::SceneContext,
    camera::{Camera, Controls, Projection},
    config::SceneConfig,
    data_structures::{material::TextureHandle, scene_graph::Scene},
    debug::DebugPanel,
    render::GpuRenderer,
    resources::{
        font::{Font, load_font},
        load_binary,
    },
    viewport::{RenderTarget, Viewport},
};

#[cfg(target_arch = "wasm32")]
use crate::context::StartupError;

/// Draws the scene. Implemented by [`GpuRenderer`]; tests substitute a recorder.
pub trait SceneRenderer {
    type Error;

    fn render(&mut self, scene: &Scene, camera: &Camera, projection: &Projection) -> Result<(), Self::Error>;

    fn resize(&mut self, target: &RenderTarget);
}

/// Asks the host for the next frame.
pub trait FrameScheduler {
    fn schedule(&self);
}

impl FrameScheduler for Window {
    fn schedule(&self) {
        self.request_redraw();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Wall-clock time since the loop started.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: Instant,
    last: Instant,
}

impl Clock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time since the previous call.
    pub fn delta(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now - self.last;
        self.last = now;
        dt
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    clock: Clock,
    frames: u64,
}

impl RenderLoop {
    /// A loop in the running state.
    pub fn start() -> Self {
        Self {
            state: LoopState::Running,
            clock: Clock::new(),
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Frames rendered so far, including ones whose render call failed.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            log::info!("render loop stopped after {} frames", self.frames);
        }
        self.state = LoopState::Stopped;
    }

    /// One iteration: controls, then render, then schedule the next one.
    ///
    /// The next frame is scheduled even when rendering fails, so a transient
    /// surface error never ends the loop; the error is returned for the
    /// caller to react to. Returns `Ok(false)` once stopped, without touching
    /// anything.
    pub fn frame<C, R, S>(
        &mut self,
        controls: &mut C,
        camera: &mut Camera,
        scene: &Scene,
        projection: &Projection,
        renderer: &mut R,
        scheduler: &S,
    ) -> Result<bool, R::Error>
    where
        C: Controls + ?Sized,
        R: SceneRenderer + ?Sized,
        S: FrameScheduler + ?Sized,
    {
        if self.state == LoopState::Stopped {
            return Ok(false);
        }
        let dt = self.clock.delta();
        log::trace!(
            "frame {} elapsed {:.3}s dt {:.1}ms",
            self.frames,
            self.clock.elapsed().as_secs_f32(),
            dt.as_secs_f32() * 1000.0
        );

        controls.update(camera);
        let rendered = renderer.render(scene, camera, projection);
        scheduler.schedule();
        self.frames += 1;
        rendered.map(|_| true)
    }
}

pub enum SceneEvent {
    /// The renderer finished its async setup (web only).
    #[cfg(target_arch = "wasm32")]
    Initialized(Result<Box<GpuRenderer>, StartupError>),
    FontLoaded(anyhow::Result<Font>),
    TextureLoaded {
        handle: TextureHandle,
        result: anyhow::Result<Vec<u8>>,
    },
    DebugInput(f32),
}

impl Debug for SceneEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(result) => f
                .debug_tuple("Initialized")
                .field(&result.as_ref().map(|_| "GpuRenderer"))
                .finish(),
            Self::FontLoaded(result) => f
                .debug_tuple("FontLoaded")
                .field(&result.as_ref().map(|font| font.family().to_string()))
                .finish(),
            Self::TextureLoaded { handle, result } => f
                .debug_struct("TextureLoaded")
                .field("handle", handle)
                .field("bytes", &result.as_ref().map(|b| b.len()))
                .finish(),
            Self::DebugInput(value) => f.debug_tuple("DebugInput").field(value).finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<SceneEvent>,
    // Taken in `resumed`.
    config: Option<SceneConfig>,
    window: Option<Arc<Window>>,
    scene: Option<SceneContext>,
    renderer: Option<GpuRenderer>,
    // Images that arrived before the renderer did.
    pending_textures: Vec<(TextureHandle, Vec<u8>)>,
    render_loop: RenderLoop,
    rng: SmallRng,
    #[cfg(target_arch = "wasm32")]
    debug_slider: Option<crate::debug::DebugSlider>,
}

impl App {
    fn new(event_loop: &EventLoop<SceneEvent>, config: SceneConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        let seed = config.seed.unwrap_or_else(|| instant::now().to_bits());
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config: Some(config),
            window: None,
            scene: None,
            renderer: None,
            pending_textures: Vec::new(),
            render_loop: RenderLoop::start(),
            rng: SmallRng::seed_from_u64(seed),
            #[cfg(target_arch = "wasm32")]
            debug_slider: None,
        })
    }

    /// Runs `load` in the background and posts its result to the event loop.
    #[cfg(not(target_arch = "wasm32"))]
    fn spawn_load<F>(&self, load: F)
    where
        F: Future<Output = SceneEvent> + Send + 'static,
    {
        let proxy = self.proxy.clone();
        self.async_runtime.spawn(async move {
            let event = load.await;
            if let Err(e) = proxy.send_event(event) {
                log::warn!("event loop closed before a load finished: {:?}", e.0);
            }
        });
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn_load<F>(&self, load: F)
    where
        F: Future<Output = SceneEvent> + 'static,
    {
        let proxy = self.proxy.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let event = load.await;
            if let Err(e) = proxy.send_event(event) {
                log::warn!("event loop closed before a load finished: {:?}", e.0);
            }
        });
    }

    fn request_textures(&mut self) {
        let requests = match self.scene.as_mut() {
            Some(scene) => scene.textures.take_requests(),
            None => return,
        };
        for handle in requests {
            self.spawn_load(async move {
                let result = load_binary(&handle.path).await;
                SceneEvent::TextureLoaded { handle, result }
            });
        }
    }

    fn apply_texture(&mut self, handle: TextureHandle, bytes: Vec<u8>) {
        match self.renderer.as_mut() {
            Some(renderer) => {
                if let Err(e) = renderer.upload_texture(&handle, &bytes) {
                    log::warn!("matcap {} could not be decoded, keeping placeholder: {:#}", handle.path, e);
                }
            }
            None => self.pending_textures.push((handle, bytes)),
        }
    }

    fn renderer_ready(&mut self, mut renderer: GpuRenderer) {
        if let Some(scene) = &self.scene {
            renderer.resize(&scene.target);
        }
        for (handle, bytes) in std::mem::take(&mut self.pending_textures) {
            if let Err(e) = renderer.upload_texture(&handle, &bytes) {
                log::warn!("matcap {} could not be decoded, keeping placeholder: {:#}", handle.path, e);
            }
        }
        renderer.window().request_redraw();
        self.renderer = Some(renderer);
    }

    fn on_viewport_change(&mut self) {
        let (Some(window), Some(scene)) = (&self.window, self.scene.as_mut()) else {
            return;
        };
        if scene.on_resize(Viewport::from_window(window)) {
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.resize(&scene.target);
            }
        }
    }

    fn startup(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let Some(config) = self.config.take() else {
            return Ok(());
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(config.title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_SELECTOR: &str = "canvas.webgl";

            let canvas = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.query_selector(CANVAS_SELECTOR).ok().flatten())
                .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok())
                .ok_or_else(|| StartupError::SurfaceNotFound(CANVAS_SELECTOR.to_string()))?;
            window_attributes = window_attributes.with_canvas(Some(canvas));
        }

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let scene = SceneContext::new(config, Viewport::from_window(&window))?;

        let font_path = scene.config().font.clone();
        let target = scene.target;
        let clear_colour = scene.config().clear_colour;

        #[cfg(target_arch = "wasm32")]
        if let Some(panel) = scene.debug_panel() {
            match crate::debug::mount(panel, self.proxy.clone()) {
                Ok(slider) => self.debug_slider = Some(slider),
                Err(e) => log::warn!("debug panel unavailable: {:#}", e),
            }
        }

        self.window = Some(window.clone());
        self.scene = Some(scene);

        self.spawn_load(async move { SceneEvent::FontLoaded(load_font(&font_path).await) });
        self.request_textures();

        #[cfg(not(target_arch = "wasm32"))]
        {
            let renderer = self
                .async_runtime
                .block_on(GpuRenderer::new(window, &target, clear_colour))?;
            self.renderer_ready(renderer);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = GpuRenderer::new(window, &target, clear_colour)
                    .await
                    .map(Box::new);
                if proxy.send_event(SceneEvent::Initialized(result)).is_err() {
                    log::error!("event loop closed during GPU setup");
                }
            });
        }

        Ok(())
    }
}

impl ApplicationHandler<SceneEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.startup(event_loop) {
            log::error!("startup failed: {:#}", e);
            self.render_loop.stop();
            event_loop.exit();
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: SceneEvent) {
        log::debug!("{:?}", event);
        match event {
            #[cfg(target_arch = "wasm32")]
            SceneEvent::Initialized(result) => match result {
                Ok(renderer) => self.renderer_ready(*renderer),
                Err(e) => {
                    log::error!("startup failed: {}", e);
                    self.render_loop.stop();
                    _event_loop.exit();
                }
            },
            SceneEvent::FontLoaded(result) => {
                let Some(scene) = self.scene.as_mut() else {
                    return;
                };
                match scene.on_font_loaded(result, &mut self.rng) {
                    Ok(_) => {
                        if let Some(window) = &self.window {
                            window.request_redraw();
                        }
                    }
                    Err(e) => log::warn!("font result rejected: {:#}", e),
                }
            }
            SceneEvent::TextureLoaded { handle, result } => match result {
                Ok(bytes) => self.apply_texture(handle, bytes),
                Err(e) => log::warn!("matcap {} failed to load, keeping placeholder: {:#}", handle.path, e),
            },
            SceneEvent::DebugInput(value) => {
                if let Some(scene) = self.scene.as_mut() {
                    scene.debug_set(value);
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let Some(scene) = self.scene.as_mut() {
            scene.controls.handle_window_events(&event);
        }

        match event {
            WindowEvent::CloseRequested => {
                self.render_loop.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => self.on_viewport_change(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let (Some(steps), Some(scene)) = (DebugPanel::steps_for_key(&event), self.scene.as_mut()) {
                    scene.debug_nudge(steps);
                    #[cfg(target_arch = "wasm32")]
                    if let (Some(slider), Some(panel)) = (&self.debug_slider, scene.debug_panel()) {
                        slider.show(panel);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let (Some(scene), Some(renderer), Some(window)) =
                    (self.scene.as_mut(), self.renderer.as_mut(), self.window.as_ref())
                else {
                    return;
                };
                match scene.frame(&mut self.render_loop, renderer, &**window) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => renderer.reconfigure(),
                    Err(e) => log::error!("Unable to render {}", e),
                }
            }
            _ => {}
        }
    }
}

/// Opens the window and runs the scene until it is closed.
pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)?;
    }

    let event_loop: EventLoop<SceneEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
