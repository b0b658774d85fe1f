//! Host loop.
//!
//! [`run`] opens a window, builds the GPU context, the [`Loader`], the
//! [`MasterRender`] and the [`FrameExecutor`], lets the [`GameScene`] load its
//! assets and then, on every redraw:
//!
//! 1. `GameScene::update` feeds entities, terrains and the sky box
//! 2. the fly camera controller moves the camera, unless the scene took the
//!    input for itself
//! 3. `MasterRender::render` records the frame
//! 4. the executor replays it into the surface texture

use std::sync::Arc;

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    context::Context,
    data_structures::{camera::CameraController, light::Light},
    gpu::FrameExecutor,
    render::{MasterRender, RenderConfig},
    resources::{AssetSource, loader::Loader},
};

/// The application driven by [`run`].
#[allow(async_fn_in_trait)]
pub trait GameScene {
    /// Called once the GPU is ready. Upload models through `loader` and hand
    /// long-lived content (terrains, sky box) to `master`.
    async fn load(&mut self, loader: &mut Loader, master: &mut MasterRender) -> anyhow::Result<()>;

    /// Called every frame before rendering. Entities have to be processed
    /// again each frame; their buckets are emptied by every render.
    fn update(&mut self, dt: Duration, master: &mut MasterRender);

    /// The light the frame is lit by.
    fn sun(&self) -> Light;

    /// Sees every window event first. Returning `true` keeps it from the fly
    /// camera controller, e.g. when a [`crate::data_structures::player::Player`]
    /// is steered instead.
    fn input(&mut self, _event: &WindowEvent) -> bool {
        false
    }
}

/// Everything that only exists while a window does.
struct AppState {
    ctx: Context,
    loader: Loader,
    master: MasterRender,
    executor: FrameExecutor,
    is_surface_configured: bool,
}

impl AppState {
    async fn new<S: GameScene>(window: Arc<Window>, config: RenderConfig, scene: &mut S) -> anyhow::Result<Self> {
        let mut ctx = Context::new(window).await?;
        let (width, height) = ctx.size();
        let is_surface_configured = ctx.resize(width, height);

        let mut master = MasterRender::new(config, width, height)?;
        let executor = FrameExecutor::new(&ctx, &master.programs())?;
        let mut loader = Loader::new(ctx.device.clone(), ctx.queue.clone(), AssetSource::from_env());
        scene.load(&mut loader, &mut master).await?;
        log::info!(
            "scene loaded: {} models, {} textures",
            loader.model_count(),
            loader.texture_count()
        );

        Ok(Self {
            ctx,
            loader,
            master,
            executor,
            is_surface_configured,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.master.resize(width, height);
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self, sun: &Light) -> Result<(), wgpu::SurfaceError> {
        if let Some(window) = self.ctx.window() {
            window.request_redraw();
        }
        if !self.is_surface_configured {
            return Ok(());
        }
        let commands = self.master.render(sun);
        let Some(surface) = &self.ctx.surface else {
            return Ok(());
        };
        let output = surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        if let Err(e) = self.executor.execute(&self.ctx, &self.loader, &commands, &view) {
            log::error!("Unable to render {e:#}");
        }
        output.present();
        Ok(())
    }
}

pub struct App<S: GameScene> {
    async_runtime: tokio::runtime::Runtime,
    config: RenderConfig,
    scene: S,
    controller: CameraController,
    state: Option<AppState>,
    last_time: Instant,
}

impl<S: GameScene> App<S> {
    pub fn new(scene: S, config: RenderConfig) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            config,
            scene,
            controller: CameraController::new(20.0, 90.0),
            state: None,
            last_time: Instant::now(),
        })
    }
}

impl<S: GameScene> ApplicationHandler for App<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes().with_title("forward-ngin");
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let init = AppState::new(window, self.config, &mut self.scene);
        match self.async_runtime.block_on(init) {
            Ok(state) => {
                self.state = Some(state);
                self.last_time = Instant::now();
            }
            Err(e) => {
                log::error!("App initialization failed: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };
        if !self.scene.input(&event) {
            self.controller.handle_window_events(&event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                self.scene.update(dt, &mut state.master);
                self.controller.update(state.master.camera_mut(), dt);
                match state.render(&self.scene.sun()) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        if let Some(size) = state.ctx.window().map(|w| w.inner_size()) {
                            state.resize(size.width, size.height);
                        }
                    }
                    Err(e) => {
                        log::error!("Unable to render {e}");
                    }
                }
            }
            _ => {}
        }
    }
}

/// Runs `scene` until its window is closed.
pub fn run<S: GameScene>(scene: S, config: RenderConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(scene, config)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}

