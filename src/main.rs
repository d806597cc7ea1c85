//! sdfview - segmentation-carved volume viewer
//!
//! Shows one layer of a volume at a time, carved by the signed distance field
//! of its segmentation label, in one of several display modes.

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::WindowId,
};

use sdfview::config::AppConfig;
use sdfview::input::{InputAction, InputMapper};
use sdfview::systems::{DataSource, RenderError, RenderSystem, ViewerSystem, WindowSystem};

/// Main application state
struct App {
    config: AppConfig,
    window: Option<WindowSystem>,
    render: Option<RenderSystem>,
    viewer: Option<ViewerSystem>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            window: None,
            render: None,
            viewer: None,
        }
    }

    /// Create the window, GPU context and viewer
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn std::error::Error>> {
        let window = WindowSystem::create(event_loop, &self.config.window)?;
        let render = RenderSystem::new(
            window.window().clone(),
            &self.config.rendering,
            self.config.window.vsync,
        )?;

        let source = DataSource::from_config(&self.config.data)?;
        let viewer = ViewerSystem::open(source, &self.config.view, &self.config.rendering, window.size())?;
        log::info!("Showing {}", viewer.status());

        window.update_title(&viewer.status());
        window.request_redraw();

        self.window = Some(window);
        self.render = Some(render);
        self.viewer = Some(viewer);
        Ok(())
    }

    fn handle_action(&mut self, event_loop: &ActiveEventLoop, action: InputAction) {
        match action {
            InputAction::Exit => {
                event_loop.exit();
                return;
            }
            InputAction::ToggleFullscreen => {
                if let Some(window) = &self.window {
                    window.toggle_fullscreen();
                }
                return;
            }
            _ => {}
        }

        let Some(viewer) = &mut self.viewer else {
            return;
        };
        // Rejected edits leave the view as it was
        if let Err(e) = viewer.handle(action) {
            log::warn!("{}", e);
        }
        if let Some(window) = &self.window {
            window.update_title(&viewer.status());
            window.request_redraw();
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(render), Some(viewer)) = (&mut self.render, &self.viewer) else {
            return;
        };

        match viewer.with_framebuffer(|fb| render.present(fb)) {
            Ok(()) => {}
            Err(RenderError::SurfaceLost) => {
                let (width, height) = render.size();
                render.resize(width, height);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            Err(RenderError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("{}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.start(event_loop) {
                log::error!("Failed to start viewer: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let (width, height) = (physical_size.width, physical_size.height);
                if let Some(render) = &mut self.render {
                    render.resize(width, height);
                }
                if let Some(viewer) = &mut self.viewer {
                    if let Err(e) = viewer.resize(width, height) {
                        log::warn!("Resize failed: {}", e);
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if let Some(action) = InputMapper::map_keyboard(key, event.state) {
                        self.handle_action(event_loop, action);
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.cursor_moved(position.x, position.y);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(action) = InputMapper::map_mouse_button(button, state) {
                    self.handle_action(event_loop, action);
                }
            }

            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }

            _ => {}
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let loaded = AppConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.debug.log_level.as_str()),
    )
    .init();
    if let Err(e) = &loaded {
        log::warn!("Failed to load config: {}. Using defaults.", e);
    }
    log::info!("Starting sdfview");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}
