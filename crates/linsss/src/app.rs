//! Application window and event loop management.

use std::path::PathBuf;
use std::sync::Arc;

use egui_wgpu::ScreenDescriptor;
use pollster::FutureExt;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

use linsss_core::RenderParameters;
use linsss_render::{OrbitCamera, RenderEngine, RenderError, RenderResult};

use crate::egui_integration::EguiIntegration;
use crate::ui;

const DEFAULT_WIDTH: u32 = 1024;
const DEFAULT_HEIGHT: u32 = 768;

/// Degrees of orbit rotation per pixel of drag.
const DRAG_SENSITIVITY: f32 = 0.5;

struct Gpu {
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    engine: RenderEngine,
}

/// The viewer application state.
pub struct App {
    asset_root: PathBuf,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    egui: Option<EguiIntegration>,
    camera: OrbitCamera,
    close_requested: bool,
    mouse_pos: (f64, f64),
    left_mouse_down: bool,
}

impl App {
    pub fn new(asset_root: PathBuf) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let aspect = DEFAULT_WIDTH as f32 / DEFAULT_HEIGHT as f32;
        Self {
            asset_root,
            window: None,
            gpu: None,
            egui: None,
            camera: OrbitCamera::new(aspect),
            close_requested: false,
            mouse_pos: (0.0, 0.0),
            left_mouse_down: false,
        }
    }

    async fn create_gpu(&self, window: Arc<Window>) -> RenderResult<Gpu> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        // The separable filter dispatches 32x32 workgroups, above the default
        // invocation limit.
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("linsss device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits {
                    max_compute_invocations_per_workgroup: 1024,
                    ..wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let surface_caps = surface.get_capabilities(&adapter);
        // Gamma is applied in the postprocess pass, so write to a linear view.
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let engine = RenderEngine::new(
            device,
            queue,
            surface_format,
            width,
            height,
            self.asset_root.clone(),
            RenderParameters::default(),
        )?;

        Ok(Gpu {
            surface,
            surface_config,
            engine,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(gpu) = &mut self.gpu {
            gpu.surface_config.width = width;
            gpu.surface_config.height = height;
            gpu.surface.configure(gpu.engine.device(), &gpu.surface_config);
            gpu.engine.resize(width, height);
            #[allow(clippy::cast_precision_loss)]
            self.camera.set_aspect(width as f32 / height as f32);
        }
    }

    fn render(&mut self) {
        let (Some(gpu), Some(egui), Some(window)) =
            (&mut self.gpu, &mut self.egui, &self.window)
        else {
            return;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface
                    .configure(gpu.engine.device(), &gpu.surface_config);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of memory");
                self.close_requested = true;
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timeout");
                return;
            }
            Err(wgpu::SurfaceError::Other) => {
                log::warn!("surface error: other");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        egui.begin_frame(window);
        let mut params = gpu.engine.params();
        ui::settings_panel(&egui.context, &mut params);
        let full_output = egui.end_frame(window);

        if params != gpu.engine.params() {
            if let Err(err) = gpu.engine.set_params(params) {
                log::error!("failed to apply settings: {err}");
            }
        }

        gpu.engine.render(&view, &mut self.camera);

        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [gpu.surface_config.width, gpu.surface_config.height],
            #[allow(clippy::cast_possible_truncation)]
            pixels_per_point: window.scale_factor() as f32,
        };
        let mut encoder = gpu
            .engine
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });
        egui.render(
            gpu.engine.device(),
            gpu.engine.queue(),
            &mut encoder,
            &view,
            &screen_descriptor,
            full_output,
        );
        gpu.engine.queue().submit(std::iter::once(encoder.finish()));

        output.present();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("linsss")
            .with_inner_size(LogicalSize::new(DEFAULT_WIDTH, DEFAULT_HEIGHT));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .expect("failed to create window"),
        );

        let gpu = self
            .create_gpu(window.clone())
            .block_on()
            .expect("failed to create render engine");
        let egui = EguiIntegration::new(gpu.engine.device(), gpu.surface_config.format, &window);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui = Some(egui);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Track the physical button state even when egui consumes the event,
        // so a release inside the panel never leaves the drag stuck.
        if let WindowEvent::MouseInput { state, button, .. } = &event {
            if *button == MouseButton::Left {
                self.left_mouse_down = *state == ElementState::Pressed;
            }
        }

        let egui_consumed = if let (Some(egui), Some(window)) = (&mut self.egui, &self.window) {
            egui.handle_event(window, &event)
        } else {
            false
        };

        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                self.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                self.render();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let delta_x = position.x - self.mouse_pos.0;
                let delta_y = position.y - self.mouse_pos.1;
                self.mouse_pos = (position.x, position.y);

                #[allow(clippy::cast_possible_truncation)]
                if self.left_mouse_down && !egui_consumed {
                    self.camera.rotate(
                        delta_x as f32 * DRAG_SENSITIVITY,
                        delta_y as f32 * DRAG_SENSITIVITY,
                    );
                }
            }
            WindowEvent::MouseWheel { delta, .. } if !egui_consumed => {
                #[allow(clippy::cast_possible_truncation)]
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y * 0.25,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.01,
                };
                self.camera.dolly(amount);
            }
            _ => {}
        }

        if self.close_requested {
            event_loop.exit();
        }
    }
}
