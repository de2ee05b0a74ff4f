//! Winit + egui application shell for the HDF5 volume viewer.

use std::{
    env,
    path::PathBuf,
    rc::Rc,
    time::{Duration, Instant},
};

use anyhow::{bail, Context as _, Result};
use egui::{
    Color32, ColorImage, Context as EguiContext, TextureHandle, TextureOptions, Vec2, ViewportId,
};
use egui_wgpu::{wgpu, ScreenDescriptor};
use egui_winit::State as EguiWinitState;
use pollster::block_on;
use tracer::init_tracing;
use tracing::{info, warn};
use volview_core::{
    config::ViewerConfig, Colormap, DisplaySettings, Extents, LoadError, RenderUniforms, Session,
    Slice, SliceAxis, SliderPositions,
};
use volview_gfx::{GpuContext, OrbitCamera, VolumeRenderer};
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::Window,
};

#[cfg(target_arch = "wasm32")]
compile_error!("wasm32 builds are not supported; the viewer needs a native file dialog.");

const ORBIT_RADIANS_PER_PIXEL: f32 = 0.008;
const PIXELS_PER_SCROLL_LINE: f32 = 40.0;
const SLICE_PANEL_WIDTH: f32 = 280.0;

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    config: Option<PathBuf>,
    exit_after_ms: Option<u64>,
    initial_file: Option<PathBuf>,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        for arg in args {
            if let Some(value) = arg.strip_prefix("--exit-after-ms=") {
                let millis: u64 = value
                    .parse()
                    .context("invalid value for --exit-after-ms (expected integer milliseconds)")?;
                options.exit_after_ms = Some(millis);
            } else if let Some(value) = arg.strip_prefix("--config=") {
                options.config = Some(PathBuf::from(value));
            } else if arg.starts_with("--") {
                bail!("unknown option {arg}");
            } else if options.initial_file.is_none() {
                options.initial_file = Some(PathBuf::from(arg));
            } else {
                bail!("only one volume file can be opened at a time");
            }
        }
        Ok(options)
    }
}

/// What the status line shows.
#[derive(Debug, Clone, PartialEq)]
enum Status {
    Idle,
    Loaded { name: String, extents: Extents, range: (u16, u16) },
    Failed(String),
}

impl Status {
    fn text(&self) -> String {
        match self {
            Status::Idle => "No volume loaded".to_owned(),
            Status::Loaded {
                name,
                extents,
                range,
            } => format!(
                "{name}: {} x {} x {} samples, values {}..={}",
                extents.x, extents.y, extents.z, range.0, range.1
            ),
            Status::Failed(message) => format!("Load failed: {message}"),
        }
    }
}

/// Window events the orbit camera reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CameraInput {
    /// Left button went down (`true`) or up.
    Button(bool),
    Cursor(PhysicalPosition<f64>),
    /// Scroll distance in lines; positive zooms in.
    Scroll(f32),
}

impl CameraInput {
    fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => Some(Self::Button(*state == ElementState::Pressed)),
            WindowEvent::CursorMoved { position, .. } => Some(Self::Cursor(*position)),
            WindowEvent::MouseWheel { delta, .. } => Some(Self::Scroll(match delta {
                MouseScrollDelta::LineDelta(_, y) => *y,
                MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_SCROLL_LINE,
            })),
            _ => None,
        }
    }
}

/// Mutable application state driven by the UI.
struct Viewer {
    session: Session,
    camera: OrbitCamera,
    status: Status,
    dragging: bool,
    last_cursor: Option<PhysicalPosition<f64>>,
    slice_axis: SliceAxis,
    slice_index: usize,
    slice_texture: Option<(TextureHandle, Vec2)>,
    slice_dirty: bool,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Self {
        let camera = OrbitCamera::with_fov_degrees(config.render.fov_y_degrees);
        Self {
            session: Session::new(config),
            camera,
            status: Status::Idle,
            dragging: false,
            last_cursor: None,
            slice_axis: SliceAxis::default(),
            slice_index: 0,
            slice_texture: None,
            slice_dirty: true,
        }
    }

    /// Runs the load sequence; the scene is swapped in only if every step succeeds.
    fn load<P>(&mut self, renderer: &mut VolumeRenderer, pick: P)
    where
        P: FnOnce() -> Option<PathBuf>,
    {
        let result = self.session.load_picked(pick, |volume| {
            renderer
                .set_volume(&volume.image, volume.labels.as_ref(), &volume.curve)
                .map_err(|err| LoadError::Gpu(format!("{err:#}")))
        });

        match result {
            Ok(()) => self.on_loaded(),
            Err(err) if err.is_cancellation() => {}
            Err(err) => self.status = Status::Failed(err.to_string()),
        }
    }

    /// Frames the camera, centers the slice view and updates the status line.
    fn on_loaded(&mut self) {
        if let Some(volume) = self.session.state().loaded() {
            self.slice_index = self.slice_axis.depth(&volume.image) / 2;
            self.slice_dirty = true;
            let (min, max) = volume.image.bounds();
            self.camera.frame_bounds(min, max);
            self.status = Status::Loaded {
                name: volume.path.file_name().map_or_else(
                    || volume.path.display().to_string(),
                    |name| name.to_string_lossy().into_owned(),
                ),
                extents: volume.image.extents(),
                range: volume.image.range(),
            };
        }
    }

    fn set_sliders(&mut self, renderer: &VolumeRenderer, sliders: SliderPositions) -> bool {
        match self.session.set_sliders(sliders) {
            Some(curve) => renderer.update_opacity(curve),
            None => false,
        }
    }

    /// Applies new display settings; the renderer gets a new color ramp only when
    /// the colormap changed.
    fn set_display(&mut self, renderer: &VolumeRenderer, display: DisplaySettings) {
        let previous = self.session.display();
        self.session.set_display(display);
        if previous.colormap != display.colormap {
            renderer.update_colormap(display.colormap);
        }
        self.slice_dirty |= previous != self.session.display();
    }

    fn set_slice(&mut self, axis: SliceAxis, index: usize) {
        let depth = self
            .session
            .state()
            .loaded()
            .map_or(1, |volume| axis.depth(&volume.image));
        let index = index.min(depth.saturating_sub(1));
        if axis != self.slice_axis || index != self.slice_index {
            self.slice_axis = axis;
            self.slice_index = index;
            self.slice_dirty = true;
        }
    }

    /// Pixels and on-screen size of the current slice, if a volume is loaded.
    fn slice_image(&self) -> Option<(ColorImage, Vec2)> {
        let volume = self.session.state().loaded()?;
        let display = self.session.display();
        let slice = Slice::extract(
            &volume.image,
            volume.labels.as_ref(),
            self.slice_axis,
            self.slice_index,
        )?;
        let overlay = volume.labels.as_ref().filter(|_| display.show_labels);
        let pixels = slice.to_rgba(display.colormap, overlay, display.label_opacity);
        let image = ColorImage::from_rgba_unmultiplied([slice.width, slice.height], &pixels);
        let size = slice_display_size(
            &slice,
            self.slice_axis.pixel_spacing(&volume.image),
            SLICE_PANEL_WIDTH,
        );
        Some((image, size))
    }

    /// Re-uploads the slice texture after the slice or the display settings changed.
    fn refresh_slice_texture(&mut self, ctx: &EguiContext) -> Option<(egui::TextureId, Vec2)> {
        if self.slice_dirty {
            self.slice_dirty = false;
            self.slice_texture = self.slice_image().map(|(image, size)| {
                (ctx.load_texture("slice", image, TextureOptions::NEAREST), size)
            });
        }
        self.slice_texture
            .as_ref()
            .map(|(texture, size)| (texture.id(), *size))
    }

    fn uniforms(&self, aspect: f32) -> RenderUniforms {
        let config = self.session.config();
        match self.session.state().loaded() {
            Some(volume) => RenderUniforms::for_volume(
                config,
                &volume.image,
                &volume.curve,
                self.camera.inverse_view_projection(aspect),
                self.camera.eye(),
                self.session.label_opacity(),
            ),
            None => RenderUniforms::empty(config),
        }
    }

    /// Returns true when the camera moved.
    fn apply_camera_input(&mut self, input: CameraInput) -> bool {
        if !self.session.state().is_loaded() {
            return false;
        }
        match input {
            CameraInput::Button(pressed) => {
                self.dragging = pressed;
                false
            }
            CameraInput::Cursor(position) => {
                let previous = self.last_cursor.replace(position);
                match previous {
                    Some(previous) if self.dragging => {
                        let dx = (position.x - previous.x) as f32;
                        let dy = (position.y - previous.y) as f32;
                        self.camera
                            .orbit(-dx * ORBIT_RADIANS_PER_PIXEL, dy * ORBIT_RADIANS_PER_PIXEL);
                        true
                    }
                    _ => false,
                }
            }
            CameraInput::Scroll(steps) => {
                self.camera.zoom(steps);
                true
            }
        }
    }

    /// Swatch color and display name for every label in the loaded mask.
    fn legend(&self) -> Vec<(Color32, String)> {
        let Some(labels) = self
            .session
            .state()
            .loaded()
            .and_then(|volume| volume.labels.as_ref())
        else {
            return Vec::new();
        };
        let names = &self.session.config().labels;
        labels
            .present()
            .iter()
            .filter_map(|&label| {
                let c = labels.palette().color(label)?;
                let [r, g, b] = c.to_array().map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8);
                Some((Color32::from_rgb(r, g, b), names.name(label)))
            })
            .collect()
    }
}

/// Fits a slice into `max_width` points, keeping the physical aspect ratio.
fn slice_display_size(slice: &Slice, pixel_spacing: (f32, f32), max_width: f32) -> Vec2 {
    let world_w = slice.width as f32 * pixel_spacing.0;
    let world_h = slice.height as f32 * pixel_spacing.1;
    if world_w <= 0.0 || world_h <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(max_width, max_width * world_h / world_w)
}

fn pick_volume_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open As")
        .add_filter("HDF5", &["h5"])
        .add_filter("All Files", &["*"])
        .pick_file()
}

fn main() -> Result<()> {
    init_tracing();

    let options = CliOptions::parse(env::args().skip(1))?;
    let config = match &options.config {
        Some(path) => ViewerConfig::from_json_file(path)?,
        None => ViewerConfig::default(),
    };

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    #[allow(deprecated)]
    let window = event_loop
        .create_window(
            Window::default_attributes()
                .with_title("Volview")
                .with_inner_size(winit::dpi::LogicalSize::new(1024.0, 768.0)),
        )
        .context("failed to create window")?;

    let window = Rc::new(window);

    let (mut gpu_context, shaders) = block_on(volview_gfx::init(window.as_ref()))?;

    let mut renderer = VolumeRenderer::new(
        &gpu_context.device,
        &gpu_context.queue,
        &shaders,
        gpu_context.surface_config.format,
        &RenderUniforms::empty(&config),
        config.transfer.lut_size,
        config.render.colormap,
    );

    let egui_ctx = EguiContext::default();
    let mut egui_state = EguiWinitState::new(
        egui_ctx.clone(),
        ViewportId::ROOT,
        window.as_ref(),
        Some(window.scale_factor() as f32),
        window.theme(),
        Some(gpu_context.device.limits().max_texture_dimension_2d as usize),
    );
    let mut egui_renderer = egui_wgpu::Renderer::new(
        renderer.device(),
        gpu_context.surface_config.format,
        None,
        1,
        false,
    );

    let mut viewer = Viewer::new(config);
    if let Some(path) = options.initial_file.clone() {
        info!(path = %path.display(), "loading volume from the command line");
        viewer.load(&mut renderer, || Some(path));
    }

    let deadline = options
        .exit_after_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));
    let window_handle = Rc::clone(&window);

    #[allow(deprecated)]
    event_loop
        .run(move |event, target| {
            let window = window_handle.as_ref();
            match event {
                Event::WindowEvent {
                    window_id,
                    ref event,
                } if window_id == window.id() => {
                    let egui_response = egui_state.on_window_event(window, event);
                    if egui_response.repaint {
                        window.request_redraw();
                    }
                    if egui_response.consumed {
                        return;
                    }

                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::Resized(new_size) => {
                            gpu_context.resize(new_size.width, new_size.height);
                            window.request_redraw();
                        }
                        WindowEvent::ScaleFactorChanged { .. } => {
                            let new_size = window.inner_size();
                            gpu_context.resize(new_size.width, new_size.height);
                            window.request_redraw();
                        }
                        WindowEvent::RedrawRequested => {
                            match render_frame(
                                window,
                                &egui_ctx,
                                &mut egui_state,
                                &mut egui_renderer,
                                &mut gpu_context,
                                &mut renderer,
                                &mut viewer,
                            ) {
                                Ok(true) => window.request_redraw(),
                                Ok(false) => {}
                                Err(err) => warn!("frame render error: {err:?}"),
                            }
                        }
                        other => {
                            let moved = CameraInput::from_window_event(other)
                                .is_some_and(|input| viewer.apply_camera_input(input));
                            if moved {
                                window.request_redraw();
                            }
                        }
                    }
                }
                Event::AboutToWait => {
                    if let Some(deadline) = deadline {
                        if Instant::now() >= deadline {
                            target.exit();
                            return;
                        }
                        target.set_control_flow(ControlFlow::WaitUntil(deadline));
                    }
                }
                _ => {}
            }
        })
        .map_err(Into::into)
}

/// Draws one frame. Returns true when another frame is wanted right away.
fn render_frame(
    window: &Window,
    egui_ctx: &EguiContext,
    egui_state: &mut EguiWinitState,
    egui_renderer: &mut egui_wgpu::Renderer,
    gpu_context: &mut GpuContext<'_>,
    renderer: &mut VolumeRenderer,
    viewer: &mut Viewer,
) -> Result<bool> {
    let raw_input = egui_state.take_egui_input(window);
    let transfer = viewer.session.config().transfer.clone();
    let loaded = viewer.session.state().is_loaded();
    let mut sliders = viewer.session.sliders();
    let mut load_requested = false;
    let mut sliders_changed = false;
    let middle = viewer.session.current_curve().middle();
    let status = viewer.status.text();
    let mut display = viewer.session.display();
    let legend = viewer.legend();
    let slice_texture = viewer.refresh_slice_texture(egui_ctx);
    let mut slice_axis = viewer.slice_axis;
    let mut slice_index = viewer.slice_index;
    let slice_depth = viewer
        .session
        .state()
        .loaded()
        .map_or(1, |volume| slice_axis.depth(&volume.image));

    let full_output = egui_ctx.run(raw_input, |ctx| {
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Load file").clicked() {
                    load_requested = true;
                }
                ui.label(&status);
            });

            let (opacity_min, opacity_max) = transfer.mid_opacity_range;
            sliders_changed |= ui
                .add_enabled(
                    loaded,
                    egui::Slider::new(&mut sliders.mid_opacity, opacity_min..=opacity_max)
                        .text("Mid opacity"),
                )
                .changed();
            let (at_min, at_max) = transfer.mid_at_range;
            sliders_changed |= ui
                .add_enabled(
                    loaded,
                    egui::Slider::new(&mut sliders.mid_at, at_min..=at_max).text("Mid at"),
                )
                .changed();
            ui.label(format!(
                "Opacity curve: (0, 0)  ({:.0}, {:.6})  ({}, 1)",
                middle.value, middle.opacity, transfer.upper_value
            ));

            ui.horizontal(|ui| {
                egui::ComboBox::from_label("Colormap")
                    .selected_text(display.colormap.name())
                    .show_ui(ui, |ui| {
                        for colormap in Colormap::ALL {
                            ui.selectable_value(&mut display.colormap, colormap, colormap.name());
                        }
                    });
                ui.add_enabled_ui(!legend.is_empty(), |ui| {
                    ui.checkbox(&mut display.show_labels, "Show labels");
                    ui.add(
                        egui::Slider::new(&mut display.label_opacity, 0.0..=1.0)
                            .text("Label opacity"),
                    );
                });
            });
            if !legend.is_empty() {
                ui.horizontal_wrapped(|ui| {
                    for (color, name) in &legend {
                        ui.colored_label(*color, "\u{25A0}");
                        ui.label(name);
                    }
                });
            }
        });

        egui::SidePanel::right("slices")
            .resizable(false)
            .exact_width(SLICE_PANEL_WIDTH + 16.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    for axis in SliceAxis::ALL {
                        ui.selectable_value(&mut slice_axis, axis, axis.label());
                    }
                });
                ui.add_enabled(
                    loaded,
                    egui::Slider::new(&mut slice_index, 0..=slice_depth.saturating_sub(1))
                        .text("Slice"),
                );
                match slice_texture {
                    Some((id, size)) => {
                        ui.add(egui::Image::from_texture(egui::load::SizedTexture::new(
                            id, size,
                        )));
                    }
                    None => {
                        ui.label("No slice to show");
                    }
                }
            });
    });

    egui_state.handle_platform_output(window, full_output.platform_output);

    if sliders_changed {
        viewer.set_sliders(renderer, sliders);
    }
    let display_changed = display != viewer.session.display();
    if display_changed {
        viewer.set_display(renderer, display);
    }
    if slice_axis != viewer.slice_axis {
        // a new axis starts in its middle
        let depth = viewer
            .session
            .state()
            .loaded()
            .map_or(1, |volume| slice_axis.depth(&volume.image));
        slice_index = depth / 2;
    }
    viewer.set_slice(slice_axis, slice_index);
    let mut wants_redraw = sliders_changed || display_changed || viewer.slice_dirty;
    if load_requested {
        viewer.load(renderer, pick_volume_file);
        wants_redraw = true;
    }

    renderer.update_uniforms(&viewer.uniforms(gpu_context.aspect_ratio()));

    for (id, image_delta) in &full_output.textures_delta.set {
        egui_renderer.update_texture(renderer.device(), renderer.queue(), *id, image_delta);
    }
    for id in &full_output.textures_delta.free {
        egui_renderer.free_texture(id);
    }

    let surface_texture = match gpu_context.surface.get_current_texture() {
        Ok(surface_texture) => surface_texture,
        Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
            gpu_context.reconfigure();
            return Ok(true);
        }
        Err(SurfaceError::Timeout) | Err(SurfaceError::Other) => return Ok(true),
        Err(SurfaceError::OutOfMemory) => bail!("wgpu surface out of memory"),
    };

    let surface_view = surface_texture
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = gpu_context
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Volview Encoder"),
        });

    renderer.encode_volume_pass(&mut encoder, &surface_view);

    let pixels_per_point = window.scale_factor() as f32;
    let paint_jobs = egui_ctx.tessellate(full_output.shapes, pixels_per_point);
    let screen_descriptor = ScreenDescriptor {
        size_in_pixels: [
            gpu_context.surface_config.width,
            gpu_context.surface_config.height,
        ],
        pixels_per_point,
    };

    let egui_cmd_buffers = egui_renderer.update_buffers(
        renderer.device(),
        renderer.queue(),
        &mut encoder,
        &paint_jobs,
        &screen_descriptor,
    );

    {
        let mut egui_pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();
        egui_renderer.render(&mut egui_pass, &paint_jobs, &screen_descriptor);
    }

    let mut submissions = egui_cmd_buffers;
    submissions.push(encoder.finish());

    renderer.queue().submit(submissions);
    window.pre_present_notify();
    surface_texture.present();

    let egui_wants_repaint = full_output
        .viewport_output
        .get(&ViewportId::ROOT)
        .is_some_and(|output| output.repaint_delay.is_zero());
    Ok(wants_redraw || egui_wants_repaint)
}

mod tracer {
    use tracing_subscriber::EnvFilter;

    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use volview_core::{LabelBuffer, VolumeBuffer};

    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags_and_positional_file() {
        let options =
            CliOptions::parse(args(&["--config=view.json", "scan.h5", "--exit-after-ms=250"]))
                .unwrap();
        assert_eq!(
            options,
            CliOptions {
                config: Some(PathBuf::from("view.json")),
                exit_after_ms: Some(250),
                initial_file: Some(PathBuf::from("scan.h5")),
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(CliOptions::parse(args(&["--exit-after-ms=soon"])).is_err());
        assert!(CliOptions::parse(args(&["--verbose"])).is_err());
        assert!(CliOptions::parse(args(&["a.h5", "b.h5"])).is_err());
        assert_eq!(CliOptions::parse(Vec::new()).unwrap(), CliOptions::default());
    }

    #[test]
    fn status_line_describes_the_volume() {
        let status = Status::Loaded {
            name: "scan.h5".into(),
            extents: Extents::new(4, 5, 6),
            range: (0, 2999),
        };
        assert_eq!(status.text(), "scan.h5: 4 x 5 x 6 samples, values 0..=2999");
        assert_eq!(
            Status::Failed("dataset 'volume' not found".into()).text(),
            "Load failed: dataset 'volume' not found"
        );
    }

    fn loaded_viewer(extents: Extents, labels: Option<Vec<u8>>) -> Viewer {
        let mut viewer = Viewer::new(ViewerConfig::default());
        let samples = (0..extents.sample_count()).map(|i| i as u16).collect();
        let buffer = VolumeBuffer::new(extents, samples).unwrap();
        let labels = labels.map(|l| LabelBuffer::new(extents, l).unwrap());
        viewer
            .session
            .load_buffer(Path::new("scan.h5"), buffer, labels, |_| Ok(()))
            .unwrap();
        viewer.on_loaded();
        viewer
    }

    #[test]
    fn camera_input_is_ignored_until_a_volume_loads() {
        let mut viewer = Viewer::new(ViewerConfig::default());
        let radius = viewer.camera.radius;
        assert!(!viewer.apply_camera_input(CameraInput::Scroll(1.0)));
        assert_eq!(viewer.camera.radius, radius);
        assert_eq!(viewer.status, Status::Idle);
        assert!(!viewer.uniforms(1.0).has_volume());
        assert!(viewer.slice_image().is_none());
    }

    #[test]
    fn dragging_orbits_and_scrolling_zooms() {
        let mut viewer = loaded_viewer(Extents::new(4, 4, 4), None);
        let radius = viewer.camera.radius;
        assert!(viewer.apply_camera_input(CameraInput::Scroll(1.0)));
        assert!(viewer.camera.radius < radius);

        let eye = viewer.camera.eye();
        // moving without a pressed button only records the cursor
        assert!(!viewer.apply_camera_input(CameraInput::Cursor(PhysicalPosition::new(10.0, 10.0))));
        assert!(!viewer.apply_camera_input(CameraInput::Button(true)));
        assert!(viewer.apply_camera_input(CameraInput::Cursor(PhysicalPosition::new(40.0, 10.0))));
        assert_ne!(viewer.camera.eye(), eye);
        assert!(!viewer.apply_camera_input(CameraInput::Button(false)));
        assert!(!viewer.apply_camera_input(CameraInput::Cursor(PhysicalPosition::new(90.0, 10.0))));
    }

    #[test]
    fn unrelated_window_events_are_not_camera_input() {
        assert_eq!(CameraInput::from_window_event(&WindowEvent::Focused(true)), None);
        assert_eq!(CameraInput::from_window_event(&WindowEvent::CloseRequested), None);
    }

    #[test]
    fn slice_view_starts_in_the_middle_and_clamps() {
        let mut viewer = loaded_viewer(Extents::new(3, 4, 6), None);
        assert_eq!(viewer.slice_axis, SliceAxis::Axial);
        assert_eq!(viewer.slice_index, 3);

        viewer.set_slice(SliceAxis::Sagittal, 99);
        assert_eq!(viewer.slice_index, 2);
        let (image, size) = viewer.slice_image().unwrap();
        assert_eq!(image.size, [4, 6]);
        // sagittal pixels are 1 x 1 world units, so the aspect is rows / columns
        assert!((size.y / size.x - 6.0 / 4.0).abs() < 1e-6);
    }

    #[test]
    fn axial_slices_keep_the_physical_aspect() {
        let viewer = loaded_viewer(Extents::new(2, 6, 1), None);
        let (image, size) = viewer.slice_image().unwrap();
        assert_eq!(image.size, [2, 6]);
        // default spacing is 3 along x
        assert!((size.x - SLICE_PANEL_WIDTH).abs() < 1e-6);
        assert!((size.y - SLICE_PANEL_WIDTH).abs() < 1e-6);
    }

    #[test]
    fn legend_lists_present_labels_by_name() {
        let extents = Extents::new(2, 2, 2);
        let viewer = loaded_viewer(extents, Some(vec![0, 0, 5, 0, 0, 1, 0, 9]));
        let names: Vec<String> = viewer.legend().into_iter().map(|(_, name)| name).collect();
        assert_eq!(names, ["CTV_Low", "GTV", "Label 9"]);
        assert!(viewer.uniforms(1.0).display[0] > 0.0);

        let unlabeled = loaded_viewer(extents, None);
        assert!(unlabeled.legend().is_empty());
        assert_eq!(unlabeled.uniforms(1.0).display[0], 0.0);
    }
}
