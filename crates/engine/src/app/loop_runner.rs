use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Fullscreen, WindowBuilder};

use crate::{resolve_app_paths, StartupError};

use super::input::{InputEvent, InputState};
use super::metrics::FrameIntervalStats;
use super::options::{Options, OptionsError};
use super::panel::{Panel, PanelError, PanelStack};
use super::rendering::Renderer;
use super::screenshot::{save_screenshot, ScreenshotError};
use super::MetricsHandle;

/// Lower bound on the effective frame rate for simulation purposes: delta
/// time handed to panels never exceeds `1 / MIN_FPS` seconds, however long
/// the real frame took.
pub const MIN_FPS: u32 = 15;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Relic".to_string(),
            metrics_log_interval: Duration::from_secs(1),
        }
    }
}

/// A runtime fault attributed to the loop phase it occurred in. Any phase
/// error ends the loop; there is no per-frame recovery.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("event dispatch failed: {0}")]
    Dispatch(#[source] PanelError),
    #[error("tick failed: {0}")]
    Tick(#[source] PanelError),
    #[error("render failed: {0}")]
    Render(#[source] PanelError),
    #[error("frame present failed: {0}")]
    Present(#[source] PixelsError),
    #[error(transparent)]
    Screenshot(#[from] ScreenshotError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Paces frames to the target FPS and produces the clamped delta time for
/// the following tick.
struct FrameClock {
    last_frame_start: Instant,
}

impl FrameClock {
    fn new() -> Self {
        Self {
            last_frame_start: Instant::now(),
        }
    }

    /// Sleeps off the remainder of the frame budget, then reports the
    /// clamped delta seconds and the raw elapsed time since the previous
    /// frame start.
    fn next_frame(&mut self, target_fps: u32) -> (f64, Duration) {
        let target_period = target_frame_period(target_fps);
        let elapsed = self.last_frame_start.elapsed();
        let sleep_for = pacing_sleep_duration(elapsed, target_period);
        if sleep_for > Duration::ZERO {
            thread::sleep(sleep_for);
        }

        let now = Instant::now();
        let raw_elapsed = now.saturating_duration_since(self.last_frame_start);
        self.last_frame_start = now;
        (clamped_delta_seconds(raw_elapsed, MIN_FPS), raw_elapsed)
    }
}

fn target_frame_period(target_fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / target_fps.max(1) as f64)
}

fn pacing_sleep_duration(elapsed: Duration, target_period: Duration) -> Duration {
    target_period.saturating_sub(elapsed)
}

fn max_frame_delta(min_fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / min_fps.max(1) as f64)
}

fn clamped_delta_seconds(elapsed: Duration, min_fps: u32) -> f64 {
    elapsed.min(max_frame_delta(min_fps)).as_secs_f64()
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

/// PrintScreen triggers a capture at the application level. The event is
/// still forwarded to the active panel afterwards.
fn is_screenshot_hotkey(event: &InputEvent) -> bool {
    matches!(
        event,
        InputEvent::KeyPressed {
            key: KeyCode::PrintScreen,
            repeat: false,
        }
    )
}

pub fn run_app(config: LoopConfig, initial_panel: Box<dyn Panel>) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, initial_panel, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    initial_panel: Box<dyn Panel>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        options_dir = %app_paths.options_dir.display(),
        screenshots_dir = %app_paths.screenshots_dir.display(),
        "startup"
    );
    let mut options = Options::load(&app_paths)?;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let graphics = *options.graphics();
    let mut window_builder = WindowBuilder::new()
        .with_title(config.window_title.clone())
        .with_inner_size(LogicalSize::new(
            graphics.screen_width as f64,
            graphics.screen_height as f64,
        ));
    if graphics.fullscreen {
        window_builder = window_builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }
    let window = Arc::new(window_builder.build(&event_loop).map_err(AppError::CreateWindow)?);

    let asset_root = app_paths.root.join("assets");
    let mut renderer = Renderer::new(
        Arc::clone(&window),
        asset_root,
        graphics.resolution_scale,
        graphics.modern_interface,
    )
    .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    info!(
        target_fps = graphics.target_fps,
        min_fps = MIN_FPS,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        modern_interface = graphics.modern_interface,
        "loop_config"
    );

    let window_size = window.inner_size();
    let mut input = InputState::new(window_size.width, window_size.height);
    let mut stack = PanelStack::new(initial_panel);
    {
        let viewport = renderer.viewport();
        stack.resize_all(viewport.width, viewport.height);
    }
    let mut clock = FrameClock::new();
    let mut frame_stats = FrameIntervalStats::new(metrics_log_interval);

    // Fatal phase errors escape the event loop closure through this slot.
    let fatal: Rc<RefCell<Option<PhaseError>>> = Rc::new(RefCell::new(None));
    let fatal_for_loop = Rc::clone(&fatal);
    let window_for_loop = Arc::clone(&window);

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        input.set_window_size(new_size.width, new_size.height);
                        let graphics = *options.graphics();
                        if let Err(error) = renderer.resize(
                            new_size.width,
                            new_size.height,
                            graphics.resolution_scale,
                            graphics.modern_interface,
                        ) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                            return;
                        }
                        let viewport = renderer.viewport();
                        stack.resize_all(viewport.width, viewport.height);
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window_for_loop.inner_size();
                        input.set_window_size(size.width, size.height);
                        let graphics = *options.graphics();
                        if let Err(error) = renderer.resize(
                            size.width,
                            size.height,
                            graphics.resolution_scale,
                            graphics.modern_interface,
                        ) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                            return;
                        }
                        let viewport = renderer.viewport();
                        stack.resize_all(viewport.width, viewport.height);
                    }
                    WindowEvent::RedrawRequested => {
                        let (dt, raw_elapsed) = clock.next_frame(options.graphics().target_fps);

                        if let Err(error) = stack.tick(dt, &mut options, &input) {
                            *fatal_for_loop.borrow_mut() = Some(PhaseError::Tick(error));
                            window_target.exit();
                            return;
                        }
                        stack.apply_pending_transitions();
                        if stack.exit_requested() {
                            info!(reason = "panel_request", "shutdown_requested");
                            window_target.exit();
                            return;
                        }

                        {
                            let mut frame = renderer.begin_frame();
                            if let Err(error) = stack.render(&mut frame) {
                                *fatal_for_loop.borrow_mut() = Some(PhaseError::Render(error));
                                window_target.exit();
                                return;
                            }
                        }
                        if let Some(cursor) = stack.active_panel().current_cursor() {
                            if let Some(position) = input.cursor_position() {
                                renderer.draw_cursor(
                                    cursor.sprite_key,
                                    cursor.alignment,
                                    position,
                                    options.graphics().cursor_scale,
                                );
                            }
                        }
                        if let Err(error) = renderer.present() {
                            *fatal_for_loop.borrow_mut() = Some(PhaseError::Present(error));
                            window_target.exit();
                            return;
                        }

                        frame_stats.record_frame(raw_elapsed);
                        let snapshot = frame_stats.maybe_snapshot(
                            Instant::now(),
                            stack.overlay_count(),
                            stack.active_panel().debug_name(),
                        );
                        if let Some(snapshot) = snapshot {
                            metrics_handle.publish(snapshot);
                            info!(
                                fps = snapshot.fps,
                                frame_time_ms = snapshot.frame_time_ms,
                                frame_time_max_ms = snapshot.frame_time_max_ms,
                                overlay_count = snapshot.overlay_count,
                                active_panel = snapshot.active_panel,
                                "loop_metrics"
                            );
                        }
                    }
                    other => {
                        let Some(input_event) = input.translate_window_event(&other) else {
                            return;
                        };
                        if is_screenshot_hotkey(&input_event) {
                            let surface = renderer.capture_frame();
                            if let Err(error) =
                                save_screenshot(&app_paths.screenshots_dir, &surface)
                            {
                                *fatal_for_loop.borrow_mut() =
                                    Some(PhaseError::Screenshot(error));
                                window_target.exit();
                                return;
                            }
                        }
                        if let Err(error) =
                            stack.dispatch_event(&input_event, &mut options, &input)
                        {
                            *fatal_for_loop.borrow_mut() = Some(PhaseError::Dispatch(error));
                            window_target.exit();
                            return;
                        }
                        stack.apply_pending_transitions();
                        if stack.exit_requested() {
                            info!(reason = "panel_request", "shutdown_requested");
                            window_target.exit();
                        }
                    }
                }
            }
            Event::AboutToWait => {
                window_for_loop.request_redraw();
            }
            Event::LoopExiting => {
                if let Err(error) = options.save_changes(&app_paths) {
                    warn!(error = %error, "options_save_failed");
                }
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)?;

    let phase_error = fatal.borrow_mut().take();
    match phase_error {
        Some(error) => Err(AppError::Phase(error)),
        None => Ok(()),
    }
}
