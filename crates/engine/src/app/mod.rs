mod input;
mod loop_runner;
mod metrics;
mod options;
mod panel;
mod rendering;
mod screenshot;

pub use input::{InputEvent, InputState, KeyCode, MouseButton};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, PhaseError, MIN_FPS};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use options::{GraphicsOptions, MiscOptions, Options, OptionsError};
pub use panel::{Panel, PanelContext, PanelCursor, PanelError, PanelStack, TransitionRequests};
pub use rendering::{
    text_width_px, CursorAlignment, Frame, Renderer, Surface, Vec2, Viewport, GLYPH_ADVANCE,
    LINE_ADVANCE,
};
pub use screenshot::ScreenshotError;
