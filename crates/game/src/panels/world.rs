use engine::{
    CursorAlignment, Frame, InputEvent, InputState, KeyCode, Panel, PanelContext, PanelCursor,
    PanelError, LINE_ADVANCE,
};

use super::{PauseMenuPanel, CURSOR_ARROW_SPRITE_KEY};

const AVATAR_SPEED_PX_PER_SECOND: f64 = 160.0;
const AVATAR_SIZE_PX: i32 = 12;
const AVATAR_COLOR: [u8; 4] = [120, 200, 120, 255];
const GROUND_COLOR: [u8; 4] = [30, 34, 28, 255];
const GRID_COLOR: [u8; 4] = [38, 43, 36, 255];
const GRID_STEP_PX: i32 = 48;
const HUD_COLOR: [u8; 4] = [210, 210, 220, 255];
const HUD_HINT_COLOR: [u8; 4] = [120, 120, 130, 255];
const BOB_CYCLES_PER_SECOND: f64 = 2.0;
const BOB_AMPLITUDE_PX: f64 = 1.5;

/// The explorable world: an avatar moved with WASD or the arrow keys.
/// Escape raises the pause overlay; while it is up this panel receives no
/// ticks, and the pause notification freezes the idle bob as well.
pub struct WorldPanel {
    avatar_x: f64,
    avatar_y: f64,
    width: u32,
    height: u32,
    animation_seconds: f64,
    paused: bool,
}

impl WorldPanel {
    pub fn new() -> Self {
        Self {
            avatar_x: 120.0,
            avatar_y: 100.0,
            width: 0,
            height: 0,
            animation_seconds: 0.0,
            paused: false,
        }
    }

    fn bob_offset_px(&self) -> i32 {
        let phase = self.animation_seconds * BOB_CYCLES_PER_SECOND * std::f64::consts::TAU;
        (phase.sin() * BOB_AMPLITUDE_PX).round() as i32
    }
}

impl Default for WorldPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn movement_delta(input: &InputState, dt: f64, speed: f64) -> (f64, f64) {
    let mut x = 0.0f64;
    let mut y = 0.0f64;

    if input.is_key_down(KeyCode::KeyD) || input.is_key_down(KeyCode::ArrowRight) {
        x += 1.0;
    }
    if input.is_key_down(KeyCode::KeyA) || input.is_key_down(KeyCode::ArrowLeft) {
        x -= 1.0;
    }
    if input.is_key_down(KeyCode::KeyS) || input.is_key_down(KeyCode::ArrowDown) {
        y += 1.0;
    }
    if input.is_key_down(KeyCode::KeyW) || input.is_key_down(KeyCode::ArrowUp) {
        y -= 1.0;
    }

    let len_sq = x * x + y * y;
    if len_sq > 0.0 {
        let inv_len = len_sq.sqrt().recip();
        x *= inv_len;
        y *= inv_len;
    }

    (x * speed * dt, y * speed * dt)
}

fn clamp_to_bounds(value: f64, max: u32, margin: i32) -> f64 {
    if max == 0 {
        return value.max(0.0);
    }
    let upper = (max as f64 - margin as f64).max(0.0);
    value.clamp(0.0, upper)
}

impl Panel for WorldPanel {
    fn handle_event(
        &mut self,
        event: &InputEvent,
        ctx: &mut PanelContext<'_>,
    ) -> Result<(), PanelError> {
        if let InputEvent::KeyPressed {
            key: KeyCode::Escape,
            repeat: false,
        } = event
        {
            ctx.transitions.push_overlay(Box::new(PauseMenuPanel::new()));
        }
        Ok(())
    }

    fn tick(&mut self, dt: f64, ctx: &mut PanelContext<'_>) -> Result<(), PanelError> {
        let (dx, dy) = movement_delta(ctx.input, dt, AVATAR_SPEED_PX_PER_SECOND);
        self.avatar_x = clamp_to_bounds(self.avatar_x + dx, self.width, AVATAR_SIZE_PX);
        self.avatar_y = clamp_to_bounds(self.avatar_y + dy, self.height, AVATAR_SIZE_PX);
        if !self.paused {
            self.animation_seconds += dt;
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame<'_>) -> Result<(), PanelError> {
        let width = frame.width() as i32;
        let height = frame.height() as i32;
        frame.fill_rect(0, 0, width, height, GROUND_COLOR);

        let mut x = 0;
        while x < width {
            frame.fill_rect(x, 0, 1, height, GRID_COLOR);
            x += GRID_STEP_PX;
        }
        let mut y = 0;
        while y < height {
            frame.fill_rect(0, y, width, 1, GRID_COLOR);
            y += GRID_STEP_PX;
        }

        frame.fill_rect(
            self.avatar_x as i32,
            self.avatar_y as i32 + self.bob_offset_px(),
            AVATAR_SIZE_PX,
            AVATAR_SIZE_PX,
            AVATAR_COLOR,
        );
        Ok(())
    }

    fn render_secondary(&mut self, frame: &mut Frame<'_>) -> Result<(), PanelError> {
        let position = format!("POS {:.0},{:.0}", self.avatar_x, self.avatar_y);
        frame.draw_text(4, 4, &position, HUD_COLOR);
        frame.draw_text(4, 4 + LINE_ADVANCE, "ESC: PAUSE", HUD_HINT_COLOR);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.avatar_x = clamp_to_bounds(self.avatar_x, width, AVATAR_SIZE_PX);
        self.avatar_y = clamp_to_bounds(self.avatar_y, height, AVATAR_SIZE_PX);
    }

    fn on_pause_changed(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn current_cursor(&self) -> Option<PanelCursor> {
        Some(PanelCursor {
            sprite_key: CURSOR_ARROW_SPRITE_KEY,
            alignment: CursorAlignment::TopLeft,
        })
    }

    fn debug_name(&self) -> &'static str {
        "world"
    }
}
