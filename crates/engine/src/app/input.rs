use std::collections::HashSet;

use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::PhysicalKey;

// Re-exported so game crates can name keys and buttons without depending
// on winit themselves.
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

use super::rendering::Vec2;

/// Window input translated into the engine's own vocabulary so panels never
/// see winit types directly (and tests can construct events freely).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPressed { key: KeyCode, repeat: bool },
    KeyReleased { key: KeyCode },
    MouseButtonPressed { button: MouseButton, position: Vec2 },
    MouseButtonReleased { button: MouseButton, position: Vec2 },
    MouseMoved { position: Vec2 },
    MouseWheel { delta_y: f32 },
}

/// Continuous input state panels can poll during ticks, as opposed to the
/// edge-style [`InputEvent`] stream.
#[derive(Debug, Default)]
pub struct InputState {
    cursor_position: Option<Vec2>,
    window_width: u32,
    window_height: u32,
    keys_down: HashSet<KeyCode>,
}

impl InputState {
    pub fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor_position
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub(crate) fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    /// Updates key state and reports the resulting event. A press while the
    /// key is already down is a repeat; a release of an untracked key is
    /// still reported so panels can rely on release symmetry.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) -> InputEvent {
        if pressed {
            let repeat = !self.keys_down.insert(key);
            InputEvent::KeyPressed { key, repeat }
        } else {
            self.keys_down.remove(&key);
            InputEvent::KeyReleased { key }
        }
    }

    pub(crate) fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) -> InputEvent {
        let position = self.cursor_position.unwrap_or(Vec2 { x: 0.0, y: 0.0 });
        if pressed {
            InputEvent::MouseButtonPressed { button, position }
        } else {
            InputEvent::MouseButtonReleased { button, position }
        }
    }

    pub(crate) fn handle_cursor_moved(&mut self, x: f32, y: f32) -> InputEvent {
        let position = Vec2 { x, y };
        self.cursor_position = Some(position);
        InputEvent::MouseMoved { position }
    }

    pub(crate) fn handle_cursor_left(&mut self) {
        self.cursor_position = None;
    }

    /// Translates one winit window event, updating tracked state. Returns
    /// `None` for events the panel layer has no use for.
    pub(crate) fn translate_window_event(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(key) => {
                    Some(self.handle_key(key, event.state == ElementState::Pressed))
                }
                PhysicalKey::Unidentified(_) => None,
            },
            WindowEvent::CursorMoved { position, .. } => {
                Some(self.handle_cursor_moved(position.x as f32, position.y as f32))
            }
            WindowEvent::CursorLeft { .. } => {
                self.handle_cursor_left();
                None
            }
            WindowEvent::MouseInput { state, button, .. } => {
                Some(self.handle_mouse_button(*button, *state == ElementState::Pressed))
            }
            WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::MouseWheel {
                delta_y: wheel_delta_y(*delta),
            }),
            _ => None,
        }
    }
}

fn wheel_delta_y(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => {
            if position.y > 0.0 {
                1.0
            } else if position.y < 0.0 {
                -1.0
            } else {
                0.0
            }
        }
    }
}
