use engine::{
    text_width_px, CursorAlignment, Frame, InputEvent, KeyCode, Panel, PanelContext, PanelCursor,
    PanelError, LINE_ADVANCE,
};

use super::{MainMenuPanel, CURSOR_ARROW_SPRITE_KEY};

const DIM_COLOR: [u8; 3] = [0, 0, 0];
const DIM_ALPHA: u8 = 150;
const TITLE: &str = "PAUSED";
const TITLE_COLOR: [u8; 4] = [235, 220, 160, 255];
const ENTRY_COLOR: [u8; 4] = [170, 170, 180, 255];
const SELECTED_COLOR: [u8; 4] = [255, 255, 255, 255];
const ENTRY_SPACING: i32 = LINE_ADVANCE + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PauseEntry {
    Resume,
    MainMenu,
    Quit,
}

const ENTRIES: [PauseEntry; 3] = [PauseEntry::Resume, PauseEntry::MainMenu, PauseEntry::Quit];

impl PauseEntry {
    fn label(self) -> &'static str {
        match self {
            PauseEntry::Resume => "RESUME",
            PauseEntry::MainMenu => "MAIN MENU",
            PauseEntry::Quit => "QUIT",
        }
    }
}

/// Overlay raised above the world. The covered panel is paused for as long
/// as this sits on the stack; the world stays visible, dimmed, underneath.
pub struct PauseMenuPanel {
    selected: usize,
}

impl PauseMenuPanel {
    pub fn new() -> Self {
        Self { selected: 0 }
    }

    fn move_selection(&mut self, delta: i32) {
        let count = ENTRIES.len() as i32;
        self.selected = (self.selected as i32 + delta).rem_euclid(count) as usize;
    }

    fn activate_selected(&self, ctx: &mut PanelContext<'_>) {
        match ENTRIES[self.selected] {
            PauseEntry::Resume => ctx.transitions.request_pop_overlay(),
            PauseEntry::MainMenu => {
                ctx.transitions.request_pop_overlay();
                ctx.transitions.set_primary_panel(Box::new(MainMenuPanel::new()));
            }
            PauseEntry::Quit => ctx.transitions.request_exit(),
        }
    }
}

impl Default for PauseMenuPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for PauseMenuPanel {
    fn handle_event(
        &mut self,
        event: &InputEvent,
        ctx: &mut PanelContext<'_>,
    ) -> Result<(), PanelError> {
        if let InputEvent::KeyPressed { key, repeat } = event {
            match key {
                KeyCode::Escape if !repeat => ctx.transitions.request_pop_overlay(),
                KeyCode::ArrowUp | KeyCode::KeyW => self.move_selection(-1),
                KeyCode::ArrowDown | KeyCode::KeyS => self.move_selection(1),
                KeyCode::Enter | KeyCode::Space => self.activate_selected(ctx),
                _ => {}
            }
        }
        Ok(())
    }

    fn tick(&mut self, _dt: f64, _ctx: &mut PanelContext<'_>) -> Result<(), PanelError> {
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame<'_>) -> Result<(), PanelError> {
        let width = frame.width() as i32;
        let height = frame.height() as i32;
        frame.fill_rect_blended(0, 0, width, height, DIM_COLOR, DIM_ALPHA);

        let title_x = (width - text_width_px(TITLE)) / 2;
        let title_y = height / 3;
        frame.draw_text(title_x, title_y, TITLE, TITLE_COLOR);

        let first_entry_y = title_y + ENTRY_SPACING * 2;
        for (index, entry) in ENTRIES.iter().enumerate() {
            let label = entry.label();
            let x = (width - text_width_px(label)) / 2;
            let y = first_entry_y + index as i32 * ENTRY_SPACING;
            let color = if index == self.selected {
                frame.draw_text(x - text_width_px("> "), y, "> ", SELECTED_COLOR);
                SELECTED_COLOR
            } else {
                ENTRY_COLOR
            };
            frame.draw_text(x, y, label, color);
        }
        Ok(())
    }

    fn current_cursor(&self) -> Option<PanelCursor> {
        Some(PanelCursor {
            sprite_key: CURSOR_ARROW_SPRITE_KEY,
            alignment: CursorAlignment::TopLeft,
        })
    }

    fn debug_name(&self) -> &'static str {
        "pause_menu"
    }
}
