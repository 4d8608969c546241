use engine::{
    text_width_px, CursorAlignment, Frame, InputEvent, KeyCode, Panel, PanelContext, PanelCursor,
    PanelError, LINE_ADVANCE,
};

use super::{IntroCinematicPanel, WorldPanel, CURSOR_ARROW_SPRITE_KEY};

const TITLE: &str = "RELIC";
const TITLE_COLOR: [u8; 4] = [235, 220, 160, 255];
const ENTRY_COLOR: [u8; 4] = [170, 170, 180, 255];
const SELECTED_COLOR: [u8; 4] = [255, 255, 255, 255];
const ENTRY_SPACING: i32 = LINE_ADVANCE + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuEntry {
    NewGame,
    Quit,
}

const ENTRIES: [MenuEntry; 2] = [MenuEntry::NewGame, MenuEntry::Quit];

impl MenuEntry {
    fn label(self) -> &'static str {
        match self {
            MenuEntry::NewGame => "NEW GAME",
            MenuEntry::Quit => "QUIT",
        }
    }
}

pub struct MainMenuPanel {
    selected: usize,
}

impl MainMenuPanel {
    pub fn new() -> Self {
        Self { selected: 0 }
    }

    fn move_selection(&mut self, delta: i32) {
        let count = ENTRIES.len() as i32;
        self.selected = (self.selected as i32 + delta).rem_euclid(count) as usize;
    }

    fn activate_selected(&self, ctx: &mut PanelContext<'_>) {
        match ENTRIES[self.selected] {
            MenuEntry::NewGame => {
                if ctx.options.misc().show_intro {
                    ctx.transitions
                        .set_primary_panel(Box::new(IntroCinematicPanel::new()));
                } else {
                    ctx.transitions.set_primary_panel(Box::new(WorldPanel::new()));
                }
            }
            MenuEntry::Quit => ctx.transitions.request_exit(),
        }
    }
}

impl Default for MainMenuPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for MainMenuPanel {
    fn handle_event(
        &mut self,
        event: &InputEvent,
        ctx: &mut PanelContext<'_>,
    ) -> Result<(), PanelError> {
        if let InputEvent::KeyPressed { key, .. } = event {
            match key {
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

        let title_x = (width - text_width_px(TITLE)) / 2;
        let title_y = height / 4;
        frame.draw_text(title_x, title_y, TITLE, TITLE_COLOR);

        let first_entry_y = height / 2;
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
        "main_menu"
    }
}
