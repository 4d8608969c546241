use engine::{text_width_px, Frame, InputEvent, Panel, PanelContext, PanelError, LINE_ADVANCE};

use super::WorldPanel;

const SLIDE_TEXT_COLOR: [u8; 4] = [200, 200, 210, 255];
const SKIP_HINT_COLOR: [u8; 4] = [110, 110, 120, 255];
const SKIP_HINT: &str = "PRESS ANY KEY TO SKIP";

struct Slide {
    lines: &'static [&'static str],
    duration_seconds: f64,
}

const SLIDES: [Slide; 3] = [
    Slide {
        lines: &["LONG AGO, THE OLD KINGDOM FELL."],
        duration_seconds: 4.0,
    },
    Slide {
        lines: &["ITS RELICS LIE SCATTERED,", "WAITING IN THE DARK."],
        duration_seconds: 4.0,
    },
    Slide {
        lines: &["ONE SEEKER SETS OUT."],
        duration_seconds: 3.0,
    },
];

/// Timed intro slides. Advances on a timer; any key or click skips the
/// whole sequence. Cinematics define no cursor.
pub struct IntroCinematicPanel {
    slide_index: usize,
    slide_elapsed: f64,
}

impl IntroCinematicPanel {
    pub fn new() -> Self {
        Self {
            slide_index: 0,
            slide_elapsed: 0.0,
        }
    }

    /// Advances the timer, returning `true` once the last slide has run out.
    fn advance(&mut self, dt: f64) -> bool {
        self.slide_elapsed += dt;
        while self.slide_index < SLIDES.len()
            && self.slide_elapsed >= SLIDES[self.slide_index].duration_seconds
        {
            self.slide_elapsed -= SLIDES[self.slide_index].duration_seconds;
            self.slide_index += 1;
        }
        self.slide_index >= SLIDES.len()
    }
}

impl Default for IntroCinematicPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for IntroCinematicPanel {
    fn handle_event(
        &mut self,
        event: &InputEvent,
        ctx: &mut PanelContext<'_>,
    ) -> Result<(), PanelError> {
        let skip = matches!(
            event,
            InputEvent::KeyPressed { repeat: false, .. } | InputEvent::MouseButtonPressed { .. }
        );
        if skip {
            ctx.transitions.set_primary_panel(Box::new(WorldPanel::new()));
        }
        Ok(())
    }

    fn tick(&mut self, dt: f64, ctx: &mut PanelContext<'_>) -> Result<(), PanelError> {
        if self.advance(dt) {
            ctx.transitions.set_primary_panel(Box::new(WorldPanel::new()));
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame<'_>) -> Result<(), PanelError> {
        frame.clear([0, 0, 0, 255]);
        let Some(slide) = SLIDES.get(self.slide_index) else {
            return Ok(());
        };

        let width = frame.width() as i32;
        let height = frame.height() as i32;
        let block_height = slide.lines.len() as i32 * LINE_ADVANCE;
        let mut y = (height - block_height) / 2;
        for line in slide.lines {
            let x = (width - text_width_px(line)) / 2;
            frame.draw_text(x, y, line, SLIDE_TEXT_COLOR);
            y += LINE_ADVANCE;
        }

        let hint_x = (width - text_width_px(SKIP_HINT)) / 2;
        frame.draw_text(hint_x, height - LINE_ADVANCE * 2, SKIP_HINT, SKIP_HINT_COLOR);
        Ok(())
    }

    fn debug_name(&self) -> &'static str {
        "intro_cinematic"
    }
}
