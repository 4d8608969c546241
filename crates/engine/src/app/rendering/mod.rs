mod renderer;
mod text;

pub use renderer::Renderer;
pub use text::{text_width_px, GLYPH_ADVANCE, LINE_ADVANCE};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Where a cursor sprite sits relative to the pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAlignment {
    TopLeft,
    Top,
    TopRight,
    Left,
    Middle,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

pub(crate) fn cursor_top_left_px(
    alignment: CursorAlignment,
    pointer_x: i32,
    pointer_y: i32,
    sprite_width: i32,
    sprite_height: i32,
) -> (i32, i32) {
    let x = match alignment {
        CursorAlignment::TopLeft | CursorAlignment::Left | CursorAlignment::BottomLeft => pointer_x,
        CursorAlignment::Top | CursorAlignment::Middle | CursorAlignment::Bottom => {
            pointer_x - sprite_width / 2
        }
        CursorAlignment::TopRight | CursorAlignment::Right | CursorAlignment::BottomRight => {
            pointer_x - sprite_width
        }
    };
    let y = match alignment {
        CursorAlignment::TopLeft | CursorAlignment::Top | CursorAlignment::TopRight => pointer_y,
        CursorAlignment::Left | CursorAlignment::Middle | CursorAlignment::Right => {
            pointer_y - sprite_height / 2
        }
        CursorAlignment::BottomLeft | CursorAlignment::Bottom | CursorAlignment::BottomRight => {
            pointer_y - sprite_height
        }
    };
    (x, y)
}

/// Owned RGBA copy of a rendered frame, used for screenshot capture.
#[derive(Debug, Clone)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Borrowed CPU draw target for one frame. All draw calls clip to the
/// buffer bounds.
pub struct Frame<'a> {
    buffer: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Frame<'a> {
    pub fn new(buffer: &'a mut [u8], width: u32, height: u32) -> Self {
        debug_assert_eq!(buffer.len(), width as usize * height as usize * 4);
        Self {
            buffer,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.buffer.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, rect_width: i32, rect_height: i32, color: [u8; 4]) {
        let Some((start_x, start_y, end_x, end_y)) =
            clip_rect(x, y, rect_width, rect_height, self.width, self.height)
        else {
            return;
        };

        let width = self.width as usize;
        for py in start_y..end_y {
            for px in start_x..end_x {
                write_pixel_rgba(self.buffer, width, px, py, color);
            }
        }
    }

    pub fn draw_rect_outline(
        &mut self,
        x: i32,
        y: i32,
        rect_width: i32,
        rect_height: i32,
        color: [u8; 4],
    ) {
        if rect_width <= 1 || rect_height <= 1 {
            return;
        }
        self.fill_rect(x, y, rect_width, 1, color);
        self.fill_rect(x, y + rect_height - 1, rect_width, 1, color);
        self.fill_rect(x, y, 1, rect_height, color);
        self.fill_rect(x + rect_width - 1, y, 1, rect_height, color);
    }

    /// Alpha-blends `color` over the covered pixels; `alpha` 255 is opaque.
    pub fn fill_rect_blended(
        &mut self,
        x: i32,
        y: i32,
        rect_width: i32,
        rect_height: i32,
        color: [u8; 3],
        alpha: u8,
    ) {
        let Some((start_x, start_y, end_x, end_y)) =
            clip_rect(x, y, rect_width, rect_height, self.width, self.height)
        else {
            return;
        };

        let width = self.width as usize;
        let alpha = alpha as u16;
        let inverse = 255 - alpha;
        for py in start_y..end_y {
            for px in start_x..end_x {
                let Some(offset) = pixel_byte_offset(width, px, py, self.buffer.len()) else {
                    continue;
                };
                for channel in 0..3 {
                    let src = color[channel] as u16;
                    let dst = self.buffer[offset + channel] as u16;
                    self.buffer[offset + channel] = ((src * alpha + dst * inverse) / 255) as u8;
                }
                self.buffer[offset + 3] = 255;
            }
        }
    }

    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, color: [u8; 4]) {
        text::draw_text_clipped(self.buffer, self.width, self.height, x, y, text, color);
    }
}

fn clip_rect(
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    width: u32,
    height: u32,
) -> Option<(usize, usize, usize, usize)> {
    let start_x = x.max(0);
    let start_y = y.max(0);
    let end_x = x.saturating_add(rect_width).min(width as i32);
    let end_y = y.saturating_add(rect_height).min(height as i32);
    if end_x <= start_x || end_y <= start_y {
        return None;
    }
    Some((
        start_x as usize,
        start_y as usize,
        end_x as usize,
        end_y as usize,
    ))
}

fn pixel_byte_offset(width: usize, x: usize, y: usize, buffer_len: usize) -> Option<usize> {
    let pixel_offset = y.checked_mul(width)?.checked_add(x)?;
    let byte_offset = pixel_offset.checked_mul(4)?;
    if byte_offset.checked_add(4)? > buffer_len {
        return None;
    }
    Some(byte_offset)
}

pub(crate) fn write_pixel_rgba(frame: &mut [u8], width: usize, x: usize, y: usize, color: [u8; 4]) {
    let Some(offset) = pixel_byte_offset(width, x, y, frame.len()) else {
        return;
    };
    frame[offset..offset + 4].copy_from_slice(&color);
}
