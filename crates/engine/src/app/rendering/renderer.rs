use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use super::{cursor_top_left_px, write_pixel_rgba, CursorAlignment, Frame, Surface, Vec2, Viewport};

const CLEAR_COLOR: [u8; 4] = [12, 12, 16, 255];
const PLACEHOLDER_CURSOR_SIZE_PX: i32 = 8;
const PLACEHOLDER_CURSOR_COLOR: [u8; 4] = [220, 220, 240, 255];
const CLASSIC_ASPECT_WIDTH: u32 = 4;
const CLASSIC_ASPECT_HEIGHT: u32 = 3;

struct LoadedSprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// CPU framebuffer renderer. Panels draw into an internal RGBA buffer whose
/// size follows the resolution scale; `pixels` scales it to the window on
/// present, letterboxing when the aspect ratios differ.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    asset_root: PathBuf,
    sprite_cache: HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        asset_root: PathBuf,
        resolution_scale: f64,
        use_full_window: bool,
    ) -> Result<Self, Error> {
        let size = window.inner_size();
        let (render_width, render_height) =
            render_dimensions(size.width, size.height, resolution_scale, use_full_window);
        let pixels = build_pixels(
            Arc::clone(&window),
            size.width.max(1),
            size.height.max(1),
            render_width,
            render_height,
        )?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: render_width,
                height: render_height,
            },
            asset_root,
            sprite_cache: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(
        &mut self,
        window_width: u32,
        window_height: u32,
        resolution_scale: f64,
        use_full_window: bool,
    ) -> Result<(), Error> {
        if window_width == 0 || window_height == 0 {
            return Ok(());
        }
        let (render_width, render_height) =
            render_dimensions(window_width, window_height, resolution_scale, use_full_window);
        self.pixels = build_pixels(
            Arc::clone(&self.window),
            window_width,
            window_height,
            render_width,
            render_height,
        )?;
        self.viewport = Viewport {
            width: render_width,
            height: render_height,
        };
        Ok(())
    }

    /// Clears the framebuffer and hands it out as a draw target.
    pub fn begin_frame(&mut self) -> Frame<'_> {
        let viewport = self.viewport;
        let mut frame = Frame::new(self.pixels.frame_mut(), viewport.width, viewport.height);
        frame.clear(CLEAR_COLOR);
        frame
    }

    /// Draws the cursor sprite at a window-space pointer position, mapped
    /// into framebuffer space. A missing sprite draws a placeholder square
    /// and warns once per key.
    pub fn draw_cursor(
        &mut self,
        sprite_key: &str,
        alignment: CursorAlignment,
        window_position: Vec2,
        scale: f64,
    ) {
        let (pointer_x, pointer_y) = self
            .pixels
            .window_pos_to_pixel((window_position.x, window_position.y))
            .unwrap_or_else(|pos| self.pixels.clamp_pixel_pos(pos));
        let pointer_x = pointer_x as i32;
        let pointer_y = pointer_y as i32;

        let viewport = self.viewport;
        let asset_root = self.asset_root.as_path();
        let sprite_cache = &mut self.sprite_cache;
        let warned_missing_sprite_keys = &mut self.warned_missing_sprite_keys;
        let frame = self.pixels.frame_mut();

        match resolve_cached_sprite(
            sprite_cache,
            warned_missing_sprite_keys,
            asset_root,
            sprite_key,
        ) {
            Some(sprite) => {
                let (dest_width, dest_height) =
                    scaled_sprite_dimensions(sprite.width, sprite.height, scale);
                let (left, top) =
                    cursor_top_left_px(alignment, pointer_x, pointer_y, dest_width, dest_height);
                draw_sprite_scaled(
                    frame,
                    viewport.width,
                    viewport.height,
                    left,
                    top,
                    sprite,
                    scale,
                );
            }
            None => {
                let (left, top) = cursor_top_left_px(
                    alignment,
                    pointer_x,
                    pointer_y,
                    PLACEHOLDER_CURSOR_SIZE_PX,
                    PLACEHOLDER_CURSOR_SIZE_PX,
                );
                draw_placeholder_square(
                    frame,
                    viewport.width,
                    viewport.height,
                    left,
                    top,
                    PLACEHOLDER_CURSOR_SIZE_PX,
                );
            }
        }
    }

    /// Copies the current framebuffer contents, for screenshot capture.
    pub fn capture_frame(&self) -> Surface {
        Surface {
            width: self.viewport.width,
            height: self.viewport.height,
            rgba: self.pixels.frame().to_vec(),
        }
    }

    pub fn present(&mut self) -> Result<(), Error> {
        self.pixels.render()
    }
}

fn build_pixels(
    window: Arc<Window>,
    window_width: u32,
    window_height: u32,
    render_width: u32,
    render_height: u32,
) -> Result<Pixels<'static>, Error> {
    let surface = SurfaceTexture::new(window_width, window_height, window);
    Pixels::new(render_width, render_height, surface)
}

/// Internal framebuffer size for a window size. Full-window mode scales the
/// window dimensions directly; classic mode letterboxes to a 4:3 frame.
fn render_dimensions(
    window_width: u32,
    window_height: u32,
    resolution_scale: f64,
    use_full_window: bool,
) -> (u32, u32) {
    let scale = if resolution_scale.is_finite() && resolution_scale > 0.0 {
        resolution_scale
    } else {
        1.0
    };
    let scaled_height = ((window_height as f64 * scale).round() as u32).max(1);
    if use_full_window {
        let scaled_width = ((window_width as f64 * scale).round() as u32).max(1);
        (scaled_width, scaled_height)
    } else {
        // u64 keeps the 4/3 widening from overflowing when the scale
        // saturates the height toward u32::MAX.
        let classic_width = (scaled_height as u64 * CLASSIC_ASPECT_WIDTH as u64
            / CLASSIC_ASPECT_HEIGHT as u64)
            .min(u32::MAX as u64) as u32;
        (classic_width.max(1), scaled_height)
    }
}

fn scaled_sprite_dimensions(width: u32, height: u32, scale: f64) -> (i32, i32) {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    let dest_width = ((width as f64 * scale).round() as i32).max(1);
    let dest_height = ((height as f64 * scale).round() as i32).max(1);
    (dest_width, dest_height)
}

fn resolve_cached_sprite<'a>(
    sprite_cache: &'a mut HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: &mut HashSet<String>,
    asset_root: &Path,
    key: &str,
) -> Option<&'a LoadedSprite> {
    if !sprite_cache.contains_key(key) {
        let loaded = load_sprite(asset_root, key);
        if loaded.is_none() && warned_missing_sprite_keys.insert(key.to_string()) {
            warn!(sprite_key = key, "sprite not found under asset root");
        }
        sprite_cache.insert(key.to_string(), loaded);
    }
    sprite_cache.get(key).and_then(Option::as_ref)
}

fn load_sprite(asset_root: &Path, key: &str) -> Option<LoadedSprite> {
    let path = asset_root.join(format!("{key}.png"));
    let image = ImageReader::open(path).ok()?.decode().ok()?.to_rgba8();
    Some(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn draw_sprite_scaled(
    frame: &mut [u8],
    width: u32,
    height: u32,
    left: i32,
    top: i32,
    sprite: &LoadedSprite,
    scale: f64,
) {
    let (dest_width, dest_height) = scaled_sprite_dimensions(sprite.width, sprite.height, scale);
    let width_i32 = width as i32;
    let height_i32 = height as i32;

    for dy in 0..dest_height {
        let pixel_y = top + dy;
        if pixel_y < 0 || pixel_y >= height_i32 {
            continue;
        }
        let src_y =
            (((dy as f64 + 0.5) * sprite.height as f64 / dest_height as f64) as u32)
                .min(sprite.height - 1);
        for dx in 0..dest_width {
            let pixel_x = left + dx;
            if pixel_x < 0 || pixel_x >= width_i32 {
                continue;
            }
            let src_x =
                (((dx as f64 + 0.5) * sprite.width as f64 / dest_width as f64) as u32)
                    .min(sprite.width - 1);
            let src_offset = ((src_y * sprite.width + src_x) * 4) as usize;
            let rgba = [
                sprite.rgba[src_offset],
                sprite.rgba[src_offset + 1],
                sprite.rgba[src_offset + 2],
                sprite.rgba[src_offset + 3],
            ];
            if rgba[3] == 0 {
                continue;
            }
            write_pixel_rgba(
                frame,
                width as usize,
                pixel_x as usize,
                pixel_y as usize,
                rgba,
            );
        }
    }
}

fn draw_placeholder_square(
    frame: &mut [u8],
    width: u32,
    height: u32,
    left: i32,
    top: i32,
    size: i32,
) {
    let width_i32 = width as i32;
    let height_i32 = height as i32;
    for dy in 0..size {
        let pixel_y = top + dy;
        if pixel_y < 0 || pixel_y >= height_i32 {
            continue;
        }
        for dx in 0..size {
            let pixel_x = left + dx;
            if pixel_x < 0 || pixel_x >= width_i32 {
                continue;
            }
            write_pixel_rgba(
                frame,
                width as usize,
                pixel_x as usize,
                pixel_y as usize,
                PLACEHOLDER_CURSOR_COLOR,
            );
        }
    }
}
