//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                                                          │
//! │        particles · gifts ■ · baubles ● · photo cards     │
//! │                                                          │
//! ├──────────────────────────────────────────────────────────┤
//! │  state / gesture / hint                         lyric    │
//! │  key legend                                              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Particles are drawn first with additive blending; ornaments and photo
//! cards are then painted back to front.

use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};
use thiserror::Error;
use tracing::warn;
use tree_morph::interp::Transform;
use tree_morph::{GestureType, MorphScene, MorphState, OrnamentKind, SceneMode};

use crate::camera::{CameraRig, ScreenPoint};
use crate::settings::WindowSettings;
use crate::vision::{SimInput, SimPose};

// ════════════════════════════════════════════════════════════════════════════
// Palette and layout constants
// ════════════════════════════════════════════════════════════════════════════

const BG_COLOR: u32 = 0xFF100508;
const STATUS_BG: u32 = 0xFF1E0A12;
const STATUS_H: usize = 48;
const TEXT_COLOR: u32 = 0xFFEEEEEE;
const DIM_TEXT: u32 = 0xFF888888;
const ACCENT: u32 = 0xFFFF007F;

const PINK: u32 = 0xFFFFC0CB;
const MAGENTA: u32 = 0xFFFF007F;
const SILVER: u32 = 0xFFFFFFFF;

const GIFT_COLORS: [u32; 3] = [0xFFFF007F, 0xFFFF69B4, 0xFFE0E0E0];
const BAUBLE_COLORS: [u32; 3] = [0xFFFFC0CB, 0xFFFFFFFF, 0xFFC0C0C0];

const CARD_FRAME: u32 = 0xFFF0F0F0;
const CARD_FRAME_ACTIVE: u32 = 0xFFFFC0CB;
/// Card frame in world units; the picture is 1 × 1 inside it.
const CARD_W: f32 = 1.1;
const CARD_H: f32 = 1.3;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("cannot open window: {0}")]
    Open(#[from] minifb::Error),
}

// ════════════════════════════════════════════════════════════════════════════
// FrameView: what one render needs
// ════════════════════════════════════════════════════════════════════════════

pub struct FrameView<'a> {
    pub scene: &'a MorphScene,
    pub camera: &'a CameraRig,
    pub mode: SceneMode,
    /// Last emitted gesture, `None` until the first.
    pub gesture: GestureType,
    pub lyric: &'a str,
    pub playing: bool,
    /// Set once hand tracking has failed for good.
    pub tracking_error: Option<&'a str>,
    pub simulated: bool,
}

/// Window input relevant to the app itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub quit: bool,
    pub toggle: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    canvas: Canvas,
    sim_tx: Option<Sender<SimInput>>,
    last_pointer: Option<(f32, f32)>,
    last_pose: SimPose,
}

impl Visualizer {
    /// `sim_tx` is set when the mouse simulator is the frame source.
    pub fn new(settings: &WindowSettings, sim_tx: Option<Sender<SimInput>>) -> Result<Self, WindowError> {
        let mut window = Window::new(
            &settings.title,
            settings.width,
            settings.height,
            WindowOptions { resize: false, ..WindowOptions::default() },
        )?;
        window.limit_update_rate(Some(settings.frame_interval()));

        Ok(Visualizer {
            window,
            canvas: Canvas::new(settings.width, settings.height),
            sim_tx,
            last_pointer: None,
            last_pose: SimPose::default(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Read the keyboard, and feed the simulator if there is one.
    pub fn poll_input(&mut self) -> Controls {
        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let controls = Controls {
            quit: !self.window.is_open() || one_shot(Key::Q) || one_shot(Key::Escape),
            toggle: one_shot(Key::Space),
        };

        if let Some(tx) = &self.sim_tx {
            let (w, h) = (self.canvas.width as f32, self.canvas.height as f32);
            let pointer = self
                .window
                .get_mouse_pos(MouseMode::Discard)
                .map(|(x, y)| (x / w, y / h));
            let held = |k: Key| self.window.is_key_down(k);
            let pose = if held(Key::G) {
                SimPose::Grab
            } else if held(Key::F) {
                SimPose::Fist
            } else if held(Key::O) {
                SimPose::OpenPalm
            } else {
                SimPose::Relaxed
            };

            if pointer != self.last_pointer {
                let _ = tx.send(SimInput::Pointer(pointer));
                self.last_pointer = pointer;
            }
            if pose != self.last_pose {
                let _ = tx.send(SimInput::Pose(pose));
                self.last_pose = pose;
            }
        }
        controls
    }

    pub fn render(&mut self, view: &FrameView<'_>) {
        self.canvas.draw_frame(view);
        let c = &self.canvas;
        if let Err(e) = self.window.update_with_buffer(&c.buf, c.width, c.height) {
            warn!(error = %e, "window update failed");
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas: the framebuffer and everything drawn into it
// ════════════════════════════════════════════════════════════════════════════

struct Canvas {
    buf: Vec<u32>,
    width: usize,
    height: usize,
}

/// A depth-sorted ornament or card.
struct Sprite {
    at: ScreenPoint,
    pose: Transform,
    kind: SpriteKind,
}

enum SpriteKind {
    Gift(u32),
    Bauble(u32),
    Card { id: usize, highlighted: bool },
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Canvas { buf: vec![BG_COLOR; width * height], width, height }
    }

    fn scene_height(&self) -> usize {
        self.height.saturating_sub(STATUS_H)
    }

    fn draw_frame(&mut self, view: &FrameView<'_>) {
        self.buf.fill(BG_COLOR);
        self.draw_particles(view);
        self.draw_sprites(view);
        self.draw_status(view);
    }

    // ── Particles ─────────────────────────────────────────────────────────

    fn draw_particles(&mut self, view: &FrameView<'_>) {
        let (w, h) = (self.width, self.scene_height());
        let time = view.scene.time();
        for (p, t) in view.scene.particles().iter() {
            let Some(at) = view.camera.project(t.position, w, h) else { continue };
            let blink = (time * 3.0 + p.seed * 20.0).sin();
            let color = blend(PINK, MAGENTA, 0.5 + 0.5 * blink.sin());
            let size = (8.0 * p.seed + 4.0) * 10.0 / at.depth * (h as f32 / 720.0);
            let (x, y) = (at.x as isize, at.y as isize);
            if size >= 3.0 {
                let r = (size * 0.5) as isize;
                self.add_disc(x, y, r, scale_rgb(color, 0.5), h);
                self.add_pixel(x, y, blend(color, SILVER, 0.8), h);
            } else {
                self.add_pixel(x, y, scale_rgb(color, 0.7), h);
            }
        }
    }

    // ── Ornaments and cards ───────────────────────────────────────────────

    fn draw_sprites(&mut self, view: &FrameView<'_>) {
        let (w, h) = (self.width, self.scene_height());
        let cam = view.camera;
        let mut sprites = Vec::new();

        for group in [view.scene.gifts(), view.scene.baubles()] {
            for (o, t) in group.iter() {
                let Some(at) = cam.project(t.position, w, h) else { continue };
                let slot = o.palette_slot as usize % 3;
                let kind = match o.kind {
                    OrnamentKind::Gift => SpriteKind::Gift(GIFT_COLORS[slot]),
                    OrnamentKind::Bauble => SpriteKind::Bauble(BAUBLE_COLORS[slot]),
                };
                sprites.push(Sprite { at, pose: *t, kind });
            }
        }

        let active = view.scene.active_photo();
        for (photo, t) in view.scene.photos().iter() {
            if t.scale < 0.01 {
                continue;
            }
            let Some(at) = cam.project(t.position, w, h) else { continue };
            let highlighted = view.mode.zoomed && photo.id == active;
            sprites.push(Sprite { at, pose: *t, kind: SpriteKind::Card { id: photo.id, highlighted } });
        }

        sprites.sort_by(|a, b| b.at.depth.total_cmp(&a.at.depth));
        for s in &sprites {
            self.draw_sprite(s, h);
        }
    }

    fn draw_sprite(&mut self, s: &Sprite, clip_h: usize) {
        let px = s.pose.scale * s.at.scale;
        let (x, y) = (s.at.x as isize, s.at.y as isize);
        // Cheap facing term so spinning ornaments flicker a little.
        let shade = 0.75 + 0.25 * s.pose.rotation.y.cos();
        match s.kind {
            SpriteKind::Gift(color) => {
                let half = (px * 0.5).max(1.0) as isize;
                self.fill_rect_clipped(x - half, y - half, 2 * half, 2 * half, scale_rgb(color, shade), clip_h);
            }
            SpriteKind::Bauble(color) => {
                let r = (px * 0.5).max(1.0) as isize;
                self.fill_disc(x, y, r, scale_rgb(color, shade), clip_h);
                self.set_pixel_clipped(x - r / 3, y - r / 3, SILVER, clip_h);
            }
            SpriteKind::Card { id, highlighted } => {
                let squash = s.pose.rotation.y.cos().abs().max(0.15);
                let fw = (CARD_W * px * squash) as isize;
                let fh = (CARD_H * px) as isize;
                let frame = if highlighted { CARD_FRAME_ACTIVE } else { CARD_FRAME };
                self.fill_rect_clipped(x - fw / 2, y - fh / 2, fw, fh, frame, clip_h);
                let iw = (px * squash) as isize;
                let ih = px as isize;
                let picture = hsv_to_argb(id as f32 * 72.0, 0.45, 0.85);
                self.fill_rect_clipped(x - iw / 2, y - fh / 2 + (fh - ih) / 3, iw, ih, picture, clip_h);
                if highlighted {
                    self.draw_border_clipped(x - fw / 2 - 2, y - fh / 2 - 2, fw + 4, fh + 4, ACCENT, clip_h);
                }
            }
        }
    }

    // ── Status bar ────────────────────────────────────────────────────────

    fn draw_status(&mut self, view: &FrameView<'_>) {
        let y0 = self.scene_height();
        self.fill_rect(0, y0, self.width, STATUS_H, STATUS_BG);

        let line = format!(
            "{}   {}",
            view.mode.state.as_str().replace('_', " "),
            status_gesture(view.gesture),
        );
        self.draw_label(&line, 10, y0 + 6, 2, TEXT_COLOR);
        self.draw_label(zoom_hint(view.mode), 10, y0 + 22, 1, ACCENT);

        if view.playing {
            let lx = self.width.saturating_sub(10 + text_width(view.lyric, 2));
            self.draw_label(view.lyric, lx, y0 + 6, 2, PINK);
        }

        let legend = if let Some(err) = view.tracking_error {
            format!("TRACKING OFF: {}   SPACE=TOGGLE  Q=QUIT", err)
        } else if view.simulated {
            "MOUSE=HAND  F=FIST  O=OPEN PALM  G=GRAB  SPACE=TOGGLE  Q=QUIT".to_string()
        } else {
            "SPACE=TOGGLE  Q=QUIT".to_string()
        };
        self.draw_label(&legend, 10, y0 + 34, 1, DIM_TEXT);
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    /// Signed-origin rectangle, clipped to the top `clip_h` rows.
    fn fill_rect_clipped(&mut self, x: isize, y: isize, w: isize, h: isize, color: u32, clip_h: usize) {
        let x0 = x.max(0) as usize;
        let y0 = y.max(0) as usize;
        let x1 = (x + w).clamp(0, self.width as isize) as usize;
        let y1 = (y + h).clamp(0, clip_h.min(self.height) as isize) as usize;
        for row in y0..y1 {
            for col in x0..x1 {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    fn draw_border_clipped(&mut self, x: isize, y: isize, w: isize, h: isize, color: u32, clip_h: usize) {
        for col in x..x + w {
            self.set_pixel_clipped(col, y, color, clip_h);
            self.set_pixel_clipped(col, y + h - 1, color, clip_h);
        }
        for row in y..y + h {
            self.set_pixel_clipped(x, row, color, clip_h);
            self.set_pixel_clipped(x + w - 1, row, color, clip_h);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.buf[y * self.width + x] = color;
        }
    }

    fn set_pixel_clipped(&mut self, x: isize, y: isize, color: u32, clip_h: usize) {
        if x >= 0 && y >= 0 && (y as usize) < clip_h {
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    /// Saturating per-channel add.
    fn add_pixel(&mut self, x: isize, y: isize, color: u32, clip_h: usize) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= clip_h.min(self.height) {
            return;
        }
        let i = y as usize * self.width + x as usize;
        self.buf[i] = add_rgb(self.buf[i], color);
    }

    fn fill_disc(&mut self, cx: isize, cy: isize, r: isize, color: u32, clip_h: usize) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel_clipped(cx + dx, cy + dy, color, clip_h);
                }
            }
        }
    }

    fn add_disc(&mut self, cx: isize, cy: isize, r: isize, color: u32, clip_h: usize) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.add_pixel(cx + dx, cy + dy, color, clip_h);
                }
            }
        }
    }

    /// Minimal bitmap font: 3×5 glyphs, each pixel drawn as a
    /// `scale`×`scale` block.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let advance = 4 * scale;
        let mut cx = x;
        for ch in text.chars() {
            if cx + advance > self.width {
                break;
            }
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += advance;
        }
    }
}

fn status_gesture(g: GestureType) -> String {
    match g {
        GestureType::None => "WAITING FOR GESTURE".to_string(),
        g => format!("GESTURE: {}", g.as_str().replace('_', " ")),
    }
}

fn zoom_hint(mode: SceneMode) -> &'static str {
    match (mode.state, mode.zoomed) {
        (MorphState::Scattered, false) => "PINCH TO HOLD A PHOTO  FIST TO ASSEMBLE",
        (MorphState::Scattered, true) => "OPEN PALM TO LET GO  FIST TO ASSEMBLE",
        (MorphState::TreeShape, _) => "OPEN PALM TO SCATTER",
    }
}

fn text_width(text: &str, scale: usize) -> usize {
    text.chars().count() * 4 * scale
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '?' => [0b111, 0b001, 0b010, 0b000, 0b010],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _ => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Colour helpers (packed 0xAARRGGBB, A = 0xFF)
// ────────────────────────────────────────────────────────────────────────────

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF;
    let br = (b >> 16) & 0xFF;
    let ag = (a >> 8) & 0xFF;
    let bg = (b >> 8) & 0xFF;
    let ab = a & 0xFF;
    let bb = b & 0xFF;
    0xFF000000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

fn scale_rgb(c: u32, k: f32) -> u32 {
    blend(0xFF000000, c, k)
}

fn add_rgb(a: u32, b: u32) -> u32 {
    let ch = |shift: u32| (((a >> shift) & 0xFF) + ((b >> shift) & 0xFF)).min(0xFF) << shift;
    0xFF000000 | ch(16) | ch(8) | ch(0)
}

/// Convert HSV → packed ARGB.
fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f = h / 60.0 - hi as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let ri = (r * 255.0) as u32;
    let gi = (g * 255.0) as u32;
    let bi = (b * 255.0) as u32;
    0xFF000000 | (ri << 16) | (gi << 8) | bi
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraSettings;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tree_morph::{FrameInput, MorphConfig};

    fn scene() -> MorphScene {
        let mut c = MorphConfig::default();
        c.particles.count = 300;
        c.gifts.count = 10;
        c.baubles.count = 10;
        MorphScene::generate(&c, &mut StdRng::seed_from_u64(3))
    }

    fn view<'a>(scene: &'a MorphScene, camera: &'a CameraRig, mode: SceneMode) -> FrameView<'a> {
        FrameView {
            scene,
            camera,
            mode,
            gesture: GestureType::None,
            lyric: "...",
            playing: true,
            tracking_error: None,
            simulated: true,
        }
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(PINK, MAGENTA, 0.0), PINK);
        assert_eq!(blend(PINK, MAGENTA, 1.0), MAGENTA);
    }

    #[test]
    fn additive_saturates_per_channel() {
        assert_eq!(add_rgb(0xFFF00010, 0xFF200020), 0xFFFF0030);
    }

    #[test]
    fn hsv_primaries_are_opaque() {
        assert_eq!(hsv_to_argb(0.0, 1.0, 1.0), 0xFFFF0000);
        assert_eq!(hsv_to_argb(120.0, 1.0, 1.0), 0xFF00FF00);
        assert_eq!(hsv_to_argb(240.0, 1.0, 1.0), 0xFF0000FF);
        assert_eq!(hsv_to_argb(-120.0, 1.0, 1.0), hsv_to_argb(240.0, 1.0, 1.0));
    }

    #[test]
    fn status_text_names_the_gesture() {
        assert_eq!(status_gesture(GestureType::None), "WAITING FOR GESTURE");
        assert_eq!(status_gesture(GestureType::OpenPalm), "GESTURE: OPEN PALM");
        let zoomed = SceneMode { state: MorphState::Scattered, zoomed: true };
        assert!(zoom_hint(zoomed).contains("LET GO"));
    }

    #[test]
    fn clipped_primitives_stay_in_bounds() {
        let mut c = Canvas::new(40, 30);
        c.fill_rect_clipped(-10, -10, 100, 100, 0xFFFFFFFF, 20);
        assert_eq!(c.buf[19 * 40 + 39], 0xFFFFFFFF);
        assert_eq!(c.buf[20 * 40], BG_COLOR);
        c.fill_disc(-3, 50, 8, 0xFF00FF00, 30);
        c.draw_border_clipped(35, 25, 20, 20, 0xFF0000FF, 30);
        c.add_disc(39, 29, 4, 0xFF010101, 30);
        c.draw_label("OUT OF ROOM", 30, 28, 2, TEXT_COLOR);
        assert_eq!(c.buf.len(), 40 * 30);
    }

    #[test]
    fn label_draws_glyph_pixels() {
        let mut c = Canvas::new(20, 10);
        c.draw_label("1", 0, 0, 1, 0xFFFFFFFF);
        // '1' = 010 / 110 / 010 / 010 / 111
        assert_eq!(c.buf[1], 0xFFFFFFFF);
        assert_eq!(c.buf[0], BG_COLOR);
        assert_eq!(c.buf[4 * 20], 0xFFFFFFFF);
    }

    #[test]
    fn frame_paints_scene_and_status_bar() {
        let mut s = scene();
        let camera = CameraRig::new(CameraSettings::default());
        let mode = SceneMode::default();
        s.tick(&FrameInput { mode, dt: 1.0 / 60.0, ..Default::default() });

        let mut c = Canvas::new(320, 240);
        c.draw_frame(&view(&s, &camera, mode));
        let scene_rows = c.scene_height() * c.width;
        assert!(c.buf[..scene_rows].iter().any(|&p| p != BG_COLOR));
        assert!(c.buf[scene_rows..].iter().all(|&p| p != BG_COLOR));
    }

    #[test]
    fn hidden_cards_are_skipped() {
        let mut s = scene();
        let camera = CameraRig::new(CameraSettings::default());
        let mode = SceneMode { state: MorphState::TreeShape, zoomed: false };
        for _ in 0..600 {
            s.tick(&FrameInput { mode, dt: 1.0 / 60.0, ..Default::default() });
        }
        assert!(s.photos().transforms().iter().all(|t| t.scale < 0.01));
        let mut c = Canvas::new(320, 240);
        c.draw_frame(&view(&s, &camera, mode));
    }
}
