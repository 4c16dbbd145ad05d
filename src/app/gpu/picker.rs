use anyhow::{Context as _, Result, anyhow};
use eframe::glow::{self, HasContext as _};
use glam::Vec2;

/// Bits of node id carried by each of the red, green and blue channels.
pub(in crate::app) const PICK_CHANNEL_BITS: u32 = 6;
const PICK_CHANNEL_MASK: u32 = (1 << PICK_CHANNEL_BITS) - 1;
/// Spreads a 6-bit channel across the 8-bit range so readback survives rounding.
const PICK_CHANNEL_SCALE: u32 = 256 >> PICK_CHANNEL_BITS;
/// Number of distinct ids the picker can resolve.
pub(in crate::app) const PICK_ID_CAPACITY: usize = 1 << (3 * PICK_CHANNEL_BITS);
/// Side of the square off-screen target, independent of the canvas size.
pub(in crate::app) const PICKER_SIZE: i32 = 2048;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum PickResult {
    Hit(usize),
    Miss,
}

/// RGBA bytes for `id`, or `None` when the id does not fit the channel budget.
pub(in crate::app) fn encode_pick_color(id: usize) -> Option<[u8; 4]> {
    if id >= PICK_ID_CAPACITY {
        return None;
    }
    let id = id as u32;
    let channel = |shift: u32| ((id >> shift) & PICK_CHANNEL_MASK) * PICK_CHANNEL_SCALE;
    Some([
        channel(2 * PICK_CHANNEL_BITS) as u8,
        channel(PICK_CHANNEL_BITS) as u8,
        channel(0) as u8,
        u8::MAX,
    ])
}

/// Normalized RGBA as written by the id program; unpickable ids stay transparent.
pub(in crate::app) fn pick_color_rgba(id: usize) -> [f32; 4] {
    encode_pick_color(id)
        .map(|bytes| bytes.map(|byte| byte as f32 / 255.0))
        .unwrap_or([0.0; 4])
}

pub(in crate::app) fn decode_pick_color(pixel: [u8; 4]) -> PickResult {
    if pixel[3] == 0 {
        return PickResult::Miss;
    }
    let channel = |value: u8| {
        ((value as u32 + PICK_CHANNEL_SCALE / 2) / PICK_CHANNEL_SCALE).min(PICK_CHANNEL_MASK)
    };
    let id = (channel(pixel[0]) << (2 * PICK_CHANNEL_BITS))
        | (channel(pixel[1]) << PICK_CHANNEL_BITS)
        | channel(pixel[2]);
    PickResult::Hit(id as usize)
}

/// Target pixel for normalized canvas coordinates (top-left origin), GL bottom-left origin.
pub(in crate::app) fn target_pixel(normalized: Vec2, size: i32) -> (i32, i32) {
    let max = (size - 1) as f32;
    let x = (normalized.x * size as f32).floor().clamp(0.0, max);
    let y = ((1.0 - normalized.y) * size as f32).floor().clamp(0.0, max);
    (x as i32, y as i32)
}

/// Off-screen id target with a one-pixel readback.
pub(in crate::app) struct Picker {
    framebuffer: glow::Framebuffer,
    color: glow::Texture,
    depth: glow::Renderbuffer,
    size: i32,
    pending: Option<Vec2>,
}

impl Picker {
    pub(in crate::app) fn new(gl: &glow::Context) -> Result<Self> {
        let size = PICKER_SIZE;
        unsafe {
            let color = gl
                .create_texture()
                .map_err(|error| anyhow!(error))
                .context("failed to create picker color texture")?;
            gl.bind_texture(glow::TEXTURE_2D, Some(color));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                size,
                size,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(None),
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.bind_texture(glow::TEXTURE_2D, None);

            let depth = gl
                .create_renderbuffer()
                .map_err(|error| anyhow!(error))
                .context("failed to create picker depth buffer")?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
            gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH_COMPONENT24, size, size);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);

            let framebuffer = gl
                .create_framebuffer()
                .map_err(|error| anyhow!(error))
                .context("failed to create picker framebuffer")?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color),
                0,
            );
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth),
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(framebuffer);
                gl.delete_renderbuffer(depth);
                gl.delete_texture(color);
                return Err(anyhow!("picker framebuffer incomplete (status {status:#x})"));
            }

            log::debug!("picker target ready ({size}x{size})");
            Ok(Self {
                framebuffer,
                color,
                depth,
                size,
                pending: None,
            })
        }
    }

    /// Binds the id target and remembers where to read back; `None` renders without readback.
    pub(in crate::app) fn pre_render(&mut self, gl: &glow::Context, normalized: Option<Vec2>) {
        self.pending = normalized;
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
            gl.disable(glow::SCISSOR_TEST);
            gl.viewport(0, 0, self.size, self.size);
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    pub(in crate::app) fn post_render(&mut self, gl: &glow::Context) -> Option<PickResult> {
        let normalized = self.pending.take()?;
        let (x, y) = target_pixel(normalized, self.size);
        let mut pixel = [0_u8; 4];
        unsafe {
            gl.read_pixels(
                x,
                y,
                1,
                1,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(&mut pixel[..])),
            );
        }
        Some(decode_pick_color(pixel))
    }

    pub(in crate::app) fn texture(&self) -> glow::Texture {
        self.color
    }

    pub(in crate::app) fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_framebuffer(self.framebuffer);
            gl.delete_renderbuffer(self.depth);
            gl.delete_texture(self.color);
        }
    }
}
