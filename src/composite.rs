//! Layer compositing for flattened exports.
//!
//! The `psd` crate decodes each pixel layer into a document-sized RGBA buffer.
//! Layers are painted bottom-up onto a transparent canvas with their blend
//! mode, opacity and clipping. Hidden layers and layers inside hidden groups
//! are skipped.

use crate::color::ColorInfo;
use psd::{Psd, PsdLayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    Normal,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    DarkerColor,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    LighterColor,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl Blend {
    /// Map the discriminant of the crate's `BlendMode`, which it does not export.
    /// Pass through and dissolve paint as normal.
    pub fn from_discriminant(value: u8) -> Self {
        match value {
            3 => Blend::Darken,
            4 => Blend::Multiply,
            5 => Blend::ColorBurn,
            6 => Blend::LinearBurn,
            7 => Blend::DarkerColor,
            8 => Blend::Lighten,
            9 => Blend::Screen,
            10 => Blend::ColorDodge,
            11 => Blend::LinearDodge,
            12 => Blend::LighterColor,
            13 => Blend::Overlay,
            14 => Blend::SoftLight,
            15 => Blend::HardLight,
            16 => Blend::VividLight,
            17 => Blend::LinearLight,
            18 => Blend::PinLight,
            19 => Blend::HardMix,
            20 => Blend::Difference,
            21 => Blend::Exclusion,
            22 => Blend::Subtract,
            23 => Blend::Divide,
            24 => Blend::Hue,
            25 => Blend::Saturation,
            26 => Blend::Color,
            27 => Blend::Luminosity,
            _ => Blend::Normal,
        }
    }

    /// Mix backdrop `cb` with source `cs`, both in 0.0..=1.0.
    pub fn apply(self, cb: [f32; 3], cs: [f32; 3]) -> [f32; 3] {
        match self {
            Blend::Hue => set_lum(set_sat(cs, sat(cb)), lum(cb)),
            Blend::Saturation => set_lum(set_sat(cb, sat(cs)), lum(cb)),
            Blend::Color => set_lum(cs, lum(cb)),
            Blend::Luminosity => set_lum(cb, lum(cs)),
            Blend::DarkerColor => {
                if lum(cs) < lum(cb) {
                    cs
                } else {
                    cb
                }
            }
            Blend::LighterColor => {
                if lum(cs) > lum(cb) {
                    cs
                } else {
                    cb
                }
            }
            separable => [0, 1, 2].map(|i| separable.channel(cb[i], cs[i])),
        }
    }

    fn channel(self, cb: f32, cs: f32) -> f32 {
        match self {
            Blend::Darken => cb.min(cs),
            Blend::Multiply => cb * cs,
            Blend::ColorBurn => color_burn(cb, cs),
            Blend::LinearBurn => (cb + cs - 1.0).max(0.0),
            Blend::Lighten => cb.max(cs),
            Blend::Screen => screen(cb, cs),
            Blend::ColorDodge => color_dodge(cb, cs),
            Blend::LinearDodge => (cb + cs).min(1.0),
            Blend::Overlay => hard_light(cs, cb),
            Blend::SoftLight => soft_light(cb, cs),
            Blend::HardLight => hard_light(cb, cs),
            Blend::VividLight => {
                if cs <= 0.5 {
                    color_burn(cb, 2.0 * cs)
                } else {
                    color_dodge(cb, 2.0 * cs - 1.0)
                }
            }
            Blend::LinearLight => (cb + 2.0 * cs - 1.0).clamp(0.0, 1.0),
            Blend::PinLight => {
                if cs <= 0.5 {
                    cb.min(2.0 * cs)
                } else {
                    cb.max(2.0 * cs - 1.0)
                }
            }
            Blend::HardMix => {
                if cb + cs >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Blend::Difference => (cb - cs).abs(),
            Blend::Exclusion => cb + cs - 2.0 * cb * cs,
            Blend::Subtract => (cb - cs).max(0.0),
            Blend::Divide => {
                if cs <= 0.0 {
                    if cb <= 0.0 {
                        0.0
                    } else {
                        1.0
                    }
                } else {
                    (cb / cs).min(1.0)
                }
            }
            _ => cs,
        }
    }
}

fn screen(cb: f32, cs: f32) -> f32 {
    cb + cs - cb * cs
}

fn hard_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb * 2.0 * cs
    } else {
        screen(cb, 2.0 * cs - 1.0)
    }
}

fn soft_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
    } else {
        let d = if cb <= 0.25 {
            ((16.0 * cb - 12.0) * cb + 4.0) * cb
        } else {
            cb.sqrt()
        };
        cb + (2.0 * cs - 1.0) * (d - cb)
    }
}

fn color_dodge(cb: f32, cs: f32) -> f32 {
    if cb <= 0.0 {
        0.0
    } else if cs >= 1.0 {
        1.0
    } else {
        (cb / (1.0 - cs)).min(1.0)
    }
}

fn color_burn(cb: f32, cs: f32) -> f32 {
    if cb >= 1.0 {
        1.0
    } else if cs <= 0.0 {
        0.0
    } else {
        1.0 - ((1.0 - cb) / cs).min(1.0)
    }
}

fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    let mut out = c;
    if n < 0.0 {
        out = out.map(|v| l + (v - l) * l / (l - n));
    }
    if x > 1.0 {
        out = out.map(|v| l + (v - l) * (1.0 - l) / (x - l));
    }
    out
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    clip_color(c.map(|v| v + d))
}

fn sat(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn set_sat(c: [f32; 3], s: f32) -> [f32; 3] {
    let mut order = [0, 1, 2];
    order.sort_by(|&a, &b| c[a].total_cmp(&c[b]));
    let [min, mid, max] = order;

    let mut out = [0.0; 3];
    if c[max] > c[min] {
        out[mid] = (c[mid] - c[min]) * s / (c[max] - c[min]);
        out[max] = s;
    }
    out
}

fn unit(value: u8) -> f32 {
    f32::from(value) / 255.0
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Paint one source pixel with coverage `alpha` over `dst`, both straight alpha.
fn blend_pixel(dst: &mut [u8], src: &[u8], alpha: f32, blend: Blend) {
    let backdrop_alpha = unit(dst[3]);
    let cb = [unit(dst[0]), unit(dst[1]), unit(dst[2])];
    let cs = [unit(src[0]), unit(src[1]), unit(src[2])];
    let mixed = blend.apply(cb, cs);

    let out_alpha = alpha + backdrop_alpha * (1.0 - alpha);
    for i in 0..3 {
        // Where there is no backdrop the source shows unmixed.
        let source = (1.0 - backdrop_alpha) * cs[i] + backdrop_alpha * mixed[i];
        let value = alpha * source + backdrop_alpha * cb[i] * (1.0 - alpha);
        dst[i] = to_byte(value / out_alpha);
    }
    dst[3] = to_byte(out_alpha);
}

/// Photoshop sets flag bit 1 on hidden layers and the crate reports that bit
/// as `visible()`, so a true value means hidden.
fn is_shown(psd: &Psd, layer: &PsdLayer) -> bool {
    if layer.visible() {
        return false;
    }

    let mut parent = layer.parent_id();
    while let Some(id) = parent {
        match psd.groups().get(&id) {
            Some(group) if group.visible() => return false,
            Some(group) => parent = group.parent_id(),
            None => break,
        }
    }
    true
}

/// Flatten every shown layer of `psd` into one RGBA buffer of document size.
pub fn composite_layers(psd: &Psd, color: &ColorInfo) -> Vec<u8> {
    let width = psd.width() as usize;
    let pixel_count = width * psd.height() as usize;
    let mut canvas = vec![0u8; pixel_count * 4];

    // Coverage of the layer that clipped layers above it are cut to. `None`
    // while that layer is hidden, which hides its clipped layers too.
    let mut clip_base: Option<Vec<f32>> = None;

    for layer in psd.layers().iter().rev() {
        // The crate's "clipping mask" flag is set on layers that are NOT clipped.
        let clipped = !layer.is_clipping_mask();
        if !clipped {
            clip_base = None;
        }
        if !is_shown(psd, layer) || (clipped && clip_base.is_none()) {
            continue;
        }

        let pixels = color.layer_to_rgba(layer.rgba());
        let opacity = unit(layer.opacity());
        let blend = Blend::from_discriminant(layer.blend_mode() as u8);
        let (left, top) = (layer.layer_left(), layer.layer_top());
        let (right, bottom) = (layer.layer_right(), layer.layer_bottom());

        let mut coverage = Vec::with_capacity(if clipped { 0 } else { pixel_count });
        for (idx, src) in pixels.chunks_exact(4).enumerate().take(pixel_count) {
            let x = (idx % width) as i32;
            let y = (idx / width) as i32;
            // Layers without a transparency channel come back opaque everywhere.
            let inside = x >= left && x <= right && y >= top && y <= bottom;

            let mut alpha = if inside { unit(src[3]) * opacity } else { 0.0 };
            match &clip_base {
                Some(base) if clipped => alpha *= base[idx],
                _ => coverage.push(alpha),
            }

            if alpha > 0.0 {
                blend_pixel(&mut canvas[idx * 4..idx * 4 + 4], src, alpha, blend);
            }
        }

        if !clipped {
            clip_base = Some(coverage);
        }
    }

    canvas
}
