//! Color conversion for non-RGB documents.
//!
//! The `psd` crate puts a document's first three channels in the red, green
//! and blue slots whatever the color mode is. Lab, CMYK and indexed data need
//! converting before the pixels can be saved as PNG.

use psd::ColorMode;
use thiserror::Error;

/// Standard XYZ to sRGB conversion matrix (D65 white point)
const XYZ_TO_SRGB: [[f32; 3]; 3] = [
    [3.2406, -1.5372, -0.4986],
    [-0.9689, 1.8758, 0.0415],
    [0.0557, -0.2040, 1.0570],
];

const D65_WHITE: [f32; 3] = [0.95047, 1.0, 1.08883];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    /// Only the four-channel layout puts the black plate where it can be read.
    #[error("CMYK documents with {0} channels are not supported (expected 4)")]
    CmykChannels(u16),
}

/// What the raw header says about a document's color data.
#[derive(Debug, Clone)]
pub struct ColorInfo {
    mode: ColorMode,
    channels: u16,
    palette: Vec<[u8; 3]>,
}

impl ColorInfo {
    /// Read the channel count and, for indexed documents, the palette from the file
    /// bytes. Missing or short data leaves them empty.
    pub fn read(bytes: &[u8], mode: ColorMode) -> Self {
        let channels = bytes
            .get(12..14)
            .map_or(0, |b| u16::from_be_bytes([b[0], b[1]]));

        let palette = match mode {
            ColorMode::Indexed => read_palette(bytes),
            _ => Vec::new(),
        };

        Self {
            mode,
            channels,
            palette,
        }
    }

    /// Convert the crate's merged image to RGBA.
    pub fn merged_to_rgba(&self, mut pixels: Vec<u8>) -> Result<Vec<u8>, ColorError> {
        match self.mode {
            ColorMode::Cmyk if self.channels != 4 => {
                return Err(ColorError::CmykChannels(self.channels));
            }
            ColorMode::Cmyk => pixels.chunks_exact_mut(4).for_each(cmyk_pixel),
            ColorMode::Lab => pixels.chunks_exact_mut(4).for_each(lab_pixel),
            ColorMode::Duotone => pixels.chunks_exact_mut(4).for_each(|px| {
                px[1] = px[0];
                px[2] = px[0];
            }),
            ColorMode::Indexed => {
                for px in pixels.chunks_exact_mut(4) {
                    let index = px[0];
                    let rgb = self.palette.get(usize::from(index)).copied().unwrap_or([index; 3]);
                    px[..3].copy_from_slice(&rgb);
                    px[3] = 255;
                }
            }
            _ => {}
        }
        Ok(pixels)
    }

    /// Convert one of the crate's canvas-sized layer buffers to RGBA. Alpha is left alone.
    pub fn layer_to_rgba(&self, mut pixels: Vec<u8>) -> Vec<u8> {
        if self.mode == ColorMode::Lab {
            pixels.chunks_exact_mut(4).for_each(lab_pixel);
        }
        pixels
    }
}

/// 768 bytes after the header: 256 reds, then 256 greens, then 256 blues.
fn read_palette(bytes: &[u8]) -> Vec<[u8; 3]> {
    let length = bytes
        .get(26..30)
        .map_or(0, |b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]));
    if length < 768 {
        return Vec::new();
    }

    match bytes.get(30..30 + 768) {
        Some(table) => (0..256)
            .map(|i| [table[i], table[256 + i], table[512 + i]])
            .collect(),
        None => Vec::new(),
    }
}

/// Stored CMYK values are inverted (255 means no ink), so each color is its
/// own plate times the black plate. The crate hands black over in the alpha slot.
fn cmyk_pixel(px: &mut [u8]) {
    let k = u16::from(px[3]);
    for c in &mut px[..3] {
        *c = ((u16::from(*c) * k + 127) / 255) as u8;
    }
    px[3] = 255;
}

fn lab_pixel(px: &mut [u8]) {
    let rgb = lab_to_rgb(px[0], px[1], px[2]);
    px[..3].copy_from_slice(&rgb);
}

/// 8-bit Lab (L scaled to 0..=255, a and b offset by 128) to sRGB.
pub fn lab_to_rgb(l: u8, a: u8, b: u8) -> [u8; 3] {
    let l = f32::from(l) * 100.0 / 255.0;
    let a = f32::from(a) - 128.0;
    let b = f32::from(b) - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let xyz = [
        lab_f_inverse(fx) * D65_WHITE[0],
        lab_f_inverse(fy) * D65_WHITE[1],
        lab_f_inverse(fz) * D65_WHITE[2],
    ];

    let mut rgb = [0u8; 3];
    for (out, row) in rgb.iter_mut().zip(XYZ_TO_SRGB.iter()) {
        let linear = row[0] * xyz[0] + row[1] * xyz[1] + row[2] * xyz[2];
        *out = (srgb_gamma(linear).clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    rgb
}

fn lab_f_inverse(t: f32) -> f32 {
    let cube = t * t * t;
    if cube > 0.008856 {
        cube
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

fn srgb_gamma(linear: f32) -> f32 {
    if linear <= 0.0031308 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}
