//! PSD loader
//!
//! Turns one PSD file into an RGBA raster ready for padding and PNG export.
//! Parsing is done by the `psd` crate. Reading never writes anything.

use crate::color::{ColorError, ColorInfo};
use crate::composite::composite_layers;
use crate::error::ExportError;
use image::RgbaImage;
use psd::{Psd, PsdDepth};
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
enum DecodeFailure {
    #[error("{0}")]
    Psd(#[from] psd::PsdError),

    #[error("unsupported bit depth {0} (only 8-bit documents can be decoded)")]
    Depth(u8),

    #[error(transparent)]
    Color(#[from] ColorError),

    #[error("document has no layers to composite")]
    NoLayers,

    #[error("PSD decoder panicked: {0}")]
    Panic(String),
}

/// Load a PSD as a single RGBA image.
///
/// With `flatten` the visible layers are composited, falling back to the merged
/// image Photoshop saved. Without it the saved merged image is used, falling back
/// to compositing the layers. Documents without transparency come back fully opaque.
pub fn load_composited(path: &Path, flatten: bool) -> Result<RgbaImage, ExportError> {
    let file = display_name(path);
    let decode_error = |message: String| ExportError::Decode {
        file: file.clone(),
        message,
    };

    let bytes = fs::read(path).map_err(|e| decode_error(format!("IO error: {}", e)))?;
    let (width, height, pixels) = decode(&bytes, flatten).map_err(|e| decode_error(e.to_string()))?;

    log::debug!("Decoded {} ({}x{}, flatten={})", file, width, height, flatten);

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| decode_error("decoded pixel buffer does not match document size".to_string()))
}

fn decode(bytes: &[u8], flatten: bool) -> Result<(u32, u32, Vec<u8>), DecodeFailure> {
    type Render = fn(&Psd, &ColorInfo) -> Result<Vec<u8>, DecodeFailure>;

    let psd = guarded(|| Ok(Psd::from_bytes(bytes)?))?;

    // The crate mis-decodes or panics on anything but 8-bit samples.
    let depth = psd.depth();
    if depth != PsdDepth::Eight {
        return Err(DecodeFailure::Depth(depth as u8));
    }
    let color = ColorInfo::read(bytes, psd.color_mode());

    let (primary, fallback): (Render, Render) = if flatten {
        (render_layers, render_merged)
    } else {
        (render_merged, render_layers)
    };

    let pixels = match guarded(|| primary(&psd, &color)) {
        Ok(pixels) => pixels,
        Err(primary_err) => {
            log::debug!("Primary render failed ({}), trying fallback", primary_err);
            guarded(|| fallback(&psd, &color)).map_err(|_| primary_err)?
        }
    };

    Ok((psd.width(), psd.height(), pixels))
}

fn render_merged(psd: &Psd, color: &ColorInfo) -> Result<Vec<u8>, DecodeFailure> {
    Ok(color.merged_to_rgba(psd.rgba())?)
}

fn render_layers(psd: &Psd, color: &ColorInfo) -> Result<Vec<u8>, DecodeFailure> {
    if psd.layers().is_empty() {
        return Err(DecodeFailure::NoLayers);
    }
    Ok(composite_layers(psd, color))
}

/// Runs `f`, turning a panic inside the `psd` crate into an error.
fn guarded<T>(f: impl FnOnce() -> Result<T, DecodeFailure>) -> Result<T, DecodeFailure> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(DecodeFailure::Panic(panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown cause".to_string()
    }
}

/// File name used in log lines and error messages.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
