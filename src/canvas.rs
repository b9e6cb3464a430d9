use image::{imageops, RgbaImage};

/// Common output size for a "same canvas" export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// Grow to cover an image of the given size.
    pub fn include(&mut self, width: u32, height: u32) {
        self.width = self.width.max(width);
        self.height = self.height.max(height);
    }
}

/// Center `img` on a new transparent canvas of `width` x `height`.
///
/// The offset is floored, so an odd difference leaves the extra pixel on the
/// right/bottom. Images larger than the canvas stay centered and are clipped.
pub fn pad_to_canvas(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let mut canvas = RgbaImage::new(width, height);
    let (x, y) = centered_offset(img.dimensions(), (width, height));

    // Copy, not blend: transparent source pixels stay exactly as they were.
    imageops::replace(&mut canvas, img, x, y);
    canvas
}

fn centered_offset(image: (u32, u32), canvas: (u32, u32)) -> (i64, i64) {
    let x = (canvas.0 as i64 - image.0 as i64).div_euclid(2);
    let y = (canvas.1 as i64 - image.1 as i64).div_euclid(2);
    (x, y)
}
