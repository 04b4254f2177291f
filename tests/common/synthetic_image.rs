use image::{GrayImage, Luma};

pub fn uniform(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Dark square blocks of side `block` on a bright ground, one per `period`
/// cell, each centred in its cell. Returns the image and the block count.
pub fn dark_blocks(size: u32, period: u32, block: u32) -> (GrayImage, usize) {
    assert!(block < period, "blocks must not touch");
    let margin = (period - block) / 2;
    let img = GrayImage::from_fn(size, size, |x, y| {
        let inside = |v: u32| v % period >= margin && v % period < margin + block;
        if inside(x) && inside(y) {
            Luma([30])
        } else {
            Luma([220])
        }
    });
    let per_side = (size / period) as usize;
    (img, per_side * per_side)
}

/// Full-width dark band of `thickness` rows starting at row `top`.
pub fn dark_band(width: u32, height: u32, top: u32, thickness: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |_, y| {
        if y >= top && y < top + thickness {
            Luma([30])
        } else {
            Luma([220])
        }
    })
}

/// Deterministic noise-like texture.
pub fn texture(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([((x * 37 + y * 91 + x * y) % 200) as u8 + 30]))
}
