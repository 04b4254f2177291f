use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::error::{Error, Result};
use crate::mask::Mask;

/// Square, all-ones structuring element anchored at its centre.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
}

lazy_static! {
    static ref KERNELS: HashMap<u32, StructuringElement> = [3u32, 5, 7, 9, 11]
        .iter()
        .map(|&size| (size, StructuringElement { size }))
        .collect();
}

impl StructuringElement {
    /// Shared element of the given side length; only 3, 5, 7, 9 and 11 exist.
    pub fn square(size: u32) -> Result<&'static StructuringElement> {
        KERNELS.get(&size).ok_or_else(|| {
            Error::InvalidParameter(format!("unsupported structuring element size {}", size))
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn radius(&self) -> usize {
        (self.size / 2) as usize
    }
}

#[derive(Debug, Copy, Clone)]
enum Op {
    Erode,
    Dilate,
}

/* one 1-D pass over every line of the buffer; pixels past either end are ignored */
#[allow(clippy::too_many_arguments)]
fn filter_lines(
    src: &[u8],
    dst: &mut [u8],
    lines: usize,
    len: usize,
    step: usize,
    line_step: usize,
    radius: usize,
    op: Op,
) {
    if len == 0 {
        return;
    }
    let mut prefix = vec![0u32; len + 1];
    for line in 0..lines {
        let base = line * line_step;
        for i in 0..len {
            prefix[i + 1] = prefix[i] + (src[base + i * step] != 0) as u32;
        }
        for i in 0..len {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(len - 1);
            let n = prefix[hi + 1] - prefix[lo];
            let on = match op {
                Op::Erode => n as usize == hi - lo + 1,
                Op::Dilate => n > 0,
            };
            dst[base + i * step] = on as u8;
        }
    }
}

fn apply(mask: &Mask, se: &StructuringElement, op: Op) -> Mask {
    let (width, height) = (mask.width() as usize, mask.height() as usize);
    let radius = se.radius();

    let mut rows = vec![0u8; mask.len()];
    filter_lines(mask.as_raw(), &mut rows, height, width, 1, width, radius, op);

    let mut out = vec![0u8; mask.len()];
    filter_lines(&rows, &mut out, width, height, width, 1, radius, op);

    Mask::from_raw(mask.width(), mask.height(), out)
}

pub fn erode(mask: &Mask, se: &StructuringElement) -> Mask {
    apply(mask, se, Op::Erode)
}

pub fn dilate(mask: &Mask, se: &StructuringElement) -> Mask {
    apply(mask, se, Op::Dilate)
}

/// Erosion followed by dilation: removes foreground specks smaller than `se`.
pub fn open(mask: &Mask, se: &StructuringElement) -> Mask {
    dilate(&erode(mask, se), se)
}

/// Dilation followed by erosion: fills background gaps smaller than `se`.
pub fn close(mask: &Mask, se: &StructuringElement) -> Mask {
    erode(&dilate(mask, se), se)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: u32) -> &'static StructuringElement {
        StructuringElement::square(size).unwrap()
    }

    #[test]
    fn only_odd_sizes_up_to_eleven_exist() {
        for size in &[3, 5, 7, 9, 11] {
            assert_eq!(square(*size).size(), *size);
        }
        assert!(StructuringElement::square(4).is_err());
        assert!(StructuringElement::square(13).is_err());
    }

    #[test]
    fn opening_removes_small_blob_and_keeps_large_one() {
        let mask = Mask::from_fn(40, 40, |x, y| {
            (x >= 2 && x < 4 && y >= 2 && y < 4) || (x >= 15 && x < 30 && y >= 15 && y < 30)
        });
        let opened = open(&mask, square(3));
        assert!(!opened.get(2, 2));
        assert_eq!(opened.count(), 15 * 15);
    }

    #[test]
    fn closing_fills_small_hole() {
        let mask = Mask::from_fn(20, 20, |x, y| !(x == 10 && y == 10));
        let closed = close(&mask, square(3));
        assert_eq!(closed.count(), 400);
    }

    #[test]
    fn border_pixels_are_ignored() {
        let full = Mask::from_fn(5, 5, |_, _| true);
        assert_eq!(erode(&full, square(9)).count(), 25);
        let empty = Mask::new(5, 5);
        assert_eq!(dilate(&empty, square(9)).count(), 0);
    }

    #[test]
    fn dilation_grows_by_radius() {
        let dot = Mask::from_fn(11, 11, |x, y| x == 5 && y == 5);
        let grown = dilate(&dot, square(5));
        assert_eq!(grown.count(), 25);
        assert!(grown.get(3, 7));
        assert!(!grown.get(2, 5));
    }
}
