/// Binary image with the dimensions of its source image. Foreground is 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Mask {
        Mask {
            width,
            height,
            data: vec![0u8; width as usize * height as usize],
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Mask
    where
        F: Fn(u32, u32) -> bool,
    {
        let mut mask = Mask::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    pub(crate) fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Mask {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Mask {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels, foreground or not.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[self.index(x, y)] != 0
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let index = self.index(x, y);
        self.data[index] = value as u8;
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Fraction of foreground pixels; 0 for an empty mask.
    pub fn fraction(&self) -> f64 {
        if self.data.is_empty() {
            0.0
        } else {
            self.count() as f64 / self.data.len() as f64
        }
    }

    pub fn invert(&self) -> Mask {
        Mask::from_raw(
            self.width,
            self.height,
            self.data.iter().map(|&v| (v == 0) as u8).collect(),
        )
    }

    /// Clears every pixel that is foreground in `other`.
    pub fn subtract(&mut self, other: &Mask) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        for (v, &o) in self.data.iter_mut().zip(other.data.iter()) {
            if o != 0 {
                *v = 0;
            }
        }
    }

    /// True when no pixel is foreground in both masks.
    pub fn is_disjoint(&self, other: &Mask) -> bool {
        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(&a, &b)| a == 0 || b == 0)
    }
}
