use std::fmt::{Debug, Formatter};

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use super::luminance::LuminanceSource;

// Binary image
//------------------------------------------------------------------------------

/// Strict black/white matrix produced by a binarizer. `true` is black.
#[derive(Clone, PartialEq, Eq)]
pub struct BinaryImage {
    buffer: Vec<bool>,
    pub w: u32,
    pub h: u32,
}

impl Debug for BinaryImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BinaryImage {{ w: {}, h: {}, black: {} }}", self.w, self.h, self.count_black())
    }
}

impl BinaryImage {
    pub fn new(w: u32, h: u32) -> Self {
        Self { buffer: vec![false; (w * h) as usize], w, h }
    }

    fn coord_to_index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.w && y < self.h, "Pixel ({x}, {y}) out of bounds");
        (y * self.w + x) as usize
    }

    pub fn is_black(&self, x: u32, y: u32) -> bool {
        self.buffer[self.coord_to_index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, black: bool) {
        let idx = self.coord_to_index(x, y);
        self.buffer[idx] = black;
    }

    pub fn count_black(&self) -> usize {
        self.buffer.iter().filter(|&&b| b).count()
    }

    pub fn inverted(&self) -> Self {
        Self { buffer: self.buffer.iter().map(|b| !b).collect(), w: self.w, h: self.h }
    }

    /// Crops to the bounding box of black pixels, keeping `margin` white pixels
    /// on every side. Returns `None` for an all-white image.
    pub fn crop_to_content(&self, margin: u32) -> Option<Self> {
        let (mut left, mut top, mut right, mut bottom) = (self.w, self.h, 0, 0);
        for y in 0..self.h {
            for x in 0..self.w {
                if self.is_black(x, y) {
                    left = left.min(x);
                    right = right.max(x);
                    top = top.min(y);
                    bottom = bottom.max(y);
                }
            }
        }
        if left > right {
            return None;
        }

        let (w, h) = (right - left + 1 + 2 * margin, bottom - top + 1 + 2 * margin);
        let mut res = Self::new(w, h);
        for y in top..=bottom {
            for x in left..=right {
                res.set(x - left + margin, y - top + margin, self.is_black(x, y));
            }
        }
        Some(res)
    }

    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.w, self.h, |x, y| {
            if self.is_black(x, y) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }
}

// Binarizer
//------------------------------------------------------------------------------

/// Thresholding strategy. Returns `None` when the source has too little
/// contrast to hold a code.
pub trait Binarizer {
    fn name(&self) -> &'static str;
    fn binarize(&self, src: &LuminanceSource) -> Option<BinaryImage>;
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinarizerKind {
    Hybrid,
    GlobalHistogram,
}

impl Binarizer for BinarizerKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Hybrid => HybridBinarizer.name(),
            Self::GlobalHistogram => GlobalHistogramBinarizer.name(),
        }
    }

    fn binarize(&self, src: &LuminanceSource) -> Option<BinaryImage> {
        match self {
            Self::Hybrid => HybridBinarizer.binarize(src),
            Self::GlobalHistogram => GlobalHistogramBinarizer.binarize(src),
        }
    }
}

// Hybrid (adaptive local threshold) binarizer
// Steps:
// 1. Divides image into blocks of 8x8 pixels. The last fractional block on each
//    edge is aligned to the edge, so a few pixels overlap into 2 blocks
// 2. Calculates average of each block. Low contrast blocks (max - min <= 24)
//    are assumed to be background unless their top/left neighbours are darker
// 3. Calculates the threshold for each block by averaging the 5x5 blocks
//    around it
// 4. Marks a pixel black if its value is less than or equal to the threshold
// Images smaller than 40 pixels in either dimension use the global histogram.
//------------------------------------------------------------------------------

const BLOCK_SIZE_POWER: u32 = 3;
const BLOCK_SIZE: u32 = 1 << BLOCK_SIZE_POWER;
const MINIMUM_DIMENSION: u32 = BLOCK_SIZE * 5;
const MIN_DYNAMIC_RANGE: u8 = 24;

#[derive(Debug, Clone, Copy, Default)]
pub struct HybridBinarizer;

impl Binarizer for HybridBinarizer {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn binarize(&self, src: &LuminanceSource) -> Option<BinaryImage> {
        let (w, h) = (src.width(), src.height());
        if w < MINIMUM_DIMENSION || h < MINIMUM_DIMENSION {
            return GlobalHistogramBinarizer.binarize(src);
        }

        let wsteps = w.div_ceil(BLOCK_SIZE) as usize;
        let hsteps = h.div_ceil(BLOCK_SIZE) as usize;
        let blk_avg = calculate_block_average(src, wsteps, hsteps);
        Some(apply_threshold(src, &blk_avg, wsteps, hsteps))
    }
}

fn block_offset(step: usize, len: u32) -> u32 {
    ((step as u32) << BLOCK_SIZE_POWER).min(len - BLOCK_SIZE)
}

fn calculate_block_average(src: &LuminanceSource, wsteps: usize, hsteps: usize) -> Vec<u32> {
    let (w, h) = (src.width(), src.height());
    let mut avg = vec![0u32; wsteps * hsteps];

    for y in 0..hsteps {
        let yoff = block_offset(y, h);
        for x in 0..wsteps {
            let xoff = block_offset(x, w) as usize;
            let (mut sum, mut mn, mut mx) = (0u32, u8::MAX, u8::MIN);
            for yy in yoff..yoff + BLOCK_SIZE {
                for &p in &src.row(yy)[xoff..xoff + BLOCK_SIZE as usize] {
                    sum += p as u32;
                    mn = mn.min(p);
                    mx = mx.max(p);
                }
            }

            let i = y * wsteps + x;
            // Convert 8x8 sum to average (divide by 64)
            avg[i] = sum >> (2 * BLOCK_SIZE_POWER);
            if mx - mn <= MIN_DYNAMIC_RANGE {
                avg[i] = mn as u32 / 2;
                if y > 0 && x > 0 {
                    // Average of neighbors (x, y-1), (x-1, y), (x-1, y-1)
                    let ng_avg =
                        (avg[i - wsteps] + 2 * avg[i - 1] + avg[i - wsteps - 1]) / 4;
                    if (mn as u32) < ng_avg {
                        avg[i] = ng_avg;
                    }
                }
            }
        }
    }
    avg
}

fn apply_threshold(
    src: &LuminanceSource,
    avg: &[u32],
    wsteps: usize,
    hsteps: usize,
) -> BinaryImage {
    let (w, h) = (src.width(), src.height());
    let (maxx, maxy) = (wsteps - 3, hsteps - 3);
    let mut res = BinaryImage::new(w, h);

    for y in 0..hsteps {
        let yoff = block_offset(y, h);
        let cy = y.clamp(2, maxy);
        for x in 0..wsteps {
            let xoff = block_offset(x, w);
            let cx = x.clamp(2, maxx);

            let mut sum = 0u32;
            for ny in cy - 2..=cy + 2 {
                let ni = ny * wsteps + cx;
                sum += avg[ni - 2..=ni + 2].iter().sum::<u32>();
            }
            let thresh = sum / 25;

            for yy in yoff..yoff + BLOCK_SIZE {
                for xx in xoff..xoff + BLOCK_SIZE {
                    res.set(xx, yy, src.get(xx, yy) as u32 <= thresh);
                }
            }
        }
    }
    res
}

// Global histogram binarizer
// Builds a 32 bucket histogram from four rows across the centre of the image,
// finds the two tallest peaks and picks the deepest valley between them as
// the black point. Every pixel darker than the black point is black.
//------------------------------------------------------------------------------

const LUMINANCE_BITS: u32 = 5;
const LUMINANCE_SHIFT: u32 = 8 - LUMINANCE_BITS;
const LUMINANCE_BUCKETS: usize = 1 << LUMINANCE_BITS;

#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalHistogramBinarizer;

impl Binarizer for GlobalHistogramBinarizer {
    fn name(&self) -> &'static str {
        "global-histogram"
    }

    fn binarize(&self, src: &LuminanceSource) -> Option<BinaryImage> {
        let (w, h) = (src.width(), src.height());

        let mut buckets = [0u32; LUMINANCE_BUCKETS];
        for y in 1..5 {
            let row = src.row(h * y / 5);
            let (left, right) = ((w / 5) as usize, (w * 4 / 5) as usize);
            for &p in &row[left..right] {
                buckets[(p >> LUMINANCE_SHIFT) as usize] += 1;
            }
        }
        let black_point = estimate_black_point(&buckets)?;

        let mut res = BinaryImage::new(w, h);
        for y in 0..h {
            for (x, &p) in src.row(y).iter().enumerate() {
                if (p as u32) < black_point {
                    res.set(x as u32, y, true);
                }
            }
        }
        Some(res)
    }
}

fn estimate_black_point(buckets: &[u32; LUMINANCE_BUCKETS]) -> Option<u32> {
    let mut max_count = 0;
    let (mut first_peak, mut first_peak_sz) = (0, 0);
    for (x, &count) in buckets.iter().enumerate() {
        if count > first_peak_sz {
            first_peak = x;
            first_peak_sz = count;
        }
        max_count = max_count.max(count);
    }

    // Second peak favours buckets far from the first one
    let (mut second_peak, mut second_peak_score) = (0, 0u64);
    for (x, &count) in buckets.iter().enumerate() {
        let dist = x.abs_diff(first_peak) as u64;
        let score = count as u64 * dist * dist;
        if score > second_peak_score {
            second_peak = x;
            second_peak_score = score;
        }
    }

    if first_peak > second_peak {
        std::mem::swap(&mut first_peak, &mut second_peak);
    }

    // Peaks too close together: not enough contrast to hold a code
    if second_peak - first_peak <= LUMINANCE_BUCKETS / 16 {
        return None;
    }

    let (mut best_valley, mut best_valley_score) = (second_peak - 1, -1i64);
    for x in (first_peak + 1..second_peak).rev() {
        let from_first = (x - first_peak) as i64;
        let score = from_first
            * from_first
            * (second_peak - x) as i64
            * (max_count - buckets[x]) as i64;
        if score > best_valley_score {
            best_valley = x;
            best_valley_score = score;
        }
    }

    Some((best_valley as u32) << LUMINANCE_SHIFT)
}

#[cfg(test)]
mod binarize_tests {
    use test_case::test_case;

    use super::{
        estimate_black_point, Binarizer, BinarizerKind, BinaryImage, GlobalHistogramBinarizer,
        HybridBinarizer, LUMINANCE_BUCKETS,
    };
    use crate::reader::luminance::LuminanceSource;

    fn solid(w: u32, h: u32, v: u8) -> LuminanceSource {
        LuminanceSource::new(w, h, vec![v; (w * h) as usize]).unwrap()
    }

    /// Left half `dark`, right half `light`
    fn split(w: u32, h: u32, dark: u8, light: u8) -> LuminanceSource {
        let luma = (0..w * h).map(|i| if i % w < w / 2 { dark } else { light }).collect();
        LuminanceSource::new(w, h, luma).unwrap()
    }

    #[test]
    fn test_black_point_bimodal() {
        let mut buckets = [0u32; LUMINANCE_BUCKETS];
        buckets[2] = 100;
        buckets[28] = 150;
        let bp = estimate_black_point(&buckets).unwrap();
        assert!(2 << 3 < bp && bp < 28 << 3, "black point was {bp}");
    }

    #[test]
    fn test_black_point_close_peaks() {
        let mut buckets = [0u32; LUMINANCE_BUCKETS];
        buckets[10] = 100;
        buckets[12] = 100;
        assert_eq!(estimate_black_point(&buckets), None);
    }

    #[test]
    fn test_black_point_single_peak() {
        let mut buckets = [0u32; LUMINANCE_BUCKETS];
        buckets[0] = 100;
        assert_eq!(estimate_black_point(&buckets), None);
    }

    #[test]
    fn test_global_histogram_split() {
        let src = split(100, 100, 20, 230);
        let img = GlobalHistogramBinarizer.binarize(&src).unwrap();
        assert!(img.is_black(0, 0));
        assert!(img.is_black(49, 99));
        assert!(!img.is_black(50, 0));
        assert_eq!(img.count_black(), 50 * 100);
    }

    #[test]
    fn test_global_histogram_low_contrast() {
        // 100 and 124 land 3 buckets apart, enough for the global threshold
        let src = split(100, 100, 100, 124);
        let img = GlobalHistogramBinarizer.binarize(&src).unwrap();
        assert_eq!(img.count_black(), 50 * 100);
    }

    #[test]
    fn test_hybrid_low_contrast_is_blank() {
        // Every block spans at most 24 levels, so the adaptive threshold treats
        // the whole image as background
        let src = split(100, 100, 100, 124);
        let img = HybridBinarizer.binarize(&src).unwrap();
        assert_eq!(img.count_black(), 0);
    }

    #[test]
    fn test_hybrid_split() {
        let src = split(96, 96, 10, 240);
        let img = HybridBinarizer.binarize(&src).unwrap();
        // Flat dark areas far from any edge read as background, only blocks
        // near the transition keep their dark pixels
        assert!(img.is_black(35, 10));
        assert!(img.is_black(47, 90));
        assert!(!img.is_black(10, 10));
        assert!(!img.is_black(48, 10));
        assert!(!img.is_black(95, 95));
    }

    #[test]
    fn test_hybrid_small_image_uses_global() {
        let src = split(20, 20, 20, 230);
        let hybrid = HybridBinarizer.binarize(&src).unwrap();
        let global = GlobalHistogramBinarizer.binarize(&src).unwrap();
        assert_eq!(hybrid, global);
    }

    #[test_case(BinarizerKind::Hybrid; "hybrid")]
    #[test_case(BinarizerKind::GlobalHistogram; "global histogram")]
    fn test_solid_image_has_no_black(kind: BinarizerKind) {
        let src = solid(64, 48, 200);
        let black = kind.binarize(&src).map_or(0, |img| img.count_black());
        assert_eq!(black, 0);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(BinarizerKind::Hybrid.name(), "hybrid");
        assert_eq!(BinarizerKind::GlobalHistogram.name(), "global-histogram");
    }

    #[test]
    fn test_crop_to_content() {
        let mut img = BinaryImage::new(10, 10);
        img.set(3, 4, true);
        img.set(5, 6, true);
        let crop = img.crop_to_content(2).unwrap();
        assert_eq!((crop.w, crop.h), (7, 7));
        assert!(crop.is_black(2, 2));
        assert!(crop.is_black(4, 4));
        assert_eq!(crop.count_black(), 2);

        assert_eq!(BinaryImage::new(4, 4).crop_to_content(1), None);
    }

    #[test]
    fn test_inverted() {
        let mut img = BinaryImage::new(2, 1);
        img.set(0, 0, true);
        let inv = img.inverted();
        assert!(!inv.is_black(0, 0));
        assert!(inv.is_black(1, 0));
    }
}
