use image::{GrayImage, Luma};
use qrcodegen::QrCode;

pub const DARK: Luma<u8> = Luma([0]);
pub const LIGHT: Luma<u8> = Luma([255]);

// Module grid
//------------------------------------------------------------------------------

/// Square matrix of modules as returned by the codec, `true` for dark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleGrid {
    width: usize,
    grid: Vec<bool>,
}

impl ModuleGrid {
    pub fn from_code(code: &QrCode) -> Self {
        let width = code.size() as usize;
        let mut grid = Vec::with_capacity(width * width);
        for r in 0..width as i32 {
            for c in 0..width as i32 {
                grid.push(code.get_module(c, r));
            }
        }
        Self { width, grid }
    }

    #[cfg(test)]
    pub fn from_fn(width: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        let grid = (0..width * width).map(|i| f(i / width, i % width)).collect();
        Self { width, grid }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, r: usize, c: usize) -> bool {
        self.grid[r * self.width + c]
    }
}

// Render
//------------------------------------------------------------------------------

/// Rasterizes the grid onto a square canvas of at least `size` pixels.
///
/// The symbol plus its quiet zone is scaled by the largest integer factor that
/// fits, then centred. If the symbol cannot fit at 1:1 the canvas grows to the
/// symbol size instead.
pub fn render(grid: &ModuleGrid, size: u32, quiet_zone: u32) -> GrayImage {
    let qr_w = grid.width() as u32;
    let input_w = qr_w + 2 * quiet_zone;
    let output_w = size.max(input_w);
    let module_size = output_w / input_w;
    let padding = (output_w - input_w * module_size) / 2 + quiet_zone * module_size;

    let mut canvas = GrayImage::from_pixel(output_w, output_w, LIGHT);
    for r in 0..qr_w {
        for c in 0..qr_w {
            if !grid.is_dark(r as usize, c as usize) {
                continue;
            }
            let (top, left) = (padding + r * module_size, padding + c * module_size);
            for i in top..top + module_size {
                for j in left..left + module_size {
                    canvas.put_pixel(j, i, DARK);
                }
            }
        }
    }
    canvas
}

/// Renders the grid as text, two characters per module so the symbol stays
/// square in a terminal. Light modules are drawn as blocks, meant for dark
/// terminal backgrounds.
pub fn to_str(grid: &ModuleGrid, quiet_zone: usize) -> String {
    let total = grid.width() + 2 * quiet_zone;
    let qr_range = quiet_zone..quiet_zone + grid.width();

    let mut canvas = String::with_capacity(total * (total * 2 + 1) * 3);
    for i in 0..total {
        for j in 0..total {
            let dark = qr_range.contains(&i)
                && qr_range.contains(&j)
                && grid.is_dark(i - quiet_zone, j - quiet_zone);
            canvas.push_str(if dark { "  " } else { "██" });
        }
        canvas.push('\n');
    }
    canvas
}
