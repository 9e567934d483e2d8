//! Procedural texture providers.
//!
//! A provider turns a kind name and a size into an RGBA8 pixel buffer. The
//! engine treats the result exactly like a decoded image file.

/// Source of generated pixels. Must return `width * height * 4` bytes.
pub trait TextureProvider: Send + Sync {
    fn generate(&self, kind: &str, width: u32, height: u32) -> Vec<u8>;
}

/// Two-tone checker pattern, `cells` squares per side.
///
/// `kind` picks the palette: "wood", "tiles", anything else is gray.
#[derive(Clone, Debug)]
pub struct Checkerboard {
    pub cells: u32,
}

impl Default for Checkerboard {
    fn default() -> Self {
        Self { cells: 8 }
    }
}

impl Checkerboard {
    fn palette(kind: &str) -> ([u8; 4], [u8; 4]) {
        match kind {
            "wood" => ([133, 94, 66, 255], [160, 116, 84, 255]),
            "tiles" => ([230, 230, 225, 255], [70, 90, 110, 255]),
            _ => ([110, 110, 110, 255], [170, 170, 170, 255]),
        }
    }
}

impl TextureProvider for Checkerboard {
    fn generate(&self, kind: &str, width: u32, height: u32) -> Vec<u8> {
        let (dark, light) = Self::palette(kind);
        let cells = self.cells.max(1);
        let cell_w = (width / cells).max(1);
        let cell_h = (height / cells).max(1);
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let colour = if (x / cell_w + y / cell_h) % 2 == 0 {
                    dark
                } else {
                    light
                };
                rgba.extend_from_slice(&colour);
            }
        }
        rgba
    }
}
