//! Scrolling background: every manifest layer is tiled across the window and
//! drifts right at its own speed while a round is being played.

use dash_core::rect::Rect;

use crate::assets::BackgroundLayer;

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollLayer {
    /// Position in the manifest's background list.
    pub index: usize,
    pub speed: f32,
    pub offset: f32,
    pub width: f32,
    pub height: f32,
}

impl ScrollLayer {
    fn advance(&mut self) {
        self.offset += self.speed;
        if self.offset >= self.width {
            self.offset -= self.width;
        }
    }

    /// Destination rects covering a `window_w` x `window_h` area. Columns start
    /// one texture width left of the truncated offset so the seam never shows.
    pub fn tiles(&self, window_w: f32, window_h: f32) -> Vec<Rect> {
        let mut out = Vec::new();
        if self.width <= 0.0 || self.height <= 0.0 {
            return out;
        }
        let start_x = -self.width + self.offset.trunc();
        let mut y = 0.0;
        while y < window_h {
            let mut x = start_x;
            while x < window_w {
                out.push(Rect::new(x, y, self.width, self.height));
                x += self.width;
            }
            y += self.height;
        }
        out
    }
}

#[derive(Debug, Default)]
pub struct Parallax {
    layers: Vec<ScrollLayer>,
}

impl Parallax {
    /// Build from the manifest's layers. `size_of` reports the loaded texture
    /// size for a layer index; layers without a texture are left out.
    pub fn new<F>(layers: &[BackgroundLayer], size_of: F) -> Self
    where
        F: Fn(usize) -> Option<(u32, u32)>,
    {
        let layers = layers
            .iter()
            .enumerate()
            .filter_map(|(index, layer)| {
                let (w, h) = size_of(index)?;
                Some(ScrollLayer {
                    index,
                    speed: layer.speed,
                    offset: 0.0,
                    width: w as f32,
                    height: h as f32,
                })
            })
            .collect();
        Self { layers }
    }

    pub fn advance(&mut self) {
        for layer in &mut self.layers {
            layer.advance();
        }
    }

    pub fn layers(&self) -> &[ScrollLayer] {
        &self.layers
    }
}
