use std::convert::Infallible;

use frameserv_server::{FrameSource, RenderedFrame};

/// Synthetic animated frames: a gradient with a bar that moves one step per frame.
///
/// The first buffer row is the bottom of the picture, like a real renderer's.
pub struct TestPattern {
    width: u32,
    height: u32,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn pixel(&self, x: u32, y_from_top: u32, frame: i32) -> [u8; 4] {
        let bar = (frame.rem_euclid(self.width as i32)) as u32;
        if x == bar {
            return [255, 255, 255, 255];
        }
        let r = (x * 255 / self.width.max(1)) as u8;
        let g = (y_from_top * 255 / self.height.max(1)) as u8;
        let b = (frame.rem_euclid(256)) as u8;
        [r, g, b, 255]
    }
}

impl FrameSource for TestPattern {
    type Error = Infallible;

    fn render(&mut self, frame: i32) -> Result<RenderedFrame, Infallible> {
        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        for row in 0..self.height {
            let y_from_top = self.height - 1 - row;
            for x in 0..self.width {
                pixels.extend_from_slice(&self.pixel(x, y_from_top, frame));
            }
        }
        Ok(RenderedFrame {
            pixels,
            width: self.width,
            height: self.height,
        })
    }
}
