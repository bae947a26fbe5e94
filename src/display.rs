//! Pixel presentation
//!
//! [`Surface`] is the seam between the render loop and the windowing
//! backend: a fixed-size 32-bit pixel buffer that can be flushed to screen,
//! plus window event handling. The production implementation draws into a
//! minifb window; tests substitute a recording stub.

use minifb::{Key, Window, WindowOptions};
use tracing::debug;

use crate::Result;

/// A presentation target for the decoded frame.
///
/// The frame is passed in RGBA8888 layout, one `u32` per pixel, row-major,
/// exactly `width * height` pixels.
pub trait Surface {
    /// Flush the frame to the screen. Also pumps window events.
    fn present(&mut self, pixels: &[u32]) -> Result<()>;

    /// Pump window events without presenting. Needed so close requests are
    /// still noticed while no rendering takes place.
    fn pump(&mut self) -> Result<()>;

    /// Whether the user asked to quit (window closed or Escape pressed).
    fn quit_requested(&self) -> bool;
}

/// minifb-backed window surface.
pub struct WindowSurface {
    window: Window,
    width: usize,
    height: usize,
    /// Scratch buffer for the RGBA -> 0RGB conversion minifb expects.
    converted: Vec<u32>,
}

impl WindowSurface {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(title, width, height, WindowOptions::default())?;
        // The render loop paces itself (playback pacer + minimal render
        // pause), so minifb's own frame limiter must not add sleeps.
        window.set_target_fps(0);
        debug!("Opened {}x{} window", width, height);
        Ok(Self {
            window,
            width,
            height,
            converted: vec![0; width * height],
        })
    }
}

impl Surface for WindowSurface {
    fn present(&mut self, pixels: &[u32]) -> Result<()> {
        // minifb interprets the buffer as 0RGB; drop the alpha byte.
        for (out, &pixel) in self.converted.iter_mut().zip(pixels) {
            *out = pixel >> 8;
        }
        self.window
            .update_with_buffer(&self.converted, self.width, self.height)?;
        Ok(())
    }

    fn pump(&mut self) -> Result<()> {
        self.window.update();
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        !self.window.is_open() || self.window.is_key_down(Key::Escape)
    }
}
