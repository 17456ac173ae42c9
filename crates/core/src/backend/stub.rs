use image::{Rgba, RgbaImage};

use crate::errors::FindError;
use crate::geometry::{Location, Rect};
use crate::logger;

use super::{Button, InputBackend, ScreenBackend};

/// Backend that logs every operation instead of touching the desktop.
/// Used for dry runs, headless environments and tests.
pub struct StubBackend {
    displays: Vec<Rect>,
}

impl StubBackend {
    /// Single 1920x1080 display at the origin.
    pub fn new() -> Self {
        Self { displays: vec![Rect::new(0, 0, 1920, 1080)] }
    }

    pub fn with_displays(displays: Vec<Rect>) -> Self {
        Self { displays }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenBackend for StubBackend {
    fn displays(&self) -> Vec<Rect> {
        self.displays.clone()
    }

    fn capture(&self, display: usize, rect: Rect) -> Result<RgbaImage, FindError> {
        logger::debug_p("stub", &format!("capture display {} {}", display, rect));
        if display >= self.displays.len() {
            return Err(FindError::Capture(format!("no display {}", display)));
        }
        if rect.is_empty() {
            return Err(FindError::Capture(format!("empty capture rect {}", rect)));
        }
        // solid mid-gray frame; tests script the matcher, not the pixels
        Ok(RgbaImage::from_pixel(
            rect.w as u32,
            rect.h as u32,
            Rgba([128, 128, 128, 255]),
        ))
    }
}

impl InputBackend for StubBackend {
    fn move_to(&self, loc: Location) {
        logger::info_p("stub", &format!("move_to {}", loc));
    }

    fn mouse_down(&self, button: Button) {
        logger::info_p("stub", &format!("mouse_down {:?}", button));
    }

    fn mouse_up(&self, button: Button) {
        logger::info_p("stub", &format!("mouse_up {:?}", button));
    }

    fn tap(&self, key: &str) {
        logger::info_p("stub", &format!("tap '{}'", key));
    }

    fn type_text(&self, text: &str) {
        logger::info_p("stub", &format!("type_text '{}'", text));
    }
}
