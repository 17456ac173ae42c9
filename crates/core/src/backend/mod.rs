use std::sync::Arc;

use image::RgbaImage;

use crate::errors::FindError;
use crate::geometry::{Location, Rect};
use crate::logger;

pub mod stub;

#[cfg(feature = "desktop")]
pub mod desktop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Middle,
    Right,
}

impl Button {
    /// Bit used in the held-buttons bookkeeping.
    pub fn mask(self) -> u8 {
        match self {
            Button::Left => 1,
            Button::Middle => 2,
            Button::Right => 4,
        }
    }
}

/// Capture side of the desktop. `rect` is display-local and already
/// clipped by the caller.
pub trait ScreenBackend: Send + Sync {
    /// Bounds of every attached display, in global coordinates.
    fn displays(&self) -> Vec<Rect>;

    fn capture(&self, display: usize, rect: Rect) -> Result<RgbaImage, FindError>;
}

/// Input side of the desktop. Coordinates are global.
pub trait InputBackend: Send + Sync {
    fn move_to(&self, loc: Location);
    fn mouse_down(&self, button: Button);
    fn mouse_up(&self, button: Button);
    fn tap(&self, key: &str);
    fn type_text(&self, text: &str);
}

/// Create the screen and input backends for this process.
///
/// With the `desktop` feature the real backends are used unless
/// `force_stub` is set; otherwise the logging stub is the only option.
pub fn create_backend(force_stub: bool) -> (Arc<dyn ScreenBackend>, Arc<dyn InputBackend>) {
    logger::register_prefix("stub", logger::COLOR_GRAY);
    logger::register_prefix("desktop", logger::COLOR_BLUE);
    logger::register_prefix("find", logger::COLOR_BLUE);
    logger::register_prefix("observe", logger::COLOR_GRAY);

    #[cfg(feature = "desktop")]
    {
        if !force_stub {
            logger::info_p("desktop", "using native screen/input backend");
            let backend = Arc::new(desktop::DesktopBackend::new());
            return (backend.clone(), backend);
        }
    }

    if !force_stub {
        logger::warn_p("stub", "desktop feature not compiled in, using stub backend");
    }
    let backend = Arc::new(stub::StubBackend::new());
    (backend.clone(), backend)
}
