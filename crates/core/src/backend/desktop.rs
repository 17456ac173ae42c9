use std::sync::Mutex;

use enigo::{Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings as EnigoSettings};
use image::RgbaImage;
use xcap::Monitor;

use crate::errors::FindError;
use crate::geometry::{Location, Rect};
use crate::logger;

use super::{Button, InputBackend, ScreenBackend};

/// Real desktop backend: xcap for capture, enigo for input.
pub struct DesktopBackend {
    enigo: Mutex<Option<Enigo>>,
}

impl DesktopBackend {
    pub fn new() -> Self {
        let enigo = match Enigo::new(&EnigoSettings::default()) {
            Ok(e) => Some(e),
            Err(e) => {
                logger::error_p("desktop", &format!("input unavailable: {}", e));
                None
            }
        };
        Self { enigo: Mutex::new(enigo) }
    }

    fn with_enigo(&self, f: impl FnOnce(&mut Enigo)) {
        if let Some(enigo) = self.enigo.lock().unwrap().as_mut() {
            f(enigo);
        }
    }
}

impl Default for DesktopBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenBackend for DesktopBackend {
    fn displays(&self) -> Vec<Rect> {
        match Monitor::all() {
            Ok(monitors) => monitors
                .iter()
                .map(|m| Rect::new(m.x(), m.y(), m.width() as i32, m.height() as i32))
                .collect(),
            Err(e) => {
                logger::error_p("desktop", &format!("monitor enumeration failed: {}", e));
                Vec::new()
            }
        }
    }

    fn capture(&self, display: usize, rect: Rect) -> Result<RgbaImage, FindError> {
        let monitors =
            Monitor::all().map_err(|e| FindError::Capture(format!("monitors: {}", e)))?;
        let monitor = monitors
            .get(display)
            .ok_or_else(|| FindError::Capture(format!("no display {}", display)))?;
        let frame = monitor
            .capture_image()
            .map_err(|e| FindError::Capture(format!("capture: {}", e)))?;
        if rect.x < 0
            || rect.y < 0
            || rect.is_empty()
            || rect.right() > frame.width() as i32
            || rect.bottom() > frame.height() as i32
        {
            return Err(FindError::Capture(format!(
                "rect {} outside frame {}x{}",
                rect,
                frame.width(),
                frame.height()
            )));
        }
        Ok(image::imageops::crop_imm(
            &frame,
            rect.x as u32,
            rect.y as u32,
            rect.w as u32,
            rect.h as u32,
        )
        .to_image())
    }
}

fn to_enigo_button(button: Button) -> enigo::Button {
    match button {
        Button::Left => enigo::Button::Left,
        Button::Middle => enigo::Button::Middle,
        Button::Right => enigo::Button::Right,
    }
}

fn named_key(name: &str) -> Option<Key> {
    match name.to_ascii_lowercase().as_str() {
        "enter" | "return" => Some(Key::Return),
        "tab" => Some(Key::Tab),
        "esc" | "escape" => Some(Key::Escape),
        "space" => Some(Key::Space),
        "backspace" => Some(Key::Backspace),
        "delete" => Some(Key::Delete),
        "up" => Some(Key::UpArrow),
        "down" => Some(Key::DownArrow),
        "left" => Some(Key::LeftArrow),
        "right" => Some(Key::RightArrow),
        "home" => Some(Key::Home),
        "end" => Some(Key::End),
        "pageup" => Some(Key::PageUp),
        "pagedown" => Some(Key::PageDown),
        _ => None,
    }
}

impl InputBackend for DesktopBackend {
    fn move_to(&self, loc: Location) {
        self.with_enigo(|e| {
            if let Err(err) = e.move_mouse(loc.x, loc.y, Coordinate::Abs) {
                logger::error_p("desktop", &format!("move_to {}: {}", loc, err));
            }
        });
    }

    fn mouse_down(&self, button: Button) {
        self.with_enigo(|e| {
            if let Err(err) = e.button(to_enigo_button(button), Direction::Press) {
                logger::error_p("desktop", &format!("mouse_down {:?}: {}", button, err));
            }
        });
    }

    fn mouse_up(&self, button: Button) {
        self.with_enigo(|e| {
            if let Err(err) = e.button(to_enigo_button(button), Direction::Release) {
                logger::error_p("desktop", &format!("mouse_up {:?}: {}", button, err));
            }
        });
    }

    fn tap(&self, key: &str) {
        self.with_enigo(|e| {
            let result = match named_key(key) {
                Some(k) => e.key(k, Direction::Click),
                None => match key.chars().next() {
                    Some(c) if key.chars().count() == 1 => {
                        e.key(Key::Unicode(c), Direction::Click)
                    }
                    _ => {
                        logger::error_p("desktop", &format!("unknown key '{}'", key));
                        return;
                    }
                },
            };
            if let Err(err) = result {
                logger::error_p("desktop", &format!("tap '{}': {}", key, err));
            }
        });
    }

    fn type_text(&self, text: &str) {
        self.with_enigo(|e| {
            if let Err(err) = e.text(text) {
                logger::error_p("desktop", &format!("type_text: {}", err));
            }
        });
    }
}
