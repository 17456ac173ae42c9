use std::sync::{Arc, Mutex};

use image::RgbaImage;

use crate::backend::{Button, InputBackend, ScreenBackend};
use crate::errors::FindError;
use crate::geometry::{Location, Rect};
use crate::logger;
use crate::matcher::Matcher;
use crate::region::Region;
use crate::settings::Settings;

pub type DisplayId = usize;

/// Snapshot of the display layout plus the shared services every Region
/// needs. Built once at startup; `reset` produces a fresh snapshot when
/// displays are plugged or unplugged.
pub struct DisplayRegistry {
    screens: Vec<Rect>,
    primary: DisplayId,
    generation: u64,
    screen_backend: Arc<dyn ScreenBackend>,
    robot: Mutex<Robot>,
    matcher: Arc<dyn Matcher>,
    defaults: Settings,
}

impl DisplayRegistry {
    pub fn new(
        screen_backend: Arc<dyn ScreenBackend>,
        input_backend: Arc<dyn InputBackend>,
        matcher: Arc<dyn Matcher>,
        defaults: Settings,
    ) -> Arc<Self> {
        Self::build(screen_backend, input_backend, matcher, defaults, 0)
    }

    fn build(
        screen_backend: Arc<dyn ScreenBackend>,
        input_backend: Arc<dyn InputBackend>,
        matcher: Arc<dyn Matcher>,
        defaults: Settings,
        generation: u64,
    ) -> Arc<Self> {
        let screens = screen_backend.displays();
        if screens.is_empty() {
            logger::error("no displays found, captures will fail");
        }
        // primary is the display containing the global origin
        let primary = screens
            .iter()
            .position(|s| s.x == 0 && s.y == 0)
            .unwrap_or(0);
        Arc::new(Self {
            screens,
            primary,
            generation,
            screen_backend,
            robot: Mutex::new(Robot::new(input_backend)),
            matcher,
            defaults,
        })
    }

    /// Re-enumerate displays after a layout change. Regions created against
    /// the old registry keep working but carry a stale generation.
    pub fn reset(self: &Arc<Self>) -> Arc<Self> {
        logger::warn("display layout reset, regions from before this point are stale");
        let robot = self.robot.lock().unwrap().input.clone();
        Self::build(
            self.screen_backend.clone(),
            robot,
            self.matcher.clone(),
            self.defaults.clone(),
            self.generation + 1,
        )
    }

    pub fn display_count(&self) -> usize {
        self.screens.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    pub fn matcher(&self) -> Arc<dyn Matcher> {
        self.matcher.clone()
    }

    pub fn primary_id(&self) -> DisplayId {
        self.primary
    }

    /// Bounds of a display; out-of-range ids fall back to the primary.
    pub fn bounds_of(&self, id: DisplayId) -> Rect {
        if let Some(r) = self.screens.get(id) {
            *r
        } else if let Some(r) = self.screens.get(self.primary) {
            logger::error(&format!("no display {}, using primary", id));
            *r
        } else {
            Rect::new(0, 0, 0, 0)
        }
    }

    /// Display whose bounds contain the rectangle's top-left corner.
    pub fn owner_of(&self, rect: Rect) -> Option<DisplayId> {
        self.owner_of_point(rect.top_left())
    }

    pub fn owner_of_point(&self, p: Location) -> Option<DisplayId> {
        self.screens.iter().position(|s| s.contains_point(p))
    }

    /// Capture a global-coordinate rectangle, clipped to the owning display.
    pub fn capture(&self, id: DisplayId, global_rect: Rect) -> Result<RgbaImage, FindError> {
        let bounds = self.bounds_of(id);
        let clipped = global_rect.intersection(bounds);
        if clipped.is_empty() {
            return Err(FindError::Capture(format!(
                "{} is outside display {} {}",
                global_rect, id, bounds
            )));
        }
        let local = clipped.translate(-bounds.x, -bounds.y);
        self.screen_backend.capture(id, local)
    }

    pub fn screen(self: &Arc<Self>, id: DisplayId) -> Screen {
        Screen { id, registry: self.clone() }
    }

    pub fn primary_screen(self: &Arc<Self>) -> Screen {
        self.screen(self.primary)
    }

    /// Run a closure against the shared robot (mouse/keyboard state).
    pub fn with_robot<R>(&self, f: impl FnOnce(&mut Robot) -> R) -> R {
        f(&mut self.robot.lock().unwrap())
    }

    /// Log the current display layout.
    pub fn show_screens(&self) {
        logger::info(&format!("{} display(s):", self.screens.len()));
        for (i, s) in self.screens.iter().enumerate() {
            let marker = if i == self.primary { " (primary)" } else { "" };
            logger::info(&format!("  screen {}: {}{}", i, s, marker));
        }
    }
}

impl Location {
    /// Display containing this point, if any.
    pub fn screen_of(&self, registry: &DisplayRegistry) -> Option<DisplayId> {
        let id = registry.owner_of_point(*self);
        if id.is_none() {
            logger::error(&format!("{} is not on any screen", self));
        }
        id
    }
}

/// Mouse and keyboard driver with held-button bookkeeping, so a missed
/// release never leaves a button stuck across actions.
pub struct Robot {
    input: Arc<dyn InputBackend>,
    held_buttons: u8,
}

impl Robot {
    fn new(input: Arc<dyn InputBackend>) -> Self {
        Self { input, held_buttons: 0 }
    }

    pub fn move_to(&mut self, loc: Location) {
        self.input.move_to(loc);
    }

    pub fn mouse_down(&mut self, button: Button) {
        if self.held_buttons & button.mask() != 0 {
            logger::error(&format!("mouse_down {:?}: button already held", button));
        }
        self.held_buttons |= button.mask();
        self.input.mouse_down(button);
    }

    pub fn mouse_up(&mut self, button: Button) {
        self.held_buttons &= !button.mask();
        self.input.mouse_up(button);
    }

    pub fn click(&mut self, button: Button) {
        self.mouse_down(button);
        self.mouse_up(button);
    }

    pub fn tap(&mut self, key: &str) {
        self.input.tap(key);
    }

    pub fn type_text(&mut self, text: &str) {
        self.input.type_text(text);
    }

    pub fn held_buttons(&self) -> u8 {
        self.held_buttons
    }
}

/// Handle to one display. Mostly a factory for full-display Regions.
#[derive(Clone)]
pub struct Screen {
    id: DisplayId,
    registry: Arc<DisplayRegistry>,
}

impl Screen {
    pub fn id(&self) -> DisplayId {
        self.id
    }

    pub fn bounds(&self) -> Rect {
        self.registry.bounds_of(self.id)
    }

    pub fn is_primary(&self) -> bool {
        self.id == self.registry.primary_id()
    }

    /// Region covering the whole display.
    pub fn region(&self) -> Region {
        Region::new(self.bounds(), self.registry.clone())
    }

    pub fn capture(&self) -> Result<RgbaImage, FindError> {
        self.registry.capture(self.id, self.bounds())
    }
}
