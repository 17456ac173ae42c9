use std::time::Duration;

use crate::backend::Button;
use crate::errors::FindError;
use crate::geometry::Location;
use crate::logger;
use crate::pattern::{Match, Target};
use crate::region::Region;

/// Anything a mouse action can aim at: a point, a previous match, or a
/// target that still has to be found in the region.
pub enum ActionTarget {
    Location(Location),
    Match(Match),
    Find(Target),
}

impl From<Location> for ActionTarget {
    fn from(l: Location) -> Self {
        ActionTarget::Location(l)
    }
}

impl From<Match> for ActionTarget {
    fn from(m: Match) -> Self {
        ActionTarget::Match(m)
    }
}

impl From<Target> for ActionTarget {
    fn from(t: Target) -> Self {
        ActionTarget::Find(t)
    }
}

impl From<&str> for ActionTarget {
    fn from(s: &str) -> Self {
        ActionTarget::Find(Target::parse(s))
    }
}

impl From<crate::pattern::Pattern> for ActionTarget {
    fn from(p: crate::pattern::Pattern) -> Self {
        ActionTarget::Find(Target::from(p))
    }
}

impl From<&Region> for ActionTarget {
    fn from(r: &Region) -> Self {
        ActionTarget::Location(r.target())
    }
}

/// Resolve to a click point. Find targets run through the region's full
/// find pipeline, so the failure policy applies; None means skipped.
fn resolve_target(region: &mut Region, target: ActionTarget) -> Result<Option<Location>, FindError> {
    match target {
        ActionTarget::Location(l) => Ok(Some(l)),
        ActionTarget::Match(m) => Ok(Some(m.target())),
        ActionTarget::Find(t) => Ok(region.find(t)?.map(|m| m.target())),
    }
}

impl Region {
    /// Move the pointer onto the target. False means the find was skipped.
    pub fn hover(&mut self, target: impl Into<ActionTarget>) -> Result<bool, FindError> {
        let Some(loc) = resolve_target(self, target.into())? else {
            return Ok(false);
        };
        self.registry().with_robot(|r| r.move_to(loc));
        Ok(true)
    }

    pub fn click(&mut self, target: impl Into<ActionTarget>) -> Result<bool, FindError> {
        self.click_with(target.into(), Button::Left, 1)
    }

    pub fn double_click(&mut self, target: impl Into<ActionTarget>) -> Result<bool, FindError> {
        self.click_with(target.into(), Button::Left, 2)
    }

    pub fn right_click(&mut self, target: impl Into<ActionTarget>) -> Result<bool, FindError> {
        self.click_with(target.into(), Button::Right, 1)
    }

    fn click_with(&mut self, target: ActionTarget, button: Button, times: u32) -> Result<bool, FindError> {
        let Some(loc) = resolve_target(self, target)? else {
            return Ok(false);
        };
        logger::debug(&format!("click {:?} x{} at {}", button, times, loc));
        self.registry().with_robot(|r| {
            r.move_to(loc);
            for _ in 0..times {
                r.click(button);
            }
        });
        Ok(true)
    }

    /// Click the last match, or the region center when nothing was found
    /// yet. Never escalates.
    pub fn click_last(&mut self) {
        let loc = self
            .last_match()
            .map(|m| m.target())
            .unwrap_or_else(|| self.target());
        self.registry().with_robot(|r| {
            r.move_to(loc);
            r.click(Button::Left);
        });
    }

    /// Press at `from`, glide to `to`, pause, release. The pause gives the
    /// application time to recognize the drop target.
    pub fn drag_drop(
        &mut self,
        from: impl Into<ActionTarget>,
        to: impl Into<ActionTarget>,
    ) -> Result<bool, FindError> {
        let Some(src) = resolve_target(self, from.into())? else {
            return Ok(false);
        };
        let Some(dst) = resolve_target(self, to.into())? else {
            return Ok(false);
        };
        let pause = Duration::from_secs_f64(self.registry().defaults().delay_before_drop.max(0.0));
        logger::debug(&format!("drag {} -> {}", src, dst));
        self.registry().with_robot(|r| {
            r.move_to(src);
            r.mouse_down(Button::Left);
            r.move_to(dst);
            std::thread::sleep(pause);
            r.mouse_up(Button::Left);
        });
        Ok(true)
    }

    /// Type text at the current focus (clicks the target first if given).
    pub fn type_text(
        &mut self,
        target: Option<ActionTarget>,
        text: &str,
    ) -> Result<bool, FindError> {
        if let Some(t) = target {
            if !self.click_with(t, Button::Left, 1)? {
                return Ok(false);
            }
        }
        self.registry().with_robot(|r| r.type_text(text));
        Ok(true)
    }

    /// Tap a single key by name ("enter", "tab", ...) or character.
    pub fn tap_key(&mut self, key: &str) {
        self.registry().with_robot(|r| r.tap(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stub::StubBackend;
    use crate::geometry::Rect;
    use crate::matcher::{Candidate, StubMatcher};
    use crate::region::FindFailedResponse;
    use crate::screen::DisplayRegistry;
    use crate::settings::Settings;
    use std::sync::Arc;

    fn region_with(matcher: StubMatcher, settings: Settings) -> Region {
        let backend = Arc::new(StubBackend::new());
        let reg = DisplayRegistry::new(backend.clone(), backend, Arc::new(matcher), settings);
        Region::from_coords(0, 0, 800, 600, reg)
    }

    #[test]
    fn click_at_location_needs_no_find() {
        let mut r = region_with(StubMatcher::new(), Settings::default());
        assert!(r.click(Location::new(10, 10)).unwrap());
    }

    #[test]
    fn click_on_find_target_respects_skip_policy() {
        let mut settings = Settings::default();
        settings.auto_wait_timeout = 0.0;
        let mut r = region_with(StubMatcher::new(), settings);
        r.set_find_failed_response(FindFailedResponse::Skip);
        let img = image::RgbaImage::new(4, 4);
        let clicked = r.click(Target::Bitmap(Arc::new(img))).unwrap();
        assert!(!clicked);
    }

    #[test]
    fn click_on_found_target_lands_on_the_match() {
        let matcher = StubMatcher::new().with_default(vec![Candidate {
            rect: Rect::new(50, 60, 20, 10),
            score: 0.95,
        }]);
        let mut r = region_with(matcher, Settings::default());
        let img = image::RgbaImage::new(4, 4);
        assert!(r.click(Target::Bitmap(Arc::new(img))).unwrap());
        assert_eq!(r.last_match().unwrap().rect, Rect::new(50, 60, 20, 10));
    }

    #[test]
    fn click_last_falls_back_to_the_center() {
        let mut r = region_with(StubMatcher::new(), Settings::default());
        // no find yet, must not panic or escalate
        r.click_last();
        assert!(r.last_match().is_none());
    }
}
