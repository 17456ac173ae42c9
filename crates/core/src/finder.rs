use std::sync::Arc;

use image::{GrayImage, RgbaImage};

use crate::errors::FindError;
use crate::geometry::Location;
use crate::matcher::{Candidate, Matcher};
use crate::pattern::{Match, Needle, Target};
use crate::settings::Settings;

/// One search pass over a captured frame. Results come out through the
/// Iterator impl, translated to global coordinates.
///
/// In repeating mode the resolved needle survives `substitute_frame`, so
/// polling loops decode the image file once and re-match per frame.
pub struct Finder {
    frame: GrayImage,
    origin: Location,
    matcher: Arc<dyn Matcher>,
    needle: Option<Needle>,
    results: Vec<Candidate>,
    cursor: usize,
    repeating: bool,
    find_all: bool,
}

impl Finder {
    pub fn new(frame: &RgbaImage, origin: Location, matcher: Arc<dyn Matcher>) -> Self {
        Self {
            frame: image::imageops::grayscale(frame),
            origin,
            matcher,
            needle: None,
            results: Vec::new(),
            cursor: 0,
            repeating: false,
            find_all: false,
        }
    }

    pub fn find(&mut self, target: &Target, settings: &Settings) -> Result<(), FindError> {
        self.run(target, settings, false)
    }

    pub fn find_all(&mut self, target: &Target, settings: &Settings) -> Result<(), FindError> {
        self.run(target, settings, true)
    }

    fn run(&mut self, target: &Target, settings: &Settings, find_all: bool) -> Result<(), FindError> {
        let needle = target.needle(settings)?;
        self.results = self
            .matcher
            .find(&self.frame, &needle.gray, needle.similarity, find_all);
        self.cursor = 0;
        self.find_all = find_all;
        self.needle = Some(needle);
        Ok(())
    }

    /// Keep the resolved needle alive across frames.
    pub fn set_repeating(&mut self) {
        self.repeating = true;
    }

    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    /// Swap in a fresh capture for the next `find_repeat` pass.
    pub fn substitute_frame(&mut self, frame: &RgbaImage, origin: Location) {
        self.frame = image::imageops::grayscale(frame);
        self.origin = origin;
        self.results.clear();
        self.cursor = 0;
    }

    /// Re-run the previous search against the current frame. No-op unless
    /// repeating mode is armed and a needle was resolved.
    pub fn find_repeat(&mut self) {
        if !self.repeating {
            return;
        }
        if let Some(needle) = &self.needle {
            self.results = self
                .matcher
                .find(&self.frame, &needle.gray, needle.similarity, self.find_all);
            self.cursor = 0;
        }
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.results.len()
    }

    pub fn image_name(&self) -> Option<&str> {
        self.needle.as_ref().and_then(|n| n.image.as_deref())
    }
}

impl Iterator for Finder {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        let c = *self.results.get(self.cursor)?;
        self.cursor += 1;
        let needle = self.needle.as_ref()?;
        Some(Match::new(
            c.rect.translate(self.origin.x, self.origin.y),
            c.score,
            needle.image.clone(),
            needle.offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::matcher::StubMatcher;

    fn frame() -> RgbaImage {
        RgbaImage::new(32, 32)
    }

    fn bitmap_target() -> Target {
        Target::Bitmap(Arc::new(RgbaImage::new(4, 4)))
    }

    #[test]
    fn results_are_translated_to_global_coordinates() {
        let m = Arc::new(StubMatcher::new().with_default(vec![Candidate {
            rect: Rect::new(5, 6, 10, 10),
            score: 0.9,
        }]));
        let mut f = Finder::new(&frame(), Location::new(100, 200), m);
        f.find(&bitmap_target(), &Settings::default()).unwrap();
        let hit = f.next().unwrap();
        assert_eq!(hit.rect, Rect::new(105, 206, 10, 10));
        assert!(f.next().is_none());
    }

    #[test]
    fn repeat_reuses_the_needle_on_a_new_frame() {
        let m = Arc::new(StubMatcher::new());
        m.push_response(Vec::new());
        m.push_response(vec![Candidate { rect: Rect::new(0, 0, 4, 4), score: 0.8 }]);
        let mut f = Finder::new(&frame(), Location::new(0, 0), m.clone());
        f.find(&bitmap_target(), &Settings::default()).unwrap();
        assert!(!f.has_next());
        f.set_repeating();
        f.substitute_frame(&frame(), Location::new(10, 10));
        f.find_repeat();
        assert!(f.has_next());
        assert_eq!(f.next().unwrap().rect, Rect::new(10, 10, 4, 4));
        assert_eq!(m.find_calls(), 2);
    }

    #[test]
    fn find_repeat_without_arming_does_nothing() {
        let m = Arc::new(StubMatcher::new().with_default(vec![Candidate {
            rect: Rect::new(0, 0, 4, 4),
            score: 0.9,
        }]));
        let mut f = Finder::new(&frame(), Location::new(0, 0), m.clone());
        f.find(&bitmap_target(), &Settings::default()).unwrap();
        f.substitute_frame(&frame(), Location::new(0, 0));
        f.find_repeat();
        assert!(!f.has_next());
        assert_eq!(m.find_calls(), 1);
    }

    #[test]
    fn needle_errors_surface_immediately() {
        let m = Arc::new(StubMatcher::new());
        let mut f = Finder::new(&frame(), Location::new(0, 0), m);
        let err = f
            .find(&Target::parse("missing.png"), &Settings::default())
            .unwrap_err();
        assert!(matches!(err, FindError::ImageMissing(_)));
    }
}
