use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::errors::FindError;
use crate::finder::Finder;
use crate::geometry::{Location, Rect};
use crate::logger;
use crate::observer::{EventManager, ObserveCallback, ObserverHandle};
use crate::pattern::{Match, Target};
use crate::poller;
use crate::screen::{DisplayId, DisplayRegistry};

/// What to do when a find comes up empty after its full timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindFailedResponse {
    /// Fail the operation with a FindFailed error.
    Abort,
    /// Return empty and continue.
    Skip,
    /// Ask the registered prompt handler.
    Prompt,
    /// Run the whole wait again.
    Retry,
}

/// Resolves Prompt responses, e.g. by asking the user on a terminal.
pub trait PromptHandler: Send + Sync {
    fn ask(&self, target: &str) -> FindFailedResponse;
}

/// Results of a find_all, best match first.
pub struct Matches {
    iter: std::vec::IntoIter<Match>,
}

impl Matches {
    fn new(v: Vec<Match>) -> Self {
        Self { iter: v.into_iter() }
    }
}

impl Iterator for Matches {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        self.iter.next()
    }
}

impl ExactSizeIterator for Matches {
    fn len(&self) -> usize {
        self.iter.len()
    }
}

/// A rectangular slice of the desktop: the main handle for finding,
/// waiting, observing and acting.
///
/// A Region remembers the size it was asked for. When it hangs off a
/// screen edge the visible part is what gets captured, but moves and
/// derived regions start from the requested (virtual) size again.
#[derive(Clone)]
pub struct Region {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    v_width: Option<i32>,
    v_height: Option<i32>,
    screen: Option<DisplayId>,
    registry: Arc<DisplayRegistry>,
    generation: u64,
    auto_wait_timeout: f64,
    throw_on_find_failed: bool,
    find_failed_policy: FindFailedResponse,
    last_match: Option<Match>,
    last_matches: Vec<Match>,
    evt_mgr: Option<Arc<Mutex<EventManager>>>,
    observing: Arc<AtomicBool>,
    prompt: Option<Arc<dyn PromptHandler>>,
}

impl Region {
    pub fn new(rect: Rect, registry: Arc<DisplayRegistry>) -> Self {
        let defaults = registry.defaults();
        let mut r = Self {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            v_width: None,
            v_height: None,
            screen: None,
            generation: registry.generation(),
            auto_wait_timeout: defaults.auto_wait_timeout,
            throw_on_find_failed: defaults.throw_on_find_failed,
            find_failed_policy: if defaults.throw_on_find_failed {
                FindFailedResponse::Abort
            } else {
                FindFailedResponse::Skip
            },
            last_match: None,
            last_matches: Vec::new(),
            evt_mgr: None,
            observing: Arc::new(AtomicBool::new(false)),
            prompt: None,
            registry,
        };
        r.init_screen();
        r
    }

    pub fn from_coords(x: i32, y: i32, w: i32, h: i32, registry: Arc<DisplayRegistry>) -> Self {
        Self::new(Rect::new(x, y, w, h), registry)
    }

    /// Resolve the owning screen and clip to its bounds, starting from the
    /// virtual (requested) size. A region that lands outside every screen
    /// keeps its coordinates and loses its screen binding.
    fn init_screen(&mut self) {
        let vw = self.v_width.unwrap_or(self.w);
        let vh = self.v_height.unwrap_or(self.h);
        let rect = Rect::new(self.x, self.y, vw, vh);

        let owner = self.registry.owner_of(rect).or(self.screen);
        let Some(id) = owner else {
            self.w = vw;
            self.h = vh;
            self.screen = None;
            logger::error(&format!(
                "{} is outside any screen - subsequent actions might not work as expected",
                rect
            ));
            return;
        };
        self.screen = Some(id);

        let clipped = rect.intersection(self.registry.bounds_of(id));
        if (clipped.w < vw || clipped.h < vh) && self.v_width.is_none() {
            self.v_width = Some(vw);
            self.v_height = Some(vh);
        }
        self.x = clipped.x;
        self.y = clipped.y;
        self.w = clipped.w;
        self.h = clipped.h;
    }

    // derived regions inherit find behavior but start a fresh observer state
    fn derive(&self, rect: Rect) -> Region {
        let mut r = Region::new(rect, self.registry.clone());
        r.auto_wait_timeout = self.auto_wait_timeout;
        r.throw_on_find_failed = self.throw_on_find_failed;
        r.find_failed_policy = self.find_failed_policy;
        r.prompt = self.prompt.clone();
        r
    }

    /// Requested rectangle, before edge clipping.
    fn virtual_rect(&self) -> Rect {
        Rect::new(
            self.x,
            self.y,
            self.v_width.unwrap_or(self.w),
            self.v_height.unwrap_or(self.h),
        )
    }

    // --- geometry accessors ---

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn w(&self) -> i32 {
        self.w
    }

    pub fn h(&self) -> i32 {
        self.h
    }

    pub fn screen_id(&self) -> Option<DisplayId> {
        self.screen
    }

    pub fn is_screen_bound(&self) -> bool {
        self.screen.is_some()
    }

    pub fn center(&self) -> Location {
        self.rect().center()
    }

    /// Where mouse actions land when the region itself is the target.
    pub fn target(&self) -> Location {
        self.center()
    }

    pub fn top_left(&self) -> Location {
        Location::new(self.x, self.y)
    }

    pub fn top_right(&self) -> Location {
        Location::new(self.rect().right(), self.y)
    }

    pub fn bottom_left(&self) -> Location {
        Location::new(self.x, self.rect().bottom())
    }

    pub fn bottom_right(&self) -> Location {
        Location::new(self.rect().right(), self.rect().bottom())
    }

    pub fn contains(&self, other: &Region) -> bool {
        self.rect().contains(other.rect())
    }

    pub fn contains_point(&self, p: Location) -> bool {
        self.rect().contains_point(p)
    }

    // --- configuration ---

    pub fn auto_wait_timeout(&self) -> f64 {
        self.auto_wait_timeout
    }

    pub fn set_auto_wait_timeout(&mut self, secs: f64) {
        self.auto_wait_timeout = secs.max(0.0);
    }

    pub fn throw_on_find_failed(&self) -> bool {
        self.throw_on_find_failed
    }

    /// Couples the failure policy: true selects Abort, false selects Skip.
    pub fn set_throw_on_find_failed(&mut self, throw: bool) {
        self.throw_on_find_failed = throw;
        self.find_failed_policy = if throw {
            FindFailedResponse::Abort
        } else {
            FindFailedResponse::Skip
        };
    }

    pub fn find_failed_response(&self) -> FindFailedResponse {
        self.find_failed_policy
    }

    pub fn set_find_failed_response(&mut self, response: FindFailedResponse) {
        self.find_failed_policy = response;
    }

    pub fn set_prompt_handler(&mut self, handler: Arc<dyn PromptHandler>) {
        self.prompt = Some(handler);
    }

    pub fn last_match(&self) -> Option<&Match> {
        self.last_match.as_ref()
    }

    pub fn last_matches(&self) -> &[Match] {
        &self.last_matches
    }

    // --- moving and resizing ---

    /// Region shifted by the given deltas, at virtual size.
    pub fn offset(&self, dx: i32, dy: i32) -> Region {
        self.derive(self.virtual_rect().translate(dx, dy))
    }

    pub fn set_location(&mut self, loc: Location) {
        self.x = loc.x;
        self.y = loc.y;
        self.init_screen();
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.w = rect.w;
        self.h = rect.h;
        self.v_width = None;
        self.v_height = None;
        self.init_screen();
    }

    pub fn set_size(&mut self, w: i32, h: i32) {
        self.set_rect(Rect::new(self.x, self.y, w, h));
    }

    pub fn set_roi(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.set_rect(Rect::new(x, y, w, h));
    }

    /// Region grown by `range` pixels on every side.
    pub fn grow(&self, range: i32) -> Region {
        self.grow4(range, range, range, range)
    }

    /// Region grown horizontally and vertically by the given amounts on
    /// each side.
    pub fn grow_xy(&self, dw: i32, dh: i32) -> Region {
        self.grow4(dw, dw, dh, dh)
    }

    pub fn grow4(&self, left: i32, right: i32, top: i32, bottom: i32) -> Region {
        let v = self.virtual_rect();
        self.derive(Rect::new(
            v.x - left,
            v.y - top,
            v.w + left + right,
            v.h + top + bottom,
        ))
    }

    pub fn union(&self, other: &Region) -> Region {
        self.derive(self.virtual_rect().union(other.virtual_rect()))
    }

    pub fn intersection(&self, other: &Region) -> Region {
        self.derive(self.virtual_rect().intersection(other.virtual_rect()))
    }

    /// Strip of the given height directly above this region, same width.
    pub fn above(&self, height: i32) -> Region {
        let v = self.virtual_rect();
        self.derive(Rect::new(v.x, v.y - height, v.w, height))
    }

    /// Everything between this region's top edge and the screen's top edge.
    pub fn above_max(&self) -> Region {
        let bounds = self.screen_bounds();
        let v = self.virtual_rect();
        self.derive(Rect::new(v.x, bounds.y, v.w, v.y - bounds.y))
    }

    pub fn below(&self, height: i32) -> Region {
        let v = self.virtual_rect();
        self.derive(Rect::new(v.x, v.bottom(), v.w, height))
    }

    pub fn below_max(&self) -> Region {
        let bounds = self.screen_bounds();
        let v = self.virtual_rect();
        self.derive(Rect::new(v.x, v.bottom(), v.w, bounds.bottom() - v.bottom()))
    }

    pub fn left_of(&self, width: i32) -> Region {
        let v = self.virtual_rect();
        self.derive(Rect::new(v.x - width, v.y, width, v.h))
    }

    pub fn left_max(&self) -> Region {
        let bounds = self.screen_bounds();
        let v = self.virtual_rect();
        self.derive(Rect::new(bounds.x, v.y, v.x - bounds.x, v.h))
    }

    pub fn right_of(&self, width: i32) -> Region {
        let v = self.virtual_rect();
        self.derive(Rect::new(v.right(), v.y, width, v.h))
    }

    pub fn right_max(&self) -> Region {
        let bounds = self.screen_bounds();
        let v = self.virtual_rect();
        self.derive(Rect::new(v.right(), v.y, bounds.right() - v.right(), v.h))
    }

    /// Point on the right edge at mid-height, shifted right by `offset`.
    pub fn right_at(&self, offset: i32) -> Location {
        Location::new(self.rect().right() + offset, self.y + self.h / 2)
    }

    pub fn left_at(&self, offset: i32) -> Location {
        Location::new(self.x - offset, self.y + self.h / 2)
    }

    pub fn above_at(&self, offset: i32) -> Location {
        Location::new(self.x + self.w / 2, self.y - offset)
    }

    pub fn below_at(&self, offset: i32) -> Location {
        Location::new(self.x + self.w / 2, self.rect().bottom() + offset)
    }

    fn screen_bounds(&self) -> Rect {
        match self.screen {
            Some(id) => self.registry.bounds_of(id),
            None => self.rect(),
        }
    }

    pub fn registry(&self) -> &Arc<DisplayRegistry> {
        &self.registry
    }

    // --- find ---

    fn check_generation(&self) {
        if self.generation != self.registry.generation() {
            logger::warn(&format!(
                "{} was created before the last display reset, results may be stale",
                self.rect()
            ));
        }
    }

    /// One capture-and-match pass. A screenless region warns and reports
    /// not-found instead of failing, so polling loops keep running after
    /// a region was moved off all screens.
    fn do_find(&self, target: &Target, cache: &mut Option<Finder>) -> Result<Option<Match>, FindError> {
        let Some(id) = self.screen else {
            logger::warn_p("find", &format!("{}: region has no screen", target.describe()));
            return Ok(None);
        };
        let frame = self.registry.capture(id, self.rect())?;
        match cache {
            Some(f) => {
                f.substitute_frame(&frame, self.top_left());
                f.find_repeat();
            }
            None => {
                let mut f = Finder::new(&frame, self.top_left(), self.registry.matcher());
                f.find(target, self.registry.defaults())?;
                f.set_repeating();
                *cache = Some(f);
            }
        }
        Ok(cache.as_mut().and_then(|f| f.next()))
    }

    fn do_find_all(&self, target: &Target, cache: &mut Option<Finder>) -> Result<Vec<Match>, FindError> {
        let Some(id) = self.screen else {
            logger::warn_p("find", &format!("find_all {}: region has no screen", target.describe()));
            return Ok(Vec::new());
        };
        let frame = self.registry.capture(id, self.rect())?;
        match cache {
            Some(f) => {
                f.substitute_frame(&frame, self.top_left());
                f.find_repeat();
            }
            None => {
                let mut f = Finder::new(&frame, self.top_left(), self.registry.matcher());
                f.find_all(target, self.registry.defaults())?;
                f.set_repeating();
                *cache = Some(f);
            }
        }
        Ok(cache.as_mut().map(|f| f.by_ref().collect()).unwrap_or_default())
    }

    /// Resolve a find failure according to the current policy. Ok(true)
    /// means run the wait again, Ok(false) means give up quietly.
    fn handle_find_failed(&self, target: &Target, retries: &mut u32) -> Result<bool, FindError> {
        let mut response = self.find_failed_policy;
        if response == FindFailedResponse::Prompt {
            response = match &self.prompt {
                Some(handler) => handler.ask(&target.describe()),
                None => {
                    logger::warn_p("find", "no prompt handler registered, aborting");
                    FindFailedResponse::Abort
                }
            };
        }
        match response {
            FindFailedResponse::Skip => Ok(false),
            FindFailedResponse::Retry => {
                if let Some(limit) = self.registry.defaults().find_retry_limit {
                    if *retries >= limit {
                        return Err(FindError::FindFailed(format!(
                            "{} (gave up after {} retries)",
                            target.describe(),
                            limit
                        )));
                    }
                }
                *retries += 1;
                logger::info_p("find", &format!("{}: retrying ({})", target.describe(), retries));
                Ok(true)
            }
            _ => Err(FindError::FindFailed(target.describe())),
        }
    }

    /// Wait up to `timeout` seconds for the target, polling at the
    /// configured scan rate. On failure the region's policy decides
    /// between an error, an empty result and another full wait.
    pub fn wait(&mut self, target: impl Into<Target>, timeout: f64) -> Result<Option<Match>, FindError> {
        let target = target.into();
        self.wait_target(&target, timeout)
    }

    fn wait_target(&mut self, target: &Target, timeout: f64) -> Result<Option<Match>, FindError> {
        self.check_generation();
        let scan_rate = self.registry.defaults().wait_scan_rate;
        let mut retries = 0u32;
        loop {
            let mut cache: Option<Finder> = None;
            let mut found: Option<Match> = None;
            let ok = poller::repeat(timeout, scan_rate, || {
                found = self.do_find(target, &mut cache)?;
                Ok(found.is_some())
            })?;
            if ok {
                if let Some(m) = found {
                    logger::debug_p("find", &format!("found {} at {}", target.describe(), m.rect));
                    self.last_match = Some(m.clone());
                    return Ok(Some(m));
                }
            }
            if !self.handle_find_failed(target, &mut retries)? {
                return Ok(None);
            }
        }
    }

    /// Find the target, waiting for the region's auto wait timeout.
    pub fn find(&mut self, target: impl Into<Target>) -> Result<Option<Match>, FindError> {
        let target = target.into();
        self.wait_target(&target, self.auto_wait_timeout)
    }

    /// All matches in the region, best first. An empty result goes through
    /// the same failure policy as `find`.
    pub fn find_all(&mut self, target: impl Into<Target>) -> Result<Matches, FindError> {
        let target = target.into();
        self.check_generation();
        let scan_rate = self.registry.defaults().wait_scan_rate;
        let mut retries = 0u32;
        loop {
            let mut cache: Option<Finder> = None;
            let mut results: Vec<Match> = Vec::new();
            let ok = poller::repeat(self.auto_wait_timeout, scan_rate, || {
                results = self.do_find_all(&target, &mut cache)?;
                Ok(!results.is_empty())
            })?;
            if ok {
                self.last_matches = results.clone();
                return Ok(Matches::new(results));
            }
            if !self.handle_find_failed(&target, &mut retries)? {
                self.last_matches.clear();
                return Ok(Matches::new(Vec::new()));
            }
        }
    }

    /// Best-effort probe: like `wait` but never escalates. Errors are
    /// logged and reported as not-found.
    pub fn exists(&mut self, target: impl Into<Target>, timeout: f64) -> Option<Match> {
        let target = target.into();
        self.check_generation();
        let scan_rate = self.registry.defaults().wait_scan_rate;
        let mut cache: Option<Finder> = None;
        let mut found: Option<Match> = None;
        let outcome = poller::repeat(timeout, scan_rate, || {
            found = self.do_find(&target, &mut cache)?;
            Ok::<bool, FindError>(found.is_some())
        });
        match outcome {
            Ok(true) => {
                self.last_match = found.clone();
                found
            }
            Ok(false) => None,
            Err(e) => {
                logger::error_p("find", &format!("exists {}: {}", target.describe(), e));
                None
            }
        }
    }

    /// Wait up to `timeout` seconds for the target to disappear. True when
    /// it is gone; errors are logged and count as still-there.
    pub fn wait_vanish(&mut self, target: impl Into<Target>, timeout: f64) -> bool {
        let target = target.into();
        self.check_generation();
        let scan_rate = self.registry.defaults().wait_scan_rate;
        let mut cache: Option<Finder> = None;
        let outcome = poller::repeat(timeout, scan_rate, || {
            Ok::<bool, FindError>(self.do_find(&target, &mut cache)?.is_none())
        });
        match outcome {
            Ok(gone) => gone,
            Err(e) => {
                logger::error_p("find", &format!("wait_vanish {}: {}", target.describe(), e));
                false
            }
        }
    }

    // --- observe ---

    fn event_manager(&mut self) -> Arc<Mutex<EventManager>> {
        self.evt_mgr
            .get_or_insert_with(|| Arc::new(Mutex::new(EventManager::new(self.registry.matcher()))))
            .clone()
    }

    /// Fire the callback when the target shows up, once per observe run.
    pub fn on_appear(&mut self, target: impl Into<Target>, callback: ObserveCallback) {
        let target = target.into();
        self.event_manager().lock().unwrap().add_appear(target, callback);
    }

    /// Fire the callback when the target goes away, once per observe run.
    pub fn on_vanish(&mut self, target: impl Into<Target>, callback: ObserveCallback) {
        let target = target.into();
        self.event_manager().lock().unwrap().add_vanish(target, callback);
    }

    /// Fire the callback whenever at least `min_changed_pixels` worth of
    /// area changes between consecutive frames.
    pub fn on_change_min(&mut self, min_changed_pixels: u32, callback: ObserveCallback) {
        self.event_manager().lock().unwrap().add_change(min_changed_pixels, callback);
    }

    /// `on_change_min` with the configured default area.
    pub fn on_change(&mut self, callback: ObserveCallback) {
        let min = self.registry.defaults().observe_min_changed_pixels;
        self.on_change_min(min, callback);
    }

    pub fn is_observing(&self) -> bool {
        self.observing.load(Ordering::SeqCst)
    }

    /// Stop a running observe loop after its current tick.
    pub fn stop_observer(&self) {
        self.observing.store(false, Ordering::SeqCst);
    }

    /// Run the observe loop on this thread for `secs` seconds
    /// (f64::INFINITY runs until stopped or all targets resolved).
    pub fn observe(&mut self, secs: f64) {
        let Some(mgr) = self.evt_mgr.clone() else {
            logger::error_p("observe", "no observers registered");
            return;
        };
        let Some(id) = self.screen else {
            logger::error_p("observe", &format!("{} has no screen", self.rect()));
            return;
        };
        if self.observing.swap(true, Ordering::SeqCst) {
            logger::error_p("observe", "already running for this region");
            return;
        }
        self.check_generation();
        mgr.lock().unwrap().initialize();

        let rect = self.rect();
        let period = Duration::from_secs_f64(
            1.0 / f64::from(self.registry.defaults().observe_scan_rate.max(0.01)),
        );
        let deadline = secs
            .is_finite()
            .then(|| Instant::now() + Duration::from_secs_f64(secs.max(0.0)));

        while self.observing.load(Ordering::SeqCst) {
            let started = Instant::now();
            match self.registry.capture(id, rect) {
                Ok(frame) => {
                    let pending =
                        mgr.lock().unwrap().update(&frame, rect, self.registry.defaults());
                    if !pending {
                        break;
                    }
                }
                Err(e) => {
                    logger::error_p("observe", &format!("capture failed: {}", e));
                    break;
                }
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            let sleep = period
                .checked_sub(started.elapsed())
                .unwrap_or(Duration::from_millis(10))
                .max(Duration::from_millis(10));
            std::thread::sleep(sleep);
        }
        self.observing.store(false, Ordering::SeqCst);
    }

    /// Run the observe loop on a worker thread. The handle stops or joins
    /// it; `stop_observer` on this region works too, the flag is shared.
    pub fn observe_in_background(&mut self, secs: f64) -> ObserverHandle {
        // materialize the manager before cloning so both share it
        self.event_manager();
        let mut worker = self.clone();
        let running = self.observing.clone();
        let join = std::thread::spawn(move || worker.observe(secs));
        ObserverHandle::new(running, join)
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.screen {
            Some(id) => write!(f, "R{}@S({})", self.rect(), id),
            None => write!(f, "R{}@S(?)", self.rect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stub::StubBackend;
    use crate::matcher::StubMatcher;
    use crate::settings::Settings;

    fn registry() -> Arc<DisplayRegistry> {
        let backend = Arc::new(StubBackend::new());
        DisplayRegistry::new(
            backend.clone(),
            backend,
            Arc::new(StubMatcher::new()),
            Settings::default(),
        )
    }

    #[test]
    fn full_screen_region_is_not_clipped() {
        let r = Region::from_coords(0, 0, 1920, 1080, registry());
        assert_eq!(r.rect(), Rect::new(0, 0, 1920, 1080));
        assert_eq!(r.screen_id(), Some(0));
    }

    #[test]
    fn edge_region_clips_but_remembers_requested_size() {
        let r = Region::from_coords(1800, 1000, 300, 200, registry());
        assert_eq!(r.rect(), Rect::new(1800, 1000, 120, 80));
        // moving back inside restores the requested size
        let moved = r.offset(-500, -500);
        assert_eq!(moved.rect(), Rect::new(1300, 500, 300, 200));
    }

    #[test]
    fn region_outside_all_screens_loses_its_binding() {
        let r = Region::from_coords(5000, 5000, 100, 100, registry());
        assert!(!r.is_screen_bound());
        assert_eq!(r.rect(), Rect::new(5000, 5000, 100, 100));
    }

    #[test]
    fn spatial_neighbors() {
        let reg = registry();
        let r = Region::from_coords(500, 400, 200, 100, reg);
        assert_eq!(r.above(50).rect(), Rect::new(500, 350, 200, 50));
        assert_eq!(r.below(50).rect(), Rect::new(500, 500, 200, 50));
        assert_eq!(r.left_of(100).rect(), Rect::new(400, 400, 100, 100));
        assert_eq!(r.right_of(100).rect(), Rect::new(700, 400, 100, 100));
        assert_eq!(r.above_max().rect(), Rect::new(500, 0, 200, 400));
        assert_eq!(r.right_max().rect(), Rect::new(700, 400, 1220, 100));
    }

    #[test]
    fn grow_and_union() {
        let reg = registry();
        let a = Region::from_coords(100, 100, 50, 50, reg.clone());
        assert_eq!(a.grow(10).rect(), Rect::new(90, 90, 70, 70));
        assert_eq!(a.grow4(1, 2, 3, 4).rect(), Rect::new(99, 97, 53, 57));
        let b = Region::from_coords(300, 50, 20, 20, reg);
        assert_eq!(a.union(&b).rect(), Rect::new(100, 50, 220, 100));
    }

    #[test]
    fn throw_flag_couples_the_policy() {
        let mut r = Region::from_coords(0, 0, 100, 100, registry());
        assert_eq!(r.find_failed_response(), FindFailedResponse::Abort);
        r.set_throw_on_find_failed(false);
        assert_eq!(r.find_failed_response(), FindFailedResponse::Skip);
        r.set_throw_on_find_failed(true);
        assert_eq!(r.find_failed_response(), FindFailedResponse::Abort);
    }

    #[test]
    fn edge_points() {
        let r = Region::from_coords(100, 100, 200, 100, registry());
        assert_eq!(r.right_at(10), Location::new(310, 150));
        assert_eq!(r.left_at(10), Location::new(90, 150));
        assert_eq!(r.above_at(10), Location::new(200, 90));
        assert_eq!(r.below_at(10), Location::new(200, 210));
    }
}
