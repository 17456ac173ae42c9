use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use image::{GrayImage, RgbaImage};

use crate::geometry::Rect;
use crate::logger;
use crate::matcher::Matcher;
use crate::pattern::{Match, Target};
use crate::settings::Settings;

/// Event delivered to observer callbacks, in global coordinates.
pub enum ObserveEvent {
    Appear { target: String, matched: Match, region: Rect },
    Vanish { target: String, last_match: Option<Match>, region: Rect },
    Change { changes: Vec<Rect>, region: Rect },
}

pub type ObserveCallback = Box<dyn FnMut(&ObserveEvent) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetState {
    /// Not yet resolved in this observe epoch.
    Unknown,
    /// Needle could not be resolved; the target is out of the run.
    Missing,
    Appeared,
    Vanished,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WatchKind {
    Appear,
    Vanish,
}

struct WatchedTarget {
    target: Target,
    kind: WatchKind,
    state: TargetState,
    last_match: Option<Match>,
    callback: ObserveCallback,
}

struct ChangeObserver {
    threshold: u32,
    callback: ObserveCallback,
}

/// Registered observers for one Region, driven by its observe loop.
/// Appear/vanish targets fire at most once per epoch (`initialize` starts
/// a new epoch); change observers fire on every tick with changes.
pub struct EventManager {
    matcher: Arc<dyn Matcher>,
    targets: Vec<WatchedTarget>,
    change_obs: Vec<ChangeObserver>,
    last_frame: Option<GrayImage>,
}

impl EventManager {
    pub fn new(matcher: Arc<dyn Matcher>) -> Self {
        Self { matcher, targets: Vec::new(), change_obs: Vec::new(), last_frame: None }
    }

    pub fn add_appear(&mut self, target: Target, callback: ObserveCallback) {
        self.targets.push(WatchedTarget {
            target,
            kind: WatchKind::Appear,
            state: TargetState::Unknown,
            last_match: None,
            callback,
        });
    }

    pub fn add_vanish(&mut self, target: Target, callback: ObserveCallback) {
        self.targets.push(WatchedTarget {
            target,
            kind: WatchKind::Vanish,
            state: TargetState::Unknown,
            last_match: None,
            callback,
        });
    }

    pub fn add_change(&mut self, threshold: u32, callback: ObserveCallback) {
        self.change_obs.push(ChangeObserver { threshold, callback });
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.change_obs.is_empty()
    }

    /// Start a new epoch: every target becomes eligible to fire again.
    /// The last change-detection frame carries over.
    pub fn initialize(&mut self) {
        for t in &mut self.targets {
            t.state = TargetState::Unknown;
            t.last_match = None;
        }
    }

    /// Process one captured frame. Returns true while another tick is
    /// still useful (targets undecided, or change observers registered).
    pub fn update(&mut self, frame: &RgbaImage, region: Rect, settings: &Settings) -> bool {
        let gray = image::imageops::grayscale(frame);
        self.check_targets(&gray, region, settings);
        let pending = self
            .targets
            .iter()
            .any(|t| t.state == TargetState::Unknown);
        if !self.change_obs.is_empty() {
            self.check_changes(&gray, region);
            return true;
        }
        pending
    }

    fn check_targets(&mut self, gray: &GrayImage, region: Rect, settings: &Settings) {
        for t in &mut self.targets {
            if t.state != TargetState::Unknown {
                continue;
            }
            let needle = match t.target.needle(settings) {
                Ok(n) => n,
                Err(e) => {
                    logger::error(&format!("observe {}: {}", t.target.describe(), e));
                    t.state = TargetState::Missing;
                    continue;
                }
            };
            let hit = self
                .matcher
                .find(gray, &needle.gray, needle.similarity, false)
                .first()
                .map(|c| {
                    Match::new(
                        c.rect.translate(region.x, region.y),
                        c.score,
                        needle.image.clone(),
                        needle.offset,
                    )
                });
            match (t.kind, hit) {
                (WatchKind::Appear, Some(m)) => {
                    t.last_match = Some(m.clone());
                    t.state = TargetState::Appeared;
                    (t.callback)(&ObserveEvent::Appear {
                        target: t.target.describe(),
                        matched: m,
                        region,
                    });
                }
                (WatchKind::Appear, None) => {}
                (WatchKind::Vanish, Some(m)) => {
                    // still visible, remember where for the vanish event
                    t.last_match = Some(m);
                }
                (WatchKind::Vanish, None) => {
                    t.state = TargetState::Vanished;
                    (t.callback)(&ObserveEvent::Vanish {
                        target: t.target.describe(),
                        last_match: t.last_match.clone(),
                        region,
                    });
                }
            }
        }
    }

    fn check_changes(&mut self, gray: &GrayImage, region: Rect) {
        let Some(prev) = &self.last_frame else {
            // first tick only seeds the comparison frame
            self.last_frame = Some(gray.clone());
            return;
        };
        // one detection pass at the finest registered threshold, then
        // filtered per observer
        let min = self.change_obs.iter().map(|o| o.threshold).min().unwrap_or(1);
        let raw = self.matcher.find_changes(prev, gray, min);
        for obs in &mut self.change_obs {
            let changes: Vec<Rect> = raw
                .iter()
                .filter(|r| r.area() >= obs.threshold as i64)
                .map(|r| r.translate(region.x, region.y))
                .collect();
            if !changes.is_empty() {
                (obs.callback)(&ObserveEvent::Change { changes, region });
            }
        }
        self.last_frame = Some(gray.clone());
    }
}

/// Handle to an observe loop running on its own thread.
pub struct ObserverHandle {
    running: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl ObserverHandle {
    pub(crate) fn new(running: Arc<AtomicBool>, join: JoinHandle<()>) -> Self {
        Self { running, join }
    }

    /// Ask the loop to finish after its current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Block until the loop exits.
    pub fn wait(self) {
        let _ = self.join.join();
    }
}
