use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use image::GrayImage;

use crate::geometry::Rect;

/// One ranked result from the matching engine, in capture-local
/// coordinates (the Finder translates to global).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub rect: Rect,
    pub score: f64,
}

/// Narrow interface over the template-matching engine.
///
/// Implementations must return scores in [0,1], ranked best first, already
/// filtered by `min_similarity`; `find_all == false` returns at most one
/// candidate. `find_changes` returns bounding boxes of changed areas whose
/// box area is at least `min_area` pixels.
pub trait Matcher: Send + Sync {
    fn find(
        &self,
        haystack: &GrayImage,
        needle: &GrayImage,
        min_similarity: f64,
        find_all: bool,
    ) -> Vec<Candidate>;

    fn find_changes(&self, prev: &GrayImage, curr: &GrayImage, min_area: u32) -> Vec<Rect>;
}

/// Scripted matcher for tests and `--stub` runs. Queued responses are
/// consumed one per `find` call; when the queue is empty the default
/// response is replayed. Threshold filtering and single/all truncation
/// behave exactly like a real engine so callers can't tell the difference.
#[derive(Default)]
pub struct StubMatcher {
    script: Mutex<VecDeque<Vec<Candidate>>>,
    default_response: Vec<Candidate>,
    change_script: Mutex<VecDeque<Vec<Rect>>>,
    find_calls: AtomicUsize,
}

impl StubMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replayed whenever the scripted queue is exhausted.
    pub fn with_default(mut self, candidates: Vec<Candidate>) -> Self {
        self.default_response = candidates;
        self
    }

    /// Queue the response for the next `find` call.
    pub fn push_response(&self, candidates: Vec<Candidate>) {
        self.script.lock().unwrap().push_back(candidates);
    }

    /// Queue the response for the next `find_changes` call.
    pub fn push_changes(&self, changes: Vec<Rect>) {
        self.change_script.lock().unwrap().push_back(changes);
    }

    /// Number of `find` invocations so far.
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }
}

impl Matcher for StubMatcher {
    fn find(
        &self,
        _haystack: &GrayImage,
        _needle: &GrayImage,
        min_similarity: f64,
        find_all: bool,
    ) -> Vec<Candidate> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let mut out = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());
        out.retain(|c| c.score >= min_similarity);
        out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        if !find_all {
            out.truncate(1);
        }
        out
    }

    fn find_changes(&self, _prev: &GrayImage, _curr: &GrayImage, min_area: u32) -> Vec<Rect> {
        let mut out = self
            .change_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        out.retain(|r| r.area() >= min_area as i64);
        out
    }
}
