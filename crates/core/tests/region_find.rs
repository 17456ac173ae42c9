use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use image::RgbaImage;

use spotter_core::backend::stub::StubBackend;
use spotter_core::{
    Candidate, DisplayRegistry, FindError, FindFailedResponse, Pattern, PromptHandler, Rect,
    Region, Settings, StubMatcher, Target,
};

// scan fast so polling tests finish quickly
fn fast_settings() -> Settings {
    let mut s = Settings::default();
    s.wait_scan_rate = 50.0;
    s.observe_scan_rate = 50.0;
    s
}

fn setup(settings: Settings) -> (Arc<StubMatcher>, Region) {
    let backend = Arc::new(StubBackend::new());
    let matcher = Arc::new(StubMatcher::new());
    let registry = DisplayRegistry::new(backend.clone(), backend, matcher.clone(), settings);
    let region = Region::from_coords(0, 0, 800, 600, registry);
    (matcher, region)
}

fn bitmap() -> Target {
    Target::Bitmap(Arc::new(RgbaImage::new(8, 8)))
}

fn hit(x: i32, y: i32, score: f64) -> Candidate {
    Candidate { rect: Rect::new(x, y, 20, 10), score }
}

#[test]
fn wait_polls_until_the_target_appears_and_memoizes() {
    let (matcher, mut region) = setup(fast_settings());
    matcher.push_response(Vec::new());
    matcher.push_response(Vec::new());
    matcher.push_response(vec![hit(30, 40, 0.9)]);

    let m = region.wait(bitmap(), 5.0).unwrap().unwrap();
    assert_eq!(m.rect, Rect::new(30, 40, 20, 10));
    assert_eq!(matcher.find_calls(), 3);
    assert_eq!(region.last_match().unwrap().rect, m.rect);
}

#[test]
fn immediate_success_is_a_single_capture_and_match() {
    let (matcher, mut region) = setup(fast_settings());
    matcher.push_response(vec![hit(0, 0, 0.95)]);

    assert!(region.wait(bitmap(), 10.0).unwrap().is_some());
    assert_eq!(matcher.find_calls(), 1);
}

#[test]
fn zero_timeout_probes_exactly_once() {
    let (matcher, mut region) = setup(fast_settings());
    assert!(region.exists(bitmap(), 0.0).is_none());
    assert_eq!(matcher.find_calls(), 1);
}

#[test]
fn abort_policy_fails_after_the_full_timeout() {
    let (matcher, mut region) = setup(fast_settings());
    let err = region.wait(bitmap(), 0.2).unwrap_err();
    assert!(matches!(err, FindError::FindFailed(_)));
    // polled more than once before giving up
    assert!(matcher.find_calls() > 1);
}

#[test]
fn skip_policy_returns_empty_instead_of_failing() {
    let (_, mut region) = setup(fast_settings());
    region.set_throw_on_find_failed(false);
    assert!(region.wait(bitmap(), 0.1).unwrap().is_none());
    assert!(region.last_match().is_none());
}

#[test]
fn retry_policy_is_capped_by_the_retry_limit() {
    let mut settings = fast_settings();
    settings.auto_wait_timeout = 0.0;
    settings.find_retry_limit = Some(2);
    let (matcher, mut region) = setup(settings);
    region.set_find_failed_response(FindFailedResponse::Retry);

    let err = region.find(bitmap()).unwrap_err();
    assert!(matches!(err, FindError::FindFailed(_)));
    // initial wait plus two retries
    assert_eq!(matcher.find_calls(), 3);
}

struct ScriptedPrompt {
    answers: Mutex<VecDeque<FindFailedResponse>>,
    asked: AtomicU32,
}

impl ScriptedPrompt {
    fn new(answers: Vec<FindFailedResponse>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            asked: AtomicU32::new(0),
        })
    }
}

impl PromptHandler for ScriptedPrompt {
    fn ask(&self, _target: &str) -> FindFailedResponse {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FindFailedResponse::Abort)
    }
}

#[test]
fn prompt_answers_feed_back_into_the_escalation() {
    let mut settings = fast_settings();
    settings.auto_wait_timeout = 0.0;
    let (matcher, mut region) = setup(settings);
    let prompt = ScriptedPrompt::new(vec![FindFailedResponse::Retry, FindFailedResponse::Skip]);
    region.set_prompt_handler(prompt.clone());
    region.set_find_failed_response(FindFailedResponse::Prompt);

    // first answer reruns the wait, second gives up quietly
    assert!(region.find(bitmap()).unwrap().is_none());
    assert_eq!(prompt.asked.load(Ordering::SeqCst), 2);
    assert_eq!(matcher.find_calls(), 2);
}

#[test]
fn prompt_answer_abort_raises_find_failed() {
    let mut settings = fast_settings();
    settings.auto_wait_timeout = 0.0;
    let (_, mut region) = setup(settings);
    let prompt = ScriptedPrompt::new(vec![FindFailedResponse::Abort]);
    region.set_prompt_handler(prompt.clone());
    region.set_find_failed_response(FindFailedResponse::Prompt);

    let err = region.find(bitmap()).unwrap_err();
    assert!(matches!(err, FindError::FindFailed(_)));
    assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
}

#[test]
fn prompt_without_a_handler_falls_back_to_abort() {
    let mut settings = fast_settings();
    settings.auto_wait_timeout = 0.0;
    let (_, mut region) = setup(settings);
    region.set_find_failed_response(FindFailedResponse::Prompt);

    let err = region.find(bitmap()).unwrap_err();
    assert!(matches!(err, FindError::FindFailed(_)));
}

#[test]
fn exists_swallows_errors_from_bad_targets() {
    let (_, mut region) = setup(fast_settings());
    // text search is off, so this target cannot be resolved
    assert!(region.exists("Submit", 0.0).is_none());
}

#[test]
fn find_propagates_target_resolution_errors() {
    let mut settings = fast_settings();
    settings.auto_wait_timeout = 0.0;
    let (_, mut region) = setup(settings);
    let err = region.find("no-such-file.png").unwrap_err();
    assert!(matches!(err, FindError::ImageMissing(_)));
}

#[test]
fn wait_vanish_reports_true_once_the_target_is_gone() {
    let (matcher, mut region) = setup(fast_settings());
    matcher.push_response(vec![hit(0, 0, 0.9)]);
    matcher.push_response(vec![hit(0, 0, 0.9)]);
    matcher.push_response(Vec::new());
    assert!(region.wait_vanish(bitmap(), 5.0));
    assert_eq!(matcher.find_calls(), 3);
}

#[test]
fn wait_vanish_reports_false_at_the_deadline() {
    let backend = Arc::new(StubBackend::new());
    let matcher = Arc::new(StubMatcher::new().with_default(vec![hit(0, 0, 0.9)]));
    let registry = DisplayRegistry::new(backend.clone(), backend, matcher.clone(), fast_settings());
    let mut region = Region::from_coords(0, 0, 800, 600, registry);
    assert!(!region.wait_vanish(bitmap(), 0.2));
    assert!(matcher.find_calls() > 1);
}

#[test]
fn pattern_similarity_overrides_the_default_threshold() {
    let (matcher, mut region) = setup(fast_settings());
    region.set_throw_on_find_failed(false);
    region.set_auto_wait_timeout(0.0);

    let img = RgbaImage::new(8, 8);
    let strict = Pattern::from_image(img.clone()).similar(0.95);
    let lenient = Pattern::from_image(img).similar(0.85);

    matcher.push_response(vec![hit(10, 10, 0.9)]);
    assert!(region.find(strict).unwrap().is_none());

    matcher.push_response(vec![hit(10, 10, 0.9)]);
    assert!(region.find(lenient).unwrap().is_some());
}

#[test]
fn pattern_target_offset_shifts_the_click_point() {
    let (matcher, mut region) = setup(fast_settings());
    matcher.push_response(vec![hit(100, 100, 0.9)]);
    let img = RgbaImage::new(8, 8);
    let p = Pattern::from_image(img).target_offset(10, -5);
    let m = region.find(p).unwrap().unwrap();
    // rect is 20x10 at (100,100): center (110,105), shifted by (10,-5)
    assert_eq!(m.target(), spotter_core::Location::new(120, 100));
}

#[test]
fn find_all_ranks_results_and_memoizes() {
    let (matcher, mut region) = setup(fast_settings());
    matcher.push_response(vec![hit(0, 0, 0.8), hit(40, 0, 0.95), hit(80, 0, 0.9)]);
    let all: Vec<_> = region.find_all(bitmap()).unwrap().collect();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].rect, Rect::new(40, 0, 20, 10));
    assert!(all[0].score >= all[1].score && all[1].score >= all[2].score);
    assert_eq!(region.last_matches().len(), 3);
}

#[test]
fn find_all_with_skip_returns_an_empty_iterator() {
    let mut settings = fast_settings();
    settings.auto_wait_timeout = 0.0;
    let (_, mut region) = setup(settings);
    region.set_throw_on_find_failed(false);
    let all: Vec<_> = region.find_all(bitmap()).unwrap().collect();
    assert!(all.is_empty());
    assert!(region.last_matches().is_empty());
}

#[test]
fn matches_translate_into_the_regions_coordinates() {
    let backend = Arc::new(StubBackend::new());
    let matcher = Arc::new(StubMatcher::new().with_default(vec![hit(5, 5, 0.9)]));
    let registry = DisplayRegistry::new(backend.clone(), backend, matcher, fast_settings());
    let mut region = Region::from_coords(200, 300, 400, 200, registry);
    let m = region.find(bitmap()).unwrap().unwrap();
    assert_eq!(m.rect, Rect::new(205, 305, 20, 10));
}

#[test]
fn screenless_region_reports_not_found_instead_of_failing() {
    let backend = Arc::new(StubBackend::new());
    let matcher = Arc::new(StubMatcher::new().with_default(vec![hit(0, 0, 0.9)]));
    let registry = DisplayRegistry::new(backend.clone(), backend, matcher, fast_settings());
    let mut region = Region::from_coords(5000, 5000, 100, 100, registry);
    region.set_throw_on_find_failed(false);
    region.set_auto_wait_timeout(0.0);
    assert!(region.find(bitmap()).unwrap().is_none());
}
