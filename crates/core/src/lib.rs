//! Screen-driven GUI automation: capture a region of the desktop, find
//! image targets in it, wait for them to appear or vanish, watch for
//! changes, and drive mouse and keyboard against what was found.

pub mod actions;
pub mod backend;
pub mod errors;
pub mod finder;
pub mod geometry;
pub mod logger;
pub mod matcher;
pub mod observer;
pub mod pattern;
pub mod poller;
pub mod region;
pub mod screen;
pub mod settings;
pub mod template;

pub use actions::ActionTarget;
pub use backend::{create_backend, Button, InputBackend, ScreenBackend};
pub use errors::FindError;
pub use finder::Finder;
pub use geometry::{Location, Rect};
pub use matcher::{Candidate, Matcher, StubMatcher};
pub use observer::{ObserveCallback, ObserveEvent, ObserverHandle};
pub use pattern::{Match, Pattern, Target};
pub use region::{FindFailedResponse, Matches, PromptHandler, Region};
pub use screen::{DisplayId, DisplayRegistry, Robot, Screen};
pub use settings::Settings;
pub use template::CorrelationMatcher;
