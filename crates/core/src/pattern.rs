use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{GrayImage, RgbaImage};

use crate::errors::FindError;
use crate::geometry::{Location, Rect};
use crate::logger;
use crate::settings::Settings;

/// What a find operation searches for. Plain strings are classified by
/// extension: image-like names are file references, everything else is a
/// text (OCR) target.
#[derive(Clone, Debug)]
pub enum Target {
    /// Image file, resolved against the bundle path when relative.
    Image(PathBuf),
    /// In-memory bitmap.
    Bitmap(Arc<RgbaImage>),
    /// Text to be found via OCR (switched off by default).
    Text(String),
    /// Compiled pattern with its own similarity and click offset.
    Pattern(Pattern),
}

fn is_image_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".png") || lower.ends_with(".jpg")
}

impl Target {
    pub fn parse(s: &str) -> Target {
        if is_image_file(s) {
            Target::Image(PathBuf::from(s))
        } else {
            Target::Text(s.to_string())
        }
    }

    /// Short description for log and error messages.
    pub fn describe(&self) -> String {
        match self {
            Target::Image(p) => p.display().to_string(),
            Target::Bitmap(img) => format!("bitmap {}x{}", img.width(), img.height()),
            Target::Text(s) => format!("text \"{}\"", s),
            Target::Pattern(p) => p.to_string(),
        }
    }

    /// Resolve to a searchable needle. Missing files and text targets are
    /// configuration errors, surfaced immediately and never retried.
    pub(crate) fn needle(&self, settings: &Settings) -> Result<Needle, FindError> {
        match self {
            Target::Image(path) => {
                let file = locate_image(path, settings.bundle_path.as_deref())?;
                let gray = load_gray(&file)?;
                Ok(Needle {
                    gray,
                    image: Some(file.display().to_string()),
                    similarity: settings.min_similarity,
                    offset: Location::default(),
                })
            }
            Target::Bitmap(img) => Ok(Needle {
                gray: image::imageops::grayscale(img.as_ref()),
                image: None,
                similarity: settings.min_similarity,
                offset: Location::default(),
            }),
            Target::Text(s) => {
                // OCR is wired through here but currently has no recognizer;
                // the disabled state is a typed result, not a sentinel.
                if !settings.text_search {
                    logger::error(&format!("find(\"{}\"): text search is currently switched off", s));
                } else {
                    logger::error(&format!("find(\"{}\"): no text recognizer installed", s));
                }
                Err(FindError::TextSearchUnsupported(s.clone()))
            }
            Target::Pattern(p) => p.needle(settings),
        }
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Target::parse(s)
    }
}

impl From<Pattern> for Target {
    fn from(p: Pattern) -> Self {
        Target::Pattern(p)
    }
}

#[derive(Clone, Debug)]
enum PatternSource {
    File(PathBuf),
    Bitmap(Arc<RgbaImage>),
}

/// A more complex search target: non-default minimum similarity and/or a
/// click target other than the match center.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: PatternSource,
    similarity: Option<f64>,
    offset: Location,
}

impl Pattern {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            source: PatternSource::File(path.into()),
            similarity: None,
            offset: Location::default(),
        }
    }

    pub fn from_image(img: RgbaImage) -> Self {
        Self {
            source: PatternSource::Bitmap(Arc::new(img)),
            similarity: None,
            offset: Location::default(),
        }
    }

    /// Minimum similarity to use instead of the process default.
    pub fn similar(mut self, sim: f64) -> Self {
        self.similarity = Some(sim);
        self
    }

    /// Require a near-exact match (0.99).
    pub fn exact(mut self) -> Self {
        self.similarity = Some(0.99);
        self
    }

    /// Offset from the match center used by mouse actions.
    pub fn target_offset(mut self, dx: i32, dy: i32) -> Self {
        self.offset = Location::new(dx, dy);
        self
    }

    pub fn similarity(&self) -> Option<f64> {
        self.similarity
    }

    pub fn offset(&self) -> Location {
        self.offset
    }

    fn needle(&self, settings: &Settings) -> Result<Needle, FindError> {
        let (gray, image) = match &self.source {
            PatternSource::File(path) => {
                let file = locate_image(path, settings.bundle_path.as_deref())?;
                (load_gray(&file)?, Some(file.display().to_string()))
            }
            PatternSource::Bitmap(img) => (image::imageops::grayscale(img.as_ref()), None),
        };
        Ok(Needle {
            gray,
            image,
            similarity: self.similarity.unwrap_or(settings.min_similarity),
            offset: self.offset,
        })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            PatternSource::File(p) => write!(f, "P({})", p.display())?,
            PatternSource::Bitmap(img) => write!(f, "P(bitmap {}x{})", img.width(), img.height())?,
        }
        if let Some(s) = self.similarity {
            write!(f, " S: {}", s)?;
        }
        if self.offset != Location::default() {
            write!(f, " T: {},{}", self.offset.x, self.offset.y)?;
        }
        Ok(())
    }
}

/// Resolved search input handed to the matcher: grayscale pixels plus the
/// effective threshold and click offset.
#[derive(Clone, Debug)]
pub(crate) struct Needle {
    pub gray: GrayImage,
    pub image: Option<String>,
    pub similarity: f64,
    pub offset: Location,
}

/// Resolve an image reference: absolute paths and existing relative paths
/// are taken as-is, otherwise the bundle path is tried.
pub fn locate_image(path: &Path, bundle: Option<&Path>) -> Result<PathBuf, FindError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.is_relative() {
        if let Some(dir) = bundle {
            let joined = dir.join(path);
            if joined.is_file() {
                return Ok(joined);
            }
        }
    }
    Err(FindError::ImageMissing(path.to_path_buf()))
}

fn load_gray(path: &Path) -> Result<GrayImage, FindError> {
    match image::open(path) {
        Ok(img) => Ok(img.to_luma8()),
        Err(_) => Err(FindError::ImageMissing(path.to_path_buf())),
    }
}

/// A found target instance: where it was, how well it scored, which image
/// produced it, and where mouse actions should land.
#[derive(Clone, Debug)]
pub struct Match {
    pub rect: Rect,
    pub score: f64,
    pub image: Option<String>,
    target_offset: Location,
}

impl Match {
    pub fn new(rect: Rect, score: f64, image: Option<String>, target_offset: Location) -> Self {
        Self { rect, score, image, target_offset }
    }

    pub fn center(&self) -> Location {
        self.rect.center()
    }

    /// Click point: the center shifted by the pattern's target offset.
    pub fn target(&self) -> Location {
        self.center().offset(self.target_offset.x, self.target_offset.y)
    }

    pub fn target_offset(&self) -> Location {
        self.target_offset
    }

    pub fn set_target_offset(&mut self, offset: Location) {
        self.target_offset = offset;
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{} S:{:.2}", self.rect, self.score)
    }
}
