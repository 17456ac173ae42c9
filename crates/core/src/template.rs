use image::GrayImage;

use crate::geometry::Rect;
use crate::matcher::{Candidate, Matcher};

/// Per-pixel luma delta above which a pixel counts as changed.
const CHANGE_DELTA: i16 = 16;

/// Built-in matching engine: an exhaustive zero-normalized cross-correlation
/// sweep. Correctness-first; for production-size screens a native engine
/// should be plugged in behind the Matcher trait instead.
pub struct CorrelationMatcher;

impl CorrelationMatcher {
    pub fn new() -> Self {
        CorrelationMatcher
    }
}

impl Default for CorrelationMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn zncc_at(hay: &GrayImage, needle: &GrayImage, ox: u32, oy: u32, n_mean: f64, n_dev: f64) -> f64 {
    let (nw, nh) = needle.dimensions();
    let count = (nw * nh) as f64;

    let mut h_sum = 0.0;
    for y in 0..nh {
        for x in 0..nw {
            h_sum += hay.get_pixel(ox + x, oy + y)[0] as f64;
        }
    }
    let h_mean = h_sum / count;

    let mut cross = 0.0;
    let mut h_var = 0.0;
    for y in 0..nh {
        for x in 0..nw {
            let hv = hay.get_pixel(ox + x, oy + y)[0] as f64 - h_mean;
            let nv = needle.get_pixel(x, y)[0] as f64 - n_mean;
            cross += hv * nv;
            h_var += hv * hv;
        }
    }
    let h_dev = h_var.sqrt();
    if n_dev == 0.0 || h_dev == 0.0 {
        // flat patches: identical means count as a perfect match
        return if n_dev == 0.0 && h_dev == 0.0 && (n_mean - h_mean).abs() < 1.0 {
            1.0
        } else {
            0.0
        };
    }
    (cross / (n_dev * h_dev)).max(0.0)
}

impl Matcher for CorrelationMatcher {
    fn find(
        &self,
        haystack: &GrayImage,
        needle: &GrayImage,
        min_similarity: f64,
        find_all: bool,
    ) -> Vec<Candidate> {
        let (hw, hh) = haystack.dimensions();
        let (nw, nh) = needle.dimensions();
        if nw == 0 || nh == 0 || nw > hw || nh > hh {
            return Vec::new();
        }

        let count = (nw * nh) as f64;
        let n_mean = needle.pixels().map(|p| p[0] as f64).sum::<f64>() / count;
        let n_dev = needle
            .pixels()
            .map(|p| {
                let d = p[0] as f64 - n_mean;
                d * d
            })
            .sum::<f64>()
            .sqrt();

        let mut scored = Vec::new();
        for oy in 0..=(hh - nh) {
            for ox in 0..=(hw - nw) {
                let score = zncc_at(haystack, needle, ox, oy, n_mean, n_dev);
                if score >= min_similarity {
                    scored.push(Candidate {
                        rect: Rect::new(ox as i32, oy as i32, nw as i32, nh as i32),
                        score,
                    });
                }
            }
        }
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        // greedy suppression: keep the best of each overlapping cluster
        let mut out: Vec<Candidate> = Vec::new();
        for c in scored {
            if out.iter().all(|kept| !kept.rect.overlaps(c.rect)) {
                out.push(c);
                if !find_all {
                    break;
                }
            }
        }
        out
    }

    fn find_changes(&self, prev: &GrayImage, curr: &GrayImage, min_area: u32) -> Vec<Rect> {
        let (w, h) = curr.dimensions();
        if prev.dimensions() != (w, h) {
            // frame geometry changed between ticks: everything changed
            let whole = Rect::new(0, 0, w as i32, h as i32);
            return if whole.area() >= min_area as i64 { vec![whole] } else { Vec::new() };
        }

        let mut mask = vec![false; (w * h) as usize];
        for y in 0..h {
            for x in 0..w {
                let d = prev.get_pixel(x, y)[0] as i16 - curr.get_pixel(x, y)[0] as i16;
                mask[(y * w + x) as usize] = d.abs() > CHANGE_DELTA;
            }
        }

        // 4-connected components over the change mask, as bounding boxes
        let mut seen = vec![false; mask.len()];
        let mut boxes = Vec::new();
        let mut stack = Vec::new();
        for start in 0..mask.len() {
            if !mask[start] || seen[start] {
                continue;
            }
            let (mut min_x, mut min_y) = ((start as u32 % w) as i32, (start as u32 / w) as i32);
            let (mut max_x, mut max_y) = (min_x, min_y);
            seen[start] = true;
            stack.push(start as u32);
            while let Some(idx) = stack.pop() {
                let (x, y) = ((idx % w) as i32, (idx / w) as i32);
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
                let neighbors = [
                    (x > 0).then(|| idx - 1),
                    (x + 1 < w as i32).then(|| idx + 1),
                    (y > 0).then(|| idx - w),
                    (y + 1 < h as i32).then(|| idx + w),
                ];
                for n in neighbors.into_iter().flatten() {
                    let ni = n as usize;
                    if mask[ni] && !seen[ni] {
                        seen[ni] = true;
                        stack.push(n);
                    }
                }
            }
            let b = Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1);
            if b.area() >= min_area as i64 {
                boxes.push(b);
            }
        }
        boxes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([((x * 7 + y * 13) % 251) as u8]))
    }

    // noise-like texture; a shifted copy does not correlate with itself
    fn speckle(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let v = x
                .wrapping_mul(2654435761)
                .wrapping_add(y.wrapping_mul(40503))
                .wrapping_mul(2246822519);
            Luma([(v >> 16) as u8])
        })
    }

    #[test]
    fn finds_exact_subimage_at_offset() {
        let mut hay = GrayImage::from_pixel(40, 30, Luma([40]));
        let patch = speckle(6, 5);
        image::imageops::overlay(&mut hay, &patch, 12, 8);
        let out = CorrelationMatcher::new().find(&hay, &patch, 0.95, false);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rect, Rect::new(12, 8, 6, 5));
        assert!(out[0].score > 0.99);
    }

    #[test]
    fn oversized_needle_matches_nothing() {
        let hay = gradient(10, 10);
        let needle = gradient(20, 20);
        assert!(CorrelationMatcher::new().find(&hay, &needle, 0.5, true).is_empty());
    }

    #[test]
    fn find_all_suppresses_overlaps() {
        // two copies of the same patch, far apart
        let mut hay = GrayImage::from_pixel(60, 20, Luma([0]));
        let patch = gradient(6, 6);
        image::imageops::overlay(&mut hay, &patch, 4, 4);
        image::imageops::overlay(&mut hay, &patch, 44, 10);
        let out = CorrelationMatcher::new().find(&hay, &patch, 0.98, true);
        assert_eq!(out.len(), 2);
        assert!(!out[0].rect.overlaps(out[1].rect));
    }

    #[test]
    fn change_detection_boxes_the_changed_area() {
        let prev = GrayImage::from_pixel(32, 32, Luma([10]));
        let mut curr = prev.clone();
        for y in 5..15 {
            for x in 8..20 {
                curr.put_pixel(x, y, Luma([200]));
            }
        }
        let m = CorrelationMatcher::new();
        let boxes = m.find_changes(&prev, &curr, 50);
        assert_eq!(boxes, vec![Rect::new(8, 5, 12, 10)]);
        // area filter: the 120-pixel box is below a 200-pixel floor
        assert!(m.find_changes(&prev, &curr, 200).is_empty());
    }

    #[test]
    fn identical_frames_have_no_changes() {
        let f = gradient(16, 16);
        assert!(CorrelationMatcher::new().find_changes(&f, &f, 1).is_empty());
    }
}
