/// Template matching against freshly captured screens
///
/// Scoring uses normalized squared differences over the three colour
/// channels, so lower is better and an exact match scores 0.
use super::store::TemplateStore;
use super::types::{MatchResult, Template};
use crate::adb::CaptureProvider;
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::definitions::Image;
use imageproc::integral_image::integral_squared_image;
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template};
use std::time::Duration;
use tokio::time::sleep;

/// Threshold and retry policy for one match call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchPolicy {
    /// Inclusive upper bound on the score for a hit
    pub threshold: f32,
    /// Extra attempts after the first; a call makes at most `retry_attempts + 1` captures
    pub retry_attempts: u32,
    /// Wait between attempts
    pub retry_delay: Duration,
}

/// Best location of a template inside a single capture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Top-left corner of the best window
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

fn channel(img: &RgbImage, c: usize) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| Luma([img.get_pixel(x, y)[c]]))
}

/// Sum over the `w`x`h` window at `(x, y)`; `integral` has a leading zero row and column.
fn window_sum(integral: &Image<Luma<u64>>, x: u32, y: u32, w: u32, h: u32) -> u64 {
    let at = |x, y| integral.get_pixel(x, y)[0];
    at(x + w, y + h) + at(x, y) - at(x + w, y) - at(x, y + h)
}

/// `SSE / sqrt(sum T^2 * sum I^2)`, capped at 1. Flat black windows score 1
/// unless the template is black too.
fn normalized(sse: f64, template_energy: u64, window_energy: u64) -> f32 {
    let denom = (template_energy as f64 * window_energy as f64).sqrt();
    if denom == 0.0 {
        return if sse == 0.0 { 0.0 } else { 1.0 };
    }
    (sse / denom).min(1.0) as f32
}

/// Global minimum of the colour squared-difference surface of `template` over `screen`.
///
/// Errors and energies are summed over R, G and B before normalising, so two
/// icons of equal brightness but different hue do not match.
/// Returns `None` when the template does not fit inside the screen.
pub fn best_match(screen: &RgbImage, template: &Template) -> Option<Candidate> {
    let (tw, th) = (template.width, template.height);
    if tw == 0 || th == 0 || screen.width() < tw || screen.height() < th {
        return None;
    }

    let (out_w, out_h) = (screen.width() - tw + 1, screen.height() - th + 1);
    let cells = (out_w * out_h) as usize;
    let mut errors = vec![0f64; cells];
    let mut window_energy = vec![0u64; cells];
    let mut template_energy = 0u64;

    for c in 0..3 {
        let screen_plane = channel(screen, c);
        let template_plane = channel(&template.pixels, c);
        template_energy += template_plane
            .pixels()
            .map(|p| u64::from(p[0]).pow(2))
            .sum::<u64>();

        let plane_errors = match_template(
            &screen_plane,
            &template_plane,
            MatchTemplateMethod::SumOfSquaredErrors,
        );
        let squares: Image<Luma<u64>> = integral_squared_image::<_, u64>(&screen_plane);
        for y in 0..out_h {
            for x in 0..out_w {
                let i = (y * out_w + x) as usize;
                errors[i] += f64::from(plane_errors.get_pixel(x, y)[0]);
                window_energy[i] += window_sum(&squares, x, y, tw, th);
            }
        }
    }

    let surface: Image<Luma<f32>> = ImageBuffer::from_fn(out_w, out_h, |x, y| {
        let i = (y * out_w + x) as usize;
        Luma([normalized(errors[i], template_energy, window_energy[i])])
    });
    let extremes = find_extremes(&surface);
    let (x, y) = extremes.min_value_location;
    Some(Candidate {
        x,
        y,
        score: extremes.min_value,
    })
}

/// Matches named templates against captures taken on demand.
pub struct TemplateMatcher<'a, S, C> {
    store: &'a S,
    capture: &'a C,
}

impl<'a, S: TemplateStore, C: CaptureProvider> TemplateMatcher<'a, S, C> {
    pub fn new(store: &'a S, capture: &'a C) -> Self {
        Self { store, capture }
    }

    /// Locate `name` on screen, capturing afresh for every attempt.
    ///
    /// Never fails: a missing template, unusable captures and misses all end
    /// up as `found = false`.
    pub async fn find(&self, name: &str, policy: &MatchPolicy) -> MatchResult {
        let template = match self.store.load(name) {
            Ok(template) => template,
            Err(e) => {
                log::warn!("❌ {e}");
                return MatchResult::not_found(None);
            }
        };

        let total = policy.retry_attempts.saturating_add(1);
        let mut last_score = None;

        for attempt in 0..=policy.retry_attempts {
            let n = attempt.saturating_add(1);

            let screen = match self.capture.capture().await {
                Ok(bytes) => match image::load_from_memory(&bytes) {
                    Ok(img) => img.to_rgb8(),
                    Err(e) => {
                        log::warn!("⚠️ Unreadable capture for {name} (attempt {n}/{total}): {e}");
                        sleep(policy.retry_delay).await;
                        continue;
                    }
                },
                Err(e) => {
                    log::warn!("📸 Capture failed for {name} (attempt {n}/{total}): {e}");
                    sleep(policy.retry_delay).await;
                    continue;
                }
            };

            let Some(candidate) = best_match(&screen, &template) else {
                log::warn!(
                    "⚠️ Capture {}x{} is smaller than {name} {}x{} (attempt {n}/{total})",
                    screen.width(),
                    screen.height(),
                    template.width,
                    template.height
                );
                sleep(policy.retry_delay).await;
                continue;
            };

            last_score = Some(candidate.score);
            if candidate.score <= policy.threshold {
                let center = template.center_at(candidate.x, candidate.y);
                log::info!(
                    "🎯 {name} matched (attempt {n}): {center}, score {:.4}",
                    candidate.score
                );
                return MatchResult::found_at(center, candidate.score);
            }

            log::info!(
                "👀 {name} missed (attempt {n}): score {:.4} > threshold {:.2}",
                candidate.score,
                policy.threshold
            );
            if attempt < policy.retry_attempts {
                sleep(policy.retry_delay).await;
            }
        }

        log::info!("{name}: all {total} attempts failed");
        MatchResult::not_found(last_score)
    }
}
