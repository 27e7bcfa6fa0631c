// Tests for the capture-and-match loop
// Focus: retry accounting, threshold boundary, unusable captures

/// In-memory screens and patterns shared with the routine tests.
#[cfg(test)]
pub(crate) mod fakes {
    use crate::adb::{AdbError, AdbResult, CaptureProvider};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const SCREEN_WIDTH: u32 = 64;
    pub(crate) const SCREEN_HEIGHT: u32 = 48;

    /// Deterministic noise so different seeds never look alike.
    pub(crate) fn noise_patch(seed: u32, width: u32, height: u32) -> RgbImage {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
        let mut next = move || {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            30 + ((state >> 16) % 200) as u8
        };
        RgbImage::from_fn(width, height, |_, _| Rgb([next(), next(), next()]))
    }

    /// Flat screen with each patch pasted at its top-left corner.
    pub(crate) fn screen_with(patches: &[(&RgbImage, u32, u32)]) -> RgbImage {
        let mut screen = RgbImage::from_pixel(SCREEN_WIDTH, SCREEN_HEIGHT, Rgb([40, 40, 40]));
        for (patch, x, y) in patches {
            image::imageops::replace(&mut screen, *patch, i64::from(*x), i64::from(*y));
        }
        screen
    }

    pub(crate) fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Serves queued frames in order and repeats the last one forever.
    /// A `None` frame makes that capture fail.
    pub(crate) struct FakeScreen {
        frames: Mutex<VecDeque<Option<Vec<u8>>>>,
        captures: AtomicUsize,
    }

    impl FakeScreen {
        pub(crate) fn showing(img: &RgbImage) -> Self {
            Self::from_frames(vec![Some(encode_png(img))])
        }

        pub(crate) fn sequence(imgs: &[RgbImage]) -> Self {
            Self::from_frames(imgs.iter().map(|img| Some(encode_png(img))).collect())
        }

        pub(crate) fn failing() -> Self {
            Self::from_frames(vec![None])
        }

        pub(crate) fn raw(bytes: Vec<u8>) -> Self {
            Self::from_frames(vec![Some(bytes)])
        }

        fn from_frames(frames: Vec<Option<Vec<u8>>>) -> Self {
            Self {
                frames: Mutex::new(frames.into()),
                captures: AtomicUsize::new(0),
            }
        }

        pub(crate) fn captures(&self) -> usize {
            self.captures.load(Ordering::SeqCst)
        }
    }

    impl CaptureProvider for FakeScreen {
        async fn capture(&self) -> AdbResult<Vec<u8>> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            let mut frames = self.frames.lock().unwrap();
            let frame = if frames.len() > 1 {
                frames.pop_front().flatten()
            } else {
                frames.front().cloned().flatten()
            };
            frame.ok_or(AdbError::EmptyCapture)
        }
    }
}

#[cfg(test)]
mod matcher_tests {
    use super::fakes::*;
    use crate::template_matching::{
        MatchPolicy, MatchResult, MemoryTemplateStore, Point, Template, TemplateMatcher,
        best_match,
    };
    use image::{DynamicImage, Rgb, RgbImage};
    use std::time::Duration;
    use tokio::time::Instant;

    const DELAY: Duration = Duration::from_millis(500);

    fn policy(threshold: f32, retry_attempts: u32) -> MatchPolicy {
        MatchPolicy {
            threshold,
            retry_attempts,
            retry_delay: DELAY,
        }
    }

    fn store_with(name: &str, seed: u32) -> MemoryTemplateStore {
        MemoryTemplateStore::new().with(Template::new(name, noise_patch(seed, 12, 10)))
    }

    // ============================================================
    // HITS
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_identical_capture_matches_at_center() {
        let store = store_with("queding.png", 1);
        let screen = FakeScreen::showing(&noise_patch(1, 12, 10));
        let matcher = TemplateMatcher::new(&store, &screen);

        let result = matcher.find("queding.png", &policy(0.25, 1)).await;

        assert!(result.found);
        assert_eq!(result.position(), Some(Point::new(6, 5)));
        assert_eq!(result.score, Some(0.0));
        assert_eq!(screen.captures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_match_reports_center_of_best_window() {
        let store = store_with("leidian.png", 2);
        let patch = noise_patch(2, 12, 10);
        let screen = FakeScreen::showing(&screen_with(&[(&patch, 20, 14)]));
        let matcher = TemplateMatcher::new(&store, &screen);

        let result = matcher.find("leidian.png", &policy(0.25, 1)).await;

        assert_eq!((result.x, result.y), (26, 19));
        assert_eq!(screen.captures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_found_on_retry_takes_a_fresh_capture() {
        let store = store_with("caoman.png", 3);
        let patch = noise_patch(3, 12, 10);
        let screen = FakeScreen::sequence(&[
            screen_with(&[]),
            screen_with(&[(&patch, 40, 30)]),
        ]);
        let matcher = TemplateMatcher::new(&store, &screen);
        let start = Instant::now();

        let result = matcher.find("caoman.png", &policy(0.25, 2)).await;

        assert_eq!(result.position(), Some(Point::new(46, 35)));
        assert_eq!(screen.captures(), 2);
        assert_eq!(start.elapsed(), DELAY);
    }

    // ============================================================
    // THRESHOLD
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_threshold_is_inclusive() {
        let patch = noise_patch(4, 12, 10);
        let template = Template::new("feilong.png", patch.clone());
        let mut near = screen_with(&[(&patch, 8, 8)]);
        let Rgb([r, g, b]) = *near.get_pixel(10, 10);
        near.put_pixel(10, 10, Rgb([r.saturating_sub(25), g, b]));

        let score = best_match(&near, &template).unwrap().score;
        assert!(score > 0.0);

        let store = MemoryTemplateStore::new().with(template);
        let screen = FakeScreen::showing(&near);
        let matcher = TemplateMatcher::new(&store, &screen);

        let at = matcher.find("feilong.png", &policy(score, 0)).await;
        assert!(at.found, "score equal to threshold must match");

        let below = f32::from_bits(score.to_bits() - 1);
        let under = matcher.find("feilong.png", &policy(below, 0)).await;
        assert!(!under.found);
        assert_eq!(under.score, Some(score));
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_brightness_different_hue_does_not_match() {
        // Red and green stripes that collapse to the same gray level
        let striped = |on: Rgb<u8>| {
            RgbImage::from_fn(12, 10, |x, _| if x % 2 == 0 { on } else { Rgb([0, 0, 0]) })
        };
        let red = striped(Rgb([255, 0, 0]));
        let green = striped(Rgb([0, 76, 0]));
        assert_eq!(
            DynamicImage::ImageRgb8(red.clone()).to_luma8(),
            DynamicImage::ImageRgb8(green.clone()).to_luma8()
        );

        let store = MemoryTemplateStore::new().with(Template::new("nvhuang.png", red));
        let screen = FakeScreen::showing(&green);
        let matcher = TemplateMatcher::new(&store, &screen);

        let result = matcher.find("nvhuang.png", &policy(0.25, 0)).await;

        assert!(!result.found);
        assert!(result.score.unwrap() > 0.25);
    }

    // ============================================================
    // MISSES AND RETRIES
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_missing_template_takes_no_capture() {
        let store = MemoryTemplateStore::new();
        let screen = FakeScreen::showing(&screen_with(&[]));
        let matcher = TemplateMatcher::new(&store, &screen);
        let start = Instant::now();

        let result = matcher.find("tianniao.png", &policy(0.25, 3)).await;

        assert_eq!(result, MatchResult::not_found(None));
        assert_eq!(screen.captures(), 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_constant_miss_uses_every_attempt() {
        let store = store_with("jieshu.png", 5);
        let screen = FakeScreen::showing(&screen_with(&[]));
        let matcher = TemplateMatcher::new(&store, &screen);
        let start = Instant::now();

        let result = matcher.find("jieshu.png", &policy(0.25, 3)).await;

        assert!(!result.found);
        assert_eq!((result.x, result.y), (-1, -1));
        assert!(result.score.unwrap() > 0.25);
        assert_eq!(screen.captures(), 4);
        // No wait after the final miss
        assert_eq!(start.elapsed(), DELAY * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_single_capture() {
        let store = store_with("jieshu.png", 5);
        let screen = FakeScreen::showing(&screen_with(&[]));
        let matcher = TemplateMatcher::new(&store, &screen);

        let result = matcher.find("jieshu.png", &policy(0.25, 0)).await;

        assert!(!result.found);
        assert_eq!(screen.captures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failures_consume_attempts() {
        let store = store_with("huiying.png", 6);
        let screen = FakeScreen::failing();
        let matcher = TemplateMatcher::new(&store, &screen);
        let start = Instant::now();

        let result = matcher.find("huiying.png", &policy(0.25, 2)).await;

        assert_eq!(result, MatchResult::not_found(None));
        assert_eq!(screen.captures(), 3);
        assert_eq!(start.elapsed(), DELAY * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_capture_is_a_failed_attempt() {
        let store = store_with("huiying.png", 6);
        let screen = FakeScreen::raw(b"not an image".to_vec());
        let matcher = TemplateMatcher::new(&store, &screen);

        let result = matcher.find("huiying.png", &policy(0.25, 1)).await;

        assert!(!result.found);
        assert_eq!(result.score, None);
        assert_eq!(screen.captures(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_smaller_than_template() {
        let store = store_with("sousuo.png", 7);
        let screen = FakeScreen::showing(&noise_patch(7, 6, 4));
        let matcher = TemplateMatcher::new(&store, &screen);

        let result = matcher.find("sousuo.png", &policy(1.0, 1)).await;

        assert_eq!(result, MatchResult::not_found(None));
        assert_eq!(screen.captures(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_maximum_retry_count_still_matches_first_capture() {
        let store = store_with("queding.png", 8);
        let screen = FakeScreen::showing(&noise_patch(8, 12, 10));
        let matcher = TemplateMatcher::new(&store, &screen);

        let result = matcher.find("queding.png", &policy(0.25, u32::MAX)).await;

        assert!(result.found);
        assert_eq!(screen.captures(), 1);
    }
}
