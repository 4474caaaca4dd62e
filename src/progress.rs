use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

pub struct Progress {
    enabled: bool,
    start: Instant,

    // UI
    mp: Option<MultiProgress>,
    stage: ProgressBar,
    posts: ProgressBar,

    // Counters
    posts_done: AtomicU64,
    images_total: AtomicU64,
    images_unique: AtomicU64,
}

impl Progress {
    pub fn new(enabled: bool) -> Arc<Self> {
        let start = Instant::now();

        if !enabled {
            return Arc::new(Self {
                enabled: false,
                start,
                mp: None,
                stage: ProgressBar::hidden(),
                posts: ProgressBar::hidden(),
                posts_done: AtomicU64::new(0),
                images_total: AtomicU64::new(0),
                images_unique: AtomicU64::new(0),
            });
        }

        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());

        let stage = mp.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}  [{elapsed_precise}]") {
            stage.set_style(style);
        }
        stage.enable_steady_tick(Duration::from_millis(80));
        stage.set_message("starting");

        let posts = mp.add(ProgressBar::new(0));
        if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
            posts.set_style(style.progress_chars("##-"));
        }
        posts.set_message("posts");

        Arc::new(Self {
            enabled: true,
            start,
            mp: Some(mp),
            stage,
            posts,
            posts_done: AtomicU64::new(0),
            images_total: AtomicU64::new(0),
            images_unique: AtomicU64::new(0),
        })
    }

    pub fn set_stage(&self, msg: impl Into<String>) {
        if !self.enabled {
            return;
        }
        self.stage.set_message(msg.into());
    }

    pub fn set_posts_total(&self, total: usize) {
        if self.enabled {
            self.posts.set_length(total as u64);
        }
    }

    pub fn post_done(&self, uid: &str) {
        self.posts_done.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            self.posts.inc(1);
            self.posts.set_message(uid.to_string());
        }
    }

    pub fn image_request(&self, is_unique: bool) {
        self.images_total.fetch_add(1, Ordering::Relaxed);
        if is_unique {
            self.images_unique.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn finish(&self) {
        let posts = self.posts_done.load(Ordering::Relaxed);
        let images = self.images_unique.load(Ordering::Relaxed);
        let image_refs = self.images_total.load(Ordering::Relaxed);
        tracing::info!(posts, images, image_refs, "build finished");

        if !self.enabled {
            return;
        }
        self.stage.finish_with_message("done");
        self.posts.finish_and_clear();
        if let Some(mp) = &self.mp {
            // Best effort: ensure the last render flushes.
            let _ = mp.println(format!(
                "Rendered {posts} posts in {}",
                HumanDuration(self.start.elapsed())
            ));
        }
    }
}
