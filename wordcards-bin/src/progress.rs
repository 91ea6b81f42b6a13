use indicatif::{ProgressBar as Bar, ProgressStyle};
use std::sync::LazyLock;
use tokio::sync::mpsc::UnboundedReceiver;
use wordcards_lib::Event;

#[derive(Clone)]
struct ProgressConfig {
    template: &'static str,
    progress_chars: &'static str,
}

const CONFIG: ProgressConfig = ProgressConfig {
    template: "{pos}/{len:.238} {bar:.162/238} {wide_msg}",
    progress_chars: "━ ━",
};

static STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::with_template(CONFIG.template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(CONFIG.progress_chars)
});

/// Report progress to the CLI.
#[derive(Clone, Debug)]
pub(crate) struct Progress {
    bar: Option<Bar>,
}

impl Progress {
    pub(crate) fn new(words: usize, hide_bar: bool) -> Self {
        let bar = if hide_bar {
            None
        } else {
            let bar = Bar::new(words as u64).with_style(STYLE.clone());
            bar.set_message("Looking up words");
            Some(bar)
        };

        Progress { bar }
    }

    /// Feed the bar from build events until the sender is gone
    pub(crate) async fn follow(self, mut events: UnboundedReceiver<Event>) {
        while let Some(event) = events.recv().await {
            self.update(&event);
        }
        self.finish();
    }

    fn update(&self, event: &Event) {
        self.with_bar(|bar| match event {
            Event::WordCompleted { word, .. } => {
                bar.inc(1);
                bar.set_message(word.to_string());
            }
            Event::WordSkipped { word, .. } => {
                bar.inc(1);
                bar.set_message(format!("{word} (skipped)"));
            }
            Event::BackoffStarted => bar.set_message("Rate limited, waiting"),
            Event::BackoffProbed {
                still_throttled: true,
            } => bar.set_message("Still rate limited, waiting"),
            Event::BackoffEnded => bar.set_message("Resuming"),
            Event::RecordLimitReached { records } => {
                bar.set_message(format!("Record limit reached with {records} records"));
            }
            _ => {}
        });
    }

    fn finish(&self) {
        self.with_bar(Bar::finish_and_clear);
    }

    fn with_bar<F>(&self, action: F)
    where
        F: FnOnce(&Bar),
    {
        if let Some(bar) = &self.bar {
            action(bar);
        }
    }

    #[cfg(test)]
    fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(Bar::position)
    }
}
