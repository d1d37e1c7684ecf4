use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const TICK_INTERVAL: Duration = Duration::from_millis(100);
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"];

/// Status line repainted by a background task until the guard is finished or
/// dropped.
///
/// The task shares nothing with the caller except the stop token.
#[derive(Debug)]
pub struct Spinner {
    bar: ProgressBar,
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Draws on stderr, or nowhere when stderr is not a terminal.
    pub fn start(message: impl Into<String>) -> Self {
        let target = if std::io::stderr().is_terminal() {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        Self::with_target(message, target)
    }

    pub fn hidden(message: impl Into<String>) -> Self {
        Self::with_target(message, ProgressDrawTarget::hidden())
    }

    fn with_target(message: impl Into<String>, target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(None, target);
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(FRAMES);
        bar.set_style(style);
        bar.set_message(message.into());

        let stop = CancellationToken::new();
        let task = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let bar = bar.clone();
            let stop = stop.clone();
            handle.spawn(async move {
                let mut ticker = tokio::time::interval(TICK_INTERVAL);
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = ticker.tick() => bar.tick(),
                    }
                }
            })
        });

        Self { bar, stop, task }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|task| !task.is_finished()).unwrap_or(false)
    }

    /// Stops the repaint task and waits for it to exit.
    pub async fn finish(mut self) {
        self.stop.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop.cancel();
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finish_stops_background_task() {
        let spinner = Spinner::hidden("working");
        assert!(spinner.is_running());
        spinner.set_message("still working");
        let stop = spinner.stop.clone();
        spinner.finish().await;
        assert!(stop.is_cancelled());
    }

    #[tokio::test]
    async fn drop_cancels_task() {
        let spinner = Spinner::hidden("working");
        let stop = spinner.stop.clone();
        drop(spinner);
        assert!(stop.is_cancelled());
    }

    #[test]
    fn works_without_runtime() {
        let spinner = Spinner::hidden("sync");
        assert!(!spinner.is_running());
    }
}
