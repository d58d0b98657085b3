//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "  {spinner:.magenta} Transforming  {bar:24.magenta/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}";

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }
}

/// Per-module progress for `cssmod build`
///
/// An indicatif bar in interactive mode; a single start line otherwise so
/// CI logs stay short.
pub struct BuildProgress {
    bar: Option<ProgressBar>,
}

impl BuildProgress {
    pub fn new(ctx: &UiContext, modules: u64) -> Self {
        if !ctx.use_fancy_output() {
            println!("Transforming {} module(s)...", modules);
            return Self { bar: None };
        }

        let bar = ProgressBar::new(modules);
        if let Ok(bar_style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            bar.set_style(
                bar_style
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .progress_chars("━╸─"),
            );
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    /// Record one finished module
    pub fn on_module(&self, path: &Path) {
        if let Some(ref bar) = self.bar {
            if let Some(name) = path.file_name() {
                bar.set_message(name.to_string_lossy().into_owned());
            }
            bar.inc(1);
        }
    }

    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Clearing cache...");
        spinner.stop("Removed 2 cache entries");
    }

    #[test]
    fn build_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = BuildProgress::new(&ctx, 2);
        progress.on_module(Path::new("/app/a.module.css"));
        progress.on_module(Path::new("/app/b.module.css"));
        progress.finish();
        assert!(progress.bar.is_none());
    }
}
