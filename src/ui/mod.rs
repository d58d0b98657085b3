//! Terminal output for the CLI
//!
//! Uses `cliclack` in an interactive terminal and plain, greppable lines
//! everywhere else (CI, pipes, tests).

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    format_bytes, intro, key_value, outro_error, outro_success, section, step_error, step_info,
    step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{BuildProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, CssModTheme};
