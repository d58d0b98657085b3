//! cliclack theme

use cliclack::ThemeState;
use console::Style;

/// Magenta bars, green on submit
#[derive(Debug, Clone, Default)]
pub struct CssModTheme;

impl cliclack::Theme for CssModTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().magenta(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().magenta().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().magenta(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green(),
        }
    }
}

pub fn init_theme() {
    cliclack::set_theme(CssModTheme);
}
