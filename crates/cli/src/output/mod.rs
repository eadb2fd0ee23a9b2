//! Terminal and JSON output

mod formatter;
mod progress;

use std::io::IsTerminal;

use snap_core::{ColorMode, Defaults, OutputFormat};

pub use formatter::Formatter;
pub use progress::ProgressBar;

/// Effective output settings: configured defaults with CLI flags on top
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub no_color: bool,
    pub no_progress: bool,
    /// Only errors are printed
    pub quiet: bool,
}

impl OutputConfig {
    /// Settings from `config.toml` before any flag is applied
    pub fn from_defaults(defaults: &Defaults) -> Self {
        let no_color = match defaults.color {
            ColorMode::Always => false,
            ColorMode::Never => true,
            ColorMode::Auto => !std::io::stdout().is_terminal(),
        };
        Self {
            json: defaults.output == OutputFormat::Json,
            no_color,
            no_progress: !defaults.progress,
            quiet: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_defaults() {
        let defaults = Defaults {
            output: OutputFormat::Json,
            color: ColorMode::Never,
            progress: false,
            ..Defaults::default()
        };
        let config = OutputConfig::from_defaults(&defaults);
        assert!(config.json);
        assert!(config.no_color);
        assert!(config.no_progress);
        assert!(!config.quiet);

        let config = OutputConfig::from_defaults(&Defaults {
            color: ColorMode::Always,
            ..Defaults::default()
        });
        assert!(!config.json);
        assert!(!config.no_color);
        assert!(!config.no_progress);
    }
}
