//! CLI argument definitions using clap derive

use crate::pipeline::BuildTarget;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cssmod - CSS modules transform cache
///
/// Scopes class names in CSS modules and caches the results by content,
/// for server and browser bundles.
#[derive(Parser, Debug)]
#[command(name = "cssmod")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CSSMOD_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load CSS modules and print what the bundler would receive
    Transform(TransformArgs),

    /// Transform every CSS module under the source root
    Build(BuildArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Inspect or clear the persistent transform cache
    Cache(CacheArgs),
}

/// Arguments for the transform command
#[derive(Parser, Debug)]
pub struct TransformArgs {
    /// Import specifiers (`./a.module.css`, `~/routes/a.module.css`)
    #[arg(required = true)]
    pub specifiers: Vec<String>,

    /// Directory relative specifiers are resolved from (defaults to current directory)
    #[arg(long)]
    pub from: Option<PathBuf>,

    /// Build target
    #[arg(short, long, default_value = "server")]
    pub target: BuildTarget,

    /// Output format
    #[arg(short, long, default_value = "json")]
    pub format: OutputFormat,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Build target
    #[arg(short, long, default_value = "browser")]
    pub target: BuildTarget,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default cssmod.toml
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable text
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show entry count and size
    Info {
        /// Output format
        #[arg(short, long, default_value = "plain")]
        format: OutputFormat,
    },

    /// Remove every persistent cache entry
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_transform() {
        let cli = Cli::parse_from([
            "cssmod",
            "transform",
            "./a.module.css",
            "~/b.module.css",
            "--from",
            "app/routes",
        ]);
        match cli.command {
            Commands::Transform(args) => {
                assert_eq!(args.specifiers, vec!["./a.module.css", "~/b.module.css"]);
                assert_eq!(args.from, Some(PathBuf::from("app/routes")));
                assert_eq!(args.target, BuildTarget::Server);
                assert_eq!(args.format, OutputFormat::Json);
            }
            _ => panic!("expected Transform command"),
        }
    }

    #[test]
    fn cli_transform_requires_specifier() {
        assert!(Cli::try_parse_from(["cssmod", "transform"]).is_err());
    }

    #[test]
    fn cli_parses_transform_target() {
        let cli = Cli::parse_from([
            "cssmod",
            "transform",
            "--target",
            "browser",
            "--format",
            "plain",
            "./a.module.css",
        ]);
        match cli.command {
            Commands::Transform(args) => {
                assert_eq!(args.target, BuildTarget::Browser);
                assert_eq!(args.format, OutputFormat::Plain);
            }
            _ => panic!("expected Transform command"),
        }
    }

    #[test]
    fn cli_build_defaults_to_browser() {
        let cli = Cli::parse_from(["cssmod", "build"]);
        match cli.command {
            Commands::Build(args) => assert_eq!(args.target, BuildTarget::Browser),
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn cli_parses_cache_clear() {
        let cli = Cli::parse_from(["cssmod", "cache", "clear", "--yes"]);
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Clear { yes },
            }) => assert!(yes),
            _ => panic!("expected Cache clear command"),
        }
    }

    #[test]
    fn cli_parses_config_init_force() {
        let cli = Cli::parse_from(["cssmod", "config", "init", "--force"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Init { force }),
            }) => assert!(force),
            _ => panic!("expected Config init command"),
        }
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["cssmod", "build"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["cssmod", "-v", "build"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["cssmod", "-vv", "build"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_global_config() {
        let cli = Cli::parse_from(["cssmod", "cache", "info", "--config", "site/cssmod.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("site/cssmod.toml")));
    }
}
