//! Build command - transform every CSS module in the project

use crate::cli::args::BuildArgs;
use crate::config::{Config, ConfigManager, ProjectPaths};
use crate::error::{CssModError, CssModResult};
use crate::pipeline::{Diagnostic, Pipeline, Severity};
use crate::ui::{self, BuildProgress, UiContext};
use futures_util::future::join_all;
use std::path::PathBuf;
use tracing::debug;

/// Execute the build command
pub async fn execute(args: BuildArgs, manager: &ConfigManager, config: &Config) -> CssModResult<()> {
    let ctx = UiContext::detect();
    let paths = ProjectPaths::resolve(manager.project_root(), &config.project);
    let pipeline = Pipeline::from_config(paths, config, args.target);

    ui::intro(&ctx, &format!("cssmod build ({})", args.target));

    let modules = pipeline.discover_modules().await?;
    if modules.is_empty() {
        ui::step_warn_hint(
            &ctx,
            "No CSS modules found",
            &format!("Looked under {}", pipeline.paths().source_root.display()),
        );
        return Ok(());
    }
    debug!("Found {} module(s)", modules.len());

    let diagnostics = run(&ctx, &pipeline, &modules).await?;
    let stats = pipeline.stats();

    for diagnostic in &diagnostics {
        match diagnostic.severity {
            Severity::Error => ui::step_error(&ctx, &diagnostic.to_string()),
            Severity::Warning => ui::step_warn(&ctx, &diagnostic.to_string()),
        }
    }

    ui::section(&ctx, "Summary");
    ui::key_value(&ctx, "Modules", &modules.len().to_string());
    ui::key_value(&ctx, "Transforms run", &stats.transforms.to_string());
    ui::key_value(&ctx, "Persistent hits", &stats.persistent_hits.to_string());
    ui::key_value(&ctx, "In-memory joins", &stats.joins.to_string());
    if args.target.emits_assets() {
        ui::key_value(&ctx, "Assets written", &pipeline.assets_written().to_string());
    }

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if errors > 0 {
        ui::outro_error(&ctx, &format!("{} module(s) failed", errors));
        return Err(CssModError::BuildFailed(errors));
    }

    ui::outro_success(&ctx, "Build complete");
    Ok(())
}

/// Load every module concurrently
///
/// Bad input files become diagnostics; anything else aborts the build.
async fn run(
    ctx: &UiContext,
    pipeline: &Pipeline,
    modules: &[PathBuf],
) -> CssModResult<Vec<Diagnostic>> {
    let progress = BuildProgress::new(ctx, modules.len() as u64);

    let outcomes = join_all(modules.iter().map(|path| {
        let progress = &progress;
        async move {
            let outcome = pipeline.load_path(path).await;
            progress.on_module(path);
            match outcome {
                Ok(result) => Ok(result.errors),
                Err(e) if e.is_input_error() => Ok(vec![Diagnostic::from_error(path, &e)]),
                Err(e) => Err(e),
            }
        }
    }))
    .await;

    progress.finish();
    let per_module = outcomes.into_iter().collect::<CssModResult<Vec<_>>>()?;
    Ok(per_module.into_iter().flatten().collect())
}
