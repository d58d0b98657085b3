//! Transform command - load specific modules and print their payloads

use crate::cli::args::{OutputFormat, TransformArgs};
use crate::config::{Config, ConfigManager, ProjectPaths};
use crate::error::{CssModError, CssModResult};
use crate::pipeline::{LoadResult, Pipeline};
use console::style;
use futures_util::future::try_join_all;
use std::collections::BTreeMap;

/// Execute the transform command
pub async fn execute(args: TransformArgs, manager: &ConfigManager, config: &Config) -> CssModResult<()> {
    let cwd =
        std::env::current_dir().map_err(|e| CssModError::io("getting current directory", e))?;
    let resolve_dir = match args.from {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };

    let paths = ProjectPaths::resolve(manager.project_root(), &config.project);
    let pipeline = Pipeline::from_config(paths, config, args.target);

    let results = try_join_all(
        args.specifiers
            .iter()
            .map(|specifier| pipeline.load(specifier, &resolve_dir)),
    )
    .await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Plain => print_plain(&results)?,
    }

    let failed = results.iter().map(|r| r.errors.len()).sum::<usize>();
    if failed > 0 {
        for diagnostic in results.iter().flat_map(|r| &r.errors) {
            eprintln!("{} {}", style("error:").red().bold(), diagnostic);
        }
        return Err(CssModError::BuildFailed(failed));
    }

    Ok(())
}

fn print_plain(results: &[LoadResult]) -> CssModResult<()> {
    for result in results {
        println!("{}", style(result.path.display()).bold());

        if let Some(contents) = &result.contents {
            let class_map: BTreeMap<String, String> = serde_json::from_str(contents)?;
            let width = class_map.keys().map(String::len).max().unwrap_or(0);
            for (local, scoped) in &class_map {
                println!("  {:<width$}  {}", local, scoped, width = width);
            }
        }
        if let Some(asset) = &result.asset {
            println!("  {} {}", style("asset").dim(), asset.display());
        }
    }
    Ok(())
}

