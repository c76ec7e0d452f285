use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use codescope::cli::{Cli, Commands};
use codescope::config::CodescopeConfig;
use codescope::output;
use codescope::pipeline::analyze_project;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = cli.command.common();

    // RUST_LOG wins over --verbose when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if common.verbose { "info" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = CodescopeConfig::load(&common.path);
    common.apply(&mut config.analysis);
    if let Some(stages) = cli.command.stages() {
        config.analysis.stages = stages;
    }

    let result = analyze_project(&common.path, &config)
        .with_context(|| format!("failed to analyze {}", common.path.display()))?;

    let format = common.format;
    let rendered = match &cli.command {
        Commands::Analyze { .. } => output::render_analysis(&result, format),
        Commands::Circular { .. } => output::render_circular(&result, format),
        Commands::Hotspots { .. } => output::render_hotspots(&result, format),
        Commands::Impact { file, .. } => output::render_impact(&result, file.as_deref(), format),
        Commands::Quality { .. } => output::render_quality(&result, format),
    };
    print!("{rendered}");
    if !rendered.ends_with('\n') {
        println!();
    }

    Ok(())
}
