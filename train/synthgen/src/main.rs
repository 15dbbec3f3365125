use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use dataset::{
    DatasetDriver, GenerationConfig, PartCatalog, Renderer, RunReport,
    config::{Backend, DEFAULT_CONFIG_FILE},
    version,
};
use env_logger::{Builder, Env};

use crate::{command::CommandRenderer, render::PreviewRenderer};

mod command;
mod geom;
mod record;
mod render;

#[derive(Parser)]
#[command(name = "synthgen", version, about = "Render synthetic brick part datasets")]
struct Cli {
    /// TOML config. A template is written here if it does not exist.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Render the dataset (default).
    Run(RunArgs),
    /// Cross-check the part list against the installed models, render nothing.
    Check,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Master seed, overrides [dataset].seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Images per part, overrides [dataset].samples_per_part.
    #[arg(long)]
    samples: Option<u32>,
    /// First valid part to render, overrides [subset].offset.
    #[arg(long)]
    offset: Option<usize>,
    /// Number of parts to render, overrides [subset].count.
    #[arg(long)]
    count: Option<usize>,
}

impl RunArgs {
    fn apply(self, cfg: &mut GenerationConfig) {
        if let Some(seed) = self.seed {
            cfg.dataset.seed = Some(seed);
        }
        if let Some(samples) = self.samples {
            cfg.dataset.samples_per_part = samples;
        }
        if let Some(offset) = self.offset {
            cfg.subset.offset = offset;
        }
        if self.count.is_some() {
            cfg.subset.count = self.count;
        }
    }
}

fn build_renderer(cfg: &GenerationConfig) -> anyhow::Result<Box<dyn Renderer>> {
    let render = &cfg.render;
    Ok(match render.backend {
        Backend::Preview => Box::new(PreviewRenderer::new(render.resolution)),
        Backend::Command => {
            let Some(cmd) = &render.command else {
                bail!("render.backend is \"command\" but [render.command] is missing");
            };
            Box::new(CommandRenderer::new(cmd, &render.engine, render.resolution))
        }
    })
}

fn check(cfg: &GenerationConfig) -> anyhow::Result<()> {
    let paths = &cfg.paths;
    let catalog = PartCatalog::resolve(&paths.candidates, &paths.assets, paths.list_format)?;
    let selected = catalog.select(cfg.subset.offset, cfg.subset.count);

    println!("valid parts:    {}", catalog.valid.len());
    println!("invalid parts:  {}", catalog.invalid.len());
    println!("selected parts: {}", selected.len());
    if !catalog.invalid.is_empty() {
        let shown: Vec<&str> = catalog.invalid.iter().take(15).map(|p| p.as_str()).collect();
        println!("first invalid:  {}", shown.join(", "));
    }
    if paths.output.is_dir() {
        let next = version::next_number(&paths.output)?;
        println!("next output:    {}", paths.output.join(format!("v{next}")).display());
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!(
        "{}: {} images, {} failed, {} parts in {:.1?} (seed {}){}",
        report.output_dir.display(),
        report.images_succeeded,
        report.images_failed,
        report.parts.len(),
        report.elapsed,
        report.seed,
        if report.stopped { ", stopped early" } else { "" }
    );
}

fn main() -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut cfg = GenerationConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command.unwrap_or(Cmd::Run(RunArgs::default())) {
        Cmd::Check => check(&cfg),
        Cmd::Run(args) => {
            args.apply(&mut cfg);
            let renderer = build_renderer(&cfg)?;
            let mut driver = DatasetDriver::new(renderer);
            let report = driver.run(&cfg).context("dataset run failed")?;
            print_summary(&report);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_override_config() {
        let cli = Cli::parse_from([
            "synthgen", "-c", "x.toml", "run", "--seed", "9", "--samples", "4", "--count", "2",
        ]);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        let Some(Cmd::Run(args)) = cli.command else {
            panic!("expected run");
        };
        let mut cfg = GenerationConfig::new("a", "b", "c");
        args.apply(&mut cfg);
        assert_eq!(cfg.dataset.seed, Some(9));
        assert_eq!(cfg.dataset.samples_per_part, 4);
        assert_eq!(cfg.subset.count, Some(2));
        assert_eq!(cfg.subset.offset, 0);
    }

    #[test]
    fn backend_selection_follows_config() {
        let mut cfg = GenerationConfig::new("a", "b", "c");
        assert!(build_renderer(&cfg).is_ok());
        cfg.render.backend = Backend::Command;
        assert!(build_renderer(&cfg).is_err());
    }
}
