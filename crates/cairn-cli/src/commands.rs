use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use cairn_sdk::{Cairn, CairnConfig, IndexSummary, SeedReport, SeedSummary};
use cairn_seed::DependencyGraph;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Seed(args) => cmd_seed(args, config, &cli.format),
        Command::Validate(args) => cmd_validate(args, &cli.format),
        Command::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CairnConfig> {
    match path {
        Some(path) => CairnConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(CairnConfig::default()),
    }
}

fn cmd_seed(args: SeedArgs, config: CairnConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let mut bundle = Cairn::load_bundle(&args.bundle)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let (first, second, index) = runtime.block_on(async {
        let cairn = Cairn::open(config)?;
        let first = cairn.seed(&bundle).await?;
        // The store is in memory, so a forced reseed only makes sense
        // against the state the first run left behind.
        let second = if args.force {
            bundle.options.force_fresh_seed = true;
            Some(cairn.seed(&bundle).await?)
        } else {
            None
        };
        cairn.drain().await;
        let index = cairn.index_summary()?;
        cairn.shutdown();
        anyhow::Ok((first, second, index))
    })?;

    if let OutputFormat::Json = format {
        let out = json!({"seed": first, "reseed": second, "index": index});
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    print_report(&first);
    if let Some(second) = &second {
        println!();
        println!("{}", "Forced reseed".bold());
        print_report(second);
    }
    print_index(&index);
    Ok(())
}

fn print_report(report: &SeedReport) {
    match report {
        SeedReport::Skipped { reason } => {
            println!("{} Seed skipped: {}", "•".yellow().bold(), reason);
        }
        SeedReport::Seeded(summary) => print_summary(summary),
    }
}

fn print_summary(summary: &SeedSummary) {
    println!(
        "{} Seeded {} schemas, {} configs, {} data records",
        "✓".green().bold(),
        summary.schemas.len().to_string().bold(),
        summary.configs.len().to_string().bold(),
        summary.data.values().map(Vec::len).sum::<usize>().to_string().bold(),
    );
    println!("{}", "Registry:".bold());
    for (name, id) in &summary.registry {
        println!("  {} {}", name.cyan(), id.short_hex().dimmed());
    }
    for (key, id) in &summary.configs {
        println!("  config {} {}", key.yellow(), id.short_hex().dimmed());
    }
    for failure in &summary.failures {
        println!(
            "  {} {:?} {}: {}",
            "✗".red().bold(),
            failure.kind,
            failure.key.yellow(),
            failure.error
        );
    }
}

fn print_index(index: &IndexSummary) {
    println!("{}", "Indexes:".bold());
    if index.schemas.is_empty() {
        println!("  (no indexed schemas)");
    }
    for (name, count) in &index.schemas {
        println!("  {} {}", name.cyan(), count);
    }
    println!("  {} {}", "unclassified".dimmed(), index.unclassified);
}

fn cmd_validate(args: ValidateArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let bundle = Cairn::load_bundle(&args.bundle)?;
    bundle.check()?;
    let definitions = bundle.schema_definitions()?;
    let graph = DependencyGraph::build(&definitions);
    let order: Vec<String> = graph.topological_order().iter().map(ToString::to_string).collect();
    let external: Vec<String> = graph.external_references().iter().map(ToString::to_string).collect();
    let configs: Vec<&str> = bundle.ordered_configs().iter().map(|c| c.key.as_str()).collect();
    let records: usize = bundle.data.values().map(Vec::len).sum();

    if let OutputFormat::Json = format {
        let out = json!({
            "schema_order": order,
            "external_references": external,
            "config_order": configs,
            "data_records": records,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    println!("{} Bundle {} is well formed", "✓".green().bold(), args.bundle.display());
    println!("  Schema order: {}", order.join(" → "));
    if !external.is_empty() {
        println!(
            "  {} must already be registered: {}",
            "External references".yellow(),
            external.join(", ")
        );
    }
    println!("  Config order: {}", configs.join(", "));
    println!("  Data records: {}", records);
    Ok(())
}

fn cmd_config(config: &CairnConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
