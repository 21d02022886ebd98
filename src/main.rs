mod cli;

use segmerge::config::{self, Config};
use segmerge::fetch::{HttpFetcher, OfflineFetcher};
use segmerge::ingest::Input;
use segmerge::runner::{self, MergeJob};
use segmerge_av::{FfmpegExecutor, FfprobeStartTime, ToolRegistry};
use segmerge_core::{
    classify, ConcatenationPlan, GroupTag, NoProbe, OrderedGroups, StartTimeProbe, Taxonomy,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, MergeOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "segmerge=trace,segmerge_core=debug,segmerge_av=debug".to_string()
        } else {
            "segmerge=info,segmerge_core=info,segmerge_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Merge {
            inputs,
            dry_run,
            options,
        } => {
            let config = load_with_overrides(cli.config.as_deref(), &options)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(merge(&inputs, &config, dry_run))
        }
        Commands::Plan {
            inputs,
            json,
            options,
        } => {
            let config = load_with_overrides(cli.config.as_deref(), &options)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(plan(&inputs, &config, json))
        }
        Commands::Classify { names, taxonomy } => {
            let taxonomy = match taxonomy {
                Some(taxonomy) => taxonomy,
                None => config::load_config_or_default(cli.config.as_deref())?.merge.taxonomy,
            };
            classify_names(&names, taxonomy);
            Ok(())
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("segmerge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_with_overrides(config_path: Option<&Path>, options: &MergeOptions) -> Result<Config> {
    let mut config = config::load_config_or_default(config_path)?;
    options.apply(&mut config);
    config::validate_config(&config)?;
    Ok(config)
}

fn parse_inputs(args: &[String]) -> Result<Vec<Input>> {
    args.iter()
        .map(|arg| Input::parse(arg).map_err(anyhow::Error::msg))
        .collect()
}

fn start_time_probe(tools: &ToolRegistry) -> Arc<dyn StartTimeProbe> {
    match FfprobeStartTime::from_registry(tools) {
        Some(probe) => Arc::new(probe),
        None => {
            tracing::warn!(
                "ffprobe not found; segments without a timestamped name will sort at offset 0"
            );
            Arc::new(NoProbe)
        }
    }
}

async fn merge(args: &[String], config: &Config, dry_run: bool) -> Result<()> {
    let inputs = parse_inputs(args)?;
    let tools = ToolRegistry::discover(&config.tools);

    let executor = match FfmpegExecutor::from_registry(&tools, config.encode.clone()) {
        Ok(executor) => executor,
        // Nothing is executed in a dry run
        Err(_) if dry_run => FfmpegExecutor::new(PathBuf::from("ffmpeg"), config.encode.clone()),
        Err(e) => return Err(e.into()),
    };
    let fetcher = HttpFetcher::new(&config.fetch);
    let probe = start_time_probe(&tools);

    let job = MergeJob::new(config, &fetcher, probe, &executor);
    let outcome = job.run(&inputs, dry_run).await.context("Merge failed")?;

    match outcome.report {
        Some(report) => {
            println!(
                "Merged {} group(s): {}",
                report.merged_groups.len(),
                join(&report.merged_groups)
            );
            for (tag, error) in &report.failed_groups {
                println!("Skipped group {}: {}", tag, error);
            }
            println!("Output: {}", report.output.display());
        }
        None => {
            println!(
                "[DRY RUN] Would merge {} segment(s)\n",
                outcome.plan.segment_count()
            );
            print_plan(&outcome.ordered, &outcome.plan);
        }
    }

    if outcome.skipped > 0 {
        println!("{} input(s) or segment(s) were skipped", outcome.skipped);
    }

    Ok(())
}

async fn plan(args: &[String], config: &Config, json: bool) -> Result<()> {
    let inputs = parse_inputs(args)?;
    if inputs.iter().any(Input::is_remote) {
        tracing::warn!("plan only reads local files; remote inputs are skipped");
    }

    let tools = ToolRegistry::discover(&config.tools);
    let probe = start_time_probe(&tools);
    let (ordered, plan) = runner::plan_local(&inputs, config, &OfflineFetcher, probe)
        .await
        .context("Failed to build merge plan")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&ordered, &plan);
    }

    Ok(())
}

fn print_plan(ordered: &OrderedGroups, plan: &ConcatenationPlan) {
    let diagnostics = ordered.diagnostics();

    for stage in &plan.groups {
        println!(
            "Group {} ({} segment(s), {:?}) -> {}",
            stage.tag,
            stage.segments.len(),
            stage.mode,
            stage.output.display()
        );
        for diagnostic in diagnostics.iter().filter(|d| d.group == stage.tag) {
            println!("  {}", diagnostic);
        }
    }

    let final_stage = &plan.final_stage;
    println!(
        "\nFinal ({:?}): {} input(s) -> {}",
        final_stage.mode,
        final_stage.inputs.len(),
        final_stage.output.display()
    );
}

fn classify_names(names: &[String], taxonomy: Taxonomy) {
    for name in names {
        println!("{}\t{}", classify(name, taxonomy), name);
    }
}

fn join(tags: &[GroupTag]) -> String {
    tags.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. ffmpeg is required to merge.");
        println!("Without ffprobe, segments lacking a timestamped name sort at offset 0.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            print_config_summary(&Config::default());
        }
    }

    Ok(())
}

fn print_config_summary(config: &Config) {
    if config.merge.use_temp_dir {
        println!("  Work dir: (temporary)");
    } else {
        println!("  Work dir: {}", config.merge.work_dir.display());
    }
    println!("  Output: {}", config.merge.output.display());
    println!("  Taxonomy: {}", config.merge.taxonomy);
    println!(
        "  Encode: {} preset {} crf {}, {} {}",
        config.encode.video_codec,
        config.encode.preset,
        config.encode.crf,
        config.encode.audio_codec,
        config.encode.audio_bitrate
    );
    println!("  Fetch timeout: {}s", config.fetch.timeout_secs);
}
