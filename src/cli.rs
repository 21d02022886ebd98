use clap::{Args, Parser, Subcommand};
use segmerge_core::Taxonomy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "segmerge")]
#[command(author, version, about = "Reconcile and merge recorded stream segments")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download, order and merge segments into one file
    Merge {
        /// Playlist URLs, segment URLs, .ts files or directories
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Show the merge plan without running ffmpeg
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        options: MergeOptions,
    },

    /// Show how local segments would be grouped, ordered and merged
    Plan {
        /// .ts files or directories
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        options: MergeOptions,
    },

    /// Show the group each name is assigned to
    Classify {
        /// Segment file names
        #[arg(required = true)]
        names: Vec<String>,

        /// Grouping scheme (numbered or binary)
        #[arg(long)]
        taxonomy: Option<Taxonomy>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// Overrides applied on top of the `[merge]` and `[probe]` config sections
#[derive(Args, Debug, Default)]
pub struct MergeOptions {
    /// Final output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Work directory for downloads and intermediates (wiped on start)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Leave the work directory in place after the run
    #[arg(long)]
    pub keep_intermediates: bool,

    /// Grouping scheme (numbered or binary)
    #[arg(long)]
    pub taxonomy: Option<Taxonomy>,

    /// Maximum concurrent probe calls
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

impl MergeOptions {
    pub fn apply(&self, config: &mut segmerge::config::Config) {
        if let Some(output) = &self.output {
            config.merge.output = output.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            config.merge.work_dir = work_dir.clone();
            config.merge.use_temp_dir = false;
        }
        if self.keep_intermediates {
            config.merge.keep_intermediates = true;
        }
        if let Some(taxonomy) = self.taxonomy {
            config.merge.taxonomy = taxonomy;
        }
        if let Some(jobs) = self.jobs {
            config.probe.concurrency = Some(jobs);
        }
    }
}
