use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::retrieval::TOP_K;

#[derive(Debug, Parser)]
#[command(
    name = "inktag",
    about = "Embedding-based auto-tagging for body modification imagery"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the tag index from a vocabulary file
    Build(BuildArgs),
    /// Retrieve candidate tags for a free-text description
    Query(QueryArgs),
    /// Describe an image and produce its final tags
    Tag(TagArgs),
    /// Show index status
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Build --

#[derive(Debug, Parser)]
pub struct BuildArgs {
    /// Path to the tag vocabulary (YAML sequence with a `tag` field)
    #[arg(long)]
    pub vocabulary: PathBuf,
}

// -- Query --

#[derive(Debug, Parser)]
pub struct QueryArgs {
    /// The description to match against the vocabulary
    pub description: String,

    /// Number of candidates to return
    #[arg(short = 'n', long, default_value_t = TOP_K)]
    pub count: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Tag --

#[derive(Debug, Parser)]
pub struct TagArgs {
    /// URL of the image to tag
    pub image_url: String,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "inktag",
            &mut std::io::stdout(),
        );
    }
}
