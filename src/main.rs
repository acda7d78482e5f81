use clap::Parser;
use tracing_subscriber::EnvFilter;

use inktag::{
    builder,
    cli::{Cli, Command},
    data_dir::DataDir,
    describe,
    error::{self, Error},
    filter,
    retrieval::{IndexCache, Retriever, TOP_K},
    OpenAiClient,
};

/// Per-process cache of the loaded index and tag list.
static INDEX_CACHE: IndexCache = IndexCache::new();

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("INKTAG_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;

    match cli.command {
        Command::Build(args) => {
            let client = OpenAiClient::from_env()?;
            let report =
                builder::build_index(&args.vocabulary, &data_dir, &client)?;
            eprintln!(
                "Indexed {} tags (dimension {})",
                report.tags, report.dimension
            );
            eprintln!("Wrote {}", data_dir.index_file().display());
            eprintln!("Wrote {}", data_dir.tag_list_file().display());
        }
        Command::Query(args) => {
            let client = OpenAiClient::from_env()?;
            let retriever = Retriever::open(&INDEX_CACHE, &data_dir)?;
            let candidates = retriever.retrieve(
                &client,
                &args.description,
                args.count,
            )?;

            if args.json {
                let results: Vec<serde_json::Value> = candidates
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "tag": c.tag,
                            "score": c.score,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "description": args.description,
                        "candidates": results,
                    })
                );
            } else if candidates.is_empty() {
                println!("No candidates found.");
            } else {
                for (i, c) in candidates.iter().enumerate() {
                    println!("{:>3}. [{:.3}] {}", i + 1, c.score, c.tag);
                }
            }
        }
        Command::Tag(args) => {
            let client = OpenAiClient::from_env()?;
            let description =
                describe::describe_image(&client, &args.image_url)?;

            let tags = if describe::is_no_content(&description) {
                Vec::new()
            } else {
                let retriever = Retriever::open(&INDEX_CACHE, &data_dir)?;
                let candidates =
                    retriever.retrieve(&client, &description, TOP_K)?;
                let candidate_tags: Vec<String> =
                    candidates.into_iter().map(|c| c.tag).collect();
                filter::select_tags(&client, &description, &candidate_tags)?
            };

            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "description": description,
                        "tags": tags,
                    })
                );
            } else if tags.is_empty() {
                println!("No relevant tags.");
            } else {
                println!("{}", tags.join(", "));
            }
        }
        Command::Status(args) => {
            match Retriever::open(&INDEX_CACHE, &data_dir) {
                Ok(retriever) => {
                    if args.json {
                        println!(
                            "{}",
                            serde_json::json!({
                                "data_dir": data_dir.root().display().to_string(),
                                "tags": retriever.tag_count(),
                                "dimension": retriever.dimension(),
                            })
                        );
                    } else {
                        println!(
                            "Data directory: {}",
                            data_dir.root().display()
                        );
                        println!("Tags: {}", retriever.tag_count());
                        println!("Dimension: {}", retriever.dimension());
                    }
                }
                Err(Error::Config(_)) => {
                    if args.json {
                        println!(
                            "{}",
                            serde_json::json!({
                                "data_dir": data_dir.root().display().to_string(),
                                "built": false,
                            })
                        );
                    } else {
                        println!(
                            "No index built under {}; run `inktag build`.",
                            data_dir.root().display()
                        );
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Command::Completions(args) => {
            args.generate();
        }
    }

    Ok(())
}
