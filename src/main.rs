mod acquisition;
mod batch;
mod generation;
mod pipeline;
mod server;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::generation::post::StructuredPost;
use crate::pipeline::Pipeline;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "url2post", about = "Turn a web page into a structured blog post")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a page and generate a post from it
    Convert {
        url: String,
        /// Print the post as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// Render a page and print the extracted text (no model call)
    Fetch {
        url: String,
        /// Print the unfiltered text instead of the selected one
        #[arg(long)]
        raw: bool,
    },
    /// Convert every URL listed in a file, one JSON line per URL
    Batch {
        file: PathBuf,
        /// Max conversions in flight
        #[arg(short, long, default_value_t = batch::DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },
    /// Serve the HTTP API
    Serve {
        /// Listen address (default from config)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Convert { url, json } => {
            let pipeline = Pipeline::from_settings(&settings)?;
            let post = pipeline.convert(&url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&post)?);
            } else {
                print_post(&post);
            }
            Ok(())
        }
        Commands::Fetch { url, raw } => {
            let crawler = pipeline::build_crawler(&settings)?;
            let content = crawler.fetch(&url).await?;
            let text = if raw {
                content.raw_text.as_str()
            } else {
                content.document_text().unwrap_or_default()
            };
            println!("{}", text);
            eprintln!(
                "\n{} chars ({})",
                text.chars().count(),
                if raw {
                    "raw"
                } else if content.fit_text.is_some() {
                    "fit"
                } else {
                    "raw fallback"
                }
            );
            Ok(())
        }
        Commands::Batch { file, concurrency } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let urls = batch::read_urls(&text);
            if urls.is_empty() {
                eprintln!("No URLs in {}.", file.display());
                return Ok(());
            }
            let pipeline = Arc::new(Pipeline::from_settings(&settings)?);
            eprintln!("Converting {} URLs ({} at a time)...", urls.len(), concurrency);
            let mut stdout = std::io::stdout().lock();
            let stats = batch::convert_all(pipeline, urls, concurrency, &mut stdout).await?;
            eprintln!(
                "Done: {} converted ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Serve { bind } => {
            let pipeline = Arc::new(Pipeline::from_settings(&settings)?);
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            server::serve(&bind, pipeline).await
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn print_post(post: &StructuredPost) {
    println!("# {}\n", post.title);
    println!("> {}\n", post.summary);
    println!("{}\n", post.content);
    println!("Tags: {}", post.tags.join(", "));
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
