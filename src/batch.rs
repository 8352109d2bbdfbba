use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::generation::post::StructuredPost;
use crate::pipeline::Pipeline;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// One output line per URL.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchLine {
    Converted { url: String, post: StructuredPost },
    Failed { url: String, error: String },
}

pub struct BatchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// Non-empty lines that are not `#` comments.
pub fn read_urls(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Convert every URL with at most `concurrency` in flight, writing a JSON
/// line for each as soon as it finishes. A failed URL is reported and the
/// rest carry on.
pub async fn convert_all<W: Write>(
    pipeline: Arc<Pipeline>,
    urls: Vec<String>,
    concurrency: usize,
    out: &mut W,
) -> Result<BatchStats> {
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let total = urls.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<BatchLine>(concurrency * 2);

    for url in urls {
        let pipeline = Arc::clone(&pipeline);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let line = match pipeline.convert(&url).await {
                Ok(post) => BatchLine::Converted { url, post },
                Err(e) => {
                    warn!("Conversion failed for {}: {}", url, e);
                    BatchLine::Failed {
                        url,
                        error: e.to_string(),
                    }
                }
            };
            let _ = tx.send(line).await;
        });
    }

    // rx closes once every task has sent its line
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;
    while let Some(line) = rx.recv().await {
        match &line {
            BatchLine::Converted { .. } => ok += 1,
            BatchLine::Failed { .. } => errors += 1,
        }
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Converted {} URLs ({} ok, {} errors)", total, ok, errors);

    Ok(BatchStats { total, ok, errors })
}
