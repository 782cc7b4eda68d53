use anyhow::{bail, Result};
use brsr_extractor::{
    export::export_outputs,
    BatchSummary, DocumentStatus, EsgRecord, Extractor, ExtractorConfig,
};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;
use url::Url;

#[derive(StructOpt, Debug)]
#[structopt(name = "brsr-cli", about = "Extract ESG indicators from BRSR XBRL filings")]
struct Opt {
    /// Filing URLs or local XBRL files
    inputs: Vec<String>,

    /// Output directory (defaults to BRSR_OUTPUT_DIR or ./output)
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Base name of the exported files
    #[structopt(long, default_value = "brsr_esg_metrics")]
    base_name: String,

    /// Skip writing CSV/JSON files
    #[structopt(long)]
    no_export: bool,

    /// Documents processed concurrently
    #[structopt(short = "j", long)]
    concurrency: Option<usize>,

    /// Disable the public ESG data fallback
    #[structopt(long)]
    no_public_fallback: bool,
}

enum Input {
    Remote(String),
    Local(PathBuf),
}

fn classify(input: &str) -> Input {
    match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Input::Remote(input.to_string()),
        _ => Input::Local(PathBuf::from(input)),
    }
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn print_summary(summary: &BatchSummary, failures: &[(String, String)]) {
    println!("\n{}", "EXTRACTION COMPLETE".bold().green());
    println!("  {} {}", "Total records:".bold(), summary.total_records);
    println!("  {} {}", "Companies:".bold(), summary.companies);
    println!("  {} {}", "Indicators:".bold(), summary.indicators);
    println!("  {} {:.1}", "Avg quality score:".bold(), summary.avg_quality_score);

    for (location, error) in failures {
        println!("  {} {}: {}", "failed".red(), location, error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    if opt.inputs.is_empty() {
        bail!("No input given; pass one or more filing URLs or XBRL files");
    }

    let mut config = ExtractorConfig::from_env()?;
    if let Some(concurrency) = opt.concurrency {
        config.batch_concurrency = concurrency;
    }
    if opt.no_public_fallback {
        config.enable_public_data_fallback = false;
    }
    let out_dir = opt.output.clone().unwrap_or_else(|| config.output_dir.clone());

    let extractor = Extractor::new(config)?;

    let mut urls = Vec::new();
    let mut files = Vec::new();
    for input in opt.inputs.iter().map(|i| classify(i)) {
        match input {
            Input::Remote(url) => urls.push(url),
            Input::Local(path) => files.push(path),
        }
    }

    let pb = progress_bar(opt.inputs.len() as u64)?;
    let mut records: Vec<EsgRecord> = Vec::new();
    let mut failures: Vec<(String, String)> = Vec::new();

    if !urls.is_empty() {
        pb.set_message("fetching filings");
        let batch = extractor.process_urls(&urls).await;
        pb.inc(urls.len() as u64);
        for outcome in batch.failed() {
            if let DocumentStatus::Failed { error } = &outcome.status {
                failures.push((outcome.location.clone(), error.clone()));
            }
        }
        records.extend(batch.records);
    }

    for path in files {
        let name = path.display().to_string();
        pb.set_message(name.clone());
        match tokio::fs::read(&path).await {
            Ok(content) => records.extend(extractor.process_content(&content, &name, None).await),
            Err(e) => failures.push((name, e.to_string())),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    print_summary(&BatchSummary::from_records(&records), &failures);

    if records.is_empty() {
        println!("{}", "No ESG metrics extracted.".yellow());
        return Ok(());
    }

    if !opt.no_export {
        for path in export_outputs(&records, &out_dir, &opt.base_name)? {
            println!("  {} {}", "wrote".green(), path.display());
        }
    }

    Ok(())
}
