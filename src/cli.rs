//! `paperlens` command line.
//!
//! Offline commands (`reconstruct`, `score`) need no configuration. The rest
//! build the pipeline from `AppConfig`.

use crate::accuracy;
use crate::config::AppConfig;
use crate::layout::{self, LayoutOptions, LayoutPolicy};
use crate::llm::{provider, LlmClient};
use crate::ocr::{ClovaOcr, OcrResponse};
use crate::pages::PageRange;
use crate::pipeline::{InputFile, Pipeline, PipelineOptions};
use crate::store::{FileStore, UploadId};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "paperlens")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "OCR scanned documents, rebuild their layout, summarize and search them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// OCR an image or PDF and store the reconstructed text
    Extract {
        file: PathBuf,

        /// Pages to keep for PDFs, e.g. "1-3,5"
        #[arg(long)]
        pages: Option<PageRange>,

        /// Layout policy (auto, ratio, explicit)
        #[arg(long)]
        policy: Option<LayoutPolicy>,
    },
    /// Summarize and structure an upload
    Summarize {
        upload_id: String,

        /// Revised text to use instead of the upload's OCR text
        #[arg(long = "text-file")]
        text_file: Option<PathBuf>,
    },
    /// Rebuild text from a saved OCR response without calling any service
    Reconstruct {
        response: PathBuf,

        #[arg(long, default_value = "auto")]
        policy: LayoutPolicy,

        /// Prefix each page with "=== Page N ==="
        #[arg(long)]
        markers: bool,
    },
    /// Character-level accuracy of a candidate text against a reference
    Score {
        reference: PathBuf,
        candidate: PathBuf,
    },
    /// Accuracy of an upload's OCR text against its revised text
    Accuracy { upload_id: String },
    /// Keyword (regex) search, or similarity search with --semantic
    Search {
        query: String,

        #[arg(long)]
        semantic: bool,

        #[arg(long, default_value_t = 3)]
        k: usize,
    },
    /// Answer a question from the most similar stored documents
    Ask {
        question: String,

        #[arg(long, default_value_t = 3)]
        k: usize,
    },
    /// Show known language-model providers and whether they are configured
    Providers,
}

pub fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("[CLI] {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Commands) -> CliResult {
    match command {
        Commands::Reconstruct {
            response,
            policy,
            markers,
        } => reconstruct(&response, policy, markers),
        Commands::Score {
            reference,
            candidate,
        } => {
            let reference = std::fs::read_to_string(reference)?;
            let candidate = std::fs::read_to_string(candidate)?;
            println!("{:.2}", accuracy::score(&reference, &candidate));
            Ok(())
        }
        Commands::Providers => {
            let config = AppConfig::load();
            let providers = provider::all_providers(&config);
            println!("{}", serde_json::to_string_pretty(&providers)?);
            println!("active: {}", config.llm.provider);
            Ok(())
        }
        online => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(execute_online(online))
        }
    }
}

fn reconstruct(path: &Path, policy: LayoutPolicy, markers: bool) -> CliResult {
    let raw = std::fs::read_to_string(path)?;
    let response: OcrResponse = serde_json::from_str(&raw)?;
    response.validate("saved-response")?;
    let document = response.into_document();
    let options = LayoutOptions::with_policy(policy).page_markers(markers);
    let reconstruction = layout::reconstruct_parallel(&document, &options);
    if !reconstruction.defects.is_empty() {
        eprintln!(
            "{} malformed fragment(s) were repaired",
            reconstruction.defects.len()
        );
    }
    println!("{}", reconstruction.text);
    Ok(())
}

async fn execute_online(command: Commands) -> CliResult {
    let mut config = AppConfig::load();
    if let Commands::Extract {
        policy: Some(policy),
        ..
    } = &command
    {
        config.layout_policy = *policy;
    }
    let pipeline = build_pipeline(&config).await?;

    match command {
        Commands::Extract { file, pages, .. } => {
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();
            let bytes = tokio::fs::read(&file).await?;
            let extraction = pipeline
                .extract(InputFile::new(filename, bytes), pages.as_ref())
                .await?;
            println!("upload: {}", extraction.upload_id);
            println!("pages: {}", extraction.page_count);
            println!();
            println!("{}", extraction.text);
        }
        Commands::Summarize {
            upload_id,
            text_file,
        } => {
            let upload_id = UploadId(upload_id);
            let text = match text_file {
                Some(path) => tokio::fs::read_to_string(path).await?,
                None => pipeline.upload(&upload_id).await?.ocr_text,
            };
            let record = pipeline.summarize_and_structure(&upload_id, &text).await?;
            println!("{}", record.summary);
            println!();
            for field in &record.fields {
                println!("{} : {}", field.key, field.value);
            }
        }
        Commands::Accuracy { upload_id } => {
            let report = pipeline.accuracy(&UploadId(upload_id)).await?;
            println!("{:.2}", report.accuracy);
        }
        Commands::Search { query, semantic, k } => {
            if semantic {
                let hits = pipeline.semantic_search(&query, k).await?;
                for hit in hits {
                    println!("{:.4}\t{}\t{}", hit.score, hit.record.upload_id, hit.record.filename);
                }
            } else {
                let results = pipeline.search(&query).await?;
                for result in results {
                    let record = &result.hit.record;
                    println!(
                        "{}\t{}\t{}",
                        record.upload_id,
                        record.filename,
                        result.hit.matched.join(",")
                    );
                }
            }
        }
        Commands::Ask { question, k } => {
            let answer = pipeline.ask(&question, k).await?;
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!();
                for source in &answer.sources {
                    println!("- {} ({:.4})", source.record.filename, source.score);
                }
            }
        }
        Commands::Reconstruct { .. } | Commands::Score { .. } | Commands::Providers => {}
    }
    Ok(())
}

async fn build_pipeline(
    config: &AppConfig,
) -> Result<Pipeline<ClovaOcr, LlmClient, FileStore>, Box<dyn std::error::Error>> {
    let ocr = ClovaOcr::new(&config.ocr, config.http_timeout)?;
    let llm = LlmClient::from_config(config)?;
    let store = FileStore::open(&config.data_dir).await?;
    Ok(Pipeline::new(
        ocr,
        llm,
        store,
        PipelineOptions::from_config(config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_extract_with_pages_and_policy() {
        let cli = Cli::try_parse_from([
            "paperlens", "extract", "scan.pdf", "--pages", "1-2,4", "--policy", "ratio",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract { file, pages, policy } => {
                assert_eq!(file, PathBuf::from("scan.pdf"));
                assert_eq!(pages.unwrap().pages(), &[1, 2, 4]);
                assert_eq!(policy, Some(LayoutPolicy::Ratio));
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn rejects_bad_page_range() {
        assert!(Cli::try_parse_from(["paperlens", "extract", "a.pdf", "--pages", "3-1"]).is_err());
    }

    #[test]
    fn reconstruct_defaults_to_auto_without_markers() {
        let cli = Cli::try_parse_from(["paperlens", "reconstruct", "resp.json"]).unwrap();
        match cli.command {
            Commands::Reconstruct { policy, markers, .. } => {
                assert_eq!(policy, LayoutPolicy::Auto);
                assert!(!markers);
            }
            _ => panic!("expected reconstruct"),
        }
    }
}
