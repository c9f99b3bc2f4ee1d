//! Layout reconstruction benchmark for PaperLens.
//!
//! Replays saved OCR responses through the layout reconstructor and scores
//! the output against hand-checked reference text. No network access.
//!
//! Usage:
//!   cargo run -- <response.json> <reference.txt>                 Single pair, auto policy
//!   cargo run -- <response.json> <reference.txt> --policy ratio  Single pair, fixed policy
//!   cargo run -- <response.json> <reference.txt> --compare       Ratio vs explicit side-by-side
//!   cargo run -- --batch <directory>                             Every name.json + name.txt pair → CSV
//!   cargo run -- --batch <directory> --compare                   Batch with both policies
//!
//! Add --markers to reconstruct with "=== Page N ===" markers.

use paperlens_lib::accuracy;
use paperlens_lib::layout::{self, Document, LayoutOptions, LayoutPolicy};
use paperlens_lib::ocr::OcrResponse;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

/// Median accuracy a policy must reach to pass.
const TARGET_ACCURACY: f64 = 90.0;

struct Args {
    batch: Option<PathBuf>,
    response: Option<PathBuf>,
    reference: Option<PathBuf>,
    policy: LayoutPolicy,
    compare: bool,
    markers: bool,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        batch: None,
        response: None,
        reference: None,
        policy: LayoutPolicy::Auto,
        compare: false,
        markers: false,
    };
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--batch" => {
                let dir = iter.next().ok_or("--batch requires a directory path")?;
                parsed.batch = Some(PathBuf::from(dir));
            }
            "--policy" => {
                let policy = iter.next().ok_or("--policy requires a value")?;
                parsed.policy = policy.parse()?;
            }
            "--compare" => parsed.compare = true,
            "--markers" => parsed.markers = true,
            other if other.starts_with("--") => return Err(format!("unknown flag {}", other)),
            other => positional.push(PathBuf::from(other)),
        }
    }

    if parsed.batch.is_none() {
        if positional.len() != 2 {
            return Err("expected <response.json> <reference.txt>".into());
        }
        parsed.reference = positional.pop();
        parsed.response = positional.pop();
    }
    Ok(parsed)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Usage:");
            eprintln!("  ocr-bench <response.json> <reference.txt> [--policy P] [--compare] [--markers]");
            eprintln!("  ocr-bench --batch <directory> [--policy P] [--compare] [--markers]");
            return ExitCode::FAILURE;
        }
    };

    let result = match (&args.batch, &args.response, &args.reference) {
        (Some(dir), _, _) => run_batch(dir, &args),
        (None, Some(response), Some(reference)) => run_single(response, reference, &args),
        _ => Err("nothing to benchmark".to_string()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_document(path: &Path) -> Result<Document, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let response: OcrResponse =
        serde_json::from_str(&raw).map_err(|e| format!("{}: {}", path.display(), e))?;
    response
        .validate("saved-response")
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(response.into_document())
}

struct Score {
    accuracy: f64,
    micros: u128,
    chars: usize,
    defects: usize,
}

fn score_policy(document: &Document, reference: &str, policy: LayoutPolicy, markers: bool) -> Score {
    let options = LayoutOptions::with_policy(policy).page_markers(markers);
    let start = Instant::now();
    let reconstruction = layout::reconstruct_with_report(document, &options);
    let micros = start.elapsed().as_micros();
    Score {
        accuracy: accuracy::score(reference.trim(), &reconstruction.text),
        micros,
        chars: reconstruction.text.chars().count(),
        defects: reconstruction.defects.len(),
    }
}

fn run_single(response: &Path, reference: &Path, args: &Args) -> Result<(), String> {
    let document = load_document(response)?;
    let reference_text =
        std::fs::read_to_string(reference).map_err(|e| format!("{}: {}", reference.display(), e))?;

    if args.compare {
        let ratio = score_policy(&document, &reference_text, LayoutPolicy::Ratio, args.markers);
        let explicit = score_policy(&document, &reference_text, LayoutPolicy::ExplicitBreak, args.markers);

        eprintln!("=== COMPARISON: {} ===", response.display());
        for (label, score) in [("RATIO", &ratio), ("EXPLICIT", &explicit)] {
            eprintln!();
            eprintln!("  {}:", label);
            eprintln!("    Accuracy: {:.2}%", score.accuracy);
            eprintln!("    Reconstruct: {:.3}ms", score.micros as f64 / 1000.0);
            eprintln!("    Chars: {}", score.chars);
            eprintln!("    Repaired fragments: {}", score.defects);
        }
        eprintln!();
        eprintln!("  Delta (explicit - ratio): {:+.2} points", explicit.accuracy - ratio.accuracy);
    } else {
        let score = score_policy(&document, &reference_text, args.policy, args.markers);
        println!("{{");
        println!("  \"policy\": \"{}\",", args.policy);
        println!("  \"accuracy\": {:.2},", score.accuracy);
        println!("  \"reconstructMs\": {:.3},", score.micros as f64 / 1000.0);
        println!("  \"charCount\": {},", score.chars);
        println!("  \"repairedFragments\": {}", score.defects);
        println!("}}");
    }
    Ok(())
}

/// `name.json` files in `dir` that have a sibling `name.txt`, sorted.
fn collect_pairs(dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>, String> {
    let entries = std::fs::read_dir(dir).map_err(|e| format!("{}: {}", dir.display(), e))?;
    let mut pairs: Vec<(PathBuf, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
        .filter_map(|json| {
            let txt = json.with_extension("txt");
            txt.is_file().then_some((json, txt))
        })
        .collect();
    pairs.sort();
    Ok(pairs)
}

fn run_batch(dir: &Path, args: &Args) -> Result<(), String> {
    if !dir.is_dir() {
        return Err(format!("Not a directory: {}", dir.display()));
    }
    let pairs = collect_pairs(dir)?;
    if pairs.is_empty() {
        return Err(format!("No name.json + name.txt pairs found in {}", dir.display()));
    }

    if args.compare {
        println!("filename,accuracy_ratio,ms_ratio,accuracy_explicit,ms_explicit,delta");
    } else {
        println!("filename,policy,accuracy,ms,chars,repaired");
    }

    let mut ratio_scores: Vec<f64> = Vec::new();
    let mut explicit_scores: Vec<f64> = Vec::new();
    let mut single_scores: Vec<f64> = Vec::new();
    let mut skipped = 0usize;

    for (json, txt) in &pairs {
        let filename = json
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let (document, reference) = match (load_document(json), std::fs::read_to_string(txt)) {
            (Ok(d), Ok(r)) => (d, r),
            (Err(e), _) => {
                eprintln!("skipping {}", e);
                skipped += 1;
                continue;
            }
            (_, Err(e)) => {
                eprintln!("skipping {}: {}", txt.display(), e);
                skipped += 1;
                continue;
            }
        };

        if args.compare {
            let ratio = score_policy(&document, &reference, LayoutPolicy::Ratio, args.markers);
            let explicit = score_policy(&document, &reference, LayoutPolicy::ExplicitBreak, args.markers);
            println!(
                "{},{:.2},{:.3},{:.2},{:.3},{:+.2}",
                filename,
                ratio.accuracy,
                ratio.micros as f64 / 1000.0,
                explicit.accuracy,
                explicit.micros as f64 / 1000.0,
                explicit.accuracy - ratio.accuracy
            );
            ratio_scores.push(ratio.accuracy);
            explicit_scores.push(explicit.accuracy);
        } else {
            let score = score_policy(&document, &reference, args.policy, args.markers);
            println!(
                "{},{},{:.2},{:.3},{},{}",
                filename,
                args.policy,
                score.accuracy,
                score.micros as f64 / 1000.0,
                score.chars,
                score.defects
            );
            single_scores.push(score.accuracy);
        }

        std::io::stdout().flush().ok();
    }

    eprintln!("\n--- Benchmark Summary ---");
    eprintln!("  Documents scored: {}", pairs.len() - skipped);
    if skipped > 0 {
        eprintln!("  Skipped: {}", skipped);
    }

    let policy_label = args.policy.to_string();
    for (label, scores) in [
        ("ratio", &mut ratio_scores),
        ("explicit", &mut explicit_scores),
        (policy_label.as_str(), &mut single_scores),
    ] {
        if let Some(summary) = summarize(scores) {
            print_accuracy_summary(label, &summary);
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
struct Summary {
    median: f64,
    average: f64,
    p99: f64,
    min: f64,
}

/// Distribution of accuracy scores; `None` when there are none.
fn summarize(scores: &mut [f64]) -> Option<Summary> {
    if scores.is_empty() {
        return None;
    }
    scores.sort_by(|a, b| a.total_cmp(b));
    let n = scores.len();
    // Lower tail: 99% of documents score at least this much.
    let p99_idx = ((n as f64) * 0.01).floor() as usize;
    Some(Summary {
        median: scores[n / 2],
        average: scores.iter().sum::<f64>() / n as f64,
        p99: scores[p99_idx.min(n - 1)],
        min: scores[0],
    })
}

fn print_accuracy_summary(label: &str, summary: &Summary) {
    eprintln!("  [{}]", label);
    eprintln!("    Median: {:.2}%", summary.median);
    eprintln!("    Average: {:.2}%", summary.average);
    eprintln!("    P99 (floor): {:.2}%", summary.p99);
    eprintln!("    Min: {:.2}%", summary.min);
    eprintln!(
        "    Target (>= {:.0}%): {}",
        TARGET_ACCURACY,
        if summary.median >= TARGET_ACCURACY { "PASS" } else { "FAIL" }
    );
}
