//! PaperLens: OCR document ingestion.
//!
//! The heart of the crate is `layout`, which turns positioned OCR fragments
//! back into readable text. Everything else wires it to the outside world:
//!   - `ocr`, `llm`, `store`: collaborator traits and their HTTP/file adapters
//!   - `pipeline`: extract, summarize, search, ask, accuracy
//!   - `config`: AppConfig built once at startup
//!   - `cli`: the `paperlens` command line

pub mod accuracy;
pub mod cli;
pub mod config;
pub mod error;
pub mod layout;
pub mod llm;
pub mod ocr;
pub mod pages;
pub mod pipeline;
pub mod store;

/// Entry point called by the `paperlens` binary.
pub fn run() -> std::process::ExitCode {
    env_logger::init();
    cli::main()
}
