//! Live language-model checks against the configured provider.
//!
//! Skipped unless an API key is available. Loads `.env.local` / `.env` and
//! the keychain exactly like the binary does.

use paperlens_lib::config::AppConfig;
use paperlens_lib::llm::prompts::SHORT_TEXT_NOTICE;
use paperlens_lib::llm::*;

fn live_client() -> Option<LlmClient> {
    let config = AppConfig::load();
    let kind = config.llm.provider;
    if config.llm.api_key(kind).is_none() {
        eprintln!("SKIP: No {}", kind.env_key());
        return None;
    }
    eprintln!("[TEST] Using provider {}", kind);
    LlmClient::from_config(&config).ok()
}

const INVOICE: &str = "INVOICE No. 2024-117 Date 2024-03-02 Supplier Acme Trading Co. \
Representative Jane Park Phone 02-555-0100 Bill to Northwind Ltd. \
Item Office chairs Qty 4 Unit price 150,000 Amount 600,000 \
Item Desk lamps Qty 10 Unit price 25,000 Amount 250,000 \
Subtotal 850,000 VAT 85,000 Total due 935,000 Payment due 2024-04-01 \
Bank transfer to Acme Trading Co. account 110-222-333444 Thank you for your business.";

#[tokio::test]
async fn test_summarize_returns_text() {
    let Some(client) = live_client() else { return };

    let start = std::time::Instant::now();
    let response = client
        .summarize(&SummarizeRequest {
            text: INVOICE.to_string(),
        })
        .await
        .expect("summarize failed");
    eprintln!("[TEST] Summary in {}ms: {}", start.elapsed().as_millis(), response.summary);

    assert!(!response.summary.is_empty());
    assert_ne!(response.summary, SHORT_TEXT_NOTICE);
}

#[tokio::test]
async fn test_extract_structure_finds_fields() {
    let Some(client) = live_client() else { return };

    let response = client
        .extract_structure(&StructureRequest {
            text: INVOICE.to_string(),
        })
        .await
        .expect("extract_structure failed");
    eprintln!("[TEST] Raw structure:\n{}", response.raw);

    assert!(
        response.fields.len() >= 3,
        "expected several fields, got {:?}",
        response.fields
    );
    assert!(response.fields.iter().all(|f| !f.key.is_empty()));
    assert!(!response.raw.starts_with("```"));
}

#[tokio::test]
async fn test_embeddings_when_supported() {
    let Some(client) = live_client() else { return };

    match client
        .embed(&EmbedRequest {
            inputs: vec!["invoice".into(), "letter".into()],
        })
        .await
    {
        Ok(response) => {
            assert_eq!(response.vectors.len(), 2);
            assert!(!response.vectors[0].is_empty());
            assert_eq!(response.vectors[0].len(), response.vectors[1].len());
        }
        Err(e) => {
            eprintln!("[TEST] Embeddings unavailable: {}", e);
            assert!(!e.is_retryable());
        }
    }
}
