//! Typed requests and responses for the language-model and embedding seams.
//!
//! Structured fields keep the model's key order so records read the way the
//! document does.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct SummarizeRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureRequest {
    pub text: String,
}

/// One "key : value" pair pulled out of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredField {
    pub key: String,
    pub value: String,
}

impl StructuredField {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureResponse {
    /// Model output after code fences are removed.
    pub raw: String,
    pub fields: Vec<StructuredField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRequest {
    pub question: String,
    /// Retrieved document texts the answer must be grounded in.
    pub context: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedRequest {
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedResponse {
    /// One vector per input, in input order.
    pub vectors: Vec<Vec<f32>>,
}
