use serde::{Deserialize, Serialize};

pub const DOCUMENT_TYPE: &str = "classifier";
pub const DOCUMENT_CATEGORY: &str = "hs_code";

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub code: String,
    pub fullname: String,
}

impl SourceRecord {
    pub fn new(code: impl Into<String>, fullname: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            fullname: fullname.into(),
        }
    }
}

/// The document stored in the search index, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub code: String,
    pub fullname: String,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub limit: usize,
    pub fields_to_return: Vec<String>,
}

impl SearchQuery {
    /// Query returning the fields the lookups need.
    pub fn lookup(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit: limit.max(1),
            fields_to_return: vec![
                "code".to_string(),
                "fullname".to_string(),
                "content".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "_rankingScore", alias = "_score")]
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMatch {
    pub code: String,
    pub description: String,
    pub relevance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestMatch {
    pub code: String,
    pub description: String,
}

/// Answer to "which codes match this description".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionLookup {
    pub query: String,
    pub found: bool,
    pub total_results: usize,
    pub results: Vec<CodeMatch>,
    pub best_match: Option<BestMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Answer to "what is the description of this code".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLookup {
    pub code: String,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Found,
    NotFound,
    Failed,
}

impl BatchStatus {
    pub fn from_found(found: bool) -> Self {
        if found {
            BatchStatus::Found
        } else {
            BatchStatus::NotFound
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatchStatus::Found => "Found",
            BatchStatus::NotFound => "NotFound",
            BatchStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// One line of a batch lookup. `code` and `description` are null unless found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRow {
    pub query: String,
    pub status: BatchStatus,
    pub code: Option<String>,
    pub description: Option<String>,
    /// Only set by description batches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchRow {
    pub fn from_description(query: &str, lookup: &DescriptionLookup) -> Self {
        let best = lookup.best_match.as_ref().filter(|_| lookup.found);
        Self {
            query: query.to_string(),
            status: BatchStatus::from_found(lookup.found),
            code: best.map(|m| m.code.clone()),
            description: best.map(|m| m.description.clone()),
            total_results: Some(lookup.total_results),
            error: None,
        }
    }

    pub fn from_code(query: &str, lookup: &CodeLookup) -> Self {
        let description = lookup.description.clone().filter(|_| lookup.found);
        Self {
            query: query.to_string(),
            status: BatchStatus::from_found(lookup.found),
            code: description.as_ref().map(|_| lookup.code.clone()),
            description,
            total_results: None,
            error: None,
        }
    }

    pub fn failed(query: &str, error: String) -> Self {
        Self {
            query: query.to_string(),
            status: BatchStatus::Failed,
            code: None,
            description: None,
            total_results: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub code: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexReport {
    pub total: usize,
    pub indexed_count: usize,
    pub failures: Vec<RecordFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub table: String,
    /// Table structure in declaration order.
    pub columns: Vec<ColumnInfo>,
    pub row_count: i64,
    pub samples: Vec<SourceRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSetup {
    pub created: bool,
    pub already_existed: bool,
}
