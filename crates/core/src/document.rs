use crate::embeddings::Embedder;
use crate::error::Result;
use crate::models::{IndexedDocument, SourceRecord, DOCUMENT_CATEGORY, DOCUMENT_TYPE};

pub fn document_id(code: &str) -> String {
    format!("classifier_{code}")
}

pub fn document_content(code: &str, fullname: &str) -> String {
    format!("Code: {code} | Name: {fullname}")
}

/// Builds the indexed form of a record, embedding its `content`.
pub async fn build(record: &SourceRecord, embedder: &Embedder) -> Result<IndexedDocument> {
    let content = document_content(&record.code, &record.fullname);
    let embedding = embedder.embed(&content).await?;
    Ok(IndexedDocument {
        id: document_id(&record.code),
        code: record.code.clone(),
        fullname: record.fullname.clone(),
        content,
        embedding,
        doc_type: DOCUMENT_TYPE.to_string(),
        category: DOCUMENT_CATEGORY.to_string(),
    })
}
