use crate::config::{AppConfig, IndexingConfig, LookupConfig};
use crate::document;
use crate::embeddings::Embedder;
use crate::error::{IndexError, Result};
use crate::extractor::{RecordSource, SqlRecordExtractor};
use crate::index::IndexClient;
use crate::models::{
    BatchRow, CodeLookup, DescriptionLookup, RecordFailure, ReindexReport, SourceRecord,
};
use crate::search;
use futures::stream::{self, StreamExt};
use providers::hashed::HashedEmbedder;
use providers::meili::{SearchServiceClient, SearchServiceConfig};
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindexProgress {
    pub processed: usize,
    pub indexed: usize,
    pub failed: usize,
    pub total: usize,
}

pub type ProgressFn = Arc<dyn Fn(ReindexProgress) + Send + Sync>;

/// Drives full-table indexing and multi-query lookups against one index.
pub struct BatchOrchestrator {
    index: Arc<IndexClient>,
    indexing: IndexingConfig,
    lookup: LookupConfig,
    progress: Option<ProgressFn>,
}

impl BatchOrchestrator {
    pub fn new(index: Arc<IndexClient>, indexing: IndexingConfig, lookup: LookupConfig) -> Self {
        Self {
            index,
            indexing,
            lookup,
            progress: None,
        }
    }

    /// Called every `progress_every` records and once at the end.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn index(&self) -> &IndexClient {
        &self.index
    }

    async fn index_record(&self, record: &SourceRecord, embedder: &Embedder) -> Result<()> {
        let doc = document::build(record, embedder).await?;
        self.index.upsert(&doc).await
    }

    /// Rebuilds the index from every source record. A rejected record is
    /// reported in the result and the run continues; any other failure
    /// aborts the run.
    pub async fn reindex_all(
        &self,
        source: &dyn RecordSource,
        embedder: &Embedder,
    ) -> Result<ReindexReport> {
        self.index.ensure_ready().await?;
        let records = source.fetch_all().await?;
        let total = records.len();
        info!(total, index = %self.index.name(), "records to index");

        let mut report = ReindexReport {
            total,
            ..ReindexReport::default()
        };
        let every = self.indexing.progress_every.max(1);
        let mut processed = 0usize;
        let mut outcomes = stream::iter(records.iter())
            .map(|record| self.index_record(record, embedder))
            .buffer_unordered(self.indexing.concurrency.max(1));

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Ok(()) => report.indexed_count += 1,
                Err(IndexError::RecordRejected { code, reason }) => {
                    warn!(%code, %reason, "record rejected");
                    report.failures.push(RecordFailure { code, reason });
                }
                Err(err) => return Err(err),
            }
            processed += 1;
            if processed % every == 0 {
                info!(
                    processed,
                    indexed = report.indexed_count,
                    failed = report.failures.len(),
                    total,
                    "indexing progress"
                );
                self.report_progress(processed, &report);
            }
        }
        if processed % every != 0 {
            self.report_progress(processed, &report);
        }

        info!(
            indexed = report.indexed_count,
            failed = report.failures.len(),
            "indexing finished"
        );
        Ok(report)
    }

    fn report_progress(&self, processed: usize, report: &ReindexReport) {
        if let Some(progress) = &self.progress {
            progress(ReindexProgress {
                processed,
                indexed: report.indexed_count,
                failed: report.failures.len(),
                total: report.total,
            });
        }
    }

    pub async fn lookup_description(&self, description: &str) -> Result<DescriptionLookup> {
        search::lookup_description(&self.index, description, self.lookup.description_limit).await
    }

    pub async fn lookup_code(&self, code: &str) -> Result<CodeLookup> {
        search::lookup_code(&self.index, code, self.lookup.code_limit).await
    }

    /// One row per query, in input order.
    pub async fn batch_descriptions(&self, queries: &[String]) -> Vec<BatchRow> {
        let mut rows = Vec::with_capacity(queries.len());
        for query in queries {
            let outcome = self.lookup_description(query).await;
            rows.push(batch_row(query, outcome, BatchRow::from_description));
        }
        rows
    }

    /// One row per code, in input order.
    pub async fn batch_codes(&self, codes: &[String]) -> Vec<BatchRow> {
        let mut rows = Vec::with_capacity(codes.len());
        for code in codes {
            let outcome = self.lookup_code(code).await;
            rows.push(batch_row(code, outcome, BatchRow::from_code));
        }
        rows
    }
}

fn batch_row<T>(query: &str, outcome: Result<T>, to_row: fn(&str, &T) -> BatchRow) -> BatchRow {
    match outcome {
        Ok(result) => to_row(query, &result),
        Err(err) => {
            warn!(query, error = %err, "batch lookup failed");
            BatchRow::failed(query, err.to_string())
        }
    }
}

/// One query per non-blank line, trimmed.
pub fn parse_batch_input(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn build_registry(config: &AppConfig) -> Result<ProviderRegistry> {
    let mut reg = ProviderRegistry::new().with_embedding(
        "hashed",
        Arc::new(HashedEmbedder::new(config.embeddings.dimensions)),
    );

    if let (Some(key), Some(base)) = (
        std::env::var_os("OPENAI_API_KEY"),
        std::env::var_os("OPENAI_BASE_URL"),
    ) {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url: base.to_string_lossy().into_owned(),
            embedding_model: config.embeddings.model.clone(),
            dimensions: config.embeddings.dimensions,
        });
        reg = reg.with_embedding("openai", Arc::new(provider));
    }

    reg = register_local(reg, config)?;

    Ok(reg.set_preferred_embedding(&config.embeddings.provider))
}

#[cfg(feature = "local-model")]
fn register_local(reg: ProviderRegistry, config: &AppConfig) -> Result<ProviderRegistry> {
    if config.embeddings.provider != "local" {
        return Ok(reg);
    }
    let dir = config.embeddings.model_dir.as_deref().ok_or_else(|| {
        IndexError::Config("embeddings.model_dir is required for the local provider".into())
    })?;
    let provider =
        providers::local::LocalEmbedder::load(std::path::Path::new(dir), config.embeddings.force_cpu)
            .map_err(IndexError::from_embedding)?;
    Ok(reg.with_embedding("local", Arc::new(provider)))
}

#[cfg(not(feature = "local-model"))]
fn register_local(reg: ProviderRegistry, _config: &AppConfig) -> Result<ProviderRegistry> {
    Ok(reg)
}

pub fn build_embedder(config: &AppConfig) -> Result<Embedder> {
    Embedder::from_registry(&build_registry(config)?, None)
}

pub fn build_index_client(config: &AppConfig) -> Result<IndexClient> {
    let api_key = config.search.resolve_api_key().ok_or_else(|| {
        IndexError::Config("search.api_key and MEILI_MASTER_KEY are both unset or empty".into())
    })?;
    let client = SearchServiceClient::new(SearchServiceConfig {
        url: config.search.url.clone(),
        index: config.search.index.clone(),
        api_key,
    })
    .map_err(IndexError::from_service)?;
    Ok(IndexClient::new(client, config.search.primary_key.clone()))
}

pub async fn connect_source(config: &AppConfig) -> Result<SqlRecordExtractor> {
    let pool = storage::connect(&config.source.url, config.source.max_connections)
        .await
        .map_err(|e| IndexError::SourceUnavailable(e.to_string()))?;
    SqlRecordExtractor::new(pool, &config.source)
}

pub fn build_orchestrator(config: &AppConfig) -> Result<BatchOrchestrator> {
    let index = build_index_client(config)?;
    Ok(BatchOrchestrator::new(
        Arc::new(index),
        config.indexing.clone(),
        config.lookup.clone(),
    ))
}
