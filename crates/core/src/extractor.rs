use crate::config::{is_sql_identifier, SourceConfig};
use crate::error::{IndexError, Result};
use crate::models::{ColumnInfo, SourceRecord, SourceSummary};
use sqlx::{AnyPool, Row};
use tracing::debug;

/// Where classification records come from.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Every record, in the order the source delivers them.
    async fn fetch_all(&self) -> Result<Vec<SourceRecord>>;

    /// Columns, row count and up to `sample` rows; fails when the table is unreachable.
    async fn inspect(&self, sample: usize) -> Result<SourceSummary>;
}

/// Reads `(code, fullname)` pairs from one relational table.
pub struct SqlRecordExtractor {
    pool: AnyPool,
    table: String,
    code_column: String,
    name_column: String,
}

impl SqlRecordExtractor {
    pub fn new(pool: AnyPool, cfg: &SourceConfig) -> Result<Self> {
        for ident in [&cfg.table, &cfg.code_column, &cfg.name_column] {
            if !is_sql_identifier(ident) {
                return Err(IndexError::Config(format!("invalid SQL identifier {ident:?}")));
            }
        }
        Ok(Self {
            pool,
            table: cfg.table.clone(),
            code_column: cfg.code_column.clone(),
            name_column: cfg.name_column.clone(),
        })
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT CAST({} AS TEXT) AS code, CAST({} AS TEXT) AS fullname FROM {}",
            self.code_column, self.name_column, self.table
        )
    }

    /// Catalog query listing `(name, type)` per column for the connected backend.
    fn columns_sql(&self, backend: &str) -> Option<String> {
        let (schema, table) = match self.table.split_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (None, self.table.as_str()),
        };
        match backend {
            "PostgreSQL" => {
                let schema = schema.map_or("current_schema()".to_string(), |s| format!("'{s}'"));
                Some(format!(
                    "SELECT CAST(column_name AS TEXT) AS name, CAST(data_type AS TEXT) AS data_type \
                     FROM information_schema.columns \
                     WHERE table_schema = {schema} AND table_name = '{table}' \
                     ORDER BY ordinal_position"
                ))
            }
            "SQLite" => Some(format!(
                "SELECT name, type AS data_type FROM pragma_table_info('{table}') ORDER BY cid"
            )),
            _ => None,
        }
    }

    async fn columns(&self) -> Result<Vec<ColumnInfo>> {
        let mut conn = self.pool.acquire().await?;
        let backend = conn.backend_name().to_string();
        let Some(sql) = self.columns_sql(&backend) else {
            debug!(backend = %backend, "no column catalog for backend");
            return Ok(Vec::new());
        };
        let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
        rows.iter()
            .map(|row| -> Result<ColumnInfo> {
                let name: String = row.try_get("name")?;
                let data_type: Option<String> = row.try_get("data_type")?;
                Ok(ColumnInfo {
                    name,
                    data_type: data_type.unwrap_or_default(),
                })
            })
            .collect()
    }

    fn decode(row: &sqlx::any::AnyRow) -> Result<SourceRecord> {
        let code: Option<String> = row.try_get("code")?;
        let fullname: Option<String> = row.try_get("fullname")?;
        Ok(SourceRecord {
            code: code.unwrap_or_default(),
            fullname: fullname.unwrap_or_default(),
        })
    }
}

#[async_trait::async_trait]
impl RecordSource for SqlRecordExtractor {
    async fn fetch_all(&self) -> Result<Vec<SourceRecord>> {
        let rows = sqlx::query(&self.select_sql())
            .fetch_all(&self.pool)
            .await?;
        let records = rows.iter().map(Self::decode).collect::<Result<Vec<_>>>()?;
        debug!(table = %self.table, count = records.len(), "fetched source records");
        Ok(records)
    }

    async fn inspect(&self, sample: usize) -> Result<SourceSummary> {
        let row_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;
        let columns = self.columns().await?;
        let rows = sqlx::query(&format!("{} LIMIT {}", self.select_sql(), sample))
            .fetch_all(&self.pool)
            .await?;
        let samples = rows.iter().map(Self::decode).collect::<Result<Vec<_>>>()?;
        Ok(SourceSummary {
            table: self.table.clone(),
            columns,
            row_count,
            samples,
        })
    }
}
