#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{patch, post};
use axum::{Json, Router};
use hsindex_core::config::AppConfig;
use hsindex_core::extractor::SqlRecordExtractor;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const KEY: &str = "test-master-key";

pub const HS_ROWS: &[(&str, &str)] = &[
    ("01", "Live animals"),
    ("0101", "Live horses, asses, mules and hinnies"),
    ("0102", "Live bovine animals"),
    ("0201", "Meat of bovine animals, fresh or chilled"),
    ("0301", "Live fish"),
    ("0401", "Milk and cream, not concentrated nor containing added sugar"),
    ("0901", "Coffee, whether or not roasted or decaffeinated"),
];

#[derive(Default)]
pub struct FakeIndex {
    pub primary_key: String,
    pub settings: Option<Value>,
    pub docs: Vec<Value>,
}

/// In-process stand-in for the search service.
#[derive(Default)]
pub struct FakeSearchService {
    pub indexes: Mutex<HashMap<String, FakeIndex>>,
    pub reject_codes: Mutex<HashSet<String>>,
    pub failing_queries: Mutex<HashSet<String>>,
    pub garbled_queries: Mutex<HashSet<String>>,
    pub settings_calls: Mutex<usize>,
}

impl FakeSearchService {
    pub fn reject_code(&self, code: &str) {
        self.reject_codes.lock().unwrap().insert(code.to_string());
    }

    pub fn fail_query(&self, q: &str) {
        self.failing_queries.lock().unwrap().insert(q.to_string());
    }

    /// Answer this query with 200 and a body that is not a search result.
    pub fn garble_query(&self, q: &str) {
        self.garbled_queries.lock().unwrap().insert(q.to_string());
    }

    pub fn docs(&self, uid: &str) -> Vec<Value> {
        self.indexes
            .lock()
            .unwrap()
            .get(uid)
            .map(|i| i.docs.clone())
            .unwrap_or_default()
    }

    pub fn settings(&self, uid: &str) -> Option<Value> {
        self.indexes
            .lock()
            .unwrap()
            .get(uid)
            .and_then(|i| i.settings.clone())
    }
}

type Shared = Arc<FakeSearchService>;
type Reply = (StatusCode, Json<Value>);

fn authorized(headers: &HeaderMap) -> Result<(), Reply> {
    let expected = format!("Bearer {KEY}");
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(v) if v == expected => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": "invalid_api_key", "message": "The provided API key is invalid."})),
        )),
    }
}

fn missing_index(uid: &str) -> Reply {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"code": "index_not_found", "message": format!("Index `{uid}` not found.")})),
    )
}

async fn create_index(State(svc): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let uid = body["uid"].as_str().unwrap_or_default().to_string();
    let mut indexes = svc.indexes.lock().unwrap();
    if indexes.contains_key(&uid) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"code": "index_already_exists", "message": format!("Index `{uid}` already exists.")})),
        );
    }
    indexes.insert(
        uid.clone(),
        FakeIndex {
            primary_key: body["primaryKey"].as_str().unwrap_or("id").to_string(),
            ..FakeIndex::default()
        },
    );
    (StatusCode::ACCEPTED, Json(json!({"indexUid": uid, "status": "enqueued"})))
}

async fn update_settings(
    State(svc): State<Shared>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let mut indexes = svc.indexes.lock().unwrap();
    let Some(index) = indexes.get_mut(&uid) else {
        return missing_index(&uid);
    };
    index.settings = Some(body);
    *svc.settings_calls.lock().unwrap() += 1;
    (StatusCode::ACCEPTED, Json(json!({"indexUid": uid, "status": "enqueued"})))
}

async fn add_documents(
    State(svc): State<Shared>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Json(docs): Json<Vec<Value>>,
) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let rejected = svc.reject_codes.lock().unwrap().clone();
    let mut indexes = svc.indexes.lock().unwrap();
    let Some(index) = indexes.get_mut(&uid) else {
        return missing_index(&uid);
    };
    for doc in &docs {
        if let Some(code) = doc["code"].as_str() {
            if rejected.contains(code) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"code": "invalid_document_fields", "message": format!("document {code} rejected")})),
                );
            }
        }
    }
    let key = index.primary_key.clone();
    for doc in docs {
        match index.docs.iter_mut().find(|d| d[&key] == doc[&key]) {
            Some(existing) => *existing = doc,
            None => index.docs.push(doc),
        }
    }
    (StatusCode::ACCEPTED, Json(json!({"indexUid": uid, "status": "enqueued"})))
}

fn words(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

async fn search(
    State(svc): State<Shared>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let q = body["q"].as_str().unwrap_or_default().to_string();
    if svc.failing_queries.lock().unwrap().contains(&q) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"code": "internal", "message": "search backend exploded"})),
        );
    }
    if svc.garbled_queries.lock().unwrap().contains(&q) {
        return (StatusCode::OK, Json(json!({"hits": "not-a-list"})));
    }
    let limit = body["limit"].as_u64().unwrap_or(20) as usize;
    let fields: Vec<String> = body["attributesToRetrieve"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let with_score = body["showRankingScore"].as_bool().unwrap_or(false);

    let indexes = svc.indexes.lock().unwrap();
    let Some(index) = indexes.get(&uid) else {
        return missing_index(&uid);
    };
    let query = words(&q);
    let mut scored: Vec<(f64, &Value)> = index
        .docs
        .iter()
        .filter_map(|doc| {
            let haystack = words(&format!(
                "{} {}",
                doc["code"].as_str().unwrap_or_default(),
                doc["fullname"].as_str().unwrap_or_default()
            ));
            if query.is_empty() {
                return Some((1.0, doc));
            }
            let matched = query
                .iter()
                .filter(|w| haystack.iter().any(|h| h.starts_with(w.as_str())))
                .count();
            (matched > 0).then(|| (matched as f64 / query.len() as f64, doc))
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let hits: Vec<Value> = scored
        .into_iter()
        .take(limit)
        .map(|(score, doc)| {
            let mut hit = serde_json::Map::new();
            for f in &fields {
                if let Some(v) = doc.get(f) {
                    hit.insert(f.clone(), v.clone());
                }
            }
            if with_score {
                hit.insert("_rankingScore".into(), json!(score));
            }
            Value::Object(hit)
        })
        .collect();
    (StatusCode::OK, Json(json!({"hits": hits, "query": q})))
}

/// Serves the fake on an ephemeral port and returns its base URL.
pub async fn spawn_search_service(svc: Shared) -> String {
    let app = Router::new()
        .route("/indexes", post(create_index))
        .route("/indexes/:uid/settings", patch(update_settings))
        .route("/indexes/:uid/documents", post(add_documents))
        .route("/indexes/:uid/search", post(search))
        .with_state(svc);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn config_for(search_url: &str, index: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.search.url = search_url.to_string();
    cfg.search.index = index.to_string();
    cfg.search.api_key = Some(KEY.to_string());
    cfg.embeddings.dimensions = 32;
    cfg.source.url = "sqlite::memory:".to_string();
    cfg
}

/// In-memory SQLite table shaped like the production classifier table.
pub async fn seeded_source(cfg: &AppConfig, rows: &[(&str, &str)]) -> SqlRecordExtractor {
    let pool = storage::connect(&cfg.source.url, 1).await.unwrap();
    sqlx::query(&format!(
        "CREATE TABLE {} ({} TEXT NOT NULL, {} TEXT)",
        cfg.source.table, cfg.source.code_column, cfg.source.name_column
    ))
    .execute(&pool)
    .await
    .unwrap();
    for (code, name) in rows {
        sqlx::query(&format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            cfg.source.table, cfg.source.code_column, cfg.source.name_column
        ))
        .bind(code.to_string())
        .bind(name.to_string())
        .execute(&pool)
        .await
        .unwrap();
    }
    SqlRecordExtractor::new(pool, &cfg.source).unwrap()
}
