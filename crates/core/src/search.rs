//! Shapes raw hits into lookup answers. No re-ranking happens here: the
//! service's order is kept and the first hit is the best match.

use crate::error::Result;
use crate::index::IndexClient;
use crate::models::{BestMatch, CodeLookup, CodeMatch, DescriptionLookup, SearchHit, SearchQuery};
use tracing::debug;

pub const NO_MATCH_MESSAGE: &str = "No matching codes found";
pub const CODE_NOT_FOUND_MESSAGE: &str = "Code not found";
pub const NO_MATCH_SUGGESTIONS: [&str; 3] =
    ["Try different keywords", "Check spelling", "Use broader terms"];

pub fn format_description_query(
    raw: &[SearchHit],
    query_text: &str,
    limit: usize,
) -> DescriptionLookup {
    if raw.is_empty() {
        return DescriptionLookup {
            query: query_text.to_string(),
            found: false,
            total_results: 0,
            results: Vec::new(),
            best_match: None,
            message: Some(NO_MATCH_MESSAGE.to_string()),
            suggestions: NO_MATCH_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        };
    }

    let results: Vec<CodeMatch> = raw
        .iter()
        .take(limit.max(1))
        .map(|hit| CodeMatch {
            code: hit.code.clone(),
            description: hit.fullname.clone(),
            relevance: hit.relevance_score,
        })
        .collect();
    let best_match = results.first().map(|m| BestMatch {
        code: m.code.clone(),
        description: m.description.clone(),
    });

    DescriptionLookup {
        query: query_text.to_string(),
        found: true,
        total_results: results.len(),
        results,
        best_match,
        message: None,
        suggestions: Vec::new(),
    }
}

/// Only the top hit is considered; it answers with its own code.
pub fn format_code_query(raw: &[SearchHit], code: &str) -> CodeLookup {
    match raw.first() {
        Some(hit) => CodeLookup {
            code: hit.code.clone(),
            found: true,
            description: Some(hit.fullname.clone()),
            message: None,
        },
        None => CodeLookup {
            code: code.to_string(),
            found: false,
            description: None,
            message: Some(CODE_NOT_FOUND_MESSAGE.to_string()),
        },
    }
}

pub async fn lookup_description(
    index: &IndexClient,
    description: &str,
    limit: usize,
) -> Result<DescriptionLookup> {
    let hits = index.search(&SearchQuery::lookup(description, limit)).await?;
    debug!(query = description, hits = hits.len(), "description lookup");
    Ok(format_description_query(&hits, description, limit))
}

pub async fn lookup_code(index: &IndexClient, code: &str, limit: usize) -> Result<CodeLookup> {
    let hits = index.search(&SearchQuery::lookup(code, limit)).await?;
    debug!(code, hits = hits.len(), "code lookup");
    Ok(format_code_query(&hits, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(code: &str, name: &str, score: f64) -> SearchHit {
        SearchHit {
            code: code.into(),
            fullname: name.into(),
            content: format!("Code: {code} | Name: {name}"),
            relevance_score: score,
        }
    }

    #[test]
    fn empty_hits_are_not_found_with_suggestions() {
        let r = format_description_query(&[], "unobtainium", 5);
        assert!(!r.found);
        assert_eq!(r.total_results, 0);
        assert!(r.best_match.is_none());
        assert_eq!(r.suggestions.len(), 3);
        assert_eq!(r.message.as_deref(), Some(NO_MATCH_MESSAGE));
    }

    #[test]
    fn best_match_is_first_hit_even_with_lower_score() {
        let hits = vec![hit("0102", "Live bovine animals", 0.4), hit("0101", "Live horses", 0.9)];
        let r = format_description_query(&hits, "live", 5);
        assert!(r.found);
        assert_eq!(r.total_results, 2);
        assert_eq!(r.results[0].code, "0102");
        assert_eq!(r.results[1].relevance, 0.9);
        assert_eq!(
            r.best_match,
            Some(BestMatch {
                code: "0102".into(),
                description: "Live bovine animals".into()
            })
        );
    }

    #[test]
    fn results_respect_limit() {
        let hits: Vec<SearchHit> = (0..4).map(|i| hit(&format!("0{i}"), "x", 0.1)).collect();
        let r = format_description_query(&hits, "x", 2);
        assert_eq!(r.results.len(), 2);
        assert_eq!(r.total_results, 2);
    }

    #[test]
    fn code_query_uses_only_top_hit() {
        let hits = vec![hit("0101", "Live horses", 1.0), hit("0102", "Live bovine", 0.5)];
        let r = format_code_query(&hits, "0101");
        assert!(r.found);
        assert_eq!(r.code, "0101");
        assert_eq!(r.description.as_deref(), Some("Live horses"));

        let missing = format_code_query(&[], "9999");
        assert!(!missing.found);
        assert_eq!(missing.code, "9999");
        assert_eq!(missing.message.as_deref(), Some(CODE_NOT_FOUND_MESSAGE));
    }

    #[test]
    fn not_found_json_shape() {
        let json = serde_json::to_value(format_description_query(&[], "q", 5)).unwrap();
        assert_eq!(json["found"], false);
        assert!(json["best_match"].is_null());
        assert_eq!(json["suggestions"].as_array().unwrap().len(), 3);

        let json = serde_json::to_value(format_code_query(&[], "9999")).unwrap();
        assert_eq!(json["found"], false);
        assert!(json.get("description").is_none());
    }
}
