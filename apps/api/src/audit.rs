//! Best-effort audit log of recruiter queries, kept as a capped Redis list.
//! Queries are ephemeral — this is the only persistence they get, and it is
//! optional: a failed write is logged and never fails the request.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::query::filters::SearchFilters;

const AUDIT_KEY: &str = "recruiter:query_audit";
const AUDIT_CAP: isize = 1_000;

#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    query: &'a str,
    filters: &'a SearchFilters,
    result_count: usize,
    at: DateTime<Utc>,
}

pub async fn record_query(
    redis: &redis::Client,
    query: &str,
    filters: &SearchFilters,
    result_count: usize,
) {
    let entry = AuditEntry {
        query,
        filters,
        result_count,
        at: Utc::now(),
    };
    let payload = match serde_json::to_string(&entry) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Could not serialize audit entry: {e}");
            return;
        }
    };

    let outcome: redis::RedisResult<()> = async {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        redis::pipe()
            .lpush(AUDIT_KEY, &payload)
            .ltrim(AUDIT_KEY, 0, AUDIT_CAP - 1)
            .query_async(&mut conn)
            .await
    }
    .await;

    if let Err(e) = outcome {
        warn!("Query audit write failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_entry_serializes_filters_inline() {
        let filters = SearchFilters {
            skills: Some(vec!["Rust".to_string()]),
            domain: Some("fintech".to_string()),
            min_experience: None,
        };
        let entry = AuditEntry {
            query: "rust people",
            filters: &filters,
            result_count: 3,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["query"], "rust people");
        assert_eq!(json["filters"]["domain"], "fintech");
        assert_eq!(json["result_count"], 3);
    }
}
