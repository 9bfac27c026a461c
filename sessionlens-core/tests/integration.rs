//! Integration tests for the query catalog
//!
//! Each test writes small Parquet snapshots into a temp directory with DuckDB
//! `COPY ... TO` and runs catalog operations against them.

use duckdb::Connection;
use sessionlens_core::config::DatasetsConfig;
use sessionlens_core::types::{LengthBucket, Relation};
use sessionlens_core::{Analytics, AttachmentStatus, Config, Error};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

// ============================================
// Fixtures
// ============================================

const SESSIONS: &str = r#"
SELECT * FROM (VALUES
    ('s1', 'P1', '/work/p1', TIMESTAMP '2024-03-01 10:00:00', TIMESTAMP '2024-03-01 10:45:30', 3, 1, 2),
    ('s2', 'P2', '/work/p2', TIMESTAMP '2024-03-02 09:00:00', TIMESTAMP '2024-03-02 11:00:59', 4, 2, 2),
    ('s3', 'P2', '/work/p2', TIMESTAMP '2024-03-03 08:00:00', TIMESTAMP '2024-03-03 08:00:00', 6, 3, 3)
) AS t(session_id, project_name, project_path, first_message_at, last_message_at,
       message_count, user_message_count, assistant_message_count)
"#;

/// Session s1 holds messages of 50, 450, and 12000 characters.
const MESSAGES: &str = r#"
SELECT id, session_id, "type", "timestamp", repeat('x', len) AS content,
       content_type::VARCHAR AS content_type, tool_name::VARCHAR AS tool_name
FROM (VALUES
    ('m1', 's1', 'user',      TIMESTAMP '2024-03-01 10:00:00', 50,    'text',     NULL),
    ('m2', 's1', 'assistant', TIMESTAMP '2024-03-01 10:20:00', 450,   NULL,       NULL),
    ('m3', 's1', 'assistant', TIMESTAMP '2024-03-01 10:45:30', 12000, 'tool_use', 'Read'),
    ('m4', 's2', 'user',      TIMESTAMP '2024-03-02 09:00:00', 10,    'text',     NULL),
    ('m5', 's2', 'system',    TIMESTAMP '2024-03-02 10:00:00', 200,   NULL,       NULL)
) AS t(id, session_id, "type", "timestamp", len, content_type, tool_name)
"#;

const S1_MESSAGES_ONLY: &str = r#"
SELECT id, session_id, "type", "timestamp", repeat('x', len) AS content,
       content_type::VARCHAR AS content_type, tool_name::VARCHAR AS tool_name
FROM (VALUES
    ('m1', 's1', 'user',      TIMESTAMP '2024-03-01 10:00:00', 50,    'text', NULL),
    ('m2', 's1', 'assistant', TIMESTAMP '2024-03-01 10:20:00', 450,   'text', NULL),
    ('m3', 's1', 'assistant', TIMESTAMP '2024-03-01 10:45:30', 12000, 'text', NULL)
) AS t(id, session_id, "type", "timestamp", len, content_type, tool_name)
"#;

const S1_SESSION_ONLY: &str = r#"
SELECT * FROM (VALUES
    ('s1', 'P1', '/work/p1', TIMESTAMP '2024-03-01 10:00:00', TIMESTAMP '2024-03-01 10:45:30', 3, 1, 2)
) AS t(session_id, project_name, project_path, first_message_at, last_message_at,
       message_count, user_message_count, assistant_message_count)
"#;

/// Tool A is called 5 times, B 5 times, C once.
const TOOL_CALLS: &str = r#"
SELECT 's1' AS session_id, 'A' AS tool_name, TIMESTAMP '2024-03-01 10:05:00' AS "timestamp" FROM range(3)
UNION ALL
SELECT 's1', 'C', TIMESTAMP '2024-03-01 10:30:00' FROM range(1)
UNION ALL
SELECT 's2', 'A', TIMESTAMP '2024-03-02 09:30:00' FROM range(2)
UNION ALL
SELECT 's2', 'B', TIMESTAMP '2024-03-02 10:30:00' FROM range(5)
"#;

fn write_parquet(conn: &Connection, dir: &Path, relation: Relation, select: &str) {
    let path = dir.join(relation.file_name());
    conn.execute_batch(&format!(
        "COPY ({}) TO '{}' (FORMAT PARQUET)",
        select,
        path.display()
    ))
    .expect("fixture snapshot should be written");
}

fn build_snapshots(tables: &[(Relation, &str)]) -> TempDir {
    sessionlens_core::logging::init_test();
    let dir = TempDir::new().unwrap();
    let conn = Connection::open_in_memory().unwrap();
    for (relation, select) in tables {
        write_parquet(&conn, dir.path(), *relation, select);
    }
    dir
}

fn full_snapshots() -> TempDir {
    build_snapshots(&[
        (Relation::Sessions, SESSIONS),
        (Relation::Messages, MESSAGES),
        (Relation::ToolCalls, TOOL_CALLS),
    ])
}

fn analytics_for(dir: &TempDir) -> Analytics {
    Analytics::new(Config {
        datasets: DatasetsConfig::with_base(dir.path().to_string_lossy()),
        ..Default::default()
    })
}

async fn attached_view_count(analytics: &Analytics) -> i64 {
    let engine = analytics.acquire_connection().await.unwrap();
    let rows = engine
        .query(
            "view_count",
            "SELECT COUNT(*) AS n FROM duckdb_views() \
             WHERE view_name IN ('sessions', 'messages', 'tool_calls')",
            &[],
            &[],
        )
        .unwrap();
    rows[0].int("n").unwrap()
}

// ============================================
// Attachment
// ============================================

#[tokio::test]
async fn test_attach_is_idempotent() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    analytics.ensure_datasets_attached().await.unwrap();
    analytics.ensure_datasets_attached().await.unwrap();

    for relation in Relation::ALL {
        assert_eq!(
            analytics.attachment_status(relation).await,
            AttachmentStatus::Attached
        );
    }
    assert_eq!(attached_view_count(&analytics).await, 3);
}

#[tokio::test]
async fn test_concurrent_attach_creates_views_once() {
    let dir = full_snapshots();
    let analytics = Arc::new(analytics_for(&dir));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let analytics = Arc::clone(&analytics);
            tokio::spawn(async move { analytics.ensure_datasets_attached().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(attached_view_count(&analytics).await, 3);
}

#[tokio::test]
async fn test_partial_attachment_keeps_other_relations() {
    let dir = build_snapshots(&[
        (Relation::Sessions, SESSIONS),
        (Relation::Messages, MESSAGES),
    ]);
    let analytics = analytics_for(&dir);

    match analytics.ensure_datasets_attached().await {
        Err(Error::DatasetUnavailable { relation, .. }) => {
            assert_eq!(relation, Relation::ToolCalls)
        }
        other => panic!("expected unavailable tool_calls, got {:?}", other),
    }

    // sessions and messages still answer
    let projects = analytics.get_project_breakdown().await.unwrap();
    assert_eq!(projects.len(), 2);

    // anything reading tool_calls reports the missing relation by name
    assert!(matches!(
        analytics.get_top_tools(15).await,
        Err(Error::RelationNotFound(Relation::ToolCalls))
    ));
    assert!(matches!(
        analytics.get_stats().await,
        Err(Error::RelationNotFound(Relation::ToolCalls))
    ));
}

#[tokio::test]
async fn test_malformed_snapshot_is_unavailable() {
    let dir = build_snapshots(&[
        (Relation::Messages, MESSAGES),
        (Relation::ToolCalls, TOOL_CALLS),
    ]);
    std::fs::write(dir.path().join("sessions.parquet"), b"not a parquet file").unwrap();
    let analytics = analytics_for(&dir);

    match analytics.ensure_datasets_attached().await {
        Err(Error::DatasetUnavailable { relation, .. }) => {
            assert_eq!(relation, Relation::Sessions)
        }
        other => panic!("expected unavailable sessions, got {:?}", other),
    }
    assert!(matches!(
        analytics.attachment_status(Relation::Sessions).await,
        AttachmentStatus::Failed(_)
    ));
    assert_eq!(analytics.get_tool_trend().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_first_query_attaches_lazily() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    assert_eq!(
        analytics.attachment_status(Relation::Sessions).await,
        AttachmentStatus::Pending
    );
    let stats = analytics.get_stats().await.unwrap();
    assert_eq!(stats.sessions, 3);
    assert_eq!(stats.messages, 5);
    assert_eq!(stats.tool_calls, 11);
    assert_eq!(
        analytics.attachment_status(Relation::Sessions).await,
        AttachmentStatus::Attached
    );
}

#[tokio::test]
async fn test_first_use_does_not_retry_failed_relation() {
    let dir = build_snapshots(&[
        (Relation::Sessions, SESSIONS),
        (Relation::Messages, MESSAGES),
    ]);
    let analytics = Arc::new(analytics_for(&dir));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let analytics = Arc::clone(&analytics);
            tokio::spawn(async move { analytics.get_top_tools(15).await })
        })
        .collect();
    for handle in handles {
        assert!(matches!(
            handle.await.unwrap(),
            Err(Error::RelationNotFound(Relation::ToolCalls))
        ));
    }

    // the snapshot shows up later; catalog calls keep the failed status
    let conn = Connection::open_in_memory().unwrap();
    write_parquet(&conn, dir.path(), Relation::ToolCalls, TOOL_CALLS);
    assert!(matches!(
        analytics.get_top_tools(15).await,
        Err(Error::RelationNotFound(Relation::ToolCalls))
    ));
    assert!(matches!(
        analytics.attachment_status(Relation::ToolCalls).await,
        AttachmentStatus::Failed(_)
    ));

    // an explicit attach retries it
    analytics.ensure_datasets_attached().await.unwrap();
    assert_eq!(analytics.get_top_tools(15).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_persistent_database_follows_configured_location() {
    let old = full_snapshots();
    let new = build_snapshots(&[
        (Relation::Sessions, S1_SESSION_ONLY),
        (Relation::Messages, S1_MESSAGES_ONLY),
        (Relation::ToolCalls, TOOL_CALLS),
    ]);
    let db_dir = TempDir::new().unwrap();
    let database = db_dir.path().join("sessionlens.duckdb");

    let open = |dir: &TempDir| {
        let mut config = Config {
            datasets: DatasetsConfig::with_base(dir.path().to_string_lossy()),
            ..Default::default()
        };
        config.engine.database = Some(database.clone());
        Analytics::new(config)
    };

    {
        let analytics = open(&old);
        assert_eq!(analytics.get_stats().await.unwrap().sessions, 3);
    }

    let analytics = open(&new);
    let stats = analytics.get_stats().await.unwrap();
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.messages, 3);
}

// ============================================
// Time buckets
// ============================================

#[tokio::test]
async fn test_activity_heatmap_is_sparse_and_ordered() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let cells: Vec<_> = analytics
        .get_activity_heatmap()
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.day_of_week, c.hour, c.count))
        .collect();

    // 2024-03-01 is a Friday, 2024-03-02 a Saturday
    assert_eq!(cells, vec![(5, 10, 3), (6, 9, 1), (6, 10, 1)]);
}

#[tokio::test]
async fn test_daily_trends() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let messages: Vec<_> = analytics
        .get_message_trend()
        .await
        .unwrap()
        .into_iter()
        .map(|d| (d.date, d.count))
        .collect();
    assert_eq!(
        messages,
        vec![("2024-03-01".to_string(), 3), ("2024-03-02".to_string(), 2)]
    );

    let tools: Vec<_> = analytics
        .get_tool_trend()
        .await
        .unwrap()
        .into_iter()
        .map(|d| (d.date, d.count))
        .collect();
    assert_eq!(
        tools,
        vec![("2024-03-01".to_string(), 4), ("2024-03-02".to_string(), 7)]
    );
}

// ============================================
// Rankings and distributions
// ============================================

#[tokio::test]
async fn test_top_tools_respects_limit() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let tools = analytics.get_top_tools(2).await.unwrap();
    assert_eq!(tools.len(), 2);
    assert!(tools.iter().all(|t| t.tool_name != "C"));
    assert!(tools.iter().map(|t| t.count).sum::<i64>() <= 10);
    // equal counts fall back to name order
    assert_eq!(tools[0].tool_name, "A");
    assert_eq!(tools[1].tool_name, "B");

    let all = analytics.get_top_tools(15).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].tool_name, "C");
    assert_eq!(all[2].count, 1);
}

#[tokio::test]
async fn test_roles_exclude_other_types() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let roles: Vec<_> = analytics
        .get_messages_by_role()
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.role, r.count))
        .collect();
    assert_eq!(
        roles,
        vec![("assistant".to_string(), 2), ("user".to_string(), 2)]
    );
}

#[tokio::test]
async fn test_length_distribution_scenario() {
    let dir = build_snapshots(&[
        (Relation::Sessions, SESSIONS),
        (Relation::Messages, S1_MESSAGES_ONLY),
        (Relation::ToolCalls, TOOL_CALLS),
    ]);
    let analytics = analytics_for(&dir);

    let buckets = analytics.get_message_length_distribution().await.unwrap();
    let labels: Vec<_> = buckets.iter().map(|b| b.bucket.label()).collect();
    assert_eq!(
        labels,
        vec!["< 100", "100-500", "500-1K", "1K-5K", "5K-10K", "10K+"]
    );
    let counts: Vec<_> = buckets.iter().map(|b| b.count).collect();
    assert_eq!(counts, vec![1, 1, 0, 0, 0, 1]);

    let estimates = analytics.get_token_estimates_per_session(20).await.unwrap();
    assert_eq!(estimates.len(), 1);
    assert_eq!(estimates[0].session_id, "s1");
    assert_eq!(estimates[0].total_chars, 12_500);
    assert_eq!(estimates[0].estimated_tokens, 3_125);
    assert_eq!(estimates[0].message_count, 3);
}

#[tokio::test]
async fn test_length_bucket_boundaries() {
    let dir = build_snapshots(&[(
        Relation::Messages,
        r#"
        SELECT 'm' || len::VARCHAR AS id, 's1' AS session_id, 'user' AS "type",
               TIMESTAMP '2024-03-01 10:00:00' AS "timestamp",
               CASE WHEN len IS NULL THEN NULL ELSE repeat('x', len) END AS content,
               'text' AS content_type, NULL::VARCHAR AS tool_name
        FROM (VALUES (NULL), (99), (100), (499), (500), (999), (1000), (4999), (5000), (9999), (10000))
            AS t(len)
        "#,
    )]);
    let analytics = analytics_for(&dir);

    let counts: Vec<_> = analytics
        .get_message_length_distribution()
        .await
        .unwrap()
        .into_iter()
        .map(|b| (b.bucket, b.count))
        .collect();
    assert_eq!(
        counts,
        vec![
            (LengthBucket::Under100, 2),
            (LengthBucket::To500, 2),
            (LengthBucket::To1K, 2),
            (LengthBucket::To5K, 2),
            (LengthBucket::To10K, 2),
            (LengthBucket::Over10K, 1),
        ]
    );
}

#[tokio::test]
async fn test_length_distribution_sums_to_total() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let buckets = analytics.get_message_length_distribution().await.unwrap();
    assert_eq!(buckets.len(), 6);
    assert_eq!(buckets[0].bucket, LengthBucket::Under100);
    assert_eq!(buckets[0].count, 2);
    assert_eq!(buckets[1].count, 2);
    assert_eq!(buckets[5].count, 1);

    let total: i64 = buckets.iter().map(|b| b.count).sum();
    assert_eq!(total, analytics.get_stats().await.unwrap().messages);
}

#[tokio::test]
async fn test_content_types_label_unknown() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let types: Vec<_> = analytics
        .get_content_type_distribution()
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.content_type, c.count))
        .collect();
    assert_eq!(
        types,
        vec![
            ("text".to_string(), 2),
            ("unknown".to_string(), 2),
            ("tool_use".to_string(), 1),
        ]
    );
}

// ============================================
// Sessions
// ============================================

#[tokio::test]
async fn test_session_list_orders_newest_first() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let sessions = analytics.get_session_list(20, 0).await.unwrap();
    let ids: Vec<_> = sessions.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec!["s3", "s2", "s1"]);

    // floor(elapsed seconds / 60)
    let durations: Vec<_> = sessions.iter().map(|s| s.duration_minutes).collect();
    assert_eq!(durations, vec![0, 120, 45]);

    assert_eq!(sessions[2].start_time, "2024-03-01 10:00:00");
    assert_eq!(sessions[2].end_time, "2024-03-01 10:45:30");
    assert!(sessions.iter().all(|s| s.start_time <= s.end_time));
}

#[tokio::test]
async fn test_session_list_paginates() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let page = analytics.get_session_list(2, 1).await.unwrap();
    let ids: Vec<_> = page.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec!["s2", "s1"]);

    assert!(analytics.get_session_list(20, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_session_duration_stats() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    // durations: 45.5, 120.98, 0 minutes
    let stats = analytics.get_session_duration_stats().await.unwrap();
    assert_eq!(stats.avg_duration_minutes, 55);
    assert_eq!(stats.max_duration_minutes, 120);
    assert_eq!(stats.total_sessions, 3);
    assert_eq!(stats.total_hours, 2);
}

#[tokio::test]
async fn test_project_breakdown_orders_by_messages() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let projects = analytics.get_project_breakdown().await.unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].project_name, "P2");
    assert_eq!(projects[0].message_count, 10);
    assert_eq!(projects[0].session_count, 2);
    assert_eq!(projects[1].project_name, "P1");
    assert_eq!(projects[1].message_count, 3);
    assert_eq!(projects[1].session_count, 1);
}

#[tokio::test]
async fn test_project_breakdown_keeps_top_ten() {
    // projects P1..P11, project Pn holding n messages in one session
    let dir = build_snapshots(&[(
        Relation::Sessions,
        r#"
        SELECT 's' || i::VARCHAR AS session_id,
               'P' || i::VARCHAR AS project_name,
               '/work/p' || i::VARCHAR AS project_path,
               TIMESTAMP '2024-03-01 10:00:00' AS first_message_at,
               TIMESTAMP '2024-03-01 11:00:00' AS last_message_at,
               i AS message_count,
               0 AS user_message_count,
               0 AS assistant_message_count
        FROM range(1, 12) t(i)
        "#,
    )]);
    let analytics = analytics_for(&dir);

    let projects = analytics.get_project_breakdown().await.unwrap();
    assert_eq!(projects.len(), sessionlens_core::PROJECT_BREAKDOWN_LIMIT);
    assert_eq!(projects[0].project_name, "P11");
    assert_eq!(projects[0].message_count, 11);
    assert_eq!(projects[9].project_name, "P2");
    assert!(projects.iter().all(|p| p.project_name != "P1"));
}

#[tokio::test]
async fn test_session_detail_lookup() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let session = analytics.get_session_by_id("s1").await.unwrap().unwrap();
    assert_eq!(session.project_name, "P1");
    assert_eq!(session.project_path, "/work/p1");
    assert_eq!(session.first_message_at, "2024-03-01 10:00:00");
    assert_eq!(session.last_message_at, "2024-03-01 10:45:30");
    assert_eq!(session.message_count, 3);
    assert!(session.user_message_count + session.assistant_message_count <= session.message_count);
}

#[tokio::test]
async fn test_missing_session_is_none() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    assert!(analytics.get_session_by_id("nope").await.unwrap().is_none());
    // session ids are bound, never spliced into the query
    assert!(analytics
        .get_session_by_id("s1' OR '1'='1")
        .await
        .unwrap()
        .is_none());
    assert!(analytics
        .get_session_messages("s1' OR '1'='1")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_session_messages_replay_in_order() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let messages = analytics.get_session_messages("s1").await.unwrap();
    let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
    assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    assert_eq!(messages[0].message_type, "user");
    assert_eq!(messages[0].content.len(), 50);
    assert_eq!(messages[0].tool_name, None);
    assert_eq!(messages[1].content_type, "unknown");
    assert_eq!(messages[2].content_type, "tool_use");
    assert_eq!(messages[2].tool_name.as_deref(), Some("Read"));
}

#[tokio::test]
async fn test_session_tool_calls() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let tools: Vec<_> = analytics
        .get_session_tool_calls("s2")
        .await
        .unwrap()
        .into_iter()
        .map(|t| (t.tool_name, t.count))
        .collect();
    assert_eq!(tools, vec![("B".to_string(), 5), ("A".to_string(), 2)]);

    assert!(analytics
        .get_session_tool_calls("nope")
        .await
        .unwrap()
        .is_empty());
}

// ============================================
// Context window analysis
// ============================================

#[tokio::test]
async fn test_token_estimates_rank_by_size() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let estimates = analytics.get_token_estimates_per_session(20).await.unwrap();
    assert_eq!(estimates.len(), 2);
    assert_eq!(estimates[0].session_id, "s1");
    assert_eq!(estimates[1].session_id, "s2");
    assert_eq!(estimates[1].total_chars, 210);
    assert_eq!(estimates[1].estimated_tokens, 52);
    for estimate in &estimates {
        assert_eq!(
            estimate.estimated_tokens,
            sessionlens_core::estimate_tokens(estimate.total_chars)
        );
    }

    assert_eq!(
        analytics.get_token_estimates_per_session(1).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_context_stats() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let stats = analytics.get_context_stats().await.unwrap();
    assert_eq!(stats.total_chars, 12_710);
    assert_eq!(stats.total_estimated_tokens, 3_177);
    assert_eq!(stats.avg_chars_per_session, 6_355);
    assert_eq!(stats.avg_tokens_per_session, 1_588);
    assert_eq!(stats.largest_session_tokens, 3_125);
    assert_eq!(stats.sessions_over_100k_tokens, 0);
}

#[tokio::test]
async fn test_large_session_count_is_strictly_over_threshold() {
    // 400,004 chars estimate to 100,001 tokens; 400,001 chars to exactly 100,000
    let dir = build_snapshots(&[(
        Relation::Messages,
        r#"
        SELECT id, session_id, 'assistant' AS "type",
               TIMESTAMP '2024-03-01 10:00:00' AS "timestamp",
               repeat('x', len) AS content,
               'text' AS content_type, NULL::VARCHAR AS tool_name
        FROM (VALUES
            ('m1', 'over', 400004),
            ('m2', 'edge', 400001),
            ('m3', 'small', 40)
        ) AS t(id, session_id, len)
        "#,
    )]);
    let analytics = analytics_for(&dir);

    let stats = analytics.get_context_stats().await.unwrap();
    assert_eq!(stats.sessions_over_100k_tokens, 1);
    assert_eq!(stats.largest_session_tokens, 100_001);
    assert_eq!(stats.total_chars, 800_045);

    let ranked = analytics.get_token_estimates_per_session(20).await.unwrap();
    assert_eq!(ranked[1].session_id, "edge");
    assert_eq!(ranked[1].estimated_tokens, 100_000);
}

#[tokio::test]
async fn test_large_messages() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let large = analytics.get_large_messages(10_000, 20).await.unwrap();
    assert_eq!(large.len(), 1);
    assert_eq!(large[0].session_id, "s1");
    assert_eq!(large[0].message_type, "assistant");
    assert_eq!(large[0].char_count, 12_000);
    assert_eq!(large[0].estimated_tokens, 3_000);
    assert_eq!(large[0].preview, "x".repeat(100));

    let sizes: Vec<_> = analytics
        .get_large_messages(100, 2)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.char_count)
        .collect();
    assert_eq!(sizes, vec![12_000, 450]);
}

#[tokio::test]
async fn test_dashboard_snapshot() {
    let dir = full_snapshots();
    let analytics = analytics_for(&dir);

    let snapshot = analytics.get_dashboard_snapshot().await.unwrap();
    assert_eq!(snapshot.stats.sessions, 3);
    assert_eq!(snapshot.length_distribution.len(), 6);
    assert_eq!(snapshot.top_tools.len(), 3);
    assert_eq!(snapshot.projects[0].project_name, "P2");
    assert_eq!(snapshot.context.largest_session_tokens, 3_125);
}
