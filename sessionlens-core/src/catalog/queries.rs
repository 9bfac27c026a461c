//! SQL for every catalog operation.
//!
//! Caller-supplied values are always `?` parameters. The token divisor, the
//! large-session threshold, the preview width, and the "unknown" label are
//! public contract constants; tests below pin the literals to them.

use crate::types::Relation;

/// A fixed query and the relations it reads.
#[derive(Debug)]
pub(crate) struct Query {
    pub name: &'static str,
    pub relations: &'static [Relation],
    pub sql: &'static str,
}

const SESSIONS: &[Relation] = &[Relation::Sessions];
const MESSAGES: &[Relation] = &[Relation::Messages];
const TOOL_CALLS: &[Relation] = &[Relation::ToolCalls];

// ============================================
// Global counts
// ============================================

pub(crate) static STATS: Query = Query {
    name: "stats",
    relations: &[Relation::Sessions, Relation::Messages, Relation::ToolCalls],
    sql: r#"
    SELECT
        (SELECT COUNT(*) FROM sessions) AS sessions,
        (SELECT COUNT(*) FROM messages) AS messages,
        (SELECT COUNT(*) FROM tool_calls) AS tool_calls
    "#,
};

// ============================================
// Time buckets
// ============================================

pub(crate) static ACTIVITY_HEATMAP: Query = Query {
    name: "activity_heatmap",
    relations: MESSAGES,
    sql: r#"
    SELECT
        CAST(EXTRACT(DOW FROM "timestamp") AS BIGINT) AS day_of_week,
        CAST(EXTRACT(HOUR FROM "timestamp") AS BIGINT) AS hour,
        COUNT(*) AS count
    FROM messages
    WHERE "timestamp" IS NOT NULL
    GROUP BY day_of_week, hour
    ORDER BY day_of_week, hour
    "#,
};

pub(crate) static MESSAGE_TREND: Query = Query {
    name: "message_trend",
    relations: MESSAGES,
    sql: r#"
    SELECT
        CAST("timestamp" AS DATE) AS day,
        COUNT(*) AS count
    FROM messages
    WHERE "timestamp" IS NOT NULL
    GROUP BY day
    ORDER BY day
    "#,
};

pub(crate) static TOOL_TREND: Query = Query {
    name: "tool_trend",
    relations: TOOL_CALLS,
    sql: r#"
    SELECT
        CAST("timestamp" AS DATE) AS day,
        COUNT(*) AS count
    FROM tool_calls
    WHERE "timestamp" IS NOT NULL
    GROUP BY day
    ORDER BY day
    "#,
};

// ============================================
// Rankings and distributions
// ============================================

pub(crate) static TOP_TOOLS: Query = Query {
    name: "top_tools",
    relations: TOOL_CALLS,
    sql: r#"
    SELECT
        tool_name,
        COUNT(*) AS count
    FROM tool_calls
    GROUP BY tool_name
    ORDER BY count DESC, tool_name
    LIMIT ?
    "#,
};

pub(crate) static MESSAGES_BY_ROLE: Query = Query {
    name: "messages_by_role",
    relations: MESSAGES,
    sql: r#"
    SELECT
        "type" AS role,
        COUNT(*) AS count
    FROM messages
    WHERE "type" IN ('user', 'assistant')
    GROUP BY role
    ORDER BY count DESC, role
    "#,
};

/// Buckets come back as ordinals into [`crate::types::LengthBucket::ALL`].
pub(crate) static MESSAGE_LENGTH_DISTRIBUTION: Query = Query {
    name: "message_length_distribution",
    relations: MESSAGES,
    sql: r#"
    SELECT
        CASE
            WHEN COALESCE(LENGTH(content), 0) < 100 THEN 0
            WHEN LENGTH(content) < 500 THEN 1
            WHEN LENGTH(content) < 1000 THEN 2
            WHEN LENGTH(content) < 5000 THEN 3
            WHEN LENGTH(content) < 10000 THEN 4
            ELSE 5
        END AS bucket,
        COUNT(*) AS count
    FROM messages
    GROUP BY bucket
    ORDER BY bucket
    "#,
};

pub(crate) static CONTENT_TYPE_DISTRIBUTION: Query = Query {
    name: "content_type_distribution",
    relations: MESSAGES,
    sql: r#"
    SELECT
        COALESCE(content_type, 'unknown') AS label,
        COUNT(*) AS count
    FROM messages
    GROUP BY label
    ORDER BY count DESC, label
    "#,
};

// ============================================
// Sessions
// ============================================

pub(crate) static SESSION_LIST: Query = Query {
    name: "session_list",
    relations: SESSIONS,
    sql: r#"
    SELECT
        session_id,
        project_name,
        first_message_at AS start_time,
        last_message_at AS end_time,
        CAST(message_count AS BIGINT) AS message_count,
        (epoch_us(last_message_at) - epoch_us(first_message_at)) // 60000000 AS duration_minutes
    FROM sessions
    ORDER BY first_message_at DESC, session_id
    LIMIT ? OFFSET ?
    "#,
};

pub(crate) static SESSION_DURATION_STATS: Query = Query {
    name: "session_duration_stats",
    relations: SESSIONS,
    sql: r#"
    WITH session_durations AS (
        SELECT
            (epoch_us(last_message_at) - epoch_us(first_message_at)) / 60000000.0 AS duration_minutes
        FROM sessions
    )
    SELECT
        CAST(COALESCE(trunc(AVG(duration_minutes)), 0) AS BIGINT) AS avg_duration_minutes,
        CAST(COALESCE(trunc(MAX(duration_minutes)), 0) AS BIGINT) AS max_duration_minutes,
        COUNT(*) AS total_sessions,
        CAST(COALESCE(trunc(SUM(duration_minutes) / 60), 0) AS BIGINT) AS total_hours
    FROM session_durations
    "#,
};

pub(crate) static PROJECT_BREAKDOWN: Query = Query {
    name: "project_breakdown",
    relations: SESSIONS,
    sql: r#"
    SELECT
        project_name,
        CAST(SUM(message_count) AS BIGINT) AS total_messages,
        COUNT(*) AS session_count
    FROM sessions
    GROUP BY project_name
    ORDER BY total_messages DESC, project_name
    LIMIT ?
    "#,
};

pub(crate) static SESSION_BY_ID: Query = Query {
    name: "session_by_id",
    relations: SESSIONS,
    sql: r#"
    SELECT
        session_id,
        project_name,
        project_path,
        first_message_at,
        last_message_at,
        CAST(message_count AS BIGINT) AS message_count,
        CAST(user_message_count AS BIGINT) AS user_message_count,
        CAST(assistant_message_count AS BIGINT) AS assistant_message_count
    FROM sessions
    WHERE session_id = ?
    LIMIT 1
    "#,
};

pub(crate) static SESSION_MESSAGES: Query = Query {
    name: "session_messages",
    relations: MESSAGES,
    sql: r#"
    SELECT
        id,
        "type" AS message_type,
        "timestamp",
        content,
        content_type,
        tool_name
    FROM messages
    WHERE session_id = ?
    ORDER BY "timestamp" ASC, id
    "#,
};

pub(crate) static SESSION_TOOL_CALLS: Query = Query {
    name: "session_tool_calls",
    relations: TOOL_CALLS,
    sql: r#"
    SELECT
        tool_name,
        COUNT(*) AS count
    FROM tool_calls
    WHERE session_id = ?
    GROUP BY tool_name
    ORDER BY count DESC, tool_name
    "#,
};

// ============================================
// Context window analysis
// ============================================

pub(crate) static TOKEN_ESTIMATES: Query = Query {
    name: "token_estimates_per_session",
    relations: MESSAGES,
    sql: r#"
    SELECT
        session_id,
        CAST(SUM(COALESCE(LENGTH(content), 0)) AS BIGINT) AS total_chars,
        CAST(SUM(COALESCE(LENGTH(content), 0)) // 4 AS BIGINT) AS estimated_tokens,
        COUNT(*) AS message_count
    FROM messages
    GROUP BY session_id
    ORDER BY total_chars DESC, session_id
    LIMIT ?
    "#,
};

pub(crate) static CONTEXT_STATS: Query = Query {
    name: "context_stats",
    relations: MESSAGES,
    sql: r#"
    WITH session_sizes AS (
        SELECT
            session_id,
            SUM(COALESCE(LENGTH(content), 0)) AS chars,
            SUM(COALESCE(LENGTH(content), 0)) // 4 AS tokens
        FROM messages
        GROUP BY session_id
    )
    SELECT
        CAST(COALESCE(SUM(chars), 0) AS BIGINT) AS total_chars,
        CAST(COALESCE(SUM(tokens), 0) AS BIGINT) AS total_estimated_tokens,
        CAST(COALESCE(trunc(AVG(chars)), 0) AS BIGINT) AS avg_chars_per_session,
        CAST(COALESCE(trunc(AVG(tokens)), 0) AS BIGINT) AS avg_tokens_per_session,
        CAST(COALESCE(MAX(tokens), 0) AS BIGINT) AS largest_session_tokens,
        COUNT(*) FILTER (WHERE tokens > 100000) AS sessions_over_100k_tokens
    FROM session_sizes
    "#,
};

pub(crate) static LARGE_MESSAGES: Query = Query {
    name: "large_messages",
    relations: MESSAGES,
    sql: r#"
    SELECT
        session_id,
        "type" AS message_type,
        CAST(LENGTH(content) AS BIGINT) AS char_count,
        CAST(LENGTH(content) // 4 AS BIGINT) AS estimated_tokens,
        LEFT(content, 100) AS preview
    FROM messages
    WHERE LENGTH(content) > ?
    ORDER BY char_count DESC, session_id, id
    LIMIT ?
    "#,
};
