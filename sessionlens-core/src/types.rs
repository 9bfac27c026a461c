//! Domain types for sessionlens
//!
//! Relations are the three views attached from the upstream snapshots; every
//! other type here is a typed result returned by the query catalog.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Relation** | A named view over one attached Parquet snapshot |
//! | **Session** | One continuous interaction spanning one or more messages |
//! | **Message** | A single `user`, `assistant`, or other entry in a session |
//! | **Tool call** | One tool invocation recorded against a session |
//! | **Token estimate** | `floor(chars / 4)`, a fixed approximation of model tokens |

use serde::Serialize;

// ============================================
// Public contract constants
// ============================================

/// Characters per estimated token.
pub const TOKEN_CHARS_DIVISOR: i64 = 4;

/// Sessions above this many estimated tokens count as "large".
pub const LARGE_SESSION_TOKENS: i64 = 100_000;

/// Number of characters kept in a large-message preview.
pub const PREVIEW_CHARS: i64 = 100;

/// Label used when a message has no content type.
pub const UNKNOWN_CONTENT_TYPE: &str = "unknown";

/// Maximum number of projects in the project breakdown.
pub const PROJECT_BREAKDOWN_LIMIT: usize = 10;

/// Default number of rows for [`crate::Analytics::get_top_tools`].
pub const DEFAULT_TOP_TOOLS_LIMIT: usize = 15;

/// Default page size for [`crate::Analytics::get_session_list`].
pub const DEFAULT_SESSION_PAGE_SIZE: usize = 20;

/// Default number of rows for the per-session token ranking.
pub const DEFAULT_TOKEN_RANKING_LIMIT: usize = 20;

/// Default content length above which a message is "large".
pub const DEFAULT_LARGE_MESSAGE_CHARS: usize = 10_000;

/// Default number of large messages returned.
pub const DEFAULT_LARGE_MESSAGE_LIMIT: usize = 20;

/// Estimate tokens for `chars` characters of content.
pub fn estimate_tokens(chars: i64) -> i64 {
    chars.div_euclid(TOKEN_CHARS_DIVISOR)
}

// ============================================
// Relations
// ============================================

/// One of the three attached views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Sessions,
    Messages,
    ToolCalls,
}

impl Relation {
    /// All relations, in attachment order.
    pub const ALL: [Relation; 3] = [Relation::Sessions, Relation::Messages, Relation::ToolCalls];

    /// View name inside the engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Sessions => "sessions",
            Relation::Messages => "messages",
            Relation::ToolCalls => "tool_calls",
        }
    }

    /// Snapshot file name under the configured base location.
    pub fn file_name(&self) -> &'static str {
        match self {
            Relation::Sessions => "sessions.parquet",
            Relation::Messages => "messages.parquet",
            Relation::ToolCalls => "tool_calls.parquet",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Relation::Sessions => 0,
            Relation::Messages => 1,
            Relation::ToolCalls => 2,
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Global counts and time buckets
// ============================================

/// Row counts of the three relations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub sessions: i64,
    pub messages: i64,
    pub tool_calls: i64,
}

/// Message count for one (day-of-week, hour) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapCell {
    /// 0 = Sunday, ..., 6 = Saturday
    pub day_of_week: i64,
    /// 0-23
    pub hour: i64,
    pub count: i64,
}

/// Count for one calendar day (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

// ============================================
// Rankings and distributions
// ============================================

/// Invocation count for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCount {
    pub tool_name: String,
    pub count: i64,
}

/// Message count for a role (`user` or `assistant`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

/// Fixed message-length buckets, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LengthBucket {
    #[serde(rename = "< 100")]
    Under100,
    #[serde(rename = "100-500")]
    To500,
    #[serde(rename = "500-1K")]
    To1K,
    #[serde(rename = "1K-5K")]
    To5K,
    #[serde(rename = "5K-10K")]
    To10K,
    #[serde(rename = "10K+")]
    Over10K,
}

impl LengthBucket {
    pub const ALL: [LengthBucket; 6] = [
        LengthBucket::Under100,
        LengthBucket::To500,
        LengthBucket::To1K,
        LengthBucket::To5K,
        LengthBucket::To10K,
        LengthBucket::Over10K,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LengthBucket::Under100 => "< 100",
            LengthBucket::To500 => "100-500",
            LengthBucket::To1K => "500-1K",
            LengthBucket::To5K => "1K-5K",
            LengthBucket::To10K => "5K-10K",
            LengthBucket::Over10K => "10K+",
        }
    }

    /// Position in [`LengthBucket::ALL`].
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    pub(crate) fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

impl std::fmt::Display for LengthBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Message count for one length bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LengthBucketCount {
    pub bucket: LengthBucket,
    pub count: i64,
}

/// Message count for one content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentTypeCount {
    pub content_type: String,
    pub count: i64,
}

// ============================================
// Sessions
// ============================================

/// Session row for paginated listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub project_name: String,
    pub start_time: String,
    pub end_time: String,
    pub message_count: i64,
    /// `floor(elapsed seconds / 60)`
    pub duration_minutes: i64,
}

/// Duration statistics over all sessions, in whole minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionDurationStats {
    pub avg_duration_minutes: i64,
    pub max_duration_minutes: i64,
    pub total_sessions: i64,
    pub total_hours: i64,
}

/// Per-project totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectCount {
    pub project_name: String,
    pub message_count: i64,
    pub session_count: i64,
}

/// Full session record returned by detail lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDetail {
    pub session_id: String,
    pub project_name: String,
    pub project_path: String,
    pub first_message_at: String,
    pub last_message_at: String,
    pub message_count: i64,
    pub user_message_count: i64,
    pub assistant_message_count: i64,
}

/// One message in chronological replay order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageDetail {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp: String,
    pub content: String,
    /// [`UNKNOWN_CONTENT_TYPE`] when absent upstream
    pub content_type: String,
    /// Set only for tool invocations
    pub tool_name: Option<String>,
}

// ============================================
// Context window analysis
// ============================================

/// Character and token totals for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenEstimate {
    pub session_id: String,
    pub total_chars: i64,
    pub estimated_tokens: i64,
    pub message_count: i64,
}

/// Corpus-wide context totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContextStats {
    pub total_chars: i64,
    pub total_estimated_tokens: i64,
    pub avg_chars_per_session: i64,
    pub avg_tokens_per_session: i64,
    pub largest_session_tokens: i64,
    pub sessions_over_100k_tokens: i64,
}

/// A message whose content exceeds the large-message threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargeMessage {
    pub session_id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub char_count: i64,
    pub estimated_tokens: i64,
    /// First [`PREVIEW_CHARS`] characters of the content
    pub preview: String,
}

// ============================================
// Dashboard
// ============================================

/// Everything the usage dashboard renders on first load.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub stats: Stats,
    pub heatmap: Vec<HeatmapCell>,
    pub message_trend: Vec<DailyCount>,
    pub tool_trend: Vec<DailyCount>,
    pub top_tools: Vec<ToolCount>,
    pub roles: Vec<RoleCount>,
    pub length_distribution: Vec<LengthBucketCount>,
    pub content_types: Vec<ContentTypeCount>,
    pub durations: SessionDurationStats,
    pub projects: Vec<ProjectCount>,
    pub context: ContextStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_bucket_order_is_stable() {
        let labels: Vec<_> = LengthBucket::ALL.iter().map(|b| b.label()).collect();
        assert_eq!(
            labels,
            vec!["< 100", "100-500", "500-1K", "1K-5K", "5K-10K", "10K+"]
        );
        for (i, bucket) in LengthBucket::ALL.iter().enumerate() {
            assert_eq!(bucket.ordinal(), i);
            assert_eq!(LengthBucket::from_ordinal(i as i64), Some(*bucket));
        }
        assert_eq!(LengthBucket::from_ordinal(6), None);
        assert_eq!(LengthBucket::from_ordinal(-1), None);
    }

    #[test]
    fn test_estimate_tokens_floors() {
        assert_eq!(estimate_tokens(0), 0);
        assert_eq!(estimate_tokens(3), 0);
        assert_eq!(estimate_tokens(12_500), 3_125);
        assert_eq!(estimate_tokens(12_003), 3_000);
    }

    #[test]
    fn test_relation_round_trip_names() {
        for relation in Relation::ALL {
            assert_eq!(relation.as_str().parse::<Relation>(), Ok(relation));
            assert!(relation.file_name().starts_with(relation.as_str()));
        }
        assert!("events".parse::<Relation>().is_err());
    }
}
