//! Query catalog
//!
//! [`Analytics`] is the one entry point consumers use. Each operation:
//! 1. acquires the shared engine (bringing it up on first use),
//! 2. attaches the snapshots if this is the first use,
//! 3. fails with [`Error::RelationNotFound`] if a relation it reads is not attached,
//! 4. runs one parameterized query off the async executor,
//! 5. maps rows through [`crate::coerce::RawRow`] into typed records.
//!
//! Ranking queries break ties on a secondary key (tool name, role, label,
//! project name, or session id) so repeated calls return the same order.

mod queries;

use crate::coerce::RawRow;
use crate::config::Config;
use crate::datasets::{AttachmentStatus, DatasetRegistrar};
use crate::engine::{Engine, EngineManager, Param};
use crate::error::{Error, Result};
use crate::types::*;
use queries::Query;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Bound an operation by a client-side timeout.
///
/// Expiry maps to [`Error::EngineBusy`]. The engine has no cancellation, so
/// the query may keep running after this returns.
pub async fn with_timeout<T, F>(limit: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout = ?limit, "Query timed out");
            Err(Error::EngineBusy(limit))
        }
    }
}

fn single(query: &Query, rows: Vec<RawRow>) -> Result<RawRow> {
    rows.into_iter().next().ok_or_else(|| Error::Coercion {
        column: query.name.to_string(),
        expected: "one row",
        found: "no rows".to_string(),
    })
}

fn tool_counts(rows: Vec<RawRow>) -> Result<Vec<ToolCount>> {
    rows.iter()
        .map(|row| {
            Ok(ToolCount {
                tool_name: row.text("tool_name")?,
                count: row.int("count")?,
            })
        })
        .collect()
}

fn daily_counts(rows: Vec<RawRow>) -> Result<Vec<DailyCount>> {
    rows.iter()
        .map(|row| {
            Ok(DailyCount {
                date: row.timestamp("day")?,
                count: row.int("count")?,
            })
        })
        .collect()
}

/// Typed analytics over the attached session snapshots.
#[derive(Debug)]
pub struct Analytics {
    engines: EngineManager,
    registrar: DatasetRegistrar,
}

impl Analytics {
    pub fn new(config: Config) -> Self {
        let registrar = DatasetRegistrar::new(config.datasets.clone());
        Self {
            engines: EngineManager::new(config),
            registrar,
        }
    }

    pub fn config(&self) -> &Config {
        self.engines.config()
    }

    /// The shared engine, brought up on first call.
    pub async fn acquire_connection(&self) -> Result<Arc<Engine>> {
        self.engines.acquire_connection().await
    }

    /// Attach any relation not attached yet. Idempotent.
    pub async fn ensure_datasets_attached(&self) -> Result<()> {
        let engine = self.engines.acquire_connection().await?;
        self.registrar.ensure_datasets_attached(&engine).await
    }

    pub async fn attachment_status(&self, relation: Relation) -> AttachmentStatus {
        self.registrar.status(relation).await
    }

    /// Engine ready and every relation `query` reads attached.
    async fn prepare(&self, query: &Query) -> Result<Arc<Engine>> {
        let engine = self.engines.acquire_connection().await?;

        if let Err(e) = self.registrar.attach_pending(&engine).await {
            tracing::debug!(error = %e, "Partial attachment on first use");
        }

        match self.registrar.first_unattached(query.relations).await {
            Some(relation) => {
                tracing::warn!(query = query.name, relation = %relation, "Relation not attached");
                Err(Error::RelationNotFound(relation))
            }
            None => Ok(engine),
        }
    }

    async fn fetch(&self, query: &'static Query, params: Vec<Param>) -> Result<Vec<RawRow>> {
        let engine = self.prepare(query).await?;
        engine
            .run(move |engine| engine.query(query.name, query.sql, &params, query.relations))
            .await
    }

    // ========== Global counts ==========

    /// Row counts of all three relations.
    pub async fn get_stats(&self) -> Result<Stats> {
        let rows = self.fetch(&queries::STATS, vec![]).await?;
        let row = single(&queries::STATS, rows)?;
        Ok(Stats {
            sessions: row.int("sessions")?,
            messages: row.int("messages")?,
            tool_calls: row.int("tool_calls")?,
        })
    }

    // ========== Time buckets ==========

    /// Message counts per (day of week, hour); empty cells are absent.
    pub async fn get_activity_heatmap(&self) -> Result<Vec<HeatmapCell>> {
        let rows = self.fetch(&queries::ACTIVITY_HEATMAP, vec![]).await?;
        rows.iter()
            .map(|row| {
                Ok(HeatmapCell {
                    day_of_week: row.int("day_of_week")?,
                    hour: row.int("hour")?,
                    count: row.int("count")?,
                })
            })
            .collect()
    }

    /// Messages per day, oldest first; days without messages are absent.
    pub async fn get_message_trend(&self) -> Result<Vec<DailyCount>> {
        daily_counts(self.fetch(&queries::MESSAGE_TREND, vec![]).await?)
    }

    /// Tool calls per day, oldest first; days without calls are absent.
    pub async fn get_tool_trend(&self) -> Result<Vec<DailyCount>> {
        daily_counts(self.fetch(&queries::TOOL_TREND, vec![]).await?)
    }

    // ========== Rankings and distributions ==========

    /// Most-used tools, busiest first.
    pub async fn get_top_tools(&self, limit: usize) -> Result<Vec<ToolCount>> {
        let rows = self
            .fetch(&queries::TOP_TOOLS, vec![Param::count(limit)])
            .await?;
        tool_counts(rows)
    }

    /// Message counts for `user` and `assistant`; other types are excluded.
    pub async fn get_messages_by_role(&self) -> Result<Vec<RoleCount>> {
        let rows = self.fetch(&queries::MESSAGES_BY_ROLE, vec![]).await?;
        rows.iter()
            .map(|row| {
                Ok(RoleCount {
                    role: row.text("role")?,
                    count: row.int("count")?,
                })
            })
            .collect()
    }

    /// Message counts for all six length buckets, in bucket order.
    ///
    /// Empty buckets are present with a zero count.
    pub async fn get_message_length_distribution(&self) -> Result<Vec<LengthBucketCount>> {
        let rows = self
            .fetch(&queries::MESSAGE_LENGTH_DISTRIBUTION, vec![])
            .await?;

        let mut counts = [0i64; 6];
        for row in &rows {
            let ordinal = row.int("bucket")?;
            let bucket = LengthBucket::from_ordinal(ordinal).ok_or_else(|| Error::Coercion {
                column: "bucket".to_string(),
                expected: "length bucket ordinal",
                found: ordinal.to_string(),
            })?;
            counts[bucket.ordinal()] += row.int("count")?;
        }

        Ok(LengthBucket::ALL
            .iter()
            .map(|bucket| LengthBucketCount {
                bucket: *bucket,
                count: counts[bucket.ordinal()],
            })
            .collect())
    }

    /// Message counts per content type; missing types count as "unknown".
    pub async fn get_content_type_distribution(&self) -> Result<Vec<ContentTypeCount>> {
        let rows = self
            .fetch(&queries::CONTENT_TYPE_DISTRIBUTION, vec![])
            .await?;
        rows.iter()
            .map(|row| {
                Ok(ContentTypeCount {
                    content_type: row.text_or("label", UNKNOWN_CONTENT_TYPE)?,
                    count: row.int("count")?,
                })
            })
            .collect()
    }

    // ========== Sessions ==========

    /// One page of sessions, most recently started first.
    pub async fn get_session_list(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SessionSummary>> {
        let rows = self
            .fetch(
                &queries::SESSION_LIST,
                vec![Param::count(limit), Param::count(offset)],
            )
            .await?;
        rows.iter()
            .map(|row| {
                Ok(SessionSummary {
                    session_id: row.text("session_id")?,
                    project_name: row.text("project_name")?,
                    start_time: row.timestamp("start_time")?,
                    end_time: row.timestamp("end_time")?,
                    message_count: row.int("message_count")?,
                    duration_minutes: row.int("duration_minutes")?,
                })
            })
            .collect()
    }

    /// Average, longest, and total session durations.
    pub async fn get_session_duration_stats(&self) -> Result<SessionDurationStats> {
        let rows = self.fetch(&queries::SESSION_DURATION_STATS, vec![]).await?;
        let row = single(&queries::SESSION_DURATION_STATS, rows)?;
        Ok(SessionDurationStats {
            avg_duration_minutes: row.int("avg_duration_minutes")?,
            max_duration_minutes: row.int("max_duration_minutes")?,
            total_sessions: row.int("total_sessions")?,
            total_hours: row.int("total_hours")?,
        })
    }

    /// Top projects by message count.
    pub async fn get_project_breakdown(&self) -> Result<Vec<ProjectCount>> {
        let rows = self
            .fetch(
                &queries::PROJECT_BREAKDOWN,
                vec![Param::count(PROJECT_BREAKDOWN_LIMIT)],
            )
            .await?;
        rows.iter()
            .map(|row| {
                Ok(ProjectCount {
                    project_name: row.text("project_name")?,
                    message_count: row.int("total_messages")?,
                    session_count: row.int("session_count")?,
                })
            })
            .collect()
    }

    /// Look up one session. A missing id is `Ok(None)`.
    pub async fn get_session_by_id(&self, session_id: &str) -> Result<Option<SessionDetail>> {
        let rows = self
            .fetch(&queries::SESSION_BY_ID, vec![Param::from(session_id)])
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(SessionDetail {
            session_id: row.text("session_id")?,
            project_name: row.text("project_name")?,
            project_path: row.text("project_path")?,
            first_message_at: row.timestamp("first_message_at")?,
            last_message_at: row.timestamp("last_message_at")?,
            message_count: row.int("message_count")?,
            user_message_count: row.int("user_message_count")?,
            assistant_message_count: row.int("assistant_message_count")?,
        }))
    }

    /// Every message in a session, in chronological order.
    pub async fn get_session_messages(&self, session_id: &str) -> Result<Vec<MessageDetail>> {
        let rows = self
            .fetch(&queries::SESSION_MESSAGES, vec![Param::from(session_id)])
            .await?;
        rows.iter()
            .map(|row| {
                Ok(MessageDetail {
                    id: row.text("id")?,
                    message_type: row.text("message_type")?,
                    timestamp: row.timestamp("timestamp")?,
                    content: row.text("content")?,
                    content_type: row.text_or("content_type", UNKNOWN_CONTENT_TYPE)?,
                    tool_name: row.nullable_text("tool_name")?,
                })
            })
            .collect()
    }

    /// Tool usage within one session, busiest first.
    pub async fn get_session_tool_calls(&self, session_id: &str) -> Result<Vec<ToolCount>> {
        let rows = self
            .fetch(&queries::SESSION_TOOL_CALLS, vec![Param::from(session_id)])
            .await?;
        tool_counts(rows)
    }

    // ========== Context window analysis ==========

    /// Sessions ranked by total content size.
    pub async fn get_token_estimates_per_session(
        &self,
        limit: usize,
    ) -> Result<Vec<TokenEstimate>> {
        let rows = self
            .fetch(&queries::TOKEN_ESTIMATES, vec![Param::count(limit)])
            .await?;
        rows.iter()
            .map(|row| {
                Ok(TokenEstimate {
                    session_id: row.text("session_id")?,
                    total_chars: row.int("total_chars")?,
                    estimated_tokens: row.int("estimated_tokens")?,
                    message_count: row.int("message_count")?,
                })
            })
            .collect()
    }

    /// Corpus-wide content and token totals.
    pub async fn get_context_stats(&self) -> Result<ContextStats> {
        let rows = self.fetch(&queries::CONTEXT_STATS, vec![]).await?;
        let row = single(&queries::CONTEXT_STATS, rows)?;
        Ok(ContextStats {
            total_chars: row.int("total_chars")?,
            total_estimated_tokens: row.int("total_estimated_tokens")?,
            avg_chars_per_session: row.int("avg_chars_per_session")?,
            avg_tokens_per_session: row.int("avg_tokens_per_session")?,
            largest_session_tokens: row.int("largest_session_tokens")?,
            sessions_over_100k_tokens: row.int("sessions_over_100k_tokens")?,
        })
    }

    /// Messages longer than `min_chars`, largest first.
    pub async fn get_large_messages(
        &self,
        min_chars: usize,
        limit: usize,
    ) -> Result<Vec<LargeMessage>> {
        let rows = self
            .fetch(
                &queries::LARGE_MESSAGES,
                vec![Param::count(min_chars), Param::count(limit)],
            )
            .await?;
        rows.iter()
            .map(|row| {
                Ok(LargeMessage {
                    session_id: row.text("session_id")?,
                    message_type: row.text("message_type")?,
                    char_count: row.int("char_count")?,
                    estimated_tokens: row.int("estimated_tokens")?,
                    preview: row.text("preview")?,
                })
            })
            .collect()
    }

    // ========== Dashboard ==========

    /// Run every aggregate the dashboard shows on first load.
    pub async fn get_dashboard_snapshot(&self) -> Result<DashboardSnapshot> {
        Ok(DashboardSnapshot {
            stats: self.get_stats().await?,
            heatmap: self.get_activity_heatmap().await?,
            message_trend: self.get_message_trend().await?,
            tool_trend: self.get_tool_trend().await?,
            top_tools: self.get_top_tools(DEFAULT_TOP_TOOLS_LIMIT).await?,
            roles: self.get_messages_by_role().await?,
            length_distribution: self.get_message_length_distribution().await?,
            content_types: self.get_content_type_distribution().await?,
            durations: self.get_session_duration_stats().await?,
            projects: self.get_project_breakdown().await?,
            context: self.get_context_stats().await?,
        })
    }
}
