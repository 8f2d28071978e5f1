//! Review queue
//!
//! Cases ranked by risk or recency, each joined with a content preview.
//! The reported `reportsCount` is never below the live number of unresolved
//! reports for the target, whatever the stored counter says.

use icc_common::db::faults::is_missing_table;
use icc_common::db::models::CaseRow;
use icc_common::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

use super::preview::fetch_target_contents;
use super::types::{CaseStatus, Preview, QueueItem, TargetType};

pub const DEFAULT_QUEUE_LIMIT: i64 = 40;
pub const MAX_QUEUE_LIMIT: i64 = 200;

/// Case projection shared by the queue and case detail
pub(crate) const CASE_SELECT: &str = r#"
    SELECT
        c.id, c.target_type, c.target_id, c.status, c.risk_score,
        MAX(
            c.reports_count,
            (SELECT COUNT(*) FROM moderation_reports r
             WHERE r.target_type = c.target_type
               AND r.target_id = c.target_id
               AND r.status IN ('open', 'triaged'))
        ) AS reports_count,
        c.last_reported_at, c.assigned_to, c.updated_at
    FROM moderation_cases c
"#;

/// [`CASE_SELECT`] with the stored counter only, for stores that have no
/// `moderation_reports` table
pub(crate) const CASE_SELECT_STORED: &str = r#"
    SELECT
        c.id, c.target_type, c.target_id, c.status, c.risk_score,
        c.reports_count, c.last_reported_at, c.assigned_to, c.updated_at
    FROM moderation_cases c
"#;

/// Queue ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueSort {
    /// Highest risk first, ties by most recent report
    #[default]
    Risk,
    /// Most recent report first
    Recent,
}

impl QueueSort {
    /// Lenient parse: anything but `recent` ranks by risk
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "recent" => QueueSort::Recent,
            _ => QueueSort::Risk,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueSort::Risk => "risk",
            QueueSort::Recent => "recent",
        }
    }
}

/// Which case statuses the queue shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(CaseStatus),
}

impl Default for StatusFilter {
    fn default() -> Self {
        StatusFilter::Only(CaseStatus::Open)
    }
}

impl StatusFilter {
    /// Missing or blank means `open`; `all` disables filtering
    pub fn from_param(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(StatusFilter::default()),
            Some(v) if v.eq_ignore_ascii_case("all") => Ok(StatusFilter::All),
            Some(v) => Ok(StatusFilter::Only(v.parse()?)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Only(status) => status.as_str(),
        }
    }
}

/// Clamp a requested limit to `1..=max`, `default` when absent
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

#[derive(Debug, Clone, Copy)]
pub struct QueueOptions {
    pub status: StatusFilter,
    pub sort: QueueSort,
    pub limit: i64,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            status: StatusFilter::default(),
            sort: QueueSort::default(),
            limit: DEFAULT_QUEUE_LIMIT,
        }
    }
}

fn queue_query(select: &str, options: &QueueOptions) -> QueryBuilder<'static, Sqlite> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(select);

    if let StatusFilter::Only(status) = options.status {
        builder.push(" WHERE c.status = ").push_bind(status.as_str());
    }

    match options.sort {
        QueueSort::Risk => builder.push(
            " ORDER BY c.risk_score DESC, c.last_reported_at IS NULL, c.last_reported_at DESC",
        ),
        QueueSort::Recent => {
            builder.push(" ORDER BY c.last_reported_at IS NULL, c.last_reported_at DESC")
        }
    };

    builder
        .push(" LIMIT ")
        .push_bind(options.limit.clamp(1, MAX_QUEUE_LIMIT));
    builder
}

/// Load the review queue
pub async fn fetch_queue(pool: &SqlitePool, options: &QueueOptions) -> Result<Vec<QueueItem>> {
    let mut builder = queue_query(CASE_SELECT, options);

    let rows = match builder.build_query_as::<CaseRow>().fetch_all(pool).await {
        Ok(rows) => rows,
        Err(e) if is_missing_table(&e, "moderation_cases") => {
            warn!("moderation_cases table missing, returning empty queue");
            return Ok(Vec::new());
        }
        Err(e) if is_missing_table(&e, "moderation_reports") => {
            warn!("moderation_reports table missing, queue uses stored report counts");
            let mut stored = queue_query(CASE_SELECT_STORED, options);
            let rows = stored.build_query_as::<CaseRow>().fetch_all(pool).await?;
            rows
        }
        Err(e) => return Err(e.into()),
    };

    debug!(
        "Queue query returned {} case(s) (status={}, sort={})",
        rows.len(),
        options.status.as_str(),
        options.sort.as_str()
    );

    attach_previews(pool, rows).await
}

/// Turn case rows into queue items, batch-loading their previews
pub(crate) async fn attach_previews(pool: &SqlitePool, rows: Vec<CaseRow>) -> Result<Vec<QueueItem>> {
    let mut typed = Vec::with_capacity(rows.len());
    for row in rows {
        match parse_case_row(&row) {
            Ok((target_type, status)) => typed.push((row, target_type, status)),
            Err(e) => warn!("Skipping case {}: {}", row.id, e),
        }
    }

    let targets: Vec<(TargetType, String)> = typed
        .iter()
        .map(|(row, target_type, _)| (*target_type, row.target_id.clone()))
        .collect();
    let contents = fetch_target_contents(pool, &targets).await?;

    Ok(typed
        .into_iter()
        .map(|(row, target_type, status)| {
            let preview = contents
                .get(&(target_type, row.target_id.clone()))
                .map(|content| content.preview())
                .unwrap_or_else(|| Preview::placeholder(target_type, &row.target_id));

            QueueItem {
                id: row.id,
                target_type,
                target_id: row.target_id,
                status,
                risk_score: row.risk_score,
                reports_count: row.reports_count,
                last_reported_at: row.last_reported_at,
                assigned_to: row.assigned_to,
                updated_at: row.updated_at,
                preview,
            }
        })
        .collect())
}

fn parse_case_row(row: &CaseRow) -> Result<(TargetType, CaseStatus)> {
    let target_type = row
        .target_type
        .parse::<TargetType>()
        .map_err(|_| Error::Internal(format!("unknown target type '{}'", row.target_type)))?;
    let status = row
        .status
        .parse::<CaseStatus>()
        .map_err(|_| Error::Internal(format!("unknown case status '{}'", row.status)))?;
    Ok((target_type, status))
}
