//! Core data model for study plans.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One timed study block within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    /// "HH:MM"
    pub start_time: String,
    /// "HH:MM"
    pub end_time: String,
    pub subject: String,
    pub task: String,
}

/// Day-by-day schedule keyed by ISO date ("YYYY-MM-DD").
///
/// BTreeMap keeps dates in calendar order (ISO dates sort lexicographically).
/// An off day maps to an empty vec; a well-formed schedule has exactly one
/// entry per calendar day in the plan's date range.
pub type Schedule = BTreeMap<String, Vec<ScheduleBlock>>;

/// A single parsed assessment mark. Produced only by the marks parser.
///
/// The parser does NOT enforce obtained <= max; it records what the user
/// typed. `assessment_name` is the token before the slash on the
/// "label/max" line, exactly as present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkRecord {
    pub subject_name: String,
    pub component_type: String,
    pub assessment_name: String,
    pub max_marks: f64,
    pub obtained_marks: f64,
}

/// Aggregated totals for one subject, derived from its `MarkRecord`s.
/// Recomputed on demand; never persisted on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SubjectPerformance {
    pub total_obtained: f64,
    pub total_max: f64,
}

/// Validated study-plan parameters as received from the user.
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Ordered, non-empty. Order matters: it breaks ranking ties and drives
    /// the fallback round-robin.
    pub subjects: Vec<String>,
    pub learning_goal: String,
    pub difficulty_feedback: String,
    /// Kept as the raw form value — the fallback generator has its own rule
    /// for values that do not parse as a non-negative integer.
    pub hours_per_day: String,
    /// Weekday names ("Monday".."Sunday", case-sensitive) or the sentinel "all".
    pub off_days: Vec<String>,
    pub class_schedule: String,
    pub marks_text: String,
}

/// The value the normalization pipeline always produces.
///
/// All three fields are populated on every path — trusted, degraded, and
/// disabled — so the caller always has a renderable object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResult {
    pub learning_guide: String,
    pub resources: String,
    pub schedule: Schedule,
}

// ────────────────────────────────────────────────────────────────────────────
// Database row types
// ────────────────────────────────────────────────────────────────────────────

/// A stored plan, as persisted. Dates, subjects, and off_days are kept in
/// their stored string forms; `generated_schedule` is JSON text that may be
/// unparseable for rows written before a repair.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PlanRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    /// Comma-joined subject list, exactly as submitted.
    pub subjects: String,
    pub learning_goal: String,
    pub difficulty_feedback: String,
    pub hours_per_day: String,
    /// Comma-joined weekday names.
    pub off_days: String,
    pub class_schedule: String,
    pub generated_guide: String,
    pub generated_schedule: String,
    pub resources: String,
}

/// Listing projection for the plans index.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PlanSummaryRow {
    pub id: i64,
    pub title: String,
    pub start_date: String,
    pub end_date: String,
}

/// A stored assessment mark belonging to a plan.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MarkRow {
    pub id: i64,
    pub plan_id: i64,
    pub subject_name: String,
    pub component_type: String,
    pub assessment_name: String,
    pub max_marks: f64,
    pub obtained_marks: f64,
}

/// Splits a comma-separated form field into trimmed, non-empty items.
pub fn split_csv_field(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
