//! Axum route handlers for the plan API.
//!
//! These are thin wrappers: they marshal form-shaped input into the core
//! contracts (marks parser, prompt builder, normalizer, repair) and the
//! results into the database. No planning logic lives here.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::plan::{
    split_csv_field, AiResult, MarkRow, PlanRequest, PlanRow, PlanSummaryRow, Schedule,
};
use crate::planning::marks::{aggregate_performance, parse_subject_marks, rank_subjects};
use crate::planning::normalizer::{generate_plan_content, repair_schedule_text, RepairOutcome};
use crate::planning::prompts::render_plan_prompt;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Create-plan payload. String-shaped like the form it comes from:
/// `subjects` and `off_days` are comma-separated, dates are "YYYY-MM-DD",
/// and `hours_per_day` stays raw for the fallback generator's own rule.
#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub subjects: String,
    #[serde(default)]
    pub learning_goal: String,
    #[serde(default)]
    pub difficulty_feedback: String,
    #[serde(default)]
    pub hours_per_day: String,
    #[serde(default)]
    pub off_days: String,
    #[serde(default)]
    pub class_schedule: String,
    #[serde(default)]
    pub subject_marks: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePlanResponse {
    pub plan_id: i64,
    pub result: AiResult,
}

#[derive(Debug, Serialize)]
pub struct PlanListResponse {
    pub plans: Vec<PlanSummaryRow>,
}

#[derive(Debug, Serialize)]
pub struct PlanDetailResponse {
    pub plan: PlanRow,
    /// Parsed schedule with every date in range present (missing dates are
    /// filled with empty block lists). Empty when the stored text is not
    /// valid schedule JSON — see `schedule_raw`.
    pub calendar_data: Schedule,
    /// The stored schedule text verbatim, present only when it could not
    /// be parsed as a schedule. The repair endpoint exists for these.
    pub schedule_raw: Option<String>,
    pub marks: Vec<MarkRow>,
}

#[derive(Debug, Serialize)]
pub struct RepairResponse {
    pub plan_id: i64,
    pub outcome: String,
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/plans
///
/// Full creation pipeline: validate → parse marks → rank → build prompt →
/// normalize completion output → persist plan + marks.
pub async fn handle_create_plan(
    State(state): State<AppState>,
    Json(request): Json<CreatePlanRequest>,
) -> Result<Json<CreatePlanResponse>, AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }

    let start_date = parse_date(&request.start_date, "start_date")?;
    let end_date = parse_date(&request.end_date, "end_date")?;
    if start_date > end_date {
        return Err(AppError::Validation(
            "start_date must be on or before end_date".to_string(),
        ));
    }

    let subjects = split_csv_field(&request.subjects);
    if subjects.is_empty() {
        return Err(AppError::Validation(
            "at least one subject is required".to_string(),
        ));
    }

    let plan_request = PlanRequest {
        title: request.title.clone(),
        description: request.description.clone(),
        start_date,
        end_date,
        subjects,
        learning_goal: request.learning_goal.clone(),
        difficulty_feedback: request.difficulty_feedback.clone(),
        hours_per_day: request.hours_per_day.clone(),
        off_days: split_csv_field(&request.off_days),
        class_schedule: request.class_schedule.clone(),
        marks_text: request.subject_marks.clone(),
    };

    let marks = parse_subject_marks(&plan_request.marks_text)?;
    let performance = aggregate_performance(&marks);
    let ranked = rank_subjects(&performance).map_err(|e| AppError::ZeroDenominator(e.0))?;

    let prompt = render_plan_prompt(&plan_request, &performance, &ranked);
    let result = generate_plan_content(state.llm.as_deref(), &plan_request, &prompt).await;

    let schedule_json =
        serde_json::to_string(&result.schedule).map_err(|e| AppError::Internal(e.into()))?;

    let insert = sqlx::query(
        r#"
        INSERT INTO plans (title, description, start_date, end_date, subjects, learning_goal,
                           difficulty_feedback, hours_per_day, off_days, class_schedule,
                           generated_guide, generated_schedule, resources)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&request.title)
    .bind(&request.description)
    .bind(&request.start_date)
    .bind(&request.end_date)
    .bind(&request.subjects)
    .bind(&request.learning_goal)
    .bind(&request.difficulty_feedback)
    .bind(&request.hours_per_day)
    .bind(&request.off_days)
    .bind(&request.class_schedule)
    .bind(&result.learning_guide)
    .bind(&schedule_json)
    .bind(&result.resources)
    .execute(&state.db)
    .await?;

    let plan_id = insert.last_insert_rowid();

    for mark in &marks {
        sqlx::query(
            r#"
            INSERT INTO subject_marks (plan_id, subject_name, component_type,
                                       assessment_name, max_marks, obtained_marks)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(plan_id)
        .bind(&mark.subject_name)
        .bind(&mark.component_type)
        .bind(&mark.assessment_name)
        .bind(mark.max_marks)
        .bind(mark.obtained_marks)
        .execute(&state.db)
        .await?;
    }

    info!("Plan {plan_id} created with {} mark records", marks.len());

    Ok(Json(CreatePlanResponse { plan_id, result }))
}

/// GET /api/v1/plans
///
/// Lists stored plan summaries, newest first.
pub async fn handle_list_plans(
    State(state): State<AppState>,
) -> Result<Json<PlanListResponse>, AppError> {
    let plans = sqlx::query_as::<_, PlanSummaryRow>(
        "SELECT id, title, start_date, end_date FROM plans ORDER BY id DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(PlanListResponse { plans }))
}

/// GET /api/v1/plans/:id
///
/// Returns the stored plan plus its schedule parsed for calendar
/// rendering. Stored schedule text that is not a valid JSON mapping is
/// returned verbatim in `schedule_raw` instead.
pub async fn handle_get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> Result<Json<PlanDetailResponse>, AppError> {
    let plan = fetch_plan(&state, plan_id).await?;

    let marks = sqlx::query_as::<_, MarkRow>(
        "SELECT * FROM subject_marks WHERE plan_id = ? ORDER BY id",
    )
    .bind(plan_id)
    .fetch_all(&state.db)
    .await?;

    let mut calendar_data = Schedule::new();
    let mut schedule_raw = None;

    if !plan.generated_schedule.is_empty() {
        match serde_json::from_str::<Schedule>(&plan.generated_schedule) {
            Ok(schedule) => {
                calendar_data = schedule;
                fill_date_coverage(&mut calendar_data, &plan.start_date, &plan.end_date);
            }
            Err(_) => {
                // Valid JSON of the wrong shape lands here too; keep the
                // raw text so the caller can offer a repair.
                schedule_raw = Some(plan.generated_schedule.clone());
            }
        }
    }

    Ok(Json(PlanDetailResponse {
        plan,
        calendar_data,
        schedule_raw,
        marks,
    }))
}

/// POST /api/v1/plans/:id/repair
///
/// Re-runs JSON extraction on the stored schedule text and persists the
/// best recovery (see `RepairOutcome`).
pub async fn handle_repair_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> Result<Json<RepairResponse>, AppError> {
    let plan = fetch_plan(&state, plan_id).await?;

    let (fixed_json, outcome) = repair_schedule_text(&plan.generated_schedule, &plan)?;

    sqlx::query("UPDATE plans SET generated_schedule = ? WHERE id = ?")
        .bind(&fixed_json)
        .bind(plan_id)
        .execute(&state.db)
        .await?;

    let (outcome_str, message) = match outcome {
        RepairOutcome::FixedSchedule => (
            "fixed",
            "Successfully extracted and fixed the JSON schedule data.",
        ),
        RepairOutcome::FixedOtherShape => (
            "fixed_with_warning",
            "JSON structure was fixed, but it might not have the expected schedule format.",
        ),
        RepairOutcome::Regenerated => (
            "regenerated",
            "Generated a new schedule based on the plan's details.",
        ),
    };

    info!("Plan {plan_id} repaired: {outcome_str}");

    Ok(Json(RepairResponse {
        plan_id,
        outcome: outcome_str.to_string(),
        message: message.to_string(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn fetch_plan(state: &AppState, plan_id: i64) -> Result<PlanRow, AppError> {
    sqlx::query_as::<_, PlanRow>("SELECT * FROM plans WHERE id = ?")
        .bind(plan_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id} not found")))
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{field} must be a YYYY-MM-DD date")))
}

/// Guarantees one calendar entry per day in the stored range. The trusted
/// path stores AI schedules verbatim, so gaps are possible; the calendar
/// view is where full coverage is enforced.
fn fill_date_coverage(schedule: &mut Schedule, start_date: &str, end_date: &str) {
    let (Ok(start), Ok(end)) = (
        NaiveDate::parse_from_str(start_date, "%Y-%m-%d"),
        NaiveDate::parse_from_str(end_date, "%Y-%m-%d"),
    ) else {
        return; // legacy rows with odd date strings render as stored
    };

    let mut current = start;
    while current <= end {
        schedule
            .entry(current.format("%Y-%m-%d").to_string())
            .or_default();
        current = match current.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
}
