//! Response normalization — turns whatever the completion service did (or
//! could not do) into a fully-populated `AiResult`.
//!
//! Flow: capability check → completion call → JSON extraction → one of
//! three outcomes: trusted AI JSON, degraded fallback content, or the
//! disabled-state result when no API key is configured. Nothing in here
//! propagates an error to the caller; the worst case is a degraded result
//! with a deterministic schedule.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::llm_client::CompletionService;
use crate::models::plan::{split_csv_field, AiResult, PlanRequest, PlanRow, Schedule};
use crate::planning::extractor::{extract_json_from_text, EXTRACTION_ERROR_KEY};
use crate::planning::fallback::generate_fallback_schedule;

/// Outcome of a repair attempt on stored schedule text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// A full JSON object with a `schedule` key was recovered; its
    /// sub-object was persisted.
    FixedSchedule,
    /// Valid JSON was recovered but without the expected `schedule`
    /// structure; persisted as-is. Callers should surface a warning.
    FixedOtherShape,
    /// Nothing recoverable; a fallback schedule was regenerated from the
    /// plan's own stored fields.
    Regenerated,
}

/// Runs the completion call and normalizes its output into an `AiResult`.
///
/// `service` is `None` when no API key was configured at startup — an
/// expected deployment configuration, answered with a usable
/// disabled-state result rather than an error.
pub async fn generate_plan_content(
    service: Option<&dyn CompletionService>,
    request: &PlanRequest,
    prompt: &str,
) -> AiResult {
    let Some(service) = service else {
        info!("AI generation skipped: no API key configured");
        return disabled_result();
    };

    match service.complete(prompt).await {
        Ok(text) => normalize_response(&text, request),
        Err(e) => {
            warn!("Completion call failed, using fallback schedule: {e}");
            failed_result(&e.to_string(), request)
        }
    }
}

/// Normalizes raw completion text into an `AiResult`.
///
/// Trusted path: the extracted object carries all three required keys and
/// the schedule value deserializes into the typed `Schedule` — everything
/// is returned verbatim (an empty `{}` schedule stays empty; date
/// coverage is the calendar view's concern). Anything else takes the
/// degraded path with canned text plus the deterministic fallback.
pub fn normalize_response(text: &str, request: &PlanRequest) -> AiResult {
    let extracted = extract_json_from_text(text);

    match trusted_result(&extracted) {
        Some(result) => {
            info!("Model response accepted via trusted path");
            result
        }
        None => {
            warn!("Model response missing required structure, using fallback schedule");
            extraction_failed_result(request)
        }
    }
}

fn trusted_result(extracted: &Value) -> Option<AiResult> {
    let learning_guide = extracted.get("learning_guide")?.as_str()?.to_string();
    let resources = extracted.get("resources")?.as_str()?.to_string();
    let schedule_value = extracted.get("schedule")?.clone();

    let schedule: Schedule = match serde_json::from_value(schedule_value) {
        Ok(schedule) => schedule,
        Err(e) => {
            warn!("Schedule key present but not deserializable: {e}");
            return None;
        }
    };

    Some(AiResult {
        learning_guide,
        resources,
        schedule,
    })
}

fn disabled_result() -> AiResult {
    AiResult {
        learning_guide: "AI generation skipped: API key not configured.".to_string(),
        resources: "AI generation skipped: API key not configured.".to_string(),
        schedule: Schedule::new(),
    }
}

fn extraction_failed_result(request: &PlanRequest) -> AiResult {
    AiResult {
        learning_guide: "AI guide extraction failed. Please review the schedule for any \
                         available guidance."
            .to_string(),
        resources: "AI resources extraction failed. Consider using standard study resources \
                    for your subjects."
            .to_string(),
        schedule: request_fallback(request),
    }
}

fn failed_result(detail: &str, request: &PlanRequest) -> AiResult {
    AiResult {
        learning_guide: format!("AI generation failed: {detail}"),
        resources: "AI generation failed. Consider using standard study resources for your \
                    subjects."
            .to_string(),
        schedule: request_fallback(request),
    }
}

fn request_fallback(request: &PlanRequest) -> Schedule {
    generate_fallback_schedule(
        request.start_date,
        request.end_date,
        &request.hours_per_day,
        &request.subjects,
        &request.off_days,
    )
}

/// Repair entry point for already-persisted, possibly-broken schedule text.
///
/// Re-runs the extractor on the stored text. A recovered object with a
/// `schedule` key yields that sub-object; any other recovered JSON is kept
/// as-is with a warning outcome; otherwise the schedule is regenerated
/// from the stored plan's own fields (off days re-split from the stored
/// comma-joined string). Returns the JSON text to persist.
pub fn repair_schedule_text(stored_text: &str, plan: &PlanRow) -> Result<(String, RepairOutcome)> {
    let extracted = extract_json_from_text(stored_text);

    if let Some(schedule) = extracted.get("schedule") {
        let fixed = serde_json::to_string(schedule)?;
        return Ok((fixed, RepairOutcome::FixedSchedule));
    }

    if extracted.get(EXTRACTION_ERROR_KEY).is_none() {
        let fixed = serde_json::to_string(&extracted)?;
        return Ok((fixed, RepairOutcome::FixedOtherShape));
    }

    let start_date = NaiveDate::parse_from_str(&plan.start_date, "%Y-%m-%d")
        .with_context(|| format!("plan {} has unparseable start_date", plan.id))?;
    let end_date = NaiveDate::parse_from_str(&plan.end_date, "%Y-%m-%d")
        .with_context(|| format!("plan {} has unparseable end_date", plan.id))?;
    let subjects = split_csv_field(&plan.subjects);
    let off_days = split_csv_field(&plan.off_days);

    let schedule = generate_fallback_schedule(
        start_date,
        end_date,
        &plan.hours_per_day,
        &subjects,
        &off_days,
    );

    Ok((serde_json::to_string(&schedule)?, RepairOutcome::Regenerated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::llm_client::LlmError;

    struct CannedService(String);

    #[async_trait]
    impl CompletionService for CannedService {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    struct FailingService;

    #[async_trait]
    impl CompletionService for FailingService {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::Upstream {
                status: 503,
                message: "model overloaded".to_string(),
            })
        }
    }

    fn request() -> PlanRequest {
        PlanRequest {
            title: "Finals prep".to_string(),
            description: String::new(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            subjects: vec!["Math".to_string(), "Physics".to_string()],
            learning_goal: String::new(),
            difficulty_feedback: String::new(),
            hours_per_day: "4".to_string(),
            off_days: vec![],
            class_schedule: String::new(),
            marks_text: String::new(),
        }
    }

    fn plan_row() -> PlanRow {
        PlanRow {
            id: 1,
            title: "Finals prep".to_string(),
            description: String::new(),
            start_date: "2024-01-01".to_string(),
            end_date: "2024-01-02".to_string(),
            subjects: "Math,Physics".to_string(),
            learning_goal: String::new(),
            difficulty_feedback: String::new(),
            hours_per_day: "4".to_string(),
            off_days: "Saturday,Sunday".to_string(),
            class_schedule: String::new(),
            generated_guide: String::new(),
            generated_schedule: String::new(),
            resources: String::new(),
        }
    }

    #[tokio::test]
    async fn test_no_service_yields_disabled_result() {
        let result = generate_plan_content(None, &request(), "prompt").await;
        assert!(result.learning_guide.contains("API key not configured"));
        assert!(result.resources.contains("API key not configured"));
        assert!(result.schedule.is_empty());
    }

    #[tokio::test]
    async fn test_prose_wrapped_response_takes_trusted_path() {
        let service =
            CannedService(r#"Here is your plan: {"learning_guide":"x","resources":"y","schedule":{}}"#.to_string());
        let result = generate_plan_content(Some(&service), &request(), "prompt").await;
        assert_eq!(result.learning_guide, "x");
        assert_eq!(result.resources, "y");
        assert!(result.schedule.is_empty());
    }

    #[tokio::test]
    async fn test_completion_failure_embeds_detail_and_falls_back() {
        let result = generate_plan_content(Some(&FailingService), &request(), "prompt").await;
        assert!(result.learning_guide.contains("model overloaded"));
        // Fallback covers the full date range.
        assert_eq!(result.schedule.len(), 2);
        assert!(result.schedule.contains_key("2024-01-01"));
        assert!(result.schedule.contains_key("2024-01-02"));
    }

    #[test]
    fn test_trusted_path_preserves_schedule_blocks() {
        let text = r#"{
            "learning_guide": "guide",
            "resources": "resources",
            "schedule": {
                "2024-01-01": [
                    {"start_time": "09:00", "end_time": "11:00", "subject": "Math", "task": "Integrals"}
                ]
            }
        }"#;
        let result = normalize_response(text, &request());
        assert_eq!(result.learning_guide, "guide");
        let blocks = &result.schedule["2024-01-01"];
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].subject, "Math");
        assert_eq!(blocks[0].task, "Integrals");
    }

    #[test]
    fn test_missing_keys_take_degraded_path() {
        let result = normalize_response(r#"{"learning_guide": "only one key"}"#, &request());
        assert!(result.learning_guide.contains("extraction failed"));
        assert!(result.resources.contains("standard study resources"));
        assert_eq!(result.schedule.len(), 2);
    }

    #[test]
    fn test_unparseable_schedule_shape_takes_degraded_path() {
        let text = r#"{"learning_guide": "x", "resources": "y", "schedule": "not a mapping"}"#;
        let result = normalize_response(text, &request());
        assert!(result.learning_guide.contains("extraction failed"));
        assert_eq!(result.schedule.len(), 2);
    }

    #[test]
    fn test_garbage_response_takes_degraded_path_with_fallback() {
        let result = normalize_response("no json anywhere", &request());
        assert!(result.learning_guide.contains("extraction failed"));
        assert!(!result.schedule["2024-01-01"].is_empty());
    }

    #[test]
    fn test_repair_extracts_schedule_subobject() {
        let stored = r#"Sure! {"learning_guide":"g","resources":"r","schedule":{"2024-01-01":[]}}"#;
        let (fixed, outcome) = repair_schedule_text(stored, &plan_row()).unwrap();
        assert_eq!(outcome, RepairOutcome::FixedSchedule);
        let value: Value = serde_json::from_str(&fixed).unwrap();
        assert!(value.get("2024-01-01").is_some());
        assert!(value.get("schedule").is_none());
    }

    #[test]
    fn test_repair_keeps_other_valid_json_with_warning_outcome() {
        let stored = r#"{"2024-01-01": [], "2024-01-02": []}"#;
        let (fixed, outcome) = repair_schedule_text(stored, &plan_row()).unwrap();
        assert_eq!(outcome, RepairOutcome::FixedOtherShape);
        let value: Value = serde_json::from_str(&fixed).unwrap();
        assert!(value.get("2024-01-01").is_some());
    }

    #[test]
    fn test_repair_regenerates_from_stored_fields_when_unrecoverable() {
        let (fixed, outcome) = repair_schedule_text("total garbage", &plan_row()).unwrap();
        assert_eq!(outcome, RepairOutcome::Regenerated);
        let schedule: Schedule = serde_json::from_str(&fixed).unwrap();
        assert_eq!(schedule.len(), 2);
        // 2024-01-01 is a Monday; stored off days are the weekend.
        assert!(!schedule["2024-01-01"].is_empty());
        assert_eq!(schedule["2024-01-01"][0].subject, "Math");
    }

    #[test]
    fn test_repair_is_deterministic() {
        let a = repair_schedule_text("garbage", &plan_row()).unwrap();
        let b = repair_schedule_text("garbage", &plan_row()).unwrap();
        assert_eq!(a.0, b.0);
    }
}
