//! Prompt construction for study-plan generation.
//!
//! One template, rendered per request. The instructions pin down the exact
//! response contract: a raw JSON object with `learning_guide`, `resources`,
//! and `schedule` keys, empty arrays for off days, and more time and
//! guidance for weaker subjects.

use crate::models::plan::{PlanRequest, SubjectPerformance};
use crate::planning::marks::RankedSubject;

/// Plan generation prompt template. Placeholders are replaced before
/// sending; the literal braces in the schedule example are part of the
/// requested output format.
pub const PLAN_PROMPT_TEMPLATE: &str = r#"Generate a personalized study plan based on the following details.
Provide the output STRICTLY as a JSON object with three main keys: "learning_guide", "resources", and "schedule".

**Plan Details:**
- Title: {title}
- Description: {description}
- Duration: {start_date} to {end_date}
- Subjects: {subjects}
- Previous Exam Performance: {marks_summary}
- Subject Performance Ranking (from lowest to highest): {ranking}
- Learning Goal: {learning_goal}
- Subject Confidence/Difficulty: {difficulty_feedback}
- Target Study Hours Per Day: {hours_per_day}
- Days Off (No Studying): {off_days}
- Existing Class/Fixed Schedule: {class_schedule}

**Output Requirements:**

1. "learning_guide": (String) A concise, step-by-step study strategy. Prioritize subjects with lower marks and give specific improvement strategies for them, with more detailed guidance the lower the subject ranks.

2. "resources": (String) Relevant learning resources (websites, topics to search, practice problem types, book recommendations) for the listed subjects, as a simple bulleted list or paragraphs within the string. Suggest more resources for subjects with lower marks.

3. "schedule": (JSON Object) A day-by-day schedule covering every date from {start_date} to {end_date}. Each date maps to an array of blocks with:
   - "start_time": (String) e.g. "09:00"
   - "end_time": (String) e.g. "11:00"
   - "subject": (String) the subject to study
   - "task": (String) a specific task for that block, e.g. "Practice integration techniques"
   Allocate proportionally more blocks, review sessions, and practice tasks to subjects with lower marks. Respect the daily hour budget, the off days, and the existing class schedule.
   Example for one day: "YYYY-MM-DD": [{"start_time": "10:00", "end_time": "12:00", "subject": "Math", "task": "Practice integration techniques"}]
   If a day is an off day, its value must be an empty array: "YYYY-MM-DD": []

**Important:** Respond with ONLY the raw JSON object containing exactly these three keys. Do not include explanatory text, markdown formatting, or code fences."#;

/// Renders the plan prompt from the request and its performance data.
///
/// The marks summary keeps first-seen subject order; the ranking line is
/// ascending (weakest first). Subjects with a zero total maximum never
/// reach here — ranking rejects them — but the summary skips them anyway
/// rather than dividing by zero.
pub fn render_plan_prompt(
    request: &PlanRequest,
    performance: &[(String, SubjectPerformance)],
    ranked: &[RankedSubject],
) -> String {
    let marks_summary = if performance.is_empty() {
        "Not provided".to_string()
    } else {
        performance
            .iter()
            .filter(|(_, perf)| perf.total_max > 0.0)
            .map(|(subject, perf)| {
                format!(
                    "{subject}: {:.1}%",
                    perf.total_obtained / perf.total_max * 100.0
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let ranking = if ranked.is_empty() {
        "Not provided".to_string()
    } else {
        ranked
            .iter()
            .map(|r| format!("{}: {:.1}%", r.subject, r.percentage))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let off_days = if request.off_days.is_empty() {
        "None".to_string()
    } else {
        request.off_days.join(", ")
    };

    let class_schedule = if request.class_schedule.trim().is_empty() {
        "None".to_string()
    } else {
        request.class_schedule.clone()
    };

    PLAN_PROMPT_TEMPLATE
        .replace("{title}", &request.title)
        .replace("{description}", &request.description)
        .replace("{start_date}", &request.start_date.to_string())
        .replace("{end_date}", &request.end_date.to_string())
        .replace("{subjects}", &request.subjects.join(", "))
        .replace("{marks_summary}", &marks_summary)
        .replace("{ranking}", &ranking)
        .replace("{learning_goal}", &request.learning_goal)
        .replace("{difficulty_feedback}", &request.difficulty_feedback)
        .replace("{hours_per_day}", &request.hours_per_day)
        .replace("{off_days}", &off_days)
        .replace("{class_schedule}", &class_schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request() -> PlanRequest {
        PlanRequest {
            title: "Finals prep".to_string(),
            description: "Two-week revision".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
            subjects: vec!["Math".to_string(), "Physics".to_string()],
            learning_goal: "Pass finals".to_string(),
            difficulty_feedback: "Physics is hard".to_string(),
            hours_per_day: "5".to_string(),
            off_days: vec!["Sunday".to_string()],
            class_schedule: String::new(),
            marks_text: String::new(),
        }
    }

    #[test]
    fn test_prompt_contains_ranking_weakest_first() {
        let ranked = vec![
            RankedSubject {
                subject: "Physics".to_string(),
                percentage: 40.0,
            },
            RankedSubject {
                subject: "Math".to_string(),
                percentage: 90.0,
            },
        ];
        let prompt = render_plan_prompt(&request(), &[], &ranked);
        assert!(prompt.contains("Physics: 40.0%, Math: 90.0%"));
    }

    #[test]
    fn test_prompt_states_json_only_contract() {
        let prompt = render_plan_prompt(&request(), &[], &[]);
        assert!(prompt.contains(r#""learning_guide""#));
        assert!(prompt.contains(r#""resources""#));
        assert!(prompt.contains(r#""schedule""#));
        assert!(prompt.contains("empty array"));
        assert!(prompt.contains("ONLY the raw JSON object"));
        assert!(!prompt.contains("{title}"));
    }

    #[test]
    fn test_missing_marks_render_as_not_provided() {
        let prompt = render_plan_prompt(&request(), &[], &[]);
        assert!(prompt.contains("Previous Exam Performance: Not provided"));
        assert!(prompt.contains("(from lowest to highest): Not provided"));
    }

    #[test]
    fn test_marks_summary_keeps_first_seen_order() {
        let performance = vec![
            (
                "Math".to_string(),
                SubjectPerformance {
                    total_obtained: 88.0,
                    total_max: 125.0,
                },
            ),
            (
                "Physics".to_string(),
                SubjectPerformance {
                    total_obtained: 40.0,
                    total_max: 100.0,
                },
            ),
        ];
        let prompt = render_plan_prompt(&request(), &performance, &[]);
        assert!(prompt.contains("Math: 70.4%, Physics: 40.0%"));
    }

    #[test]
    fn test_empty_off_days_render_as_none() {
        let mut req = request();
        req.off_days.clear();
        let prompt = render_plan_prompt(&req, &[], &[]);
        assert!(prompt.contains("Days Off (No Studying): None"));
    }
}
