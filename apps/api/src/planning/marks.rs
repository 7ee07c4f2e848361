//! Marks parser — turns the semi-structured exam-marks textarea into
//! structured `MarkRecord`s, plus the performance aggregation that ranks
//! subjects for the prompt builder.
//!
//! The grammar is positional and stateful: within a group, line 1 is the
//! subject name, line 2 the component type, then repeating pairs of a
//! "label/max" line and a lone obtained-marks line (two lines consumed per
//! assessment). A group ends when a blank line (or the end of input)
//! follows an assessment pair; blank lines elsewhere are skipped without
//! resetting the group. The grammar has no explicit delimiters and is
//! fragile on purpose — stored data depends on this exact line-consumption
//! pattern, so it is implemented as an explicit cursor loop over the line
//! sequence, not recursive descent.

use std::cmp::Ordering;

use thiserror::Error;

use crate::models::plan::{MarkRecord, SubjectPerformance};

/// Errors from the positional marks grammar. Any of these fails the whole
/// parse — there is no partial-record recovery.
#[derive(Debug, Error)]
pub enum MarksError {
    #[error("line {line_no}: '{value}' is not a valid number")]
    InvalidNumber { line_no: usize, value: String },

    #[error("line {line_no}: assessment line '{line}' must contain exactly one '/'")]
    MalformedAssessmentLine { line_no: usize, line: String },

    #[error("line {line_no}: assessment line '{line}' has no following obtained-marks line")]
    DanglingAssessment { line_no: usize, line: String },

    #[error("line {line_no}: unexpected line '{line}' where an assessment pair was expected")]
    UnexpectedLine { line_no: usize, line: String },
}

/// A subject's aggregate percentage, used for ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSubject {
    pub subject: String,
    /// total_obtained / total_max * 100
    pub percentage: f64,
}

/// A subject whose assessments total zero max marks — its percentage is
/// undefined, so ranking refuses the input rather than guessing.
#[derive(Debug, Error)]
#[error("subject '{0}' has zero total max marks")]
pub struct ZeroDenominator(pub String);

/// Parses the raw marks textarea into `MarkRecord`s.
///
/// Empty or whitespace-only input yields an empty list, not an error.
/// Ambiguous input — a stray line where an assessment pair is expected, a
/// line with more than one slash, or a trailing "label/max" line with no
/// obtained line after it — is a defined error rather than silently
/// dropped. A group consisting of header lines alone contributes no
/// records, same as the stored-data format always has.
pub fn parse_subject_marks(marks_text: &str) -> Result<Vec<MarkRecord>, MarksError> {
    let trimmed = marks_text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let lines: Vec<&str> = trimmed.split('\n').collect();
    let mut records = Vec::new();
    let mut current_subject: Option<String> = None;
    let mut current_component: Option<String> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();

        // Blank lines are skipped; they do not reset the group by
        // themselves. Only the group-end check after an assessment pair
        // does that.
        if line.is_empty() {
            i += 1;
            continue;
        }

        if current_subject.is_none() {
            current_subject = Some(line.to_string());
            i += 1;
            continue;
        }

        if current_component.is_none() {
            current_component = Some(line.to_string());
            i += 1;
            continue;
        }

        if line.contains('/') {
            let parts: Vec<&str> = line.split('/').collect();
            if parts.len() != 2 {
                return Err(MarksError::MalformedAssessmentLine {
                    line_no: i + 1,
                    line: line.to_string(),
                });
            }

            // Taken exactly as split — whitespace quirks around the label
            // are part of the stored format.
            let assessment_name = parts[0].to_string();
            let max_marks = parse_number(parts[1], i + 1)?;

            let obtained_line = match lines.get(i + 1) {
                Some(l) => l.trim(),
                None => {
                    return Err(MarksError::DanglingAssessment {
                        line_no: i + 1,
                        line: line.to_string(),
                    })
                }
            };
            let obtained_marks = parse_number(obtained_line, i + 2)?;

            records.push(MarkRecord {
                // both are Some on this branch by construction
                subject_name: current_subject.clone().unwrap_or_default(),
                component_type: current_component.clone().unwrap_or_default(),
                assessment_name,
                max_marks,
                obtained_marks,
            });

            i += 2;
        } else {
            return Err(MarksError::UnexpectedLine {
                line_no: i + 1,
                line: line.to_string(),
            });
        }

        // Group ends at a blank line or end of input.
        if i >= lines.len() || lines[i].trim().is_empty() {
            current_subject = None;
            current_component = None;
            i += 1;
        }
    }

    Ok(records)
}

fn parse_number(raw: &str, line_no: usize) -> Result<f64, MarksError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| MarksError::InvalidNumber {
            line_no,
            value: raw.trim().to_string(),
        })
}

/// Folds mark records into per-subject totals, preserving first-seen order.
/// Order matters downstream: ranking ties are broken by input order.
pub fn aggregate_performance(records: &[MarkRecord]) -> Vec<(String, SubjectPerformance)> {
    let mut totals: Vec<(String, SubjectPerformance)> = Vec::new();

    for record in records {
        match totals.iter_mut().find(|(name, _)| *name == record.subject_name) {
            Some((_, perf)) => {
                perf.total_obtained += record.obtained_marks;
                perf.total_max += record.max_marks;
            }
            None => totals.push((
                record.subject_name.clone(),
                SubjectPerformance {
                    total_obtained: record.obtained_marks,
                    total_max: record.max_marks,
                },
            )),
        }
    }

    totals
}

/// Ranks subjects ascending by obtained/max ratio (weakest first).
/// The sort is stable, so ties keep their input order. A subject with
/// total_max of zero makes the ranking undefined and is rejected.
pub fn rank_subjects(
    performance: &[(String, SubjectPerformance)],
) -> Result<Vec<RankedSubject>, ZeroDenominator> {
    let mut ranked = Vec::with_capacity(performance.len());

    for (subject, perf) in performance {
        if perf.total_max == 0.0 {
            return Err(ZeroDenominator(subject.clone()));
        }
        ranked.push(RankedSubject {
            subject: subject.clone(),
            percentage: perf.total_obtained / perf.total_max * 100.0,
        });
    }

    ranked.sort_by(|a, b| {
        a.percentage
            .partial_cmp(&b.percentage)
            .unwrap_or(Ordering::Equal)
    });

    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_assessment_group() {
        let records = parse_subject_marks("Math\nUnit Test\n20/25\n18").unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.subject_name, "Math");
        assert_eq!(r.component_type, "Unit Test");
        // The token before the slash is taken as-is, quirks included.
        assert_eq!(r.assessment_name, "20");
        assert_eq!(r.max_marks, 25.0);
        assert_eq!(r.obtained_marks, 18.0);
    }

    #[test]
    fn test_empty_and_whitespace_input_yield_empty_list() {
        assert!(parse_subject_marks("").unwrap().is_empty());
        assert!(parse_subject_marks("   \n\n  ").unwrap().is_empty());
    }

    #[test]
    fn test_multiple_assessments_in_one_group() {
        let text = "Physics\nMidterm\nPaper 1/50\n42\nPaper 2/50\n38";
        let records = parse_subject_marks(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].assessment_name, "Paper 1");
        assert_eq!(records[0].obtained_marks, 42.0);
        assert_eq!(records[1].assessment_name, "Paper 2");
        assert_eq!(records[1].max_marks, 50.0);
        assert!(records.iter().all(|r| r.subject_name == "Physics"));
    }

    #[test]
    fn test_blank_line_starts_a_new_group() {
        let text = "Math\nUnit Test\n20/25\n18\n\nChemistry\nPractical\nLab 1/30\n27";
        let records = parse_subject_marks(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subject_name, "Math");
        assert_eq!(records[1].subject_name, "Chemistry");
        assert_eq!(records[1].component_type, "Practical");
    }

    #[test]
    fn test_blank_line_between_subject_and_component_is_skipped() {
        let records = parse_subject_marks("Math\n\nUnit Test\n20/25\n18").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subject_name, "Math");
        assert_eq!(records[0].component_type, "Unit Test");
        assert_eq!(records[0].obtained_marks, 18.0);
    }

    #[test]
    fn test_blank_line_before_first_assessment_is_skipped() {
        let records = parse_subject_marks("Math\nUnit Test\n\n20/25\n18").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subject_name, "Math");
        assert_eq!(records[0].component_type, "Unit Test");
        assert_eq!(records[0].max_marks, 25.0);
    }

    #[test]
    fn test_header_only_group_yields_no_records() {
        assert!(parse_subject_marks("Math\nUnit Test").unwrap().is_empty());
    }

    #[test]
    fn test_assessment_label_keeps_surrounding_whitespace() {
        let records = parse_subject_marks("Physics\nMidterm\nPaper 1 /50\n42").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].assessment_name, "Paper 1 ");
        assert_eq!(records[0].max_marks, 50.0);
    }

    #[test]
    fn test_malformed_max_marks_fails_whole_parse() {
        let err = parse_subject_marks("Math\nUnit Test\n20/twenty-five\n18").unwrap_err();
        assert!(matches!(err, MarksError::InvalidNumber { line_no: 3, .. }));
    }

    #[test]
    fn test_malformed_obtained_marks_fails_whole_parse() {
        let err = parse_subject_marks("Math\nUnit Test\n20/25\neighteen").unwrap_err();
        assert!(matches!(err, MarksError::InvalidNumber { line_no: 4, .. }));
    }

    #[test]
    fn test_dangling_assessment_line_is_an_error() {
        let err = parse_subject_marks("Math\nUnit Test\n20/25").unwrap_err();
        assert!(matches!(err, MarksError::DanglingAssessment { line_no: 3, .. }));
    }

    #[test]
    fn test_multiple_slashes_are_an_error() {
        let err = parse_subject_marks("Math\nUnit Test\n20/25/30\n18").unwrap_err();
        assert!(matches!(err, MarksError::MalformedAssessmentLine { .. }));
    }

    #[test]
    fn test_stray_line_where_pair_expected_is_an_error() {
        let err = parse_subject_marks("Math\nUnit Test\nno slash here\n18").unwrap_err();
        assert!(matches!(err, MarksError::UnexpectedLine { line_no: 3, .. }));
    }

    #[test]
    fn test_aggregate_preserves_first_seen_order() {
        let records = parse_subject_marks(
            "Math\nUnit Test\n20/25\n18\n\nPhysics\nMidterm\nP1/50\n40\n\nMath\nFinal\nF/100\n70",
        )
        .unwrap();
        let totals = aggregate_performance(&records);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].0, "Math");
        assert_eq!(totals[0].1.total_obtained, 88.0);
        assert_eq!(totals[0].1.total_max, 125.0);
        assert_eq!(totals[1].0, "Physics");
    }

    #[test]
    fn test_ranking_is_ascending_weakest_first() {
        let performance = vec![
            (
                "Math".to_string(),
                SubjectPerformance {
                    total_obtained: 90.0,
                    total_max: 100.0,
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
        let ranked = rank_subjects(&performance).unwrap();
        assert_eq!(ranked[0].subject, "Physics");
        assert_eq!(ranked[0].percentage, 40.0);
        assert_eq!(ranked[1].subject, "Math");
    }

    #[test]
    fn test_ranking_ties_keep_input_order() {
        let performance = vec![
            (
                "B".to_string(),
                SubjectPerformance {
                    total_obtained: 50.0,
                    total_max: 100.0,
                },
            ),
            (
                "A".to_string(),
                SubjectPerformance {
                    total_obtained: 25.0,
                    total_max: 50.0,
                },
            ),
        ];
        let ranked = rank_subjects(&performance).unwrap();
        assert_eq!(ranked[0].subject, "B");
        assert_eq!(ranked[1].subject, "A");
    }

    #[test]
    fn test_zero_total_max_is_rejected() {
        let performance = vec![(
            "Math".to_string(),
            SubjectPerformance {
                total_obtained: 0.0,
                total_max: 0.0,
            },
        )];
        let err = rank_subjects(&performance).unwrap_err();
        assert_eq!(err.0, "Math");
    }
}
