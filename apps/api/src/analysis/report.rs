//! Report shaping — the consumer side of the analysis result.
//!
//! The model enforces no schema, so everything here coerces defensively:
//! missing or wrong-typed fields become zero / empty lists rather than
//! errors.

use serde::Serialize;
use serde_json::Value;

/// How many skills / suggestions surface in the headline views.
const TOP_N: usize = 5;

/// Structured match report with every field coerced to a usable default.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub overall_score: f64,
    pub keyword_matching: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub suggestions: Vec<String>,
}

impl AnalysisReport {
    /// Coerces an untyped model result. Wrong-typed fields degrade to their
    /// defaults field-by-field, never failing the whole report.
    pub fn from_value(value: &Value) -> Self {
        Self {
            overall_score: value
                .get("overall_score")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            keyword_matching: string_list(value.get("keyword_matching")),
            missing_keywords: string_list(value.get("missing_keywords")),
            suggestions: string_list(value.get("suggestions")),
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Alignment band shown as the headline verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreBand {
    StronglyAligns,
    PartiallyAligns,
    NeedsImprovement,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ScoreBand::StronglyAligns
        } else if score >= 60.0 {
            ScoreBand::PartiallyAligns
        } else {
            ScoreBand::NeedsImprovement
        }
    }
}

/// Suggestion priority derived from substring matches in the suggestion text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn for_suggestion(suggestion: &str) -> Self {
        let lowered = suggestion.to_lowercase();
        if lowered.contains("experience") {
            Priority::High
        } else if lowered.contains("skill") {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

/// The four fixed improvement categories with their bucketing keywords.
const SUGGESTION_CATEGORIES: [(&str, &[&str]); 4] = [
    ("Skills & Certifications", &["skill", "certification", "training"]),
    (
        "Experience & Work History",
        &["experience", "projects", "work history"],
    ),
    (
        "Resume Formatting & Structure",
        &["format", "layout", "structure", "design"],
    ),
    (
        "Education & Qualifications",
        &["education", "degree", "qualification"],
    ),
];

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBucket {
    pub category: String,
    pub items: Vec<String>,
}

/// Buckets suggestions into the four fixed categories. First matching
/// category wins; suggestions matching none are dropped.
pub fn categorize_suggestions(suggestions: &[String]) -> Vec<CategoryBucket> {
    let mut buckets: Vec<CategoryBucket> = SUGGESTION_CATEGORIES
        .iter()
        .map(|(name, _)| CategoryBucket {
            category: name.to_string(),
            items: Vec::new(),
        })
        .collect();

    for suggestion in suggestions {
        let lowered = suggestion.to_lowercase();
        for (index, (_, keywords)) in SUGGESTION_CATEGORIES.iter().enumerate() {
            if keywords.iter().any(|k| lowered.contains(k)) {
                buckets[index].items.push(suggestion.clone());
                break;
            }
        }
    }

    buckets.retain(|bucket| !bucket.items.is_empty());
    buckets
}

#[derive(Debug, Clone, Serialize)]
pub struct PrioritizedSuggestion {
    pub suggestion: String,
    pub priority: Priority,
}

/// Top-5 suggestions ordered High -> Low, stable within a level.
pub fn top_priorities(suggestions: &[String]) -> Vec<PrioritizedSuggestion> {
    let mut prioritized: Vec<PrioritizedSuggestion> = suggestions
        .iter()
        .map(|s| PrioritizedSuggestion {
            suggestion: s.clone(),
            priority: Priority::for_suggestion(s),
        })
        .collect();

    prioritized.sort_by_key(|p| p.priority.rank());
    prioritized.truncate(TOP_N);
    prioritized
}

/// Everything the dashboard renders, derived from the raw report.
#[derive(Debug, Serialize)]
pub struct ReportView {
    pub overall_score: f64,
    pub band: ScoreBand,
    pub top_matching_skills: Vec<String>,
    pub remaining_matching_skills: Vec<String>,
    pub top_missing_skills: Vec<String>,
    pub remaining_missing_skills: Vec<String>,
    pub categorized_suggestions: Vec<CategoryBucket>,
    pub priority_suggestions: Vec<PrioritizedSuggestion>,
}

impl ReportView {
    pub fn from_result(value: &Value) -> Self {
        let report = AnalysisReport::from_value(value);
        let (top_matching, remaining_matching) = split_top(&report.keyword_matching);
        let (top_missing, remaining_missing) = split_top(&report.missing_keywords);

        Self {
            overall_score: report.overall_score,
            band: ScoreBand::from_score(report.overall_score),
            top_matching_skills: top_matching,
            remaining_matching_skills: remaining_matching,
            top_missing_skills: top_missing,
            remaining_missing_skills: remaining_missing,
            categorized_suggestions: categorize_suggestions(&report.suggestions),
            priority_suggestions: top_priorities(&report.suggestions),
        }
    }
}

fn split_top(items: &[String]) -> (Vec<String>, Vec<String>) {
    let top = items.iter().take(TOP_N).cloned().collect();
    let remaining = items.iter().skip(TOP_N).cloned().collect();
    (top, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_with_complete_report() {
        let value = json!({
            "overall_score": 85,
            "keyword_matching": ["Python", "Docker"],
            "missing_keywords": ["Kubernetes"],
            "suggestions": ["Add cloud experience"]
        });

        let report = AnalysisReport::from_value(&value);
        assert_eq!(report.overall_score, 85.0);
        assert_eq!(report.keyword_matching, vec!["Python", "Docker"]);
        assert_eq!(report.missing_keywords, vec!["Kubernetes"]);
        assert_eq!(report.suggestions, vec!["Add cloud experience"]);
    }

    #[test]
    fn test_from_value_coerces_missing_fields_to_defaults() {
        let report = AnalysisReport::from_value(&json!({}));
        assert_eq!(report.overall_score, 0.0);
        assert!(report.keyword_matching.is_empty());
        assert!(report.missing_keywords.is_empty());
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_from_value_coerces_wrong_typed_fields() {
        let value = json!({
            "overall_score": "eighty-five",
            "keyword_matching": "Python",
            "missing_keywords": {"a": 1},
            "suggestions": [1, 2, "real suggestion"]
        });

        let report = AnalysisReport::from_value(&value);
        assert_eq!(report.overall_score, 0.0);
        assert!(report.keyword_matching.is_empty());
        assert!(report.missing_keywords.is_empty());
        // Non-string entries are skipped, not fatal.
        assert_eq!(report.suggestions, vec!["real suggestion"]);
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(ScoreBand::from_score(85.0), ScoreBand::StronglyAligns);
        assert_eq!(ScoreBand::from_score(80.0), ScoreBand::StronglyAligns);
        assert_eq!(ScoreBand::from_score(79.9), ScoreBand::PartiallyAligns);
        assert_eq!(ScoreBand::from_score(60.0), ScoreBand::PartiallyAligns);
        assert_eq!(ScoreBand::from_score(59.9), ScoreBand::NeedsImprovement);
        assert_eq!(ScoreBand::from_score(0.0), ScoreBand::NeedsImprovement);
    }

    #[test]
    fn test_priority_from_substrings() {
        assert_eq!(
            Priority::for_suggestion("Highlight your leadership experience"),
            Priority::High
        );
        assert_eq!(
            Priority::for_suggestion("List your Python skills"),
            Priority::Medium
        );
        assert_eq!(
            Priority::for_suggestion("Use a cleaner font"),
            Priority::Low
        );
        // "experience" wins over "skill" when both appear.
        assert_eq!(
            Priority::for_suggestion("Add skill-based experience bullets"),
            Priority::High
        );
    }

    #[test]
    fn test_categorize_first_match_wins() {
        // "skill" (category 1) appears before "experience" (category 2) in
        // category order, so this lands in Skills & Certifications.
        let suggestions = vec!["Demonstrate your skills with experience".to_string()];
        let buckets = categorize_suggestions(&suggestions);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].category, "Skills & Certifications");
    }

    #[test]
    fn test_categorize_covers_all_four_categories() {
        let suggestions = vec![
            "Add a certification".to_string(),
            "Describe recent projects".to_string(),
            "Improve the layout".to_string(),
            "Mention your degree".to_string(),
        ];
        let buckets = categorize_suggestions(&suggestions);
        let names: Vec<&str> = buckets.iter().map(|b| b.category.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Skills & Certifications",
                "Experience & Work History",
                "Resume Formatting & Structure",
                "Education & Qualifications"
            ]
        );
    }

    #[test]
    fn test_categorize_drops_unmatched_suggestions() {
        let suggestions = vec!["Be more confident".to_string()];
        assert!(categorize_suggestions(&suggestions).is_empty());
    }

    #[test]
    fn test_top_priorities_sorted_high_to_low_and_capped() {
        let suggestions = vec![
            "Use a cleaner font".to_string(),
            "List your skills".to_string(),
            "Expand your experience section".to_string(),
            "Shorten the summary".to_string(),
            "Add project experience".to_string(),
            "Mention soft skills".to_string(),
        ];

        let prioritized = top_priorities(&suggestions);
        assert_eq!(prioritized.len(), 5);
        assert_eq!(prioritized[0].priority, Priority::High);
        assert_eq!(prioritized[1].priority, Priority::High);
        // Stable within a level: first High is the earlier suggestion.
        assert_eq!(prioritized[0].suggestion, "Expand your experience section");
        assert_eq!(prioritized[2].priority, Priority::Medium);
    }

    #[test]
    fn test_report_view_splits_top_five_skills() {
        let value = json!({
            "overall_score": 72,
            "keyword_matching": ["a", "b", "c", "d", "e", "f", "g"],
            "missing_keywords": ["x"],
            "suggestions": []
        });

        let view = ReportView::from_result(&value);
        assert_eq!(view.band, ScoreBand::PartiallyAligns);
        assert_eq!(view.top_matching_skills.len(), 5);
        assert_eq!(view.remaining_matching_skills, vec!["f", "g"]);
        assert_eq!(view.top_missing_skills, vec!["x"]);
        assert!(view.remaining_missing_skills.is_empty());
    }

    #[test]
    fn test_report_view_from_error_marker_degrades_to_zero() {
        let view = ReportView::from_result(&json!({"error": "JSON decoding error"}));
        assert_eq!(view.overall_score, 0.0);
        assert_eq!(view.band, ScoreBand::NeedsImprovement);
        assert!(view.priority_suggestions.is_empty());
    }
}
