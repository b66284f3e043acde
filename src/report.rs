//! Projection of stage results into a renderable model.
//!
//! Pure functions only: the same result always yields the same model, and missing
//! analysis fields become empty cells instead of errors.

use crate::model::{
    CategoryAssessment, ReadabilityAssessment, ResultValue, SentimentAssessment,
    StructuredAnalysis,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderModel {
    /// Preformatted text shown as-is.
    Block { text: String },
    Report(Report),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub sections: Vec<Section>,
    /// Supplementary fields the service sent, if any. Not part of the sections.
    pub notes: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub label: &'static str,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub label: &'static str,
    pub value: Option<String>,
}

impl Field {
    fn text(label: &'static str, value: &Option<String>) -> Self {
        Self {
            label,
            value: value.clone(),
        }
    }

    fn number(label: &'static str, value: Option<f64>) -> Self {
        Self {
            label,
            value: value.map(format_number),
        }
    }
}

/// Whole numbers print without a fractional part: `72`, not `72.0`.
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

pub fn project(result: &ResultValue) -> RenderModel {
    match result {
        ResultValue::Text(text) => RenderModel::Block { text: text.clone() },
        ResultValue::Structured(a) => RenderModel::Report(report(a)),
    }
}

fn category(label: &'static str, c: &CategoryAssessment) -> Section {
    Section {
        label,
        fields: vec![
            Field::text("Feedback", &c.feedback),
            Field::number("Score", c.score),
            Field::text("Example", &c.example),
        ],
    }
}

fn sentiment(s: &SentimentAssessment) -> Section {
    Section {
        label: "Sentiment",
        fields: vec![
            Field::text("Label", &s.label),
            Field::number("Score", s.score),
        ],
    }
}

fn readability(r: &ReadabilityAssessment) -> Section {
    Section {
        label: "Readability",
        fields: vec![
            Field::number("Score", r.score),
            Field::text("Level", &r.level),
            Field::text("Comment", &r.comment),
        ],
    }
}

fn report(a: &StructuredAnalysis) -> Report {
    let sections = vec![
        Section {
            label: "Summary",
            fields: vec![
                Field::text("Summary", &a.summary),
                Field::number("Overall Score", a.overall_score),
            ],
        },
        category("Stereotyping", &a.stereotyping),
        category("Representation", &a.representation),
        category("Language", &a.language),
        category("Framing", &a.framing),
        sentiment(&a.sentiment),
        readability(&a.readability),
    ];

    let notes = [
        Field::text("Positive Aspects", &a.positive_aspects),
        Field::text("Improvement Suggestions", &a.improvement_suggestions),
        Field::number(
            "Male/Female Mention Ratio",
            a.male_to_female_mention_ratio,
        ),
        Field::number(
            "Gender-Neutral Language %",
            a.gender_neutral_language_percentage,
        ),
    ]
    .into_iter()
    .filter(|f| f.value.is_some())
    .collect();

    Report { sections, notes }
}

/// Flatten a render model into plain lines for text output.
pub fn render_lines(model: &RenderModel) -> Vec<String> {
    let mut lines = Vec::new();
    match model {
        RenderModel::Block { text } => lines.extend(text.lines().map(str::to_string)),
        RenderModel::Report(r) => {
            for section in &r.sections {
                lines.push(format!("[{}]", section.label));
                for field in &section.fields {
                    lines.push(format!(
                        "  {}: {}",
                        field.label,
                        field.value.as_deref().unwrap_or("-")
                    ));
                }
            }
            if !r.notes.is_empty() {
                lines.push("[Notes]".into());
                for field in &r.notes {
                    lines.push(format!(
                        "  {}: {}",
                        field.label,
                        field.value.as_deref().unwrap_or("-")
                    ));
                }
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn full_analysis() -> StructuredAnalysis {
        serde_json::from_value(json!({
            "summary": "Leans male in examples",
            "overall_score": 64,
            "stereotyping_feedback": "Engineers are all 'he'",
            "stereotyping_score": 55,
            "stereotyping_example": "a good engineer knows his tools",
            "representation_feedback": "Few women quoted",
            "representation_score": 40,
            "representation_example": "3 of 12 sources",
            "language_feedback": "Mostly neutral",
            "language_score": 80,
            "language_example": "chairperson",
            "framing_feedback": "Balanced",
            "framing_score": 75.5,
            "framing_example": "both views presented",
            "sentiment_label": "Positive",
            "sentiment_score": 68.2,
            "readability_score": 59,
            "readability_level": "Medium",
            "readability_comment": "Long sentences"
        }))
        .unwrap()
    }

    fn values(section: &Section) -> Vec<Option<&str>> {
        section.fields.iter().map(|f| f.value.as_deref()).collect()
    }

    #[test]
    fn text_projects_to_single_block() {
        let model = project(&ResultValue::Text("hello".into()));
        assert_eq!(
            model,
            RenderModel::Block {
                text: "hello".into()
            }
        );
    }

    #[test]
    fn structured_projects_to_seven_sections_in_order() {
        let model = project(&ResultValue::Structured(Box::new(full_analysis())));
        let RenderModel::Report(r) = model else {
            panic!("expected a report");
        };

        let labels: Vec<_> = r.sections.iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec![
                "Summary",
                "Stereotyping",
                "Representation",
                "Language",
                "Framing",
                "Sentiment",
                "Readability"
            ]
        );
        assert_eq!(
            values(&r.sections[0]),
            vec![Some("Leans male in examples"), Some("64")]
        );
        assert_eq!(
            values(&r.sections[1]),
            vec![
                Some("Engineers are all 'he'"),
                Some("55"),
                Some("a good engineer knows his tools")
            ]
        );
        assert_eq!(
            values(&r.sections[2]),
            vec![Some("Few women quoted"), Some("40"), Some("3 of 12 sources")]
        );
        assert_eq!(
            values(&r.sections[3]),
            vec![Some("Mostly neutral"), Some("80"), Some("chairperson")]
        );
        assert_eq!(
            values(&r.sections[4]),
            vec![Some("Balanced"), Some("75.5"), Some("both views presented")]
        );
        assert_eq!(values(&r.sections[5]), vec![Some("Positive"), Some("68.2")]);
        assert_eq!(
            values(&r.sections[6]),
            vec![Some("59"), Some("Medium"), Some("Long sentences")]
        );
        assert!(r.notes.is_empty());
    }

    #[test]
    fn missing_fields_become_empty_cells() {
        let model = project(&ResultValue::Structured(Box::default()));
        let RenderModel::Report(r) = model else {
            panic!("expected a report");
        };
        assert_eq!(r.sections.len(), 7);
        assert!(r
            .sections
            .iter()
            .flat_map(|s| &s.fields)
            .all(|f| f.value.is_none()));

        let lines = render_lines(&RenderModel::Report(r));
        assert!(lines.contains(&"  Comment: -".to_string()));
    }

    #[test]
    fn supplementary_fields_land_in_notes() {
        let mut a = full_analysis();
        a.improvement_suggestions = Some("Quote more women".into());
        a.male_to_female_mention_ratio = Some(2.5);

        let RenderModel::Report(r) = project(&ResultValue::Structured(Box::new(a))) else {
            panic!("expected a report");
        };

        assert_eq!(r.sections.len(), 7);
        assert_eq!(
            r.notes,
            vec![
                Field {
                    label: "Improvement Suggestions",
                    value: Some("Quote more women".into())
                },
                Field {
                    label: "Male/Female Mention Ratio",
                    value: Some("2.5".into())
                },
            ]
        );
        let lines = render_lines(&RenderModel::Report(r));
        assert_eq!(lines.last().map(String::as_str), Some("  Male/Female Mention Ratio: 2.5"));
    }

    #[test]
    fn block_lines_follow_text_lines() {
        let lines = render_lines(&project(&ResultValue::Text("one\ntwo".into())));
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn numbers_drop_trailing_zero_fraction() {
        assert_eq!(format_number(72.0), "72");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(f64::NAN), "NaN");
    }
}
