use serde::{ Serialize, Deserialize };

/// Per-session scores on a 0-10 scale, produced by the backend at stop time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub technical: f64,
    pub communication: f64,
    pub confidence: f64,
    pub professionalism: f64,
    #[serde(default)]
    pub per_question: Vec<PerQuestionScore>,
}

impl Evaluation {
    pub fn average_score(&self) -> f64 {
        (self.technical + self.communication + self.confidence + self.professionalism) / 4.0
    }
}

/// One graded question. The two backend report variants disagree on field
/// names (`score` vs `technical_score`), so both are optional here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PerQuestionScore {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Roadmap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub resources: Vec<RoadmapResource>,
}

/// Roadmap resources arrive either as structured links or as plain strings
/// depending on the backend version.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoadmapResource {
    Link {
        title: String,
        url: String,
        #[serde(rename = "type")]
        kind: String,
    },
    Plain(String),
}

impl RoadmapResource {
    pub fn title(&self) -> &str {
        match self {
            RoadmapResource::Link { title, .. } => title,
            RoadmapResource::Plain(text) => text,
        }
    }
}

/// Response body of `GET /api/report/{session_id}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FullReport {
    pub status: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub evaluation: Option<Evaluation>,
    #[serde(default)]
    pub report: Option<serde_json::Value>,
    #[serde(default)]
    pub roadmap: Option<Roadmap>,
    #[serde(default)]
    pub interview: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_score_is_mean_of_the_four_axes() {
        let eval = Evaluation {
            session_id: None,
            user_name: None,
            technical: 8.0,
            communication: 6.0,
            confidence: 7.0,
            professionalism: 9.0,
            per_question: vec![],
        };
        assert!((eval.average_score() - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn roadmap_resource_accepts_both_wire_shapes() {
        let structured = r#"{"title":"Rust Book","url":"https://doc.rust-lang.org/book/","type":"book"}"#;
        let resource: RoadmapResource = serde_json::from_str(structured).unwrap();
        assert_eq!(resource.title(), "Rust Book");

        let plain = r#""Practice system design questions""#;
        let resource: RoadmapResource = serde_json::from_str(plain).unwrap();
        assert_eq!(resource.title(), "Practice system design questions");
    }

    #[test]
    fn full_report_parses_failure_payload() {
        let json = r#"{"status":"not_found","message":"No report for session"}"#;
        let report: FullReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.status, "not_found");
        assert!(report.evaluation.is_none());
        assert_eq!(report.message.as_deref(), Some("No report for session"));
    }

    #[test]
    fn evaluation_tolerates_missing_per_question_list() {
        let json = r#"{"technical":7.5,"communication":8,"confidence":6,"professionalism":9}"#;
        let eval: Evaluation = serde_json::from_str(json).unwrap();
        assert!(eval.per_question.is_empty());
    }
}
