use crate::models::resume::Resume;
use serde::{ Serialize, Deserialize };
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}', expected easy, medium or hard", other)),
        }
    }
}

/// One question/answer exchange. Appended to the session history and never
/// mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            audio_url: None,
            video_url: None,
        }
    }
}

/// Interviewer voice/avatar descriptor from `GET /api/interview/voices`.
/// Backends differ in how much they fill in, so everything but the name is
/// optional.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Voice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Audio blob attached to an answer as the `audio_file` multipart part.
#[derive(Clone, Debug)]
pub struct AnswerAudio {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Payload for `POST /api/interview/answer`. Sent as a multipart form; the
/// resume travels as a JSON string in the `resume_data` field.
#[derive(Clone, Debug)]
pub struct AnswerRequest {
    pub session_id: Option<String>,
    pub user_name: String,
    pub difficulty: Difficulty,
    pub voice_name: Option<String>,
    pub resume_data: Resume,
    pub current_question: String,
    pub user_answer: Option<String>,
    pub audio_file: Option<AnswerAudio>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub status: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub next_question: Option<String>,
    #[serde(default)]
    pub audio_base64: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StopRequest {
    pub session_id: String,
    pub user_name: String,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StopResponse {
    pub status: String,
    #[serde(default)]
    pub evaluation: Option<crate::models::report::Evaluation>,
    #[serde(default)]
    pub report: Option<serde_json::Value>,
    #[serde(default)]
    pub roadmap: Option<crate::models::report::Roadmap>,
    #[serde(default)]
    pub farewell_audio_base64: Option<String>,
    #[serde(default)]
    pub farewell_audio_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("Easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!(" hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn difficulty_round_trips_through_serde() {
        let json = serde_json::to_string(&Difficulty::Hard).unwrap();
        assert_eq!(json, "\"hard\"");
        let back: Difficulty = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Difficulty::Hard);
    }

    #[test]
    fn turn_omits_absent_media_fields() {
        let turn = Turn::new("Tell me about yourself", "I build backends");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(!json.contains("audio_url"));
        assert!(!json.contains("video_url"));
    }

    #[test]
    fn answer_response_tolerates_sparse_payloads() {
        let json = r#"{"status":"error","message":"session expired"}"#;
        let resp: AnswerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, "error");
        assert_eq!(resp.message.as_deref(), Some("session expired"));
        assert!(resp.session_id.is_none());
    }

    #[test]
    fn stop_request_skips_missing_role() {
        let req = StopRequest {
            session_id: "s-1".to_string(),
            user_name: "Ada".to_string(),
            difficulty: Difficulty::Medium,
            role: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("role"));
        assert!(json.contains("\"difficulty\":\"medium\""));
    }
}
