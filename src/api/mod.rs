use crate::models::interview::{ AnswerRequest, AnswerResponse, StopRequest, StopResponse, Voice };
use crate::models::report::FullReport;
use crate::models::resume::Resume;
use log::warn;
use reqwest::multipart;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::path::Path;

/// Message shown when a resume file is not a PDF or DOCX. Checked before any
/// request goes out.
pub const RESUME_TYPE_ERROR: &str = "Please upload a PDF or DOCX file";

#[derive(Debug)]
pub enum ApiError {
    UnsupportedResumeType,
    Backend {
        status: String,
        message: String,
    },
    Http(reqwest::Error),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::UnsupportedResumeType => write!(f, "{}", RESUME_TYPE_ERROR),
            ApiError::Backend { status, message } => {
                write!(f, "Backend returned status '{}': {}", status, message)
            }
            ApiError::Http(e) => write!(f, "HTTP request failed: {}", e),
            ApiError::Json(e) => write!(f, "Payload serialization error: {}", e),
            ApiError::Io(e) => write!(f, "File IO error: {}", e),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiError::Http(e) => Some(e),
            ApiError::Json(e) => Some(e),
            ApiError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Http(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Json(err)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(err)
    }
}

/// Client-side gate for resume uploads. The browser build checked MIME types;
/// here the file extension decides.
pub fn is_supported_resume(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            let ext = ext.to_lowercase();
            ext == "pdf" || ext == "docx"
        }
        None => false,
    }
}

#[derive(Deserialize)]
struct UploadEnvelope {
    status: String,
    #[serde(default)]
    data: Option<Resume>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct VoicesEnvelope {
    #[serde(default)]
    #[allow(dead_code)]
    status: Option<String>,
    #[serde(default)]
    voices: Vec<Voice>,
    // older backend revisions expose a single fixed presenter instead
    #[serde(default)]
    presenter: Option<String>,
    #[serde(default)]
    voice: Option<String>,
}

#[derive(Deserialize)]
struct ReportsEnvelope {
    status: String,
    #[serde(default)]
    reports: Vec<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// REST client for the interview backend. One instance per process; all
/// methods are single-attempt, errors bubble to the caller for manual retry.
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: HttpClient,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: HttpClient::new(),
            base_url,
        }
    }

    /// `POST /api/resume/upload`. Validates the file extension before reading
    /// or sending anything, then unwraps the `{status, data}` envelope.
    pub async fn upload_resume(&self, path: &Path) -> Result<Resume, ApiError> {
        if !is_supported_resume(path) {
            return Err(ApiError::UnsupportedResumeType);
        }

        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("resume.pdf")
            .to_string();
        let part = multipart::Part::bytes(bytes).file_name(filename);
        let form = multipart::Form::new().part("file", part);

        let url = format!("{}/api/resume/upload", self.base_url);
        let resp = self.http.post(&url).multipart(form).send().await?.error_for_status()?;
        let envelope = resp.json::<UploadEnvelope>().await?;

        if envelope.status == "success" {
            envelope.data.ok_or_else(|| ApiError::Backend {
                status: "success".to_string(),
                message: "Upload succeeded but no resume data was returned".to_string(),
            })
        } else {
            Err(ApiError::Backend {
                status: envelope.status,
                message: envelope.message.unwrap_or_else(|| "Failed to upload resume".to_string()),
            })
        }
    }

    /// `GET /api/interview/voices`. A missing or empty voice list is normal;
    /// a backend running with a single fixed presenter reports it as one
    /// voice here.
    pub async fn get_voices(&self) -> Result<Vec<Voice>, ApiError> {
        let url = format!("{}/api/interview/voices", self.base_url);
        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let envelope = resp.json::<VoicesEnvelope>().await?;

        if envelope.voices.is_empty() {
            if let Some(presenter) = envelope.presenter {
                return Ok(
                    vec![Voice {
                        id: None,
                        name: presenter,
                        style: envelope.voice,
                        gender: None,
                        avatar: None,
                    }]
                );
            }
        }
        Ok(envelope.voices)
    }

    /// `POST /api/interview/answer`. Multipart: optional fields are simply
    /// left off the form, matching what the backend expects.
    pub async fn send_answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, ApiError> {
        let resume_json = serde_json::to_string(&request.resume_data)?;

        let mut form = multipart::Form::new();
        if let Some(session_id) = &request.session_id {
            form = form.text("session_id", session_id.clone());
        }
        form = form
            .text("user_name", request.user_name.clone())
            .text("difficulty", request.difficulty.as_str());
        if let Some(voice_name) = &request.voice_name {
            form = form.text("voice_name", voice_name.clone());
        }
        form = form
            .text("resume_data", resume_json)
            .text("current_question", request.current_question.clone());
        if let Some(user_answer) = &request.user_answer {
            form = form.text("user_answer", user_answer.clone());
        }
        if let Some(audio) = &request.audio_file {
            let part = multipart::Part
                ::bytes(audio.bytes.clone())
                .file_name(audio.filename.clone())
                .mime_str("audio/webm")?;
            form = form.part("audio_file", part);
        }

        let url = format!("{}/api/interview/answer", self.base_url);
        let resp = self.http.post(&url).multipart(form).send().await?.error_for_status()?;
        let data = resp.json::<AnswerResponse>().await?;
        Ok(data)
    }

    /// `POST /api/interview/stop`. Plain JSON body, returns the final
    /// evaluation/report/roadmap bundle.
    pub async fn stop_interview(&self, request: &StopRequest) -> Result<StopResponse, ApiError> {
        let url = format!("{}/api/interview/stop", self.base_url);
        let resp = self.http.post(&url).json(request).send().await?.error_for_status()?;
        let data = resp.json::<StopResponse>().await?;
        Ok(data)
    }

    /// `GET /api/report/{session_id}`.
    pub async fn get_report(&self, session_id: &str) -> Result<FullReport, ApiError> {
        let url = format!("{}/api/report/{}", self.base_url, session_id);
        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let report = resp.json::<FullReport>().await?;

        if report.status == "success" {
            Ok(report)
        } else {
            Err(ApiError::Backend {
                status: report.status.clone(),
                message: report.message
                    .clone()
                    .unwrap_or_else(|| "Failed to fetch report".to_string()),
            })
        }
    }

    /// `GET /api/reports/{user_name}`. Report summaries stay opaque JSON; the
    /// caller only lists them.
    pub async fn get_user_reports(
        &self,
        user_name: &str
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        let url = format!("{}/api/reports/{}", self.base_url, user_name);
        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let envelope = resp.json::<ReportsEnvelope>().await?;

        if envelope.status == "success" {
            Ok(envelope.reports)
        } else {
            warn!("Report listing for '{}' returned status '{}'", user_name, envelope.status);
            Err(ApiError::Backend {
                status: envelope.status,
                message: envelope.message
                    .unwrap_or_else(|| "Failed to fetch user reports".to_string()),
            })
        }
    }
}
