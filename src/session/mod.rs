use crate::api::{ ApiError, BackendClient };
use crate::models::interview::{
    AnswerAudio,
    AnswerRequest,
    Difficulty,
    StopRequest,
    StopResponse,
    Turn,
};
use crate::models::resume::Resume;
use log::{ error, info, warn };
use std::error::Error;
use std::fmt;

/// History entry recorded for a voice answer before any transcript exists.
pub const VOICE_ANSWER_PLACEHOLDER: &str = "[Voice Answer - Processing...]";

/// Sentinel question sent to obtain question #1.
const START_QUESTION: &str = "start";
const START_ANSWER: &str = "Ready to begin";
const FIRST_QUESTION_FALLBACK: &str = "Please introduce yourself";

/// Turn-taking states of one interview session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterviewStage {
    Idle,
    AwaitingFirstQuestion,
    QuestionDisplayed,
    AwaitingAnswerSubmission,
    Finished,
}

#[derive(Debug)]
pub enum SessionError {
    MissingResume,
    NotStarted,
    Busy,
    AlreadyFinished,
    EmptyAnswer,
    EmptyRecording,
    Backend {
        message: String,
    },
    Api(ApiError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::MissingResume => {
                write!(f, "Resume data not found. Please go back and upload your resume.")
            }
            SessionError::NotStarted => {
                write!(f, "Session not initialized. Please refresh and try again.")
            }
            SessionError::Busy => write!(f, "Another request is already in flight"),
            SessionError::AlreadyFinished => write!(f, "The interview has already finished"),
            SessionError::EmptyAnswer => {
                write!(f, "Please enter your answer before sending.")
            }
            SessionError::EmptyRecording => {
                write!(f, "No audio recorded. Please try recording again.")
            }
            SessionError::Backend { message } => write!(f, "{}", message),
            SessionError::Api(e) => write!(f, "{}", e),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Api(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        SessionError::Api(err)
    }
}

/// Result of one answer submission.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    NextQuestion(String),
    Finished {
        message: Option<String>,
    },
}

/// Media delivered with the most recent question, for playback or saving.
#[derive(Clone, Debug, Default)]
pub struct TurnMedia {
    pub audio_base64: Option<String>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
}

impl TurnMedia {
    fn from_response(
        audio_base64: Option<String>,
        audio_url: Option<String>,
        video_url: Option<String>
    ) -> Option<Self> {
        if audio_base64.is_none() && audio_url.is_none() && video_url.is_none() {
            return None;
        }
        Some(Self {
            audio_base64,
            audio_url,
            video_url,
        })
    }
}

/// One interview from the sentinel start turn to the finished report.
///
/// The machine walks `Idle -> AwaitingFirstQuestion -> QuestionDisplayed ->
/// AwaitingAnswerSubmission -> QuestionDisplayed | Finished`. History grows
/// optimistically: the pending turn is appended before the request goes out
/// and stays there even if the request fails.
pub struct InterviewSession {
    user_name: String,
    difficulty: Difficulty,
    voice_name: Option<String>,
    resume: Option<Resume>,
    session_id: Option<String>,
    current_question: Option<String>,
    current_media: Option<TurnMedia>,
    history: Vec<Turn>,
    stage: InterviewStage,
    started: bool,
    busy: bool,
    finish_notified: bool,
}

impl InterviewSession {
    pub fn new(
        user_name: impl Into<String>,
        difficulty: Difficulty,
        voice_name: Option<String>
    ) -> Self {
        Self {
            user_name: user_name.into(),
            difficulty,
            voice_name,
            resume: None,
            session_id: None,
            current_question: None,
            current_media: None,
            history: Vec::new(),
            stage: InterviewStage::Idle,
            started: false,
            busy: false,
            finish_notified: false,
        }
    }

    pub fn set_resume(&mut self, resume: Resume) {
        self.resume = Some(resume);
    }

    pub fn stage(&self) -> InterviewStage {
        self.stage
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn current_question(&self) -> Option<&str> {
        self.current_question.as_deref()
    }

    pub fn current_media(&self) -> Option<&TurnMedia> {
        self.current_media.as_ref()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Requests question #1 with the sentinel start turn. The one-shot latch
    /// makes a duplicate invocation a no-op; it is set before anything else,
    /// so even a failed start is never retried implicitly.
    pub async fn start(&mut self, api: &BackendClient) -> Result<Option<String>, SessionError> {
        if self.started {
            warn!("Interview start requested twice; ignoring the duplicate");
            return Ok(None);
        }
        self.started = true;

        let resume = match &self.resume {
            Some(resume) => resume.clone(),
            None => {
                return Err(SessionError::MissingResume);
            }
        };

        self.stage = InterviewStage::AwaitingFirstQuestion;
        self.busy = true;
        info!("Starting interview for '{}' ({} difficulty)", self.user_name, self.difficulty);

        let request = AnswerRequest {
            session_id: None,
            user_name: self.user_name.clone(),
            difficulty: self.difficulty,
            voice_name: self.voice_name.clone(),
            resume_data: resume,
            current_question: START_QUESTION.to_string(),
            user_answer: Some(START_ANSWER.to_string()),
            audio_file: None,
        };
        let result = api.send_answer(&request).await;
        self.busy = false;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.stage = InterviewStage::Idle;
                error!("Error starting interview: {}", e);
                return Err(SessionError::Api(e));
            }
        };

        if response.status == "error" {
            self.stage = InterviewStage::Idle;
            let message = response.message.unwrap_or_else(||
                "Failed to start interview".to_string()
            );
            error!("Backend refused to start interview: {}", message);
            return Err(SessionError::Backend { message });
        }

        if let Some(session_id) = response.session_id {
            info!("Interview session created: {}", session_id);
            self.session_id = Some(session_id);
        }

        let question = response.next_question
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| FIRST_QUESTION_FALLBACK.to_string());
        self.current_media = TurnMedia::from_response(
            response.audio_base64,
            response.audio_url,
            response.video_url
        );
        self.current_question = Some(question.clone());
        self.stage = InterviewStage::QuestionDisplayed;
        Ok(Some(question))
    }

    /// Submits a typed answer and advances to the next question or finishes.
    pub async fn submit_text_answer(
        &mut self,
        api: &BackendClient,
        answer: &str
    ) -> Result<TurnOutcome, SessionError> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(SessionError::EmptyAnswer);
        }
        self.submit(api, answer.to_string(), None).await
    }

    /// Submits a recorded answer blob. The history entry gets a placeholder
    /// text because no transcript exists yet.
    pub async fn submit_voice_answer(
        &mut self,
        api: &BackendClient,
        audio: AnswerAudio
    ) -> Result<TurnOutcome, SessionError> {
        if audio.bytes.is_empty() {
            return Err(SessionError::EmptyRecording);
        }
        self.submit(api, VOICE_ANSWER_PLACEHOLDER.to_string(), Some(audio)).await
    }

    async fn submit(
        &mut self,
        api: &BackendClient,
        answer_text: String,
        audio: Option<AnswerAudio>
    ) -> Result<TurnOutcome, SessionError> {
        if self.stage == InterviewStage::Finished {
            return Err(SessionError::AlreadyFinished);
        }
        if self.busy {
            return Err(SessionError::Busy);
        }
        let (session_id, resume, question) = match (
            &self.session_id,
            &self.resume,
            &self.current_question,
        ) {
            (Some(session_id), Some(resume), Some(question)) => {
                (session_id.clone(), resume.clone(), question.clone())
            }
            _ => {
                return Err(SessionError::NotStarted);
            }
        };

        // Optimistic append: the pending turn lands in history before the
        // request and is kept even when the request fails.
        let mut turn = Turn::new(question.clone(), answer_text.clone());
        if let Some(media) = &self.current_media {
            turn.audio_url = media.audio_url.clone();
            turn.video_url = media.video_url.clone();
        }
        self.history.push(turn);

        self.stage = InterviewStage::AwaitingAnswerSubmission;
        self.busy = true;

        let sends_audio = audio.is_some();
        let request = AnswerRequest {
            session_id: Some(session_id),
            user_name: self.user_name.clone(),
            difficulty: self.difficulty,
            voice_name: self.voice_name.clone(),
            resume_data: resume,
            current_question: question,
            user_answer: if sends_audio {
                None
            } else {
                Some(answer_text)
            },
            audio_file: audio,
        };
        let result = api.send_answer(&request).await;
        self.busy = false;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                // single attempt per user action: hand the question back for
                // a manual retry
                self.stage = InterviewStage::QuestionDisplayed;
                error!("Error sending answer: {}", e);
                return Err(SessionError::Api(e));
            }
        };

        if response.status == "finished" {
            info!("Interview completed! Preparing your results...");
            self.stage = InterviewStage::Finished;
            return Ok(TurnOutcome::Finished { message: response.message });
        }

        if response.status == "error" {
            self.stage = InterviewStage::QuestionDisplayed;
            let message = response.message.unwrap_or_else(|| {
                if sends_audio {
                    "Failed to process voice answer".to_string()
                } else {
                    "Failed to process answer".to_string()
                }
            });
            error!("Backend rejected answer: {}", message);
            return Err(SessionError::Backend { message });
        }

        let next_question = response.next_question.unwrap_or_default();
        self.current_media = TurnMedia::from_response(
            response.audio_base64,
            response.audio_url,
            response.video_url
        );
        self.current_question = Some(next_question.clone());
        self.stage = InterviewStage::QuestionDisplayed;
        Ok(TurnOutcome::NextQuestion(next_question))
    }

    /// True exactly once after the session reaches `Finished`; the caller
    /// moves to the results stage on that first true.
    pub fn take_finish_event(&mut self) -> bool {
        if self.stage == InterviewStage::Finished && !self.finish_notified {
            self.finish_notified = true;
            return true;
        }
        false
    }

    /// Ends the interview and fetches the evaluation bundle. A failed stop is
    /// logged and swallowed: the flow still proceeds to results, which then
    /// fall back to locally assembled scores.
    pub async fn stop(&mut self, api: &BackendClient) -> Result<Option<StopResponse>, SessionError> {
        let session_id = match &self.session_id {
            Some(session_id) => session_id.clone(),
            None => {
                return Ok(None);
            }
        };

        let role = self.resume.as_ref().map(|resume| resume.role_hint());
        let request = StopRequest {
            session_id,
            user_name: self.user_name.clone(),
            difficulty: self.difficulty,
            role,
        };

        self.busy = true;
        let result = api.stop_interview(&request).await;
        self.busy = false;
        self.stage = InterviewStage::Finished;

        match result {
            Ok(response) => Ok(Some(response)),
            Err(e) => {
                warn!("Failed to end interview properly. Redirecting to results... ({})", e);
                Ok(None)
            }
        }
    }

    /// Clears everything back to a fresh, unstarted session.
    pub fn reset(&mut self) {
        self.resume = None;
        self.session_id = None;
        self.current_question = None;
        self.current_media = None;
        self.history.clear();
        self.stage = InterviewStage::Idle;
        self.started = false;
        self.busy = false;
        self.finish_notified = false;
    }
}
