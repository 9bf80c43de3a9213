use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Base URL of the interview backend REST API.
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:8000")]
    pub backend_url: String,

    /// WebSocket endpoint of the streaming transcription relay.
    #[arg(long, env = "TRANSCRIBE_WS_URL", default_value = "ws://localhost:8000/ws/audio")]
    pub transcribe_ws_url: String,

    // --- Candidate Args ---
    /// Candidate name. Defaults to a name derived from the resume file name.
    #[arg(long, env = "USER_NAME")]
    pub user_name: Option<String>,

    /// Path to the resume file (PDF or DOCX) uploaded before the interview.
    #[arg(long, env = "RESUME_PATH")]
    pub resume: Option<PathBuf>,

    /// Interview difficulty (easy, medium, hard).
    #[arg(long, env = "DIFFICULTY", default_value = "medium")]
    pub difficulty: String,

    /// Interviewer voice/avatar persona.
    #[arg(long, env = "VOICE_NAME", default_value = "Sia")]
    pub voice: String,

    // --- Answer Input Args ---
    /// Read answers from this file, one per line, instead of stdin.
    /// Lines starting with `@` name an audio file to send as a voice answer.
    #[arg(long, env = "ANSWERS_PATH")]
    pub answers: Option<PathBuf>,

    /// Stream `@file.wav` voice answers over the transcription socket and
    /// submit the transcript, instead of uploading the raw recording.
    #[arg(long, env = "STREAM_VOICE", default_value = "false")]
    pub stream_voice: bool,

    // --- Output Args ---
    /// Directory where reports and saved media land.
    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    // --- Standalone Modes ---
    /// Fetch the stored report for a session id and exit.
    #[arg(long, env = "FETCH_REPORT")]
    pub fetch_report: Option<String>,

    /// List stored reports for the candidate and exit.
    #[arg(long, env = "LIST_REPORTS", default_value = "false")]
    pub list_reports: bool,

    /// Transcribe a WAV file over the streaming socket and exit.
    #[arg(long, env = "TRANSCRIBE_WAV")]
    pub transcribe: Option<PathBuf>,
}
