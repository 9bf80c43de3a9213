pub mod cli;
pub mod models;
pub mod api;
pub mod audio;
pub mod transcribe;
pub mod session;
pub mod report;
pub mod store;

use api::BackendClient;
use chrono::Utc;
use cli::Args;
use futures::{ Stream, StreamExt };
use log::{ error, info, warn };
use models::interview::{ AnswerAudio, Difficulty };
use session::{ InterviewSession, InterviewStage, TurnMedia, TurnOutcome };
use std::error::Error;
use std::io::Write as _;
use std::path::Path;
use std::pin::Pin;
use store::{ ScratchReport, ScratchStore };
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio_stream::wrappers::LinesStream;
use uuid::Uuid;

type AnswerFeed = Pin<Box<dyn Stream<Item = std::io::Result<String>> + Send>>;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let difficulty: Difficulty = args.difficulty.parse()?;

    info!("--- Core Configuration ---");
    info!("Backend URL: {}", args.backend_url);
    info!("Transcription WS URL: {}", args.transcribe_ws_url);
    info!("Difficulty: {}", difficulty);
    info!("Voice: {}", args.voice);
    info!("Stream Voice Answers: {}", args.stream_voice);
    info!("Output Directory: {}", args.output_dir.display());
    info!("-------------------------");

    if let Some(wav) = &args.transcribe {
        return transcribe_only(&args, wav).await;
    }
    if let Some(session_id) = &args.fetch_report {
        return fetch_report(&args, session_id).await;
    }
    if args.list_reports {
        return list_reports(&args).await;
    }
    run_interview(&args, difficulty).await
}

/// Streams one WAV file over the transcription socket and prints the result.
async fn transcribe_only(args: &Args, wav: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
    let source = audio::wav_source(wav, audio::CaptureConstraints::default()).await?;
    let transcript = transcribe::stream_source_to_transcript(
        &args.transcribe_ws_url,
        source
    ).await?;
    println!("{}", transcript);
    Ok(())
}

/// Fetches one stored report; falls back to the local snapshot when the
/// backend cannot serve it.
async fn fetch_report(args: &Args, session_id: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let api = BackendClient::new(&args.backend_url);
    match api.get_report(session_id).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            warn!("Backend report fetch failed: {}", e);
            let store = ScratchStore::default_location();
            match store.load(session_id) {
                Some(snapshot) => {
                    info!("Showing local snapshot for session {}", session_id);
                    println!("{}", serde_json::to_string_pretty(&snapshot)?);
                    Ok(())
                }
                None => Err(Box::new(e)),
            }
        }
    }
}

/// Lists backend reports for the candidate (when a name is known) and the
/// local snapshots.
async fn list_reports(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Some(user_name) = &args.user_name {
        let api = BackendClient::new(&args.backend_url);
        match api.get_user_reports(user_name).await {
            Ok(reports) => {
                println!("Backend reports for {}: {}", user_name, reports.len());
                for report in &reports {
                    let session = report["session_id"].as_str().unwrap_or("?");
                    println!("  {}", session);
                }
            }
            Err(e) => {
                warn!("Could not list backend reports: {}", e);
            }
        }
    } else {
        info!("No candidate name given; listing local snapshots only");
    }

    let store = ScratchStore::default_location();
    let snapshots = store.list();
    println!("Local snapshots: {}", snapshots.len());
    for snapshot in &snapshots {
        println!(
            "  {}  {}  {}  {}/{} answered",
            snapshot.session_id,
            snapshot.completed_at.format("%Y-%m-%d %H:%M"),
            snapshot.user_name,
            snapshot.questions_answered,
            snapshot.total_questions
        );
    }
    Ok(())
}

async fn open_answer_feed(path: Option<&Path>) -> Result<AnswerFeed, std::io::Error> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            let lines = BufReader::new(file).lines();
            Ok(Box::pin(LinesStream::new(lines)))
        }
        None => {
            let lines = BufReader::new(tokio::io::stdin()).lines();
            Ok(Box::pin(LinesStream::new(lines)))
        }
    }
}

fn announce_question(no: usize, question: &str, media: Option<&TurnMedia>, output_dir: &Path) {
    println!();
    println!("Q{}: {}", no, question);
    if let Some(media) = media {
        if let Some(url) = &media.video_url {
            info!("Question video: {}", url);
        }
        if let Some(url) = &media.audio_url {
            info!("Question audio: {}", url);
        }
        if let Some(audio) = &media.audio_base64 {
            match report::save_audio_base64(output_dir, &format!("question-{}.mp3", no), audio) {
                Ok(path) => info!("Question audio saved to {}", path.display()),
                Err(e) => warn!("Could not save question audio: {}", e),
            }
        }
    }
}

/// The full upload -> setup -> interview -> results flow.
async fn run_interview(
    args: &Args,
    difficulty: Difficulty
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let resume_path = args.resume
        .as_deref()
        .ok_or("a resume file is required to start an interview (--resume)")?;

    let api = BackendClient::new(&args.backend_url);

    info!("Uploading resume {}", resume_path.display());
    let resume = api.upload_resume(resume_path).await?;
    info!("Resume uploaded: {} ({} skills detected)", resume.filename, resume.skills.len());

    // setup: presenter list is advisory, the configured voice is the default
    let voice_name = match api.get_voices().await {
        Ok(voices) if !voices.is_empty() => {
            let names: Vec<&str> = voices
                .iter()
                .map(|v| v.name.as_str())
                .collect();
            info!("Available voices: {}", names.join(", "));
            if names.contains(&args.voice.as_str()) {
                args.voice.clone()
            } else {
                info!("Voice '{}' not offered, using '{}'", args.voice, voices[0].name);
                voices[0].name.clone()
            }
        }
        Ok(_) => args.voice.clone(),
        Err(e) => {
            warn!("Error loading presenter info: {}", e);
            args.voice.clone()
        }
    };

    let user_name = match &args.user_name {
        Some(name) if !name.trim().is_empty() => name.clone(),
        _ =>
            match resume.candidate_name() {
                Some(name) => {
                    info!("Using candidate name from resume: {}", name);
                    name
                }
                None => "Candidate".to_string(),
            }
    };

    let mut session = InterviewSession::new(user_name.clone(), difficulty, Some(voice_name));
    session.set_resume(resume);

    let mut question_no = 1;
    match session.start(&api).await? {
        Some(question) => {
            announce_question(question_no, &question, session.current_media(), &args.output_dir);
        }
        None => {
            return Err("interview could not be started".into());
        }
    }

    let interactive = args.answers.is_none();
    if interactive {
        println!(
            "Type your answer and press Enter. Use @path/to/file.wav for a voice answer, /end to finish."
        );
    }
    let mut feed = open_answer_feed(args.answers.as_deref()).await?;

    while session.stage() != InterviewStage::Finished {
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }
        let line = match feed.next().await {
            Some(line) => line?,
            None => {
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/end" {
            break;
        }
        if !interactive {
            println!("> {}", line);
        }

        let outcome = if let Some(raw) = line.strip_prefix('@') {
            submit_voice_line(&mut session, &api, args, Path::new(raw.trim())).await
        } else {
            session.submit_text_answer(&api, line).await.map_err(Into::into)
        };

        match outcome {
            Ok(TurnOutcome::NextQuestion(question)) => {
                question_no += 1;
                announce_question(
                    question_no,
                    &question,
                    session.current_media(),
                    &args.output_dir
                );
            }
            Ok(TurnOutcome::Finished { message }) => {
                if let Some(message) = message {
                    info!("{}", message);
                }
                break;
            }
            Err(e) => {
                // the alert analog: tell the user, keep the question up
                eprintln!("{}", e);
            }
        }
    }

    let finished_by_backend = session.take_finish_event();
    let questions_answered = session.history().len();
    let total_questions = if finished_by_backend {
        questions_answered
    } else {
        questions_answered + 1
    };

    info!("Interview completed! Preparing your results...");
    let stop = session.stop(&api).await?;
    let session_id = session
        .session_id()
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let store = ScratchStore::default_location();
    println!();
    println!("Interview Complete!");

    match stop {
        Some(stop) => {
            if let Some(evaluation) = &stop.evaluation {
                println!("Overall Score: {:.1}", evaluation.average_score());
                println!("  Technical: {}/10", evaluation.technical);
                println!("  Communication: {}/10", evaluation.communication);
                println!("  Confidence: {}/10", evaluation.confidence);
                println!("  Professionalism: {}/10", evaluation.professionalism);
            }
            if let Some(roadmap) = &stop.roadmap {
                if !roadmap.focus_areas.is_empty() {
                    println!("Focus Areas:");
                    for area in &roadmap.focus_areas {
                        println!("  - {}", area);
                    }
                }
            }

            let text = report::render_evaluation_report(
                &user_name,
                difficulty,
                stop.evaluation.as_ref(),
                stop.roadmap.as_ref()
            );
            let file_name = report::evaluation_report_file(&user_name);

            if let Some(audio) = &stop.farewell_audio_base64 {
                if let Err(e) = report::save_farewell_audio(&args.output_dir, &session_id, audio) {
                    warn!("Could not save farewell audio: {}", e);
                }
            }
            if let Some(url) = &stop.farewell_audio_url {
                info!("Farewell audio available at {}", url);
            }

            // snapshot before the export so a failed write cannot cost the
            // local copy
            let snapshot = ScratchReport {
                session_id,
                user_name,
                completed_at: Utc::now(),
                questions_answered,
                total_questions,
                evaluation: stop.evaluation,
                roadmap: stop.roadmap,
                report: stop.report,
            };
            store.save(&snapshot);

            report::write_text_report(&args.output_dir, &file_name, &text)?;
        }
        None => {
            // no backend results: assemble the indicative local scorecard
            warn!("Could not load results. Some data may be missing.");
            let fabricated = report::fabricate_report(
                &session_id,
                &user_name,
                questions_answered,
                total_questions
            );
            println!("Overall Score: {}%", fabricated.overall_score);

            let text = report::render_performance_report(&fabricated);
            let file_name = report::performance_report_file(&session_id);

            let snapshot = ScratchReport {
                session_id,
                user_name,
                completed_at: Utc::now(),
                questions_answered,
                total_questions,
                evaluation: None,
                roadmap: None,
                report: None,
            };
            store.save(&snapshot);

            report::write_text_report(&args.output_dir, &file_name, &text)?;
        }
    }

    Ok(())
}

/// One `@file` answer line: either stream the WAV for a transcript and submit
/// it as text, or upload the raw recording as the answer blob.
async fn submit_voice_line(
    session: &mut InterviewSession,
    api: &BackendClient,
    args: &Args,
    path: &Path
) -> Result<TurnOutcome, Box<dyn Error + Send + Sync>> {
    if args.stream_voice {
        let source = audio::wav_source(path, audio::CaptureConstraints::default()).await?;
        let transcript = transcribe::stream_source_to_transcript(
            &args.transcribe_ws_url,
            source
        ).await?;
        info!("Transcript: {}", transcript);
        session.submit_text_answer(api, &transcript).await.map_err(Into::into)
    } else {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Could not read recording {}: {}", path.display(), e);
                return Err(Box::new(e));
            }
        };
        let audio = AnswerAudio {
            filename: "answer.webm".to_string(),
            bytes,
        };
        session.submit_voice_answer(api, audio).await.map_err(Into::into)
    }
}
