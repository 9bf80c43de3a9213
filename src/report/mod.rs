use crate::models::interview::Difficulty;
use crate::models::report::{ Evaluation, Roadmap };
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{ DateTime, Utc };
use log::info;
use once_cell::sync::Lazy;
use rand::Rng;
use std::error::Error;
use std::fmt;
use std::fmt::Write as _;
use std::path::{ Path, PathBuf };

pub const REPORT_TITLE: &str = "AI Mock Interview Report";

#[derive(Debug)]
pub enum ReportError {
    Io(std::io::Error),
    Audio(base64::DecodeError),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Io(e) => write!(f, "Report I/O error: {}", e),
            ReportError::Audio(e) => write!(f, "Farewell audio decode error: {}", e),
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReportError::Io(e) => Some(e),
            ReportError::Audio(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::Io(err)
    }
}

impl From<base64::DecodeError> for ReportError {
    fn from(err: base64::DecodeError) -> Self {
        ReportError::Audio(err)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecommendationKind {
    Strength,
    Improvement,
    Critical,
}

#[derive(Clone, Debug)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub title: &'static str,
    pub description: &'static str,
}

/// Locally assembled scorecard, used whenever the backend evaluation is
/// unavailable so a finished interview always produces a report.
#[derive(Clone, Debug)]
pub struct PerformanceReport {
    pub session_id: String,
    pub candidate_name: String,
    pub completed_at: DateTime<Utc>,
    pub questions_answered: usize,
    pub total_questions: usize,
    pub overall_score: u8,
    pub confidence: u8,
    pub communication: u8,
    pub technical_knowledge: u8,
    pub professionalism: u8,
    pub recommendations: Vec<Recommendation>,
}

/// The four canned analysis entries attached to a locally assembled report.
static RECOMMENDATIONS: Lazy<Vec<Recommendation>> = Lazy::new(|| {
    vec![
        Recommendation {
            kind: RecommendationKind::Strength,
            title: "Strong Technical Knowledge",
            description: "Demonstrated excellent understanding of React, Node.js, and modern web development practices. Provided detailed examples from previous projects.",
        },
        Recommendation {
            kind: RecommendationKind::Strength,
            title: "Clear Communication",
            description: "Articulated thoughts clearly and provided structured responses to behavioral questions. Good use of the STAR method.",
        },
        Recommendation {
            kind: RecommendationKind::Improvement,
            title: "Confidence in Presentation",
            description: "Could benefit from speaking with more confidence, especially when discussing achievements. Practice presenting accomplishments more assertively.",
        },
        Recommendation {
            kind: RecommendationKind::Improvement,
            title: "Industry Knowledge",
            description: "Consider staying more updated with the latest industry trends and emerging technologies to demonstrate continuous learning.",
        }
    ]
});

pub fn default_recommendations() -> Vec<Recommendation> {
    RECOMMENDATIONS.clone()
}

/// Draws the indicative score bands: overall, confidence and professionalism
/// land in 75-94, communication in 70-89, technical knowledge in 80-99.
pub fn fabricate_report(
    session_id: &str,
    candidate_name: &str,
    questions_answered: usize,
    total_questions: usize
) -> PerformanceReport {
    let mut rng = rand::thread_rng();
    PerformanceReport {
        session_id: session_id.to_string(),
        candidate_name: candidate_name.to_string(),
        completed_at: Utc::now(),
        questions_answered,
        total_questions,
        overall_score: rng.gen_range(75..95),
        confidence: rng.gen_range(75..95),
        communication: rng.gen_range(70..90),
        technical_knowledge: rng.gen_range(80..100),
        professionalism: rng.gen_range(75..95),
        recommendations: default_recommendations(),
    }
}

/// Plain-text rendering of a locally assembled report.
pub fn render_performance_report(report: &PerformanceReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Interview Report - {}", report.candidate_name);
    let _ = writeln!(out, "Session ID: {}", report.session_id);
    let _ = writeln!(out, "Overall Score: {}%", report.overall_score);
    let _ = writeln!(out, "Completed: {}", report.completed_at.format("%-m/%-d/%Y"));
    out.push('\n');
    out.push_str("Performance Scores:\n");
    let _ = writeln!(out, "- Confidence: {}%", report.confidence);
    let _ = writeln!(out, "- Communication: {}%", report.communication);
    let _ = writeln!(out, "- Technical Knowledge: {}%", report.technical_knowledge);
    let _ = writeln!(out, "- Professionalism: {}%", report.professionalism);
    out.push('\n');
    out.push_str("Recommendations:\n");
    for rec in &report.recommendations {
        let _ = writeln!(out, "- {}: {}", rec.title, rec.description);
    }
    out
}

/// Plain-text rendering of the backend evaluation plus learning roadmap.
/// Only the top five roadmap focus areas are listed.
pub fn render_evaluation_report(
    user_name: &str,
    difficulty: Difficulty,
    evaluation: Option<&Evaluation>,
    roadmap: Option<&Roadmap>
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", REPORT_TITLE);
    out.push('\n');
    let _ = writeln!(out, "Candidate: {}", user_name);
    let _ = writeln!(out, "Difficulty: {}", difficulty.as_str().to_uppercase());
    let _ = writeln!(out, "Date: {}", Utc::now().format("%-m/%-d/%Y"));

    if let Some(evaluation) = evaluation {
        out.push('\n');
        out.push_str("Evaluation Scores\n");
        let _ = writeln!(out, "  Technical: {}/10", evaluation.technical);
        let _ = writeln!(out, "  Communication: {}/10", evaluation.communication);
        let _ = writeln!(out, "  Confidence: {}/10", evaluation.confidence);
        let _ = writeln!(out, "  Professionalism: {}/10", evaluation.professionalism);
    }

    if let Some(roadmap) = roadmap {
        out.push('\n');
        out.push_str("Learning Roadmap\n");
        for (i, area) in roadmap.focus_areas.iter().take(5).enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, area);
        }
    }

    out
}

/// File name for a locally assembled report, keyed by session.
pub fn performance_report_file(session_id: &str) -> String {
    format!("interview-report-{}.txt", session_id)
}

/// File name for an evaluation report, keyed by candidate with whitespace
/// collapsed to dashes.
pub fn evaluation_report_file(user_name: &str) -> String {
    let dashed = user_name.split_whitespace().collect::<Vec<_>>().join("-");
    format!("interview-report-{}.txt", dashed)
}

/// Writes a rendered report under `dir`, creating the directory if needed,
/// and returns the full path.
pub fn write_text_report(
    dir: &Path,
    file_name: &str,
    contents: &str
) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, contents)?;
    info!("Report saved to {}", path.display());
    Ok(path)
}

/// Decodes an inline base64 audio payload to a file under `dir`, creating the
/// directory if needed.
pub fn save_audio_base64(
    dir: &Path,
    file_name: &str,
    audio_base64: &str
) -> Result<PathBuf, ReportError> {
    let bytes = BASE64_STANDARD.decode(audio_base64)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}

/// Saves the farewell audio a stop response carries as
/// `farewell-<session>.mp3` under `dir`.
pub fn save_farewell_audio(
    dir: &Path,
    session_id: &str,
    audio_base64: &str
) -> Result<PathBuf, ReportError> {
    let path = save_audio_base64(dir, &format!("farewell-{}.mp3", session_id), audio_base64)?;
    info!("Farewell audio saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn fixed_report() -> PerformanceReport {
        PerformanceReport {
            session_id: "sess-9".to_string(),
            candidate_name: "John Doe".to_string(),
            completed_at: DateTime::parse_from_rfc3339("2024-06-03T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            questions_answered: 4,
            total_questions: 4,
            overall_score: 82,
            confidence: 85,
            communication: 78,
            technical_knowledge: 88,
            professionalism: 80,
            recommendations: default_recommendations(),
        }
    }

    #[test]
    fn fabricated_scores_stay_in_their_bands_and_vary() {
        let mut overall_seen = HashSet::new();
        for _ in 0..200 {
            let report = fabricate_report("s", "c", 3, 5);
            assert!((75..=94).contains(&report.overall_score));
            assert!((75..=94).contains(&report.confidence));
            assert!((70..=89).contains(&report.communication));
            assert!((80..=99).contains(&report.technical_knowledge));
            assert!((75..=94).contains(&report.professionalism));
            overall_seen.insert(report.overall_score);
        }
        assert!(overall_seen.len() > 1, "two assemblies of the same session must be able to differ");
    }

    #[test]
    fn four_canned_recommendations() {
        let recs = default_recommendations();
        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0].kind, RecommendationKind::Strength);
        assert_eq!(recs[0].title, "Strong Technical Knowledge");
        assert_eq!(recs[1].kind, RecommendationKind::Strength);
        assert_eq!(recs[2].kind, RecommendationKind::Improvement);
        assert_eq!(recs[3].title, "Industry Knowledge");
    }

    #[test]
    fn performance_report_renders_scorecard_lines() {
        let text = render_performance_report(&fixed_report());
        assert!(text.starts_with("Interview Report - John Doe\n"));
        assert!(text.contains("Session ID: sess-9\n"));
        assert!(text.contains("Overall Score: 82%\n"));
        assert!(text.contains("Completed: 6/3/2024\n"));
        assert!(text.contains("Performance Scores:\n- Confidence: 85%\n"));
        assert!(text.contains("- Technical Knowledge: 88%\n"));
        assert!(
            text.contains("Recommendations:\n- Strong Technical Knowledge: Demonstrated excellent")
        );
    }

    #[test]
    fn evaluation_report_lists_scores_and_top_five_areas() {
        let evaluation = Evaluation {
            session_id: None,
            user_name: None,
            technical: 8.0,
            communication: 7.5,
            confidence: 6.0,
            professionalism: 9.0,
            per_question: vec![],
        };
        let roadmap = Roadmap {
            session_id: None,
            user_name: None,
            focus_areas: (1..=7).map(|i| format!("Area {}", i)).collect(),
            actions: vec!["Practice daily".to_string()],
            resources: vec![],
        };
        let text = render_evaluation_report(
            "Ada",
            Difficulty::Hard,
            Some(&evaluation),
            Some(&roadmap)
        );
        assert!(text.starts_with("AI Mock Interview Report\n"));
        assert!(text.contains("Candidate: Ada\n"));
        assert!(text.contains("Difficulty: HARD\n"));
        assert!(text.contains("  Technical: 8/10\n"));
        assert!(text.contains("  Communication: 7.5/10\n"));
        assert!(text.contains("  5. Area 5\n"));
        assert!(!text.contains("6. Area 6"));
    }

    #[test]
    fn evaluation_report_omits_missing_sections() {
        let text = render_evaluation_report("Ada", Difficulty::Easy, None, None);
        assert!(text.contains("Difficulty: EASY\n"));
        assert!(!text.contains("Evaluation Scores"));
        assert!(!text.contains("Learning Roadmap"));
    }

    #[test]
    fn report_file_names() {
        assert_eq!(performance_report_file("abc-123"), "interview-report-abc-123.txt");
        assert_eq!(evaluation_report_file("John Doe"), "interview-report-John-Doe.txt");
        assert_eq!(evaluation_report_file("Ada"), "interview-report-Ada.txt");
    }

    #[test]
    fn writes_report_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_text_report(dir.path(), "interview-report-x.txt", "hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }

    #[test]
    fn writes_create_missing_output_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports").join("june");

        let path = write_text_report(&nested, "interview-report-x.txt", "hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");

        let encoded = BASE64_STANDARD.encode(b"mp3-bytes");
        let saved = save_audio_base64(&nested, "question-1.mp3", &encoded).unwrap();
        assert_eq!(std::fs::read(saved).unwrap(), b"mp3-bytes");
    }

    #[test]
    fn farewell_audio_round_trips_through_base64() {
        let dir = tempfile::tempdir().unwrap();
        let encoded = BASE64_STANDARD.encode(b"mp3-bytes");
        let path = save_farewell_audio(dir.path(), "sess-9", &encoded).unwrap();
        assert!(path.ends_with("farewell-sess-9.mp3"));
        assert_eq!(std::fs::read(path).unwrap(), b"mp3-bytes");
    }

    #[test]
    fn malformed_farewell_audio_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_farewell_audio(dir.path(), "sess-9", "!!not-base64!!").unwrap_err();
        assert!(matches!(err, ReportError::Audio(_)));
    }
}
