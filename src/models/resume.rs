use serde::{ Serialize, Deserialize };

/// Parsed resume as returned by `POST /api/resume/upload`. The client
/// round-trips this payload to the backend with every turn and never
/// interprets it beyond display and the role fallback below.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Resume {
    pub filename: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub sections: ResumeSections,
    pub raw_text: String,
    pub uploaded_at: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResumeSections {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
}

impl Resume {
    /// Role string sent on `/api/interview/stop`: the experience section when
    /// the parser produced one, otherwise a generic default.
    pub fn role_hint(&self) -> String {
        match &self.sections.experience {
            Some(experience) if !experience.trim().is_empty() => experience.clone(),
            _ => "Software Engineer".to_string(),
        }
    }

    /// Candidate name guessed from the file name when none was given: the
    /// part before the first dot, with underscores and dashes as spaces.
    pub fn candidate_name(&self) -> Option<String> {
        let stem = self.filename.split('.').next().unwrap_or_default();
        let name = stem.replace(['_', '-'], " ");
        let name = name.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}
