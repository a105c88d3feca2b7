use serde::Serialize;

use crate::error::AppError;

/// Keys every model reply must provide, in record order.
pub const REQUIRED_FIELDS: [&str; 5] = ["strengths", "weaknesses", "suggestions", "roast", "plotCode"];

/// Fields the model is asked to answer with a list of critique points.
pub const LIST_FIELDS: [&str; 3] = ["strengths", "weaknesses", "suggestions"];

const RAW_EXCERPT_CHARS: usize = 200;

/// Critique of one chart, ready for display. Every field is plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
    pub roast: String,
    pub plot_code: String,
}

/// Render list items as `• a\n• b`.
pub fn format_bullets<S: AsRef<str>>(items: &[S]) -> String {
    let joined = items
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("\n• ");
    format!("• {}", joined)
}

impl FeedbackRecord {
    /// Build a record by asking `value_for` for each required field.
    /// Returns the names of the fields it could not supply on failure.
    pub fn from_fields<F>(mut value_for: F) -> Result<Self, Vec<&'static str>>
    where
        F: FnMut(&'static str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(REQUIRED_FIELDS.len());
        let mut missing = Vec::new();
        for field in REQUIRED_FIELDS {
            match value_for(field) {
                Some(v) => values.push(v),
                None => missing.push(field),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            strengths: next(),
            weaknesses: next(),
            suggestions: next(),
            roast: next(),
            plot_code: next(),
        })
    }

    /// Shown when no API key is configured.
    pub fn missing_credential() -> Self {
        Self {
            strengths: "Error: API Key missing.".to_string(),
            weaknesses: "Please configure the ANTHROPIC_API_KEY environment variable.".to_string(),
            suggestions: "Refer to the project documentation.".to_string(),
            roast: "No key, no roast.".to_string(),
            plot_code: "// API key missing".to_string(),
        }
    }

    /// Shown when none of the recovery tiers could read the reply.
    pub fn parse_failure(raw: &str, err: &AppError) -> Self {
        let excerpt: String = raw.chars().take(RAW_EXCERPT_CHARS).collect();
        Self {
            strengths: "Error: Could not process AI response.".to_string(),
            weaknesses: format!(
                "Failed to parse the response from the AI. Raw response: {}...",
                excerpt
            ),
            suggestions: "The AI might have provided an invalid JSON format. Check the logs for details."
                .to_string(),
            roast: "Unavailable: the response could not be parsed.".to_string(),
            plot_code: format!("// Error parsing AI response: {}", err),
        }
    }

    /// Shown for every other failure: bad file, upstream error, config problems.
    pub fn analysis_failure(err: &AppError) -> Self {
        Self {
            strengths: "Error: Analysis failed.".to_string(),
            weaknesses: format!("An error occurred: {}", err),
            suggestions: "Please check the file or logs and try again.".to_string(),
            roast: "Unavailable: the analysis did not complete.".to_string(),
            plot_code: format!("// Analysis error: {}", err),
        }
    }

    /// Pick the placeholder matching `err`. `raw` is the model reply, when one was received.
    pub fn placeholder_for(err: &AppError, raw: Option<&str>) -> Self {
        match err {
            AppError::MissingCredential => Self::missing_credential(),
            AppError::UnparseableResponse { .. } => Self::parse_failure(raw.unwrap_or_default(), err),
            _ => Self::analysis_failure(err),
        }
    }
}
