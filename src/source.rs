use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::{debug, info};

use crate::analytics::DEFAULT_STOP_WORDS;
use crate::models::{FeedbackRecord, Ratings, Sentiment, Subject};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

/// Where the feedback collection is materialized from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A JSON or CSV export on disk.
    File(PathBuf),
    /// The portal backend's teacher feedback endpoint.
    Backend { base_url: String, teacher: String },
}

impl Source {
    pub fn describe(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Backend { teacher, .. } => format!("teacher {teacher}"),
        }
    }
}

/// Either a bare record array or the backend's `{ "feedback": [...] }`
/// envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Records(Vec<FeedbackRecord>),
    Envelope { feedback: Vec<FeedbackRecord> },
}

impl Payload {
    fn into_records(self) -> Vec<FeedbackRecord> {
        match self {
            Payload::Records(records) | Payload::Envelope { feedback: records } => records,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub async fn load(source: &Source) -> anyhow::Result<Vec<FeedbackRecord>> {
    let records = match source {
        Source::File(path) => load_file(path)?,
        Source::Backend { base_url, teacher } => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("failed to build HTTP client")?;
            fetch_teacher_feedback(&client, base_url, teacher).await?
        }
    };

    info!(
        source = %source.describe(),
        records = records.len(),
        "loaded feedback records"
    );
    Ok(records)
}

pub fn load_file(path: &Path) -> anyhow::Result<Vec<FeedbackRecord>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        read_csv(file).with_context(|| format!("failed to read CSV from {}", path.display()))
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        parse_json(&text).with_context(|| format!("failed to parse JSON from {}", path.display()))
    }
}

pub fn parse_json(text: &str) -> anyhow::Result<Vec<FeedbackRecord>> {
    let payload: Payload = serde_json::from_str(text)
        .context("expected a feedback array or an object with a `feedback` array")?;
    Ok(payload.into_records())
}

pub fn read_csv<R: std::io::Read>(reader: R) -> anyhow::Result<Vec<FeedbackRecord>> {
    #[derive(Deserialize)]
    struct CsvRow {
        id: i64,
        created_at: String,
        #[serde(default)]
        subject_code: Option<String>,
        #[serde(default)]
        subject_name: Option<String>,
        #[serde(default)]
        teaching_effectiveness: Option<i32>,
        #[serde(default)]
        course_content: Option<i32>,
        #[serde(default)]
        interaction_quality: Option<i32>,
        #[serde(default)]
        assignment_feedback: Option<i32>,
        #[serde(default)]
        overall_satisfaction: Option<i32>,
        #[serde(default)]
        comments: Option<String>,
        #[serde(default)]
        comment_sentiment: Option<String>,
        #[serde(default)]
        comment_sentiment_score: Option<f64>,
        #[serde(default)]
        suggestions: Option<String>,
        #[serde(default)]
        suggestion_sentiment: Option<String>,
        #[serde(default)]
        suggestion_sentiment_score: Option<f64>,
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        let subject = row.subject_code.map(|code| Subject {
            code,
            name: row.subject_name.unwrap_or_default(),
        });

        records.push(FeedbackRecord {
            id: row.id,
            created_at: row.created_at,
            subject,
            semester: None,
            ratings: Ratings {
                teaching_effectiveness: row.teaching_effectiveness,
                course_content: row.course_content,
                interaction_quality: row.interaction_quality,
                assignment_feedback: row.assignment_feedback,
                overall_satisfaction: row.overall_satisfaction,
            },
            comments: row.comments,
            suggestions: row.suggestions,
            comment_sentiment: row.comment_sentiment.as_deref().and_then(Sentiment::parse),
            comment_sentiment_score: row.comment_sentiment_score,
            suggestion_sentiment: row
                .suggestion_sentiment
                .as_deref()
                .and_then(Sentiment::parse),
            suggestion_sentiment_score: row.suggestion_sentiment_score,
            is_anonymous: true,
        });
    }

    debug!(rows = records.len(), "parsed feedback CSV");
    Ok(records)
}

pub async fn fetch_teacher_feedback(
    client: &reqwest::Client,
    base_url: &str,
    teacher: &str,
) -> anyhow::Result<Vec<FeedbackRecord>> {
    let url = format!("{}/teacher/feedback/", base_url.trim_end_matches('/'));
    debug!(%url, teacher, "requesting teacher feedback");

    let response = client
        .get(&url)
        .query(&[("username", teacher)])
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|parsed| parsed.error)
            .unwrap_or(body);
        bail!("backend returned {status} for teacher {teacher}: {message}");
    }

    let payload: Payload = response
        .json()
        .await
        .context("backend response did not contain feedback records")?;
    Ok(payload.into_records())
}

/// Reads a newline-separated stop-word list. Blank lines and `#` comments
/// are ignored.
pub fn load_stop_words(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read stop words from {}", path.display()))?;
    Ok(parse_stop_words(&text))
}

/// Stop words in effect: the built-in list when no custom list is given,
/// the custom list alone, or both when `extend` is set.
pub fn resolve_stop_words(custom: Option<Vec<String>>, extend: bool) -> Vec<String> {
    let defaults = DEFAULT_STOP_WORDS.iter().map(|word| word.to_string());
    match custom {
        None => defaults.collect(),
        Some(custom) if extend => defaults.chain(custom).collect(),
        Some(custom) => custom,
    }
}

fn parse_stop_words(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RatingCategory;

    const BACKEND_RECORD: &str = r#"{
        "id": 7,
        "student_prn": "Anonymous",
        "subject": {"code": "CS101", "name": "Programming"},
        "semester": "FY - Semester 1",
        "ratings": {
            "teaching_effectiveness": 5,
            "course_content": 4,
            "interaction_quality": 4,
            "assignment_feedback": 3,
            "overall_satisfaction": 5
        },
        "comments": "Clear explanations",
        "comment_sentiment": "positive",
        "comment_sentiment_score": 0.42,
        "suggestions": "",
        "suggestion_sentiment": null,
        "suggestion_sentiment_score": 0,
        "is_anonymous": true,
        "created_at": "2024-03-15 10:30:00"
    }"#;

    #[test]
    fn parses_bare_record_array() {
        let records = parse_json(&format!("[{BACKEND_RECORD}]")).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, 7);
        assert_eq!(record.subject.as_ref().unwrap().code, "CS101");
        assert_eq!(record.ratings.get(RatingCategory::AssignmentFeedback), Some(3));
        assert_eq!(record.comment_sentiment, Some(Sentiment::Positive));
        assert_eq!(record.suggestion_sentiment, None);
        assert!(record.created_month().is_some());
    }

    #[test]
    fn parses_backend_envelope() {
        let body = format!(
            r#"{{"success": true, "feedback": [{BACKEND_RECORD}], "sentiment_stats": {{"positive": 1}}}}"#
        );
        let records = parse_json(&body).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn unknown_sentiment_labels_read_as_unscored() {
        let body = r#"[{
            "id": 1,
            "created_at": "2024-03-15",
            "ratings": {"overall_satisfaction": 4},
            "comment_sentiment": "Not analyzed"
        }]"#;
        let records = parse_json(body).unwrap();
        assert_eq!(records[0].effective_sentiment(), None);
        assert_eq!(records[0].ratings.get(RatingCategory::CourseContent), None);
    }

    #[test]
    fn rejects_payload_without_records() {
        assert!(parse_json(r#"{"error": "Teacher not found"}"#).is_err());
    }

    #[test]
    fn reads_csv_with_blank_cells() {
        let data = "\
id,created_at,subject_code,subject_name,teaching_effectiveness,course_content,interaction_quality,assignment_feedback,overall_satisfaction,comments,comment_sentiment,comment_sentiment_score,suggestions,suggestion_sentiment,suggestion_sentiment_score
1,15-03-2024 10:30,MA201,Calculus,4,5,3,,4,Great pace,positive,0.61,,Not analyzed,
2,2024-04-02 09:00:00,,,3,3,3,3,2,,,,More examples,negative,-0.2
";
        let records = read_csv(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.subject.as_ref().unwrap().name, "Calculus");
        assert_eq!(first.ratings.get(RatingCategory::AssignmentFeedback), None);
        assert_eq!(first.suggestion_sentiment, None);
        assert_eq!(first.comment_sentiment_score, Some(0.61));

        let second = &records[1];
        assert!(second.subject.is_none());
        assert!(second.comments.is_none());
        assert_eq!(second.effective_sentiment(), Some(Sentiment::Negative));
    }

    #[test]
    fn unknown_comment_label_falls_back_to_suggestion() {
        let body = r#"[{
            "id": 2,
            "created_at": "2024-03-15",
            "comment_sentiment": "Not analyzed",
            "suggestion_sentiment": "negative"
        }]"#;
        let records = parse_json(body).unwrap();
        assert_eq!(records[0].comment_sentiment, None);
        assert_eq!(records[0].effective_sentiment(), Some(Sentiment::Negative));
    }

    #[test]
    fn stop_words_default_without_custom_list() {
        let words = resolve_stop_words(None, false);
        assert_eq!(words, DEFAULT_STOP_WORDS);
        assert_eq!(resolve_stop_words(None, true), DEFAULT_STOP_WORDS);
    }

    #[test]
    fn custom_stop_words_replace_defaults() {
        let words = resolve_stop_words(Some(vec!["lecture".to_string()]), false);
        assert_eq!(words, vec!["lecture".to_string()]);
        assert!(!words.contains(&"very".to_string()));
    }

    #[test]
    fn custom_stop_words_extend_defaults() {
        let words = resolve_stop_words(
            Some(vec!["lecture".to_string(), "module".to_string()]),
            true,
        );
        assert!(words.contains(&"very".to_string()));
        assert!(words.contains(&"lecture".to_string()));
        assert!(words.contains(&"module".to_string()));
        assert_eq!(words.len(), DEFAULT_STOP_WORDS.len() + 2);
    }

    #[test]
    fn stop_word_lists_skip_comments_and_blanks() {
        let words = parse_stop_words("# course words\nLecture\n\n  module  \n");
        assert_eq!(words, vec!["lecture".to_string(), "module".to_string()]);
    }
}
