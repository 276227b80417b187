use serde::{Deserialize, Deserializer, Serialize};

use crate::period::{self, MonthBucket};

/// Three-way classification of free text, computed upstream by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Unknown labels (`"Not analyzed"`, blanks) read as unscored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

fn lenient_sentiment<'de, D>(deserializer: D) -> Result<Option<Sentiment>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Sentiment::parse))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingCategory {
    TeachingEffectiveness,
    CourseContent,
    InteractionQuality,
    AssignmentFeedback,
    OverallSatisfaction,
}

impl RatingCategory {
    pub const ALL: [RatingCategory; 5] = [
        RatingCategory::TeachingEffectiveness,
        RatingCategory::CourseContent,
        RatingCategory::InteractionQuality,
        RatingCategory::AssignmentFeedback,
        RatingCategory::OverallSatisfaction,
    ];

    pub fn key(self) -> &'static str {
        match self {
            RatingCategory::TeachingEffectiveness => "teaching_effectiveness",
            RatingCategory::CourseContent => "course_content",
            RatingCategory::InteractionQuality => "interaction_quality",
            RatingCategory::AssignmentFeedback => "assignment_feedback",
            RatingCategory::OverallSatisfaction => "overall_satisfaction",
        }
    }

    /// Display name built from the key: underscores become spaces and each
    /// word is capitalized (`course_content` -> `Course Content`).
    pub fn label(self) -> String {
        self.key()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Axis name used by the radar view.
    pub fn short_label(self) -> &'static str {
        match self {
            RatingCategory::TeachingEffectiveness => "Teaching",
            RatingCategory::CourseContent => "Content",
            RatingCategory::InteractionQuality => "Interaction",
            RatingCategory::AssignmentFeedback => "Feedback",
            RatingCategory::OverallSatisfaction => "Satisfaction",
        }
    }
}

/// Raw rating values as delivered by the backend. Use [`Ratings::get`] to
/// read a validated value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratings {
    #[serde(default)]
    pub teaching_effectiveness: Option<i32>,
    #[serde(default)]
    pub course_content: Option<i32>,
    #[serde(default)]
    pub interaction_quality: Option<i32>,
    #[serde(default)]
    pub assignment_feedback: Option<i32>,
    #[serde(default)]
    pub overall_satisfaction: Option<i32>,
}

impl Ratings {
    /// Returns the rating for `category` when present and within `1..=5`.
    pub fn get(&self, category: RatingCategory) -> Option<u8> {
        let raw = match category {
            RatingCategory::TeachingEffectiveness => self.teaching_effectiveness,
            RatingCategory::CourseContent => self.course_content,
            RatingCategory::InteractionQuality => self.interaction_quality,
            RatingCategory::AssignmentFeedback => self.assignment_feedback,
            RatingCategory::OverallSatisfaction => self.overall_satisfaction,
        };
        raw.and_then(|value| u8::try_from(value).ok())
            .filter(|value| (1..=5).contains(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub code: String,
    #[serde(default)]
    pub name: String,
}

/// One student's submission for one subject-teacher pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub created_at: String,
    #[serde(default)]
    pub subject: Option<Subject>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub suggestions: Option<String>,
    #[serde(default, deserialize_with = "lenient_sentiment")]
    pub comment_sentiment: Option<Sentiment>,
    #[serde(default)]
    pub comment_sentiment_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_sentiment")]
    pub suggestion_sentiment: Option<Sentiment>,
    #[serde(default)]
    pub suggestion_sentiment_score: Option<f64>,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl FeedbackRecord {
    /// Sentiment used for per-record counts. The comment sentiment takes
    /// priority; the suggestion sentiment is only consulted when the comment
    /// is unscored. `None` marks the record as unscored.
    ///
    /// Labels outside positive/neutral/negative (`"Not analyzed"`) are read
    /// as unscored at deserialization, so such a comment label falls through
    /// to the suggestion sentiment rather than blocking it.
    pub fn effective_sentiment(&self) -> Option<Sentiment> {
        self.comment_sentiment.or(self.suggestion_sentiment)
    }

    /// Calendar bucket of `created_at`, or `None` when it cannot be parsed.
    pub fn created_month(&self) -> Option<MonthBucket> {
        period::month_bucket(&self.created_at)
    }

    /// Comments and suggestions joined into one lowercase text stream.
    pub fn feedback_text(&self) -> String {
        format!(
            "{} {}",
            self.comments.as_deref().unwrap_or(""),
            self.suggestions.as_deref().unwrap_or("")
        )
        .to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAverage {
    pub category: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentBucket {
    pub month: String,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub total: usize,
}

impl SentimentBucket {
    pub fn empty(period: MonthBucket) -> Self {
        Self {
            month: period.label(),
            positive: 0,
            neutral: 0,
            negative: 0,
            total: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyVolume {
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarScore {
    pub category: String,
    pub score: f64,
    pub full_mark: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    pub avg_rating: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingBucket {
    pub rating: u8,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub code: String,
    pub name: String,
    pub feedback_count: usize,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickInsights {
    pub total: usize,
    pub avg_rating: String,
    pub positive: usize,
    pub positive_rate: f64,
    pub most_active_period: Option<String>,
    pub top_word: Option<String>,
}

/// Every derived view over one record collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub average_ratings: Option<Vec<CategoryAverage>>,
    pub sentiment_trends: Vec<SentimentBucket>,
    pub word_frequency: Vec<WordCount>,
    pub radar_scores: Vec<RadarScore>,
    pub volume_by_month: Vec<MonthlyVolume>,
    pub aggregate_stats: AggregateStats,
    pub sentiment_distribution: SentimentDistribution,
    pub rating_distribution: Vec<RatingBucket>,
    pub subject_breakdown: Vec<SubjectSummary>,
    pub insights: QuickInsights,
}
