use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{
    AggregateStats, CategoryAverage, Dashboard, FeedbackRecord, MonthlyVolume, QuickInsights,
    RadarScore, RatingBucket, RatingCategory, Sentiment, SentimentBucket,
    SentimentDistribution, SubjectSummary, WordCount,
};
use crate::period::MonthBucket;

pub const DEFAULT_TOP_WORDS: usize = 20;

pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "is", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "very", "was", "were", "been", "be", "have", "has", "had", "do", "does", "did",
    "will", "would", "should", "could", "may", "might", "can", "about", "this", "that", "these",
    "those",
];

const RADAR_FULL_MARK: u8 = 5;
const MIN_WORD_LEN: usize = 4;
const MAX_WORD_SIZE: usize = 48;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(values: impl Iterator<Item = u8>) -> Option<f64> {
    let (sum, count) = values.fold((0u64, 0u64), |(sum, count), value| {
        (sum + u64::from(value), count + 1)
    });
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

fn category_mean(records: &[FeedbackRecord], category: RatingCategory) -> Option<f64> {
    mean(records.iter().filter_map(|record| record.ratings.get(category)))
}

/// Per-category mean rating in fixed category order, or `None` for an empty
/// collection. Records missing a category only leave that category's
/// denominator; a category nobody rated reports `0`.
pub fn average_ratings(records: &[FeedbackRecord]) -> Option<Vec<CategoryAverage>> {
    if records.is_empty() {
        return None;
    }

    Some(
        RatingCategory::ALL
            .iter()
            .map(|&category| CategoryAverage {
                category: category.label(),
                value: category_mean(records, category).map(round2).unwrap_or(0.0),
            })
            .collect(),
    )
}

/// Monthly sentiment counts, ascending by calendar month. Records whose
/// `created_at` does not parse are skipped.
pub fn sentiment_trends(records: &[FeedbackRecord]) -> Vec<SentimentBucket> {
    let mut buckets: BTreeMap<MonthBucket, SentimentBucket> = BTreeMap::new();

    for record in records {
        let Some(period) = record.created_month() else {
            continue;
        };
        let bucket = buckets
            .entry(period)
            .or_insert_with(|| SentimentBucket::empty(period));

        bucket.total += 1;
        match record.effective_sentiment() {
            Some(Sentiment::Positive) => bucket.positive += 1,
            Some(Sentiment::Neutral) => bucket.neutral += 1,
            Some(Sentiment::Negative) => bucket.negative += 1,
            None => {}
        }
    }

    buckets.into_values().collect()
}

pub fn word_display_size(count: usize) -> usize {
    count.saturating_mul(8).saturating_add(12).min(MAX_WORD_SIZE)
}

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
}

/// Most frequent words across comments and suggestions.
///
/// Tokens of three characters or fewer and stop words are dropped. Equal
/// counts keep the order in which the words were first seen.
pub fn word_frequency<S: AsRef<str>>(
    records: &[FeedbackRecord],
    stop_words: &[S],
    top_n: usize,
) -> Vec<WordCount> {
    let stop_words: HashSet<String> = stop_words
        .iter()
        .map(|word| word.as_ref().trim().to_lowercase())
        .collect();
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let text = record.feedback_text();
        for token in tokenize(&text) {
            if token.chars().count() < MIN_WORD_LEN || stop_words.contains(token) {
                continue;
            }
            match positions.get(token) {
                Some(&index) => counts[index].1 += 1,
                None => {
                    positions.insert(token.to_string(), counts.len());
                    counts.push((token.to_string(), 1));
                }
            }
        }
    }

    // sort_by is stable, so ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(top_n)
        .map(|(word, count)| WordCount {
            size: word_display_size(count),
            word,
            count,
        })
        .collect()
}

pub fn radar_scores(records: &[FeedbackRecord]) -> Vec<RadarScore> {
    RatingCategory::ALL
        .iter()
        .map(|&category| RadarScore {
            category: category.short_label().to_string(),
            score: category_mean(records, category).map(round2).unwrap_or(0.0),
            full_mark: RADAR_FULL_MARK,
        })
        .collect()
}

pub fn volume_by_month(records: &[FeedbackRecord]) -> Vec<MonthlyVolume> {
    let mut volume: BTreeMap<MonthBucket, usize> = BTreeMap::new();

    for period in records.iter().filter_map(FeedbackRecord::created_month) {
        *volume.entry(period).or_insert(0) += 1;
    }

    volume
        .into_iter()
        .map(|(period, count)| MonthlyVolume {
            month: period.label(),
            count,
        })
        .collect()
}

fn average_overall(records: &[FeedbackRecord]) -> f64 {
    category_mean(records, RatingCategory::OverallSatisfaction)
        .map(round2)
        .unwrap_or(0.0)
}

pub fn aggregate_stats(records: &[FeedbackRecord]) -> AggregateStats {
    let mut positive = 0;
    let mut negative = 0;

    for record in records {
        match record.effective_sentiment() {
            Some(Sentiment::Positive) => positive += 1,
            Some(Sentiment::Negative) => negative += 1,
            _ => {}
        }
    }

    AggregateStats {
        total: records.len(),
        positive,
        negative,
        avg_rating: format!("{:.2}", average_overall(records)),
    }
}

/// Counts both sentiment fields of every record independently.
pub fn sentiment_distribution(records: &[FeedbackRecord]) -> SentimentDistribution {
    let mut distribution = SentimentDistribution::default();

    let labels = records
        .iter()
        .flat_map(|record| [record.comment_sentiment, record.suggestion_sentiment])
        .flatten();
    for sentiment in labels {
        match sentiment {
            Sentiment::Positive => distribution.positive += 1,
            Sentiment::Neutral => distribution.neutral += 1,
            Sentiment::Negative => distribution.negative += 1,
        }
    }

    distribution
}

pub fn rating_distribution(records: &[FeedbackRecord]) -> Vec<RatingBucket> {
    (1..=5)
        .map(|rating| RatingBucket {
            rating,
            count: records
                .iter()
                .filter(|record| {
                    record.ratings.get(RatingCategory::OverallSatisfaction) == Some(rating)
                })
                .count(),
        })
        .collect()
}

pub fn subject_breakdown(records: &[FeedbackRecord]) -> Vec<SubjectSummary> {
    struct Tally<'a> {
        code: &'a str,
        name: &'a str,
        count: usize,
        rating_sum: u64,
        rated: u64,
    }

    let mut tallies: Vec<Tally<'_>> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let Some(subject) = record.subject.as_ref() else {
            continue;
        };
        let index = *positions.entry(subject.code.as_str()).or_insert_with(|| {
            tallies.push(Tally {
                code: &subject.code,
                name: &subject.name,
                count: 0,
                rating_sum: 0,
                rated: 0,
            });
            tallies.len() - 1
        });
        let tally = &mut tallies[index];
        tally.count += 1;
        if let Some(rating) = record.ratings.get(RatingCategory::OverallSatisfaction) {
            tally.rating_sum += u64::from(rating);
            tally.rated += 1;
        }
    }

    tallies.sort_by(|a, b| b.count.cmp(&a.count));
    tallies
        .into_iter()
        .map(|tally| SubjectSummary {
            code: tally.code.to_string(),
            name: tally.name.to_string(),
            feedback_count: tally.count,
            avg_rating: if tally.rated == 0 {
                0.0
            } else {
                round2(tally.rating_sum as f64 / tally.rated as f64)
            },
        })
        .collect()
}

fn busiest_month(volume: &[MonthlyVolume]) -> Option<&MonthlyVolume> {
    // a later month wins a tie
    volume.iter().fold(None, |best, candidate| match best {
        Some(current) if current.count > candidate.count => Some(current),
        _ => Some(candidate),
    })
}

fn insights_from(
    stats: &AggregateStats,
    volume: &[MonthlyVolume],
    words: &[WordCount],
) -> QuickInsights {
    let positive_rate = if stats.total == 0 {
        0.0
    } else {
        round1(stats.positive as f64 / stats.total as f64 * 100.0)
    };

    QuickInsights {
        total: stats.total,
        avg_rating: stats.avg_rating.clone(),
        positive: stats.positive,
        positive_rate,
        most_active_period: busiest_month(volume).map(|entry| entry.month.clone()),
        top_word: words.first().map(|entry| entry.word.clone()),
    }
}

pub fn quick_insights<S: AsRef<str>>(
    records: &[FeedbackRecord],
    stop_words: &[S],
    top_n: usize,
) -> QuickInsights {
    insights_from(
        &aggregate_stats(records),
        &volume_by_month(records),
        &word_frequency(records, stop_words, top_n),
    )
}

pub fn dashboard<S: AsRef<str>>(
    records: &[FeedbackRecord],
    stop_words: &[S],
    top_n: usize,
) -> Dashboard {
    let aggregate_stats = aggregate_stats(records);
    let volume_by_month = volume_by_month(records);
    let word_frequency = word_frequency(records, stop_words, top_n);
    let insights = insights_from(&aggregate_stats, &volume_by_month, &word_frequency);

    Dashboard {
        average_ratings: average_ratings(records),
        sentiment_trends: sentiment_trends(records),
        word_frequency,
        radar_scores: radar_scores(records),
        volume_by_month,
        aggregate_stats,
        sentiment_distribution: sentiment_distribution(records),
        rating_distribution: rating_distribution(records),
        subject_breakdown: subject_breakdown(records),
        insights,
    }
}
