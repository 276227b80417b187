use std::fmt::Write;

use crate::models::Dashboard;

pub fn build_report(scope: Option<&str>, dashboard: &Dashboard) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all feedback");
    let stats = &dashboard.aggregate_stats;

    let _ = writeln!(output, "# Course Feedback Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} responses)",
        scope_label, stats.total
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- Average overall rating: {}/5",
        dashboard.insights.avg_rating
    );
    let _ = writeln!(
        output,
        "- Positive responses: {} ({:.1}%)",
        stats.positive, dashboard.insights.positive_rate
    );
    let _ = writeln!(output, "- Negative responses: {}", stats.negative);
    let _ = writeln!(
        output,
        "- Most active period: {}",
        dashboard
            .insights
            .most_active_period
            .as_deref()
            .unwrap_or("N/A")
    );
    let _ = writeln!(
        output,
        "- Top feedback word: {}",
        dashboard.insights.top_word.as_deref().unwrap_or("N/A")
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Ratings");

    match dashboard.average_ratings.as_deref() {
        Some(averages) if !averages.is_empty() => {
            for average in averages {
                let _ = writeln!(output, "- {}: {:.2}", average.category, average.value);
            }
        }
        _ => {
            let _ = writeln!(output, "No ratings recorded.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Sentiment");

    if dashboard.sentiment_trends.is_empty() {
        let _ = writeln!(output, "No dated feedback recorded.");
    } else {
        let _ = writeln!(output, "| Month | Positive | Neutral | Negative | Total |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for bucket in &dashboard.sentiment_trends {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} |",
                bucket.month, bucket.positive, bucket.neutral, bucket.negative, bucket.total
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Common Words");

    if dashboard.word_frequency.is_empty() {
        let _ = writeln!(output, "No comments or suggestions recorded.");
    } else {
        for entry in dashboard.word_frequency.iter().take(10) {
            let _ = writeln!(output, "- {} ({})", entry.word, entry.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");

    if dashboard.subject_breakdown.is_empty() {
        let _ = writeln!(output, "No subject information recorded.");
    } else {
        for subject in &dashboard.subject_breakdown {
            let _ = writeln!(
                output,
                "- {} {}: {} responses (avg rating {:.2})",
                subject.code, subject.name, subject.feedback_count, subject.avg_rating
            );
        }
    }

    output
}
