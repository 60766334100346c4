//! Plain-text stock cards for the terminal.

use crate::search::{SearchOutcome, StockResult};

/// Longest description shown on a card, in characters.
pub const DESCRIPTION_LIMIT: usize = 300;

const NO_MATCHES: &str = "No stocks matched this search. Try widening the filters.";

/// `0.1234` → `"12.34%"`.
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Cut `text` to at most `limit` characters, ending with "..." when shortened
/// and `limit` leaves room for it.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit < 3 {
        return text.chars().take(limit).collect();
    }

    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

pub fn card(result: &StockResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} ({})\n", result.name, result.ticker));
    out.push_str(&format!("  Sector: {}\n", result.sector));
    out.push_str(&format!("  {}\n", truncate(&result.description, DESCRIPTION_LIMIT)));
    out.push_str(&format!(
        "  Earnings growth: {}  Revenue growth: {}\n",
        format_percent(result.earnings_growth),
        format_percent(result.revenue_growth)
    ));
    out.push_str(&format!(
        "  Gross margins: {}  EBITDA margins: {}\n",
        format_percent(result.gross_margins),
        format_percent(result.ebitda_margins)
    ));
    out.push_str(&format!(
        "  52 week change: {}  Beta: {:.2}\n",
        format_percent(result.week_change_52),
        result.beta
    ));
    out.push_str(&format!("  {}\n", result.website));
    out
}

/// Every card in backend order, or a hint when nothing matched.
pub fn cards(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::NoMatches => format!("{NO_MATCHES}\n"),
        SearchOutcome::Matches(results) => results
            .iter()
            .map(card)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
