use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::filter::{FIELD_SECTOR, FIELD_TICKER, PLACEHOLDER};

const FIELD_NAME: &str = "Name";
const FIELD_DESCRIPTION: &str = "Business Summary";
const FIELD_EARNINGS_GROWTH: &str = "Earnings Growth";
const FIELD_REVENUE_GROWTH: &str = "Revenue Growth";
const FIELD_GROSS_MARGINS: &str = "Gross Margins";
const FIELD_EBITDA_MARGINS: &str = "EBITDA Margins";
const FIELD_WEEK_CHANGE_52: &str = "52 Week Change";
const FIELD_BETA: &str = "Beta";
const FIELD_WEBSITE: &str = "Website";

/// Quote page used when a record carries no usable website.
const LOOKUP_BASE_URL: &str = "https://finance.yahoo.com/quote/";

/// One ranked match as returned by a vector backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A retrieved stock, with every missing field replaced by its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockResult {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub description: String,
    pub earnings_growth: f64,
    pub revenue_growth: f64,
    pub gross_margins: f64,
    pub ebitda_margins: f64,
    pub week_change_52: f64,
    pub beta: f64,
    pub website: String,
    pub score: f32,
}

impl StockResult {
    pub fn from_match(raw: RawMatch) -> Self {
        let metadata = &raw.metadata;
        let ticker = text_field(metadata, FIELD_TICKER).unwrap_or_else(|| raw.id.clone());
        let website = text_field(metadata, FIELD_WEBSITE)
            .filter(|site| site != PLACEHOLDER)
            .unwrap_or_else(|| lookup_url(&ticker));

        Self {
            name: text_or_placeholder(metadata, FIELD_NAME),
            sector: text_or_placeholder(metadata, FIELD_SECTOR),
            description: text_or_placeholder(metadata, FIELD_DESCRIPTION),
            earnings_growth: number_or_zero(metadata, FIELD_EARNINGS_GROWTH),
            revenue_growth: number_or_zero(metadata, FIELD_REVENUE_GROWTH),
            gross_margins: number_or_zero(metadata, FIELD_GROSS_MARGINS),
            ebitda_margins: number_or_zero(metadata, FIELD_EBITDA_MARGINS),
            week_change_52: number_or_zero(metadata, FIELD_WEEK_CHANGE_52),
            beta: number_or_zero(metadata, FIELD_BETA),
            website,
            score: raw.score,
            ticker,
        }
    }
}

/// Quote page for `ticker`, with the ticker percent-encoded as a path segment.
pub fn lookup_url(ticker: &str) -> String {
    match Url::parse(LOOKUP_BASE_URL) {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().push(ticker);
            }
            url.to_string()
        }
        Err(_) => format!("{LOOKUP_BASE_URL}{ticker}"),
    }
}

/// Non-empty string value, if any.
fn text_field(metadata: &Map<String, Value>, key: &str) -> Option<String> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_or_placeholder(metadata: &Map<String, Value>, key: &str) -> String {
    text_field(metadata, key).unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Numbers stored as JSON numbers or numeric strings; anything else is 0.0.
fn number_or_zero(metadata: &Map<String, Value>, key: &str) -> f64 {
    match metadata.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}
