//! User search intent: free text, result count, sector and numeric ranges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::SearchError;

/// Smallest number of results a search may ask for.
pub const MIN_RESULT_COUNT: usize = 1;
/// Largest number of results a search may ask for.
pub const MAX_RESULT_COUNT: usize = 25;

/// Label the input layer uses for "no sector constraint".
pub const ANY_SECTOR: &str = "Any Sector";

/// Sectors present in the stock description dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    #[serde(rename = "Consumer Defensive")]
    ConsumerDefensive,
    #[serde(rename = "Communication Services")]
    CommunicationServices,
    #[serde(rename = "Real Estate")]
    RealEstate,
    #[serde(rename = "Healthcare")]
    Healthcare,
    #[serde(rename = "Basic Materials")]
    BasicMaterials,
    #[serde(rename = "Utilities")]
    Utilities,
    #[serde(rename = "Energy")]
    Energy,
    #[serde(rename = "Industrials")]
    Industrials,
    #[serde(rename = "Consumer Cyclical")]
    ConsumerCyclical,
    #[serde(rename = "Financial Services")]
    FinancialServices,
    #[serde(rename = "Technology")]
    Technology,
}

impl Sector {
    pub const ALL: [Sector; 11] = [
        Sector::ConsumerDefensive,
        Sector::CommunicationServices,
        Sector::RealEstate,
        Sector::Healthcare,
        Sector::BasicMaterials,
        Sector::Utilities,
        Sector::Energy,
        Sector::Industrials,
        Sector::ConsumerCyclical,
        Sector::FinancialServices,
        Sector::Technology,
    ];

    /// Name as stored in the index metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::ConsumerDefensive => "Consumer Defensive",
            Sector::CommunicationServices => "Communication Services",
            Sector::RealEstate => "Real Estate",
            Sector::Healthcare => "Healthcare",
            Sector::BasicMaterials => "Basic Materials",
            Sector::Utilities => "Utilities",
            Sector::Energy => "Energy",
            Sector::Industrials => "Industrials",
            Sector::ConsumerCyclical => "Consumer Cyclical",
            Sector::FinancialServices => "Financial Services",
            Sector::Technology => "Technology",
        }
    }

    /// Parse a sector selection where "Any Sector" (or an empty string) means unconstrained.
    pub fn parse_selection(value: &str) -> Result<Option<Sector>, SearchError> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(ANY_SECTOR) {
            return Ok(None);
        }
        value.parse().map(Some)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sector {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Sector::ALL
            .iter()
            .find(|sector| sector.as_str().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| SearchError::invalid_query("sector", format!("unknown sector '{wanted}'")))
    }
}

/// Scale the input layer uses for slider values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    Units,
    Thousands,
    Millions,
    Billions,
}

impl DisplayUnit {
    pub fn factor(&self) -> f64 {
        match self {
            DisplayUnit::Units => 1.0,
            DisplayUnit::Thousands => 1e3,
            DisplayUnit::Millions => 1e6,
            DisplayUnit::Billions => 1e9,
        }
    }

    /// Convert a display-scaled value into canonical units (USD, shares).
    ///
    /// Every display-to-canonical conversion goes through here.
    pub fn to_canonical(&self, value: f64) -> f64 {
        value * self.factor()
    }

    /// Inverse of [`DisplayUnit::to_canonical`].
    pub fn from_canonical(&self, value: f64) -> f64 {
        value / self.factor()
    }

    /// Largest slider value needed to cover `canonical_max`.
    pub fn display_ceiling(&self, canonical_max: f64) -> f64 {
        self.from_canonical(canonical_max).ceil()
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisplayUnit::Units => "units",
            DisplayUnit::Thousands => "thousands",
            DisplayUnit::Millions => "millions",
            DisplayUnit::Billions => "billions",
        };
        f.write_str(name)
    }
}

/// An inclusive `(min, max)` range as entered, in some [`DisplayUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRange {
    pub min: f64,
    pub max: f64,
}

/// An inclusive range in canonical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRange {
    pub min: f64,
    pub max: f64,
}

impl DisplayRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// The full slider range `[0, ceil(known_max)]` for the given unit.
    pub fn full(unit: DisplayUnit, canonical_max: f64) -> Self {
        Self::new(0.0, unit.display_ceiling(canonical_max))
    }

    pub fn to_canonical(&self, unit: DisplayUnit) -> CanonicalRange {
        CanonicalRange {
            min: unit.to_canonical(self.min),
            max: unit.to_canonical(self.max),
        }
    }

    /// Check `0 <= min <= max <= ceil(known_max)` in display units.
    pub fn validate(
        &self,
        field: &str,
        unit: DisplayUnit,
        canonical_max: f64,
    ) -> Result<(), SearchError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(SearchError::invalid_query(field, "range bounds must be finite numbers"));
        }
        if self.min < 0.0 {
            return Err(SearchError::invalid_query(field, "range minimum cannot be negative"));
        }
        if self.min > self.max {
            return Err(SearchError::invalid_query(
                field,
                format!("range minimum {} exceeds maximum {}", self.min, self.max),
            ));
        }
        let ceiling = unit.display_ceiling(canonical_max);
        if self.max > ceiling {
            return Err(SearchError::invalid_query(
                field,
                format!("range maximum {} exceeds limit {ceiling} ({unit})", self.max),
            ));
        }
        Ok(())
    }
}

impl CanonicalRange {
    pub fn to_display(&self, unit: DisplayUnit) -> DisplayRange {
        DisplayRange::new(unit.from_canonical(self.min), unit.from_canonical(self.max))
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl FromStr for DisplayRange {
    type Err = SearchError;

    /// Parses `MIN..MAX` as typed on the command line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once("..")
            .ok_or_else(|| SearchError::invalid_query("range", format!("expected MIN..MAX, got '{s}'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| SearchError::invalid_query("range", format!("'{v}' is not a number")))
        };
        Ok(Self::new(parse(min)?, parse(max)?))
    }
}

/// A single search action, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub result_count: usize,
    #[serde(default)]
    pub sector: Option<Sector>,
    pub market_cap: DisplayRange,
    pub volume: DisplayRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_round_trip() {
        let cases = [
            (DisplayUnit::Billions, DisplayRange::new(0.5, 3670.0)),
            (DisplayUnit::Millions, DisplayRange::new(12.25, 648.0)),
            (DisplayUnit::Thousands, DisplayRange::new(1.0, 647676.134)),
        ];
        for (unit, range) in cases {
            let back = range.to_canonical(unit).to_display(unit);
            assert!((back.min - range.min).abs() < 1e-9, "{unit}: {back:?}");
            assert!((back.max - range.max).abs() < 1e-9, "{unit}: {back:?}");
        }
    }

    #[test]
    fn test_unit_conversion_values() {
        assert_eq!(DisplayUnit::Billions.to_canonical(3670.0), 3.67e12);
        assert_eq!(DisplayUnit::Millions.to_canonical(648.0), 6.48e8);
        assert_eq!(DisplayUnit::Thousands.to_canonical(2.0), 2000.0);
        assert_eq!(DisplayUnit::Units.to_canonical(42.0), 42.0);
    }

    #[test]
    fn test_display_ceiling_covers_known_max() {
        assert_eq!(DisplayUnit::Billions.display_ceiling(3_670_720_643_072.0), 3671.0);
        assert_eq!(DisplayUnit::Millions.display_ceiling(647_676_134.0), 648.0);
    }

    #[test]
    fn test_range_validation() {
        let max = 3_670_720_643_072.0;
        let unit = DisplayUnit::Billions;
        assert!(DisplayRange::new(0.0, 3670.0).validate("market_cap", unit, max).is_ok());
        assert!(DisplayRange::new(10.0, 10.0).validate("market_cap", unit, max).is_ok());

        let err = DisplayRange::new(100.0, 50.0)
            .validate("market_cap", unit, max)
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery { field, .. } if field == "market_cap"));

        assert!(DisplayRange::new(-1.0, 5.0).validate("market_cap", unit, max).is_err());
        assert!(DisplayRange::new(0.0, 5000.0).validate("market_cap", unit, max).is_err());
        assert!(DisplayRange::new(0.0, f64::NAN).validate("market_cap", unit, max).is_err());
    }

    #[test]
    fn test_sector_parsing() {
        assert_eq!("Technology".parse::<Sector>().unwrap(), Sector::Technology);
        assert_eq!("real estate".parse::<Sector>().unwrap(), Sector::RealEstate);
        assert!("Crypto".parse::<Sector>().is_err());

        assert_eq!(Sector::parse_selection("Any Sector").unwrap(), None);
        assert_eq!(Sector::parse_selection("").unwrap(), None);
        assert_eq!(
            Sector::parse_selection("Energy").unwrap(),
            Some(Sector::Energy)
        );
    }

    #[test]
    fn test_sector_serde_uses_dataset_names() {
        let json = serde_json::to_string(&Sector::FinancialServices).unwrap();
        assert_eq!(json, "\"Financial Services\"");
        let back: Sector = serde_json::from_str("\"Consumer Cyclical\"").unwrap();
        assert_eq!(back, Sector::ConsumerCyclical);
    }

    #[test]
    fn test_canonical_range_contains() {
        let range = DisplayRange::new(1.0, 2.0).to_canonical(DisplayUnit::Billions);
        assert!(range.contains(1e9));
        assert!(range.contains(2e9));
        assert!(!range.contains(999_999_999.0));
        assert!(!range.contains(f64::NAN));
    }

    #[test]
    fn test_range_from_str() {
        let range: DisplayRange = "0..3670".parse().unwrap();
        assert_eq!(range, DisplayRange::new(0.0, 3670.0));
        let range: DisplayRange = " 1.5 .. 2 ".parse().unwrap();
        assert_eq!(range, DisplayRange::new(1.5, 2.0));
        assert!("12".parse::<DisplayRange>().is_err());
        assert!("a..b".parse::<DisplayRange>().is_err());
    }
}
