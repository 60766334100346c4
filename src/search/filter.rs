//! Metadata filter predicates sent alongside the query vector.
//!
//! A predicate is a conjunction of clauses. It serializes to the operator
//! format hosted vector databases accept (`$gte`, `$lte`, `$eq`, `$ne`) and can
//! evaluate itself against a metadata object for local search.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::query::CanonicalRange;

/// Metadata key holding the market capitalization in USD.
pub const FIELD_MARKET_CAP: &str = "Market Cap";
/// Metadata key holding the traded volume in shares.
pub const FIELD_VOLUME: &str = "Volume";
pub const FIELD_SECTOR: &str = "Sector";
pub const FIELD_TICKER: &str = "Ticker";

/// Placeholder the dataset uses for incomplete records.
pub const PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Range { min: f64, max: f64 },
    Eq { value: String },
    Ne { value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clause {
    pub field: String,
    #[serde(flatten)]
    pub condition: Condition,
}

impl Clause {
    pub fn range(field: &str, range: CanonicalRange) -> Self {
        Self {
            field: field.to_string(),
            condition: Condition::Range {
                min: range.min,
                max: range.max,
            },
        }
    }

    pub fn eq(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            condition: Condition::Eq {
                value: value.into(),
            },
        }
    }

    pub fn ne(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            condition: Condition::Ne {
                value: value.into(),
            },
        }
    }

    fn operator_value(&self) -> Value {
        match &self.condition {
            Condition::Range { min, max } => json!({ "$gte": min, "$lte": max }),
            Condition::Eq { value } => json!({ "$eq": value }),
            Condition::Ne { value } => json!({ "$ne": value }),
        }
    }

    /// A missing field fails range and equality checks but passes `$ne`.
    fn matches(&self, metadata: &Map<String, Value>) -> bool {
        let field = metadata.get(&self.field);
        match &self.condition {
            Condition::Range { min, max } => field
                .and_then(Value::as_f64)
                .is_some_and(|v| CanonicalRange { min: *min, max: *max }.contains(v)),
            Condition::Eq { value } => field.and_then(Value::as_str) == Some(value.as_str()),
            Condition::Ne { value } => field.and_then(Value::as_str) != Some(value.as_str()),
        }
    }
}

/// Conjunction of clauses; an empty predicate matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterPredicate {
    clauses: Vec<Clause>,
}

impl FilterPredicate {
    /// Conjoin the given clauses, skipping the absent ones.
    pub fn all_of(clauses: impl IntoIterator<Item = Option<Clause>>) -> Self {
        Self {
            clauses: clauses.into_iter().flatten().collect(),
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn clauses_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Clause> + 'a {
        self.clauses.iter().filter(move |c| c.field == field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.clauses_for(field).next().is_some()
    }

    /// Operator-object form, e.g. `{"Volume": {"$gte": 0, "$lte": 1e6}}`.
    ///
    /// Two clauses on the same field are nested under `$and`.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        let mut overflow = Vec::new();
        for clause in &self.clauses {
            if object.contains_key(&clause.field) {
                overflow.push(json!({ clause.field.clone(): clause.operator_value() }));
            } else {
                object.insert(clause.field.clone(), clause.operator_value());
            }
        }

        if overflow.is_empty() {
            return Value::Object(object);
        }

        let mut all = vec![Value::Object(object)];
        all.extend(overflow);
        json!({ "$and": all })
    }

    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        self.clauses.iter().all(|clause| clause.matches(metadata))
    }
}
