//! Filtered semantic search over stock descriptions.
//!
//! - `query`: user intent, sectors, display units and range validation
//! - `filter`: metadata predicates and their wire form
//! - `planner`: query → retrieval request, raw matches → results
//! - `result`: raw backend matches and normalized stock results
//! - `service`: embed, query and normalize for one search action

mod errors;
pub mod filter;
mod planner;
mod query;
mod result;
mod service;

pub use errors::SearchError;
pub use planner::{PlannerSettings, QueryPlanner, RetrievalRequest};
pub use query::{DisplayRange, DisplayUnit, SearchQuery, Sector, ANY_SECTOR, MAX_RESULT_COUNT};
pub use result::{RawMatch, StockResult};
pub use service::{SearchLimits, SearchOutcome, SearchService};
