//! Search orchestrator.
//!
//! Entry point of the engine:
//! - **Metadata**: resolve English and localized titles (cache-backed)
//! - **Routing**: pick the title variant each provider receives
//! - **Dispatch**: one task per provider, failures and panics isolated
//! - **Ranking**: per-provider, per-bucket confidence ordering

mod runner;
mod types;

pub use runner::{build_orchestrator, Orchestrator, OrchestratorBuilder};
pub use types::{CombinedSearchResults, Route, SearchError, SmartSearchResult};
