//! Search orchestration: concurrent fan-out, dedup and ranking, tiered fallback.
//!
//! [`fallback::FallbackController`] picks the provider set for each tier,
//! [`fanout::Orchestrator`] runs the legs of one tier concurrently, and
//! [`ranking::rank_results`] merges what the successful legs returned.

pub mod fallback;
pub mod fanout;
pub mod ranking;

pub use fallback::{FallbackController, Tier, TierOutcome};
pub use fanout::{FanOutReport, LegOutcome, Orchestrator};
pub use ranking::rank_results;
