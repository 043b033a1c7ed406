//! Paginated streaming fetch pipeline.
//!
//! ```text
//! PageFetcher → CursorWalker → EnrichmentStage (optional) → Listing → consumer
//! ```
//!
//! - [`PageFetcher`]: one HTTP round-trip, one decoded [`PageEnvelope`]
//! - [`CursorWalker`]: follows `next` cursors into a lazy item stream
//! - [`EnrichmentStage`]: per-item secondary fetches, concurrent but in order
//! - [`Listing`]: what printers consume

pub mod enrich;
pub mod fetcher;
pub mod listing;
pub mod page;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use enrich::{Enricher, Enrichment, EnrichmentStage};
pub use fetcher::{PageFetcher, PageFormat, RestPageFetcher};
pub use listing::{Listing, ListingState};
pub use page::{PageEnvelope, PageRequest};
pub use walker::CursorWalker;
