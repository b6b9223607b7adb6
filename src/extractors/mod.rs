// =============================================================================
// extractors/mod.rs - FROM MARKUP TO ADVISORIES
// =============================================================================
//
// Two pages, two extractors. The listing extractor finds what is new; the
// detail extractor fills in each advisory. Both read pages already fetched
// and parsed by the fetcher and neither does any I/O. The markup contract
// they share lives in `selectors`.
// =============================================================================

pub mod detail;
pub mod listing;
pub mod selectors;

pub use detail::{extract_detail, inspect_detail, DetailReport, ResolvedField};
pub use listing::ListingExtractor;
