/// Data layer: core types, loading, filtering, aggregation and export.
///
/// Architecture:
/// ```text
///  upload (.csv / .parquet)   remote OWID CSV
///              │                   │
///              └────────┬──────────┘
///                       ▼
///                 ┌──────────┐
///                 │  loader   │  project 4 columns → Dataset   (cached by SourceKey)
///                 └──────────┘
///                       │
///                       ▼
///                 ┌──────────┐
///                 │  filter   │  locations ∩ [start, end] → FilteredView   (cached)
///                 └──────────┘
///                       │
///          ┌────────────┼─────────────┐
///          ▼            ▼             ▼
///     aggregate      charts/table    export
/// ```

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod source;
