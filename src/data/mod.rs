/// Data layer: tables, loading, and observation-log filtering.
///
/// Architecture:
/// ```text
///  ObsLog / E(B-V) / SpType  (.csv / .json)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse files → Catalog
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │    Catalog    │  ObservationLog + two ParameterTables
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  object / order / wavelength predicates → row indices
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
