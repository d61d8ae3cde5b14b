/// Data layer: retrieval, parsing and row-level cleaning.
///
/// Architecture:
/// ```text
///  https://… / .xlsx / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  fetch    │  download once into the cache path
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  RawTable → Dataset (complete rows only)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  invalid / outlier / undefined-sex rows → CleanedData
///   └──────────┘
/// ```

pub mod fetch;
pub mod filter;
pub mod loader;
pub mod model;
