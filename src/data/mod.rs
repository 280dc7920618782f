//! Data layer: core types, loading, filtering, aggregation and export.
//!
//! Architecture:
//! ```text
//!  Lubrificante_Anexo_A.csv  (';', Latin-1)
//!        │
//!        ▼
//!   ┌──────────┐       ┌─────────┐
//!   │  loader  │ ◄───► │  cache  │  parquet snapshot of a parsed table
//!   └──────────┘       └─────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  Table   │  categorical label columns + volume column
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter  │  criteria → FilteredView (row indices)
//!   └──────────┘
//!        │
//!        ├──────────────┐
//!        ▼              ▼
//!   ┌───────────┐  ┌──────────┐
//!   │ aggregate │  │  export  │  view → delimited bytes
//!   └───────────┘  └──────────┘
//! ```

pub mod aggregate;
pub mod cache;
pub mod export;
pub mod filter;
pub mod format;
pub mod loader;
pub mod model;
