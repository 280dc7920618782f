//! Lubricant shipment dashboard core.
//!
//! Pipeline: zip archive → [`archive`] → delimited file → [`data::loader`] →
//! [`data::model::Table`] → [`data::filter`] → [`data::aggregate`] and
//! [`data::export`]. [`session::Session`] holds the state of one interactive
//! session; the egui front-end in `main.rs` only talks to it.

pub mod archive;
pub mod config;
pub mod data;
pub mod error;
pub mod session;

pub use config::DashboardConfig;
pub use error::{ArchiveError, Error, ExportError, LoadError};
pub use session::{Session, UploadState};
