//! Query a catalog of spectral observations by target, wavelength coverage,
//! processing level and sightline parameters (reddening, spectral type).
//!
//! The tables are loaded once into a [`Catalog`](data::model::Catalog) and
//! queried through an [`Oracle`](oracle::Oracle).

pub mod config;
pub mod data;
pub mod error;
pub mod observe;
pub mod oracle;
pub mod state;

pub use config::{OracleConfig, OrderConflictPolicy};
pub use data::filter::ObjectFilter;
pub use data::model::{Catalog, ParameterKind, ParameterValue, ReferenceId};
pub use error::OracleError;
pub use oracle::{ObservationQuery, Oracle, ParameterQuery, ReferencePolicy};
