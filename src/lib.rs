//! # chartcheck
//!
//! A declarative test runner for rendered Helm charts. Test suites written in
//! YAML select templates, override release, capabilities and values, and
//! assert on the rendered documents, including snapshot comparisons.
//!
//! The pipeline for one test file:
//! 1. **Parse** suites from YAML ([`parser`]) into the [`model`].
//! 2. **Resolve** each job's effective context by layering overrides
//!    ([`model::overrides`]) and compiling values ([`values`]).
//! 3. **Render** through a [`render::ChartRenderer`].
//! 4. **Assert** with the [`validators`], comparing snapshots through the
//!    per-file [`snapshot::SnapshotCache`].
//! 5. **Report** [`results`] through the [`cli`].

pub use crate::errors::{ChartCheckError, Result};

pub mod assertion;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod model;
pub mod parser;
pub mod path;
pub mod render;
pub mod results;
pub mod runner;
pub mod snapshot;
pub mod validators;
pub mod values;
