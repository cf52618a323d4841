//! Electrify - rural electrification predictor
//!
//! This library cleans village-level survey data, summarizes it, and fits an
//! ordinary least-squares model that predicts the share of electrified
//! households from grid distance and population density.
//!
//! The stages run in sequence: [`cleaning`] → [`explore`] → [`preprocess`] →
//! [`model`], orchestrated by [`pipeline`] and configured by [`config`].

pub mod cleaning;
pub mod cli;
pub mod config;
pub mod error;
pub mod explore;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod report;
pub mod table;

pub use error::{PipelineError, Result, Stage};
