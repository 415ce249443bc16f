//! # dashpulse-core
//!
//! Core library for dashpulse - a dashboard usage analytics engine.
//!
//! This library provides:
//! - Domain types for visits, directory users and org units
//! - Parsers for the platform's feed exports
//! - The analytics stages and the report pipeline
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three steps:
//! - **Feeds:** Raw exports (visit rows, user directory, org units)
//! - **Records:** Validated [`types`] produced by [`ingest`]
//! - **Metrics:** Derived by [`analytics`], recomputed on every run
//!
//! ## Example
//!
//! ```rust,no_run
//! use chrono::{NaiveDate, Utc};
//! use dashpulse_core::analytics::{generate_report, ReportInputs, ReportQuery};
//! use dashpulse_core::ingest::RawVisitRow;
//! use dashpulse_core::{Config, ReportWindow};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let window = ReportWindow::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//! )
//! .expect("valid window");
//!
//! let inputs = ReportInputs {
//!     visit_rows: vec![RawVisitRow::new("2024-01-03T10:00:00", "alice")],
//!     ..Default::default()
//! };
//!
//! let report = generate_report(&ReportQuery::new(Utc::now()).with_window(window), &inputs, &config);
//! println!("{} visits", report.dashboard.total_visits);
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{generate_report, Report, ReportInputs, ReportQuery};
pub use config::Config;
pub use error::{DataIssue, Error, Result};
pub use filter::DirectoryFilter;
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod types;
