//! site-pulse-core - Competitive metric comparison and recommendation engine
//!
//! This crate holds the pure, synchronous part of site-pulse. It performs no
//! I/O and can be called from any thread once its inputs are materialized.
//!
//! # Features
//!
//! - Parse PageSpeed Insights / Lighthouse output into validated snapshots
//! - Compare a target site against competitors per Core Web Vital
//! - Deduplicate, localize and prioritize improvement opportunities
//! - Assemble the immutable report handed to storage and delivery

pub mod assemble;
pub mod compare;
pub mod data;
pub mod error;
pub mod localize;
pub mod parser;
pub mod prioritize;

pub use assemble::ReportAssembler;
pub use compare::{compare, CompareConfig};
pub use data::{
    ComparisonResult, ComparisonStatus, Metric, MetricSnapshot, Opportunity, Priority,
    Recommendation, Report, Site, SiteRole, Strategy,
};
pub use error::{Error, Result};
pub use parser::{parse_from_string, RawMeasurement};
pub use prioritize::{prioritize, PriorityConfig};
