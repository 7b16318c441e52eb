//! Match-scoring and notification dispatch engine for a real-estate CRM.
//!
//! The crate pairs buyer requirement profiles with property listings: a
//! weighted rubric scores each pair, ranked matches cross configurable
//! thresholds into alerts, notifications, and drafted outreach, and recurring
//! schedules replay the pipeline for saved profiles.

pub mod config;
pub mod error;
pub mod matching;
pub mod scheduling;
pub mod telemetry;
