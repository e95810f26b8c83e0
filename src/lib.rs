//! Per-source log batching and shipping to an ordered, size-limited
//! ingestion API.
//!
//! Events from the host are routed by [`host::EventRouter`] into a
//! [`shipper::BatchRegistry`], which owns one batch per source, flushes on
//! count or size limits, and keeps each stream's continuation token chain
//! intact. A [`shipper::Sweeper`] flushes partially filled batches on a fixed
//! interval.

pub mod cli;
pub mod config;
pub mod host;
pub mod remote;
pub mod shipper;
pub mod status;
