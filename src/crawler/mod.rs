//! Crawl orchestration
//!
//! This module contains the ingestion control logic, including:
//! - The per-cycle pipeline (fetch, dedup, extract, normalize, enrich, persist)
//! - The controller that schedules cycles and guards against overlap
//! - Cycle statistics and status snapshots

mod controller;
mod cycle;
mod status;

pub use controller::CrawlerController;
pub use cycle::{config_snapshot, run_cycle, Pipeline};
pub use status::{
    CrawlerStatus, CumulativeStats, CycleReport, CycleStats, ErrorEntry, ErrorLog,
};
