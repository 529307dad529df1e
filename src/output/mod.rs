//! Output module for command-line reports
//!
//! This module handles:
//! - Rendering store statistics and the latest run
//! - Rendering cycle reports and duplicate scans
//! - Rendering controller status

pub mod stats;

pub use stats::{
    format_cycle_report, format_scan_report, format_status, format_store_stats, percentage,
    print_cycle_report, print_scan_report, print_status, print_store_stats,
};
