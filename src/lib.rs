//! Analysis of retarding-potential current–voltage traces.
//!
//! Each run loads the traces of one measurement series, rescales the drive
//! voltage, smooths both columns, optionally locates the last two current
//! minima, and writes comparison plots and per-minimum summary tables.
pub mod analysis;
pub mod config;
pub mod types;
