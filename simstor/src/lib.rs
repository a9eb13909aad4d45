//! The simstor synthetic storage cluster.
//!
//! This library supports the simstor binary found elsewhere in this project.
//! It drives the synthesizer from `simstor_events` on a paced loop, hands each
//! event to a log sink and exports what it has done as Prometheus metrics.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod generator;
pub mod host;
pub mod signal;
pub mod sink;
pub mod telemetry;
