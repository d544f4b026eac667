//! Streaming writer for IBM SPSS System Files (.sav)
//!
//! Declares a schema (variables with types, widths, measures, labels,
//! value labels), streams rows keyed by variable name, and produces a
//! compressed .sav file on disk or in memory. Rows are encoded as they
//! arrive; nothing is materialized.

pub mod sav;

pub use sav::{write_sav, Error, Measure, Result, SavWriter, ValueLabel, VarType, Variable};
