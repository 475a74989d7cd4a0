//! Process entry points.
//!
//! The relay has a single mode of operation, [`run`].

pub mod run;
