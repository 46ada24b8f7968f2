#![doc = include_str!("../README.md")]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, missing_docs)]
#![allow(
    clippy::similar_names,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod bdd;
mod cache;
mod config;
mod construction;
mod error;
mod export;
mod kernel;
mod operations;
mod operator;
mod prime;
mod quant;
mod replace;

pub use bdd::{Bdd, BddNode};
pub use config::BddConfig;
pub use error::BddError;
pub use kernel::BddStatistics;
pub use operator::BddOp;
pub use replace::BddReplacer;
