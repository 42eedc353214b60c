//! # Sweeplab: Experiment Run Cache & Outcome Aggregation
//!
//! Sweeplab runs parameterized reinforcement-learning training
//! experiments through an external trainer process, caches their
//! result files so repeated analysis does not retrain unnecessarily,
//! validates the shape of returned episode records, and produces the
//! aggregate statistics (rolling score trends, per-generation quantile
//! bands) used to compare runs across hyperparameter sweeps.
//!
//! ## Pipeline
//!
//! ```text
//! Sweep ──> RunCache (per config)
//!              ├─ hit:  read result file
//!              └─ miss: CommandTrainer ──> result file
//!           validate ──> TrainingOutcomes ──> flatten/aggregate
//!           ──> merged comparison table (labeled by swept value)
//! ```
//!
//! The trainer itself is an external collaborator behind the
//! [`trainer::Trainer`] trait; rendering of the aggregated tables is
//! out of scope; the crate hands out plain Arrow `RecordBatch`es
//! (with optional Parquet export).
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use sweeplab::aggregate::{quantiles_by_group, DEFAULT_QUANTILE_LEVELS};
//! use sweeplab::cache::RunCache;
//! use sweeplab::config::{ParamValue, RunConfig, SweepParam};
//! use sweeplab::sweep::Sweep;
//! use sweeplab::trainer::CommandTrainer;
//!
//! # fn main() -> sweeplab::Result<()> {
//! let trainer = CommandTrainer::new("./trainer");
//! let cache = RunCache::new("train_cache", trainer)?;
//!
//! let base = RunConfig::builder().num_generations(100).build();
//! let sweep = Sweep::new(
//!     base,
//!     SweepParam::ExploreRate,
//!     vec![ParamValue::Float(0.1), ParamValue::Float(0.5)],
//! );
//!
//! // Cached runs are reused; only unseen configurations retrain.
//! let merged = sweep.run(&cache, false)?;
//! let bands = quantiles_by_group(&merged, "explore_rate", "score", &DEFAULT_QUANTILE_LEVELS)?;
//! # let _ = bands;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod outcome;
pub mod sweep;
pub mod trainer;

pub use error::{Error, Result};
