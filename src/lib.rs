//! Extensible network health checks.
//!
//! A [`Registry`](probes::Registry) maps protocol names to probe factories.
//! Callers create a fresh probe per run, hand it the instruction line and the
//! shared [`TestOptions`](probes::TestOptions), then run it against a target:
//!
//! ```no_run
//! use healthprobe::probes::{check, global_registry, TestOptions};
//!
//! # async fn example() -> Result<(), healthprobe::probes::ProbeError> {
//! check(
//!     global_registry(),
//!     "smtp",
//!     "mail.example.com must run smtp with port 587",
//!     &TestOptions::default(),
//!     "mail.example.com",
//! )
//! .await
//! # }
//! ```

pub mod cli;
pub mod network;
pub mod output;
pub mod probes;
