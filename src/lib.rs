//! Astra: a voice-driven Linux desktop agent that only ever executes
//! whitelisted actions.
//!
//! ## Pipeline
//!
//! A transcript moves through five stages, each owned by one module:
//!
//! 1. [`router`] decides local vs cloud inference. Local-first:
//!    privacy-sensitive or system-action text never leaves the box.
//! 2. [`intent`] turns free text into a structured intent, templates
//!    first, one local model call as fallback.
//! 3. [`skills`] builds a command plan, rejecting anything outside
//!    the [`policy`] whitelists with a typed [`error::PlanError`].
//! 4. [`exec`] is the safety gate: sudo ban, confirmation sentinel,
//!    dry-run, GUI precondition, minimal child environment.
//! 5. [`audit`] encrypts a record of everything that reached the
//!    gate.
//!
//! The [`gateway`] serves this pipeline over HTTP; the binary drives
//! the same parts from the command line.

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::doc_markdown,
    clippy::float_cmp,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::struct_excessive_bools,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

pub mod audit;
pub mod backends;
pub mod config;
pub mod error;
pub mod exec;
pub mod gateway;
pub mod intent;
pub mod policy;
pub mod router;
pub mod security;
pub mod skills;
pub mod speech;
pub mod util;

pub use config::Config;
pub use error::PlanError;
