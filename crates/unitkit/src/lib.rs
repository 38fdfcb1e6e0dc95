//! # Unitkit
//!
//! Named units of configuration work, applied on this host or on a remote
//! host over SSH.
//!
//! ## Core Concepts
//!
//! - **Unit**: A named collection of actions (`hi`, `apk_install`, ...)
//! - **Action**: A procedure run against an [`ArgumentContext`]
//! - **Registry**: The immutable set of units built at startup
//! - **Transport**: Runs a resolved action locally or over SSH
//! - **Engine**: Binds arguments, resolves, validates and dispatches
//!
//! ## Example
//!
//! ```ignore
//! use unitkit::{Engine, ExecutionOutcome, FnAction, Registry, Target, TransportOptions, Unit};
//!
//! fn hi(_ctx: &unitkit::ActionContext) -> anyhow::Result<ExecutionOutcome> {
//!     Ok(ExecutionOutcome::success("hiiii!"))
//! }
//!
//! let mut builder = Registry::builder();
//! builder.register(
//!     Unit::builder("hi")
//!         .action("apply", FnAction::new("Say hi", &[], hi))
//!         .build()?,
//! )?;
//! let registry = builder.build();
//!
//! let engine = Engine::new(&registry, TransportOptions::default());
//! let outcome = engine.apply::<&str>("hi", "apply", &[], &Target::Local)?;
//! let report = unitkit::report::report("hi", "apply", &outcome);
//! assert_eq!(report.line, "[hi|apply] hiiii!");
//! ```
//!
//! ## Failure classes
//!
//! An action that runs and fails returns an [`ExecutionOutcome`] with a
//! non-zero status. Anything that prevents the action from running is an
//! [`Error`] and maps to [`ENGINE_FAILURE_EXIT_CODE`].

pub mod args;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod process;
pub mod registry;
pub mod report;
pub mod script;
pub mod target;
pub mod transport;
pub mod unit;

pub use args::ArgumentContext;
pub use engine::Engine;
pub use error::{ENGINE_FAILURE_EXIT_CODE, Error, ErrorCategory, Result};
pub use outcome::ExecutionOutcome;
pub use registry::{Registry, RegistryBuilder, UnitSummary};
pub use report::Report;
pub use target::{SshTarget, Target};
pub use transport::{
    PasswordPrompt, SshOptions, Transport, TransportOptions, TransportState,
};
pub use unit::{Action, ActionContext, BoxedAction, FnAction, Param, Unit, UnitBuilder};
