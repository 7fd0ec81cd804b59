//! Shared types for the openflag evaluation library.
//!
//! Everything that crosses a crate boundary lives here: flag values and
//! evaluation contexts, the provider contract, lifecycle statuses and
//! provider events, evaluation results and the hook contract.

pub mod context;
pub mod errors;
pub mod evaluation;
pub mod events;
pub mod hooks;
pub mod provider;
pub mod status;
pub mod value;

pub use context::*;
pub use errors::*;
pub use evaluation::*;
pub use events::*;
pub use hooks::*;
pub use provider::*;
pub use status::*;
pub use value::*;
