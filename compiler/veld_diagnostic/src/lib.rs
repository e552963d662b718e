//! Diagnostics for the Veld operator core.
//!
//! Every error the registries, resolvers, and parser produce converts into a
//! [`Diagnostic`]: an [`ErrorCode`], a severity, a message, and labeled
//! spans. Diagnostics are data; rendering them against source text belongs
//! to whichever front end consumes this core. No diagnostic is ever dropped:
//! declaration batches report exhaustively, and advisory notes (undischarged
//! capability invariants) ride alongside hard errors.

mod diagnostic;
mod error_code;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
