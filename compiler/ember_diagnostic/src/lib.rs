//! Diagnostic and error reporting for the Ember compiler.
//!
//! The backend never prints: every recoverable problem becomes a
//! [`Diagnostic`] collected into a [`DiagnosticReport`] that is returned
//! alongside the generated translation unit. Fatal configuration defects
//! (an unregistered dependency key) abort compilation through `Result`
//! instead.

mod diagnostic;
mod report;

pub use diagnostic::{Diagnostic, ErrorCode, Severity};
pub use report::DiagnosticReport;
