//! Effect commands: the edit-request protocol accepted by a render session.
//!
//! Two external text syntaxes feed one canonical representation:
//!
//! ```text
//! {"effect":"Rotate","degree":90}      JSON object form
//! cmd = zoom-in | value = 1.2          pipe-delimited key/value form
//! ```
//!
//! Both are stable caller-facing inputs and are accepted without a version
//! flag. The parser normalizes either into an [`EffectCommand`] holding the
//! caller's effect name, the numeric parameter map, and the validated
//! [`Effect`] variant that execution dispatches on.

mod parser;
mod types;

pub use parser::parse;
pub use types::{Effect, EffectCommand};
