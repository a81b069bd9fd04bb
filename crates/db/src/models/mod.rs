//! Row structs for the alert tables.
//!
//! Each row derives `FromRow` and converts into its `vigil_core` domain type
//! via `TryFrom`, since severities and kinds are stored as text.

pub mod alert;
