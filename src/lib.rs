//! hrmake - compile HttpRunner testcases into pytest files
//!
//! YAML/JSON testcase documents are normalized, validated into a typed
//! model, and rendered as Python modules built on HttpRunner's fluent
//! `Config`/`Step` API. Referenced testcases are compiled on demand and
//! imported by the modules that call them.

pub mod assertions;
pub mod batch;
pub mod chain;
pub mod compat;
pub mod configuration;
pub mod emitter;
pub mod errors;
pub mod formatter;
pub mod loader;
pub mod maker;
pub mod model;
pub mod paths;
pub mod project;
pub mod pyliteral;

// Re-export commonly used types
pub use batch::{main_make, MakeReport};
pub use configuration::MakeSettings;
pub use errors::{MakeError, Result};
pub use maker::Maker;
pub use model::TestCase;
