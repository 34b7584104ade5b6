//! Hierarchical, typed runtime options tree for Torus.
//!
//! This crate provides the configuration tree consulted during problem
//! setup: a tree of named sections and keys holding dynamically-typed
//! values with strict consistency guarantees. Input ingestion (file
//! parsing) and the numerical types themselves are external collaborators
//! that talk to the tree only through its get/set/section API.
//!
//! # Key Features
//!
//! - **Typed values with explicit coercion**: a closed tagged union with a
//!   total coercion table ([`OptionValue`])
//! - **Default-consistency guard**: all call sites must agree on the
//!   canonical default for an optional parameter
//! - **Usage audit**: unread configuration entries are enumerable after
//!   setup, for dead-key detection
//! - **Attribute side-channel**: per-node metadata independent of the
//!   node's own value
//! - **Identity-preserving deep assignment**: copying a subtree into an
//!   existing node rebinds every copied child's parent to the target
//!
//! # Example
//!
//! ```rust
//! use torus_options::Options;
//!
//! let root = Options::new();
//! root.at("mesh").set("nx", 64, "input file").unwrap();
//!
//! // Explicitly set keys read back regardless of the default
//! let nx = root.at("mesh").get("nx", 128, true).unwrap();
//! assert_eq!(nx, 64);
//!
//! // Unset keys fall back to their (consistent) default
//! let ny = root.at("mesh").get("ny", 128, true).unwrap();
//! assert_eq!(ny, 128);
//!
//! // Anything set but never read shows up in the audit
//! root.set("typo_key", true, "input file").unwrap();
//! assert_eq!(root.unused().len(), 1);
//! ```

mod attributes;
mod audit;
mod error;
mod node;
mod value;

pub use attributes::AttributeStore;
pub use audit::UnusedEntry;
pub use error::{OptionsError, Result};
pub use node::Options;
pub use value::{OpaqueValue, OptionScalar, OptionValue};

/// Read an option named after the variable it populates.
///
/// `get_option!(options, val, 3)` performs a defaulted read of the key
/// `"val"` on `options` and assigns the result into `val`, evaluating to
/// a [`Result`]`<()>`. The expression may be a node, a reference, or
/// anything else a method call auto-references; one macro covers every
/// call shape.
#[macro_export]
macro_rules! get_option {
    ($options:expr, $var:ident, $default:expr) => {
        match $options.at(stringify!($var)).with_default($default) {
            ::core::result::Result::Ok(value) => {
                $var = value;
                ::core::result::Result::Ok(())
            }
            ::core::result::Result::Err(error) => ::core::result::Result::Err(error),
        }
    };
}
