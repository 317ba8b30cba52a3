//! Variable resolution module
//!
//! Provides parsing and resolution of `{name}`, `{{name}}` and structured
//! `${...}` references.
//!
//! # Usage
//!
//! ```
//! use courier_application::ports::StandardJsonPath;
//! use courier_application::variable_resolver::VariableResolver;
//! use courier_domain::{ScopeTarget, SnapshotCatalog, Variable, VariableStore};
//!
//! let mut store = VariableStore::new();
//! store.define(&ScopeTarget::Global, "host", Variable::new("localhost")).unwrap();
//!
//! let catalog = SnapshotCatalog::new();
//! let resolver = VariableResolver::new(&store, &catalog, &StandardJsonPath);
//! assert_eq!(resolver.substitute("http://{{host}}/api").unwrap(), "http://localhost/api");
//! ```

pub mod engine;
pub mod parser;
pub mod structured;

pub use engine::{ResolutionResult, VariableResolver};
pub use parser::{ParsedReference, is_valid_variable_name, parse_references};
pub use structured::StructuredPathResolver;
