//! Variable and scope domain types

mod store;
mod variable;

pub use store::{ActiveEnvironment, ScopeTarget, VariableStore};
pub use variable::{ResolvedVariable, Variable, VariableMap, VariableScope};
