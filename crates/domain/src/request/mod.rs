//! HTTP request domain types

mod auth;
mod body;
mod header;
mod method;
mod query;
mod spec;

pub use auth::{ApiKeyLocation, AuthConfig};
pub use body::{FileAttachment, FormField, RequestBody};
pub use header::{Header, Headers};
pub use method::HttpMethod;
pub use query::{QueryParam, QueryParams};
pub use spec::PreparedRequest;
