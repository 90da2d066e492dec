//! Resource API layer

mod gists;

pub use gists::{GistsApi, DEFAULT_API_VERSION};
