//! HTTP layer
//!
//! A thin client over `reqwest` with the behaviour API tests need: retries
//! below the caller, status assertions, per-call overrides that never leak
//! into the session, and a request/response trail for every call.

mod client;
mod cookies;
mod request;
mod response;
mod retry;

pub use client::{HttpClient, HttpError, TlsVerification};
pub use request::RequestOptions;
pub use response::HttpResponse;
