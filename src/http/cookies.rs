//! Session cookie store

#![allow(dead_code)]

use reqwest::header::{HeaderMap, SET_COOKIE};
use std::collections::BTreeMap;

/// Name/value cookies kept for the lifetime of a client
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CookieStore {
    cookies: BTreeMap<String, String>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cookies: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Copy of this store with `overrides` layered on top
    pub fn layered(&self, overrides: &BTreeMap<String, String>) -> Self {
        let mut merged = self.clone();
        merged
            .cookies
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Value for a `Cookie` request header, if there is anything to send
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        Some(pairs.join("; "))
    }

    /// Apply `Set-Cookie` headers from a response
    ///
    /// Only the name/value pair is kept. A `Max-Age=0` attribute removes the
    /// cookie.
    pub fn absorb_set_cookie(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };

            let mut parts = raw.split(';');
            let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let expired = parts.any(|attr| {
                attr.trim()
                    .split_once('=')
                    .map(|(k, v)| k.trim().eq_ignore_ascii_case("max-age") && v.trim() == "0")
                    .unwrap_or(false)
            });

            if expired {
                self.cookies.remove(name);
            } else {
                self.cookies
                    .insert(name.to_string(), value.trim().trim_matches('"').to_string());
            }
        }
    }
}
