//! Prefetch classification
//!
//! Decides whether an access is a genuine visit or a speculative fetch issued
//! by the browser or a client-side router. Ambiguous signals are resolved
//! toward "speculative": an under-counted click is cheap, a prefetch that
//! burns a strict quota is not.

use std::collections::HashMap;

/// How an access should be treated by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Genuine navigation, may consume quota
    Real,
    /// Prefetch or prerender, read-only
    Speculative,
}

/// Request header view with case-insensitive names
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders(HashMap<String, String>);

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header; repeated names are joined with `", "` like an HTTP list
    pub fn insert(&mut self, name: &str, value: &str) {
        self.0
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.insert(name, value);
        }
        headers
    }

    /// Header is present with a non-blank value
    fn is_marked(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.trim().is_empty())
    }

    /// Any `,` or `;` separated item of the header equals `item`
    fn lists(&self, name: &str, item: &str) -> bool {
        self.get(name).is_some_and(|v| {
            v.split([';', ','])
                .any(|entry| entry.trim().eq_ignore_ascii_case(item))
        })
    }
}

impl From<&actix_web::http::header::HeaderMap> for RequestHeaders {
    fn from(map: &actix_web::http::header::HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map.iter() {
            // 非 UTF-8 的头部值不参与判断
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str(), value);
            }
        }
        headers
    }
}

const PURPOSE: &str = "purpose";
const SEC_PURPOSE: &str = "sec-purpose";
const NEXT_ROUTER_PREFETCH: &str = "next-router-prefetch";
const MIDDLEWARE_PREFETCH: &str = "x-middleware-prefetch";
const SEC_FETCH_MODE: &str = "sec-fetch-mode";

/// Classify a request from its headers alone.
///
/// Speculative when any of:
/// - `Purpose: prefetch`
/// - `Sec-Purpose` lists `prefetch` (e.g. `prefetch;prerender`)
/// - `Next-Router-Prefetch` or `X-Middleware-Prefetch` is set
/// - `Sec-Fetch-Mode: no-cors`
pub fn classify(headers: &RequestHeaders) -> AccessKind {
    let purpose_is_prefetch = headers.lists(PURPOSE, "prefetch");
    let sec_purpose_is_prefetch = headers.lists(SEC_PURPOSE, "prefetch");

    let router_marker =
        headers.is_marked(NEXT_ROUTER_PREFETCH) || headers.is_marked(MIDDLEWARE_PREFETCH);

    let no_cors = headers.lists(SEC_FETCH_MODE, "no-cors");

    if purpose_is_prefetch || sec_purpose_is_prefetch || router_marker || no_cors {
        AccessKind::Speculative
    } else {
        AccessKind::Real
    }
}

/// Classify with the request method taken into account.
///
/// `HEAD` never navigates, so it is speculative when `head_is_speculative` is set.
pub fn classify_request(
    is_head: bool,
    headers: &RequestHeaders,
    head_is_speculative: bool,
) -> AccessKind {
    if is_head && head_is_speculative {
        return AccessKind::Speculative;
    }
    classify(headers)
}
