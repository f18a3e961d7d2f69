//! Manifest header block parsing.
//!
//! Only the main section is read. Continuation lines start with one space
//! and are appended to the previous value. Interpreting the headers beyond
//! identity is left to the host framework.

use strata_api::{ContentProvider, Headers};

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
pub const SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
pub const VERSION: &str = "Bundle-Version";
pub const DEFAULT_VERSION: &str = "0.0.0";

/// Parse the main section of a manifest.
pub fn parse(bytes: &[u8]) -> Headers {
    let text = String::from_utf8_lossy(bytes);
    let mut headers = Headers::new();
    let mut current: Option<(String, String)> = None;

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() {
            // End of main section
            break;
        }
        if let Some(rest) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(rest);
            }
            continue;
        }
        if let Some((key, value)) = current.take() {
            headers.insert(key, value);
        }
        if let Some((key, value)) = line.split_once(':') {
            current = Some((key.trim().to_string(), value.trim_start().to_string()));
        }
    }
    if let Some((key, value)) = current {
        headers.insert(key, value);
    }
    headers
}

/// Read and parse `META-INF/MANIFEST.MF` from a provider.
pub fn read(content: &dyn ContentProvider) -> Option<Headers> {
    let entry = content.entry(MANIFEST_PATH)?;
    match entry.read_all() {
        Ok(bytes) => Some(parse(&bytes)),
        Err(e) => {
            tracing::debug!("Unreadable manifest in {}: {}", content.origin(), e);
            None
        }
    }
}

/// Component identity carried by a header block.
///
/// Directives after `;` are dropped from the symbolic name.
pub fn identity(headers: &Headers) -> Option<(String, String)> {
    let raw = headers.get(SYMBOLIC_NAME)?;
    let name = raw.split(';').next().unwrap_or_default().trim();
    if name.is_empty() {
        return None;
    }
    let version = headers
        .get(VERSION)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_VERSION);
    Some((name.to_string(), version.to_string()))
}
