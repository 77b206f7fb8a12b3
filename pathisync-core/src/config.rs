//! Credential and server configuration.
//!
//! # Sources (later wins)
//!
//! ```text
//! <root>/.env          PATHIFY_TOKEN=...  FLOW_SERVER_URL=https://...
//! process environment  PATHIFY_TOKEN / FLOW_SERVER_URL
//! CLI flags            --token / --server-url   (applied by the caller)
//! ```
//!
//! The resolved [`Settings`] hold already-validated strings; nothing
//! downstream re-reads the environment.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::ConfigError;

pub const TOKEN_VAR: &str = "PATHIFY_TOKEN";
pub const SERVER_URL_VAR: &str = "FLOW_SERVER_URL";
pub const ENV_FILE: &str = ".env";

/// Resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Absolute http(s) base URL without a trailing slash.
    pub server_url: String,
    /// Opaque bearer credential sent as the `flow-token` header.
    pub token: String,
}

impl Settings {
    /// Build settings from explicit parts, validating the URL and token.
    pub fn new(server_url: &str, token: &str) -> Result<Self, ConfigError> {
        if token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(Self {
            server_url: normalize_base_url(server_url)?,
            token: token.trim().to_string(),
        })
    }
}

/// `<root>/.env`: pure, no I/O.
pub fn env_file_path(root: &Path) -> PathBuf {
    root.join(ENV_FILE)
}

/// Load settings for the project at `root` from `.env` and the process
/// environment.
pub fn load(root: &Path) -> Result<Settings, ConfigError> {
    let file_vars = read_env_file(&env_file_path(root))?;
    resolve(&file_vars, |key| std::env::var(key).ok())
}

/// Merge `.env` values with an environment lookup (environment wins).
pub fn resolve<F>(file_vars: &HashMap<String, String>, env: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| {
        env(key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| file_vars.get(key).cloned())
            .filter(|v| !v.trim().is_empty())
    };
    let token = lookup(TOKEN_VAR).ok_or(ConfigError::MissingToken)?;
    let server_url = lookup(SERVER_URL_VAR).ok_or(ConfigError::MissingServerUrl)?;
    Settings::new(&server_url, &token)
}

/// Read a `.env` file. A missing file yields an empty map.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_env(&contents).map_err(|line| ConfigError::Malformed {
        path: path.to_path_buf(),
        line,
    })
}

/// Parse `KEY=VALUE` lines. Returns the 1-based number of the first bad line.
///
/// Double-quoted values understand `\n`, `\t`, `\r` and backslash escapes and
/// may span lines; single-quoted values are literal. Unquoted values end at
/// a ` #` comment. An unterminated quote or text after a closing quote is an
/// error rather than a guess.
pub fn parse_env(contents: &str) -> Result<HashMap<String, String>, usize> {
    let mut vars = HashMap::new();
    let mut lines = contents.lines().enumerate();
    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        let line = raw.trim_start();
        if line.trim_end().is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            return Err(line_no);
        };
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(line_no);
        }

        let value = value.trim_start();
        let parsed = match value.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let mut body = value[1..].to_string();
                loop {
                    match scan_quoted(&body, quote) {
                        Quoted::Closed(parsed) => break parsed,
                        Quoted::Trailing => return Err(line_no),
                        Quoted::Open => {
                            let Some((_, next)) = lines.next() else {
                                return Err(line_no);
                            };
                            body.push('\n');
                            body.push_str(next);
                        }
                    }
                }
            }
            _ => strip_inline_comment(value).trim_end().to_string(),
        };
        vars.insert(key.to_string(), parsed);
    }
    Ok(vars)
}

enum Quoted {
    Closed(String),
    /// No closing quote yet; the value continues on the next line.
    Open,
    /// Something other than a comment follows the closing quote.
    Trailing,
}

/// Scan a quoted value body, starting after the opening quote.
fn scan_quoted(body: &str, quote: char) -> Quoted {
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((at, c)) = chars.next() {
        match c {
            '\\' if quote == '"' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, other)) => value.push(other),
                None => value.push('\\'),
            },
            c if c == quote => {
                let rest = body[at + c.len_utf8()..].trim();
                return if rest.is_empty() || rest.starts_with('#') {
                    Quoted::Closed(value)
                } else {
                    Quoted::Trailing
                };
            }
            c => value.push(c),
        }
    }
    Quoted::Open
}

fn strip_inline_comment(value: &str) -> &str {
    value
        .find(" #")
        .or_else(|| value.find("\t#"))
        .map_or(value, |at| &value[..at])
}

/// Validate an absolute http(s) base URL and strip trailing slashes.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        url: trimmed.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(invalid("missing host"));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
