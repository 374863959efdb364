//! Credential loading from the process environment and an optional `.env` file.
//!
//! Secrets never live in `config.toml`. The service refuses to start when
//! [`API_KEY_VAR`] or the configured provider's key is missing.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;

/// Pre-shared key expected in the `x-api-key` header of the health endpoint.
pub const API_KEY_VAR: &str = "HONEYPOT_API_KEY";

/// Every variable the service reads as a secret.
pub const KNOWN_KEYS: [&str; 4] = [API_KEY_VAR, "GROQ_API_KEY", "OPENAI_API_KEY", "OLLAMA_URL"];

/// Runtime credentials.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Collect [`KNOWN_KEYS`] through an env lookup function.
    ///
    /// Takes a resolver so tests never touch the real process environment.
    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Self {
        let vars = KNOWN_KEYS
            .iter()
            .filter_map(|key| env(key).map(|value| ((*key).to_owned(), value)))
            .collect();
        Self { vars }
    }

    /// Returns a credential value for a key, if present and non-blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns a required credential or an error when missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is absent or blank.
    pub fn require(&self, key: &str) -> anyhow::Result<String> {
        self.get(key)
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("missing required credential: {key}"))
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merged(mut self, other: Credentials) -> Self {
        self.vars.extend(other.vars);
        self
    }
}

/// Load credentials from a `.env` file.
///
/// # Errors
///
/// Returns an error if the file does not exist, permissions are too broad,
/// or parsing fails.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "credentials file does not exist: {}",
            path.display()
        ));
    }

    validate_private_permissions(path)?;

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        vars.insert(key, value);
    }

    Ok(Credentials { vars })
}

/// Load credentials for `serve`: optional `.env` file, then process env on top.
///
/// # Errors
///
/// Returns an error if the `.env` file exists but is unreadable or too
/// permissive.
pub fn load_runtime_credentials(env_file: &Path) -> anyhow::Result<Credentials> {
    let from_file = if env_file.exists() {
        load_credentials(env_file)?
    } else {
        Credentials::default()
    };
    Ok(from_file.merged(Credentials::from_env(|key| std::env::var(key).ok())))
}

#[cfg(unix)]
fn validate_private_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to inspect credentials file {}", path.display()))?;
    let mode = metadata.permissions().mode() & 0o777;

    if mode & 0o077 != 0 {
        return Err(anyhow::anyhow!(
            "credentials file {} must be 0600, found {:o}",
            path.display(),
            mode
        ));
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_private_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}
