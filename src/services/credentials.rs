// src/services/credentials.rs
//! Credential lookup: hosted secret store first, then the local environment.

use std::{
    fmt::{self, Debug},
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, warn};

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    SecretStore,
    ProcessEnv,
    EnvFile,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub value: String,
    pub source: CredentialSource,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolves secrets through a fixed fallback chain:
/// mounted secret files, then process env, then the `.env` file.
#[derive(Clone)]
pub struct CredentialResolver {
    secrets_dir: PathBuf,
    env_file: PathBuf,
    env: EnvLookup,
}

impl Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("secrets_dir", &self.secrets_dir)
            .field("env_file", &self.env_file)
            .finish_non_exhaustive()
    }
}

impl CredentialResolver {
    pub fn new(secrets_dir: impl Into<PathBuf>, env_file: impl Into<PathBuf>) -> Self {
        Self {
            secrets_dir: secrets_dir.into(),
            env_file: env_file.into(),
            env: Arc::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the process environment lookup.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    pub fn resolve(&self, key: &str) -> Option<Credential> {
        if let Some(value) = read_secret_file(&self.secrets_dir, key) {
            debug!(key, "credential found in secret store");
            return Some(Credential { value, source: CredentialSource::SecretStore });
        }

        if let Some(value) = (self.env)(key).and_then(non_empty) {
            debug!(key, "credential found in process environment");
            return Some(Credential { value, source: CredentialSource::ProcessEnv });
        }

        if let Some(value) = read_env_file(&self.env_file, key) {
            debug!(key, "credential found in env file");
            return Some(Credential { value, source: CredentialSource::EnvFile });
        }

        None
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn read_secret_file(dir: &Path, key: &str) -> Option<String> {
    // Keys are plain names; anything path-like never leaves the store.
    if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
        return None;
    }
    fs::read_to_string(dir.join(key)).ok().and_then(non_empty)
}

fn read_env_file(path: &Path, key: &str) -> Option<String> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read env file");
            return None;
        }
    };

    let mut found = None;
    for item in iter {
        match item {
            Ok((k, v)) if k == key => found = Some(v),
            Ok(_) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed line in env file");
                break;
            }
        }
    }
    found.and_then(non_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: &str = "GROQ_API_KEY";

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn secret_store_wins_over_local_sources() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(KEY), "from-store\n").unwrap();
        let env_file = dir.path().join(".env");
        fs::write(&env_file, "GROQ_API_KEY=from-file\n").unwrap();

        let resolver = CredentialResolver::new(dir.path(), &env_file)
            .with_env_lookup(|_| Some("from-env".to_string()));
        let cred = resolver.resolve(KEY).unwrap();
        assert_eq!(cred.value, "from-store");
        assert_eq!(cred.source, CredentialSource::SecretStore);
    }

    #[test]
    fn process_env_beats_env_file() {
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join(".env");
        fs::write(&env_file, "GROQ_API_KEY=from-file\n").unwrap();

        let resolver = CredentialResolver::new(dir.path().join("missing"), &env_file)
            .with_env_lookup(|_| Some("from-env".to_string()));
        assert_eq!(resolver.resolve(KEY).unwrap().source, CredentialSource::ProcessEnv);
    }

    #[test]
    fn falls_back_to_env_file() {
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join(".env");
        fs::write(&env_file, "OTHER=1\nGROQ_API_KEY=\"gsk_test\"\n").unwrap();

        let resolver = CredentialResolver::new(dir.path(), &env_file).with_env_lookup(no_env);
        let cred = resolver.resolve(KEY).unwrap();
        assert_eq!(cred.value, "gsk_test");
        assert_eq!(cred.source, CredentialSource::EnvFile);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(KEY), "   \n").unwrap();
        let resolver = CredentialResolver::new(dir.path(), dir.path().join(".env"))
            .with_env_lookup(|_| Some(String::new()));
        assert!(resolver.resolve(KEY).is_none());
    }

    #[test]
    fn debug_output_hides_value() {
        let cred = Credential { value: "gsk_secret".into(), source: CredentialSource::EnvFile };
        assert!(!format!("{cred:?}").contains("gsk_secret"));
    }
}
