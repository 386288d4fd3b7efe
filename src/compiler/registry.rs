//! Version resolution: map a semver-ish request to a concrete, loadable
//! compiler build.
//!
//! The default registry knows three sources, consulted in order: the
//! pre-installed binary, versioned binaries in a tools directory
//! (`solc-v0.8.21` naming), and — purely to sharpen the error message — an
//! optional remote build list.

use std::path::PathBuf;

use super::solc::SolcCompiler;
use super::Compiler;
use crate::config::Settings;
use crate::http;

#[derive(Debug)]
pub enum RegistryError {
    /// No build matches the requested version.
    NotFound(String),
    /// The lookup itself failed (unreadable tools directory, bad list).
    Io(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::NotFound(msg) => write!(f, "{msg}"),
            RegistryError::Io(msg) => write!(f, "registry lookup failed: {msg}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// The compiler registry collaborator.
pub trait Registry {
    /// Map a version request (already normalized, no leading `^`) to a
    /// build identifier that [`Registry::load`] understands.
    fn resolve_build(&self, version_spec: &str) -> Result<String, RegistryError>;

    /// Load the compiler behind a build identifier.
    fn load(&self, build_id: &str) -> Result<Box<dyn Compiler>, String>;
}

/// Registry over locally available solc binaries. Build identifiers are the
/// commands themselves, so `load` is a probe of the resolved binary.
pub struct SolcRegistry {
    solc_command: String,
    solc_dir: Option<PathBuf>,
    build_list_url: Option<String>,
}

impl SolcRegistry {
    pub fn new(
        solc_command: String,
        solc_dir: Option<PathBuf>,
        build_list_url: Option<String>,
    ) -> Self {
        Self {
            solc_command,
            solc_dir,
            build_list_url,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.solc_command.clone(),
            settings.solc_dir.clone(),
            settings.build_list_url.clone(),
        )
    }

    /// All known (version, command) pairs. The installed binary is probed;
    /// tools-directory entries carry their version in the file name.
    fn candidates(&self) -> Vec<(String, String)> {
        let mut found = Vec::new();

        if let Ok(installed) = SolcCompiler::probe(&self.solc_command) {
            found.push((
                installed.version().to_string(),
                installed.command().to_string(),
            ));
        }

        if let Some(dir) = &self.solc_dir {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if let Some(version) = version_from_file_name(&name) {
                        found.push((version, entry.path().to_string_lossy().into_owned()));
                    }
                }
            }
        }

        found
    }

    /// Whether the remote build list knows this version. Used only to tell
    /// "bad version" apart from "not installed here" in the error text.
    fn known_upstream(&self, want: &str) -> bool {
        let Some(url) = &self.build_list_url else {
            return false;
        };
        let Ok(response) = http::get(url) else {
            return false;
        };
        if response.status != 200 {
            return false;
        }
        let Ok(list) = serde_json::from_str::<serde_json::Value>(&response.body) else {
            return false;
        };
        list.get("releases")
            .and_then(|r| r.as_object())
            .is_some_and(|releases| releases.keys().any(|have| version_matches(have, want)))
    }
}

impl Registry for SolcRegistry {
    fn resolve_build(&self, version_spec: &str) -> Result<String, RegistryError> {
        let want = version_spec.trim();
        if want.is_empty() {
            return Err(RegistryError::NotFound(
                "empty compiler version request".to_string(),
            ));
        }

        let mut matching: Vec<(String, String)> = self
            .candidates()
            .into_iter()
            .filter(|(have, _)| version_matches(have, want))
            .collect();
        // Prefer the highest matching build for partial requests like `0.8`.
        matching.sort_by(|a, b| compare_versions(&b.0, &a.0));

        if let Some((_, command)) = matching.into_iter().next() {
            return Ok(command);
        }

        if self.known_upstream(want) {
            return Err(RegistryError::NotFound(format!(
                "compiler {} exists upstream but is not installed; place its binary in the tools directory",
                want
            )));
        }
        Err(RegistryError::NotFound(format!(
            "no compiler build found for version {}",
            want
        )))
    }

    fn load(&self, build_id: &str) -> Result<Box<dyn Compiler>, String> {
        Ok(Box::new(SolcCompiler::probe(build_id)?))
    }
}

/// `solc-v0.8.21` or `solc-0.8.21` → `0.8.21`.
fn version_from_file_name(name: &str) -> Option<String> {
    let rest = name.strip_prefix("solc-")?;
    let rest = rest.strip_prefix('v').unwrap_or(rest);
    if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit() || c == '.') {
        Some(rest.to_string())
    } else {
        None
    }
}

/// `0.8.21` matches requests `0.8.21`, `0.8`, and `0`.
fn version_matches(have: &str, want: &str) -> bool {
    have == want || have.starts_with(&format!("{}.", want))
}

/// Component-wise numeric comparison, so `0.8.10` sorts above `0.8.9`.
fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.parse().unwrap_or(0))
            .collect()
    };
    parse(a).cmp(&parse(b))
}
