//! REPL front-end helpers: fragment gathering, the `$_` placeholder, and
//! session files on disk.

pub mod repl;

use std::path::{Path, PathBuf};

use crate::session::SessionRecord;

/// A fragment is submitted once its braces balance; until then the REPL
/// keeps prompting for continuation lines. Counting is textual — braces
/// inside string literals count too, same as the shell's other shape checks,
/// and the compiler backstops the rare miscount.
pub fn braces_balanced(text: &str) -> bool {
    text.matches('{').count() == text.matches('}').count()
}

/// Substitute the `$_` placeholder with the most recent evaluation result,
/// parenthesized so it splices into surrounding expressions.
pub fn substitute_last_result(fragment: &str, last_result: &str) -> String {
    if !fragment.contains("$_") {
        return fragment.to_string();
    }
    fragment.replace("$_", &format!(" ({}) ", last_result))
}

// ─── Session Files ─────────────────────────────────────────────────

const SESSION_SUFFIX: &str = ".session.json";

pub fn session_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}{}", name, SESSION_SUFFIX))
}

pub fn save_session(dir: &Path, name: &str, records: &[SessionRecord]) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create '{}': {}", dir.display(), e))?;
    let path = session_path(dir, name);
    let json = serde_json::to_string(records).expect("session records are serializable");
    std::fs::write(&path, json).map_err(|e| format!("cannot write '{}': {}", path.display(), e))
}

pub fn load_session(dir: &Path, name: &str) -> Result<Vec<SessionRecord>, String> {
    let path = session_path(dir, name);
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("invalid session file '{}': {}", path.display(), e))
}

/// Names of every saved session in the config home, sorted.
pub fn list_sessions(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.strip_suffix(SESSION_SUFFIX).map(str::to_string)
        })
        .collect();
    names.sort();
    names
}
