//! Import resolution for the standard-JSON submission.
//!
//! solc running as a subprocess cannot call back into the shell, so imports
//! are resolved up front: the rendered source is scanned for import paths,
//! each path is loaded, and the results are submitted together as the
//! source map. Local paths are searched through the base directory and then
//! each include directory, in order. Remote `http://` paths are a blocking
//! network fetch of code about to be compiled — off unless explicitly
//! enabled.

use std::path::PathBuf;

use super::CompilerInput;
use crate::config::Settings;
use crate::http;

pub struct ImportResolver {
    base_path: Option<PathBuf>,
    include_paths: Vec<PathBuf>,
    allow_remote: bool,
}

impl ImportResolver {
    pub fn new(
        base_path: Option<PathBuf>,
        include_paths: Vec<PathBuf>,
        allow_remote: bool,
    ) -> Self {
        Self {
            base_path,
            include_paths,
            allow_remote,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.base_path.clone(),
            settings.include_paths.clone(),
            settings.allow_remote_imports,
        )
    }

    /// Return the contents behind one import path.
    pub fn resolve(&self, source_path: &str) -> Result<String, String> {
        if source_path.starts_with("http://") || source_path.starts_with("https://") {
            if !self.allow_remote {
                return Err(format!(
                    "remote import '{}' rejected (set allowRemoteImports to permit it)",
                    source_path
                ));
            }
            let response = http::get(source_path)?;
            if response.status != 200 {
                return Err(format!(
                    "fetching '{}' returned status {}",
                    source_path, response.status
                ));
            }
            return Ok(response.body);
        }

        let mut prefixes: Vec<PathBuf> = Vec::new();
        prefixes.push(self.base_path.clone().unwrap_or_default());
        prefixes.extend(self.include_paths.iter().cloned());

        for prefix in &prefixes {
            let candidate = if prefix.as_os_str().is_empty() {
                PathBuf::from(source_path)
            } else {
                prefix.join(source_path)
            };
            if candidate.is_file() {
                return std::fs::read_to_string(&candidate)
                    .map_err(|e| format!("error reading '{}': {}", candidate.display(), e));
            }
        }
        Err(format!(
            "'{}' not found inside the base path or any of the include paths",
            source_path
        ))
    }

    /// Resolve everything `source` transitively imports into `input`.
    /// Already-present sources are left alone; cycles terminate because
    /// every path is visited once.
    pub fn add_imports(&self, source: &str, input: &mut CompilerInput) -> Result<(), String> {
        let mut pending = collect_import_paths(source);
        while let Some(path) = pending.pop() {
            if input.has_source(&path) {
                continue;
            }
            let content = self.resolve(&path)?;
            pending.extend(collect_import_paths(&content));
            input.add_source(&path, content);
        }
        Ok(())
    }
}

/// Quoted paths of every import directive in the source. Handles the
/// `import "p";`, `import 'p';`, and `import {A} from "p";` forms.
pub fn collect_import_paths(source: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for line in source.lines() {
        let line = line.trim_start();
        if !line.starts_with("import") {
            continue;
        }
        if let Some(path) = quoted_path(line) {
            paths.push(path);
        }
    }
    paths
}

fn quoted_path(line: &str) -> Option<String> {
    let open = line.find(['"', '\''])?;
    let quote = line.as_bytes()[open] as char;
    let rest = &line[open + 1..];
    let close = rest.find(quote)?;
    Some(rest[..close].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_import_paths_forms() {
        let source = concat!(
            "pragma solidity ^0.8.21;\n",
            "import \"./a.sol\";\n",
            "import './b.sol';\n",
            "import {Thing} from \"lib/c.sol\";\n",
            "// import \"commented-out.sol\";\n",
            "uint x;\n",
        );
        assert_eq!(
            collect_import_paths(source),
            vec!["./a.sol", "./b.sol", "lib/c.sol"]
        );
    }

    #[test]
    fn test_resolve_searches_base_then_include_dirs() {
        let base = tempfile::tempdir().unwrap();
        let include = tempfile::tempdir().unwrap();
        std::fs::write(base.path().join("a.sol"), "// base a").unwrap();
        std::fs::write(include.path().join("b.sol"), "// include b").unwrap();

        let resolver = ImportResolver::new(
            Some(base.path().to_path_buf()),
            vec![include.path().to_path_buf()],
            false,
        );
        assert_eq!(resolver.resolve("a.sol").unwrap(), "// base a");
        assert_eq!(resolver.resolve("b.sol").unwrap(), "// include b");

        let err = resolver.resolve("missing.sol").unwrap_err();
        assert!(err.contains("not found inside the base path"));
    }

    #[test]
    fn test_remote_imports_rejected_by_default() {
        let resolver = ImportResolver::new(None, Vec::new(), false);
        let err = resolver.resolve("http://example.com/x.sol").unwrap_err();
        assert!(err.contains("allowRemoteImports"));
    }

    #[test]
    fn test_add_imports_follows_nested_imports_once() {
        let base = tempfile::tempdir().unwrap();
        std::fs::write(
            base.path().join("a.sol"),
            "import \"b.sol\";\ncontract A {}\n",
        )
        .unwrap();
        // b imports a back: the visited-set breaks the cycle.
        std::fs::write(
            base.path().join("b.sol"),
            "import \"a.sol\";\ncontract B {}\n",
        )
        .unwrap();

        let resolver = ImportResolver::new(Some(base.path().to_path_buf()), Vec::new(), false);
        let mut input = CompilerInput::single("import \"a.sol\";\ncontract Main {}\n");
        resolver
            .add_imports("import \"a.sol\";\ncontract Main {}\n", &mut input)
            .unwrap();

        assert!(input.has_source("a.sol"));
        assert!(input.has_source("b.sol"));
        assert_eq!(input.sources.len(), 3); // "", a.sol, b.sol
    }
}
