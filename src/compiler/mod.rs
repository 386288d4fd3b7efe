//! The compiler boundary: the standard-JSON input/output model, the
//! [`Compiler`] handle trait, version resolution, and the load-once cache.

pub mod cache;
pub mod imports;
pub mod registry;
pub mod solc;

pub use cache::{normalize_version, CompilerCache};
pub use imports::ImportResolver;
pub use registry::{Registry, RegistryError, SolcRegistry};
pub use solc::SolcCompiler;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;

/// A loaded compiler for one concrete language version.
pub trait Compiler {
    /// The concrete version this handle compiles, e.g. `0.8.21`.
    fn version(&self) -> &str;
    /// Run one standard-JSON compile. `Err` is an infrastructure fault;
    /// compiler rejections come back inside [`CompilerOutput::errors`].
    fn compile(&self, input: &CompilerInput) -> Result<CompilerOutput, String>;
}

// ─── Standard-JSON Input ───────────────────────────────────────────

#[derive(Clone, Debug, Serialize)]
pub struct CompilerInput {
    pub language: String,
    pub sources: BTreeMap<String, SourceContent>,
    pub settings: InputSettings,
}

#[derive(Clone, Debug, Serialize)]
pub struct SourceContent {
    pub content: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct InputSettings {
    #[serde(rename = "outputSelection")]
    pub output_selection: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl CompilerInput {
    /// Wrap one synthesized source unit. It compiles under the empty path —
    /// the same convention the shell's diagnostics assume — and requests the
    /// ABI and bytecode of every contract.
    pub fn single(source: &str) -> Self {
        let mut sources = BTreeMap::new();
        sources.insert(
            String::new(),
            SourceContent {
                content: source.to_string(),
            },
        );

        let mut selection = BTreeMap::new();
        selection.insert(
            "*".to_string(),
            BTreeMap::from([(
                "*".to_string(),
                vec!["abi".to_string(), "evm.bytecode".to_string()],
            )]),
        );

        Self {
            language: "Solidity".to_string(),
            sources,
            settings: InputSettings {
                output_selection: selection,
            },
        }
    }

    /// Add an imported source file under its import path.
    pub fn add_source(&mut self, path: &str, content: String) {
        self.sources
            .insert(path.to_string(), SourceContent { content });
    }

    pub fn has_source(&self, path: &str) -> bool {
        self.sources.contains_key(path)
    }
}

// ─── Standard-JSON Output ──────────────────────────────────────────

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CompilerOutput {
    #[serde(default)]
    pub errors: Vec<Diagnostic>,
    /// Source path → contract name → artifact.
    #[serde(default)]
    pub contracts: BTreeMap<String, BTreeMap<String, ContractArtifact>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContractArtifact {
    #[serde(default)]
    pub abi: serde_json::Value,
    #[serde(default)]
    pub evm: EvmArtifact,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EvmArtifact {
    #[serde(default)]
    pub bytecode: Bytecode,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Bytecode {
    /// Hex-encoded creation bytecode, empty for interfaces and abstract
    /// contracts.
    #[serde(default)]
    pub object: String,
}

// ─── Checked Compilation ───────────────────────────────────────────

/// Why a compile pass did not produce a usable output.
#[derive(Debug)]
pub enum CompileFailure {
    /// The compiler ran and rejected the program.
    Diagnostics(Vec<Diagnostic>),
    /// The compiler could not be invoked or produced garbage.
    Infrastructure(String),
}

/// Run one compile pass and split the outcome into a tagged value: hard
/// errors fail the pass, non-ignorable warnings ride along with success.
pub fn compile_checked(
    compiler: &dyn Compiler,
    input: &CompilerInput,
) -> Result<(CompilerOutput, Vec<Diagnostic>), CompileFailure> {
    let output = compiler
        .compile(input)
        .map_err(CompileFailure::Infrastructure)?;

    let errors: Vec<Diagnostic> = output
        .errors
        .iter()
        .filter(|d| d.is_error())
        .cloned()
        .collect();
    if !errors.is_empty() {
        return Err(CompileFailure::Diagnostics(errors));
    }

    let warnings: Vec<Diagnostic> = output
        .errors
        .iter()
        .filter(|d| !d.is_error() && !d.is_ignorable())
        .cloned()
        .collect();
    Ok((output, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Diagnostic, Severity};

    struct CannedCompiler(CompilerOutput);

    impl Compiler for CannedCompiler {
        fn version(&self) -> &str {
            "0.8.21"
        }
        fn compile(&self, _input: &CompilerInput) -> Result<CompilerOutput, String> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_input_shape_matches_the_standard_json_protocol() {
        let input = CompilerInput::single("contract C {}");
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["language"], "Solidity");
        assert_eq!(json["sources"][""]["content"], "contract C {}");
        assert_eq!(
            json["settings"]["outputSelection"]["*"]["*"],
            serde_json::json!(["abi", "evm.bytecode"])
        );
    }

    #[test]
    fn test_output_parses_with_missing_sections() {
        let output: CompilerOutput = serde_json::from_str("{}").unwrap();
        assert!(output.errors.is_empty());
        assert!(output.contracts.is_empty());
    }

    #[test]
    fn test_compile_checked_fails_on_errors_only() {
        let mut output = CompilerOutput::default();
        output.errors.push(Diagnostic::warning("Unreachable code."));
        output
            .errors
            .push(Diagnostic::error("TypeError", "bad type"));

        let failure = compile_checked(&CannedCompiler(output), &CompilerInput::single(""))
            .err()
            .unwrap();
        match failure {
            CompileFailure::Diagnostics(diags) => {
                assert_eq!(diags.len(), 1);
                assert_eq!(diags[0].severity, Severity::Error);
            }
            CompileFailure::Infrastructure(msg) => panic!("unexpected: {msg}"),
        }
    }

    #[test]
    fn test_compile_checked_filters_ignorable_warnings() {
        let mut output = CompilerOutput::default();
        output
            .errors
            .push(Diagnostic::warning("Statement has no effect."));
        output.errors.push(Diagnostic::warning("Unreachable code."));

        let (_, warnings) =
            compile_checked(&CannedCompiler(output), &CompilerInput::single("")).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "Unreachable code.");
    }
}
