//! The shell's error taxonomy.
//!
//! Every variant that can escape a `run` call implies the tentative
//! statement was already rolled back: callers never observe a session whose
//! rendered program failed to compile or deploy.

use crate::diagnostic::Diagnostic;

#[derive(Debug)]
pub enum ShellError {
    /// The session contains no `pragma solidity` statement, so there is no
    /// way to pick a compiler.
    NoCompilerVersion,
    /// The requested compiler version matched no known build.
    UnresolvedVersion(String),
    /// The compiler ran and rejected the program. Recoverable TypeErrors are
    /// consumed by the retry pass before this surfaces; what's left is final.
    Compile(Vec<Diagnostic>),
    /// The compiler could not be invoked at all (spawn failure, bad JSON,
    /// broken pipe). Not a diagnostic list — a single infrastructure fault.
    Infrastructure(String),
    /// The backend could not deploy or call. Typically transient, e.g. the
    /// node is still starting up.
    Deploy(String),
    /// A diagnostic shape the driver cannot interpret. Never guessed around;
    /// logged loudly and surfaced.
    Internal(String),
}

impl std::fmt::Display for ShellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShellError::NoCompilerVersion => {
                write!(
                    f,
                    "no compiler version: enter `pragma solidity <version>` first"
                )
            }
            ShellError::UnresolvedVersion(spec) => {
                write!(f, "no compiler build found for version {spec}")
            }
            ShellError::Compile(diagnostics) => {
                write!(f, "compilation failed with {} error(s)", diagnostics.len())?;
                for diag in diagnostics {
                    write!(f, "\n  {diag}")?;
                }
                Ok(())
            }
            ShellError::Infrastructure(msg) => write!(f, "compiler invocation failed: {msg}"),
            ShellError::Deploy(msg) => write!(f, "deployment failed: {msg}"),
            ShellError::Internal(msg) => write!(f, "internal inconsistency: {msg}"),
        }
    }
}

impl std::error::Error for ShellError {}
