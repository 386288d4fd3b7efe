//! The interactive shell core: the synthesize → compile → patch-and-retry →
//! deploy pipeline.
//!
//! Solidity gives no way to ask "what is the type of this expression", so
//! the driver compiles the rendered template with a placeholder return type
//! and reads the real type out of the compiler's complaint. The retry
//! budget is exactly one correction pass; a second failure is terminal.
//! Whatever goes wrong, the tentative statement is popped before the error
//! surfaces, so the session always renders to a known-good program between
//! calls.

use serde_json::Value;

use crate::chain::{Backend, ContractSet};
use crate::compiler::{
    compile_checked, CompileFailure, CompilerCache, CompilerInput, CompilerOutput, ImportResolver,
};
use crate::config::Settings;
use crate::diagnostic::Diagnostic;
use crate::error::ShellError;
use crate::session::{Session, SessionRecord};
use crate::statement::Statement;
use crate::template;

/// Message emitted when the placeholder (or stale) return type does not
/// match the tail expression. The payload between prefix and marker is the
/// expression's real type.
const CONVERTIBLE_PREFIX: &str = "Return argument type ";
const CONVERTIBLE_MARKER: &str = " is not implicitly convertible to expected type";

/// Message emitted when the tail expression is a call to a function whose
/// output arity differs from the synthesized single return slot.
const ARITY_MARKER: &str = "number of arguments in return statement";

/// What a successful `run` hands back.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    /// The entry function's decoded return value; `None` for void
    /// statements.
    pub value: Option<Value>,
    /// Non-ignorable warnings, advisory only.
    pub warnings: Vec<Diagnostic>,
}

/// The REPL core. One `run` call is one complete traversal of the compile
/// pipeline; there is no open compile state between calls, and `&mut self`
/// keeps overlapping runs on one session unrepresentable.
pub struct Shell {
    pub settings: Settings,
    session: Session,
    cache: CompilerCache,
    backend: Box<dyn Backend>,
    /// The source most recently submitted to the compiler. Diagnostics refer
    /// to byte offsets in this text, not in the rolled-back session's render.
    last_render: String,
}

impl Shell {
    pub fn new(settings: Settings, cache: CompilerCache, backend: Box<dyn Backend>) -> Self {
        Self {
            settings,
            session: Session::new(),
            cache,
            backend,
            last_render: String::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Compiler versions currently loaded in the cache, sorted.
    pub fn loaded_compiler_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self
            .cache
            .loaded_versions()
            .iter()
            .map(|v| v.to_string())
            .collect();
        versions.sort();
        versions
    }

    pub fn backend(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    /// Replace the backend (`.chain set-provider`).
    pub fn set_backend(&mut self, backend: Box<dyn Backend>) {
        self.backend = backend;
    }

    /// Render the current session (`.dump`, and every compile pass).
    pub fn render(&self) -> String {
        template::render(&self.session, &self.settings.render_options())
    }

    /// The source the most recent compile pass saw, kept so diagnostics can
    /// be rendered against the text their byte offsets point into.
    pub fn last_rendered(&self) -> &str {
        &self.last_render
    }

    pub fn undo(&mut self) -> Option<Statement> {
        self.session.undo()
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    pub fn dump_session(&self) -> Vec<SessionRecord> {
        self.session.dump()
    }

    pub fn load_session(&mut self, records: &[SessionRecord]) {
        self.session.load(records);
    }

    /// Run one classified statement through the pipeline. On success the
    /// statement is permanent; on any error it has already been rolled back.
    pub fn run(&mut self, statement: Statement) -> Result<RunOutcome, ShellError> {
        self.session.append(statement);
        match self.attempt() {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                self.session.undo();
                Err(error)
            }
        }
    }

    fn attempt(&mut self) -> Result<RunOutcome, ShellError> {
        let version = self
            .session
            .governing_version()
            .ok_or(ShellError::NoCompilerVersion)?;

        let first_source = self.render();
        let (output, warnings) = match self.compile(&version, &first_source) {
            Ok(ok) => ok,
            Err(ShellError::Compile(diagnostics)) => {
                let statement = self
                    .session
                    .last()
                    .ok_or_else(|| ShellError::Internal("empty session mid-run".to_string()))?;
                let inferred = match infer_return_type(&diagnostics, statement, &first_source) {
                    Inference::Type(ty) => ty,
                    Inference::NoTypeError | Inference::DeclarationNotFound => {
                        return Err(ShellError::Compile(diagnostics))
                    }
                    Inference::Unrecognized(message) => {
                        eprintln!("BUG: cannot interpret compiler diagnostic: {message}");
                        return Err(ShellError::Internal(format!(
                            "uninterpretable diagnostic: {message}"
                        )));
                    }
                };

                // The single permitted statement mutation: the corrected
                // return type for the second pass.
                if let Some(last) = self.session.last_mut() {
                    last.return_type = inferred;
                }
                let second_source = self.render();
                self.compile(&version, &second_source)?
            }
            Err(other) => return Err(other),
        };

        let set = ContractSet::from_output(
            &output,
            &self.settings.template_contract_name,
            &self.settings.template_func_main,
        );
        let deployed = self.backend.deploy(&set).map_err(ShellError::Deploy)?;

        Ok(RunOutcome {
            value: deployed.entry_value,
            warnings,
        })
    }

    /// One compile pass over the given rendered source.
    fn compile(
        &mut self,
        version: &str,
        source: &str,
    ) -> Result<(CompilerOutput, Vec<Diagnostic>), ShellError> {
        if self.settings.debug_show_contract {
            eprintln!("{source}");
        }
        self.last_render = source.to_string();

        let mut input = CompilerInput::single(source);
        ImportResolver::from_settings(&self.settings)
            .add_imports(source, &mut input)
            .map_err(ShellError::Infrastructure)?;

        let compiler = self.cache.resolve(version)?;
        compile_checked(compiler, &input).map_err(|failure| match failure {
            CompileFailure::Diagnostics(diagnostics) => ShellError::Compile(diagnostics),
            CompileFailure::Infrastructure(message) => ShellError::Infrastructure(message),
        })
    }
}

// ─── Type Inference ────────────────────────────────────────────────

enum Inference {
    Type(String),
    /// The failure carries no TypeError at all: nothing to infer from.
    NoTypeError,
    /// The arity fallback found no declaration to borrow a type from.
    DeclarationNotFound,
    /// A TypeError shape the driver does not know. Never guessed around.
    Unrecognized(String),
}

/// Recover the tail expression's type from the first pass's diagnostics.
/// Works off the *last* TypeError: with a broken earlier statement the
/// return-type complaint is the final one solc emits.
fn infer_return_type(
    diagnostics: &[Diagnostic],
    statement: &Statement,
    rendered: &str,
) -> Inference {
    let Some(type_error) = diagnostics
        .iter()
        .rev()
        .find(|d| d.category == "TypeError")
    else {
        return Inference::NoTypeError;
    };
    let message = &type_error.message;

    if let (Some(prefix), Some(marker)) = (
        message.find(CONVERTIBLE_PREFIX),
        message.find(CONVERTIBLE_MARKER),
    ) {
        let start = prefix + CONVERTIBLE_PREFIX.len();
        if start < marker {
            return Inference::Type(normalize_inferred_type(&message[start..marker]));
        }
    }

    if message.contains(ARITY_MARKER) {
        // Best-effort: find the called function in the fragment, then look
        // up its declared returns clause in the source we just rendered.
        // Known-incomplete for nested and overloaded calls.
        return match called_function_name(&statement.raw)
            .and_then(|name| declared_return_type(rendered, &name))
        {
            Some(ty) => Inference::Type(ty),
            None => Inference::DeclarationNotFound,
        };
    }

    Inference::Unrecognized(message.clone())
}

/// Map solc's type vocabulary onto declarable types. Rational constants
/// have no declarable type of their own, so they widen to `int`/`uint`.
fn normalize_inferred_type(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("int_const -") {
        return "int".to_string();
    }
    if raw.starts_with("int_const ") {
        return "uint".to_string();
    }
    if let Some(name) = raw.strip_prefix("contract ") {
        return name.to_string();
    }
    raw.to_string()
}

/// First identifier in the fragment that is directly followed by `(`.
fn called_function_name(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut ident_start: Option<usize> = None;
    for (i, &b) in bytes.iter().enumerate() {
        let c = b as char;
        if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
            if ident_start.is_none() && !c.is_ascii_digit() {
                ident_start = Some(i);
            }
        } else {
            if c == '(' {
                if let Some(start) = ident_start {
                    return Some(raw[start..i].to_string());
                }
            }
            ident_start = None;
        }
    }
    None
}

/// The verbatim contents of `returns (...)` in the first declaration of
/// `function <name>` found in the source, if any.
fn declared_return_type(source: &str, function: &str) -> Option<String> {
    let needle = format!("function {}", function);
    let at = source.find(&needle)?;
    let header = &source[at..];
    let header = &header[..header.find('{').unwrap_or(header.len())];

    let after = &header[header.find("returns")? + "returns".len()..];
    let open = after.find('(')?;
    let mut depth = 0usize;
    let mut start = None;
    for (i, c) in after.char_indices() {
        if i < open {
            continue;
        }
        match c {
            '(' => {
                if depth == 0 {
                    start = Some(i + 1);
                }
                depth += 1;
            }
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(after[start?..i].trim().to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::classify;

    fn type_error(message: &str) -> Diagnostic {
        Diagnostic::error("TypeError", message)
    }

    #[test]
    fn test_normalize_inferred_type() {
        assert_eq!(normalize_inferred_type("int_const 1"), "uint");
        assert_eq!(normalize_inferred_type("int_const -7"), "int");
        assert_eq!(normalize_inferred_type("contract ERC20"), "ERC20");
        assert_eq!(normalize_inferred_type("uint256"), "uint256");
        assert_eq!(
            normalize_inferred_type("string memory"),
            "string memory"
        );
    }

    #[test]
    fn test_infer_from_convertible_message() {
        let diagnostics = vec![type_error(
            "Return argument type int_const 1 is not implicitly convertible to expected type \
             (type of first return variable) bool.",
        )];
        let statement = classify("a + 1", None);
        match infer_return_type(&diagnostics, &statement, "") {
            Inference::Type(ty) => assert_eq!(ty, "uint"),
            _ => panic!("expected a type"),
        }
    }

    #[test]
    fn test_infer_uses_the_last_type_error() {
        let diagnostics = vec![
            type_error("Operator + not compatible with types."),
            Diagnostic::error("DeclarationError", "Undeclared identifier."),
            type_error(
                "Return argument type contract Token is not implicitly convertible to expected \
                 type (type of first return variable) bool.",
            ),
        ];
        let statement = classify("token", None);
        match infer_return_type(&diagnostics, &statement, "") {
            Inference::Type(ty) => assert_eq!(ty, "Token"),
            _ => panic!("expected a type"),
        }
    }

    #[test]
    fn test_no_type_error_means_no_inference() {
        let diagnostics = vec![Diagnostic::error("ParserError", "Expected ';'")];
        let statement = classify("a + 1", None);
        assert!(matches!(
            infer_return_type(&diagnostics, &statement, ""),
            Inference::NoTypeError
        ));
    }

    #[test]
    fn test_unrecognized_type_error_is_not_guessed() {
        let diagnostics = vec![type_error("Operator + not compatible with types.")];
        let statement = classify("a + b", None);
        assert!(matches!(
            infer_return_type(&diagnostics, &statement, ""),
            Inference::Unrecognized(_)
        ));
    }

    #[test]
    fn test_arity_fallback_reads_the_declared_clause() {
        let rendered = "contract MainContract {\n    function getValues() public pure returns \
                        (uint, uint) {\n        return (1, 2);\n    }\n}\n";
        let diagnostics = vec![type_error(
            "Different number of arguments in return statement than in returns declaration.",
        )];
        let statement = classify("getValues()", None);
        match infer_return_type(&diagnostics, &statement, rendered) {
            Inference::Type(ty) => assert_eq!(ty, "uint, uint"),
            _ => panic!("expected the declared clause"),
        }
    }

    #[test]
    fn test_arity_fallback_without_declaration_gives_up() {
        let diagnostics = vec![type_error(
            "Different number of arguments in return statement than in returns declaration.",
        )];
        let statement = classify("mystery()", None);
        assert!(matches!(
            infer_return_type(&diagnostics, &statement, "contract MainContract {}"),
            Inference::DeclarationNotFound
        ));
    }

    #[test]
    fn test_called_function_name() {
        assert_eq!(called_function_name("getValues();").as_deref(), Some("getValues"));
        assert_eq!(called_function_name("f(g());").as_deref(), Some("f"));
        assert_eq!(called_function_name("counter.get();").as_deref(), Some("get"));
        assert_eq!(called_function_name("a + 1;"), None);
    }

    #[test]
    fn test_declared_return_type_handles_nested_parens() {
        let source = "function f(uint x) internal view returns (mapping(uint => uint) storage) {";
        assert_eq!(
            declared_return_type(source, "f").as_deref(),
            Some("mapping(uint => uint) storage")
        );
        assert_eq!(declared_return_type(source, "g"), None);
        // No returns clause at all.
        assert_eq!(
            declared_return_type("function h() public {\n}", "h"),
            None
        );
    }
}
