//! Statement classification: raw REPL input → a typed [`Statement`] with a
//! lexical scope and a return-value disposition.
//!
//! No parsing happens here and no AST is ever built. Fragments are classified
//! by structural prefix and shape; the external compiler is the backstop for
//! genuinely invalid syntax. Prefixes overlap (`pragma solidity` is more
//! specific than `pragma`), so the rules live in one ordered table evaluated
//! top to bottom — first match wins.

use serde::{Deserialize, Serialize};

/// The lexical bucket a fragment lands in when the contract template is
/// synthesized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    /// Top-level source unit: imports, non-version pragmas, type declarations.
    SourceUnit,
    /// Contract member: state variables, functions, modifiers, events, errors.
    Contract,
    /// Function-body statement inside the synthesized entry function.
    Main,
    /// A `pragma solidity ...` directive. Only the last one in the session
    /// governs the emitted pragma; superseded ones stay for undo/replay.
    VersionPragma,
}

/// One accepted REPL fragment, classified and normalized.
///
/// Immutable after construction except for `return_type`, which the compile
/// driver overwrites at most once when it recovers the real expression type
/// from a compiler diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    /// Normalized fragment text, always terminated with `;` or `}`.
    pub raw: String,
    pub scope: Scope,
    /// True when the fragment cannot be the tail expression of a function.
    pub has_no_return_value: bool,
    /// The synthesized `return` payload: the fragment itself when it has a
    /// value, otherwise the empty statement `;`.
    pub return_expression: String,
    /// Starts as the `bool` placeholder (or empty for valueless fragments);
    /// rewritten once by type inference.
    pub return_type: String,
}

impl Statement {
    /// The version request carried by a `pragma solidity` statement, e.g.
    /// `^0.8.21`. `None` for every other scope.
    pub fn pragma_version(&self) -> Option<&str> {
        if self.scope != Scope::VersionPragma {
            return None;
        }
        let rest = self.raw.strip_prefix("pragma solidity ")?;
        let rest = rest.trim_end_matches(';').trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

// ─── Classification Rules ──────────────────────────────────────────

/// A scope rule: predicate over the normalized fragment plus the scope it
/// assigns. Evaluated in table order; the table order is the precedence.
struct ScopeRule {
    #[allow(dead_code)]
    name: &'static str,
    matches: fn(&str) -> bool,
    scope: Scope,
}

const SCOPE_RULES: &[ScopeRule] = &[
    ScopeRule {
        name: "contract-member",
        matches: is_contract_member,
        scope: Scope::Contract,
    },
    ScopeRule {
        name: "version-pragma",
        matches: is_version_pragma,
        scope: Scope::VersionPragma,
    },
    ScopeRule {
        name: "source-unit-directive",
        matches: is_source_unit_directive,
        scope: Scope::SourceUnit,
    },
    ScopeRule {
        name: "source-unit-declaration",
        matches: is_source_unit_declaration,
        scope: Scope::SourceUnit,
    },
];

fn is_contract_member(text: &str) -> bool {
    ["function ", "modifier ", "mapping ", "mapping(", "event ", "error "]
        .iter()
        .any(|kw| text.starts_with(kw))
}

fn is_version_pragma(text: &str) -> bool {
    text.starts_with("pragma solidity ")
}

fn is_source_unit_directive(text: &str) -> bool {
    text.starts_with("pragma ") || text.starts_with("import ")
}

fn is_source_unit_declaration(text: &str) -> bool {
    ["contract ", "interface ", "struct "]
        .iter()
        .any(|kw| text.starts_with(kw))
}

/// Classify a fragment into a [`Statement`].
///
/// `explicit` bypasses the scope heuristics (used when replaying a saved
/// session, whose scopes were decided when the fragments were first typed).
/// The return-value disposition is always re-derived from the text, so a
/// reloaded statement starts from its scope defaults again.
///
/// This never fails: anything the rules don't recognize degrades to a
/// `Main`-scope expression statement.
pub fn classify(text: &str, explicit: Option<Scope>) -> Statement {
    let raw = normalize(text);

    let scope = explicit.unwrap_or_else(|| {
        SCOPE_RULES
            .iter()
            .find(|rule| (rule.matches)(&raw))
            .map(|rule| rule.scope)
            .unwrap_or(Scope::Main)
    });

    let has_no_return_value = match scope {
        Scope::Main => main_has_no_return_value(&raw),
        // Only function-body statements can carry a value.
        _ => true,
    };

    let (return_expression, return_type) = if has_no_return_value {
        (";".to_string(), String::new())
    } else {
        (raw.clone(), "bool".to_string())
    };

    Statement {
        raw,
        scope,
        has_no_return_value,
        return_expression,
        return_type,
    }
}

/// Terminate the fragment so it is a syntactically complete statement on its
/// own. An empty fragment becomes the empty statement.
fn normalize(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ";".to_string();
    }
    if trimmed.ends_with(';') || trimmed.ends_with('}') {
        trimmed.to_string()
    } else {
        format!("{};", trimmed)
    }
}

// ─── Return-Value Disposition ──────────────────────────────────────

/// Statements that cannot produce a value when used as the tail expression.
fn main_has_no_return_value(raw: &str) -> bool {
    if raw == ";" {
        return true;
    }
    if contains_assignment(raw) {
        return true;
    }
    if ["delete ", "assembly", "revert", "unchecked ", "{"]
        .iter()
        .any(|kw| raw.starts_with(kw))
    {
        return true;
    }
    looks_like_declaration(raw)
}

/// A bare `=` that is not half of `==`. This intentionally also catches
/// compound shapes like `+=` and keeps the original tool's treatment of
/// comparison operators containing `=`.
fn contains_assignment(text: &str) -> bool {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'=' {
            continue;
        }
        let prev_eq = i > 0 && bytes[i - 1] == b'=';
        let next_eq = i + 1 < bytes.len() && bytes[i + 1] == b'=';
        if !prev_eq && !next_eq {
            return true;
        }
    }
    false
}

/// Denomination and time suffixes that make `<number> <word>` a literal
/// expression rather than a declaration.
const UNIT_SUFFIXES: &[&str] = &[
    "wei", "gwei", "ether", "seconds", "minutes", "hours", "days", "weeks",
];

/// Structural check for `TYPE [memory|storage|calldata]? NAME` — two shapes
/// that are lexically "word space word", where only one is a declaration.
/// `2 ether` is a value; `uint ether_balance` is not.
fn looks_like_declaration(raw: &str) -> bool {
    let body = raw.trim_end_matches(';').trim();
    let words: Vec<&str> = body.split_whitespace().collect();

    let (ty, name) = match words.as_slice() {
        [ty, name] => {
            if is_numeric_literal(ty) && UNIT_SUFFIXES.contains(name) {
                return false;
            }
            (*ty, *name)
        }
        [ty, location, name] if matches!(*location, "memory" | "storage" | "calldata") => {
            (*ty, *name)
        }
        _ => return false,
    };

    is_type_like(ty) && is_identifier(name)
}

fn is_numeric_literal(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// An identifier (possibly dotted, e.g. `Lib.Entry`) with optional trailing
/// array suffixes such as `[]` or `[4]`.
fn is_type_like(word: &str) -> bool {
    let base_end = word.find('[').unwrap_or(word.len());
    let (base, suffix) = word.split_at(base_end);

    if base.is_empty() || !base.split('.').all(is_identifier) {
        return false;
    }

    let mut depth = 0usize;
    for c in suffix.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _ if depth > 0 => {}
            _ => return false,
        }
    }
    depth == 0
}

// ─── Tests ─────────────────────────────────────────────────────────
