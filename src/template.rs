//! Contract template synthesis: render the session into one complete,
//! standalone Solidity source unit.
//!
//! `render` is a pure function of the session contents and the fixed names
//! in [`RenderOptions`] — identical sessions always produce byte-identical
//! source, and the result is well-formed Solidity even for an empty session
//! (an entry function with an empty body and a bare `return;`).

use crate::session::Session;
use crate::statement::{Scope, Statement};

/// Fixed names woven into every render.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub contract_name: String,
    pub entry_function: String,
    /// Version emitted when the session has no version pragma of its own.
    pub default_version: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            contract_name: "MainContract".to_string(),
            entry_function: "main".to_string(),
            default_version: "^0.8.21".to_string(),
        }
    }
}

/// Render the session into a compilable source unit.
///
/// Statements are partitioned into their scope buckets in session order. The
/// last statement becomes the entry function's return expression when it is
/// a `Main`-scoped fragment with a value; otherwise the whole `Main` bucket
/// is the body and the function returns nothing.
pub fn render(session: &Session, opts: &RenderOptions) -> String {
    let source_unit: Vec<&Statement> = bucket(session, Scope::SourceUnit);
    let members: Vec<&Statement> = bucket(session, Scope::Contract);
    let main: Vec<&Statement> = bucket(session, Scope::Main);

    let tail = match session.last() {
        Some(last) if last.scope == Scope::Main && !last.has_no_return_value => Some(last),
        _ => None,
    };
    let body = if tail.is_some() {
        &main[..main.len() - 1]
    } else {
        &main[..]
    };

    let pragma_line = session
        .governing_pragma()
        .map(|s| s.raw.clone())
        .unwrap_or_else(|| format!("pragma solidity {};", opts.default_version));

    let mut sections: Vec<String> = Vec::new();
    sections.push(format!(
        "// SPDX-License-Identifier: GPL-2.0-or-later\n{}",
        pragma_line
    ));
    for s in &source_unit {
        sections.push(s.raw.clone());
    }

    let mut contract = format!("contract {} {{", opts.contract_name);
    for s in &members {
        contract.push_str("\n\n");
        contract.push_str(&indent(&s.raw, "    "));
    }
    contract.push_str("\n\n");
    contract.push_str(&entry_function(opts, body, tail));
    contract.push_str("\n}");
    sections.push(contract);

    let mut out = sections.join("\n\n");
    out.push('\n');
    out
}

fn bucket(session: &Session, scope: Scope) -> Vec<&Statement> {
    session
        .statements()
        .iter()
        .filter(|s| s.scope == scope)
        .collect()
}

fn entry_function(opts: &RenderOptions, body: &[&Statement], tail: Option<&Statement>) -> String {
    let return_type = tail.map(|s| s.return_type.as_str()).unwrap_or("");
    let mut func = if return_type.is_empty() {
        format!("    function {}() public {{", opts.entry_function)
    } else {
        format!(
            "    function {}() public returns ({}) {{",
            opts.entry_function, return_type
        )
    };

    for s in body {
        func.push('\n');
        func.push_str(&indent(&s.raw, "        "));
    }

    let return_expression = tail.map(|s| s.return_expression.as_str()).unwrap_or(";");
    func.push('\n');
    if return_expression == ";" {
        func.push_str("        return;");
    } else {
        func.push_str("        return ");
        func.push_str(return_expression);
    }
    func.push_str("\n    }");
    func
}

/// Prefix every non-empty line, preserving internal line structure of
/// multi-line fragments.
fn indent(text: &str, pad: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::classify;

    fn session_with(inputs: &[&str]) -> Session {
        let mut session = Session::new();
        for input in inputs {
            session.append(classify(input, None));
        }
        session
    }

    #[test]
    fn test_empty_session_renders_a_complete_contract() {
        let source = render(&Session::new(), &RenderOptions::default());
        assert!(source.starts_with("// SPDX-License-Identifier: GPL-2.0-or-later\n"));
        assert!(source.contains("pragma solidity ^0.8.21;"));
        assert!(source.contains("contract MainContract {"));
        assert!(source.contains("function main() public {"));
        assert!(source.contains("        return;\n"));
        assert!(!source.contains("returns ("));
    }

    #[test]
    fn test_render_is_deterministic() {
        let session = session_with(&["pragma solidity 0.8.10", "uint a = 2", "a + 1"]);
        let opts = RenderOptions::default();
        assert_eq!(render(&session, &opts), render(&session, &opts));
    }

    #[test]
    fn test_tail_expression_becomes_the_return_clause() {
        let mut session = session_with(&["pragma solidity 0.8.10", "uint a = 2", "a"]);
        session.last_mut().unwrap().return_type = "uint".to_string();

        let source = render(&session, &RenderOptions::default());
        assert!(source.contains("pragma solidity 0.8.10;"));
        assert!(source.contains("function main() public returns (uint) {"));
        assert!(source.contains("        uint a = 2;\n"));
        // The tail expression appears once, in the return clause only.
        assert_eq!(source.matches("a;").count(), 1);
        assert_eq!(source.matches("return a;").count(), 1);
    }

    #[test]
    fn test_valueless_tail_keeps_full_body_and_bare_return() {
        let session = session_with(&["pragma solidity 0.8.10", "uint a = 2"]);
        let source = render(&session, &RenderOptions::default());
        assert!(source.contains("        uint a = 2;\n"));
        assert!(source.contains("        return;\n"));
        assert!(!source.contains("returns ("));
    }

    #[test]
    fn test_non_main_tail_keeps_full_body() {
        // Tail is a contract member, so every Main statement stays in the
        // body and the function returns nothing.
        let session = session_with(&["pragma solidity 0.8.10", "a + 1", "event Ping(uint x)"]);
        let source = render(&session, &RenderOptions::default());
        assert!(source.contains("\n    event Ping(uint x);\n"));
        assert!(source.contains("        a + 1;\n"));
        assert!(source.contains("        return;\n"));
        assert!(!source.contains("returns ("));
    }

    #[test]
    fn test_last_version_pragma_governs_the_render() {
        let session = session_with(&[
            "pragma solidity 0.8.10",
            "pragma solidity ^0.8.21",
            "a + 1",
        ]);
        let source = render(&session, &RenderOptions::default());
        assert!(source.contains("pragma solidity ^0.8.21;"));
        // The superseded pragma is retained in the session but not emitted.
        assert!(!source.contains("pragma solidity 0.8.10;"));
    }

    #[test]
    fn test_buckets_preserve_session_order() {
        let session = session_with(&[
            "pragma solidity 0.8.10",
            "uint first;",
            "import \"./a.sol\"",
            "uint second;",
            "a + 1",
        ]);
        // `uint first;` / `uint second;` are Main-scope declarations.
        let source = render(&session, &RenderOptions::default());
        let first = source.find("uint first;").unwrap();
        let second = source.find("uint second;").unwrap();
        assert!(first < second);

        let import_at = source.find("import \"./a.sol\";").unwrap();
        let contract_at = source.find("contract MainContract").unwrap();
        assert!(import_at < contract_at);
    }

    #[test]
    fn test_multiline_fragments_are_reindented() {
        let session = session_with(&[
            "pragma solidity 0.8.10",
            "function helper() internal pure returns (uint) {\n    return 41;\n}",
        ]);
        let source = render(&session, &RenderOptions::default());
        assert!(source.contains("    function helper() internal pure returns (uint) {\n        return 41;\n    }"));
    }
}
