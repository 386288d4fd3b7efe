//! The interactive line loop: prompt, gather a brace-balanced fragment,
//! dispatch dot-commands, and run everything else through the shell.
//!
//! Dot-commands are handled entirely here — the shell core never sees a
//! string starting with `.`.

use std::io::{BufRead, Write};
use std::path::Path;

use serde_json::Value;

use crate::chain::{Backend, ExternalProcessBackend, ExternalUrlBackend};
use crate::diagnostic::render_diagnostics;
use crate::error::ShellError;
use crate::shell::Shell;
use crate::statement::classify;

use super::{braces_balanced, list_sessions, load_session, save_session, substitute_last_result};

const HELP: &str = "
Help:
-----

 $_ is a placeholder holding the most recent evaluation result.
 pragma solidity <version> to change the compiler version.

 General:
    .help                                ... this help
    .exit                                ... exit the shell

 Blockchain:
    .chain
            restart                      ... restart the blockchain service
            set-provider <target>        ... \"internal\" | <http://host:port>
            accounts                     ... list the provider's accounts
            eth_<X> [...args]            ... raw JSON-RPC call to the provider

 Settings:
    .config                              ... show settings
            set <key> <value>            ... set setting
            unset <key>                  ... reset setting to its default

 Session:
    .session                             ... list saved sessions
            load <name>                  ... load a saved session
            save <name>                  ... save the current session
    .undo                                ... undo the last statement
    .reset                               ... drop all statements, start over

 Debug:
    .proc                                ... show the managed node process
    .dump                                ... show the rendered contract
    .echo <message>                      ... every shell needs an echo command
";

enum Control {
    Continue,
    Exit,
}

/// Run the REPL until `.exit` or end of input. Returns `false` when the
/// loop died on an I/O fault (the caller then skips persisting settings).
pub fn run(shell: &mut Shell, config_dir: &Path) -> bool {
    let versions = shell.loaded_compiler_versions().join(", ");
    eprintln!(
        "Entering interactive Solidity shell (compiler: {}, backend: {}). \
         '.help' and '.exit' are your friends.",
        if versions.is_empty() { "none loaded" } else { &versions },
        shell.backend().name(),
    );

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut last_result = "true".to_string();

    loop {
        prompt("\u{bb} ");
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(error)) => {
                eprintln!("error: cannot read input: {}", error);
                return false;
            }
            None => return true,
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('.') {
            match dispatch_meta(shell, config_dir, &line) {
                Control::Continue => continue,
                Control::Exit => return true,
            }
        }

        // Keep reading until the braces balance, like a block being typed
        // across several lines.
        let mut fragment = line;
        while !braces_balanced(&fragment) {
            prompt("... ");
            match lines.next() {
                Some(Ok(more)) => {
                    fragment.push('\n');
                    fragment.push_str(more.trim());
                }
                Some(Err(error)) => {
                    eprintln!("error: cannot read input: {}", error);
                    return false;
                }
                None => return true,
            }
        }

        let fragment = substitute_last_result(&fragment, &last_result);
        match shell.run(classify(&fragment, None)) {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    eprintln!("warning: {}", warning.message);
                }
                if let Some(value) = outcome.value {
                    last_result = value.to_string();
                    println!("{}", display_value(&value));
                }
            }
            Err(error) => report_error(shell, error),
        }
    }
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

/// Strings print bare; everything else keeps its JSON rendering.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn report_error(shell: &Shell, error: ShellError) {
    match error {
        ShellError::Compile(diagnostics) => {
            render_diagnostics(&diagnostics, "", shell.last_rendered());
        }
        other => eprintln!("error: {}", other),
    }
}

// ─── Dot-Commands ──────────────────────────────────────────────────

fn dispatch_meta(shell: &mut Shell, config_dir: &Path, line: &str) -> Control {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts[0] {
        ".help" => println!("{HELP}"),
        ".exit" => return Control::Exit,
        ".undo" => match shell.undo() {
            Some(statement) => eprintln!("removed: {}", statement),
            None => eprintln!("nothing to undo"),
        },
        ".reset" => {
            shell.reset();
            eprintln!("session cleared");
        }
        ".dump" => println!("{}", shell.render()),
        ".echo" => println!("{}", parts[1..].join(" ")),
        ".proc" => match shell.backend().managed_pid() {
            Some(pid) => println!("{} - managed node process", pid),
            None => println!("no managed node process"),
        },
        ".config" => meta_config(shell, &parts),
        ".session" => meta_session(shell, config_dir, &parts),
        ".chain" => meta_chain(shell, &parts),
        other => {
            eprintln!("unknown command '{}'. Type '.help' for a list of commands.", other);
        }
    }
    Control::Continue
}

fn meta_config(shell: &mut Shell, parts: &[&str]) {
    match parts.get(1) {
        Some(&"set") if parts.len() >= 4 => {
            let value = parts[3..].join(" ");
            if let Err(error) = shell.settings.set(parts[2], &value) {
                eprintln!("error: {}", error);
            }
        }
        Some(&"unset") if parts.len() == 3 => {
            if let Err(error) = shell.settings.unset(parts[2]) {
                eprintln!("error: {}", error);
            }
        }
        None => {
            let json = serde_json::to_string_pretty(&shell.settings)
                .expect("settings are serializable");
            println!("{json}");
        }
        _ => eprintln!("usage: .config [set <key> <value> | unset <key>]"),
    }
}

fn meta_session(shell: &mut Shell, config_dir: &Path, parts: &[&str]) {
    match parts.get(1) {
        None => {
            for name in list_sessions(config_dir) {
                println!("  - {name}");
            }
        }
        Some(&"load") if parts.len() == 3 => match load_session(config_dir, parts[2]) {
            Ok(records) => {
                shell.load_session(&records);
                eprintln!("loaded session '{}' ({} statements)", parts[2], records.len());
            }
            Err(error) => eprintln!("error: {}", error),
        },
        Some(&"save") if parts.len() == 3 => {
            match save_session(config_dir, parts[2], &shell.dump_session()) {
                Ok(()) => eprintln!("saved session '{}'", parts[2]),
                Err(error) => eprintln!("error: {}", error),
            }
        }
        _ => eprintln!("usage: .session [load <name> | save <name>]"),
    }
}

fn meta_chain(shell: &mut Shell, parts: &[&str]) {
    match parts.get(1) {
        Some(&"restart") => match shell.backend().restart() {
            Ok(()) => eprintln!("'{}' backend restarted", shell.backend().name()),
            Err(error) => eprintln!("error: {}", error),
        },
        Some(&"set-provider") if parts.len() >= 3 => {
            let backend: Box<dyn Backend> = if parts[2] == "internal" {
                Box::new(ExternalProcessBackend::from_settings(&shell.settings))
            } else {
                shell.settings.provider_url = parts[2].to_string();
                Box::new(ExternalUrlBackend::new(parts[2], &shell.settings))
            };
            shell.set_backend(backend);
            match shell.backend().start() {
                Ok(()) => eprintln!("'{}' backend initialized", shell.backend().name()),
                Err(error) => eprintln!("error: {}", error),
            }
        }
        Some(&"accounts") => match shell.backend().accounts() {
            Ok(accounts) => {
                for account in accounts {
                    println!("  {account}");
                }
            }
            Err(error) => eprintln!("error: {}", error),
        },
        Some(&method) if method.starts_with("eth_") => {
            let params = parts[2..].iter().map(|arg| parse_rpc_param(arg)).collect();
            match shell.backend().rpc_call(method, params) {
                Ok(result) => println!("{result}"),
                Err(error) => eprintln!("error: {}", error),
            }
        }
        _ => eprintln!("usage: .chain [restart | set-provider <target> | accounts | eth_<X> ...]"),
    }
}

/// Arguments that parse as JSON go through typed; everything else is a
/// string, so `.chain eth_getBalance 0xabc latest` works unquoted.
fn parse_rpc_param(arg: &str) -> Value {
    serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rpc_params_parse_json_with_string_fallback() {
        assert_eq!(parse_rpc_param("true"), json!(true));
        assert_eq!(parse_rpc_param("12"), json!(12));
        assert_eq!(parse_rpc_param("\"0x0\""), json!("0x0"));
        assert_eq!(parse_rpc_param("latest"), json!("latest"));
        assert_eq!(parse_rpc_param("0xabc"), json!("0xabc"));
    }

    #[test]
    fn test_display_value_strips_string_quotes() {
        assert_eq!(display_value(&json!("hello")), "hello");
        assert_eq!(display_value(&json!(42)), "42");
        assert_eq!(display_value(&json!([1, 2])), "[1,2]");
        assert_eq!(display_value(&json!(true)), "true");
    }
}
