//! Shell settings: an enumerated, fixed field set with documented defaults.
//!
//! Settings live in a JSON file under the config home and are owned by the
//! shell value — there is no process-wide state. Unknown keys in the file
//! are rejected instead of silently merged, so typos surface immediately.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::template::RenderOptions;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    /// Name of the synthesized contract.
    pub template_contract_name: String,
    /// Name of the synthesized entry function.
    pub template_func_main: String,
    /// Version emitted when the session carries no `pragma solidity`.
    pub default_solidity_version: String,
    /// JSON-RPC endpoint of the blockchain backend.
    pub provider_url: String,
    /// Spawn a local development node when the provider is unreachable.
    pub autostart_chain: bool,
    /// Command used to launch the local node.
    pub chain_command: String,
    /// Extra arguments for the node command.
    pub chain_args: Vec<String>,
    /// Gas limit for contract creation transactions.
    pub deploy_gas: u64,
    /// Gas limit for entry function calls.
    pub call_gas: u64,
    /// Print the rendered template before each compile.
    pub debug_show_contract: bool,
    /// The pre-installed compiler binary, probed at startup.
    pub solc_command: String,
    /// Directory holding additional versioned compiler binaries
    /// (`solc-v0.8.21` naming).
    pub solc_dir: Option<PathBuf>,
    /// Optional build-list URL consulted on version lookups (plain HTTP).
    pub build_list_url: Option<String>,
    /// Base directory for import resolution.
    pub base_path: Option<PathBuf>,
    /// Additional include directories for import resolution.
    pub include_paths: Vec<PathBuf>,
    /// Allow `http://` imports. Off by default: a remote import is a
    /// blocking network fetch of code you are about to compile.
    pub allow_remote_imports: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            template_contract_name: "MainContract".to_string(),
            template_func_main: "main".to_string(),
            default_solidity_version: "^0.8.21".to_string(),
            provider_url: "http://127.0.0.1:8545".to_string(),
            autostart_chain: true,
            chain_command: "anvil".to_string(),
            chain_args: Vec::new(),
            deploy_gas: 3_000_000,
            call_gas: 3_000_000,
            debug_show_contract: false,
            solc_command: "solc".to_string(),
            solc_dir: None,
            build_list_url: None,
            base_path: None,
            include_paths: Vec::new(),
            allow_remote_imports: false,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults; a
    /// malformed or unknown-key file is an error.
    pub fn load(path: &Path) -> Result<Settings, String> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("invalid settings in '{}': {}", path.display(), e))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("cannot create '{}': {}", parent.display(), e))?;
        }
        let json = serde_json::to_string_pretty(self).expect("settings are serializable");
        std::fs::write(path, json).map_err(|e| format!("cannot write '{}': {}", path.display(), e))
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            contract_name: self.template_contract_name.clone(),
            entry_function: self.template_func_main.clone(),
            default_version: self.default_solidity_version.clone(),
        }
    }

    /// Set one field by its config-file key. Values are parsed according to
    /// the field's type; list fields split on whitespace.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "templateContractName" => self.template_contract_name = value.to_string(),
            "templateFuncMain" => self.template_func_main = value.to_string(),
            "defaultSolidityVersion" => self.default_solidity_version = value.to_string(),
            "providerUrl" => self.provider_url = value.to_string(),
            "autostartChain" => self.autostart_chain = parse_bool(key, value)?,
            "chainCommand" => self.chain_command = value.to_string(),
            "chainArgs" => self.chain_args = split_list(value),
            "deployGas" => self.deploy_gas = parse_u64(key, value)?,
            "callGas" => self.call_gas = parse_u64(key, value)?,
            "debugShowContract" => self.debug_show_contract = parse_bool(key, value)?,
            "solcCommand" => self.solc_command = value.to_string(),
            "solcDir" => self.solc_dir = Some(PathBuf::from(value)),
            "buildListUrl" => self.build_list_url = Some(value.to_string()),
            "basePath" => self.base_path = Some(PathBuf::from(value)),
            "includePaths" => {
                self.include_paths = split_list(value).into_iter().map(PathBuf::from).collect()
            }
            "allowRemoteImports" => self.allow_remote_imports = parse_bool(key, value)?,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Reset one field to its default.
    pub fn unset(&mut self, key: &str) -> Result<(), String> {
        let defaults = Settings::default();
        match key {
            "templateContractName" => self.template_contract_name = defaults.template_contract_name,
            "templateFuncMain" => self.template_func_main = defaults.template_func_main,
            "defaultSolidityVersion" => {
                self.default_solidity_version = defaults.default_solidity_version
            }
            "providerUrl" => self.provider_url = defaults.provider_url,
            "autostartChain" => self.autostart_chain = defaults.autostart_chain,
            "chainCommand" => self.chain_command = defaults.chain_command,
            "chainArgs" => self.chain_args = defaults.chain_args,
            "deployGas" => self.deploy_gas = defaults.deploy_gas,
            "callGas" => self.call_gas = defaults.call_gas,
            "debugShowContract" => self.debug_show_contract = defaults.debug_show_contract,
            "solcCommand" => self.solc_command = defaults.solc_command,
            "solcDir" => self.solc_dir = defaults.solc_dir,
            "buildListUrl" => self.build_list_url = defaults.build_list_url,
            "basePath" => self.base_path = defaults.base_path,
            "includePaths" => self.include_paths = defaults.include_paths,
            "allowRemoteImports" => self.allow_remote_imports = defaults.allow_remote_imports,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> String {
    format!(
        "unknown setting '{}' (see `.config` for the full list)",
        key
    )
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("'{}' expects true or false, got '{}'", key, value)),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, String> {
    value
        .parse()
        .map_err(|_| format!("'{}' expects a number, got '{}'", key, value))
}

fn split_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// The config home: `$SOLSH_HOME`, falling back to `~/.solsh`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SOLSH_HOME") {
        return PathBuf::from(dir);
    }
    match std::env::var("HOME") {
        Ok(home) => Path::new(&home).join(".solsh"),
        Err(_) => PathBuf::from(".solsh"),
    }
}
