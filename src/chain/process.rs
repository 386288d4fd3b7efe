//! Built-in backends: a spawned local development node, and a plain URL to
//! a node somebody else manages.

use std::process::{Child, Command, Stdio};

use serde_json::Value;

use super::rpc::{deploy_contracts, RpcClient};
use super::{Backend, ContractSet, DeployResult};
use crate::config::Settings;

/// Spawns `chain_command` (anvil, ganache, ...) as a child process and talks
/// to it over `provider_url`. The process is killed when the backend stops
/// or is dropped.
pub struct ExternalProcessBackend {
    command: String,
    args: Vec<String>,
    client: RpcClient,
    deploy_gas: u64,
    call_gas: u64,
    child: Option<Child>,
}

impl ExternalProcessBackend {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            command: settings.chain_command.clone(),
            args: settings.chain_args.clone(),
            client: RpcClient::new(&settings.provider_url),
            deploy_gas: settings.deploy_gas,
            call_gas: settings.call_gas,
            child: None,
        }
    }

    /// Pid of the managed node, when one is running.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }
}

impl Backend for ExternalProcessBackend {
    fn name(&self) -> &str {
        "external-process"
    }

    fn start(&mut self) -> Result<(), String> {
        if self.child.is_some() {
            return Ok(());
        }
        let child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                format!(
                    "unable to launch '{}': {} (is it installed and on PATH? \
                     configure another node with chainCommand or providerUrl)",
                    self.command, e
                )
            })?;
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), String> {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        Ok(())
    }

    fn accounts(&mut self) -> Result<Vec<String>, String> {
        self.client.accounts()
    }

    fn managed_pid(&self) -> Option<u32> {
        self.pid()
    }

    fn rpc_call(&mut self, method: &str, params: Vec<Value>) -> Result<Value, String> {
        self.client.call(method, params)
    }

    fn deploy(&mut self, set: &ContractSet) -> Result<DeployResult, String> {
        deploy_contracts(&mut self.client, set, self.deploy_gas, self.call_gas)
            .map_err(|e| format!("node not ready or rejected the deployment, try again ({})", e))
    }
}

impl Drop for ExternalProcessBackend {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// A node reachable at a fixed URL. Lifecycle calls are no-ops: the node's
/// owner manages it.
pub struct ExternalUrlBackend {
    client: RpcClient,
    deploy_gas: u64,
    call_gas: u64,
}

impl ExternalUrlBackend {
    pub fn new(url: &str, settings: &Settings) -> Self {
        Self {
            client: RpcClient::new(url),
            deploy_gas: settings.deploy_gas,
            call_gas: settings.call_gas,
        }
    }

    pub fn url(&self) -> &str {
        self.client.url()
    }
}

impl Backend for ExternalUrlBackend {
    fn name(&self) -> &str {
        "external-url"
    }

    fn start(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn accounts(&mut self) -> Result<Vec<String>, String> {
        self.client.accounts()
    }

    fn rpc_call(&mut self, method: &str, params: Vec<Value>) -> Result<Value, String> {
        self.client.call(method, params)
    }

    fn deploy(&mut self, set: &ContractSet) -> Result<DeployResult, String> {
        deploy_contracts(&mut self.client, set, self.deploy_gas, self.call_gas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_chain_command_is_a_clear_error() {
        let mut settings = Settings::default();
        settings.chain_command = "definitely-not-a-real-node-binary".to_string();

        let mut backend = ExternalProcessBackend::from_settings(&settings);
        let err = backend.start().unwrap_err();
        assert!(err.contains("definitely-not-a-real-node-binary"));
        assert!(backend.pid().is_none());
    }

    #[test]
    fn test_stop_is_idempotent_without_a_child() {
        let mut backend = ExternalProcessBackend::from_settings(&Settings::default());
        backend.stop().unwrap();
        backend.stop().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_start_is_idempotent_and_stop_kills() {
        let mut settings = Settings::default();
        settings.chain_command = "sleep".to_string();
        settings.chain_args = vec!["30".to_string()];

        let mut backend = ExternalProcessBackend::from_settings(&settings);
        backend.start().unwrap();
        let pid = backend.pid().unwrap();
        backend.start().unwrap();
        assert_eq!(backend.pid(), Some(pid));

        backend.stop().unwrap();
        assert!(backend.pid().is_none());
    }

    #[test]
    fn test_url_backend_lifecycle_is_a_no_op() {
        let mut backend = ExternalUrlBackend::new("http://127.0.0.1:1", &Settings::default());
        backend.start().unwrap();
        backend.restart().unwrap();
        backend.stop().unwrap();
        assert_eq!(backend.name(), "external-url");
        assert_eq!(backend.url(), "http://127.0.0.1:1");
    }
}
