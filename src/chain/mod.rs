//! The blockchain boundary: the pluggable [`Backend`] trait, the contract
//! set handed to it, and the built-in backends (external process, external
//! URL) that talk JSON-RPC to a local development node.

pub mod abi;
pub mod keccak;
pub mod process;
pub mod rpc;

pub use process::{ExternalProcessBackend, ExternalUrlBackend};
pub use rpc::RpcClient;

use serde_json::Value;

use crate::compiler::CompilerOutput;

/// One compiled contract ready for deployment.
#[derive(Clone, Debug)]
pub struct DeployableContract {
    pub name: String,
    /// The contract's ABI as solc emitted it.
    pub abi: Value,
    /// Hex creation bytecode without the `0x` prefix; empty for interfaces.
    pub bytecode: String,
    /// Set on the entry contract: the function to invoke after deployment.
    pub entry_function: Option<String>,
}

/// Everything one compile produced, with the entry contract marked.
#[derive(Clone, Debug, Default)]
pub struct ContractSet {
    pub contracts: Vec<DeployableContract>,
}

impl ContractSet {
    /// Collect the synthesized unit's contracts (solc reports them under
    /// the empty path) and mark the entry contract.
    pub fn from_output(
        output: &CompilerOutput,
        entry_contract: &str,
        entry_function: &str,
    ) -> ContractSet {
        let mut contracts = Vec::new();
        if let Some(unit) = output.contracts.get("") {
            for (name, artifact) in unit {
                contracts.push(DeployableContract {
                    name: name.clone(),
                    abi: artifact.abi.clone(),
                    bytecode: artifact.evm.bytecode.object.clone(),
                    entry_function: (name == entry_contract)
                        .then(|| entry_function.to_string()),
                });
            }
        }
        ContractSet { contracts }
    }
}

#[derive(Clone, Debug)]
pub struct DeployedContract {
    pub name: String,
    pub address: String,
}

/// Outcome of deploying a [`ContractSet`].
#[derive(Clone, Debug, Default)]
pub struct DeployResult {
    pub contracts: Vec<DeployedContract>,
    /// The ABI-decoded return value of the entry function call, when the
    /// entry contract declares one.
    pub entry_value: Option<Value>,
}

/// A blockchain backend. Any implementation satisfying this contract works:
/// a spawned local node, a remote URL, or a scripted double in tests.
pub trait Backend {
    fn name(&self) -> &str;

    /// Start the backing service. Idempotent.
    fn start(&mut self) -> Result<(), String>;

    /// Stop the backing service. Idempotent.
    fn stop(&mut self) -> Result<(), String>;

    fn restart(&mut self) -> Result<(), String> {
        self.stop()?;
        self.start()
    }

    fn accounts(&mut self) -> Result<Vec<String>, String>;

    /// Pid of a node process this backend manages, when it spawned one.
    fn managed_pid(&self) -> Option<u32> {
        None
    }

    /// Raw JSON-RPC escape hatch (`.chain eth_blockNumber` and friends).
    fn rpc_call(&mut self, method: &str, params: Vec<Value>) -> Result<Value, String>;

    /// Deploy every contract with bytecode using the first account, the
    /// entry contract last, then invoke the entry function and return its
    /// decoded value.
    fn deploy(&mut self, set: &ContractSet) -> Result<DeployResult, String>;
}
