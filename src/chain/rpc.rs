//! JSON-RPC 2.0 client for Ethereum-style nodes, plus the deploy/call
//! sequence both built-in backends share.

use std::time::Duration;

use serde_json::{json, Value};

use super::abi;
use super::{ContractSet, DeployResult, DeployedContract};
use crate::http;

/// How long to wait for a deployment transaction to be mined. Development
/// nodes mine instantly, so these bounds are generous.
const RECEIPT_POLL_ATTEMPTS: usize = 100;
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct RpcClient {
    url: String,
    next_id: u64,
}

impl RpcClient {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            next_id: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One JSON-RPC round trip. Transport faults and RPC-level error
    /// objects both surface as `Err`.
    pub fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Value, String> {
        self.next_id += 1;
        let payload = json!({
            "jsonrpc": "2.0",
            "id": self.next_id,
            "method": method,
            "params": params,
        });

        let response = http::post_json(&self.url, &payload.to_string())?;
        if response.status != 200 {
            return Err(format!(
                "rpc endpoint {} returned http status {}",
                self.url, response.status
            ));
        }

        let envelope: Value = serde_json::from_str(&response.body)
            .map_err(|e| format!("malformed rpc response: {}", e))?;
        if let Some(error) = envelope.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(format!("rpc error {}: {}", code, message));
        }
        Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
    }

    pub fn accounts(&mut self) -> Result<Vec<String>, String> {
        let result = self.call("eth_accounts", Vec::new())?;
        result
            .as_array()
            .map(|accounts| {
                accounts
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .ok_or_else(|| "eth_accounts did not return a list".to_string())
    }
}

/// Deploy every contract with bytecode from the first account, entry
/// contract last, then call the entry function and decode its value.
pub fn deploy_contracts(
    client: &mut RpcClient,
    set: &ContractSet,
    deploy_gas: u64,
    call_gas: u64,
) -> Result<DeployResult, String> {
    let accounts = client.accounts()?;
    let from = accounts
        .first()
        .ok_or_else(|| "backend reports no accounts".to_string())?
        .clone();

    // Dependencies first: the entry contract may reference the others.
    let mut ordered: Vec<&super::DeployableContract> = set
        .contracts
        .iter()
        .filter(|c| !c.bytecode.is_empty())
        .collect();
    ordered.sort_by_key(|c| c.entry_function.is_some());

    let mut result = DeployResult::default();
    for contract in ordered {
        let transaction = json!({
            "from": from,
            "data": format!("0x{}", contract.bytecode),
            "gas": format!("0x{:x}", deploy_gas),
        });
        let hash = client.call("eth_sendTransaction", vec![transaction])?;
        let hash = hash
            .as_str()
            .ok_or_else(|| "eth_sendTransaction returned no transaction hash".to_string())?
            .to_string();

        let receipt = wait_for_receipt(client, &hash)?;
        if receipt.get("status").and_then(Value::as_str) == Some("0x0") {
            return Err(format!("deployment of {} reverted", contract.name));
        }
        let address = receipt
            .get("contractAddress")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("no contract address in receipt for {}", contract.name))?
            .to_string();

        if let Some(function) = &contract.entry_function {
            let call = json!({
                "from": from,
                "to": address,
                "data": abi::selector(&format!("{}()", function)),
                "gas": format!("0x{:x}", call_gas),
            });
            let raw = client.call("eth_call", vec![call, json!("latest")])?;
            let raw = raw.as_str().unwrap_or("0x");
            result.entry_value = abi::decode_call_result(&contract.abi, function, raw)?;
        }

        result.contracts.push(DeployedContract {
            name: contract.name.clone(),
            address,
        });
    }
    Ok(result)
}

fn wait_for_receipt(client: &mut RpcClient, hash: &str) -> Result<Value, String> {
    for _ in 0..RECEIPT_POLL_ATTEMPTS {
        let receipt = client.call("eth_getTransactionReceipt", vec![json!(hash)])?;
        if !receipt.is_null() {
            return Ok(receipt);
        }
        std::thread::sleep(RECEIPT_POLL_INTERVAL);
    }
    Err(format!("transaction {} was never mined", hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// A one-shot JSON-RPC server that answers each request with the next
    /// canned result and records what it was asked.
    fn canned_rpc_server(results: Vec<Value>) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut methods = Vec::new();
            for result in results {
                let (mut socket, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(socket.try_clone().unwrap());

                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim().to_lowercase();
                    if line.is_empty() {
                        break;
                    }
                    if let Some(value) = line.strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
                let mut body = vec![0u8; content_length];
                reader.read_exact(&mut body).unwrap();
                let request: Value = serde_json::from_slice(&body).unwrap();
                methods.push(request["method"].as_str().unwrap().to_string());

                let reply = json!({ "jsonrpc": "2.0", "id": request["id"], "result": result });
                let reply = reply.to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
                    reply.len(),
                    reply
                );
                socket.write_all(response.as_bytes()).unwrap();
            }
            methods
        });

        (url, handle)
    }

    #[test]
    fn test_call_unwraps_the_result() {
        let (url, handle) = canned_rpc_server(vec![json!("0x10")]);
        let mut client = RpcClient::new(&url);
        let result = client.call("eth_blockNumber", Vec::new()).unwrap();
        assert_eq!(result, json!("0x10"));
        assert_eq!(handle.join().unwrap(), vec!["eth_blockNumber"]);
    }

    #[test]
    fn test_rpc_error_objects_become_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(socket.try_clone().unwrap());
            let mut line = String::new();
            // Drain the request head; the body can be ignored for this test.
            while reader.read_line(&mut line).is_ok() {
                if line.trim().is_empty() {
                    break;
                }
                line.clear();
            }
            let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).unwrap();
        });

        let mut client = RpcClient::new(&url);
        let err = client.call("eth_bogus", Vec::new()).unwrap_err();
        assert!(err.contains("-32601"));
        assert!(err.contains("method not found"));
        handle.join().unwrap();
    }

    #[test]
    fn test_deploy_sequence_and_entry_call() {
        use serde_json::json;

        let abi = json!([{
            "type": "function",
            "name": "main",
            "inputs": [],
            "outputs": [{"name": "", "type": "uint256"}],
            "stateMutability": "nonpayable"
        }]);
        let set = ContractSet {
            contracts: vec![
                super::super::DeployableContract {
                    name: "Iface".to_string(),
                    abi: json!([]),
                    bytecode: String::new(), // interface: skipped
                    entry_function: None,
                },
                super::super::DeployableContract {
                    name: "MainContract".to_string(),
                    abi,
                    bytecode: "6001".to_string(),
                    entry_function: Some("main".to_string()),
                },
            ],
        };

        let (url, handle) = canned_rpc_server(vec![
            json!(["0xa11ce"]),                                     // eth_accounts
            json!("0xhash"),                                        // eth_sendTransaction
            json!({ "status": "0x1", "contractAddress": "0xc0de" }), // receipt
            json!(format!("0x{:064x}", 3)),                         // eth_call
        ]);

        let mut client = RpcClient::new(&url);
        let result = deploy_contracts(&mut client, &set, 3_000_000, 3_000_000).unwrap();

        assert_eq!(result.contracts.len(), 1);
        assert_eq!(result.contracts[0].address, "0xc0de");
        assert_eq!(result.entry_value, Some(json!(3)));
        assert_eq!(
            handle.join().unwrap(),
            vec![
                "eth_accounts",
                "eth_sendTransaction",
                "eth_getTransactionReceipt",
                "eth_call"
            ]
        );
    }
}
