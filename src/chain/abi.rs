//! Minimal ABI helpers: function selectors and best-effort decoding of call
//! return data.
//!
//! Decodes the types a REPL session realistically produces — the static
//! value types, `string`/`bytes`, and one-dimensional arrays of static
//! elements. Anything fancier falls back to the raw hex words rather than
//! failing the whole call: the value still gets printed, just undecoded.

use serde_json::Value;

use super::keccak::keccak256;

/// `0x`-prefixed 4-byte selector for a function signature like `main()`.
pub fn selector(signature: &str) -> String {
    let digest = keccak256(signature.as_bytes());
    format!("0x{}", hex_encode(&digest[..4]))
}

/// Decode the raw result of calling `function` on a contract with the given
/// ABI. `Ok(None)` when the function declares no outputs.
pub fn decode_call_result(
    abi: &Value,
    function: &str,
    raw_hex: &str,
) -> Result<Option<Value>, String> {
    let outputs = function_outputs(abi, function);
    if outputs.is_empty() {
        return Ok(None);
    }

    let data = hex_decode(raw_hex.trim_start_matches("0x"))?;
    let mut values = decode_values(&outputs, &data)?;
    Ok(Some(if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }))
}

/// Output type names of `function` in the ABI, in declaration order.
fn function_outputs(abi: &Value, function: &str) -> Vec<String> {
    let Some(entries) = abi.as_array() else {
        return Vec::new();
    };
    for entry in entries {
        if entry.get("type").and_then(Value::as_str) != Some("function") {
            continue;
        }
        if entry.get("name").and_then(Value::as_str) != Some(function) {
            continue;
        }
        return entry
            .get("outputs")
            .and_then(Value::as_array)
            .map(|outputs| {
                outputs
                    .iter()
                    .filter_map(|o| o.get("type").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
    }
    Vec::new()
}

/// Decode one head-encoded value per type.
pub fn decode_values(types: &[String], data: &[u8]) -> Result<Vec<Value>, String> {
    let mut out = Vec::new();
    for (i, ty) in types.iter().enumerate() {
        let head = word(data, i)?;
        if is_dynamic(ty) {
            let offset = word_to_usize(head)?;
            out.push(decode_dynamic(ty, data, offset)?);
        } else {
            out.push(decode_static(ty, head));
        }
    }
    Ok(out)
}

fn is_dynamic(ty: &str) -> bool {
    ty == "string" || ty == "bytes" || ty.ends_with("[]")
}

fn word(data: &[u8], index: usize) -> Result<&[u8], String> {
    data.get(index * 32..(index + 1) * 32)
        .ok_or_else(|| "return data truncated".to_string())
}

fn word_to_usize(word: &[u8]) -> Result<usize, String> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err("implausible offset in return data".to_string());
    }
    let mut value = 0usize;
    for b in &word[24..] {
        value = (value << 8) | *b as usize;
    }
    Ok(value)
}

fn decode_static(ty: &str, word: &[u8]) -> Value {
    if ty == "bool" {
        return Value::Bool(word[31] != 0);
    }
    if ty == "address" {
        return Value::String(format!("0x{}", hex_encode(&word[12..])));
    }
    if ty.starts_with("uint") {
        return uint_value(word);
    }
    if ty.starts_with("int") {
        return int_value(word);
    }
    if let Some(n) = ty.strip_prefix("bytes").and_then(|s| s.parse::<usize>().ok()) {
        if n <= 32 {
            return Value::String(format!("0x{}", hex_encode(&word[..n])));
        }
    }
    // Unknown static type: show the raw word.
    Value::String(format!("0x{}", hex_encode(word)))
}

fn uint_value(word: &[u8]) -> Value {
    if word[..16].iter().any(|b| *b != 0) {
        // Wider than u128: decimal would be misleading, keep hex.
        return Value::String(format!("0x{}", hex_encode(word)));
    }
    let mut value = 0u128;
    for b in &word[16..] {
        value = (value << 8) | *b as u128;
    }
    if value <= u64::MAX as u128 {
        Value::from(value as u64)
    } else {
        Value::String(value.to_string())
    }
}

fn int_value(word: &[u8]) -> Value {
    let negative = word[0] & 0x80 != 0;
    if !negative {
        return uint_value(word);
    }
    if word[..16].iter().any(|b| *b != 0xff) {
        return Value::String(format!("0x{}", hex_encode(word)));
    }
    let mut magnitude = 0u128;
    for b in &word[16..] {
        magnitude = (magnitude << 8) | *b as u128;
    }
    // Sign-extended above, so reinterpreting the low 128 bits is exact.
    let value = magnitude as i128;
    if value >= i64::MIN as i128 && value <= i64::MAX as i128 {
        Value::from(value as i64)
    } else {
        Value::String(value.to_string())
    }
}

fn decode_dynamic(ty: &str, data: &[u8], offset: usize) -> Result<Value, String> {
    let len_word = data
        .get(offset..offset + 32)
        .ok_or_else(|| "return data truncated".to_string())?;
    let len = word_to_usize(len_word)?;
    let tail = &data[offset + 32..];

    match ty {
        "string" => {
            let bytes = tail
                .get(..len)
                .ok_or_else(|| "string data truncated".to_string())?;
            Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
        }
        "bytes" => {
            let bytes = tail
                .get(..len)
                .ok_or_else(|| "bytes data truncated".to_string())?;
            Ok(Value::String(format!("0x{}", hex_encode(bytes))))
        }
        _ if ty.ends_with("[]") => {
            let element = &ty[..ty.len() - 2];
            if is_dynamic(element) {
                // Nested dynamic layouts stay raw rather than half-decoded.
                return Ok(Value::String(format!("0x{}", hex_encode(&data[offset..]))));
            }
            let mut items = Vec::new();
            for i in 0..len {
                items.push(decode_static(element, word(tail, i)?));
            }
            Ok(Value::Array(items))
        }
        _ => Ok(Value::String(format!("0x{}", hex_encode(&data[offset..])))),
    }
}

// ─── Hex ───────────────────────────────────────────────────────────

pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

pub fn hex_decode(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("odd-length hex string".to_string());
    }
    let mut out = Vec::with_capacity(hex.len() / 2);
    let bytes = hex.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let hi = hex_digit(pair[0])?;
        let lo = hex_digit(pair[1])?;
        out.push(hi << 4 | lo);
    }
    Ok(out)
}

fn hex_digit(c: u8) -> Result<u8, String> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(format!("invalid hex digit '{}'", c as char)),
    }
}
