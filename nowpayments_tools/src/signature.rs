//! IPN signature checks.
//!
//! NOWPayments signs each notification with HMAC-SHA512, keyed with the IPN secret, over the notification body
//! re-serialised with its keys sorted (recursively) and no whitespace. The hex-encoded digest is sent in the
//! `x-nowpayments-sig` header.
use hmac::{Hmac, Mac};
use log::*;
use serde_json::Value;
use sha2::Sha512;

pub const SIGNATURE_HEADER: &str = "x-nowpayments-sig";

type HmacSha512 = Hmac<Sha512>;

/// Serialise `value` with object keys in sorted order at every depth, using compact separators.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys = map.keys().collect::<Vec<_>>();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        },
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// The hex-encoded HMAC-SHA512 of the canonical form of `value`.
pub fn calculate_signature(secret: &str, value: &Value) -> Option<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(canonical_json(value).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `signature` against the HMAC of `value`, in constant time.
pub fn verify_signature(secret: &str, value: &Value, signature: &str) -> bool {
    let expected = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("🔐️ IPN signature is not valid hex. {e}");
            return false;
        },
    };
    let mut mac = match HmacSha512::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!("🔐️ Could not initialise HMAC. {e}");
            return false;
        },
    };
    mac.update(canonical_json(value).as_bytes());
    mac.verify_slice(&expected).is_ok()
}
