//! Webhook signature verification.
//!
//! Providers sign a manifest of `key:value;` segments with HMAC-SHA256 and
//! send `x-signature: ts=<ms>,v1=<hex>`. Two manifest shapes are accepted so
//! integrations signed with the older body-based manifest keep working:
//!
//! - canonical: `id:<canonical id>;request-id:<request id>;ts:<ts>;`
//! - legacy: `body:<raw body>;request-id:<request id>;ts:<ts>;`
//!
//! Segments with an empty value are left out of the manifest.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Parsed components of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Signing time in Unix milliseconds, kept verbatim for the manifest.
    pub ts: String,
    /// Hex digest as sent.
    pub v1: String,
}

impl SignatureHeader {
    /// Parses `ts=<integer>,v1=<hex>`. Unknown keys are ignored.
    ///
    /// Returns `None` when `ts` or `v1` is missing or `ts` is not an integer.
    pub fn parse(header: &str) -> Option<Self> {
        let mut ts = None;
        let mut v1 = None;

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key.trim() {
                "ts" => ts = Some(value.trim().to_string()),
                "v1" => v1 = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let ts = ts.filter(|t| !t.is_empty() && t.parse::<i64>().is_ok())?;
        let v1 = v1.filter(|v| !v.is_empty())?;
        Some(Self { ts, v1 })
    }
}

/// Builds a manifest from ordered segments, skipping empty values.
pub fn build_manifest(segments: &[(&str, &str)]) -> String {
    segments
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}:{};", key, value))
        .collect()
}

/// Candidate manifests in the order they are tried.
pub fn candidate_manifests(
    canonical_id: &str,
    request_id: &str,
    raw_body: &str,
    ts: &str,
) -> [String; 2] {
    [
        build_manifest(&[("id", canonical_id), ("request-id", request_id), ("ts", ts)]),
        build_manifest(&[("body", raw_body), ("request-id", request_id), ("ts", ts)]),
    ]
}

/// HMAC-SHA256 of a manifest as lowercase hex.
pub fn sign_manifest(secret: &str, manifest: &str) -> Option<String> {
    mac_bytes(secret, manifest).map(hex::encode)
}

fn mac_bytes(secret: &str, manifest: &str) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(manifest.as_bytes());
    Some(mac.finalize().into_bytes().to_vec())
}

/// Stateless webhook signature verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Returns true if any candidate manifest signs to the header's digest.
    pub fn verify(
        signature_header: &str,
        request_id: &str,
        raw_body: &str,
        canonical_id: &str,
        secret: &str,
    ) -> bool {
        let Some(header) = SignatureHeader::parse(signature_header) else {
            return false;
        };
        let Ok(provided) = hex::decode(&header.v1) else {
            return false;
        };

        let mut matched = false;
        for manifest in candidate_manifests(canonical_id, request_id, raw_body, &header.ts) {
            if let Some(expected) = mac_bytes(secret, &manifest) {
                matched |= constant_time_eq(&expected, &provided);
            }
        }
        matched
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
