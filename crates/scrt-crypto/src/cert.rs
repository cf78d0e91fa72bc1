//! Consensus IO public key extraction from a registration certificate
//!
//! The enclave publishes its key inside the Netscape Comment extension
//! (OID 2.16.840.1.113730.1.13) of a self-signed X.509 certificate. The
//! extension is located by a plain byte scan rather than a DER decoder, which
//! also tolerates the non-canonical encodings some nodes emit.
//!
//! Two payload layouts exist:
//! - hardware mode: JSON `{"report": base64(report JSON), ...}` where the
//!   report's `isvEnclaveQuoteBody` carries the key at bytes 368..400
//! - software mode: the base64 of the raw 32-byte key

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::error::{CryptoError, CryptoResult};
use crate::KEY_SIZE;

/// DER header + body of the Netscape Comment OID
pub const NS_COMMENT_OID: [u8; 11] = [
    0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x86, 0xF8, 0x42, 0x01, 0x0D,
];

/// Offset of `report_data` inside an SGX quote body
pub const QUOTE_KEY_OFFSET: usize = 368;

/// Outer hardware-mode payload
#[derive(Debug, Deserialize)]
struct EndorsedReport {
    /// base64 of the attestation report JSON
    report: String,
}

#[derive(Debug, Deserialize)]
struct AttestationReport {
    #[serde(rename = "isvEnclaveQuoteStatus", default)]
    quote_status: Option<String>,
    #[serde(rename = "isvEnclaveQuoteBody")]
    quote_body: String,
}

/// Why the hardware-mode layout did not apply. Only ever logged.
#[derive(Debug, thiserror::Error)]
enum HardwareModeError {
    #[error("payload is not an endorsed report: {0}")]
    Envelope(serde_json::Error),
    #[error("report is not base64: {0}")]
    ReportEncoding(base64::DecodeError),
    #[error("report is not JSON: {0}")]
    Report(serde_json::Error),
    #[error("quote body is not base64: {0}")]
    QuoteEncoding(base64::DecodeError),
    #[error("quote body too short: {0} bytes")]
    QuoteTooShort(usize),
}

/// Extract the 32-byte consensus IO public key from `cert`.
pub fn extract_consensus_pubkey(cert: &[u8]) -> CryptoResult<[u8; KEY_SIZE]> {
    let payload = netscape_comment(cert)?;

    match hardware_mode_key(payload) {
        Ok(key) => {
            tracing::debug!("consensus key extracted from attestation report");
            return Ok(key);
        }
        Err(e) => tracing::debug!(reason = %e, "not a hardware-mode certificate, trying software mode"),
    }

    if let Some(key) = software_mode_key(payload) {
        tracing::debug!("consensus key extracted from software-mode certificate");
        return Ok(key);
    }

    Err(CryptoError::MalformedCertificate(
        "cannot extract consensus IO public key".into(),
    ))
}

/// Locate the Netscape Comment extension and return its OCTET STRING content.
///
/// Layout after the OID: one tag byte, then a DER length, then the payload.
/// A length byte above `0x80` is long form with one or two length bytes;
/// anything up to and including `0x80` is taken literally, so `0x80` means
/// 128 bytes rather than an indefinite length.
pub fn netscape_comment(cert: &[u8]) -> CryptoResult<&[u8]> {
    let start = cert
        .windows(NS_COMMENT_OID.len())
        .position(|w| w == NS_COMMENT_OID.as_slice())
        .ok_or_else(|| {
            CryptoError::MalformedCertificate("netscape comment extension not found".into())
        })?;

    // skip OID and the OCTET STRING tag
    let mut offset = start + NS_COMMENT_OID.len() + 1;
    let first = *cert.get(offset).ok_or_else(|| out_of_bounds(offset, cert.len()))?;
    offset += 1;

    let length = if first <= 0x80 {
        first as usize
    } else {
        let count = (first & 0x7f) as usize;
        if count > 2 {
            return Err(CryptoError::MalformedCertificate(format!(
                "unsupported length-of-length {count}"
            )));
        }
        let bytes = cert
            .get(offset..offset + count)
            .ok_or_else(|| out_of_bounds(offset + count, cert.len()))?;
        offset += count;
        bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize)
    };

    cert.get(offset..offset + length)
        .ok_or_else(|| out_of_bounds(offset + length, cert.len()))
}

fn out_of_bounds(offset: usize, len: usize) -> CryptoError {
    CryptoError::MalformedCertificate(format!(
        "offset {offset} exceeds certificate length {len}"
    ))
}

fn hardware_mode_key(payload: &[u8]) -> Result<[u8; KEY_SIZE], HardwareModeError> {
    let endorsed: EndorsedReport =
        serde_json::from_slice(payload).map_err(HardwareModeError::Envelope)?;
    let report_json = STANDARD
        .decode(endorsed.report.as_bytes())
        .map_err(HardwareModeError::ReportEncoding)?;
    let report: AttestationReport =
        serde_json::from_slice(&report_json).map_err(HardwareModeError::Report)?;

    if let Some(status) = &report.quote_status {
        tracing::debug!(quote_status = %status, "attestation report");
    }

    let quote_body = STANDARD
        .decode(report.quote_body.as_bytes())
        .map_err(HardwareModeError::QuoteEncoding)?;
    let key = quote_body
        .get(QUOTE_KEY_OFFSET..QUOTE_KEY_OFFSET + KEY_SIZE)
        .ok_or(HardwareModeError::QuoteTooShort(quote_body.len()))?;

    let mut out = [0u8; KEY_SIZE];
    out.copy_from_slice(key);
    Ok(out)
}

fn software_mode_key(payload: &[u8]) -> Option<[u8; KEY_SIZE]> {
    let decoded = STANDARD.decode(payload).ok()?;
    decoded.try_into().ok()
}
