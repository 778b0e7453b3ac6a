//! Signed share certificates anchored to ledger entries.
//!
//! A certificate proves that a share token was issued by a given identity:
//! the issuer signs the hex SHA-256 of `token|issuerId|credentialId|expiry`
//! and the same hash is appended to the ledger as a `GENERATE_TOKEN` entry.
//!
//! Verification is offline. It checks, in order:
//!
//! 1. the signature over the hex payload hash,
//! 2. a ledger entry with `dataHash == payloadHash` and
//!    `hash == ledgerBlockHash`,
//! 3. that the expiry lies in the future,
//! 4. that the payload hash matches the certificate's own fields.
//!
//! Revocation is not part of the signed payload. A verifier that never
//! consults the live token state will not see revocations; see
//! [`Vault::verify_share`](crate::Vault::verify_share).

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use vaultify_core::{
    now_millis, sha256_hex, CredentialId, Keypair, LedgerEntry, LedgerEvent, PublicKey, Signature,
    UserId,
};
use vaultify_ledger::Ledger;

use crate::error::{Result, VaultError};

/// Milliseconds per hour of certificate lifetime.
pub const HOUR_MS: i64 = 3_600_000;

/// Shortest lifetime a certificate can be issued with.
pub const MIN_EXPIRY_HOURS: i64 = 1;

/// Portable proof that a share token was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareCertificate {
    pub token: String,
    #[serde(alias = "issuerUserId")]
    pub issuer_id: UserId,
    pub credential_id: CredentialId,
    pub expiry_epoch_ms: i64,
    pub payload_hash: String,
    pub signature_base64: String,
    pub ledger_block_hash: String,
    pub created_at_ms: i64,
}

impl ShareCertificate {
    /// The signed payload rebuilt from this certificate's fields.
    pub fn payload(&self) -> String {
        payload_string(
            &self.token,
            self.issuer_id,
            &self.credential_id,
            self.expiry_epoch_ms,
        )
    }

    /// Check whether `payload_hash` matches the certificate's fields.
    pub fn payload_matches(&self) -> bool {
        sha256_hex(self.payload()) == self.payload_hash
    }

    /// Artifact file name: `cert-<first 16 hex of sha256(token)>.json`.
    pub fn file_name(&self) -> String {
        certificate_file_name(&self.token)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a certificate record.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| VaultError::Validation(format!("malformed certificate: {e}")))
    }

    /// Write the certificate as pretty JSON, replacing `path` atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| VaultError::Validation(format!("not a file path: {}", path.display())))?;
        let tmp = path.with_file_name(format!(".{file_name}.tmp"));

        let staged = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, path)
        })();
        if staged.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        Ok(staged?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// `token|issuerId|credentialId|expiry`.
pub fn payload_string(
    token: &str,
    issuer_id: UserId,
    credential_id: &CredentialId,
    expiry_epoch_ms: i64,
) -> String {
    format!("{token}|{issuer_id}|{credential_id}|{expiry_epoch_ms}")
}

/// Hex SHA-256 of [`payload_string`].
pub fn payload_hash(
    token: &str,
    issuer_id: UserId,
    credential_id: &CredentialId,
    expiry_epoch_ms: i64,
) -> String {
    sha256_hex(payload_string(token, issuer_id, credential_id, expiry_epoch_ms))
}

pub fn certificate_file_name(token: &str) -> String {
    format!("cert-{}.json", &sha256_hex(token)[..16])
}

/// Expiry for a certificate issued at `now`, with the lifetime clamped to at
/// least [`MIN_EXPIRY_HOURS`].
pub fn expiry_from_hours(now: i64, expiry_hours: i64) -> i64 {
    let hours = expiry_hours.max(MIN_EXPIRY_HOURS);
    now.saturating_add(hours.saturating_mul(HOUR_MS))
}

/// Issue a certificate for `token`, appending its payload hash to the ledger.
pub fn issue_certificate(
    ledger: &Ledger,
    token: &str,
    issuer_id: UserId,
    credential_id: &CredentialId,
    expiry_hours: i64,
    issuer_key: &Keypair,
) -> Result<ShareCertificate> {
    issue_certificate_at(
        ledger,
        token,
        issuer_id,
        credential_id,
        expiry_hours,
        issuer_key,
        now_millis(),
    )
}

/// [`issue_certificate`] with an explicit issue time.
pub fn issue_certificate_at(
    ledger: &Ledger,
    token: &str,
    issuer_id: UserId,
    credential_id: &CredentialId,
    expiry_hours: i64,
    issuer_key: &Keypair,
    now: i64,
) -> Result<ShareCertificate> {
    let expiry_epoch_ms = expiry_from_hours(now, expiry_hours);
    let payload_hash = payload_hash(token, issuer_id, credential_id, expiry_epoch_ms);

    // Signs the hex string, not the raw digest.
    let signature = issuer_key.sign(payload_hash.as_bytes())?;

    let entry = ledger.record(&LedgerEvent::GenerateToken {
        payload_hash: payload_hash.clone(),
    })?;

    tracing::info!(
        %issuer_id,
        %credential_id,
        ledger_index = entry.index,
        expiry_epoch_ms,
        "issued share certificate"
    );

    Ok(ShareCertificate {
        token: token.to_string(),
        issuer_id,
        credential_id: credential_id.clone(),
        expiry_epoch_ms,
        payload_hash,
        signature_base64: signature.to_base64(),
        ledger_block_hash: entry.hash,
        created_at_ms: now,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Verification
// ─────────────────────────────────────────────────────────────────────────────

/// Why a certificate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    Signature,
    LedgerMismatch,
    Expired,
    PayloadMismatch,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::Signature => "invalid signature",
            InvalidReason::LedgerMismatch => "ledger entry not found or hash mismatch",
            InvalidReason::Expired => "certificate expired",
            InvalidReason::PayloadMismatch => "payload hash does not match certificate fields",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`verify_certificate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(InvalidReason),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Verdict::Valid => "certificate valid",
            Verdict::Invalid(reason) => reason.as_str(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Verify a certificate against the issuer's key and a ledger chain.
///
/// Never fails: malformed signatures count as invalid.
pub fn verify_certificate(
    certificate: &ShareCertificate,
    issuer_key: &PublicKey,
    chain: &[LedgerEntry],
) -> Verdict {
    verify_certificate_at(certificate, issuer_key, chain, now_millis())
}

/// [`verify_certificate`] at an explicit time.
pub fn verify_certificate_at(
    certificate: &ShareCertificate,
    issuer_key: &PublicKey,
    chain: &[LedgerEntry],
    now: i64,
) -> Verdict {
    let verdict = check(certificate, issuer_key, chain, now);
    if let Verdict::Invalid(reason) = verdict {
        tracing::info!(
            issuer_id = %certificate.issuer_id,
            credential_id = %certificate.credential_id,
            %reason,
            "certificate rejected"
        );
    }
    verdict
}

fn check(
    certificate: &ShareCertificate,
    issuer_key: &PublicKey,
    chain: &[LedgerEntry],
    now: i64,
) -> Verdict {
    let signature_ok = Signature::from_base64(&certificate.signature_base64)
        .and_then(|sig| issuer_key.verify(certificate.payload_hash.as_bytes(), &sig))
        .is_ok();
    if !signature_ok {
        return Verdict::Invalid(InvalidReason::Signature);
    }

    let anchored = chain.iter().any(|entry| {
        entry.data_hash == certificate.payload_hash && entry.hash == certificate.ledger_block_hash
    });
    if !anchored {
        return Verdict::Invalid(InvalidReason::LedgerMismatch);
    }

    if certificate.expiry_epoch_ms <= now {
        return Verdict::Invalid(InvalidReason::Expired);
    }

    if !certificate.payload_matches() {
        return Verdict::Invalid(InvalidReason::PayloadMismatch);
    }

    Verdict::Valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn keypair() -> &'static Keypair {
        static KEY: OnceLock<Keypair> = OnceLock::new();
        KEY.get_or_init(|| Keypair::generate().unwrap())
    }

    fn other_keypair() -> &'static Keypair {
        static KEY: OnceLock<Keypair> = OnceLock::new();
        KEY.get_or_init(|| Keypair::generate().unwrap())
    }

    const NOW: i64 = 1_700_000_000_000;

    fn issue(ledger: &Ledger) -> ShareCertificate {
        issue_certificate_at(
            ledger,
            "t1",
            UserId::new(7),
            &CredentialId::from(42u64),
            1,
            keypair(),
            NOW,
        )
        .unwrap()
    }

    #[test]
    fn test_payload_format() {
        assert_eq!(
            payload_string("t1", UserId::new(7), &CredentialId::from(42u64), 1_700_003_600_000),
            "t1|7|42|1700003600000"
        );
        assert_eq!(
            payload_hash("t1", UserId::new(7), &CredentialId::from(42u64), 1_700_003_600_000),
            "35484f679f4fa587e6ba9d190e55d4e153ad5bb52f3f093fada97cceaa560db5"
        );
    }

    #[test]
    fn test_issue_appends_generate_token() {
        let ledger = Ledger::in_memory().unwrap();
        let cert = issue(&ledger);

        assert_eq!(cert.expiry_epoch_ms, NOW + HOUR_MS);
        assert_eq!(cert.created_at_ms, NOW);
        assert!(cert.payload_matches());

        let entry = ledger.entry_by_hash(&cert.ledger_block_hash).unwrap().unwrap();
        assert_eq!(entry.index, 1);
        assert_eq!(entry.action.as_str(), "GENERATE_TOKEN");
        assert_eq!(entry.data_hash, cert.payload_hash);
    }

    #[test]
    fn test_expiry_hours_clamped() {
        assert_eq!(expiry_from_hours(NOW, 0), NOW + HOUR_MS);
        assert_eq!(expiry_from_hours(NOW, -5), NOW + HOUR_MS);
        assert_eq!(expiry_from_hours(NOW, 48), NOW + 48 * HOUR_MS);
    }

    #[test]
    fn test_verify_matrix() {
        let ledger = Ledger::in_memory().unwrap();
        let cert = issue(&ledger);
        let chain = ledger.chain().unwrap();
        let public = keypair().public_key();

        assert_eq!(verify_certificate_at(&cert, public, &chain, NOW), Verdict::Valid);

        let mut unanchored = cert.clone();
        unanchored.ledger_block_hash = "00".repeat(32);
        assert_eq!(
            verify_certificate_at(&unanchored, public, &chain, NOW),
            Verdict::Invalid(InvalidReason::LedgerMismatch)
        );

        let mut tampered = cert.clone();
        tampered.payload_hash = sha256_hex("something else");
        assert_eq!(
            verify_certificate_at(&tampered, public, &chain, NOW),
            Verdict::Invalid(InvalidReason::Signature)
        );

        assert_eq!(
            verify_certificate_at(&cert, public, &chain, cert.expiry_epoch_ms),
            Verdict::Invalid(InvalidReason::Expired)
        );
    }

    #[test]
    fn test_wrong_key_and_garbage_signature() {
        let ledger = Ledger::in_memory().unwrap();
        let cert = issue(&ledger);
        let chain = ledger.chain().unwrap();

        assert_eq!(
            verify_certificate_at(&cert, other_keypair().public_key(), &chain, NOW).reason(),
            "invalid signature"
        );

        let mut garbage = cert.clone();
        garbage.signature_base64 = "%%% not base64 %%%".into();
        assert!(!verify_certificate_at(&garbage, keypair().public_key(), &chain, NOW).is_valid());
    }

    #[test]
    fn test_field_tamper_fails_payload_binding() {
        let ledger = Ledger::in_memory().unwrap();
        let mut cert = issue(&ledger);
        let chain = ledger.chain().unwrap();

        // Signature and ledger anchor still hold; the fields no longer do.
        cert.credential_id = CredentialId::from(43u64);
        let verdict = verify_certificate_at(&cert, keypair().public_key(), &chain, NOW);
        assert_eq!(verdict, Verdict::Invalid(InvalidReason::PayloadMismatch));
        assert_eq!(verdict.reason(), "payload hash does not match certificate fields");
    }

    #[test]
    fn test_json_field_names_and_legacy_alias() {
        let ledger = Ledger::in_memory().unwrap();
        let cert = issue(&ledger);

        let json = cert.to_json().unwrap();
        for field in [
            "token",
            "issuerId",
            "credentialId",
            "expiryEpochMs",
            "payloadHash",
            "signatureBase64",
            "ledgerBlockHash",
            "createdAtMs",
        ] {
            assert!(json.contains(&format!("\"{field}\"")), "missing {field}");
        }

        let legacy = json.replace("\"issuerId\"", "\"issuerUserId\"").replace(
            "\"credentialId\": \"42\"",
            "\"credentialId\": 42",
        );
        assert_eq!(ShareCertificate::from_json(&legacy).unwrap(), cert);
    }

    #[test]
    fn test_malformed_json_is_validation_error() {
        assert!(matches!(
            ShareCertificate::from_json("{\"token\": 5"),
            Err(VaultError::Validation(_))
        ));
        assert!(matches!(
            ShareCertificate::from_json("{}"),
            Err(VaultError::Validation(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::in_memory().unwrap();
        let cert = issue(&ledger);

        let path = dir.path().join("certificates").join(cert.file_name());
        cert.save(&path).unwrap();
        assert_eq!(ShareCertificate::load(&path).unwrap(), cert);

        let name = cert.file_name();
        assert!(name.starts_with("cert-") && name.ends_with(".json"));
        assert_eq!(name.len(), "cert-".len() + 16 + ".json".len());
    }

    #[test]
    fn test_failed_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::in_memory().unwrap();
        let cert = issue(&ledger);

        // A directory in the way makes the final rename fail.
        let path = dir.path().join(cert.file_name());
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        assert!(cert.save(&path).is_err());
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(cert.file_name())]);
    }
}
