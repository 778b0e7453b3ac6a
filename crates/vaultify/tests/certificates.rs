//! Certificate issuance and verification against real ledgers.

use proptest::prelude::*;

use vaultify::ledger::Ledger;
use vaultify::{
    issue_certificate, issue_certificate_at, verify_certificate, verify_certificate_at,
    CredentialId, InvalidReason, LedgerAction, ShareCertificate, UserId, Verdict, HOUR_MS,
};
use vaultify_testkit::vectors::{ledger_vectors, PAYLOAD_HASH};
use vaultify_testkit::{issuer_keypair, outsider_keypair};

#[test]
fn issue_then_verify_round_trip() {
    let ledger = Ledger::in_memory().unwrap();
    let cert = issue_certificate(
        &ledger,
        "t1",
        UserId::new(7),
        &CredentialId::from(42u64),
        1,
        issuer_keypair(),
    )
    .unwrap();

    let verdict = verify_certificate(&cert, issuer_keypair().public_key(), &ledger.chain().unwrap());
    assert!(verdict.is_valid(), "{verdict}");

    // One millisecond past expiry.
    let mut expired = cert.clone();
    expired.expiry_epoch_ms = vaultify::core::now_millis() - 1;
    let verdict = verify_certificate(&expired, issuer_keypair().public_key(), &ledger.chain().unwrap());
    assert!(!verdict.is_valid());
    assert!(verdict.reason().contains("expired"));
}

#[test]
fn fixed_time_issue_matches_payload_vector() {
    let ledger = Ledger::in_memory().unwrap();
    let cert = issue_certificate_at(
        &ledger,
        "t1",
        UserId::new(7),
        &CredentialId::from(42u64),
        1,
        issuer_keypair(),
        1_700_000_000_000,
    )
    .unwrap();

    assert_eq!(cert.expiry_epoch_ms, 1_700_003_600_000);
    assert_eq!(cert.payload_hash, PAYLOAD_HASH);
}

#[test]
fn verification_matrix() {
    let now = 1_700_000_000_000;
    let ledger = Ledger::in_memory().unwrap();
    let cert = issue_certificate_at(
        &ledger,
        "t1",
        UserId::new(7),
        &CredentialId::from(42u64),
        1,
        issuer_keypair(),
        now,
    )
    .unwrap();
    let chain = ledger.chain().unwrap();
    let key = issuer_keypair().public_key();

    assert_eq!(verify_certificate_at(&cert, key, &chain, now), Verdict::Valid);

    // Anchored to a different ledger.
    let other = Ledger::in_memory().unwrap();
    other.append(LedgerAction::GenerateToken, cert.payload_hash.clone()).unwrap();
    assert_eq!(
        verify_certificate_at(&cert, key, &other.chain().unwrap(), now),
        Verdict::Invalid(InvalidReason::LedgerMismatch)
    );

    let mut tampered = cert.clone();
    tampered.payload_hash = PAYLOAD_HASH.replace('3', "4");
    assert_eq!(
        verify_certificate_at(&tampered, key, &chain, now),
        Verdict::Invalid(InvalidReason::Signature)
    );

    assert_eq!(
        verify_certificate_at(&cert, key, &chain, now + HOUR_MS + 1),
        Verdict::Invalid(InvalidReason::Expired)
    );

    assert_eq!(
        verify_certificate_at(&cert, outsider_keypair().public_key(), &chain, now),
        Verdict::Invalid(InvalidReason::Signature)
    );
}

#[test]
fn signature_failure_takes_precedence() {
    let now = 1_700_000_000_000;
    let ledger = Ledger::in_memory().unwrap();
    let mut cert = issue_certificate_at(
        &ledger,
        "t1",
        UserId::new(7),
        &CredentialId::from(42u64),
        1,
        issuer_keypair(),
        now,
    )
    .unwrap();

    // Wrong signer, no anchor and expired all at once: the signature is reported.
    cert.ledger_block_hash = "ff".repeat(32);
    let verdict = verify_certificate_at(
        &cert,
        outsider_keypair().public_key(),
        &[],
        now + 10 * HOUR_MS,
    );
    assert_eq!(verdict.reason(), "invalid signature");
}

#[test]
fn ledger_scenario_from_genesis() {
    let ledger = Ledger::in_memory().unwrap();
    ledger.append(LedgerAction::AddCredential, "h1").unwrap();
    ledger.append(LedgerAction::GenerateToken, "h2").unwrap();

    let chain = ledger.chain().unwrap();
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[2].prev_hash, chain[1].hash);
    assert!(ledger.verify_integrity().unwrap().is_empty());
}

#[test]
fn golden_chain_verifies_through_ledger() {
    let chain: Vec<_> = ledger_vectors().iter().map(|v| v.entry()).collect();
    let ledger = Ledger::open_with(Box::new(vaultify::ledger::MemorySnapshot::with_entries(
        chain.clone(),
    )))
    .unwrap();

    assert_eq!(ledger.chain().unwrap(), chain);
    assert!(ledger.verify_integrity().unwrap().is_empty());
    for vector in ledger_vectors() {
        assert_eq!(
            ledger.entry_at(vector.index).unwrap().unwrap().hash,
            vector.expected_hash,
            "{}",
            vector.name
        );
    }
}

#[test]
fn artifact_survives_disk_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join("ledger.json")).unwrap();
    let cert = issue_certificate(
        &ledger,
        "0123456789abcdef0123456789abcdef",
        UserId::new(7),
        &CredentialId::generate(),
        48,
        issuer_keypair(),
    )
    .unwrap();

    let path = dir.path().join("certificates").join(cert.file_name());
    cert.save(&path).unwrap();
    drop(ledger);

    let loaded = ShareCertificate::load(&path).unwrap();
    let reopened = Ledger::open(dir.path().join("ledger.json")).unwrap();
    assert!(verify_certificate(&loaded, issuer_keypair().public_key(), &reopened.chain().unwrap())
        .is_valid());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn issued_certificates_verify(
        token in "[0-9a-f]{32}",
        issuer in 1u64..1000,
        credential in 1u64..1_000_000,
        hours in -3i64..200,
    ) {
        let now = 1_700_000_000_000;
        let ledger = Ledger::in_memory().unwrap();
        let cert = issue_certificate_at(
            &ledger,
            &token,
            UserId::new(issuer),
            &CredentialId::from(credential),
            hours,
            issuer_keypair(),
            now,
        )
        .unwrap();

        prop_assert!(cert.expiry_epoch_ms >= now + HOUR_MS);
        let chain = ledger.chain().unwrap();
        prop_assert_eq!(
            verify_certificate_at(&cert, issuer_keypair().public_key(), &chain, now),
            Verdict::Valid
        );
        prop_assert_eq!(
            verify_certificate_at(&cert, issuer_keypair().public_key(), &chain, cert.expiry_epoch_ms),
            Verdict::Invalid(InvalidReason::Expired)
        );
    }
}
