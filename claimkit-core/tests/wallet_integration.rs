//! End-to-end wallet and account lifecycle.

mod common;

use claimkit_core::{
    Account, ClaimKitError, ClaimValue, DidNetwork, LocalIdentity, LockState, Wallet,
    WalletRecord,
};

use common::{fast_kdf, sample_claim, t0};

#[tokio::test]
async fn test_wallet_scenario() {
    let mut wallet: Wallet = Wallet::new("holder");
    let did = wallet.create_did(DidNetwork::Test);

    let claim = sample_claim("C1", &did);
    wallet.add_claim(claim.clone()).unwrap();
    assert_eq!(wallet.get_claim("C1"), Some(&claim));

    let account = wallet.account_by_did_mut(&did).unwrap();
    account.encrypt("pw1", fast_kdf()).await.unwrap();
    account.decrypt("pw1", None).await.unwrap();
    assert_eq!(account.get_all_claims().unwrap(), vec![&claim]);

    account.encrypt("pw1", fast_kdf()).await.unwrap();
    assert!(matches!(
        account.decrypt("wrong-pw", None).await,
        Err(ClaimKitError::DecryptionFailure(_))
    ));
    assert_eq!(account.lock_state(), LockState::Locked);

    assert!(matches!(
        wallet.add_claim(sample_claim("C2", "did:claim:test:zzz")),
        Err(ClaimKitError::UnknownDid { .. })
    ));
}

#[tokio::test]
async fn test_round_trip_preserves_timestamps_exactly() {
    let mut account = Account::<LocalIdentity>::generate(DidNetwork::Main);
    let did = account.did();
    for id in ["C1", "C2", "C3"] {
        account.add_claim(sample_claim(id, &did)).unwrap();
    }
    let before: Vec<_> = account.get_all_claims().unwrap().into_iter().cloned().collect();

    account.encrypt("correct horse", fast_kdf()).await.unwrap();
    account.decrypt("correct horse", None).await.unwrap();

    let after: Vec<_> = account.get_all_claims().unwrap().into_iter().cloned().collect();
    assert_eq!(after, before);

    let restored = &after[0];
    assert_eq!(restored.valid_from(), t0());
    assert_eq!(restored.attribute("verifiedAt").and_then(ClaimValue::as_timestamp), Some(&t0()));
    assert!(restored.attribute("birthDate").unwrap().as_timestamp().is_some());
    let ClaimValue::Map(address) = restored.attribute("address").unwrap() else {
        panic!("address should stay an object");
    };
    assert!(address["since"].as_timestamp().is_some());
    assert_eq!(address["city"].as_str(), Some("Bern"));
}

#[test]
fn test_export_before_encrypt_fails() {
    let mut wallet: Wallet = Wallet::new("holder");
    let did = wallet.create_did(DidNetwork::Test);
    wallet.add_claim(sample_claim("C1", &did)).unwrap();

    assert!(matches!(
        wallet.get_account_by_did(&did).unwrap().export(),
        Err(ClaimKitError::NotEncrypted)
    ));
    assert!(matches!(wallet.to_json(), Err(ClaimKitError::NotEncrypted)));
}

#[tokio::test]
async fn test_wallet_json_round_trip() {
    let mut wallet: Wallet = Wallet::new("holder");
    let alice = wallet.create_did(DidNetwork::Test);
    let bob = wallet.create_did(DidNetwork::Custom("lab".to_string()));
    wallet.add_claim(sample_claim("C1", &alice)).unwrap();
    wallet.add_claim(sample_claim("C2", &bob)).unwrap();
    wallet.encrypt_all("pw1", fast_kdf()).await.unwrap();

    let json = wallet.to_json().unwrap();
    assert!(!json.contains("Alice"));
    assert!(json.contains("didMap"));

    let mut restored: Wallet = Wallet::from_json(&json).unwrap();
    assert_eq!(restored.name(), "holder");
    assert_eq!(restored.get_all_dids(), wallet.get_all_dids());
    assert!(restored.accounts().iter().all(Account::is_locked));

    restored.decrypt_all("pw1", None).await.unwrap();
    assert_eq!(restored.get_claim("C2").map(|c| c.owner_did()), Some(bob.as_str()));
    assert_eq!(restored.get_all_claims(&alice).unwrap().len(), 1);
}

#[tokio::test]
async fn test_reload_recomputes_directory_from_accounts() {
    let mut wallet: Wallet = Wallet::new("holder");
    let first = wallet.create_did(DidNetwork::Test);
    let second = wallet.create_did(DidNetwork::Test);
    wallet.encrypt_all("pw1", fast_kdf()).await.unwrap();
    let record = wallet.export().unwrap();

    let mut stale = record.clone();
    stale.did_map.clear();
    stale.did_map.insert(first.clone(), 1);
    stale.did_map.insert("did:claim:test:ghost".to_string(), 0);

    let mut absent: serde_json::Value = serde_json::to_value(&record).unwrap();
    absent.as_object_mut().unwrap().remove("didMap");
    let absent: WalletRecord = serde_json::from_value(absent).unwrap();

    for record in [record, stale, absent] {
        let reloaded = Wallet::<LocalIdentity>::from_record(record).unwrap();
        assert_eq!(reloaded.get_all_dids(), vec![first.clone(), second.clone()]);
        assert_eq!(reloaded.get_did(0).as_deref(), Some(first.as_str()));
        assert!(reloaded.get_account_by_did("did:claim:test:ghost").is_none());
    }
}
