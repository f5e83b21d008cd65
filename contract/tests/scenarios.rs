//! End-to-end dispatcher scenarios: full request → envelope flows over a
//! simulated ledger, covering individual and team vault lifecycles, rate
//! limiting, revocation, and replica digest determinism.

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde_json::{json, Value};

use xvault_contract::canon::signing_message;
use xvault_contract::crypto::address::derive_address;
use xvault_contract::ops::{Dispatcher, DispatcherConfig, Request, Response};
use xvault_contract::state::store::VaultStore;
use xvault_contract::token::TokenAdapter;
use xvault_contract::ErrorCode;

const GATEWAY: &str = "https://gateway.example.com";
const CID: &str = "bafybeigdyrztf4f6xsl54n4xq4m5gxezm5q4za2ojx6x7lf5y3w4f4xhqy";

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// An Ed25519 request signer with its ledger-style key string and address.
struct TestSigner {
    key: SigningKey,
    public_key: String,
    address: String,
}

impl TestSigner {
    fn new() -> Self {
        let key = SigningKey::generate(&mut OsRng);
        let public_key = format!(
            "ED{}",
            hex::encode(key.verifying_key().to_bytes()).to_uppercase()
        );
        let address = derive_address(&public_key).unwrap();
        Self {
            key,
            public_key,
            address,
        }
    }

    /// Hex signature over the canonical digest of `preimage`.
    fn sign_value(&self, preimage: &Value) -> String {
        let message = signing_message(preimage).unwrap();
        hex::encode(self.key.sign(&message).to_bytes())
    }
}

/// Sign a payload whose preimage is the payload itself minus the signing
/// fields (the createVault family).
fn sign_payload(payload: &mut Value, signer: &TestSigner) {
    let preimage = payload.clone();
    let signature = signer.sign_value(&preimage);
    payload["signerPublicKey"] = json!(signer.public_key);
    payload["signature"] = json!(signature);
}

/// Attach a signature over an explicit preimage (the fixed-shape ops).
fn attach_signature(payload: &mut Value, preimage: &Value, signer: &TestSigner) {
    let signature = signer.sign_value(preimage);
    payload["signerPublicKey"] = json!(signer.public_key);
    payload["signature"] = json!(signature);
}

fn dispatcher(name: &str) -> Dispatcher {
    let state_file = std::env::temp_dir().join(format!(
        "xvault-scenario-{name}-{}.json",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&state_file);
    let config = DispatcherConfig {
        state_file,
        gateway_url: GATEWAY.to_string(),
        team_mode: true,
        mutable_uri_tokens: false,
    };
    Dispatcher::new(
        VaultStore::new(),
        TokenAdapter::simulated("rXVaultIssuerAccount"),
        config,
    )
}

async fn call(d: &mut Dispatcher, op: &str, payload: Value, round: &str) -> Response {
    d.handle(&Request::new(op, payload), round).await
}

fn expect_ok(response: Response) -> Value {
    assert!(
        response.ok,
        "expected success, got {:?} {:?}",
        response.code, response.error
    );
    response.data.unwrap()
}

fn expect_err(response: Response, code: ErrorCode) {
    assert!(!response.ok, "expected failure, got {:?}", response.data);
    assert_eq!(response.code, Some(code), "message: {:?}", response.error);
    let error_id = response.error_id.unwrap();
    assert_eq!(error_id.len(), 12);
}

fn create_vault_payload(signer: &TestSigner, salt: &str, team: bool) -> Value {
    let mut payload = json!({
        "type": if team { "team" } else { "individual" },
        "owner": signer.address,
        "salt": salt,
        "metadata": {},
    });
    sign_payload(&mut payload, signer);
    payload
}

fn add_entry_payload(signer: &TestSigner, vault_id: &str, cid: &str) -> Value {
    let mut payload = json!({
        "vaultId": vault_id,
        "actor": signer.address,
        "encryptedBlob": "c2VjcmV0LWNpcGhlcnRleHQ=",
        "cid": cid,
        "entryMetadata": {"service": "github", "username": "mike"},
        "wrappedKeys": [],
    });
    sign_payload(&mut payload, signer);
    payload
}

fn get_entry_payload(signer: &TestSigner, vault_id: &str, index: u64) -> Value {
    let preimage = json!({
        "vaultId": vault_id,
        "actor": signer.address,
        "entryIndex": index,
        "tokenId": null,
    });
    let mut payload = json!({
        "vaultId": vault_id,
        "actor": signer.address,
        "entryIndex": index,
    });
    attach_signature(&mut payload, &preimage, signer);
    payload
}

async fn create_vault(d: &mut Dispatcher, signer: &TestSigner, salt: &str, team: bool, round: &str) -> String {
    let data = expect_ok(call(d, if team { "createTeamVault" } else { "createVault" },
        create_vault_payload(signer, salt, team), round).await);
    data["vaultId"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// S1 — individual create + read
// ---------------------------------------------------------------------------

#[tokio::test]
async fn individual_create_and_list() {
    let mut d = dispatcher("s1");
    let owner = TestSigner::new();

    let data = expect_ok(
        call(&mut d, "createVault", create_vault_payload(&owner, "aabbccddeeff0011", false), "1")
            .await,
    );

    // The id is the digest of `owner + ":" + salt`.
    let expected_id = VaultStore::vault_id_for(&owner.address, "aabbccddeeff0011");
    assert_eq!(data["vaultId"], json!(expected_id));
    assert_eq!(data["owner"], json!(owner.address));
    assert_eq!(data["createdAt"], json!("1"));
    assert_eq!(data["mintMode"], json!("simulated"));

    let listing = expect_ok(
        call(&mut d, "getMyVaults", json!({"owner": owner.address}), "1").await,
    );
    let vaults = listing["vaults"].as_array().unwrap();
    assert_eq!(vaults.len(), 1);
    assert_eq!(vaults[0]["vaultId"], json!(expected_id));
    assert_eq!(vaults[0]["type"], json!("individual"));
    assert_eq!(vaults[0]["entryCount"], json!(0));
    assert!(vaults[0]["manifestTokenId"].as_str().unwrap().len() > 0);
    assert_eq!(vaults[0]["lastActivity"], Value::Null);
}

// ---------------------------------------------------------------------------
// S2 — addEntry + getEntry by index
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_entry_and_read_back() {
    let mut d = dispatcher("s2");
    let owner = TestSigner::new();
    let vault_id = create_vault(&mut d, &owner, "aabbccddeeff0011", false, "1").await;

    let added = expect_ok(
        call(&mut d, "addEntry", add_entry_payload(&owner, &vault_id, CID), "1").await,
    );
    assert_eq!(added["cid"], json!(CID));
    assert!(added["tokenId"].as_str().unwrap().len() > 0);

    let entry = expect_ok(
        call(&mut d, "getEntry", get_entry_payload(&owner, &vault_id, 0), "1").await,
    );
    assert_eq!(entry["cid"], json!(CID));
    assert_eq!(
        entry["metadata"],
        json!({"service": "github", "username": "mike", "notes": null})
    );
    assert_eq!(entry["gatewayUrl"], json!(format!("{GATEWAY}/ipfs/{CID}")));

    let listing = expect_ok(
        call(&mut d, "getMyVaults", json!({"owner": owner.address}), "1").await,
    );
    let vaults = listing["vaults"].as_array().unwrap();
    assert_eq!(vaults[0]["entryCount"], json!(1));
    assert_eq!(vaults[0]["lastActivity"], json!("1"));
}

// ---------------------------------------------------------------------------
// S3 — rate limit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sixth_mutation_in_a_round_is_rejected() {
    let mut d = dispatcher("s3");
    let owner = TestSigner::new();

    let salts = [
        "aabbccddeeff0011",
        "aabbccddeeff0022",
        "aabbccddeeff0033",
        "aabbccddeeff0044",
        "aabbccddeeff0055",
    ];
    for salt in salts {
        expect_ok(call(&mut d, "createVault", create_vault_payload(&owner, salt, false), "55").await);
    }

    let sixth = call(
        &mut d,
        "createVault",
        create_vault_payload(&owner, "aabbccddeeff0066", false),
        "55",
    )
    .await;
    expect_err(sixth, ErrorCode::RateLimitExceeded);

    // A fresh round resets the budget.
    expect_ok(
        call(&mut d, "createVault", create_vault_payload(&owner, "aabbccddeeff0066", false), "56")
            .await,
    );
}

// ---------------------------------------------------------------------------
// S4 — invalid CID
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_cid_is_rejected_without_side_effects() {
    let mut d = dispatcher("s4");
    let owner = TestSigner::new();
    let vault_id = create_vault(&mut d, &owner, "aabbccddeeff0011", false, "1").await;

    let before = d.store().digest().unwrap();

    let response = call(
        &mut d,
        "addEntry",
        add_entry_payload(&owner, &vault_id, "not-a-cid"),
        "1",
    )
    .await;
    expect_err(response, ErrorCode::InvalidCid);

    // No entry appended, no state change.
    assert_eq!(d.store().digest().unwrap(), before);
    let listing = expect_ok(call(&mut d, "getMyVaults", json!({"owner": owner.address}), "1").await);
    assert_eq!(listing["vaults"][0]["entryCount"], json!(0));
}

// ---------------------------------------------------------------------------
// S5 — team accept/read/remove/deny
// ---------------------------------------------------------------------------

#[tokio::test]
async fn team_membership_lifecycle() {
    let mut d = dispatcher("s5");
    let owner = TestSigner::new();
    let member = TestSigner::new();
    let vault_id = create_vault(&mut d, &owner, "aabbccddeeff0011", true, "1").await;

    // Invite, signed by the owner.
    let invite_preimage = json!({
        "vaultId": vault_id,
        "invitee": member.address,
        "action": "inviteToVault",
    });
    let mut invite = json!({"vaultId": vault_id, "invitee": member.address});
    attach_signature(&mut invite, &invite_preimage, &owner);
    expect_ok(call(&mut d, "inviteToVault", invite, "2").await);

    // Accept, signed by the member.
    let accept_preimage = json!({"vaultId": vault_id, "action": "acceptInvite"});
    let mut accept = json!({"vaultId": vault_id});
    attach_signature(&mut accept, &accept_preimage, &member);
    let accepted = expect_ok(call(&mut d, "acceptInvite", accept, "3").await);
    assert_eq!(accepted["member"], json!(member.address));
    assert_eq!(accepted["authorizedCount"], json!(2));

    // The member writes and reads.
    expect_ok(call(&mut d, "addEntry", add_entry_payload(&member, &vault_id, CID), "4").await);
    expect_ok(call(&mut d, "getEntry", get_entry_payload(&member, &vault_id, 0), "4").await);

    // Owner removes the member.
    let remove_preimage = json!({
        "vaultId": vault_id,
        "memberToRemove": member.address,
        "action": "removeMember",
    });
    let mut remove = json!({"vaultId": vault_id, "memberToRemove": member.address});
    attach_signature(&mut remove, &remove_preimage, &owner);
    expect_ok(call(&mut d, "removeMember", remove, "5").await);

    // The removed member can no longer read.
    let denied = call(&mut d, "getEntry", get_entry_payload(&member, &vault_id, 0), "6").await;
    expect_err(denied, ErrorCode::Unauthorized);

    // An attacker signing a revoke "on behalf of" the owner fails
    // signature verification — the preimage binds to the owner's address.
    let attacker = TestSigner::new();
    let revoke_preimage = json!({
        "vaultId": vault_id,
        "pendingAddress": member.address,
        "action": "revokeInvite",
    });
    let mut forged = json!({"vaultId": vault_id, "pendingAddress": member.address});
    attach_signature(&mut forged, &revoke_preimage, &attacker);
    let refused = call(&mut d, "revokeInvite", forged, "6").await;
    expect_err(refused, ErrorCode::InvalidSignature);
}

// ---------------------------------------------------------------------------
// S6 — team revocation confirm
// ---------------------------------------------------------------------------

#[tokio::test]
async fn team_revocation_requires_confirmation() {
    let mut d = dispatcher("s6");
    let owner = TestSigner::new();
    let vault_id = create_vault(&mut d, &owner, "aabbccddeeff0011", true, "1").await;
    expect_ok(call(&mut d, "addEntry", add_entry_payload(&owner, &vault_id, CID), "2").await);

    // confirm=false: refused.
    let preimage = json!({"vaultId": vault_id, "confirm": false, "action": "revokeVault"});
    let mut revoke = json!({"vaultId": vault_id, "confirm": false});
    attach_signature(&mut revoke, &preimage, &owner);
    expect_err(call(&mut d, "revokeVault", revoke, "3").await, ErrorCode::ConfirmationRequired);

    // confirm=true: manifest + one entry token burned, vault gone.
    let preimage = json!({"vaultId": vault_id, "confirm": true, "action": "revokeVault"});
    let mut revoke = json!({"vaultId": vault_id, "confirm": true});
    attach_signature(&mut revoke, &preimage, &owner);
    let data = expect_ok(call(&mut d, "revokeVault", revoke, "3").await);
    assert_eq!(data["burnedTokens"], json!(2));

    let listing = expect_ok(call(&mut d, "getMyVaults", json!({"owner": owner.address}), "4").await);
    assert_eq!(listing["count"], json!(0));

    // Post-revocation, token listings fail with VaultNotFound.
    let list_preimage = json!({"vaultId": vault_id, "action": "listVaultURITokens"});
    let mut list = json!({"vaultId": vault_id});
    attach_signature(&mut list, &list_preimage, &owner);
    expect_err(call(&mut d, "listVaultURITokens", list, "4").await, ErrorCode::VaultNotFound);
}

// ---------------------------------------------------------------------------
// Password backup round-trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn password_backup_roundtrips_byte_equal() {
    let mut d = dispatcher("backup");
    let owner = TestSigner::new();
    let vault_id = create_vault(&mut d, &owner, "aabbccddeeff0011", false, "1").await;

    let envelope = json!({
        "version": 1,
        "vaultId": vault_id,
        "salt": "c2FsdA==",
        "nonce": "bm9uY2U=",
        "authTag": "dGFn",
        "ciphertext": "Y2lwaGVydGV4dA==",
    });

    let preimage = json!({
        "vaultId": vault_id,
        "passwordBackup": envelope,
        "action": "addPasswordBackup",
    });
    let mut add = json!({"vaultId": vault_id, "passwordBackup": envelope});
    attach_signature(&mut add, &preimage, &owner);
    expect_ok(call(&mut d, "addPasswordBackup", add, "2").await);

    let meta_preimage = json!({"vaultId": vault_id, "action": "getVaultMetadata"});
    let mut meta = json!({"vaultId": vault_id});
    attach_signature(&mut meta, &meta_preimage, &owner);
    let data = expect_ok(call(&mut d, "getVaultMetadata", meta, "3").await);

    assert_eq!(data["metadata"]["passwordBackup"], envelope);
    assert_eq!(data["metadata"]["lastUpdated"], json!("2"));

    // Removal clears it.
    let remove_preimage = json!({"vaultId": vault_id, "action": "removePasswordBackup"});
    let mut remove = json!({"vaultId": vault_id});
    attach_signature(&mut remove, &remove_preimage, &owner);
    let removed = expect_ok(call(&mut d, "removePasswordBackup", remove, "4").await);
    assert_eq!(removed["removed"], json!(true));
}

// ---------------------------------------------------------------------------
// Replica determinism
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_replicas_converge_on_the_same_digest() {
    let owner = TestSigner::new();
    let member = TestSigner::new();

    // One ordered request sequence, replayed on two fresh dispatchers.
    let mut requests: Vec<(String, Value, String)> = Vec::new();
    {
        let payload = create_vault_payload(&owner, "aabbccddeeff0011", true);
        requests.push(("createTeamVault".into(), payload, "1".into()));

        let vault_id = VaultStore::vault_id_for(&owner.address, "aabbccddeeff0011");
        let invite_preimage = json!({
            "vaultId": vault_id,
            "invitee": member.address,
            "action": "inviteToVault",
        });
        let mut invite = json!({"vaultId": vault_id, "invitee": member.address});
        attach_signature(&mut invite, &invite_preimage, &owner);
        requests.push(("inviteToVault".into(), invite, "2".into()));

        let accept_preimage = json!({"vaultId": vault_id, "action": "acceptInvite"});
        let mut accept = json!({"vaultId": vault_id});
        attach_signature(&mut accept, &accept_preimage, &member);
        requests.push(("acceptInvite".into(), accept, "3".into()));

        requests.push((
            "addEntry".into(),
            add_entry_payload(&member, &vault_id, CID),
            "4".into(),
        ));
    }

    let mut digests_a = Vec::new();
    let mut digests_b = Vec::new();
    for (name, digests) in [("replica-a", &mut digests_a), ("replica-b", &mut digests_b)] {
        let mut d = dispatcher(name);
        for (op, payload, round) in &requests {
            let response = d.handle(&Request::new(op.clone(), payload.clone()), round).await;
            assert!(response.ok, "replica {name} failed {op}: {:?}", response.error);
            digests.push(d.store().digest().unwrap());
        }
    }

    // Equal digest at every step, not just at the end.
    assert_eq!(digests_a, digests_b);
}

// ---------------------------------------------------------------------------
// Team-mode gating
// ---------------------------------------------------------------------------

#[tokio::test]
async fn team_operations_disabled_without_flag() {
    let state_file = std::env::temp_dir().join(format!(
        "xvault-scenario-noteam-{}.json",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&state_file);
    let mut d = Dispatcher::new(
        VaultStore::new(),
        TokenAdapter::simulated("rXVaultIssuerAccount"),
        DispatcherConfig {
            state_file,
            gateway_url: String::new(),
            team_mode: false,
            mutable_uri_tokens: false,
        },
    );

    let owner = TestSigner::new();
    let response = call(
        &mut d,
        "createTeamVault",
        create_vault_payload(&owner, "aabbccddeeff0011", true),
        "1",
    )
    .await;
    expect_err(response, ErrorCode::TeamModeDisabled);

    // Individual vaults still work.
    expect_ok(
        call(&mut d, "createVault", create_vault_payload(&owner, "aabbccddeeff0011", false), "1")
            .await,
    );
}

// ---------------------------------------------------------------------------
// Persistence failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn persistence_failure_rolls_back_the_mutation() {
    // Occupy the state-file path with a directory: the save's rename onto
    // it fails after the handler has already applied its mutation.
    let state_file = std::env::temp_dir().join(format!(
        "xvault-scenario-persistfail-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&state_file);
    let _ = std::fs::remove_dir_all(&state_file);
    std::fs::create_dir_all(&state_file).unwrap();

    let mut d = Dispatcher::new(
        VaultStore::new(),
        TokenAdapter::simulated("rXVaultIssuerAccount"),
        DispatcherConfig {
            state_file: state_file.clone(),
            gateway_url: String::new(),
            team_mode: false,
            mutable_uri_tokens: false,
        },
    );
    let owner = TestSigner::new();

    let failed = call(
        &mut d,
        "createVault",
        create_vault_payload(&owner, "aabbccddeeff0011", false),
        "1",
    )
    .await;
    expect_err(failed, ErrorCode::UnexpectedError);

    // The failure envelope is truthful: the vault insert was rolled back,
    // in memory as well as on disk.
    assert!(d.store().is_empty());
    let listing = expect_ok(call(&mut d, "getMyVaults", json!({"owner": owner.address}), "1").await);
    assert_eq!(listing["count"], json!(0));

    // Clear the obstruction and commit a different vault. The file must
    // hold only the second vault — nothing from the failed operation may
    // ride along on a later successful write.
    std::fs::remove_dir_all(&state_file).unwrap();
    let second = expect_ok(
        call(&mut d, "createVault", create_vault_payload(&owner, "aabbccddeeff0022", false), "1")
            .await,
    );
    let second_id = second["vaultId"].as_str().unwrap();
    let first_id = VaultStore::vault_id_for(&owner.address, "aabbccddeeff0011");

    let raw = std::fs::read_to_string(&state_file).unwrap();
    let on_disk: Value = serde_json::from_str(&raw).unwrap();
    let vaults = on_disk["vaults"].as_object().unwrap();
    assert_eq!(vaults.len(), 1);
    assert!(vaults.contains_key(second_id));
    assert!(!vaults.contains_key(first_id.as_str()));

    let _ = std::fs::remove_file(state_file.with_extension("json.tmp"));
    let _ = std::fs::remove_file(&state_file);
}

// ---------------------------------------------------------------------------
// Unknown operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_operation_envelope() {
    let mut d = dispatcher("unknown");
    let response = call(&mut d, "mintMoney", json!({}), "1").await;
    expect_err(response, ErrorCode::UnknownOperation);
}
