#![cfg(test)]

use super::*;
use soroban_sdk::{symbol_short, testutils::Address as _, Address, Env};

fn setup() -> (Env, PolicyStorageClient<'static>, Address) {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register_contract(None, PolicyStorage);
    let client = PolicyStorageClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    client.initialize(&owner);

    (env, client, owner)
}

fn sample_policy(env: &Env, seller: &Address) -> Policy {
    Policy {
        seller: seller.clone(),
        buyer: None,
        collateral_asset: Address::generate(env),
        collateral_symbol: symbol_short!("ETH"),
        collateral_amount: 10_000_000,
        payout_asset: Address::generate(env),
        payout_amount: 28_500_000_000,
        coverage_duration: 30 * 86_400,
        upside_share_bps: 2_500,
        entry_price: 300_000_000_000,
        start_timestamp: 0,
        expiry_timestamp: 0,
        state: PolicyState::Open,
    }
}

#[test]
fn test_initialize_defaults() {
    let (_env, client, owner) = setup();

    assert_eq!(client.get_owner(), owner);
    assert_eq!(client.get_policy_count(), 0);

    let config = client.get_config();
    assert!(config.is_valid());
    assert!(config.min_payout_bps <= config.max_payout_bps);
    assert!(config.platform_fee_bps <= 1_000);
}

#[test]
#[should_panic(expected = "Contract already initialized")]
fn test_initialize_twice() {
    let (_env, client, owner) = setup();
    client.initialize(&owner);
}

#[test]
fn test_add_policy_ids_are_sequential_from_one() {
    let (env, client, _owner) = setup();
    let writer = Address::generate(&env);
    client.set_writer_authorization(&writer, &true);

    let seller = Address::generate(&env);
    let id1 = client.add_policy(&writer, &sample_policy(&env, &seller));
    let id2 = client.add_policy(&writer, &sample_policy(&env, &seller));
    let id3 = client.add_policy(&writer, &sample_policy(&env, &seller));

    assert_eq!(id1, 1);
    assert_eq!(id2, 2);
    assert_eq!(id3, 3);
    assert_eq!(client.get_policy_count(), 3);
}

#[test]
fn test_get_policy_round_trip() {
    let (env, client, owner) = setup();
    let seller = Address::generate(&env);
    let policy = sample_policy(&env, &seller);

    // The owner is always an authorized writer
    let id = client.add_policy(&owner, &policy);
    assert_eq!(client.get_policy(&id), policy);
}

#[test]
fn test_get_policy_rejects_unassigned_ids() {
    let (env, client, owner) = setup();

    assert_eq!(client.try_get_policy(&0), Err(Ok(Error::InvalidPolicyId)));
    assert_eq!(client.try_get_policy(&1), Err(Ok(Error::InvalidPolicyId)));

    let seller = Address::generate(&env);
    client.add_policy(&owner, &sample_policy(&env, &seller));

    assert!(client.try_get_policy(&1).is_ok());
    assert_eq!(client.try_get_policy(&2), Err(Ok(Error::InvalidPolicyId)));
}

#[test]
fn test_set_policy_replaces_record() {
    let (env, client, owner) = setup();
    let seller = Address::generate(&env);
    let id = client.add_policy(&owner, &sample_policy(&env, &seller));

    let mut updated = client.get_policy(&id);
    let buyer = Address::generate(&env);
    updated.buyer = Some(buyer.clone());
    updated.start_timestamp = 1_000;
    updated.expiry_timestamp = 1_000 + updated.coverage_duration;
    updated.state = PolicyState::Active;

    client.set_policy(&owner, &id, &updated);

    let stored = client.get_policy(&id);
    assert_eq!(stored.buyer, Some(buyer));
    assert_eq!(stored.state, PolicyState::Active);
}

#[test]
fn test_set_policy_rejects_unassigned_ids() {
    let (env, client, owner) = setup();
    let seller = Address::generate(&env);
    let policy = sample_policy(&env, &seller);

    assert_eq!(
        client.try_set_policy(&owner, &7, &policy),
        Err(Ok(Error::InvalidPolicyId))
    );
}

#[test]
fn test_write_gate_rejects_unlisted_writers() {
    let (env, client, _owner) = setup();
    let stranger = Address::generate(&env);
    let seller = Address::generate(&env);
    let policy = sample_policy(&env, &seller);

    assert_eq!(
        client.try_add_policy(&stranger, &policy),
        Err(Ok(Error::Unauthorized))
    );
}

#[test]
fn test_writer_authorization_can_be_revoked() {
    let (env, client, _owner) = setup();
    let writer = Address::generate(&env);
    let seller = Address::generate(&env);

    client.set_writer_authorization(&writer, &true);
    assert!(client.is_writer_authorized(&writer));
    let id = client.add_policy(&writer, &sample_policy(&env, &seller));

    client.set_writer_authorization(&writer, &false);
    assert!(!client.is_writer_authorized(&writer));
    assert_eq!(
        client.try_set_policy(&writer, &id, &sample_policy(&env, &seller)),
        Err(Ok(Error::Unauthorized))
    );
}

#[test]
fn test_set_config_replaces_singleton() {
    let (_env, client, _owner) = setup();

    let config = Config {
        min_payout_bps: 5_000,
        max_payout_bps: 9_500,
        min_upside_share_bps: 1_000,
        max_upside_share_bps: 4_000,
        min_duration: 3_600,
        max_duration: 7 * 86_400,
        platform_fee_bps: 150,
    };
    client.set_config(&config);
    assert_eq!(client.get_config(), config);
}

#[test]
fn test_set_config_validates_invariants() {
    let (_env, client, _owner) = setup();
    let base = client.get_config();

    // min > max on payout bps
    let mut bad = base.clone();
    bad.min_payout_bps = 9_000;
    bad.max_payout_bps = 5_000;
    assert_eq!(client.try_set_config(&bad), Err(Ok(Error::InvalidConfig)));

    // payout bps above 100%
    let mut bad = base.clone();
    bad.max_payout_bps = 10_001;
    assert_eq!(client.try_set_config(&bad), Err(Ok(Error::InvalidConfig)));

    // min > max on upside share
    let mut bad = base.clone();
    bad.min_upside_share_bps = 6_000;
    bad.max_upside_share_bps = 5_000;
    assert_eq!(client.try_set_config(&bad), Err(Ok(Error::InvalidConfig)));

    // upside share above 100%
    let mut bad = base.clone();
    bad.max_upside_share_bps = 10_500;
    assert_eq!(client.try_set_config(&bad), Err(Ok(Error::InvalidConfig)));

    // min > max on duration
    let mut bad = base.clone();
    bad.min_duration = 100;
    bad.max_duration = 10;
    assert_eq!(client.try_set_config(&bad), Err(Ok(Error::InvalidConfig)));

    // platform fee above the 10% cap
    let mut bad = base.clone();
    bad.platform_fee_bps = 1_001;
    assert_eq!(client.try_set_config(&bad), Err(Ok(Error::InvalidConfig)));

    // the stored config is untouched after all the rejections
    assert_eq!(client.get_config(), base);
}

#[test]
fn test_config_boundary_values_accepted() {
    let (_env, client, _owner) = setup();

    let config = Config {
        min_payout_bps: 10_000,
        max_payout_bps: 10_000,
        min_upside_share_bps: 10_000,
        max_upside_share_bps: 10_000,
        min_duration: 0,
        max_duration: 0,
        platform_fee_bps: 1_000,
    };
    assert!(client.try_set_config(&config).is_ok());
}
