//! End-to-end reconciliation tests: events are routed through the real
//! `ReconcilerService` (guards included) against the in-memory store and
//! a scripted token reader.

mod support;

use custodia_core::models::{FungibleBalance, NonFungibleCustody, SemiFungibleBalance, U256};
use custodia_core::ports::{
    CustodyStore, FungibleBalanceStore, FungibleTokenStore, NonFungibleTokenStore,
    SemiFungibleBalanceStore, VaultStore,
};

use support::{
    Harness, NULL_ADDRESS, StubReader, addr, collection_created, fungible, nft, sf_batch,
    sf_single,
};

// Fixture addresses: one vault-bearing collection whose token 7 maps to
// vault V1 and token 8 to vault V2.
const COLLECTION: u8 = 0xc1;
const VAULT_1: u8 = 0xa1;
const VAULT_2: u8 = 0xa2;
const MINTER: u8 = 0x11;
const TOKEN: u8 = 0x22;
const MULTI_TOKEN: u8 = 0x33;
const FOREIGN_COLLECTION: u8 = 0xd1;

fn reader_with_vaults() -> StubReader {
    StubReader::new()
        .with_vault_address(addr(COLLECTION), 7, addr(VAULT_1))
        .with_vault_address(addr(COLLECTION), 8, addr(VAULT_2))
}

/// Register the collection and mint token 7, provisioning vault V1.
async fn provision_vault_1(h: &Harness) {
    h.process(collection_created(addr(COLLECTION), 0)).await;
    h.process(nft(addr(COLLECTION), NULL_ADDRESS, addr(MINTER), 7, 1))
        .await;
}

/// Additionally mint token 8, provisioning vault V2.
async fn provision_vault_2(h: &Harness) {
    h.process(nft(addr(COLLECTION), NULL_ADDRESS, addr(MINTER), 8, 2))
        .await;
}

// =============================================================================
// Provisioning
// =============================================================================

#[tokio::test]
async fn provisioning_creates_exactly_one_vault() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    let vault = h.store.get_vault(&addr(VAULT_1)).await.unwrap().unwrap();
    assert_eq!(vault.owner_token_id, U256::from(7u64));
    assert_eq!(vault.originating_collection, addr(COLLECTION));
    assert_eq!(h.store.vault_count(), 1);
}

#[tokio::test]
async fn provisioning_replay_is_idempotent() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;
    // Rejouer la même paire d'événements ne doit rien créer de plus
    provision_vault_1(&h).await;

    assert_eq!(h.store.vault_count(), 1);
    let vault = h.store.get_vault(&addr(VAULT_1)).await.unwrap().unwrap();
    assert_eq!(vault.owner_token_id, U256::from(7u64));
}

#[tokio::test]
async fn provisioning_revert_abandons_but_event_is_processed() {
    // Token 9 has no scripted vault address: the computation reverts.
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    // Mint token 9 straight into the existing vault V1.
    h.process(nft(addr(COLLECTION), NULL_ADDRESS, addr(VAULT_1), 9, 3))
        .await;

    // No second vault, but the custody side of the same event ran.
    assert_eq!(h.store.vault_count(), 1);
    let key = NonFungibleCustody::key(&addr(COLLECTION), &U256::from(9u64));
    let custody = h.store.get_custody(&key).await.unwrap().unwrap();
    assert_eq!(custody.holder, addr(VAULT_1));
}

#[tokio::test]
async fn plain_collection_never_provisions() {
    // The collection is first seen through an ordinary transfer, so its
    // descriptor is created without the vault flag - and the flag never
    // flips.
    let h = Harness::new(reader_with_vaults());
    h.process(nft(addr(COLLECTION), addr(0x41), addr(0x42), 7, 0))
        .await;
    h.process(nft(addr(COLLECTION), NULL_ADDRESS, addr(MINTER), 7, 1))
        .await;

    assert_eq!(h.store.vault_count(), 0);

    // A late ControlledCollectionCreated does not flip the flag either.
    h.process(collection_created(addr(COLLECTION), 2)).await;
    let descriptor = h
        .store
        .get_non_fungible_token(&addr(COLLECTION))
        .await
        .unwrap()
        .unwrap();
    assert!(!descriptor.is_vault);
}

// =============================================================================
// Fungible balances
// =============================================================================

#[tokio::test]
async fn fungible_conservation() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 100, 10))
        .await;
    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 50, 11))
        .await;
    h.process(fungible(addr(TOKEN), addr(VAULT_1), addr(MINTER), 30, 12))
        .await;

    let key = FungibleBalance::key(&addr(VAULT_1), &addr(TOKEN));
    let balance = h.store.get_fungible_balance(&key).await.unwrap().unwrap();
    // 100 + 50 - 30
    assert_eq!(balance.balance, U256::from(120u64));
}

#[tokio::test]
async fn fungible_zero_pruning() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 70, 10))
        .await;
    h.process(fungible(addr(TOKEN), addr(VAULT_1), addr(MINTER), 70, 11))
        .await;

    // Le solde à zéro est supprimé, pas stocké
    let key = FungibleBalance::key(&addr(VAULT_1), &addr(TOKEN));
    assert!(h.store.get_fungible_balance(&key).await.unwrap().is_none());
    assert_eq!(h.store.fungible_balance_count(), 0);
}

#[tokio::test]
async fn fungible_outflow_without_balance_is_skipped() {
    // Processing starts mid-stream: the decrement arrives before any
    // recorded inflow. The engine logs the anomaly and keeps going.
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    h.process(fungible(addr(TOKEN), addr(VAULT_1), addr(MINTER), 10, 10))
        .await;

    let key = FungibleBalance::key(&addr(VAULT_1), &addr(TOKEN));
    assert!(h.store.get_fungible_balance(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn fungible_underflow_leaves_balance_unchanged() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 20, 10))
        .await;
    h.process(fungible(addr(TOKEN), addr(VAULT_1), addr(MINTER), 999, 11))
        .await;

    // Jamais de solde négatif: l'état antérieur est conservé
    let key = FungibleBalance::key(&addr(VAULT_1), &addr(TOKEN));
    let balance = h.store.get_fungible_balance(&key).await.unwrap().unwrap();
    assert_eq!(balance.balance, U256::from(20u64));
}

#[tokio::test]
async fn fungible_vault_to_vault_nets_out() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;
    provision_vault_2(&h).await;

    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 100, 10))
        .await;
    h.process(fungible(addr(TOKEN), addr(VAULT_1), addr(VAULT_2), 40, 11))
        .await;

    let key_1 = FungibleBalance::key(&addr(VAULT_1), &addr(TOKEN));
    let key_2 = FungibleBalance::key(&addr(VAULT_2), &addr(TOKEN));
    let balance_1 = h.store.get_fungible_balance(&key_1).await.unwrap().unwrap();
    let balance_2 = h.store.get_fungible_balance(&key_2).await.unwrap().unwrap();
    assert_eq!(balance_1.balance, U256::from(60u64));
    assert_eq!(balance_2.balance, U256::from(40u64));
}

#[tokio::test]
async fn fungible_mint_from_null_address_is_plain_inflow() {
    // The null address never resolves to a vault, so a mint needs no
    // special casing: no outflow anomaly, just the inflow.
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    h.process(fungible(addr(TOKEN), NULL_ADDRESS, addr(VAULT_1), 55, 10))
        .await;

    let key = FungibleBalance::key(&addr(VAULT_1), &addr(TOKEN));
    let balance = h.store.get_fungible_balance(&key).await.unwrap().unwrap();
    assert_eq!(balance.balance, U256::from(55u64));
}

// =============================================================================
// Guards
// =============================================================================

#[tokio::test]
async fn self_transfer_is_a_noop() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;
    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 100, 10))
        .await;

    h.process(fungible(addr(TOKEN), addr(VAULT_1), addr(VAULT_1), 100, 11))
        .await;

    let key = FungibleBalance::key(&addr(VAULT_1), &addr(TOKEN));
    let balance = h.store.get_fungible_balance(&key).await.unwrap().unwrap();
    assert_eq!(balance.balance, U256::from(100u64));
    assert_eq!(h.store.fungible_balance_count(), 1);
}

#[tokio::test]
async fn self_transfer_keeps_custody_untouched() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;
    h.process(nft(addr(FOREIGN_COLLECTION), addr(MINTER), addr(VAULT_1), 42, 10))
        .await;

    h.process(nft(addr(FOREIGN_COLLECTION), addr(VAULT_1), addr(VAULT_1), 42, 11))
        .await;

    let key = NonFungibleCustody::key(&addr(FOREIGN_COLLECTION), &U256::from(42u64));
    let custody = h.store.get_custody(&key).await.unwrap().unwrap();
    assert_eq!(custody.holder, addr(VAULT_1));
}

#[tokio::test]
async fn zero_value_transfer_is_a_noop() {
    let h = Harness::new(reader_with_vaults().with_name(addr(TOKEN), "Test Token"));
    provision_vault_1(&h).await;

    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 0, 10))
        .await;

    // Aucune mutation, pas même la création du descripteur
    assert!(
        h.store
            .get_fungible_token(&addr(TOKEN))
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(h.store.fungible_balance_count(), 0);
}

// =============================================================================
// Semi-fungible balances
// =============================================================================

#[tokio::test]
async fn batch_equals_sequential_singles() {
    let h_batch = Harness::new(reader_with_vaults());
    provision_vault_1(&h_batch).await;
    h_batch
        .process(sf_batch(
            addr(MULTI_TOKEN),
            addr(MINTER),
            addr(VAULT_1),
            &[5, 9],
            &[3, 4],
            10,
        ))
        .await;

    let h_single = Harness::new(reader_with_vaults());
    provision_vault_1(&h_single).await;
    h_single
        .process(sf_single(addr(MULTI_TOKEN), addr(MINTER), addr(VAULT_1), 5, 3, 10))
        .await;
    h_single
        .process(sf_single(addr(MULTI_TOKEN), addr(MINTER), addr(VAULT_1), 9, 4, 11))
        .await;

    for id in [5u64, 9] {
        let key = SemiFungibleBalance::key(&addr(MULTI_TOKEN), &U256::from(id), &addr(VAULT_1));
        let from_batch = h_batch
            .store
            .get_semi_fungible_balance(&key)
            .await
            .unwrap()
            .unwrap();
        let from_singles = h_single
            .store
            .get_semi_fungible_balance(&key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from_batch, from_singles);
    }
}

#[tokio::test]
async fn batch_skips_zero_value_pairs() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    h.process(sf_batch(
        addr(MULTI_TOKEN),
        addr(MINTER),
        addr(VAULT_1),
        &[5, 9],
        &[0, 4],
        10,
    ))
    .await;

    let key_5 = SemiFungibleBalance::key(&addr(MULTI_TOKEN), &U256::from(5u64), &addr(VAULT_1));
    let key_9 = SemiFungibleBalance::key(&addr(MULTI_TOKEN), &U256::from(9u64), &addr(VAULT_1));
    assert!(
        h.store
            .get_semi_fungible_balance(&key_5)
            .await
            .unwrap()
            .is_none()
    );
    let balance = h
        .store
        .get_semi_fungible_balance(&key_9)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.balance, U256::from(4u64));
}

#[tokio::test]
async fn batch_arity_mismatch_is_skipped_whole() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    h.process(sf_batch(
        addr(MULTI_TOKEN),
        addr(MINTER),
        addr(VAULT_1),
        &[5, 9],
        &[3],
        10,
    ))
    .await;

    // Pas de traitement partiel des paires
    let key = SemiFungibleBalance::key(&addr(MULTI_TOKEN), &U256::from(5u64), &addr(VAULT_1));
    assert!(
        h.store
            .get_semi_fungible_balance(&key)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn semi_fungible_zero_pruning() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    h.process(sf_single(addr(MULTI_TOKEN), addr(MINTER), addr(VAULT_1), 5, 8, 10))
        .await;
    h.process(sf_single(addr(MULTI_TOKEN), addr(VAULT_1), addr(MINTER), 5, 8, 11))
        .await;

    let key = SemiFungibleBalance::key(&addr(MULTI_TOKEN), &U256::from(5u64), &addr(VAULT_1));
    assert!(
        h.store
            .get_semi_fungible_balance(&key)
            .await
            .unwrap()
            .is_none()
    );
}

// =============================================================================
// Custody
// =============================================================================

#[tokio::test]
async fn custody_tracks_entry_and_exit() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    h.process(nft(addr(FOREIGN_COLLECTION), addr(MINTER), addr(VAULT_1), 42, 10))
        .await;
    let key = NonFungibleCustody::key(&addr(FOREIGN_COLLECTION), &U256::from(42u64));
    assert!(h.store.get_custody(&key).await.unwrap().is_some());

    h.process(nft(addr(FOREIGN_COLLECTION), addr(VAULT_1), addr(MINTER), 42, 11))
        .await;
    // Supprimé dès que le token quitte le coffre, pas recréé pour un
    // destinataire inconnu
    assert!(h.store.get_custody(&key).await.unwrap().is_none());
    assert_eq!(h.store.custody_count(), 0);
}

#[tokio::test]
async fn custody_hand_off_between_vaults() {
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;
    provision_vault_2(&h).await;

    h.process(nft(addr(FOREIGN_COLLECTION), addr(MINTER), addr(VAULT_1), 42, 10))
        .await;
    h.process(nft(addr(FOREIGN_COLLECTION), addr(VAULT_1), addr(VAULT_2), 42, 11))
        .await;

    let key = NonFungibleCustody::key(&addr(FOREIGN_COLLECTION), &U256::from(42u64));
    let custody = h.store.get_custody(&key).await.unwrap().unwrap();
    assert_eq!(custody.holder, addr(VAULT_2));
    // Aucun enregistrement périmé attribué à l'ancien coffre
    assert_eq!(h.store.custody_count(), 1);
    assert!(
        h.store
            .list_custody_for_vault(&addr(VAULT_1))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn custody_reentry_at_same_vault_is_stable() {
    // Token already parked at V1 transferred X -> V1 again (replayed
    // inflow): load-or-create then set holder ends in the same record.
    let h = Harness::new(reader_with_vaults());
    provision_vault_1(&h).await;

    h.process(nft(addr(FOREIGN_COLLECTION), addr(MINTER), addr(VAULT_1), 42, 10))
        .await;
    h.process(nft(addr(FOREIGN_COLLECTION), addr(MINTER), addr(VAULT_1), 42, 11))
        .await;

    let key = NonFungibleCustody::key(&addr(FOREIGN_COLLECTION), &U256::from(42u64));
    let custody = h.store.get_custody(&key).await.unwrap().unwrap();
    assert_eq!(custody.holder, addr(VAULT_1));
    assert_eq!(h.store.custody_count(), 1);
}

// =============================================================================
// Descriptor resolution
// =============================================================================

#[tokio::test]
async fn resolver_populates_scripted_metadata() {
    let reader = reader_with_vaults()
        .with_name(addr(TOKEN), "Dai Stablecoin")
        .with_symbol(addr(TOKEN), "DAI")
        .with_decimals(addr(TOKEN), 18);
    let h = Harness::new(reader);
    provision_vault_1(&h).await;

    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 10, 10))
        .await;

    let token = h
        .store
        .get_fungible_token(&addr(TOKEN))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(token.name.as_deref(), Some("Dai Stablecoin"));
    assert_eq!(token.symbol.as_deref(), Some("DAI"));
    assert_eq!(token.decimals, Some(18));
}

#[tokio::test]
async fn resolver_tolerates_partial_reverts() {
    // Only the symbol is scripted: name and decimals revert, and must
    // not block population of the symbol.
    let reader = reader_with_vaults().with_symbol(addr(TOKEN), "MKR");
    let h = Harness::new(reader);
    provision_vault_1(&h).await;

    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 10, 10))
        .await;

    let token = h
        .store
        .get_fungible_token(&addr(TOKEN))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(token.name, None);
    assert_eq!(token.symbol.as_deref(), Some("MKR"));
    assert_eq!(token.decimals, None);
}

#[tokio::test]
async fn resolver_is_idempotent() {
    let reader = reader_with_vaults().with_name(addr(TOKEN), "Token A");
    let h = Harness::new(reader);
    provision_vault_1(&h).await;

    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 10, 10))
        .await;
    let first = h
        .store
        .get_fungible_token(&addr(TOKEN))
        .await
        .unwrap()
        .unwrap();

    h.process(fungible(addr(TOKEN), addr(MINTER), addr(VAULT_1), 5, 11))
        .await;
    let second = h
        .store
        .get_fungible_token(&addr(TOKEN))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn collection_descriptor_reads_base_uri() {
    let reader = reader_with_vaults()
        .with_name(addr(COLLECTION), "Vault Deeds")
        .with_base_uri(addr(COLLECTION), "ipfs://deeds/");
    let h = Harness::new(reader);
    h.process(collection_created(addr(COLLECTION), 0)).await;

    let descriptor = h
        .store
        .get_non_fungible_token(&addr(COLLECTION))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(descriptor.name.as_deref(), Some("Vault Deeds"));
    assert_eq!(descriptor.base_uri.as_deref(), Some("ipfs://deeds/"));
    assert!(descriptor.is_vault);
}
