//! GraphQL schema definition.
//!
//! Read-only queries over the custody entity store: vaults, balances,
//! custody records and token descriptors.

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Result, Schema};

use custodia_core::models::{
    self, FungibleBalance as FungibleBalanceModel, NonFungibleCustody as CustodyModel,
    SemiFungibleBalance as SemiFungibleBalanceModel, U256, u256_hex,
};
use custodia_core::ports::{
    CustodyStore, EntityStore, FungibleBalanceStore, FungibleTokenStore, NonFungibleTokenStore,
    SemiFungibleBalanceStore, VaultStore,
};

use crate::types::CustodiaSchema;

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth to prevent deeply nested queries (DoS protection).
/// Note: GraphQL introspection requires depth ~13, so we use 15 to allow it.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score (DoS protection).
/// Each field has a default complexity of 1, nested objects multiply.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

/// Build the custody schema over an entity store.
///
/// Includes query depth and complexity limits for DoS protection.
pub fn build_schema(store: Arc<dyn EntityStore>) -> CustodiaSchema {
    Schema::build(CustodyQuery, EmptyMutation, EmptySubscription)
        .data(store)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

// -----------------------------------------------------------------------------
// Custody Query
// -----------------------------------------------------------------------------

/// Query root for the custody ledger.
#[derive(Default)]
pub struct CustodyQuery;

#[Object]
impl CustodyQuery {
    /// Get a vault by its computed address.
    async fn vault<'ctx>(&self, ctx: &Context<'ctx>, address: String) -> Result<Option<Vault>> {
        let store = ctx.data::<Arc<dyn EntityStore>>()?;
        let address = parse_address(&address)?;

        let vault = store.vaults().get_vault(&address).await?;
        Ok(vault.map(Vault::from))
    }

    /// List vaults, ordered by address.
    async fn vaults<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        #[graphql(default = 20)] first: Option<i32>,
    ) -> Result<Vec<Vault>> {
        let store = ctx.data::<Arc<dyn EntityStore>>()?;

        let limit = validate_pagination_first(first);
        let vaults = store.vaults().list_vaults(i64::from(limit)).await?;
        Ok(vaults.into_iter().map(Vault::from).collect())
    }

    /// List fungible balances held by a vault.
    async fn fungible_balances<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        vault: String,
    ) -> Result<Vec<FungibleBalance>> {
        let store = ctx.data::<Arc<dyn EntityStore>>()?;
        let vault = parse_address(&vault)?;

        let balances = store
            .fungible_balances()
            .list_fungible_balances_for_vault(&vault)
            .await?;
        Ok(balances.into_iter().map(FungibleBalance::from).collect())
    }

    /// List semi-fungible balances held by a vault.
    async fn semi_fungible_balances<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        vault: String,
    ) -> Result<Vec<SemiFungibleBalance>> {
        let store = ctx.data::<Arc<dyn EntityStore>>()?;
        let vault = parse_address(&vault)?;

        let balances = store
            .semi_fungible_balances()
            .list_semi_fungible_balances_for_vault(&vault)
            .await?;
        Ok(balances
            .into_iter()
            .map(SemiFungibleBalance::from)
            .collect())
    }

    /// List non-fungible tokens currently held by a vault.
    async fn custody_for_vault<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        vault: String,
    ) -> Result<Vec<NonFungibleCustody>> {
        let store = ctx.data::<Arc<dyn EntityStore>>()?;
        let vault = parse_address(&vault)?;

        let records = store.custody().list_custody_for_vault(&vault).await?;
        Ok(records.into_iter().map(NonFungibleCustody::from).collect())
    }

    /// Get the current custody record for one non-fungible token.
    async fn custody<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        collection: String,
        token_id: String,
    ) -> Result<Option<NonFungibleCustody>> {
        let store = ctx.data::<Arc<dyn EntityStore>>()?;
        let collection = parse_address(&collection)?;
        let token_id = parse_u256(&token_id)?;

        let key = CustodyModel::key(&collection, &token_id);
        let record = store.custody().get_custody(&key).await?;
        Ok(record.map(NonFungibleCustody::from))
    }

    /// Get a fungible token descriptor.
    async fn fungible_token<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        address: String,
    ) -> Result<Option<FungibleToken>> {
        let store = ctx.data::<Arc<dyn EntityStore>>()?;
        let address = parse_address(&address)?;

        let token = store.fungible_tokens().get_fungible_token(&address).await?;
        Ok(token.map(FungibleToken::from))
    }

    /// Get a non-fungible collection descriptor.
    async fn non_fungible_token<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        address: String,
    ) -> Result<Option<NonFungibleToken>> {
        let store = ctx.data::<Arc<dyn EntityStore>>()?;
        let address = parse_address(&address)?;

        let token = store
            .non_fungible_tokens()
            .get_non_fungible_token(&address)
            .await?;
        Ok(token.map(NonFungibleToken::from))
    }
}

// -----------------------------------------------------------------------------
// GraphQL Types
// -----------------------------------------------------------------------------

/// Vault record.
#[derive(async_graphql::SimpleObject)]
pub struct Vault {
    pub address: String,
    pub owner_token_id: String,
    pub originating_collection: String,
}

impl From<models::Vault> for Vault {
    fn from(v: models::Vault) -> Self {
        Self {
            address: v.id.to_hex(),
            owner_token_id: u256_hex(&v.owner_token_id),
            originating_collection: v.originating_collection.to_hex(),
        }
    }
}

/// Fungible balance held by a vault.
#[derive(async_graphql::SimpleObject)]
pub struct FungibleBalance {
    pub id: String,
    pub vault: String,
    pub token: String,
    /// Decimal string; amounts can exceed every integer scalar.
    pub balance: String,
}

impl From<FungibleBalanceModel> for FungibleBalance {
    fn from(b: FungibleBalanceModel) -> Self {
        Self {
            id: b.id,
            vault: b.vault.to_hex(),
            token: b.token.to_hex(),
            balance: b.balance.to_string(),
        }
    }
}

/// Semi-fungible balance held by a vault.
#[derive(async_graphql::SimpleObject)]
pub struct SemiFungibleBalance {
    pub id: String,
    pub token: String,
    pub token_id: String,
    pub vault: String,
    /// Decimal string; amounts can exceed every integer scalar.
    pub balance: String,
}

impl From<SemiFungibleBalanceModel> for SemiFungibleBalance {
    fn from(b: SemiFungibleBalanceModel) -> Self {
        Self {
            id: b.id,
            token: b.token.to_hex(),
            token_id: u256_hex(&b.token_id),
            vault: b.vault.to_hex(),
            balance: b.balance.to_string(),
        }
    }
}

/// Custody record for one non-fungible token.
#[derive(async_graphql::SimpleObject)]
pub struct NonFungibleCustody {
    pub id: String,
    pub collection: String,
    pub token_id: String,
    pub holder: String,
}

impl From<CustodyModel> for NonFungibleCustody {
    fn from(c: CustodyModel) -> Self {
        Self {
            id: c.id,
            collection: c.collection.to_hex(),
            token_id: u256_hex(&c.token_id),
            holder: c.holder.to_hex(),
        }
    }
}

/// Fungible token descriptor.
#[derive(async_graphql::SimpleObject)]
pub struct FungibleToken {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<i32>,
}

impl From<models::FungibleToken> for FungibleToken {
    fn from(t: models::FungibleToken) -> Self {
        Self {
            address: t.id.to_hex(),
            name: t.name,
            symbol: t.symbol,
            decimals: t.decimals.map(|d| d as i32),
        }
    }
}

/// Non-fungible collection descriptor.
#[derive(async_graphql::SimpleObject)]
pub struct NonFungibleToken {
    pub address: String,
    pub name: Option<String>,
    pub base_uri: Option<String>,
    pub is_vault: bool,
}

impl From<models::NonFungibleToken> for NonFungibleToken {
    fn from(t: models::NonFungibleToken) -> Self {
        Self {
            address: t.id.to_hex(),
            name: t.name,
            base_uri: t.base_uri,
            is_vault: t.is_vault,
        }
    }
}

// -----------------------------------------------------------------------------
// Helpers & Validation
// -----------------------------------------------------------------------------

/// Maximum length for address strings (40 hex chars + "0x" prefix).
const MAX_ADDRESS_LENGTH: usize = 42;
/// Maximum length for token id strings.
const MAX_TOKEN_ID_LENGTH: usize = 80;
/// Maximum page size for pagination.
const MAX_PAGE_SIZE: i32 = 100;
/// Default page size for pagination.
const DEFAULT_PAGE_SIZE: i32 = 20;

/// Parse and validate an address string.
fn parse_address(s: &str) -> Result<models::Address> {
    if s.len() > MAX_ADDRESS_LENGTH {
        return Err(async_graphql::Error::new(format!(
            "Address too long: maximum {} characters allowed",
            MAX_ADDRESS_LENGTH
        )));
    }

    let stripped = s.strip_prefix("0x").unwrap_or(s);
    if !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(async_graphql::Error::new(
            "Invalid address: must contain only hexadecimal characters",
        ));
    }

    models::Address::from_hex(s).map_err(|_| {
        async_graphql::Error::new("Address must be exactly 20 bytes (40 hex characters)")
    })
}

/// Parse a token id given as a decimal or 0x-hex string.
fn parse_u256(s: &str) -> Result<U256> {
    if s.len() > MAX_TOKEN_ID_LENGTH {
        return Err(async_graphql::Error::new(format!(
            "Token id too long: maximum {} characters allowed",
            MAX_TOKEN_ID_LENGTH
        )));
    }

    let parsed = match s.strip_prefix("0x") {
        Some(hex_digits) => U256::from_str_radix(hex_digits, 16).ok(),
        None => U256::from_dec_str(s).ok(),
    };
    parsed.ok_or_else(|| async_graphql::Error::new(format!("Invalid token id: {s}")))
}

/// Validate and normalize pagination first parameter.
fn validate_pagination_first(first: Option<i32>) -> i32 {
    first.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests de validation critiques - protègent contre les injections/DoS

    #[test]
    fn test_parse_address_rejects_invalid_input() {
        // Trop long (DoS prevention)
        assert!(parse_address(&"ab".repeat(100)).is_err());
        // Caractères non-hex (injection prevention)
        assert!(parse_address("0x<script>alert(1)</script>").is_err());
        // Mauvaise longueur
        assert!(parse_address(&"ab".repeat(8)).is_err());
    }

    #[test]
    fn test_parse_address_accepts_both_formats() {
        let with_prefix = parse_address(&("0x".to_string() + &"ab".repeat(20)));
        let without_prefix = parse_address(&"ab".repeat(20));
        assert!(with_prefix.is_ok());
        assert!(without_prefix.is_ok());
        assert_eq!(with_prefix.unwrap(), without_prefix.unwrap());
    }

    #[test]
    fn test_parse_token_id_both_radixes() {
        assert_eq!(parse_u256("255").unwrap(), U256::from(255u64));
        assert_eq!(parse_u256("0xff").unwrap(), U256::from(255u64));
        assert!(parse_u256("not a number").is_err());
        assert!(parse_u256(&"9".repeat(100)).is_err());
    }

    #[test]
    fn test_pagination_clamping() {
        // Valeurs négatives/zéro clampées à 1
        assert_eq!(validate_pagination_first(Some(-100)), 1);
        assert_eq!(validate_pagination_first(Some(0)), 1);
        // Valeurs trop grandes clampées à MAX
        assert_eq!(validate_pagination_first(Some(10000)), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_balance_rendered_as_decimal_string() {
        let balance = FungibleBalanceModel::new(
            models::Address([1u8; 20]),
            models::Address([2u8; 20]),
            U256::from(u128::MAX),
        );
        let rendered = FungibleBalance::from(balance);
        assert_eq!(rendered.balance, u128::MAX.to_string());
    }
}
