/*!
 * Type Definitions for the Policy Market Contract
 *
 * Marketplace-local types: the supported-token registry entry, the aggregated
 * read views served to UIs, the error taxonomy, and event topics. The Policy
 * record itself and the Config singleton live in the policy-storage crate.
 */

use soroban_sdk::{contracterror, contracttype, Symbol};

use policy_storage::Policy;

/// Registry entry for an allow-listed token.
///
/// Captured once when the admin lists the token: probing `decimals()` at that
/// point both validates the token contract and pins the decimal convention
/// used in every later payout computation. The symbol is the price-feed
/// lookup key, which may differ from the token's own code (a wrapped token is
/// quoted under its unwrapped symbol).
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenInfo {
    /// Price-feed lookup key for this token
    pub symbol: Symbol,

    /// Token decimals, read from the token contract at listing time
    pub decimals: u32,
}

/// Aggregated per-policy view for UI consumption.
///
/// Combines the stored record with live oracle data. Nothing here is a
/// commitment: `current_price` is 0 when the oracle is unreachable, and the
/// potential payouts degrade to the no-gain split rather than failing.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PolicyDetails {
    /// The stored policy record
    pub policy: Policy,

    /// Live collateral price (8-decimal fixed point), 0 if oracle unavailable
    pub current_price: i128,

    /// Seconds until expiry; 0 if not Active or already expired
    pub time_remaining: u64,

    /// Seller's collateral share if settlement happened at the current price
    pub potential_seller_payout: i128,

    /// Buyer's collateral share if settlement happened at the current price
    pub potential_buyer_payout: i128,

    /// Whether settle_policy would currently be accepted
    pub can_settle: bool,
}

/// Aggregate protocol statistics.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolStats {
    /// Policies currently listed on the marketplace
    pub open_policies: u32,

    /// Policies ever created (terminal states included)
    pub total_policies: u64,

    /// Oracle liveness passthrough; false when the oracle is unreachable
    pub oracle_healthy: bool,
}

/// Error codes for the market contract.
///
/// Every error aborts the whole operation with zero observable side effects;
/// a failed invocation rolls back all storage writes and events. The codes
/// are distinct so callers can map them to user-facing messages and decide
/// retry policy (PolicyNotExpired and PriceNotAvailable are retry-later,
/// the rest are not).
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Creation and purchase are administratively paused
    ContractPaused = 1,

    /// Caller lacks the required role or relationship (not the seller, the
    /// seller attempting self-purchase, not the admin)
    Unauthorized = 2,

    /// Parameter outside Config bounds, zero amount, or symbol mismatch
    InvalidParameters = 3,

    /// Token is not on the supported collateral / payout allow-list
    UnsupportedToken = 4,

    /// Policy id is 0 or was never assigned
    InvalidPolicyId = 5,

    /// Policy is not in the Open state (already purchased, settled or
    /// cancelled)
    PolicyNotOpen = 6,

    /// Policy is not in the Active state
    PolicyNotActive = 7,

    /// Coverage window has not ended yet; retry after expiry
    PolicyNotExpired = 8,

    /// Oracle could not supply a usable price; transient, retry later
    PriceNotAvailable = 9,

    /// Token transfer failed, or moved a different amount than requested
    TokenTransferFailed = 10,

    /// Fee withdrawal exceeds the tracked collected amount
    InsufficientBalance = 11,

    /// Fixed-point computation exceeded i128 range
    Overflow = 12,
}

// Event topics. Contents are documented at each publish site.
pub const POLICY_CREATED: Symbol = soroban_sdk::symbol_short!("pol_crt");
pub const POLICY_PURCHASED: Symbol = soroban_sdk::symbol_short!("pol_prch");
pub const POLICY_CANCELLED: Symbol = soroban_sdk::symbol_short!("pol_canc");
pub const POLICY_SETTLED: Symbol = soroban_sdk::symbol_short!("pol_setl");
pub const FEES_WITHDRAWN: Symbol = soroban_sdk::symbol_short!("fee_wdrw");
pub const TOKEN_LISTED: Symbol = soroban_sdk::symbol_short!("tok_add");
pub const TOKEN_DELISTED: Symbol = soroban_sdk::symbol_short!("tok_rm");
pub const ADMIN_UPDATED: Symbol = soroban_sdk::symbol_short!("adm_upd");
