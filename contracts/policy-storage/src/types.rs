/*!
 * Type Definitions for the Policy Storage Contract
 *
 * This module defines the central Policy record, its lifecycle states, the
 * global Config singleton, and the storage contract's error codes. These types
 * are shared with the market contract, which depends on this crate as a library.
 */

use soroban_sdk::{contracterror, contracttype, Address, Symbol};

/// Lifecycle state of a policy.
///
/// State transitions are strictly forward:
/// - Open → Active (purchase)
/// - Open → Cancelled (seller cancellation)
/// - Active → Settled (expiry settlement)
///
/// Settled and Cancelled are terminal. There is no path out of Active except
/// settlement, and no path back to Open from anywhere.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PolicyState {
    /// Listed on the marketplace, collateral in custody, no buyer yet
    Open,

    /// Purchased; coverage window running until expiry_timestamp
    Active,

    /// Settled at expiry; collateral split between seller and buyer
    Settled,

    /// Cancelled by the seller before purchase; collateral returned
    Cancelled,
}

/// One structured deal between exactly one seller and (once purchased) one buyer.
///
/// The seller locks `collateral_amount` of `collateral_asset` and receives an
/// immediate discounted payout in `payout_asset` at purchase time. At expiry the
/// buyer receives the bulk of the collateral; the seller keeps a bounded share
/// of any price appreciation over `entry_price`.
///
/// # Immutability
/// Every field except `buyer`, `start_timestamp`, `expiry_timestamp` and
/// `state` is fixed at creation. `payout_amount` and `entry_price` are never
/// recomputed, even if the market price moves while the policy sits unpurchased.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Policy {
    /// Identity that created the policy and supplied the collateral
    pub seller: Address,

    /// Identity that purchased the policy; None until purchase
    pub buyer: Option<Address>,

    /// Token contract address of the locked asset
    pub collateral_asset: Address,

    /// Price-feed lookup key for the collateral. Kept separate from the asset
    /// address because the feed may quote a wrapped token under its unwrapped
    /// symbol.
    pub collateral_symbol: Symbol,

    /// Quantity of collateral locked at creation; always > 0
    pub collateral_amount: i128,

    /// Token contract address of the stablecoin used for the upfront payout
    pub payout_asset: Address,

    /// Upfront payout in payout-asset units, computed once at creation
    pub payout_amount: i128,

    /// Length of the coverage window in seconds
    pub coverage_duration: u64,

    /// Seller's share of price appreciation, in basis points (0-10000)
    pub upside_share_bps: u32,

    /// Collateral price at creation, 8-decimal fixed point (price / 1e8 = USD).
    /// Baseline for the upside calculation at settlement.
    pub entry_price: i128,

    /// Moment the coverage window began (purchase time); 0 while Open
    pub start_timestamp: u64,

    /// start_timestamp + coverage_duration; 0 while Open
    pub expiry_timestamp: u64,

    /// Current lifecycle state
    pub state: PolicyState,
}

/// Global bounds applied to every policy at creation time.
///
/// A policy validated against one Config keeps its terms forever; later Config
/// changes never retroactively affect existing records.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Lower bound on the upfront payout rate, in basis points
    pub min_payout_bps: u32,

    /// Upper bound on the upfront payout rate, in basis points (<= 10000)
    pub max_payout_bps: u32,

    /// Lower bound on the seller's upside share, in basis points
    pub min_upside_share_bps: u32,

    /// Upper bound on the seller's upside share, in basis points (<= 10000)
    pub max_upside_share_bps: u32,

    /// Shortest allowed coverage window, in seconds
    pub min_duration: u64,

    /// Longest allowed coverage window, in seconds
    pub max_duration: u64,

    /// Platform fee taken out of the buyer's upfront payment, in basis
    /// points (<= 1000, i.e. capped at 10%)
    pub platform_fee_bps: u32,
}

impl Config {
    /// Checks the cross-field invariants enforced on every Config update.
    pub fn is_valid(&self) -> bool {
        self.max_payout_bps <= 10_000
            && self.min_payout_bps <= self.max_payout_bps
            && self.max_upside_share_bps <= 10_000
            && self.min_upside_share_bps <= self.max_upside_share_bps
            && self.min_duration <= self.max_duration
            && self.platform_fee_bps <= 1_000
    }
}

/// Error codes for the storage contract.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Policy id is 0 or was never assigned by this store
    InvalidPolicyId = 1,

    /// Caller is neither the store owner nor an allow-listed writer
    Unauthorized = 2,

    /// Config update violates the documented bounds invariants
    InvalidConfig = 3,
}

// Event topics. Contents are documented at each publish site.
pub const POLICY_ADDED: Symbol = soroban_sdk::symbol_short!("pol_add");
pub const POLICY_REPLACED: Symbol = soroban_sdk::symbol_short!("pol_set");
pub const CONFIG_UPDATED: Symbol = soroban_sdk::symbol_short!("cfg_upd");
pub const WRITER_AUTH_SET: Symbol = soroban_sdk::symbol_short!("wrt_auth");
