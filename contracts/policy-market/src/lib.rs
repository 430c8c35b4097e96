/*!
 * Policy Market Smart Contract
 *
 * Marketplace and settlement engine for covered-upside policies. A seller
 * locks a volatile asset in exchange for an immediate, discounted stablecoin
 * payout and a bounded share of any price appreciation over a fixed coverage
 * window. A buyer pays the discounted amount up front and at expiry receives
 * the bulk of the locked collateral.
 *
 * Lifecycle (states live in the policy-storage contract):
 * 1. Seller creates a policy: collateral moves into custody, the entry price
 *    is pinned from the oracle, the upfront payout is computed once
 * 2. Buyer purchases: pays the seller the discounted amount (minus platform
 *    fee), the coverage window starts
 * 3. At expiry anyone may settle: the oracle exit price splits the collateral
 *    between buyer (principal minus seller upside) and seller (bounded share
 *    of the gain only)
 * 4. An unsold policy can be cancelled by its seller for a full refund
 *
 * Failure semantics: every entry point aborts with zero observable side
 * effects — a returned error rolls back all storage writes, events and token
 * movements of the invocation. The Soroban host additionally forbids
 * contract reentrancy, so no explicit guard is carried.
 */

#![no_std]

mod oracle;
mod settlement;
mod types;


use soroban_sdk::{
    contract, contractimpl, log, symbol_short, token, Address, Env, Map, Symbol, Vec,
};

use oracle::PriceOracleClient;
use policy_storage::{Policy, PolicyState, PolicyStorageClient};
use types::{
    Error, PolicyDetails, ProtocolStats, TokenInfo, ADMIN_UPDATED, FEES_WITHDRAWN,
    POLICY_CANCELLED, POLICY_CREATED, POLICY_PURCHASED, POLICY_SETTLED, TOKEN_DELISTED,
    TOKEN_LISTED,
};

pub use types::Error as MarketError;

#[contract]
pub struct PolicyMarket;

// Storage keys. Deployment wiring (admin, collaborator addresses) is kept in
// persistent storage; marketplace runtime data lives in instance storage.
const ADMIN_KEY: Symbol = symbol_short!("ADMIN");
const STORAGE_KEY: Symbol = symbol_short!("STORE_CT");
const ORACLE_KEY: Symbol = symbol_short!("ORACLE_CT");
const FEE_RECIPIENT_KEY: Symbol = symbol_short!("FEE_RCPT");
const PAUSED_KEY: Symbol = symbol_short!("PAUSED");
const OPEN_IDS_KEY: Symbol = symbol_short!("OPEN_IDS");     // Vec<u64> of Open policy ids
const OPEN_POS_KEY: Symbol = symbol_short!("OPEN_POS");     // id -> position in OPEN_IDS
const USER_POLICIES_KEY: Symbol = symbol_short!("USR_POLS"); // address -> Vec<u64>
const COLLATERAL_TOKENS_KEY: Symbol = symbol_short!("COL_TKNS");
const PAYOUT_TOKENS_KEY: Symbol = symbol_short!("PAY_TKNS");
const COLLECTED_FEES_KEY: Symbol = symbol_short!("FEES");    // payout asset -> running total

#[contractimpl]
impl PolicyMarket {
    /// Initializes the marketplace with its admin and collaborator wiring.
    /// Can only be called once.
    ///
    /// # Arguments
    /// * `admin` - Address with administrative privileges (pause, token
    ///   allow-lists, fee withdrawal, emergency settlement)
    /// * `policy_storage` - Address of the policy-storage contract; this
    ///   contract must be granted writer authorization there
    /// * `price_oracle` - Address of the price oracle contract
    /// * `fee_recipient` - Address platform fees are withdrawn to
    pub fn initialize(
        env: Env,
        admin: Address,
        policy_storage: Address,
        price_oracle: Address,
        fee_recipient: Address,
    ) {
        if env.storage().persistent().has(&ADMIN_KEY) {
            panic!("Contract already initialized");
        }

        env.storage().persistent().set(&ADMIN_KEY, &admin);
        env.storage().persistent().set(&STORAGE_KEY, &policy_storage);
        env.storage().persistent().set(&ORACLE_KEY, &price_oracle);
        env.storage().persistent().set(&FEE_RECIPIENT_KEY, &fee_recipient);

        env.storage().instance().set(&PAUSED_KEY, &false);
        env.storage().instance().set(&OPEN_IDS_KEY, &Vec::<u64>::new(&env));
        env.storage().instance().set(&OPEN_POS_KEY, &Map::<u64, u32>::new(&env));
        env.storage().instance().set(&USER_POLICIES_KEY, &Map::<Address, Vec<u64>>::new(&env));
        env.storage().instance().set(&COLLATERAL_TOKENS_KEY, &Map::<Address, TokenInfo>::new(&env));
        env.storage().instance().set(&PAYOUT_TOKENS_KEY, &Map::<Address, TokenInfo>::new(&env));
        env.storage().instance().set(&COLLECTED_FEES_KEY, &Map::<Address, i128>::new(&env));
    }

    // ============================================================================================
    // INTERNAL HELPERS
    // ============================================================================================

    /// Verifies admin authorization for administrative functions.
    fn _require_admin(env: &Env) -> Result<(), Error> {
        let admin: Address = env.storage().persistent().get(&ADMIN_KEY).unwrap();
        admin.require_auth();
        Ok(())
    }

    fn _is_paused(env: &Env) -> bool {
        env.storage().instance().get(&PAUSED_KEY).unwrap_or(false)
    }

    fn _storage_client(env: &Env) -> PolicyStorageClient {
        let storage: Address = env.storage().persistent().get(&STORAGE_KEY).unwrap();
        PolicyStorageClient::new(env, &storage)
    }

    /// Reads a policy from the store, mapping the store's id error into this
    /// contract's error space.
    fn _get_policy(env: &Env, policy_id: u64) -> Result<Policy, Error> {
        match Self::_storage_client(env).try_get_policy(&policy_id) {
            Ok(Ok(policy)) => Ok(policy),
            _ => Err(Error::InvalidPolicyId),
        }
    }

    /// Fetches a usable price from the oracle, treating every failure mode
    /// (unsupported symbol, momentary outage, staleness) as unavailable.
    /// Completes before any token movement or state write at every call site.
    fn _oracle_price(env: &Env, symbol: &Symbol) -> Result<i128, Error> {
        let oracle: Address = env.storage().persistent().get(&ORACLE_KEY).unwrap();
        let client = PriceOracleClient::new(env, &oracle);
        match client.try_get_price(symbol) {
            Ok(Ok(price)) if price > 0 => Ok(price),
            _ => Err(Error::PriceNotAvailable),
        }
    }

    /// Appends `policy_id` to the open-policy index, recording its position
    /// for O(1) removal later.
    fn _open_index_add(env: &Env, policy_id: u64) {
        let mut ids: Vec<u64> = env.storage().instance().get(&OPEN_IDS_KEY).unwrap();
        let mut positions: Map<u64, u32> = env.storage().instance().get(&OPEN_POS_KEY).unwrap();

        positions.set(policy_id, ids.len());
        ids.push_back(policy_id);

        env.storage().instance().set(&OPEN_IDS_KEY, &ids);
        env.storage().instance().set(&OPEN_POS_KEY, &positions);
    }

    /// Removes `policy_id` from the open-policy index by swapping it with the
    /// last element and truncating. Keeps removal O(1) as the marketplace
    /// grows, at the cost of iteration order stability, which callers must
    /// not rely on.
    fn _open_index_remove(env: &Env, policy_id: u64) {
        let mut ids: Vec<u64> = env.storage().instance().get(&OPEN_IDS_KEY).unwrap();
        let mut positions: Map<u64, u32> = env.storage().instance().get(&OPEN_POS_KEY).unwrap();

        let pos = match positions.get(policy_id) {
            Some(pos) => pos,
            None => return,
        };

        let last_index = ids.len() - 1;
        if pos != last_index {
            let moved = ids.get(last_index).unwrap();
            ids.set(pos, moved);
            positions.set(moved, pos);
        }
        ids.pop_back();
        positions.remove(policy_id);

        env.storage().instance().set(&OPEN_IDS_KEY, &ids);
        env.storage().instance().set(&OPEN_POS_KEY, &positions);
    }

    /// Appends `policy_id` to `user`'s policy list.
    fn _user_policies_add(env: &Env, user: &Address, policy_id: u64) {
        let mut lists: Map<Address, Vec<u64>> =
            env.storage().instance().get(&USER_POLICIES_KEY).unwrap();
        let mut list = lists.get(user.clone()).unwrap_or_else(|| Vec::new(env));
        list.push_back(policy_id);
        lists.set(user.clone(), list);
        env.storage().instance().set(&USER_POLICIES_KEY, &lists);
    }

    fn _token_info(env: &Env, registry: &Symbol, token: &Address) -> Option<TokenInfo> {
        let tokens: Map<Address, TokenInfo> = env.storage().instance().get(registry).unwrap();
        tokens.get(token.clone())
    }

    /// Pulls `amount` of `asset` from `from` into custody, verifying the
    /// custody balance grew by exactly `amount`. Defends against
    /// fee-on-transfer or rebasing assets whose transfers move a different
    /// quantity than requested.
    fn _pull_collateral(env: &Env, asset: &Address, from: &Address, amount: i128) -> Result<(), Error> {
        let client = token::Client::new(env, asset);
        let custody = env.current_contract_address();

        let balance_before = client.balance(&custody);
        if client.try_transfer(from, &custody, &amount).is_err() {
            log!(env, "Collateral transfer failed for amount: {}", amount);
            return Err(Error::TokenTransferFailed);
        }
        let balance_after = client.balance(&custody);

        if balance_after - balance_before != amount {
            log!(env, "Collateral transfer moved a different amount than requested");
            return Err(Error::TokenTransferFailed);
        }
        Ok(())
    }

    /// Pays out the settlement split and writes the Settled state.
    ///
    /// The state write happens strictly after both transfers; a failed leg
    /// rolls the whole invocation back, so a "Settled but one party unpaid"
    /// state is never observable.
    fn _execute_settlement(
        env: &Env,
        policy_id: u64,
        mut policy: Policy,
        exit_price: i128,
    ) -> Result<(i128, i128), Error> {
        let (seller_payout, buyer_payout) = settlement::split_collateral(
            policy.entry_price,
            exit_price,
            policy.collateral_amount,
            policy.upside_share_bps,
        )?;

        let buyer = policy.buyer.clone().ok_or(Error::PolicyNotActive)?;
        let collateral = token::Client::new(env, &policy.collateral_asset);
        let custody = env.current_contract_address();

        if seller_payout > 0 {
            if collateral.try_transfer(&custody, &policy.seller, &seller_payout).is_err() {
                log!(env, "Settlement transfer to seller failed: {}", seller_payout);
                return Err(Error::TokenTransferFailed);
            }
        }
        if buyer_payout > 0 {
            if collateral.try_transfer(&custody, &buyer, &buyer_payout).is_err() {
                log!(env, "Settlement transfer to buyer failed: {}", buyer_payout);
                return Err(Error::TokenTransferFailed);
            }
        }

        policy.state = PolicyState::Settled;
        Self::_storage_client(env)
            .try_set_policy(&env.current_contract_address(), &policy_id, &policy)
            .map_err(|_| Error::InvalidPolicyId)?
            .map_err(|_| Error::InvalidPolicyId)?;

        env.events().publish(
            (POLICY_SETTLED, policy_id),
            (exit_price, seller_payout, buyer_payout),
        );
        Ok((seller_payout, buyer_payout))
    }

    // ============================================================================================
    // MARKETPLACE: CREATION, PURCHASE, CANCELLATION
    // ============================================================================================

    /// Creates a policy: locks the seller's collateral in custody and lists
    /// the policy on the marketplace.
    ///
    /// The entry price and the upfront payout amount are fixed here, once,
    /// and never recomputed — a policy that sits unpurchased while the market
    /// moves keeps its original terms.
    ///
    /// # Business Flow
    /// 1. Validates pause state, seller authorization and both token
    ///    allow-lists
    /// 2. Validates terms against the live Config bounds (the Config is the
    ///    only source of bounds; nothing is hardcoded here)
    /// 3. Reads the entry price from the oracle — a price failure aborts
    ///    before any token movement
    /// 4. Pulls the collateral into custody, verifying the received amount
    /// 5. Writes the Open record to the storage contract and indexes it
    ///
    /// # Arguments
    /// * `seller` - Address creating the policy (must sign)
    /// * `collateral_asset` - Allow-listed token being locked
    /// * `collateral_symbol` - Price-feed key; must match the registered
    ///   symbol for the asset
    /// * `amount` - Collateral quantity, > 0
    /// * `payout_asset` - Allow-listed stablecoin for the upfront payout
    /// * `payout_bps` - Discount rate applied to the entry value
    /// * `duration` - Coverage window in seconds
    /// * `upside_share_bps` - Seller's share of price appreciation
    ///
    /// # Returns
    /// The id assigned by the storage contract
    ///
    /// # Errors
    /// - ContractPaused: creation is administratively paused
    /// - UnsupportedToken: either asset is not allow-listed
    /// - InvalidParameters: zero amount, symbol mismatch, or terms outside
    ///   Config bounds
    /// - PriceNotAvailable: the oracle has no usable price for the symbol
    /// - TokenTransferFailed: custody pull failed or moved the wrong amount
    pub fn create_policy(
        env: Env,
        seller: Address,
        collateral_asset: Address,
        collateral_symbol: Symbol,
        amount: i128,
        payout_asset: Address,
        payout_bps: u32,
        duration: u64,
        upside_share_bps: u32,
    ) -> Result<u64, Error> {
        if Self::_is_paused(&env) {
            return Err(Error::ContractPaused);
        }
        seller.require_auth();

        let collateral_info = Self::_token_info(&env, &COLLATERAL_TOKENS_KEY, &collateral_asset)
            .ok_or(Error::UnsupportedToken)?;
        let payout_info = Self::_token_info(&env, &PAYOUT_TOKENS_KEY, &payout_asset)
            .ok_or(Error::UnsupportedToken)?;

        // The registered symbol is authoritative; a mismatched symbol would
        // price the collateral off the wrong feed.
        if collateral_symbol != collateral_info.symbol {
            return Err(Error::InvalidParameters);
        }
        if amount <= 0 {
            return Err(Error::InvalidParameters);
        }

        let config = Self::_storage_client(&env).get_config();
        if payout_bps < config.min_payout_bps || payout_bps > config.max_payout_bps {
            return Err(Error::InvalidParameters);
        }
        if duration < config.min_duration || duration > config.max_duration {
            return Err(Error::InvalidParameters);
        }
        if upside_share_bps < config.min_upside_share_bps
            || upside_share_bps > config.max_upside_share_bps
        {
            return Err(Error::InvalidParameters);
        }

        // Oracle read completes before any token movement
        let entry_price = Self::_oracle_price(&env, &collateral_symbol)?;

        let payout_amount = settlement::upfront_payout(
            amount,
            entry_price,
            collateral_info.decimals,
            payout_info.decimals,
            payout_bps,
        )?;

        Self::_pull_collateral(&env, &collateral_asset, &seller, amount)?;

        let policy = Policy {
            seller: seller.clone(),
            buyer: None,
            collateral_asset: collateral_asset.clone(),
            collateral_symbol,
            collateral_amount: amount,
            payout_asset,
            payout_amount,
            coverage_duration: duration,
            upside_share_bps,
            entry_price,
            start_timestamp: 0,
            expiry_timestamp: 0,
            state: PolicyState::Open,
        };

        let policy_id = match Self::_storage_client(&env)
            .try_add_policy(&env.current_contract_address(), &policy)
        {
            Ok(Ok(id)) => id,
            // Writer authorization on the store is deployment wiring; surface
            // the failure as-is rather than masking it.
            _ => return Err(Error::Unauthorized),
        };

        Self::_open_index_add(&env, policy_id);
        Self::_user_policies_add(&env, &seller, policy_id);

        env.events().publish(
            (POLICY_CREATED, seller),
            (policy_id, collateral_asset, amount, payout_amount, duration, upside_share_bps),
        );

        Ok(policy_id)
    }

    /// Purchases an open policy: pays the seller the upfront amount (minus
    /// the platform fee) and starts the coverage window.
    ///
    /// # Business Flow
    /// 1. Validates pause state, buyer authorization and the Open state
    /// 2. Splits the upfront payout into seller net and platform fee using
    ///    the live Config's fee rate
    /// 3. Moves seller net buyer→seller and the fee buyer→custody, recording
    ///    it in the per-asset collected total
    /// 4. Activates the record: buyer, start/expiry timestamps, Active state
    /// 5. Delists the policy from the open index
    ///
    /// # Errors
    /// - ContractPaused: purchasing is administratively paused
    /// - InvalidPolicyId: no such policy
    /// - PolicyNotOpen: already purchased, settled or cancelled
    /// - Unauthorized: the seller attempting to purchase their own policy
    /// - TokenTransferFailed: either payment leg failed (insufficient
    ///   balance surfaces here, before any policy mutation)
    pub fn purchase_policy(env: Env, buyer: Address, policy_id: u64) -> Result<(), Error> {
        if Self::_is_paused(&env) {
            return Err(Error::ContractPaused);
        }
        buyer.require_auth();

        let mut policy = Self::_get_policy(&env, policy_id)?;
        if policy.state != PolicyState::Open {
            return Err(Error::PolicyNotOpen);
        }
        if buyer == policy.seller {
            return Err(Error::Unauthorized);
        }

        let config = Self::_storage_client(&env).get_config();
        let platform_fee = policy
            .payout_amount
            .checked_mul(config.platform_fee_bps as i128)
            .ok_or(Error::Overflow)?
            / settlement::BPS_DENOMINATOR;
        let seller_net = policy.payout_amount - platform_fee;

        let payout_token = token::Client::new(&env, &policy.payout_asset);
        if payout_token.try_transfer(&buyer, &policy.seller, &seller_net).is_err() {
            log!(&env, "Buyer payment to seller failed: {}", seller_net);
            return Err(Error::TokenTransferFailed);
        }
        if platform_fee > 0 {
            let custody = env.current_contract_address();
            if payout_token.try_transfer(&buyer, &custody, &platform_fee).is_err() {
                log!(&env, "Platform fee transfer failed: {}", platform_fee);
                return Err(Error::TokenTransferFailed);
            }
            let mut fees: Map<Address, i128> =
                env.storage().instance().get(&COLLECTED_FEES_KEY).unwrap();
            let total = fees.get(policy.payout_asset.clone()).unwrap_or(0);
            fees.set(policy.payout_asset.clone(), total + platform_fee);
            env.storage().instance().set(&COLLECTED_FEES_KEY, &fees);
        }

        let now = env.ledger().timestamp();
        policy.buyer = Some(buyer.clone());
        policy.start_timestamp = now;
        policy.expiry_timestamp = now + policy.coverage_duration;
        policy.state = PolicyState::Active;

        Self::_storage_client(&env)
            .try_set_policy(&env.current_contract_address(), &policy_id, &policy)
            .map_err(|_| Error::InvalidPolicyId)?
            .map_err(|_| Error::InvalidPolicyId)?;

        Self::_open_index_remove(&env, policy_id);
        Self::_user_policies_add(&env, &buyer, policy_id);

        env.events().publish(
            (POLICY_PURCHASED, buyer),
            (policy_id, seller_net, platform_fee, policy.expiry_timestamp),
        );

        Ok(())
    }

    /// Cancels an unsold policy and returns the full collateral to the seller.
    ///
    /// Deliberately not gated by the pause switch: sellers can always recover
    /// their own unsold collateral, even during an administrative freeze.
    /// No payout-asset movement occurs — nothing was ever collected from a
    /// buyer.
    ///
    /// # Errors
    /// - InvalidPolicyId: no such policy
    /// - Unauthorized: caller is not the seller of record
    /// - PolicyNotOpen: already purchased, settled or cancelled
    /// - TokenTransferFailed: collateral refund failed
    pub fn cancel_policy(env: Env, seller: Address, policy_id: u64) -> Result<(), Error> {
        seller.require_auth();

        let mut policy = Self::_get_policy(&env, policy_id)?;
        if policy.seller != seller {
            return Err(Error::Unauthorized);
        }
        if policy.state != PolicyState::Open {
            return Err(Error::PolicyNotOpen);
        }

        let collateral = token::Client::new(&env, &policy.collateral_asset);
        let custody = env.current_contract_address();
        if collateral.try_transfer(&custody, &seller, &policy.collateral_amount).is_err() {
            log!(&env, "Collateral refund failed: {}", policy.collateral_amount);
            return Err(Error::TokenTransferFailed);
        }

        policy.state = PolicyState::Cancelled;
        Self::_storage_client(&env)
            .try_set_policy(&env.current_contract_address(), &policy_id, &policy)
            .map_err(|_| Error::InvalidPolicyId)?
            .map_err(|_| Error::InvalidPolicyId)?;

        Self::_open_index_remove(&env, policy_id);

        env.events().publish((POLICY_CANCELLED, seller), policy_id);
        Ok(())
    }

    // ============================================================================================
    // SETTLEMENT ENGINE
    // ============================================================================================

    /// Settles an expired policy at the oracle's current price.
    ///
    /// Callable by anyone once the coverage window has ended — settlement is
    /// always caller-triggered, there is no background scheduler. Safe to
    /// retry: once Settled, subsequent calls fail fast with PolicyNotActive
    /// without moving tokens; a PriceNotAvailable failure leaves the policy
    /// Active for a later attempt.
    ///
    /// # Errors
    /// - InvalidPolicyId: no such policy
    /// - PolicyNotActive: never purchased, or already settled
    /// - PolicyNotExpired: coverage window still running; retry after expiry
    /// - PriceNotAvailable: the oracle has no usable exit price; retry later
    /// - TokenTransferFailed: a payout leg failed
    pub fn settle_policy(env: Env, policy_id: u64) -> Result<(), Error> {
        let policy = Self::_get_policy(&env, policy_id)?;
        if policy.state != PolicyState::Active {
            return Err(Error::PolicyNotActive);
        }
        // Expiry exactly at `now` is sufficient
        if env.ledger().timestamp() < policy.expiry_timestamp {
            return Err(Error::PolicyNotExpired);
        }

        let exit_price = Self::_oracle_price(&env, &policy.collateral_symbol)?;
        Self::_execute_settlement(&env, policy_id, policy, exit_price)?;
        Ok(())
    }

    /// Administrative settlement with a supplied exit price.
    ///
    /// Escape hatch for an unavailable or compromised oracle: same payout
    /// algorithm, administrator-supplied price, no expiry precondition.
    ///
    /// # Errors
    /// - InvalidParameters: non-positive exit price
    /// - PolicyNotActive / InvalidPolicyId / TokenTransferFailed: as for
    ///   settle_policy
    pub fn emergency_settle_policy(env: Env, policy_id: u64, exit_price: i128) -> Result<(), Error> {
        Self::_require_admin(&env)?;

        if exit_price <= 0 {
            return Err(Error::InvalidParameters);
        }

        let policy = Self::_get_policy(&env, policy_id)?;
        if policy.state != PolicyState::Active {
            return Err(Error::PolicyNotActive);
        }

        Self::_execute_settlement(&env, policy_id, policy, exit_price)?;
        Ok(())
    }

    /// Whether settle_policy would currently be accepted for `policy_id`.
    /// Lets callers avoid wasted failed attempts.
    pub fn can_settle(env: Env, policy_id: u64) -> bool {
        match Self::_get_policy(&env, policy_id) {
            Ok(policy) => {
                policy.state == PolicyState::Active
                    && env.ledger().timestamp() >= policy.expiry_timestamp
            }
            Err(_) => false,
        }
    }

    /// Read-only preview of the settlement split at the current oracle price.
    ///
    /// Returns (0, 0) unless the policy is Active. An oracle failure degrades
    /// to the no-gain split — full collateral to the buyer — rather than
    /// erroring; this is a display aid, not a commitment.
    pub fn calculate_potential_payouts(env: Env, policy_id: u64) -> (i128, i128) {
        let policy = match Self::_get_policy(&env, policy_id) {
            Ok(policy) => policy,
            Err(_) => return (0, 0),
        };
        if policy.state != PolicyState::Active {
            return (0, 0);
        }

        match Self::_oracle_price(&env, &policy.collateral_symbol) {
            Ok(current_price) => settlement::split_collateral(
                policy.entry_price,
                current_price,
                policy.collateral_amount,
                policy.upside_share_bps,
            )
            .unwrap_or((0, policy.collateral_amount)),
            Err(_) => (0, policy.collateral_amount),
        }
    }

    // ============================================================================================
    // ADMINISTRATIVE FUNCTIONS
    // ============================================================================================

    /// Allow-lists a collateral token under its price-feed symbol.
    ///
    /// Probes `decimals()` on the token contract — this validates the address
    /// actually implements the token interface and pins the decimal
    /// convention used in every later payout computation.
    pub fn add_supported_collateral(env: Env, token_id: Address, symbol: Symbol) -> Result<(), Error> {
        Self::_require_admin(&env)?;

        let decimals = token::Client::new(&env, &token_id).decimals();

        let mut tokens: Map<Address, TokenInfo> =
            env.storage().instance().get(&COLLATERAL_TOKENS_KEY).unwrap();
        tokens.set(token_id.clone(), TokenInfo { symbol, decimals });
        env.storage().instance().set(&COLLATERAL_TOKENS_KEY, &tokens);

        env.events().publish((TOKEN_LISTED, symbol_short!("coll")), token_id);
        Ok(())
    }

    /// Removes a collateral token from the allow-list. Existing policies are
    /// unaffected; only new creations are blocked.
    pub fn remove_supported_collateral(env: Env, token_id: Address) -> Result<(), Error> {
        Self::_require_admin(&env)?;

        let mut tokens: Map<Address, TokenInfo> =
            env.storage().instance().get(&COLLATERAL_TOKENS_KEY).unwrap();
        tokens.remove(token_id.clone());
        env.storage().instance().set(&COLLATERAL_TOKENS_KEY, &tokens);

        env.events().publish((TOKEN_DELISTED, symbol_short!("coll")), token_id);
        Ok(())
    }

    /// Allow-lists a payout token. Same decimals probe as for collateral.
    pub fn add_supported_payout(env: Env, token_id: Address, symbol: Symbol) -> Result<(), Error> {
        Self::_require_admin(&env)?;

        let decimals = token::Client::new(&env, &token_id).decimals();

        let mut tokens: Map<Address, TokenInfo> =
            env.storage().instance().get(&PAYOUT_TOKENS_KEY).unwrap();
        tokens.set(token_id.clone(), TokenInfo { symbol, decimals });
        env.storage().instance().set(&PAYOUT_TOKENS_KEY, &tokens);

        env.events().publish((TOKEN_LISTED, symbol_short!("payout")), token_id);
        Ok(())
    }

    /// Removes a payout token from the allow-list.
    pub fn remove_supported_payout(env: Env, token_id: Address) -> Result<(), Error> {
        Self::_require_admin(&env)?;

        let mut tokens: Map<Address, TokenInfo> =
            env.storage().instance().get(&PAYOUT_TOKENS_KEY).unwrap();
        tokens.remove(token_id.clone());
        env.storage().instance().set(&PAYOUT_TOKENS_KEY, &tokens);

        env.events().publish((TOKEN_DELISTED, symbol_short!("payout")), token_id);
        Ok(())
    }

    /// Halts policy creation and purchase. Cancellation stays available so
    /// sellers can always recover unsold collateral, and settlement of
    /// already-active policies proceeds normally.
    pub fn pause(env: Env) -> Result<(), Error> {
        Self::_require_admin(&env)?;
        env.storage().instance().set(&PAUSED_KEY, &true);
        Ok(())
    }

    /// Resumes policy creation and purchase.
    pub fn unpause(env: Env) -> Result<(), Error> {
        Self::_require_admin(&env)?;
        env.storage().instance().set(&PAUSED_KEY, &false);
        Ok(())
    }

    /// Updates where withdrawn fees are sent.
    pub fn set_fee_recipient(env: Env, new_recipient: Address) -> Result<(), Error> {
        Self::_require_admin(&env)?;
        env.storage().persistent().set(&FEE_RECIPIENT_KEY, &new_recipient);
        Ok(())
    }

    /// Withdraws collected platform fees to the fee recipient.
    ///
    /// Fees accumulate in custody per payout asset at purchase time; this
    /// pays out up to the tracked total for `token_id`.
    ///
    /// # Errors
    /// - InvalidParameters: non-positive amount
    /// - InsufficientBalance: amount exceeds the tracked collected total
    /// - TokenTransferFailed: payout transfer failed
    pub fn withdraw_fees(env: Env, token_id: Address, amount: i128) -> Result<(), Error> {
        Self::_require_admin(&env)?;

        if amount <= 0 {
            return Err(Error::InvalidParameters);
        }

        let mut fees: Map<Address, i128> =
            env.storage().instance().get(&COLLECTED_FEES_KEY).unwrap();
        let total = fees.get(token_id.clone()).unwrap_or(0);
        if amount > total {
            return Err(Error::InsufficientBalance);
        }

        let recipient: Address = env.storage().persistent().get(&FEE_RECIPIENT_KEY).unwrap();
        let custody = env.current_contract_address();
        if token::Client::new(&env, &token_id).try_transfer(&custody, &recipient, &amount).is_err() {
            log!(&env, "Fee withdrawal transfer failed: {}", amount);
            return Err(Error::TokenTransferFailed);
        }

        fees.set(token_id.clone(), total - amount);
        env.storage().instance().set(&COLLECTED_FEES_KEY, &fees);

        env.events().publish((FEES_WITHDRAWN, token_id), amount);
        Ok(())
    }

    /// Transfers administrative control. The new admin must also sign, which
    /// prevents accidental handoff to an address nobody controls.
    pub fn update_admin(env: Env, new_admin: Address) -> Result<(), Error> {
        Self::_require_admin(&env)?;
        new_admin.require_auth();

        env.storage().persistent().set(&ADMIN_KEY, &new_admin);
        env.events().publish((ADMIN_UPDATED,), new_admin);
        Ok(())
    }

    // ============================================================================================
    // QUERY FUNCTIONS
    // ============================================================================================

    /// Ids of all currently open policies. Order is not stable across
    /// mutations (removal swaps with the last element).
    pub fn get_open_policy_ids(env: Env) -> Vec<u64> {
        env.storage().instance().get(&OPEN_IDS_KEY).unwrap()
    }

    /// Every policy id `user` participates in, as seller or buyer, in
    /// creation/purchase order.
    pub fn get_user_policies(env: Env, user: Address) -> Vec<u64> {
        let lists: Map<Address, Vec<u64>> =
            env.storage().instance().get(&USER_POLICIES_KEY).unwrap();
        lists.get(user).unwrap_or_else(|| Vec::new(&env))
    }

    /// Aggregated per-policy view: the record, live price (0 when the oracle
    /// is down), time remaining, potential payout preview and settle
    /// eligibility.
    ///
    /// # Errors
    /// - InvalidPolicyId: no such policy
    pub fn get_policy_details(env: Env, policy_id: u64) -> Result<PolicyDetails, Error> {
        let policy = Self::_get_policy(&env, policy_id)?;

        let current_price =
            Self::_oracle_price(&env, &policy.collateral_symbol).unwrap_or(0);

        let now = env.ledger().timestamp();
        let time_remaining = if policy.state == PolicyState::Active && policy.expiry_timestamp > now
        {
            policy.expiry_timestamp - now
        } else {
            0
        };

        let (potential_seller_payout, potential_buyer_payout) =
            Self::calculate_potential_payouts(env.clone(), policy_id);
        let can_settle = Self::can_settle(env.clone(), policy_id);

        Ok(PolicyDetails {
            policy,
            current_price,
            time_remaining,
            potential_seller_payout,
            potential_buyer_payout,
            can_settle,
        })
    }

    /// Aggregate protocol statistics. Oracle health is a passthrough of the
    /// collaborator's liveness flag (false when unreachable) and never gates
    /// any state transition.
    pub fn get_protocol_stats(env: Env) -> ProtocolStats {
        let open_ids: Vec<u64> = env.storage().instance().get(&OPEN_IDS_KEY).unwrap();
        let total_policies = Self::_storage_client(&env).get_policy_count();

        let oracle: Address = env.storage().persistent().get(&ORACLE_KEY).unwrap();
        let oracle_healthy = match PriceOracleClient::new(&env, &oracle).try_is_healthy() {
            Ok(Ok(healthy)) => healthy,
            _ => false,
        };

        ProtocolStats {
            open_policies: open_ids.len(),
            total_policies,
            oracle_healthy,
        }
    }

    pub fn get_admin(env: Env) -> Address {
        env.storage().persistent().get(&ADMIN_KEY).unwrap()
    }

    pub fn get_storage_contract(env: Env) -> Address {
        env.storage().persistent().get(&STORAGE_KEY).unwrap()
    }

    pub fn get_oracle_contract(env: Env) -> Address {
        env.storage().persistent().get(&ORACLE_KEY).unwrap()
    }

    pub fn get_fee_recipient(env: Env) -> Address {
        env.storage().persistent().get(&FEE_RECIPIENT_KEY).unwrap()
    }

    /// Running total of collected, not-yet-withdrawn fees for a payout asset.
    pub fn get_collected_fees(env: Env, token_id: Address) -> i128 {
        let fees: Map<Address, i128> =
            env.storage().instance().get(&COLLECTED_FEES_KEY).unwrap();
        fees.get(token_id).unwrap_or(0)
    }

    pub fn is_paused(env: Env) -> bool {
        Self::_is_paused(&env)
    }

    pub fn is_collateral_supported(env: Env, token_id: Address) -> bool {
        Self::_token_info(&env, &COLLATERAL_TOKENS_KEY, &token_id).is_some()
    }

    pub fn is_payout_supported(env: Env, token_id: Address) -> bool {
        Self::_token_info(&env, &PAYOUT_TOKENS_KEY, &token_id).is_some()
    }

    /// Registered symbol and decimals for an allow-listed collateral token.
    pub fn get_collateral_info(env: Env, token_id: Address) -> Option<TokenInfo> {
        Self::_token_info(&env, &COLLATERAL_TOKENS_KEY, &token_id)
    }
}
