/*!
 * Policy Storage Smart Contract
 *
 * Durable keyed storage for Policy records and the global Config singleton.
 * The marketplace contract holds no policy records of its own; it reads and
 * writes them here through a writer allow-list, which keeps record custody
 * in one place even if the marketplace logic is ever redeployed.
 *
 * Guarantees that the rest of the system leans on:
 * - Policy ids are assigned sequentially starting at 1 and never reused
 * - Records are only ever written by the owner or an allow-listed writer
 * - Config replacements are rejected unless the bounds invariants hold
 */

#![no_std]

mod types;

#[cfg(test)]
mod test;

use soroban_sdk::{contract, contractimpl, Address, Env, Map, Symbol, symbol_short};

pub use types::{Config, Error, Policy, PolicyState};
use types::{CONFIG_UPDATED, POLICY_ADDED, POLICY_REPLACED, WRITER_AUTH_SET};

#[contract]
pub struct PolicyStorage;

// Storage keys. The owner and config survive upgrades (persistent storage);
// the record map, writer list and id counter live in instance storage.
const OWNER_KEY: Symbol = symbol_short!("OWNER");
const CONFIG_KEY: Symbol = symbol_short!("CONFIG");
const POLICIES_KEY: Symbol = symbol_short!("POLICIES");
const WRITERS_KEY: Symbol = symbol_short!("WRITERS");
const NEXT_ID_KEY: Symbol = symbol_short!("NEXT_ID");

#[contractimpl]
impl PolicyStorage {
    /// Initializes the store with its owner and a default Config.
    ///
    /// Can only be called once. The defaults are deliberately conservative;
    /// the owner is expected to tune them with `set_config` before launch.
    pub fn initialize(env: Env, owner: Address) {
        if env.storage().persistent().has(&OWNER_KEY) {
            panic!("Contract already initialized");
        }

        env.storage().persistent().set(&OWNER_KEY, &owner);
        env.storage().persistent().set(
            &CONFIG_KEY,
            &Config {
                min_payout_bps: 1_000,
                max_payout_bps: 9_900,
                min_upside_share_bps: 0,
                max_upside_share_bps: 5_000,
                min_duration: 86_400,          // 1 day
                max_duration: 31_536_000,      // 365 days
                platform_fee_bps: 200,
            },
        );

        // Ids start at 1; id 0 is reserved as "never assigned"
        env.storage().instance().set(&NEXT_ID_KEY, &1u64);
        env.storage().instance().set(&POLICIES_KEY, &Map::<u64, Policy>::new(&env));
        env.storage().instance().set(&WRITERS_KEY, &Map::<Address, bool>::new(&env));
    }

    /// Verifies owner authorization for administrative operations.
    fn _require_owner(env: &Env) -> Result<(), Error> {
        let owner: Address = env.storage().persistent().get(&OWNER_KEY).unwrap();
        owner.require_auth();
        Ok(())
    }

    /// Write gate: the caller must be the owner or an allow-listed writer.
    ///
    /// The writer authenticates itself (for a contract caller, Soroban's
    /// invoker auth satisfies `require_auth` automatically) and must then be
    /// found on the allow-list.
    fn _require_writer(env: &Env, writer: &Address) -> Result<(), Error> {
        writer.require_auth();

        let owner: Address = env.storage().persistent().get(&OWNER_KEY).unwrap();
        if *writer == owner {
            return Ok(());
        }
        let writers: Map<Address, bool> = env.storage().instance().get(&WRITERS_KEY).unwrap();
        if writers.get(writer.clone()).unwrap_or(false) {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    /// Rejects ids that this store never assigned (0, or >= the id counter).
    fn _check_id(env: &Env, policy_id: u64) -> Result<(), Error> {
        let next_id: u64 = env.storage().instance().get(&NEXT_ID_KEY).unwrap();
        if policy_id == 0 || policy_id >= next_id {
            return Err(Error::InvalidPolicyId);
        }
        Ok(())
    }

    /// Returns the policy record for `policy_id`.
    ///
    /// # Errors
    /// - InvalidPolicyId: id is 0 or was never assigned
    pub fn get_policy(env: Env, policy_id: u64) -> Result<Policy, Error> {
        Self::_check_id(&env, policy_id)?;
        let policies: Map<u64, Policy> = env.storage().instance().get(&POLICIES_KEY).unwrap();
        policies.get(policy_id).ok_or(Error::InvalidPolicyId)
    }

    /// Full replace of an existing policy record.
    ///
    /// # Errors
    /// - Unauthorized: writer is not the owner or on the allow-list
    /// - InvalidPolicyId: id is 0 or was never assigned
    pub fn set_policy(env: Env, writer: Address, policy_id: u64, policy: Policy) -> Result<(), Error> {
        Self::_require_writer(&env, &writer)?;
        Self::_check_id(&env, policy_id)?;

        let mut policies: Map<u64, Policy> = env.storage().instance().get(&POLICIES_KEY).unwrap();
        policies.set(policy_id, policy);
        env.storage().instance().set(&POLICIES_KEY, &policies);

        env.events().publish((POLICY_REPLACED, writer), policy_id);
        Ok(())
    }

    /// Stores a new policy record under the next sequential id and returns it.
    ///
    /// # Errors
    /// - Unauthorized: writer is not the owner or on the allow-list
    pub fn add_policy(env: Env, writer: Address, policy: Policy) -> Result<u64, Error> {
        Self::_require_writer(&env, &writer)?;

        let policy_id: u64 = env.storage().instance().get(&NEXT_ID_KEY).unwrap();
        let mut policies: Map<u64, Policy> = env.storage().instance().get(&POLICIES_KEY).unwrap();
        policies.set(policy_id, policy);

        env.storage().instance().set(&POLICIES_KEY, &policies);
        env.storage().instance().set(&NEXT_ID_KEY, &(policy_id + 1));

        env.events().publish((POLICY_ADDED, writer), policy_id);
        Ok(policy_id)
    }

    /// Returns the current Config singleton.
    pub fn get_config(env: Env) -> Config {
        env.storage().persistent().get(&CONFIG_KEY).unwrap()
    }

    /// Replaces the Config singleton. Owner-only.
    ///
    /// # Errors
    /// - InvalidConfig: bounds invariants violated (min > max, bps > 10000,
    ///   platform fee > 10%)
    pub fn set_config(env: Env, config: Config) -> Result<(), Error> {
        Self::_require_owner(&env)?;

        if !config.is_valid() {
            return Err(Error::InvalidConfig);
        }

        env.storage().persistent().set(&CONFIG_KEY, &config);
        env.events().publish((CONFIG_UPDATED,), ());
        Ok(())
    }

    /// Grants or revokes write access for `writer`. Owner-only.
    pub fn set_writer_authorization(env: Env, writer: Address, authorized: bool) -> Result<(), Error> {
        Self::_require_owner(&env)?;

        let mut writers: Map<Address, bool> = env.storage().instance().get(&WRITERS_KEY).unwrap();
        if authorized {
            writers.set(writer.clone(), true);
        } else {
            writers.remove(writer.clone());
        }
        env.storage().instance().set(&WRITERS_KEY, &writers);

        env.events().publish((WRITER_AUTH_SET, writer), authorized);
        Ok(())
    }

    /// Returns whether `writer` is on the allow-list (the owner always is).
    pub fn is_writer_authorized(env: Env, writer: Address) -> bool {
        let owner: Address = env.storage().persistent().get(&OWNER_KEY).unwrap();
        if writer == owner {
            return true;
        }
        let writers: Map<Address, bool> = env.storage().instance().get(&WRITERS_KEY).unwrap();
        writers.get(writer).unwrap_or(false)
    }

    /// Total number of policies ever created (terminal states included;
    /// records are never deleted).
    pub fn get_policy_count(env: Env) -> u64 {
        let next_id: u64 = env.storage().instance().get(&NEXT_ID_KEY).unwrap();
        next_id - 1
    }

    /// Returns the store owner address.
    pub fn get_owner(env: Env) -> Address {
        env.storage().persistent().get(&OWNER_KEY).unwrap()
    }
}
