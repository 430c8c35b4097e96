/*!
 * Price Oracle Client Interface
 *
 * The oracle is an external collaborator; this contract only consumes its
 * price-per-symbol read and its liveness flag. How the oracle computes,
 * signs or refreshes prices is out of scope here.
 *
 * Call sites use the generated `try_` methods and treat any failure
 * (unsupported symbol, momentary unavailability, staleness) uniformly as
 * "price not available": state-changing operations abort before any token
 * movement, display paths fall back to documented defaults.
 */

use soroban_sdk::{contractclient, Env, Symbol};

/// Interface the deployed price oracle contract is expected to expose.
#[contractclient(name = "PriceOracleClient")]
pub trait PriceOracle {
    /// Current USD price for `symbol`, 8-decimal fixed point
    /// (price / 1e8 = USD value). Fails when no usable price exists.
    fn get_price(env: Env, symbol: Symbol) -> i128;

    /// Best-effort liveness signal. Consumed for status reporting only;
    /// never gates a state transition.
    fn is_healthy(env: Env) -> bool;
}
