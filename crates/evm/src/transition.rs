use crate::{
    evm::{delegation_code, delegation_target},
    gas::{floor_data_gas, intrinsic_gas},
    interpreter::{CallInputs, CreateInputs},
    precompiles, Evm, GasPool, StateTransitionError, VmError,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use sonic_primitives::{
    constants::{MAX_INIT_CODE_SIZE, MAX_REFUND_QUOTIENT, PER_EMPTY_ACCOUNT_COST},
    AccessList, GotExpected, SignedAuthorization, TransactionSigned,
};
use sonic_state::BalanceChangeReason;
use tracing::trace;

/// Gas of an authorization tuple applied to an existing account.
const PER_AUTH_BASE_COST: u64 = 12_500;

/// Refund quotient before London (EIP-3529).
const MAX_REFUND_QUOTIENT_FRONTIER: u64 = 2;

/// A transaction reduced to what the state transition needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Sender.
    pub from: Address,
    /// Recipient, `None` for creations.
    pub to: Option<Address>,
    /// Nonce.
    pub nonce: u64,
    /// Transferred value.
    pub value: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Effective gas price paid per gas.
    pub gas_price: U256,
    /// Max fee per gas.
    pub gas_fee_cap: U256,
    /// Max priority fee per gas.
    pub gas_tip_cap: U256,
    /// Calldata or init code.
    pub data: Bytes,
    /// EIP-2930 access list.
    pub access_list: Option<AccessList>,
    /// Max fee per blob gas.
    pub blob_gas_fee_cap: Option<U256>,
    /// Blob hashes.
    pub blob_hashes: Vec<B256>,
    /// EIP-7702 authorizations.
    pub authorization_list: Option<Vec<SignedAuthorization>>,
    /// Skips the nonce check. The nonce is still incremented by calls.
    pub skip_nonce_checks: bool,
    /// Skips the check that the sender has no code.
    pub skip_from_eoa_check: bool,
}

impl Message {
    /// Converts a transaction of `sender`. Internal transactions skip the nonce and EOA checks.
    pub fn from_transaction(
        tx: &TransactionSigned,
        sender: Address,
        base_fee: Option<U256>,
    ) -> Self {
        let internal = tx.is_internal();
        Self {
            from: sender,
            to: tx.to(),
            nonce: tx.nonce(),
            value: tx.value(),
            gas_limit: tx.gas_limit(),
            gas_price: tx.effective_gas_price(base_fee),
            gas_fee_cap: tx.max_fee_per_gas(),
            gas_tip_cap: tx.max_priority_fee_per_gas(),
            data: tx.input().clone(),
            access_list: tx.access_list().cloned(),
            blob_gas_fee_cap: tx.max_fee_per_blob_gas(),
            blob_hashes: tx.blob_versioned_hashes().map(<[B256]>::to_vec).unwrap_or_default(),
            authorization_list: tx.authorization_list().map(<[SignedAuthorization]>::to_vec),
            skip_nonce_checks: internal,
            skip_from_eoa_check: internal,
        }
    }

    /// Returns true if the message creates a contract.
    pub const fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

/// Outcome of an applied message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Gas charged, after refunds.
    pub used_gas: u64,
    /// Gas refunded.
    pub refunded_gas: u64,
    /// Error of the outermost frame.
    pub error: Option<VmError>,
    /// Return data of the outermost frame.
    pub return_data: Bytes,
}

impl ExecutionResult {
    /// Returns true if the outermost frame failed.
    pub const fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// Return data if the outermost frame reverted.
    pub fn revert(&self) -> Option<&Bytes> {
        (self.error == Some(VmError::Reverted)).then_some(&self.return_data)
    }
}

/// Applies `msg` to the state of `evm`, taking its gas from `gas_pool`.
///
/// An `Err` means the message could not be applied. State changes and gas taken before the
/// failing check are left in place, callers revert to a snapshot and restore the pool.
pub fn apply_message(
    evm: &mut Evm<'_>,
    msg: &Message,
    gas_pool: &mut GasPool,
) -> Result<ExecutionResult, StateTransitionError> {
    pre_check(evm, msg)?;
    buy_gas(evm, msg, gas_pool)?;

    let rules = *evm.evm_rules();
    let is_create = msg.is_create();
    let authorizations = msg.authorization_list.as_ref().map_or(0, Vec::len);
    let intrinsic =
        intrinsic_gas(&msg.data, msg.access_list.as_ref(), authorizations, is_create, &rules)?;
    if msg.gas_limit < intrinsic {
        return Err(StateTransitionError::IntrinsicGas(GotExpected::new(msg.gas_limit, intrinsic)))
    }
    let floor = if rules.is_eip7623() { floor_data_gas(&msg.data)? } else { 0 };
    if msg.gas_limit < floor {
        return Err(StateTransitionError::FloorDataGas(GotExpected::new(msg.gas_limit, floor)))
    }
    let mut gas_remaining = msg.gas_limit - intrinsic;

    if !msg.value.is_zero() && evm.state_ref().balance(msg.from) < msg.value {
        return Err(StateTransitionError::InsufficientFundsForTransfer { sender: msg.from })
    }
    if rules.is_shanghai && is_create && msg.data.len() > MAX_INIT_CODE_SIZE {
        return Err(StateTransitionError::MaxInitCodeSizeExceeded {
            size: msg.data.len(),
            limit: MAX_INIT_CODE_SIZE,
        })
    }

    if rules.is_berlin {
        let coinbase = rules.is_shanghai.then_some(evm.block_context().coinbase);
        evm.state_mut().prepare(
            msg.from,
            coinbase,
            msg.to,
            &precompiles::addresses(&rules),
            msg.access_list.as_ref(),
        );
    }

    let frame = match msg.to {
        None => evm.create(CreateInputs {
            caller: msg.from,
            init_code: msg.data.clone(),
            gas: gas_remaining,
            value: msg.value,
            salt: None,
        }),
        Some(to) => {
            let state = evm.state_mut();
            let nonce = state.nonce(msg.from);
            state.set_nonce(msg.from, nonce.saturating_add(1));
            for authorization in msg.authorization_list.iter().flatten() {
                if let Err(reason) = apply_authorization(evm, authorization) {
                    trace!(target: "evm", %reason, "authorization skipped");
                }
            }
            if let Some(target) = delegation_target(&evm.state_ref().code(to)) {
                evm.state_mut().add_address_to_access_list(target);
            }
            evm.call(CallInputs::call(msg.from, to, msg.data.clone(), gas_remaining, msg.value))
        }
    };
    gas_remaining = frame.gas_left;

    // EIP-3529
    let quotient = if rules.is_london { MAX_REFUND_QUOTIENT } else { MAX_REFUND_QUOTIENT_FRONTIER };
    let refund = ((msg.gas_limit - gas_remaining) / quotient).min(evm.state_ref().refund());
    gas_remaining += refund;

    // EIP-7623
    if rules.is_eip7623() && msg.gas_limit - gas_remaining < floor {
        gas_remaining = msg.gas_limit - floor;
    }

    let returned = U256::from(gas_remaining).saturating_mul(msg.gas_price);
    evm.state_mut().add_balance(msg.from, returned, BalanceChangeReason::GasReturn);
    gas_pool.add_gas(gas_remaining);

    let used_gas = msg.gas_limit - gas_remaining;
    let base_fee = evm.block_context().base_fee;
    let effective_tip = if rules.is_london {
        msg.gas_tip_cap.min(msg.gas_fee_cap.saturating_sub(base_fee))
    } else {
        msg.gas_price
    };
    if !(evm.config().no_base_fee && msg.gas_fee_cap.is_zero() && msg.gas_tip_cap.is_zero()) {
        let coinbase = evm.block_context().coinbase;
        let tip = U256::from(used_gas).saturating_mul(effective_tip);
        evm.state_mut().add_balance(coinbase, tip, BalanceChangeReason::TipPayment);
    }

    trace!(
        target: "evm",
        from = %msg.from,
        used_gas,
        refund,
        error = ?frame.error,
        "applied message"
    );
    Ok(ExecutionResult {
        used_gas,
        refunded_gas: refund,
        error: frame.error,
        return_data: frame.output,
    })
}

fn pre_check(evm: &Evm<'_>, msg: &Message) -> Result<(), StateTransitionError> {
    let state = evm.state_ref();
    if !msg.skip_nonce_checks {
        let nonce = state.nonce(msg.from);
        if msg.nonce < nonce {
            return Err(StateTransitionError::NonceTooLow {
                sender: msg.from,
                tx: msg.nonce,
                state: nonce,
            })
        }
        if msg.nonce > nonce {
            return Err(StateTransitionError::NonceTooHigh {
                sender: msg.from,
                tx: msg.nonce,
                state: nonce,
            })
        }
        if nonce == u64::MAX {
            return Err(StateTransitionError::NonceMax { sender: msg.from, nonce })
        }
    }

    if !msg.skip_from_eoa_check {
        let code = state.code(msg.from);
        if !code.is_empty() && delegation_target(&code).is_none() {
            return Err(StateTransitionError::SenderNoEoa {
                sender: msg.from,
                code_hash: state.code_hash(msg.from),
            })
        }
    }

    if evm.evm_rules().is_london {
        let skip = evm.config().no_base_fee &&
            msg.gas_fee_cap.is_zero() &&
            msg.gas_tip_cap.is_zero();
        if !skip {
            if msg.gas_fee_cap < msg.gas_tip_cap {
                return Err(StateTransitionError::TipAboveFeeCap {
                    sender: msg.from,
                    tip_cap: msg.gas_tip_cap,
                    fee_cap: msg.gas_fee_cap,
                })
            }
            let base_fee = evm.block_context().base_fee;
            if msg.gas_fee_cap < base_fee {
                return Err(StateTransitionError::FeeCapTooLow {
                    sender: msg.from,
                    fee_cap: msg.gas_fee_cap,
                    base_fee,
                })
            }
        }
    }

    if let Some(authorizations) = &msg.authorization_list {
        if msg.to.is_none() {
            return Err(StateTransitionError::SetCodeCreate)
        }
        if authorizations.is_empty() {
            return Err(StateTransitionError::EmptyAuthorizations)
        }
    }
    Ok(())
}

fn buy_gas(
    evm: &mut Evm<'_>,
    msg: &Message,
    gas_pool: &mut GasPool,
) -> Result<(), StateTransitionError> {
    let gas = U256::from(msg.gas_limit);
    let charge = gas.saturating_mul(msg.gas_price);
    let want = gas.saturating_mul(msg.gas_fee_cap).saturating_add(msg.value);
    let have = evm.state_ref().balance(msg.from);
    if have < want {
        return Err(StateTransitionError::InsufficientFunds { sender: msg.from, have, want })
    }
    gas_pool.sub_gas(msg.gas_limit)?;
    evm.state_mut().sub_balance(msg.from, charge, BalanceChangeReason::GasBuy);
    Ok(())
}

/// Why an authorization tuple was ignored.
#[derive(Debug, thiserror::Error)]
enum AuthorizationError {
    #[error("authorization for chain {0}")]
    WrongChainId(U256),
    #[error("authorization nonce overflow")]
    NonceOverflow,
    #[error("invalid authorization signature")]
    InvalidSignature,
    #[error("authority {0} has code")]
    DestinationHasCode(Address),
    #[error("authority {authority} nonce mismatch: {nonce}")]
    NonceMismatch { authority: Address, nonce: GotExpected<u64> },
}

/// Applies an EIP-7702 authorization. Invalid tuples are skipped without effect.
fn apply_authorization(
    evm: &mut Evm<'_>,
    auth: &SignedAuthorization,
) -> Result<(), AuthorizationError> {
    let chain_id = U256::from(evm.block_context().chain_id);
    if !auth.chain_id.is_zero() && auth.chain_id != chain_id {
        return Err(AuthorizationError::WrongChainId(auth.chain_id))
    }
    let next_nonce = auth.nonce.checked_add(1).ok_or(AuthorizationError::NonceOverflow)?;
    let authority =
        auth.recover_authority().map_err(|_| AuthorizationError::InvalidSignature)?;

    let state = evm.state_mut();
    state.add_address_to_access_list(authority);
    let code = state.code(authority);
    if !code.is_empty() && delegation_target(&code).is_none() {
        return Err(AuthorizationError::DestinationHasCode(authority))
    }
    let nonce = state.nonce(authority);
    if nonce != auth.nonce {
        return Err(AuthorizationError::NonceMismatch {
            authority,
            nonce: GotExpected::new(auth.nonce, nonce),
        })
    }

    if state.exist(authority) {
        state.add_refund(PER_EMPTY_ACCOUNT_COST - PER_AUTH_BASE_COST);
    }
    state.set_nonce(authority, next_nonce);
    let code = if auth.address.is_zero() { Bytes::new() } else { delegation_code(auth.address) };
    state.set_code(authority, code);
    Ok(())
}
