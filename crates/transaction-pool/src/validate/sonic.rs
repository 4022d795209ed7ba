//! Sonic transaction validator.

use crate::{
    error::InvalidPoolTransactionError, LocalTransactionConfig, TransactionOrigin,
    TransactionValidationOutcome, TransactionValidator, ValidPoolTransaction,
    DEFAULT_MAX_TX_INPUT_BYTES,
};
use alloy_primitives::{Address, BlockNumber, U256};
use parking_lot::RwLock;
use sonic_chainspec::{ChainSpec, EvmRules, Upgrades};
use sonic_evm::{floor_data_gas, intrinsic_gas, EvmHeader};
use sonic_gas_subsidies::{is_sponsorship_request, SubsidyChecker};
use sonic_primitives::{
    constants::MAX_INIT_CODE_SIZE, gas_price::pool_min_fee_cap, GotExpected, TransactionSigned,
    TxType,
};
use sonic_state::StateReader;
use std::{fmt, sync::Arc};
use tracing::{debug, trace};

/// Validator for Sonic transactions.
pub struct SonicTransactionValidator<S, C> {
    /// The type that performs the actual validation.
    inner: Arc<SonicTransactionValidatorInner<S, C>>,
}

impl<S, C> Clone for SonicTransactionValidator<S, C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S, C> fmt::Debug for SonicTransactionValidator<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonicTransactionValidator").field("inner", &self.inner).finish()
    }
}

impl<S, C> SonicTransactionValidator<S, C>
where
    S: StateReader,
    C: SubsidyChecker,
{
    /// Validates a single transaction.
    ///
    /// See also [`TransactionValidator::validate_transaction`]
    pub fn validate_one(
        &self,
        origin: TransactionOrigin,
        transaction: TransactionSigned,
    ) -> TransactionValidationOutcome {
        self.inner.validate_one(origin, transaction)
    }

    /// Validates all given transactions.
    ///
    /// Returns all outcomes for the given transactions in the same order.
    ///
    /// See also [`Self::validate_one`]
    pub fn validate_all(
        &self,
        transactions: Vec<(TransactionOrigin, TransactionSigned)>,
    ) -> Vec<TransactionValidationOutcome> {
        transactions.into_iter().map(|(origin, tx)| self.validate_one(origin, tx)).collect()
    }

    /// The checker consulted for sponsorship requests.
    pub fn subsidies(&self) -> &C {
        &self.inner.subsidies
    }

    /// The chain spec.
    pub fn chain_spec(&self) -> &Arc<ChainSpec> {
        &self.inner.chain_spec
    }
}

impl<S, C> TransactionValidator for SonicTransactionValidator<S, C>
where
    S: StateReader,
    C: SubsidyChecker,
{
    fn validate_transaction(
        &self,
        origin: TransactionOrigin,
        transaction: TransactionSigned,
    ) -> TransactionValidationOutcome {
        self.validate_one(origin, transaction)
    }

    fn on_new_head_block(&self, next: &EvmHeader) {
        self.inner.on_new_head_block(next)
    }
}

/// Block the transactions are validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ValidationHead {
    number: BlockNumber,
    /// Unknown until the first head was seen.
    base_fee: Option<U256>,
    gas_limit: u64,
}

impl Default for ValidationHead {
    fn default() -> Self {
        Self { number: 0, base_fee: None, gas_limit: u64::MAX }
    }
}

impl From<&EvmHeader> for ValidationHead {
    fn from(header: &EvmHeader) -> Self {
        Self { number: header.number, base_fee: Some(header.base_fee), gas_limit: header.gas_limit }
    }
}

/// What the phases learned about an admitted transaction.
#[derive(Debug)]
struct Admission {
    sender: Address,
    sponsored: bool,
    is_local: bool,
    balance: U256,
    state_nonce: u64,
}

struct SonicTransactionValidatorInner<S, C> {
    /// Spec of the chain
    chain_spec: Arc<ChainSpec>,
    /// Latest state, source of nonces and balances.
    state: S,
    /// Decides whether sponsorship requests are paid for.
    subsidies: C,
    /// The block transactions are validated for.
    head: RwLock<ValidationHead>,
    /// Minimum tip of non-local transactions.
    minimum_priority_fee: U256,
    /// How to handle [`TransactionOrigin::Local`] transactions.
    local_transactions_config: LocalTransactionConfig,
    /// Maximum encoded size of a single transaction.
    max_tx_input_bytes: usize,
}

impl<S, C> fmt::Debug for SonicTransactionValidatorInner<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonicTransactionValidatorInner")
            .field("chain_spec", &self.chain_spec)
            .field("head", &*self.head.read())
            .field("minimum_priority_fee", &self.minimum_priority_fee)
            .field("local_transactions_config", &self.local_transactions_config)
            .field("max_tx_input_bytes", &self.max_tx_input_bytes)
            .finish_non_exhaustive()
    }
}

impl<S, C> SonicTransactionValidatorInner<S, C>
where
    S: StateReader,
    C: SubsidyChecker,
{
    fn validate_one(
        &self,
        origin: TransactionOrigin,
        transaction: TransactionSigned,
    ) -> TransactionValidationOutcome {
        match self.validate_phases(origin, &transaction) {
            Ok(admission) => {
                trace!(
                    target: "txpool",
                    hash = ?transaction.hash(),
                    sender = %admission.sender,
                    sponsored = admission.sponsored,
                    "Validated transaction"
                );
                let propagate = match origin {
                    TransactionOrigin::External => true,
                    TransactionOrigin::Local => {
                        self.local_transactions_config.propagate_local_transactions
                    }
                };
                TransactionValidationOutcome::Valid {
                    balance: admission.balance,
                    state_nonce: admission.state_nonce,
                    transaction: ValidPoolTransaction {
                        transaction,
                        sender: admission.sender,
                        origin,
                        is_local: admission.is_local,
                        sponsored: admission.sponsored,
                    },
                    propagate,
                }
            }
            Err(err) => {
                trace!(target: "txpool", hash = ?transaction.hash(), %err, "Rejected transaction");
                TransactionValidationOutcome::Invalid(transaction, err)
            }
        }
    }

    /// Runs the phases in order, the first failing one decides the error.
    fn validate_phases(
        &self,
        origin: TransactionOrigin,
        tx: &TransactionSigned,
    ) -> Result<Admission, InvalidPoolTransactionError> {
        let head = *self.head.read();
        let upgrades = self.chain_spec.upgrades_at(head.number);

        let (sender, sponsored) = self.validate_network_rules(tx, &head, upgrades)?;
        ensure_static_rules(tx, self.max_tx_input_bytes)?;
        let is_local = self.validate_pool_rules(origin, tx, sender, sponsored)?;
        let (balance, state_nonce) = self.validate_state(tx, sender)?;

        Ok(Admission { sender, sponsored, is_local, balance, state_nonce })
    }

    /// Checks the rules of the active upgrades. Returns the sender and whether the transaction
    /// is a covered sponsorship request.
    fn validate_network_rules(
        &self,
        tx: &TransactionSigned,
        head: &ValidationHead,
        upgrades: Upgrades,
    ) -> Result<(Address, bool), InvalidPoolTransactionError> {
        let rules = upgrades.rules();
        ensure_tx_type(tx.tx_type(), &rules)?;

        if rules.is_shanghai {
            ensure_max_init_code_size(tx, MAX_INIT_CODE_SIZE)?;
        }

        let max_gas = head.gas_limit.min(self.chain_spec.max_event_gas);
        if tx.gas_limit() > max_gas {
            return Err(InvalidPoolTransactionError::ExceedsGasLimit(tx.gas_limit(), max_gas))
        }

        if tx.is_internal() {
            return Err(InvalidPoolTransactionError::InternalTransaction)
        }
        let sender = self.chain_spec.signer_at(head.number).sender_cached(tx)?;

        ensure_intrinsic_gas(tx, &rules)?;
        if rules.is_eip7623() {
            ensure_floor_data_gas(tx)?;
        }

        // sponsorship requests offer no price, a fund has to pay instead
        let sponsored = upgrades.gas_subsidies && is_sponsorship_request(tx);
        if sponsored {
            if !self.subsidies.is_covered(tx, sender)? {
                return Err(InvalidPoolTransactionError::SponsorshipRejected)
            }
        } else if let Some(base_fee) = head.base_fee {
            if tx.max_fee_per_gas() < pool_min_fee_cap(Some(base_fee)) {
                return Err(InvalidPoolTransactionError::Underpriced)
            }
        }

        Ok((sender, sponsored))
    }

    /// Enforces the minimum tip on non-local transactions. Returns whether the transaction is
    /// local.
    fn validate_pool_rules(
        &self,
        origin: TransactionOrigin,
        tx: &TransactionSigned,
        sender: Address,
        sponsored: bool,
    ) -> Result<bool, InvalidPoolTransactionError> {
        let is_local = self.local_transactions_config.is_local(origin, &sender);
        if !is_local && !sponsored && tx.max_priority_fee_per_gas() < self.minimum_priority_fee {
            return Err(InvalidPoolTransactionError::Underpriced)
        }
        Ok(is_local)
    }

    /// Checks nonce and balance of the sender. Returns both.
    fn validate_state(
        &self,
        tx: &TransactionSigned,
        sender: Address,
    ) -> Result<(U256, u64), InvalidPoolTransactionError> {
        let state_nonce = self.state.account_nonce(sender);
        if tx.nonce() < state_nonce {
            return Err(InvalidPoolTransactionError::NonceTooLow {
                tx: tx.nonce(),
                state: state_nonce,
            })
        }

        let balance = self.state.account_balance(sender);
        let cost = tx.cost();
        if balance < cost {
            return Err(InvalidPoolTransactionError::InsufficientFunds(GotExpected::new(
                balance, cost,
            )))
        }

        Ok((balance, state_nonce))
    }

    fn on_new_head_block(&self, next: &EvmHeader) {
        debug!(
            target: "txpool",
            number = next.number,
            base_fee = %next.base_fee,
            gas_limit = next.gas_limit,
            "Updated validation head"
        );
        *self.head.write() = next.into();
    }
}

/// A builder for [`SonicTransactionValidator`]
#[derive(Debug, Clone)]
pub struct SonicTransactionValidatorBuilder {
    chain_spec: Arc<ChainSpec>,
    head: ValidationHead,
    /// Minimum tip of non-local transactions.
    minimum_priority_fee: U256,
    /// How to handle [`TransactionOrigin::Local`] transactions.
    local_transactions_config: LocalTransactionConfig,
    /// Max size in bytes of a single transaction allowed
    max_tx_input_bytes: usize,
}

impl SonicTransactionValidatorBuilder {
    /// Creates a new builder for the given [`ChainSpec`].
    ///
    /// Until a head is set, transactions are validated under the rules of block zero without a
    /// base fee.
    pub fn new(chain_spec: Arc<ChainSpec>) -> Self {
        Self {
            chain_spec,
            head: ValidationHead::default(),
            minimum_priority_fee: U256::ZERO,
            local_transactions_config: LocalTransactionConfig::default(),
            max_tx_input_bytes: DEFAULT_MAX_TX_INPUT_BYTES,
        }
    }

    /// Sets the block transactions are validated for.
    pub fn with_head(mut self, next: &EvmHeader) -> Self {
        self.head = next.into();
        self
    }

    /// Sets a minimum priority fee that's enforced for acceptance into the pool.
    pub const fn with_minimum_priority_fee(mut self, minimum_priority_fee: U256) -> Self {
        self.minimum_priority_fee = minimum_priority_fee;
        self
    }

    /// Whether to allow exemptions for local transaction exemptions.
    pub fn set_local_transactions_config(
        mut self,
        local_transactions_config: LocalTransactionConfig,
    ) -> Self {
        self.local_transactions_config = local_transactions_config;
        self
    }

    /// Sets a max size in bytes of a single transaction allowed into the pool
    pub const fn with_max_tx_input_bytes(mut self, max_tx_input_bytes: usize) -> Self {
        self.max_tx_input_bytes = max_tx_input_bytes;
        self
    }

    /// Builds the [`SonicTransactionValidator`].
    pub fn build<S, C>(self, state: S, subsidies: C) -> SonicTransactionValidator<S, C>
    where
        S: StateReader,
        C: SubsidyChecker,
    {
        let Self {
            chain_spec,
            head,
            minimum_priority_fee,
            local_transactions_config,
            max_tx_input_bytes,
        } = self;

        let inner = SonicTransactionValidatorInner {
            chain_spec,
            state,
            subsidies,
            head: RwLock::new(head),
            minimum_priority_fee,
            local_transactions_config,
            max_tx_input_bytes,
        };

        SonicTransactionValidator { inner: Arc::new(inner) }
    }
}

/// Ensures the active upgrades enable the transaction type.
fn ensure_tx_type(tx_type: TxType, rules: &EvmRules) -> Result<(), InvalidPoolTransactionError> {
    let enabled = match tx_type {
        TxType::Legacy => true,
        TxType::Eip2930 => rules.is_eip2718(),
        TxType::Eip1559 => rules.is_eip2718() && rules.is_eip1559(),
        TxType::Eip4844 => rules.is_eip2718() && rules.is_eip4844(),
        TxType::Eip7702 => rules.is_eip2718() && rules.is_eip7702(),
    };
    if !enabled {
        return Err(InvalidPoolTransactionError::TxTypeNotSupported(tx_type))
    }
    Ok(())
}

/// Ensure that the code size is not greater than `max_init_code_size`.
pub fn ensure_max_init_code_size(
    transaction: &TransactionSigned,
    max_init_code_size: usize,
) -> Result<(), InvalidPoolTransactionError> {
    let size = transaction.input().len();
    if transaction.is_create() && size > max_init_code_size {
        Err(InvalidPoolTransactionError::ExceedsMaxInitCodeSize(size, max_init_code_size))
    } else {
        Ok(())
    }
}

/// Ensures that gas limit of the transaction exceeds the intrinsic gas of the transaction.
///
/// See also [`intrinsic_gas`]
pub fn ensure_intrinsic_gas(
    transaction: &TransactionSigned,
    rules: &EvmRules,
) -> Result<(), InvalidPoolTransactionError> {
    let gas_limit = transaction.gas_limit();
    let authorizations = transaction.authorization_list().map_or(0, |list| list.len());
    let intrinsic = intrinsic_gas(
        transaction.input(),
        transaction.access_list(),
        authorizations,
        transaction.is_create(),
        rules,
    )
    .unwrap_or(u64::MAX);

    if gas_limit < intrinsic {
        return Err(InvalidPoolTransactionError::IntrinsicGasTooLow(GotExpected::new(
            gas_limit, intrinsic,
        )))
    }
    Ok(())
}

/// Ensures the gas limit covers the EIP-7623 floor of the calldata.
fn ensure_floor_data_gas(
    transaction: &TransactionSigned,
) -> Result<(), InvalidPoolTransactionError> {
    let gas_limit = transaction.gas_limit();
    let floor = floor_data_gas(transaction.input()).unwrap_or(u64::MAX);
    if gas_limit < floor {
        return Err(InvalidPoolTransactionError::FloorDataGasTooLow(GotExpected::new(
            gas_limit, floor,
        )))
    }
    Ok(())
}

/// Checks that do not depend on the chain: caps, blob and authorization lists, size.
///
/// Value and fee caps are unsigned 256-bit integers, they can be neither negative nor wider.
fn ensure_static_rules(
    transaction: &TransactionSigned,
    max_tx_input_bytes: usize,
) -> Result<(), InvalidPoolTransactionError> {
    if transaction.max_priority_fee_per_gas() > transaction.max_fee_per_gas() {
        return Err(InvalidPoolTransactionError::TipAboveFeeCap)
    }
    if transaction.has_blobs() {
        return Err(InvalidPoolTransactionError::NonEmptyBlobTx)
    }
    if transaction.authorization_list().is_some_and(|list| list.is_empty()) {
        return Err(InvalidPoolTransactionError::EmptyAuthorizations)
    }

    // Reject transactions over defined size to prevent DOS attacks
    let size = transaction.size();
    if size > max_tx_input_bytes {
        return Err(InvalidPoolTransactionError::OversizedData(size, max_tx_input_bytes))
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, TxKind, B256};
    use assert_matches::assert_matches;
    use sonic_gas_subsidies::SubsidyError;
    use sonic_primitives::{
        test_utils::{sign_authorization, TestKey},
        Signature, SignatureError, Transaction, TxEip1559, TxEip4844, TxEip7702, TxLegacy,
    };
    use sonic_state::{BalanceChangeReason, MemoryStateDb, SharedState, StateDb};

    const CHAIN_ID: u64 = 146;

    /// Answers every sponsorship request the same way.
    #[derive(Debug)]
    struct FixedChecker(Result<bool, SubsidyError>);

    impl SubsidyChecker for FixedChecker {
        fn is_covered(&self, _: &TransactionSigned, _: Address) -> Result<bool, SubsidyError> {
            self.0.clone()
        }
    }

    fn chain_spec(upgrades: Upgrades) -> Arc<ChainSpec> {
        Arc::new(ChainSpec::builder(CHAIN_ID).upgrades(upgrades).build())
    }

    fn head(base_fee: u64) -> EvmHeader {
        EvmHeader {
            number: 1,
            gas_limit: 30_000_000,
            base_fee: U256::from(base_fee),
            ..Default::default()
        }
    }

    fn funded_state(key: &TestKey, nonce: u64) -> SharedState {
        let mut state = MemoryStateDb::new();
        state.add_balance(key.address(), U256::from(10u128.pow(18)), BalanceChangeReason::Genesis);
        state.set_nonce(key.address(), nonce);
        state.finalise(true);
        SharedState::new(state)
    }

    fn new_validator(
        upgrades: Upgrades,
        key: &TestKey,
        checker: Result<bool, SubsidyError>,
    ) -> SonicTransactionValidator<SharedState, FixedChecker> {
        SonicTransactionValidatorBuilder::new(chain_spec(upgrades))
            .with_head(&head(100))
            .build(funded_state(key, 0), FixedChecker(checker))
    }

    fn legacy(key: &TestKey, gas_price: u64) -> TransactionSigned {
        key.sign(Transaction::Legacy(TxLegacy {
            chain_id: Some(CHAIN_ID),
            gas_price: U256::from(gas_price),
            gas_limit: 21_000,
            to: TxKind::Call(Address::with_last_byte(0x42)),
            ..Default::default()
        }))
    }

    fn dynamic(key: &TestKey, fee_cap: u64, tip_cap: u64) -> TransactionSigned {
        key.sign(Transaction::Eip1559(TxEip1559 {
            chain_id: CHAIN_ID,
            gas_limit: 21_000,
            max_fee_per_gas: U256::from(fee_cap),
            max_priority_fee_per_gas: U256::from(tip_cap),
            to: TxKind::Call(Address::with_last_byte(0x42)),
            ..Default::default()
        }))
    }

    fn rejection(outcome: TransactionValidationOutcome) -> InvalidPoolTransactionError {
        match outcome {
            TransactionValidationOutcome::Invalid(_, err) => err,
            outcome => panic!("expected invalid transaction, got {outcome:?}"),
        }
    }

    #[test]
    fn accepts_priced_transaction() {
        let key = TestKey::new(1);
        let validator = new_validator(Upgrades::sonic(), &key, Ok(false));
        let tx = legacy(&key, 105);

        let outcome = validator.validate_one(TransactionOrigin::External, tx.clone());
        assert_matches!(
            outcome,
            TransactionValidationOutcome::Valid {
                state_nonce: 0,
                propagate: true,
                transaction,
                ..
            } if transaction.transaction == tx &&
                transaction.sender == key.address() &&
                !transaction.sponsored &&
                !transaction.is_local
        );
    }

    #[test]
    fn fee_cap_below_pool_minimum() {
        let key = TestKey::new(1);
        let validator = new_validator(Upgrades::sonic(), &key, Ok(false));

        // base fee 100, pool minimum 105
        let err = rejection(validator.validate_one(TransactionOrigin::Local, legacy(&key, 104)));
        assert!(err.is_underpriced());
    }

    #[test]
    fn no_fee_floor_without_base_fee() {
        let key = TestKey::new(1);
        let validator = SonicTransactionValidatorBuilder::new(chain_spec(Upgrades::sonic()))
            .build(funded_state(&key, 0), FixedChecker(Ok(false)));
        assert!(validator.validate_one(TransactionOrigin::External, legacy(&key, 0)).is_valid());
    }

    #[test]
    fn typed_transactions_need_upgrades() {
        let key = TestKey::new(1);
        let validator = new_validator(Upgrades::default(), &key, Ok(false));
        let tx = dynamic(&key, 200, 1);
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert_eq!(err, InvalidPoolTransactionError::TxTypeNotSupported(TxType::Eip1559));

        let validator = new_validator(Upgrades::sonic(), &key, Ok(false));
        let tx = key.sign(Transaction::Eip7702(TxEip7702 {
            chain_id: CHAIN_ID,
            gas_limit: 100_000,
            max_fee_per_gas: U256::from(200),
            authorization_list: vec![sign_authorization(&key, U256::ZERO, Address::ZERO, 1)],
            ..Default::default()
        }));
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert_eq!(err, InvalidPoolTransactionError::TxTypeNotSupported(TxType::Eip7702));
    }

    #[test]
    fn gas_limit_capped_by_block_and_max_event_gas() {
        let key = TestKey::new(1);
        let spec = Arc::new(
            ChainSpec::builder(CHAIN_ID).upgrades(Upgrades::sonic()).max_event_gas(50_000).build(),
        );
        let validator = SonicTransactionValidatorBuilder::new(spec)
            .with_head(&head(100))
            .build(funded_state(&key, 0), FixedChecker(Ok(false)));
        let tx = key.sign(Transaction::Legacy(TxLegacy {
            chain_id: Some(CHAIN_ID),
            gas_price: U256::from(200),
            gas_limit: 50_001,
            ..Default::default()
        }));
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert_eq!(err, InvalidPoolTransactionError::ExceedsGasLimit(50_001, 50_000));
    }

    #[test]
    fn init_code_limit() {
        let key = TestKey::new(1);
        let validator = new_validator(Upgrades::sonic(), &key, Ok(false));
        let tx = key.sign(Transaction::Legacy(TxLegacy {
            chain_id: Some(CHAIN_ID),
            gas_price: U256::from(200),
            gas_limit: 1_000_000,
            to: TxKind::Create,
            input: Bytes::from(vec![0; MAX_INIT_CODE_SIZE + 1]),
            ..Default::default()
        }));
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert_eq!(
            err,
            InvalidPoolTransactionError::ExceedsMaxInitCodeSize(
                MAX_INIT_CODE_SIZE + 1,
                MAX_INIT_CODE_SIZE
            )
        );
    }

    #[test]
    fn malformed_signature() {
        let key = TestKey::new(1);
        let validator = new_validator(Upgrades::sonic(), &key, Ok(false));
        let (tx, _) = legacy(&key, 200).into_parts();
        let tx = TransactionSigned::new(tx, Signature { v: 3, r: U256::from(1), s: U256::from(2) });

        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert_eq!(
            err,
            InvalidPoolTransactionError::InvalidSender(SignatureError::InvalidSignatureValues)
        );
        assert_eq!(err.to_string(), "invalid sender: invalid transaction v, r, s values");
    }

    #[test]
    fn internal_transactions_are_rejected() {
        let key = TestKey::new(1);
        let validator = new_validator(Upgrades::sonic(), &key, Ok(false));
        let tx = TransactionSigned::new_internal(key.address(), TxLegacy::default());
        let err = rejection(validator.validate_one(TransactionOrigin::Local, tx));
        assert_eq!(err, InvalidPoolTransactionError::InternalTransaction);
    }

    #[test]
    fn intrinsic_and_floor_gas() {
        let key = TestKey::new(1);
        let calldata = Transaction::Legacy(TxLegacy {
            chain_id: Some(CHAIN_ID),
            gas_price: U256::from(200),
            gas_limit: 40_000,
            to: TxKind::Call(Address::with_last_byte(0x42)),
            input: Bytes::from(vec![1; 1_000]),
            ..Default::default()
        });

        // 21000 + 1000 * 16 = 37000 intrinsic, 21000 + 4000 * 10 = 61000 floor
        let validator = new_validator(Upgrades::sonic(), &key, Ok(false));
        assert!(validator
            .validate_one(TransactionOrigin::External, key.sign(calldata.clone()))
            .is_valid());

        let validator = new_validator(Upgrades::allegro(), &key, Ok(false));
        let tx = key.sign(calldata);
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert_eq!(
            err,
            InvalidPoolTransactionError::FloorDataGasTooLow(GotExpected::new(40_000, 61_000))
        );

        let mut short = legacy(&key, 200).into_parts().0;
        if let Transaction::Legacy(tx) = &mut short {
            tx.gas_limit = 20_999;
        }
        let err = rejection(validator.validate_one(TransactionOrigin::External, key.sign(short)));
        assert_eq!(
            err,
            InvalidPoolTransactionError::IntrinsicGasTooLow(GotExpected::new(20_999, 21_000))
        );
    }

    #[test]
    fn static_rules() {
        let key = TestKey::new(1);
        let validator = new_validator(Upgrades::allegro(), &key, Ok(false));

        let tx = dynamic(&key, 200, 300);
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert_eq!(err, InvalidPoolTransactionError::TipAboveFeeCap);

        let blob = key.sign(Transaction::Eip4844(TxEip4844 {
            chain_id: CHAIN_ID,
            gas_limit: 21_000,
            max_fee_per_gas: U256::from(200),
            max_fee_per_blob_gas: U256::from(1),
            blob_versioned_hashes: vec![B256::repeat_byte(1)],
            ..Default::default()
        }));
        let err = rejection(validator.validate_one(TransactionOrigin::External, blob));
        assert_eq!(err, InvalidPoolTransactionError::NonEmptyBlobTx);

        let set_code = key.sign(Transaction::Eip7702(TxEip7702 {
            chain_id: CHAIN_ID,
            gas_limit: 21_000,
            max_fee_per_gas: U256::from(200),
            ..Default::default()
        }));
        let err = rejection(validator.validate_one(TransactionOrigin::External, set_code));
        assert_eq!(err, InvalidPoolTransactionError::EmptyAuthorizations);
    }

    #[test]
    fn oversized_data() {
        let key = TestKey::new(1);
        let validator = SonicTransactionValidatorBuilder::new(chain_spec(Upgrades::sonic()))
            .with_max_tx_input_bytes(100)
            .build(funded_state(&key, 0), FixedChecker(Ok(false)));
        let tx = key.sign(Transaction::Legacy(TxLegacy {
            chain_id: Some(CHAIN_ID),
            gas_limit: 100_000,
            to: TxKind::Call(Address::with_last_byte(0x42)),
            input: Bytes::from(vec![1; 200]),
            ..Default::default()
        }));
        let size = tx.size();
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert_eq!(err, InvalidPoolTransactionError::OversizedData(size, 100));
    }

    #[test]
    fn minimum_tip_spares_locals() {
        let key = TestKey::new(1);
        let build = |config: LocalTransactionConfig| {
            SonicTransactionValidatorBuilder::new(chain_spec(Upgrades::sonic()))
                .with_head(&head(100))
                .with_minimum_priority_fee(U256::from(10))
                .set_local_transactions_config(config)
                .build(funded_state(&key, 0), FixedChecker(Ok(false)))
        };
        let tx = dynamic(&key, 200, 5);

        let validator = build(LocalTransactionConfig::default());
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx.clone()));
        assert!(err.is_underpriced());
        assert!(validator.validate_one(TransactionOrigin::Local, tx.clone()).is_valid());
        let tipped = dynamic(&key, 200, 10);
        assert!(validator.validate_one(TransactionOrigin::External, tipped).is_valid());

        let mut config = LocalTransactionConfig::default();
        config.local_addresses.insert(key.address());
        let validator = build(config.clone());
        assert_matches!(
            validator.validate_one(TransactionOrigin::External, tx.clone()),
            TransactionValidationOutcome::Valid { transaction, .. } if transaction.is_local
        );

        config.no_exemptions = true;
        let validator = build(config);
        let err = rejection(validator.validate_one(TransactionOrigin::Local, tx));
        assert!(err.is_underpriced());
    }

    #[test]
    fn state_rules() {
        let key = TestKey::new(1);
        let validator = SonicTransactionValidatorBuilder::new(chain_spec(Upgrades::sonic()))
            .with_head(&head(100))
            .build(funded_state(&key, 5), FixedChecker(Ok(false)));
        let with_nonce = |nonce: u64, value: U256| {
            key.sign(Transaction::Legacy(TxLegacy {
                chain_id: Some(CHAIN_ID),
                nonce,
                gas_price: U256::from(200),
                gas_limit: 21_000,
                to: TxKind::Call(Address::with_last_byte(0x42)),
                value,
                ..Default::default()
            }))
        };

        let tx = with_nonce(4, U256::ZERO);
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert_eq!(err, InvalidPoolTransactionError::NonceTooLow { tx: 4, state: 5 });

        // future nonces are admitted
        let tx = with_nonce(7, U256::ZERO);
        let outcome = validator.validate_one(TransactionOrigin::External, tx);
        assert_matches!(outcome, TransactionValidationOutcome::Valid { state_nonce: 5, .. });

        let balance = U256::from(10u128.pow(18));
        let cost = balance + U256::from(1);
        let value = cost - U256::from(21_000 * 200);
        let tx = with_nonce(5, value);
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert_eq!(
            err,
            InvalidPoolTransactionError::InsufficientFunds(GotExpected::new(balance, cost))
        );
    }

    #[test]
    fn first_failing_phase_decides() {
        let key = TestKey::new(1);
        let validator = SonicTransactionValidatorBuilder::new(chain_spec(Upgrades::sonic()))
            .with_head(&head(100))
            .build(funded_state(&key, 5), FixedChecker(Ok(false)));
        let tx = key.sign(Transaction::Eip1559(TxEip1559 {
            chain_id: CHAIN_ID,
            gas_limit: 21_000,
            max_fee_per_gas: U256::from(100),
            max_priority_fee_per_gas: U256::from(300),
            to: TxKind::Call(Address::with_last_byte(0x42)),
            ..Default::default()
        }));

        // underpriced, tip above fee cap and nonce too low: the network rules fail first
        let err = rejection(validator.validate_one(TransactionOrigin::External, tx));
        assert!(err.is_underpriced());
    }

    #[test]
    fn sponsorship_requests() {
        let key = TestKey::new(1);
        let upgrades = Upgrades::allegro().with_gas_subsidies();

        let outcome = new_validator(upgrades, &key, Ok(true))
            .validate_one(TransactionOrigin::External, legacy(&key, 0));
        assert_matches!(
            outcome,
            TransactionValidationOutcome::Valid { transaction, .. } if transaction.sponsored
        );

        let err = rejection(
            new_validator(upgrades, &key, Ok(false))
                .validate_one(TransactionOrigin::External, legacy(&key, 0)),
        );
        assert_eq!(err, InvalidPoolTransactionError::SponsorshipRejected);
        assert!(!err.is_underpriced());

        let err = rejection(
            new_validator(upgrades, &key, Err(SubsidyError::RegistryAbsent))
                .validate_one(TransactionOrigin::External, legacy(&key, 0)),
        );
        assert_eq!(err, InvalidPoolTransactionError::RegistryAbsent);

        // without the upgrade a zero price is just too low
        let err = rejection(
            new_validator(Upgrades::allegro(), &key, Ok(true))
                .validate_one(TransactionOrigin::External, legacy(&key, 0)),
        );
        assert!(err.is_underpriced());
    }

    #[test]
    fn sponsorship_requests_skip_minimum_tip() {
        let key = TestKey::new(1);
        let spec = chain_spec(Upgrades::allegro().with_gas_subsidies());
        let validator = SonicTransactionValidatorBuilder::new(spec)
            .with_head(&head(100))
            .with_minimum_priority_fee(U256::from(10))
            .build(funded_state(&key, 0), FixedChecker(Ok(true)));
        assert!(validator.validate_one(TransactionOrigin::External, legacy(&key, 0)).is_valid());
    }

    #[test]
    fn head_updates_rules() {
        let key = TestKey::new(1);
        let spec = Arc::new(
            ChainSpec::builder(CHAIN_ID)
                .upgrades(Upgrades::sonic())
                .upgrades_at(10, Upgrades::allegro())
                .build(),
        );
        let validator = SonicTransactionValidatorBuilder::new(spec)
            .build(funded_state(&key, 0), FixedChecker(Ok(false)));
        let tx = key.sign(Transaction::Eip7702(TxEip7702 {
            chain_id: CHAIN_ID,
            gas_limit: 100_000,
            max_fee_per_gas: U256::from(200),
            authorization_list: vec![sign_authorization(&key, U256::ZERO, Address::ZERO, 1)],
            ..Default::default()
        }));

        let err = rejection(validator.validate_one(TransactionOrigin::External, tx.clone()));
        assert_eq!(err, InvalidPoolTransactionError::TxTypeNotSupported(TxType::Eip7702));

        validator.on_new_head_block(&EvmHeader { number: 10, gas_limit: 1_000_000, ..head(100) });
        assert!(validator.validate_one(TransactionOrigin::External, tx).is_valid());
    }
}
