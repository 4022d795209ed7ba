//! Deterministic keys and signing helpers for tests.

use crate::{public_key_to_address, Signature, SignedAuthorization, Transaction, TransactionSigned};
use alloy_primitives::{Address, U256};
use secp256k1::{Message, SecretKey, SECP256K1};

/// A secp256k1 key derived from a seed byte.
#[derive(Debug, Clone, Copy)]
pub struct TestKey {
    secret: SecretKey,
    address: Address,
}

impl TestKey {
    /// Creates the key `[seed; 32]`. `seed` must not be zero.
    pub fn new(seed: u8) -> Self {
        let secret = SecretKey::from_slice(&[seed; 32]).expect("seed is a valid secret key");
        let address = public_key_to_address(secret.public_key(SECP256K1));
        Self { secret, address }
    }

    /// Address controlled by the key.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Signs `tx`.
    pub fn sign(&self, tx: Transaction) -> TransactionSigned {
        sign_tx(self, tx)
    }
}

/// Signs `tx` with `key`, producing the `v` encoding of the transaction type.
pub fn sign_tx(key: &TestKey, tx: Transaction) -> TransactionSigned {
    let hash = tx.signature_hash();
    let (recovery_id, compact) = SECP256K1
        .sign_ecdsa_recoverable(&Message::from_digest(hash.0), &key.secret)
        .serialize_compact();
    let parity = recovery_id.to_i32() as u64;
    let v = match &tx {
        Transaction::Legacy(legacy) => match legacy.chain_id {
            Some(chain_id) => 35 + 2 * chain_id + parity,
            None => 27 + parity,
        },
        _ => parity,
    };
    let signature = Signature {
        v,
        r: U256::from_be_slice(&compact[..32]),
        s: U256::from_be_slice(&compact[32..]),
    };
    TransactionSigned::new(tx, signature)
}

/// Signs an EIP-7702 authorization delegating `key`'s account to `address`.
pub fn sign_authorization(
    key: &TestKey,
    chain_id: U256,
    address: Address,
    nonce: u64,
) -> SignedAuthorization {
    let mut auth = SignedAuthorization { chain_id, address, nonce, ..Default::default() };
    let (recovery_id, compact) = SECP256K1
        .sign_ecdsa_recoverable(&Message::from_digest(auth.signature_hash().0), &key.secret)
        .serialize_compact();
    auth.y_parity = recovery_id.to_i32() as u8;
    auth.r = U256::from_be_slice(&compact[..32]);
    auth.s = U256::from_be_slice(&compact[32..]);
    auth
}
