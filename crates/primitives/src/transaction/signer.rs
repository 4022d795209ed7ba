use super::{SignatureError, SignedAuthorization, TransactionSigned, TxType};
use alloy_primitives::{keccak256, Address, B256, U256};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SECP256K1,
};

/// Order of the secp256k1 curve.
const SECP256K1N: U256 = U256::from_limbs([
    0xBFD25E8CD0364141,
    0xBAAEDCE6AF48A03B,
    0xFFFFFFFFFFFFFFFE,
    0xFFFFFFFFFFFFFFFF,
]);

/// Half of the secp256k1 curve order, the upper bound of `s` since Homestead.
const SECP256K1N_HALF: U256 = U256::from_limbs([
    0xDFE92F46681B20A0,
    0x5D576E7357A4501D,
    0xFFFFFFFFFFFFFFFF,
    0x7FFFFFFFFFFFFFFF,
]);

/// Transaction types a signer accepts, growing with each network upgrade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignerVariant {
    /// Legacy transactions, replay protected or not.
    #[default]
    Eip155,
    /// Adds access list transactions.
    Berlin,
    /// Adds dynamic fee transactions.
    London,
    /// Adds blob transactions.
    Cancun,
    /// Adds set-code transactions.
    Prague,
}

impl SignerVariant {
    /// Returns true if transactions of type `tx_type` can be signed under this variant.
    pub const fn supports(&self, tx_type: TxType) -> bool {
        match tx_type {
            TxType::Legacy => true,
            TxType::Eip2930 => {
                matches!(self, Self::Berlin | Self::London | Self::Cancun | Self::Prague)
            }
            TxType::Eip1559 => matches!(self, Self::London | Self::Cancun | Self::Prague),
            TxType::Eip4844 => matches!(self, Self::Cancun | Self::Prague),
            TxType::Eip7702 => matches!(self, Self::Prague),
        }
    }
}

/// Derives transaction senders for one chain under one set of signing rules.
///
/// Two signers are equal iff they have the same chain id and variant, which is what the
/// [`SenderCache`](super::SenderCache) compares to reuse a recovered sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainSigner {
    chain_id: u64,
    variant: SignerVariant,
}

impl ChainSigner {
    /// Creates a signer for `chain_id`.
    pub const fn new(chain_id: u64, variant: SignerVariant) -> Self {
        Self { chain_id, variant }
    }

    /// Chain id of the signer.
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Variant of the signer.
    pub const fn variant(&self) -> SignerVariant {
        self.variant
    }

    /// Derives the sender of `tx`.
    ///
    /// Internal transactions are not recovered, their sender is read from the marker signature.
    pub fn sender(&self, tx: &TransactionSigned) -> Result<Address, SignatureError> {
        let signature = tx.signature();
        if signature.is_internal() {
            return Ok(signature.internal_sender())
        }

        let tx_type = tx.tx_type();
        if !self.variant.supports(tx_type) {
            return Err(SignatureError::TxTypeNotSupported(tx_type))
        }

        let odd_y_parity = if tx_type == TxType::Legacy {
            match signature.v {
                27 | 28 => signature.v == 28,
                v if v >= 35 => {
                    let chain_id = (v - 35) / 2;
                    self.ensure_chain_id(chain_id)?;
                    (v - 35) % 2 == 1
                }
                _ => return Err(SignatureError::InvalidSignatureValues),
            }
        } else {
            // typed transactions always carry a chain id
            self.ensure_chain_id(tx.chain_id().unwrap_or_default())?;
            match signature.v {
                0 => false,
                1 => true,
                _ => return Err(SignatureError::InvalidSignatureValues),
            }
        };

        if !valid_signature_values(signature.r, signature.s) {
            return Err(SignatureError::InvalidSignatureValues)
        }

        recover_signer(tx.signature_hash(), signature.r, signature.s, odd_y_parity)
    }

    const fn ensure_chain_id(&self, chain_id: u64) -> Result<(), SignatureError> {
        if chain_id != self.chain_id {
            return Err(SignatureError::InvalidChainId { got: chain_id, expected: self.chain_id })
        }
        Ok(())
    }
}

impl SignedAuthorization {
    /// Recovers the authority that signed this authorization.
    pub fn recover_authority(&self) -> Result<Address, SignatureError> {
        if self.y_parity > 1 || !valid_signature_values(self.r, self.s) {
            return Err(SignatureError::InvalidSignatureValues)
        }
        recover_signer(self.signature_hash(), self.r, self.s, self.y_parity == 1)
    }
}

/// `r` must be in `[1, n)` and `s` in `[1, n/2]`.
fn valid_signature_values(r: U256, s: U256) -> bool {
    !r.is_zero() && !s.is_zero() && r < SECP256K1N && s <= SECP256K1N_HALF
}

/// Recovers the address that produced the signature `(r, s, odd_y_parity)` over `hash`.
pub fn recover_signer(
    hash: B256,
    r: U256,
    s: U256,
    odd_y_parity: bool,
) -> Result<Address, SignatureError> {
    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&r.to_be_bytes::<32>());
    compact[32..].copy_from_slice(&s.to_be_bytes::<32>());

    let recovery_id =
        RecoveryId::from_i32(odd_y_parity as i32).map_err(|_| SignatureError::RecoveryFailed)?;
    let signature = RecoverableSignature::from_compact(&compact, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    let public = SECP256K1
        .recover_ecdsa(&Message::from_digest(hash.0), &signature)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(public_key_to_address(public))
}

/// Converts a public key into an address: the last 20 bytes of the keccak hash of the
/// uncompressed key without its prefix byte.
pub fn public_key_to_address(public: PublicKey) -> Address {
    let hash = keccak256(&public.serialize_uncompressed()[1..]);
    Address::from_slice(&hash[12..])
}
