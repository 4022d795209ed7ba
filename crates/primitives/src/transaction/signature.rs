use alloy_primitives::{Address, U256};
use alloy_rlp::{Decodable, Encodable};

/// Raw `(v, r, s)` signature values of a transaction.
///
/// For legacy transactions `v` carries the replay protection (`27`/`28` or `35 + 2 * chain_id +
/// parity`), typed transactions store the bare y parity.
///
/// Internal transactions created by the node carry the marker `v == 0 && r == 0` and store the
/// sender address in the low 20 bytes of `s`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    /// The `v` value.
    pub v: u64,
    /// The `r` value.
    pub r: U256,
    /// The `s` value.
    pub s: U256,
}

impl Signature {
    /// Creates the marker signature of an internal transaction sent by `sender`.
    pub fn internal(sender: Address) -> Self {
        Self { v: 0, r: U256::ZERO, s: U256::from_be_slice(sender.as_slice()) }
    }

    /// Returns true if this is the marker signature of an internal transaction.
    pub fn is_internal(&self) -> bool {
        self.v == 0 && self.r.is_zero()
    }

    /// Returns the sender stored in an internal transaction signature.
    pub fn internal_sender(&self) -> Address {
        Address::from_word(self.s.to_be_bytes::<32>().into())
    }

    /// Chain id encoded in a legacy `v` value, `None` for unprotected or malformed values.
    pub const fn legacy_chain_id(&self) -> Option<u64> {
        if self.v >= 35 {
            Some((self.v - 35) / 2)
        } else {
            None
        }
    }

    pub(crate) fn fields_len(&self) -> usize {
        self.v.length() + self.r.length() + self.s.length()
    }

    pub(crate) fn encode_fields(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.v.encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }

    pub(crate) fn decode_fields(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Ok(Self {
            v: Decodable::decode(buf)?,
            r: Decodable::decode(buf)?,
            s: Decodable::decode(buf)?,
        })
    }
}
