//! # Bitcoin Transaction Decoding
//!
//! A merkle leaf is only a transaction if its bytes decode as one. Without
//! this check, the 64-byte concatenation of two child txids hashes to an
//! inner node and a shortened path "proves" it as a leaf.
//!
//! Wire format:
//!
//! ```text
//! version(4) [marker(0x00) flag(0x01)] in_count inputs out_count outputs
//!            [witnesses] lock_time(4)
//! input  = prev_txid(32) prev_index(4) script sequence(4)
//! output = value(8) script
//! ```
//!
//! Counts and script lengths are CompactSize integers and must use the
//! shortest encoding.

use std::fmt;

/// Serialized transactions of exactly this size are rejected outright.
pub const AMBIGUOUS_TX_LEN: usize = 64;

/// Why bytes are not a Bitcoin transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitcoinTxError {
    /// Ran out of bytes while reading `what`.
    Truncated(&'static str),
    /// A CompactSize integer was not minimally encoded.
    NonCanonicalCompactSize,
    /// The transaction spends nothing.
    NoInputs,
    /// The transaction pays nothing.
    NoOutputs,
    /// Segwit marker present with an unknown flag.
    UnknownFlag(u8),
    /// Bytes left over after the lock time.
    TrailingBytes(usize),
    /// 64 bytes can be read as an inner merkle node.
    AmbiguousLength,
}

impl fmt::Display for BitcoinTxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitcoinTxError::Truncated(what) => write!(f, "truncated at {what}"),
            BitcoinTxError::NonCanonicalCompactSize => write!(f, "non-canonical compact size"),
            BitcoinTxError::NoInputs => write!(f, "no inputs"),
            BitcoinTxError::NoOutputs => write!(f, "no outputs"),
            BitcoinTxError::UnknownFlag(flag) => write!(f, "unknown segwit flag {flag:#04x}"),
            BitcoinTxError::TrailingBytes(n) => write!(f, "{n} trailing bytes"),
            BitcoinTxError::AmbiguousLength => {
                write!(f, "{AMBIGUOUS_TX_LEN}-byte transactions are ambiguous with merkle nodes")
            }
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], BitcoinTxError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(BitcoinTxError::Truncated(what))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: u64, what: &'static str) -> Result<(), BitcoinTxError> {
        let n = usize::try_from(n).map_err(|_| BitcoinTxError::Truncated(what))?;
        self.take(n, what).map(|_| ())
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, BitcoinTxError> {
        Ok(self.take(1, what)?[0])
    }

    fn compact_size(&mut self, what: &'static str) -> Result<u64, BitcoinTxError> {
        let (value, min) = match self.u8(what)? {
            0xfd => {
                let raw = self.take(2, what)?;
                (u64::from(u16::from_le_bytes([raw[0], raw[1]])), 0xfd)
            }
            0xfe => {
                let raw = self.take(4, what)?;
                (u64::from(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])), 0x1_0000)
            }
            0xff => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(self.take(8, what)?);
                (u64::from_le_bytes(buf), 0x1_0000_0000)
            }
            small => return Ok(u64::from(small)),
        };
        if value < min {
            return Err(BitcoinTxError::NonCanonicalCompactSize);
        }
        Ok(value)
    }

    fn var_bytes(&mut self, what: &'static str) -> Result<(), BitcoinTxError> {
        let len = self.compact_size(what)?;
        self.skip(len, what)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

/// Check that `bytes` is exactly one serialized Bitcoin transaction.
///
/// Returns the number of inputs on success.
pub fn decode_bitcoin_tx(bytes: &[u8]) -> Result<u64, BitcoinTxError> {
    if bytes.len() == AMBIGUOUS_TX_LEN {
        return Err(BitcoinTxError::AmbiguousLength);
    }

    let mut r = Reader::new(bytes);
    r.take(4, "version")?;

    let segwit = r.peek(0) == Some(0x00);
    if segwit {
        r.u8("marker")?;
        match r.u8("flag")? {
            0x01 => {}
            flag => return Err(BitcoinTxError::UnknownFlag(flag)),
        }
    }

    let inputs = r.compact_size("input count")?;
    if inputs == 0 {
        return Err(BitcoinTxError::NoInputs);
    }
    for _ in 0..inputs {
        r.take(36, "outpoint")?;
        r.var_bytes("signature script")?;
        r.take(4, "sequence")?;
    }

    let outputs = r.compact_size("output count")?;
    if outputs == 0 {
        return Err(BitcoinTxError::NoOutputs);
    }
    for _ in 0..outputs {
        r.take(8, "value")?;
        r.var_bytes("pubkey script")?;
    }

    if segwit {
        for _ in 0..inputs {
            let items = r.compact_size("witness count")?;
            for _ in 0..items {
                r.var_bytes("witness item")?;
            }
        }
    }

    r.take(4, "lock time")?;
    match r.remaining() {
        0 => Ok(inputs),
        n => Err(BitcoinTxError::TrailingBytes(n)),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_tx;
    use super::*;

    #[test]
    fn test_legacy_tx_decodes() {
        let tx = sample_tx(3);
        assert_eq!(tx.len(), 60);
        assert_eq!(decode_bitcoin_tx(&tx), Ok(1));
    }

    #[test]
    fn test_segwit_tx_decodes() {
        let legacy = sample_tx(1);
        let mut tx = legacy[..4].to_vec();
        tx.extend_from_slice(&[0x00, 0x01]);
        tx.extend_from_slice(&legacy[4..legacy.len() - 4]);
        // One witness stack with a single 2-byte item.
        tx.extend_from_slice(&[0x01, 0x02, 0xab, 0xcd]);
        tx.extend_from_slice(&legacy[legacy.len() - 4..]);
        assert_eq!(decode_bitcoin_tx(&tx), Ok(1));

        tx[5] = 0x02;
        assert_eq!(decode_bitcoin_tx(&tx), Err(BitcoinTxError::UnknownFlag(0x02)));
    }

    #[test]
    fn test_inner_node_rejected() {
        let node = [0x42u8; 64];
        assert_eq!(decode_bitcoin_tx(&node), Err(BitcoinTxError::AmbiguousLength));
    }

    #[test]
    fn test_malformed_rejected() {
        let tx = sample_tx(0);
        assert!(matches!(
            decode_bitcoin_tx(&tx[..tx.len() - 1]),
            Err(BitcoinTxError::Truncated("lock time"))
        ));

        let mut trailing = tx.clone();
        trailing.push(0);
        assert_eq!(decode_bitcoin_tx(&trailing), Err(BitcoinTxError::TrailingBytes(1)));

        let mut no_outputs = tx.clone();
        no_outputs[46] = 0;
        assert!(decode_bitcoin_tx(&no_outputs).is_err());

        // Four-byte "raw" blobs are not transactions.
        assert!(decode_bitcoin_tx(&[0x02, 0x00, 0x01, 0xff]).is_err());
    }

    #[test]
    fn test_compact_size_must_be_minimal() {
        let mut r = Reader::new(&[0xfd, 0x10, 0x00]);
        assert_eq!(r.compact_size("n"), Err(BitcoinTxError::NonCanonicalCompactSize));
        let mut r = Reader::new(&[0xfd, 0x00, 0x01]);
        assert_eq!(r.compact_size("n"), Ok(256));
    }
}
