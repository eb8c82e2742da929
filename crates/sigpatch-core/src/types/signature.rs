//! Byte signature and patch outcome types.

use std::fmt;

use super::Address;
use crate::error::{PatchError, Result};

/// A byte signature and its in-place replacement
///
/// The pattern locates a specific instruction or data sequence inside a
/// loaded module regardless of where the module happens to be mapped; the
/// replacement is written over the match.
///
/// ## Equal-length invariant
///
/// Pattern and replacement must have the same length, validated at
/// construction. The patch therefore never changes the size of the region
/// or shifts code that follows the match.
///
/// ## Example
///
/// ```rust
/// use sigpatch_core::types::Signature;
///
/// let sig = Signature::new(
///     vec![0x75, 0x11, 0x84, 0xdb],
///     vec![0xeb, 0x04, 0x84, 0xdb],
/// )?;
/// assert_eq!(sig.len(), 4);
///
/// // Mismatched lengths are a construction error, not a runtime surprise
/// assert!(Signature::new(vec![0x75], vec![0xeb, 0x04]).is_err());
/// # Ok::<(), sigpatch_core::error::PatchError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature
{
    pattern: Vec<u8>,
    replacement: Vec<u8>,
}

impl Signature
{
    /// Create a signature, validating the equal-length invariant
    ///
    /// ## Errors
    ///
    /// Returns [`PatchError::InvalidSignature`] when either sequence is
    /// empty or the lengths differ.
    pub fn new(pattern: Vec<u8>, replacement: Vec<u8>) -> Result<Self>
    {
        if pattern.is_empty() {
            return Err(PatchError::InvalidSignature("pattern must not be empty".to_string()));
        }
        if pattern.len() != replacement.len() {
            return Err(PatchError::InvalidSignature(format!(
                "pattern is {} bytes but replacement is {} bytes",
                pattern.len(),
                replacement.len()
            )));
        }
        Ok(Self { pattern, replacement })
    }

    /// Parse a signature from two hex strings
    ///
    /// Accepts bytes separated by whitespace (`"75 11 84 db"`) or packed
    /// together (`"751184db"`). No wildcard syntax; the scan contract is
    /// exact contiguous equality.
    ///
    /// ## Errors
    ///
    /// Returns [`PatchError::InvalidSignature`] on malformed hex or when the
    /// parsed sequences violate the equal-length invariant.
    pub fn from_hex(pattern: &str, replacement: &str) -> Result<Self>
    {
        Self::new(parse_hex_bytes(pattern)?, parse_hex_bytes(replacement)?)
    }

    /// The byte sequence searched for in the target module
    pub fn pattern(&self) -> &[u8]
    {
        &self.pattern
    }

    /// The byte sequence written over the match
    pub fn replacement(&self) -> &[u8]
    {
        &self.replacement
    }

    /// Length in bytes of both the pattern and the replacement
    pub fn len(&self) -> usize
    {
        self.pattern.len()
    }

    /// Always false for a constructed signature; provided for completeness
    pub fn is_empty(&self) -> bool
    {
        self.pattern.is_empty()
    }
}

/// Parse hex text into bytes, tolerating whitespace between byte pairs.
fn parse_hex_bytes(text: &str) -> Result<Vec<u8>>
{
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(PatchError::InvalidSignature(format!(
            "odd number of hex digits in {text:?}"
        )));
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks(2) {
        let hi = pair[0]
            .to_digit(16)
            .ok_or_else(|| PatchError::InvalidSignature(format!("invalid hex digit {:?}", pair[0])))?;
        let lo = pair[1]
            .to_digit(16)
            .ok_or_else(|| PatchError::InvalidSignature(format!("invalid hex digit {:?}", pair[1])))?;
        #[allow(clippy::cast_possible_truncation)]
        bytes.push((hi * 16 + lo) as u8);
    }
    Ok(bytes)
}

/// Terminal result of one patch attempt
///
/// Produced exactly once per session; a patch attempt is never retried
/// automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome
{
    /// The replacement was written at the given absolute address.
    Applied(Address),
    /// The target module was mapped but the pattern was not present
    /// (including a module that was already patched).
    SignatureNotFound,
    /// No mapping matching the module name was found in the target.
    MappingNotFound,
    /// The debug attach itself failed, or the target vanished before its
    /// first stop.
    AttachFailed,
    /// Reading the region or writing the replacement failed.
    WriteFailed,
}

impl PatchOutcome
{
    /// True only for [`PatchOutcome::Applied`]
    pub const fn is_applied(self) -> bool
    {
        matches!(self, PatchOutcome::Applied(_))
    }
}

impl fmt::Display for PatchOutcome
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            PatchOutcome::Applied(address) => write!(f, "patch applied at {address}"),
            PatchOutcome::SignatureNotFound => write!(f, "signature not found in target module"),
            PatchOutcome::MappingNotFound => write!(f, "target module is not mapped in the target process"),
            PatchOutcome::AttachFailed => write!(f, "failed to attach to the target process"),
            PatchOutcome::WriteFailed => write!(f, "reading or writing target memory failed"),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_hex_spaced_and_packed()
    {
        assert_eq!(parse_hex_bytes("75 11 84 db").unwrap(), vec![0x75, 0x11, 0x84, 0xdb]);
        assert_eq!(parse_hex_bytes("751184db").unwrap(), vec![0x75, 0x11, 0x84, 0xdb]);
    }

    #[test]
    fn test_parse_hex_rejects_odd_and_garbage()
    {
        assert!(parse_hex_bytes("751").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn test_signature_from_hex_round_trip()
    {
        let sig = Signature::from_hex("eb 04", "90 90").unwrap();
        assert_eq!(sig.pattern(), &[0xeb, 0x04]);
        assert_eq!(sig.replacement(), &[0x90, 0x90]);
        assert_eq!(sig.len(), 2);
        assert!(!sig.is_empty());
    }

    #[test]
    fn test_signature_rejects_unequal_lengths()
    {
        assert!(Signature::from_hex("eb 04", "90").is_err());
        assert!(Signature::new(Vec::new(), Vec::new()).is_err());
    }
}
