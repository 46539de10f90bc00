//! Hash prefix and query mode types.

use std::fmt;

/// Length of a k-anonymity bucket prefix.
pub const PREFIX_LEN: usize = 5;

/// A validated 5 character hexadecimal hash prefix, stored uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashPrefix([u8; PREFIX_LEN]);

/// Why a candidate prefix was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixError {
    /// Not exactly five characters long.
    Length,
    /// Five characters, but not all hexadecimal.
    NotHex,
}

impl HashPrefix {
    /// Parse a candidate prefix. The match is anchored: every character
    /// must be a hex digit and there must be exactly five of them.
    pub fn parse(candidate: &str) -> Result<Self, PrefixError> {
        // Counted in chars so multi-byte input reports a length error
        // rather than a hex error.
        if candidate.chars().count() != PREFIX_LEN {
            return Err(PrefixError::Length);
        }

        let bytes = candidate.as_bytes();
        if bytes.len() != PREFIX_LEN || !bytes.iter().all(u8::is_ascii_hexdigit) {
            return Err(PrefixError::NotHex);
        }

        let mut normalized = [0u8; PREFIX_LEN];
        for (slot, b) in normalized.iter_mut().zip(bytes) {
            *slot = b.to_ascii_uppercase();
        }
        Ok(Self(normalized))
    }

    /// The uppercase prefix.
    pub fn as_str(&self) -> &str {
        // Only ASCII hex digits are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for HashPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which hash format the caller is querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// SHA-1 hashes (the default).
    #[default]
    Sha1,
    /// NTLM hashes, selected by `?mode=ntlm`.
    Ntlm,
}

impl QueryMode {
    /// Derive the mode from a raw query string.
    ///
    /// Only the first `mode` parameter counts and it must equal `ntlm`
    /// exactly; anything else falls back to SHA-1.
    pub fn from_query(query: Option<&str>) -> Self {
        let Some(query) = query else {
            return QueryMode::Sha1;
        };

        let mode = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "mode")
            .map(|(_, value)| value);

        match mode.as_deref() {
            Some("ntlm") => QueryMode::Ntlm,
            _ => QueryMode::Sha1,
        }
    }

    /// Length of a genuine hash suffix in this mode (hash length minus prefix).
    pub fn suffix_len(&self) -> usize {
        match self {
            QueryMode::Sha1 => 35,
            QueryMode::Ntlm => 27,
        }
    }

    pub fn is_ntlm(&self) -> bool {
        matches!(self, QueryMode::Ntlm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_uppercased() {
        let p = HashPrefix::parse("abcde").unwrap();
        assert_eq!(p.as_str(), "ABCDE");
        assert_eq!(HashPrefix::parse("aBc0F").unwrap().to_string(), "ABC0F");
        assert_eq!(HashPrefix::parse("21BD1").unwrap().as_str(), "21BD1");
    }

    #[test]
    fn test_prefix_case_invariant() {
        let lower = HashPrefix::parse("fedcb").unwrap();
        let upper = HashPrefix::parse("FEDCB").unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_prefix_length() {
        assert_eq!(HashPrefix::parse(""), Err(PrefixError::Length));
        assert_eq!(HashPrefix::parse("ABCD"), Err(PrefixError::Length));
        assert_eq!(HashPrefix::parse("ABCDEF"), Err(PrefixError::Length));
        assert_eq!(HashPrefix::parse("ABCDE/"), Err(PrefixError::Length));
    }

    #[test]
    fn test_prefix_anchored_hex() {
        assert_eq!(HashPrefix::parse("ABCDG"), Err(PrefixError::NotHex));
        assert_eq!(HashPrefix::parse("zzzzz"), Err(PrefixError::NotHex));
        assert_eq!(HashPrefix::parse("12 45"), Err(PrefixError::NotHex));
        // Five chars but one is multi-byte.
        assert_eq!(HashPrefix::parse("ABCDé"), Err(PrefixError::NotHex));
    }

    #[test]
    fn test_mode_from_query() {
        assert_eq!(QueryMode::from_query(None), QueryMode::Sha1);
        assert_eq!(QueryMode::from_query(Some("")), QueryMode::Sha1);
        assert_eq!(QueryMode::from_query(Some("mode=ntlm")), QueryMode::Ntlm);
        assert_eq!(QueryMode::from_query(Some("foo=1&mode=ntlm")), QueryMode::Ntlm);
        assert_eq!(QueryMode::from_query(Some("mode=NTLM")), QueryMode::Sha1);
        assert_eq!(QueryMode::from_query(Some("mode=sha1&mode=ntlm")), QueryMode::Sha1);
    }

    #[test]
    fn test_suffix_lengths() {
        assert_eq!(QueryMode::Sha1.suffix_len(), 35);
        assert_eq!(QueryMode::Ntlm.suffix_len(), 27);
    }
}
