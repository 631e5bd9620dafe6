//! Character domains and the character codec.
//!
//! BREX recognizes two disjoint character domains. A `Unicode` regex ranges
//! over the full code point space; a `Char` regex is restricted to printable
//! ASCII plus tab and newline. Every literal, range, and escape is resolved
//! against exactly one of these tables - they are never merged.

use crate::core::errors::CodecError;

/// One of the two disjoint universes a regex's literals and ranges live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Unicode,
    Char,
}

impl Domain {
    /// True if `c` is a legal code point for this domain outside of escapes.
    pub fn is_legal_char(self, c: u32) -> bool {
        match self {
            Domain::Unicode => c <= 0x10FFFF,
            Domain::Char => is_legal_c_char(c),
        }
    }

    /// Printable-policy check used by the parser when it meets a raw byte
    /// inside a literal or range (not an escape).
    pub fn is_printable(self, c: u32) -> bool {
        match self {
            Domain::Unicode => c == 0x09 || c == 0x0A || c >= 0x20,
            Domain::Char => is_legal_c_char(c),
        }
    }

    fn escape_table(self) -> &'static [(&'static str, u32)] {
        match self {
            Domain::Unicode => UNICODE_ESCAPE_NAMES,
            Domain::Char => CHAR_ESCAPE_NAMES,
        }
    }

    fn max_hex_digits(self) -> usize {
        match self {
            Domain::Unicode => 6,
            Domain::Char => 2,
        }
    }
}

/// `isprint(c) || c == 0x09 || c == 0x0A`, restricted further to `c <= 0x7E`
/// to define the Char domain's legal code points.
pub fn is_legal_c_char(c: u32) -> bool {
    (c == 0x09 || c == 0x0A || (0x20..=0x7E).contains(&c)) && c <= 0x7E
}

/// Named-escape tables. Entries are `(name, code)`; lookup in either
/// direction is linear since the tables are small and static. Deliberately
/// two separate tables, not one parameterized table: several names carry
/// different meanings per domain (see module docs and DESIGN.md).
static UNICODE_ESCAPE_NAMES: &[(&str, u32)] = &[
    // C0 control codes plus DEL.
    ("nul", 0x00),
    ("soh", 0x01),
    ("stx", 0x02),
    ("etx", 0x03),
    ("eot", 0x04),
    ("enq", 0x05),
    ("ack", 0x06),
    ("a", 0x07),
    ("b", 0x08),
    ("t", 0x09),
    ("n", 0x0A),
    ("v", 0x0B),
    ("f", 0x0C),
    ("r", 0x0D),
    ("so", 0x0E),
    ("si", 0x0F),
    ("dle", 0x10),
    ("dc1", 0x11),
    ("dc2", 0x12),
    ("dc3", 0x13),
    ("dc4", 0x14),
    ("nak", 0x15),
    ("syn", 0x16),
    ("etb", 0x17),
    ("can", 0x18),
    ("em", 0x19),
    ("sub", 0x1A),
    ("e", 0x1B),
    ("fs", 0x1C),
    ("gs", 0x1D),
    ("rs", 0x1E),
    ("us", 0x1F),
    ("del", 0x7F),
    // Printable punctuation.
    ("space", 0x20),
    ("bang", 0x21),
    ("quote", 0x22),
    (";", 0x22), // bare `%;` aliases the domain's own quote delimiter
    ("hash", 0x23),
    ("dollar", 0x24),
    ("%", 0x25),
    ("percent", 0x25),
    ("amp", 0x26),
    ("tick", 0x27),
    ("lparen", 0x28),
    ("rparen", 0x29),
    ("star", 0x2A),
    ("plus", 0x2B),
    ("comma", 0x2C),
    ("dash", 0x2D),
    ("dot", 0x2E),
    ("slash", 0x2F),
    ("colon", 0x3A),
    ("semicolon", 0x3B),
    ("langle", 0x3C),
    ("equal", 0x3D),
    ("rangle", 0x3E),
    ("question", 0x3F),
    ("at", 0x40),
    ("lbracket", 0x5B),
    ("backslash", 0x5C),
    ("rbracket", 0x5D),
    ("caret", 0x5E),
    ("underscore", 0x5F),
    ("backtick", 0x60),
    ("lbrace", 0x7B),
    ("pipe", 0x7C),
    ("rbrace", 0x7D),
    ("tilde", 0x7E),
];

static CHAR_ESCAPE_NAMES: &[(&str, u32)] = &[
    ("t", 0x09),
    ("n", 0x0A),
    ("space", 0x20),
    ("bang", 0x21),
    ("quote", 0x22),
    ("hash", 0x23),
    ("dollar", 0x24),
    ("%", 0x25),
    ("percent", 0x25),
    ("amp", 0x26),
    (";", 0x27), // bare `%;` is a literal tick in the Char domain
    ("tick", 0x27),
    ("lparen", 0x28),
    ("rparen", 0x29),
    ("star", 0x2A),
    ("plus", 0x2B),
    ("comma", 0x2C),
    ("dash", 0x2D),
    ("dot", 0x2E),
    ("slash", 0x2F),
    ("colon", 0x3A),
    ("semi", 0x3B),
    ("langle", 0x3C),
    ("equal", 0x3D),
    ("rangle", 0x3E),
    ("question", 0x3F),
    ("at", 0x40),
    ("lbracket", 0x5B),
    ("backslash", 0x5C),
    ("rbracket", 0x5D),
    ("caret", 0x5E),
    ("underscore", 0x5F),
    ("backtick", 0x60),
    ("lbrace", 0x7B),
    ("pipe", 0x7C),
    ("rbrace", 0x7D),
    ("tilde", 0x7E),
];

/// Resolve `%name;` to a code point. `name` excludes the leading `%` and
/// trailing `;`.
pub fn resolve_escape_name(domain: Domain, name: &str) -> Result<u32, CodecError> {
    domain
        .escape_table()
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| *c)
        .ok_or_else(|| CodecError::UnknownEscapeName {
            name: name.to_string(),
        })
}

/// Inverse of [`resolve_escape_name`]: pick the canonical name for a code
/// point, used when rendering diagnostics or `to_surface_form`. Picks the
/// first table entry (the non-bare-`%;` alias where duplicates exist).
pub fn canonical_escape_name(domain: Domain, code: u32) -> Option<&'static str> {
    domain
        .escape_table()
        .iter()
        .find(|(name, c)| *c == code && *name != ";")
        .map(|(name, _)| *name)
}

/// Decode a hex escape body (the digits between `%x` and `;`) into a code
/// point, enforcing the domain-specific digit-count bound and legality.
pub fn decode_hex_escape(domain: Domain, digits: &str) -> Result<u32, CodecError> {
    if digits.is_empty() || digits.len() > domain.max_hex_digits() {
        return Err(CodecError::BadHexEscape {
            text: digits.to_string(),
        });
    }

    let value = u32::from_str_radix(digits, 16).map_err(|_| CodecError::BadHexEscape {
        text: digits.to_string(),
    })?;

    if !domain.is_legal_char(value) {
        return Err(CodecError::HexEscapeOutOfRange { value });
    }

    Ok(value)
}

/// Encode a code point as `%x<hex>;`, lowercase hex, no leading zeros beyond
/// what's needed.
pub fn encode_hex_escape(code: u32) -> String {
    format!("%x{:x};", code)
}

/// Number of UTF-8 continuation/lead bytes expected given a leading byte,
/// per the standard UTF-8 length-from-leading-byte table.
pub fn utf8_expected_len(lead: u8) -> Option<usize> {
    if lead & 0b1000_0000 == 0 {
        Some(1)
    } else if lead & 0b1110_0000 == 0b1100_0000 {
        Some(2)
    } else if lead & 0b1111_0000 == 0b1110_0000 {
        Some(3)
    } else if lead & 0b1111_1000 == 0b1111_0000 {
        Some(4)
    } else {
        None
    }
}

/// Decode one UTF-8 code point starting at `bytes[0]`. Distinguishes
/// truncation (not enough bytes left) from mis-encoding (continuation bytes
/// don't match `10xxxxxx`).
pub fn decode_utf8_char(bytes: &[u8]) -> Result<(u32, usize), CodecError> {
    let lead = bytes[0];
    let len = utf8_expected_len(lead).ok_or(CodecError::InvalidUtf8MisEncoded { offset: 0 })?;

    if bytes.len() < len {
        return Err(CodecError::InvalidUtf8Truncated { offset: 0 });
    }

    if len == 1 {
        return Ok((lead as u32, 1));
    }

    let mut value = (lead as u32) & (0x7F >> len);
    for (i, b) in bytes[1..len].iter().enumerate() {
        if b & 0b1100_0000 != 0b1000_0000 {
            return Err(CodecError::InvalidUtf8MisEncoded { offset: i + 1 });
        }
        value = (value << 6) | (*b as u32 & 0x3F);
    }

    Ok((value, len))
}

/// UTF-8 encode a single code point; escaping is handled by the caller.
pub fn encode_utf8_char(code: u32) -> Vec<u8> {
    let mut buf = [0u8; 4];
    let s = char::from_u32(code).unwrap_or('\u{FFFD}').encode_utf8(&mut buf);
    s.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicode_and_char_semicolon_names_differ() {
        assert_eq!(resolve_escape_name(Domain::Unicode, "semicolon").unwrap(), 0x3B);
        assert_eq!(resolve_escape_name(Domain::Char, "semi").unwrap(), 0x3B);
        assert!(resolve_escape_name(Domain::Char, "semicolon").is_err());
    }

    #[test]
    fn bare_percent_semicolon_is_domain_dependent_quote() {
        assert_eq!(resolve_escape_name(Domain::Unicode, ";").unwrap(), 0x22);
        assert_eq!(resolve_escape_name(Domain::Char, ";").unwrap(), 0x27);
    }

    #[test]
    fn every_unicode_escape_name_resolves_to_its_code() {
        for &(name, code) in UNICODE_ESCAPE_NAMES {
            assert_eq!(resolve_escape_name(Domain::Unicode, name).unwrap(), code, "name {:?}", name);
        }
    }

    #[test]
    fn every_char_escape_name_resolves_to_its_code() {
        for &(name, code) in CHAR_ESCAPE_NAMES {
            assert_eq!(resolve_escape_name(Domain::Char, name).unwrap(), code, "name {:?}", name);
        }
    }

    #[test]
    fn control_code_and_punctuation_names_are_present() {
        for name in ["nul", "soh", "stx", "etx", "eot", "enq", "ack", "a", "b", "v", "f", "r", "so", "si", "dle",
            "dc1", "dc2", "dc3", "dc4", "nak", "syn", "etb", "can", "em", "sub", "e", "fs", "gs", "rs", "us", "del",
            "hash", "percent", "comma", "dash", "colon", "langle", "equal", "rangle", "at", "underscore", "backtick",
            "tilde", "tick", "backslash"]
        {
            assert!(resolve_escape_name(Domain::Unicode, name).is_ok(), "missing unicode name {:?}", name);
        }
        assert!(resolve_escape_name(Domain::Unicode, "bslash").is_err());
    }

    #[test]
    fn hex_escape_digit_bounds_are_domain_specific() {
        assert!(decode_hex_escape(Domain::Char, "7f").is_err()); // not printable / not legal
        assert!(decode_hex_escape(Domain::Char, "41").is_ok());
        assert!(decode_hex_escape(Domain::Unicode, "1f335").is_ok());
        assert!(decode_hex_escape(Domain::Unicode, "1000000").is_err()); // 7 digits, too many
    }

    #[test]
    fn decode_utf8_emoji() {
        let bytes = "🐍".as_bytes();
        let (code, len) = decode_utf8_char(bytes).unwrap();
        assert_eq!(len, 4);
        assert_eq!(char::from_u32(code).unwrap(), '🐍');
    }
}
