//! BREX Hint Engine - context-aware error hints.
//!
//! Maps a [`ParseErrorKind`] to an instructional message keyed off BREX's
//! closed error taxonomy.

use crate::core::errors::ParseErrorKind;

/// Get a hint for a given parse error kind and context.
pub fn get_hint(kind: &ParseErrorKind, _text: &str, _pos: usize) -> Option<String> {
    match kind {
        ParseErrorKind::UnterminatedLiteral => Some(
            "This literal was opened with a quote but never closed. \
            Add the matching '\"' or '\\'' to close it."
                .to_string(),
        ),
        ParseErrorKind::ExpectedDelimiter { expected } => Some(format!(
            "Expected to find '{}' here. Check for unbalanced delimiters earlier in the pattern.",
            expected
        )),
        ParseErrorKind::MixedDomain => Some(
            "A Unicode regex (`/.../`) cannot contain Char-domain literals ('...') \
            and a Char regex (`/.../c`) cannot contain Unicode literals (\"...\"). \
            Pick one domain for the whole pattern."
                .to_string(),
        ),
        ParseErrorKind::MalformedCharRange => Some(
            "Character ranges look like `[a-z]`; the character before '-' must be \
            less than or equal to the character after it."
                .to_string(),
        ),
        ParseErrorKind::BadRepeatBound => Some(
            "Repeat bounds are `{low,high}` with 0 <= low <= high <= 65535, and no \
            leading zeros other than a bare `0`."
                .to_string(),
        ),
        ParseErrorKind::EmptyRegex => Some(
            "A regex body cannot be empty. Add at least one literal, range, or dot."
                .to_string(),
        ),
        ParseErrorKind::TrailingInput => Some(
            "There is unexpected content after the closing delimiter. \
            Check for an extra '/' or stray characters."
                .to_string(),
        ),
        ParseErrorKind::MismatchedAnchors => Some(
            "Anchor framing looks like `pre^<body>$post`; each `^<` needs a matching `>`, \
            and `$` introduces the optional post-anchor."
                .to_string(),
        ),
        ParseErrorKind::EnvNotAllowed => Some(
            "`env[...]` references are only permitted when the caller has explicitly \
            enabled environment resolution."
                .to_string(),
        ),
        ParseErrorKind::Codec(codec_err) => Some(format!(
            "Codec error: {}. Check escape names and hex digit counts for this domain.",
            codec_err
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::CodecError;

    #[test]
    fn unterminated_literal_hint_mentions_quotes() {
        let hint = get_hint(&ParseErrorKind::UnterminatedLiteral, "test", 0);
        assert!(hint.is_some());
        assert!(hint.unwrap().contains('\''));
    }

    #[test]
    fn bad_repeat_bound_hint_mentions_range() {
        let hint = get_hint(&ParseErrorKind::BadRepeatBound, "test", 0);
        assert!(hint.unwrap().contains("65535"));
    }

    #[test]
    fn codec_error_is_wrapped_with_a_hint() {
        let kind = ParseErrorKind::Codec(CodecError::UnknownEscapeName {
            name: "bob".to_string(),
        });
        let hint = get_hint(&kind, "test", 0);
        assert!(hint.is_some());
    }
}
