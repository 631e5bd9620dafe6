//! BREX Parser - recursive descent over a `/…/` framed regex.
//!
//! The grammar is mutually recursive across six levels -
//! `regex > body > all_of > positive > seq > repeat > base` - and the
//! domain (Unicode vs Char) is only syntactically fixed by the *trailing*
//! `/c` / `/p` suffix, after the whole body has already been scanned once
//! for framing. We resolve that ordering with a small prepass
//! ([`find_framing`]) that locates the closing delimiter and its suffix
//! before the real recursive descent begins, so every literal, range, and
//! escape inside the body can be resolved against the correct domain on
//! the first pass instead of being patched up afterward.
//!
//! Diagnostics never abort the parse: on a structural error a sentinel
//! node is substituted (an empty `Literal`) and scanning continues from a
//! sync token, accumulating every diagnostic instead of bailing out on
//! the first one.

use crate::core::domain::Domain;
use crate::core::errors::{CodecError, ParseError, ParseErrorKind};
use crate::core::nodes::{CharRange, Kind, Regex, RegexComponent, RegexOpt, RegexToplevelEntry, UNBOUNDED};

const SYNC_TOKENS: &[char] = &['\'', '"', ']', ')', '}', '|', '&', '/'];

/// Parse a full `/…/` framed pattern. Returns a best-effort `Regex` (absent
/// only when the framing itself could not be recovered) alongside every
/// diagnostic collected along the way.
pub fn parse_regex(text: &str, env_enabled: bool) -> (Option<Regex>, Vec<ParseError>) {
    let chars: Vec<char> = text.chars().collect();
    let mut errors = Vec::new();

    if chars.first() != Some(&'/') {
        errors.push(ParseError::new(
            ParseErrorKind::ExpectedDelimiter { expected: '/' },
            0,
            text,
        ));
        return (None, errors);
    }

    let framing = match find_framing(&chars) {
        Ok(f) => f,
        Err(kind) => {
            errors.push(ParseError::new(kind, chars.len(), text));
            return (None, errors);
        }
    };

    let mut parser = Parser {
        chars: chars[1..framing.body_end].to_vec(),
        pos: 0,
        errors: Vec::new(),
        env_enabled,
        domain: framing.domain,
        original_text: text.to_string(),
    };

    let (pre_anchor, body, post_anchor) = parser.parse_regex_grammar();
    parser.skip_trivia();
    if !parser.eof() {
        parser.push_err(ParseErrorKind::TrailingInput);
    }
    errors.append(&mut parser.errors);

    if framing.trailing_garbage {
        errors.push(ParseError::new(ParseErrorKind::TrailingInput, chars.len(), text));
    }

    for component in [&pre_anchor, &Some(body.clone()), &post_anchor].into_iter().flatten() {
        if let Err(err) = check_component_domain(component, framing.domain) {
            errors.push(ParseError::new(err, chars.len(), text));
        }
    }

    match Regex::new(framing.domain, framing.kind, pre_anchor, body, post_anchor) {
        Ok(regex) => (Some(regex), errors),
        Err(build_err) => {
            errors.push(ParseError::new(build_err.0, chars.len(), text));
            (None, errors)
        }
    }
}

/// Cross-checks every entry's operator tree against the regex's declared
/// domain - literals get their domain tag from their quote character at
/// parse time, so this is the only place that rejects a `'a'` inside a
/// `/…/` (Unicode) pattern or a `"a"` inside a `/…/c` (Char) pattern.
fn check_component_domain(component: &RegexComponent, domain: Domain) -> Result<(), ParseErrorKind> {
    component
        .entries()
        .iter()
        .try_for_each(|entry| entry.opt.check_domain(domain).map_err(|e| e.0))
}

struct Framing {
    body_end: usize,
    domain: Domain,
    kind: Kind,
    trailing_garbage: bool,
}

/// Scans `chars[1..]` for the closing `/`, tracking whether we are inside a
/// quoted literal (which suppresses structural interpretation of `/`)
/// without needing to know the domain yet: a raw `"` always opens/closes a
/// Unicode-literal span and a raw `'` always opens/closes a Char-literal
/// span, regardless of which domain the regex turns out to declare. `%`
/// escapes are skipped over bodily so an escaped quote inside a literal
/// never mistriggers the toggle.
fn find_framing(chars: &[char]) -> Result<Framing, ParseErrorKind> {
    let mut i = 1;
    let mut in_unicode_lit = false;
    let mut in_char_lit = false;

    while i < chars.len() {
        let c = chars[i];
        if in_unicode_lit {
            if c == '"' {
                in_unicode_lit = false;
            } else if c == '%' {
                i = skip_escape(chars, i);
                continue;
            }
            i += 1;
            continue;
        }
        if in_char_lit {
            if c == '\'' {
                in_char_lit = false;
            } else if c == '%' {
                i = skip_escape(chars, i);
                continue;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => in_unicode_lit = true,
            '\'' => in_char_lit = true,
            '/' => {
                let (domain, kind, suffix_len) = match chars.get(i + 1) {
                    Some('c') => (Domain::Char, Kind::Std, 1),
                    Some('p') => (Domain::Char, Kind::Path, 1),
                    _ => (Domain::Unicode, Kind::Std, 0),
                };
                let after = i + 1 + suffix_len;
                return Ok(Framing {
                    body_end: i,
                    domain,
                    kind,
                    trailing_garbage: after < chars.len(),
                });
            }
            _ => {}
        }
        i += 1;
    }

    Err(ParseErrorKind::ExpectedDelimiter { expected: '/' })
}

fn skip_escape(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() && chars[i] != ';' {
        i += 1;
    }
    if i < chars.len() {
        i + 1
    } else {
        i
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    errors: Vec<ParseError>,
    env_enabled: bool,
    domain: Domain,
    original_text: String,
}

impl Parser {
    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn push_err(&mut self, kind: ParseErrorKind) {
        self.errors.push(ParseError::new(kind, self.pos, &self.original_text));
    }

    fn expect(&mut self, expected: char) -> bool {
        self.skip_trivia();
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            self.push_err(ParseErrorKind::ExpectedDelimiter { expected });
            false
        }
    }

    /// Skip whitespace, `%% … \n` line comments, and `%* … *%` block
    /// comments. Never called while inside a literal or a bracket list.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('%') if self.peek_at(1) == Some('%') => {
                    self.pos += 2;
                    while !self.eof() && self.peek() != Some('\n') {
                        self.bump();
                    }
                }
                Some('%') if self.peek_at(1) == Some('*') => {
                    self.pos += 2;
                    while !self.eof() && !(self.peek() == Some('*') && self.peek_at(1) == Some('%')) {
                        self.bump();
                    }
                    if !self.eof() {
                        self.pos += 2;
                    }
                }
                _ => break,
            }
        }
    }

    /// Skip forward to the next sync token so the caller can keep parsing
    /// after a structural error.
    fn recover(&mut self) {
        while !self.eof() && !SYNC_TOKENS.contains(&self.peek().unwrap()) {
            self.bump();
        }
    }

    fn sentinel(&self) -> RegexOpt {
        RegexOpt::Literal {
            codes: Vec::new(),
            domain: self.domain,
        }
    }

    /// `regex := [prefix_body '^'] '<' body '>' ['$' suffix_body] | body`
    ///
    /// Resolved by trying the anchor-framed form via lookahead: parse a
    /// body: if `^` immediately follows, that body was the pre-anchor and
    /// we continue into `'<' body '>' ['$' suffix_body]`; otherwise the
    /// parsed body is the whole regex.
    fn parse_regex_grammar(
        &mut self,
    ) -> (Option<RegexComponent>, RegexComponent, Option<RegexComponent>) {
        self.skip_trivia();

        if self.peek() == Some('<') {
            self.bump();
            let body = self.parse_body();
            self.expect('>');
            let post = self.parse_optional_post_anchor();
            return (None, body, post);
        }

        let first = self.parse_body();
        self.skip_trivia();

        if self.peek() == Some('^') {
            self.bump();
            self.expect('<');
            let body = self.parse_body();
            self.expect('>');
            let post = self.parse_optional_post_anchor();
            (Some(first), body, post)
        } else {
            (None, first, None)
        }
    }

    fn parse_optional_post_anchor(&mut self) -> Option<RegexComponent> {
        self.skip_trivia();
        if self.peek() == Some('$') {
            self.bump();
            Some(self.parse_body())
        } else {
            None
        }
    }

    /// `body := all_of ('&' all_of)*`
    fn parse_body(&mut self) -> RegexComponent {
        let mut entries = vec![self.parse_all_of()];
        loop {
            self.skip_trivia();
            if self.peek() == Some('&') {
                self.bump();
                entries.push(self.parse_all_of());
            } else {
                break;
            }
        }

        if entries.len() == 1 {
            RegexComponent::Single(entries.pop().unwrap())
        } else {
            RegexComponent::AllOf(entries)
        }
    }

    /// `all_of := ['!'] ['^'] positive ['$']`
    fn parse_all_of(&mut self) -> RegexToplevelEntry {
        self.skip_trivia();
        let negated = if self.peek() == Some('!') {
            self.bump();
            true
        } else {
            false
        };

        self.skip_trivia();
        let is_front_check = if self.peek() == Some('^') {
            self.bump();
            true
        } else {
            false
        };

        let opt = self.parse_positive();

        self.skip_trivia();
        let is_back_check = if self.peek() == Some('$') {
            self.bump();
            true
        } else {
            false
        };

        match RegexToplevelEntry::new(opt, negated, is_front_check, is_back_check) {
            Ok(entry) => entry,
            Err(build_err) => {
                self.push_err(build_err.0);
                RegexToplevelEntry::plain(self.sentinel())
            }
        }
    }

    /// `positive := seq ('|' seq)*`
    fn parse_positive(&mut self) -> RegexOpt {
        let mut alts = vec![self.parse_seq()];
        loop {
            self.skip_trivia();
            if self.peek() == Some('|') {
                self.bump();
                alts.push(self.parse_seq());
            } else {
                break;
            }
        }
        RegexOpt::any_of(alts)
    }

    /// `seq := repeat+`
    fn parse_seq(&mut self) -> RegexOpt {
        let mut parts = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => break,
                Some(c) if matches!(c, '|' | '&' | '>' | '$' | ')') => break,
                _ => parts.push(self.parse_repeat()),
            }
        }

        match parts.len() {
            0 => self.sentinel(),
            1 => parts.pop().unwrap(),
            _ => RegexOpt::Sequence(parts),
        }
    }

    /// `repeat := base ('*' | '+' | '?' | '{' bound (',' [bound])? '}')*`
    fn parse_repeat(&mut self) -> RegexOpt {
        let mut node = self.parse_base();
        loop {
            match self.peek() {
                Some('*') => {
                    self.bump();
                    node = RegexOpt::Star(Box::new(node));
                }
                Some('+') => {
                    self.bump();
                    node = RegexOpt::Plus(Box::new(node));
                }
                Some('?') => {
                    self.bump();
                    node = RegexOpt::Optional(Box::new(node));
                }
                Some('{') => {
                    self.bump();
                    node = self.parse_bound_suffix(node);
                }
                _ => break,
            }
        }
        node
    }

    fn parse_bound_suffix(&mut self, inner: RegexOpt) -> RegexOpt {
        let low = self.parse_bound_number();
        let high = if self.peek() == Some(',') {
            self.bump();
            if self.peek() == Some('}') {
                UNBOUNDED
            } else {
                self.parse_bound_number()
            }
        } else {
            low
        };

        self.expect('}');

        match RegexOpt::range_repeat(inner, low, high) {
            Ok(n) => n,
            Err(build_err) => {
                self.push_err(build_err.0);
                self.sentinel()
            }
        }
    }

    fn parse_bound_number(&mut self) -> u16 {
        let start = self.pos;
        let mut digits = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            digits.push(self.bump().unwrap());
        }

        if digits.is_empty() {
            self.push_err(ParseErrorKind::BadRepeatBound);
            return 0;
        }

        if digits.len() > 1 && digits.starts_with('0') {
            self.errors.push(ParseError::new(ParseErrorKind::BadRepeatBound, start, &self.original_text));
        }

        match digits.parse::<u32>() {
            Ok(n) if n <= u16::MAX as u32 => n as u16,
            _ => {
                self.push_err(ParseErrorKind::BadRepeatBound);
                0
            }
        }
    }

    /// `base := '(' positive ')' | '"'..'"' | '\''..'\'' | '[' ['^'] range* ']'
    ///        | '.' | '${' qualified_name '}' | 'env[' quoted_key ']'`
    fn parse_base(&mut self) -> RegexOpt {
        self.skip_trivia();
        match self.peek() {
            Some('(') => {
                self.bump();
                let inner = self.parse_positive();
                self.expect(')');
                inner
            }
            Some('"') => self.parse_quoted_literal('"'),
            Some('\'') => self.parse_quoted_literal('\''),
            Some('[') => self.parse_char_class(),
            Some('.') => {
                self.bump();
                RegexOpt::Dot { domain: self.domain }
            }
            Some('$') if self.peek_at(1) == Some('{') => {
                self.pos += 2;
                self.parse_named_ref()
            }
            Some('e') if self.chars[self.pos..].starts_with(&['e', 'n', 'v', '[']) => {
                self.pos += 4;
                self.parse_env_ref()
            }
            Some(_) => {
                self.push_err(ParseErrorKind::TrailingInput);
                self.recover();
                self.sentinel()
            }
            None => {
                self.push_err(ParseErrorKind::EmptyRegex);
                self.sentinel()
            }
        }
    }

    fn parse_named_ref(&mut self) -> RegexOpt {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == ':' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        self.expect('}');
        RegexOpt::NamedRef { qualified_name: name }
    }

    fn parse_env_ref(&mut self) -> RegexOpt {
        if !self.env_enabled {
            self.push_err(ParseErrorKind::EnvNotAllowed);
        }
        let key = match self.peek() {
            Some('"') => self.parse_quoted_string('"'),
            Some('\'') => self.parse_quoted_string('\''),
            _ => {
                self.push_err(ParseErrorKind::ExpectedDelimiter { expected: '"' });
                String::new()
            }
        };
        self.expect(']');
        RegexOpt::EnvRef { env_key: key }
    }

    /// `[ ['^'] range* ]` - a leading or trailing `-` is a literal hyphen;
    /// `-` between two endpoints denotes a range.
    fn parse_char_class(&mut self) -> RegexOpt {
        let start = self.pos;
        self.bump(); // consume '['

        let complement = if self.peek() == Some('^') {
            self.bump();
            true
        } else {
            false
        };

        let mut ranges = Vec::new();
        let mut pending: Option<u32> = None;

        loop {
            match self.peek() {
                None => {
                    self.push_err(ParseErrorKind::MalformedCharRange);
                    break;
                }
                Some(']') => {
                    self.bump();
                    break;
                }
                Some('-') if pending.is_some() && self.peek_at(1) != Some(']') && self.peek_at(1).is_some() => {
                    self.bump();
                    let high = self.read_class_endpoint();
                    let low = pending.take().unwrap();
                    ranges.push(CharRange::new(low, high));
                }
                _ => {
                    if let Some(c) = pending.take() {
                        ranges.push(CharRange::single(c));
                    }
                    pending = Some(self.read_class_endpoint());
                }
            }
        }

        if let Some(c) = pending.take() {
            ranges.push(CharRange::single(c));
        }

        if ranges.is_empty() {
            self.errors.push(ParseError::new(ParseErrorKind::MalformedCharRange, start, &self.original_text));
        }

        RegexOpt::CharRange {
            complement,
            ranges,
            domain: self.domain,
        }
    }

    fn read_class_endpoint(&mut self) -> u32 {
        match self.peek() {
            Some('%') => match self.parse_escape() {
                Ok(code) => code,
                Err(err) => {
                    self.push_err(ParseErrorKind::Codec(err));
                    0
                }
            },
            Some(c) => {
                let code = c as u32;
                if !self.domain.is_printable(code) {
                    self.push_err(ParseErrorKind::Codec(CodecError::NonPrintableChar { code }));
                }
                self.bump();
                code
            }
            None => {
                self.push_err(ParseErrorKind::MalformedCharRange);
                0
            }
        }
    }

    /// Parses `"…"`/`'…'` literal content into a `Literal` node. A raw
    /// newline is never legal here - only `%n;` reaches code point `0x0A`
    /// inside a regex literal.
    fn parse_quoted_literal(&mut self, quote: char) -> RegexOpt {
        let start = self.pos;
        let domain = if quote == '"' { Domain::Unicode } else { Domain::Char };
        self.bump(); // opening quote

        let mut codes = Vec::new();
        loop {
            match self.peek() {
                None => {
                    self.errors.push(ParseError::new(ParseErrorKind::UnterminatedLiteral, start, &self.original_text));
                    break;
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('%') => match self.parse_escape() {
                    Ok(code) => codes.push(code),
                    Err(err) => self.push_err(ParseErrorKind::Codec(err)),
                },
                Some(c) => {
                    let code = c as u32;
                    if !domain.is_printable(code) || code == 0x0A {
                        self.push_err(ParseErrorKind::Codec(CodecError::NonPrintableChar { code }));
                    }
                    self.bump();
                    codes.push(code);
                }
            }
        }

        RegexOpt::Literal { codes, domain }
    }

    /// Like [`Self::parse_quoted_literal`] but returns the decoded text as
    /// a plain `String` (used for `env[...]` keys, which are identifiers
    /// rather than domain-tagged code point sequences).
    fn parse_quoted_string(&mut self, quote: char) -> String {
        match self.parse_quoted_literal(quote) {
            RegexOpt::Literal { codes, .. } => codes
                .into_iter()
                .filter_map(char::from_u32)
                .collect::<String>(),
            _ => unreachable!("parse_quoted_literal always returns a Literal"),
        }
    }

    fn parse_escape(&mut self) -> Result<u32, CodecError> {
        let start = self.pos;
        self.bump(); // consume '%'

        if self.peek() == Some('x') {
            self.bump();
            let mut digits = String::new();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                digits.push(self.bump().unwrap());
            }
            if self.peek() != Some(';') {
                return Err(CodecError::UnterminatedEscape);
            }
            self.bump();
            return crate::core::domain::decode_hex_escape(self.domain, &digits);
        }

        let mut name = String::new();
        if self.peek() == Some(';') {
            // bare `%;` - the domain-dependent quote alias.
        } else {
            while matches!(self.peek(), Some(c) if c != ';' && !c.is_whitespace()) {
                name.push(self.bump().unwrap());
            }
        }

        if self.peek() != Some(';') {
            let _ = start;
            return Err(CodecError::UnterminatedEscape);
        }
        self.bump();

        let lookup = if name.is_empty() { ";" } else { name.as_str() };
        crate::core::domain::resolve_escape_name(self.domain, lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_unicode_literal() {
        let (regex, errors) = parse_regex(r#"/"abc"/"#, false);
        assert!(errors.is_empty(), "{:?}", errors);
        let regex = regex.unwrap();
        assert_eq!(regex.domain, Domain::Unicode);
        assert_eq!(regex.kind, Kind::Std);
    }

    #[test]
    fn parses_char_domain_suffix() {
        let (regex, errors) = parse_regex(r#"/'abc'/c"#, false);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(regex.unwrap().domain, Domain::Char);
    }

    #[test]
    fn mixed_domain_literal_is_a_diagnostic() {
        let (_regex, errors) = parse_regex(r#"/"x"/c"#, false);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::MixedDomain));
    }

    #[test]
    fn unterminated_literal_is_reported() {
        let (_regex, errors) = parse_regex(r#"/"abc/"#, false);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::UnterminatedLiteral));
    }

    #[test]
    fn plus_and_range_repeat_parse() {
        let (regex, errors) = parse_regex(r#"/[0-9]{1,3}/"#, false);
        assert!(errors.is_empty(), "{:?}", errors);
        let regex = regex.unwrap();
        match regex.body {
            RegexComponent::Single(entry) => {
                assert!(matches!(entry.opt, RegexOpt::RangeRepeat { low: 1, high: 3, .. }));
            }
            _ => panic!("expected single entry"),
        }
    }

    #[test]
    fn all_of_with_negated_front_check_parses() {
        let (regex, errors) = parse_regex(r#"/.+ & !^("bob"|"sally")/"#, false);
        assert!(errors.is_empty(), "{:?}", errors);
        match regex.unwrap().body {
            RegexComponent::AllOf(entries) => {
                assert_eq!(entries.len(), 2);
                assert!(entries[1].is_negated && entries[1].is_front_check);
            }
            _ => panic!("expected AllOf"),
        }
    }

    #[test]
    fn env_ref_disabled_is_a_diagnostic() {
        let (_regex, errors) = parse_regex(r#"/env["x"]/"#, false);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::EnvNotAllowed));
    }

    #[test]
    fn hex_escape_decodes_emoji() {
        let (regex, errors) = parse_regex(r#"/"%x1f335;"/"#, false);
        assert!(errors.is_empty(), "{:?}", errors);
        match regex.unwrap().body {
            RegexComponent::Single(entry) => match entry.opt {
                RegexOpt::Literal { codes, .. } => assert_eq!(codes, vec![0x1f335]),
                _ => panic!("expected literal"),
            },
            _ => panic!("expected single entry"),
        }
    }

    #[test]
    fn raw_newline_inside_a_literal_is_a_diagnostic() {
        let (_regex, errors) = parse_regex("/\"a\nb\"/", false);
        assert!(errors
            .iter()
            .any(|e| matches!(&e.kind, ParseErrorKind::Codec(CodecError::NonPrintableChar { code: 0x0A }))));
    }

    #[test]
    fn path_suffix_pairs_with_char_domain() {
        let (regex, errors) = parse_regex(r#"/'abc'/p"#, false);
        assert!(errors.is_empty(), "{:?}", errors);
        let regex = regex.unwrap();
        assert_eq!(regex.domain, Domain::Char);
        assert_eq!(regex.kind, Kind::Path);
    }
}
