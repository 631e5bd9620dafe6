//! BREX AST node definitions.
//!
//! Reimplements the original C++ `RegexOpt` virtual-dispatch hierarchy as a
//! single tagged enum - no cyclic pointers, no vtables, dispatch via pattern match.
//! Constructors validate structural invariants at build time
//! rather than via a later, separate validation pass.

use crate::core::domain::{self, Domain};
use crate::core::errors::ParseErrorKind;

/// `low == high == 0` means empty (rejected at construction); `high ==
/// u16::MAX` means unbounded.
pub const UNBOUNDED: u16 = u16::MAX;

/// A single character range endpoint pair, `low <= high` after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRange {
    pub low: u32,
    pub high: u32,
}

impl CharRange {
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b {
            CharRange { low: a, high: b }
        } else {
            CharRange { low: b, high: a }
        }
    }

    pub fn single(c: u32) -> Self {
        CharRange { low: c, high: c }
    }
}

/// The BREX regex-operator AST, one variant per surface-syntax operator.
#[derive(Debug, Clone, PartialEq)]
pub enum RegexOpt {
    /// Empty sequence permitted.
    Literal { codes: Vec<u32>, domain: Domain },
    CharRange {
        complement: bool,
        ranges: Vec<CharRange>,
        domain: Domain,
    },
    Dot { domain: Domain },
    /// A dotted identifier, resolved at compile time by the resolver.
    NamedRef { qualified_name: String },
    /// A quoted-string key, resolved against an environment map.
    EnvRef { env_key: String },
    Star(Box<RegexOpt>),
    Plus(Box<RegexOpt>),
    Optional(Box<RegexOpt>),
    /// `high == UNBOUNDED` denotes unbounded; `low == high == 0` and
    /// `high < low` are rejected at construction.
    RangeRepeat {
        inner: Box<RegexOpt>,
        low: u16,
        high: u16,
    },
    /// Order-insensitive disjunction; nested `AnyOf`s are flattened during
    /// resolution, not at construction (a parsed `(a|b)|c` is still nested
    /// until the resolver runs).
    AnyOf(Vec<RegexOpt>),
    Sequence(Vec<RegexOpt>),
}

/// Error produced by a validating constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstBuildError(pub ParseErrorKind);

impl RegexOpt {
    /// Construct a `RangeRepeat`, collapsing to `Star`/`Plus`/`Optional`
    /// where the bounds match, and rejecting `{0,0}` / `high < low`. A `{1,1}` bound
    /// is accepted here (the parser is responsible for surfacing the
    /// "redundant" warning; it is not a hard construction error).
    pub fn range_repeat(inner: RegexOpt, low: u16, high: u16) -> Result<RegexOpt, AstBuildError> {
        if high != UNBOUNDED && high < low {
            return Err(AstBuildError(ParseErrorKind::BadRepeatBound));
        }
        if low == 0 && high == 0 {
            return Err(AstBuildError(ParseErrorKind::BadRepeatBound));
        }

        Ok(match (low, high) {
            (0, UNBOUNDED) => RegexOpt::Star(Box::new(inner)),
            (1, UNBOUNDED) => RegexOpt::Plus(Box::new(inner)),
            (0, 1) => RegexOpt::Optional(Box::new(inner)),
            _ => RegexOpt::RangeRepeat {
                inner: Box::new(inner),
                low,
                high,
            },
        })
    }

    /// Construct an `AnyOf`, requiring at least 2 alternatives; a single
    /// alternative collapses to that alternative.
    pub fn any_of(mut opts: Vec<RegexOpt>) -> RegexOpt {
        if opts.len() == 1 {
            opts.pop().unwrap()
        } else {
            RegexOpt::AnyOf(opts)
        }
    }

    /// `true` for nodes that need parens when embedded inside another
    /// operator's surface rendering.
    pub fn needs_parens(&self) -> bool {
        matches!(
            self,
            RegexOpt::Star(_)
                | RegexOpt::Plus(_)
                | RegexOpt::Optional(_)
                | RegexOpt::RangeRepeat { .. }
                | RegexOpt::AnyOf(_)
                | RegexOpt::Sequence(_)
        )
    }

    /// `true` for nodes that need parens specifically when appearing inside
    /// a `Sequence` rendering (disjunctions must be grouped so they don't
    /// silently absorb neighboring sequence parts).
    pub fn needs_sequence_parens(&self) -> bool {
        matches!(self, RegexOpt::AnyOf(_))
    }

    /// Domain this node is tagged with, if it directly carries one. `Star`,
    /// `Plus`, etc. inherit their inner node's domain; `NamedRef`/`EnvRef`
    /// are domain-agnostic until resolved.
    pub fn domain(&self) -> Option<Domain> {
        match self {
            RegexOpt::Literal { domain, .. } => Some(*domain),
            RegexOpt::CharRange { domain, .. } => Some(*domain),
            RegexOpt::Dot { domain } => Some(*domain),
            RegexOpt::NamedRef { .. } | RegexOpt::EnvRef { .. } => None,
            RegexOpt::Star(inner)
            | RegexOpt::Plus(inner)
            | RegexOpt::Optional(inner)
            | RegexOpt::RangeRepeat { inner, .. } => inner.domain(),
            RegexOpt::AnyOf(opts) | RegexOpt::Sequence(opts) => {
                opts.iter().find_map(|o| o.domain())
            }
        }
    }

    /// Overwrites the domain tag on every `Dot`/`CharRange` node in the
    /// tree to `domain`. Used once, after parsing, when the regex's
    /// declared domain (only known from the trailing `/c`/`/p` framing) is
    /// finally available - `Dot`/`CharRange` syntax carries no lexical
    /// domain marker of its own, unlike `Literal`'s quote character.
    pub fn set_domain(&mut self, domain: Domain) {
        match self {
            RegexOpt::CharRange { domain: d, .. } => *d = domain,
            RegexOpt::Dot { domain: d } => *d = domain,
            RegexOpt::Literal { .. } | RegexOpt::NamedRef { .. } | RegexOpt::EnvRef { .. } => {}
            RegexOpt::Star(inner)
            | RegexOpt::Plus(inner)
            | RegexOpt::Optional(inner)
            | RegexOpt::RangeRepeat { inner, .. } => inner.set_domain(domain),
            RegexOpt::AnyOf(opts) | RegexOpt::Sequence(opts) => {
                opts.iter_mut().for_each(|o| o.set_domain(domain))
            }
        }
    }

    /// Walks the tree checking every `Literal`/`CharRange`/`Dot` shares
    /// `expected`. `NamedRef`/`EnvRef` are opaque until resolved and
    /// are not checked here.
    pub fn check_domain(&self, expected: Domain) -> Result<(), AstBuildError> {
        match self {
            RegexOpt::Literal { domain, .. } | RegexOpt::CharRange { domain, .. } | RegexOpt::Dot { domain } => {
                if *domain != expected {
                    Err(AstBuildError(ParseErrorKind::MixedDomain))
                } else {
                    Ok(())
                }
            }
            RegexOpt::NamedRef { .. } | RegexOpt::EnvRef { .. } => Ok(()),
            RegexOpt::Star(inner)
            | RegexOpt::Plus(inner)
            | RegexOpt::Optional(inner)
            | RegexOpt::RangeRepeat { inner, .. } => inner.check_domain(expected),
            RegexOpt::AnyOf(opts) | RegexOpt::Sequence(opts) => {
                opts.iter().try_for_each(|o| o.check_domain(expected))
            }
        }
    }

    /// Renders this operator back into BREX surface syntax. The result is canonical, not necessarily byte-identical to
    /// whatever the parser originally read - an `AnyOf` with a single
    /// alternative never occurs here since the constructor already
    /// collapsed it, and a char class always renders its ranges sorted.
    pub fn to_surface_form(&self) -> String {
        match self {
            RegexOpt::Literal { codes, domain } => render_literal(*domain, codes),
            RegexOpt::CharRange { complement, ranges, domain } => render_char_class(*domain, *complement, ranges),
            RegexOpt::Dot { .. } => ".".to_string(),
            RegexOpt::NamedRef { qualified_name } => format!("${{{}}}", qualified_name),
            RegexOpt::EnvRef { env_key } => format!("env[\"{}\"]", env_key.replace('\\', "\\\\").replace('"', "\\\"")),
            RegexOpt::Star(inner) => format!("{}*", render_parenthesized(inner)),
            RegexOpt::Plus(inner) => format!("{}+", render_parenthesized(inner)),
            RegexOpt::Optional(inner) => format!("{}?", render_parenthesized(inner)),
            RegexOpt::RangeRepeat { inner, low, high } => {
                let bound = if *high == UNBOUNDED {
                    format!("{{{},}}", low)
                } else if low == high {
                    format!("{{{}}}", low)
                } else {
                    format!("{{{},{}}}", low, high)
                };
                format!("{}{}", render_parenthesized(inner), bound)
            }
            RegexOpt::AnyOf(opts) => opts.iter().map(|o| o.to_surface_form()).collect::<Vec<_>>().join("|"),
            RegexOpt::Sequence(parts) => parts
                .iter()
                .map(|p| if p.needs_sequence_parens() { format!("({})", p.to_surface_form()) } else { p.to_surface_form() })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

fn render_parenthesized(opt: &RegexOpt) -> String {
    if opt.needs_parens() {
        format!("({})", opt.to_surface_form())
    } else {
        opt.to_surface_form()
    }
}

/// Escapes one code point for literal or char-class rendering, reusing the
/// named/hex escape tables in `domain.rs` so a rendered literal parses back
/// to the same code point it started from.
fn render_escaped_char(dom: Domain, code: u32, must_escape: bool) -> String {
    if must_escape || !dom.is_printable(code) {
        match domain::canonical_escape_name(dom, code) {
            Some(name) => format!("%{};", name),
            None => domain::encode_hex_escape(code),
        }
    } else {
        char::from_u32(code).map(|c| c.to_string()).unwrap_or_else(|| domain::encode_hex_escape(code))
    }
}

fn render_literal(dom: Domain, codes: &[u32]) -> String {
    let quote_code = if dom == Domain::Unicode { 0x22 } else { 0x27 };
    let quote = if dom == Domain::Unicode { '"' } else { '\'' };
    let mut out = String::new();
    out.push(quote);
    for &code in codes {
        let must_escape = code == quote_code || code == '%' as u32;
        out.push_str(&render_escaped_char(dom, code, must_escape));
    }
    out.push(quote);
    out
}

fn render_char_class(dom: Domain, complement: bool, ranges: &[CharRange]) -> String {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| r.low);
    let mut out = String::new();
    out.push('[');
    if complement {
        out.push('^');
    }
    for r in &sorted {
        let force = |c: u32| c == '-' as u32 || c == ']' as u32 || c == '^' as u32;
        if r.low == r.high {
            out.push_str(&render_escaped_char(dom, r.low, force(r.low)));
        } else {
            out.push_str(&render_escaped_char(dom, r.low, force(r.low)));
            out.push('-');
            out.push_str(&render_escaped_char(dom, r.high, force(r.high)));
        }
    }
    out.push(']');
    out
}

/// A single top-level entry: an operator tree plus three independent
/// flags (negation, front-check, back-check). A front-check and back-check cannot coexist.
#[derive(Debug, Clone, PartialEq)]
pub struct RegexToplevelEntry {
    pub opt: RegexOpt,
    pub is_negated: bool,
    pub is_front_check: bool,
    pub is_back_check: bool,
}

impl RegexToplevelEntry {
    pub fn new(
        opt: RegexOpt,
        is_negated: bool,
        is_front_check: bool,
        is_back_check: bool,
    ) -> Result<Self, AstBuildError> {
        if is_front_check && is_back_check {
            return Err(AstBuildError(ParseErrorKind::MismatchedAnchors));
        }
        Ok(RegexToplevelEntry {
            opt,
            is_negated,
            is_front_check,
            is_back_check,
        })
    }

    pub fn plain(opt: RegexOpt) -> Self {
        RegexToplevelEntry {
            opt,
            is_negated: false,
            is_front_check: false,
            is_back_check: false,
        }
    }

    /// A "binding" entry contributes candidate match positions (plain, not
    /// negated or anchored); a "checking" entry only filters.
    pub fn is_binding(&self) -> bool {
        !self.is_negated && !self.is_front_check && !self.is_back_check
    }

    /// Renders the entry's flags then its operator tree.
    pub fn to_surface_form(&self) -> String {
        let mut out = String::new();
        if self.is_negated {
            out.push('!');
        }
        if self.is_front_check {
            out.push('^');
        }
        out.push_str(&self.opt.to_surface_form());
        if self.is_back_check {
            out.push('$');
        }
        out
    }
}

/// Either a single top-level entry or a conjunction (`AllOf`) of entries.
#[derive(Debug, Clone, PartialEq)]
pub enum RegexComponent {
    Single(RegexToplevelEntry),
    AllOf(Vec<RegexToplevelEntry>),
}

impl RegexComponent {
    /// A pre-anchor component must consist entirely of front-checks or
    /// plain expressions.
    pub fn valid_pre_anchor(&self) -> bool {
        self.entries()
            .iter()
            .all(|e| e.is_front_check || e.is_binding())
    }

    /// Symmetric to `valid_pre_anchor` for the post-anchor position.
    pub fn valid_post_anchor(&self) -> bool {
        self.entries()
            .iter()
            .all(|e| e.is_back_check || e.is_binding())
    }

    /// A "plain" entry here means "binding"
    /// (non-negated, non-anchored) - used to decide whether a component can
    /// contribute candidate match positions at all.
    pub fn has_plain_entry(&self) -> bool {
        self.entries().iter().any(|e| e.is_binding())
    }

    /// A component that is fully front/back-checks, with no entry that
    /// could serve as the component's actual matchable body, is invalid as
    /// a standalone body. Unlike
    /// `has_plain_entry`, negation alone doesn't disqualify an entry here -
    /// `!"cat"` is still a matchable body, just an inverted one.
    pub fn has_matchable_entry(&self) -> bool {
        self.entries().iter().any(|e| !e.is_front_check && !e.is_back_check)
    }

    pub fn entries(&self) -> Vec<&RegexToplevelEntry> {
        match self {
            RegexComponent::Single(e) => vec![e],
            RegexComponent::AllOf(es) => es.iter().collect(),
        }
    }

    pub fn entries_mut(&mut self) -> Vec<&mut RegexToplevelEntry> {
        match self {
            RegexComponent::Single(e) => vec![e],
            RegexComponent::AllOf(es) => es.iter_mut().collect(),
        }
    }

    pub fn set_domain(&mut self, domain: Domain) {
        self.entries_mut().into_iter().for_each(|e| e.opt.set_domain(domain));
    }

    /// Renders as a bare entry, or `&`-joined entries for `AllOf`.
    pub fn to_surface_form(&self) -> String {
        match self {
            RegexComponent::Single(e) => e.to_surface_form(),
            RegexComponent::AllOf(es) => es.iter().map(|e| e.to_surface_form()).collect::<Vec<_>>().join("&"),
        }
    }
}

/// Std matches arbitrary text; Path restricts which executor operations are
/// legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Std,
    Path,
}

/// The top-level compiled-from-source regex value.
#[derive(Debug, Clone, PartialEq)]
pub struct Regex {
    pub domain: Domain,
    pub kind: Kind,
    pub pre_anchor: Option<RegexComponent>,
    pub body: RegexComponent,
    pub post_anchor: Option<RegexComponent>,
}

impl Regex {
    pub fn new(
        domain: Domain,
        kind: Kind,
        pre_anchor: Option<RegexComponent>,
        body: RegexComponent,
        post_anchor: Option<RegexComponent>,
    ) -> Result<Self, AstBuildError> {
        if kind == Kind::Path && domain != Domain::Char {
            return Err(AstBuildError(ParseErrorKind::MixedDomain));
        }
        if let Some(pre) = &pre_anchor {
            if !pre.valid_pre_anchor() {
                return Err(AstBuildError(ParseErrorKind::MismatchedAnchors));
            }
        }
        if let Some(post) = &post_anchor {
            if !post.valid_post_anchor() {
                return Err(AstBuildError(ParseErrorKind::MismatchedAnchors));
            }
        }
        if !body.has_matchable_entry() {
            return Err(AstBuildError(ParseErrorKind::MismatchedAnchors));
        }

        Ok(Regex {
            domain,
            kind,
            pre_anchor,
            body,
            post_anchor,
        })
    }

    /// `can_use_in_test`: whole-range `test` needs no particular anchor
    /// shape beyond what's already validated at construction.
    pub fn can_use_in_test(&self, _oob_prefix: bool, _oob_postfix: bool) -> bool {
        true
    }

    /// `can_use_in_contains`: an `AllOf` body is never usable in `contains`
    /// - only a `Single`, plain (non-negated, non-anchored)
    /// entry can scan starting offsets via `match_test_forward`.
    pub fn can_use_in_contains(&self) -> bool {
        matches!(&self.body, RegexComponent::Single(e) if e.is_binding())
    }

    pub fn can_starts_with(&self, _oob_prefix: bool) -> bool {
        self.body.has_plain_entry()
    }

    pub fn can_ends_with(&self, _oob_postfix: bool) -> bool {
        self.body.has_plain_entry()
    }

    pub fn can_use_in_match_contains(&self) -> bool {
        self.can_use_in_contains()
    }

    pub fn can_use_in_match_start(&self, oob_prefix: bool) -> bool {
        self.can_starts_with(oob_prefix)
    }

    pub fn can_use_in_match_end(&self, oob_postfix: bool) -> bool {
        self.can_ends_with(oob_postfix)
    }

    /// Renders the full `/…/` (or `/…/c`, `/…/p`) framed surface form,
    /// including the `prefix^<body>$suffix` anchor framing
    /// when pre/post anchors are present.
    pub fn to_surface_form(&self) -> String {
        let suffix = match (self.domain, self.kind) {
            (Domain::Char, Kind::Std) => "c",
            (Domain::Char, Kind::Path) => "p",
            (Domain::Unicode, Kind::Std) => "",
            (Domain::Unicode, Kind::Path) => unreachable!("Path always pairs with the Char domain"),
        };

        let inner = match (&self.pre_anchor, &self.post_anchor) {
            (None, None) => self.body.to_surface_form(),
            (None, Some(post)) => format!("<{}>${}", self.body.to_surface_form(), post.to_surface_form()),
            (Some(pre), None) => format!("{}^<{}>", pre.to_surface_form(), self.body.to_surface_form()),
            (Some(pre), Some(post)) => {
                format!("{}^<{}>${}", pre.to_surface_form(), self.body.to_surface_form(), post.to_surface_form())
            }
        };

        format!("/{}/{}", inner, suffix)
    }
}
