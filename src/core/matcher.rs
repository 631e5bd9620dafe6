//! Compiled-entry composition into the full query surface, grounded on `brex_executor.h`'s `SingleCheckREInfo` /
//! `MultiCheckREInfo` / `REExecutor`.
//!
//! A `RegexComponent::Single` entry compiles to one [`SingleCheck`]; an
//! `AllOf` compiles to a [`MultiCheck`] that intersects the binding
//! entries' candidate positions and filters by the checking entries
//! (negated/front-check/back-check). `REExecutor` then layers the body's
//! component check against an optional pre/post anchor, the way the
//! original composes `optPre`/`optPost` with the body's `re`.

use crate::core::compiler::{CompiledRegex, EntryFlags, NfaPair};
use crate::core::errors::ExecuteError;
use crate::core::executor::{MatchInput, NfaExecutor};
use crate::core::nodes::Regex;

/// `None` denotes an empty region (off either end of the subject, or a
/// genuinely zero-length span); `Some((s, e))` is always `s <= e`.
pub type Range = Option<(usize, usize)>;

fn preceding_range(spos: usize) -> Range {
    if spos == 0 {
        None
    } else {
        Some((0, spos - 1))
    }
}

fn following_range(epos: usize, len: usize) -> Range {
    if epos + 1 >= len {
        None
    } else {
        Some((epos + 1, len - 1))
    }
}

/// One compiled top-level entry plus its flags.
pub struct SingleCheck {
    executor: NfaExecutor,
    flags: EntryFlags,
}

impl SingleCheck {
    pub fn new(pair: NfaPair, flags: EntryFlags) -> Self {
        SingleCheck { executor: NfaExecutor::new(pair.forward, pair.reverse), flags }
    }

    /// Whole-range (or anchored-half-range) acceptance, honoring negation.
    fn raw_test(&self, input: &MatchInput, range: Range) -> bool {
        let accepted = match range {
            None => self.executor.accepts_empty(),
            Some((s, e)) => {
                if self.flags.is_front_check {
                    self.executor.match_test_forward(input, s, e)
                } else if self.flags.is_back_check {
                    self.executor.match_test_reverse(input, s, e)
                } else {
                    self.executor.test(input, s, e)
                }
            }
        };
        accepted != self.flags.is_negated
    }

    fn test(&self, input: &MatchInput, range: Range) -> bool {
        self.raw_test(input, range)
    }

    /// Does some substring of `[spos, epos]` match? Scans every start
    /// offset, halting the instant one accepts.
    fn test_contains(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        let mut found = false;
        if spos <= epos {
            for s in spos..=epos {
                if self.executor.match_test_forward(input, s, epos) {
                    found = true;
                    break;
                }
            }
        }
        found != self.flags.is_negated
    }

    /// Match starting exactly at `spos`: does the forward machine ever
    /// accept while consuming from `spos`?
    fn test_front(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        let accepted = if spos <= epos {
            self.executor.match_test_forward(input, spos, epos)
        } else {
            self.executor.accepts_empty()
        };
        accepted != self.flags.is_negated
    }

    /// Match ending exactly at `epos`.
    fn test_back(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        let accepted = if spos <= epos {
            self.executor.match_test_reverse(input, spos, epos)
        } else {
            self.executor.accepts_empty()
        };
        accepted != self.flags.is_negated
    }

    /// The longest match starting at `spos`, as an inclusive end position.
    fn match_front(&self, input: &MatchInput, spos: usize, epos: usize) -> Option<i64> {
        if spos > epos {
            return if self.executor.accepts_empty() { Some(spos as i64 - 1) } else { None };
        }
        self.executor.match_forward(input, spos, epos).into_iter().max()
    }

    /// The longest match ending at `epos`, as an inclusive start position.
    fn match_back(&self, input: &MatchInput, spos: usize, epos: usize) -> Option<i64> {
        if spos > epos {
            return if self.executor.accepts_empty() { Some(epos as i64 + 1) } else { None };
        }
        self.executor.match_reverse(input, spos, epos).into_iter().min()
    }

    /// Earliest (start, end) substring match in `[spos, epos]`.
    fn match_contains_first(&self, input: &MatchInput, spos: usize, epos: usize) -> Option<(usize, usize)> {
        if spos > epos {
            return None;
        }
        for s in spos..=epos {
            let matches = self.executor.match_forward(input, s, epos);
            if let Some(&end) = matches.iter().find(|&&e| e >= s as i64) {
                return Some((s, end as usize));
            }
        }
        None
    }

    /// Latest (start, end) substring match in `[spos, epos]`.
    fn match_contains_last(&self, input: &MatchInput, spos: usize, epos: usize) -> Option<(usize, usize)> {
        if spos > epos {
            return None;
        }
        for s in (spos..=epos).rev() {
            let matches = self.executor.match_forward(input, s, epos);
            if let Some(&end) = matches.iter().filter(|&&e| e >= s as i64).max() {
                return Some((s, end as usize));
            }
        }
        None
    }
}

/// A conjunction of compiled entries.
pub struct MultiCheck {
    checks: Vec<SingleCheck>,
}

impl MultiCheck {
    pub fn new(checks: Vec<SingleCheck>) -> Self {
        MultiCheck { checks }
    }

    fn bindings(&self) -> impl Iterator<Item = &SingleCheck> {
        self.checks.iter().filter(|c| !c.flags.is_negated && !c.flags.is_front_check && !c.flags.is_back_check)
    }

    fn checking(&self) -> impl Iterator<Item = &SingleCheck> {
        self.checks.iter().filter(|c| c.flags.is_negated || c.flags.is_front_check || c.flags.is_back_check)
    }

    fn test(&self, input: &MatchInput, range: Range) -> bool {
        self.checks.iter().all(|c| c.test(input, range))
    }

    fn test_front(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        self.match_front(input, spos, epos).is_some()
    }

    fn test_back(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        self.match_back(input, spos, epos).is_some()
    }

    /// Longest end position at which every binding entry agrees a match
    /// exists, filtered by every checking entry also passing over the
    /// surviving span.
    fn match_front(&self, input: &MatchInput, spos: usize, epos: usize) -> Option<i64> {
        let mut candidates: Option<Vec<i64>> = None;
        for binding in self.bindings() {
            let ends = binding.executor.match_forward(input, spos, epos);
            candidates = Some(match candidates {
                None => ends,
                Some(prev) => intersect_sorted(&prev, &ends),
            });
        }
        let mut candidates = candidates.unwrap_or_default();
        candidates.sort_unstable();
        candidates.into_iter().rev().find(|&end| {
            if end < spos as i64 {
                self.checking().all(|c| c.test(input, None))
            } else {
                let e = end as usize;
                self.checking().all(|c| c.test_front(input, spos, e))
            }
        })
    }

    fn match_back(&self, input: &MatchInput, spos: usize, epos: usize) -> Option<i64> {
        let mut candidates: Option<Vec<i64>> = None;
        for binding in self.bindings() {
            let starts = binding.executor.match_reverse(input, spos, epos);
            candidates = Some(match candidates {
                None => starts,
                Some(prev) => intersect_sorted(&prev, &starts),
            });
        }
        let mut candidates = candidates.unwrap_or_default();
        candidates.sort_unstable_by(|a, b| b.cmp(a));
        candidates.into_iter().find(|&start| {
            start <= epos as i64 + 1
                && self.checking().all(|c| {
                    let s = start.min(epos as i64 + 1).max(0) as usize;
                    c.test_back(input, s, epos)
                })
        })
    }

    /// `AllOf` is not usable as a `contains` query - a
    /// conjunction of differently-shaped substrings has no single well
    /// defined span.
    fn test_contains(&self, _input: &MatchInput, _spos: usize, _epos: usize) -> bool {
        false
    }

    fn match_contains_first(&self, _input: &MatchInput, _spos: usize, _epos: usize) -> Option<(usize, usize)> {
        None
    }

    fn match_contains_last(&self, _input: &MatchInput, _spos: usize, _epos: usize) -> Option<(usize, usize)> {
        None
    }
}

fn intersect_sorted(a: &[i64], b: &[i64]) -> Vec<i64> {
    let set: std::collections::BTreeSet<i64> = b.iter().copied().collect();
    a.iter().copied().filter(|v| set.contains(v)).collect()
}

/// Either a single check or a conjunction, mirroring [`RegexComponent`].
///
/// [`RegexComponent`]: crate::core::nodes::RegexComponent
pub enum ComponentCheck {
    Single(SingleCheck),
    AllOf(MultiCheck),
}

impl ComponentCheck {
    fn from_entries(entries: Vec<(NfaPair, EntryFlags)>) -> Self {
        let mut checks: Vec<SingleCheck> = entries.into_iter().map(|(pair, flags)| SingleCheck::new(pair, flags)).collect();
        if checks.len() == 1 {
            ComponentCheck::Single(checks.pop().unwrap())
        } else {
            ComponentCheck::AllOf(MultiCheck::new(checks))
        }
    }

    fn test(&self, input: &MatchInput, range: Range) -> bool {
        match self {
            ComponentCheck::Single(c) => c.test(input, range),
            ComponentCheck::AllOf(c) => c.test(input, range),
        }
    }

    fn test_front(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        match self {
            ComponentCheck::Single(c) => c.test_front(input, spos, epos),
            ComponentCheck::AllOf(c) => c.test_front(input, spos, epos),
        }
    }

    fn test_back(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        match self {
            ComponentCheck::Single(c) => c.test_back(input, spos, epos),
            ComponentCheck::AllOf(c) => c.test_back(input, spos, epos),
        }
    }

    fn test_contains(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        match self {
            ComponentCheck::Single(c) => c.test_contains(input, spos, epos),
            ComponentCheck::AllOf(c) => c.test_contains(input, spos, epos),
        }
    }

    fn match_front(&self, input: &MatchInput, spos: usize, epos: usize) -> Option<i64> {
        match self {
            ComponentCheck::Single(c) => c.match_front(input, spos, epos),
            ComponentCheck::AllOf(c) => c.match_front(input, spos, epos),
        }
    }

    fn match_back(&self, input: &MatchInput, spos: usize, epos: usize) -> Option<i64> {
        match self {
            ComponentCheck::Single(c) => c.match_back(input, spos, epos),
            ComponentCheck::AllOf(c) => c.match_back(input, spos, epos),
        }
    }

    fn match_contains_first(&self, input: &MatchInput, spos: usize, epos: usize) -> Option<(usize, usize)> {
        match self {
            ComponentCheck::Single(c) => c.match_contains_first(input, spos, epos),
            ComponentCheck::AllOf(c) => c.match_contains_first(input, spos, epos),
        }
    }

    fn match_contains_last(&self, input: &MatchInput, spos: usize, epos: usize) -> Option<(usize, usize)> {
        match self {
            ComponentCheck::Single(c) => c.match_contains_last(input, spos, epos),
            ComponentCheck::AllOf(c) => c.match_contains_last(input, spos, epos),
        }
    }
}

/// Composes a compiled regex's body with its optional pre/post anchors
///: `test()` requires the body to accept the
/// declared span AND the pre-anchor to back-check everything before it
/// AND the post-anchor to front-check everything after it.
pub struct REExecutor {
    pre_anchor: Option<ComponentCheck>,
    body: ComponentCheck,
    post_anchor: Option<ComponentCheck>,
    contains_usable: bool,
    match_start_usable: bool,
    match_end_usable: bool,
}

impl REExecutor {
    /// Builds an executor from `regex`'s compiled form, recording the
    /// regex-kind predicates so `test_contains`/`match_*`
    /// can reject unsupported shapes instead of silently returning an
    /// always-empty result.
    pub fn new(regex: &Regex, compiled: CompiledRegex) -> Self {
        REExecutor {
            pre_anchor: compiled.pre_anchor.map(ComponentCheck::from_entries),
            body: ComponentCheck::from_entries(compiled.body),
            post_anchor: compiled.post_anchor.map(ComponentCheck::from_entries),
            contains_usable: regex.can_use_in_contains(),
            match_start_usable: regex.can_use_in_match_start(false),
            match_end_usable: regex.can_use_in_match_end(false),
        }
    }

    fn check_pre(&self, input: &MatchInput, spos: usize) -> bool {
        match &self.pre_anchor {
            None => true,
            Some(check) => check.test(input, preceding_range(spos)),
        }
    }

    fn check_post(&self, input: &MatchInput, epos: usize, len: usize) -> bool {
        match &self.post_anchor {
            None => true,
            Some(check) => check.test(input, following_range(epos, len)),
        }
    }

    /// Whole-range match with anchors: `[spos, epos]` must satisfy the
    /// body, and the regions immediately outside it must satisfy the
    /// declared anchors.
    pub fn test(&self, input: &MatchInput, spos: usize, epos: usize) -> Result<bool, ExecuteError> {
        let body_range = if spos <= epos { Some((spos, epos)) } else { None };
        Ok(self.body.test(input, body_range) && self.check_pre(input, spos) && self.check_post(input, epos, input.len()))
    }

    /// Does some substring of `[spos, epos]` match the body, subject to
    /// the pre/post anchors holding at that substring's boundaries?
    pub fn test_contains(&self, input: &MatchInput, spos: usize, epos: usize) -> Result<bool, ExecuteError> {
        if !self.contains_usable {
            return Err(ExecuteError::NotContainsable);
        }
        if self.pre_anchor.is_none() && self.post_anchor.is_none() {
            return Ok(self.body.test_contains(input, spos, epos));
        }
        Ok(self.match_contains_first(input, spos, epos)?.is_some())
    }

    pub fn test_front(&self, input: &MatchInput, spos: usize, epos: usize) -> Result<bool, ExecuteError> {
        if !self.match_start_usable {
            return Err(ExecuteError::NotMatchable);
        }
        Ok(self.check_pre(input, spos) && self.body.test_front(input, spos, epos))
    }

    pub fn test_back(&self, input: &MatchInput, spos: usize, epos: usize) -> Result<bool, ExecuteError> {
        if !self.match_end_usable {
            return Err(ExecuteError::NotMatchable);
        }
        Ok(self.body.test_back(input, spos, epos) && self.check_post(input, epos, input.len()))
    }

    /// The longest body match starting at `spos`, honoring the
    /// post-anchor at the match's end; `None` if no candidate clears both.
    pub fn match_front(&self, input: &MatchInput, spos: usize, epos: usize) -> Result<Option<i64>, ExecuteError> {
        if !self.match_start_usable {
            return Err(ExecuteError::NotMatchable);
        }
        if !self.check_pre(input, spos) {
            return Ok(None);
        }
        Ok(self.body.match_front(input, spos, epos).filter(|&end| {
            end < spos as i64 || self.check_post(input, end as usize, input.len())
        }))
    }

    pub fn match_back(&self, input: &MatchInput, spos: usize, epos: usize) -> Result<Option<i64>, ExecuteError> {
        if !self.match_end_usable {
            return Err(ExecuteError::NotMatchable);
        }
        if !self.check_post(input, epos, input.len()) {
            return Ok(None);
        }
        Ok(self.body.match_back(input, spos, epos).filter(|&start| {
            start > epos as i64 || self.check_pre(input, start as usize)
        }))
    }

    /// First substring match (lowest start, then lowest end) whose
    /// boundaries also satisfy the pre/post anchors.
    pub fn match_contains_first(
        &self,
        input: &MatchInput,
        spos: usize,
        epos: usize,
    ) -> Result<Option<(usize, usize)>, ExecuteError> {
        if !self.contains_usable {
            return Err(ExecuteError::NotContainsable);
        }
        if spos > epos {
            return Ok(None);
        }
        for s in spos..=epos {
            if !self.check_pre(input, s) {
                continue;
            }
            if let Some((start, end)) = self.body.match_contains_first(input, s, epos) {
                if start == s && self.check_post(input, end, input.len()) {
                    return Ok(Some((start, end)));
                }
            }
        }
        Ok(None)
    }

    /// Last substring match (highest start, then highest end).
    pub fn match_contains_last(
        &self,
        input: &MatchInput,
        spos: usize,
        epos: usize,
    ) -> Result<Option<(usize, usize)>, ExecuteError> {
        if !self.contains_usable {
            return Err(ExecuteError::NotContainsable);
        }
        if spos > epos {
            return Ok(None);
        }
        for s in (spos..=epos).rev() {
            if !self.check_pre(input, s) {
                continue;
            }
            if let Some((start, end)) = self.body.match_contains_last(input, s, epos) {
                if start == s && self.check_post(input, end, input.len()) {
                    return Ok(Some((start, end)));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compiler::compile_regex;
    use crate::core::domain::Domain;
    use crate::core::nodes::{Kind, RegexComponent, RegexOpt, RegexToplevelEntry};

    fn lit(s: &str) -> RegexOpt {
        RegexOpt::Literal { codes: s.chars().map(|c| c as u32).collect(), domain: Domain::Unicode }
    }

    fn exec_for(regex: &Regex) -> REExecutor {
        REExecutor::new(regex, compile_regex(regex))
    }

    #[test]
    fn single_entry_test_matches_whole_range() {
        let regex = Regex::new(Domain::Unicode, Kind::Std, None, RegexComponent::Single(RegexToplevelEntry::plain(lit("hi"))), None).unwrap();
        let executor = exec_for(&regex);
        let input = MatchInput::from_unicode_str("hi");
        assert!(executor.test(&input, 0, 1).unwrap());
    }

    #[test]
    fn negated_entry_flips_result() {
        let entry = RegexToplevelEntry::new(lit("hi"), true, false, false).unwrap();
        let regex = Regex::new(Domain::Unicode, Kind::Std, None, RegexComponent::Single(entry), None).unwrap();
        let executor = exec_for(&regex);
        let input = MatchInput::from_unicode_str("hi");
        assert!(!executor.test(&input, 0, 1).unwrap());
        let input2 = MatchInput::from_unicode_str("yo");
        assert!(!executor.test(&input2, 0, 1).unwrap());
    }

    #[test]
    fn all_of_requires_every_entry_to_pass() {
        let a = RegexToplevelEntry::plain(RegexOpt::Plus(Box::new(RegexOpt::Dot { domain: Domain::Unicode })));
        let b = RegexToplevelEntry::new(lit("bad"), true, false, false).unwrap();
        let regex = Regex::new(Domain::Unicode, Kind::Std, None, RegexComponent::AllOf(vec![a, b]), None).unwrap();
        let executor = exec_for(&regex);

        let ok = MatchInput::from_unicode_str("hello");
        assert!(executor.test(&ok, 0, 4).unwrap());

        let bad = MatchInput::from_unicode_str("bad");
        assert!(!executor.test(&bad, 0, 2).unwrap());
    }

    #[test]
    fn match_front_finds_longest_prefix_match() {
        let opt = RegexOpt::Plus(Box::new(RegexOpt::CharRange {
            complement: false,
            ranges: vec![crate::core::nodes::CharRange::new('a' as u32, 'z' as u32)],
            domain: Domain::Unicode,
        }));
        let regex = Regex::new(Domain::Unicode, Kind::Std, None, RegexComponent::Single(RegexToplevelEntry::plain(opt)), None).unwrap();
        let executor = exec_for(&regex);
        let input = MatchInput::from_unicode_str("abc123");
        let end = executor.match_front(&input, 0, 5).unwrap();
        assert_eq!(end, Some(2));
    }

    #[test]
    fn contains_finds_embedded_literal() {
        let regex = Regex::new(Domain::Unicode, Kind::Std, None, RegexComponent::Single(RegexToplevelEntry::plain(lit("cat"))), None).unwrap();
        assert!(regex.can_use_in_contains());
        let executor = exec_for(&regex);
        let input = MatchInput::from_unicode_str("concatenate");
        assert!(executor.test_contains(&input, 0, 10).unwrap());

        let miss = MatchInput::from_unicode_str("doghouse");
        assert!(!executor.test_contains(&miss, 0, 7).unwrap());
    }

    #[test]
    fn all_of_body_rejects_contains_with_not_containable() {
        let a = RegexToplevelEntry::plain(lit("ab"));
        let b = RegexToplevelEntry::new(lit("bad"), true, false, false).unwrap();
        let regex = Regex::new(Domain::Unicode, Kind::Std, None, RegexComponent::AllOf(vec![a, b]), None).unwrap();
        assert!(!regex.can_use_in_contains());
        let executor = exec_for(&regex);
        let input = MatchInput::from_unicode_str("xxabxx");
        assert!(matches!(executor.test_contains(&input, 0, 5), Err(ExecuteError::NotContainsable)));
    }

    #[test]
    fn negated_only_body_rejects_match_front_with_not_matchable() {
        let entry = RegexToplevelEntry::new(lit("hi"), true, false, false).unwrap();
        let regex = Regex::new(Domain::Unicode, Kind::Std, None, RegexComponent::Single(entry), None).unwrap();
        assert!(!regex.can_use_in_match_start(false));
        let executor = exec_for(&regex);
        let input = MatchInput::from_unicode_str("hi");
        assert!(matches!(executor.match_front(&input, 0, 1), Err(ExecuteError::NotMatchable)));
    }
}
