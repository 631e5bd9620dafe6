//! NFA simulation over a string iterator.
//!
//! The token-carrying simulation keeps three disjoint token partitions
//! (`Simple`/`Single`/`Full`) so bounded-counter repetitions and unbounded
//! stars coexist without exponential blow-up. Grounded on
//! `nfa_machine.h`/`.cpp` and `nfa_executor.h`; the `RangeK` epsilon
//! transition, including the `Full`-state case for nested bounded
//! repetitions, follows a single consistent step function rather than
//! leaving that case unimplemented.
//!
//! Positions are code-point indices into the match input, not raw byte
//! offsets - `MatchInput` decodes a byte buffer into code points once up
//! front (via `domain.rs`'s UTF-8 codec for the Unicode domain, or a
//! straight byte-to-codepoint cast for the Char domain) so the executor
//! itself stays domain-agnostic and the "ascending for forward, descending
//! for reverse" ordering a bidirectional matcher requires falls out of
//! indexing a `Vec<u32>` instead of re-deriving byte boundaries on every
//! step.

use std::collections::VecDeque;

use crate::core::nfa::{saturate_inc, Counter, NfaOpcode, NfaProgram, StateId, ACCEPT_STATE, UNBOUNDED_K};

/// A decoded match subject: a sequence of code points plus whatever byte
/// length each one occupied, letting a caller map a code-point position
/// back to a byte offset if it needs to (the codec in `domain.rs` produces
/// this; parsing text into it is this module's only interaction with
/// byte-level concerns).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchInput {
    codes: Vec<u32>,
}

impl MatchInput {
    pub fn from_codes(codes: Vec<u32>) -> Self {
        MatchInput { codes }
    }

    /// Decode a UTF-8 string into code points (Unicode domain).
    pub fn from_unicode_str(s: &str) -> Self {
        MatchInput { codes: s.chars().map(|c| c as u32).collect() }
    }

    /// Decode an ASCII/Char-domain byte buffer into code points.
    pub fn from_char_bytes(bytes: &[u8]) -> Self {
        MatchInput { codes: bytes.iter().map(|&b| b as u32).collect() }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn code_at(&self, pos: usize) -> Option<u32> {
        self.codes.get(pos).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TokenSet {
    simple: std::collections::BTreeSet<StateId>,
    single: std::collections::BTreeSet<(StateId, Counter)>,
    full: std::collections::BTreeSet<(StateId, Vec<Counter>)>,
}

impl TokenSet {
    fn is_empty(&self) -> bool {
        self.simple.is_empty() && self.single.is_empty() && self.full.is_empty()
    }

    fn contains_accept(&self) -> bool {
        self.simple.contains(&ACCEPT_STATE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WorkItem {
    Simple(StateId),
    Single(StateId, Counter),
    Full(StateId, Vec<Counter>),
}

/// Normalizes a counter vector so equal counter sets always serialize
/// identically (sorted by the `RangeK` node's state id), and collapses it
/// back down to `Single`/`Simple` where the vector has shrunk.
fn push_counters(queue: &mut VecDeque<WorkItem>, target: StateId, mut counters: Vec<Counter>) {
    counters.sort_by_key(|c| c.0);
    match counters.len() {
        0 => queue.push_back(WorkItem::Simple(target)),
        1 => queue.push_back(WorkItem::Single(target, counters[0])),
        _ => queue.push_back(WorkItem::Full(target, counters)),
    }
}

fn find_counter(counters: &[Counter], node: StateId) -> Option<usize> {
    counters.iter().position(|(s, _)| *s == node)
}

/// Epsilon-closes a seeded worklist to a fixpoint,
/// partitioning the result into concrete (stalled) tokens.
fn close_epsilon(program: &NfaProgram, seed: Vec<WorkItem>) -> TokenSet {
    let mut result = TokenSet::default();
    let mut seen_simple = std::collections::HashSet::new();
    let mut seen_single = std::collections::HashSet::new();
    let mut seen_full = std::collections::HashSet::new();
    let mut queue: VecDeque<WorkItem> = VecDeque::from(seed);

    while let Some(item) = queue.pop_front() {
        match item {
            WorkItem::Simple(s) => {
                if !seen_simple.insert(s) {
                    continue;
                }
                let op = program.opcode(s);
                if op.is_concrete() {
                    result.simple.insert(s);
                    continue;
                }
                match op {
                    NfaOpcode::AnyOf { follows } => {
                        for f in follows.clone() {
                            queue.push_back(WorkItem::Simple(f));
                        }
                    }
                    NfaOpcode::Star { match_follow, skip_follow } => {
                        queue.push_back(WorkItem::Simple(*match_follow));
                        queue.push_back(WorkItem::Simple(*skip_follow));
                    }
                    NfaOpcode::RangeK { in_follow, out_follow, min_k, .. } => {
                        queue.push_back(WorkItem::Single(*in_follow, (s, 1)));
                        if *min_k == 0 {
                            queue.push_back(WorkItem::Simple(*out_follow));
                        }
                    }
                    _ => unreachable!("concrete opcodes handled above"),
                }
            }
            WorkItem::Single(s, counter) => {
                if !seen_single.insert((s, counter)) {
                    continue;
                }
                let op = program.opcode(s);
                if op.is_concrete() {
                    result.single.insert((s, counter));
                    continue;
                }
                match op {
                    NfaOpcode::AnyOf { follows } => {
                        for f in follows.clone() {
                            queue.push_back(WorkItem::Single(f, counter));
                        }
                    }
                    NfaOpcode::Star { match_follow, skip_follow } => {
                        queue.push_back(WorkItem::Single(*match_follow, counter));
                        queue.push_back(WorkItem::Single(*skip_follow, counter));
                    }
                    NfaOpcode::RangeK { in_follow, out_follow, min_k, max_k } => {
                        let (owner, count) = counter;
                        if owner != s {
                            // Entering a second, distinct counter context:
                            // promote to a Full token carrying both.
                            push_counters(&mut queue, *in_follow, vec![counter, (s, 1)]);
                            if *min_k == 0 {
                                queue.push_back(WorkItem::Single(*out_follow, counter));
                            }
                        } else if count < *min_k {
                            queue.push_back(WorkItem::Single(*in_follow, (owner, saturate_inc(count))));
                        } else if *max_k != UNBOUNDED_K && count == *max_k {
                            queue.push_back(WorkItem::Simple(*out_follow));
                        } else {
                            queue.push_back(WorkItem::Single(*in_follow, (owner, saturate_inc(count))));
                            queue.push_back(WorkItem::Simple(*out_follow));
                        }
                    }
                    _ => unreachable!("concrete opcodes handled above"),
                }
            }
            WorkItem::Full(s, counters) => {
                if !seen_full.insert((s, counters.clone())) {
                    continue;
                }
                let op = program.opcode(s);
                if op.is_concrete() {
                    result.full.insert((s, counters));
                    continue;
                }
                match op {
                    NfaOpcode::AnyOf { follows } => {
                        for f in follows.clone() {
                            queue.push_back(WorkItem::Full(f, counters.clone()));
                        }
                    }
                    NfaOpcode::Star { match_follow, skip_follow } => {
                        queue.push_back(WorkItem::Full(*match_follow, counters.clone()));
                        queue.push_back(WorkItem::Full(*skip_follow, counters.clone()));
                    }
                    NfaOpcode::RangeK { in_follow, out_follow, min_k, max_k } => {
                        match find_counter(&counters, s) {
                            None => {
                                let mut entering = counters.clone();
                                entering.push((s, 1));
                                push_counters(&mut queue, *in_follow, entering);
                                if *min_k == 0 {
                                    push_counters(&mut queue, *out_follow, counters.clone());
                                }
                            }
                            Some(idx) => {
                                let count = counters[idx].1;
                                if count < *min_k {
                                    let mut next = counters.clone();
                                    next[idx].1 = saturate_inc(count);
                                    push_counters(&mut queue, *in_follow, next);
                                } else if *max_k != UNBOUNDED_K && count == *max_k {
                                    let mut exiting = counters.clone();
                                    exiting.remove(idx);
                                    push_counters(&mut queue, *out_follow, exiting);
                                } else {
                                    let mut next = counters.clone();
                                    next[idx].1 = saturate_inc(count);
                                    push_counters(&mut queue, *in_follow, next);

                                    let mut exiting = counters.clone();
                                    exiting.remove(idx);
                                    push_counters(&mut queue, *out_follow, exiting);
                                }
                            }
                        }
                    }
                    _ => unreachable!("concrete opcodes handled above"),
                }
            }
        }
    }

    result
}

fn advance_char(program: &NfaProgram, c: u32, old: &TokenSet) -> TokenSet {
    let mut seed = Vec::new();
    for &s in &old.simple {
        if let Some(follow) = program.opcode(s).follow() {
            if program.opcode(s).matches_char(c) {
                seed.push(WorkItem::Simple(follow));
            }
        }
    }
    for &(s, counter) in &old.single {
        if let Some(follow) = program.opcode(s).follow() {
            if program.opcode(s).matches_char(c) {
                seed.push(WorkItem::Single(follow, counter));
            }
        }
    }
    for (s, counters) in &old.full {
        if let Some(follow) = program.opcode(*s).follow() {
            if program.opcode(*s).matches_char(c) {
                seed.push(WorkItem::Full(follow, counters.clone()));
            }
        }
    }
    close_epsilon(program, seed)
}

fn initial_state(program: &NfaProgram) -> TokenSet {
    close_epsilon(program, vec![WorkItem::Simple(program.start)])
}

/// Forward or reverse traversal over a `MatchInput` slice, used by both
/// `test`/`match_test_*` (stop early) and `match_forward`/`match_reverse`
/// (collect every accepting position).
struct Cursor<'a> {
    input: &'a MatchInput,
    pos: i64,
    end: i64,
    reverse: bool,
}

impl<'a> Cursor<'a> {
    fn forward(input: &'a MatchInput, spos: usize, epos: usize) -> Self {
        Cursor { input, pos: spos as i64, end: epos as i64, reverse: false }
    }

    fn backward(input: &'a MatchInput, spos: usize, epos: usize) -> Self {
        Cursor { input, pos: epos as i64, end: spos as i64, reverse: true }
    }

    fn valid(&self) -> bool {
        if self.reverse {
            self.pos >= self.end
        } else {
            self.pos <= self.end
        }
    }

    fn get(&self) -> u32 {
        self.input.code_at(self.pos as usize).expect("valid() checked bounds")
    }

    fn step(&mut self) {
        if self.reverse {
            self.pos -= 1;
        } else {
            self.pos += 1;
        }
    }

    fn curr(&self) -> i64 {
        self.pos
    }
}

/// Executes a compiled forward+reverse NFA pair over a `MatchInput`
///. Immutable after construction; a match invocation's
/// transient token sets are local to that call, so concurrent read-only
/// matches over distinct inputs are safe.
#[derive(Debug, Clone)]
pub struct NfaExecutor {
    forward: NfaProgram,
    reverse: NfaProgram,
}

impl NfaExecutor {
    pub fn new(forward: NfaProgram, reverse: NfaProgram) -> Self {
        NfaExecutor { forward, reverse }
    }

    /// Whether the forward machine accepts the empty string, independent of
    /// any input - used by `matcher.rs` for anchor checks against a region
    /// that runs off the start/end of the subject.
    pub fn accepts_empty(&self) -> bool {
        initial_state(&self.forward).contains_accept()
    }

    /// Whole-range match: consume every position in `[spos, epos]`, then
    /// check acceptance. Empty range (`spos > epos`) accepts iff the start
    /// state is already accepting.
    pub fn test(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        let mut state = initial_state(&self.forward);
        if input.is_empty() || spos as i64 > epos as i64 {
            return state.contains_accept();
        }
        let mut cursor = Cursor::forward(input, spos, epos);
        while cursor.valid() {
            state = advance_char(&self.forward, cursor.get(), &state);
            cursor.step();
            if state.is_empty() {
                return false;
            }
        }
        state.contains_accept()
    }

    /// Forward scan from `spos`, halting the instant the state set accepts
    /// or becomes fully rejected - used for front-checks.
    pub fn match_test_forward(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        let mut state = initial_state(&self.forward);
        if input.is_empty() || spos as i64 > epos as i64 {
            return state.contains_accept();
        }
        let mut cursor = Cursor::forward(input, spos, epos);
        while cursor.valid() && !(state.contains_accept() || state.is_empty()) {
            state = advance_char(&self.forward, cursor.get(), &state);
            cursor.step();
        }
        state.contains_accept()
    }

    /// Reverse scan from `epos`, using the reverse machine - used for
    /// back-checks.
    pub fn match_test_reverse(&self, input: &MatchInput, spos: usize, epos: usize) -> bool {
        let mut state = initial_state(&self.reverse);
        if input.is_empty() || spos as i64 > epos as i64 {
            return state.contains_accept();
        }
        let mut cursor = Cursor::backward(input, spos, epos);
        while cursor.valid() && !(state.contains_accept() || state.is_empty()) {
            state = advance_char(&self.reverse, cursor.get(), &state);
            cursor.step();
        }
        state.contains_accept()
    }

    /// Every position (ascending) at which the forward machine accepts,
    /// starting from `spos`.
    pub fn match_forward(&self, input: &MatchInput, spos: usize, epos: usize) -> Vec<i64> {
        let mut state = initial_state(&self.forward);
        let mut matches = Vec::new();
        if input.is_empty() || spos as i64 > epos as i64 {
            return matches;
        }
        if state.contains_accept() {
            matches.push(spos as i64 - 1);
        }
        let mut cursor = Cursor::forward(input, spos, epos);
        while cursor.valid() && !state.is_empty() {
            let c = cursor.get();
            state = advance_char(&self.forward, c, &state);
            cursor.step();
            if state.contains_accept() {
                matches.push(cursor.curr() - 1);
            }
        }
        matches
    }

    /// Every position (descending) at which the reverse machine accepts,
    /// starting from `epos`.
    pub fn match_reverse(&self, input: &MatchInput, spos: usize, epos: usize) -> Vec<i64> {
        let mut state = initial_state(&self.reverse);
        let mut matches = Vec::new();
        if input.is_empty() || spos as i64 > epos as i64 {
            return matches;
        }
        if state.contains_accept() {
            matches.push(epos as i64 + 1);
        }
        let mut cursor = Cursor::backward(input, spos, epos);
        while cursor.valid() && !state.is_empty() {
            let c = cursor.get();
            state = advance_char(&self.reverse, c, &state);
            cursor.step();
            if state.contains_accept() {
                matches.push(cursor.curr() + 1);
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compiler::compile_opt;
    use crate::core::domain::Domain;
    use crate::core::nodes::RegexOpt;

    fn lit(s: &str) -> RegexOpt {
        RegexOpt::Literal { codes: s.chars().map(|c| c as u32).collect(), domain: Domain::Unicode }
    }

    fn executor_for(opt: &RegexOpt) -> NfaExecutor {
        let pair = compile_opt(opt);
        NfaExecutor::new(pair.forward, pair.reverse)
    }

    #[test]
    fn literal_test_exact_match() {
        let exec = executor_for(&lit("abc"));
        let input = MatchInput::from_unicode_str("abc");
        assert!(exec.test(&input, 0, 2));
        let input2 = MatchInput::from_unicode_str("abcd");
        assert!(!exec.test(&input2, 0, 3));
    }

    #[test]
    fn star_matches_empty_string() {
        let exec = executor_for(&RegexOpt::Star(Box::new(lit("a"))));
        let input = MatchInput::from_codes(vec![]);
        assert!(exec.test(&input, 0, 0));
    }

    #[test]
    fn range_repeat_bounds_are_enforced() {
        let digit = RegexOpt::CharRange {
            complement: false,
            ranges: vec![crate::core::nodes::CharRange::new('0' as u32, '9' as u32)],
            domain: Domain::Unicode,
        };
        let opt = RegexOpt::range_repeat(digit, 1, 3).unwrap();
        let exec = executor_for(&opt);

        let ok = MatchInput::from_unicode_str("12");
        assert!(exec.test(&ok, 0, 1));

        let too_long = MatchInput::from_unicode_str("1234");
        assert!(!exec.test(&too_long, 0, 3));
    }

    #[test]
    fn plus_requires_at_least_one() {
        let exec = executor_for(&RegexOpt::Plus(Box::new(lit("a"))));
        let empty = MatchInput::from_codes(vec![]);
        assert!(!exec.test(&empty, 0, 0));
        let one = MatchInput::from_unicode_str("a");
        assert!(exec.test(&one, 0, 0));
    }

    #[test]
    fn match_forward_returns_ascending_positions() {
        let digit = RegexOpt::CharRange {
            complement: false,
            ranges: vec![crate::core::nodes::CharRange::new('0' as u32, '9' as u32)],
            domain: Domain::Unicode,
        };
        let opt = RegexOpt::Plus(Box::new(digit));
        let exec = executor_for(&opt);
        let input = MatchInput::from_unicode_str("123a456");

        let front = exec.match_forward(&input, 0, 6);
        assert_eq!(front, vec![0, 1, 2]);

        let back = exec.match_reverse(&input, 0, 6);
        assert_eq!(back, vec![6, 5, 4]);
    }

    #[test]
    fn nested_range_repeat_uses_full_state_tokens() {
        // (a{1,2}){1,2} - exercises the Full-state counter path.
        let inner = RegexOpt::range_repeat(lit("a"), 1, 2).unwrap();
        let outer = RegexOpt::range_repeat(inner, 1, 2).unwrap();
        let exec = executor_for(&outer);

        assert!(exec.test(&MatchInput::from_unicode_str("a"), 0, 0));
        assert!(exec.test(&MatchInput::from_unicode_str("aa"), 0, 1));
        assert!(exec.test(&MatchInput::from_unicode_str("aaa"), 0, 2));
        assert!(exec.test(&MatchInput::from_unicode_str("aaaa"), 0, 3));
        assert!(!exec.test(&MatchInput::from_unicode_str("aaaaa"), 0, 4));
    }
}
