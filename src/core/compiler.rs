//! AST (resolved) -> NFA compiler.
//!
//! Grounded on `brex_compiler.cpp`'s `compileOpt`/`reverseCompileOpt` family:
//! each operator allocates one or more opcodes and returns the state id that
//! represents "start executing this operator", wiring its accept edges to
//! the `follow` state threaded in from the caller. The forward and reverse
//! machines share the construction scheme but differ in two places:
//! `Literal` emits its codes in reverse order for forward
//! and forward order for reverse, and `Sequence` threads its parts
//! right-to-left for forward and left-to-right for reverse.
//!
//! `CompileMetadata` is an ambient feature-usage tracker: it records which
//! constructs a regex used so a caller can introspect a compiled regex
//! without re-walking the AST.

use std::collections::HashSet;

use crate::core::nfa::{NfaOpcode, NfaProgram, StateId, ACCEPT_STATE};
use crate::core::nodes::{Regex, RegexComponent, RegexOpt, RegexToplevelEntry};

/// A forward/reverse NFA pair compiled from one `RegexOpt` tree. The two
/// machines share no state.
#[derive(Debug, Clone, PartialEq)]
pub struct NfaPair {
    pub forward: NfaProgram,
    pub reverse: NfaProgram,
}

/// Records which constructs a regex used - the ambient analogue of the
/// teacher's `analyze_features`/`Metadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileMetadata {
    pub features_used: HashSet<&'static str>,
}

impl CompileMetadata {
    fn observe(&mut self, opt: &RegexOpt) {
        match opt {
            RegexOpt::NamedRef { .. } => {
                self.features_used.insert("named_ref");
            }
            RegexOpt::EnvRef { .. } => {
                self.features_used.insert("env_ref");
            }
            RegexOpt::RangeRepeat { inner, .. } => {
                self.features_used.insert("range_repeat");
                self.observe(inner);
            }
            RegexOpt::Star(inner) | RegexOpt::Plus(inner) | RegexOpt::Optional(inner) => self.observe(inner),
            RegexOpt::AnyOf(opts) => {
                self.features_used.insert("any_of");
                opts.iter().for_each(|o| self.observe(o));
            }
            RegexOpt::Sequence(parts) => parts.iter().for_each(|p| self.observe(p)),
            RegexOpt::CharRange { complement, .. } => {
                if *complement {
                    self.features_used.insert("complement_range");
                }
            }
            RegexOpt::Literal { .. } | RegexOpt::Dot { .. } => {}
        }
    }

    fn observe_entry(&mut self, entry: &RegexToplevelEntry) {
        if entry.is_negated {
            self.features_used.insert("negated_entry");
        }
        if entry.is_front_check {
            self.features_used.insert("front_check");
        }
        if entry.is_back_check {
            self.features_used.insert("back_check");
        }
        self.observe(&entry.opt);
    }

    fn observe_component(&mut self, component: &RegexComponent) {
        match component {
            RegexComponent::Single(entry) => self.observe_entry(entry),
            RegexComponent::AllOf(entries) => {
                self.features_used.insert("all_of");
                entries.iter().for_each(|e| self.observe_entry(e));
            }
        }
    }
}

/// Allocates `NfaOpcode`s into a growable table, grounded on
/// `brex_compiler.cpp`'s `compileOpt(follows, states, opt) -> StateID` shape
/// but as a struct method over an owned buffer instead of a set of static
/// functions over a `Vec<NFAOpt*>` out-parameter.
struct Builder {
    opcodes: Vec<NfaOpcode>,
}

impl Builder {
    fn new() -> Self {
        Builder { opcodes: vec![NfaOpcode::Accept] }
    }

    fn alloc(&mut self, op: NfaOpcode) -> StateId {
        let id = self.opcodes.len();
        self.opcodes.push(op);
        id
    }

    fn reserve(&mut self) -> StateId {
        self.alloc(NfaOpcode::Accept) // placeholder, patched below
    }

    fn patch(&mut self, id: StateId, op: NfaOpcode) {
        self.opcodes[id] = op;
    }

    /// Forward construction: `Literal` emits codes in reverse order so the
    /// returned id is the first character to match.
    fn compile_forward(&mut self, opt: &RegexOpt, follow: StateId) -> StateId {
        match opt {
            RegexOpt::Literal { codes, .. } => {
                let mut f = follow;
                for &code in codes.iter().rev() {
                    f = self.alloc(NfaOpcode::CharCode { code, follow: f });
                }
                f
            }
            RegexOpt::CharRange { complement, ranges, .. } => {
                self.alloc(NfaOpcode::CharRange { complement: *complement, ranges: ranges.clone(), follow })
            }
            RegexOpt::Dot { .. } => self.alloc(NfaOpcode::Dot { follow }),
            RegexOpt::Star(inner) => {
                let s = self.reserve();
                let opt_follow = self.compile_forward(inner, s);
                self.patch(s, NfaOpcode::Star { match_follow: opt_follow, skip_follow: follow });
                s
            }
            RegexOpt::Plus(inner) => {
                let s = self.reserve();
                let opt_follow = self.compile_forward(inner, s);
                self.patch(s, NfaOpcode::Star { match_follow: opt_follow, skip_follow: follow });
                opt_follow
            }
            RegexOpt::RangeRepeat { inner, low, high } => {
                let s = self.reserve();
                let opt_follow = self.compile_forward(inner, s);
                self.patch(
                    s,
                    NfaOpcode::RangeK { in_follow: opt_follow, out_follow: follow, min_k: *low, max_k: *high },
                );
                s
            }
            RegexOpt::Optional(inner) => {
                let opt_follow = self.compile_forward(inner, follow);
                self.alloc(NfaOpcode::AnyOf { follows: vec![opt_follow, follow] })
            }
            RegexOpt::AnyOf(alts) => {
                let follows: Vec<StateId> = alts.iter().map(|a| self.compile_forward(a, follow)).collect();
                self.alloc(NfaOpcode::AnyOf { follows })
            }
            RegexOpt::Sequence(parts) => {
                let mut f = follow;
                for part in parts.iter().rev() {
                    f = self.compile_forward(part, f);
                }
                f
            }
            RegexOpt::NamedRef { .. } | RegexOpt::EnvRef { .. } => {
                // Unresolved references should never reach the compiler;
                // the resolver is always run first. Compile as an
                // unreachable Dot so a stray reference doesn't panic the
                // whole pipeline.
                self.alloc(NfaOpcode::Dot { follow })
            }
        }
    }

    /// Reverse construction: identical scheme except `Literal` emits codes
    /// forward and `Sequence` threads parts left-to-right.
    fn compile_reverse(&mut self, opt: &RegexOpt, follow: StateId) -> StateId {
        match opt {
            RegexOpt::Literal { codes, .. } => {
                let mut f = follow;
                for &code in codes.iter() {
                    f = self.alloc(NfaOpcode::CharCode { code, follow: f });
                }
                f
            }
            RegexOpt::Sequence(parts) => {
                let mut f = follow;
                for part in parts.iter() {
                    f = self.compile_reverse(part, f);
                }
                f
            }
            RegexOpt::Star(inner) => {
                let s = self.reserve();
                let opt_follow = self.compile_reverse(inner, s);
                self.patch(s, NfaOpcode::Star { match_follow: opt_follow, skip_follow: follow });
                s
            }
            RegexOpt::Plus(inner) => {
                let s = self.reserve();
                let opt_follow = self.compile_reverse(inner, s);
                self.patch(s, NfaOpcode::Star { match_follow: opt_follow, skip_follow: follow });
                opt_follow
            }
            RegexOpt::RangeRepeat { inner, low, high } => {
                let s = self.reserve();
                let opt_follow = self.compile_reverse(inner, s);
                self.patch(
                    s,
                    NfaOpcode::RangeK { in_follow: opt_follow, out_follow: follow, min_k: *low, max_k: *high },
                );
                s
            }
            RegexOpt::Optional(inner) => {
                let opt_follow = self.compile_reverse(inner, follow);
                self.alloc(NfaOpcode::AnyOf { follows: vec![opt_follow, follow] })
            }
            RegexOpt::AnyOf(alts) => {
                let follows: Vec<StateId> = alts.iter().map(|a| self.compile_reverse(a, follow)).collect();
                self.alloc(NfaOpcode::AnyOf { follows })
            }
            // CharRange/Dot/NamedRef/EnvRef are symmetric between
            // directions (no internal ordering to reverse).
            _ => self.compile_forward(opt, follow),
        }
    }
}

/// Compile one resolved `RegexOpt` into a forward+reverse NFA pair.
pub fn compile_opt(opt: &RegexOpt) -> NfaPair {
    let mut fwd = Builder::new();
    let fwd_start = fwd.compile_forward(opt, ACCEPT_STATE);

    let mut rev = Builder::new();
    let rev_start = rev.compile_reverse(opt, ACCEPT_STATE);

    NfaPair {
        forward: NfaProgram { opcodes: fwd.opcodes, start: fwd_start },
        reverse: NfaProgram { opcodes: rev.opcodes, start: rev_start },
    }
}

/// Compile every top-level entry in `regex`'s pre-anchor/body/post-anchor
/// components, plus gather `CompileMetadata` across the whole tree.
pub struct CompiledRegex {
    pub pre_anchor: Option<Vec<(NfaPair, EntryFlags)>>,
    pub body: Vec<(NfaPair, EntryFlags)>,
    pub post_anchor: Option<Vec<(NfaPair, EntryFlags)>>,
    pub metadata: CompileMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryFlags {
    pub is_negated: bool,
    pub is_front_check: bool,
    pub is_back_check: bool,
}

impl From<&RegexToplevelEntry> for EntryFlags {
    fn from(e: &RegexToplevelEntry) -> Self {
        EntryFlags {
            is_negated: e.is_negated,
            is_front_check: e.is_front_check,
            is_back_check: e.is_back_check,
        }
    }
}

fn compile_component(component: &RegexComponent) -> Vec<(NfaPair, EntryFlags)> {
    component
        .entries()
        .into_iter()
        .map(|e| (compile_opt(&e.opt), EntryFlags::from(e)))
        .collect()
}

pub fn compile_regex(regex: &Regex) -> CompiledRegex {
    let mut metadata = CompileMetadata::default();
    if let Some(pre) = &regex.pre_anchor {
        metadata.observe_component(pre);
    }
    metadata.observe_component(&regex.body);
    if let Some(post) = &regex.post_anchor {
        metadata.observe_component(post);
    }

    CompiledRegex {
        pre_anchor: regex.pre_anchor.as_ref().map(compile_component),
        body: compile_component(&regex.body),
        post_anchor: regex.post_anchor.as_ref().map(compile_component),
        metadata,
    }
}
