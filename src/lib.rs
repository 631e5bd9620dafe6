//! BREX - a custom-syntax regular expression library with a counter-carrying
//! NFA engine.
//!
//! The pipeline is: bytes -> [`core::parser`] (using [`core::domain`]'s
//! codec) -> AST ([`core::nodes`]) -> [`core::resolver`] -> resolved AST ->
//! [`core::compiler`] -> forward/reverse NFA pair ([`core::nfa`]) ->
//! [`core::executor`] ([`core::matcher`] composes executors) -> boolean /
//! position / position pair.
//!
//! This crate exposes that pipeline both as composable stages (for callers
//! who need to batch named/env definitions across many regexes, e.g. a
//! namespace-resolving batch system) and as a single [`compile`] convenience
//! entry point for the common case of one self-contained pattern.

pub mod core;

use std::collections::HashMap;

pub use crate::core::domain::Domain;
pub use crate::core::errors::{CompileError, ExecuteError, ParseError};
pub use crate::core::matcher::REExecutor;
pub use crate::core::nodes::{Kind, Regex, RegexComponent, RegexOpt, RegexToplevelEntry};

/// A regex that failed to parse or compile cleanly, surfaced with the full
/// diagnostic list rather than just the first error.
#[derive(Debug, Clone, PartialEq)]
pub struct BrexError {
    pub parse_errors: Vec<ParseError>,
    pub compile_errors: Vec<CompileError>,
}

impl std::fmt::Display for BrexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for e in &self.parse_errors {
            writeln!(f, "{}", e)?;
        }
        for e in &self.compile_errors {
            writeln!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for BrexError {}

/// Parse `text` (a full `/…/` framed pattern) into an AST, without resolving
/// any `NamedRef`/`EnvRef` nodes. `env_enabled` gates whether `env[...]`
/// references are accepted at all.
pub fn parse(text: &str, env_enabled: bool) -> (Option<Regex>, Vec<ParseError>) {
    core::parser::parse_regex(text, env_enabled)
}

/// Resolve `regex`'s `NamedRef`/`EnvRef` nodes against the supplied
/// dictionaries, with an optional namespace-aliasing callback.
pub fn resolve(
    regex: &Regex,
    named_regexes: &HashMap<String, RegexOpt>,
    env_regexes: &HashMap<String, RegexOpt>,
    name_resolver: Option<&core::resolver::NameResolverFn<'_>>,
) -> (Regex, Vec<CompileError>) {
    let mut resolver = core::resolver::Resolver::new(named_regexes, env_regexes, name_resolver);
    let resolved = resolver.resolve_regex(regex);
    (resolved, resolver.errors)
}

/// Compile a fully-resolved `regex` (no remaining `NamedRef`/`EnvRef` nodes)
/// into an executor ready for matching.
pub fn build_executor(regex: &Regex) -> REExecutor {
    REExecutor::new(regex, core::compiler::compile_regex(regex))
}

/// The full pipeline for a single self-contained pattern: parse, resolve
/// against empty dictionaries, and compile. Returns a [`BrexError`]
/// aggregating every diagnostic if any stage failed.
///
/// Patterns that reference named/env regexes should use [`parse`] +
/// [`resolve`] + [`build_executor`] directly so the caller can supply its
/// dictionaries.
pub fn compile(text: &str) -> Result<REExecutor, BrexError> {
    let (regex, parse_errors) = parse(text, false);
    let Some(regex) = regex else {
        return Err(BrexError { parse_errors, compile_errors: Vec::new() });
    };
    if !parse_errors.is_empty() {
        return Err(BrexError { parse_errors, compile_errors: Vec::new() });
    }

    let empty_named = HashMap::new();
    let empty_env = HashMap::new();
    let (resolved, compile_errors) = resolve(&regex, &empty_named, &empty_env, None);
    if !compile_errors.is_empty() {
        return Err(BrexError { parse_errors, compile_errors });
    }

    Ok(build_executor(&resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_and_test_a_simple_literal() {
        let executor = compile(r#"/"abc"/"#).unwrap();
        let input = core::executor::MatchInput::from_unicode_str("abc");
        assert!(executor.test(&input, 0, 2).unwrap());
    }

    #[test]
    fn compile_surfaces_parse_errors() {
        let err = compile(r#"/"abc/"#).unwrap_err();
        assert!(!err.parse_errors.is_empty());
    }

    #[test]
    fn compile_surfaces_undefined_name_as_compile_error() {
        let err = compile(r#"/${missing::name}/"#).unwrap_err();
        assert!(err.compile_errors.iter().any(|e| matches!(e, CompileError::UndefinedName { .. })));
    }
}
