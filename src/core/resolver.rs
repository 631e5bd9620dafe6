//! Resolves `NamedRef`/`EnvRef` nodes against caller-supplied dictionaries.
//!
//! Produces a fresh tree rather than aliasing the input: inlined
//! definitions are cloned at the splice point, and every inner node the
//! resolver builds is freshly owned.

use std::collections::HashMap;

use crate::core::errors::CompileError;
use crate::core::nodes::{Regex, RegexComponent, RegexOpt, RegexToplevelEntry};

/// Rewrites a qualified name before lookup, e.g. for namespace aliasing.
pub type NameResolverFn<'a> = dyn Fn(&str) -> String + 'a;

pub struct Resolver<'a> {
    named_regexes: &'a HashMap<String, RegexOpt>,
    env_regexes: &'a HashMap<String, RegexOpt>,
    name_resolver: Option<&'a NameResolverFn<'a>>,
    pending: Vec<String>,
    pub errors: Vec<CompileError>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        named_regexes: &'a HashMap<String, RegexOpt>,
        env_regexes: &'a HashMap<String, RegexOpt>,
        name_resolver: Option<&'a NameResolverFn<'a>>,
    ) -> Self {
        Resolver {
            named_regexes,
            env_regexes,
            name_resolver,
            pending: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Resolve every `NamedRef`/`EnvRef` in `regex`, returning a fresh
    /// `Regex` whose anchors and body are all resolved. Diagnostics collect
    /// into `self.errors`; the caller always gets a usable tree back.
    pub fn resolve_regex(&mut self, regex: &Regex) -> Regex {
        Regex {
            domain: regex.domain,
            kind: regex.kind,
            pre_anchor: regex.pre_anchor.as_ref().map(|c| self.resolve_component(c)),
            body: self.resolve_component(&regex.body),
            post_anchor: regex.post_anchor.as_ref().map(|c| self.resolve_component(c)),
        }
    }

    fn resolve_component(&mut self, component: &RegexComponent) -> RegexComponent {
        match component {
            RegexComponent::Single(entry) => RegexComponent::Single(self.resolve_entry(entry)),
            RegexComponent::AllOf(entries) => {
                RegexComponent::AllOf(entries.iter().map(|e| self.resolve_entry(e)).collect())
            }
        }
    }

    fn resolve_entry(&mut self, entry: &RegexToplevelEntry) -> RegexToplevelEntry {
        RegexToplevelEntry {
            opt: self.resolve(&entry.opt),
            is_negated: entry.is_negated,
            is_front_check: entry.is_front_check,
            is_back_check: entry.is_back_check,
        }
    }

    /// Core recursive resolution.
    pub fn resolve(&mut self, opt: &RegexOpt) -> RegexOpt {
        match opt {
            RegexOpt::NamedRef { qualified_name } => self.resolve_named_ref(qualified_name),
            RegexOpt::EnvRef { env_key } => self.resolve_env_ref(env_key),
            RegexOpt::AnyOf(opts) => self.resolve_any_of(opts),
            RegexOpt::Literal { .. } | RegexOpt::CharRange { .. } | RegexOpt::Dot { .. } => opt.clone(),
            RegexOpt::Star(inner) => RegexOpt::Star(Box::new(self.resolve(inner))),
            RegexOpt::Plus(inner) => RegexOpt::Plus(Box::new(self.resolve(inner))),
            RegexOpt::Optional(inner) => RegexOpt::Optional(Box::new(self.resolve(inner))),
            RegexOpt::RangeRepeat { inner, low, high } => RegexOpt::RangeRepeat {
                inner: Box::new(self.resolve(inner)),
                low: *low,
                high: *high,
            },
            RegexOpt::Sequence(parts) => RegexOpt::Sequence(parts.iter().map(|p| self.resolve(p)).collect()),
        }
    }

    /// `AnyOf` flattening: an inlined reference sitting directly under an
    /// `AnyOf` splices its alternatives in.
    fn resolve_any_of(&mut self, opts: &[RegexOpt]) -> RegexOpt {
        let mut flattened = Vec::new();
        for opt in opts {
            match self.resolve(opt) {
                RegexOpt::AnyOf(inner) => flattened.extend(inner),
                other => flattened.push(other),
            }
        }
        RegexOpt::any_of(flattened)
    }

    fn resolve_named_ref(&mut self, qualified_name: &str) -> RegexOpt {
        let real_name = match self.name_resolver {
            Some(f) => f(qualified_name),
            None => qualified_name.to_string(),
        };

        if self.pending.contains(&real_name) {
            self.errors.push(CompileError::RecursiveName { name: real_name });
            return RegexOpt::NamedRef { qualified_name: qualified_name.to_string() };
        }

        let Some(def) = self.named_regexes.get(&real_name) else {
            self.errors.push(CompileError::UndefinedName { name: real_name });
            return RegexOpt::NamedRef { qualified_name: qualified_name.to_string() };
        };

        self.pending.push(real_name);
        let resolved = self.resolve(def);
        self.pending.pop();
        resolved
    }

    fn resolve_env_ref(&mut self, env_key: &str) -> RegexOpt {
        let marker = format!("env[{}]", env_key);
        if self.pending.contains(&marker) {
            self.errors.push(CompileError::RecursiveName { name: marker });
            return RegexOpt::EnvRef { env_key: env_key.to_string() };
        }

        let Some(def) = self.env_regexes.get(env_key) else {
            self.errors.push(CompileError::UndefinedName { name: env_key.to_string() });
            return RegexOpt::EnvRef { env_key: env_key.to_string() };
        };

        self.pending.push(marker);
        let resolved = self.resolve(def);
        self.pending.pop();
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::Domain;

    fn lit(s: &str) -> RegexOpt {
        RegexOpt::Literal {
            codes: s.chars().map(|c| c as u32).collect(),
            domain: Domain::Unicode,
        }
    }

    #[test]
    fn undefined_named_ref_is_diagnosed() {
        let named = HashMap::new();
        let env = HashMap::new();
        let mut resolver = Resolver::new(&named, &env, None);
        let resolved = resolver.resolve(&RegexOpt::NamedRef { qualified_name: "a::b".into() });
        assert!(matches!(resolved, RegexOpt::NamedRef { .. }));
        assert!(matches!(resolver.errors[0], CompileError::UndefinedName { .. }));
    }

    #[test]
    fn recursive_named_ref_is_diagnosed() {
        let mut named = HashMap::new();
        named.insert("x".to_string(), RegexOpt::NamedRef { qualified_name: "x".into() });
        let env = HashMap::new();
        let mut resolver = Resolver::new(&named, &env, None);
        let resolved = resolver.resolve(&RegexOpt::NamedRef { qualified_name: "x".into() });
        assert!(matches!(resolved, RegexOpt::NamedRef { .. }));
        assert!(matches!(resolver.errors[0], CompileError::RecursiveName { .. }));
    }

    #[test]
    fn named_ref_inlines_definition() {
        let mut named = HashMap::new();
        named.insert("digit".to_string(), lit("5"));
        let env = HashMap::new();
        let mut resolver = Resolver::new(&named, &env, None);
        let resolved = resolver.resolve(&RegexOpt::NamedRef { qualified_name: "digit".into() });
        assert_eq!(resolved, lit("5"));
        assert!(resolver.errors.is_empty());
    }

    #[test]
    fn nested_any_of_flattens_through_named_ref() {
        let mut named = HashMap::new();
        named.insert("ab".to_string(), RegexOpt::AnyOf(vec![lit("a"), lit("b")]));
        let env = HashMap::new();
        let mut resolver = Resolver::new(&named, &env, None);

        let tree = RegexOpt::AnyOf(vec![
            RegexOpt::NamedRef { qualified_name: "ab".into() },
            lit("c"),
        ]);
        let resolved = resolver.resolve(&tree);
        match resolved {
            RegexOpt::AnyOf(opts) => assert_eq!(opts.len(), 3),
            _ => panic!("expected flattened AnyOf"),
        }
    }

    #[test]
    fn name_resolver_callback_rewrites_before_lookup() {
        let mut named = HashMap::new();
        named.insert("Aliased::x".to_string(), lit("z"));
        let env = HashMap::new();
        let cb = |n: &str| format!("Aliased::{}", n);
        let mut resolver = Resolver::new(&named, &env, Some(&cb));
        let resolved = resolver.resolve(&RegexOpt::NamedRef { qualified_name: "x".into() });
        assert_eq!(resolved, lit("z"));
    }
}
