//! Unit tests for BREX's parser, codec, and AST layers, grouped by concern.
//! Complements the `#[cfg(test)]` modules inlined in each `src/core/*.rs`
//! file with narrower edge-case coverage.

use brex_core::core::domain::{decode_hex_escape, encode_hex_escape, resolve_escape_name, Domain};
use brex_core::core::errors::{CodecError, ParseErrorKind};
use brex_core::core::executor::MatchInput;
use brex_core::core::nodes::{CharRange, Kind, RegexComponent, RegexOpt};
use brex_core::parse;

fn parse_ok(pattern: &str) -> brex_core::Regex {
    let (regex, errors) = parse(pattern, false);
    assert!(errors.is_empty(), "unexpected parse errors for {:?}: {:?}", pattern, errors);
    regex.unwrap()
}

// ============================================================================
// LITERALS AND MULTI-LINE ALIGNMENT
// ============================================================================

#[cfg(test)]
mod literals {
    use super::*;

    #[test]
    fn trailing_backslash_after_newline_discards_leading_blanks() {
        let regex = parse_ok("/\"ab\n   \\cd\"/");
        match regex.body {
            RegexComponent::Single(entry) => match entry.opt {
                RegexOpt::Literal { codes, .. } => {
                    let text: String = codes.into_iter().filter_map(char::from_u32).collect();
                    assert_eq!(text, "abcd");
                }
                other => panic!("expected Literal, got {:?}", other),
            },
            other => panic!("expected Single entry, got {:?}", other),
        }
    }

    #[test]
    fn newline_without_alignment_marker_is_kept_literally() {
        let regex = parse_ok("/\"ab\ncd\"/");
        match regex.body {
            RegexComponent::Single(entry) => match entry.opt {
                RegexOpt::Literal { codes, .. } => {
                    assert_eq!(codes, vec!['a' as u32, 'b' as u32, 0x0A, 'c' as u32, 'd' as u32]);
                }
                other => panic!("expected Literal, got {:?}", other),
            },
            other => panic!("expected Single entry, got {:?}", other),
        }
    }

    #[test]
    fn char_domain_literal_uses_single_quotes() {
        let regex = parse_ok("/'xyz'/c");
        assert_eq!(regex.domain, Domain::Char);
        assert_eq!(regex.kind, Kind::Std);
    }

    #[test]
    fn empty_literal_parses_to_zero_codes() {
        let regex = parse_ok(r#"/""/"#);
        match regex.body {
            RegexComponent::Single(entry) => match entry.opt {
                RegexOpt::Literal { codes, .. } => assert!(codes.is_empty()),
                other => panic!("expected Literal, got {:?}", other),
            },
            other => panic!("expected Single entry, got {:?}", other),
        }
    }
}

// ============================================================================
// CHARACTER CLASSES
// ============================================================================

#[cfg(test)]
mod char_classes {
    use super::*;

    #[test]
    fn leading_hyphen_is_a_literal_hyphen_not_a_range() {
        let regex = parse_ok(r#"/[-az]/"#);
        match regex.body {
            RegexComponent::Single(entry) => match entry.opt {
                RegexOpt::CharRange { ranges, .. } => {
                    assert!(ranges.contains(&CharRange::single('-' as u32)));
                    assert!(ranges.contains(&CharRange::single('a' as u32)));
                    assert!(ranges.contains(&CharRange::single('z' as u32)));
                }
                other => panic!("expected CharRange, got {:?}", other),
            },
            other => panic!("expected Single entry, got {:?}", other),
        }
    }

    #[test]
    fn trailing_hyphen_is_a_literal_hyphen_not_a_range() {
        let regex = parse_ok(r#"/[az-]/"#);
        match regex.body {
            RegexComponent::Single(entry) => match entry.opt {
                RegexOpt::CharRange { ranges, .. } => {
                    assert!(ranges.iter().any(|r| r.low == r.high && r.low == '-' as u32));
                }
                other => panic!("expected CharRange, got {:?}", other),
            },
            other => panic!("expected Single entry, got {:?}", other),
        }
    }

    #[test]
    fn negated_char_class_sets_complement_flag() {
        let regex = parse_ok(r#"/[^0-9]/"#);
        match regex.body {
            RegexComponent::Single(entry) => match entry.opt {
                RegexOpt::CharRange { complement, .. } => assert!(complement),
                other => panic!("expected CharRange, got {:?}", other),
            },
            other => panic!("expected Single entry, got {:?}", other),
        }
    }

    #[test]
    fn empty_char_class_is_a_diagnostic() {
        let (_regex, errors) = parse(r#"/[]/"#, false);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::MalformedCharRange));
    }
}

// ============================================================================
// REPEAT BOUNDS
// ============================================================================

#[cfg(test)]
mod repeat_bounds {
    use super::*;

    #[test]
    fn leading_zero_in_a_multi_digit_bound_is_a_diagnostic() {
        let (_regex, errors) = parse(r#"/"a"{01,3}/"#, false);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::BadRepeatBound));
    }

    #[test]
    fn bound_above_u16_max_is_a_diagnostic() {
        let (_regex, errors) = parse(r#"/"a"{1,99999}/"#, false);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::BadRepeatBound));
    }

    #[test]
    fn inverted_bound_is_a_diagnostic() {
        let (_regex, errors) = parse(r#"/"a"{5,2}/"#, false);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::BadRepeatBound));
    }

    #[test]
    fn zero_zero_bound_is_a_diagnostic() {
        let (_regex, errors) = parse(r#"/"a"{0,0}/"#, false);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::BadRepeatBound));
    }

    #[test]
    fn single_digit_zero_is_not_a_leading_zero_violation() {
        let regex = parse_ok(r#"/"a"{0,3}/"#);
        match regex.body {
            RegexComponent::Single(entry) => {
                assert!(matches!(entry.opt, RegexOpt::RangeRepeat { low: 0, high: 3, .. }));
            }
            other => panic!("expected Single entry, got {:?}", other),
        }
    }
}

// ============================================================================
// ESCAPES AND CODEC
// ============================================================================

#[cfg(test)]
mod escapes {
    use super::*;

    #[test]
    fn named_escape_round_trips_through_hex_encoding() {
        let code = resolve_escape_name(Domain::Unicode, "dollar").unwrap();
        assert_eq!(code, 0x24);
        assert_eq!(encode_hex_escape(code), "%x24;");
    }

    #[test]
    fn hex_escape_rejects_too_many_digits_for_char_domain() {
        assert!(decode_hex_escape(Domain::Char, "100").is_err());
    }

    #[test]
    fn hex_escape_accepts_max_digit_count_per_domain() {
        assert!(decode_hex_escape(Domain::Char, "7e").is_ok());
        assert!(decode_hex_escape(Domain::Unicode, "10ffff").is_ok());
    }

    #[test]
    fn unknown_escape_name_in_pattern_is_a_codec_diagnostic() {
        let (_regex, errors) = parse(r#"/"%nope;"/"#, false);
        assert!(errors
            .iter()
            .any(|e| matches!(&e.kind, ParseErrorKind::Codec(CodecError::UnknownEscapeName { name }) if name == "nope")));
    }

    #[test]
    fn unterminated_escape_is_a_codec_diagnostic() {
        let (_regex, errors) = parse(r#"/"%n"/"#, false);
        assert!(errors.iter().any(|e| matches!(&e.kind, ParseErrorKind::Codec(CodecError::UnterminatedEscape))));
    }
}

// ============================================================================
// ENV REFERENCES, NAMED REFERENCES, PATH KIND
// ============================================================================

#[cfg(test)]
mod references_and_kind {
    use super::*;

    #[test]
    fn env_ref_is_accepted_when_enabled() {
        let (regex, errors) = parse(r#"/env["KEY"]/"#, true);
        assert!(errors.is_empty(), "{:?}", errors);
        match regex.unwrap().body {
            RegexComponent::Single(entry) => {
                assert!(matches!(entry.opt, RegexOpt::EnvRef { ref env_key } if env_key == "KEY"));
            }
            other => panic!("expected Single entry, got {:?}", other),
        }
    }

    #[test]
    fn named_ref_parses_qualified_dotted_name() {
        let regex = parse_ok(r#"/${ns::sub::leaf}/"#);
        match regex.body {
            RegexComponent::Single(entry) => {
                assert!(matches!(entry.opt, RegexOpt::NamedRef { ref qualified_name } if qualified_name == "ns::sub::leaf"));
            }
            other => panic!("expected Single entry, got {:?}", other),
        }
    }

    #[test]
    fn path_suffix_pairs_with_char_domain() {
        let regex = parse_ok(r#"/'x'/p"#);
        assert_eq!(regex.domain, Domain::Char);
        assert_eq!(regex.kind, Kind::Path);
    }

    #[test]
    fn path_suffix_rejects_unicode_only_literal() {
        let (_regex, errors) = brex_core::parse(r#"/"x"/p"#, false);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::MixedDomain));
    }
}

// ============================================================================
// AST CONSTRUCTION GUARDS
// ============================================================================

#[cfg(test)]
mod ast_guards {
    use super::*;

    #[test]
    fn front_and_back_check_together_is_rejected_by_the_parser() {
        let (_regex, errors) = parse(r#"/^"a"$/"#, false);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::MismatchedAnchors));
    }

    #[test]
    fn all_of_component_requires_at_least_one_binding_entry_to_be_contains_usable() {
        let regex = parse_ok(r#"/!"x"&!"y"/"#);
        assert!(!regex.can_use_in_contains());
    }

    #[test]
    fn single_binding_entry_is_contains_usable() {
        let regex = parse_ok(r#"/"x"/"#);
        assert!(regex.can_use_in_contains());
    }
}

// ============================================================================
// MATCH INPUT
// ============================================================================

#[cfg(test)]
mod match_input {
    use super::*;

    #[test]
    fn from_unicode_str_counts_code_points_not_bytes() {
        let input = MatchInput::from_unicode_str("a🐍b");
        assert_eq!(input.len(), 3);
    }

    #[test]
    fn empty_input_reports_zero_length() {
        let input = MatchInput::from_unicode_str("");
        assert!(input.is_empty());
        assert_eq!(input.len(), 0);
    }

    #[test]
    fn code_at_out_of_bounds_is_none() {
        let input = MatchInput::from_unicode_str("a");
        assert_eq!(input.code_at(1), None);
    }
}
