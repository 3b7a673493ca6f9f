use regex_lint::ast::{ClassMemberKind, GroupKind, NodeKind, Span};
use regex_lint::parser::{parse, Parser};
use regex_lint::FlagSet;

fn messages(pattern: &str) -> Vec<String> {
    parse(pattern, FlagSet::empty())
        .diagnostics
        .iter()
        .map(|d| d.message())
        .collect()
}

#[test]
fn diagnostic_messages() {
    assert_eq!(messages("("), vec!["Expected ')', but found the end of the regex"]);
    assert_eq!(messages("[a"), vec!["Expected ']', but found the end of the regex"]);
    assert_eq!(messages("x{1,2,3}"), vec!["Expected '}', but found ','"]);
    assert_eq!(messages("x{y}"), vec!["Expected integer, but found 'y'"]);
    assert_eq!(messages(")"), vec!["Unmatched closing ')'"]);
    assert_eq!(messages("*a"), vec!["Unexpected quantifier '*'"]);
    assert_eq!(messages("a{3,2}"), vec!["Illegal repetition range"]);
    assert_eq!(messages("[b-a]"), vec!["Illegal character range"]);
}

#[test]
fn end_of_input_diagnostic_is_empty_span() {
    let result = parse("(ab", FlagSet::empty());
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].span, Span::empty_at(3));
}

#[test]
fn capturing_groups_are_numbered_left_to_right() {
    let result = parse("(a)(?:b)(?<name>c)", FlagSet::empty());
    assert!(result.is_valid());
    let mut groups = Vec::new();
    result.root.walk(&mut |node| {
        if let NodeKind::Group { kind, .. } = &node.kind {
            groups.push(kind.clone());
        }
    });
    assert_eq!(
        groups,
        vec![
            GroupKind::Capturing {
                index: 1,
                name: None
            },
            GroupKind::NonCapturing,
            GroupKind::Capturing {
                index: 2,
                name: Some("name".to_string())
            },
        ]
    );
}

#[test]
fn external_flags_reach_every_node() {
    let result = parse("a(b)", FlagSet::CASE_INSENSITIVE);
    let mut all = true;
    result.root.walk(&mut |node| {
        all &= node.flags.contains(FlagSet::CASE_INSENSITIVE);
    });
    assert!(all);
}

#[test]
fn adversarial_nesting_terminates() {
    let pattern = "(".repeat(10_000) + &")".repeat(10_000);
    let result = Parser::new(&pattern, FlagSet::empty()).parse();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(
        result.diagnostics[0].message(),
        "Nesting depth exceeds the limit of 128"
    );

    let classes = "[".repeat(10_000);
    let result = parse(&classes, FlagSet::empty());
    assert_eq!(result.diagnostics.len(), 1);
}

#[test]
fn comments_mode_range_with_spaces_around_dash() {
    let result = parse("(?x)[a - z m]", FlagSet::empty());
    assert!(result.is_valid(), "{:?}", result.diagnostics);
    let mut members = Vec::new();
    result.root.walk(&mut |node| {
        if let NodeKind::CharacterClass(class) = &node.kind {
            members.extend(class.members.iter().map(|m| (m.kind.clone(), m.span)));
        }
    });
    assert_eq!(
        members,
        vec![
            (ClassMemberKind::Range('a', 'z'), Span::new(5, 10)),
            (
                ClassMemberKind::SingleChar {
                    ch: 'm',
                    escaped: false
                },
                Span::new(11, 12)
            ),
        ]
    );

    // Without the flag the spaces are members and `-` joins ` ` and ` `.
    let plain = parse("[a - z]", FlagSet::empty());
    let mut ranges = 0;
    plain.root.walk(&mut |node| {
        if let NodeKind::CharacterClass(class) = &node.kind {
            ranges += class
                .members
                .iter()
                .filter(|m| matches!(m.kind, ClassMemberKind::Range(..)))
                .count();
        }
    });
    assert_eq!(ranges, 1);
}

#[test]
fn quoting_inside_a_class() {
    let result = parse("[\\Qa-]\\E]", FlagSet::empty());
    assert!(result.is_valid(), "{:?}", result.diagnostics);
    let mut chars = Vec::new();
    result.root.walk(&mut |node| {
        if let NodeKind::CharacterClass(class) = &node.kind {
            for member in &class.members {
                if let ClassMemberKind::SingleChar { ch, .. } = member.kind {
                    chars.push(ch);
                }
            }
        }
    });
    assert_eq!(chars, vec!['a', '-', ']']);
}

#[test]
fn valid_patterns_round_trip() {
    for pattern in [
        "^a|b|c$",
        "(?m)^$",
        "[\\w&&[^\\d]]x{2,}?",
        "(?x) a b # trailing",
        "\\x{1F600}\\u00e9\\0101\\cA",
        "(?<=a)(?<!b)(?=c)(?!d)(?>e)",
        "[]a]",
        "(?x)[a - z # letters\n m]",
        "[\\Qab\\E-]",
    ] {
        let result = parse(pattern, FlagSet::empty());
        assert!(result.is_valid(), "{pattern}: {:?}", result.diagnostics);
        assert_eq!(result.root.to_source(pattern), pattern);
    }
}
