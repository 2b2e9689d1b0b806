//! Scanner integration tests.
//!
//! Tokenizes small TypeScript snippets and checks kinds, cooked values and
//! the context-dependent rescans.

use espanda_scanner::{Scanner, TokenKind};

/// Helper: scan all tokens from source and return as (kind, value) pairs.
fn scan_all(source: &str) -> Vec<(TokenKind, String)> {
    let mut scanner = Scanner::new("test.ts", source);
    let mut tokens = Vec::new();
    loop {
        let kind = scanner.scan();
        if kind == TokenKind::EndOfFile {
            break;
        }
        tokens.push((kind, scanner.value().to_string()));
    }
    tokens
}

fn scan_kinds(source: &str) -> Vec<TokenKind> {
    scan_all(source).into_iter().map(|(k, _)| k).collect()
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_empty_source() {
    assert!(scan_all("").is_empty());
    assert!(scan_all("   \n\t  ").is_empty());
}

#[test]
fn test_numeric_literals() {
    let cases: &[(&str, f64)] = &[
        ("42", 42.0),
        ("3.14", 3.14),
        (".5", 0.5),
        ("1e3", 1000.0),
        ("2.5E-1", 0.25),
        ("0xFF", 255.0),
        ("0b1010", 10.0),
        ("0o77", 63.0),
        ("1_000_000", 1_000_000.0),
    ];
    for &(source, expected) in cases {
        let mut scanner = Scanner::new("test.ts", source);
        assert_eq!(scanner.scan(), TokenKind::NumberLiteral, "{source}");
        assert_eq!(scanner.token().number, expected, "{source}");
        assert_eq!(scanner.scan(), TokenKind::EndOfFile);
    }
}

#[test]
fn test_bigint_literal() {
    let tokens = scan_all("123n 0x1Fn");
    assert_eq!(tokens[0], (TokenKind::BigIntLiteral, "123".to_string()));
    assert_eq!(tokens[1], (TokenKind::BigIntLiteral, "0x1F".to_string()));
}

#[test]
fn test_string_literals() {
    let tokens = scan_all(r#""hello" 'world'"#);
    assert_eq!(tokens[0], (TokenKind::StringLiteral, "hello".to_string()));
    assert_eq!(tokens[1], (TokenKind::StringLiteral, "world".to_string()));
}

#[test]
fn test_string_escapes() {
    let tokens = scan_all(r#""a\nb\t\x41B\u{1F600}\\\"""#);
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].1, "a\nb\tAB\u{1F600}\\\"");
}

#[test]
fn test_unterminated_string_reports_diagnostic() {
    let mut scanner = Scanner::new("test.ts", "'abc\nx");
    assert_eq!(scanner.scan(), TokenKind::StringLiteral);
    assert_eq!(scanner.value(), "abc");
    let diagnostics = scanner.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics.diagnostics()[0].code, 1002);
}

// ============================================================================
// Identifiers and keywords
// ============================================================================

#[test]
fn test_keywords_and_identifiers() {
    assert_eq!(
        scan_kinds("const x = function () { return this; }"),
        vec![
            TokenKind::Const,
            TokenKind::Identifier,
            TokenKind::Equals,
            TokenKind::Function,
            TokenKind::OpenParen,
            TokenKind::CloseParen,
            TokenKind::OpenBrace,
            TokenKind::Return,
            TokenKind::This,
            TokenKind::Semicolon,
            TokenKind::CloseBrace,
        ]
    );
}

#[test]
fn test_contextual_keywords_are_identifiers() {
    for word in ["let", "of", "async", "await", "yield", "type", "interface"] {
        assert_eq!(scan_kinds(word), vec![TokenKind::Identifier], "{word}");
    }
}

#[test]
fn test_unicode_identifier() {
    let tokens = scan_all("café $x _y");
    assert_eq!(tokens[0], (TokenKind::Identifier, "café".to_string()));
    assert_eq!(tokens[1].1, "$x");
    assert_eq!(tokens[2].1, "_y");
}

#[test]
fn test_invalid_character() {
    let mut scanner = Scanner::new("test.ts", "a \u{00a7} b");
    scanner.scan();
    assert_eq!(scanner.scan(), TokenKind::Unknown);
    assert_eq!(scanner.scan(), TokenKind::Identifier);
    assert_eq!(scanner.take_diagnostics().diagnostics()[0].code, 1127);
}

// ============================================================================
// Punctuation
// ============================================================================

#[test]
fn test_longest_match_operators() {
    assert_eq!(
        scan_kinds("=== !== ?? ??= ?. ... => **= &&= ||="),
        vec![
            TokenKind::EqualsEqualsEquals,
            TokenKind::ExclamationEqualsEquals,
            TokenKind::QuestionQuestion,
            TokenKind::QuestionQuestionEquals,
            TokenKind::QuestionDot,
            TokenKind::DotDotDot,
            TokenKind::Arrow,
            TokenKind::AsteriskAsteriskEquals,
            TokenKind::AmpersandAmpersandEquals,
            TokenKind::BarBarEquals,
        ]
    );
}

#[test]
fn test_question_dot_before_digit_is_conditional() {
    assert_eq!(
        scan_kinds("a?.5:1"),
        vec![
            TokenKind::Identifier,
            TokenKind::Question,
            TokenKind::NumberLiteral,
            TokenKind::Colon,
            TokenKind::NumberLiteral,
        ]
    );
}

// ============================================================================
// Trivia
// ============================================================================

#[test]
fn test_comments_are_skipped() {
    assert_eq!(
        scan_kinds("a // line\n/* block */ b"),
        vec![TokenKind::Identifier, TokenKind::Identifier]
    );
}

#[test]
fn test_unterminated_block_comment() {
    let mut scanner = Scanner::new("test.ts", "a /* never closed");
    scanner.scan();
    assert_eq!(scanner.scan(), TokenKind::EndOfFile);
    assert_eq!(scanner.take_diagnostics().diagnostics()[0].code, 1010);
}

#[test]
fn test_token_positions_are_byte_offsets() {
    let mut scanner = Scanner::new("test.ts", "é = 1");
    scanner.scan();
    assert_eq!((scanner.token().pos, scanner.token().end), (0, 2));
    scanner.scan();
    assert_eq!(scanner.token().pos, 3);
}

// ============================================================================
// Rescans
// ============================================================================

#[test]
fn test_rescan_slash_as_regex() {
    let mut scanner = Scanner::new("test.ts", "/[/]a\\/b/gi.test");
    assert_eq!(scanner.scan(), TokenKind::Slash);
    assert_eq!(scanner.rescan_slash(), TokenKind::RegExpLiteral);
    assert_eq!(scanner.value(), "[/]a\\/b/gi");
    assert_eq!(scanner.scan(), TokenKind::Dot);
}

#[test]
fn test_unterminated_regex() {
    let mut scanner = Scanner::new("test.ts", "/abc\n");
    scanner.scan();
    assert_eq!(scanner.rescan_slash(), TokenKind::RegExpLiteral);
    assert_eq!(scanner.take_diagnostics().diagnostics()[0].code, 1161);
}

#[test]
fn test_template_literal_parts() {
    let mut scanner = Scanner::new("test.ts", "`a${x}b${y}c`");
    assert_eq!(scanner.scan(), TokenKind::TemplateHead);
    assert_eq!(scanner.value(), "a");
    assert_eq!(scanner.scan(), TokenKind::Identifier);
    assert_eq!(scanner.scan(), TokenKind::CloseBrace);
    assert_eq!(scanner.rescan_template_continuation(), TokenKind::TemplateMiddle);
    assert_eq!(scanner.value(), "b");
    assert_eq!(scanner.scan(), TokenKind::Identifier);
    assert_eq!(scanner.scan(), TokenKind::CloseBrace);
    assert_eq!(scanner.rescan_template_continuation(), TokenKind::TemplateTail);
    assert_eq!(scanner.value(), "c");
    assert_eq!(scanner.scan(), TokenKind::EndOfFile);
}

#[test]
fn test_no_substitution_template() {
    let tokens = scan_all("`plain $ text`");
    assert_eq!(
        tokens,
        vec![(TokenKind::NoSubstitutionTemplate, "plain $ text".to_string())]
    );
}

#[test]
fn test_look_ahead_restores_position() {
    let mut scanner = Scanner::new("test.ts", "a b c");
    scanner.scan();
    let peeked = scanner.look_ahead(|s| {
        s.scan();
        s.scan();
        s.value().to_string()
    });
    assert_eq!(peeked, "c");
    assert_eq!(scanner.value(), "a");
    assert_eq!(scanner.scan(), TokenKind::Identifier);
    assert_eq!(scanner.value(), "b");
}
