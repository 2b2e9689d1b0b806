//! The lexer.
//!
//! Works on bytes of UTF-8 source so token positions are byte offsets, the
//! same unit `TextRange` uses. Non-ASCII input only matters inside
//! identifiers, strings and comments; it is decoded on demand there.

use crate::token::{Token, TokenFlags, TokenKind};
use espanda_core::text::TextSpan;
use espanda_diagnostics::{messages, Diagnostic, DiagnosticCollection, DiagnosticMessage};
use memchr::{memchr2, memchr3, memmem};
use unicode_xid::UnicodeXID;

/// Saved scanner position for speculative parsing.
#[derive(Debug, Clone)]
pub struct ScannerState {
    pos: usize,
    token: Token,
    diagnostic_count: usize,
}

pub struct Scanner<'a> {
    file_name: String,
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    token: Token,
    diagnostics: DiagnosticCollection,
}

impl<'a> Scanner<'a> {
    pub fn new(file_name: impl Into<String>, text: &'a str) -> Self {
        Self {
            file_name: file_name.into(),
            text,
            bytes: text.as_bytes(),
            pos: 0,
            token: Token {
                kind: TokenKind::Unknown,
                pos: 0,
                end: 0,
                flags: TokenFlags::empty(),
                value: String::new(),
                number: 0.0,
            },
            diagnostics: DiagnosticCollection::new(),
        }
    }

    #[inline]
    pub fn token(&self) -> &Token {
        &self.token
    }

    #[inline]
    pub fn kind(&self) -> TokenKind {
        self.token.kind
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.token.value
    }

    pub fn source(&self) -> &'a str {
        self.text
    }

    pub fn take_diagnostics(&mut self) -> DiagnosticCollection {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn save_state(&self) -> ScannerState {
        ScannerState {
            pos: self.pos,
            token: self.token.clone(),
            diagnostic_count: self.diagnostics.len(),
        }
    }

    pub fn restore_state(&mut self, state: ScannerState) {
        self.pos = state.pos;
        self.token = state.token;
        self.diagnostics.truncate(state.diagnostic_count);
    }

    /// Run `f` and rewind to the current token afterwards.
    pub fn look_ahead<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let state = self.save_state();
        let result = f(self);
        self.restore_state(state);
        result
    }

    fn error(&mut self, start: usize, end: usize, message: &DiagnosticMessage, args: &[&str]) {
        self.diagnostics.add(Diagnostic::with_location(
            self.file_name.clone(),
            TextSpan::new(start as u32, (end.max(start) - start) as u32),
            message,
            args,
        ));
    }

    #[inline]
    fn peek(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    /// Skip whitespace and comments. Returns whether a line break was seen.
    fn skip_trivia(&mut self) -> bool {
        let mut line_break = false;
        while !self.at_end() {
            match self.bytes[self.pos] {
                b'\n' | b'\r' => {
                    line_break = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | 0x0b | 0x0c => self.pos += 1,
                b'/' if self.peek(1) == b'/' => {
                    let rest = &self.bytes[self.pos..];
                    self.pos += memchr2(b'\n', b'\r', rest).unwrap_or(rest.len());
                }
                b'/' if self.peek(1) == b'*' => {
                    let start = self.pos;
                    let body = &self.bytes[self.pos + 2..];
                    match memmem::find(body, b"*/") {
                        Some(offset) => {
                            line_break |= memchr2(b'\n', b'\r', &body[..offset]).is_some();
                            self.pos += offset + 4;
                        }
                        None => {
                            self.pos = self.bytes.len();
                            self.error(start, self.pos, &messages::ASTERISK_SLASH_EXPECTED, &[]);
                        }
                    }
                }
                b if b < 0x80 => break,
                _ => match self.current_char() {
                    Some(c @ ('\u{2028}' | '\u{2029}')) => {
                        line_break = true;
                        self.pos += c.len_utf8();
                    }
                    Some(c) if c.is_whitespace() || c == '\u{feff}' => self.pos += c.len_utf8(),
                    _ => break,
                },
            }
        }
        line_break
    }

    /// Advance to the next token.
    pub fn scan(&mut self) -> TokenKind {
        let line_break = self.skip_trivia();
        let start = self.pos;
        self.token.value.clear();
        self.token.number = 0.0;
        self.token.flags = if line_break {
            TokenFlags::PRECEDING_LINE_BREAK
        } else {
            TokenFlags::empty()
        };
        let kind = if self.at_end() {
            TokenKind::EndOfFile
        } else {
            self.scan_token(start)
        };
        self.token.kind = kind;
        self.token.pos = start as u32;
        self.token.end = self.pos as u32;
        kind
    }

    fn op(&mut self, len: usize, kind: TokenKind) -> TokenKind {
        self.pos += len;
        kind
    }

    fn scan_token(&mut self, start: usize) -> TokenKind {
        use TokenKind as T;
        let (b1, b2) = (self.peek(1), self.peek(2));
        match self.bytes[self.pos] {
            b'{' => self.op(1, T::OpenBrace),
            b'}' => self.op(1, T::CloseBrace),
            b'(' => self.op(1, T::OpenParen),
            b')' => self.op(1, T::CloseParen),
            b'[' => self.op(1, T::OpenBracket),
            b']' => self.op(1, T::CloseBracket),
            b';' => self.op(1, T::Semicolon),
            b',' => self.op(1, T::Comma),
            b':' => self.op(1, T::Colon),
            b'~' => self.op(1, T::Tilde),
            b'@' => self.op(1, T::At),
            b'#' => self.op(1, T::Hash),
            b'.' if b1.is_ascii_digit() => self.scan_number(start),
            b'.' if b1 == b'.' && b2 == b'.' => self.op(3, T::DotDotDot),
            b'.' => self.op(1, T::Dot),
            b'?' if b1 == b'?' && b2 == b'=' => self.op(3, T::QuestionQuestionEquals),
            b'?' if b1 == b'?' => self.op(2, T::QuestionQuestion),
            b'?' if b1 == b'.' && !b2.is_ascii_digit() => self.op(2, T::QuestionDot),
            b'?' => self.op(1, T::Question),
            b'<' if b1 == b'<' && b2 == b'=' => self.op(3, T::LessThanLessThanEquals),
            b'<' if b1 == b'<' => self.op(2, T::LessThanLessThan),
            b'<' if b1 == b'=' => self.op(2, T::LessThanEquals),
            b'<' => self.op(1, T::LessThan),
            b'>' => self.op(1, T::GreaterThan),
            b'=' if b1 == b'=' && b2 == b'=' => self.op(3, T::EqualsEqualsEquals),
            b'=' if b1 == b'=' => self.op(2, T::EqualsEquals),
            b'=' if b1 == b'>' => self.op(2, T::Arrow),
            b'=' => self.op(1, T::Equals),
            b'!' if b1 == b'=' && b2 == b'=' => self.op(3, T::ExclamationEqualsEquals),
            b'!' if b1 == b'=' => self.op(2, T::ExclamationEquals),
            b'!' => self.op(1, T::Exclamation),
            b'+' if b1 == b'+' => self.op(2, T::PlusPlus),
            b'+' if b1 == b'=' => self.op(2, T::PlusEquals),
            b'+' => self.op(1, T::Plus),
            b'-' if b1 == b'-' => self.op(2, T::MinusMinus),
            b'-' if b1 == b'=' => self.op(2, T::MinusEquals),
            b'-' => self.op(1, T::Minus),
            b'*' if b1 == b'*' && b2 == b'=' => self.op(3, T::AsteriskAsteriskEquals),
            b'*' if b1 == b'*' => self.op(2, T::AsteriskAsterisk),
            b'*' if b1 == b'=' => self.op(2, T::AsteriskEquals),
            b'*' => self.op(1, T::Asterisk),
            b'/' if b1 == b'=' => self.op(2, T::SlashEquals),
            b'/' => self.op(1, T::Slash),
            b'%' if b1 == b'=' => self.op(2, T::PercentEquals),
            b'%' => self.op(1, T::Percent),
            b'&' if b1 == b'&' && b2 == b'=' => self.op(3, T::AmpersandAmpersandEquals),
            b'&' if b1 == b'&' => self.op(2, T::AmpersandAmpersand),
            b'&' if b1 == b'=' => self.op(2, T::AmpersandEquals),
            b'&' => self.op(1, T::Ampersand),
            b'|' if b1 == b'|' && b2 == b'=' => self.op(3, T::BarBarEquals),
            b'|' if b1 == b'|' => self.op(2, T::BarBar),
            b'|' if b1 == b'=' => self.op(2, T::BarEquals),
            b'|' => self.op(1, T::Bar),
            b'^' if b1 == b'=' => self.op(2, T::CaretEquals),
            b'^' => self.op(1, T::Caret),
            quote @ (b'"' | b'\'') => self.scan_string(start, quote),
            b'`' => {
                self.pos += 1;
                self.scan_template_span(start, T::NoSubstitutionTemplate, T::TemplateHead)
            }
            b'0'..=b'9' => self.scan_number(start),
            _ => match self.current_char() {
                Some(c) if is_identifier_start(c) => self.scan_identifier(start),
                Some(c) => {
                    self.pos += c.len_utf8();
                    self.error(start, self.pos, &messages::INVALID_CHARACTER, &[]);
                    T::Unknown
                }
                None => T::EndOfFile,
            },
        }
    }

    fn scan_identifier(&mut self, start: usize) -> TokenKind {
        while let Some(c) = self.current_char() {
            if !is_identifier_part(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        let text = &self.text[start..self.pos];
        self.token.value.push_str(text);
        TokenKind::keyword(text).unwrap_or(TokenKind::Identifier)
    }

    fn scan_digits(&mut self, radix: u32) -> String {
        let mut digits = String::new();
        while !self.at_end() {
            let b = self.bytes[self.pos];
            if b == b'_' {
                self.pos += 1;
            } else if (b as char).is_digit(radix) {
                digits.push(b as char);
                self.pos += 1;
            } else {
                break;
            }
        }
        digits
    }

    fn scan_number(&mut self, start: usize) -> TokenKind {
        let radix = match (self.peek(0), self.peek(1) | 0x20) {
            (b'0', b'x') => 16,
            (b'0', b'o') => 8,
            (b'0', b'b') => 2,
            _ => 10,
        };
        if radix != 10 {
            self.pos += 2;
            let digits = self.scan_digits(radix);
            if digits.is_empty() {
                self.error(start, self.pos, &messages::DIGIT_EXPECTED, &[]);
            }
            if self.peek(0) == b'n' {
                self.pos += 1;
                self.token.value = self.text[start..self.pos - 1].replace('_', "");
                return TokenKind::BigIntLiteral;
            }
            self.token.number = digits
                .chars()
                .filter_map(|c| c.to_digit(radix))
                .fold(0.0, |acc, d| acc * radix as f64 + d as f64);
            self.token.value = self.text[start..self.pos].to_string();
            return TokenKind::NumberLiteral;
        }

        let mut literal = self.scan_digits(10);
        if self.peek(0) == b'n' {
            self.pos += 1;
            self.token.value = literal;
            return TokenKind::BigIntLiteral;
        }
        if self.peek(0) == b'.' {
            self.pos += 1;
            literal.push('.');
            literal.push_str(&self.scan_digits(10));
        }
        if self.peek(0) | 0x20 == b'e' {
            let sign = self.peek(1);
            let has_sign = sign == b'+' || sign == b'-';
            if self.peek(if has_sign { 2 } else { 1 }).is_ascii_digit() {
                literal.push('e');
                if has_sign {
                    literal.push(sign as char);
                }
                self.pos += if has_sign { 2 } else { 1 };
                literal.push_str(&self.scan_digits(10));
            } else {
                self.pos += 1;
                self.error(start, self.pos, &messages::DIGIT_EXPECTED, &[]);
            }
        }
        self.token.number = literal.parse::<f64>().unwrap_or(f64::NAN);
        self.token.value = self.text[start..self.pos].to_string();
        TokenKind::NumberLiteral
    }

    /// Decode one escape sequence; `self.pos` is just past the backslash.
    fn scan_escape(&mut self, out: &mut String) {
        let Some(c) = self.current_char() else {
            return;
        };
        self.pos += c.len_utf8();
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek(0).is_ascii_digit() => out.push('\0'),
            'x' => self.scan_hex_escape(2, out),
            'u' if self.peek(0) == b'{' => {
                self.pos += 1;
                let digits_start = self.pos;
                while self.peek(0).is_ascii_hexdigit() {
                    self.pos += 1;
                }
                let code = u32::from_str_radix(&self.text[digits_start..self.pos], 16).ok();
                if self.peek(0) == b'}' {
                    self.pos += 1;
                }
                out.extend(code.and_then(char::from_u32));
            }
            'u' => self.scan_hex_escape(4, out),
            '\r' => {
                if self.peek(0) == b'\n' {
                    self.pos += 1;
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
    }

    fn scan_hex_escape(&mut self, len: usize, out: &mut String) {
        let end = (self.pos + len).min(self.bytes.len());
        let digits = &self.text[self.pos..end];
        match u32::from_str_radix(digits, 16).ok().and_then(char::from_u32) {
            Some(c) if digits.len() == len => {
                out.push(c);
                self.pos = end;
            }
            _ => self.error(self.pos, end, &messages::INVALID_CHARACTER, &[]),
        }
    }

    fn scan_string(&mut self, start: usize, quote: u8) -> TokenKind {
        self.pos += 1;
        let mut value = String::new();
        loop {
            let rest = &self.bytes[self.pos..];
            match memchr3(quote, b'\\', b'\n', rest) {
                Some(offset) => {
                    value.push_str(&self.text[self.pos..self.pos + offset]);
                    self.pos += offset;
                    match self.bytes[self.pos] {
                        b'\\' => {
                            self.pos += 1;
                            self.scan_escape(&mut value);
                        }
                        b'\n' => {
                            self.unterminated(start, &messages::UNTERMINATED_STRING_LITERAL);
                            break;
                        }
                        _ => {
                            self.pos += 1;
                            break;
                        }
                    }
                }
                None => {
                    value.push_str(&self.text[self.pos..]);
                    self.pos = self.bytes.len();
                    self.unterminated(start, &messages::UNTERMINATED_STRING_LITERAL);
                    break;
                }
            }
        }
        self.token.value = value;
        TokenKind::StringLiteral
    }

    fn unterminated(&mut self, start: usize, message: &DiagnosticMessage) {
        self.token.flags |= TokenFlags::UNTERMINATED;
        self.error(start, self.pos, message, &[]);
    }

    /// Scan template text up to `` ` `` or `${`; `self.pos` is at the first
    /// character of the text.
    fn scan_template_span(&mut self, start: usize, closed: TokenKind, open: TokenKind) -> TokenKind {
        let mut value = String::new();
        loop {
            let rest = &self.bytes[self.pos..];
            match memchr3(b'`', b'\\', b'$', rest) {
                Some(offset) => {
                    value.push_str(&self.text[self.pos..self.pos + offset]);
                    self.pos += offset;
                    match self.bytes[self.pos] {
                        b'`' => {
                            self.pos += 1;
                            self.token.value = value;
                            return closed;
                        }
                        b'\\' => {
                            self.pos += 1;
                            self.scan_escape(&mut value);
                        }
                        _ if self.peek(1) == b'{' => {
                            self.pos += 2;
                            self.token.value = value;
                            return open;
                        }
                        _ => {
                            value.push('$');
                            self.pos += 1;
                        }
                    }
                }
                None => {
                    value.push_str(&self.text[self.pos..]);
                    self.pos = self.bytes.len();
                    self.unterminated(start, &messages::UNTERMINATED_TEMPLATE_LITERAL);
                    self.token.value = value;
                    return closed;
                }
            }
        }
    }

    /// Reinterpret the current `}` as the continuation of a template.
    pub fn rescan_template_continuation(&mut self) -> TokenKind {
        let start = self.token.pos as usize;
        self.pos = start + 1;
        let kind = self.scan_template_span(start, TokenKind::TemplateTail, TokenKind::TemplateMiddle);
        self.token.kind = kind;
        self.token.end = self.pos as u32;
        kind
    }

    /// Reinterpret the current `/` or `/=` as a regular expression literal.
    pub fn rescan_slash(&mut self) -> TokenKind {
        if !matches!(self.token.kind, TokenKind::Slash | TokenKind::SlashEquals) {
            return self.token.kind;
        }
        let start = self.token.pos as usize;
        self.pos = start + 1;
        let mut in_class = false;
        let mut terminated = false;
        while !self.at_end() {
            match self.bytes[self.pos] {
                b'\n' | b'\r' => break,
                b'\\' => self.pos += 1,
                b'[' => in_class = true,
                b']' => in_class = false,
                b'/' if !in_class => {
                    terminated = true;
                    break;
                }
                _ => {}
            }
            self.pos += 1;
        }
        let body_end = self.pos.min(self.bytes.len());
        let body = self.text[start + 1..body_end].to_string();
        if terminated {
            self.pos += 1;
            while let Some(c) = self.current_char() {
                if !is_identifier_part(c) {
                    break;
                }
                self.pos += c.len_utf8();
            }
        } else {
            self.unterminated(start, &messages::UNTERMINATED_REGULAR_EXPRESSION_LITERAL);
        }
        // body, then flags after the closing slash
        let flags_start = (body_end + 1).min(self.pos);
        self.token.value = format!("{}/{}", body, &self.text[flags_start..self.pos]);
        self.token.kind = TokenKind::RegExpLiteral;
        self.token.end = self.pos as u32;
        TokenKind::RegExpLiteral
    }

    /// Extend the current `>` to `>=`, `>>`, `>>=`, `>>>` or `>>>=`.
    pub fn rescan_greater_than(&mut self) -> TokenKind {
        if self.token.kind != TokenKind::GreaterThan {
            return self.token.kind;
        }
        let kind = match (self.peek(0), self.peek(1), self.peek(2)) {
            (b'>', b'>', b'=') => self.op(3, TokenKind::GreaterThanGreaterThanGreaterThanEquals),
            (b'>', b'>', _) => self.op(2, TokenKind::GreaterThanGreaterThanGreaterThan),
            (b'>', b'=', _) => self.op(2, TokenKind::GreaterThanGreaterThanEquals),
            (b'>', _, _) => self.op(1, TokenKind::GreaterThanGreaterThan),
            (b'=', _, _) => self.op(1, TokenKind::GreaterThanEquals),
            _ => TokenKind::GreaterThan,
        };
        self.token.kind = kind;
        self.token.end = self.pos as u32;
        kind
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_ascii_alphabetic() || (!c.is_ascii() && c.is_xid_start())
}

fn is_identifier_part(c: char) -> bool {
    c == '_'
        || c == '$'
        || c.is_ascii_alphanumeric()
        || (!c.is_ascii() && (c.is_xid_continue() || c == '\u{200c}' || c == '\u{200d}'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new("test.ts", source);
        let mut out = Vec::new();
        while scanner.scan() != TokenKind::EndOfFile {
            out.push(scanner.kind());
        }
        out
    }

    #[test]
    fn test_greater_than_is_split() {
        assert_eq!(kinds("a >> b"), vec![TokenKind::Identifier, TokenKind::GreaterThan, TokenKind::GreaterThan, TokenKind::Identifier]);
    }

    #[test]
    fn test_rescan_greater_than() {
        let mut scanner = Scanner::new("test.ts", ">>>= 1");
        scanner.scan();
        assert_eq!(scanner.rescan_greater_than(), TokenKind::GreaterThanGreaterThanGreaterThanEquals);
        assert_eq!(scanner.scan(), TokenKind::NumberLiteral);
    }

    #[test]
    fn test_comments_set_line_break_flag() {
        let mut scanner = Scanner::new("test.ts", "a /* \n */ b // c\nd");
        scanner.scan();
        scanner.scan();
        assert!(scanner.token().has_preceding_line_break());
        assert_eq!(scanner.value(), "b");
        scanner.scan();
        assert!(scanner.token().has_preceding_line_break());
        assert_eq!(scanner.value(), "d");
    }
}
