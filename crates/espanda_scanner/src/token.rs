//! Token kinds produced by the scanner.

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TokenFlags: u8 {
        const PRECEDING_LINE_BREAK = 1 << 0;
        const UNTERMINATED         = 1 << 1;
        /// Identifier spelled with a unicode escape; never a keyword.
        const ESCAPED              = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    EndOfFile,
    Unknown,

    // literals and names
    Identifier,
    NumberLiteral,
    BigIntLiteral,
    StringLiteral,
    RegExpLiteral,
    /// `` `text` `` with no substitutions.
    NoSubstitutionTemplate,
    /// `` `text${ ``
    TemplateHead,
    /// `}text${`
    TemplateMiddle,
    /// `` }text` ``
    TemplateTail,

    // punctuation
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Dot,
    DotDotDot,
    Semicolon,
    Comma,
    Colon,
    Question,
    QuestionDot,
    QuestionQuestion,
    QuestionQuestionEquals,
    Arrow,
    At,
    Hash,

    // operators
    LessThan,
    LessThanEquals,
    LessThanLessThan,
    LessThanLessThanEquals,
    /// Always a single `>`; the parser rescans for `>=`, `>>`, `>>>`.
    GreaterThan,
    GreaterThanEquals,
    GreaterThanGreaterThan,
    GreaterThanGreaterThanEquals,
    GreaterThanGreaterThanGreaterThan,
    GreaterThanGreaterThanGreaterThanEquals,
    Equals,
    EqualsEquals,
    EqualsEqualsEquals,
    Exclamation,
    ExclamationEquals,
    ExclamationEqualsEquals,
    Plus,
    PlusPlus,
    PlusEquals,
    Minus,
    MinusMinus,
    MinusEquals,
    Asterisk,
    AsteriskEquals,
    AsteriskAsterisk,
    AsteriskAsteriskEquals,
    Slash,
    SlashEquals,
    Percent,
    PercentEquals,
    Ampersand,
    AmpersandEquals,
    AmpersandAmpersand,
    AmpersandAmpersandEquals,
    Bar,
    BarEquals,
    BarBar,
    BarBarEquals,
    Caret,
    CaretEquals,
    Tilde,

    // reserved words
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    False,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    InstanceOf,
    New,
    Null,
    Return,
    Super,
    Switch,
    This,
    Throw,
    True,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
}

impl TokenKind {
    /// Reserved word for `text`, if it is one. Contextual keywords (`let`,
    /// `of`, `async`, `type`, ...) scan as identifiers.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        Some(match text {
            "break" => TokenKind::Break,
            "case" => TokenKind::Case,
            "catch" => TokenKind::Catch,
            "class" => TokenKind::Class,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "debugger" => TokenKind::Debugger,
            "default" => TokenKind::Default,
            "delete" => TokenKind::Delete,
            "do" => TokenKind::Do,
            "else" => TokenKind::Else,
            "enum" => TokenKind::Enum,
            "export" => TokenKind::Export,
            "extends" => TokenKind::Extends,
            "false" => TokenKind::False,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "in" => TokenKind::In,
            "instanceof" => TokenKind::InstanceOf,
            "new" => TokenKind::New,
            "null" => TokenKind::Null,
            "return" => TokenKind::Return,
            "super" => TokenKind::Super,
            "switch" => TokenKind::Switch,
            "this" => TokenKind::This,
            "throw" => TokenKind::Throw,
            "true" => TokenKind::True,
            "try" => TokenKind::Try,
            "typeof" => TokenKind::Typeof,
            "var" => TokenKind::Var,
            "void" => TokenKind::Void,
            "while" => TokenKind::While,
            "with" => TokenKind::With,
            _ => return None,
        })
    }

    pub fn is_keyword(self) -> bool {
        (self as u16) >= (TokenKind::Break as u16)
    }

    /// Reserved words that may still be used as property names.
    pub fn is_identifier_or_keyword(self) -> bool {
        self == TokenKind::Identifier || self.is_keyword()
    }

    /// Source text of punctuation and keyword tokens, for diagnostics.
    pub fn text(self) -> &'static str {
        match self {
            TokenKind::EndOfFile => "end of file",
            TokenKind::Unknown => "unknown",
            TokenKind::Identifier => "identifier",
            TokenKind::NumberLiteral | TokenKind::BigIntLiteral => "number",
            TokenKind::StringLiteral => "string",
            TokenKind::RegExpLiteral => "regular expression",
            TokenKind::NoSubstitutionTemplate
            | TokenKind::TemplateHead
            | TokenKind::TemplateMiddle
            | TokenKind::TemplateTail => "template",
            TokenKind::OpenBrace => "{",
            TokenKind::CloseBrace => "}",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenBracket => "[",
            TokenKind::CloseBracket => "]",
            TokenKind::Dot => ".",
            TokenKind::DotDotDot => "...",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Question => "?",
            TokenKind::QuestionDot => "?.",
            TokenKind::QuestionQuestion => "??",
            TokenKind::QuestionQuestionEquals => "??=",
            TokenKind::Arrow => "=>",
            TokenKind::At => "@",
            TokenKind::Hash => "#",
            TokenKind::LessThan => "<",
            TokenKind::LessThanEquals => "<=",
            TokenKind::LessThanLessThan => "<<",
            TokenKind::LessThanLessThanEquals => "<<=",
            TokenKind::GreaterThan => ">",
            TokenKind::GreaterThanEquals => ">=",
            TokenKind::GreaterThanGreaterThan => ">>",
            TokenKind::GreaterThanGreaterThanEquals => ">>=",
            TokenKind::GreaterThanGreaterThanGreaterThan => ">>>",
            TokenKind::GreaterThanGreaterThanGreaterThanEquals => ">>>=",
            TokenKind::Equals => "=",
            TokenKind::EqualsEquals => "==",
            TokenKind::EqualsEqualsEquals => "===",
            TokenKind::Exclamation => "!",
            TokenKind::ExclamationEquals => "!=",
            TokenKind::ExclamationEqualsEquals => "!==",
            TokenKind::Plus => "+",
            TokenKind::PlusPlus => "++",
            TokenKind::PlusEquals => "+=",
            TokenKind::Minus => "-",
            TokenKind::MinusMinus => "--",
            TokenKind::MinusEquals => "-=",
            TokenKind::Asterisk => "*",
            TokenKind::AsteriskEquals => "*=",
            TokenKind::AsteriskAsterisk => "**",
            TokenKind::AsteriskAsteriskEquals => "**=",
            TokenKind::Slash => "/",
            TokenKind::SlashEquals => "/=",
            TokenKind::Percent => "%",
            TokenKind::PercentEquals => "%=",
            TokenKind::Ampersand => "&",
            TokenKind::AmpersandEquals => "&=",
            TokenKind::AmpersandAmpersand => "&&",
            TokenKind::AmpersandAmpersandEquals => "&&=",
            TokenKind::Bar => "|",
            TokenKind::BarEquals => "|=",
            TokenKind::BarBar => "||",
            TokenKind::BarBarEquals => "||=",
            TokenKind::Caret => "^",
            TokenKind::CaretEquals => "^=",
            TokenKind::Tilde => "~",
            TokenKind::Break => "break",
            TokenKind::Case => "case",
            TokenKind::Catch => "catch",
            TokenKind::Class => "class",
            TokenKind::Const => "const",
            TokenKind::Continue => "continue",
            TokenKind::Debugger => "debugger",
            TokenKind::Default => "default",
            TokenKind::Delete => "delete",
            TokenKind::Do => "do",
            TokenKind::Else => "else",
            TokenKind::Enum => "enum",
            TokenKind::Export => "export",
            TokenKind::Extends => "extends",
            TokenKind::False => "false",
            TokenKind::Finally => "finally",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::Import => "import",
            TokenKind::In => "in",
            TokenKind::InstanceOf => "instanceof",
            TokenKind::New => "new",
            TokenKind::Null => "null",
            TokenKind::Return => "return",
            TokenKind::Super => "super",
            TokenKind::Switch => "switch",
            TokenKind::This => "this",
            TokenKind::Throw => "throw",
            TokenKind::True => "true",
            TokenKind::Try => "try",
            TokenKind::Typeof => "typeof",
            TokenKind::Var => "var",
            TokenKind::Void => "void",
            TokenKind::While => "while",
            TokenKind::With => "with",
        }
    }
}

/// A scanned token with its cooked value.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: u32,
    pub end: u32,
    pub flags: TokenFlags,
    /// Identifier name, cooked string/template text, regexp body, or bigint
    /// digits.
    pub value: String,
    /// Numeric value of a `NumberLiteral`.
    pub number: f64,
}

impl Token {
    pub fn has_preceding_line_break(&self) -> bool {
        self.flags.contains(TokenFlags::PRECEDING_LINE_BREAK)
    }
}
