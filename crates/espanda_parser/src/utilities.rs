//! Token classification helpers used for error recovery and lookahead.

use espanda_scanner::TokenKind;

/// Tokens at which statement-level recovery stops skipping.
pub fn can_start_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::OpenBrace
            | TokenKind::Semicolon
            | TokenKind::Var
            | TokenKind::Const
            | TokenKind::Function
            | TokenKind::Class
            | TokenKind::If
            | TokenKind::Do
            | TokenKind::While
            | TokenKind::For
            | TokenKind::Continue
            | TokenKind::Break
            | TokenKind::Return
            | TokenKind::Switch
            | TokenKind::Throw
            | TokenKind::Try
            | TokenKind::Debugger
            | TokenKind::Export
            | TokenKind::Import
    )
}

/// Whether `kind` can begin an expression; decides if `yield`/`await`/`return`
/// carry an operand.
pub fn can_start_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::NumberLiteral
            | TokenKind::BigIntLiteral
            | TokenKind::StringLiteral
            | TokenKind::NoSubstitutionTemplate
            | TokenKind::TemplateHead
            | TokenKind::OpenParen
            | TokenKind::OpenBracket
            | TokenKind::OpenBrace
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
            | TokenKind::Exclamation
            | TokenKind::Tilde
            | TokenKind::Slash
            | TokenKind::SlashEquals
            | TokenKind::LessThan
            | TokenKind::DotDotDot
            | TokenKind::Function
            | TokenKind::Class
            | TokenKind::New
            | TokenKind::This
            | TokenKind::Super
            | TokenKind::Null
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Typeof
            | TokenKind::Void
            | TokenKind::Delete
            | TokenKind::Import
    )
}
