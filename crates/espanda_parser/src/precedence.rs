//! Operator precedence and token-to-operator mapping.

use espanda_ast::{AssignmentOperator, BinaryOperator};
use espanda_scanner::TokenKind;

/// Binary operator precedence levels, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum OperatorPrecedence {
    Lowest = 0,
    NullishCoalescing,
    LogicalOr,
    LogicalAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
    Exponentiation,
    Invalid = 255,
}

/// Precedence of `kind` used as a binary operator. `in` is excluded when
/// `allow_in` is false (the head of a `for` statement).
pub fn binary_precedence(kind: TokenKind, allow_in: bool) -> OperatorPrecedence {
    match kind {
        TokenKind::QuestionQuestion => OperatorPrecedence::NullishCoalescing,
        TokenKind::BarBar => OperatorPrecedence::LogicalOr,
        TokenKind::AmpersandAmpersand => OperatorPrecedence::LogicalAnd,
        TokenKind::Bar => OperatorPrecedence::BitwiseOr,
        TokenKind::Caret => OperatorPrecedence::BitwiseXor,
        TokenKind::Ampersand => OperatorPrecedence::BitwiseAnd,
        TokenKind::EqualsEquals
        | TokenKind::ExclamationEquals
        | TokenKind::EqualsEqualsEquals
        | TokenKind::ExclamationEqualsEquals => OperatorPrecedence::Equality,
        TokenKind::LessThan
        | TokenKind::GreaterThan
        | TokenKind::LessThanEquals
        | TokenKind::GreaterThanEquals
        | TokenKind::InstanceOf => OperatorPrecedence::Relational,
        TokenKind::In if allow_in => OperatorPrecedence::Relational,
        TokenKind::LessThanLessThan
        | TokenKind::GreaterThanGreaterThan
        | TokenKind::GreaterThanGreaterThanGreaterThan => OperatorPrecedence::Shift,
        TokenKind::Plus | TokenKind::Minus => OperatorPrecedence::Additive,
        TokenKind::Asterisk | TokenKind::Slash | TokenKind::Percent => {
            OperatorPrecedence::Multiplicative
        }
        TokenKind::AsteriskAsterisk => OperatorPrecedence::Exponentiation,
        _ => OperatorPrecedence::Invalid,
    }
}

pub fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    Some(match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Sub,
        TokenKind::Asterisk => BinaryOperator::Mul,
        TokenKind::Slash => BinaryOperator::Div,
        TokenKind::Percent => BinaryOperator::Mod,
        TokenKind::AsteriskAsterisk => BinaryOperator::Exp,
        TokenKind::LessThanLessThan => BinaryOperator::Shl,
        TokenKind::GreaterThanGreaterThan => BinaryOperator::Shr,
        TokenKind::GreaterThanGreaterThanGreaterThan => BinaryOperator::UShr,
        TokenKind::Ampersand => BinaryOperator::BitAnd,
        TokenKind::Bar => BinaryOperator::BitOr,
        TokenKind::Caret => BinaryOperator::BitXor,
        TokenKind::EqualsEquals => BinaryOperator::Eq,
        TokenKind::ExclamationEquals => BinaryOperator::NotEq,
        TokenKind::EqualsEqualsEquals => BinaryOperator::StrictEq,
        TokenKind::ExclamationEqualsEquals => BinaryOperator::StrictNotEq,
        TokenKind::LessThan => BinaryOperator::Lt,
        TokenKind::LessThanEquals => BinaryOperator::LtEq,
        TokenKind::GreaterThan => BinaryOperator::Gt,
        TokenKind::GreaterThanEquals => BinaryOperator::GtEq,
        TokenKind::In => BinaryOperator::In,
        TokenKind::InstanceOf => BinaryOperator::InstanceOf,
        TokenKind::AmpersandAmpersand => BinaryOperator::LogicalAnd,
        TokenKind::BarBar => BinaryOperator::LogicalOr,
        TokenKind::QuestionQuestion => BinaryOperator::Nullish,
        _ => return None,
    })
}

pub fn assignment_operator(kind: TokenKind) -> Option<AssignmentOperator> {
    Some(match kind {
        TokenKind::Equals => AssignmentOperator::Assign,
        TokenKind::PlusEquals => AssignmentOperator::AddAssign,
        TokenKind::MinusEquals => AssignmentOperator::SubAssign,
        TokenKind::AsteriskEquals => AssignmentOperator::MulAssign,
        TokenKind::SlashEquals => AssignmentOperator::DivAssign,
        TokenKind::PercentEquals => AssignmentOperator::ModAssign,
        TokenKind::AsteriskAsteriskEquals => AssignmentOperator::ExpAssign,
        TokenKind::LessThanLessThanEquals => AssignmentOperator::ShlAssign,
        TokenKind::GreaterThanGreaterThanEquals => AssignmentOperator::ShrAssign,
        TokenKind::GreaterThanGreaterThanGreaterThanEquals => AssignmentOperator::UShrAssign,
        TokenKind::AmpersandEquals => AssignmentOperator::BitAndAssign,
        TokenKind::BarEquals => AssignmentOperator::BitOrAssign,
        TokenKind::CaretEquals => AssignmentOperator::BitXorAssign,
        TokenKind::AmpersandAmpersandEquals => AssignmentOperator::LogicalAndAssign,
        TokenKind::BarBarEquals => AssignmentOperator::LogicalOrAssign,
        TokenKind::QuestionQuestionEquals => AssignmentOperator::NullishAssign,
        _ => return None,
    })
}
