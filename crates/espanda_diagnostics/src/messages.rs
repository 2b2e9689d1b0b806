//! The diagnostic catalogue.
//!
//! Codes follow TypeScript's `diagnosticMessages.json` where an equivalent
//! message exists. The 9000 range is local to espanda.

use crate::{DiagnosticCategory, DiagnosticKind, DiagnosticMessage};

macro_rules! diag {
    ($code:expr, $kind:ident, $msg:expr) => {
        DiagnosticMessage {
            code: $code,
            category: DiagnosticCategory::Error,
            kind: DiagnosticKind::$kind,
            message: $msg,
        }
    };
}

// ============================================================================
// Scanner and parser (1000-1999)
// ============================================================================

pub const UNTERMINATED_STRING_LITERAL: DiagnosticMessage = diag!(1002, Syntax, "Unterminated string literal.");
pub const IDENTIFIER_EXPECTED: DiagnosticMessage = diag!(1003, Syntax, "Identifier expected.");
pub const _0_EXPECTED: DiagnosticMessage = diag!(1005, Syntax, "'{0}' expected.");
pub const ASTERISK_SLASH_EXPECTED: DiagnosticMessage = diag!(1010, Syntax, "'*/' expected.");
pub const UNEXPECTED_TOKEN: DiagnosticMessage = diag!(1012, Syntax, "Unexpected token.");
pub const A_REST_PARAMETER_MUST_BE_LAST: DiagnosticMessage = diag!(1014, Syntax, "A rest parameter must be last in a parameter list.");
pub const A_RETURN_STATEMENT_CAN_ONLY_BE_USED_WITHIN_A_FUNCTION_BODY: DiagnosticMessage = diag!(1108, Syntax, "A 'return' statement can only be used within a function body.");
pub const EXPRESSION_EXPECTED: DiagnosticMessage = diag!(1109, Syntax, "Expression expected.");
pub const TYPE_EXPECTED: DiagnosticMessage = diag!(1110, Syntax, "Type expected.");
pub const DUPLICATE_LABEL_0: DiagnosticMessage = diag!(1114, Syntax, "Duplicate label '{0}'.");
pub const A_CONTINUE_STATEMENT_CAN_ONLY_JUMP_TO_A_LABEL_OF_AN_ENCLOSING_ITERATION_STATEMENT: DiagnosticMessage = diag!(1115, Syntax, "A 'continue' statement can only jump to a label of an enclosing iteration statement.");
pub const A_BREAK_STATEMENT_CAN_ONLY_JUMP_TO_A_LABEL_OF_AN_ENCLOSING_STATEMENT: DiagnosticMessage = diag!(1116, Syntax, "A 'break' statement can only jump to a label of an enclosing statement.");
pub const A_CONTINUE_STATEMENT_CAN_ONLY_BE_USED_WITHIN_AN_ENCLOSING_ITERATION_STATEMENT: DiagnosticMessage = diag!(1104, Syntax, "A 'continue' statement can only be used within an enclosing iteration statement.");
pub const A_BREAK_STATEMENT_CAN_ONLY_BE_USED_WITHIN_AN_ENCLOSING_ITERATION_OR_SWITCH_STATEMENT: DiagnosticMessage = diag!(1105, Syntax, "A 'break' statement can only be used within an enclosing iteration or switch statement.");
pub const INVALID_CHARACTER: DiagnosticMessage = diag!(1127, Syntax, "Invalid character.");
pub const PROPERTY_OR_SIGNATURE_EXPECTED: DiagnosticMessage = diag!(1131, Syntax, "Property or signature expected.");
pub const DECLARATION_OR_STATEMENT_EXPECTED: DiagnosticMessage = diag!(1128, Syntax, "Declaration or statement expected.");
pub const CONST_DECLARATIONS_MUST_BE_INITIALIZED: DiagnosticMessage = diag!(1155, Syntax, "'const' declarations must be initialized.");
pub const UNTERMINATED_TEMPLATE_LITERAL: DiagnosticMessage = diag!(1160, Syntax, "Unterminated template literal.");
pub const UNTERMINATED_REGULAR_EXPRESSION_LITERAL: DiagnosticMessage = diag!(1161, Syntax, "Unterminated regular expression literal.");
pub const A_YIELD_EXPRESSION_IS_ONLY_ALLOWED_IN_A_GENERATOR_BODY: DiagnosticMessage = diag!(1163, Syntax, "A 'yield' expression is only allowed in a generator body.");
pub const INVALID_LEFT_HAND_SIDE_IN_FOR_IN_OR_FOR_OF: DiagnosticMessage = diag!(1188, Syntax, "Only a single variable declaration is allowed in a 'for...in' or 'for...of' statement.");
pub const AWAIT_EXPRESSIONS_ARE_ONLY_ALLOWED_WITHIN_ASYNC_FUNCTIONS: DiagnosticMessage = diag!(1308, Syntax, "'await' expressions are only allowed within async functions and at the top levels of modules.");
pub const DIGIT_EXPECTED: DiagnosticMessage = diag!(1124, Syntax, "Digit expected.");
pub const MAXIMUM_NESTING_DEPTH_EXCEEDED: DiagnosticMessage = diag!(1999, Syntax, "Maximum nesting depth exceeded.");

// ============================================================================
// Binder and checker (2000-2999, 7000-7999)
// ============================================================================

pub const DUPLICATE_IDENTIFIER_0: DiagnosticMessage = diag!(2300, Semantic, "Duplicate identifier '{0}'.");
pub const CANNOT_FIND_NAME_0: DiagnosticMessage = diag!(2304, Semantic, "Cannot find name '{0}'.");
pub const GENERIC_TYPE_0_REQUIRES_1_TYPE_ARGUMENTS: DiagnosticMessage = diag!(2314, Semantic, "Generic type '{0}' requires {1} type argument(s).");
pub const TYPE_0_IS_NOT_GENERIC: DiagnosticMessage = diag!(2315, Semantic, "Type '{0}' is not generic.");
pub const TYPE_0_IS_NOT_ASSIGNABLE_TO_TYPE_1: DiagnosticMessage = diag!(2322, Semantic, "Type '{0}' is not assignable to type '{1}'.");
pub const PROPERTY_0_DOES_NOT_EXIST_ON_TYPE_1: DiagnosticMessage = diag!(2339, Semantic, "Property '{0}' does not exist on type '{1}'.");
pub const ARGUMENT_OF_TYPE_0_IS_NOT_ASSIGNABLE_TO_PARAMETER_OF_TYPE_1: DiagnosticMessage = diag!(2345, Semantic, "Argument of type '{0}' is not assignable to parameter of type '{1}'.");
pub const THIS_EXPRESSION_IS_NOT_CALLABLE: DiagnosticMessage = diag!(2349, Semantic, "This expression is not callable.");
pub const THIS_EXPRESSION_IS_NOT_CONSTRUCTABLE: DiagnosticMessage = diag!(2351, Semantic, "This expression is not constructable.");
pub const CONVERSION_OF_TYPE_0_TO_TYPE_1_MAY_BE_A_MISTAKE: DiagnosticMessage = diag!(2352, Semantic, "Conversion of type '{0}' to type '{1}' may be a mistake because neither type sufficiently overlaps with the other.");
pub const A_FUNCTION_WHOSE_DECLARED_TYPE_IS_NEITHER_VOID_NOR_ANY_MUST_RETURN_A_VALUE: DiagnosticMessage = diag!(2355, Semantic, "A function whose declared type is neither 'void' nor 'any' must return a value.");
pub const AN_ARITHMETIC_OPERAND_MUST_BE_OF_TYPE_ANY_NUMBER_BIGINT_OR_AN_ENUM_TYPE: DiagnosticMessage = diag!(2356, Semantic, "An arithmetic operand must be of type 'any', 'number', 'bigint' or an enum type.");
pub const THE_OPERAND_OF_AN_INCREMENT_OR_DECREMENT_OPERATOR_MUST_BE_A_VARIABLE_OR_A_PROPERTY_ACCESS: DiagnosticMessage = diag!(2357, Semantic, "The operand of an increment or decrement operator must be a variable or a property access.");
pub const THE_LEFT_HAND_SIDE_OF_AN_INSTANCEOF_EXPRESSION_MUST_BE_OF_TYPE_ANY_AN_OBJECT_TYPE_OR_A_TYPE_PARAMETER: DiagnosticMessage = diag!(2358, Semantic, "The left-hand side of an 'instanceof' expression must be of type 'any', an object type or a type parameter.");
pub const THE_LEFT_HAND_SIDE_OF_AN_IN_EXPRESSION_MUST_BE_OF_TYPE_ANY_STRING_NUMBER_OR_SYMBOL: DiagnosticMessage = diag!(2360, Semantic, "The left-hand side of an 'in' expression must be of type 'any', 'string', 'number', or 'symbol'.");
pub const THE_RIGHT_HAND_SIDE_OF_AN_IN_EXPRESSION_MUST_NOT_BE_A_PRIMITIVE: DiagnosticMessage = diag!(2361, Semantic, "The right-hand side of an 'in' expression must not be a primitive.");
pub const THE_LEFT_HAND_SIDE_OF_AN_ARITHMETIC_OPERATION_MUST_BE_OF_TYPE_ANY_NUMBER_BIGINT_OR_AN_ENUM_TYPE: DiagnosticMessage = diag!(2362, Semantic, "The left-hand side of an arithmetic operation must be of type 'any', 'number', 'bigint' or an enum type.");
pub const THE_RIGHT_HAND_SIDE_OF_AN_ARITHMETIC_OPERATION_MUST_BE_OF_TYPE_ANY_NUMBER_BIGINT_OR_AN_ENUM_TYPE: DiagnosticMessage = diag!(2363, Semantic, "The right-hand side of an arithmetic operation must be of type 'any', 'number', 'bigint' or an enum type.");
pub const THE_LEFT_HAND_SIDE_OF_AN_ASSIGNMENT_EXPRESSION_MUST_BE_A_VARIABLE_OR_A_PROPERTY_ACCESS: DiagnosticMessage = diag!(2364, Semantic, "The left-hand side of an assignment expression must be a variable or a property access.");
pub const OPERATOR_0_CANNOT_BE_APPLIED_TO_TYPES_1_AND_2: DiagnosticMessage = diag!(2365, Semantic, "Operator '{0}' cannot be applied to types '{1}' and '{2}'.");
pub const THIS_COMPARISON_APPEARS_TO_BE_UNINTENTIONAL_BECAUSE_THE_TYPES_0_AND_1_HAVE_NO_OVERLAP: DiagnosticMessage = diag!(2367, Semantic, "This comparison appears to be unintentional because the types '{0}' and '{1}' have no overlap.");
pub const THE_RIGHT_HAND_SIDE_OF_A_FOR_IN_STATEMENT_MUST_BE_OF_TYPE_ANY_AN_OBJECT_TYPE_OR_A_TYPE_PARAMETER: DiagnosticMessage = diag!(2407, Semantic, "The right-hand side of a 'for...in' statement must be of type 'any', an object type or a type parameter, but here has type '{0}'.");
pub const CANNOT_REDECLARE_BLOCK_SCOPED_VARIABLE_0: DiagnosticMessage = diag!(2451, Semantic, "Cannot redeclare block-scoped variable '{0}'.");
pub const TYPE_ALIAS_0_CIRCULARLY_REFERENCES_ITSELF: DiagnosticMessage = diag!(2456, Semantic, "Type alias '{0}' circularly references itself.");
pub const TYPE_0_MUST_HAVE_A_SYMBOL_ITERATOR_METHOD: DiagnosticMessage = diag!(2488, Semantic, "Type '{0}' must have a '[Symbol.iterator]()' method that returns an iterator.");
pub const _0_IS_REFERENCED_DIRECTLY_OR_INDIRECTLY_IN_ITS_OWN_TYPE_ANNOTATION: DiagnosticMessage = diag!(2502, Semantic, "'{0}' is referenced directly or indirectly in its own type annotation.");
pub const OBJECT_IS_POSSIBLY_NULL: DiagnosticMessage = diag!(2531, Semantic, "Object is possibly 'null'.");
pub const OBJECT_IS_POSSIBLY_UNDEFINED: DiagnosticMessage = diag!(2532, Semantic, "Object is possibly 'undefined'.");
pub const A_FUNCTION_RETURNING_NEVER_CANNOT_HAVE_A_REACHABLE_END_POINT: DiagnosticMessage = diag!(2534, Semantic, "A function returning 'never' cannot have a reachable end point.");
pub const CANNOT_ASSIGN_TO_0_BECAUSE_IT_IS_A_READ_ONLY_PROPERTY: DiagnosticMessage = diag!(2540, Semantic, "Cannot assign to '{0}' because it is a read-only property.");
pub const EXPECTED_0_ARGUMENTS_BUT_GOT_1: DiagnosticMessage = diag!(2554, Semantic, "Expected {0} arguments, but got {1}.");
pub const EXPECTED_AT_LEAST_0_ARGUMENTS_BUT_GOT_1: DiagnosticMessage = diag!(2555, Semantic, "Expected at least {0} arguments, but got {1}.");
pub const EXPECTED_0_1_ARGUMENTS_BUT_GOT_2: DiagnosticMessage = diag!(2556, Semantic, "Expected {0}-{1} arguments, but got {2}.");
pub const CANNOT_ASSIGN_TO_0_BECAUSE_IT_IS_A_CONSTANT: DiagnosticMessage = diag!(2588, Semantic, "Cannot assign to '{0}' because it is a constant.");
pub const _0_ONLY_REFERS_TO_A_TYPE_BUT_IS_BEING_USED_AS_A_VALUE_HERE: DiagnosticMessage = diag!(2693, Semantic, "'{0}' only refers to a type, but is being used as a value here.");
pub const PROPERTY_0_IS_MISSING_IN_TYPE_1_BUT_REQUIRED_IN_TYPE_2: DiagnosticMessage = diag!(2741, Semantic, "Property '{0}' is missing in type '{1}' but required in type '{2}'.");
pub const _0_REFERS_TO_A_VALUE_BUT_IS_BEING_USED_AS_A_TYPE_HERE: DiagnosticMessage = diag!(2749, Semantic, "'{0}' refers to a value, but is being used as a type here. Did you mean 'typeof {0}'?");
pub const NO_OVERLOAD_MATCHES_THIS_CALL: DiagnosticMessage = diag!(2769, Semantic, "No overload matches this call.");
pub const VARIABLE_0_IMPLICITLY_HAS_AN_1_TYPE: DiagnosticMessage = diag!(7005, Semantic, "Variable '{0}' implicitly has an '{1}' type.");
pub const PARAMETER_0_IMPLICITLY_HAS_AN_1_TYPE: DiagnosticMessage = diag!(7006, Semantic, "Parameter '{0}' implicitly has an '{1}' type.");
pub const _0_IMPLICITLY_HAS_RETURN_TYPE_ANY_BECAUSE_IT_IS_REFERENCED_IN_ITS_RETURN_EXPRESSIONS: DiagnosticMessage = diag!(7023, Semantic, "'{0}' implicitly has return type 'any' because it does not have a return type annotation and is referenced directly or indirectly in one of its return expressions.");

// ============================================================================
// espanda specific (9000-9999)
// ============================================================================

pub const FEATURE_0_IS_NOT_SUPPORTED: DiagnosticMessage = diag!(9001, Unsupported, "'{0}' is not supported yet.");
