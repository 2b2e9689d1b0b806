//! Expressions, binding patterns and parameter lists.

use espanda_ast::{
    AssignmentOperator, FunctionFlags, MetaPropertyKind, NodeId, NodeKind, PropertyKind,
    UnaryOperator, UpdateOperator,
};
use espanda_core::text::TextRange;
use espanda_diagnostics::messages;
use espanda_scanner::TokenKind;

use crate::parser::Parser;
use crate::precedence::{assignment_operator, binary_operator, binary_precedence, OperatorPrecedence};
use crate::utilities::can_start_expression;

/// Parsed head of an arrow function: type parameters, parameters and return
/// type.
type ArrowHead = (Option<NodeId>, Vec<NodeId>, Option<NodeId>);

impl<'a> Parser<'a> {
    pub(crate) fn with_allow_in<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.allow_in, true);
        let result = f(self);
        self.allow_in = saved;
        result
    }

    /// A placeholder for a missing name or expression. The empty name marks it
    /// as already diagnosed.
    pub(crate) fn missing_identifier(&mut self) -> NodeId {
        let pos = self.pos();
        let name = self.ast.intern("");
        self.ast.alloc(
            NodeKind::Identifier {
                name,
                type_annotation: None,
                optional: false,
            },
            TextRange::empty(pos),
        )
    }

    fn start_of(&self, id: NodeId) -> u32 {
        self.ast.range(id).pos
    }

    // ========================================================================
    // Expression parsing
    // ========================================================================

    /// Comma-separated expressions; more than one becomes a
    /// `SequenceExpression`.
    pub(crate) fn parse_expression(&mut self) -> NodeId {
        let first = self.parse_assignment_expression();
        if !self.at(TokenKind::Comma) {
            return first;
        }
        let start = self.start_of(first);
        let mut expressions = vec![first];
        while self.eat(TokenKind::Comma) {
            expressions.push(self.parse_assignment_expression());
        }
        self.finish(start, NodeKind::SequenceExpression { expressions })
    }

    pub(crate) fn parse_assignment_expression(&mut self) -> NodeId {
        if !self.enter_recursion() {
            self.leave_recursion();
            return self.missing_identifier();
        }
        let expr = self.parse_assignment_expression_inner();
        self.leave_recursion();
        expr
    }

    fn parse_assignment_expression_inner(&mut self) -> NodeId {
        let start = self.pos();
        if self.is_contextual("yield") {
            if self.in_generator() {
                return self.parse_yield_expression();
            }
            if self.peek_same_line(|k| {
                matches!(k, TokenKind::Identifier | TokenKind::NumberLiteral | TokenKind::StringLiteral)
            }) {
                self.error(&messages::A_YIELD_EXPRESSION_IS_ONLY_ALLOWED_IN_A_GENERATOR_BODY, &[]);
                return self.parse_yield_expression();
            }
        }
        if let Some(arrow) = self.try_parse_arrow_function(start) {
            return arrow;
        }

        let left = self.parse_conditional_expression();
        let Some(operator) = assignment_operator(self.kind()) else {
            return left;
        };
        if operator == AssignmentOperator::Assign
            && matches!(
                self.ast.kind(left),
                NodeKind::ArrayExpression { .. } | NodeKind::ObjectExpression { .. }
            )
        {
            self.reinterpret_as_pattern(left);
        }
        self.next();
        let right = self.parse_assignment_expression();
        let start = self.start_of(left);
        self.finish(
            start,
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            },
        )
    }

    // ---- arrow functions ----

    fn try_parse_arrow_function(&mut self, start: u32) -> Option<NodeId> {
        let is_async = self.is_contextual("async")
            && self.peek_same_line(|k| {
                matches!(k, TokenKind::Identifier | TokenKind::OpenParen | TokenKind::LessThan)
            });
        let mut flags = FunctionFlags::ARROW;
        if is_async {
            flags |= FunctionFlags::ASYNC;
        }

        // `x => ...` and `async x => ...`
        let single_param = self.look_ahead(|p| {
            if is_async {
                p.next();
            }
            p.at(TokenKind::Identifier) && {
                p.next();
                p.at(TokenKind::Arrow) && !p.has_line_break()
            }
        });
        if single_param {
            if is_async {
                self.next();
            }
            let param = self.parse_binding_identifier();
            return Some(self.parse_arrow_function_rest(start, (None, vec![param], None), flags));
        }

        if !is_async && !matches!(self.kind(), TokenKind::OpenParen | TokenKind::LessThan) {
            return None;
        }
        let head = self.try_parse(|p| {
            if is_async {
                p.next();
            }
            let type_params = p.parse_type_parameters_opt();
            if !p.at(TokenKind::OpenParen) {
                return None;
            }
            let params = p.parse_parameters();
            let return_type = p.parse_return_type_opt();
            (p.at(TokenKind::Arrow) && !p.has_line_break()).then_some((type_params, params, return_type))
        })?;
        Some(self.parse_arrow_function_rest(start, head, flags))
    }

    fn parse_arrow_function_rest(&mut self, start: u32, head: ArrowHead, flags: FunctionFlags) -> NodeId {
        let (type_params, params, return_type) = head;
        self.expect(TokenKind::Arrow);
        let (body, flags) = self.with_function_context(flags, |p| {
            if p.at(TokenKind::OpenBrace) {
                (p.parse_block_statement(), flags)
            } else {
                (p.parse_assignment_expression(), flags | FunctionFlags::EXPRESSION_BODY)
            }
        });
        let function = self.finish(
            start,
            NodeKind::ScriptFunction {
                id: None,
                type_params,
                params,
                return_type,
                body: Some(body),
                flags,
            },
        );
        self.finish(start, NodeKind::ArrowFunctionExpression { function })
    }

    // ---- operators ----

    fn parse_conditional_expression(&mut self) -> NodeId {
        let test = self.parse_binary_expression(OperatorPrecedence::Lowest);
        if !self.eat(TokenKind::Question) {
            return test;
        }
        let consequent = self.with_allow_in(|p| p.parse_assignment_expression());
        self.expect(TokenKind::Colon);
        let alternate = self.parse_assignment_expression();
        let start = self.start_of(test);
        self.finish(
            start,
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            },
        )
    }

    fn parse_binary_expression(&mut self, min_precedence: OperatorPrecedence) -> NodeId {
        let mut left = self.parse_unary_expression();
        loop {
            if self.at(TokenKind::GreaterThan) {
                self.scanner.rescan_greater_than();
            }
            let start = self.start_of(left);

            if (self.is_contextual("as") || self.is_contextual("satisfies"))
                && !self.has_line_break()
                && OperatorPrecedence::Relational > min_precedence
            {
                let is_as = self.value() == "as";
                let keyword_start = self.pos();
                self.next();
                let type_annotation = if is_as && self.at(TokenKind::Const) {
                    let const_start = self.pos();
                    let type_name = self.ast.intern("const");
                    self.next();
                    self.finish(
                        const_start,
                        NodeKind::TSTypeReference {
                            type_name,
                            type_args: Vec::new(),
                        },
                    )
                } else {
                    self.parse_type()
                };
                if !is_as {
                    let end = self.prev_end();
                    self.unsupported(keyword_start, end, "satisfies");
                    continue;
                }
                left = self.finish(
                    start,
                    NodeKind::TSAsExpression {
                        expression: left,
                        type_annotation,
                    },
                );
                continue;
            }

            let kind = self.kind();
            let precedence = binary_precedence(kind, self.allow_in);
            if precedence == OperatorPrecedence::Invalid || precedence <= min_precedence {
                break;
            }
            let Some(operator) = binary_operator(kind) else {
                break;
            };
            self.next();
            // `**` is right-associative.
            let right_precedence = if kind == TokenKind::AsteriskAsterisk {
                OperatorPrecedence::Multiplicative
            } else {
                precedence
            };
            let right = self.parse_binary_expression(right_precedence);
            left = self.finish(
                start,
                NodeKind::BinaryExpression {
                    operator,
                    left,
                    right,
                },
            );
        }
        left
    }

    fn parse_unary_expression(&mut self) -> NodeId {
        let start = self.pos();
        let operator = match self.kind() {
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let operator = if self.at(TokenKind::PlusPlus) {
                    UpdateOperator::Increment
                } else {
                    UpdateOperator::Decrement
                };
                self.next();
                let argument = self.parse_unary_expression();
                return self.finish(
                    start,
                    NodeKind::UpdateExpression {
                        operator,
                        prefix: true,
                        argument,
                    },
                );
            }
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Minus => UnaryOperator::Minus,
            TokenKind::Exclamation => UnaryOperator::Not,
            TokenKind::Tilde => UnaryOperator::BitNot,
            TokenKind::Typeof => UnaryOperator::Typeof,
            TokenKind::Void => UnaryOperator::Void,
            TokenKind::Delete => UnaryOperator::Delete,
            TokenKind::LessThan => {
                // `<T>expr`
                let type_args = self.parse_type_arguments_opt();
                let expression = self.parse_unary_expression();
                let Some(&type_annotation) = type_args.first() else {
                    return expression;
                };
                return self.finish(
                    start,
                    NodeKind::TSAsExpression {
                        expression,
                        type_annotation,
                    },
                );
            }
            TokenKind::Identifier if self.is_contextual("await") => {
                let has_operand = self.peek_same_line(can_start_expression);
                if self.in_async() || has_operand {
                    if !self.in_async() {
                        self.error(&messages::AWAIT_EXPRESSIONS_ARE_ONLY_ALLOWED_WITHIN_ASYNC_FUNCTIONS, &[]);
                    }
                    self.next();
                    let argument = Some(self.parse_unary_expression());
                    return self.finish(start, NodeKind::AwaitExpression { argument });
                }
                return self.parse_postfix_expression();
            }
            _ => return self.parse_postfix_expression(),
        };
        self.next();
        let argument = self.parse_unary_expression();
        self.finish(start, NodeKind::UnaryExpression { operator, argument })
    }

    fn parse_postfix_expression(&mut self) -> NodeId {
        let expr = self.parse_left_hand_side_expression();
        if self.has_line_break() {
            return expr;
        }
        let operator = match self.kind() {
            TokenKind::PlusPlus => UpdateOperator::Increment,
            TokenKind::MinusMinus => UpdateOperator::Decrement,
            _ => return expr,
        };
        self.next();
        let start = self.start_of(expr);
        self.finish(
            start,
            NodeKind::UpdateExpression {
                operator,
                prefix: false,
                argument: expr,
            },
        )
    }

    // ---- member access and calls ----

    pub(crate) fn parse_left_hand_side_expression(&mut self) -> NodeId {
        let start = self.pos();
        let expr = if self.at(TokenKind::New) {
            self.parse_new_expression()
        } else {
            self.parse_primary_expression()
        };
        self.parse_member_and_call_tail(start, expr, true)
    }

    fn parse_member_and_call_tail(&mut self, start: u32, mut expr: NodeId, allow_calls: bool) -> NodeId {
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.next();
                    let property = self.parse_property_name_identifier();
                    expr = self.finish(
                        start,
                        NodeKind::MemberExpression {
                            object: expr,
                            property,
                            computed: false,
                            optional: false,
                        },
                    );
                }
                TokenKind::QuestionDot if allow_calls => {
                    self.next();
                    expr = match self.kind() {
                        TokenKind::OpenParen => {
                            let arguments = self.parse_arguments();
                            self.finish(
                                start,
                                NodeKind::CallExpression {
                                    callee: expr,
                                    type_args: Vec::new(),
                                    arguments,
                                    optional: true,
                                },
                            )
                        }
                        TokenKind::OpenBracket => {
                            self.next();
                            let property = self.with_allow_in(|p| p.parse_expression());
                            self.expect(TokenKind::CloseBracket);
                            self.finish(
                                start,
                                NodeKind::MemberExpression {
                                    object: expr,
                                    property,
                                    computed: true,
                                    optional: true,
                                },
                            )
                        }
                        _ => {
                            let property = self.parse_property_name_identifier();
                            self.finish(
                                start,
                                NodeKind::MemberExpression {
                                    object: expr,
                                    property,
                                    computed: false,
                                    optional: true,
                                },
                            )
                        }
                    };
                }
                TokenKind::OpenBracket => {
                    self.next();
                    let property = self.with_allow_in(|p| p.parse_expression());
                    self.expect(TokenKind::CloseBracket);
                    expr = self.finish(
                        start,
                        NodeKind::MemberExpression {
                            object: expr,
                            property,
                            computed: true,
                            optional: false,
                        },
                    );
                }
                TokenKind::Exclamation if !self.has_line_break() => {
                    self.next();
                    expr = self.finish(start, NodeKind::TSNonNullExpression { expression: expr });
                }
                TokenKind::OpenParen if allow_calls => {
                    let arguments = self.parse_arguments();
                    expr = self.finish(
                        start,
                        NodeKind::CallExpression {
                            callee: expr,
                            type_args: Vec::new(),
                            arguments,
                            optional: false,
                        },
                    );
                }
                TokenKind::LessThan if allow_calls => {
                    let Some(type_args) = self.try_parse(|p| {
                        let args = p.parse_type_arguments_opt();
                        p.at(TokenKind::OpenParen).then_some(args)
                    }) else {
                        break;
                    };
                    let arguments = self.parse_arguments();
                    expr = self.finish(
                        start,
                        NodeKind::CallExpression {
                            callee: expr,
                            type_args,
                            arguments,
                            optional: false,
                        },
                    );
                }
                TokenKind::NoSubstitutionTemplate | TokenKind::TemplateHead => {
                    let tag_end = self.prev_end();
                    self.unsupported(start, tag_end, "tagged template");
                    expr = self.parse_template_literal();
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_new_expression(&mut self) -> NodeId {
        let start = self.pos();
        self.next(); // new
        if self.eat(TokenKind::Dot) {
            if self.is_contextual("target") {
                self.next();
            } else {
                self.error(&messages::_0_EXPECTED, &["target"]);
            }
            return self.finish(
                start,
                NodeKind::MetaProperty {
                    kind: MetaPropertyKind::NewTarget,
                },
            );
        }
        let callee_start = self.pos();
        let callee = if self.at(TokenKind::New) {
            self.parse_new_expression()
        } else {
            self.parse_primary_expression()
        };
        let callee = self.parse_member_and_call_tail(callee_start, callee, false);
        let type_args = if self.at(TokenKind::LessThan) {
            self.try_parse(|p| {
                let args = p.parse_type_arguments_opt();
                (!args.is_empty()).then_some(args)
            })
            .unwrap_or_default()
        } else {
            Vec::new()
        };
        let arguments = if self.at(TokenKind::OpenParen) {
            self.parse_arguments()
        } else {
            Vec::new()
        };
        self.finish(
            start,
            NodeKind::NewExpression {
                callee,
                type_args,
                arguments,
            },
        )
    }

    fn parse_arguments(&mut self) -> Vec<NodeId> {
        self.expect(TokenKind::OpenParen);
        let arguments = self.with_allow_in(|p| {
            let mut arguments = Vec::new();
            while !p.at(TokenKind::CloseParen) && !p.at(TokenKind::EndOfFile) {
                arguments.push(p.parse_spread_or_assignment());
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            arguments
        });
        self.expect(TokenKind::CloseParen);
        arguments
    }

    fn parse_spread_or_assignment(&mut self) -> NodeId {
        let start = self.pos();
        if self.eat(TokenKind::DotDotDot) {
            let argument = self.parse_assignment_expression();
            return self.finish(start, NodeKind::SpreadElement { argument });
        }
        self.parse_assignment_expression()
    }

    /// The name after `.`: any identifier, reserved word or `#private` name.
    fn parse_property_name_identifier(&mut self) -> NodeId {
        let start = self.pos();
        let name = if self.at(TokenKind::Hash) {
            self.next();
            let name = format!("#{}", self.value());
            if !self.kind().is_identifier_or_keyword() {
                self.error(&messages::IDENTIFIER_EXPECTED, &[]);
                return self.missing_identifier();
            }
            self.ast.intern(&name)
        } else if self.kind().is_identifier_or_keyword() {
            self.intern_value()
        } else {
            self.error(&messages::IDENTIFIER_EXPECTED, &[]);
            return self.missing_identifier();
        };
        self.next();
        self.finish(
            start,
            NodeKind::Identifier {
                name,
                type_annotation: None,
                optional: false,
            },
        )
    }

    // ---- primary expressions ----

    fn parse_primary_expression(&mut self) -> NodeId {
        let start = self.pos();
        match self.kind() {
            TokenKind::Identifier => {
                if self.is_contextual("async") && self.peek_same_line(|k| k == TokenKind::Function) {
                    self.next();
                    return self.parse_function_expression(start, FunctionFlags::ASYNC);
                }
                let name = self.intern_value();
                self.next();
                self.finish(
                    start,
                    NodeKind::Identifier {
                        name,
                        type_annotation: None,
                        optional: false,
                    },
                )
            }
            TokenKind::NumberLiteral => {
                let value = self.scanner.token().number;
                self.next();
                self.finish(start, NodeKind::NumberLiteral { value })
            }
            TokenKind::BigIntLiteral => {
                let value = self.intern_value();
                self.next();
                self.finish(start, NodeKind::BigIntLiteral { value })
            }
            TokenKind::StringLiteral => {
                let value = self.intern_value();
                self.next();
                self.finish(start, NodeKind::StringLiteral { value })
            }
            TokenKind::True | TokenKind::False => {
                let value = self.at(TokenKind::True);
                self.next();
                self.finish(start, NodeKind::BooleanLiteral { value })
            }
            TokenKind::Null => {
                self.next();
                self.finish(start, NodeKind::NullLiteral)
            }
            TokenKind::This => {
                self.next();
                self.finish(start, NodeKind::ThisExpression)
            }
            TokenKind::Super => {
                self.next();
                self.finish(start, NodeKind::SuperExpression)
            }
            TokenKind::Function => self.parse_function_expression(start, FunctionFlags::empty()),
            TokenKind::Class => {
                let definition = self.parse_class_definition(false);
                self.finish(start, NodeKind::ClassExpression { definition })
            }
            TokenKind::OpenParen => {
                self.next();
                let expr = self.with_allow_in(|p| p.parse_expression());
                self.expect(TokenKind::CloseParen);
                expr
            }
            TokenKind::OpenBracket => self.parse_array_literal(),
            TokenKind::OpenBrace => self.parse_object_literal(),
            TokenKind::Slash | TokenKind::SlashEquals => {
                self.scanner.rescan_slash();
                let text = self.value().to_string();
                let (pattern, flags) = text.rsplit_once('/').unwrap_or((text.as_str(), ""));
                let pattern = self.ast.intern(pattern);
                let flags = self.ast.intern(flags);
                self.next();
                self.finish(start, NodeKind::RegExpLiteral { pattern, flags })
            }
            TokenKind::NoSubstitutionTemplate | TokenKind::TemplateHead => {
                self.parse_template_literal()
            }
            TokenKind::Import => {
                self.next();
                if self.eat(TokenKind::Dot) {
                    if self.is_contextual("meta") {
                        self.next();
                    } else {
                        self.error(&messages::_0_EXPECTED, &["meta"]);
                    }
                    return self.finish(
                        start,
                        NodeKind::MetaProperty {
                            kind: MetaPropertyKind::ImportMeta,
                        },
                    );
                }
                if self.at(TokenKind::OpenParen) {
                    self.parse_arguments();
                }
                let end = self.prev_end();
                self.unsupported(start, end, "dynamic import");
                self.missing_identifier()
            }
            _ => {
                self.error(&messages::EXPRESSION_EXPECTED, &[]);
                self.missing_identifier()
            }
        }
    }

    fn parse_function_expression(&mut self, start: u32, mut flags: FunctionFlags) -> NodeId {
        self.expect(TokenKind::Function);
        if self.eat(TokenKind::Asterisk) {
            flags |= FunctionFlags::GENERATOR;
        }
        let id = if self.at(TokenKind::Identifier) {
            Some(self.parse_binding_identifier())
        } else {
            None
        };
        let function = self.parse_function_rest(start, id, flags);
        self.finish(start, NodeKind::FunctionExpression { function })
    }

    fn parse_array_literal(&mut self) -> NodeId {
        let start = self.pos();
        self.expect(TokenKind::OpenBracket);
        let elements = self.with_allow_in(|p| {
            let mut elements = Vec::new();
            while !p.at(TokenKind::CloseBracket) && !p.at(TokenKind::EndOfFile) {
                if p.at(TokenKind::Comma) {
                    let hole = p.pos();
                    p.next();
                    elements.push(p.ast.alloc(NodeKind::OmittedExpression, TextRange::empty(hole)));
                    continue;
                }
                elements.push(p.parse_spread_or_assignment());
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            elements
        });
        self.expect(TokenKind::CloseBracket);
        self.finish(start, NodeKind::ArrayExpression { elements })
    }

    fn parse_object_literal(&mut self) -> NodeId {
        let start = self.pos();
        self.expect(TokenKind::OpenBrace);
        let properties = self.with_allow_in(|p| {
            let mut properties = Vec::new();
            while !p.at(TokenKind::CloseBrace) && !p.at(TokenKind::EndOfFile) {
                let saved_pos = p.pos();
                properties.push(p.parse_object_literal_element());
                if !p.eat(TokenKind::Comma) || p.pos() == saved_pos {
                    break;
                }
            }
            properties
        });
        self.expect(TokenKind::CloseBrace);
        self.finish(start, NodeKind::ObjectExpression { properties })
    }

    /// A modifier word (`async`, `get`, `set`) directly followed by a
    /// property name.
    fn is_property_modifier(&mut self) -> bool {
        self.peek_same_line(|k| {
            k.is_identifier_or_keyword()
                || matches!(
                    k,
                    TokenKind::StringLiteral
                        | TokenKind::NumberLiteral
                        | TokenKind::OpenBracket
                        | TokenKind::Asterisk
                )
        })
    }

    fn parse_object_literal_element(&mut self) -> NodeId {
        let start = self.pos();
        if self.eat(TokenKind::DotDotDot) {
            let argument = self.parse_assignment_expression();
            return self.finish(start, NodeKind::SpreadElement { argument });
        }

        let mut flags = FunctionFlags::METHOD;
        let mut kind = PropertyKind::Init;
        if self.is_contextual("async") && self.is_property_modifier() {
            self.next();
            flags |= FunctionFlags::ASYNC;
        }
        if self.eat(TokenKind::Asterisk) {
            flags |= FunctionFlags::GENERATOR;
        }
        if (self.is_contextual("get") || self.is_contextual("set")) && self.is_property_modifier() {
            if self.value() == "get" {
                kind = PropertyKind::Get;
                flags |= FunctionFlags::GETTER;
            } else {
                kind = PropertyKind::Set;
                flags |= FunctionFlags::SETTER;
            }
            self.next();
        }

        let key_is_identifier = self.at(TokenKind::Identifier);
        let (key, computed) = self.parse_property_key();

        if self.at(TokenKind::OpenParen) || self.at(TokenKind::LessThan) {
            let function = self.parse_function_rest(start, None, flags);
            let value = self.finish(start, NodeKind::FunctionExpression { function });
            if kind == PropertyKind::Init {
                kind = PropertyKind::Method;
            }
            return self.finish(
                start,
                NodeKind::Property {
                    kind,
                    key,
                    value,
                    computed,
                    shorthand: false,
                },
            );
        }

        if self.eat(TokenKind::Colon) {
            let value = self.parse_assignment_expression();
            return self.finish(
                start,
                NodeKind::Property {
                    kind: PropertyKind::Init,
                    key,
                    value,
                    computed,
                    shorthand: false,
                },
            );
        }

        // shorthand `{ a }`, or `{ a = 1 }` which is only valid as a pattern
        if !key_is_identifier || computed {
            self.error(&messages::_0_EXPECTED, &[":"]);
        }
        let name = self.ast.identifier_name(key).unwrap_or_else(|| self.ast.intern(""));
        let key_range = self.ast.range(key);
        let mut value = self.ast.alloc(
            NodeKind::Identifier {
                name,
                type_annotation: None,
                optional: false,
            },
            key_range,
        );
        if self.eat(TokenKind::Equals) {
            let right = self.parse_assignment_expression();
            value = self.finish(
                start,
                NodeKind::AssignmentExpression {
                    operator: AssignmentOperator::Assign,
                    left: value,
                    right,
                },
            );
        }
        self.finish(
            start,
            NodeKind::Property {
                kind: PropertyKind::Init,
                key,
                value,
                computed,
                shorthand: true,
            },
        )
    }

    /// A property name in an object literal, class body or pattern. Returns
    /// the key node and whether it is computed.
    pub(crate) fn parse_property_key(&mut self) -> (NodeId, bool) {
        let start = self.pos();
        match self.kind() {
            TokenKind::OpenBracket => {
                self.next();
                let key = self.with_allow_in(|p| p.parse_assignment_expression());
                self.expect(TokenKind::CloseBracket);
                (key, true)
            }
            TokenKind::StringLiteral => {
                let value = self.intern_value();
                self.next();
                (self.finish(start, NodeKind::StringLiteral { value }), false)
            }
            TokenKind::NumberLiteral => {
                let value = self.scanner.token().number;
                self.next();
                (self.finish(start, NodeKind::NumberLiteral { value }), false)
            }
            TokenKind::BigIntLiteral => {
                let value = self.intern_value();
                self.next();
                (self.finish(start, NodeKind::BigIntLiteral { value }), false)
            }
            _ => (self.parse_property_name_identifier(), false),
        }
    }

    pub(crate) fn parse_template_literal(&mut self) -> NodeId {
        let start = self.pos();
        let mut quasis = vec![self.intern_value()];
        let mut expressions = Vec::new();
        if self.at(TokenKind::NoSubstitutionTemplate) {
            self.next();
            return self.finish(start, NodeKind::TemplateLiteral { quasis, expressions });
        }
        self.next(); // head
        loop {
            expressions.push(self.with_allow_in(|p| p.parse_expression()));
            if !self.at(TokenKind::CloseBrace) {
                self.error(&messages::_0_EXPECTED, &["}"]);
                quasis.push(self.ast.intern(""));
                break;
            }
            let kind = self.scanner.rescan_template_continuation();
            quasis.push(self.intern_value());
            self.next();
            if kind == TokenKind::TemplateTail {
                break;
            }
        }
        self.finish(start, NodeKind::TemplateLiteral { quasis, expressions })
    }

    fn parse_yield_expression(&mut self) -> NodeId {
        let start = self.pos();
        self.next();
        let delegate = !self.has_line_break() && self.eat(TokenKind::Asterisk);
        let argument = if delegate || (!self.has_line_break() && can_start_expression(self.kind())) {
            Some(self.parse_assignment_expression())
        } else {
            None
        };
        self.finish(start, NodeKind::YieldExpression { argument, delegate })
    }

    // ========================================================================
    // Bindings and parameters
    // ========================================================================

    pub(crate) fn parse_binding_identifier(&mut self) -> NodeId {
        let start = self.pos();
        if !self.at(TokenKind::Identifier) {
            self.error(&messages::IDENTIFIER_EXPECTED, &[]);
            return self.missing_identifier();
        }
        let name = self.intern_value();
        self.next();
        self.finish(
            start,
            NodeKind::Identifier {
                name,
                type_annotation: None,
                optional: false,
            },
        )
    }

    /// A binding name or destructuring pattern, with an optional `?`, `!`
    /// and type annotation when `with_annotation` is set.
    pub(crate) fn parse_binding_target(&mut self, with_annotation: bool) -> NodeId {
        let start = self.pos();
        match self.kind() {
            TokenKind::OpenBracket => {
                let elements = self.parse_array_pattern_elements();
                let type_annotation = if with_annotation {
                    self.parse_type_annotation_opt()
                } else {
                    None
                };
                self.finish(
                    start,
                    NodeKind::ArrayPattern {
                        elements,
                        type_annotation,
                    },
                )
            }
            TokenKind::OpenBrace => {
                let properties = self.parse_object_pattern_properties();
                let type_annotation = if with_annotation {
                    self.parse_type_annotation_opt()
                } else {
                    None
                };
                self.finish(
                    start,
                    NodeKind::ObjectPattern {
                        properties,
                        type_annotation,
                    },
                )
            }
            TokenKind::Identifier => {
                let name = self.intern_value();
                self.next();
                let mut optional = false;
                let mut type_annotation = None;
                if with_annotation {
                    optional = self.eat(TokenKind::Question);
                    self.eat(TokenKind::Exclamation);
                    type_annotation = self.parse_type_annotation_opt();
                }
                self.finish(
                    start,
                    NodeKind::Identifier {
                        name,
                        type_annotation,
                        optional,
                    },
                )
            }
            _ => {
                self.error(&messages::IDENTIFIER_EXPECTED, &[]);
                self.missing_identifier()
            }
        }
    }

    /// A binding target with an optional `= default`.
    fn parse_binding_element(&mut self, with_annotation: bool) -> NodeId {
        let start = self.pos();
        let target = self.parse_binding_target(with_annotation);
        if !self.eat(TokenKind::Equals) {
            return target;
        }
        let right = self.with_allow_in(|p| p.parse_assignment_expression());
        self.finish(start, NodeKind::AssignmentPattern { left: target, right })
    }

    fn parse_array_pattern_elements(&mut self) -> Vec<NodeId> {
        self.expect(TokenKind::OpenBracket);
        let mut elements = Vec::new();
        while !self.at(TokenKind::CloseBracket) && !self.at(TokenKind::EndOfFile) {
            let start = self.pos();
            if self.eat(TokenKind::Comma) {
                elements.push(self.ast.alloc(NodeKind::OmittedExpression, TextRange::empty(start)));
                continue;
            }
            if self.eat(TokenKind::DotDotDot) {
                let argument = self.parse_binding_target(false);
                elements.push(self.finish(
                    start,
                    NodeKind::RestElement {
                        argument,
                        type_annotation: None,
                    },
                ));
            } else {
                elements.push(self.parse_binding_element(false));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseBracket);
        elements
    }

    fn parse_object_pattern_properties(&mut self) -> Vec<NodeId> {
        self.expect(TokenKind::OpenBrace);
        let mut properties = Vec::new();
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            let start = self.pos();
            if self.eat(TokenKind::DotDotDot) {
                let argument = self.parse_binding_identifier();
                properties.push(self.finish(
                    start,
                    NodeKind::RestElement {
                        argument,
                        type_annotation: None,
                    },
                ));
            } else {
                let key_is_identifier = self.at(TokenKind::Identifier);
                let (key, computed) = self.parse_property_key();
                let (value, shorthand) = if self.eat(TokenKind::Colon) {
                    (self.parse_binding_element(false), false)
                } else {
                    if !key_is_identifier {
                        self.error(&messages::_0_EXPECTED, &[":"]);
                    }
                    let name = self.ast.identifier_name(key).unwrap_or_else(|| self.ast.intern(""));
                    let key_range = self.ast.range(key);
                    let mut value = self.ast.alloc(
                        NodeKind::Identifier {
                            name,
                            type_annotation: None,
                            optional: false,
                        },
                        key_range,
                    );
                    if self.eat(TokenKind::Equals) {
                        let right = self.with_allow_in(|p| p.parse_assignment_expression());
                        value = self.finish(start, NodeKind::AssignmentPattern { left: value, right });
                    }
                    (value, true)
                };
                properties.push(self.finish(
                    start,
                    NodeKind::Property {
                        kind: PropertyKind::Init,
                        key,
                        value,
                        computed,
                        shorthand,
                    },
                ));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseBrace);
        properties
    }

    /// `( params )`, including accessibility modifiers on constructor
    /// parameters and a leading `this` parameter, which is dropped.
    pub(crate) fn parse_parameters(&mut self) -> Vec<NodeId> {
        self.expect(TokenKind::OpenParen);
        let mut params = Vec::new();
        while !self.at(TokenKind::CloseParen) && !self.at(TokenKind::EndOfFile) {
            let start = self.pos();
            while ["public", "private", "protected", "readonly", "override"]
                .iter()
                .any(|m| self.is_contextual(m))
                && self.look_ahead(|p| {
                    matches!(p.next(), TokenKind::Identifier | TokenKind::OpenBracket | TokenKind::OpenBrace)
                })
            {
                self.next();
            }
            if self.at(TokenKind::This) {
                self.next();
                self.parse_type_annotation_opt();
            } else if self.eat(TokenKind::DotDotDot) {
                let argument = self.parse_binding_target(false);
                let type_annotation = self.parse_type_annotation_opt();
                params.push(self.finish(
                    start,
                    NodeKind::RestElement {
                        argument,
                        type_annotation,
                    },
                ));
                if self.at(TokenKind::Comma) {
                    self.error(&messages::A_REST_PARAMETER_MUST_BE_LAST, &[]);
                }
            } else {
                params.push(self.parse_binding_element(true));
            }
            if self.pos() == start || !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen);
        params
    }

    /// Turn an expression parsed before its role was known (`[a, b] = ...`,
    /// `for (x of ...)`) into a pattern. Returns `false` if it is not a valid
    /// assignment target.
    pub(crate) fn reinterpret_as_pattern(&mut self, id: NodeId) -> bool {
        match self.ast.kind(id).clone() {
            NodeKind::Identifier { .. } | NodeKind::MemberExpression { .. } => true,
            NodeKind::ArrayPattern { .. } | NodeKind::ObjectPattern { .. } => true,
            NodeKind::ArrayExpression { elements } => {
                let mut valid = true;
                for &element in &elements {
                    valid &= match self.ast.kind(element).clone() {
                        NodeKind::OmittedExpression => true,
                        NodeKind::SpreadElement { argument } => {
                            let ok = self.reinterpret_as_pattern(argument);
                            self.ast.set_kind(
                                element,
                                NodeKind::RestElement {
                                    argument,
                                    type_annotation: None,
                                },
                            );
                            ok
                        }
                        _ => self.reinterpret_as_pattern(element),
                    };
                }
                self.ast.set_kind(
                    id,
                    NodeKind::ArrayPattern {
                        elements,
                        type_annotation: None,
                    },
                );
                valid
            }
            NodeKind::ObjectExpression { properties } => {
                let mut valid = true;
                for &property in &properties {
                    valid &= match self.ast.kind(property).clone() {
                        NodeKind::Property {
                            kind: PropertyKind::Init,
                            value,
                            ..
                        } => self.reinterpret_as_pattern(value),
                        NodeKind::SpreadElement { argument } => {
                            self.ast.set_kind(
                                property,
                                NodeKind::RestElement {
                                    argument,
                                    type_annotation: None,
                                },
                            );
                            matches!(self.ast.kind(argument), NodeKind::Identifier { .. })
                        }
                        _ => false,
                    };
                }
                self.ast.set_kind(
                    id,
                    NodeKind::ObjectPattern {
                        properties,
                        type_annotation: None,
                    },
                );
                valid
            }
            NodeKind::AssignmentExpression {
                operator: AssignmentOperator::Assign,
                left,
                right,
            } => {
                let ok = self.reinterpret_as_pattern(left);
                self.ast.set_kind(id, NodeKind::AssignmentPattern { left, right });
                ok
            }
            NodeKind::AssignmentPattern { .. } => true,
            _ => false,
        }
    }
}
