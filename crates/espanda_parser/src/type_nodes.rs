//! Type annotations and TypeScript declarations.
//!
//! Types are parsed into `TS*` nodes and never reach code generation. Type
//! operators outside the checked subset (`keyof`, indexed access, mapped and
//! conditional types) are reported as unsupported.

use espanda_ast::{KeywordType, NodeId, NodeKind, SignatureKind};
use espanda_core::intern::Atom;
use espanda_diagnostics::messages;
use espanda_scanner::TokenKind;

use crate::parser::Parser;

impl<'a> Parser<'a> {
    /// `: Type`, if present.
    pub(crate) fn parse_type_annotation_opt(&mut self) -> Option<NodeId> {
        self.eat(TokenKind::Colon).then(|| self.parse_type())
    }

    /// `: Type` after a parameter list, where a type predicate is also
    /// allowed.
    pub(crate) fn parse_return_type_opt(&mut self) -> Option<NodeId> {
        self.eat(TokenKind::Colon).then(|| self.parse_return_type())
    }

    fn parse_return_type(&mut self) -> NodeId {
        let start = self.pos();
        let asserts = self.is_contextual("asserts")
            && self.peek_same_line(|k| matches!(k, TokenKind::Identifier | TokenKind::This));
        if asserts {
            self.next();
        }
        let is_predicate = asserts
            || (matches!(self.kind(), TokenKind::Identifier | TokenKind::This)
                && self.look_ahead(|p| {
                    p.next();
                    p.is_contextual("is") && !p.has_line_break()
                }));
        if !is_predicate {
            return self.parse_type();
        }
        let parameter_name = self.intern_value();
        self.next();
        let type_annotation = if self.is_contextual("is") {
            self.next();
            Some(self.parse_type())
        } else {
            None
        };
        self.finish(
            start,
            NodeKind::TSTypePredicate {
                parameter_name,
                type_annotation,
                asserts,
            },
        )
    }

    fn missing_type(&mut self) -> NodeId {
        let start = self.pos();
        let type_name = self.ast.intern("");
        self.finish(
            start,
            NodeKind::TSTypeReference {
                type_name,
                type_args: Vec::new(),
            },
        )
    }

    // ========================================================================
    // Types
    // ========================================================================

    pub(crate) fn parse_type(&mut self) -> NodeId {
        if !self.enter_recursion() {
            self.leave_recursion();
            return self.missing_type();
        }
        let ty = self.parse_type_inner();
        self.leave_recursion();
        ty
    }

    fn parse_type_inner(&mut self) -> NodeId {
        let start = self.pos();
        if self.at(TokenKind::LessThan) {
            return self.parse_function_type(start, false);
        }
        if self.at(TokenKind::New) {
            self.next();
            return self.parse_function_type(start, true);
        }
        if self.is_contextual("abstract") && self.peek_same_line(|k| k == TokenKind::New) {
            self.next();
            self.next();
            return self.parse_function_type(start, true);
        }
        if self.at(TokenKind::OpenParen) {
            if let Some(function_type) = self.try_parse(|p| {
                let params = p.parse_parameters();
                if !p.at(TokenKind::Arrow) {
                    return None;
                }
                p.next();
                let return_type = p.parse_return_type();
                Some(p.finish(
                    start,
                    NodeKind::TSFunctionType {
                        type_params: None,
                        params,
                        return_type,
                    },
                ))
            }) {
                return function_type;
            }
        }

        let ty = self.parse_union_type();
        if self.at(TokenKind::Extends) && !self.has_line_break() {
            // `T extends U ? X : Y`
            self.next();
            self.parse_union_type();
            if self.expect(TokenKind::Question) {
                self.parse_type();
                self.expect(TokenKind::Colon);
                self.parse_type();
            }
            let end = self.prev_end();
            self.unsupported(start, end, "conditional type");
        }
        ty
    }

    fn parse_function_type(&mut self, start: u32, is_constructor: bool) -> NodeId {
        let type_params = self.parse_type_parameters_opt();
        let params = self.parse_parameters();
        self.expect(TokenKind::Arrow);
        let return_type = self.parse_return_type();
        let kind = if is_constructor {
            NodeKind::TSConstructorType {
                type_params,
                params,
                return_type,
            }
        } else {
            NodeKind::TSFunctionType {
                type_params,
                params,
                return_type,
            }
        };
        self.finish(start, kind)
    }

    fn parse_union_type(&mut self) -> NodeId {
        let start = self.pos();
        let leading = self.eat(TokenKind::Bar);
        let first = self.parse_intersection_type();
        if !self.at(TokenKind::Bar) {
            return first;
        }
        let mut types = vec![first];
        while self.eat(TokenKind::Bar) {
            types.push(self.parse_intersection_type());
        }
        let start = if leading { start } else { self.ast.range(first).pos };
        self.finish(start, NodeKind::TSUnionType { types })
    }

    fn parse_intersection_type(&mut self) -> NodeId {
        let start = self.pos();
        self.eat(TokenKind::Ampersand);
        let first = self.parse_type_operator();
        if !self.at(TokenKind::Ampersand) {
            return first;
        }
        let mut types = vec![first];
        while self.eat(TokenKind::Ampersand) {
            types.push(self.parse_type_operator());
        }
        self.finish(start, NodeKind::TSIntersectionType { types })
    }

    fn parse_type_operator(&mut self) -> NodeId {
        let start = self.pos();
        if self.is_contextual("readonly") && self.peek_same_line(|k| k != TokenKind::Colon) {
            self.next();
            return self.parse_type_operator();
        }
        for operator in ["keyof", "unique", "infer"] {
            if self.is_contextual(operator) && self.peek_same_line(|k| k.is_identifier_or_keyword() || k == TokenKind::OpenParen) {
                self.next();
                let operand = self.parse_type_operator();
                let end = self.prev_end();
                self.unsupported(start, end, &format!("'{operator}' type operator"));
                return operand;
            }
        }
        self.parse_postfix_type()
    }

    fn parse_postfix_type(&mut self) -> NodeId {
        let start = self.pos();
        let mut ty = self.parse_primary_type();
        while self.at(TokenKind::OpenBracket) && !self.has_line_break() {
            self.next();
            if self.eat(TokenKind::CloseBracket) {
                ty = self.finish(start, NodeKind::TSArrayType { element_type: ty });
            } else {
                self.parse_type();
                self.expect(TokenKind::CloseBracket);
                let end = self.prev_end();
                self.unsupported(start, end, "indexed access type");
            }
        }
        ty
    }

    fn parse_primary_type(&mut self) -> NodeId {
        let start = self.pos();
        match self.kind() {
            TokenKind::Identifier => {
                if let Some(keyword) = KeywordType::from_str(self.value()) {
                    if !self.look_ahead(|p| p.next() == TokenKind::Dot) {
                        self.next();
                        return self.finish(start, NodeKind::TSKeywordType { keyword });
                    }
                }
                self.parse_type_reference()
            }
            TokenKind::Void => {
                self.next();
                self.finish(
                    start,
                    NodeKind::TSKeywordType {
                        keyword: KeywordType::Void,
                    },
                )
            }
            TokenKind::Null => {
                self.next();
                self.finish(
                    start,
                    NodeKind::TSKeywordType {
                        keyword: KeywordType::Null,
                    },
                )
            }
            TokenKind::Typeof => {
                self.next();
                if self.at(TokenKind::Import) {
                    return self.parse_import_type(start);
                }
                let expr_name = self.parse_entity_name();
                self.finish(start, NodeKind::TSTypeQuery { expr_name })
            }
            TokenKind::Import => self.parse_import_type(start),
            TokenKind::StringLiteral
            | TokenKind::NoSubstitutionTemplate
            | TokenKind::NumberLiteral
            | TokenKind::BigIntLiteral
            | TokenKind::True
            | TokenKind::False => {
                let literal = self.parse_literal_type_value(false);
                self.finish(start, NodeKind::TSLiteralType { literal })
            }
            TokenKind::Minus if self.peek() == TokenKind::NumberLiteral => {
                self.next();
                let literal = self.parse_literal_type_value(true);
                self.finish(start, NodeKind::TSLiteralType { literal })
            }
            TokenKind::OpenParen => {
                self.next();
                let type_annotation = self.parse_type();
                self.expect(TokenKind::CloseParen);
                self.finish(start, NodeKind::TSParenthesizedType { type_annotation })
            }
            TokenKind::OpenBracket => self.parse_tuple_type(),
            TokenKind::OpenBrace => {
                if self.is_mapped_type_start() {
                    self.skip_balanced(TokenKind::OpenBrace, TokenKind::CloseBrace);
                    let end = self.prev_end();
                    self.unsupported(start, end, "mapped type");
                    return self.missing_type();
                }
                let members = self.parse_type_members();
                self.finish(start, NodeKind::TSTypeLiteral { members })
            }
            TokenKind::This => {
                self.next();
                let end = self.prev_end();
                self.unsupported(start, end, "'this' type");
                self.missing_type()
            }
            TokenKind::TemplateHead => {
                self.parse_template_literal();
                let end = self.prev_end();
                self.unsupported(start, end, "template literal type");
                self.missing_type()
            }
            _ => {
                self.error(&messages::TYPE_EXPECTED, &[]);
                self.missing_type()
            }
        }
    }

    /// The literal node inside a `TSLiteralType`.
    fn parse_literal_type_value(&mut self, negative: bool) -> NodeId {
        let start = if negative { self.prev_end().saturating_sub(1) } else { self.pos() };
        let kind = match self.kind() {
            TokenKind::NumberLiteral => {
                let value = self.scanner.token().number;
                NodeKind::NumberLiteral {
                    value: if negative { -value } else { value },
                }
            }
            TokenKind::BigIntLiteral => {
                let text = self.value();
                let value = if negative {
                    self.ast.intern(&format!("-{text}"))
                } else {
                    self.intern_value()
                };
                NodeKind::BigIntLiteral { value }
            }
            TokenKind::True | TokenKind::False => NodeKind::BooleanLiteral {
                value: self.at(TokenKind::True),
            },
            _ => NodeKind::StringLiteral {
                value: self.intern_value(),
            },
        };
        self.next();
        self.finish(start, kind)
    }

    /// `A` or `A.B.C`, joined with dots.
    fn parse_entity_name(&mut self) -> Atom {
        let mut name = String::new();
        loop {
            if self.kind().is_identifier_or_keyword() {
                name.push_str(self.value());
                self.next();
            } else {
                self.error(&messages::IDENTIFIER_EXPECTED, &[]);
                break;
            }
            if !self.at(TokenKind::Dot) {
                break;
            }
            name.push('.');
            self.next();
        }
        self.ast.intern(&name)
    }

    fn parse_type_reference(&mut self) -> NodeId {
        let start = self.pos();
        let type_name = self.parse_entity_name();
        let type_args = if self.at(TokenKind::LessThan) && !self.has_line_break() {
            self.parse_type_arguments_opt()
        } else {
            Vec::new()
        };
        self.finish(start, NodeKind::TSTypeReference { type_name, type_args })
    }

    /// `import("module").Name`
    fn parse_import_type(&mut self, start: u32) -> NodeId {
        self.expect(TokenKind::Import);
        self.expect(TokenKind::OpenParen);
        let argument = if self.at(TokenKind::StringLiteral) {
            let value = self.intern_value();
            self.next();
            value
        } else {
            self.error(&messages::_0_EXPECTED, &["string"]);
            self.ast.intern("")
        };
        self.expect(TokenKind::CloseParen);
        let qualifier = self.eat(TokenKind::Dot).then(|| self.parse_entity_name());
        if self.at(TokenKind::LessThan) {
            self.parse_type_arguments_opt();
        }
        self.finish(start, NodeKind::TSImportType { argument, qualifier })
    }

    fn parse_tuple_type(&mut self) -> NodeId {
        let start = self.pos();
        self.expect(TokenKind::OpenBracket);
        let mut element_types = Vec::new();
        while !self.at(TokenKind::CloseBracket) && !self.at(TokenKind::EndOfFile) {
            self.eat(TokenKind::DotDotDot);
            // named member `label: T` or `label?: T`
            let named = self.at(TokenKind::Identifier)
                && self.look_ahead(|p| matches!(p.next(), TokenKind::Colon | TokenKind::Question));
            if named {
                self.next();
                self.eat(TokenKind::Question);
                self.expect(TokenKind::Colon);
            }
            let element_start = self.pos();
            element_types.push(self.parse_type());
            self.eat(TokenKind::Question);
            if !self.eat(TokenKind::Comma) || self.pos() == element_start {
                break;
            }
        }
        self.expect(TokenKind::CloseBracket);
        self.finish(start, NodeKind::TSTupleType { element_types })
    }

    fn is_mapped_type_start(&mut self) -> bool {
        self.look_ahead(|p| {
            p.next();
            if p.is_contextual("readonly") || matches!(p.kind(), TokenKind::Plus | TokenKind::Minus) {
                p.next();
            }
            p.at(TokenKind::OpenBracket) && {
                p.next();
                p.at(TokenKind::Identifier) && p.next() == TokenKind::In
            }
        })
    }

    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) {
        let mut depth = 0usize;
        loop {
            let kind = self.kind();
            if kind == TokenKind::EndOfFile {
                return;
            }
            self.next();
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return;
                }
            }
        }
    }

    // ========================================================================
    // Type parameters and arguments
    // ========================================================================

    pub(crate) fn parse_type_parameters_opt(&mut self) -> Option<NodeId> {
        if !self.at(TokenKind::LessThan) {
            return None;
        }
        let start = self.pos();
        self.next();
        let mut params = Vec::new();
        while !self.at(TokenKind::GreaterThan) && !self.at(TokenKind::EndOfFile) {
            let param_start = self.pos();
            while (self.is_contextual("in") || self.is_contextual("out") || self.at(TokenKind::Const) || self.at(TokenKind::In))
                && self.peek_same_line(|k| k == TokenKind::Identifier)
            {
                self.next();
            }
            let name = if self.at(TokenKind::Identifier) {
                let name = self.intern_value();
                self.next();
                name
            } else {
                self.error(&messages::IDENTIFIER_EXPECTED, &[]);
                break;
            };
            let constraint = self.eat(TokenKind::Extends).then(|| self.parse_type());
            let default = self.eat(TokenKind::Equals).then(|| self.parse_type());
            params.push(self.finish(
                param_start,
                NodeKind::TSTypeParameter {
                    name,
                    constraint,
                    default,
                },
            ));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::GreaterThan);
        Some(self.finish(start, NodeKind::TSTypeParameterDeclaration { params }))
    }

    /// `<A, B>`; empty when the current token is not `<`.
    pub(crate) fn parse_type_arguments_opt(&mut self) -> Vec<NodeId> {
        if !self.eat(TokenKind::LessThan) {
            return Vec::new();
        }
        let mut args = Vec::new();
        while !self.at(TokenKind::GreaterThan) && !self.at(TokenKind::EndOfFile) {
            let arg_start = self.pos();
            args.push(self.parse_type());
            if !self.eat(TokenKind::Comma) || self.pos() == arg_start {
                break;
            }
        }
        self.expect(TokenKind::GreaterThan);
        args
    }

    // ========================================================================
    // Members of type literals and interfaces
    // ========================================================================

    /// `[name: K]` after any modifiers.
    pub(crate) fn is_index_signature_start(&mut self) -> bool {
        self.look_ahead(|p| {
            p.next();
            p.at(TokenKind::Identifier) && p.next() == TokenKind::Colon
        })
    }

    pub(crate) fn parse_index_signature(&mut self, start: u32, readonly: bool) -> NodeId {
        self.expect(TokenKind::OpenBracket);
        let param_name = self.intern_value();
        self.next();
        self.expect(TokenKind::Colon);
        let key_type = self.parse_type();
        self.expect(TokenKind::CloseBracket);
        let type_annotation = match self.parse_type_annotation_opt() {
            Some(ty) => ty,
            None => {
                self.error(&messages::_0_EXPECTED, &[":"]);
                self.missing_type()
            }
        };
        self.finish(
            start,
            NodeKind::TSIndexSignature {
                param_name,
                key_type,
                type_annotation,
                readonly,
            },
        )
    }

    fn parse_type_members(&mut self) -> Vec<NodeId> {
        self.expect(TokenKind::OpenBrace);
        let mut members = Vec::new();
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            let member_start = self.pos();
            if let Some(member) = self.parse_type_member() {
                members.push(member);
            }
            if !self.eat(TokenKind::Semicolon) && !self.eat(TokenKind::Comma) && !self.has_line_break() && !self.at(TokenKind::CloseBrace) {
                self.error(&messages::_0_EXPECTED, &[";"]);
                if self.pos() == member_start {
                    self.next();
                }
            }
        }
        self.expect(TokenKind::CloseBrace);
        members
    }

    fn parse_type_member(&mut self) -> Option<NodeId> {
        let start = self.pos();
        if self.at(TokenKind::OpenParen) || self.at(TokenKind::LessThan) {
            return Some(self.parse_signature_member(start, SignatureKind::Call));
        }
        if self.at(TokenKind::New) && self.look_ahead(|p| matches!(p.next(), TokenKind::OpenParen | TokenKind::LessThan)) {
            self.next();
            return Some(self.parse_signature_member(start, SignatureKind::Construct));
        }

        let readonly = self.is_contextual("readonly")
            && self.peek_same_line(|k| !matches!(k, TokenKind::Colon | TokenKind::Question | TokenKind::OpenParen));
        if readonly {
            self.next();
        }
        if self.at(TokenKind::OpenBracket) {
            if self.is_index_signature_start() {
                return Some(self.parse_index_signature(start, readonly));
            }
            self.skip_balanced(TokenKind::OpenBracket, TokenKind::CloseBracket);
            self.eat(TokenKind::Question);
            if self.at(TokenKind::OpenParen) || self.at(TokenKind::LessThan) {
                self.parse_type_parameters_opt();
                self.parse_parameters();
                self.parse_return_type_opt();
            } else {
                self.parse_type_annotation_opt();
            }
            let end = self.prev_end();
            self.unsupported(start, end, "computed property name in a type");
            return None;
        }

        let key = match self.kind() {
            TokenKind::StringLiteral => self.intern_value(),
            TokenKind::NumberLiteral => {
                let text = espanda_core::format_number(self.scanner.token().number);
                self.ast.intern(&text)
            }
            kind if kind.is_identifier_or_keyword() => self.intern_value(),
            _ => {
                self.error(&messages::PROPERTY_OR_SIGNATURE_EXPECTED, &[]);
                return None;
            }
        };
        self.next();
        let optional = self.eat(TokenKind::Question);

        if self.at(TokenKind::OpenParen) || self.at(TokenKind::LessThan) {
            let type_params = self.parse_type_parameters_opt();
            let params = self.parse_parameters();
            let return_type = self.parse_return_type_opt();
            return Some(self.finish(
                start,
                NodeKind::TSMethodSignature {
                    key,
                    type_params,
                    params,
                    return_type,
                    optional,
                },
            ));
        }

        let type_annotation = self.parse_type_annotation_opt();
        Some(self.finish(
            start,
            NodeKind::TSPropertySignature {
                key,
                type_annotation,
                optional,
                readonly,
            },
        ))
    }

    fn parse_signature_member(&mut self, start: u32, kind: SignatureKind) -> NodeId {
        let type_params = self.parse_type_parameters_opt();
        let params = self.parse_parameters();
        let return_type = self.parse_return_type_opt();
        self.finish(
            start,
            NodeKind::TSSignatureDeclaration {
                kind,
                type_params,
                params,
                return_type,
            },
        )
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// `type Name<T> = Type;`
    pub(crate) fn parse_type_alias_declaration(&mut self, start: u32) -> NodeId {
        self.next(); // type
        let id = self.parse_declaration_name();
        let type_params = self.parse_type_parameters_opt();
        self.expect(TokenKind::Equals);
        let type_annotation = self.parse_type();
        self.parse_semicolon();
        self.finish(
            start,
            NodeKind::TSTypeAliasDeclaration {
                id,
                type_params,
                type_annotation,
            },
        )
    }

    /// `interface Name<T> extends A, B<C> { members }`
    pub(crate) fn parse_interface_declaration(&mut self, start: u32) -> NodeId {
        self.next(); // interface
        let id = self.parse_declaration_name();
        let type_params = self.parse_type_parameters_opt();
        let mut extends = Vec::new();
        if self.eat(TokenKind::Extends) {
            loop {
                let heritage_start = self.pos();
                let expression = self.parse_type_reference();
                extends.push(self.finish(heritage_start, NodeKind::TSInterfaceHeritage { expression }));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let body = self.parse_type_members();
        self.finish(
            start,
            NodeKind::TSInterfaceDeclaration {
                id,
                type_params,
                extends,
                body,
            },
        )
    }

    fn parse_declaration_name(&mut self) -> Atom {
        if self.at(TokenKind::Identifier) {
            let name = self.intern_value();
            self.next();
            name
        } else {
            self.error(&messages::IDENTIFIER_EXPECTED, &[]);
            self.ast.intern("")
        }
    }
}
