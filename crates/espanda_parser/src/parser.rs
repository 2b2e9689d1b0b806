//! The parser: token management, speculation, and statements.
//!
//! A recursive descent parser over [`Scanner`] tokens that allocates nodes
//! bottom-up into an [`Ast`]. Expressions live in `expressions.rs` and type
//! annotations in `type_nodes.rs`; both extend this `impl`.

use espanda_ast::{Ast, FunctionFlags, MethodKind, NodeId, NodeKind, VariableDeclarationKind};
use espanda_core::intern::{Atom, StringInterner};
use espanda_core::text::{TextRange, TextSpan};
use espanda_diagnostics::{messages, Diagnostic, DiagnosticCollection, DiagnosticMessage};
use espanda_scanner::{Scanner, TokenFlags, TokenKind};

use crate::utilities::can_start_statement;

/// Maximum recursion depth to prevent stack overflow on deeply nested input.
const MAX_RECURSION_DEPTH: u32 = 200;

/// The output of [`Parser::parse_program`].
#[derive(Debug)]
pub struct ParseResult {
    pub ast: Ast,
    /// Scanner and parser diagnostics, in report order.
    pub diagnostics: DiagnosticCollection,
}

/// Parse a whole file.
pub fn parse(file_name: &str, source: &str, interner: StringInterner) -> ParseResult {
    Parser::new(file_name, source, interner).parse_program()
}

#[derive(Debug, Clone, Copy)]
struct LabelInfo {
    name: Atom,
    /// The labelled statement is (a chain of labels ending in) a loop.
    is_loop: bool,
}

/// Per-function syntactic context, replaced on entry to every function body.
#[derive(Debug, Clone, Default)]
struct FunctionContext {
    in_function: bool,
    is_async: bool,
    is_generator: bool,
    labels: Vec<LabelInfo>,
    iteration_depth: u32,
    breakable_depth: u32,
}

/// Snapshot for rolling back a speculative parse.
struct ParserState {
    scanner: espanda_scanner::ScannerState,
    prev_end: u32,
    diagnostic_count: usize,
}

pub struct Parser<'a> {
    pub(crate) scanner: Scanner<'a>,
    pub(crate) ast: Ast,
    file_name: String,
    diagnostics: DiagnosticCollection,
    /// End of the last consumed token; the end of every finished node.
    prev_end: u32,
    ctx: FunctionContext,
    /// Cleared while parsing the head of a `for` statement.
    pub(crate) allow_in: bool,
    recursion_depth: u32,
}

impl<'a> Parser<'a> {
    pub fn new(file_name: &str, source: &'a str, interner: StringInterner) -> Self {
        Self {
            scanner: Scanner::new(file_name, source),
            ast: Ast::new(file_name, source, interner),
            file_name: file_name.to_string(),
            diagnostics: DiagnosticCollection::new(),
            prev_end: 0,
            ctx: FunctionContext::default(),
            allow_in: true,
            recursion_depth: 0,
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(file = %self.file_name))]
    pub fn parse_program(mut self) -> ParseResult {
        self.next();
        let statements = self.parse_statement_list(false);
        let end = self.scanner.source().len() as u32;
        let root = self
            .ast
            .alloc(NodeKind::Program { statements }, TextRange::new(0, end));
        self.ast.set_root(root);

        let mut diagnostics = self.scanner.take_diagnostics();
        diagnostics.extend(self.diagnostics);
        diagnostics.sort();
        tracing::debug!(
            nodes = self.ast.len(),
            diagnostics = diagnostics.len(),
            "parsed"
        );
        ParseResult {
            ast: self.ast,
            diagnostics,
        }
    }

    // ========================================================================
    // Token management
    // ========================================================================

    #[inline]
    pub(crate) fn kind(&self) -> TokenKind {
        self.scanner.kind()
    }

    #[inline]
    pub(crate) fn pos(&self) -> u32 {
        self.scanner.token().pos
    }

    #[inline]
    pub(crate) fn prev_end(&self) -> u32 {
        self.prev_end
    }

    #[inline]
    pub(crate) fn value(&self) -> &str {
        self.scanner.value()
    }

    pub(crate) fn next(&mut self) -> TokenKind {
        self.prev_end = self.scanner.token().end;
        self.scanner.scan()
    }

    #[inline]
    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    /// Consume `kind` or report `'{kind}' expected.`
    pub(crate) fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error(&messages::_0_EXPECTED, &[kind.text()]);
        false
    }

    pub(crate) fn has_line_break(&self) -> bool {
        self.scanner.token().has_preceding_line_break()
    }

    /// Current token is the unescaped identifier `text`.
    pub(crate) fn is_contextual(&self, text: &str) -> bool {
        self.at(TokenKind::Identifier)
            && self.value() == text
            && !self.scanner.token().flags.contains(TokenFlags::ESCAPED)
    }

    pub(crate) fn peek(&mut self) -> TokenKind {
        self.look_ahead(|p| p.next())
    }

    /// Next token is on the same line and satisfies `pred`.
    pub(crate) fn peek_same_line(&mut self, pred: impl FnOnce(TokenKind) -> bool) -> bool {
        self.look_ahead(|p| {
            let kind = p.next();
            !p.has_line_break() && pred(kind)
        })
    }

    pub(crate) fn intern_value(&self) -> Atom {
        self.ast.intern(self.scanner.value())
    }

    pub(crate) fn finish(&mut self, start: u32, kind: NodeKind) -> NodeId {
        let end = self.prev_end.max(start);
        self.ast.alloc(kind, TextRange::new(start, end))
    }

    // ========================================================================
    // Speculation
    // ========================================================================

    fn save(&self) -> ParserState {
        ParserState {
            scanner: self.scanner.save_state(),
            prev_end: self.prev_end,
            diagnostic_count: self.diagnostics.len(),
        }
    }

    fn restore(&mut self, state: ParserState) {
        self.scanner.restore_state(state.scanner);
        self.prev_end = state.prev_end;
        self.diagnostics.truncate(state.diagnostic_count);
    }

    pub(crate) fn look_ahead<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let state = self.save();
        let result = f(self);
        self.restore(state);
        result
    }

    /// Run `f`; keep its effects only if it returns `Some` without reporting
    /// anything. Nodes allocated by a failed attempt stay unreachable.
    pub(crate) fn try_parse<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let state = self.save();
        let diagnostic_count = self.diagnostics.len();
        match f(self) {
            Some(value) if self.diagnostics.len() == diagnostic_count => Some(value),
            _ => {
                self.restore(state);
                None
            }
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub(crate) fn error_at(&mut self, start: u32, end: u32, message: &DiagnosticMessage, args: &[&str]) {
        self.diagnostics.add(Diagnostic::with_location(
            self.file_name.clone(),
            TextSpan::new(start, end.saturating_sub(start)),
            message,
            args,
        ));
    }

    pub(crate) fn error(&mut self, message: &DiagnosticMessage, args: &[&str]) {
        let token = self.scanner.token();
        let (start, end) = (token.pos, token.end);
        self.error_at(start, end, message, args);
    }

    pub(crate) fn unsupported(&mut self, start: u32, end: u32, feature: &str) {
        self.error_at(start, end, &messages::FEATURE_0_IS_NOT_SUPPORTED, &[feature]);
    }

    /// Bump the recursion depth; `false` (after reporting) when too deep.
    pub(crate) fn enter_recursion(&mut self) -> bool {
        self.recursion_depth += 1;
        if self.recursion_depth == MAX_RECURSION_DEPTH + 1 {
            self.error(&messages::MAXIMUM_NESTING_DEPTH_EXCEEDED, &[]);
        }
        self.recursion_depth <= MAX_RECURSION_DEPTH
    }

    pub(crate) fn leave_recursion(&mut self) {
        self.recursion_depth -= 1;
    }

    // ========================================================================
    // Function context
    // ========================================================================

    pub(crate) fn with_function_context<T>(
        &mut self,
        flags: FunctionFlags,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = std::mem::replace(
            &mut self.ctx,
            FunctionContext {
                in_function: true,
                is_async: flags.is_async(),
                is_generator: flags.is_generator(),
                ..FunctionContext::default()
            },
        );
        let saved_allow_in = std::mem::replace(&mut self.allow_in, true);
        let result = f(self);
        self.ctx = saved;
        self.allow_in = saved_allow_in;
        result
    }

    pub(crate) fn in_async(&self) -> bool {
        self.ctx.is_async
    }

    pub(crate) fn in_generator(&self) -> bool {
        self.ctx.is_generator
    }

    // ========================================================================
    // Semicolons and recovery
    // ========================================================================

    pub(crate) fn can_parse_semicolon(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Semicolon | TokenKind::CloseBrace | TokenKind::EndOfFile
        ) || self.has_line_break()
    }

    /// Automatic semicolon insertion: a `;` is optional before `}`, at end of
    /// file, and after a line break.
    pub(crate) fn parse_semicolon(&mut self) {
        if self.eat(TokenKind::Semicolon) {
            return;
        }
        if !self.can_parse_semicolon() {
            self.error(&messages::_0_EXPECTED, &[";"]);
        }
    }

    /// Error recovery: skip tokens until one that can start a statement.
    fn skip_to_next_statement(&mut self) {
        self.next();
        while !self.at(TokenKind::EndOfFile)
            && !self.at(TokenKind::CloseBrace)
            && !can_start_statement(self.kind())
            && !self.has_line_break()
        {
            self.next();
        }
    }

    /// Skip a construct the front end does not support, up to the end of its
    /// statement.
    pub(crate) fn skip_unsupported_statement(&mut self) {
        let mut depth = 0u32;
        let mut first = true;
        loop {
            match self.kind() {
                TokenKind::EndOfFile => return,
                TokenKind::OpenBrace | TokenKind::OpenParen | TokenKind::OpenBracket => depth += 1,
                TokenKind::CloseBrace | TokenKind::CloseParen | TokenKind::CloseBracket => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.next();
                    return;
                }
                _ if depth == 0 && !first && self.has_line_break() => return,
                _ => {}
            }
            first = false;
            self.next();
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Statements up to `}` or end of file. With `in_switch`, also stops at
    /// `case` and `default`.
    fn parse_statement_list(&mut self, in_switch: bool) -> Vec<NodeId> {
        let mut statements = Vec::new();
        loop {
            match self.kind() {
                TokenKind::EndOfFile | TokenKind::CloseBrace => break,
                TokenKind::Case | TokenKind::Default if in_switch => break,
                _ => {}
            }
            let saved_pos = self.pos();
            let statement = self.parse_statement();
            statements.push(statement);
            if self.pos() == saved_pos && !self.at(TokenKind::EndOfFile) {
                if self.at(TokenKind::CloseBrace) {
                    break;
                }
                self.skip_to_next_statement();
            }
        }
        statements
    }

    pub(crate) fn parse_statement(&mut self) -> NodeId {
        if !self.enter_recursion() {
            self.leave_recursion();
            let start = self.pos();
            return self.finish(start, NodeKind::EmptyStatement);
        }
        let statement = self.parse_statement_inner();
        self.leave_recursion();
        statement
    }

    fn parse_statement_inner(&mut self) -> NodeId {
        let start = self.pos();
        match self.kind() {
            TokenKind::OpenBrace => self.parse_block_statement(),
            TokenKind::Semicolon => {
                self.next();
                self.finish(start, NodeKind::EmptyStatement)
            }
            TokenKind::Var => self.parse_variable_statement(VariableDeclarationKind::Var, false),
            TokenKind::Const => {
                if self.peek() == TokenKind::Enum {
                    return self.parse_unsupported_statement(start, "const enum");
                }
                self.parse_variable_statement(VariableDeclarationKind::Const, false)
            }
            TokenKind::Function => self.parse_function_declaration(start, FunctionFlags::empty()),
            TokenKind::Class => self.parse_class_declaration(start),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_statement(),
            TokenKind::Break => self.parse_break_or_continue(true),
            TokenKind::Continue => self.parse_break_or_continue(false),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::Debugger => {
                self.next();
                self.parse_semicolon();
                self.finish(start, NodeKind::DebuggerStatement)
            }
            TokenKind::Export => self.parse_export_declaration(),
            TokenKind::Import
                if !matches!(self.peek(), TokenKind::OpenParen | TokenKind::Dot) =>
            {
                self.parse_unsupported_statement(start, "import declaration")
            }
            TokenKind::Enum => self.parse_unsupported_statement(start, "enum"),
            TokenKind::With => self.parse_unsupported_statement(start, "with statement"),
            TokenKind::At => self.parse_unsupported_statement(start, "decorator"),
            TokenKind::Identifier => self.parse_identifier_statement(start),
            _ => self.parse_expression_statement(),
        }
    }

    /// Statements that begin with an identifier: contextual declarations,
    /// labels, or plain expressions.
    fn parse_identifier_statement(&mut self, start: u32) -> NodeId {
        let starts_binding =
            |k: TokenKind| matches!(k, TokenKind::Identifier | TokenKind::OpenBracket | TokenKind::OpenBrace);
        if self.is_contextual("let") && self.look_ahead(|p| starts_binding(p.next())) {
            return self.parse_variable_statement(VariableDeclarationKind::Let, false);
        }
        if self.is_contextual("type") && self.peek_same_line(|k| k == TokenKind::Identifier) {
            return self.parse_type_alias_declaration(start);
        }
        if self.is_contextual("interface") && self.peek_same_line(|k| k == TokenKind::Identifier) {
            return self.parse_interface_declaration(start);
        }
        if self.is_contextual("async") && self.peek_same_line(|k| k == TokenKind::Function) {
            self.next();
            return self.parse_function_declaration(start, FunctionFlags::ASYNC);
        }
        if self.is_contextual("abstract") && self.peek_same_line(|k| k == TokenKind::Class) {
            self.next();
            return self.parse_class_declaration(start);
        }
        if self.is_contextual("declare") && self.peek_same_line(|k| k.is_identifier_or_keyword()) {
            return self.parse_declare_statement(start);
        }
        if (self.is_contextual("namespace") || self.is_contextual("module"))
            && self.peek_same_line(|k| matches!(k, TokenKind::Identifier | TokenKind::StringLiteral))
        {
            return self.parse_unsupported_statement(start, "namespace");
        }
        if self.peek() == TokenKind::Colon {
            return self.parse_labelled_statement();
        }
        self.parse_expression_statement()
    }

    fn parse_unsupported_statement(&mut self, start: u32, feature: &str) -> NodeId {
        self.skip_unsupported_statement();
        let end = self.prev_end.max(start);
        self.unsupported(start, end, feature);
        self.finish(start, NodeKind::EmptyStatement)
    }

    fn parse_declare_statement(&mut self, start: u32) -> NodeId {
        self.next(); // declare
        match self.kind() {
            TokenKind::Var => self.parse_variable_statement(VariableDeclarationKind::Var, true),
            TokenKind::Const => self.parse_variable_statement(VariableDeclarationKind::Const, true),
            TokenKind::Identifier if self.is_contextual("let") => {
                self.parse_variable_statement(VariableDeclarationKind::Let, true)
            }
            TokenKind::Function => self.parse_function_declaration(start, FunctionFlags::DECLARE),
            TokenKind::Class => self.parse_class_declaration(start),
            TokenKind::Identifier if self.is_contextual("type") => {
                self.parse_type_alias_declaration(start)
            }
            TokenKind::Identifier if self.is_contextual("interface") => {
                self.parse_interface_declaration(start)
            }
            _ => self.parse_unsupported_statement(start, "ambient module declaration"),
        }
    }

    pub(crate) fn parse_block_statement(&mut self) -> NodeId {
        let start = self.pos();
        self.expect(TokenKind::OpenBrace);
        let statements = self.parse_statement_list(false);
        self.expect(TokenKind::CloseBrace);
        self.finish(start, NodeKind::BlockStatement { statements })
    }

    fn parse_expression_statement(&mut self) -> NodeId {
        let start = self.pos();
        let expression = self.parse_expression();
        self.parse_semicolon();
        self.finish(start, NodeKind::ExpressionStatement { expression })
    }

    // ---- declarations ----

    fn parse_variable_statement(&mut self, kind: VariableDeclarationKind, declare: bool) -> NodeId {
        let start = self.pos();
        let declaration = self.parse_variable_declaration(start, kind, declare, false);
        self.parse_semicolon();
        let range = TextRange::new(start, self.prev_end);
        self.ast.set_range(declaration, range);
        declaration
    }

    /// `var|let|const` and its declarators; the current token is the keyword.
    /// `in_for_head` defers the const-initializer check to the `for` parser.
    fn parse_variable_declaration(
        &mut self,
        start: u32,
        kind: VariableDeclarationKind,
        declare: bool,
        in_for_head: bool,
    ) -> NodeId {
        self.next();
        let mut declarators = Vec::new();
        loop {
            let decl_start = self.pos();
            let id = self.parse_binding_target(true);
            let init = if self.eat(TokenKind::Equals) {
                Some(self.parse_assignment_expression())
            } else {
                if kind == VariableDeclarationKind::Const && !declare && !in_for_head {
                    let end = self.prev_end;
                    self.error_at(decl_start, end, &messages::CONST_DECLARATIONS_MUST_BE_INITIALIZED, &[]);
                }
                None
            };
            declarators.push(self.finish(decl_start, NodeKind::VariableDeclarator { id, init }));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.finish(
            start,
            NodeKind::VariableDeclaration {
                kind,
                declarators,
                declare,
            },
        )
    }

    /// `function` declarations; the current token is `function`. Only
    /// `export default` may omit the name.
    fn parse_function_declaration(&mut self, start: u32, flags: FunctionFlags) -> NodeId {
        self.parse_function_declaration_with(start, flags, true)
    }

    fn parse_function_declaration_with(
        &mut self,
        start: u32,
        mut flags: FunctionFlags,
        name_required: bool,
    ) -> NodeId {
        self.expect(TokenKind::Function);
        if self.eat(TokenKind::Asterisk) {
            flags |= FunctionFlags::GENERATOR;
        }
        let id = if self.at(TokenKind::Identifier) {
            Some(self.parse_binding_identifier())
        } else {
            if name_required {
                self.error(&messages::IDENTIFIER_EXPECTED, &[]);
            }
            None
        };
        let function = self.parse_function_rest(start, id, flags);
        self.finish(start, NodeKind::FunctionDeclaration { function })
    }

    /// Type parameters, parameters, return type and body of a function whose
    /// name (if any) has been consumed.
    pub(crate) fn parse_function_rest(
        &mut self,
        start: u32,
        id: Option<NodeId>,
        mut flags: FunctionFlags,
    ) -> NodeId {
        let type_params = self.parse_type_parameters_opt();
        let (params, return_type, body) = self.with_function_context(flags, |p| {
            let params = p.parse_parameters();
            let return_type = p.parse_return_type_opt();
            let body = if p.at(TokenKind::OpenBrace) {
                Some(p.parse_block_statement())
            } else {
                None
            };
            (params, return_type, body)
        });
        if body.is_none() {
            flags |= FunctionFlags::DECLARE;
            self.parse_semicolon();
        }
        self.finish(
            start,
            NodeKind::ScriptFunction {
                id,
                type_params,
                params,
                return_type,
                body,
                flags,
            },
        )
    }

    fn parse_class_declaration(&mut self, start: u32) -> NodeId {
        let definition = self.parse_class_definition(true);
        self.finish(start, NodeKind::ClassDeclaration { definition })
    }

    /// `class Name<T> extends Base implements I { ... }`; the current token
    /// is `class`.
    pub(crate) fn parse_class_definition(&mut self, name_required: bool) -> NodeId {
        let start = self.pos();
        self.expect(TokenKind::Class);
        let id = if self.at(TokenKind::Identifier) && !self.is_contextual("implements") {
            Some(self.parse_binding_identifier())
        } else {
            if name_required && !self.at(TokenKind::OpenBrace) {
                self.error(&messages::IDENTIFIER_EXPECTED, &[]);
            }
            None
        };
        let type_params = self.parse_type_parameters_opt();
        let super_class = if self.eat(TokenKind::Extends) {
            let base = self.parse_left_hand_side_expression();
            if self.at(TokenKind::LessThan) {
                self.parse_type_arguments_opt();
            }
            Some(base)
        } else {
            None
        };
        if self.is_contextual("implements") {
            self.next();
            loop {
                self.parse_type();
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::OpenBrace);
        let mut ctor = None;
        let mut body = Vec::new();
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            let saved_pos = self.pos();
            if let Some(member) = self.parse_class_member() {
                let is_ctor = matches!(
                    self.ast.kind(member),
                    NodeKind::MethodDefinition {
                        kind: MethodKind::Constructor,
                        ..
                    }
                );
                if is_ctor && ctor.is_none() {
                    ctor = Some(member);
                } else {
                    body.push(member);
                }
            }
            if self.pos() == saved_pos {
                self.error(&messages::UNEXPECTED_TOKEN, &[]);
                self.next();
            }
        }
        self.expect(TokenKind::CloseBrace);
        self.finish(
            start,
            NodeKind::ClassDefinition {
                id,
                type_params,
                super_class,
                ctor,
                body,
            },
        )
    }

    /// Whether the identifier at the cursor is a modifier rather than a member
    /// name: it must be followed by something that can start a member name.
    fn is_member_modifier(&mut self) -> bool {
        self.peek_same_line(|k| {
            k.is_identifier_or_keyword()
                || matches!(
                    k,
                    TokenKind::StringLiteral
                        | TokenKind::NumberLiteral
                        | TokenKind::OpenBracket
                        | TokenKind::Asterisk
                        | TokenKind::Hash
                )
        })
    }

    fn parse_class_member(&mut self) -> Option<NodeId> {
        let start = self.pos();
        let mut is_static = false;
        let mut readonly = false;
        let mut flags = FunctionFlags::METHOD;
        loop {
            if self.at(TokenKind::Identifier) {
                let word = self.value().to_string();
                match word.as_str() {
                    "public" | "private" | "protected" | "abstract" | "declare" | "override"
                    | "accessor"
                        if self.is_member_modifier() =>
                    {
                        self.next();
                        continue;
                    }
                    "readonly" if self.is_member_modifier() => {
                        readonly = true;
                        self.next();
                        continue;
                    }
                    "static" if self.is_member_modifier() || self.peek() == TokenKind::OpenBrace => {
                        if self.peek() == TokenKind::OpenBrace {
                            let feature_start = self.pos();
                            self.next();
                            self.parse_block_statement();
                            let end = self.prev_end;
                            self.unsupported(feature_start, end, "static block");
                            return None;
                        }
                        is_static = true;
                        self.next();
                        continue;
                    }
                    _ => {}
                }
            }
            break;
        }
        if self.at(TokenKind::OpenBracket) && self.is_index_signature_start() {
            self.parse_index_signature(start, readonly);
            self.parse_semicolon();
            return None;
        }

        let mut method_kind = MethodKind::Method;
        if self.is_contextual("async") && self.is_member_modifier() {
            self.next();
            flags |= FunctionFlags::ASYNC;
        }
        if self.eat(TokenKind::Asterisk) {
            flags |= FunctionFlags::GENERATOR;
        }
        if (self.is_contextual("get") || self.is_contextual("set")) && self.is_member_modifier() {
            if self.value() == "get" {
                method_kind = MethodKind::Get;
                flags |= FunctionFlags::GETTER;
            } else {
                method_kind = MethodKind::Set;
                flags |= FunctionFlags::SETTER;
            }
            self.next();
        }

        let key_is_constructor = !is_static
            && (self.is_contextual("constructor")
                || (self.at(TokenKind::StringLiteral) && self.value() == "constructor"));
        let (key, computed) = self.parse_property_key();
        if is_static {
            flags |= FunctionFlags::STATIC;
        }

        let optional = self.eat(TokenKind::Question);
        self.eat(TokenKind::Exclamation);

        if self.at(TokenKind::OpenParen) || self.at(TokenKind::LessThan) {
            if key_is_constructor && method_kind == MethodKind::Method {
                method_kind = MethodKind::Constructor;
                flags |= FunctionFlags::CONSTRUCTOR;
            }
            let function = self.parse_function_rest(start, None, flags);
            let value = self.finish(start, NodeKind::FunctionExpression { function });
            return Some(self.finish(
                start,
                NodeKind::MethodDefinition {
                    kind: method_kind,
                    key,
                    value,
                    is_static,
                    computed,
                },
            ));
        }

        let type_annotation = self.parse_type_annotation_opt();
        let value = if self.eat(TokenKind::Equals) {
            Some(self.with_function_context(FunctionFlags::METHOD, |p| p.parse_assignment_expression()))
        } else {
            None
        };
        self.parse_semicolon();
        Some(self.finish(
            start,
            NodeKind::ClassProperty {
                key,
                value,
                type_annotation,
                is_static,
                readonly,
                optional,
                computed,
            },
        ))
    }

    // ---- control flow ----

    fn parse_if_statement(&mut self) -> NodeId {
        let start = self.pos();
        self.next();
        self.expect(TokenKind::OpenParen);
        let test = self.parse_expression();
        self.expect(TokenKind::CloseParen);
        let consequent = self.parse_statement();
        let alternate = if self.eat(TokenKind::Else) {
            Some(self.parse_statement())
        } else {
            None
        };
        self.finish(
            start,
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            },
        )
    }

    fn parse_loop_body(&mut self) -> NodeId {
        self.ctx.iteration_depth += 1;
        self.ctx.breakable_depth += 1;
        let body = self.parse_statement();
        self.ctx.iteration_depth -= 1;
        self.ctx.breakable_depth -= 1;
        body
    }

    fn parse_while_statement(&mut self) -> NodeId {
        let start = self.pos();
        self.next();
        self.expect(TokenKind::OpenParen);
        let test = self.parse_expression();
        self.expect(TokenKind::CloseParen);
        let body = self.parse_loop_body();
        self.finish(start, NodeKind::WhileStatement { test, body })
    }

    fn parse_do_statement(&mut self) -> NodeId {
        let start = self.pos();
        self.next();
        let body = self.parse_loop_body();
        self.expect(TokenKind::While);
        self.expect(TokenKind::OpenParen);
        let test = self.parse_expression();
        self.expect(TokenKind::CloseParen);
        self.eat(TokenKind::Semicolon);
        self.finish(start, NodeKind::DoWhileStatement { body, test })
    }

    fn parse_for_statement(&mut self) -> NodeId {
        let start = self.pos();
        self.next();
        let is_await = self.is_contextual("await");
        if is_await {
            if !self.in_async() {
                self.error(&messages::AWAIT_EXPRESSIONS_ARE_ONLY_ALLOWED_WITHIN_ASYNC_FUNCTIONS, &[]);
            }
            self.next();
        }
        self.expect(TokenKind::OpenParen);

        let saved_allow_in = std::mem::replace(&mut self.allow_in, false);
        let init_start = self.pos();
        let init = match self.kind() {
            TokenKind::Semicolon => None,
            TokenKind::Var => Some(self.parse_variable_declaration(
                init_start,
                VariableDeclarationKind::Var,
                false,
                true,
            )),
            TokenKind::Const => Some(self.parse_variable_declaration(
                init_start,
                VariableDeclarationKind::Const,
                false,
                true,
            )),
            TokenKind::Identifier
                if self.is_contextual("let")
                    && self.look_ahead(|p| {
                        matches!(p.next(), TokenKind::Identifier | TokenKind::OpenBracket | TokenKind::OpenBrace)
                    }) =>
            {
                Some(self.parse_variable_declaration(
                    init_start,
                    VariableDeclarationKind::Let,
                    false,
                    true,
                ))
            }
            _ => Some(self.parse_expression()),
        };
        self.allow_in = saved_allow_in;

        let is_of = self.is_contextual("of");
        if let Some(left) = init.filter(|_| is_of || self.at(TokenKind::In)) {
            self.check_for_in_of_left(left);
            self.next();
            let right = if is_of {
                self.parse_assignment_expression()
            } else {
                self.parse_expression()
            };
            self.expect(TokenKind::CloseParen);
            let body = self.parse_loop_body();
            let kind = if is_of {
                NodeKind::ForOfStatement {
                    left,
                    right,
                    body,
                    is_await,
                }
            } else {
                NodeKind::ForInStatement { left, right, body }
            };
            return self.finish(start, kind);
        }

        if let Some(init) = init {
            self.check_const_initializers(init);
        }
        self.expect(TokenKind::Semicolon);
        let test = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(TokenKind::Semicolon);
        let update = if self.at(TokenKind::CloseParen) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(TokenKind::CloseParen);
        let body = self.parse_loop_body();
        self.finish(
            start,
            NodeKind::ForUpdateStatement {
                init,
                test,
                update,
                body,
            },
        )
    }

    /// The left side of `for-in`/`for-of`: one declarator without an
    /// initializer, or an assignment target.
    fn check_for_in_of_left(&mut self, left: NodeId) {
        let valid = match self.ast.kind(left).clone() {
            NodeKind::VariableDeclaration { declarators, .. } => {
                declarators.len() == 1
                    && matches!(
                        self.ast.kind(declarators[0]),
                        NodeKind::VariableDeclarator { init: None, .. }
                    )
            }
            _ => self.reinterpret_as_pattern(left),
        };
        if !valid {
            let range = self.ast.range(left);
            self.error_at(range.pos, range.end, &messages::INVALID_LEFT_HAND_SIDE_IN_FOR_IN_OR_FOR_OF, &[]);
        }
    }

    fn check_const_initializers(&mut self, init: NodeId) {
        let NodeKind::VariableDeclaration {
            kind: VariableDeclarationKind::Const,
            declarators,
            ..
        } = self.ast.kind(init).clone()
        else {
            return;
        };
        for declarator in declarators {
            if let NodeKind::VariableDeclarator { init: None, .. } = self.ast.kind(declarator) {
                let range = self.ast.range(declarator);
                self.error_at(range.pos, range.end, &messages::CONST_DECLARATIONS_MUST_BE_INITIALIZED, &[]);
            }
        }
    }

    fn parse_break_or_continue(&mut self, is_break: bool) -> NodeId {
        let start = self.pos();
        self.next();
        let label = if self.at(TokenKind::Identifier) && !self.has_line_break() {
            let label_start = self.pos();
            let name = self.intern_value();
            self.next();
            let end = self.prev_end;
            let target = self.ctx.labels.iter().rev().find(|l| l.name == name).copied();
            let invalid = match target {
                None => true,
                Some(label) => !is_break && !label.is_loop,
            };
            if invalid {
                let message = if is_break {
                    &messages::A_BREAK_STATEMENT_CAN_ONLY_JUMP_TO_A_LABEL_OF_AN_ENCLOSING_STATEMENT
                } else {
                    &messages::A_CONTINUE_STATEMENT_CAN_ONLY_JUMP_TO_A_LABEL_OF_AN_ENCLOSING_ITERATION_STATEMENT
                };
                self.error_at(label_start, end, message, &[]);
            }
            Some(name)
        } else {
            let keyword_end = start + if is_break { 5 } else { 8 };
            if is_break && self.ctx.breakable_depth == 0 {
                self.error_at(
                    start,
                    keyword_end,
                    &messages::A_BREAK_STATEMENT_CAN_ONLY_BE_USED_WITHIN_AN_ENCLOSING_ITERATION_OR_SWITCH_STATEMENT,
                    &[],
                );
            } else if !is_break && self.ctx.iteration_depth == 0 {
                self.error_at(
                    start,
                    keyword_end,
                    &messages::A_CONTINUE_STATEMENT_CAN_ONLY_BE_USED_WITHIN_AN_ENCLOSING_ITERATION_STATEMENT,
                    &[],
                );
            }
            None
        };
        self.parse_semicolon();
        let kind = if is_break {
            NodeKind::BreakStatement { label }
        } else {
            NodeKind::ContinueStatement { label }
        };
        self.finish(start, kind)
    }

    fn parse_labelled_statement(&mut self) -> NodeId {
        let start = self.pos();
        let label = self.intern_value();
        self.next();
        let label_end = self.prev_end;
        self.expect(TokenKind::Colon);
        if self.ctx.labels.iter().any(|l| l.name == label) {
            let text = self.ast.str(label).to_string();
            self.error_at(start, label_end, &messages::DUPLICATE_LABEL_0, &[&text]);
        }
        let is_loop = self.look_ahead(|p| {
            while p.at(TokenKind::Identifier) && p.look_ahead(|q| q.next()) == TokenKind::Colon {
                p.next();
                p.next();
            }
            matches!(p.kind(), TokenKind::For | TokenKind::While | TokenKind::Do)
        });
        self.ctx.labels.push(LabelInfo {
            name: label,
            is_loop,
        });
        let body = self.parse_statement();
        self.ctx.labels.pop();
        self.finish(start, NodeKind::LabelledStatement { label, body })
    }

    fn parse_return_statement(&mut self) -> NodeId {
        let start = self.pos();
        if !self.ctx.in_function {
            self.error(
                &messages::A_RETURN_STATEMENT_CAN_ONLY_BE_USED_WITHIN_A_FUNCTION_BODY,
                &[],
            );
        }
        self.next();
        let argument = if self.can_parse_semicolon() {
            None
        } else {
            Some(self.parse_expression())
        };
        self.parse_semicolon();
        self.finish(start, NodeKind::ReturnStatement { argument })
    }

    fn parse_switch_statement(&mut self) -> NodeId {
        let start = self.pos();
        self.next();
        self.expect(TokenKind::OpenParen);
        let discriminant = self.parse_expression();
        self.expect(TokenKind::CloseParen);
        self.expect(TokenKind::OpenBrace);
        self.ctx.breakable_depth += 1;
        let mut cases = Vec::new();
        while matches!(self.kind(), TokenKind::Case | TokenKind::Default) {
            let case_start = self.pos();
            let test = if self.eat(TokenKind::Case) {
                Some(self.parse_expression())
            } else {
                self.next();
                None
            };
            self.expect(TokenKind::Colon);
            let consequent = self.parse_statement_list(true);
            cases.push(self.finish(case_start, NodeKind::SwitchCaseStatement { test, consequent }));
        }
        self.ctx.breakable_depth -= 1;
        self.expect(TokenKind::CloseBrace);
        self.finish(
            start,
            NodeKind::SwitchStatement {
                discriminant,
                cases,
            },
        )
    }

    fn parse_throw_statement(&mut self) -> NodeId {
        let start = self.pos();
        self.next();
        let argument = self.parse_expression();
        self.parse_semicolon();
        self.finish(start, NodeKind::ThrowStatement { argument })
    }

    fn parse_try_statement(&mut self) -> NodeId {
        let start = self.pos();
        self.next();
        let block = self.parse_block_statement();
        let handler = if self.at(TokenKind::Catch) {
            let catch_start = self.pos();
            self.next();
            let param = if self.eat(TokenKind::OpenParen) {
                let param = self.parse_binding_target(true);
                self.expect(TokenKind::CloseParen);
                Some(param)
            } else {
                None
            };
            let body = self.parse_block_statement();
            Some(self.finish(catch_start, NodeKind::CatchClause { param, body }))
        } else {
            None
        };
        let finalizer = if self.eat(TokenKind::Finally) {
            Some(self.parse_block_statement())
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            self.error(&messages::_0_EXPECTED, &["catch"]);
        }
        self.finish(
            start,
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            },
        )
    }

    // ---- modules ----

    fn parse_export_declaration(&mut self) -> NodeId {
        let start = self.pos();
        self.next();
        if self.eat(TokenKind::Default) {
            let decl_start = self.pos();
            let declaration = match self.kind() {
                TokenKind::Function => {
                    self.parse_function_declaration_with(decl_start, FunctionFlags::empty(), false)
                }
                TokenKind::Class => {
                    let definition = self.parse_class_definition(false);
                    self.finish(decl_start, NodeKind::ClassDeclaration { definition })
                }
                TokenKind::Identifier
                    if self.is_contextual("async")
                        && self.peek_same_line(|k| k == TokenKind::Function) =>
                {
                    self.next();
                    self.parse_function_declaration_with(decl_start, FunctionFlags::ASYNC, false)
                }
                TokenKind::Identifier
                    if self.is_contextual("interface")
                        && self.peek_same_line(|k| k == TokenKind::Identifier) =>
                {
                    self.parse_interface_declaration(decl_start)
                }
                _ => {
                    let expression = self.parse_assignment_expression();
                    self.parse_semicolon();
                    expression
                }
            };
            return self.finish(start, NodeKind::ExportDefaultDeclaration { declaration });
        }

        let is_declaration = match self.kind() {
            TokenKind::Var | TokenKind::Const | TokenKind::Function | TokenKind::Class => true,
            TokenKind::Identifier => {
                ["let", "type", "interface", "async", "declare", "abstract"]
                    .iter()
                    .any(|w| self.is_contextual(w))
            }
            _ => false,
        };
        if !is_declaration {
            return self.parse_unsupported_statement(start, "export list");
        }
        let declaration = self.parse_statement();
        self.finish(start, NodeKind::ExportNamedDeclaration { declaration })
    }
}
