//! Recursive-descent parser producing the [`ast`](crate::ast) tree.
//!
//! Binary operators use precedence climbing with the binding powers in
//! [`BinaryOp::priority`]. Parsing stops at the first error.

use crate::ast::*;
use crate::diagnostic::{Diagnostic, Stage};
use crate::token::{Keyword, Symbol, Token, TokenKind};

type ParseResult<T> = Result<T, Diagnostic>;

/// Deepest nesting of blocks and subexpressions accepted, the same limit
/// the reference Lua interpreter enforces.
const MAX_DEPTH: usize = 200;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// `tokens` must end with [`TokenKind::Eof`], as produced by the lexer.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub fn parse_chunk(&mut self) -> ParseResult<Chunk> {
        let statements = self.parse_block()?;
        if !self.at_eof() {
            return Err(self.unexpected("end of input"));
        }
        Ok(Chunk { statements })
    }

    // Token cursor

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn line(&self) -> usize {
        self.current().line
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn check_symbol(&self, symbol: Symbol) -> bool {
        self.peek_kind().is_symbol(symbol)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek_kind().is_keyword(keyword)
    }

    fn eat_symbol(&mut self, symbol: Symbol) -> bool {
        if self.check_symbol(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: Symbol) -> ParseResult<()> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{symbol}`")))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{keyword}`")))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        let token = self.current();
        Diagnostic::fatal(
            Stage::Parse,
            token.line,
            format!("expected {expected}, found {}", token.kind),
        )
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::fatal(Stage::Parse, self.line(), message)
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // Statements

    fn block_follows(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Eof => true,
            TokenKind::Keyword(k) => matches!(
                k,
                Keyword::End | Keyword::Else | Keyword::Elseif | Keyword::Until
            ),
            _ => false,
        }
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        self.enter()?;
        let mut statements = Vec::new();
        while !self.block_follows() {
            if self.eat_symbol(Symbol::Semicolon) {
                continue;
            }
            let is_return = self.check_keyword(Keyword::Return);
            statements.push(self.parse_statement()?);
            if is_return {
                self.eat_symbol(Symbol::Semicolon);
                if !self.block_follows() {
                    return Err(self.error(format!(
                        "`return` must be the last statement of its block, found {}",
                        self.peek_kind()
                    )));
                }
                break;
            }
        }
        self.leave();
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let line = self.line();
        let kind = match self.peek_kind() {
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                let cond = self.parse_expression()?;
                self.expect_keyword(Keyword::Do)?;
                let body = self.parse_block()?;
                self.expect_keyword(Keyword::End)?;
                StatementKind::While { cond, body }
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.advance();
                let body = self.parse_block()?;
                self.expect_keyword(Keyword::End)?;
                StatementKind::Do { body }
            }
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::Repeat) => {
                self.advance();
                let body = self.parse_block()?;
                self.expect_keyword(Keyword::Until)?;
                let cond = self.parse_expression()?;
                StatementKind::RepeatUntil { body, cond }
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function_statement()?,
            TokenKind::Keyword(Keyword::Local) => self.parse_local()?,
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let values = if self.block_follows() || self.check_symbol(Symbol::Semicolon) {
                    Vec::new()
                } else {
                    self.parse_expression_list()?
                };
                StatementKind::Return { values }
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                StatementKind::Break
            }
            TokenKind::Keyword(Keyword::Goto) => {
                return Err(self.error("`goto` is not supported"));
            }
            TokenKind::Ident(_) | TokenKind::Symbol(Symbol::LParen) => {
                self.parse_expression_statement()?
            }
            other => {
                return Err(self.error(format!("unexpected {other} at start of statement")));
            }
        };
        Ok(Statement::new(kind, line))
    }

    fn parse_if(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::If)?;
        let mut branches = Vec::new();
        let cond = self.parse_expression()?;
        self.expect_keyword(Keyword::Then)?;
        branches.push((cond, self.parse_block()?));

        let mut else_block = None;
        loop {
            if self.eat_keyword(Keyword::Elseif) {
                let cond = self.parse_expression()?;
                self.expect_keyword(Keyword::Then)?;
                branches.push((cond, self.parse_block()?));
            } else if self.eat_keyword(Keyword::Else) {
                else_block = Some(self.parse_block()?);
                self.expect_keyword(Keyword::End)?;
                break;
            } else {
                self.expect_keyword(Keyword::End)?;
                break;
            }
        }

        Ok(StatementKind::If {
            branches,
            else_block,
        })
    }

    fn parse_for(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::For)?;
        let first = self.expect_ident()?;

        if self.eat_symbol(Symbol::Assign) {
            let start = self.parse_expression()?;
            self.expect_symbol(Symbol::Comma)?;
            let stop = self.parse_expression()?;
            let step = if self.eat_symbol(Symbol::Comma) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.expect_keyword(Keyword::Do)?;
            let body = self.parse_block()?;
            self.expect_keyword(Keyword::End)?;
            return Ok(StatementKind::NumericFor {
                var: first,
                start,
                stop,
                step,
                body,
            });
        }

        let mut vars = vec![first];
        while self.eat_symbol(Symbol::Comma) {
            vars.push(self.expect_ident()?);
        }
        if !self.check_keyword(Keyword::In) {
            return Err(self.unexpected("`=` or `in`"));
        }
        self.advance();
        let iterables = self.parse_expression_list()?;
        self.expect_keyword(Keyword::Do)?;
        let body = self.parse_block()?;
        self.expect_keyword(Keyword::End)?;
        Ok(StatementKind::GenericFor {
            vars,
            iterables,
            body,
        })
    }

    fn parse_function_statement(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::Function)?;
        let mut path = vec![self.expect_ident()?];
        while self.eat_symbol(Symbol::Dot) {
            path.push(self.expect_ident()?);
        }
        let method = if self.eat_symbol(Symbol::Colon) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        let func = self.parse_function_body()?;
        Ok(StatementKind::FunctionDecl {
            name: FunctionName { path, method },
            is_local: false,
            func,
        })
    }

    fn parse_local(&mut self) -> ParseResult<StatementKind> {
        self.expect_keyword(Keyword::Local)?;

        if self.eat_keyword(Keyword::Function) {
            let name = self.expect_ident()?;
            let func = self.parse_function_body()?;
            return Ok(StatementKind::FunctionDecl {
                name: FunctionName::simple(name),
                is_local: true,
                func,
            });
        }

        let mut names = vec![self.parse_local_name()?];
        while self.eat_symbol(Symbol::Comma) {
            names.push(self.parse_local_name()?);
        }
        let initializers = if self.eat_symbol(Symbol::Assign) {
            self.parse_expression_list()?
        } else {
            Vec::new()
        };
        Ok(StatementKind::LocalDecl {
            names,
            initializers,
        })
    }

    fn parse_local_name(&mut self) -> ParseResult<String> {
        let name = self.expect_ident()?;
        // Lua 5.4 attributes: `<const>` / `<close>`.
        if self.eat_symbol(Symbol::Lt) {
            let attrib = self.expect_ident()?;
            if attrib != "const" && attrib != "close" {
                return Err(self.error(format!("unknown attribute `{attrib}`")));
            }
            self.expect_symbol(Symbol::Gt)?;
        }
        Ok(name)
    }

    fn parse_expression_statement(&mut self) -> ParseResult<StatementKind> {
        let first = self.parse_suffixed_expression()?;

        if self.check_symbol(Symbol::Assign) || self.check_symbol(Symbol::Comma) {
            let mut targets = vec![first];
            while self.eat_symbol(Symbol::Comma) {
                targets.push(self.parse_suffixed_expression()?);
            }
            self.expect_symbol(Symbol::Assign)?;
            for target in &targets {
                if !matches!(
                    target.kind,
                    ExpressionKind::Identifier(_) | ExpressionKind::Index { .. }
                ) {
                    return Err(Diagnostic::fatal(
                        Stage::Parse,
                        target.line,
                        "cannot assign to this expression",
                    ));
                }
            }
            let values = self.parse_expression_list()?;
            return Ok(StatementKind::Assign { targets, values });
        }

        if !first.is_call() {
            return Err(Diagnostic::fatal(
                Stage::Parse,
                first.line,
                "expression statement must be a function call",
            ));
        }
        Ok(StatementKind::ExprStatement { call: first })
    }

    fn parse_function_body(&mut self) -> ParseResult<FunctionBody> {
        self.expect_symbol(Symbol::LParen)?;
        let mut params = Vec::new();
        let mut is_vararg = false;

        if !self.check_symbol(Symbol::RParen) {
            loop {
                if self.eat_symbol(Symbol::Ellipsis) {
                    is_vararg = true;
                    break;
                }
                params.push(self.expect_ident()?);
                if !self.eat_symbol(Symbol::Comma) {
                    break;
                }
            }
        }
        self.expect_symbol(Symbol::RParen)?;

        let body = self.parse_block()?;
        self.expect_keyword(Keyword::End)?;
        Ok(FunctionBody {
            params,
            is_vararg,
            body,
        })
    }

    // Expressions

    fn parse_expression_list(&mut self) -> ParseResult<Vec<Expression>> {
        let mut exprs = vec![self.parse_expression()?];
        while self.eat_symbol(Symbol::Comma) {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_subexpression(0)
    }

    fn parse_subexpression(&mut self, limit: u8) -> ParseResult<Expression> {
        self.enter()?;
        let line = self.line();
        let mut left = match self.unary_op() {
            Some(op) => {
                self.advance();
                let operand = self.parse_subexpression(UnaryOp::PRIORITY)?;
                Expression::new(
                    ExpressionKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    line,
                )
            }
            None => self.parse_simple_expression()?,
        };

        while let Some(op) = self.binary_op() {
            let (left_priority, right_priority) = op.priority();
            if left_priority <= limit {
                break;
            }
            self.advance();
            let right = self.parse_subexpression(right_priority)?;
            left = Expression::new(
                ExpressionKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }

        self.leave();
        Ok(left)
    }

    fn unary_op(&self) -> Option<UnaryOp> {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::Not) => Some(UnaryOp::Not),
            TokenKind::Symbol(Symbol::Minus) => Some(UnaryOp::Neg),
            TokenKind::Symbol(Symbol::Hash) => Some(UnaryOp::Len),
            _ => None,
        }
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        let op = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Or) => BinaryOp::Or,
            TokenKind::Keyword(Keyword::And) => BinaryOp::And,
            TokenKind::Symbol(symbol) => match symbol {
                Symbol::Lt => BinaryOp::Lt,
                Symbol::Gt => BinaryOp::Gt,
                Symbol::LtEq => BinaryOp::Le,
                Symbol::GtEq => BinaryOp::Ge,
                Symbol::NotEq => BinaryOp::Ne,
                Symbol::Eq => BinaryOp::Eq,
                Symbol::DotDot => BinaryOp::Concat,
                Symbol::Plus => BinaryOp::Add,
                Symbol::Minus => BinaryOp::Sub,
                Symbol::Star => BinaryOp::Mul,
                Symbol::Slash => BinaryOp::Div,
                Symbol::DoubleSlash => BinaryOp::IDiv,
                Symbol::Percent => BinaryOp::Mod,
                Symbol::Caret => BinaryOp::Pow,
                _ => return None,
            },
            _ => return None,
        };
        Some(op)
    }

    fn parse_simple_expression(&mut self) -> ParseResult<Expression> {
        let line = self.line();
        let kind = match self.peek_kind().clone() {
            TokenKind::Number(value) => {
                self.advance();
                ExpressionKind::Number(value)
            }
            TokenKind::String(value) => {
                self.advance();
                ExpressionKind::String(value)
            }
            TokenKind::LongString { content, .. } => {
                self.advance();
                ExpressionKind::LongString(content)
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.advance();
                ExpressionKind::Nil
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                ExpressionKind::Bool(true)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                ExpressionKind::Bool(false)
            }
            TokenKind::Symbol(Symbol::Ellipsis) => {
                self.advance();
                ExpressionKind::Vararg
            }
            TokenKind::Symbol(Symbol::LBrace) => self.parse_table()?,
            TokenKind::Keyword(Keyword::Function) => {
                self.advance();
                ExpressionKind::FunctionExpr(self.parse_function_body()?)
            }
            _ => return self.parse_suffixed_expression(),
        };
        Ok(Expression::new(kind, line))
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expression> {
        let line = self.line();
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expression::ident(name, line))
            }
            TokenKind::Symbol(Symbol::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_symbol(Symbol::RParen)?;
                Ok(Expression::new(ExpressionKind::Paren(Box::new(inner)), line))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_suffixed_expression(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            let line = self.line();
            match self.peek_kind() {
                TokenKind::Symbol(Symbol::Dot) => {
                    self.advance();
                    let name = self.expect_ident()?;
                    expr = Expression::new(
                        ExpressionKind::Index {
                            base: Box::new(expr),
                            key: Box::new(Expression::new(ExpressionKind::String(name), line)),
                        },
                        line,
                    );
                }
                TokenKind::Symbol(Symbol::LBracket) => {
                    self.advance();
                    let key = self.parse_expression()?;
                    self.expect_symbol(Symbol::RBracket)?;
                    expr = Expression::new(
                        ExpressionKind::Index {
                            base: Box::new(expr),
                            key: Box::new(key),
                        },
                        line,
                    );
                }
                TokenKind::Symbol(Symbol::Colon) => {
                    self.advance();
                    let method = self.expect_ident()?;
                    let args = self.parse_call_args()?;
                    expr = Expression::new(
                        ExpressionKind::MethodCall {
                            receiver: Box::new(expr),
                            method,
                            args,
                        },
                        line,
                    );
                }
                TokenKind::Symbol(Symbol::LParen)
                | TokenKind::Symbol(Symbol::LBrace)
                | TokenKind::String(_)
                | TokenKind::LongString { .. } => {
                    let args = self.parse_call_args()?;
                    expr = Expression::new(
                        ExpressionKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        line,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// `(args)`, `"str"`, `[[str]]` or `{table}`.
    fn parse_call_args(&mut self) -> ParseResult<Vec<Expression>> {
        let line = self.line();
        match self.peek_kind().clone() {
            TokenKind::String(value) => {
                self.advance();
                Ok(vec![Expression::new(ExpressionKind::String(value), line)])
            }
            TokenKind::LongString { content, .. } => {
                self.advance();
                Ok(vec![Expression::new(
                    ExpressionKind::LongString(content),
                    line,
                )])
            }
            TokenKind::Symbol(Symbol::LBrace) => {
                let table = self.parse_table()?;
                Ok(vec![Expression::new(table, line)])
            }
            TokenKind::Symbol(Symbol::LParen) => {
                self.advance();
                if self.eat_symbol(Symbol::RParen) {
                    return Ok(Vec::new());
                }
                let args = self.parse_expression_list()?;
                self.expect_symbol(Symbol::RParen)?;
                Ok(args)
            }
            _ => Err(self.unexpected("function arguments")),
        }
    }

    fn parse_table(&mut self) -> ParseResult<ExpressionKind> {
        self.expect_symbol(Symbol::LBrace)?;
        let mut fields = Vec::new();

        while !self.check_symbol(Symbol::RBrace) {
            fields.push(self.parse_field()?);
            if !self.eat_symbol(Symbol::Comma) && !self.eat_symbol(Symbol::Semicolon) {
                break;
            }
        }
        self.expect_symbol(Symbol::RBrace)?;
        Ok(ExpressionKind::TableCtor(fields))
    }

    fn parse_field(&mut self) -> ParseResult<Field> {
        if self.eat_symbol(Symbol::LBracket) {
            let key = self.parse_expression()?;
            self.expect_symbol(Symbol::RBracket)?;
            self.expect_symbol(Symbol::Assign)?;
            let value = self.parse_expression()?;
            return Ok(Field::Computed(key, value));
        }

        if let TokenKind::Ident(name) = self.peek_kind() {
            let next_is_assign = self
                .tokens
                .get(self.pos + 1)
                .is_some_and(|t| t.kind.is_symbol(Symbol::Assign));
            if next_is_assign {
                let name = name.clone();
                self.advance();
                self.advance();
                let value = self.parse_expression()?;
                return Ok(Field::Named(name, value));
            }
        }

        Ok(Field::Positional(self.parse_expression()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(src: &str) -> Chunk {
        Parser::new(tokenize(src).unwrap()).parse_chunk().unwrap()
    }

    fn parse_err(src: &str) -> Diagnostic {
        Parser::new(tokenize(src).unwrap())
            .parse_chunk()
            .unwrap_err()
    }

    fn single_expr(src: &str) -> Expression {
        let chunk = parse(&format!("x = {src}"));
        match chunk.statements.into_iter().next().unwrap().kind {
            StatementKind::Assign { mut values, .. } => values.remove(0),
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_local_decl() {
        let chunk = parse("local a, b = 1, 'two'");
        match &chunk.statements[0].kind {
            StatementKind::LocalDecl {
                names,
                initializers,
            } => {
                assert_eq!(names, &["a", "b"]);
                assert_eq!(initializers.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expr = single_expr("1 + 2 * 3");
        match expr.kind {
            ExpressionKind::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(
                    right.kind,
                    ExpressionKind::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_pow_binds_tighter_than_unary() {
        // -x ^ 2 parses as -(x ^ 2)
        let expr = single_expr("-x ^ 2");
        match expr.kind {
            ExpressionKind::Unary { op, operand } => {
                assert_eq!(op, UnaryOp::Neg);
                assert!(matches!(
                    operand.kind,
                    ExpressionKind::Binary {
                        op: BinaryOp::Pow,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_concat_is_right_associative() {
        let expr = single_expr("a .. b .. c");
        match expr.kind {
            ExpressionKind::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Concat);
                assert_eq!(left.as_identifier(), Some("a"));
                assert!(matches!(
                    right.kind,
                    ExpressionKind::Binary {
                        op: BinaryOp::Concat,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_method_call_is_distinct() {
        let chunk = parse("obj:place(1, 2)");
        match &chunk.statements[0].kind {
            StatementKind::ExprStatement { call } => match &call.kind {
                ExpressionKind::MethodCall {
                    receiver,
                    method,
                    args,
                } => {
                    assert_eq!(receiver.as_identifier(), Some("obj"));
                    assert_eq!(method, "place");
                    assert_eq!(args.len(), 2);
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_call_shorthands() {
        let chunk = parse("des.level_init{ style = \"solidfill\" }\nf\"s\"\ndes.map[[\nab]]");
        assert_eq!(chunk.statements.len(), 3);
        for stmt in &chunk.statements {
            match &stmt.kind {
                StatementKind::ExprStatement { call } => match &call.kind {
                    ExpressionKind::Call { args, .. } => assert_eq!(args.len(), 1),
                    other => panic!("unexpected {other:?}"),
                },
                other => panic!("unexpected {other:?}"),
            }
        }
        match &chunk.statements[2].kind {
            StatementKind::ExprStatement { call } => match &call.kind {
                ExpressionKind::Call { args, .. } => {
                    assert_eq!(args[0].kind, ExpressionKind::LongString("\nab".into()));
                }
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_numeric_and_generic_for() {
        let chunk = parse("for i = 1, 10, 2 do end\nfor _, v in ipairs(t) do end");
        assert!(matches!(
            &chunk.statements[0].kind,
            StatementKind::NumericFor { var, step: Some(_), .. } if var == "i"
        ));
        match &chunk.statements[1].kind {
            StatementKind::GenericFor {
                vars, iterables, ..
            } => {
                assert_eq!(vars, &["_", "v"]);
                assert_eq!(iterables.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(chunk.statements[1].line, 2);
    }

    #[test]
    fn test_function_names() {
        let chunk = parse("function a.b:c(x, ...) end\nlocal function f() end");
        match &chunk.statements[0].kind {
            StatementKind::FunctionDecl {
                name,
                is_local,
                func,
            } => {
                assert_eq!(name.path, vec!["a", "b"]);
                assert_eq!(name.method.as_deref(), Some("c"));
                assert!(!is_local);
                assert_eq!(func.params, vec!["x"]);
                assert!(func.is_vararg);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            &chunk.statements[1].kind,
            StatementKind::FunctionDecl { is_local: true, .. }
        ));
    }

    #[test]
    fn test_table_fields() {
        let expr = single_expr("{ 1, x = 2, [3] = 4; 'five' }");
        match expr.kind {
            ExpressionKind::TableCtor(fields) => {
                assert_eq!(fields.len(), 4);
                assert!(matches!(fields[0], Field::Positional(_)));
                assert!(matches!(fields[1], Field::Named(ref n, _) if n == "x"));
                assert!(matches!(fields[2], Field::Computed(_, _)));
                assert!(matches!(fields[3], Field::Positional(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_if_elseif_else() {
        let chunk = parse("if a then x() elseif b then y() else z() end");
        match &chunk.statements[0].kind {
            StatementKind::If {
                branches,
                else_block,
            } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(else_block.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_goto_is_fatal() {
        let err = parse_err("x = 1\ngoto done");
        assert_eq!(err.stage, Stage::Parse);
        assert_eq!(err.line, 2);
        assert!(err.message.contains("goto"));
    }

    #[test]
    fn test_unrecognized_statement_names_token() {
        let err = parse_err("\n\n= 5");
        assert_eq!(err.line, 3);
        assert!(err.message.contains("`=`"), "{}", err.message);
    }

    #[test]
    fn test_expression_statement_must_be_call() {
        let err = parse_err("x.y");
        assert!(err.message.contains("function call"));
    }

    #[test]
    fn test_return_must_be_last() {
        let err = parse_err("return 1\nx = 2");
        assert!(err.message.contains("last statement"));
        assert!(parse("do return end x = 1").statements.len() == 2);
    }

    #[test]
    fn test_missing_end() {
        let err = parse_err("while true do\n  x()\n");
        assert!(err.message.contains("`end`"));
    }

    #[test]
    fn test_repeat_until_and_do() {
        let chunk = parse("repeat x = x + 1 until x > 3\ndo local y = 1 end");
        assert!(matches!(
            chunk.statements[0].kind,
            StatementKind::RepeatUntil { .. }
        ));
        assert!(matches!(chunk.statements[1].kind, StatementKind::Do { .. }));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("x = {}1{}", "(".repeat(20_000), ")".repeat(20_000));
        let err = parse_err(&deep);
        assert_eq!(err.stage, Stage::Parse);
        assert!(err.message.contains("nesting"));

        let blocks = format!("{}{}", "do ".repeat(500), "end ".repeat(500));
        assert!(parse_err(&blocks).message.contains("nesting"));

        let nested = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert!(matches!(single_expr(&nested).kind, ExpressionKind::Paren(_)));
    }

    #[test]
    fn test_paren_is_preserved() {
        let expr = single_expr("(f())");
        assert!(matches!(expr.kind, ExpressionKind::Paren(_)));
    }
}
