use std::fmt;

use log::{debug, trace};
use thiserror::Error;

use crate::lexer::{Position, Token, TokenKind};

use super::{
    Assignment, BinOpKind, Block, Declaration, Expr, FunctionDecl, Identifier, LValue, Literal,
    Param, Program, StackPush, Stmt, TypeName,
};

/// What the parser was looking for when it gave up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expected {
    Kind(TokenKind),
    Statement,
    Expression,
    TypeName,
    StackMethod,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Kind(kind) => write!(f, "{kind}"),
            Expected::Statement => write!(f, "statement"),
            Expected::Expression => write!(f, "expression"),
            Expected::TypeName => write!(f, "type name"),
            Expected::StackMethod => write!(f, "'push' or 'pop'"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("{pos}: expected {expected}, found {}", describe(.found))]
pub struct SyntaxError {
    pub expected: Expected,
    /// `None` when the input ended early.
    pub found: Option<Token>,
    pub pos: Position,
}

fn describe(found: &Option<Token>) -> String {
    match found {
        Some(t) => format!("{:?}", t.lexeme),
        None => "end of input".to_string(),
    }
}

type ParseResult<T> = Result<T, SyntaxError>;

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    eof: Position,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let eof = tokens
            .last()
            .map(|t| t.end())
            .unwrap_or(Position::new(1, 1));
        Self {
            tokens,
            index: 0,
            eof,
        }
    }

    pub fn parse(&mut self) -> ParseResult<Program> {
        let program = self.parse_program()?;
        debug!("parsed {} top-level statements", program.0.len());
        Ok(program)
    }

    fn is_eof(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.index).map(|t| t.kind)
    }

    fn error(&self, expected: Expected) -> SyntaxError {
        let found = self.tokens.get(self.index).cloned();
        let pos = found.as_ref().map(|t| t.pos).unwrap_or(self.eof);
        SyntaxError {
            expected,
            found,
            pos,
        }
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.index].clone();
        trace!("matched {:?} {:?} at {}", t.kind, t.lexeme, t.pos);
        self.index += 1;
        t
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek() != Some(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.peek() != Some(kind) {
            return Err(self.error(Expected::Kind(kind)));
        }
        Ok(self.advance())
    }

    fn expect_ident(&mut self) -> ParseResult<Identifier> {
        let t = self.expect(TokenKind::Ident)?;
        Ok(Identifier::new(t.lexeme, t.pos))
    }

    /// program = statement*
    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut stmts = vec![];

        while !self.is_eof() {
            stmts.push(self.parse_stmt()?);
        }

        Ok(Program(stmts))
    }

    /// block = "{" statement* "}"
    fn parse_block(&mut self) -> ParseResult<Block> {
        self.expect(TokenKind::OpenCurlyBrace)?;
        let mut stmts = vec![];
        while !self.consume(TokenKind::CloseCurlyBrace) {
            if self.is_eof() {
                return Err(self.error(Expected::Kind(TokenKind::CloseCurlyBrace)));
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(Block(stmts))
    }

    /// statement = if_stmt | while_stmt | do_while_stmt | for_stmt | func_decl
    ///           | simple_stmt
    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        match self.peek() {
            Some(TokenKind::If) => self.parse_if(),
            Some(TokenKind::While) => self.parse_while(),
            Some(TokenKind::Do) => self.parse_do_while(),
            Some(TokenKind::For) => self.parse_for(),
            Some(TokenKind::Def) => self.parse_func_decl(),
            Some(TokenKind::Ident) => self.parse_simple_stmt(),
            _ => Err(self.error(Expected::Statement)),
        }
    }

    /// if_stmt = "if" "(" expression ")" block ("else" block)?
    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::OpenParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::CloseParen)?;
        let then_block = self.parse_block()?;
        let else_block = if self.consume(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::If(cond, then_block, else_block))
    }

    /// while_stmt = "while" "(" expression ")" block
    fn parse_while(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::OpenParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::CloseParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::While(cond, body))
    }

    /// do_while_stmt = "do" block "while" "(" expression ")" ";"
    fn parse_do_while(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::Do)?;
        let body = self.parse_block()?;
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::OpenParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::CloseParen)?;
        self.expect(TokenKind::SemiColon)?;
        Ok(Stmt::DoWhile(body, cond))
    }

    /// for_stmt = "for" "(" assignment expression ";" update ")" block
    /// update   = ident "=" expression ";"?
    fn parse_for(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::OpenParen)?;

        let ident = self.expect_ident()?;
        let init = self.parse_assignment(LValue::Ident(ident))?;

        let cond = self.parse_expression()?;
        self.expect(TokenKind::SemiColon)?;

        let ident = self.expect_ident()?;
        let pos = self.expect(TokenKind::Equal)?.pos;
        let expr = self.parse_expression()?;
        self.consume(TokenKind::SemiColon);
        let update = Assignment {
            target: LValue::Ident(ident),
            expr,
            pos,
        };

        self.expect(TokenKind::CloseParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::For(Box::new(init), cond, Box::new(update), body))
    }

    /// func_decl = "def" ident "(" (param ("," param)*)? ")"
    ///             "{" statement* ("return" expression ";")? "}"
    fn parse_func_decl(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::Def)?;
        let name = self.expect_ident()?;

        self.expect(TokenKind::OpenParen)?;
        let mut params = vec![];
        if !self.consume(TokenKind::CloseParen) {
            params.push(self.parse_param()?);
            while self.consume(TokenKind::Comma) {
                params.push(self.parse_param()?);
            }
            self.expect(TokenKind::CloseParen)?;
        }

        self.expect(TokenKind::OpenCurlyBrace)?;
        let mut stmts = vec![];
        let mut ret = None;
        while !self.consume(TokenKind::CloseCurlyBrace) {
            if self.consume(TokenKind::Return) {
                ret = Some(self.parse_expression()?);
                self.expect(TokenKind::SemiColon)?;
                self.expect(TokenKind::CloseCurlyBrace)?;
                break;
            }
            if self.is_eof() {
                return Err(self.error(Expected::Kind(TokenKind::CloseCurlyBrace)));
            }
            stmts.push(self.parse_stmt()?);
        }

        Ok(Stmt::FunctionDecl(FunctionDecl {
            name,
            params,
            body: Block(stmts),
            ret,
        }))
    }

    /// param = ident (":" type)?
    fn parse_param(&mut self) -> ParseResult<Param> {
        let name = self.expect_ident()?;
        let ty = if self.consume(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        Ok(Param { name, ty })
    }

    /// type = "int" | "float" | "string" | ("array" | "stack") "<" type ">"
    fn parse_type(&mut self) -> ParseResult<TypeName> {
        if self.peek() != Some(TokenKind::Ident) {
            return Err(self.error(Expected::TypeName));
        }
        let ty = match self.tokens[self.index].lexeme.as_str() {
            "int" => TypeName::Int,
            "float" => TypeName::Float,
            "string" => TypeName::String,
            "array" | "stack" => {
                let container = self.advance();
                self.expect(TokenKind::LessThan)?;
                let inner = Box::new(self.parse_type()?);
                self.expect(TokenKind::GreaterThan)?;
                return Ok(if container.lexeme == "array" {
                    TypeName::Array(inner)
                } else {
                    TypeName::Stack(inner)
                });
            }
            _ => return Err(self.error(Expected::TypeName)),
        };
        self.advance();
        Ok(ty)
    }

    /// simple_stmt = ident "=" expression ";"
    ///             | ident ":" type ("=" expression)? ";"
    ///             | ident "[" expression "]" "=" expression ";"
    ///             | ident "(" args ")" ";"
    ///             | ident "." ("push" "(" expression ")" | "pop" "(" ")") ";"
    fn parse_simple_stmt(&mut self) -> ParseResult<Stmt> {
        let ident = self.expect_ident()?;

        match self.peek() {
            Some(TokenKind::Equal) => Ok(Stmt::Assign(
                self.parse_assignment(LValue::Ident(ident))?,
            )),
            Some(TokenKind::Colon) => self.parse_declaration(ident),
            Some(TokenKind::OpenSquareBrace) => {
                self.advance();
                let index = self.parse_expression()?;
                self.expect(TokenKind::CloseSquareBrace)?;
                Ok(Stmt::Assign(
                    self.parse_assignment(LValue::Index(ident, index))?,
                ))
            }
            Some(TokenKind::OpenParen) => {
                let args = self.parse_args()?;
                self.expect(TokenKind::SemiColon)?;
                Ok(Stmt::Expr(Expr::Call(ident, args)))
            }
            Some(TokenKind::Dot) => {
                self.advance();
                let stmt = match self.parse_stack_method()?.as_str() {
                    "push" => {
                        self.expect(TokenKind::OpenParen)?;
                        let value = self.parse_expression()?;
                        self.expect(TokenKind::CloseParen)?;
                        Stmt::StackPush(StackPush {
                            stack: ident,
                            value,
                        })
                    }
                    _ => {
                        self.expect(TokenKind::OpenParen)?;
                        self.expect(TokenKind::CloseParen)?;
                        Stmt::Expr(Expr::StackPop(ident))
                    }
                };
                self.expect(TokenKind::SemiColon)?;
                Ok(stmt)
            }
            _ => Err(self.error(Expected::Kind(TokenKind::Equal))),
        }
    }

    /// assignment = lvalue "=" expression ";"
    fn parse_assignment(&mut self, target: LValue) -> ParseResult<Assignment> {
        let pos = self.expect(TokenKind::Equal)?.pos;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::SemiColon)?;
        Ok(Assignment { target, expr, pos })
    }

    /// declaration = ident ":" type ("=" expression)? ";"
    fn parse_declaration(&mut self, name: Identifier) -> ParseResult<Stmt> {
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        let init = if self.consume(TokenKind::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::SemiColon)?;
        Ok(Stmt::Declaration(Declaration { name, ty, init }))
    }

    /// Consumes `push` or `pop` after a `.` and returns which one.
    fn parse_stack_method(&mut self) -> ParseResult<String> {
        match self.tokens.get(self.index) {
            Some(t) if t.kind == TokenKind::Ident && (t.lexeme == "push" || t.lexeme == "pop") => {
                Ok(self.advance().lexeme)
            }
            _ => Err(self.error(Expected::StackMethod)),
        }
    }

    /// args = "(" (expression ("," expression)*)? ")"
    fn parse_args(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(TokenKind::OpenParen)?;
        let mut args = vec![];
        if !self.consume(TokenKind::CloseParen) {
            args.push(self.parse_expression()?);
            while self.consume(TokenKind::Comma) {
                args.push(self.parse_expression()?);
            }
            self.expect(TokenKind::CloseParen)?;
        }
        Ok(args)
    }

    /// expression = expr (("==" | "!=" | "<" | ">" | "<=" | ">=") expr)?
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        let left = self.parse_expr()?;

        match self.peek().and_then(BinOpKind::from_token) {
            Some(op) if op.is_comparison() => {
                let pos = self.advance().pos;
                let right = self.parse_expr()?;
                Ok(Expr::binary(op, left, right, pos))
            }
            _ => Ok(left),
        }
    }

    /// expr = term (("+" | "-") term)*
    fn parse_expr(&mut self) -> ParseResult<Expr> {
        let mut node = self.parse_term()?;

        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinOpKind::Add,
                Some(TokenKind::Minus) => BinOpKind::Sub,
                _ => return Ok(node),
            };
            let pos = self.advance().pos;
            node = Expr::binary(op, node, self.parse_term()?, pos);
        }
    }

    /// term = factor (("*" | "/") factor)*
    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut node = self.parse_factor()?;

        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinOpKind::Mul,
                Some(TokenKind::Slash) => BinOpKind::Div,
                _ => return Ok(node),
            };
            let pos = self.advance().pos;
            node = Expr::binary(op, node, self.parse_factor()?, pos);
        }
    }

    /// factor = number | string | "(" expression ")"
    ///        | ident ("(" args ")" | "[" expression "]" | "." "pop" "(" ")")?
    fn parse_factor(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            Some(TokenKind::Number) => {
                let t = self.advance();
                Ok(Expr::Literal(Literal::number(&t.lexeme, t.pos)))
            }
            Some(TokenKind::String) => {
                let t = self.advance();
                Ok(Expr::Literal(Literal::string(&t.lexeme, t.pos)))
            }
            Some(TokenKind::OpenParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(expr)
            }
            Some(TokenKind::Ident) => {
                let ident = self.expect_ident()?;
                self.parse_ident(ident)
            }
            _ => Err(self.error(Expected::Expression)),
        }
    }

    fn parse_ident(&mut self, ident: Identifier) -> ParseResult<Expr> {
        match self.peek() {
            Some(TokenKind::OpenParen) => Ok(Expr::Call(ident, self.parse_args()?)),
            Some(TokenKind::OpenSquareBrace) => {
                self.advance();
                let index = self.parse_expression()?;
                self.expect(TokenKind::CloseSquareBrace)?;
                Ok(Expr::Index(ident, Box::new(index)))
            }
            Some(TokenKind::Dot) => {
                self.advance();
                // only `pop` yields a value
                match self.tokens.get(self.index) {
                    Some(t) if t.kind == TokenKind::Ident && t.lexeme == "pop" => {
                        self.advance();
                    }
                    _ => return Err(self.error(Expected::StackMethod)),
                }
                self.expect(TokenKind::OpenParen)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(Expr::StackPop(ident))
            }
            _ => Ok(Expr::Ident(ident)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::lexer::Lexer;

    fn parse(s: &str) -> ParseResult<Program> {
        Parser::new(Lexer::tokenize(s).unwrap()).parse()
    }

    fn parse_expr(s: &str) -> String {
        let mut parser = Parser::new(Lexer::tokenize(s).unwrap());
        let expr = parser.parse_expression().unwrap();
        assert!(parser.is_eof(), "trailing tokens in {s:?}");
        expr.to_string()
    }

    #[rstest]
    #[case("2 + 3 * 4", "(+ 2 (* 3 4))")]
    #[case("2 - 3 - 4", "(- (- 2 3) 4)")]
    #[case("8 / 4 / 2", "(/ (/ 8 4) 2)")]
    #[case("(2 + 3) * 4", "(* (+ 2 3) 4)")]
    #[case("a == b + 1", "(== a (+ b 1))")]
    #[case("x * y < 10", "(< (* x y) 10)")]
    #[case("f(1, g(x)) + arr[i - 1]", "(+ (call f 1 (call g x)) arr[(- i 1)])")]
    #[case("s.pop() * 2.5", "(* s.pop() 2.5)")]
    #[case("\"hi\"", "\"hi\"")]
    fn test_expression_shape(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse_expr(input), expected);
    }

    #[test]
    fn test_if_else() {
        let program = parse("if (a == b) { y = 1; } else { y = 2; }").unwrap();
        let [Stmt::If(cond, then_block, Some(else_block))] = &program.0[..] else {
            panic!("{:?}", program);
        };
        assert_eq!(cond.to_string(), "(== a b)");
        assert_eq!(then_block.0.len(), 1);
        assert_eq!(else_block.0.len(), 1);
    }

    #[test]
    fn test_loops() {
        let program = parse(
            "while (n > 0) { n = n - 1; }
             do { x = x * 2; } while (x < 64);
             for (i = 0; i < 10; i = i + 1) { s.push(i); }
             for (j = 0; j < 3; j = j + 1;) { }",
        )
        .unwrap();
        assert!(matches!(program.0[0], Stmt::While(_, _)));
        assert!(matches!(program.0[1], Stmt::DoWhile(_, _)));
        let Stmt::For(init, cond, update, body) = &program.0[2] else {
            panic!();
        };
        assert_eq!(init.target.base().name, "i");
        assert_eq!(cond.to_string(), "(< i 10)");
        assert_eq!(update.expr.to_string(), "(+ i 1)");
        assert!(matches!(body.0[0], Stmt::StackPush(_)));
        assert!(matches!(program.0[3], Stmt::For(..)));
    }

    #[test]
    fn test_function_decl() {
        let program = parse("def add(a, b: float) { c = a + b; return c; }").unwrap();
        let Stmt::FunctionDecl(f) = &program.0[0] else {
            panic!();
        };
        assert_eq!(f.name.name, "add");
        assert_eq!(f.params[0].ty, None);
        assert_eq!(f.params[1].ty, Some(TypeName::Float));
        assert_eq!(f.body.0.len(), 1);
        assert_eq!(f.ret.as_ref().map(|e| e.to_string()).as_deref(), Some("c"));
    }

    #[test]
    fn test_declarations() {
        let program = parse("arr: array<int>; s: stack<array<float>>; x: string = \"a\";").unwrap();
        let tys: Vec<_> = program
            .0
            .iter()
            .map(|s| match s {
                Stmt::Declaration(d) => d.ty.to_string(),
                _ => panic!(),
            })
            .collect();
        assert_eq!(tys, vec!["array<int>", "stack<array<float>>", "string"]);
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse("x = 1\ny = 2;").unwrap_err();
        assert_eq!(err.expected, Expected::Kind(TokenKind::SemiColon));
        assert_eq!(err.found.map(|t| t.lexeme), Some("y".to_string()));
        assert_eq!(err.pos, Position::new(2, 1));
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let err = parse("while (x < 3) { x = x + 1;").unwrap_err();
        assert_eq!(err.expected, Expected::Kind(TokenKind::CloseCurlyBrace));
        assert_eq!(err.found, None);
        assert_eq!(err.pos, Position::new(1, 27));
    }

    #[test]
    fn test_return_outside_function() {
        let err = parse("x = 1; return x;").unwrap_err();
        assert_eq!(err.expected, Expected::Statement);
        assert_eq!(err.pos, Position::new(1, 8));
    }

    #[test]
    fn test_return_must_end_function_body() {
        let err = parse("def f() { return 1; x = 2; }").unwrap_err();
        assert_eq!(err.expected, Expected::Kind(TokenKind::CloseCurlyBrace));
    }

    #[rstest]
    #[case("x: list<int>;", Expected::TypeName)]
    #[case("s.peek();", Expected::StackMethod)]
    #[case("x = ;", Expected::Expression)]
    #[case("x + 1;", Expected::Kind(TokenKind::Equal))]
    #[case("if x { }", Expected::Kind(TokenKind::OpenParen))]
    #[case("x = a < b < c;", Expected::Kind(TokenKind::SemiColon))]
    #[case("y = s.push(1);", Expected::StackMethod)]
    fn test_syntax_errors(#[case] input: &str, #[case] expected: Expected) {
        assert_eq!(parse(input).unwrap_err().expected, expected);
    }
}
