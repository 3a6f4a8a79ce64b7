//! Recursive descent parser.
//!
//! ```text
//! script      := statement*
//! statement   := (declaration | assignment | if | for | require | sort | permute) ';'
//! declaration := 'NUMBER' declvar (',' declvar)*
//! declvar     := IDENT ('[' expr ']')?
//! assignment  := IDENT ('[' expr ']')? '=' expr
//! if          := 'IF' expr 'THEN' statement* ('ELSE' statement*)? 'END'
//! for         := 'FOR' IDENT 'IN' '(' expr ',' expr ',' expr ')' 'DO' statement* 'END'
//! require     := 'REQUIRE' expr
//! sort        := 'SORT' '(' IDENT (',' IDENT (',' IDENT)?)? ')'
//! permute     := 'PERMUTE' '(' IDENT ',' IDENT (',' IDENT)? ')'
//! expr        := and ('OR' and)*
//! and         := not ('AND' not)*
//! not         := 'NOT' not | rel
//! rel         := add (('=='|'!='|'<'|'<='|'>'|'>=') add)?
//! add         := mul (('+'|'-') mul)*
//! mul         := unary (('*'|'/') unary)*
//! unary       := '-' unary | primary
//! primary     := NUMBER | STRING | '(' expr ')' | '{' expr '}'
//!              | IDENT '[' expr ']' | IDENT '(' args ')' | IDENT
//! ```
//!
//! The `;` after an `END`-terminated statement is optional. Built-in arity
//! is checked here; a call to any other name is an index evaluation taking
//! an observation date and an optional forward date. Nesting of blocks and
//! expressions is limited to [`MAX_NESTING`] levels.

use crate::ast::{
    AssignTarget, BinaryOp, Block, Builtin, CallTarget, DeclVar, Expr, ExprId, ExprKind,
    Location, Statement, StatementKind, UnaryOp,
};
use crate::error::ScriptError;
use crate::lexer::{tokenize, Keyword, Spanned, Token};

/// Deepest accepted nesting of blocks, parentheses and operator chains.
pub(crate) const MAX_NESTING: usize = 128;

/// Parser state shared across the program and additional result
/// expressions of one script, so expression ids stay unique.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    next: usize,
}

impl IdAllocator {
    fn allocate(&mut self) -> ExprId {
        let id = ExprId(self.next);
        self.next += 1;
        id
    }
}

struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    ids: &'a mut IdAllocator,
}

/// Parses a statement block.
pub(crate) fn parse_program(source: &str, ids: &mut IdAllocator) -> Result<Block, ScriptError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        depth: 0,
        ids,
    };
    let block = parser.block(&[])?;
    parser.expect(Token::Eof)?;
    Ok(block)
}

/// Parses a single expression.
pub(crate) fn parse_expression(source: &str, ids: &mut IdAllocator) -> Result<Expr, ScriptError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        depth: 0,
        ids,
    };
    let expr = parser.expr()?;
    parser.expect(Token::Eof)?;
    Ok(expr)
}

impl Parser<'_> {
    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn location(&self) -> Location {
        self.tokens[self.pos.min(self.tokens.len() - 1)].location
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.check(&Token::Keyword(keyword))
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error<T>(&self, expected: &str) -> Result<T, ScriptError> {
        Err(ScriptError::parse(
            format!("expected {expected}, found {}", self.peek().describe()),
            self.location(),
        ))
    }

    fn expect(&mut self, token: Token) -> Result<(), ScriptError> {
        if self.eat(&token) {
            Ok(())
        } else {
            let expected = match &token {
                Token::Eof => "end of script".to_string(),
                other => other.describe(),
            };
            self.error(&expected)
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ScriptError> {
        self.expect(Token::Keyword(keyword))
    }

    fn identifier(&mut self) -> Result<String, ScriptError> {
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => self.error("identifier"),
        }
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        what: &str,
        parse: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        if self.depth >= MAX_NESTING {
            return Err(ScriptError::parse(
                format!("{what} nested too deeply"),
                self.location(),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Fails once a left-associative chain of `links` operators would nest
    /// deeper than [`MAX_NESTING`].
    fn check_chain(&self, links: usize) -> Result<(), ScriptError> {
        if self.depth + links > MAX_NESTING {
            return Err(ScriptError::parse(
                "expression nested too deeply",
                self.location(),
            ));
        }
        Ok(())
    }

    fn node(&mut self, location: Location, kind: ExprKind) -> Expr {
        Expr {
            id: self.ids.allocate(),
            location,
            kind,
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Statements up to (not including) one of `terminators` or the end.
    fn block(&mut self, terminators: &[Keyword]) -> Result<Block, ScriptError> {
        let mut block = Vec::new();
        loop {
            if self.check(&Token::Eof) || terminators.iter().any(|k| self.check_keyword(*k)) {
                return Ok(block);
            }
            block.push(self.statement()?);
        }
    }

    fn statement(&mut self) -> Result<Statement, ScriptError> {
        let location = self.location();
        let (kind, block_statement) = match self.peek() {
            Token::Keyword(Keyword::Number) => (self.declaration()?, false),
            Token::Keyword(Keyword::If) => (self.nested("block", Self::if_statement)?, true),
            Token::Keyword(Keyword::For) => (self.nested("block", Self::for_statement)?, true),
            Token::Keyword(Keyword::Require) => {
                self.advance();
                (StatementKind::Require(self.expr()?), false)
            }
            Token::Keyword(Keyword::Sort) => (self.sort()?, false),
            Token::Keyword(Keyword::Permute) => (self.permute()?, false),
            Token::Ident(_) => (self.assignment()?, false),
            _ => return self.error("statement"),
        };
        if block_statement {
            self.eat(&Token::Semicolon);
        } else {
            self.expect(Token::Semicolon)?;
        }
        Ok(Statement { location, kind })
    }

    fn declaration(&mut self) -> Result<StatementKind, ScriptError> {
        self.expect_keyword(Keyword::Number)?;
        let mut vars = Vec::new();
        loop {
            let name = self.identifier()?;
            let size = if self.eat(&Token::LBracket) {
                let size = self.expr()?;
                self.expect(Token::RBracket)?;
                Some(size)
            } else {
                None
            };
            vars.push(DeclVar { name, size });
            if !self.eat(&Token::Comma) {
                return Ok(StatementKind::Declaration(vars));
            }
        }
    }

    fn assignment(&mut self) -> Result<StatementKind, ScriptError> {
        let name = self.identifier()?;
        let index = if self.eat(&Token::LBracket) {
            let index = self.expr()?;
            self.expect(Token::RBracket)?;
            Some(index)
        } else {
            None
        };
        self.expect(Token::Assign)?;
        let value = self.expr()?;
        Ok(StatementKind::Assignment {
            target: AssignTarget { name, index },
            value,
        })
    }

    fn if_statement(&mut self) -> Result<StatementKind, ScriptError> {
        self.expect_keyword(Keyword::If)?;
        let condition = self.expr()?;
        self.expect_keyword(Keyword::Then)?;
        let then_block = self.block(&[Keyword::Else, Keyword::End])?;
        let else_block = if self.check_keyword(Keyword::Else) {
            self.advance();
            Some(self.block(&[Keyword::End])?)
        } else {
            None
        };
        self.expect_keyword(Keyword::End)?;
        Ok(StatementKind::If {
            condition,
            then_block,
            else_block,
        })
    }

    fn for_statement(&mut self) -> Result<StatementKind, ScriptError> {
        self.expect_keyword(Keyword::For)?;
        let var = self.identifier()?;
        self.expect_keyword(Keyword::In)?;
        self.expect(Token::LParen)?;
        let start = self.expr()?;
        self.expect(Token::Comma)?;
        let end = self.expr()?;
        self.expect(Token::Comma)?;
        let step = self.expr()?;
        self.expect(Token::RParen)?;
        self.expect_keyword(Keyword::Do)?;
        let body = self.block(&[Keyword::End])?;
        self.expect_keyword(Keyword::End)?;
        Ok(StatementKind::For {
            var,
            start,
            end,
            step,
            body,
        })
    }

    /// Array names of a `SORT` or `PERMUTE` argument list.
    fn array_names(&mut self, keyword: Keyword) -> Result<Vec<String>, ScriptError> {
        self.expect_keyword(keyword)?;
        self.expect(Token::LParen)?;
        let mut names = vec![self.identifier()?];
        while self.eat(&Token::Comma) {
            names.push(self.identifier()?);
        }
        self.expect(Token::RParen)?;
        Ok(names)
    }

    fn sort(&mut self) -> Result<StatementKind, ScriptError> {
        let location = self.location();
        let mut names = self.array_names(Keyword::Sort)?.into_iter();
        let (Some(source), target, positions, None) =
            (names.next(), names.next(), names.next(), names.next())
        else {
            return Err(ScriptError::parse(
                "SORT takes 1 to 3 array names",
                location,
            ));
        };
        Ok(StatementKind::Sort {
            source,
            target,
            positions,
        })
    }

    fn permute(&mut self) -> Result<StatementKind, ScriptError> {
        let location = self.location();
        let names = self.array_names(Keyword::Permute)?;
        match <[String; 2]>::try_from(names) {
            Ok([source, positions]) => Ok(StatementKind::Permute {
                source,
                target: None,
                positions,
            }),
            Err(names) => match <[String; 3]>::try_from(names) {
                Ok([source, target, positions]) => Ok(StatementKind::Permute {
                    source,
                    target: Some(target),
                    positions,
                }),
                Err(_) => Err(ScriptError::parse(
                    "PERMUTE takes 2 or 3 array names",
                    location,
                )),
            },
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self) -> Result<Expr, ScriptError> {
        self.nested("expression", Self::or)
    }

    fn or(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.and()?;
        let mut links = 0;
        while self.check_keyword(Keyword::Or) {
            let location = self.location();
            self.advance();
            links += 1;
            self.check_chain(links)?;
            let rhs = self.and()?;
            lhs = self.binary(location, BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.not()?;
        let mut links = 0;
        while self.check_keyword(Keyword::And) {
            let location = self.location();
            self.advance();
            links += 1;
            self.check_chain(links)?;
            let rhs = self.not()?;
            lhs = self.binary(location, BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    /// `NOT` binds looser than comparisons: `NOT a > b` is `NOT (a > b)`.
    fn not(&mut self) -> Result<Expr, ScriptError> {
        if !self.check_keyword(Keyword::Not) {
            return self.relational();
        }
        let location = self.location();
        self.advance();
        let operand = self.nested("expression", Self::not)?;
        Ok(self.node(
            location,
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
        ))
    }

    fn relational(&mut self) -> Result<Expr, ScriptError> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        let location = self.location();
        self.advance();
        let rhs = self.additive()?;
        Ok(self.binary(location, op, lhs, rhs))
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.multiplicative()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            let location = self.location();
            self.advance();
            links += 1;
            self.check_chain(links)?;
            let rhs = self.multiplicative()?;
            lhs = self.binary(location, op, lhs, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.unary()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            let location = self.location();
            self.advance();
            links += 1;
            self.check_chain(links)?;
            let rhs = self.unary()?;
            lhs = self.binary(location, op, lhs, rhs);
        }
    }

    fn binary(&mut self, location: Location, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.node(
            location,
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if !self.check(&Token::Minus) {
            return self.primary();
        }
        let location = self.location();
        self.advance();
        let operand = self.nested("expression", Self::unary)?;
        Ok(self.node(
            location,
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            },
        ))
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let location = self.location();
        match self.peek().clone() {
            Token::Number(v) => {
                self.advance();
                Ok(self.node(location, ExprKind::Number(v)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(self.node(location, ExprKind::String(s)))
            }
            Token::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBrace => {
                self.advance();
                let inner = self.expr()?;
                self.expect(Token::RBrace)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                self.advance();
                if self.eat(&Token::LBracket) {
                    let index = self.expr()?;
                    self.expect(Token::RBracket)?;
                    Ok(self.node(
                        location,
                        ExprKind::ArrayAccess {
                            name,
                            index: Box::new(index),
                        },
                    ))
                } else if self.eat(&Token::LParen) {
                    self.call(location, name)
                } else {
                    Ok(self.node(location, ExprKind::Identifier(name)))
                }
            }
            _ => self.error("expression"),
        }
    }

    fn call(&mut self, location: Location, name: String) -> Result<Expr, ScriptError> {
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.expr()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }

        let target = match Builtin::from_name(&name) {
            Some(builtin) => {
                if !builtin.accepts(args.len()) {
                    return Err(ScriptError::parse(
                        format!(
                            "wrong number of arguments to {name}: got {}, expected {}",
                            args.len(),
                            builtin.signature()
                        ),
                        location,
                    ));
                }
                if builtin == Builtin::DateIndex {
                    check_date_index(&args, location)?;
                }
                CallTarget::Builtin(builtin)
            }
            None => {
                if !(1..=2).contains(&args.len()) {
                    return Err(ScriptError::parse(
                        format!(
                            "index evaluation {name}(obs [, fwd]) takes 1 or 2 arguments, got {}",
                            args.len()
                        ),
                        location,
                    ));
                }
                CallTarget::Index(name)
            }
        };
        Ok(self.node(location, ExprKind::Call { target, args }))
    }
}

/// `DATEINDEX` names its array and comparison directly.
fn check_date_index(args: &[Expr], location: Location) -> Result<(), ScriptError> {
    if !matches!(args[1].kind, ExprKind::Identifier(_)) {
        return Err(ScriptError::parse(
            "DATEINDEX expects an array name as second argument",
            args[1].location,
        ));
    }
    match &args[2].kind {
        ExprKind::Identifier(op) if matches!(op.as_str(), "EQ" | "GEQ" | "GT") => Ok(()),
        _ => Err(ScriptError::parse(
            "DATEINDEX expects EQ, GEQ or GT as third argument",
            location,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(source: &str) -> Block {
        parse_program(source, &mut IdAllocator::default()).unwrap()
    }

    fn expression(source: &str) -> Expr {
        parse_expression(source, &mut IdAllocator::default()).unwrap()
    }

    fn parse_error(source: &str) -> (String, usize, usize) {
        match parse_program(source, &mut IdAllocator::default()) {
            Err(ScriptError::Parse {
                message,
                line,
                column,
            }) => (message, line, column),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(expression("1 + 2 * 3 - 4").to_string(), "((1 + (2 * 3)) - 4)");
        assert_eq!(
            expression("a < b + 1 AND c == d OR NOT e > 0").to_string(),
            "(((a < (b + 1)) AND (c == d)) OR NOT (e > 0))"
        );
        assert_eq!(expression("NOT NOT x == 1").to_string(), "NOT NOT (x == 1)");
        assert_eq!(
            expression("NOT a < b AND c > d").to_string(),
            "(NOT (a < b) AND (c > d))"
        );
        assert_eq!(expression("-x * {y + z}").to_string(), "(-x * (y + z))");
    }

    #[test]
    fn test_statements() {
        let block = program(
            "NUMBER x, y[3];
             FOR i IN (1, 3, 1) DO
                 y[i] = i;
             END
             IF x > 0 THEN x = 1; ELSE x = 2; END;
             REQUIRE x >= 0;",
        );
        assert_eq!(block.len(), 4);
        assert!(matches!(&block[0].kind, StatementKind::Declaration(vars) if vars.len() == 2));
        match &block[1].kind {
            StatementKind::For { var, body, .. } => {
                assert_eq!(var, "i");
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &block[2].kind {
            StatementKind::If { else_block, .. } => assert_eq!(else_block.as_ref().map(Vec::len), Some(1)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(block[3].location, Location { line: 6, column: 14 });
    }

    #[test]
    fn test_calls() {
        let expr = expression("LOGPAY(max(S(T) - K, 0), T, T, Ccy)");
        match expr.kind {
            ExprKind::Call {
                target: CallTarget::Builtin(Builtin::LogPay),
                args,
            } => {
                assert_eq!(args.len(), 4);
                assert_eq!(args[0].to_string(), "max((S(T) - K), 0)");
            }
            other => panic!("unexpected {other:?}"),
        }
        let expr = expression("Underlying(Obs, Fwd)");
        assert!(matches!(
            expr.kind,
            ExprKind::Call { target: CallTarget::Index(ref n), ref args } if n == "Underlying" && args.len() == 2
        ));
    }

    #[test]
    fn test_expression_ids_are_unique() {
        let mut ids = IdAllocator::default();
        let block = parse_program("x = NPV(a, d) + NPV(b, d);", &mut ids).unwrap();
        let extra = parse_expression("NPV(c, d)", &mut ids).unwrap();
        let StatementKind::Assignment { value, .. } = &block[0].kind else {
            panic!("expected assignment");
        };
        let ExprKind::Binary { lhs, rhs, .. } = &value.kind else {
            panic!("expected sum");
        };
        assert_ne!(lhs.id, rhs.id);
        assert!(extra.id > lhs.id && extra.id > rhs.id);
    }

    #[test]
    fn test_arity_errors() {
        let (message, line, column) = parse_error("x = PAY(1, d, d);");
        assert!(message.contains("PAY"), "{message}");
        assert_eq!((line, column), (1, 5));
        assert!(parse_error("x = LOGPAY(1, d, d, c, 1);").0.contains("LOGPAY"));
        assert!(parse_error("x = S();").0.contains("1 or 2"));
        assert!(parse_error("x = DATEINDEX(d, Dates, LT);").0.contains("EQ, GEQ or GT"));
    }

    #[test]
    fn test_sort_and_permute() {
        let block = program("SORT(x); SORT(x, y, p); PERMUTE(x, p); PERMUTE(x, y, p);");
        assert_eq!(
            block[0].kind,
            StatementKind::Sort {
                source: "x".into(),
                target: None,
                positions: None,
            }
        );
        assert!(matches!(
            &block[1].kind,
            StatementKind::Sort { target: Some(t), positions: Some(p), .. } if t == "y" && p == "p"
        ));
        assert!(matches!(
            &block[2].kind,
            StatementKind::Permute { target: None, positions, .. } if positions == "p"
        ));
        assert!(matches!(
            &block[3].kind,
            StatementKind::Permute { target: Some(t), positions, .. } if t == "y" && positions == "p"
        ));

        assert!(parse_error("PERMUTE(x);").0.contains("2 or 3"));
        assert!(parse_error("SORT(a, b, c, d);").0.contains("1 to 3"));
        assert!(parse_error("SORT(x[1]);").0.contains("')'"));
    }

    #[test]
    fn test_nesting_is_limited() {
        let nested = |depth: usize| format!("x = {}1{};", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(program(&nested(MAX_NESTING - 1)).len(), 1);

        let (message, line, _) = parse_error(&nested(50_000));
        assert_eq!(message, "expression nested too deeply");
        assert_eq!(line, 1);

        let negations = format!("x = {}1;", "-".repeat(50_000));
        assert!(parse_error(&negations).0.contains("nested too deeply"));
        let chain = format!("x = 1{};", " + 1".repeat(50_000));
        assert!(parse_error(&chain).0.contains("nested too deeply"));
        let blocks = format!("{}x = 1;{}", "IF c THEN ".repeat(5_000), " END".repeat(5_000));
        assert!(parse_error(&blocks).0.contains("nested too deeply"));
    }

    #[test]
    fn test_syntax_errors_have_locations() {
        let (message, line, column) = parse_error("x = 1;\ny = (2 + 3;");
        assert_eq!(message, "expected ')', found ';'");
        assert_eq!((line, column), (2, 11));

        assert!(parse_error("x = 1").0.contains("';'"));
        assert!(parse_error("IF x THEN y = 1;").0.contains("END"));
        assert!(parse_error("NUMBER;").0.contains("identifier"));
        assert!(parse_error("1 = x;").0.contains("statement"));
        assert!(parse_error("x = 1; END").0.contains("keyword END"));
    }
}
