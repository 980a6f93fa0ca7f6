//! Recursive-descent parser producing the expression AST.
//!
//! Precedence, loosest first: conditional (`x if c else y`), `or`, `and`,
//! `not`, comparisons (chainable), `+ -`, `* / // %`, unary `- +`, `**`,
//! then postfix calls, attribute access and subscripts.

use super::error::ExprError;
use super::lexer::{tokenize, Spanned, Token};
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    NotEq,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}

/// A parsed contract expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    /// Builtin call; the callee is always a bare name.
    Call(String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `a < b <= c` keeps every operand so each is evaluated once.
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cond {
        then: Box<Expr>,
        cond: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
}

/// Parse a complete expression. A top-level comma list is a tuple, so
/// `int, str` parses the same as `(int, str)`.
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(src)?;
    if tokens.len() == 1 {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression_list()?;
    parser.expect(Token::Eof, "end of expression")?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, expected: &str) -> ExprError {
        let current = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        ExprError::UnexpectedToken {
            found: current.token.to_string(),
            expected: expected.to_string(),
            pos: current.pos,
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), ExprError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn starts_expression(&self) -> bool {
        !matches!(
            self.peek(),
            Token::RParen | Token::RBracket | Token::Eof | Token::Else
        )
    }

    fn expression_list(&mut self) -> Result<Expr, ExprError> {
        let first = self.expression()?;
        if self.peek() != &Token::Comma {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if !self.starts_expression() {
                break;
            }
            items.push(self.expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        let then = self.or_test()?;
        if self.eat(&Token::If) {
            let cond = self.or_test()?;
            self.expect(Token::Else, "'else'")?;
            let otherwise = self.expression()?;
            return Ok(Expr::Cond {
                then: Box::new(then),
                cond: Box::new(cond),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(then)
    }

    fn or_test(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.and_test()?;
        while self.eat(&Token::Or) {
            let rhs = self.and_test()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_test(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.not_test()?;
        while self.eat(&Token::And) {
            let rhs = self.not_test()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_test(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Not) {
            let operand = self.not_test()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let (op, width) = match (self.peek(), self.peek_at(1)) {
            (Token::Lt, _) => (CmpOp::Lt, 1),
            (Token::Le, _) => (CmpOp::Le, 1),
            (Token::Gt, _) => (CmpOp::Gt, 1),
            (Token::Ge, _) => (CmpOp::Ge, 1),
            (Token::EqEq, _) => (CmpOp::Eq, 1),
            (Token::NotEq, _) => (CmpOp::NotEq, 1),
            (Token::In, _) => (CmpOp::In, 1),
            (Token::Not, Token::In) => (CmpOp::NotIn, 2),
            (Token::Is, Token::Not) => (CmpOp::IsNot, 2),
            (Token::Is, _) => (CmpOp::Is, 1),
            _ => return None,
        };
        for _ in 0..width {
            self.advance();
        }
        Some(op)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let first = self.arith()?;
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_op() {
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn arith(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::DoubleSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.factor()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn factor(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.factor()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.postfix()?;
        if self.eat(&Token::DoubleStar) {
            // Right-associative, and binds tighter than a unary minus on its left.
            let exponent = self.factor()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.atom()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let attr = match self.peek() {
                        Token::Name(attr) => attr.clone(),
                        _ => return Err(self.error("attribute name")),
                    };
                    self.advance();
                    expr = Expr::Attr(Box::new(expr), attr);
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.expression_list()?;
                    self.expect(Token::RBracket, "']'")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Token::LParen => {
                    let func = match &expr {
                        Expr::Name(name) => name.clone(),
                        _ => return Err(self.error("operator")),
                    };
                    self.advance();
                    let args = self.call_arguments()?;
                    expr = Expr::Call(func, args);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call_arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        while self.peek() != &Token::RParen {
            args.push(self.expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "')'")?;
        Ok(args)
    }

    fn atom(&mut self) -> Result<Expr, ExprError> {
        let expr = match self.peek().clone() {
            Token::Int(i) => Expr::Literal(Value::Int(i)),
            Token::Float(x) => Expr::Literal(Value::Float(x)),
            Token::Str(s) => {
                // Adjacent string literals concatenate.
                let mut joined = s;
                while let Token::Str(next) = self.peek_at(1).clone() {
                    self.advance();
                    joined.push_str(&next);
                }
                Expr::Literal(Value::Str(joined))
            }
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::None => Expr::Literal(Value::None),
            Token::Name(name) => Expr::Name(name),
            Token::LParen => {
                self.advance();
                if self.eat(&Token::RParen) {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let inner = self.expression_list()?;
                self.expect(Token::RParen, "')'")?;
                return Ok(inner);
            }
            Token::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while self.peek() != &Token::RBracket {
                    items.push(self.expression()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBracket, "']'")?;
                return Ok(Expr::List(items));
            }
            _ => return Err(self.error("expression")),
        };
        self.advance();
        Ok(expr)
    }
}
