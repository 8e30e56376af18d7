//! Recursive-descent parser for expression bodies
//!
//! Precedence, lowest first: `?:`, `||`, `&&`, equality, relational,
//! additive, multiplicative, unary, then value suffixes (`.x`, `[x]`, calls).

use super::lexer::{tokenize, Positioned, Token};
use super::ElError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Integer(String),
    Float(String),
    Str(String),
    Null,
}

/// Target routine a function call resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFunction {
    pub uri: String,
    pub class_name: String,
    pub method_name: String,
    pub parameters: Vec<String>,
    pub return_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub prefix: Option<String>,
    pub name: String,
    pub args: Vec<Expr>,
    pub resolved: Option<ResolvedFunction>,
}

impl FunctionCall {
    /// `prefix:name` or just `name`
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    Function(FunctionCall),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Choice {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Property {
        target: Box<Expr>,
        name: String,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    /// `target.method(args)` or `target[name](args)`
    MethodCall {
        target: Box<Expr>,
        method: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Visit every function call, outermost first
    pub fn for_each_function<'a>(&'a self, visit: &mut impl FnMut(&'a FunctionCall)) {
        match self {
            Expr::Function(call) => {
                visit(call);
                call.args.iter().for_each(|a| a.for_each_function(visit));
            }
            Expr::Literal(_) | Expr::Identifier(_) => {}
            Expr::Unary { operand, .. } => operand.for_each_function(visit),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.for_each_function(visit);
                rhs.for_each_function(visit);
            }
            Expr::Choice { condition, then, otherwise } => {
                condition.for_each_function(visit);
                then.for_each_function(visit);
                otherwise.for_each_function(visit);
            }
            Expr::Property { target, .. } => target.for_each_function(visit),
            Expr::Index { target, index } => {
                target.for_each_function(visit);
                index.for_each_function(visit);
            }
            Expr::MethodCall { target, method, args } => {
                target.for_each_function(visit);
                method.for_each_function(visit);
                args.iter().for_each(|a| a.for_each_function(visit));
            }
        }
    }

    pub fn for_each_function_mut(&mut self, visit: &mut impl FnMut(&mut FunctionCall)) {
        match self {
            Expr::Function(call) => {
                visit(call);
                call.args.iter_mut().for_each(|a| a.for_each_function_mut(visit));
            }
            Expr::Literal(_) | Expr::Identifier(_) => {}
            Expr::Unary { operand, .. } => operand.for_each_function_mut(visit),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.for_each_function_mut(visit);
                rhs.for_each_function_mut(visit);
            }
            Expr::Choice { condition, then, otherwise } => {
                condition.for_each_function_mut(visit);
                then.for_each_function_mut(visit);
                otherwise.for_each_function_mut(visit);
            }
            Expr::Property { target, .. } => target.for_each_function_mut(visit),
            Expr::Index { target, index } => {
                target.for_each_function_mut(visit);
                index.for_each_function_mut(visit);
            }
            Expr::MethodCall { target, method, args } => {
                target.for_each_function_mut(visit);
                method.for_each_function_mut(visit);
                args.iter_mut().for_each(|a| a.for_each_function_mut(visit));
            }
        }
    }
}

/// Parse the body of one expression (without its delimiters)
pub fn parse_expression(source: &str) -> Result<Expr, ElError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let expr = parser.choice()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(parser.unexpected(other.clone())),
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Positioned>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        self.tokens
            .get(self.pos + ahead)
            .map(|p| &p.token)
            .unwrap_or(&Token::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|p| p.offset)
            .unwrap_or(self.source.len())
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ElError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            let found = self.peek().clone();
            Err(ElError::syntax(
                self.source,
                self.offset(),
                format!("Encountered \"{}\", expected \"{}\"", found, expected),
            ))
        }
    }

    fn unexpected(&self, found: Token) -> ElError {
        ElError::syntax(self.source, self.offset(), format!("Encountered \"{}\"", found))
    }

    fn choice(&mut self) -> Result<Expr, ElError> {
        let condition = self.or()?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then = self.choice()?;
        self.expect(Token::Colon)?;
        let otherwise = self.choice()?;
        Ok(Expr::Choice {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ElError>,
        op_for: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, ElError> {
        let mut lhs = next(self)?;
        while let Some(op) = op_for(self.peek()) {
            self.advance();
            let rhs = next(self)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Expr, ElError> {
        self.binary_level(Self::and, |t| matches!(t, Token::Or).then_some(BinaryOp::Or))
    }

    fn and(&mut self) -> Result<Expr, ElError> {
        self.binary_level(Self::equality, |t| {
            matches!(t, Token::And).then_some(BinaryOp::And)
        })
    }

    fn equality(&mut self) -> Result<Expr, ElError> {
        self.binary_level(Self::relational, |t| match t {
            Token::Eq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            _ => None,
        })
    }

    fn relational(&mut self) -> Result<Expr, ElError> {
        self.binary_level(Self::additive, |t| match t {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Le => Some(BinaryOp::Le),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn additive(&mut self) -> Result<Expr, ElError> {
        self.binary_level(Self::multiplicative, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> Result<Expr, ElError> {
        self.binary_level(Self::unary, |t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash | Token::Div => Some(BinaryOp::Div),
            Token::Percent | Token::Mod => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    fn unary(&mut self) -> Result<Expr, ElError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Negate,
            Token::Not => UnaryOp::Not,
            Token::Empty => UnaryOp::Empty,
            _ => return self.value(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn value(&mut self) -> Result<Expr, ElError> {
        let mut expr = self.value_prefix()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = match self.advance() {
                        Token::Identifier(name) => name,
                        other => return Err(self.unexpected(other)),
                    };
                    expr = if self.peek() == &Token::LParen {
                        let args = self.arguments()?;
                        Expr::MethodCall {
                            target: Box::new(expr),
                            method: Box::new(Expr::Literal(Literal::Str(name))),
                            args,
                        }
                    } else {
                        Expr::Property {
                            target: Box::new(expr),
                            name,
                        }
                    };
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.choice()?;
                    self.expect(Token::RBracket)?;
                    expr = if self.peek() == &Token::LParen {
                        let args = self.arguments()?;
                        Expr::MethodCall {
                            target: Box::new(expr),
                            method: Box::new(index),
                            args,
                        }
                    } else {
                        Expr::Index {
                            target: Box::new(expr),
                            index: Box::new(index),
                        }
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn value_prefix(&mut self) -> Result<Expr, ElError> {
        match self.advance() {
            Token::True => Ok(Expr::Literal(Literal::Boolean(true))),
            Token::False => Ok(Expr::Literal(Literal::Boolean(false))),
            Token::Null => Ok(Expr::Literal(Literal::Null)),
            Token::Integer(text) => Ok(Expr::Literal(Literal::Integer(text))),
            Token::Float(text) => Ok(Expr::Literal(Literal::Float(text))),
            Token::Str(text) => Ok(Expr::Literal(Literal::Str(text))),
            Token::LParen => {
                let inner = self.choice()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Identifier(first) => {
                // prefix:name( is a function call even inside a choice
                if self.peek() == &Token::Colon
                    && matches!(self.peek_at(1), Token::Identifier(_))
                    && self.peek_at(2) == &Token::LParen
                {
                    self.advance();
                    let name = match self.advance() {
                        Token::Identifier(name) => name,
                        other => return Err(self.unexpected(other)),
                    };
                    let args = self.arguments()?;
                    return Ok(Expr::Function(FunctionCall {
                        prefix: Some(first),
                        name,
                        args,
                        resolved: None,
                    }));
                }
                if self.peek() == &Token::LParen {
                    let args = self.arguments()?;
                    return Ok(Expr::Function(FunctionCall {
                        prefix: None,
                        name: first,
                        args,
                        resolved: None,
                    }));
                }
                Ok(Expr::Identifier(first))
            }
            other => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.unexpected(other))
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ElError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.choice()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_precedence() {
        let expr = parse_expression("a + b * 2 == 7 && !done").unwrap();
        assert_matches!(expr, Expr::Binary { op: BinaryOp::And, .. });
        if let Expr::Binary { lhs, .. } = expr {
            assert_matches!(*lhs, Expr::Binary { op: BinaryOp::Eq, .. });
        }
    }

    #[test]
    fn test_function_calls() {
        let expr = parse_expression("fn:join(items, ',') ? x : y").unwrap();
        let mut names = Vec::new();
        expr.for_each_function(&mut |call| names.push((call.qualified_name(), call.args.len())));
        assert_eq!(names, vec![("fn:join".to_string(), 2)]);

        let nested = parse_expression("f:outer(f:inner(1), 2)").unwrap();
        let mut count = 0;
        nested.for_each_function(&mut |_| count += 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_choice_with_colon_is_not_a_function() {
        let expr = parse_expression("ok ? a : b").unwrap();
        assert_matches!(expr, Expr::Choice { .. });
    }

    #[test]
    fn test_property_index_and_method() {
        let expr = parse_expression("user.roles[0].name()").unwrap();
        assert_matches!(expr, Expr::MethodCall { .. });
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_expression("a +").is_err());
        assert!(parse_expression("(a").is_err());
        assert!(parse_expression("a b").is_err());
        assert!(parse_expression("").is_err());
    }
}
