//! Expression-query parser.
//!
//! Recursive descent over the restricted dialect: location paths with
//! child/descendant steps, attribute steps, predicates, `and`/`or`,
//! comparisons, union, and function calls. Unsupported syntax is
//! reported here; unsupported *semantics* (an unresolvable prefix, the
//! `*:name` wildcard) survive parsing and are rejected at evaluation.

use super::lexer::{Lexer, Token};

/// Expression AST
#[derive(Debug, Clone)]
pub enum Expr {
    /// Document root (leading `/`)
    Root,
    /// Context node (`.`)
    Context,
    /// Union (`|`)
    Union(Box<Expr>, Box<Expr>),
    /// One step applied to a base expression
    Path(Box<Expr>, Step),
    /// Relative path start
    Step(Step),
    /// Function call
    Function(String, Vec<Expr>),
    /// Comparison / boolean connective
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Number(f64),
    Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// Location step
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

/// Supported axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    SelfAxis,
    Attribute,
}

impl Axis {
    /// Map an explicit axis name; distinguishes "not an axis" from
    /// "real axis this dialect does not do"
    fn from_name(name: &str) -> Result<Self, String> {
        match name {
            "child" => Ok(Axis::Child),
            "descendant" => Ok(Axis::Descendant),
            "descendant-or-self" => Ok(Axis::DescendantOrSelf),
            "parent" => Ok(Axis::Parent),
            "self" => Ok(Axis::SelfAxis),
            "attribute" => Ok(Axis::Attribute),
            "ancestor" | "ancestor-or-self" | "following" | "following-sibling" | "preceding"
            | "preceding-sibling" | "namespace" => {
                Err(format!("unsupported axis: {}", name))
            }
            _ => Err(format!("unknown axis: {}", name)),
        }
    }
}

/// Node test within a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `*`
    Any,
    /// Bare name; matches non-namespaced elements only
    Name(String),
    /// `prefix:local`, resolved against the namespace map at evaluation
    Prefixed { prefix: String, local: String },
    /// `prefix:*`
    PrefixWildcard(String),
    /// `*:local`: always an evaluation error, kept so the error
    /// surfaces from the right layer
    NamespaceWildcard(String),
    /// `node()`
    Node,
    /// `text()`
    Text,
}

/// Parse an expression string into an AST
pub fn parse(input: &str) -> Result<Expr, String> {
    let mut parser = Parser::new(input);
    let expr = parser.parse_expr()?;
    match parser.current {
        Token::Eof => Ok(expr),
        ref tok => Err(format!("unexpected trailing token: {:?}", tok)),
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Parser { lexer, current }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn expect(&mut self, token: Token) -> Result<(), String> {
        if self.current == token {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected {:?}, found {:?}", token, self.current))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.current == Token::Or {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_equality()?;
        while self.current == Token::And {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.current {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_union()?;
        loop {
            let op = match self.current {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_union()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_union(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_path()?;
        while self.current == Token::Pipe {
            self.advance();
            let right = self.parse_path()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_path(&mut self) -> Result<Expr, String> {
        match self.current {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::Literal(ref s) => {
                let value = s.clone();
                self.advance();
                Ok(Expr::Literal(value))
            }
            Token::Slash => {
                self.advance();
                if self.starts_step() {
                    self.parse_relative(Expr::Root)
                } else {
                    Ok(Expr::Root)
                }
            }
            Token::DoubleSlash => {
                self.advance();
                let base = Expr::Path(
                    Box::new(Expr::Root),
                    Step {
                        axis: Axis::DescendantOrSelf,
                        test: NodeTest::Node,
                        predicates: Vec::new(),
                    },
                );
                if !self.starts_step() {
                    return Err("expected a step after '//'".to_string());
                }
                self.parse_relative(base)
            }
            // Function call vs relative path starting with a name:
            // the lexer only emits Name before '(' for functions.
            Token::Name(_) if self.lexer_ahead_is_call() => self.parse_function_call(),
            _ if self.starts_step() => {
                let step = self.parse_step()?;
                self.parse_relative(Expr::Step(step))
            }
            ref tok => Err(format!("unexpected token: {:?}", tok)),
        }
    }

    /// True when the lexer left us sitting on `name(`
    fn lexer_ahead_is_call(&self) -> bool {
        // The lexer resolves this while producing the token stream:
        // Name followed by '(' stays Name; parse_path treats it as a
        // call when the very next token is LeftParen. Peek cheaply by
        // cloning the lexer state.
        let mut look = self.lexer.clone();
        look.next_token() == Token::LeftParen
    }

    fn parse_function_call(&mut self) -> Result<Expr, String> {
        let name = match self.current {
            Token::Name(ref n) => n.clone(),
            ref tok => return Err(format!("expected function name, found {:?}", tok)),
        };
        self.advance();
        self.expect(Token::LeftParen)?;
        let mut args = Vec::new();
        if self.current != Token::RightParen {
            loop {
                args.push(self.parse_expr()?);
                if self.current == Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RightParen)?;
        Ok(Expr::Function(name, args))
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.current,
            Token::Dot
                | Token::DoubleDot
                | Token::At
                | Token::Star
                | Token::Name(_)
                | Token::QName(..)
                | Token::PrefixStar(_)
                | Token::StarName(_)
                | Token::NodeType(_)
                | Token::Axis(_)
        )
    }

    /// Parse `step (('/'|'//') step)*` onto `base`
    fn parse_relative(&mut self, base: Expr) -> Result<Expr, String> {
        let mut expr = match base {
            Expr::Step(_) => base,
            _ => Expr::Path(Box::new(base), self.parse_step()?),
        };
        loop {
            match self.current {
                Token::Slash => {
                    self.advance();
                    expr = Expr::Path(Box::new(expr), self.parse_step()?);
                }
                Token::DoubleSlash => {
                    self.advance();
                    expr = Expr::Path(
                        Box::new(expr),
                        Step {
                            axis: Axis::DescendantOrSelf,
                            test: NodeTest::Node,
                            predicates: Vec::new(),
                        },
                    );
                    expr = Expr::Path(Box::new(expr), self.parse_step()?);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_step(&mut self) -> Result<Step, String> {
        match self.current {
            Token::Dot => {
                self.advance();
                return Ok(Step {
                    axis: Axis::SelfAxis,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            Token::DoubleDot => {
                self.advance();
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            _ => {}
        }

        let axis = match self.current {
            Token::At => {
                self.advance();
                Axis::Attribute
            }
            Token::Axis(ref name) => {
                let axis = Axis::from_name(name)?;
                self.advance();
                self.expect(Token::DoubleColon)?;
                axis
            }
            _ => Axis::Child,
        };

        let test = self.parse_node_test()?;
        let mut predicates = Vec::new();
        while self.current == Token::LeftBracket {
            self.advance();
            predicates.push(self.parse_expr()?);
            self.expect(Token::RightBracket)?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, String> {
        let test = match self.current {
            Token::Star => NodeTest::Any,
            Token::Name(ref name) => NodeTest::Name(name.clone()),
            Token::QName(ref prefix, ref local) => NodeTest::Prefixed {
                prefix: prefix.clone(),
                local: local.clone(),
            },
            Token::PrefixStar(ref prefix) => NodeTest::PrefixWildcard(prefix.clone()),
            Token::StarName(ref local) => NodeTest::NamespaceWildcard(local.clone()),
            Token::NodeType(ref kind) => {
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    other => return Err(format!("unsupported node type: {}()", other)),
                };
                self.advance();
                self.expect(Token::LeftParen)?;
                self.expect(Token::RightParen)?;
                return Ok(test);
            }
            ref tok => return Err(format!("expected a node test, found {:?}", tok)),
        };
        self.advance();
        Ok(test)
    }
}
