use std::{collections::BTreeSet, fmt::Display};

use miette::SourceSpan;

use crate::{
    Lexer,
    error::{SyntaxError, named_source},
    lex::{Token, TokenKind},
};

pub const DEFAULT_MAX_DEPTH: usize = 256;

const OPERAND: &str = "an identifier, `not` or `(`";
const OPERATOR: &str = "`and`, `or` or `)`";

pub struct Parser<'de> {
    whole: &'de str,
    lexer: Lexer<'de>,
    max_depth: usize,
}

/// Boolean syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// `offset` is the byte position of the identifier in the parsed source.
    Variable { name: String, offset: usize },
    Not(Box<Expr>),
    /// A run of `and` at one level, e.g. `A and B and C`, is a single node.
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    /// Names referenced by the expression, each once.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Variable { name, .. } => {
                names.insert(name.as_str());
            }
            Expr::Not(operand) => operand.collect_variables(names),
            Expr::And(operands) | Expr::Or(operands) => {
                for operand in operands {
                    operand.collect_variables(names);
                }
            }
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Variable { name, .. } => write!(f, "{name}"),
            Expr::Not(operand) => write!(f, "(not {operand})"),
            Expr::And(operands) => write_chain(f, "and", operands),
            Expr::Or(operands) => write_chain(f, "or", operands),
        }
    }
}

fn write_chain(f: &mut std::fmt::Formatter<'_>, op: &str, operands: &[Expr]) -> std::fmt::Result {
    write!(f, "({op}")?;
    for operand in operands {
        write!(f, " {operand}")?;
    }
    write!(f, ")")
}

impl<'de> Parser<'de> {
    pub fn new(whole: &'de str) -> Self {
        Parser {
            whole,
            lexer: Lexer::new(whole),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn source(&self) -> &'de str {
        self.whole
    }

    pub fn parse(mut self) -> Result<Expr, SyntaxError> {
        if self.lexer.peek()?.is_none() {
            return Err(SyntaxError::Empty {
                src: named_source(self.whole),
                span: SourceSpan::from(0..self.whole.len()),
            });
        }

        let expr = self.parse_within(0, 0)?;

        match self.lexer.next() {
            None => Ok(expr),
            Some(Err(e)) => Err(e),
            Some(Ok(token)) if token.kind == TokenKind::RightParen => {
                Err(SyntaxError::UnmatchedParen {
                    src: named_source(self.whole),
                    span: token.span(),
                })
            }
            Some(Ok(token)) => Err(self.lexer.unexpected(token, "`and`, `or` or end of input")),
        }
    }

    /// Parses an expression whose operators bind tighter than `min_bp`.
    ///
    /// `depth` counts the recursion of this function and is capped by
    /// `max_depth`. Operators chained at one level extend a single node
    /// instead of recursing, so flat chains of any length are accepted.
    fn parse_within(&mut self, min_bp: u8, depth: usize) -> Result<Expr, SyntaxError> {
        let lhs = match self.lexer.next() {
            Some(Ok(token)) => token,
            Some(Err(e)) => return Err(e),
            None => return Err(self.lexer.eof(OPERAND)),
        };

        let mut lhs = match lhs {
            Token {
                kind: TokenKind::Ident,
                literal,
                offset,
            } => Expr::Variable {
                name: literal.to_string(),
                offset,
            },

            Token {
                kind: TokenKind::LeftParen,
                ..
            } => {
                self.descend(depth, lhs)?;
                let inner = self.parse_within(0, depth + 1)?;
                match self.lexer.next() {
                    Some(Ok(Token {
                        kind: TokenKind::RightParen,
                        ..
                    })) => inner,
                    Some(Ok(token)) => return Err(self.lexer.unexpected(token, "`)`")),
                    Some(Err(e)) => return Err(e),
                    None => {
                        return Err(SyntaxError::UnclosedParen {
                            src: named_source(self.whole),
                            span: lhs.span(),
                        });
                    }
                }
            }

            Token {
                kind: TokenKind::Not,
                ..
            } => {
                self.descend(depth, lhs)?;
                let operand = self.parse_within(NOT_BINDING_POWER, depth + 1)?;
                Expr::Not(Box::new(operand))
            }

            Token {
                kind: TokenKind::And | TokenKind::Or | TokenKind::RightParen,
                ..
            } => return Err(self.lexer.unexpected(lhs, OPERAND)),
        };

        // operator of the node this loop last built, which later operands may extend
        let mut chained = None;

        loop {
            let Some(op) = self.lexer.peek()? else {
                break;
            };

            let (l_bp, r_bp) = match op.kind {
                TokenKind::Or => (1, 2),
                TokenKind::And => (3, 4),
                // the enclosing group consumes it, or `parse` reports it as unmatched
                TokenKind::RightParen => break,
                TokenKind::Ident | TokenKind::LeftParen | TokenKind::Not => {
                    return Err(self.lexer.unexpected(op, OPERATOR));
                }
            };

            if l_bp < min_bp {
                break;
            }
            self.lexer.next();

            self.descend(depth, op)?;
            let rhs = self.parse_within(r_bp, depth + 1)?;
            let extends = chained == Some(op.kind);
            lhs = match lhs {
                Expr::And(mut operands) if extends => {
                    operands.push(rhs);
                    Expr::And(operands)
                }
                Expr::Or(mut operands) if extends => {
                    operands.push(rhs);
                    Expr::Or(operands)
                }
                lhs if op.kind == TokenKind::And => Expr::And(vec![lhs, rhs]),
                lhs => Expr::Or(vec![lhs, rhs]),
            };
            chained = Some(op.kind);
        }

        Ok(lhs)
    }

    fn descend(&self, depth: usize, at: Token<'de>) -> Result<(), SyntaxError> {
        if depth >= self.max_depth {
            return Err(self.too_deep(at.span()));
        }
        Ok(())
    }

    fn too_deep(&self, span: SourceSpan) -> SyntaxError {
        SyntaxError::TooDeep {
            src: named_source(self.whole),
            span,
            limit: self.max_depth,
        }
    }
}

const NOT_BINDING_POWER: u8 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    fn sexpr(input: &str) -> String {
        Parser::new(input).parse().unwrap().to_string()
    }

    fn error(input: &str) -> SyntaxError {
        Parser::new(input).parse().unwrap_err()
    }

    #[test]
    fn single_variable() {
        assert_eq!(sexpr("A"), "A");
        assert_eq!(sexpr("  ((A))  "), "A");
    }

    #[test]
    fn precedence() {
        assert_eq!(sexpr("A or B and C"), "(or A (and B C))");
        assert_eq!(sexpr("A and B or C"), "(or (and A B) C)");
        assert_eq!(sexpr("not A and B"), "(and (not A) B)");
        assert_eq!(sexpr("not A or not B and C"), "(or (not A) (and (not B) C))");
    }

    #[test]
    fn chains_share_one_node() {
        assert_eq!(sexpr("A and B and C"), "(and A B C)");
        assert_eq!(sexpr("A or B or C"), "(or A B C)");
        assert_eq!(sexpr("A and B or C and D or E"), "(or (and A B) (and C D) E)");
        assert_eq!(sexpr("A or B and C and D or E"), "(or A (and B C D) E)");
    }

    #[test]
    fn parenthesized_chain_stays_grouped() {
        assert_eq!(sexpr("(A and B) and C"), "(and (and A B) C)");
        assert_eq!(sexpr("A and (B and C)"), "(and A (and B C))");
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(sexpr("(A or B) and C"), "(and (or A B) C)");
        assert_eq!(sexpr("not (A and B)"), "(not (and A B))");
        assert_eq!(sexpr("(A and not B) or not C"), "(or (and A (not B)) (not C))");
    }

    #[test]
    fn stacked_negation() {
        assert_eq!(sexpr("not not A"), "(not (not A))");
    }

    #[test]
    fn variable_offsets() {
        let expr = Parser::new("x or  yy").parse().unwrap();
        let Expr::Or(operands) = expr else {
            panic!("expected an `or` node");
        };
        let [lhs, rhs] = operands.as_slice() else {
            panic!("expected two operands");
        };
        assert_eq!(
            *lhs,
            Expr::Variable {
                name: "x".into(),
                offset: 0
            }
        );
        assert_eq!(
            *rhs,
            Expr::Variable {
                name: "yy".into(),
                offset: 6
            }
        );
    }

    #[test]
    fn variables_are_deduplicated() {
        let expr = Parser::new("B and (A or not B)").parse().unwrap();
        assert_eq!(expr.variables().into_iter().collect::<Vec<_>>(), ["A", "B"]);
    }

    #[test]
    fn empty_input() {
        assert!(matches!(error(""), SyntaxError::Empty { .. }));
        assert!(matches!(error(" \t "), SyntaxError::Empty { .. }));
    }

    #[test]
    fn empty_input_points_at_source() {
        use miette::Diagnostic;

        let err = error("  ");
        assert!(err.source_code().is_some());
        assert!(err.help().is_some());
        let label = err.labels().and_then(|mut labels| labels.next()).unwrap();
        assert_eq!(label.label(), Some("nothing to evaluate here"));
        assert_eq!((label.offset(), label.len()), (0, 2));
    }

    #[test]
    fn trailing_operator() {
        assert!(matches!(error("A and"), SyntaxError::UnexpectedEof { .. }));
        assert!(matches!(error("not"), SyntaxError::UnexpectedEof { .. }));
        assert!(matches!(error("A or not "), SyntaxError::UnexpectedEof { .. }));
    }

    #[test]
    fn misplaced_operator() {
        assert!(matches!(error("and A"), SyntaxError::UnexpectedToken { .. }));
        assert!(matches!(error("A and or B"), SyntaxError::UnexpectedToken { .. }));
        assert!(matches!(error("()"), SyntaxError::UnexpectedToken { .. }));
    }

    #[test]
    fn adjacent_operands() {
        assert!(matches!(error("A B"), SyntaxError::UnexpectedToken { .. }));
        assert!(matches!(error("A (B)"), SyntaxError::UnexpectedToken { .. }));
        assert!(matches!(error("A not B"), SyntaxError::UnexpectedToken { .. }));
        assert!(matches!(error("(A) B"), SyntaxError::UnexpectedToken { .. }));
    }

    #[test]
    fn unbalanced_parentheses() {
        assert!(matches!(error("(A and B"), SyntaxError::UnclosedParen { .. }));
        assert!(matches!(error("((A)"), SyntaxError::UnclosedParen { .. }));
        assert!(matches!(error("A and B)"), SyntaxError::UnmatchedParen { .. }));
        assert!(matches!(error(")"), SyntaxError::UnexpectedToken { .. }));
    }

    #[test]
    fn unknown_operator() {
        assert!(matches!(error("A && B"), SyntaxError::UnexpectedCharacter { .. }));
        assert!(matches!(error("A and 1"), SyntaxError::UnexpectedCharacter { .. }));
    }

    #[test]
    fn host_syntax_is_not_interpreted() {
        for input in ["__import__('os')", "A.__class__", "[A]", "A if B else C", "lambda: A"] {
            assert!(Parser::new(input).parse().is_err(), "{input} should not parse");
        }
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}A{}", "(".repeat(300), ")".repeat(300));
        assert!(matches!(error(&deep), SyntaxError::TooDeep { limit: 256, .. }));

        let shallow = format!("{}A{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(sexpr(&shallow), "A");
    }

    #[test]
    fn negation_chain_limit() {
        let input = format!("{}A", "not ".repeat(1000));
        assert!(matches!(error(&input), SyntaxError::TooDeep { .. }));
    }

    #[test]
    fn long_flat_chain_is_not_nesting() {
        let chain = (0..300)
            .map(|i| format!("v{i}"))
            .collect::<Vec<_>>()
            .join(" and ");
        let Expr::And(operands) = Parser::new(&chain).parse().unwrap() else {
            panic!("expected an `and` node");
        };
        assert_eq!(operands.len(), 300);

        let chain = vec!["A"; 20].join(" or ");
        assert!(Parser::new(&chain).with_max_depth(2).parse().is_ok());
    }

    #[test]
    fn custom_depth_limit() {
        let result = Parser::new("((A))").with_max_depth(1).parse();
        assert!(matches!(result, Err(SyntaxError::TooDeep { limit: 1, .. })));
        assert!(Parser::new("(A)").with_max_depth(1).parse().is_ok());
    }
}
