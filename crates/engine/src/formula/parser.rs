// Formula parser - turns a token list into a translated expression tree
// Recursive descent with an explicit cursor: every parse function takes the token slice and a
// position and returns the parsed node together with the position after it.
// Precedence, loosest first: comparison, &, + -, * /, ^, %, unary prefix. All left-associative.

use super::expr::{text_literal, BinaryOp, Expr, UnaryOp};
use super::functions::Function;
use super::tokenizer::{Token, TokenKind, TokenSubtype};
use crate::error::TranspileError;

/// Turns reference operands into expressions. The code generator implements
/// this: it applies overrides or ensures an instruction for the referenced
/// cell and hands back its variable.
pub trait OperandResolver {
    fn operand(&mut self, reference: &str) -> Result<Expr, TranspileError>;
}

type ParseResult = Result<(Expr, usize), TranspileError>;

/// Parse one sub-expression starting at `pos`.
///
/// Returns `None` with the cursor unchanged when the sub-expression is empty,
/// i.e. `pos` is at an argument separator, a closing token, or the end.
pub fn parse_expression(
    tokens: &[Token],
    pos: usize,
    resolver: &mut dyn OperandResolver,
) -> Result<(Option<Expr>, usize), TranspileError> {
    let (next, at) = peek(tokens, pos);
    match next {
        None => return Ok((None, pos)),
        Some(t) if is_terminator(t) => return Ok((None, pos)),
        _ => {}
    }
    let (expr, end) = parse_comparison(tokens, at, resolver)?;
    Ok((Some(expr), end))
}

/// Parse a complete formula. Empty formulas and trailing tokens are errors.
pub fn parse_formula(tokens: &[Token], resolver: &mut dyn OperandResolver) -> Result<Expr, TranspileError> {
    let (expr, pos) = parse_expression(tokens, 0, resolver)?;
    let (rest, _) = peek(tokens, pos);
    if let Some(token) = rest {
        return Err(unexpected(token));
    }
    let expr = expr.ok_or_else(|| TranspileError::parse("empty formula"))?;
    scalar(expr)
}

/// Next non-whitespace token and its position.
fn peek(tokens: &[Token], mut pos: usize) -> (Option<&Token>, usize) {
    while let Some(t) = tokens.get(pos) {
        if t.kind != TokenKind::Whitespace {
            return (Some(t), pos);
        }
        pos += 1;
    }
    (None, pos)
}

fn is_terminator(token: &Token) -> bool {
    token.kind == TokenKind::Sep
        || token.is(TokenKind::Func, TokenSubtype::Close)
        || token.is(TokenKind::Paren, TokenSubtype::Close)
}

/// Error for a token that has no place at this position.
fn unexpected(token: &Token) -> TranspileError {
    match (token.kind, token.subtype) {
        (TokenKind::Array, _) => TranspileError::unsupported(format!("array constant '{}'", token.value)),
        (TokenKind::OpInfix, _) if BinaryOp::from_excel(&token.value).is_none() => {
            TranspileError::unsupported(format!("operator '{}'", token.value))
        }
        (TokenKind::Operand, TokenSubtype::Error) => {
            TranspileError::unsupported(format!("error literal '{}'", token.value))
        }
        (TokenKind::Literal, _) => TranspileError::unsupported(format!("literal token '{}'", token.value)),
        _ => TranspileError::parse(format!("unexpected token {token}")),
    }
}

/// Ranges are only meaningful as function arguments.
fn scalar(expr: Expr) -> Result<Expr, TranspileError> {
    match expr {
        Expr::List(_) => Err(TranspileError::unsupported("range used outside a function argument")),
        other => Ok(other),
    }
}

/// Parse one left-associative binary level: `next` parses operands, `ops`
/// lists the operators that belong to this level.
fn parse_binary_level(
    tokens: &[Token],
    pos: usize,
    resolver: &mut dyn OperandResolver,
    ops: &[BinaryOp],
    next: fn(&[Token], usize, &mut dyn OperandResolver) -> ParseResult,
) -> ParseResult {
    let (mut left, mut pos) = next(tokens, pos, resolver)?;

    loop {
        let (token, at) = peek(tokens, pos);
        let op = match token {
            Some(t) if t.kind == TokenKind::OpInfix => match BinaryOp::from_excel(&t.value) {
                Some(op) if ops.contains(&op) => op,
                _ => break,
            },
            _ => break,
        };
        let (right, new_pos) = next(tokens, at + 1, resolver)?;
        left = Expr::binary(op, scalar(left)?, scalar(right)?);
        pos = new_pos;
    }

    Ok((left, pos))
}

// Lowest precedence: comparison operators
fn parse_comparison(tokens: &[Token], pos: usize, resolver: &mut dyn OperandResolver) -> ParseResult {
    use BinaryOp::*;
    parse_binary_level(tokens, pos, resolver, &[Eq, Ne, Lt, Gt, Le, Ge], parse_concat)
}

fn parse_concat(tokens: &[Token], pos: usize, resolver: &mut dyn OperandResolver) -> ParseResult {
    parse_binary_level(tokens, pos, resolver, &[BinaryOp::Concat], parse_add_sub)
}

fn parse_add_sub(tokens: &[Token], pos: usize, resolver: &mut dyn OperandResolver) -> ParseResult {
    parse_binary_level(tokens, pos, resolver, &[BinaryOp::Add, BinaryOp::Sub], parse_mul_div)
}

fn parse_mul_div(tokens: &[Token], pos: usize, resolver: &mut dyn OperandResolver) -> ParseResult {
    parse_binary_level(tokens, pos, resolver, &[BinaryOp::Mul, BinaryOp::Div], parse_power)
}

// Exponentiation (^) - left-associative in spreadsheets: 2^3^2 = 64
fn parse_power(tokens: &[Token], pos: usize, resolver: &mut dyn OperandResolver) -> ParseResult {
    parse_binary_level(tokens, pos, resolver, &[BinaryOp::Pow], parse_percent)
}

fn parse_percent(tokens: &[Token], pos: usize, resolver: &mut dyn OperandResolver) -> ParseResult {
    let (mut expr, mut pos) = parse_unary(tokens, pos, resolver)?;

    loop {
        let (token, at) = peek(tokens, pos);
        match token {
            Some(t) if t.kind == TokenKind::OpPostfix => {
                expr = Expr::Percent(Box::new(scalar(expr)?));
                pos = at + 1;
            }
            _ => break,
        }
    }

    Ok((expr, pos))
}

// Prefix +/- binds tighter than ^ and %: -2^2 = 4
fn parse_unary(tokens: &[Token], pos: usize, resolver: &mut dyn OperandResolver) -> ParseResult {
    let (token, at) = peek(tokens, pos);
    if let Some(t) = token {
        if t.kind == TokenKind::OpPrefix {
            let op = UnaryOp::from_excel(&t.value)
                .ok_or_else(|| TranspileError::unsupported(format!("prefix operator '{}'", t.value)))?;
            let (operand, pos) = parse_unary(tokens, at + 1, resolver)?;
            return Ok((Expr::unary(op, scalar(operand)?), pos));
        }
    }
    parse_primary(tokens, pos, resolver)
}

fn parse_primary(tokens: &[Token], pos: usize, resolver: &mut dyn OperandResolver) -> ParseResult {
    let (token, pos) = peek(tokens, pos);
    let Some(token) = token else {
        return Err(TranspileError::parse("unexpected end of formula"));
    };

    match (token.kind, token.subtype) {
        (TokenKind::Operand, TokenSubtype::Range) => Ok((resolver.operand(&token.value)?, pos + 1)),
        (TokenKind::Operand, TokenSubtype::Text) => Ok((text_literal(&token.value), pos + 1)),
        (TokenKind::Operand, TokenSubtype::Number) => Ok((Expr::Number(token.value.clone()), pos + 1)),
        (TokenKind::Operand, TokenSubtype::Logical) => {
            Ok((Expr::Bool(token.value.eq_ignore_ascii_case("TRUE")), pos + 1))
        }
        (TokenKind::Func, TokenSubtype::Open) => parse_call(tokens, pos, resolver),
        (TokenKind::Paren, TokenSubtype::Open) => {
            let (inner, end) = parse_expression(tokens, pos + 1, resolver)?;
            let inner = inner.ok_or_else(|| TranspileError::parse("empty parentheses"))?;
            let (close, at) = peek(tokens, end);
            match close {
                Some(t) if t.is(TokenKind::Paren, TokenSubtype::Close) => {}
                Some(t) => return Err(unexpected(t)),
                None => return Err(TranspileError::parse("missing ')'")),
            }
            let expr = match inner {
                Expr::List(_) => inner,
                other => Expr::Group(Box::new(other)),
            };
            Ok((expr, at + 1))
        }
        _ if is_terminator(token) => Err(TranspileError::parse(format!("missing operand before {token}"))),
        (TokenKind::OpInfix, _) if BinaryOp::from_excel(&token.value).is_some() => {
            Err(TranspileError::parse(format!("missing operand before {token}")))
        }
        _ => Err(unexpected(token)),
    }
}

/// `pos` is at a FUNC/OPEN token. Parses arguments up to the matching
/// FUNC/CLOSE and applies the function's translation.
fn parse_call(tokens: &[Token], pos: usize, resolver: &mut dyn OperandResolver) -> ParseResult {
    let open = &tokens[pos];
    let func = Function::from_name(&open.value)
        .ok_or_else(|| TranspileError::unsupported(format!("function '{}'", open.value)))?;

    let mut args = Vec::new();
    let mut pos = pos + 1;
    loop {
        let (arg, end) = parse_expression(tokens, pos, resolver)?;
        args.push(arg);
        let (token, at) = peek(tokens, end);
        match token {
            Some(t) if t.is_arg_sep() => pos = at + 1,
            Some(t) if t.is(TokenKind::Func, TokenSubtype::Close) => {
                return Ok((func.apply(args)?, at + 1));
            }
            Some(t) => return Err(unexpected(t)),
            None => return Err(TranspileError::parse(format!("missing ')' for {}", open.value))),
        }
    }
}
