// Formula tokenizer - splits formula text into typed tokens
// Token vocabulary follows the conventional Excel formula tokenizer: operands carry
// their raw text (quotes, sheet prefixes and `$` markers included) and are classified
// afterwards; function openers keep the trailing "(" in their value ("SUM(").

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Whole cell content of a non-formula cell
    Literal,
    Operand,
    Func,
    Array,
    Paren,
    Sep,
    OpPrefix,
    OpInfix,
    OpPostfix,
    Whitespace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSubtype {
    None,
    Text,
    Number,
    Logical,
    Error,
    Range,
    Open,
    Close,
    Arg,
    Row,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub subtype: TokenSubtype,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, subtype: TokenSubtype, value: impl Into<String>) -> Self {
        Self { kind, subtype, value: value.into() }
    }

    /// Classify accumulated operand text.
    pub fn operand(value: impl Into<String>) -> Self {
        let value = value.into();
        let subtype = if value.starts_with('"') {
            TokenSubtype::Text
        } else if value.starts_with('#') {
            TokenSubtype::Error
        } else if value == "TRUE" || value == "FALSE" {
            TokenSubtype::Logical
        } else if value.starts_with(|c: char| c.is_ascii_digit() || c == '.') && value.parse::<f64>().is_ok() {
            TokenSubtype::Number
        } else {
            TokenSubtype::Range
        };
        Self::new(TokenKind::Operand, subtype, value)
    }

    pub fn is(&self, kind: TokenKind, subtype: TokenSubtype) -> bool {
        self.kind == kind && self.subtype == subtype
    }

    /// `,` argument separator inside a function call
    pub fn is_arg_sep(&self) -> bool {
        self.kind == TokenKind::Sep && self.value == ","
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value)?;
        write!(f, " ({:?}", self.kind)?;
        if self.subtype != TokenSubtype::None {
            write!(f, "/{:?}", self.subtype)?;
        }
        write!(f, ")")
    }
}

/// Split formula text into tokens.
///
/// Text that does not start with `=` is a single `Literal` token.
pub fn tokenize(formula: &str) -> Result<Vec<Token>, String> {
    let mut tokenizer = Tokenizer {
        chars: formula.chars().collect(),
        offset: 0,
        items: Vec::new(),
        token: String::new(),
        stack: Vec::new(),
    };
    tokenizer.run()?;
    Ok(tokenizer.items)
}

struct Tokenizer {
    chars: Vec<char>,
    offset: usize,
    items: Vec<Token>,
    /// Operand text accumulated so far
    token: String,
    /// Open functions, parens and arrays
    stack: Vec<Token>,
}

/// Characters that end the operand being accumulated.
const TERMINATORS: &str = ",;}) +-*/^&=><%";

impl Tokenizer {
    fn run(&mut self) -> Result<(), String> {
        if self.chars.is_empty() {
            return Ok(());
        }
        if self.chars[0] != '=' {
            let text: String = self.chars.iter().collect();
            self.items.push(Token::new(TokenKind::Literal, TokenSubtype::None, text));
            return Ok(());
        }
        self.offset = 1;

        while self.offset < self.chars.len() {
            if self.scientific_notation() {
                continue;
            }
            let c = self.chars[self.offset];
            if TERMINATORS.contains(c) {
                self.save_token();
            }
            let consumed = match c {
                '"' | '\'' => self.string()?,
                '[' => self.brackets()?,
                '#' => self.error_literal()?,
                ' ' | '\n' => self.whitespace(),
                '+' | '-' | '*' | '/' | '^' | '&' | '=' | '>' | '<' | '%' => self.operator(),
                '{' | '(' => self.opener(),
                ')' | '}' => self.closer()?,
                ';' | ',' => self.separator(),
                _ => {
                    self.token.push(c);
                    1
                }
            };
            self.offset += consumed;
        }
        self.save_token();

        if let Some(open) = self.stack.last() {
            return Err(format!("unclosed {}", open.value));
        }
        Ok(())
    }

    fn peek_str(&self, len: usize) -> String {
        self.chars[self.offset..(self.offset + len).min(self.chars.len())].iter().collect()
    }

    /// `1.5E+3`: keep the sign inside the number operand.
    fn scientific_notation(&mut self) -> bool {
        let c = self.chars[self.offset];
        if (c == '+' || c == '-') && is_mantissa_with_exponent(&self.token) {
            self.token.push(c);
            self.offset += 1;
            return true;
        }
        false
    }

    fn save_token(&mut self) {
        if !self.token.is_empty() {
            let text = std::mem::take(&mut self.token);
            self.items.push(Token::operand(text));
        }
    }

    /// `"text"` becomes a Text operand; `'sheet name'` joins the current operand.
    fn string(&mut self) -> Result<usize, String> {
        let delim = self.chars[self.offset];
        if delim == '"' && !self.token.is_empty() {
            return Err(format!("unexpected '\"' after '{}'", self.token));
        }
        let mut i = self.offset + 1;
        loop {
            match self.chars.get(i) {
                Some(&ch) if ch == delim => {
                    if self.chars.get(i + 1) == Some(&delim) {
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                Some(_) => i += 1,
                None => return Err("unterminated string".to_string()),
            }
        }
        let text: String = self.chars[self.offset..i].iter().collect();
        if delim == '"' {
            self.items.push(Token::operand(text));
        } else {
            self.token.push_str(&text);
        }
        Ok(i - self.offset)
    }

    /// `[...]` (structured or external references) joins the current operand.
    fn brackets(&mut self) -> Result<usize, String> {
        let mut depth = 0usize;
        let mut i = self.offset;
        while let Some(&ch) = self.chars.get(i) {
            match ch {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        let text: String = self.chars[self.offset..=i].iter().collect();
                        self.token.push_str(&text);
                        return Ok(i + 1 - self.offset);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err("unmatched '['".to_string())
    }

    fn error_literal(&mut self) -> Result<usize, String> {
        const ERRORS: [&str; 8] = ["#NULL!", "#DIV/0!", "#VALUE!", "#REF!", "#NAME?", "#NUM!", "#N/A", "#GETTING_DATA"];
        let rest: String = self.chars[self.offset..].iter().collect();
        for err in ERRORS {
            if rest.starts_with(err) {
                self.token.push_str(err);
                let len = err.chars().count();
                // `Sheet1!#REF!` stays one operand; a bare error is saved right away.
                if self.token == err {
                    self.save_token();
                }
                return Ok(len);
            }
        }
        Err(format!("invalid error literal at '{rest}'"))
    }

    fn whitespace(&mut self) -> usize {
        self.save_token();
        let mut i = self.offset;
        while matches!(self.chars.get(i), Some(' ') | Some('\n')) {
            i += 1;
        }
        let text: String = self.chars[self.offset..i].iter().collect();
        self.items.push(Token::new(TokenKind::Whitespace, TokenSubtype::None, text));
        i - self.offset
    }

    fn operator(&mut self) -> usize {
        let two = self.peek_str(2);
        if two == ">=" || two == "<=" || two == "<>" {
            self.items.push(Token::new(TokenKind::OpInfix, TokenSubtype::None, two));
            return 2;
        }
        let c = self.chars[self.offset];
        let token = match c {
            '%' => Token::new(TokenKind::OpPostfix, TokenSubtype::None, "%"),
            '*' | '/' | '^' | '&' | '=' | '>' | '<' => Token::new(TokenKind::OpInfix, TokenSubtype::None, c.to_string()),
            _ => {
                let prev = self.items.iter().rev().find(|t| t.kind != TokenKind::Whitespace);
                let infix = matches!(
                    prev,
                    Some(t) if t.subtype == TokenSubtype::Close
                        || t.kind == TokenKind::OpPostfix
                        || t.kind == TokenKind::Operand
                );
                let kind = if infix { TokenKind::OpInfix } else { TokenKind::OpPrefix };
                Token::new(kind, TokenSubtype::None, c.to_string())
            }
        };
        self.items.push(token);
        1
    }

    fn opener(&mut self) -> usize {
        let c = self.chars[self.offset];
        let token = if c == '{' {
            self.save_token();
            Token::new(TokenKind::Array, TokenSubtype::Open, "{")
        } else if !self.token.is_empty() {
            let name = std::mem::take(&mut self.token);
            Token::new(TokenKind::Func, TokenSubtype::Open, format!("{name}("))
        } else {
            Token::new(TokenKind::Paren, TokenSubtype::Open, "(")
        };
        self.items.push(token.clone());
        self.stack.push(token);
        1
    }

    fn closer(&mut self) -> Result<usize, String> {
        let c = self.chars[self.offset];
        let open = self.stack.pop().ok_or_else(|| format!("unmatched '{c}'"))?;
        let expected = if open.kind == TokenKind::Array { '}' } else { ')' };
        if c != expected {
            return Err(format!("mismatched '{c}' closing {}", open.value));
        }
        self.items.push(Token::new(open.kind, TokenSubtype::Close, c.to_string()));
        Ok(1)
    }

    fn separator(&mut self) -> usize {
        let c = self.chars[self.offset];
        let token = if c == ';' {
            Token::new(TokenKind::Sep, TokenSubtype::Row, ";")
        } else {
            match self.stack.last() {
                Some(top) if top.kind != TokenKind::Paren => Token::new(TokenKind::Sep, TokenSubtype::Arg, ","),
                // range union operator
                _ => Token::new(TokenKind::OpInfix, TokenSubtype::None, ","),
            }
        };
        self.items.push(token);
        1
    }
}

/// `1E`, `1.25E`: a mantissa waiting for a signed exponent.
fn is_mantissa_with_exponent(token: &str) -> bool {
    let Some(mantissa) = token.strip_suffix(['E', 'e']) else {
        return false;
    };
    let mut chars = mantissa.chars();
    match chars.next() {
        Some(c) if ('1'..='9').contains(&c) => {}
        _ => return false,
    }
    match chars.next() {
        None => true,
        Some('.') => {
            let frac: Vec<char> = chars.collect();
            !frac.is_empty() && frac.iter().all(|c| c.is_ascii_digit())
        }
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;
    use TokenSubtype as S;

    fn shape(formula: &str) -> Vec<(TokenKind, TokenSubtype, String)> {
        tokenize(formula)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.subtype, t.value))
            .collect()
    }

    fn t(kind: TokenKind, subtype: TokenSubtype, value: &str) -> (TokenKind, TokenSubtype, String) {
        (kind, subtype, value.to_string())
    }

    #[test]
    fn test_literal_cell() {
        assert_eq!(shape("hello"), vec![t(Literal, S::None, "hello")]);
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_if_with_comparison() {
        assert_eq!(
            shape("=IF(A1=1,\"yes\",\"no\")"),
            vec![
                t(Func, S::Open, "IF("),
                t(Operand, S::Range, "A1"),
                t(OpInfix, S::None, "="),
                t(Operand, S::Number, "1"),
                t(Sep, S::Arg, ","),
                t(Operand, S::Text, "\"yes\""),
                t(Sep, S::Arg, ","),
                t(Operand, S::Text, "\"no\""),
                t(Func, S::Close, ")"),
            ]
        );
    }

    #[test]
    fn test_ranges_and_sheets() {
        assert_eq!(
            shape("=SUM(data!$B$1:$B$3)"),
            vec![
                t(Func, S::Open, "SUM("),
                t(Operand, S::Range, "data!$B$1:$B$3"),
                t(Func, S::Close, ")"),
            ]
        );
        assert_eq!(
            shape("='my sheet'!A1*2"),
            vec![
                t(Operand, S::Range, "'my sheet'!A1"),
                t(OpInfix, S::None, "*"),
                t(Operand, S::Number, "2"),
            ]
        );
    }

    #[test]
    fn test_prefix_vs_infix_minus() {
        assert_eq!(
            shape("=-A1 - (2)"),
            vec![
                t(OpPrefix, S::None, "-"),
                t(Operand, S::Range, "A1"),
                t(Whitespace, S::None, " "),
                t(OpInfix, S::None, "-"),
                t(Whitespace, S::None, " "),
                t(Paren, S::Open, "("),
                t(Operand, S::Number, "2"),
                t(Paren, S::Close, ")"),
            ]
        );
        assert_eq!(shape("=5%-1")[1], t(OpPostfix, S::None, "%"));
        assert_eq!(shape("=5%-1")[2], t(OpInfix, S::None, "-"));
    }

    #[test]
    fn test_two_char_operators() {
        let tokens = shape("=A1<>B1");
        assert_eq!(tokens[1], t(OpInfix, S::None, "<>"));
        let tokens = shape("=A1>=B1");
        assert_eq!(tokens[1], t(OpInfix, S::None, ">="));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(
            shape("=1.5E+3*A1"),
            vec![t(Operand, S::Number, "1.5E+3"), t(OpInfix, S::None, "*"), t(Operand, S::Range, "A1")]
        );
    }

    #[test]
    fn test_logical_and_error_operands() {
        assert_eq!(shape("=TRUE")[0], t(Operand, S::Logical, "TRUE"));
        assert_eq!(shape("=#N/A")[0], t(Operand, S::Error, "#N/A"));
    }

    #[test]
    fn test_union_comma_outside_function() {
        let tokens = shape("=(A1,B1)");
        assert_eq!(tokens[2], t(OpInfix, S::None, ","));
    }

    #[test]
    fn test_nested_functions() {
        let tokens = shape("=OR(A1,SUM(B1:B2))");
        assert_eq!(tokens[3], t(Func, S::Open, "SUM("));
        assert_eq!(tokens[5], t(Func, S::Close, ")"));
        assert_eq!(tokens[6], t(Func, S::Close, ")"));
    }

    #[test]
    fn test_escaped_quotes_in_text() {
        assert_eq!(shape("=\"a\"\"b\"")[0], t(Operand, S::Text, "\"a\"\"b\""));
    }

    #[test]
    fn test_unbalanced() {
        assert!(tokenize("=SUM(A1").is_err());
        assert!(tokenize("=A1)").is_err());
        assert!(tokenize("=\"open").is_err());
    }
}
