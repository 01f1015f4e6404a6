// Formula tokenizing, parsing and translation

pub mod expr;
pub mod functions;
pub mod parser;
pub mod tokenizer;

pub use expr::{BinaryOp, Expr, UnaryOp};
pub use functions::{list_functions, Function};
pub use parser::{parse_expression, parse_formula, OperandResolver};
pub use tokenizer::{tokenize, Token, TokenKind, TokenSubtype};
