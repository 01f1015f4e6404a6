// Supported spreadsheet functions and their translations

use std::fmt;

use super::expr::{write_conditional, write_joined, Expr};
use crate::error::TranspileError;

/// The closed set of functions the transpiler understands. Anything else is
/// rejected as an unsupported construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    If,
    Or,
    Count,
    Sum,
    Average,
    GuardLimitLower,
    GuardLimitUpper,
}

/// (name as written in formulas, translation summary)
const FUNCTION_TABLE: [(Function, &str, &str); 7] = [
    (Function::If, "IF", "(t) if (cond) else (f)"),
    (Function::Or, "OR", "any([a, b, ...])"),
    (Function::Count, "COUNT", "count_non_empty([...])"),
    (Function::Sum, "SUM", "(sum_skip_empty([...]))"),
    (Function::Average, "AVERAGE", "(sum_skip_empty([...]) / count_non_empty([...]))"),
    (Function::GuardLimitLower, "GuardLimitLower", "vba_guard_limit_lower(...)"),
    (Function::GuardLimitUpper, "GuardLimitUpper", "vba_guard_limit_upper(...)"),
];

impl Function {
    /// Look up a function by name (case-insensitive, with or without the
    /// trailing "(" the tokenizer leaves on function openers).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_suffix('(').unwrap_or(name);
        FUNCTION_TABLE
            .iter()
            .find(|(_, n, _)| n.eq_ignore_ascii_case(name))
            .map(|(f, _, _)| *f)
    }

    pub fn name(self) -> &'static str {
        FUNCTION_TABLE
            .iter()
            .find(|(f, _, _)| *f == self)
            .map(|(_, n, _)| *n)
            .unwrap_or("?")
    }

    /// Build the translated expression from parsed arguments. `None` marks an
    /// empty argument (`IF(a,,b)`); ranges arrive as `Expr::List`.
    pub fn apply(self, args: Vec<Option<Expr>>) -> Result<Expr, TranspileError> {
        if self == Function::If {
            return translate_if(args);
        }
        let mut items = Vec::new();
        for arg in args.into_iter().flatten() {
            match arg {
                Expr::List(members) => items.extend(members),
                other => items.push(other),
            }
        }
        if items.is_empty() {
            return Err(TranspileError::parse(format!("{}() needs at least one argument", self.name())));
        }
        Ok(Expr::Call { func: self, args: items })
    }

    pub(crate) fn write_call(self, out: &mut String, args: &[Expr]) {
        match self {
            Function::If => {
                let missing = Expr::Bool(false);
                let cond = args.first().unwrap_or(&missing);
                let then = args.get(1).unwrap_or(&missing);
                let otherwise = args.get(2).unwrap_or(&missing);
                write_conditional(out, cond, then, otherwise);
            }
            Function::Or => {
                out.push_str("any([");
                write_joined(out, args);
                out.push_str("])");
            }
            Function::Count => {
                out.push_str("count_non_empty([");
                write_joined(out, args);
                out.push_str("])");
            }
            Function::Sum => {
                out.push_str("(sum_skip_empty([");
                write_joined(out, args);
                out.push_str("]))");
            }
            Function::Average => {
                out.push_str("(sum_skip_empty([");
                write_joined(out, args);
                out.push_str("]) / count_non_empty([");
                write_joined(out, args);
                out.push_str("]))");
            }
            Function::GuardLimitLower | Function::GuardLimitUpper => {
                out.push_str(if self == Function::GuardLimitLower {
                    "vba_guard_limit_lower("
                } else {
                    "vba_guard_limit_upper("
                });
                write_joined(out, args);
                out.push(')');
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// IF(cond, t[, f]). An omitted `f` yields False; an empty `t` or `f`
/// argument yields 0, as in the spreadsheet.
fn translate_if(args: Vec<Option<Expr>>) -> Result<Expr, TranspileError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(TranspileError::parse(format!("IF() takes 2 or 3 arguments, got {}", args.len())));
    }
    let mut args = args.into_iter();
    let cond = args
        .next()
        .flatten()
        .ok_or_else(|| TranspileError::parse("IF() condition is empty"))?;
    let then = args.next().flatten().unwrap_or_else(|| Expr::Number("0".into()));
    let otherwise = match args.next() {
        Some(arg) => arg.unwrap_or_else(|| Expr::Number("0".into())),
        None => Expr::Bool(false),
    };
    Ok(Expr::conditional(cond, then, otherwise))
}

/// Supported functions with a short description of their translation.
pub fn list_functions() -> Vec<(&'static str, &'static str)> {
    FUNCTION_TABLE.iter().map(|(_, name, summary)| (*name, *summary)).collect()
}
