//! Tiny s-expression-like reader for the CLI (SPEC_FULL §0). Understands
//! just enough Datomic-flavored query syntax to build a [`Query`] via
//! [`QueryBuilder`] — no general Datalog grammar, no rules, no recursion.
//!
//! Supported forms:
//! ```text
//! [:find ?e ?n
//!  :in $
//!  :where
//!  [?e :person/name ?n]
//!  [(> ?e 100)]
//!  [(day ?t) ?d]]
//! ```

use dlplanner::ast::builders::QueryBuilder;
use dlplanner::ast::{ArithOp, CompareOp, ExprFunction, TimeField};
use dlplanner::Query;

#[derive(Debug, Clone, PartialEq)]
enum Sexpr {
    Atom(String),
    List(Vec<Sexpr>),
}

#[derive(Debug)]
pub struct ReadError(String);

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '[' | ']' | '(' | ')' => {
                tokens.push(c.to_string());
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '"' => {
                chars.next();
                let mut s = String::from('"');
                for ch in chars.by_ref() {
                    s.push(ch);
                    if ch == '"' {
                        break;
                    }
                }
                tokens.push(s);
            }
            _ => {
                let mut s = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || matches!(ch, '[' | ']' | '(' | ')') {
                        break;
                    }
                    s.push(ch);
                    chars.next();
                }
                tokens.push(s);
            }
        }
    }
    tokens
}

fn parse_sexpr(tokens: &[String], pos: &mut usize) -> Result<Sexpr, ReadError> {
    let open = tokens.get(*pos).ok_or_else(|| ReadError("unexpected end of input".to_string()))?;
    let (close, list_kind) = match open.as_str() {
        "[" => ("]", true),
        "(" => (")", true),
        _ => (open.as_str(), false),
    };
    if !list_kind {
        *pos += 1;
        return Ok(Sexpr::Atom(open.clone()));
    }
    *pos += 1;
    let mut items = Vec::new();
    loop {
        let tok = tokens.get(*pos).ok_or_else(|| ReadError("unterminated list".to_string()))?;
        if tok == close {
            *pos += 1;
            return Ok(Sexpr::List(items));
        }
        items.push(parse_sexpr(tokens, pos)?);
    }
}

fn as_atom(s: &Sexpr) -> Result<&str, ReadError> {
    match s {
        Sexpr::Atom(text) => Ok(text),
        Sexpr::List(_) => Err(ReadError("expected an atom, found a list".to_string())),
    }
}

fn builtin_expr_function(name: &str) -> Option<ExprFunction> {
    match name {
        "+" => Some(ExprFunction::Arithmetic(ArithOp::Add)),
        "-" => Some(ExprFunction::Arithmetic(ArithOp::Sub)),
        "*" => Some(ExprFunction::Arithmetic(ArithOp::Mul)),
        "/" => Some(ExprFunction::Arithmetic(ArithOp::Div)),
        "str" => Some(ExprFunction::Concat),
        "identity" => Some(ExprFunction::Identity),
        "ground" => Some(ExprFunction::Ground),
        "year" => Some(ExprFunction::TimeExtract(TimeField::Year)),
        "month" => Some(ExprFunction::TimeExtract(TimeField::Month)),
        "day" => Some(ExprFunction::TimeExtract(TimeField::Day)),
        "hour" => Some(ExprFunction::TimeExtract(TimeField::Hour)),
        "minute" => Some(ExprFunction::TimeExtract(TimeField::Minute)),
        "second" => Some(ExprFunction::TimeExtract(TimeField::Second)),
        _ => None,
    }
}

fn compare_op(name: &str) -> Option<CompareOp> {
    match name {
        "=" => Some(CompareOp::Eq),
        "<" => Some(CompareOp::Lt),
        "<=" => Some(CompareOp::Le),
        ">" => Some(CompareOp::Gt),
        ">=" => Some(CompareOp::Ge),
        _ => None,
    }
}

/// Applies one `:where` clause form to `builder`.
fn apply_where_clause(mut builder: QueryBuilder, form: &Sexpr) -> Result<QueryBuilder, ReadError> {
    let items = match form {
        Sexpr::List(items) => items,
        Sexpr::Atom(_) => return Err(ReadError("a :where clause must be a list".to_string())),
    };

    // `[(fn args...) binding?]`
    if let Some(Sexpr::List(inner)) = items.first() {
        let head = as_atom(inner.first().ok_or_else(|| ReadError("empty function form".to_string()))?)?;
        let args: Vec<&str> =
            inner[1..].iter().map(as_atom).collect::<Result<Vec<_>, _>>()?;
        let binding = items.get(1).map(as_atom).transpose()?;

        if let Some(op) = compare_op(head) {
            if binding.is_none() && args.len() == 2 {
                builder = builder.comparison(op, args[0], args[1]);
                return Ok(builder);
            }
        }
        if head == "not=" && binding.is_none() && args.len() == 2 {
            builder = builder.not_equal(args[0], args[1]);
            return Ok(builder);
        }
        if let Some(b) = binding {
            let function = builtin_expr_function(head).unwrap_or_else(|| ExprFunction::Named(head.to_string()));
            builder = builder.expr(function, &args, b);
            return Ok(builder);
        }
        builder = builder.function_predicate(head, &args);
        return Ok(builder);
    }

    // `[e a v]` pattern.
    if items.len() == 3 {
        let e = as_atom(&items[0])?;
        let a = as_atom(&items[1])?;
        let v = as_atom(&items[2])?;
        builder = builder.pattern(e, a, v);
        return Ok(builder);
    }

    Err(ReadError(format!("unrecognized :where clause shape with {} elements", items.len())))
}

/// Reads a query from the embedded reader's s-expression syntax.
pub fn read_query(source: &str) -> Result<Query, ReadError> {
    let tokens = tokenize(source);
    if tokens.is_empty() {
        return Err(ReadError("empty input".to_string()));
    }
    let mut pos = 0;
    let top = parse_sexpr(&tokens, &mut pos)?;
    let items = match top {
        Sexpr::List(items) => items,
        Sexpr::Atom(_) => return Err(ReadError("query must be a list".to_string())),
    };

    let mut builder = QueryBuilder::new();
    let mut i = 0;
    while i < items.len() {
        match as_atom(&items[i])? {
            ":find" => {
                i += 1;
                while i < items.len() && as_atom(&items[i]).map(|a| !a.starts_with(':')).unwrap_or(false) {
                    builder = builder.find_var(as_atom(&items[i])?);
                    i += 1;
                }
            }
            ":in" => {
                i += 1;
                while i < items.len() && as_atom(&items[i]).map(|a| !a.starts_with(':')).unwrap_or(false) {
                    builder = builder.input(as_atom(&items[i])?);
                    i += 1;
                }
            }
            ":where" => {
                i += 1;
                while i < items.len() {
                    builder = apply_where_clause(builder, &items[i])?;
                    i += 1;
                }
            }
            other => return Err(ReadError(format!("unexpected keyword `{other}`"))),
        }
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_s1_scenario() {
        let query = read_query("[:find ?e ?n :where [?e :person/name ?n] [(> ?e 100)]]").unwrap();
        assert_eq!(query.find.len(), 2);
        assert_eq!(query.where_clauses.len(), 2);
    }

    #[test]
    fn reads_time_extraction_and_binding() {
        let query = read_query(
            "[:find ?b ?t :where [?b :price/time ?t] [(day ?t) ?d] [(= ?d 20)]]",
        )
        .unwrap();
        assert_eq!(query.where_clauses.len(), 3);
    }

    #[test]
    fn reads_inputs() {
        let query = read_query("[:find ?e :in $ ?min :where [?e :a ?v] [(> ?v ?min)]]").unwrap();
        assert_eq!(query.inputs.len(), 2);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(read_query("").is_err());
        assert!(read_query("not-a-list").is_err());
    }
}
