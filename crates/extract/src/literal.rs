//! Recognition of literal string sequences.
//!
//! Only sequences whose every element is a string literal are accepted.
//! Anything computed (a path to another item, a method call, a format
//! macro) is rejected as a whole rather than partially resolved.

use syn::{Expr, ExprLit, Lit, LitStr, Macro, Token, punctuated::Punctuated};

/// Returns the strings of `expr` if it is a literal sequence of string
/// literals: `["a"]`, `&["a"]`, `("a", "b")` or `vec!["a"]`.
pub(crate) fn string_sequence(expr: &Expr) -> Option<Vec<String>> {
    match expr {
        Expr::Array(array) => array.elems.iter().map(string_literal).collect(),
        Expr::Tuple(tuple) => tuple.elems.iter().map(string_literal).collect(),
        Expr::Reference(reference) => string_sequence(&reference.expr),
        Expr::Paren(paren) => string_sequence(&paren.expr),
        Expr::Group(group) => string_sequence(&group.expr),
        Expr::Macro(expr_macro) => vec_macro(&expr_macro.mac),
        _ => None,
    }
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(lit), ..
        }) => Some(lit.value()),
        Expr::Group(group) => string_literal(&group.expr),
        _ => None,
    }
}

fn vec_macro(mac: &Macro) -> Option<Vec<String>> {
    if !mac.path.is_ident("vec") {
        return None;
    }
    let elems = mac
        .parse_body_with(Punctuated::<LitStr, Token![,]>::parse_terminated)
        .ok()?;
    Some(elems.iter().map(LitStr::value).collect())
}
