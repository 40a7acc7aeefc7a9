//! The three declaration forms, tried in priority order.

use syn::{Expr, File, ImplItem, Item, ItemFn, ItemImpl, Stmt, Type};

use crate::{
    CAPABILITY_TYPES, Extraction, TASK_BINDING, TASK_FACTORY, TaskOrigin,
    literal::string_sequence,
};

pub(crate) fn apply(file: &File) -> Extraction {
    let rules: [(TaskOrigin, fn(&File) -> Option<Vec<String>>); 3] = [
        (TaskOrigin::ModuleBinding, module_binding),
        (TaskOrigin::CapabilityType, capability_type),
        (TaskOrigin::Factory, factory),
    ];

    for (origin, rule) in rules {
        if let Some(tasks) = rule(file).filter(|t| !t.is_empty()) {
            return Extraction {
                tasks,
                origin: Some(origin),
            };
        }
    }
    Extraction::default()
}

fn is_binding(ident: &syn::Ident) -> bool {
    ident.to_string().eq_ignore_ascii_case(TASK_BINDING)
}

/// `const TASKS` / `static TASKS` directly at file level.
fn module_binding(file: &File) -> Option<Vec<String>> {
    file.items
        .iter()
        .filter_map(|item| match item {
            Item::Const(c) if is_binding(&c.ident) => Some(&*c.expr),
            Item::Static(s) if is_binding(&s.ident) => Some(&*s.expr),
            _ => None,
        })
        .find_map(non_empty_sequence)
}

/// Associated `TASKS` const in `impl Service` / `impl Trait for Plugin`.
fn capability_type(file: &File) -> Option<Vec<String>> {
    file.items
        .iter()
        .filter_map(|item| match item {
            Item::Impl(imp) if is_capability_impl(imp) => Some(imp),
            _ => None,
        })
        .flat_map(|imp| imp.items.iter())
        .filter_map(|item| match item {
            ImplItem::Const(c) if is_binding(&c.ident) => Some(&c.expr),
            _ => None,
        })
        .find_map(non_empty_sequence)
}

fn is_capability_impl(imp: &ItemImpl) -> bool {
    let Type::Path(path) = &*imp.self_ty else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|seg| CAPABILITY_TYPES.iter().any(|name| seg.ident == name))
}

/// Zero-argument `fn get_tasks()` at file level.
fn factory(file: &File) -> Option<Vec<String>> {
    file.items
        .iter()
        .filter_map(|item| match item {
            Item::Fn(f) if f.sig.ident == TASK_FACTORY && f.sig.inputs.is_empty() => Some(f),
            _ => None,
        })
        .find_map(|f| first_returned(f).and_then(non_empty_sequence))
}

/// The expression of the first top-level `return`, or the tail expression
/// when the body has no such `return`.
fn first_returned(f: &ItemFn) -> Option<&Expr> {
    let stmts = &f.block.stmts;
    for (i, stmt) in stmts.iter().enumerate() {
        match stmt {
            Stmt::Expr(Expr::Return(ret), _) => return ret.expr.as_deref(),
            Stmt::Expr(expr, None) if i + 1 == stmts.len() => return Some(expr),
            _ => {},
        }
    }
    None
}

fn non_empty_sequence(expr: &Expr) -> Option<Vec<String>> {
    string_sequence(expr).filter(|tasks| !tasks.is_empty())
}
