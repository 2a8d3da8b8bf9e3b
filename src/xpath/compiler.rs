//! Expression compiler.
//!
//! Flattens the parsed AST into a linear op list the stack machine in
//! `eval` runs. Compiled programs carry no namespace bindings: prefix
//! name tests stay symbolic and resolve per evaluation call, which is
//! what makes them safe to cache.

use super::parser::{self, Axis, BinaryOp, Expr, NodeTest, Step};

/// Compiled expression program
#[derive(Debug, Clone)]
pub struct Compiled {
    pub ops: Vec<Op>,
}

/// One stack-machine operation
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the (virtual) document node
    Root,
    /// Push the context node
    Context,
    /// Replace the top node-set by navigating one step
    Navigate(Axis, NodeTest),
    /// Filter the top node-set through a predicate program
    Predicate(Box<Compiled>),
    /// Merge the two top node-sets
    Union,
    Number(f64),
    Literal(String),
    /// Call a function with N stacked arguments
    Call(String, usize),
    Binary(BinaryOp),
}

/// Compile an expression string
pub fn compile(input: &str) -> Result<Compiled, String> {
    let expr = parser::parse(input)?;
    let mut ops = Vec::new();
    compile_expr(&expr, &mut ops);
    Ok(Compiled { ops })
}

fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) {
    match expr {
        Expr::Root => ops.push(Op::Root),
        Expr::Context => ops.push(Op::Context),
        Expr::Number(n) => ops.push(Op::Number(*n)),
        Expr::Literal(s) => ops.push(Op::Literal(s.clone())),
        Expr::Binary(left, op, right) => {
            compile_expr(left, ops);
            compile_expr(right, ops);
            ops.push(Op::Binary(*op));
        }
        Expr::Union(left, right) => {
            compile_expr(left, ops);
            compile_expr(right, ops);
            ops.push(Op::Union);
        }
        Expr::Path(base, step) => {
            compile_expr(base, ops);
            compile_step(step, ops);
        }
        Expr::Step(step) => {
            ops.push(Op::Context);
            compile_step(step, ops);
        }
        Expr::Function(name, args) => {
            for arg in args {
                compile_expr(arg, ops);
            }
            ops.push(Op::Call(name.clone(), args.len()));
        }
    }
}

fn compile_step(step: &Step, ops: &mut Vec<Op>) {
    ops.push(Op::Navigate(step.axis, step.test.clone()));
    for predicate in &step.predicates {
        let mut inner = Vec::new();
        compile_expr(predicate, &mut inner);
        ops.push(Op::Predicate(Box::new(Compiled { ops: inner })));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_absolute() {
        let compiled = compile("/root").unwrap();
        assert!(matches!(compiled.ops[0], Op::Root));
        assert!(matches!(compiled.ops[1], Op::Navigate(Axis::Child, _)));
    }

    #[test]
    fn test_compile_relative_uses_context() {
        let compiled = compile("item").unwrap();
        assert!(matches!(compiled.ops[0], Op::Context));
    }

    #[test]
    fn test_compile_predicate_nests() {
        let compiled = compile("//a[2]").unwrap();
        assert!(compiled
            .ops
            .iter()
            .any(|op| matches!(op, Op::Predicate(_))));
    }

    #[test]
    fn test_compile_rejects_bad_syntax() {
        assert!(compile("//").is_err());
    }
}
