//! Canonical AST rendering
//!
//! Every node prints back to DSL text: integers base-10, strings
//! single-quoted, binary operators spaced, keyword arguments as `k : v`.
//! This rendering is asserted by the parser tests.

use super::{AddOp, Arguments, CodeBlock, Expr, MulOp, RelOp, Statement, UnaryOp};

impl Expr {
    /// Render this expression as canonical DSL text
    pub fn as_string(&self) -> String {
        match self {
            Expr::Number(n) => n.to_string(),
            Expr::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Expr::String(s) => format!("'{}'", s),
            Expr::Identifier(name) => name.clone(),

            Expr::Array(elements) => {
                let inner = elements
                    .iter()
                    .map(|e| e.as_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{}]", inner)
            }

            Expr::Dict(pairs) => {
                let inner = pairs
                    .iter()
                    .map(|(k, v)| format!("{} : {}", k.as_string(), v.as_string()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}}}", inner)
            }

            Expr::Unary { op, rhs } => match op {
                UnaryOp::Neg => format!("-{}", rhs.as_string()),
            },

            Expr::Multiplicative { lhs, op, rhs } => {
                format!("{} {} {}", lhs.as_string(), op.as_str(), rhs.as_string())
            }

            Expr::Additive { lhs, op, rhs } => {
                format!("{} {} {}", lhs.as_string(), op.as_str(), rhs.as_string())
            }

            Expr::Relational { lhs, op, rhs } => {
                format!("{} {} {}", lhs.as_string(), op.as_str(), rhs.as_string())
            }

            Expr::Subscript { lhs, rhs } => {
                format!("{}[{}]", lhs.as_string(), rhs.as_string())
            }

            Expr::Assignment { lhs, rhs } => {
                format!("{} = {}", lhs.as_string(), rhs.as_string())
            }

            Expr::FunctionCall { callee, args } => {
                format!("{}({})", callee.as_string(), args.as_string())
            }

            Expr::MethodCall {
                receiver,
                name,
                args,
            } => {
                format!("{}.{}({})", receiver.as_string(), name, args.as_string())
            }
        }
    }
}

impl MulOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MulOp::Mul => "*",
            MulOp::Div => "/",
            MulOp::Mod => "%",
        }
    }
}

impl AddOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddOp::Add => "+",
            AddOp::Sub => "-",
        }
    }
}

impl RelOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::Ge => ">=",
            RelOp::Gt => ">",
            RelOp::And => "and",
            RelOp::Or => "or",
            RelOp::In => "in",
            RelOp::NotIn => "not in",
        }
    }
}

impl Arguments {
    /// Positional arguments first, then keyword pairs, comma separated
    pub fn as_string(&self) -> String {
        let pos = self
            .positional
            .iter()
            .map(|e| e.as_string())
            .collect::<Vec<_>>()
            .join(", ");
        let kw = self
            .keyword
            .iter()
            .map(|(k, v)| format!("{} : {}", k.as_string(), v.as_string()))
            .collect::<Vec<_>>()
            .join(", ");

        if !pos.is_empty() && !kw.is_empty() {
            format!("{}, {}", pos, kw)
        } else if !pos.is_empty() {
            pos
        } else {
            kw
        }
    }
}

impl Statement {
    pub fn as_string(&self) -> String {
        self.expr.as_string()
    }
}

impl CodeBlock {
    /// Statements joined by newlines
    pub fn as_string(&self) -> String {
        self.statements
            .iter()
            .map(|s| s.as_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_literals() {
        assert_eq!(Expr::Number(42).as_string(), "42");
        assert_eq!(Expr::Boolean(true).as_string(), "true");
        assert_eq!(Expr::Boolean(false).as_string(), "false");
        assert_eq!(Expr::String("foo".into()).as_string(), "'foo'");
        assert_eq!(Expr::Identifier("srcs".into()).as_string(), "srcs");
    }

    #[test]
    fn test_render_array_and_dict() {
        let arr = Expr::Array(vec![
            Expr::Number(1),
            Expr::String("b".into()),
            Expr::Identifier("c".into()),
        ]);
        assert_eq!(arr.as_string(), "[1, 'b', c]");

        let dict = Expr::Dict(vec![(Expr::String("k".into()), Expr::Number(1))]);
        assert_eq!(dict.as_string(), "{'k' : 1}");
    }

    #[test]
    fn test_render_operators() {
        let expr = Expr::Additive {
            lhs: Box::new(Expr::Number(5)),
            op: AddOp::Sub,
            rhs: Box::new(Expr::Number(4)),
        };
        assert_eq!(expr.as_string(), "5 - 4");

        let expr = Expr::Relational {
            lhs: Box::new(Expr::Identifier("x".into())),
            op: RelOp::NotIn,
            rhs: Box::new(Expr::Identifier("y".into())),
        };
        assert_eq!(expr.as_string(), "x not in y");
    }

    #[test]
    fn test_render_calls() {
        let call = Expr::FunctionCall {
            callee: Box::new(Expr::Identifier("func".into())),
            args: Arguments {
                positional: vec![Expr::Identifier("a".into()), Expr::Identifier("b".into())],
                keyword: vec![(Expr::Identifier("x".into()), Expr::String("f".into()))],
            },
        };
        assert_eq!(call.as_string(), "func(a, b, x : 'f')");

        let method = Expr::MethodCall {
            receiver: Box::new(Expr::Identifier("meson".into())),
            name: "get_compiler".into(),
            args: Arguments {
                positional: vec![Expr::String("cpp".into())],
                keyword: vec![],
            },
        };
        assert_eq!(method.as_string(), "meson.get_compiler('cpp')");
    }
}
