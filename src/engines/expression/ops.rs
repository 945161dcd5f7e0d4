use std::fmt;
use std::str::FromStr;

use crate::error::SymregError;

/// Bound applied to trigonometric arguments.
pub const TRIG_CLIP: f64 = 1e10;
/// Smallest argument handed to `ln`.
pub const LOG_FLOOR: f64 = 1e-10;
/// Symmetric bound applied to `exp` arguments.
pub const EXP_CLIP: f64 = 700.0;
/// Value returned by protected division when the divisor is zero.
pub const PROTECTED_DIV_VALUE: f64 = 1.0;

/// Operator symbols available to expression trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Sin,
    Cos,
    Tan,
    Log,
    Exp,
    Sqrt,
    Abs,
}

/// Pure function attached to an operator symbol.
#[derive(Clone, Copy)]
pub enum OpFn {
    Unary(fn(f64) -> f64),
    Binary(fn(f64, f64) -> f64),
}

/// Static description of one operator.
pub struct OperatorSpec {
    pub op: Op,
    pub alias: &'static str,
    pub function: OpFn,
}

// Indexed by `Op as usize`.
static OPERATOR_TABLE: [OperatorSpec; 11] = [
    OperatorSpec {
        op: Op::Add,
        alias: "+",
        function: OpFn::Binary(add),
    },
    OperatorSpec {
        op: Op::Sub,
        alias: "-",
        function: OpFn::Binary(sub),
    },
    OperatorSpec {
        op: Op::Mul,
        alias: "*",
        function: OpFn::Binary(mul),
    },
    OperatorSpec {
        op: Op::Div,
        alias: "/",
        function: OpFn::Binary(protected_div),
    },
    OperatorSpec {
        op: Op::Sin,
        alias: "sin",
        function: OpFn::Unary(clipped_sin),
    },
    OperatorSpec {
        op: Op::Cos,
        alias: "cos",
        function: OpFn::Unary(clipped_cos),
    },
    OperatorSpec {
        op: Op::Tan,
        alias: "tan",
        function: OpFn::Unary(clipped_tan),
    },
    OperatorSpec {
        op: Op::Log,
        alias: "log",
        function: OpFn::Unary(protected_log),
    },
    OperatorSpec {
        op: Op::Exp,
        alias: "exp",
        function: OpFn::Unary(clipped_exp),
    },
    OperatorSpec {
        op: Op::Sqrt,
        alias: "sqrt",
        function: OpFn::Unary(protected_sqrt),
    },
    OperatorSpec {
        op: Op::Abs,
        alias: "abs",
        function: OpFn::Unary(absolute),
    },
];

impl Op {
    pub const ALL: [Op; 11] = [
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Sin,
        Op::Cos,
        Op::Tan,
        Op::Log,
        Op::Exp,
        Op::Sqrt,
        Op::Abs,
    ];

    pub const BINARY: [Op; 4] = [Op::Add, Op::Sub, Op::Mul, Op::Div];

    pub const UNARY: [Op; 7] = [Op::Sin, Op::Cos, Op::Tan, Op::Log, Op::Exp, Op::Sqrt, Op::Abs];

    pub fn spec(self) -> &'static OperatorSpec {
        &OPERATOR_TABLE[self as usize]
    }

    pub fn alias(self) -> &'static str {
        self.spec().alias
    }

    pub fn function(self) -> OpFn {
        self.spec().function
    }

    pub fn arity(self) -> usize {
        match self.function() {
            OpFn::Unary(_) => 1,
            OpFn::Binary(_) => 2,
        }
    }

    pub fn is_binary(self) -> bool {
        self.arity() == 2
    }

    /// Operators sharing this operator's arity, itself included.
    pub fn same_arity(self) -> &'static [Op] {
        if self.is_binary() {
            &Self::BINARY
        } else {
            &Self::UNARY
        }
    }

    /// Applies the operator. `right` is ignored for unary operators and
    /// read as `0.0` when a binary operator is given `None`.
    pub fn apply(self, left: f64, right: Option<f64>) -> f64 {
        match self.function() {
            OpFn::Unary(f) => f(left),
            OpFn::Binary(f) => f(left, right.unwrap_or(0.0)),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

impl FromStr for Op {
    type Err = SymregError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Op::ALL
            .iter()
            .copied()
            .find(|op| op.alias() == s)
            .ok_or_else(|| SymregError::MalformedTree(format!("Unknown operator symbol: {}", s)))
    }
}

fn add(a: f64, b: f64) -> f64 {
    a + b
}

fn sub(a: f64, b: f64) -> f64 {
    a - b
}

fn mul(a: f64, b: f64) -> f64 {
    a * b
}

fn protected_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        PROTECTED_DIV_VALUE
    } else {
        a / b
    }
}

// Lower bound that lets NaN and +inf through unchanged.
fn clip_below(x: f64, floor: f64) -> f64 {
    if x < floor {
        floor
    } else {
        x
    }
}

fn clipped_sin(x: f64) -> f64 {
    x.clamp(-TRIG_CLIP, TRIG_CLIP).sin()
}

fn clipped_cos(x: f64) -> f64 {
    x.clamp(-TRIG_CLIP, TRIG_CLIP).cos()
}

fn clipped_tan(x: f64) -> f64 {
    x.clamp(-TRIG_CLIP, TRIG_CLIP).tan()
}

fn protected_log(x: f64) -> f64 {
    clip_below(x, LOG_FLOOR).ln()
}

fn clipped_exp(x: f64) -> f64 {
    x.clamp(-EXP_CLIP, EXP_CLIP).exp()
}

fn protected_sqrt(x: f64) -> f64 {
    clip_below(x, 0.0).sqrt()
}

fn absolute(x: f64) -> f64 {
    x.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_discriminants() {
        for op in Op::ALL {
            assert_eq!(op.spec().op, op);
        }
    }

    #[test]
    fn test_arity_partition() {
        assert!(Op::BINARY.iter().all(|op| op.arity() == 2));
        assert!(Op::UNARY.iter().all(|op| op.arity() == 1));
        assert_eq!(Op::BINARY.len() + Op::UNARY.len(), Op::ALL.len());
    }

    #[test]
    fn test_protected_division() {
        assert_eq!(Op::Div.apply(5.0, Some(0.0)), 1.0);
        assert_eq!(Op::Div.apply(0.0, Some(0.0)), 1.0);
        assert_eq!(Op::Div.apply(6.0, Some(3.0)), 2.0);
    }

    #[test]
    fn test_domain_clipping() {
        assert_eq!(Op::Log.apply(-4.0, None), LOG_FLOOR.ln());
        assert_eq!(Op::Log.apply(0.0, None), LOG_FLOOR.ln());
        assert_eq!(Op::Sqrt.apply(-9.0, None), 0.0);
        assert_eq!(Op::Exp.apply(1e6, None), EXP_CLIP.exp());
        assert!(Op::Exp.apply(1e6, None).is_finite());
        assert_eq!(Op::Exp.apply(-1e6, None), (-EXP_CLIP).exp());
        assert!(Op::Sin.apply(f64::INFINITY, None).is_finite());
        assert!(Op::Cos.apply(f64::NEG_INFINITY, None).is_finite());
        assert_eq!(Op::Abs.apply(-2.5, None), 2.5);
    }

    #[test]
    fn test_symbol_round_trip() {
        for op in Op::ALL {
            assert_eq!(op.to_string().parse::<Op>().unwrap(), op);
        }
        assert!("pow".parse::<Op>().is_err());
    }

    #[test]
    fn test_same_arity() {
        assert!(Op::Mul.same_arity().contains(&Op::Div));
        assert!(Op::Sqrt.same_arity().contains(&Op::Sin));
        assert!(!Op::Sqrt.same_arity().contains(&Op::Add));
    }
}
