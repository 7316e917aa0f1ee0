// src/core/expr.rs
//! Symbolic expression trees for metric components and everything derived
//! from them. The tensor pipeline only goes through the public calls here
//! (differentiate, substitute, evaluate, render); it never matches on the
//! variants directly.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
}

impl Func {
    pub fn name(&self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Sqrt => "sqrt",
        }
    }

    pub fn from_name(name: &str) -> Option<Func> {
        match name {
            "sin" => Some(Func::Sin),
            "cos" => Some(Func::Cos),
            "tan" => Some(Func::Tan),
            "exp" => Some(Func::Exp),
            "ln" | "log" => Some(Func::Ln),
            "sqrt" => Some(Func::Sqrt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(f64),
    Symbol(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Call(Func, Box<Expr>),
}

/// Numeric evaluation faults. Never smuggled out as NaN; the caller decides
/// whether a fault means "singularity" or "bad input".
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    UnknownSymbol(String),
    DivisionByZero,
    DomainFault(&'static str),
    NonFinite,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnknownSymbol(name) => write!(f, "unknown symbol '{}'", name),
            EvalError::DivisionByZero => write!(f, "division by zero"),
            EvalError::DomainFault(what) => write!(f, "domain fault in {}", what),
            EvalError::NonFinite => write!(f, "non-finite intermediate value"),
        }
    }
}

impl std::error::Error for EvalError {}

impl Expr {
    pub fn num(value: f64) -> Expr {
        Expr::Constant(value)
    }

    pub fn sym(name: impl Into<String>) -> Expr {
        Expr::Symbol(name.into())
    }

    pub fn zero() -> Expr {
        Expr::Constant(0.0)
    }

    pub fn one() -> Expr {
        Expr::Constant(1.0)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Constant(v) if *v == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Constant(v) if *v == 1.0)
    }

    // Smart constructors fold the trivial cases so unsimplified pipelines
    // still produce readable output; real canonicalization lives in
    // core::simplify.

    pub fn add(lhs: Expr, rhs: Expr) -> Expr {
        match (lhs, rhs) {
            (Expr::Constant(a), Expr::Constant(b)) => Expr::Constant(a + b),
            (l, r) if l.is_zero() => r,
            (l, r) if r.is_zero() => l,
            (l, r) => Expr::Add(Box::new(l), Box::new(r)),
        }
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
        match (lhs, rhs) {
            (Expr::Constant(a), Expr::Constant(b)) => Expr::Constant(a - b),
            (l, r) if r.is_zero() => l,
            (l, r) if l.is_zero() => Expr::neg(r),
            (l, r) => Expr::Sub(Box::new(l), Box::new(r)),
        }
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
        match (lhs, rhs) {
            (Expr::Constant(a), Expr::Constant(b)) => Expr::Constant(a * b),
            (l, r) if l.is_zero() || r.is_zero() => Expr::zero(),
            (l, r) if l.is_one() => r,
            (l, r) if r.is_one() => l,
            (l, r) => Expr::Mul(Box::new(l), Box::new(r)),
        }
    }

    pub fn div(num: Expr, den: Expr) -> Expr {
        match (num, den) {
            (n, d) if d.is_one() => n,
            (n, d) if n.is_zero() && !d.is_zero() => Expr::zero(),
            (Expr::Constant(a), Expr::Constant(b)) if b != 0.0 => Expr::Constant(a / b),
            (n, d) => Expr::Div(Box::new(n), Box::new(d)),
        }
    }

    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        match (base, exponent) {
            (b, e) if e.is_one() => b,
            (b, e) if e.is_zero() && !b.is_zero() => Expr::one(),
            (Expr::Constant(a), Expr::Constant(b)) => Expr::Constant(a.powf(b)),
            (b, e) => Expr::Pow(Box::new(b), Box::new(e)),
        }
    }

    pub fn neg(expr: Expr) -> Expr {
        match expr {
            Expr::Constant(v) => Expr::Constant(-v),
            Expr::Neg(inner) => *inner,
            e => Expr::Neg(Box::new(e)),
        }
    }

    pub fn call(func: Func, arg: Expr) -> Expr {
        Expr::Call(func, Box::new(arg))
    }

    pub fn sqrt(arg: Expr) -> Expr {
        Expr::call(Func::Sqrt, arg)
    }

    /// Partial derivative with respect to `var`.
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Constant(_) => Expr::zero(),
            Expr::Symbol(name) => {
                if name == var {
                    Expr::one()
                } else {
                    Expr::zero()
                }
            }
            Expr::Add(lhs, rhs) => Expr::add(lhs.diff(var), rhs.diff(var)),
            Expr::Sub(lhs, rhs) => Expr::sub(lhs.diff(var), rhs.diff(var)),
            Expr::Mul(lhs, rhs) => Expr::add(
                Expr::mul((**lhs).clone(), rhs.diff(var)),
                Expr::mul(lhs.diff(var), (**rhs).clone()),
            ),
            Expr::Div(num, den) => Expr::div(
                Expr::sub(
                    Expr::mul(num.diff(var), (**den).clone()),
                    Expr::mul((**num).clone(), den.diff(var)),
                ),
                Expr::pow((**den).clone(), Expr::num(2.0)),
            ),
            Expr::Pow(base, exponent) => {
                if exponent.free_symbols().is_empty() {
                    // d(b^c) = c * b^(c-1) * b'
                    Expr::mul(
                        Expr::mul(
                            (**exponent).clone(),
                            Expr::pow(
                                (**base).clone(),
                                Expr::sub((**exponent).clone(), Expr::one()),
                            ),
                        ),
                        base.diff(var),
                    )
                } else {
                    // d(b^e) = b^e * (e' ln b + e b'/b)
                    Expr::mul(
                        self.clone(),
                        Expr::add(
                            Expr::mul(exponent.diff(var), Expr::call(Func::Ln, (**base).clone())),
                            Expr::div(
                                Expr::mul((**exponent).clone(), base.diff(var)),
                                (**base).clone(),
                            ),
                        ),
                    )
                }
            }
            Expr::Neg(inner) => Expr::neg(inner.diff(var)),
            Expr::Call(func, arg) => {
                let u = (**arg).clone();
                let du = arg.diff(var);
                let outer = match func {
                    Func::Sin => Expr::call(Func::Cos, u),
                    Func::Cos => Expr::neg(Expr::call(Func::Sin, u)),
                    Func::Tan => {
                        return Expr::div(du, Expr::pow(Expr::call(Func::Cos, u), Expr::num(2.0)));
                    }
                    Func::Exp => Expr::call(Func::Exp, u),
                    Func::Ln => return Expr::div(du, u),
                    Func::Sqrt => {
                        return Expr::div(du, Expr::mul(Expr::num(2.0), Expr::sqrt(u)));
                    }
                };
                Expr::mul(outer, du)
            }
        }
    }

    /// Replaces symbols by expressions. Symbols absent from the map are
    /// left untouched.
    pub fn substitute(&self, map: &HashMap<String, Expr>) -> Expr {
        match self {
            Expr::Constant(_) => self.clone(),
            Expr::Symbol(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Expr::Add(l, r) => Expr::add(l.substitute(map), r.substitute(map)),
            Expr::Sub(l, r) => Expr::sub(l.substitute(map), r.substitute(map)),
            Expr::Mul(l, r) => Expr::mul(l.substitute(map), r.substitute(map)),
            Expr::Div(l, r) => Expr::div(l.substitute(map), r.substitute(map)),
            Expr::Pow(l, r) => Expr::pow(l.substitute(map), r.substitute(map)),
            Expr::Neg(inner) => Expr::neg(inner.substitute(map)),
            Expr::Call(func, arg) => Expr::call(*func, arg.substitute(map)),
        }
    }

    /// Convenience wrapper for numeric parameter substitution.
    pub fn substitute_values(&self, values: &HashMap<String, f64>) -> Expr {
        let map: HashMap<String, Expr> = values
            .iter()
            .map(|(name, v)| (name.clone(), Expr::num(*v)))
            .collect();
        self.substitute(&map)
    }

    /// Numeric evaluation. `pi` is always in scope.
    pub fn evaluate(&self, vars: &HashMap<String, f64>) -> Result<f64, EvalError> {
        let v = match self {
            Expr::Constant(value) => *value,
            Expr::Symbol(name) => match vars.get(name) {
                Some(value) => *value,
                None if name == "pi" => std::f64::consts::PI,
                None => return Err(EvalError::UnknownSymbol(name.clone())),
            },
            Expr::Add(l, r) => l.evaluate(vars)? + r.evaluate(vars)?,
            Expr::Sub(l, r) => l.evaluate(vars)? - r.evaluate(vars)?,
            Expr::Mul(l, r) => l.evaluate(vars)? * r.evaluate(vars)?,
            Expr::Div(l, r) => {
                let den = r.evaluate(vars)?;
                if den == 0.0 || den.abs() < 1e-150 {
                    return Err(EvalError::DivisionByZero);
                }
                l.evaluate(vars)? / den
            }
            Expr::Pow(b, e) => {
                let base = b.evaluate(vars)?;
                let exponent = e.evaluate(vars)?;
                base.powf(exponent)
            }
            Expr::Neg(inner) => -inner.evaluate(vars)?,
            Expr::Call(func, arg) => {
                let x = arg.evaluate(vars)?;
                match func {
                    Func::Sin => x.sin(),
                    Func::Cos => x.cos(),
                    Func::Tan => x.tan(),
                    Func::Exp => x.exp(),
                    Func::Ln => {
                        if x <= 0.0 {
                            return Err(EvalError::DomainFault("ln"));
                        }
                        x.ln()
                    }
                    Func::Sqrt => {
                        if x < 0.0 {
                            return Err(EvalError::DomainFault("sqrt"));
                        }
                        x.sqrt()
                    }
                }
            }
        };
        if v.is_finite() {
            Ok(v)
        } else {
            Err(EvalError::NonFinite)
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Constant(_) => {}
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Pow(l, r) => {
                l.collect_symbols(out);
                r.collect_symbols(out);
            }
            Expr::Neg(inner) => inner.collect_symbols(out),
            Expr::Call(_, arg) => arg.collect_symbols(out),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(..) => 3,
            Expr::Pow(..) => 4,
            _ => 5,
        }
    }

    fn fmt_child(&self, child: &Expr, f: &mut fmt::Formatter<'_>, tight: bool) -> fmt::Result {
        let need_parens = child.precedence() < self.precedence()
            || (tight && child.precedence() == self.precedence());
        if need_parens {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }

    /// LaTeX rendering for display layers.
    pub fn to_latex(&self) -> String {
        match self {
            Expr::Constant(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{}", *v as i64)
                } else {
                    format!("{}", v)
                }
            }
            Expr::Symbol(name) => match name.as_str() {
                "theta" => r"\theta".into(),
                "phi" => r"\phi".into(),
                "pi" => r"\pi".into(),
                "rho" => r"\rho".into(),
                _ => name.clone(),
            },
            Expr::Add(l, r) => format!("{} + {}", l.to_latex(), r.to_latex()),
            Expr::Sub(l, r) => {
                let rhs = if r.precedence() <= 1 {
                    format!("\\left({}\\right)", r.to_latex())
                } else {
                    r.to_latex()
                };
                format!("{} - {}", l.to_latex(), rhs)
            }
            Expr::Mul(l, r) => {
                let lhs = if l.precedence() < 2 {
                    format!("\\left({}\\right)", l.to_latex())
                } else {
                    l.to_latex()
                };
                let rhs = if r.precedence() < 2 {
                    format!("\\left({}\\right)", r.to_latex())
                } else {
                    r.to_latex()
                };
                format!("{} {}", lhs, rhs)
            }
            Expr::Div(l, r) => format!("\\frac{{{}}}{{{}}}", l.to_latex(), r.to_latex()),
            Expr::Pow(b, e) => {
                let base = if b.precedence() < 5 {
                    format!("\\left({}\\right)", b.to_latex())
                } else {
                    b.to_latex()
                };
                format!("{}^{{{}}}", base, e.to_latex())
            }
            Expr::Neg(inner) => {
                if inner.precedence() <= 1 {
                    format!("-\\left({}\\right)", inner.to_latex())
                } else {
                    format!("-{}", inner.to_latex())
                }
            }
            Expr::Call(Func::Sqrt, arg) => format!("\\sqrt{{{}}}", arg.to_latex()),
            Expr::Call(func, arg) => {
                format!("\\{}\\left({}\\right)", func.name(), arg.to_latex())
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{}", v)
                }
            }
            Expr::Symbol(name) => write!(f, "{}", name),
            Expr::Add(l, r) => {
                self.fmt_child(l, f, false)?;
                write!(f, " + ")?;
                self.fmt_child(r, f, false)
            }
            Expr::Sub(l, r) => {
                self.fmt_child(l, f, false)?;
                write!(f, " - ")?;
                self.fmt_child(r, f, true)
            }
            Expr::Mul(l, r) => {
                self.fmt_child(l, f, false)?;
                write!(f, "*")?;
                self.fmt_child(r, f, false)
            }
            Expr::Div(l, r) => {
                self.fmt_child(l, f, false)?;
                write!(f, "/")?;
                self.fmt_child(r, f, true)
            }
            Expr::Pow(b, e) => {
                self.fmt_child(b, f, true)?;
                write!(f, "^")?;
                self.fmt_child(e, f, false)
            }
            Expr::Neg(inner) => {
                write!(f, "-")?;
                self.fmt_child(inner, f, true)
            }
            Expr::Call(func, arg) => write!(f, "{}({})", func.name(), arg),
        }
    }
}
