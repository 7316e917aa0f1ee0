// src/core/simplify.rs
//! Canonicalizing simplifier.
//!
//! Expressions are rewritten as a ratio of multivariate polynomials with
//! exact rational coefficients over an atom basis: bare symbols plus opaque
//! subtrees (function calls, symbolic powers). Two reduction rules keep the
//! curvature chain honest:
//!   cos(u)^2  -> 1 - sin(u)^2
//!   sqrt(u)^2 -> u            (when u itself is polynomial)
//! Zero detection is therefore exact for the metrics this pipeline targets,
//! and rebuilding from the canonical form is deterministic, which makes the
//! whole pass idempotent.
//!
//! Every canonicalization step checks the per-request deadline; an expired
//! budget fails with `SimplificationTimeout` instead of handing an
//! unsimplified value forward as if it were final.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::core::error::CoreError;
use crate::core::expr::{Expr, Func};

/* ── Exact rational coefficients ─────────────────────────── */

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Ratio {
    num: i128,
    den: i128, // always > 0, gcd(num, den) == 1
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

impl Ratio {
    const ZERO: Ratio = Ratio { num: 0, den: 1 };
    const ONE: Ratio = Ratio { num: 1, den: 1 };

    fn new(num: i128, den: i128) -> Option<Ratio> {
        if den == 0 {
            return None;
        }
        let sign = if den < 0 { -1 } else { 1 };
        let g = gcd(num, den);
        Some(Ratio { num: sign * num / g, den: (den / g).abs() })
    }

    fn is_zero(&self) -> bool {
        self.num == 0
    }

    fn checked_add(&self, other: &Ratio) -> Option<Ratio> {
        let num = self
            .num
            .checked_mul(other.den)?
            .checked_add(other.num.checked_mul(self.den)?)?;
        Ratio::new(num, self.den.checked_mul(other.den)?)
    }

    fn checked_mul(&self, other: &Ratio) -> Option<Ratio> {
        Ratio::new(self.num.checked_mul(other.num)?, self.den.checked_mul(other.den)?)
    }

    fn checked_div(&self, other: &Ratio) -> Option<Ratio> {
        if other.num == 0 {
            return None;
        }
        Ratio::new(self.num.checked_mul(other.den)?, self.den.checked_mul(other.num)?)
    }

    fn neg(&self) -> Ratio {
        Ratio { num: -self.num, den: self.den }
    }

    fn recip(&self) -> Option<Ratio> {
        Ratio::new(self.den, self.num)
    }

    /// Best small-denominator rational for a parsed literal, by continued
    /// fractions. Values that cannot be pinned down exactly enough stay
    /// opaque to the canonicalizer.
    fn from_f64(v: f64) -> Option<Ratio> {
        if !v.is_finite() {
            return None;
        }
        if v == 0.0 {
            return Some(Ratio::ZERO);
        }
        if v.fract() == 0.0 && v.abs() < 9.0e15 {
            return Ratio::new(v as i128, 1);
        }
        let negative = v < 0.0;
        let mut x = v.abs();
        let (mut h0, mut h1, mut k0, mut k1) = (0i128, 1i128, 1i128, 0i128);
        for _ in 0..40 {
            let a = x.floor();
            if a > 1.0e18 {
                break;
            }
            let ai = a as i128;
            let h2 = ai.checked_mul(h1)?.checked_add(h0)?;
            let k2 = ai.checked_mul(k1)?.checked_add(k0)?;
            if k2 > 1_000_000_000 {
                break;
            }
            h0 = h1;
            h1 = h2;
            k0 = k1;
            k1 = k2;
            let approx = h1 as f64 / k1 as f64;
            if (approx - v.abs()).abs() <= 1e-12 * v.abs() {
                let num = if negative { -h1 } else { h1 };
                return Ratio::new(num, k1);
            }
            let frac = x - a;
            if frac.abs() < 1e-15 {
                break;
            }
            x = 1.0 / frac;
        }
        None
    }

    fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

/* ── Atoms, monomials, polynomials ───────────────────────── */

#[derive(Debug, Clone)]
enum Atom {
    Symbol(String),
    Sin(String, Expr),
    Cos(String, Expr),
    Sqrt(String, Expr),
    Opaque(String, Expr),
}

impl Atom {
    fn key(&self) -> String {
        match self {
            Atom::Symbol(name) => format!("sym:{}", name),
            Atom::Sin(arg, _) => format!("sin:{}", arg),
            Atom::Cos(arg, _) => format!("cos:{}", arg),
            Atom::Sqrt(arg, _) => format!("sqrt:{}", arg),
            Atom::Opaque(text, _) => format!("op:{}", text),
        }
    }

    fn rebuild(&self) -> Expr {
        match self {
            Atom::Symbol(name) => Expr::sym(name.clone()),
            Atom::Sin(_, arg) => Expr::call(Func::Sin, arg.clone()),
            Atom::Cos(_, arg) => Expr::call(Func::Cos, arg.clone()),
            Atom::Sqrt(_, arg) => Expr::sqrt(arg.clone()),
            Atom::Opaque(_, expr) => expr.clone(),
        }
    }
}

type Monomial = BTreeMap<String, u32>;
type Poly = BTreeMap<Monomial, Ratio>;

fn poly_zero() -> Poly {
    Poly::new()
}

fn poly_const(c: Ratio) -> Poly {
    let mut p = Poly::new();
    if !c.is_zero() {
        p.insert(Monomial::new(), c);
    }
    p
}

fn poly_is_const(p: &Poly) -> Option<Ratio> {
    if p.is_empty() {
        return Some(Ratio::ZERO);
    }
    if p.len() == 1 {
        let (mono, coeff) = p.iter().next().unwrap();
        if mono.is_empty() {
            return Some(*coeff);
        }
    }
    None
}

/// Graded-lex comparison; a proper monomial order so the division loop in
/// `poly_div_exact` terminates.
fn cmp_mono(a: &Monomial, b: &Monomial) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    let da: u64 = a.values().map(|&e| e as u64).sum();
    let db: u64 = b.values().map(|&e| e as u64).sum();
    match da.cmp(&db) {
        Ordering::Equal => {}
        other => return other,
    }
    let keys: std::collections::BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    for key in keys {
        let ea = a.get(key).copied().unwrap_or(0);
        let eb = b.get(key).copied().unwrap_or(0);
        match ea.cmp(&eb) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

fn leading<'a>(p: &'a Poly) -> Option<(&'a Monomial, &'a Ratio)> {
    p.iter().max_by(|a, b| cmp_mono(a.0, b.0))
}

fn monomial_mul(a: &Monomial, b: &Monomial) -> Monomial {
    let mut out = a.clone();
    for (key, exp) in b {
        *out.entry(key.clone()).or_insert(0) += exp;
    }
    out
}

/// a / b, or None when b does not divide a.
fn monomial_div(a: &Monomial, b: &Monomial) -> Option<Monomial> {
    let mut out = a.clone();
    for (key, exp) in b {
        let have = out.get_mut(key)?;
        if *have < *exp {
            return None;
        }
        *have -= exp;
        if *have == 0 {
            out.remove(key);
        }
    }
    Some(out)
}

#[derive(Debug)]
enum CanonError {
    /// Deadline expired; surfaces as SimplificationTimeout.
    Timeout,
    /// Coefficient overflow, zero denominator, or an unsupported shape;
    /// the caller falls back to the original expression.
    Bail,
}

/* ── Options & entry points ──────────────────────────────── */

#[derive(Debug, Clone, Copy)]
pub struct SimplifyOptions {
    pub enabled: bool,
    pub deadline: Option<Instant>,
}

impl SimplifyOptions {
    pub fn enabled() -> Self {
        SimplifyOptions { enabled: true, deadline: None }
    }

    pub fn disabled() -> Self {
        SimplifyOptions { enabled: false, deadline: None }
    }

    pub fn with_timeout(budget: Duration) -> Self {
        SimplifyOptions { enabled: true, deadline: Some(Instant::now() + budget) }
    }
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        SimplifyOptions::enabled()
    }
}

pub struct Simplifier {
    options: SimplifyOptions,
    atoms: BTreeMap<String, Atom>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroCheck {
    /// Canonical form is the zero polynomial.
    Zero,
    /// Canonical form is provably nonzero (a nonzero constant).
    NonZeroConstant,
    /// Canonical form is a non-constant expression; undecided symbolically.
    Undecided,
}

impl Simplifier {
    pub fn new(options: SimplifyOptions) -> Self {
        Simplifier { options, atoms: BTreeMap::new() }
    }

    /// Canonicalize and rebuild. With simplification disabled this is the
    /// identity; shapes the canonicalizer cannot express come back
    /// unchanged rather than mangled.
    pub fn simplify(&mut self, expr: &Expr) -> Result<Expr, CoreError> {
        if !self.options.enabled {
            return Ok(expr.clone());
        }
        match self.canonicalize(expr) {
            Ok(ratexpr) => Ok(self.rebuild(&ratexpr)),
            Err(CanonError::Timeout) => Err(CoreError::simplification_timeout(
                "simplification budget expired before a canonical form was reached",
            )),
            Err(CanonError::Bail) => Ok(expr.clone()),
        }
    }

    /// Decides whether `expr` is exactly zero, where possible.
    pub fn check_zero(&mut self, expr: &Expr) -> Result<ZeroCheck, CoreError> {
        match self.canonicalize(expr) {
            Ok(ratexpr) => {
                if ratexpr.num.is_empty() {
                    Ok(ZeroCheck::Zero)
                } else if poly_is_const(&ratexpr.num).is_some()
                    && poly_is_const(&ratexpr.den).is_some()
                {
                    Ok(ZeroCheck::NonZeroConstant)
                } else {
                    Ok(ZeroCheck::Undecided)
                }
            }
            Err(CanonError::Timeout) => Err(CoreError::simplification_timeout(
                "simplification budget expired during zero check",
            )),
            Err(CanonError::Bail) => Ok(ZeroCheck::Undecided),
        }
    }

    fn check_deadline(&self) -> Result<(), CanonError> {
        if let Some(deadline) = self.options.deadline {
            if Instant::now() > deadline {
                return Err(CanonError::Timeout);
            }
        }
        Ok(())
    }

    /* ── Canonicalization ────────────────────────────────── */

    fn canonicalize(&mut self, expr: &Expr) -> Result<RatExpr, CanonError> {
        self.check_deadline()?;
        match expr {
            Expr::Constant(v) => {
                let c = Ratio::from_f64(*v).ok_or(CanonError::Bail)?;
                Ok(RatExpr::constant(c))
            }
            Expr::Symbol(name) => Ok(self.atom_ratexpr(Atom::Symbol(name.clone()))),
            Expr::Add(l, r) => {
                let a = self.canonicalize(l)?;
                let b = self.canonicalize(r)?;
                self.rat_add(&a, &b)
            }
            Expr::Sub(l, r) => {
                let a = self.canonicalize(l)?;
                let b = self.canonicalize(r)?.negated();
                self.rat_add(&a, &b)
            }
            Expr::Mul(l, r) => {
                let a = self.canonicalize(l)?;
                let b = self.canonicalize(r)?;
                self.rat_mul(&a, &b)
            }
            Expr::Div(l, r) => {
                let a = self.canonicalize(l)?;
                let b = self.canonicalize(r)?;
                let inv = b.inverted().ok_or(CanonError::Bail)?;
                self.rat_mul(&a, &inv)
            }
            Expr::Neg(inner) => Ok(self.canonicalize(inner)?.negated()),
            Expr::Pow(base, exponent) => {
                let e = self.canonicalize(exponent)?;
                if let (Some(c), true) = (poly_is_const(&e.num), poly_is_const(&e.den) == Some(Ratio::ONE)) {
                    if c.den == 1 && c.num.abs() <= 32 {
                        let b = self.canonicalize(base)?;
                        return self.rat_pow(&b, c.num as i32);
                    }
                }
                // symbolic or fractional exponent stays opaque
                let text = format!("{}", expr);
                Ok(self.atom_ratexpr(Atom::Opaque(text, expr.clone())))
            }
            Expr::Call(func, arg) => {
                let canon_arg = self.canonicalize(arg)?;
                let arg_expr = self.rebuild(&canon_arg);
                let arg_key = format!("{}", arg_expr);
                if canon_arg.num.is_empty() {
                    // argument is exactly zero
                    return match func {
                        Func::Sin | Func::Tan | Func::Sqrt => Ok(RatExpr::constant(Ratio::ZERO)),
                        Func::Cos | Func::Exp => Ok(RatExpr::constant(Ratio::ONE)),
                        Func::Ln => Err(CanonError::Bail),
                    };
                }
                match func {
                    Func::Sin => Ok(self.atom_ratexpr(Atom::Sin(arg_key, arg_expr))),
                    Func::Cos => Ok(self.atom_ratexpr(Atom::Cos(arg_key, arg_expr))),
                    Func::Tan => {
                        // tan -> sin/cos so the Pythagorean rule can see it
                        let sin = self.atom_ratexpr(Atom::Sin(arg_key.clone(), arg_expr.clone()));
                        let cos = self.atom_ratexpr(Atom::Cos(arg_key, arg_expr));
                        let inv = cos.inverted().ok_or(CanonError::Bail)?;
                        self.rat_mul(&sin, &inv)
                    }
                    Func::Sqrt => {
                        // rationalize sqrt(p/q) -> sqrt(p*q)/q so the
                        // sqrt^2 reduction always sees a polynomial inner;
                        // assumes q > 0 where the root is real
                        if poly_is_const(&canon_arg.den).is_none() {
                            let pq = self.poly_mul(&canon_arg.num, &canon_arg.den)?;
                            let inner = RatExpr { num: pq, den: poly_const(Ratio::ONE) };
                            let inner_expr = self.rebuild(&inner);
                            let inner_key = format!("{}", inner_expr);
                            let root = self.atom_ratexpr(Atom::Sqrt(inner_key, inner_expr));
                            let q = RatExpr { num: canon_arg.den.clone(), den: poly_const(Ratio::ONE) };
                            let inv = q.inverted().ok_or(CanonError::Bail)?;
                            return self.rat_mul(&root, &inv);
                        }
                        Ok(self.atom_ratexpr(Atom::Sqrt(arg_key, arg_expr)))
                    }
                    Func::Exp | Func::Ln => {
                        let rebuilt = Expr::call(*func, arg_expr);
                        let text = format!("{}", rebuilt);
                        Ok(self.atom_ratexpr(Atom::Opaque(text, rebuilt)))
                    }
                }
            }
        }
    }

    fn atom_ratexpr(&mut self, atom: Atom) -> RatExpr {
        let key = atom.key();
        self.atoms.entry(key.clone()).or_insert(atom);
        let mut mono = Monomial::new();
        mono.insert(key, 1);
        let mut num = Poly::new();
        num.insert(mono, Ratio::ONE);
        RatExpr { num, den: poly_const(Ratio::ONE) }
    }

    /* ── Polynomial arithmetic (reduction-aware) ─────────── */

    /// Inserts coeff*mono into `out`, applying the cos^2 and sqrt^2
    /// reductions until the monomial is in normal form.
    fn poly_accumulate(&mut self, out: &mut Poly, mono: Monomial, coeff: Ratio) -> Result<(), CanonError> {
        self.check_deadline()?;
        if coeff.is_zero() {
            return Ok(());
        }
        // cos(u)^2 -> 1 - sin(u)^2
        let cos_key = mono
            .iter()
            .find(|(key, exp)| key.starts_with("cos:") && **exp >= 2)
            .map(|(key, _)| key.clone());
        if let Some(key) = cos_key {
            let arg = match self.atoms.get(&key) {
                Some(Atom::Cos(arg_key, arg_expr)) => (arg_key.clone(), arg_expr.clone()),
                _ => return Err(CanonError::Bail),
            };
            let mut rest = mono.clone();
            let exp = rest.get_mut(&key).unwrap();
            *exp -= 2;
            if *exp == 0 {
                rest.remove(&key);
            }
            // rest * (1 - sin^2)
            self.poly_accumulate(out, rest.clone(), coeff)?;
            let sin_atom = Atom::Sin(arg.0, arg.1);
            let sin_key = sin_atom.key();
            self.atoms.entry(sin_key.clone()).or_insert(sin_atom);
            let mut with_sin = rest;
            *with_sin.entry(sin_key).or_insert(0) += 2;
            return self.poly_accumulate(out, with_sin, coeff.neg());
        }
        // sqrt(u)^2 -> u, only when u is itself polynomial with a constant
        // denominator; anything else is left alone
        let sqrt_key = mono
            .iter()
            .find(|(key, exp)| key.starts_with("sqrt:") && **exp >= 2)
            .map(|(key, _)| key.clone());
        if let Some(key) = sqrt_key {
            let inner_expr = match self.atoms.get(&key) {
                Some(Atom::Sqrt(_, arg_expr)) => arg_expr.clone(),
                _ => return Err(CanonError::Bail),
            };
            let inner = match self.canonicalize(&inner_expr) {
                Ok(inner) => Some(inner),
                Err(CanonError::Timeout) => return Err(CanonError::Timeout),
                Err(CanonError::Bail) => None,
            };
            if let Some(inner) = inner {
                if let Some(den_const) = poly_is_const(&inner.den) {
                    if !den_const.is_zero() {
                        let mut rest = mono.clone();
                        let exp = rest.get_mut(&key).unwrap();
                        *exp -= 2;
                        if *exp == 0 {
                            rest.remove(&key);
                        }
                        let scale = coeff.checked_div(&den_const).ok_or(CanonError::Bail)?;
                        for (imono, icoeff) in inner.num {
                            let merged = monomial_mul(&rest, &imono);
                            let c = scale.checked_mul(&icoeff).ok_or(CanonError::Bail)?;
                            self.poly_accumulate(out, merged, c)?;
                        }
                        return Ok(());
                    }
                }
            }
            // fall through: opaque sqrt power stays as-is
        }
        match out.get_mut(&mono) {
            Some(existing) => {
                let sum = existing.checked_add(&coeff).ok_or(CanonError::Bail)?;
                if sum.is_zero() {
                    out.remove(&mono);
                } else {
                    *existing = sum;
                }
            }
            None => {
                out.insert(mono, coeff);
            }
        }
        Ok(())
    }

    fn poly_add(&mut self, a: &Poly, b: &Poly) -> Result<Poly, CanonError> {
        let mut out = a.clone();
        for (mono, coeff) in b {
            self.poly_accumulate(&mut out, mono.clone(), *coeff)?;
        }
        Ok(out)
    }

    fn poly_mul(&mut self, a: &Poly, b: &Poly) -> Result<Poly, CanonError> {
        let mut out = poly_zero();
        for (ma, ca) in a {
            self.check_deadline()?;
            for (mb, cb) in b {
                let mono = monomial_mul(ma, mb);
                let coeff = ca.checked_mul(cb).ok_or(CanonError::Bail)?;
                self.poly_accumulate(&mut out, mono, coeff)?;
            }
        }
        Ok(out)
    }

    fn poly_neg(&self, p: &Poly) -> Poly {
        p.iter().map(|(m, c)| (m.clone(), c.neg())).collect()
    }

    fn poly_scale(&self, p: &Poly, s: Ratio) -> Result<Poly, CanonError> {
        let mut out = Poly::new();
        for (m, c) in p {
            let scaled = c.checked_mul(&s).ok_or(CanonError::Bail)?;
            if !scaled.is_zero() {
                out.insert(m.clone(), scaled);
            }
        }
        Ok(out)
    }

    /// Exact multivariate division; None when `den` does not divide `num`.
    fn poly_div_exact(&mut self, num: &Poly, den: &Poly) -> Result<Option<Poly>, CanonError> {
        let (dlm, dlc) = match leading(den) {
            Some(lead) => (lead.0.clone(), *lead.1),
            None => return Ok(None),
        };
        let mut rem = num.clone();
        let mut quot = Poly::new();
        let mut steps = 0usize;
        while !rem.is_empty() {
            self.check_deadline()?;
            steps += 1;
            if steps > 10_000 {
                return Err(CanonError::Bail);
            }
            let (rlm, rlc) = {
                let lead = leading(&rem).unwrap();
                (lead.0.clone(), *lead.1)
            };
            let qm = match monomial_div(&rlm, &dlm) {
                Some(qm) => qm,
                None => return Ok(None),
            };
            let qc = rlc.checked_div(&dlc).ok_or(CanonError::Bail)?;
            // rem -= (qm, qc) * den — raw products only; a reduction firing
            // here would invalidate the cancellation, so reject those
            for (dm, dc) in den.iter() {
                let pm = monomial_mul(&qm, dm);
                if needs_reduction(&pm) {
                    return Ok(None);
                }
                let pc = qc.checked_mul(dc).ok_or(CanonError::Bail)?.neg();
                match rem.get_mut(&pm) {
                    Some(existing) => {
                        let sum = existing.checked_add(&pc).ok_or(CanonError::Bail)?;
                        if sum.is_zero() {
                            rem.remove(&pm);
                        } else {
                            *existing = sum;
                        }
                    }
                    None => {
                        if !pc.is_zero() {
                            rem.insert(pm, pc);
                        }
                    }
                }
            }
            quot.insert(qm, qc);
        }
        Ok(Some(quot))
    }

    /* ── Rational-expression arithmetic ──────────────────── */

    fn rat_add(&mut self, a: &RatExpr, b: &RatExpr) -> Result<RatExpr, CanonError> {
        // a/b + c/d = (ad + cb) / bd
        let ad = self.poly_mul(&a.num, &b.den)?;
        let cb = self.poly_mul(&b.num, &a.den)?;
        let num = self.poly_add(&ad, &cb)?;
        let den = self.poly_mul(&a.den, &b.den)?;
        self.rat_normalize(RatExpr { num, den })
    }

    fn rat_mul(&mut self, a: &RatExpr, b: &RatExpr) -> Result<RatExpr, CanonError> {
        let num = self.poly_mul(&a.num, &b.num)?;
        let den = self.poly_mul(&a.den, &b.den)?;
        self.rat_normalize(RatExpr { num, den })
    }

    fn rat_pow(&mut self, base: &RatExpr, exponent: i32) -> Result<RatExpr, CanonError> {
        if exponent == 0 {
            if base.num.is_empty() {
                return Err(CanonError::Bail); // 0^0
            }
            return Ok(RatExpr::constant(Ratio::ONE));
        }
        let flipped;
        let b = if exponent < 0 {
            flipped = base.inverted().ok_or(CanonError::Bail)?;
            &flipped
        } else {
            base
        };
        let mut out = RatExpr::constant(Ratio::ONE);
        for _ in 0..exponent.unsigned_abs() {
            out = self.rat_mul(&out, b)?;
        }
        Ok(out)
    }

    /// Canonical scale + cancellation.
    fn rat_normalize(&mut self, r: RatExpr) -> Result<RatExpr, CanonError> {
        let mut num = r.num;
        let mut den = r.den;
        if den.is_empty() {
            return Err(CanonError::Bail);
        }
        if num.is_empty() {
            return Ok(RatExpr { num, den: poly_const(Ratio::ONE) });
        }
        if num == den {
            return Ok(RatExpr::constant(Ratio::ONE));
        }
        // shared monomial content
        let content = common_content(&num, &den);
        if !content.is_empty() {
            num = strip_content(&num, &content);
            den = strip_content(&den, &content);
        }
        // exact division either way
        if let Some(q) = self.poly_div_exact(&num, &den)? {
            return Ok(RatExpr { num: q, den: poly_const(Ratio::ONE) });
        }
        if let Some(q) = self.poly_div_exact(&den, &num)? {
            if let Some(c) = poly_is_const(&q) {
                if !c.is_zero() {
                    let recip = c.recip().ok_or(CanonError::Bail)?;
                    return Ok(RatExpr { num: poly_const(recip), den: poly_const(Ratio::ONE) });
                }
            } else {
                num = poly_const(Ratio::ONE);
                den = q;
            }
        }
        // monic denominator so equal values share one spelling
        let lead = *leading(&den).unwrap().1;
        if lead != Ratio::ONE {
            let inv = lead.recip().ok_or(CanonError::Bail)?;
            num = self.poly_scale(&num, inv)?;
            den = self.poly_scale(&den, inv)?;
        }
        Ok(RatExpr { num, den })
    }

    /* ── Rebuild ─────────────────────────────────────────── */

    fn rebuild(&self, r: &RatExpr) -> Expr {
        let num = self.rebuild_poly(&r.num);
        match poly_is_const(&r.den) {
            Some(c) if c == Ratio::ONE => num,
            _ => Expr::div(num, self.rebuild_poly(&r.den)),
        }
    }

    fn rebuild_poly(&self, p: &Poly) -> Expr {
        if p.is_empty() {
            return Expr::zero();
        }
        let mut acc: Option<Expr> = None;
        for (mono, coeff) in p {
            let negative = coeff.num < 0;
            let magnitude = if negative { coeff.neg() } else { *coeff };
            let term = self.rebuild_term(mono, magnitude);
            acc = Some(match acc {
                None => {
                    if negative {
                        Expr::neg(term)
                    } else {
                        term
                    }
                }
                Some(prev) => {
                    if negative {
                        Expr::sub(prev, term)
                    } else {
                        Expr::add(prev, term)
                    }
                }
            });
        }
        acc.unwrap_or_else(Expr::zero)
    }

    fn rebuild_term(&self, mono: &Monomial, coeff: Ratio) -> Expr {
        let coeff_expr = if coeff.den == 1 {
            Expr::num(coeff.num as f64)
        } else {
            Expr::Div(
                Box::new(Expr::num(coeff.num as f64)),
                Box::new(Expr::num(coeff.den as f64)),
            )
        };
        let mut factors: Vec<Expr> = Vec::new();
        for (key, exp) in mono {
            let atom = match self.atoms.get(key) {
                Some(atom) => atom.rebuild(),
                None => continue,
            };
            if *exp == 1 {
                factors.push(atom);
            } else {
                factors.push(Expr::Pow(Box::new(atom), Box::new(Expr::num(*exp as f64))));
            }
        }
        if factors.is_empty() {
            return coeff_expr;
        }
        let mut iter = factors.into_iter();
        let mut out = iter.next().unwrap();
        for factor in iter {
            out = Expr::mul(out, factor);
        }
        if coeff == Ratio::ONE {
            out
        } else {
            Expr::mul(coeff_expr, out)
        }
    }

    /// Views the canonical form of `expr` as a ratio of polynomials in
    /// `var`, returning coefficient expressions by ascending degree
    /// (numerator, denominator). None when the expression does not
    /// canonicalize or `var` appears inside a function argument or other
    /// opaque subtree.
    pub fn as_univariate_rational(
        &mut self,
        expr: &Expr,
        var: &str,
    ) -> Option<(Vec<Expr>, Vec<Expr>)> {
        let r = self.canonicalize(expr).ok()?;
        let num = self.poly_coeffs_in(&r.num, var)?;
        let den = self.poly_coeffs_in(&r.den, var)?;
        Some((num, den))
    }

    fn poly_coeffs_in(&self, p: &Poly, var: &str) -> Option<Vec<Expr>> {
        let var_key = format!("sym:{}", var);
        let mut buckets: BTreeMap<u32, Poly> = BTreeMap::new();
        for (mono, coeff) in p {
            for key in mono.keys() {
                if key != &var_key {
                    if let Some(atom) = self.atoms.get(key) {
                        if atom.rebuild().free_symbols().contains(var) {
                            return None;
                        }
                    }
                }
            }
            let deg = mono.get(&var_key).copied().unwrap_or(0);
            let mut rest = mono.clone();
            rest.remove(&var_key);
            // (deg, rest) is unique per monomial, so plain insert suffices
            buckets.entry(deg).or_default().insert(rest, *coeff);
        }
        let max_deg = buckets.keys().next_back().copied().unwrap_or(0);
        let mut out = Vec::with_capacity(max_deg as usize + 1);
        for d in 0..=max_deg {
            out.push(match buckets.get(&d) {
                Some(poly) => self.rebuild_poly(poly),
                None => Expr::zero(),
            });
        }
        Some(out)
    }

    pub fn to_f64_if_constant(&mut self, expr: &Expr) -> Option<f64> {
        match self.canonicalize(expr) {
            Ok(r) => {
                let n = poly_is_const(&r.num)?;
                let d = poly_is_const(&r.den)?;
                if d.is_zero() {
                    None
                } else {
                    Some(n.to_f64() / d.to_f64())
                }
            }
            Err(_) => None,
        }
    }
}

fn needs_reduction(mono: &Monomial) -> bool {
    mono.iter()
        .any(|(key, exp)| (key.starts_with("cos:") || key.starts_with("sqrt:")) && *exp >= 2)
}

fn common_content(a: &Poly, b: &Poly) -> Monomial {
    let mut content: Option<Monomial> = None;
    for mono in a.keys().chain(b.keys()) {
        content = Some(match content {
            None => mono.clone(),
            Some(current) => {
                let mut next = Monomial::new();
                for (key, exp) in &current {
                    if let Some(other) = mono.get(key) {
                        next.insert(key.clone(), (*exp).min(*other));
                    }
                }
                next
            }
        });
        if content.as_ref().map(|c| c.is_empty()).unwrap_or(false) {
            break;
        }
    }
    content.unwrap_or_default()
}

fn strip_content(p: &Poly, content: &Monomial) -> Poly {
    p.iter()
        .map(|(mono, coeff)| {
            let stripped = monomial_div(mono, content).unwrap_or_else(|| mono.clone());
            (stripped, *coeff)
        })
        .collect()
}

#[derive(Debug, Clone)]
struct RatExpr {
    num: Poly,
    den: Poly,
}

impl RatExpr {
    fn constant(c: Ratio) -> RatExpr {
        RatExpr { num: poly_const(c), den: poly_const(Ratio::ONE) }
    }

    fn negated(&self) -> RatExpr {
        RatExpr {
            num: self.num.iter().map(|(m, c)| (m.clone(), c.neg())).collect(),
            den: self.den.clone(),
        }
    }

    fn inverted(&self) -> Option<RatExpr> {
        if self.num.is_empty() {
            return None;
        }
        Some(RatExpr { num: self.den.clone(), den: self.num.clone() })
    }
}

/* ── Free helpers ────────────────────────────────────────── */

/// One-shot simplification with fresh state.
pub fn simplify_expr(expr: &Expr, options: SimplifyOptions) -> Result<Expr, CoreError> {
    Simplifier::new(options).simplify(expr)
}

/// One-shot exact-zero decision.
pub fn is_symbolically_zero(expr: &Expr, options: SimplifyOptions) -> Result<bool, CoreError> {
    Ok(Simplifier::new(options).check_zero(expr)? == ZeroCheck::Zero)
}
