//! Builtin function registry
//!
//! Every builtin takes the evaluated argument vector and reads the indices it
//! needs; missing arguments take a default (usually 0 or 1) instead of
//! failing. Division-like builtins return 0 for a zero divisor.
//!
//! Builtins that draw randomness are registered as [`BuiltinFn::Random`] and
//! pull from the environment's seeded stream, never from an ambient source.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use rand::Rng;
use rand_pcg::Pcg32;

use super::env::Env;
use super::error::{EvalError, EvalResult};

pub type PureFn = fn(&[f64]) -> f64;
pub type RandomFn = fn(&[f64], &mut Pcg32) -> f64;

/// Whether a builtin is referentially transparent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purity {
    Pure,
    /// Consumes the environment's random stream
    Random,
}

#[derive(Debug, Clone, Copy)]
pub enum BuiltinFn {
    Pure(PureFn),
    Random(RandomFn),
}

impl BuiltinFn {
    pub fn purity(&self) -> Purity {
        match self {
            BuiltinFn::Pure(_) => Purity::Pure,
            BuiltinFn::Random(_) => Purity::Random,
        }
    }

    #[inline]
    pub fn invoke(&self, args: &[f64], env: &Env) -> EvalResult {
        match self {
            BuiltinFn::Pure(f) => Ok(f(args)),
            BuiltinFn::Random(f) => env
                .with_rng(|rng| f(args, rng))
                .ok_or(EvalError::RandomSourceBusy),
        }
    }
}

/// Name -> function table handed to the compiler
///
/// Read-only once built. Tests substitute their own with [`Registry::empty`]
/// and [`Registry::register`].
#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: HashMap<String, BuiltinFn>,
}

#[inline]
fn arg(args: &[f64], index: usize, default: f64) -> f64 {
    args.get(index).copied().unwrap_or(default)
}

#[inline]
fn x0(args: &[f64]) -> f64 {
    arg(args, 0, 0.0)
}

#[inline]
fn safe_div(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

#[inline]
fn safe_rem(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num.rem_euclid(den) }
}

#[inline]
fn unit(t: f64) -> f64 {
    t.clamp(0.0, 1.0)
}

fn hash(x: f64) -> f64 {
    let s = (x * 12.9898).sin() * 43_758.545_3;
    s - s.floor()
}

fn bool_to_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

impl Registry {
    /// A registry with no functions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace a function
    pub fn register(&mut self, name: impl Into<String>, func: BuiltinFn) -> &mut Self {
        self.functions.insert(name.into(), func);
        self
    }

    fn pure(&mut self, name: &str, f: PureFn) -> &mut Self {
        self.register(name, BuiltinFn::Pure(f))
    }

    fn random(&mut self, name: &str, f: RandomFn) -> &mut Self {
        self.register(name, BuiltinFn::Random(f))
    }

    pub fn get(&self, name: &str) -> Option<&BuiltinFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Purity of a registered function
    pub fn purity(&self, name: &str) -> Option<Purity> {
        self.get(name).map(BuiltinFn::purity)
    }

    pub fn is_pure(&self, name: &str) -> bool {
        self.purity(name) == Some(Purity::Pure)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registry without any random-drawing builtins
    pub fn pure_only(&self) -> Self {
        Self {
            functions: self
                .functions
                .iter()
                .filter(|(_, f)| f.purity() == Purity::Pure)
                .map(|(name, f)| (name.clone(), *f))
                .collect(),
        }
    }

    /// The full table spell formulas are compiled against
    pub fn standard() -> Self {
        let mut r = Self::empty();

        // Trigonometry
        r.pure("sin", |a| x0(a).sin())
            .pure("cos", |a| x0(a).cos())
            .pure("tan", |a| x0(a).tan())
            .pure("asin", |a| x0(a).clamp(-1.0, 1.0).asin())
            .pure("acos", |a| x0(a).clamp(-1.0, 1.0).acos())
            .pure("atan", |a| x0(a).atan())
            .pure("atan2", |a| x0(a).atan2(arg(a, 1, 1.0)))
            .pure("sinh", |a| x0(a).sinh())
            .pure("cosh", |a| x0(a).cosh())
            .pure("tanh", |a| x0(a).tanh())
            .pure("asinh", |a| x0(a).asinh())
            .pure("acosh", |a| x0(a).max(1.0).acosh())
            .pure("atanh", |a| x0(a).atanh())
            .pure("sec", |a| safe_div(1.0, x0(a).cos()))
            .pure("csc", |a| safe_div(1.0, x0(a).sin()))
            .pure("cot", |a| safe_div(x0(a).cos(), x0(a).sin()))
            .pure("deg", |a| x0(a).to_degrees())
            .pure("rad", |a| x0(a).to_radians());

        // Powers and logarithms
        r.pure("sqrt", |a| x0(a).sqrt())
            .pure("cbrt", |a| x0(a).cbrt())
            .pure("sq", |a| x0(a) * x0(a))
            .pure("cube", |a| x0(a) * x0(a) * x0(a))
            .pure("pow", |a| x0(a).powf(arg(a, 1, 1.0)))
            .pure("exp", |a| x0(a).exp())
            .pure("exp2", |a| x0(a).exp2())
            .pure("ln", |a| x0(a).ln())
            .pure("log", |a| match a.get(1) {
                Some(&base) => safe_div(x0(a).ln(), base.ln()),
                None => x0(a).log10(),
            })
            .pure("log2", |a| x0(a).log2())
            .pure("log10", |a| x0(a).log10())
            .pure("hypot", |a| x0(a).hypot(arg(a, 1, 0.0)));

        // Rounding and sign
        r.pure("abs", |a| x0(a).abs())
            .pure("sign", |a| {
                let x = x0(a);
                if x == 0.0 { 0.0 } else { x.signum() }
            })
            .pure("floor", |a| x0(a).floor())
            .pure("ceil", |a| x0(a).ceil())
            .pure("round", |a| x0(a).round())
            .pure("trunc", |a| x0(a).trunc())
            .pure("fract", |a| x0(a) - x0(a).floor())
            .pure("snap", |a| {
                let step = arg(a, 1, 1.0);
                if step == 0.0 { x0(a) } else { (x0(a) / step).round() * step }
            });

        // Division-like, all zero-guarded
        r.pure("div", |a| safe_div(x0(a), arg(a, 1, 1.0)))
            .pure("mod", |a| safe_rem(x0(a), arg(a, 1, 1.0)))
            .pure("inv", |a| safe_div(1.0, x0(a)))
            .pure("avg", |a| safe_div(a.iter().sum(), a.len() as f64))
            .pure("wrap", |a| {
                let lo = arg(a, 1, 0.0);
                let hi = arg(a, 2, 1.0);
                lo + safe_rem(x0(a) - lo, hi - lo)
            })
            .pure("pingpong", |a| {
                let len = arg(a, 1, 1.0);
                let m = safe_rem(x0(a), 2.0 * len);
                len - (m - len).abs()
            })
            .pure("inverse_lerp", |a| {
                let lo = x0(a);
                safe_div(arg(a, 2, 0.0) - lo, arg(a, 1, 1.0) - lo)
            })
            .pure("remap", |a| {
                let t = safe_div(x0(a) - arg(a, 1, 0.0), arg(a, 2, 1.0) - arg(a, 1, 0.0));
                let lo = arg(a, 3, 0.0);
                lo + (arg(a, 4, 1.0) - lo) * t
            })
            .pure("normalize_x", |a| {
                let (x, y) = (x0(a), arg(a, 1, 0.0));
                safe_div(x, x.hypot(y))
            })
            .pure("normalize_y", |a| {
                let (x, y) = (x0(a), arg(a, 1, 0.0));
                safe_div(y, x.hypot(y))
            });

        // Selection and comparison (1 = true, 0 = false)
        r.pure("min", |a| a.iter().copied().reduce(f64::min).unwrap_or(0.0))
            .pure("max", |a| a.iter().copied().reduce(f64::max).unwrap_or(0.0))
            .pure("sum", |a| a.iter().sum())
            .pure("clamp", |a| {
                let lo = arg(a, 1, 0.0);
                let hi = arg(a, 2, 1.0);
                x0(a).max(lo).min(hi)
            })
            .pure("saturate", |a| unit(x0(a)))
            .pure("step", |a| bool_to_f64(arg(a, 1, 0.0) >= x0(a)))
            .pure("if", |a| if x0(a) != 0.0 { arg(a, 1, 1.0) } else { arg(a, 2, 0.0) })
            .pure("gt", |a| bool_to_f64(x0(a) > arg(a, 1, 0.0)))
            .pure("lt", |a| bool_to_f64(x0(a) < arg(a, 1, 0.0)))
            .pure("ge", |a| bool_to_f64(x0(a) >= arg(a, 1, 0.0)))
            .pure("le", |a| bool_to_f64(x0(a) <= arg(a, 1, 0.0)))
            .pure("eq", |a| bool_to_f64(x0(a) == arg(a, 1, 0.0)))
            .pure("ne", |a| bool_to_f64(x0(a) != arg(a, 1, 0.0)))
            .pure("and", |a| bool_to_f64(x0(a) != 0.0 && arg(a, 1, 0.0) != 0.0))
            .pure("or", |a| bool_to_f64(x0(a) != 0.0 || arg(a, 1, 0.0) != 0.0))
            .pure("not", |a| bool_to_f64(x0(a) == 0.0));

        // Interpolation
        r.pure("lerp", |a| {
            let lo = x0(a);
            lo + (arg(a, 1, 1.0) - lo) * arg(a, 2, 0.0)
        })
        .pure("smoothstep", |a| {
            let t = unit(safe_div(arg(a, 2, 0.0) - x0(a), arg(a, 1, 1.0) - x0(a)));
            t * t * (3.0 - 2.0 * t)
        })
        .pure("smootherstep", |a| {
            let t = unit(safe_div(arg(a, 2, 0.0) - x0(a), arg(a, 1, 1.0) - x0(a)));
            t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
        });

        // Easing over t in [0, 1]
        r.pure("ease_in", |a| unit(x0(a)).powi(2))
            .pure("ease_out", |a| {
                let t = unit(x0(a));
                1.0 - (1.0 - t).powi(2)
            })
            .pure("ease_in_out", |a| {
                let t = unit(x0(a));
                if t < 0.5 { 2.0 * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(2) / 2.0 }
            })
            .pure("ease_in_cubic", |a| unit(x0(a)).powi(3))
            .pure("ease_out_cubic", |a| 1.0 - (1.0 - unit(x0(a))).powi(3))
            .pure("ease_in_out_cubic", |a| {
                let t = unit(x0(a));
                if t < 0.5 { 4.0 * t.powi(3) } else { 1.0 - (-2.0 * t + 2.0).powi(3) / 2.0 }
            })
            .pure("ease_in_sine", |a| 1.0 - (unit(x0(a)) * PI / 2.0).cos())
            .pure("ease_out_sine", |a| (unit(x0(a)) * PI / 2.0).sin())
            .pure("ease_in_expo", |a| {
                let t = unit(x0(a));
                if t == 0.0 { 0.0 } else { 2f64.powf(10.0 * t - 10.0) }
            })
            .pure("ease_out_expo", |a| {
                let t = unit(x0(a));
                if t == 1.0 { 1.0 } else { 1.0 - 2f64.powf(-10.0 * t) }
            })
            .pure("ease_out_back", |a| {
                let t = unit(x0(a));
                let c1 = 1.70158;
                1.0 + (c1 + 1.0) * (t - 1.0).powi(3) + c1 * (t - 1.0).powi(2)
            })
            .pure("ease_out_elastic", |a| {
                let t = unit(x0(a));
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * TAU / 3.0).sin() + 1.0
                }
            })
            .pure("ease_out_bounce", |a| {
                let t = unit(x0(a));
                let (n1, d1) = (7.5625, 2.75);
                if t < 1.0 / d1 {
                    n1 * t * t
                } else if t < 2.0 / d1 {
                    let t = t - 1.5 / d1;
                    n1 * t * t + 0.75
                } else if t < 2.5 / d1 {
                    let t = t - 2.25 / d1;
                    n1 * t * t + 0.9375
                } else {
                    let t = t - 2.625 / d1;
                    n1 * t * t + 0.984375
                }
            });

        // Wave shapes, period 1 unless stated
        r.pure("sawtooth", |a| x0(a) - x0(a).floor())
            .pure("triangle", |a| {
                let p = x0(a) - x0(a).floor();
                1.0 - (2.0 * p - 1.0).abs() * 2.0
            })
            .pure("square", |a| if x0(a) - x0(a).floor() < 0.5 { 1.0 } else { -1.0 })
            .pure("pulse", |a| {
                bool_to_f64(x0(a) - x0(a).floor() < arg(a, 1, 0.5))
            })
            .pure("wave", |a| arg(a, 2, 1.0) * (TAU * arg(a, 1, 1.0) * x0(a)).sin());

        // Planar geometry
        r.pure("len", |a| x0(a).hypot(arg(a, 1, 0.0)))
            .pure("dist", |a| {
                (arg(a, 2, 0.0) - x0(a)).hypot(arg(a, 3, 0.0) - arg(a, 1, 0.0))
            })
            .pure("angle", |a| {
                (arg(a, 3, 0.0) - arg(a, 1, 0.0)).atan2(arg(a, 2, 0.0) - x0(a))
            })
            .pure("dot", |a| x0(a) * arg(a, 2, 0.0) + arg(a, 1, 0.0) * arg(a, 3, 0.0))
            .pure("cross", |a| x0(a) * arg(a, 3, 0.0) - arg(a, 1, 0.0) * arg(a, 2, 0.0))
            .pure("polar_x", |a| x0(a) * arg(a, 1, 0.0).cos())
            .pure("polar_y", |a| x0(a) * arg(a, 1, 0.0).sin())
            .pure("rotate_x", |a| {
                let th = arg(a, 2, 0.0);
                x0(a) * th.cos() - arg(a, 1, 0.0) * th.sin()
            })
            .pure("rotate_y", |a| {
                let th = arg(a, 2, 0.0);
                x0(a) * th.sin() + arg(a, 1, 0.0) * th.cos()
            })
            .pure("orbit_x", |a| x0(a) + arg(a, 1, 1.0) * (arg(a, 2, 1.0) * arg(a, 3, 0.0)).cos())
            .pure("orbit_y", |a| x0(a) + arg(a, 1, 1.0) * (arg(a, 2, 1.0) * arg(a, 3, 0.0)).sin())
            .pure("spiral_x", |a| {
                let t = x0(a);
                arg(a, 1, 1.0) * t * (arg(a, 2, 1.0) * t).cos()
            })
            .pure("spiral_y", |a| {
                let t = x0(a);
                arg(a, 1, 1.0) * t * (arg(a, 2, 1.0) * t).sin()
            });

        // Deterministic pseudo-noise
        r.pure("hash", |a| hash(x0(a)))
            .pure("noise", |a| {
                let x = x0(a);
                let i = x.floor();
                let f = x - i;
                let u = f * f * (3.0 - 2.0 * f);
                hash(i) + (hash(i + 1.0) - hash(i)) * u
            });

        // Random draws from the environment stream
        r.random("rand", |a, rng| {
            if a.is_empty() {
                rng.random::<f64>()
            } else {
                let lo = x0(a);
                lo + (arg(a, 1, 1.0) - lo) * rng.random::<f64>()
            }
        })
        .random("random", |a, rng| {
            let lo = arg(a, 0, 0.0);
            lo + (arg(a, 1, 1.0) - lo) * rng.random::<f64>()
        })
        .random("rand_int", |a, rng| {
            let lo = x0(a).floor();
            let hi = arg(a, 1, 1.0).floor();
            if hi <= lo { lo } else { (lo + rng.random::<f64>() * (hi - lo + 1.0)).floor().min(hi) }
        })
        .random("rand_sign", |_, rng| if rng.random::<bool>() { 1.0 } else { -1.0 })
        .random("rand_angle", |_, rng| rng.random::<f64>() * TAU)
        .random("chance", |a, rng| bool_to_f64(rng.random::<f64>() < arg(a, 0, 0.5)))
        .random("gauss", |a, rng| {
            // Box-Muller
            let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
            let u2 = rng.random::<f64>();
            let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
            arg(a, 0, 0.0) + arg(a, 1, 1.0) * z
        })
        .random("jitter", |a, rng| x0(a) + arg(a, 1, 1.0) * (rng.random::<f64>() * 2.0 - 1.0));

        r
    }
}
