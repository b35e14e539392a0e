// transcript-core - math extension package for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The `math` package: an f64 kernel. Arguments are coerced through the
//! receiver's `toFloat` method, so integers and user-defined numerics
//! participate.

use crate::dispatch;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::primitives::{nat1, nat2};
use crate::value::Value;

pub fn register(interp: &Interpreter) {
    interp.register_extension("math", |interp| {
        let to_float = interp.accessor("toFloat");

        let flt = {
            let to_float = to_float.clone();
            move |x: &Value| -> Result<f64> {
                dispatch::call_via_accessor(x, &to_float, &[])?.to_float()
            }
        };

        let wrap1 = |f: fn(f64) -> f64| {
            let flt = flt.clone();
            nat1(move |_, a| Ok(Value::float(f(flt(a)?))))
        };
        let wrap2 = |f: fn(f64, f64) -> f64| {
            let flt = flt.clone();
            nat2(move |_, a, b| Ok(Value::float(f(flt(a)?, flt(b)?))))
        };

        let phi = (1.0 + 5.0f64.sqrt()) / 2.0;
        let mut out: Vec<(String, Value)> = vec![
            ("E".into(), Value::float(std::f64::consts::E)),
            ("PI".into(), Value::float(std::f64::consts::PI)),
            ("PHI".into(), Value::float(phi)),
            ("SQRT2".into(), Value::float(std::f64::consts::SQRT_2)),
            ("SQRTE".into(), Value::float(std::f64::consts::E.sqrt())),
            ("SQRTPI".into(), Value::float(std::f64::consts::PI.sqrt())),
            ("SQRTPHI".into(), Value::float(phi.sqrt())),
            ("LN2".into(), Value::float(std::f64::consts::LN_2)),
            ("LOG2E".into(), Value::float(std::f64::consts::LOG2_E)),
            ("LN10".into(), Value::float(std::f64::consts::LN_10)),
            ("LOG10E".into(), Value::float(std::f64::consts::LOG10_E)),
            ("NaN".into(), Value::float(f64::NAN)),
        ];

        let unary: [(&str, fn(f64) -> f64); 24] = [
            ("abs", f64::abs),
            ("acos", f64::acos),
            ("acosh", f64::acosh),
            ("asin", f64::asin),
            ("asinh", f64::asinh),
            ("atan", f64::atan),
            ("atanh", f64::atanh),
            ("cbrt", f64::cbrt),
            ("ceil", f64::ceil),
            ("cos", f64::cos),
            ("cosh", f64::cosh),
            ("exp", f64::exp),
            ("exp2", f64::exp2),
            ("expm1", f64::exp_m1),
            ("floor", f64::floor),
            ("log", f64::ln),
            ("log10", f64::log10),
            ("log1p", f64::ln_1p),
            ("log2", f64::log2),
            ("sin", f64::sin),
            ("sinh", f64::sinh),
            ("sqrt", f64::sqrt),
            ("tan", f64::tan),
            ("tanh", f64::tanh),
        ];
        for (name, f) in unary {
            out.push((name.into(), wrap1(f)));
        }
        out.push(("trunc".into(), wrap1(f64::trunc)));
        out.push(("round".into(), wrap1(f64::round)));

        let binary: [(&str, fn(f64, f64) -> f64); 6] = [
            ("atan2", f64::atan2),
            ("copysign", f64::copysign),
            ("hypot", f64::hypot),
            ("max", f64::max),
            ("min", f64::min),
            ("pow", f64::powf),
        ];
        for (name, f) in binary {
            out.push((name.into(), wrap2(f)));
        }
        out.push(("dim".into(), wrap2(|a, b| (a - b).max(0.0))));
        out.push(("mod".into(), wrap2(|a, b| a % b)));
        out.push((
            "remainder".into(),
            wrap2(|a, b| a - b * (a / b).round()),
        ));

        {
            let flt = flt.clone();
            out.push((
                "isNaN".into(),
                nat1(move |_, x| Ok(Value::bool_of(flt(x)?.is_nan()))),
            ));
        }
        {
            let flt = flt.clone();
            out.push((
                "isInf".into(),
                nat2(move |_, x, sign| {
                    let v = flt(x)?;
                    let s = sign.to_int()?;
                    let hit = match s.cmp(&0) {
                        std::cmp::Ordering::Greater => v == f64::INFINITY,
                        std::cmp::Ordering::Less => v == f64::NEG_INFINITY,
                        std::cmp::Ordering::Equal => v.is_infinite(),
                    };
                    Ok(Value::bool_of(hit))
                }),
            ));
        }
        out.push((
            "inf".into(),
            nat1(move |_, sign| {
                let s = sign.to_int()?;
                Ok(Value::float(if s >= 0 {
                    f64::INFINITY
                } else {
                    f64::NEG_INFINITY
                }))
            }),
        ));
        out.push((
            "pow10".into(),
            nat1(move |_, e| Ok(Value::float(10.0f64.powi(e.to_int()? as i32)))),
        ));

        Ok(out)
    });
}
