//! Core type definitions
//!
//! Every price and ratio is an exact `BigRational`. Floats never enter a
//! price path.

use std::fmt;
use std::sync::LazyLock;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use regex::Regex;

use crate::errors::{CoreError, CoreResult};

/// Largest decimal exponent accepted by [`parse_rational`]
const MAX_EXPONENT: u32 = 4_096;

static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?)([0-9]*)(?:\.([0-9]*))?(?:[eE]([+-]?[0-9]+))?$")
        .expect("decimal pattern is valid")
});

/// Build an exact ratio from two machine integers.
///
/// Panics if `denom` is zero, like `Ratio::new`.
pub fn ratio(numer: i64, denom: i64) -> BigRational {
    BigRational::new(BigInt::from(numer), BigInt::from(denom))
}

/// `10^exp` as a big integer
pub fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

/// Parse a decimal (`-12.5`, `.05`, `1e-3`) or fraction (`3/4`) string into
/// an exact rational.
pub fn parse_rational(input: &str) -> CoreResult<BigRational> {
    let s = input.trim();
    let invalid = |reason: &str| CoreError::InvalidNumber {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if let Some((numer, denom)) = s.split_once('/') {
        let numer: BigInt = numer
            .trim()
            .parse()
            .map_err(|_| invalid("numerator is not an integer"))?;
        let denom: BigInt = denom
            .trim()
            .parse()
            .map_err(|_| invalid("denominator is not an integer"))?;
        if denom.is_zero() {
            return Err(invalid("zero denominator"));
        }
        return Ok(BigRational::new(numer, denom));
    }

    let caps = DECIMAL.captures(s).ok_or_else(|| invalid("not a decimal"))?;
    let int_part = caps.get(2).map_or("", |m| m.as_str());
    let frac_part = caps.get(3).map_or("", |m| m.as_str());
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("no digits"));
    }

    let digits = format!("{int_part}{frac_part}");
    let mut mantissa: BigInt = digits
        .parse()
        .map_err(|_| invalid("digits out of range"))?;
    if caps.get(1).is_some_and(|m| m.as_str() == "-") {
        mantissa = -mantissa;
    }

    let exponent: i64 = match caps.get(4) {
        Some(m) => m.as_str().parse().map_err(|_| invalid("bad exponent"))?,
        None => 0,
    };
    let scale = exponent
        .checked_sub(frac_part.len() as i64)
        .ok_or_else(|| invalid("exponent too large"))?;
    if scale.unsigned_abs() > u64::from(MAX_EXPONENT) {
        return Err(invalid("exponent too large"));
    }

    let value = if scale >= 0 {
        BigRational::from_integer(mantissa * pow10(scale as u32))
    } else {
        BigRational::new(mantissa, pow10(scale.unsigned_abs() as u32))
    };
    Ok(value)
}

/// `1 ± fraction` band multipliers
pub fn band(fraction: &BigRational) -> (BigRational, BigRational) {
    let one = BigRational::one();
    (&one - fraction, &one + fraction)
}

/// Role of the node prices are published to, discovered once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Orchestrator,
    Broadcaster,
}

impl NodeRole {
    pub fn from_is_orchestrator(is_orch: bool) -> Self {
        if is_orch {
            NodeRole::Orchestrator
        } else {
            NodeRole::Broadcaster
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeRole::Orchestrator => "orchestrator",
            NodeRole::Broadcaster => "broadcaster",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
