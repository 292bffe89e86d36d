//! Exact decimal to smallest-unit conversion
//!
//! A price in ETH is rendered with exactly [`WEI_DECIMALS`] fractional digits
//! and reassembled as an integer amount of wei. No floating point is involved
//! anywhere on this path.

use std::sync::LazyLock;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use regex::Regex;

use crate::errors::{ConversionError, ConversionResult};
use crate::types::pow10;

/// Decimals of the chain's smallest unit (wei)
pub const WEI_DECIMALS: usize = 18;

static FLOAT_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[0-9]*\.?[0-9]+$").expect("float pattern is valid"));

/// Render `value` with exactly `decimals` fractional digits.
///
/// The last digit is rounded to nearest, halves away from zero.
pub fn format_fixed(value: &BigRational, decimals: usize) -> String {
    let denom = value.denom();
    let numer = value.numer().abs();
    let scale = pow10(decimals as u32);

    let mut int_part = &numer / denom;
    let remainder = &numer % denom;
    let scaled = remainder * &scale;
    let mut frac_part = &scaled / denom;
    let frac_remainder = &scaled % denom;

    if frac_remainder * 2 >= *denom {
        frac_part += 1;
        if frac_part >= scale {
            frac_part -= &scale;
            int_part += 1;
        }
    }

    let sign = if value.is_negative() { "-" } else { "" };
    if decimals == 0 {
        return format!("{sign}{int_part}");
    }

    let frac = frac_part.to_string();
    format!("{sign}{int_part}.{}{frac}", "0".repeat(decimals - frac.len()))
}

/// Convert a decimal string into an integer amount of the smallest unit.
///
/// `"1.5"` becomes `1500000000000000000`. More than [`WEI_DECIMALS`]
/// fractional digits is an error, never a silent truncation.
pub fn to_base_amount(value: &str) -> ConversionResult<BigInt> {
    if !FLOAT_STRING.is_match(value) {
        return Err(ConversionError::NotAFloat(value.to_string()));
    }

    let (int_part, dec_part) = value.split_once('.').unwrap_or((value, ""));
    if dec_part.len() > WEI_DECIMALS {
        return Err(ConversionError::TooManyDecimals { max: WEI_DECIMALS });
    }

    let digits = format!("{int_part}{dec_part:0<width$}", width = WEI_DECIMALS);
    digits
        .parse::<BigInt>()
        .map_err(|_| ConversionError::Unparseable(digits))
}

/// Price of one unit of work in wei, given its USD price and the current
/// USD value of one ETH.
///
/// The result is an integer wrapped as a rational over 1.
pub fn unit_price(base_price_usd: &BigRational, usd_price: &BigRational) -> ConversionResult<BigRational> {
    if usd_price.is_zero() {
        return Err(ConversionError::ZeroPrice);
    }

    let eth = base_price_usd / usd_price;
    let wei = to_base_amount(&format_fixed(&eth, WEI_DECIMALS))?;
    Ok(BigRational::from_integer(wei))
}
