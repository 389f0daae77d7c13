//! Conversions between raw on-chain integer amounts (hex or base-10 "wei")
//! and human readable decimals scaled by an asset's decimal count.
//!
//! Every conversion runs on arbitrary precision integers; a float only
//! appears as the final output of the `*_to_decimal` functions. Malformed
//! input never surfaces as an error to the caller, it is read as zero.

use crate::{Result, WalletError};
use num_bigint::BigUint;
use tracing::debug;

fn strip_hex_prefix(hex: &str) -> &str {
    let trimmed = hex.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

fn zero() -> BigUint {
    BigUint::from(0u8)
}

/// Largest decimal count a conversion accepts; anything above reads as zero
pub const MAX_SCALE: u32 = 255;

fn scale_supported(scale: u32) -> bool {
    if scale > MAX_SCALE {
        debug!("Scale {} exceeds {}, reading as zero", scale, MAX_SCALE);
        return false;
    }
    true
}

fn pow10(exponent: u32) -> BigUint {
    BigUint::from(10u8).pow(exponent)
}

/// Parse a HexAmount, rejecting anything that is not `[0x]<hex digits>`.
/// The empty string is zero.
pub fn try_parse_hex(hex: &str) -> Result<BigUint> {
    let digits = strip_hex_prefix(hex);
    if digits.is_empty() {
        return Ok(zero());
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(WalletError::InvalidAmount(format!("not a hex amount: '{}'", hex)));
    }
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| WalletError::InvalidAmount(format!("not a hex amount: '{}'", hex)))
}

/// Parse a base-10 integer wei string. The empty string is zero.
pub fn try_parse_wei(wei: &str) -> Result<BigUint> {
    let digits = wei.trim();
    if digits.is_empty() {
        return Ok(zero());
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WalletError::InvalidAmount(format!("not a wei amount: '{}'", wei)));
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| WalletError::InvalidAmount(format!("not a wei amount: '{}'", wei)))
}

/// Lenient HexAmount parse: malformed input reads as zero.
pub fn parse_hex_amount(hex: &str) -> BigUint {
    try_parse_hex(hex).unwrap_or_else(|e| {
        debug!("{}, reading as zero", e);
        zero()
    })
}

/// Lowercase `0x` rendering without leading zeros ("0x0" for zero)
pub fn to_hex_string(value: &BigUint) -> String {
    format!("0x{:x}", value)
}

/// Exact decimal text of `value / 10^scale` with trailing zeros trimmed
fn scale_down(value: &BigUint, scale: u32) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let divisor = pow10(scale);
    let int_part = value / &divisor;
    let frac_part = value % &divisor;
    let frac = format!("{:0>width$}", frac_part.to_string(), width = scale as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac)
    }
}

/// `decimal * 10^scale`, fractional digits past `scale` dropped
fn scale_up(decimal: &str, scale: u32) -> Option<BigUint> {
    let trimmed = decimal.trim();
    let (int_part, frac_part) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let kept: String = frac_part.chars().take(scale as usize).collect();
    let padding = "0".repeat(scale as usize - kept.len());
    let digits = format!("{}{}{}", int_part, kept, padding);
    if digits.is_empty() {
        return Some(zero());
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
}

fn decimal_text_to_f64(text: &str) -> f64 {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        Ok(_) => f64::MAX,
        Err(_) => 0.0,
    }
}

/// HexAmount scaled down by `10^scale`, e.g. `("0x4563918244F40000", 18)` is 5.0
pub fn hex_wei_to_decimal(hex: &str, scale: u32) -> f64 {
    if !scale_supported(scale) {
        return 0.0;
    }
    let value = parse_hex_amount(hex);
    decimal_text_to_f64(&scale_down(&value, scale))
}

/// Decimal text scaled up by `10^scale` as a HexAmount, e.g. `("5.2", 18)`
/// is `0x482a1c7300080000`. Extra fractional digits are truncated.
pub fn decimal_to_hex_wei(decimal: &str, scale: u32) -> String {
    if !scale_supported(scale) {
        return "0x0".to_string();
    }
    match scale_up(decimal, scale) {
        Some(value) => to_hex_string(&value),
        None => {
            if !decimal.trim().is_empty() {
                debug!("Unparsable decimal '{}', using 0x0", decimal);
            }
            "0x0".to_string()
        }
    }
}

/// Base-10 wei string scaled down by `10^scale`. `None` and malformed input read as zero.
pub fn wei_string_to_decimal(wei: Option<&str>, scale: u32) -> f64 {
    if !scale_supported(scale) {
        return 0.0;
    }
    let value = match wei {
        Some(wei) => try_parse_wei(wei).unwrap_or_else(|e| {
            debug!("{}, reading as zero", e);
            zero()
        }),
        None => zero(),
    };
    decimal_text_to_f64(&scale_down(&value, scale))
}

/// Decimal text scaled up by `10^scale` as a base-10 wei string.
/// Empty input gives an empty string; malformed input gives "0".
pub fn decimal_to_wei_string(decimal: &str, scale: u32) -> String {
    if decimal.trim().is_empty() {
        return String::new();
    }
    if !scale_supported(scale) {
        return "0".to_string();
    }
    scale_up(decimal, scale)
        .map(|value| value.to_string())
        .unwrap_or_else(|| "0".to_string())
}

/// Gas price in gwei from its hex form, e.g. "0xabcdf" is 703711
pub fn hex_gwei_to_gwei(hex: &str) -> f64 {
    hex_wei_to_decimal(hex, 0)
}

/// Gwei amount as hex, e.g. "703711" is "0xabcdf"
pub fn gwei_to_hex_gwei(gwei: &str) -> String {
    decimal_to_hex_wei(gwei, 0)
}

/// Base-10 wei integer string as hex
pub fn decimal_wei_to_hex(wei: &str) -> String {
    match try_parse_wei(wei) {
        Ok(value) => to_hex_string(&value),
        Err(e) => {
            debug!("{}, using 0x0", e);
            "0x0".to_string()
        }
    }
}

/// `10^scale` as decimal text
pub fn decimals_multiplier(scale: u32) -> String {
    if !scale_supported(scale) {
        return "0".to_string();
    }
    pow10(scale).to_string()
}

pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    hex::decode(strip_hex_prefix(hex)).unwrap_or_else(|e| {
        debug!("Invalid hex byte string '{}': {}", hex, e);
        Vec::new()
    })
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Render `value / 10^scale` with exactly `precision` fractional digits,
/// rounding half up on the integer representation.
pub fn format_scaled(value: &BigUint, scale: u32, precision: u32) -> String {
    let precision = precision.min(MAX_SCALE);
    if !scale_supported(scale) {
        return format_scaled(&zero(), 0, precision);
    }
    let rounded = if precision >= scale {
        value * pow10(precision - scale)
    } else {
        let divisor = pow10(scale - precision);
        let half = &divisor / BigUint::from(2u8);
        (value + half) / divisor
    };

    let digits = format!("{:0>width$}", rounded.to_string(), width = precision as usize + 1);
    if precision == 0 {
        return digits;
    }
    let split = digits.len() - precision as usize;
    format!("{}.{}", &digits[..split], &digits[split..])
}

/// HexAmount formatted for display at a fixed precision, e.g.
/// `("0x6F05B59D3B20000", 18, 4)` is "0.5000". Malformed input gives zero.
pub fn format_units(hex: &str, scale: u32, precision: u32) -> String {
    format_scaled(&parse_hex_amount(hex), scale, precision)
}
