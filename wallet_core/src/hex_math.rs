//! Unsigned arbitrary precision arithmetic on HexAmounts

use crate::wei::{parse_hex_amount, to_hex_string};

/// `a * b`, e.g. gas limit times gas price
pub fn multiply_hex(a: &str, b: &str) -> String {
    let product = parse_hex_amount(a) * parse_hex_amount(b);
    to_hex_string(&product)
}

/// `a + b`, e.g. transferred value plus fee
pub fn add_hex(a: &str, b: &str) -> String {
    let sum = parse_hex_amount(a) + parse_hex_amount(b);
    to_hex_string(&sum)
}

/// Maximum fee in wei a transaction may burn
pub fn gas_fee_hex(gas_limit: &str, gas_price: &str) -> String {
    multiply_hex(gas_limit, gas_price)
}
