//! Amount handling as the activity view chains it: hex values from a
//! transaction, gas arithmetic, scaling and fiat rendering.

use rust_decimal::Decimal;
use std::str::FromStr;
use wallet_core::format::{fiat_from_f64, fiat_value};
use wallet_core::{
    add_hex, decimal_to_hex_wei, format_units, gas_fee_hex, hex_wei_to_decimal, multiply_hex,
    AssetPriceTimeframe,
};

#[test]
fn test_transfer_cost_pipeline() {
    let value = decimal_to_hex_wei("0.5", 18);
    let gas = gas_fee_hex("0x5208", "0x3b9aca00");

    assert_eq!(gas, multiply_hex("0x5208", "0x3b9aca00"));
    assert_eq!(add_hex(&value, &gas), "0x6f06e73453c5000");

    let amount = format_units(&value, 18, 4);
    assert_eq!(amount, "0.5000");
    assert_eq!(fiat_value(&amount, Decimal::from(2000)), "1000.00");

    let gas_eth = hex_wei_to_decimal(&gas, 18);
    assert_eq!(fiat_from_f64(gas_eth, Decimal::from(2000)), "0.04");
}

#[test]
fn test_token_amount_at_six_decimals() {
    // 12.345678 USDC
    let value = decimal_to_hex_wei("12.345678", 6);
    assert_eq!(value, "0xbc614e");
    assert_eq!(format_units(&value, 6, 4), "12.3457");
    assert_eq!(
        fiat_value(&format_units(&value, 6, 4), Decimal::from_str("0.9998").unwrap()),
        "12.34"
    );
}

#[test]
fn test_malformed_amounts_render_as_zero() {
    assert_eq!(format_units("not hex", 18, 4), "0.0000");
    assert_eq!(add_hex("0xzz", "0x1"), "0x1");
    assert_eq!(fiat_value("", Decimal::from(2000)), "0.00");
}

#[test]
fn test_timeframe_round_trips_through_text() {
    for text in ["live", "1d", "1w", "1m", "3m", "1y", "all"] {
        let timeframe: AssetPriceTimeframe = text.parse().unwrap();
        assert_eq!(timeframe.as_str(), text);
    }
}
