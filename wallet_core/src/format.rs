use rust_decimal::prelude::*;
use tracing::debug;

/// Fractional digits shown for asset amounts
pub const ASSET_PRECISION: u32 = 4;

/// Fractional digits shown for fiat amounts
pub const FIAT_PRECISION: u32 = 2;

fn render(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded.to_string()
}

fn zero_text(dp: u32) -> String {
    render(Decimal::ZERO, dp)
}

/// Price text from a price source as a Decimal. Empty, malformed or negative
/// quotes read as zero ("unavailable").
pub fn parse_price(price: &str) -> Decimal {
    match Decimal::from_str(price.trim()) {
        Ok(value) if !value.is_sign_negative() => value,
        Ok(_) | Err(_) => {
            if !price.trim().is_empty() {
                debug!("Unusable price '{}', using 0", price);
            }
            Decimal::ZERO
        }
    }
}

/// Fiat value of a displayed asset amount, e.g. ("0.5000", 2000) is "1000.00".
/// Anything that cannot be computed renders as "0.00".
pub fn fiat_value(amount_text: &str, price: Decimal) -> String {
    Decimal::from_str(amount_text.trim())
        .ok()
        .and_then(|amount| amount.checked_mul(price))
        .map(|value| render(value, FIAT_PRECISION))
        .unwrap_or_else(|| {
            debug!("Cannot price amount '{}' at {}", amount_text, price);
            zero_text(FIAT_PRECISION)
        })
}

/// Fiat value of a float amount at `price`
pub fn fiat_from_f64(amount: f64, price: Decimal) -> String {
    Decimal::from_f64(amount)
        .and_then(|amount| amount.checked_mul(price))
        .map(|value| render(value, FIAT_PRECISION))
        .unwrap_or_else(|| zero_text(FIAT_PRECISION))
}
