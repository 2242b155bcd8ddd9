use rust_decimal::Decimal;

/// Rounds to two decimal places (cents or hundredths of a percent).
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// `part` as a percentage of `total`, or zero when there is no total.
pub fn percent_of(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    round2(part / total * Decimal::ONE_HUNDRED)
}

/// Parses a user-supplied decimal field, naming the field in the error.
pub fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, String> {
    raw.trim()
        .replace(',', "")
        .parse::<Decimal>()
        .map_err(|_| format!("Invalid {field} value provided: '{}'", raw.trim()))
}
