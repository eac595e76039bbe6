//! Money helpers. Plans and features carry display prices ("$300/month");
//! checkout amounts and invoice tax are derived here, in minor units.

/// Extracts the numeric amount from a display price and converts it to minor
/// units. `"$300/month"` -> `Some(30000)`, `"$1,250.50 one-time"` ->
/// `Some(125050)`. Returns `None` when no digits are present.
pub fn parse_price_minor(price: &str) -> Option<i64> {
    // Everything after a '/' is cadence ("/month"), not amount.
    let head = price.split('/').next().unwrap_or("");
    let cleaned: String = head
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    Some((value * 100.0).round() as i64)
}

/// Tax in minor units: subtotal * rate / 100, rounded to the nearest minor
/// unit (2 decimal places of the major unit).
pub fn tax_minor(subtotal_minor: i64, rate_percent: f64) -> i64 {
    ((subtotal_minor as f64) * rate_percent / 100.0).round() as i64
}

/// (subtotal, tax, total) for a set of line amounts.
pub fn invoice_totals(line_amounts_minor: &[i64], rate_percent: f64) -> (i64, i64, i64) {
    let subtotal: i64 = line_amounts_minor.iter().sum();
    let tax = tax_minor(subtotal, rate_percent);
    (subtotal, tax, subtotal + tax)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_monthly_plan_price() {
        assert_eq!(parse_price_minor("$300/month"), Some(30000));
    }

    #[test]
    fn parses_decimal_and_thousands() {
        assert_eq!(parse_price_minor("$1,250.50 one-time"), Some(125050));
        assert_eq!(parse_price_minor("€99.99/mo"), Some(9999));
    }

    #[test]
    fn rejects_priceless_strings() {
        assert_eq!(parse_price_minor("Contact us"), None);
        assert_eq!(parse_price_minor(""), None);
    }

    #[test]
    fn tax_rounds_to_nearest_minor_unit() {
        // 8.25% of $123.45 = $10.184625 -> 1018 cents
        assert_eq!(tax_minor(12345, 8.25), 1018);
        assert_eq!(tax_minor(10000, 0.0), 0);
        // half rounds away from zero
        assert_eq!(tax_minor(1000, 0.05), 1);
    }

    #[test]
    fn totals_add_up() {
        let (subtotal, tax, total) = invoice_totals(&[30000, 4500], 10.0);
        assert_eq!(subtotal, 34500);
        assert_eq!(tax, 3450);
        assert_eq!(total, subtotal + tax);
    }
}
