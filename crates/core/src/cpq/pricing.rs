use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::quote::{QuoteItem, QuoteTotals};
use crate::errors::DomainError;

/// Salvadoran IVA, 13%.
pub const IVA_RATE: Decimal = Decimal::from_parts(13, 0, 0, false, 2);

/// Upper bound accepted for a line's `cantidad`, `precioUnitario` and
/// `descuento`: 100,000,000,000.
pub const MAX_LINE_AMOUNT: Decimal = Decimal::from_parts(1_215_752_192, 23, 0, false, 0);

/// Rounds to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Per-line breakdown used when building the tax document body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePricing {
    pub venta_gravada: Decimal,
    pub iva_item: Decimal,
}

fn out_of_range(what: &str) -> DomainError {
    DomainError::AmountOutOfRange(format!("{what} exceeds the representable amount"))
}

pub fn price_line(item: &QuoteItem) -> Result<LinePricing, DomainError> {
    let venta_gravada = item.line_subtotal()?;
    let iva_item = venta_gravada.checked_mul(IVA_RATE).ok_or_else(|| out_of_range("line tax"))?;
    Ok(LinePricing { venta_gravada, iva_item })
}

/// Subtotal and tax accumulate unrounded and are rounded independently; the
/// total is the sum of the rounded parts, rounded again.
pub fn compute_totals(items: &[QuoteItem]) -> Result<QuoteTotals, DomainError> {
    let (subtotal, tax_amount) =
        items.iter().try_fold((Decimal::ZERO, Decimal::ZERO), |(sub, tax), item| {
            let line = price_line(item)?;
            let sub = sub.checked_add(line.venta_gravada).ok_or_else(|| out_of_range("subtotal"))?;
            let tax = tax.checked_add(line.iva_item).ok_or_else(|| out_of_range("tax amount"))?;
            Ok::<_, DomainError>((sub, tax))
        })?;

    let subtotal = round_money(subtotal);
    let tax_amount = round_money(tax_amount);
    let total = subtotal.checked_add(tax_amount).ok_or_else(|| out_of_range("total"))?;
    Ok(QuoteTotals { subtotal, tax_amount, total: round_money(total) })
}

pub fn total_discount(items: &[QuoteItem]) -> Result<Decimal, DomainError> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.descuento))
        .map(round_money)
        .ok_or_else(|| out_of_range("discount total"))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{compute_totals, round_money, total_discount, IVA_RATE, MAX_LINE_AMOUNT};
    use crate::domain::quote::QuoteItem;
    use crate::errors::DomainError;

    fn item(cantidad: Decimal, precio: Decimal, descuento: Decimal) -> QuoteItem {
        QuoteItem {
            descripcion: "Mantenimiento".to_owned(),
            cantidad,
            precio_unitario: precio,
            descuento,
            tipo_item: 2,
            catalog_item_id: None,
            codigo: None,
        }
    }

    #[test]
    fn iva_rate_is_thirteen_percent() {
        assert_eq!(IVA_RATE, Decimal::new(13, 2));
        assert_eq!(MAX_LINE_AMOUNT, Decimal::from(100_000_000_000_u64));
    }

    #[test]
    fn overflowing_line_is_rejected_instead_of_panicking() {
        let huge = Decimal::from_scientific("1e20").expect("decimal");
        let result = compute_totals(&[item(huge, huge, Decimal::ZERO)]);
        assert!(matches!(result, Err(DomainError::AmountOutOfRange(_))));
    }

    #[test]
    fn largest_accepted_line_still_prices() {
        let totals = compute_totals(&[item(MAX_LINE_AMOUNT, MAX_LINE_AMOUNT, Decimal::ZERO)])
            .expect("bounded line fits");
        assert_eq!(totals.subtotal, Decimal::from_scientific("1e22").expect("decimal"));
    }

    #[test]
    fn totals_match_worked_example() {
        let totals = compute_totals(&[
            item(Decimal::from(2), Decimal::from(10), Decimal::ZERO),
            item(Decimal::from(1), Decimal::from(5), Decimal::from(1)),
        ])
        .expect("totals");

        assert_eq!(totals.subtotal, Decimal::new(2400, 2));
        assert_eq!(totals.tax_amount, Decimal::new(312, 2));
        assert_eq!(totals.total, Decimal::new(2712, 2));
    }

    #[test]
    fn empty_items_total_zero() {
        let totals = compute_totals(&[]).expect("totals");
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn tax_rounds_once_after_accumulation() {
        // 0.013 * 3 = 0.039 -> 0.04; rounding per line would give 0.03.
        let line = item(Decimal::ONE, Decimal::new(10, 2), Decimal::ZERO);
        let totals = compute_totals(&[line.clone(), line.clone(), line]).expect("totals");
        assert_eq!(totals.subtotal, Decimal::new(30, 2));
        assert_eq!(totals.tax_amount, Decimal::new(4, 2));
        assert_eq!(totals.total, Decimal::new(34, 2));
    }

    #[test]
    fn subtotal_plus_tax_equals_total() {
        let items = vec![
            item(Decimal::new(333, 2), Decimal::new(1_999, 2), Decimal::new(7, 1)),
            item(Decimal::new(1, 2), Decimal::new(12_345, 3), Decimal::ZERO),
            item(Decimal::from(17), Decimal::new(4_05, 2), Decimal::new(3_33, 2)),
        ];
        let totals = compute_totals(&items).expect("totals");
        assert_eq!(totals.subtotal + totals.tax_amount, totals.total);
        assert!(totals.total.scale() <= 2);
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));
        assert_eq!(round_money(Decimal::new(-1005, 3)), Decimal::new(-101, 2));
    }

    #[test]
    fn discount_total_sums_line_discounts() {
        let items = vec![
            item(Decimal::ONE, Decimal::TEN, Decimal::new(150, 2)),
            item(Decimal::ONE, Decimal::TEN, Decimal::new(25, 2)),
        ];
        assert_eq!(total_discount(&items).expect("discounts"), Decimal::new(175, 2));
    }
}
