//! Server-side sale arithmetic and its reconciliation with form totals.
//!
//! When a sale is saved the server recomputes every amount from the posted
//! rows in exact decimal arithmetic, rounding half away from zero to cents.
//! [`reconcile`] reports where the browser-side totals disagree.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::warn;

use salesdesk_core::{DomainError, DomainResult, ValueObject};

use crate::amount::{CURRENCY_LABEL, group_fixed};
use crate::formset::FormSnapshot;
use crate::totals::Totals;

/// A sale counts as paid while at most this much remains due.
pub fn paid_tolerance() -> Decimal {
    Decimal::new(49, 4)
}

/// Quantize to cents, half away from zero.
pub fn q2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `Tsh 1,234.50`
pub fn format_money(value: Decimal) -> String {
    let mut cents = q2(value);
    cents.rescale(2);
    format!("{CURRENCY_LABEL} {}", group_fixed(&cents.to_string()))
}

/// Parse posted decimal text (plain or scientific notation).
pub fn parse_decimal(raw: &str) -> DomainResult<Decimal> {
    let text = raw.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| DomainError::validation(format!("{text:?} is not a decimal number: {e}")))
}

/// Amounts of one saved sale item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItemAmounts {
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub tax_rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub tax_amount: Decimal,
}

impl ValueObject for SaleItemAmounts {}

impl SaleItemAmounts {
    /// Unit price is quantized before multiplying; tax is taken from the
    /// quantized line total.
    pub fn compute(quantity: Decimal, unit_price: Decimal, tax_rate: Decimal) -> Self {
        let unit_price = q2(unit_price);
        let total_price = q2(quantity * unit_price);
        let tax_amount = q2(total_price * (tax_rate / Decimal::ONE_HUNDRED));
        Self {
            quantity,
            unit_price,
            tax_rate,
            total_price,
            tax_amount,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("Quantity must be greater than zero"));
        }
        if self.unit_price <= Decimal::ZERO {
            return Err(DomainError::validation("Unit price must be greater than zero"));
        }
        Ok(())
    }
}

/// Sale-level amounts after saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    #[serde(with = "rust_decimal::serde::str")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub net_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_paid: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance_due: Decimal,
    pub is_paid: bool,
}

impl ValueObject for SaleTotals {}

impl SaleTotals {
    pub fn from_items(items: &[SaleItemAmounts], discount: Decimal, amount_paid: Decimal) -> Self {
        let total_amount = q2(items.iter().map(|i| i.total_price).sum());
        let tax_amount = q2(items.iter().map(|i| i.tax_amount).sum());
        let discount_amount = q2(discount);
        let net_amount = q2(total_amount + tax_amount - discount_amount);

        let mut totals = Self {
            total_amount,
            tax_amount,
            discount_amount,
            net_amount,
            amount_paid: Decimal::ZERO,
            balance_due: Decimal::ZERO,
            is_paid: false,
        };
        totals.set_paid(amount_paid);
        totals
    }

    /// Recompute sale totals from a posted form.
    ///
    /// Rows flagged for deletion and rows added but never filled in are
    /// skipped. Posted text is parsed strictly here; an empty tax rate means
    /// zero and an empty discount means no discount.
    pub fn from_snapshot(snapshot: &FormSnapshot, amount_paid: Decimal) -> DomainResult<Self> {
        let mut items = Vec::new();
        for (index, row) in snapshot.rows.iter().enumerate() {
            if row.delete || row.is_untouched_extra() {
                continue;
            }
            let field_error = |field: &str, e: DomainError| {
                DomainError::validation(format!("row {index}: {field}: {e}"))
            };
            let quantity = parse_decimal(&row.quantity).map_err(|e| field_error("quantity", e))?;
            let unit_price =
                parse_decimal(&row.unit_price).map_err(|e| field_error("unit_price", e))?;
            let tax_rate = if row.tax_rate.trim().is_empty() {
                Decimal::ZERO
            } else {
                parse_decimal(&row.tax_rate).map_err(|e| field_error("tax_rate", e))?
            };

            let item = SaleItemAmounts::compute(quantity, unit_price, tax_rate);
            item.validate().map_err(|e| field_error("item", e))?;
            items.push(item);
        }

        let discount = if snapshot.discount.trim().is_empty() {
            Decimal::ZERO
        } else {
            parse_decimal(&snapshot.discount)
                .map_err(|e| DomainError::validation(format!("discount_amount: {e}")))?
        };

        Ok(Self::from_items(&items, discount, amount_paid))
    }

    /// Re-derive paid amounts from the payments of the sale.
    pub fn apply_payments(&mut self, payments: &[Payment]) {
        let paid = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| p.amount)
            .sum();
        self.set_paid(paid);
    }

    fn set_paid(&mut self, amount_paid: Decimal) {
        self.amount_paid = q2(amount_paid);
        self.balance_due = q2(self.net_amount - self.amount_paid);
        self.is_paid = self.balance_due <= paid_tolerance();
    }

    /// Rules checked before a sale is saved.
    pub fn validate(&self) -> DomainResult<()> {
        if self.net_amount < Decimal::ZERO {
            return Err(DomainError::validation("Net amount cannot be negative"));
        }
        if self.balance_due < Decimal::ZERO {
            return Err(DomainError::validation("Balance due cannot be negative"));
        }
        if self.is_paid && self.balance_due > Decimal::ZERO {
            return Err(DomainError::invariant("Cannot mark as paid when balance is due"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    CreditCard,
    MobileMoney,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// A payment recorded against a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
}

impl Payment {
    /// Negative amounts are flipped; the amount is quantized to cents.
    pub fn new(amount: Decimal, method: PaymentMethod, status: PaymentStatus) -> Self {
        Self {
            amount: q2(amount.abs()),
            method,
            status,
        }
    }

    pub fn validate_against(&self, totals: &SaleTotals) -> DomainResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::validation("Payment amount must be greater than 0"));
        }
        if self.amount > totals.balance_due {
            return Err(DomainError::validation(format!(
                "Payment amount cannot exceed balance due ({})",
                format_money(totals.balance_due)
            )));
        }
        Ok(())
    }
}

/// Which aggregate a discrepancy is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalField {
    Subtotal,
    Tax,
    Discount,
    GrandTotal,
}

/// Form total and server total that differ by half a cent or more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub field: TotalField,
    pub client: f64,
    #[serde(with = "rust_decimal::serde::str")]
    pub server: Decimal,
}

/// Compare what the form showed with what the server computed.
pub fn reconcile(client: &Totals, server: &SaleTotals) -> Vec<Discrepancy> {
    let half_cent = Decimal::new(5, 3);
    let pairs = [
        (TotalField::Subtotal, client.subtotal, server.total_amount),
        (TotalField::Tax, client.total_tax, server.tax_amount),
        (TotalField::Discount, client.discount, server.discount_amount),
        (TotalField::GrandTotal, client.grand_total, server.net_amount),
    ];

    let mut out = Vec::new();
    for (field, client_value, server_value) in pairs {
        let agrees = Decimal::from_f64(client_value)
            .is_some_and(|c| (c - server_value).abs() < half_cent);
        if !agrees {
            warn!(
                ?field,
                client = client_value,
                server = %server_value,
                "form total disagrees with server total"
            );
            out.push(Discrepancy {
                field,
                client: client_value,
                server: server_value,
            });
        }
    }
    out
}

/// Human-facing sale number derived from the creation time (`SALE-20240131093000`).
pub fn sale_number(created_at: DateTime<Utc>) -> String {
    format!("SALE-{}", created_at.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formset::RenderedRow;
    use crate::line_item::LineItem;
    use crate::totals::compute_totals;
    use chrono::TimeZone;
    use salesdesk_core::RecordId;

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    fn row(quantity: &str, unit_price: &str, tax_rate: &str) -> RenderedRow {
        RenderedRow {
            quantity: quantity.into(),
            unit_price: unit_price.into(),
            tax_rate: tax_rate.into(),
            ..RenderedRow::default()
        }
    }

    #[test]
    fn q2_rounds_half_away_from_zero() {
        assert_eq!(q2(dec("1.005")), dec("1.01"));
        assert_eq!(q2(dec("-1.005")), dec("-1.01"));
        assert_eq!(q2(dec("2.344")), dec("2.34"));
    }

    #[test]
    fn item_amounts_match_the_form_scenario() {
        let item = SaleItemAmounts::compute(dec("3"), dec("1000"), dec("18"));
        assert_eq!(item.total_price, dec("3000.00"));
        assert_eq!(item.tax_amount, dec("540.00"));
        assert!(item.validate().is_ok());
    }

    #[test]
    fn unit_price_is_quantized_before_multiplying() {
        // 10 × 0.125 would be 1.25; 10 × 0.13 is 1.30.
        let item = SaleItemAmounts::compute(dec("10"), dec("0.125"), dec("0"));
        assert_eq!(item.unit_price, dec("0.13"));
        assert_eq!(item.total_price, dec("1.30"));
    }

    #[test]
    fn item_validation_rejects_zero_quantity_and_price() {
        let zero_qty = SaleItemAmounts::compute(dec("0"), dec("10"), dec("0"));
        assert!(matches!(zero_qty.validate(), Err(DomainError::Validation(m)) if m.contains("Quantity")));
        let zero_price = SaleItemAmounts::compute(dec("1"), dec("0"), dec("0"));
        assert!(matches!(zero_price.validate(), Err(DomainError::Validation(m)) if m.contains("Unit price")));
    }

    #[test]
    fn sale_totals_from_snapshot_skip_deleted_rows() {
        let mut deleted = row("100", "100", "0");
        deleted.delete = true;
        let snapshot = FormSnapshot {
            rows: vec![row("2", "500", "10"), row("1", "750", ""), deleted],
            discount: String::new(),
            ..FormSnapshot::default()
        };

        let totals = SaleTotals::from_snapshot(&snapshot, Decimal::ZERO).unwrap();
        assert_eq!(totals.total_amount, dec("1750.00"));
        assert_eq!(totals.tax_amount, dec("100.00"));
        assert_eq!(totals.net_amount, dec("1850.00"));
        assert_eq!(totals.balance_due, dec("1850.00"));
        assert!(!totals.is_paid);
    }

    #[test]
    fn sale_totals_report_the_offending_row() {
        let snapshot = FormSnapshot {
            rows: vec![row("1", "10", "0"), row("", "10", "0")],
            ..FormSnapshot::default()
        };
        let err = SaleTotals::from_snapshot(&snapshot, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, DomainError::Validation(m) if m.starts_with("row 1: quantity")));
    }

    #[test]
    fn sale_totals_skip_rows_added_but_never_filled_in() {
        let snapshot = FormSnapshot {
            rows: vec![row("2", "50", "10"), row("", "", "0"), row("", "", "")],
            ..FormSnapshot::default()
        };
        let totals = SaleTotals::from_snapshot(&snapshot, Decimal::ZERO).unwrap();
        assert_eq!(totals.total_amount, dec("100.00"));
        assert_eq!(totals.tax_amount, dec("10.00"));
    }

    #[test]
    fn sale_totals_still_validate_saved_rows_left_blank() {
        let mut saved = row("", "", "0");
        saved.id = Some(RecordId::new(8));
        let snapshot = FormSnapshot {
            rows: vec![saved],
            ..FormSnapshot::default()
        };
        let err = SaleTotals::from_snapshot(&snapshot, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, DomainError::Validation(m) if m.starts_with("row 0: quantity")));
    }

    #[test]
    fn negative_net_amount_is_rejected_on_save() {
        let item = SaleItemAmounts::compute(dec("1"), dec("100"), dec("0"));
        let totals = SaleTotals::from_items(&[item], dec("250"), Decimal::ZERO);
        assert_eq!(totals.net_amount, dec("-150.00"));
        assert!(matches!(totals.validate(), Err(DomainError::Validation(m)) if m.contains("Net amount")));
    }

    #[test]
    fn paid_flag_with_outstanding_balance_is_rejected() {
        let item = SaleItemAmounts::compute(dec("1"), dec("100"), dec("0"));
        let mut totals = SaleTotals::from_items(&[item], Decimal::ZERO, dec("90"));
        assert!(!totals.is_paid);
        totals.is_paid = true;
        assert_eq!(totals.balance_due, dec("10.00"));
        assert!(matches!(
            totals.validate(),
            Err(DomainError::InvariantViolation(m)) if m.contains("balance is due")
        ));
    }

    #[test]
    fn payments_settle_the_balance_within_tolerance() {
        let item = SaleItemAmounts::compute(dec("1"), dec("100"), dec("18"));
        let mut totals = SaleTotals::from_items(&[item], Decimal::ZERO, Decimal::ZERO);
        assert_eq!(totals.net_amount, dec("118.00"));

        let payments = [
            Payment::new(dec("100"), PaymentMethod::Cash, PaymentStatus::Completed),
            Payment::new(dec("18"), PaymentMethod::MobileMoney, PaymentStatus::Pending),
        ];
        totals.apply_payments(&payments);
        assert_eq!(totals.amount_paid, dec("100.00"));
        assert_eq!(totals.balance_due, dec("18.00"));
        assert!(!totals.is_paid);

        let payments = [
            payments[0],
            Payment::new(dec("18"), PaymentMethod::MobileMoney, PaymentStatus::Completed),
        ];
        totals.apply_payments(&payments);
        assert_eq!(totals.balance_due, Decimal::ZERO);
        assert!(totals.is_paid);
        assert!(totals.validate().is_ok());
    }

    #[test]
    fn payment_cannot_exceed_balance_due() {
        let item = SaleItemAmounts::compute(dec("1"), dec("1500"), dec("0"));
        let totals = SaleTotals::from_items(&[item], Decimal::ZERO, Decimal::ZERO);

        let payment = Payment::new(dec("2000"), PaymentMethod::BankTransfer, PaymentStatus::Completed);
        let err = payment.validate_against(&totals).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("Payment amount cannot exceed balance due (Tsh 1,500.00)")
        );

        let negative = Payment::new(dec("-20"), PaymentMethod::Cash, PaymentStatus::Completed);
        assert_eq!(negative.amount, dec("20.00"));
        assert!(negative.validate_against(&totals).is_ok());
    }

    #[test]
    fn form_and_server_agree_on_the_scenarios() {
        let items = [LineItem::new(3.0, 1000.0, 18.0)];
        let client = compute_totals(&items, 100.0);
        let server = SaleTotals::from_items(
            &[SaleItemAmounts::compute(dec("3"), dec("1000"), dec("18"))],
            dec("100"),
            Decimal::ZERO,
        );
        assert!(reconcile(&client, &server).is_empty());
    }

    #[test]
    fn reconcile_reports_each_disagreeing_field() {
        let items = [LineItem::new(1.0, 10.0, 0.0)];
        let client = compute_totals(&items, 0.0);
        let server = SaleTotals::from_items(
            &[SaleItemAmounts::compute(dec("1"), dec("12"), dec("0"))],
            Decimal::ZERO,
            Decimal::ZERO,
        );

        let fields: Vec<TotalField> = reconcile(&client, &server).iter().map(|d| d.field).collect();
        assert_eq!(fields, vec![TotalField::Subtotal, TotalField::GrandTotal]);
    }

    #[test]
    fn format_money_groups_and_pads() {
        assert_eq!(format_money(dec("1500")), "Tsh 1,500.00");
        assert_eq!(format_money(dec("0.5")), "Tsh 0.50");
        assert_eq!(format_money(dec("-1234567.891")), "Tsh -1,234,567.89");
    }

    #[test]
    fn parse_decimal_accepts_scientific_notation() {
        assert_eq!(parse_decimal(" 12.50 ").unwrap(), dec("12.50"));
        assert_eq!(parse_decimal("1e3").unwrap(), dec("1000"));
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn sale_number_uses_creation_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 9, 30, 0).unwrap();
        assert_eq!(sale_number(at), "SALE-20240131093000");
    }
}
