//! Line item ledger: rows of quantity, rate and tax inputs whose amounts
//! and running total are recomputed on every edit.

use crate::line_item::{ALL_FIELDS, Field, FieldEffect, LineItem, RowId};
use crate::master::{MasterRecord, ReferenceCatalog, UnknownReference};
use crate::money::{Money, parse_integer_lenient};
use num_traits::Zero;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How a row's amount is derived from its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountFormula {
    /// `quantity * unit_rate`
    #[default]
    Simple,
    /// `quantity * unit_rate` plus `tax_percent` of that
    TaxInclusive,
    /// The entered amount itself, as on journal vouchers
    Direct,
}

impl AmountFormula {
    /// Fields that trigger a recompute under this formula.
    pub fn inputs(&self) -> &'static [Field] {
        match self {
            AmountFormula::Simple => &[Field::Quantity, Field::UnitRate],
            AmountFormula::TaxInclusive => &[Field::Quantity, Field::UnitRate, Field::TaxPercent],
            AmountFormula::Direct => &[Field::Amount],
        }
    }

    pub fn recognises(&self, field: Field) -> bool {
        !field.is_numeric() || self.inputs().contains(&field)
    }

    pub fn effect(&self, field: Field) -> FieldEffect {
        if self.inputs().contains(&field) {
            FieldEffect::AmountInput
        } else {
            FieldEffect::Descriptive
        }
    }

    /// Rounded amount for a row. Overflow degrades to zero.
    pub fn amount(&self, item: &LineItem) -> Money {
        let amount = match self {
            AmountFormula::Simple => item.quantity().checked_mul(item.unit_rate()),
            AmountFormula::TaxInclusive => {
                item.quantity()
                    .checked_mul(item.unit_rate())
                    .and_then(|base| {
                        let tax = base
                            .checked_mul(item.tax_percent())?
                            .checked_div(Decimal::ONE_HUNDRED)?;
                        base.checked_add(tax)
                    })
            }
            AmountFormula::Direct => Some(item.number(Field::Amount)),
        };
        match amount {
            Some(amount) => Money(amount).round2(),
            None => {
                warn!(row = item.id(), formula = ?self, "amount overflowed, using zero");
                Money::zero().round2()
            }
        }
    }
}

/// Result of a single edit against a ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// A descriptive field was set, amounts unchanged
    Updated,
    /// An amount input was set and the row amount and total recomputed
    Recomputed,
    /// Edit applied but the value names no known master record
    UnknownReference(UnknownReference),
    RowNotFound,
    /// The field is not an input of this ledger's formula; nothing changed
    Unsupported(Field),
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            EditOutcome::Updated | EditOutcome::Recomputed | EditOutcome::UnknownReference(_)
        )
    }
}

/// Ordered rows plus their total. The total is refreshed inside every
/// mutating call, so it is never observed stale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ledger {
    formula: AmountFormula,
    items: Vec<LineItem>,
    total: Money,
}

impl Ledger {
    pub fn new(formula: AmountFormula) -> Self {
        Ledger {
            formula,
            items: Vec::new(),
            total: Money::zero().round2(),
        }
    }

    pub fn with_blank_row(formula: AmountFormula) -> Self {
        let mut ledger = Self::new(formula);
        ledger.add_row();
        ledger
    }

    pub fn formula(&self) -> AmountFormula {
        self.formula
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn get(&self, id: RowId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Appends a blank row and returns its id (max id + 1, or 1).
    pub fn add_row(&mut self) -> RowId {
        let id = self.items.iter().map(LineItem::id).max().map_or(1, |max| max + 1);
        let mut item = LineItem::blank(id);
        item.set_amount(Money::zero().round2());
        self.items.push(item);
        debug!(row = id, "row added");
        id
    }

    /// Deletes a row, or clears it in place if it is the only one left.
    pub fn remove_row(&mut self, id: RowId) -> bool {
        let Some(index) = self.items.iter().position(|item| item.id() == id) else {
            return false;
        };
        if self.items.len() == 1 {
            let item = &mut self.items[index];
            item.clear();
            item.set_amount(Money::zero().round2());
            debug!(row = id, "last row cleared");
        } else {
            self.items.remove(index);
            debug!(row = id, "row removed");
        }
        self.recompute_total();
        true
    }

    /// Sets one field from raw form text, recomputing the row amount if the
    /// field feeds the formula, then the total.
    pub fn update_field(&mut self, id: RowId, field: Field, raw: &str) -> EditOutcome {
        if !self.formula.recognises(field) {
            return EditOutcome::Unsupported(field);
        }
        let formula = self.formula;
        let Some(item) = self.items.iter_mut().find(|item| item.id() == id) else {
            return EditOutcome::RowNotFound;
        };
        item.set_raw(field, raw);
        let outcome = match formula.effect(field) {
            FieldEffect::AmountInput => {
                let amount = formula.amount(item);
                item.set_amount(amount);
                debug!(row = id, %field, %amount, "row amount recomputed");
                EditOutcome::Recomputed
            }
            FieldEffect::Descriptive => EditOutcome::Updated,
        };
        self.recompute_total();
        outcome
    }

    /// Like `update_field`, also signalling reference values the catalog doesn't know.
    pub fn update_field_checked(
        &mut self,
        id: RowId,
        field: Field,
        raw: &str,
        catalog: &impl ReferenceCatalog,
    ) -> EditOutcome {
        let outcome = self.update_field(id, field, raw);
        if outcome.is_applied()
            && field.is_reference()
            && !raw.trim().is_empty()
            && !catalog.knows(field, raw.trim())
        {
            let unknown = UnknownReference {
                row: id,
                field,
                value: raw.trim().to_owned(),
            };
            warn!(row = id, %field, value = %unknown.value, "unknown reference");
            return EditOutcome::UnknownReference(unknown);
        }
        outcome
    }

    /// Fills a row from a picked master record. Quantity and tax are left alone.
    pub fn apply_selection(&mut self, id: RowId, record: &impl MasterRecord) -> EditOutcome {
        let formula = self.formula;
        let Some(item) = self.items.iter_mut().find(|item| item.id() == id) else {
            return EditOutcome::RowNotFound;
        };
        let selection = record.selection();
        for (field, value) in selection.descriptive() {
            item.set_raw(field, value);
        }
        if let Some(rate) = selection.rate {
            let rate_field = if formula == AmountFormula::Direct {
                Field::Amount
            } else {
                Field::UnitRate
            };
            item.set_raw(rate_field, &rate.0.to_string());
        }
        let amount = formula.amount(item);
        item.set_amount(amount);
        debug!(row = id, %amount, "selection applied");
        self.recompute_total();
        EditOutcome::Recomputed
    }

    /// Rows that satisfy the submission rule.
    pub fn complete_items(&self) -> impl Iterator<Item = &LineItem> + '_ {
        self.items.iter().filter(|item| item.is_complete())
    }

    pub fn has_complete_item(&self) -> bool {
        self.complete_items().next().is_some()
    }

    /// Whole units across all rows, as the distribution summary counts them.
    pub fn total_quantity(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| parse_integer_lenient(item.raw(Field::Quantity)))
            .try_fold(Decimal::ZERO, |acc, qty| acc.checked_add(qty))
            .unwrap_or_else(|| {
                warn!("total quantity overflowed, using zero");
                Decimal::ZERO
            })
    }

    /// Rows with a description.
    pub fn item_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| !item.description.trim().is_empty())
            .count()
    }

    /// Sum of already rounded row amounts, rounded again.
    fn recompute_total(&mut self) {
        self.total = Money::checked_sum(self.items.iter().map(LineItem::amount)).round2();
    }
}

/// Fields that have a value on any row, in display order.
pub fn used_fields(ledger: &Ledger) -> Vec<Field> {
    ALL_FIELDS
        .iter()
        .copied()
        .filter(|field| ledger.formula().recognises(*field))
        .filter(|field| {
            ledger.formula().inputs().contains(field)
                || ledger.items().iter().any(|item| !item.raw(*field).is_empty())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::{Book, MasterData, Unit};
    use anyhow::Result;

    fn money(s: &str) -> Money {
        s.parse::<Money>().unwrap().round2()
    }

    #[test]
    fn purchase_flow() {
        let mut ledger = Ledger::new(AmountFormula::Simple);
        assert_eq!(ledger.add_row(), 1);
        assert_eq!(ledger.update_field(1, Field::Quantity, "3"), EditOutcome::Recomputed);
        ledger.update_field(1, Field::UnitRate, "150.5");
        assert_eq!(ledger.get(1).unwrap().amount().to_string(), "451.50");
        assert_eq!(ledger.total().to_string(), "451.50");

        assert_eq!(ledger.add_row(), 2);
        ledger.update_field(2, Field::Quantity, "1");
        ledger.update_field(2, Field::UnitRate, "48.50");
        assert_eq!(ledger.get(2).unwrap().amount().to_string(), "48.50");
        assert_eq!(ledger.total().to_string(), "500.00");
    }

    #[test]
    fn tax_inclusive_amount() {
        let mut ledger = Ledger::with_blank_row(AmountFormula::TaxInclusive);
        ledger.update_field(1, Field::Quantity, "2");
        ledger.update_field(1, Field::UnitRate, "99.99");
        ledger.update_field(1, Field::TaxPercent, "12");
        // 199.98 * 1.12 = 223.9776
        assert_eq!(ledger.get(1).unwrap().amount(), money("223.98"));
        assert_eq!(ledger.total(), money("223.98"));

        ledger.update_field(1, Field::TaxPercent, "");
        assert_eq!(ledger.total(), money("199.98"));
    }

    #[test]
    fn garbage_input_counts_as_zero() {
        let mut ledger = Ledger::with_blank_row(AmountFormula::Simple);
        ledger.update_field(1, Field::Quantity, "abc");
        ledger.update_field(1, Field::UnitRate, "10");
        let item = ledger.get(1).unwrap();
        assert_eq!(item.raw(Field::Quantity), "abc");
        assert_eq!(item.amount(), money("0"));
        assert_eq!(ledger.total().to_string(), "0.00");
    }

    #[test]
    fn add_row_uses_max_id() {
        let mut ledger = Ledger::new(AmountFormula::Simple);
        for _ in 0..4 {
            ledger.add_row();
        }
        assert!(ledger.remove_row(3));
        let ids: Vec<RowId> = ledger.items().iter().map(LineItem::id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(ledger.add_row(), 5);
    }

    #[test]
    fn removing_last_row_clears_it() {
        let mut ledger = Ledger::new(AmountFormula::Simple);
        ledger.add_row();
        ledger.add_row();
        ledger.update_field(2, Field::Description, "Atlas");
        ledger.update_field(2, Field::Quantity, "4");
        ledger.update_field(2, Field::UnitRate, "25");
        ledger.update_field(1, Field::Quantity, "1");
        ledger.update_field(1, Field::UnitRate, "5");
        assert_eq!(ledger.total(), money("105"));

        assert!(ledger.remove_row(1));
        assert_eq!(ledger.total(), money("100"));
        assert!(ledger.remove_row(2));
        assert_eq!(ledger.len(), 1);
        let item = &ledger.items()[0];
        assert_eq!(item.id(), 2);
        assert!(item.is_blank());
        assert_eq!(ledger.total(), money("0"));

        assert!(!ledger.remove_row(7));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn total_sums_rounded_rows() {
        let mut ledger = Ledger::new(AmountFormula::Simple);
        for id in 1..=3 {
            ledger.add_row();
            ledger.update_field(id, Field::Quantity, "1");
            ledger.update_field(id, Field::UnitRate, "0.005");
        }
        // each row rounds to 0.01
        assert_eq!(ledger.total(), money("0.03"));
    }

    #[test]
    fn unsupported_and_missing() {
        let mut ledger = Ledger::with_blank_row(AmountFormula::Simple);
        assert_eq!(
            ledger.update_field(1, Field::TaxPercent, "5"),
            EditOutcome::Unsupported(Field::TaxPercent)
        );
        assert_eq!(ledger.get(1).unwrap().raw(Field::TaxPercent), "");
        assert_eq!(
            ledger.update_field(9, Field::Quantity, "5"),
            EditOutcome::RowNotFound
        );
        assert_eq!(
            ledger.update_field(1, Field::Unit, "Box"),
            EditOutcome::Updated
        );
    }

    #[test]
    fn selection_fills_rate_and_recomputes() {
        let mut ledger = Ledger::with_blank_row(AmountFormula::TaxInclusive);
        ledger.update_field(1, Field::Quantity, "2");
        ledger.update_field(1, Field::TaxPercent, "10");
        let book = Book {
            code: "BK-7".to_owned(),
            name: "English Reader".to_owned(),
            category: "Text Books".to_owned(),
            standard: "VII".to_owned(),
            amount: Some(money("500")),
        };
        assert_eq!(ledger.apply_selection(1, &book), EditOutcome::Recomputed);
        let item = ledger.get(1).unwrap();
        assert_eq!(item.description, "English Reader");
        assert_eq!(item.category, "Text Books");
        assert_eq!(item.raw(Field::Quantity), "2");
        assert_eq!(item.raw(Field::TaxPercent), "10");
        assert_eq!(item.amount().to_string(), "1100.00");
        assert_eq!(ledger.total().to_string(), "1100.00");
    }

    #[test]
    fn selection_without_rate_keeps_rate() {
        let mut ledger = Ledger::with_blank_row(AmountFormula::Simple);
        ledger.update_field(1, Field::Quantity, "3");
        ledger.update_field(1, Field::UnitRate, "10");
        let unit = Unit {
            name: "Box".to_owned(),
        };
        ledger.apply_selection(1, &unit);
        let item = ledger.get(1).unwrap();
        assert_eq!(item.unit, "Box");
        assert_eq!(item.amount(), money("30"));
        assert_eq!(
            ledger.apply_selection(4, &unit),
            EditOutcome::RowNotFound
        );
    }

    #[test]
    fn unknown_unit_is_signalled() -> Result<()> {
        let master: MasterData = serde_yaml::from_str("units: [{name: Box}, {name: Packet}]")?;
        let mut ledger = Ledger::with_blank_row(AmountFormula::Simple);
        assert_eq!(
            ledger.update_field_checked(1, Field::Unit, "packet", &master),
            EditOutcome::Updated
        );
        let outcome = ledger.update_field_checked(1, Field::Unit, "Crate", &master);
        assert_eq!(
            outcome,
            EditOutcome::UnknownReference(UnknownReference {
                row: 1,
                field: Field::Unit,
                value: "Crate".to_owned(),
            })
        );
        // the edit still lands
        assert_eq!(ledger.get(1).unwrap().unit, "Crate");
        assert_eq!(
            ledger.update_field_checked(1, Field::Description, "Anything", &master),
            EditOutcome::Updated
        );
        Ok(())
    }

    #[test]
    fn direct_amounts() {
        let mut ledger = Ledger::with_blank_row(AmountFormula::Direct);
        assert_eq!(
            ledger.update_field(1, Field::Quantity, "2"),
            EditOutcome::Unsupported(Field::Quantity)
        );
        ledger.update_field(1, Field::Amount, "1000.004");
        assert_eq!(ledger.total().to_string(), "1000.00");
    }

    #[test]
    fn overflow_degrades_to_zero() {
        let mut ledger = Ledger::with_blank_row(AmountFormula::Simple);
        ledger.update_field(1, Field::Quantity, "79000000000000000000000000000");
        ledger.update_field(1, Field::UnitRate, "10");
        assert_eq!(ledger.total(), money("0"));
    }

    #[test]
    fn large_rows_never_panic() {
        let mut ledger = Ledger::with_blank_row(AmountFormula::Simple);
        ledger.add_row();
        for id in [1, 2] {
            ledger.update_field(id, Field::Quantity, "50000000000000000000000000000");
            ledger.update_field(id, Field::UnitRate, "1");
        }
        assert_eq!(ledger.total().to_string(), "0.00");

        // each row fits two decimals, their sum doesn't
        for id in [1, 2] {
            ledger.update_field(id, Field::Quantity, "500000000000000000000000000");
        }
        assert_eq!(
            ledger.get(1).unwrap().amount().to_string(),
            "500000000000000000000000000.00"
        );
        assert_eq!(ledger.total().to_string(), "0.00");
        assert_eq!(ledger.total().0.scale(), 2);
    }

    #[test]
    fn amount_always_has_two_decimals() {
        let mut ledger = Ledger::with_blank_row(AmountFormula::Simple);
        ledger.update_field(1, Field::Quantity, "7000000000000000000000000000");
        ledger.update_field(1, Field::UnitRate, "1");
        assert_eq!(ledger.get(1).unwrap().amount().to_string(), "0.00");
        assert_eq!(ledger.total().to_string(), "0.00");
    }

    #[test]
    fn quantity_footer() {
        let mut ledger = Ledger::with_blank_row(AmountFormula::Simple);
        ledger.add_row();
        ledger.add_row();
        ledger.update_field(1, Field::Description, "Maths Std 5");
        ledger.update_field(1, Field::Quantity, "2");
        ledger.update_field(2, Field::Description, "Atlas");
        ledger.update_field(2, Field::Quantity, "3.9");
        ledger.update_field(3, Field::Quantity, "abc");
        assert_eq!(ledger.total_quantity(), Decimal::from(5));
        assert_eq!(ledger.item_count(), 2);
    }
}
