//! Class-wise book kits: the books, counts and unit amounts issued to every
//! student of a standard.

use crate::ledger::{AmountFormula, EditOutcome, Ledger};
use crate::line_item::{Field, LineItem, RowId};
use crate::master::Book;
use crate::money::{Money, parse_decimal_lenient, parse_integer_lenient};
use anyhow::{Result, bail};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// One kit per standard. Rows hold a book, a whole quantity and a unit
/// amount, both clamped at zero as they are typed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookKit {
    standard: String,
    books: Ledger,
}

impl BookKit {
    pub fn new(standard: &str) -> Self {
        BookKit {
            standard: standard.trim().to_owned(),
            books: Ledger::new(AmountFormula::Simple),
        }
    }

    pub fn standard(&self) -> &str {
        &self.standard
    }

    pub fn books(&self) -> &Ledger {
        &self.books
    }

    pub fn add_book(&mut self) -> RowId {
        self.books.add_row()
    }

    pub fn remove_book(&mut self, id: RowId) -> bool {
        self.books.remove_row(id)
    }

    /// `Amount` on a kit row is the unit amount, so it edits the rate.
    pub fn update_field(&mut self, id: RowId, field: Field, raw: &str) -> EditOutcome {
        let (field, value) = match field {
            Field::Quantity => (field, clamp_quantity(raw)),
            Field::UnitRate | Field::Amount => (Field::UnitRate, clamp_amount(raw)),
            _ => (field, raw.to_owned()),
        };
        self.books.update_field(id, field, &value)
    }

    /// Picks a book for a row; its default rate is clamped like a typed one.
    pub fn select_book(&mut self, id: RowId, book: &Book) -> EditOutcome {
        let outcome = self.books.apply_selection(id, book);
        if outcome.is_applied() {
            let rate = self
                .books
                .get(id)
                .map(|item| item.raw(Field::UnitRate).to_owned())
                .unwrap_or_default();
            self.update_field(id, Field::UnitRate, &rate);
        }
        outcome
    }

    pub fn total_quantity(&self) -> Decimal {
        self.books.total_quantity()
    }

    /// Sum of unit amount times quantity over every book.
    pub fn total(&self) -> Money {
        self.books.total()
    }

    fn rows(&self) -> impl Iterator<Item = &LineItem> + '_ {
        self.books.items().iter().filter(|item| !item.is_blank())
    }

    /// Submission rules of the kit setup form, checked against the kits already saved.
    pub fn validate(&self, existing: &[BookKit]) -> Result<()> {
        if self.standard.is_empty() {
            bail!("Please select a standard");
        }
        if self.rows().next().is_none() {
            bail!("Please add at least one book");
        }
        let incomplete = self.rows().any(|item| {
            item.code.trim().is_empty()
                || item.quantity() <= Decimal::ZERO
                || item.unit_rate() <= Decimal::ZERO
        });
        if incomplete {
            bail!("All books must have a selected book, positive quantity, and positive amount");
        }
        if existing
            .iter()
            .any(|kit| kit.standard.to_lowercase() == self.standard.to_lowercase())
        {
            bail!(
                "A book setup class for this standard already exists. Please edit the existing setup."
            );
        }
        let codes = self.rows().map(|item| item.code.trim().to_lowercase()).collect_vec();
        if codes.iter().unique().count() != codes.len() {
            bail!("Duplicate books are not allowed. Please remove duplicates.");
        }
        debug!(standard = %self.standard, total = %self.total(), "kit validated");
        Ok(())
    }
}

fn clamp_quantity(raw: &str) -> String {
    parse_integer_lenient(raw).max(Decimal::ZERO).to_string()
}

fn clamp_amount(raw: &str) -> String {
    Money(parse_decimal_lenient(raw).max(Decimal::ZERO))
        .round2()
        .to_string()
}
