#![allow(clippy::new_without_default)]

use self::JournalAmount::*;
use crate::ledger::{AmountFormula, Ledger};
use crate::line_item::LineItem;
use crate::money::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Debit and credit totals closer than this count as balanced.
pub const BALANCE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Totals too far apart to subtract are never balanced.
pub fn is_balanced(total_debit: Money, total_credit: Money) -> bool {
    total_debit
        .checked_sub(total_credit)
        .is_some_and(|diff| diff.abs().0 < BALANCE_EPSILON)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Debit,
    Credit,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Debit => f.write_str("Dr"),
            Side::Credit => f.write_str("Cr"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum JournalAmount {
    Debit(Money),
    Credit(Money),
}

impl JournalAmount {
    pub fn new(side: Side, money: Money) -> Self {
        match side {
            Side::Debit => Debit(money),
            Side::Credit => Credit(money),
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Debit(_) => Side::Debit,
            Credit(_) => Side::Credit,
        }
    }

    pub fn to_row_string(&self, pad: usize) -> String {
        match self {
            Debit(money) => format!("{:>pad$} | {:>pad$}", money.to_string(), ""),
            Credit(money) => format!("{:>pad$} | {:>pad$}", "", money.to_string()),
        }
    }
}

/// Two independently totalled ledgers that must agree before posting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalLedger {
    debits: Ledger,
    credits: Ledger,
}

impl JournalLedger {
    /// Direct amount entry on both sides, one blank row each.
    pub fn new() -> Self {
        Self::with_formula(AmountFormula::Direct)
    }

    pub fn with_formula(formula: AmountFormula) -> Self {
        JournalLedger {
            debits: Ledger::with_blank_row(formula),
            credits: Ledger::with_blank_row(formula),
        }
    }

    /// Empty sides get a blank row so neither is ever shown without one.
    pub fn from_sides(mut debits: Ledger, mut credits: Ledger) -> Self {
        for ledger in [&mut debits, &mut credits] {
            if ledger.is_empty() {
                ledger.add_row();
            }
        }
        JournalLedger { debits, credits }
    }

    pub fn side(&self, side: Side) -> &Ledger {
        match side {
            Side::Debit => &self.debits,
            Side::Credit => &self.credits,
        }
    }

    /// Edits go through the side's own ledger, which keeps its total current.
    pub fn side_mut(&mut self, side: Side) -> &mut Ledger {
        match side {
            Side::Debit => &mut self.debits,
            Side::Credit => &mut self.credits,
        }
    }

    pub fn total_debit(&self) -> Money {
        self.debits.total()
    }

    pub fn total_credit(&self) -> Money {
        self.credits.total()
    }

    /// Debit minus credit, `None` if it doesn't fit.
    pub fn difference(&self) -> Option<Money> {
        self.total_debit().checked_sub(self.total_credit())
    }

    pub fn is_balanced(&self) -> bool {
        is_balanced(self.total_debit(), self.total_credit())
    }

    /// Debit rows then credit rows, with their amounts.
    pub fn lines(&self) -> impl Iterator<Item = (&LineItem, JournalAmount)> + '_ {
        let debits = self.debits.items().iter().map(|i| (i, Debit(i.amount())));
        let credits = self.credits.items().iter().map(|i| (i, Credit(i.amount())));
        debits.chain(credits)
    }
}
