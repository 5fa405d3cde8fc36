//! Supplier payments: picking outstanding invoices and totalling what they owe.

use crate::ledger::{AmountFormula, EditOutcome, Ledger};
use crate::lookup::{Scoped, Searchable};
use crate::master::{MasterRecord, Selection};
use crate::money::Money;
use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::debug;

/// An unpaid or part paid supplier invoice.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutstandingInvoice {
    #[serde(alias = "invoiceNo")]
    pub number: String,
    pub supplier_code: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub amount: Money,
    #[serde(alias = "paidAmount")]
    pub paid: Money,
    pub balance: Money,
}

impl OutstandingInvoice {
    /// Due strictly before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date.is_some_and(|due| due < today)
    }
}

impl MasterRecord for OutstandingInvoice {
    fn selection(&self) -> Selection {
        Selection {
            code: Some(self.number.clone()),
            description: self.due_date.map(|due| format!("Due {due}")),
            rate: Some(self.balance),
            ..Default::default()
        }
    }
}

impl Searchable for OutstandingInvoice {
    type Key = ();

    fn search_text(&self, _: ()) -> Vec<&str> {
        vec![self.number.as_str()]
    }
}

impl Scoped for OutstandingInvoice {
    fn scope(&self) -> &str {
        self.supplier_code.as_deref().unwrap_or_default()
    }
}

/// Invoices chosen for one payment, one row per invoice with its balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSelection {
    invoices: Ledger,
}

impl Default for PaymentSelection {
    fn default() -> Self {
        PaymentSelection {
            invoices: Ledger::new(AmountFormula::Direct),
        }
    }
}

impl PaymentSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks or unticks an invoice. Ticking one twice changes nothing.
    pub fn select(&mut self, invoice: &OutstandingInvoice, selected: bool) -> EditOutcome {
        let existing = self
            .invoices
            .items()
            .iter()
            .find(|item| item.code == invoice.number)
            .map(|item| item.id());
        match (selected, existing) {
            (true, Some(_)) => EditOutcome::Updated,
            (true, None) => {
                let blank = self
                    .invoices
                    .items()
                    .iter()
                    .find(|item| item.is_blank())
                    .map(|item| item.id());
                let id = match blank {
                    Some(id) => id,
                    None => self.invoices.add_row(),
                };
                debug!(invoice = %invoice.number, balance = %invoice.balance, "invoice selected");
                self.invoices.apply_selection(id, invoice)
            }
            (false, Some(id)) => {
                self.invoices.remove_row(id);
                EditOutcome::Recomputed
            }
            (false, None) => EditOutcome::RowNotFound,
        }
    }

    /// Numbers of the selected invoices in the order they were ticked.
    pub fn selected(&self) -> Vec<&str> {
        self.invoices
            .items()
            .iter()
            .filter(|item| !item.is_blank())
            .map(|item| item.code.as_str())
            .collect()
    }

    pub fn total(&self) -> Money {
        self.invoices.total()
    }

    pub fn validate(&self) -> Result<()> {
        if self.selected().is_empty() {
            bail!("Please select at least one invoice for payment.");
        }
        Ok(())
    }
}
