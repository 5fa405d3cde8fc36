pub mod raw;

use crate::journal::{JournalLedger, Side};
use crate::ledger::{AmountFormula, EditOutcome, Ledger, used_fields};
use crate::line_item::{Field, LineItem};
use crate::money::Money;
use anyhow::{Context, Error, Result, bail};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use itertools::Itertools;
use serde::Serialize;
use serde_with::skip_serializing_none;
use std::convert::TryFrom;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntryType {
    Purchase,
    Distribution,
    Journal,
}

impl EntryType {
    pub fn default_formula(&self) -> AmountFormula {
        match self {
            EntryType::Purchase => AmountFormula::TaxInclusive,
            EntryType::Distribution => AmountFormula::Simple,
            EntryType::Journal => AmountFormula::Direct,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryType::Purchase => "Purchase",
            EntryType::Distribution => "Distribution",
            EntryType::Journal => "Journal",
        };
        f.pad(name)
    }
}

impl std::str::FromStr for EntryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "purchase" | "book material purchase" | "purchase entry" => Ok(EntryType::Purchase),
            "distribution" | "book distribution" => Ok(EntryType::Distribution),
            "journal" | "purchase journal" | "journal entry" => Ok(EntryType::Journal),
            _ => Err(Error::msg(format!("{} not a valid entry type", s))),
        }
    }
}

#[derive(Debug, Clone)]
pub enum EntryBody {
    Items(Ledger),
    Journal(JournalLedger),
}

/// A store document with every amount derived by the ledger engine.
/// Header fields may still be missing; `validate` decides if it can be posted.
#[derive(Debug, Clone)]
pub struct Entry {
    pub r#type: EntryType,
    pub number: Option<String>,
    pub date: Option<NaiveDate>,
    pub invoice: Option<String>,
    pub party: Option<raw::Party>,
    pub narration: Option<String>,
    body: EntryBody,
}

/// Rebuilds a ledger by replaying each row's fields as edits.
fn replay(formula: AmountFormula, rows: Vec<raw::Row>) -> Result<Ledger> {
    let mut ledger = Ledger::new(formula);
    for (index, row) in rows.iter().enumerate() {
        let id = ledger.add_row();
        for (field, value) in raw::row_fields(row).context(format!("Invalid row {}", index + 1))? {
            if let EditOutcome::Unsupported(field) = ledger.update_field(id, field, &value) {
                bail!("Field {} is not used by {:?} rows (row {})", field, formula, index + 1);
            }
        }
    }
    if ledger.is_empty() {
        ledger.add_row();
    }
    debug!(rows = ledger.len(), total = %ledger.total(), "ledger replayed");
    Ok(ledger)
}

fn non_blank(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl TryFrom<raw::Entry> for Entry {
    type Error = Error;

    fn try_from(
        raw::Entry {
            r#type,
            number,
            date,
            invoice,
            party,
            narration,
            formula,
            items,
            debits,
            credits,
        }: raw::Entry,
    ) -> Result<Self> {
        let r#type: EntryType = r#type.parse()?;
        let label = number.clone().unwrap_or_else(|| "<unnumbered>".to_owned());
        let date = date
            .filter(|d| !d.trim().is_empty())
            .map(|d| d.trim().parse::<NaiveDate>())
            .transpose()
            .context(format!("Invalid date on entry {}", label))?;
        let formula = formula.unwrap_or_else(|| r#type.default_formula());
        let body = match r#type {
            EntryType::Journal => {
                if items.is_some() {
                    bail!("Journal entry {} lists items; use debits and credits", label);
                }
                let debits = replay(formula, debits.unwrap_or_default())
                    .context(format!("Invalid debits on entry {}", label))?;
                let credits = replay(formula, credits.unwrap_or_default())
                    .context(format!("Invalid credits on entry {}", label))?;
                EntryBody::Journal(JournalLedger::from_sides(debits, credits))
            }
            EntryType::Purchase | EntryType::Distribution => {
                if debits.is_some() || credits.is_some() {
                    bail!("{} entry {} lists debits or credits; use items", r#type, label);
                }
                let items = replay(formula, items.unwrap_or_default())
                    .context(format!("Invalid items on entry {}", label))?;
                EntryBody::Items(items)
            }
        };
        Ok(Entry {
            r#type,
            number,
            date,
            invoice,
            party,
            narration,
            body,
        })
    }
}

impl Entry {
    pub fn id(&self) -> String {
        self.number.clone().unwrap_or_default()
    }

    pub fn body(&self) -> &EntryBody {
        &self.body
    }

    pub fn party_name(&self) -> String {
        self.party
            .as_ref()
            .and_then(|p| p.name.clone().or_else(|| p.code.clone()))
            .unwrap_or_default()
    }

    /// Gross amount of an item ledger, debit total of a journal.
    pub fn total(&self) -> Money {
        match &self.body {
            EntryBody::Items(ledger) => ledger.total(),
            EntryBody::Journal(journal) => journal.total_debit(),
        }
    }

    pub fn is_balanced(&self) -> Option<bool> {
        match &self.body {
            EntryBody::Items(_) => None,
            EntryBody::Journal(journal) => Some(journal.is_balanced()),
        }
    }

    /// The submission rules the store screens apply before saving.
    pub fn validate(&self) -> Result<()> {
        if !non_blank(&self.number) {
            bail!("Entry number is required");
        }
        if self.date.is_none() {
            bail!("Entry date is required");
        }
        let party = self.party.clone().unwrap_or_default();
        match (&self.r#type, &self.body) {
            (EntryType::Purchase, EntryBody::Items(ledger)) => {
                if !non_blank(&self.invoice) {
                    bail!("Invoice/Bill number is required");
                }
                if !non_blank(&party.code) || !non_blank(&party.name) {
                    bail!("Supplier information is required");
                }
                if !ledger.has_complete_item() {
                    bail!("At least one item with description, quantity, and rate is required");
                }
            }
            (EntryType::Distribution, EntryBody::Items(ledger)) => {
                if !non_blank(&party.name) {
                    bail!("Recipient information is required");
                }
                if !ledger.has_complete_item() {
                    bail!("At least one item with description, quantity, and rate is required");
                }
            }
            (EntryType::Journal, EntryBody::Journal(journal)) => {
                if !journal.is_balanced() {
                    bail!("Journal entry must be balanced! Debit and Credit totals must match.");
                }
            }
            (r#type, _) => bail!("{} entry has the wrong kind of lines", r#type),
        }
        Ok(())
    }

    /// Validated payload handed to persistence and export.
    pub fn finalize(&self) -> Result<FinalizedEntry> {
        self.validate()
            .context(format!("Entry {} cannot be finalized", self.id()))?;
        let (items, total_quantity, gross_amount, journal) = match &self.body {
            EntryBody::Items(ledger) => (
                Some(ledger.items().to_vec()),
                Some(ledger.total_quantity()),
                Some(ledger.total()),
                None,
            ),
            EntryBody::Journal(journal) => (
                None,
                None,
                None,
                Some(FinalizedJournal {
                    debits: journal.side(Side::Debit).items().to_vec(),
                    credits: journal.side(Side::Credit).items().to_vec(),
                    total_debit: journal.total_debit(),
                    total_credit: journal.total_credit(),
                    balanced: journal.is_balanced(),
                }),
            ),
        };
        Ok(FinalizedEntry {
            r#type: self.r#type,
            number: self.id(),
            date: self.date.context("Entry date is required")?,
            invoice: self.invoice.clone(),
            party: self.party.clone(),
            narration: self.narration.clone(),
            items,
            total_quantity,
            gross_amount,
            journal,
        })
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct FinalizedEntry {
    pub r#type: EntryType,
    pub number: String,
    pub date: NaiveDate,
    pub invoice: Option<String>,
    pub party: Option<raw::Party>,
    pub narration: Option<String>,
    pub items: Option<Vec<LineItem>>,
    pub total_quantity: Option<Decimal>,
    pub gross_amount: Option<Money>,
    pub journal: Option<FinalizedJournal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalizedJournal {
    pub debits: Vec<LineItem>,
    pub credits: Vec<LineItem>,
    pub total_debit: Money,
    pub total_credit: Money,
    pub balanced: bool,
}

fn cell(item: &LineItem, field: Field) -> String {
    let raw = item.raw(field);
    if field.is_numeric() && !raw.trim().is_empty() {
        crate::money::parse_decimal_lenient(raw).normalize().to_string()
    } else {
        raw.to_owned()
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, ledger: &Ledger) -> fmt::Result {
    let fields = used_fields(ledger);
    let header = fields.iter().map(|field| format!("{:>12}", field)).join(" | ");
    writeln!(f, "| {:>3} | {} | {:>12} |", "#", header, "amount")?;
    for item in ledger.items() {
        let cells = fields
            .iter()
            .map(|field| format!("{:>12}", cell(item, *field)))
            .join(" | ");
        writeln!(f, "| {:>3} | {} | {:>12} |", item.id(), cells, item.amount())?;
    }
    Ok(())
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.date.map(|d| d.to_string()).unwrap_or_default();
        let header = [self.id(), date, self.r#type.to_string(), self.party_name()]
            .into_iter()
            .chain(self.invoice.clone())
            .filter(|part| !part.is_empty())
            .join(" | ");
        writeln!(f, "{header}")?;
        match &self.body {
            EntryBody::Items(ledger) => {
                write_items(f, ledger)?;
                if self.r#type == EntryType::Distribution {
                    writeln!(
                        f,
                        "Total Items: {} | Total Quantity: {}",
                        ledger.item_count(),
                        ledger.total_quantity()
                    )?;
                }
                writeln!(f, "Gross Amount: {}", ledger.total().to_currency_string())?;
            }
            EntryBody::Journal(journal) => {
                let acc_pad = 25;
                for (item, amount) in journal.lines() {
                    let account = item.account_head.as_str();
                    let amt_string = amount.to_row_string(12);
                    let memo = item.description.as_str();
                    let line = format!("| {account:acc_pad$} | {amt_string} | {memo}");
                    writeln!(f, "{}", line.trim_end())?;
                }
                let status = if journal.is_balanced() {
                    "balanced"
                } else {
                    "NOT balanced"
                };
                writeln!(
                    f,
                    "Total Debit: {} | Total Credit: {} | {}",
                    journal.total_debit().to_currency_string(),
                    journal.total_credit().to_currency_string(),
                    status
                )?;
            }
        }
        if let Some(narration) = &self.narration {
            writeln!(f, "Narration: {narration}")?;
        }
        Ok(())
    }
}
