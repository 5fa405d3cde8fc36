use crate::money::{Money, parse_decimal_lenient};
use anyhow::{Error, Result, bail};
use num_traits::Zero;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type RowId = u64;

/// The editable fields of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Description,
    Category,
    Standard,
    Unit,
    Code,
    AccountHead,
    Quantity,
    UnitRate,
    TaxPercent,
    Amount,
}

/// What an edit to a field does to the row's derived amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEffect {
    Descriptive,
    AmountInput,
}

impl Field {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Field::Quantity | Field::UnitRate | Field::TaxPercent | Field::Amount
        )
    }

    /// Fields whose values are expected to name a master data record.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Field::Category | Field::Standard | Field::Unit | Field::AccountHead
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Description => "description",
            Field::Category => "category",
            Field::Standard => "standard",
            Field::Unit => "unit",
            Field::Code => "code",
            Field::AccountHead => "account_head",
            Field::Quantity => "quantity",
            Field::UnitRate => "unit_rate",
            Field::TaxPercent => "tax_percent",
            Field::Amount => "amount",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Field {
    type Err = Error;

    /// Accepts the field names used across the store screens.
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        let field = match key.as_str() {
            "description" | "desc" | "bookname" | "name" => Field::Description,
            "category" | "head" | "categoryhead" => Field::Category,
            "standard" | "std" | "class" => Field::Standard,
            "unit" | "unitname" => Field::Unit,
            "code" | "bookcode" | "itemcode" => Field::Code,
            "accounthead" | "account" => Field::AccountHead,
            "quantity" | "qty" => Field::Quantity,
            "unitrate" | "rate" | "unitprice" | "price" => Field::UnitRate,
            "taxpercent" | "tax" | "gst" => Field::TaxPercent,
            "amount" => Field::Amount,
            _ => bail!("Unknown ledger field: {:?}", s),
        };
        Ok(field)
    }
}

/// One row of a ledger. Numeric inputs keep the raw text as typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineItem {
    id: RowId,
    pub description: String,
    pub category: String,
    pub standard: String,
    pub unit: String,
    pub code: String,
    pub account_head: String,
    quantity: String,
    unit_rate: String,
    tax_percent: String,
    amount_input: String,
    amount: Money,
}

impl LineItem {
    pub fn blank(id: RowId) -> Self {
        LineItem {
            id,
            ..Default::default()
        }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    /// Derived amount, only ever written by the ledger's recompute step.
    pub fn amount(&self) -> Money {
        self.amount
    }

    pub(crate) fn set_amount(&mut self, amount: Money) {
        self.amount = amount;
    }

    pub fn raw(&self, field: Field) -> &str {
        match field {
            Field::Description => &self.description,
            Field::Category => &self.category,
            Field::Standard => &self.standard,
            Field::Unit => &self.unit,
            Field::Code => &self.code,
            Field::AccountHead => &self.account_head,
            Field::Quantity => &self.quantity,
            Field::UnitRate => &self.unit_rate,
            Field::TaxPercent => &self.tax_percent,
            Field::Amount => &self.amount_input,
        }
    }

    pub(crate) fn set_raw(&mut self, field: Field, value: &str) {
        let slot = match field {
            Field::Description => &mut self.description,
            Field::Category => &mut self.category,
            Field::Standard => &mut self.standard,
            Field::Unit => &mut self.unit,
            Field::Code => &mut self.code,
            Field::AccountHead => &mut self.account_head,
            Field::Quantity => &mut self.quantity,
            Field::UnitRate => &mut self.unit_rate,
            Field::TaxPercent => &mut self.tax_percent,
            Field::Amount => &mut self.amount_input,
        };
        value.clone_into(slot);
    }

    /// Coerced numeric value of a field, 0 when blank or unparseable.
    pub fn number(&self, field: Field) -> Decimal {
        parse_decimal_lenient(self.raw(field))
    }

    pub fn quantity(&self) -> Decimal {
        self.number(Field::Quantity)
    }

    pub fn unit_rate(&self) -> Decimal {
        self.number(Field::UnitRate)
    }

    pub fn tax_percent(&self) -> Decimal {
        self.number(Field::TaxPercent)
    }

    /// Clears every field, keeping the id.
    pub(crate) fn clear(&mut self) {
        *self = LineItem::blank(self.id);
    }

    pub fn is_blank(&self) -> bool {
        ALL_FIELDS.iter().all(|f| self.raw(*f).trim().is_empty()) && self.amount.is_zero()
    }

    /// Has a description, a positive quantity and a positive rate.
    pub fn is_complete(&self) -> bool {
        !self.description.trim().is_empty()
            && self.quantity() > Decimal::ZERO
            && self.unit_rate() > Decimal::ZERO
    }
}

pub const ALL_FIELDS: [Field; 10] = [
    Field::Description,
    Field::Category,
    Field::Standard,
    Field::Unit,
    Field::Code,
    Field::AccountHead,
    Field::Quantity,
    Field::UnitRate,
    Field::TaxPercent,
    Field::Amount,
];
