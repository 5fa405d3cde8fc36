//! Master data records consumed by ledgers: books, suppliers, units,
//! standards, category and account heads, districts and students.

use crate::line_item::{Field, RowId};
use crate::lookup::{Scoped, Searchable};
use crate::money::Money;
use crate::payment::OutstandingInvoice;
use anyhow::{Context, Result};
use async_std::fs;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Values a picked record writes into a row. `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub description: Option<String>,
    pub category: Option<String>,
    pub standard: Option<String>,
    pub unit: Option<String>,
    pub code: Option<String>,
    pub account_head: Option<String>,
    pub rate: Option<Money>,
}

impl Selection {
    pub fn descriptive(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        [
            (Field::Description, &self.description),
            (Field::Category, &self.category),
            (Field::Standard, &self.standard),
            (Field::Unit, &self.unit),
            (Field::Code, &self.code),
            (Field::AccountHead, &self.account_head),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
    }
}

/// A record that can be picked from a dropdown to fill a ledger row.
pub trait MasterRecord {
    fn selection(&self) -> Selection;
}

/// Lets the engine ask whether a typed reference names a known record.
pub trait ReferenceCatalog {
    fn knows(&self, field: Field, value: &str) -> bool;
}

/// A reference value on a row that matched no master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownReference {
    pub row: RowId,
    pub field: Field,
    pub value: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    #[serde(alias = "bookCode")]
    pub code: String,
    #[serde(alias = "bookName", alias = "bookname")]
    pub name: String,
    pub category: String,
    pub standard: String,
    /// Default unit rate
    pub amount: Option<Money>,
}

impl MasterRecord for Book {
    fn selection(&self) -> Selection {
        let non_empty = |s: &String| (!s.is_empty()).then(|| s.clone());
        Selection {
            description: Some(self.name.clone()),
            category: non_empty(&self.category),
            standard: non_empty(&self.standard),
            code: non_empty(&self.code),
            rate: Some(self.amount.unwrap_or_default()),
            ..Default::default()
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Supplier {
    #[serde(alias = "supplierCode")]
    pub code: String,
    #[serde(alias = "supplierName")]
    pub name: String,
    pub address: Option<String>,
    #[serde(alias = "phoneNumber")]
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact_person: Option<String>,
    pub gst: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Unit {
    #[serde(alias = "unitName")]
    pub name: String,
}

impl MasterRecord for Unit {
    fn selection(&self) -> Selection {
        Selection {
            unit: Some(self.name.clone()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Standard {
    #[serde(alias = "standard")]
    pub name: String,
}

impl MasterRecord for Standard {
    fn selection(&self) -> Selection {
        Selection {
            standard: Some(self.name.clone()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryHead {
    #[serde(alias = "categoryName", alias = "newCategory")]
    pub category: String,
    #[serde(alias = "account_head")]
    pub account_head: String,
}

impl MasterRecord for CategoryHead {
    fn selection(&self) -> Selection {
        Selection {
            category: Some(self.category.clone()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountHead {
    pub name: String,
}

impl MasterRecord for AccountHead {
    fn selection(&self) -> Selection {
        Selection {
            account_head: Some(self.name.clone()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct District {
    pub state: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Student {
    pub admission_number: String,
    #[serde(alias = "studentName")]
    pub name: String,
    pub standard: String,
    pub section: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplierKey {
    Code,
    Name,
}

impl Searchable for Supplier {
    type Key = SupplierKey;

    fn search_text(&self, key: SupplierKey) -> Vec<&str> {
        match key {
            SupplierKey::Code => vec![self.code.as_str()],
            SupplierKey::Name => vec![self.name.as_str()],
        }
    }
}

impl Searchable for Book {
    type Key = ();

    fn search_text(&self, _: ()) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Searchable for Unit {
    type Key = ();

    fn search_text(&self, _: ()) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Searchable for Standard {
    type Key = ();

    fn search_text(&self, _: ()) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Searchable for CategoryHead {
    type Key = ();

    fn search_text(&self, _: ()) -> Vec<&str> {
        vec![self.category.as_str(), self.account_head.as_str()]
    }
}

impl Searchable for AccountHead {
    type Key = ();

    fn search_text(&self, _: ()) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Searchable for Student {
    type Key = ();

    fn search_text(&self, _: ()) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.standard.as_str(),
            self.section.as_str(),
            self.admission_number.as_str(),
        ]
    }
}

impl Searchable for District {
    type Key = ();

    fn search_text(&self, _: ()) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Scoped for District {
    fn scope(&self) -> &str {
        self.state.as_str()
    }
}

impl Scoped for Book {
    fn scope(&self) -> &str {
        self.standard.as_str()
    }
}

impl Scoped for Student {
    fn scope(&self) -> &str {
        self.standard.as_str()
    }
}

/// Every master list a store form works against, passed in explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterData {
    pub books: Vec<Book>,
    pub suppliers: Vec<Supplier>,
    pub units: Vec<Unit>,
    pub standards: Vec<Standard>,
    pub category_heads: Vec<CategoryHead>,
    pub account_heads: Vec<AccountHead>,
    pub districts: Vec<District>,
    pub students: Vec<Student>,
    pub outstanding_invoices: Vec<OutstandingInvoice>,
}

impl MasterData {
    pub async fn from_file(file: &str) -> Result<Self> {
        let doc = fs::read_to_string(file)
            .await
            .context(format!("Failed to read master data {}", file))?;
        serde_yaml::from_str(&doc).context(format!("Failed to deserialize master data {}", file))
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl ReferenceCatalog for MasterData {
    fn knows(&self, field: Field, value: &str) -> bool {
        match field {
            Field::Unit => self.units.iter().any(|u| same_name(&u.name, value)),
            Field::Standard => self.standards.iter().any(|s| same_name(&s.name, value)),
            Field::Category => self
                .category_heads
                .iter()
                .any(|h| same_name(&h.category, value)),
            Field::AccountHead => {
                self.account_heads.iter().any(|h| same_name(&h.name, value))
                    || self
                        .category_heads
                        .iter()
                        .any(|h| same_name(&h.account_head, value))
            }
            _ => true,
        }
    }
}
