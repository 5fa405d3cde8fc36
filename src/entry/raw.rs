use crate::ledger::AmountFormula;
use crate::line_item::Field;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use serde_yaml::{Mapping, Value};

/// Raw struct deserilized from yaml
#[skip_serializing_none]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Default)]
pub struct Entry {
    pub r#type: String,
    pub number: Option<String>,
    pub date: Option<String>,
    pub invoice: Option<String>,
    pub party: Option<Party>,
    pub narration: Option<String>,
    pub formula: Option<AmountFormula>, // overrides the default for the type
    pub items: Option<Vec<Row>>,
    pub debits: Option<Vec<Row>>,
    pub credits: Option<Vec<Row>>,
}

/// Supplier on a purchase, recipient on a distribution
#[skip_serializing_none]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Default)]
pub struct Party {
    pub code: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>, // e.g. student, staff
}

/// One row as typed on the form: screen field name to raw value
pub type Row = Mapping;

/// Keys written by the screens that are derived and get recomputed instead
const DERIVED_KEYS: [&str; 3] = ["id", "total", "totalamount"];

/// Raw field values of a row in document order, as text.
pub fn row_fields(row: &Row) -> Result<Vec<(Field, String)>> {
    let mut fields = Vec::with_capacity(row.len());
    for (key, value) in row {
        let key = key.as_str().context(format!("Row key {:?} is not text", key))?;
        if DERIVED_KEYS.contains(&key.to_lowercase().as_str()) {
            continue;
        }
        let field: Field = key.parse()?;
        let text = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => bail!("Row field {} must be a plain value, got {:?}", key, value),
        };
        fields.push((field, text));
    }
    Ok(fields)
}
