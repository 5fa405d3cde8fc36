pub mod entry;
pub mod journal;
pub mod kit;
pub mod ledger;
pub mod line_item;
pub mod lines;
pub mod lookup;
pub mod master;
pub mod money;
pub mod payment;
pub mod sequence;

use anyhow::{Context, Error, Result};
use entry::Entry;
use futures::future;
use futures::stream::{TryStream, TryStreamExt};
use lines_ext::LinesExt;
use money::Money;
use std::borrow::ToOwned;
use std::collections::HashMap;
use std::convert::TryInto;
use tracing::debug;

pub use journal::{JournalLedger, Side};
pub use kit::BookKit;
pub use ledger::{AmountFormula, EditOutcome, Ledger};
pub use line_item::{Field, LineItem, RowId};
pub use payment::{OutstandingInvoice, PaymentSelection};

/// Saved store documents read from a file, a directory tree, or stdin.
pub struct StoreBook {
    path: Option<String>,
}

impl StoreBook {
    /// `None` reads stdin
    pub fn new(path: Option<&str>) -> Self {
        StoreBook {
            path: path.map(ToOwned::to_owned),
        }
    }

    pub fn entries(&self) -> impl TryStream<Ok = Entry, Error = Error> + '_ {
        lines::lines(self.path.clone())
            .chunk_by_line("---")
            .map_err(|err: std::io::Error| Error::new(err)) // map to anyhow::Error from here on
            .try_filter(|doc: &String| future::ready(!doc.trim().is_empty()))
            .and_then(|doc: String| async move {
                let raw: entry::raw::Entry = serde_yaml::from_str(doc.as_str())
                    .context(format!("Failed to deserialize entry:\n{}", doc))?;
                let entry: Entry = raw.try_into()?;
                debug!(entry = %entry.id(), total = %entry.total(), "entry loaded");
                Ok(entry)
            })
    }

    /// Gross totals per supplier or recipient over purchase and distribution entries.
    pub async fn totals_by_party(&self) -> Result<HashMap<String, Money>> {
        self.entries()
            .try_filter(|entry| future::ready(entry.is_balanced().is_none()))
            .try_fold(HashMap::new(), |mut acc, entry| async move {
                let party = entry.party_name();
                let running: &mut Money = acc.entry(party.clone()).or_default();
                *running = running
                    .checked_add(entry.total())
                    .context(format!("Total for {} overflowed at entry {}", party, entry.id()))?;
                Ok(acc)
            })
            .await
    }
}
