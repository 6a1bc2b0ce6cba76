//! Enrichment reconciliation: insert-or-update batches of vendor-fetched
//! records by their natural (vendor) key.
//!
//! The walk is generic so companies and decision makers share one
//! implementation; the per-type SQL lives in `db`. Re-running a batch is
//! idempotent, and a record that disappears from a later batch is left
//! untouched — reconciliation never deletes.

use anyhow::Result;

use crate::models::{CompanyRecord, PersonRecord};

/// A record carrying the identifier assigned by an external vendor, used as
/// the natural key for upsert.
pub trait VendorKeyed {
    fn vendor_id(&self) -> Option<&str>;
}

impl VendorKeyed for CompanyRecord {
    fn vendor_id(&self) -> Option<&str> {
        self.apollo_id.as_deref()
    }
}

impl VendorKeyed for PersonRecord {
    fn vendor_id(&self) -> Option<&str> {
        self.apollo_id.as_deref()
    }
}

/// Reconcile an ordered batch against persisted rows.
///
/// `upsert` receives the vendor key and the record and returns the internal
/// id (inserting or updating as needed). Records without a vendor id are
/// dropped and reported as `None` in the output, which stays aligned with
/// the input order.
pub fn reconcile<T, F>(records: &[T], mut upsert: F) -> Result<Vec<Option<i64>>>
where
    T: VendorKeyed,
    F: FnMut(&str, &T) -> Result<i64>,
{
    let mut ids = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for record in records {
        match record.vendor_id() {
            Some(key) if !key.is_empty() => ids.push(Some(upsert(key, record)?)),
            _ => {
                skipped += 1;
                ids.push(None);
            }
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, total = records.len(), "dropped records without a vendor id");
    }
    Ok(ids)
}

/// Internal ids that actually got persisted, in input order.
pub fn persisted_ids(ids: &[Option<i64>]) -> Vec<i64> {
    ids.iter().flatten().copied().collect()
}
