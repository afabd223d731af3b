//! The contribution listing
//!
//! Keeps the advertised catalog and the locally installed contributions in
//! one set of indices:
//!
//! ```text
//! advertised pool ──┐
//!                   ├──► all records (sorted) ──► by category (sorted buckets)
//! installed list ───┘
//! ```
//!
//! Records are shared as `Arc`s and compared by pointer, so a listener that
//! receives `changed(old, new)` can find `old` in whatever it rendered.
//!
//! # Locking
//!
//! Mutations are serialized by a writer gate held for the whole operation.
//! The indices themselves sit behind an `RwLock` that is only held for
//! individual steps and never while listeners run, so listeners and other
//! threads can query the listing at any time.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error::CatalogError;
use super::filter;
use super::notifier::{ChangeNotifier, ContributionChange, ContributionListener};
use super::record::{compare_records, sort_records, ContributionRecord, ContributionType};

type Shared = Arc<ContributionRecord>;

/// Registry of advertised and installed contributions
#[derive(Default)]
pub struct ContributionListing {
    writer: Mutex<()>,
    state: RwLock<ListingState>,
    notifier: ChangeNotifier,
}

#[derive(Default)]
struct ListingState {
    advertised: Vec<Shared>,
    all: Vec<Shared>,
    by_category: HashMap<Option<String>, Vec<Shared>>,
}

impl ListingState {
    fn find(&self, name: &str, contribution_type: ContributionType) -> Option<Shared> {
        self.all
            .iter()
            .find(|r| r.matches_key(name, contribution_type))
            .cloned()
    }

    fn contains(&self, record: &Shared) -> bool {
        self.all.iter().any(|r| Arc::ptr_eq(r, record))
    }

    fn insert(&mut self, record: Shared) {
        self.attach_to_bucket(record.clone());
        self.all.push(record);
        sort_records(&mut self.all);
    }

    fn remove(&mut self, record: &Shared) -> bool {
        let Some(index) = self.all.iter().position(|r| Arc::ptr_eq(r, record)) else {
            return false;
        };
        self.all.remove(index);
        self.detach_from_bucket(record);
        true
    }

    fn replace(&mut self, old: &Shared, new: Shared) -> bool {
        let Some(index) = self.all.iter().position(|r| Arc::ptr_eq(r, old)) else {
            return false;
        };

        if !old.same_key(&new) && self.find(&new.name, new.contribution_type).is_some() {
            tracing::debug!(
                "Refusing to rename {} '{}' to '{}': already listed",
                old.contribution_type,
                old.name,
                new.name
            );
            return false;
        }

        let key_changed = compare_records(old, &new) != Ordering::Equal;
        self.all[index] = new.clone();

        if old.category == new.category {
            if let Some(bucket) = self.by_category.get_mut(&old.category) {
                if let Some(slot) = bucket.iter().position(|r| Arc::ptr_eq(r, old)) {
                    bucket[slot] = new;
                }
                if key_changed {
                    sort_records(bucket);
                }
            }
        } else {
            self.detach_from_bucket(old);
            self.attach_to_bucket(new);
        }

        if key_changed {
            sort_records(&mut self.all);
        }
        true
    }

    fn attach_to_bucket(&mut self, record: Shared) {
        let bucket = self.by_category.entry(record.category.clone()).or_default();
        bucket.push(record);
        sort_records(bucket);
    }

    fn detach_from_bucket(&mut self, record: &Shared) {
        if let Some(bucket) = self.by_category.get_mut(&record.category) {
            bucket.retain(|r| !Arc::ptr_eq(r, record));
            if bucket.is_empty() {
                self.by_category.remove(&record.category);
            }
        }
    }
}

impl ContributionListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the advertised pool with a freshly fetched catalog.
    ///
    /// On error the previous pool and indices are left untouched. On success
    /// every advertised entry becomes browsable:
    /// - an installed record with the same key is kept and re-linked to the
    ///   new advertised entry
    /// - a previously advertised record with the same key is replaced
    /// - previously advertised records missing from the new catalog are removed
    pub fn set_advertised_list(&self, records: Vec<ContributionRecord>) -> Result<(), CatalogError> {
        validate_advertised(&records)?;

        let advertised: Vec<Shared> = records
            .into_iter()
            .map(|mut record| {
                record.installed = false;
                record.advertised_counterpart = None;
                Arc::new(record)
            })
            .collect();

        let _gate = self.gate();
        let previous = std::mem::replace(&mut self.write().advertised, advertised.clone());

        let stale: Vec<Shared> = {
            let state = self.read();
            state
                .all
                .iter()
                .filter(|r| !r.installed)
                .filter(|r| previous.iter().any(|p| Arc::ptr_eq(p, *r)))
                .filter(|r| !advertised.iter().any(|a| a.same_key(r)))
                .cloned()
                .collect()
        };
        for record in &stale {
            self.remove_locked(record);
        }

        for entry in &advertised {
            let existing = self.read().find(&entry.name, entry.contribution_type);
            match existing {
                Some(existing) if existing.installed => {
                    let mut relinked = (*existing).clone();
                    self.merge_advertised_metadata(&mut relinked);
                    self.replace_locked(&existing, Arc::new(relinked));
                }
                Some(existing) => {
                    self.replace_locked(&existing, entry.clone());
                }
                None => self.insert_locked(entry.clone()),
            }
        }

        sort_records(&mut self.write().all);

        tracing::info!(
            "Advertised list updated: {} entries ({} previously, {} withdrawn)",
            advertised.len(),
            previous.len(),
            stale.len()
        );
        Ok(())
    }

    /// Copy category and counterpart from the advertised entry with the
    /// same `(name, type)`, if there is one
    pub fn merge_advertised_metadata(&self, record: &mut ContributionRecord) {
        let advertised = self.get_advertised_contribution(&record.name, record.contribution_type);
        record.advertised_counterpart = advertised.as_ref().map(Arc::downgrade);

        if let Some(category) = advertised.and_then(|a| a.category.clone()) {
            record.category = Some(category);
        }
    }

    /// Merge the locally installed contributions into the listing.
    ///
    /// Each record replaces the listed record with the same `(name, type)`,
    /// or is added if there is none. Records are processed in order.
    pub fn update_installed_list(&self, records: Vec<ContributionRecord>) {
        let _gate = self.gate();

        for mut record in records {
            record.installed = true;
            self.merge_advertised_metadata(&mut record);

            let existing = self.read().find(&record.name, record.contribution_type);
            let record = Arc::new(record);
            match existing {
                Some(existing) => {
                    self.replace_locked(&existing, record);
                }
                None => self.insert_locked(record),
            }
        }
    }

    /// Add a record. A record with the same `(name, type)` already listed is
    /// replaced instead, so keys stay unique.
    pub fn add_contribution(&self, record: impl Into<Shared>) -> Shared {
        let record = record.into();
        let _gate = self.gate();

        let existing = self.read().find(&record.name, record.contribution_type);
        match existing {
            Some(existing) => {
                self.replace_locked(&existing, record.clone());
            }
            None => self.insert_locked(record.clone()),
        }
        record
    }

    /// Remove a record by identity. Returns false if it was not listed.
    pub fn remove_contribution(&self, record: &Shared) -> bool {
        let _gate = self.gate();
        self.remove_locked(record)
    }

    /// Put `new` in `old`'s place. Returns false (and notifies nobody) if
    /// `old` is not listed, or if `new` has a different `(name, type)` that
    /// another listed record already holds.
    ///
    /// The slot is kept as long as the sort key is unchanged. A new name or
    /// type re-sorts; a new category moves the record to that bucket.
    pub fn replace_contribution(&self, old: &Shared, new: impl Into<Shared>) -> bool {
        let _gate = self.gate();
        self.replace_locked(old, new.into())
    }

    pub fn get_advertised_contribution(
        &self,
        name: &str,
        contribution_type: ContributionType,
    ) -> Option<Shared> {
        self.read()
            .advertised
            .iter()
            .find(|r| r.matches_key(name, contribution_type))
            .cloned()
    }

    /// Copy of the advertised pool in catalog order
    pub fn get_advertised_list(&self) -> Vec<Shared> {
        self.read().advertised.clone()
    }

    /// Named categories that currently hold at least one record
    pub fn get_categories(&self) -> BTreeSet<String> {
        self.read().by_category.keys().flatten().cloned().collect()
    }

    pub fn get_all_contributions(&self) -> Vec<Shared> {
        self.read().all.clone()
    }

    /// Sorted copy of one category bucket. `None` selects uncategorized records.
    pub fn get_contributions_by_category(&self, category: Option<&str>) -> Vec<Shared> {
        let mut records = self
            .read()
            .by_category
            .get(&category.map(String::from))
            .cloned()
            .unwrap_or_default();
        sort_records(&mut records);
        records
    }

    /// Records matching `category` and every filter token, in listing order
    pub fn get_filtered_list<S: AsRef<str>>(
        &self,
        category: Option<&str>,
        filters: &[S],
    ) -> Vec<Shared> {
        filter::filter(category, filters, &self.read().all)
    }

    /// True if any listed record has a newer advertised version
    pub fn has_updates(&self) -> bool {
        self.read().all.iter().any(|r| r.has_updates())
    }

    /// Listed records that have a newer advertised version
    pub fn get_updatable(&self) -> Vec<Shared> {
        self.read()
            .all
            .iter()
            .filter(|r| r.has_updates())
            .cloned()
            .collect()
    }

    pub fn contains(&self, record: &Shared) -> bool {
        self.read().contains(record)
    }

    pub fn len(&self) -> usize {
        self.read().all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().all.is_empty()
    }

    pub fn advertised_len(&self) -> usize {
        self.read().advertised.len()
    }

    pub fn add_listener(&self, listener: Arc<dyn ContributionListener>) {
        self.notifier.add_listener(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ContributionListener>) -> bool {
        self.notifier.remove_listener(listener)
    }

    pub fn get_listeners(&self) -> Vec<Arc<dyn ContributionListener>> {
        self.notifier.listeners()
    }

    fn insert_locked(&self, record: Shared) {
        self.write().insert(record.clone());
        tracing::debug!(
            "Added {} '{}' to {:?}",
            record.contribution_type,
            record.name,
            record.category
        );
        self.notifier.notify(&ContributionChange::Added(record));
    }

    fn remove_locked(&self, record: &Shared) -> bool {
        let removed = self.write().remove(record);
        if removed {
            tracing::debug!("Removed {} '{}'", record.contribution_type, record.name);
            self.notifier
                .notify(&ContributionChange::Removed(record.clone()));
        }
        removed
    }

    fn replace_locked(&self, old: &Shared, new: Shared) -> bool {
        let replaced = self.write().replace(old, new.clone());
        if replaced {
            tracing::debug!(
                "Replaced {} '{}' (v{} -> v{})",
                old.contribution_type,
                old.name,
                old.version,
                new.version
            );
            self.notifier.notify(&ContributionChange::Changed {
                old: old.clone(),
                new,
            });
        }
        replaced
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self) -> RwLockReadGuard<'_, ListingState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ListingState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ContributionListing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("ContributionListing")
            .field("advertised", &state.advertised.len())
            .field("all", &state.all.len())
            .field("categories", &state.by_category.len())
            .field("notifier", &self.notifier)
            .finish()
    }
}

/// Reject catalogs that would break the one-record-per-key invariant
fn validate_advertised(records: &[ContributionRecord]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for record in records {
        if record.name.trim().is_empty() {
            return Err(CatalogError::malformed(0, "advertised entry without a name"));
        }
        if !seen.insert((record.name.as_str(), record.contribution_type)) {
            return Err(CatalogError::malformed(
                0,
                format!(
                    "duplicate advertised {} '{}'",
                    record.contribution_type, record.name
                ),
            ));
        }
    }
    Ok(())
}
