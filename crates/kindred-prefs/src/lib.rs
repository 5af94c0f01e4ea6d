//! Dual-indexed sparse preference storage.
//!
//! A [`PreferenceStore`] holds every observed (user, item, weight) interaction
//! twice: once grouped by user index and once grouped by item index, so both
//! "what did this user touch" and "who touched this item" are O(1) lookups.
//! The store is immutable after construction and safe to share across threads.

use kindred_core::index::{ItemIndex, UserIndex};
use smallvec::SmallVec;
use std::io::BufRead;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("i/o error reading preference data")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected at least 2 tab-separated fields")]
    MalformedLine { line: usize },

    #[error("line {line}: unparseable user token {token:?}")]
    BadUser { line: usize, token: String },

    #[error("line {line}: unparseable item token {token:?}")]
    BadItem { line: usize, token: String },

    #[error("line {line}: unparseable weight token {token:?}")]
    BadWeight { line: usize, token: String },

    #[error("line {line}: user {token:?} is not present in the user index")]
    UnknownUser { line: usize, token: String },

    #[error("line {line}: item {token:?} is not present in the item index")]
    UnknownItem { line: usize, token: String },

    #[error("record ({uidx}, {iidx}) is out of range for {num_users} users / {num_items} items")]
    IndexOutOfRange {
        uidx: u32,
        iidx: u32,
        num_users: usize,
        num_items: usize,
    },

    #[error("record ({uidx}, {iidx}) carries a NaN weight")]
    NanWeight { uidx: u32, iidx: u32 },
}

/// Weight parser used by [`PreferenceStore::load`] when callers have no
/// special needs: a missing third field defaults to 1.0, NaN is rejected.
pub fn default_weight_parser(raw: Option<&str>) -> Option<f64> {
    match raw {
        None => Some(1.0),
        Some(tok) => tok.trim().parse::<f64>().ok().filter(|w| !w.is_nan()),
    }
}

type Profiles = Vec<Option<Vec<(u32, f64)>>>;

/// Immutable dual-indexed store of (user, item, weight) records.
///
/// Entities with no preferences never allocate a backing vector; their
/// profile reads back as an empty slice.
#[derive(Debug)]
pub struct PreferenceStore {
    num_preferences: usize,
    by_user: Profiles,
    by_item: Profiles,
}

fn append_pref(slots: &mut Profiles, idx: u32, pref: (u32, f64)) -> bool {
    match slots.get_mut(idx as usize) {
        Some(slot) => {
            slot.get_or_insert_with(Vec::new).push(pref);
            true
        }
        None => false,
    }
}

impl PreferenceStore {
    /// Builds a store from already-resolved index triples in a single pass.
    ///
    /// O(P) time and additional memory for P records, independent of the
    /// sparsity pattern. Any out-of-range index or NaN weight aborts the
    /// whole build.
    pub fn from_records<It>(
        records: It,
        num_users: usize,
        num_items: usize,
    ) -> Result<Self, LoadError>
    where
        It: IntoIterator<Item = (u32, u32, f64)>,
    {
        let mut by_user: Profiles = vec![None; num_users];
        let mut by_item: Profiles = vec![None; num_items];
        let mut num_preferences = 0usize;

        for (uidx, iidx, weight) in records {
            if weight.is_nan() {
                return Err(LoadError::NanWeight { uidx, iidx });
            }
            let in_range = append_pref(&mut by_user, uidx, (iidx, weight))
                && append_pref(&mut by_item, iidx, (uidx, weight));
            if !in_range {
                return Err(LoadError::IndexOutOfRange {
                    uidx,
                    iidx,
                    num_users,
                    num_items,
                });
            }
            num_preferences += 1;
        }

        Ok(Self {
            num_preferences,
            by_user,
            by_item,
        })
    }

    /// Loads newline-delimited, tab-separated records:
    /// `rawUser \t rawItem \t [weight] \t [ignored...]`.
    ///
    /// Token parsing is delegated to the supplied closures; raw identifiers
    /// are resolved through the index collaborators. Every malformed or
    /// unresolvable line is fatal to the whole load.
    pub fn load<U, I, R, PU, PI, PW>(
        reader: R,
        user_parser: PU,
        item_parser: PI,
        weight_parser: PW,
        users: &impl UserIndex<U>,
        items: &impl ItemIndex<I>,
    ) -> Result<Self, LoadError>
    where
        R: BufRead,
        PU: Fn(&str) -> Option<U>,
        PI: Fn(&str) -> Option<I>,
        PW: Fn(Option<&str>) -> Option<f64>,
    {
        let num_users = users.num_users();
        let num_items = items.num_items();
        let mut by_user: Profiles = vec![None; num_users];
        let mut by_item: Profiles = vec![None; num_items];
        let mut num_preferences = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = line_no + 1;

            let fields: SmallVec<[&str; 4]> = line.splitn(4, '\t').collect();
            if fields.len() < 2 {
                return Err(LoadError::MalformedLine { line: line_no });
            }

            let user = user_parser(fields[0]).ok_or_else(|| LoadError::BadUser {
                line: line_no,
                token: fields[0].to_string(),
            })?;
            let item = item_parser(fields[1]).ok_or_else(|| LoadError::BadItem {
                line: line_no,
                token: fields[1].to_string(),
            })?;

            let weight_tok = fields.get(2).copied();
            let weight = weight_parser(weight_tok)
                .filter(|w| !w.is_nan())
                .ok_or_else(|| LoadError::BadWeight {
                    line: line_no,
                    token: weight_tok.unwrap_or_default().to_string(),
                })?;

            let uidx = users.uidx_of(&user).ok_or_else(|| LoadError::UnknownUser {
                line: line_no,
                token: fields[0].to_string(),
            })?;
            let iidx = items.iidx_of(&item).ok_or_else(|| LoadError::UnknownItem {
                line: line_no,
                token: fields[1].to_string(),
            })?;

            let in_range = append_pref(&mut by_user, uidx, (iidx, weight))
                && append_pref(&mut by_item, iidx, (uidx, weight));
            if !in_range {
                return Err(LoadError::IndexOutOfRange {
                    uidx,
                    iidx,
                    num_users,
                    num_items,
                });
            }
            num_preferences += 1;
        }

        info!(
            records = num_preferences,
            users = num_users,
            items = num_items,
            "loaded preference data"
        );

        Ok(Self {
            num_preferences,
            by_user,
            by_item,
        })
    }

    /// The (item, weight) profile of a user. Empty slice for users with no
    /// preferences.
    #[inline]
    pub fn user_prefs(&self, uidx: u32) -> &[(u32, f64)] {
        self.by_user
            .get(uidx as usize)
            .and_then(|s| s.as_deref())
            .unwrap_or(&[])
    }

    /// The (user, weight) profile of an item.
    #[inline]
    pub fn item_prefs(&self, iidx: u32) -> &[(u32, f64)] {
        self.by_item
            .get(iidx as usize)
            .and_then(|s| s.as_deref())
            .unwrap_or(&[])
    }

    pub fn num_preferences(&self) -> usize {
        self.num_preferences
    }

    pub fn num_users(&self) -> usize {
        self.by_user.len()
    }

    pub fn num_items(&self) -> usize {
        self.by_item.len()
    }

    pub fn user_profile_size(&self, uidx: u32) -> usize {
        self.user_prefs(uidx).len()
    }

    pub fn item_profile_size(&self, iidx: u32) -> usize {
        self.item_prefs(iidx).len()
    }

    /// User indices that have at least one preference.
    pub fn users_with_preferences(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_user
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(idx, _)| idx as u32)
    }

    /// Item indices that have at least one preference.
    pub fn items_with_preferences(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_item
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(idx, _)| idx as u32)
    }

    pub fn num_users_with_preferences(&self) -> usize {
        self.by_user.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn num_items_with_preferences(&self) -> usize {
        self.by_item.iter().filter(|slot| slot.is_some()).count()
    }
}
