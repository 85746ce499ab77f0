use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::attrs::AttrPatch;
use super::finalize::FinalizeAction;
use super::{Board, CardId};
use crate::error::BoardError;

/// Physical address of a fully bound group: its name plus the value of
/// every sub-field, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    name: String,
    params: Vec<(String, String)>,
}

impl GroupKey {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, "[{}]", params.join(","))?;
        }
        Ok(())
    }
}

/// A group template together with the sub-field values bound so far.
///
/// Binding never mutates: [`GroupRef::bind`] returns a new selection and the
/// template it came from stays unbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRef {
    name: String,
    sub_fields: Arc<[String]>,
    params: BTreeMap<String, String>,
}

impl GroupRef {
    pub fn new<I, S>(name: impl Into<String>, sub_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GroupRef {
            name: name.into(),
            sub_fields: sub_fields.into_iter().map(Into::into).collect(),
            params: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sub_fields(&self) -> &[String] {
        &self.sub_fields
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Binds one sub-field. Keys the group is not partitioned by are ignored.
    pub fn bind(&self, key: &str, value: impl Into<String>) -> Self {
        let mut copy = self.clone();
        if copy.sub_fields.iter().any(|f| f == key) {
            copy.params.insert(key.to_string(), value.into());
        } else {
            tracing::debug!(group = %self.name, key, "ignoring binding of unknown sub-field");
        }
        copy
    }

    pub fn is_bound(&self) -> bool {
        self.sub_fields.iter().all(|f| self.params.contains_key(f))
    }

    pub fn key(&self) -> Result<GroupKey, BoardError> {
        let mut params = Vec::with_capacity(self.sub_fields.len());
        for field in self.sub_fields.iter() {
            match self.params.get(field) {
                Some(value) => params.push((field.clone(), value.clone())),
                None => {
                    return Err(BoardError::UnboundSelection {
                        group: self.name.clone(),
                        missing: field.clone(),
                    })
                }
            }
        }
        Ok(GroupKey {
            name: self.name.clone(),
            params,
        })
    }
}

/// A region of the board that cards can be moved into.
pub trait CardGroup: fmt::Debug + Send + Sync {
    fn group(&self) -> &GroupRef;

    /// Copy of this group with another selection.
    fn with_group(&self, group: GroupRef) -> Self
    where
        Self: Sized;

    fn select(&self, key: &str, value: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.with_group(self.group().bind(key, value))
    }

    fn key(&self) -> Result<GroupKey, BoardError> {
        self.group().key()
    }

    /// Key of this group if it can take cards on `board` right now. Moves
    /// check this before touching their source.
    fn ready(&self, _board: &Board) -> Result<GroupKey, BoardError> {
        self.key()
    }

    /// Takes ownership of an in-transit card, tagging it with `patch`.
    ///
    /// The card's attributes change immediately; any bookkeeping that must
    /// wait for the transition is returned as a finalize action.
    fn receive_card(
        &self,
        board: &mut Board,
        card: CardId,
        patch: &AttrPatch,
    ) -> Result<Option<FinalizeAction>, BoardError>;
}
