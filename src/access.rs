//! Per-photo access lists.
//!
//! On the wire an access list is an array of strings: `["*"]` marks a public
//! photo, anything else is the set of user ids allowed to view it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Wildcard entry granting every authenticated user access.
pub const PUBLIC_MARKER: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum AccessList {
    Public,
    Restricted(BTreeSet<String>),
}

impl AccessList {
    /// Build the access list stored for a new photo.
    ///
    /// No request means public. A restricted list always gets the owner added,
    /// so an empty request yields an owner-only photo.
    pub fn for_owner(owner_id: &str, requested: Option<Vec<String>>) -> Self {
        match requested.map(AccessList::from) {
            None | Some(AccessList::Public) => AccessList::Public,
            Some(AccessList::Restricted(mut viewers)) => {
                viewers.insert(owner_id.to_string());
                AccessList::Restricted(viewers)
            }
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, AccessList::Public)
    }

    pub fn permits(&self, viewer_id: &str) -> bool {
        match self {
            AccessList::Public => true,
            AccessList::Restricted(viewers) => viewers.contains(viewer_id),
        }
    }

    /// Explicit viewer ids; empty for public photos.
    pub fn viewers(&self) -> impl Iterator<Item = &str> {
        let viewers = match self {
            AccessList::Public => None,
            AccessList::Restricted(viewers) => Some(viewers.iter().map(String::as_str)),
        };
        viewers.into_iter().flatten()
    }
}

impl From<Vec<String>> for AccessList {
    fn from(entries: Vec<String>) -> Self {
        if entries.iter().any(|e| e == PUBLIC_MARKER) {
            return AccessList::Public;
        }
        AccessList::Restricted(
            entries
                .into_iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }
}

impl From<AccessList> for Vec<String> {
    fn from(list: AccessList) -> Self {
        match list {
            AccessList::Public => vec![PUBLIC_MARKER.to_string()],
            AccessList::Restricted(viewers) => viewers.into_iter().collect(),
        }
    }
}
