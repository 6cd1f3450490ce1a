//! Shopping list records.

use crate::{error::Result, Error, ListId, OwnerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A shopping list owned by a single user.
///
/// `id` is assigned by the remote list source when the list is created. A list
/// that has only been applied locally (an optimistic write) has no id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    /// Remote identifier, absent while the list is pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ListId>,
    /// Identity of the user who created the list
    #[serde(alias = "uid")]
    pub owner_id: OwnerId,
    /// Display name
    pub name: String,
    /// Items in insertion order
    #[serde(default)]
    pub items: Vec<String>,
}

impl ShoppingList {
    /// Create a new list that has not been persisted remotely.
    pub fn new(
        owner_id: impl Into<OwnerId>,
        name: impl Into<String>,
        items: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: None,
            owner_id: owner_id.into(),
            name: name.into(),
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach a remote identifier.
    pub fn with_id(mut self, id: impl Into<ListId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// True if the list has not been assigned a remote identifier yet.
    pub fn is_pending(&self) -> bool {
        self.id.is_none()
    }

    /// Check that this list can be submitted as a new list by `owner_id`.
    pub fn validate_new(&self, owner_id: &str) -> Result<()> {
        if let Some(id) = &self.id {
            return Err(Error::AlreadyPersisted(id.clone()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::EmptyName);
        }
        if self.owner_id != owner_id {
            return Err(Error::OwnerMismatch {
                expected: owner_id.to_string(),
                actual: self.owner_id.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.items.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_list_is_pending() {
        let list = ShoppingList::new("u1", "Groceries", ["Milk", "Eggs"]);
        assert!(list.is_pending());
        assert_eq!(list.items, vec!["Milk", "Eggs"]);

        let list = list.with_id("L1");
        assert!(!list.is_pending());
        assert_eq!(list.id.as_deref(), Some("L1"));
    }

    #[test]
    fn items_keep_order_and_duplicates() {
        let list = ShoppingList::new("u1", "Party", ["Chips", "Soda", "Chips"]);
        assert_eq!(list.items, vec!["Chips", "Soda", "Chips"]);
    }

    #[test]
    fn validate_new_rejects_bad_candidates() {
        let list = ShoppingList::new("u1", "   ", ["Milk"]);
        assert_eq!(list.validate_new("u1"), Err(Error::EmptyName));

        let list = ShoppingList::new("u2", "Groceries", ["Milk"]);
        assert!(matches!(
            list.validate_new("u1"),
            Err(Error::OwnerMismatch { .. })
        ));

        let list = ShoppingList::new("u1", "Groceries", ["Milk"]).with_id("L9");
        assert_eq!(
            list.validate_new("u1"),
            Err(Error::AlreadyPersisted("L9".into()))
        );

        let list = ShoppingList::new("u1", "Groceries", ["Milk"]);
        assert!(list.validate_new("u1").is_ok());
    }

    #[test]
    fn display_joins_items() {
        let list = ShoppingList::new("u1", "Groceries", ["Milk", "Eggs"]);
        assert_eq!(list.to_string(), "Groceries: Milk, Eggs");
    }

    #[test]
    fn serialization_format() {
        let list = ShoppingList::new("u1", "Groceries", ["Milk"]);
        let json = serde_json::to_string(&list).unwrap();
        assert!(json.contains("ownerId")); // camelCase
        assert!(!json.contains("\"id\"")); // pending lists omit the id
    }

    #[test]
    fn accepts_legacy_uid_field() {
        let json = r#"{"id":"abc","uid":"u1","name":"Hardware","items":["Nails"]}"#;
        let list: ShoppingList = serde_json::from_str(json).unwrap();
        assert_eq!(list.owner_id, "u1");
        assert_eq!(list.id.as_deref(), Some("abc"));
    }
}
