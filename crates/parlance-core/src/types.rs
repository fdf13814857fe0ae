//! Catalog value objects shared by the sync engine and the dialog layer.
//!
//! Field names serialize in the catalog's camelCase JSON so that a cached
//! payload is byte-for-byte what was pushed remotely.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::Named;

/// The two kinds of item held by the remote catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Intents,
    Entities,
}

impl ItemKind {
    /// URL path segment on the catalog API.
    pub fn path(&self) -> &'static str {
        match self {
            ItemKind::Intents => "intents",
            ItemKind::Entities => "entities",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intents" => Ok(ItemKind::Intents),
            "entities" => Ok(ItemKind::Entities),
            _ => Err(format!("Unknown item kind: {}", s)),
        }
    }
}

// =============================================================================
// Intents
// =============================================================================

/// Declarative intent payload as stored by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentDefinition {
    /// Equal to `name` until the intent is matched to a remote item.
    pub id: String,
    pub name: String,
    pub auto: bool,
    pub responses: Vec<IntentResponse>,
    pub contexts: Vec<String>,
    pub affected_contexts: Vec<AffectedContext>,
    pub user_says: Vec<UserSays>,
    pub webhook_used: bool,
    pub webhook_for_slot_filling: bool,
    pub fallback_intent: bool,
    pub priority: u32,
}

impl IntentDefinition {
    /// Copy of this payload addressed to a remote id.
    pub fn with_id(&self, id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..self.clone()
        }
    }
}

impl Named for IntentDefinition {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub reset_contexts: bool,
    /// Action name reported back on the webhook; equals the intent key.
    pub action: String,
    pub parameters: Vec<ResponseParameter>,
    pub affected_contexts: Vec<AffectedContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseParameter {
    pub data_type: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedContext {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan: Option<u32>,
}

/// One compiled training phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSays {
    pub data: Vec<UserSaysPart>,
    pub is_template: bool,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSaysPart {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
}

// =============================================================================
// Entities
// =============================================================================

/// Declarative entity payload: a reusable vocabulary list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    pub name: String,
    pub entries: Vec<TermEntry>,
    pub is_enum: bool,
    pub automated_expansion: bool,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>, entries: Vec<TermEntry>, options: EntityOptions) -> Self {
        Self {
            name: name.into(),
            entries,
            is_enum: options.is_enum,
            automated_expansion: options.automated_expansion,
        }
    }
}

impl Named for EntityDefinition {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub value: String,
    pub synonyms: Vec<String>,
}

impl TermEntry {
    pub fn new<S: Into<String>>(value: impl Into<String>, synonyms: Vec<S>) -> Self {
        Self {
            value: value.into(),
            synonyms: synonyms.into_iter().map(Into::into).collect(),
        }
    }
}

/// Entity flags. Both default to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityOptions {
    pub is_enum: bool,
    pub automated_expansion: bool,
}

// =============================================================================
// Remote state
// =============================================================================

/// An item as currently known to the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    pub name: String,
}

impl RemoteItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An item scheduled for deletion. `id` is only known for items seen in the
/// remote snapshot; cache-only drift carries no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanTarget {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl CleanTarget {
    pub fn cached(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    pub fn remote(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Some(id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_display_roundtrip() {
        for kind in [ItemKind::Intents, ItemKind::Entities] {
            let parsed: ItemKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("slots".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_entity_serializes_camel_case() {
        let entity = EntityDefinition::new(
            "response",
            vec![TermEntry::new("yes", vec!["yes", "yep"])],
            EntityOptions::default(),
        );
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["isEnum"], false);
        assert_eq!(json["automatedExpansion"], false);
        assert_eq!(json["entries"][0]["synonyms"][1], "yep");
    }

    #[test]
    fn test_remote_item_ignores_extra_fields() {
        let item: RemoteItem = serde_json::from_str(
            r#"{"id":"abc","name":"input.welcome","priority":500000,"fallbackIntent":false}"#,
        )
        .unwrap();
        assert_eq!(item, RemoteItem::new("abc", "input.welcome"));
    }

    #[test]
    fn test_clean_target_skips_missing_id() {
        let json = serde_json::to_string(&CleanTarget::cached("c")).unwrap();
        assert_eq!(json, r#"{"name":"c"}"#);
        let json = serde_json::to_string(&CleanTarget::remote("z", "2")).unwrap();
        assert_eq!(json, r#"{"name":"z","id":"2"}"#);
    }
}
