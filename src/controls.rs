//! Dropdown selection controls and menu state.

use access_rule_types::NodeList;
use serde::{Deserialize, Serialize};

use crate::error::ControlsError;

/// Menu entry shown when the widget opens.
pub const DEFAULT_MENU_ITEM: &str = "access rules";

/// Source/target pickers fed by the node list endpoint.
///
/// The target picker stays disabled until a source is chosen. Labels are
/// validated against the node list once it has been loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRuleControls {
    pub node_relations: NodeList,
    pub source_node: Option<String>,
    pub target_node: Option<String>,
}

impl AccessRuleControls {
    /// Install a fetched node list, dropping choices it no longer contains.
    pub fn set_node_list(&mut self, list: NodeList) {
        self.node_relations = list;
        if !self.is_known(self.source_node.as_deref()) {
            self.source_node = None;
            self.target_node = None;
        }
        if !self.is_known(self.target_node.as_deref()) {
            self.target_node = None;
        }
    }

    /// Choose the source; a different source resets the target.
    pub fn set_source_node(&mut self, label: &str) -> Result<(), ControlsError> {
        self.check_known(label)?;
        if self.source_node.as_deref() != Some(label) {
            self.source_node = Some(label.to_string());
            self.target_node = None;
        }
        Ok(())
    }

    pub fn set_target_node(&mut self, label: &str) -> Result<(), ControlsError> {
        if self.source_node.is_none() {
            return Err(ControlsError::NoSourceNode);
        }
        self.check_known(label)?;
        self.target_node = Some(label.to_string());
        Ok(())
    }

    pub fn is_target_enabled(&self) -> bool {
        self.source_node.is_some()
    }

    /// Relation names available from the chosen source.
    pub fn relation_choices(&self) -> &[String] {
        self.source_node
            .as_deref()
            .and_then(|label| self.node_relations.relations(label))
            .unwrap_or(&[])
    }

    fn is_known(&self, label: Option<&str>) -> bool {
        label.map_or(true, |l| self.node_relations.is_empty() || self.node_relations.contains(l))
    }

    fn check_known(&self, label: &str) -> Result<(), ControlsError> {
        if self.is_known(Some(label)) {
            Ok(())
        } else {
            Err(ControlsError::UnknownNode(label.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuState {
    pub active_item: String,
}

impl Default for MenuState {
    fn default() -> Self {
        Self::new(DEFAULT_MENU_ITEM)
    }
}

impl MenuState {
    pub fn new(active_item: impl Into<String>) -> Self {
        Self {
            active_item: active_item.into(),
        }
    }

    pub fn set_active_item(&mut self, item: impl Into<String>) {
        self.active_item = item.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn node_list() -> NodeList {
        let mut map = IndexMap::new();
        map.insert("UserNode".to_string(), vec!["groups".to_string(), "orders".to_string()]);
        map.insert("GroupNode".to_string(), vec!["members".to_string()]);
        NodeList(map)
    }

    #[test]
    fn test_target_requires_source() {
        let mut controls = AccessRuleControls::default();
        assert!(!controls.is_target_enabled());
        assert_eq!(
            controls.set_target_node("GroupNode"),
            Err(ControlsError::NoSourceNode)
        );
    }

    #[test]
    fn test_changing_source_resets_target() {
        let mut controls = AccessRuleControls::default();
        controls.set_node_list(node_list());
        controls.set_source_node("UserNode").unwrap();
        controls.set_target_node("GroupNode").unwrap();

        controls.set_source_node("UserNode").unwrap();
        assert_eq!(controls.target_node.as_deref(), Some("GroupNode"));

        controls.set_source_node("GroupNode").unwrap();
        assert_eq!(controls.target_node, None);
        assert_eq!(controls.relation_choices(), &["members".to_string()]);
    }

    #[test]
    fn test_unknown_labels_are_rejected_once_loaded() {
        let mut controls = AccessRuleControls::default();
        controls.set_source_node("Anything").unwrap();

        controls.set_node_list(node_list());
        assert_eq!(controls.source_node, None);
        assert_eq!(
            controls.set_source_node("Anything"),
            Err(ControlsError::UnknownNode("Anything".into()))
        );
    }

    #[test]
    fn test_menu_defaults_to_access_rules() {
        let mut menu = MenuState::default();
        assert_eq!(menu.active_item, "access rules");
        menu.set_active_item("query");
        assert_eq!(menu.active_item, "query");
    }
}
