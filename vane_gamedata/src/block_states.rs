use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use vane_serializer::Identifier;

/// Computes the canonical state key, `name[k1=v1,k2=v2]`, properties
/// sorted lexicographically. Property-less states key as the bare name.
pub fn state_key(name: &str, properties: &BTreeMap<String, String>) -> String {
    if properties.is_empty() {
        return name.to_string();
    }
    let joined = properties
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",");
    format!("{}[{}]", name, joined)
}

/// The three query forms a block-state lookup accepts.
pub enum StateQuery<'a> {
    /// A numeric network id, passed through after a bounds check.
    NetworkId(i32),
    /// A bare block identifier; resolves to the block's default state.
    Block(&'a Identifier),
    /// A full state key with properties.
    StateKey(&'a str),
}

/// The block-state table: network id per state key, plus the per-block
/// default state. Loaded once from the data file and frozen with the
/// registry.
#[derive(Clone, Default)]
pub struct BlockStates {
    by_key: HashMap<String, i32>,
    default_by_block: HashMap<Identifier, i32>,
    keys_by_id: Vec<String>,
    frozen: bool,
}

impl BlockStates {
    /// Appends the next state; ids are assigned in insertion order.
    pub fn push_state(
        &mut self,
        block: &Identifier,
        properties: &BTreeMap<String, String>,
        is_default: bool,
    ) -> Result<i32> {
        if self.frozen {
            return Err(Error::RegistryFrozen);
        }
        let id = self.keys_by_id.len() as i32;
        let key = state_key(block.as_str(), properties);
        self.by_key.insert(key.clone(), id);
        self.keys_by_id.push(key);
        if is_default {
            self.default_by_block.insert(block.clone(), id);
        }
        Ok(id)
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn len(&self) -> usize {
        self.keys_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys_by_id.is_empty()
    }

    /// Resolves any of the three query forms to a network id.
    pub fn resolve(&self, query: StateQuery<'_>) -> Option<i32> {
        match query {
            StateQuery::NetworkId(id) => {
                (id >= 0 && (id as usize) < self.keys_by_id.len()).then_some(id)
            }
            StateQuery::Block(block) => self.default_by_block.get(block).copied(),
            StateQuery::StateKey(key) => self.by_key.get(key).copied(),
        }
    }

    /// The default state for a bare block identifier.
    pub fn default_state(&self, block: &Identifier) -> Option<i32> {
        self.default_by_block.get(block).copied()
    }

    pub fn key_of(&self, id: i32) -> Option<&str> {
        self.keys_by_id.get(id as usize).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn state_keys_sort_properties() {
        let key = state_key(
            "minecraft:oak_log",
            &props(&[("axis", "y"), ("age", "2")]),
        );
        assert_eq!(key, "minecraft:oak_log[age=2,axis=y]");
        assert_eq!(state_key("minecraft:air", &BTreeMap::new()), "minecraft:air");
    }

    #[test]
    fn all_three_query_forms_resolve() {
        let mut states = BlockStates::default();
        let air = Identifier::minecraft("air");
        let log = Identifier::minecraft("oak_log");
        states.push_state(&air, &BTreeMap::new(), true).unwrap();
        states.push_state(&log, &props(&[("axis", "x")]), false).unwrap();
        states.push_state(&log, &props(&[("axis", "y")]), true).unwrap();

        assert_eq!(states.resolve(StateQuery::NetworkId(1)), Some(1));
        assert_eq!(states.resolve(StateQuery::NetworkId(9)), None);
        assert_eq!(states.resolve(StateQuery::Block(&log)), Some(2));
        assert_eq!(
            states.resolve(StateQuery::StateKey("minecraft:oak_log[axis=x]")),
            Some(1)
        );
        assert_eq!(states.key_of(0), Some("minecraft:air"));
    }

    #[test]
    fn frozen_table_rejects_inserts() {
        let mut states = BlockStates::default();
        states.freeze();
        assert!(matches!(
            states.push_state(&Identifier::minecraft("stone"), &BTreeMap::new(), true),
            Err(Error::RegistryFrozen)
        ));
    }
}
