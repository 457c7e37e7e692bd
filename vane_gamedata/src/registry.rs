use crate::block_states::BlockStates;
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use vane_registry::client_bound::configuration::{RegistryData, TagCategory, UpdateTags};
use vane_registry::{packet_buffer, RawNbt};
use vane_serializer::Identifier;

/// A frozen-able bidirectional identifier ↔ network id map. Ids are
/// 0-based and dense.
#[derive(Default)]
pub struct IdMap {
    by_name: HashMap<Identifier, i32>,
    by_id: Vec<Identifier>,
    frozen: bool,
}

impl IdMap {
    fn push(&mut self, name: Identifier) -> Result<i32> {
        if self.frozen {
            return Err(Error::RegistryFrozen);
        }
        let id = self.by_id.len() as i32;
        self.by_name.insert(name.clone(), id);
        self.by_id.push(name);
        Ok(id)
    }

    pub fn id_of(&self, name: &Identifier) -> Option<i32> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: i32) -> Option<&Identifier> {
        self.by_id.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// A data-pack entry: either the client's built-in definition (the
/// "default" sentinel, encoded with no payload) or a custom payload the
/// embedder supplied as JSON.
#[derive(Clone, Debug)]
pub enum DataEntry {
    Default,
    Custom(serde_json::Value),
}

struct DataCategory {
    category: Identifier,
    entries: Vec<(Identifier, DataEntry)>,
    index: HashMap<Identifier, usize>,
}

#[derive(Clone, Default)]
struct TagTable {
    order: Vec<Identifier>,
    entries: HashMap<Identifier, Vec<String>>,
}

#[derive(serde::Deserialize)]
struct DataFile {
    #[serde(default)]
    maps: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    block_states: Vec<BlockStateEntry>,
    #[serde(default)]
    datapack: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    tags: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

#[derive(serde::Deserialize)]
struct BlockStateEntry {
    name: String,
    #[serde(default)]
    default: bool,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

/// See the crate docs for the lifecycle. All lookups are by category
/// identifier (`minecraft:entity_type`, `minecraft:dimension_type`, ...).
#[derive(Default)]
pub struct Registry {
    maps: HashMap<Identifier, IdMap>,
    data: Vec<DataCategory>,
    data_index: HashMap<Identifier, usize>,
    tags: BTreeMap<Identifier, TagTable>,
    block_states: std::sync::Arc<BlockStates>,
    finalized: bool,
    network_data: Vec<Vec<u8>>,
    network_tags: Option<Vec<u8>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Loads the static data file: fixed id maps (frozen immediately),
    /// the block-state table, core data-pack listings (all "default"),
    /// and core tag tables.
    pub fn load_data_file(&mut self, json: &str) -> Result<()> {
        if self.finalized {
            return Err(Error::RegistryFrozen);
        }
        let file: DataFile = serde_json::from_str(json)?;

        for (category, names) in file.maps {
            let category = parse_identifier(&category)?;
            let mut map = IdMap::default();
            for name in names {
                map.push(parse_identifier(&name)?)?;
            }
            map.frozen = true;
            self.maps.insert(category, map);
        }

        // Loading happens before the table is shared out; `make_mut`
        // never observes another holder here.
        let states = std::sync::Arc::make_mut(&mut self.block_states);
        for state in file.block_states {
            let block = parse_identifier(&state.name)?;
            states.push_state(&block, &state.properties, state.default)?;
        }

        for (category, names) in file.datapack {
            let category = parse_identifier(&category)?;
            for name in names {
                let name = parse_identifier(&name)?;
                self.add_data(&category, name, DataEntry::Default)?;
            }
        }

        for (category, tags) in file.tags {
            let category = parse_identifier(&category)?;
            for (tag, values) in tags {
                self.add_tag(&category, parse_identifier(&tag)?, values)?;
            }
        }

        Ok(())
    }

    /// Adds or replaces a data-pack entry. Creates the category (and its
    /// empty id map, so other code can hold a reference) on first use.
    pub fn add_data(
        &mut self,
        category: &Identifier,
        entry: Identifier,
        value: DataEntry,
    ) -> Result<()> {
        if self.finalized {
            return Err(Error::RegistryFrozen);
        }
        let index = match self.data_index.get(category) {
            Some(index) => *index,
            None => {
                let index = self.data.len();
                self.data.push(DataCategory {
                    category: category.clone(),
                    entries: Vec::new(),
                    index: HashMap::new(),
                });
                self.data_index.insert(category.clone(), index);
                self.maps.entry(category.clone()).or_default();
                index
            }
        };
        let table = &mut self.data[index];
        match table.index.get(&entry) {
            Some(existing) => table.entries[*existing].1 = value,
            None => {
                table.index.insert(entry.clone(), table.entries.len());
                table.entries.push((entry, value));
            }
        }
        Ok(())
    }

    /// Adds or replaces one tag. Values are identifiers or `#tag`
    /// references into the same category.
    pub fn add_tag(
        &mut self,
        category: &Identifier,
        tag: Identifier,
        values: Vec<String>,
    ) -> Result<()> {
        if self.finalized {
            return Err(Error::RegistryFrozen);
        }
        let table = self.tags.entry(category.clone()).or_default();
        if !table.entries.contains_key(&tag) {
            table.order.push(tag.clone());
        }
        table.entries.insert(tag, values);
        Ok(())
    }

    pub fn map(&self, category: &Identifier) -> Option<&IdMap> {
        self.maps.get(category)
    }

    pub fn id_of(&self, category: &Identifier, name: &Identifier) -> Option<i32> {
        self.maps.get(category)?.id_of(name)
    }

    pub fn block_states(&self) -> &BlockStates {
        &self.block_states
    }

    /// A shared handle for chunk providers and dimensions. Grab this
    /// after `load_data_file`; the table does not grow afterwards.
    pub fn shared_block_states(&self) -> std::sync::Arc<BlockStates> {
        std::sync::Arc::clone(&self.block_states)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Freezes everything and pre-encodes the configuration-phase
    /// packets. Idempotent; later calls are no-ops.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }

        // 1. Assign data-pack network ids and fill the matching maps.
        for table in &self.data {
            let map = self.maps.entry(table.category.clone()).or_default();
            if map.is_empty() {
                for (name, _) in &table.entries {
                    map.push(name.clone())?;
                }
            }
            map.frozen = true;
        }

        // 2. One registry_data packet per category, in load order.
        let mut network_data = Vec::with_capacity(self.data.len());
        for table in &self.data {
            let mut entries = Vec::with_capacity(table.entries.len());
            for (name, value) in &table.entries {
                let payload = match value {
                    DataEntry::Default => None,
                    DataEntry::Custom(json) => {
                        Some(RawNbt::from_tag(&vane_nbt::from_json(json)?)?)
                    }
                };
                entries.push((name.clone(), payload));
            }
            network_data.push(packet_buffer(&RegistryData {
                category: table.category.clone(),
                entries,
            })?);
        }

        // 3. Flatten tag references on a working copy; the live table is
        // only replaced once every tag in every category flattened.
        let mut flattened: BTreeMap<Identifier, TagTable> = BTreeMap::new();
        for (category, table) in &self.tags {
            let mut out = TagTable {
                order: table.order.clone(),
                entries: HashMap::new(),
            };
            for tag in &table.order {
                let mut visited = HashSet::new();
                let values = flatten_tag(category, table, tag, &mut visited)?;
                out.entries.insert(tag.clone(), values);
            }
            flattened.insert(category.clone(), out);
        }
        self.tags = flattened;

        // 4. Encode all tags into the single update_tags packet.
        let mut categories = Vec::with_capacity(self.tags.len());
        for (category, table) in &self.tags {
            let map = self
                .maps
                .get(category)
                .ok_or_else(|| Error::MalformedData(format!("no id map for {}", category)))?;
            let mut tags = Vec::with_capacity(table.order.len());
            for tag in &table.order {
                let values = &table.entries[tag];
                let mut ids = Vec::with_capacity(values.len());
                for value in values {
                    let name = parse_identifier(value)?;
                    let id = map.id_of(&name).ok_or_else(|| {
                        Error::UnknownTagEntry(category.clone(), tag.clone(), value.clone())
                    })?;
                    ids.push(id);
                }
                tags.push((tag.clone(), ids));
            }
            categories.push(TagCategory {
                category: category.clone(),
                tags,
            });
        }
        self.network_tags = Some(packet_buffer(&UpdateTags { categories })?);

        self.network_data = network_data;
        std::sync::Arc::make_mut(&mut self.block_states).freeze();
        self.finalized = true;
        Ok(())
    }

    /// The ordered registry_data packet buffers, `(id, body)` form.
    pub fn network_data(&self) -> Result<&[Vec<u8>]> {
        if !self.finalized {
            return Err(Error::NotFinalized);
        }
        Ok(&self.network_data)
    }

    /// The single update_tags packet buffer.
    pub fn network_tags(&self) -> Result<&[u8]> {
        self.network_tags
            .as_deref()
            .ok_or(Error::NotFinalized)
    }
}

fn parse_identifier(text: &str) -> Result<Identifier> {
    Identifier::new(text).map_err(|_| Error::MalformedData(format!("bad identifier `{}`", text)))
}

fn flatten_tag(
    category: &Identifier,
    table: &TagTable,
    tag: &Identifier,
    visited: &mut HashSet<Identifier>,
) -> Result<Vec<String>> {
    if !visited.insert(tag.clone()) {
        return Err(Error::CircularTag(category.clone(), tag.clone()));
    }
    let values = table
        .entries
        .get(tag)
        .ok_or_else(|| Error::UnknownTagReference(category.clone(), format!("#{}", tag)))?;

    let mut out = Vec::with_capacity(values.len());
    for value in values {
        if let Some(reference) = value.strip_prefix('#') {
            let referenced = parse_identifier(reference)?;
            if !table.entries.contains_key(&referenced) {
                return Err(Error::UnknownTagReference(category.clone(), value.clone()));
            }
            out.extend(flatten_tag(category, table, &referenced, visited)?);
        } else {
            out.push(value.clone());
        }
    }
    visited.remove(tag);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r##"{
        "maps": {
            "minecraft:block": ["minecraft:air", "minecraft:stone", "minecraft:oak_log"],
            "minecraft:entity_type": ["minecraft:player"]
        },
        "block_states": [
            {"name": "minecraft:air", "default": true},
            {"name": "minecraft:stone", "default": true},
            {"name": "minecraft:oak_log", "properties": {"axis": "x"}},
            {"name": "minecraft:oak_log", "default": true, "properties": {"axis": "y"}}
        ],
        "datapack": {
            "minecraft:dimension_type": ["minecraft:overworld", "minecraft:the_nether"]
        },
        "tags": {
            "minecraft:block": {
                "minecraft:logs": ["minecraft:oak_log"],
                "minecraft:mineable/axe": ["#minecraft:logs", "minecraft:stone"]
            }
        }
    }"##;

    fn loaded() -> Registry {
        let mut registry = Registry::new();
        registry.load_data_file(DATA).unwrap();
        registry
    }

    #[test]
    fn static_maps_load_and_freeze() {
        let registry = loaded();
        let block = Identifier::minecraft("block");
        assert_eq!(
            registry.id_of(&block, &Identifier::minecraft("stone")),
            Some(1)
        );
        assert_eq!(registry.map(&block).unwrap().len(), 3);
    }

    #[test]
    fn finalize_assigns_datapack_ids_and_encodes_packets() {
        let mut registry = loaded();
        registry
            .add_data(
                &Identifier::minecraft("dimension_type"),
                Identifier::minecraft("lobby"),
                DataEntry::Custom(serde_json::json!({"has_skylight": true, "height": 384})),
            )
            .unwrap();
        registry.finalize().unwrap();

        let dimension_type = Identifier::minecraft("dimension_type");
        assert_eq!(
            registry.id_of(&dimension_type, &Identifier::minecraft("overworld")),
            Some(0)
        );
        assert_eq!(
            registry.id_of(&dimension_type, &Identifier::minecraft("lobby")),
            Some(2)
        );

        let packets = registry.network_data().unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0][0], 0x07);
        assert!(!registry.network_tags().unwrap().is_empty());
    }

    #[test]
    fn finalize_is_idempotent_and_freezes_mutators() {
        let mut registry = loaded();
        registry.finalize().unwrap();
        registry.finalize().unwrap();

        assert!(matches!(
            registry.add_data(
                &Identifier::minecraft("dimension_type"),
                Identifier::minecraft("late"),
                DataEntry::Default,
            ),
            Err(Error::RegistryFrozen)
        ));
        assert!(matches!(
            registry.add_tag(
                &Identifier::minecraft("block"),
                Identifier::minecraft("late"),
                vec![],
            ),
            Err(Error::RegistryFrozen)
        ));
    }

    #[test]
    fn network_packets_require_finalize() {
        let registry = loaded();
        assert!(matches!(registry.network_data(), Err(Error::NotFinalized)));
        assert!(matches!(registry.network_tags(), Err(Error::NotFinalized)));
    }

    #[test]
    fn tag_references_flatten_through_the_dag() {
        let mut registry = loaded();
        registry.finalize().unwrap();
        let block = Identifier::minecraft("block");
        let table = registry.tags.get(&block).unwrap();
        let axe = table
            .entries
            .get(&Identifier::minecraft("mineable/axe"))
            .unwrap();
        assert_eq!(axe, &vec!["minecraft:oak_log".to_string(), "minecraft:stone".to_string()]);
    }

    #[test]
    fn circular_tags_fail_and_leave_the_table_unchanged() {
        let mut registry = loaded();
        let block = Identifier::minecraft("block");
        registry
            .add_tag(
                &block,
                Identifier::minecraft("a"),
                vec!["#minecraft:b".to_string()],
            )
            .unwrap();
        registry
            .add_tag(
                &block,
                Identifier::minecraft("b"),
                vec!["#minecraft:a".to_string()],
            )
            .unwrap();

        assert!(matches!(
            registry.finalize(),
            Err(Error::CircularTag(_, _))
        ));
        // The failed finalize must not have committed a half-flattened
        // table or the frozen flag.
        assert!(!registry.is_finalized());
        let table = registry.tags.get(&block).unwrap();
        assert_eq!(
            table.entries[&Identifier::minecraft("mineable/axe")],
            vec!["#minecraft:logs".to_string(), "minecraft:stone".to_string()]
        );
    }

    #[test]
    fn unknown_tag_entries_are_reported() {
        let mut registry = loaded();
        registry
            .add_tag(
                &Identifier::minecraft("block"),
                Identifier::minecraft("bad"),
                vec!["minecraft:not_a_block".to_string()],
            )
            .unwrap();
        assert!(matches!(
            registry.finalize(),
            Err(Error::UnknownTagEntry(_, _, _))
        ));
    }
}
