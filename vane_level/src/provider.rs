use crate::chunk::{Chunk, Section};
use crate::{Error, Result};
use flate2::bufread::ZlibDecoder;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use vane_gamedata::{state_key, BlockStates, StateQuery};
use vane_nbt::Tag;
use vane_serializer::{BlockPos, Identifier};

/// Strategy producing a chunk for a `(cx, cz)` coordinate. `None` means
/// the chunk does not exist; the dimension substitutes its empty column
/// and caches the miss.
pub trait ChunkProvider: Send {
    fn load(&mut self, cx: i32, cz: i32) -> Result<Option<Chunk>>;

    /// Persistence hook; the core never calls it, embedders may.
    fn save(&mut self, _cx: i32, _cz: i32, _chunk: &Chunk) -> Result<()> {
        Ok(())
    }
}

const SECTOR_BYTES: u64 = 4096;
const COMPRESSION_ZLIB: u8 = 2;

/// Loads chunks out of Anvil region files, `r.<rx>.<rz>.mca`, 32×32
/// chunks per file. Opened files are cached by name.
pub struct RegionLoader {
    directory: PathBuf,
    files: HashMap<String, Option<File>>,
    states: Arc<BlockStates>,
    section_count: usize,
    min_y: i32,
    air_state: i32,
}

impl RegionLoader {
    pub fn new(
        directory: impl Into<PathBuf>,
        states: Arc<BlockStates>,
        section_count: usize,
        min_y: i32,
    ) -> RegionLoader {
        let air_state = states
            .default_state(&Identifier::minecraft("air"))
            .unwrap_or(0);
        RegionLoader {
            directory: directory.into(),
            files: HashMap::new(),
            states,
            section_count,
            min_y,
            air_state,
        }
    }

    fn region_file(&mut self, rx: i32, rz: i32) -> Result<Option<&mut File>> {
        let name = format!("r.{}.{}.mca", rx, rz);
        if !self.files.contains_key(&name) {
            let path = self.directory.join(&name);
            let file = match File::open(&path) {
                Ok(file) => Some(file),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
                Err(err) => return Err(err.into()),
            };
            self.files.insert(name.clone(), file);
        }
        Ok(self.files.get_mut(&name).and_then(Option::as_mut))
    }

    fn read_compressed_chunk(&mut self, cx: i32, cz: i32) -> Result<Option<Vec<u8>>> {
        let Some(file) = self.region_file(cx >> 5, cz >> 5)? else {
            return Ok(None);
        };

        // Header: 1024 entries of u24-BE sector offset + u8 sector count.
        let header_index = ((cx & 31) + (cz & 31) * 32) as u64 * 4;
        file.seek(SeekFrom::Start(header_index))?;
        let mut location = [0u8; 4];
        file.read_exact(&mut location)?;
        let offset =
            u64::from(location[0]) << 16 | u64::from(location[1]) << 8 | u64::from(location[2]);
        if offset == 0 {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(offset * SECTOR_BYTES))?;
        let mut length = [0u8; 4];
        file.read_exact(&mut length)?;
        let length = u32::from_be_bytes(length) as usize;
        if length == 0 {
            return Ok(None);
        }

        let mut compression = [0u8; 1];
        file.read_exact(&mut compression)?;
        if compression[0] != COMPRESSION_ZLIB {
            return Err(Error::UnsupportedChunkCompression(compression[0]));
        }

        let mut compressed = vec![0u8; length - 1];
        file.read_exact(&mut compressed)?;
        let mut decompressed = Vec::new();
        ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut decompressed)?;
        Ok(Some(decompressed))
    }

    fn resolve_palette_entry(&self, entry: &Tag) -> i32 {
        let Some(name) = entry.get("Name").and_then(Tag::as_string) else {
            return self.air_state;
        };
        let mut properties = BTreeMap::new();
        if let Some(Tag::Compound(pairs)) = entry.get("Properties") {
            for (key, value) in pairs {
                if let Some(value) = value.as_string() {
                    properties.insert(key.clone(), value.to_string());
                }
            }
        }
        let key = state_key(name, &properties);
        if let Some(id) = self.states.resolve(StateQuery::StateKey(&key)) {
            return id;
        }
        // Fall back to the block's default state before giving up.
        if let Ok(block) = Identifier::new(name) {
            if let Some(id) = self.states.default_state(&block) {
                return id;
            }
        }
        log::warn!("Unknown block state {} in region chunk; substituting air", key);
        self.air_state
    }

    fn build_chunk(&self, root: &Tag) -> Result<Option<Chunk>> {
        // Partially generated chunks stream as absent.
        match root.get("Status").and_then(Tag::as_string) {
            Some("minecraft:full") => {}
            _ => return Ok(None),
        }

        let sections = root
            .get("sections")
            .and_then(Tag::as_list)
            .ok_or(Error::MissingField("sections"))?;

        let mut chunk = Chunk::new(self.section_count, self.min_y, self.air_state);
        for section in sections {
            let Some(y) = section.get("Y").and_then(Tag::as_int) else {
                continue;
            };
            let index = y - (self.min_y >> 4);
            if index < 0 || index as usize >= self.section_count {
                continue;
            }
            let Some(block_states) = section.get("block_states") else {
                continue;
            };
            let palette: Vec<i32> = block_states
                .get("palette")
                .and_then(Tag::as_list)
                .ok_or(Error::MissingField("block_states.palette"))?
                .iter()
                .map(|entry| self.resolve_palette_entry(entry))
                .collect();
            let data = block_states
                .get("data")
                .and_then(Tag::as_long_array)
                .map(|longs| longs.iter().map(|value| *value as u64).collect())
                .unwrap_or_default();
            chunk.replace_section(index as usize, Section::from_parts(palette, data));
        }
        Ok(Some(chunk))
    }
}

impl ChunkProvider for RegionLoader {
    fn load(&mut self, cx: i32, cz: i32) -> Result<Option<Chunk>> {
        let Some(decompressed) = self.read_compressed_chunk(cx, cz)? else {
            return Ok(None);
        };
        let (_, root, _) = vane_nbt::parse(&decompressed)?;
        self.build_chunk(&root)
    }
}

/// Generates every chunk from an ordered `(block, height)` layer list,
/// bottom-up from `min_y`; everything above the last layer is air. The
/// column is built once and cloned per load.
pub struct SuperflatGenerator {
    template: Chunk,
}

impl SuperflatGenerator {
    pub fn new(
        layers: &[(Identifier, u32)],
        states: &BlockStates,
        section_count: usize,
        min_y: i32,
    ) -> Result<SuperflatGenerator> {
        let air_state = states
            .default_state(&Identifier::minecraft("air"))
            .unwrap_or(0);
        let mut template = Chunk::new(section_count, min_y, air_state);

        let mut y = min_y;
        let top = min_y + (section_count as i32) * 16;
        for (block, height) in layers {
            let state = states
                .default_state(block)
                .ok_or_else(|| Error::UnknownBlock(block.clone()))?;
            for _ in 0..*height {
                if y >= top {
                    break;
                }
                for z in 0..16 {
                    for x in 0..16 {
                        template.set_block(BlockPos::new(x, y, z), state)?;
                    }
                }
                y += 1;
            }
        }

        Ok(SuperflatGenerator { template })
    }
}

impl ChunkProvider for SuperflatGenerator {
    fn load(&mut self, _cx: i32, _cz: i32) -> Result<Option<Chunk>> {
        Ok(Some(self.template.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::collections::BTreeMap;
    use std::io::Write;
    use vane_nbt::{compound, Tag};

    fn test_states() -> Arc<BlockStates> {
        let mut states = BlockStates::default();
        let air = Identifier::minecraft("air");
        let bedrock = Identifier::minecraft("bedrock");
        let dirt = Identifier::minecraft("dirt");
        let grass = Identifier::minecraft("grass_block");
        states.push_state(&air, &BTreeMap::new(), true).unwrap();
        states.push_state(&bedrock, &BTreeMap::new(), true).unwrap();
        states.push_state(&dirt, &BTreeMap::new(), true).unwrap();
        let mut snowy = BTreeMap::new();
        snowy.insert("snowy".to_string(), "false".to_string());
        states.push_state(&grass, &snowy, true).unwrap();
        Arc::new(states)
    }

    #[test]
    fn superflat_stacks_layers_bottom_up() {
        let states = test_states();
        let layers = vec![
            (Identifier::minecraft("bedrock"), 1),
            (Identifier::minecraft("dirt"), 2),
            (Identifier::minecraft("grass_block"), 1),
        ];
        let mut generator = SuperflatGenerator::new(&layers, &states, 24, -64).unwrap();
        let chunk = generator.load(0, 0).unwrap().unwrap();

        assert_eq!(chunk.get_block(BlockPos::new(0, -64, 0)).unwrap(), 1);
        assert_eq!(chunk.get_block(BlockPos::new(5, -63, 9)).unwrap(), 2);
        assert_eq!(chunk.get_block(BlockPos::new(5, -62, 9)).unwrap(), 2);
        assert_eq!(chunk.get_block(BlockPos::new(15, -61, 15)).unwrap(), 3);
        assert_eq!(chunk.get_block(BlockPos::new(0, -60, 0)).unwrap(), 0);
        assert_eq!(chunk.get_block(BlockPos::new(0, 100, 0)).unwrap(), 0);
    }

    #[test]
    fn superflat_rejects_unknown_layer_blocks() {
        let states = test_states();
        let layers = vec![(Identifier::minecraft("not_a_block"), 1)];
        assert!(matches!(
            SuperflatGenerator::new(&layers, &states, 24, -64),
            Err(Error::UnknownBlock(_))
        ));
    }

    fn region_fixture(dir: &std::path::Path, chunk_nbt: &Tag) {
        // One chunk at (0, 0) in r.0.0.mca, zlib-compressed.
        let nbt = vane_nbt::encode("", chunk_nbt).unwrap();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&nbt).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut file = vec![0u8; 8192];
        // Location entry 0: offset sector 2, one sector.
        file[0] = 0;
        file[1] = 0;
        file[2] = 2;
        file[3] = 1;
        file.extend_from_slice(&((compressed.len() + 1) as u32).to_be_bytes());
        file.push(COMPRESSION_ZLIB);
        file.extend_from_slice(&compressed);

        std::fs::write(dir.join("r.0.0.mca"), file).unwrap();
    }

    fn full_chunk_nbt() -> Tag {
        compound([
            ("Status", Tag::String("minecraft:full".to_string())),
            (
                "sections",
                Tag::List(vec![compound([
                    ("Y", Tag::Byte(-4)),
                    (
                        "block_states",
                        compound([(
                            "palette",
                            Tag::List(vec![compound([(
                                "Name",
                                Tag::String("minecraft:bedrock".to_string()),
                            )])]),
                        )]),
                    ),
                ])]),
            ),
        ])
    }

    #[test]
    fn region_loader_reads_a_zlib_chunk() {
        let dir = std::env::temp_dir().join(format!("vane-region-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        region_fixture(&dir, &full_chunk_nbt());

        let mut loader = RegionLoader::new(&dir, test_states(), 24, -64);
        let chunk = loader.load(0, 0).unwrap().unwrap();
        // The single-palette section filled the bottom 16 layers.
        assert_eq!(chunk.get_block(BlockPos::new(0, -64, 0)).unwrap(), 1);
        assert_eq!(chunk.get_block(BlockPos::new(8, -49, 8)).unwrap(), 1);
        assert_eq!(chunk.get_block(BlockPos::new(0, -48, 0)).unwrap(), 0);

        // Unpopulated slots in the same region read as absent.
        assert!(loader.load(1, 0).unwrap().is_none());
        // Missing region files read as absent, not as errors.
        assert!(loader.load(512, 512).unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn non_full_chunks_are_absent() {
        let dir = std::env::temp_dir().join(format!("vane-region-partial-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        region_fixture(
            &dir,
            &compound([("Status", Tag::String("minecraft:features".to_string()))]),
        );

        let mut loader = RegionLoader::new(&dir, test_states(), 24, -64);
        assert!(loader.load(0, 0).unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn wrong_compression_scheme_is_an_error() {
        let dir = std::env::temp_dir().join(format!("vane-region-gzip-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut file = vec![0u8; 8192];
        file[2] = 2;
        file[3] = 1;
        file.extend_from_slice(&2u32.to_be_bytes());
        file.push(1); // gzip
        file.push(0);
        std::fs::write(dir.join("r.0.0.mca"), file).unwrap();

        let mut loader = RegionLoader::new(&dir, test_states(), 24, -64);
        assert!(matches!(
            loader.load(0, 0),
            Err(Error::UnsupportedChunkCompression(1))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
