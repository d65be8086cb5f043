//! File-per-chunk persistence with zstd compression.
//!
//! Each world lives under `<saves_root>/<world_id>/`: a `world.dat` metadata
//! record plus one `chunks/chunk_<x>_<y>_<z>.dat` file per saved chunk. Every
//! file carries a magic/version header with a CRC32 over the compressed
//! bincode payload.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crc32fast::Hasher;
use tracing::{debug, error, warn};

use tilestream_core::ChunkPos;

use crate::{Chunk, WorldInfo};

/// Magic number identifying chunk files ("TSCH").
const CHUNK_MAGIC: u32 = 0x5453_4348;

/// Magic number identifying world metadata files ("TSWI").
const WORLD_MAGIC: u32 = 0x5453_5749;

/// Current on-disk format version.
const FORMAT_VERSION: u16 = 1;

/// zstd level 3 for balanced speed/compression.
const ZSTD_LEVEL: i32 = 3;

/// File name of the world metadata record.
const WORLD_INFO_FILE: &str = "world.dat";

/// Directory holding the per-chunk files.
const CHUNKS_DIR: &str = "chunks";

/// Filesystem-safe chunk id for the given position, `chunk_<x>_<y>_<z>`.
pub fn chunk_file_id(pos: ChunkPos) -> String {
    format!("chunk_{}_{}_{}", pos.x, pos.y, pos.z)
}

/// Save-file header shared by chunk and world-info files.
#[derive(Debug, Clone)]
struct FileHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl FileHeader {
    const LEN: usize = 14;

    fn new(magic: u32, crc32: u32, payload_len: u32) -> Self {
        Self {
            magic,
            version: FORMAT_VERSION,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LEN);
        bytes.extend_from_slice(&self.magic.to_le_bytes());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.crc32.to_le_bytes());
        bytes.extend_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8], expected_magic: u32) -> Result<Self> {
        if bytes.len() < Self::LEN {
            anyhow::bail!("save-file header too short");
        }

        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != expected_magic {
            anyhow::bail!(
                "invalid save-file magic: expected 0x{:08X}, got 0x{:08X}",
                expected_magic,
                magic
            );
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            anyhow::bail!(
                "unsupported save-file version: expected {}, got {}",
                FORMAT_VERSION,
                version
            );
        }

        let crc32 = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let payload_len = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]);

        Ok(Self {
            magic,
            version,
            crc32,
            payload_len,
        })
    }
}

/// Persistence layer for one world: serializes chunks and world metadata to
/// the world's save directory.
pub struct WorldStore {
    world_dir: PathBuf,
}

impl WorldStore {
    /// Create a store rooted at `<saves_root>/<world_id>`. Nothing is
    /// created on disk until the first save.
    pub fn new<P: AsRef<Path>>(saves_root: P, world_id: &str) -> Self {
        Self {
            world_dir: saves_root.as_ref().join(world_id),
        }
    }

    /// The world's save directory.
    pub fn world_dir(&self) -> &Path {
        &self.world_dir
    }

    /// Whether this world has any saved representation on disk.
    pub fn world_exists(&self) -> bool {
        self.world_dir.is_dir()
    }

    fn chunks_dir(&self) -> PathBuf {
        self.world_dir.join(CHUNKS_DIR)
    }

    fn chunk_path(&self, pos: ChunkPos) -> PathBuf {
        self.chunks_dir().join(format!("{}.dat", chunk_file_id(pos)))
    }

    /// Whether the given chunk has a saved representation, without reading it.
    pub fn chunk_exists(&self, pos: ChunkPos) -> bool {
        self.chunk_path(pos).is_file()
    }

    /// Subset of `positions` that have a saved representation.
    pub fn existing(&self, positions: &[ChunkPos]) -> Vec<ChunkPos> {
        positions
            .iter()
            .copied()
            .filter(|pos| self.chunk_exists(*pos))
            .collect()
    }

    /// Load a single chunk, verifying it deserialized to the requested
    /// position.
    pub fn load_chunk(&self, pos: ChunkPos) -> Result<Chunk> {
        let path = self.chunk_path(pos);
        let payload = self.read_payload(&path, CHUNK_MAGIC)?;
        let chunk: Chunk =
            bincode::deserialize(&payload).context("failed to deserialize chunk")?;
        if chunk.position() != pos {
            anyhow::bail!(
                "chunk file {:?} holds chunk {} instead of {}",
                path,
                chunk.position(),
                pos
            );
        }
        if chunk.extent().volume() == 0 {
            anyhow::bail!("chunk file {:?} has a degenerate extent", path);
        }
        Ok(chunk)
    }

    /// Load every chunk in `positions` that can be read. A failure to
    /// deserialize one chunk is logged and that chunk is omitted; it never
    /// aborts the batch. A missing world directory is treated as "no
    /// existing save".
    pub fn load_chunks(&self, positions: &[ChunkPos]) -> Vec<Chunk> {
        if !self.chunks_dir().is_dir() {
            debug!("no chunks directory at {:?}; nothing to load", self.chunks_dir());
            return Vec::new();
        }

        let mut chunks = Vec::with_capacity(positions.len());
        for &pos in positions {
            match self.load_chunk(pos) {
                Ok(chunk) => chunks.push(chunk),
                Err(e) => error!("error while loading chunk {pos}: {e:#}"),
            }
        }
        chunks
    }

    /// Save a single chunk to its `chunk_<x>_<y>_<z>.dat` file.
    pub fn save_chunk(&self, chunk: &Chunk) -> Result<()> {
        let chunks_dir = self.chunks_dir();
        fs::create_dir_all(&chunks_dir)
            .with_context(|| format!("failed to create chunks directory {chunks_dir:?}"))?;

        let payload = bincode::serialize(chunk).context("failed to serialize chunk")?;
        self.write_payload(&self.chunk_path(chunk.position()), CHUNK_MAGIC, &payload)
    }

    /// Save every chunk in the batch. A per-chunk I/O failure is logged and
    /// does not abort saving the remaining chunks. Returns the saved count.
    pub fn save_chunks<'a, I>(&self, chunks: I) -> usize
    where
        I: IntoIterator<Item = &'a Chunk>,
    {
        let mut saved = 0;
        for chunk in chunks {
            match self.save_chunk(chunk) {
                Ok(()) => saved += 1,
                Err(e) => error!(
                    "error while saving chunk {}: {e:#}",
                    chunk.position()
                ),
            }
        }
        saved
    }

    /// Load the world metadata record.
    pub fn load_world_info(&self) -> Result<WorldInfo> {
        if !self.world_dir.is_dir() {
            anyhow::bail!(
                "could not load world at {:?}: it does not exist",
                self.world_dir
            );
        }
        let payload = self.read_payload(&self.world_dir.join(WORLD_INFO_FILE), WORLD_MAGIC)?;
        bincode::deserialize(&payload).context("failed to deserialize world info")
    }

    /// Save the world metadata record, creating the world directory if
    /// needed.
    pub fn save_world_info(&self, info: &WorldInfo) -> Result<()> {
        fs::create_dir_all(&self.world_dir)
            .with_context(|| format!("failed to create world directory {:?}", self.world_dir))?;
        let payload = bincode::serialize(info).context("failed to serialize world info")?;
        self.write_payload(&self.world_dir.join(WORLD_INFO_FILE), WORLD_MAGIC, &payload)
    }

    /// Number of chunk files currently on disk for this world.
    pub fn saved_chunk_count(&self) -> usize {
        let Ok(entries) = fs::read_dir(self.chunks_dir()) else {
            return 0;
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "dat"))
            .count()
    }

    /// Delete the entire world directory. Missing directories are fine.
    pub fn delete_world(&self) -> Result<()> {
        if self.world_dir.exists() {
            fs::remove_dir_all(&self.world_dir)
                .with_context(|| format!("failed to delete world at {:?}", self.world_dir))?;
            warn!("deleted world at {:?}", self.world_dir);
        }
        Ok(())
    }

    fn read_payload(&self, path: &Path, magic: u32) -> Result<Vec<u8>> {
        let mut file =
            File::open(path).with_context(|| format!("failed to open save file {path:?}"))?;

        let mut header_bytes = [0u8; FileHeader::LEN];
        file.read_exact(&mut header_bytes)
            .context("failed to read save-file header")?;
        let header = FileHeader::from_bytes(&header_bytes, magic)?;

        let mut compressed = vec![0u8; header.payload_len as usize];
        file.read_exact(&mut compressed)
            .context("failed to read save-file payload")?;

        let mut hasher = Hasher::new();
        hasher.update(&compressed);
        let computed = hasher.finalize();
        if computed != header.crc32 {
            anyhow::bail!(
                "CRC32 mismatch in {:?}: expected {:08X}, got {:08X}",
                path,
                header.crc32,
                computed
            );
        }

        zstd::decode_all(&compressed[..]).context("failed to decompress save file")
    }

    fn write_payload(&self, path: &Path, magic: u32, payload: &[u8]) -> Result<()> {
        let compressed =
            zstd::encode_all(payload, ZSTD_LEVEL).context("failed to compress save file")?;

        let mut hasher = Hasher::new();
        hasher.update(&compressed);
        let header = FileHeader::new(magic, hasher.finalize(), compressed.len() as u32);

        let mut file =
            File::create(path).with_context(|| format!("failed to create save file {path:?}"))?;
        file.write_all(&header.to_bytes())
            .context("failed to write save-file header")?;
        file.write_all(&compressed)
            .context("failed to write save-file payload")?;
        Ok(())
    }
}
