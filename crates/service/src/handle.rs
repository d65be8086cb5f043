use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};

use tilestream_assets::TileDefinition;
use tilestream_core::{ChunkPos, TilePos};
use tilestream_world::{PropertyValue, RequesterId, WorldInfo, WorldStats};

use crate::ops::ChunkOp;

/// Cloneable async handle to a running [`crate::WorldService`]. Every method
/// enqueues one operation and awaits its reply; operations from a single
/// caller are applied in the order they were submitted.
#[derive(Clone)]
pub struct WorldHandle {
    tx: mpsc::UnboundedSender<ChunkOp>,
    requester_seq: Arc<AtomicU64>,
}

impl WorldHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ChunkOp>, requester_seq: Arc<AtomicU64>) -> Self {
        Self { tx, requester_seq }
    }

    pub(crate) fn send_stop(&self) {
        // A failed send means the worker already exited.
        let _ = self.tx.send(ChunkOp::Stop);
    }

    /// Issue a fresh requester identity, unique within this service.
    pub fn new_requester(&self) -> RequesterId {
        RequesterId::new(self.requester_seq.fetch_add(1, Ordering::Relaxed))
    }

    fn submit<T>(&self, op: ChunkOp, rx: oneshot::Receiver<T>) -> Result<oneshot::Receiver<T>> {
        self.tx
            .send(op)
            .map_err(|_| anyhow::anyhow!("world service has stopped"))?;
        Ok(rx)
    }

    /// Register `requester` on a chunk and make it resident.
    pub async fn request_load(&self, requester: RequesterId, pos: ChunkPos) -> Result<()> {
        self.request_load_many(requester, vec![pos]).await
    }

    /// Register `requester` on a batch of chunks in one operation.
    pub async fn request_load_many(
        &self,
        requester: RequesterId,
        positions: Vec<ChunkPos>,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(
            ChunkOp::Load {
                requester,
                positions,
                reply,
            },
            rx,
        )?;
        rx.await.context("world service dropped the reply")
    }

    /// Release `requester`'s hold on a chunk.
    pub async fn request_unload(&self, requester: RequesterId, pos: ChunkPos) -> Result<()> {
        self.request_unload_many(requester, vec![pos]).await
    }

    /// Release `requester`'s hold on a batch of chunks in one operation.
    pub async fn request_unload_many(
        &self,
        requester: RequesterId,
        positions: Vec<ChunkPos>,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(
            ChunkOp::Unload {
                requester,
                positions,
                reply,
            },
            rx,
        )?;
        rx.await.context("world service dropped the reply")
    }

    /// Resolve the tile at a position, or `None` when empty.
    pub async fn tile_at(&self, tile: TilePos) -> Result<Option<TileDefinition>> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(ChunkOp::GetTile { tile, reply }, rx)?;
        Ok(rx.await.context("world service dropped the reply")??)
    }

    /// Place a tile by id. An empty id removes the tile.
    pub async fn set_tile(&self, tile: TilePos, id: &str) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(
            ChunkOp::SetTile {
                tile,
                id: id.to_string(),
                reply,
            },
            rx,
        )?;
        Ok(rx.await.context("world service dropped the reply")??)
    }

    /// Remove the tile at a position.
    pub async fn remove_tile(&self, tile: TilePos) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(ChunkOp::RemoveTile { tile, reply }, rx)?;
        Ok(rx.await.context("world service dropped the reply")??)
    }

    /// Whether a position holds no tile.
    pub async fn is_empty_tile(&self, tile: TilePos) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(ChunkOp::IsEmptyTile { tile, reply }, rx)?;
        Ok(rx.await.context("world service dropped the reply")??)
    }

    /// Read a property from a tile in a resident chunk.
    pub async fn property(&self, tile: TilePos, name: &str) -> Result<Option<PropertyValue>> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(
            ChunkOp::GetProperty {
                tile,
                name: name.to_string(),
                reply,
            },
            rx,
        )?;
        Ok(rx.await.context("world service dropped the reply")??)
    }

    /// Store a property on a tile in a resident chunk.
    pub async fn set_property(
        &self,
        tile: TilePos,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(
            ChunkOp::SetProperty {
                tile,
                name: name.to_string(),
                value,
                reply,
            },
            rx,
        )?;
        Ok(rx.await.context("world service dropped the reply")??)
    }

    /// Remove a property from a tile in a resident chunk. Returns whether an
    /// entry was removed.
    pub async fn erase_property(&self, tile: TilePos, name: &str) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(
            ChunkOp::EraseProperty {
                tile,
                name: name.to_string(),
                reply,
            },
            rx,
        )?;
        Ok(rx.await.context("world service dropped the reply")??)
    }

    /// Positions of every dirty resident chunk.
    pub async fn dirty_chunks(&self) -> Result<Vec<ChunkPos>> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(ChunkOp::DirtyChunks { reply }, rx)?;
        rx.await.context("world service dropped the reply")
    }

    /// Persist the world metadata and every dirty chunk. Returns the number
    /// of chunks written.
    pub async fn save(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(ChunkOp::SaveAll { reply }, rx)?;
        rx.await.context("world service dropped the reply")?
    }

    /// Snapshot of the chunk-traffic counters.
    pub async fn stats(&self) -> Result<WorldStats> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(ChunkOp::Stats { reply }, rx)?;
        rx.await.context("world service dropped the reply")
    }

    /// The world metadata record.
    pub async fn info(&self) -> Result<WorldInfo> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(ChunkOp::Info { reply }, rx)?;
        rx.await.context("world service dropped the reply")
    }

    /// Number of requesters currently holding a chunk.
    pub async fn requester_count(&self, pos: ChunkPos) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(ChunkOp::RequesterCount { pos, reply }, rx)?;
        rx.await.context("world service dropped the reply")
    }

    /// Whether a chunk is currently resident.
    pub async fn is_resident(&self, pos: ChunkPos) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        let rx = self.submit(ChunkOp::IsResident { pos, reply }, rx)?;
        rx.await.context("world service dropped the reply")
    }
}
