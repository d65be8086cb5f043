use std::collections::BTreeSet;

use anyhow::Result;
use tracing::debug;

use tilestream_core::{coords, ChunkBounds, ChunkExtent, ChunkPos, TilePos};
use tilestream_world::RequesterId;

use crate::handle::WorldHandle;

/// Streaming window following a moving center: on each update it diffs the
/// wanted chunk set against what it already holds and submits only the
/// load and unload requests for the difference.
pub struct Viewport {
    requester: RequesterId,
    extent: ChunkExtent,
    view: ChunkBounds,
    loaded: BTreeSet<ChunkPos>,
}

impl Viewport {
    /// Construct a viewport whose wanted set is `view` translated to the
    /// center's chunk. `view` is relative, e.g. `(-1,-1,0)..(2,2,1)` for a
    /// 3x3 window on one layer.
    pub fn new(requester: RequesterId, extent: ChunkExtent, view: ChunkBounds) -> Self {
        Self {
            requester,
            extent,
            view,
            loaded: BTreeSet::new(),
        }
    }

    /// Square single-layer window reaching `radius` chunks from the center.
    pub fn with_radius(requester: RequesterId, extent: ChunkExtent, radius: i32) -> Self {
        let view = ChunkBounds::new(
            ChunkPos::new(-radius, -radius, 0),
            ChunkPos::new(radius + 1, radius + 1, 1),
        );
        Self::new(requester, extent, view)
    }

    /// The requester identity this viewport holds chunks under.
    pub fn requester(&self) -> RequesterId {
        self.requester
    }

    /// Chunks currently held by this viewport.
    pub fn loaded(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.loaded.iter().copied()
    }

    /// Recenter on the chunk owning `center` and reconcile: load newly
    /// wanted chunks, release no-longer-wanted ones. Chunks wanted both
    /// before and after the move are untouched. Returns (loads, unloads).
    pub async fn update(&mut self, handle: &WorldHandle, center: TilePos) -> Result<(usize, usize)> {
        let center_chunk = coords::tile_to_chunk(center, self.extent);
        let wanted: BTreeSet<ChunkPos> = self.view.offset(center_chunk).positions().collect();

        let loads: Vec<ChunkPos> = wanted.difference(&self.loaded).copied().collect();
        let unloads: Vec<ChunkPos> = self.loaded.difference(&wanted).copied().collect();
        let (load_count, unload_count) = (loads.len(), unloads.len());

        if !loads.is_empty() {
            handle.request_load_many(self.requester, loads).await?;
        }
        if !unloads.is_empty() {
            handle.request_unload_many(self.requester, unloads).await?;
        }

        debug!(
            "{} recentered on {center_chunk}: {load_count} loads, {unload_count} unloads",
            self.requester
        );
        self.loaded = wanted;
        Ok((load_count, unload_count))
    }

    /// Release every chunk this viewport holds.
    pub async fn release(&mut self, handle: &WorldHandle) -> Result<()> {
        let held: Vec<ChunkPos> = std::mem::take(&mut self.loaded).into_iter().collect();
        if !held.is_empty() {
            handle.request_unload_many(self.requester, held).await?;
        }
        Ok(())
    }
}
