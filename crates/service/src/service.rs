use std::ops::ControlFlow;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, trace};

use tilestream_world::World;

use crate::handle::WorldHandle;
use crate::ops::ChunkOp;

/// Owns the worker thread that applies [`ChunkOp`]s to a [`World`] strictly
/// in arrival order. All chunk I/O happens on this thread, so a chunk is
/// never loaded twice concurrently and writes never race.
pub struct WorldService {
    handle: WorldHandle,
    worker: thread::JoinHandle<()>,
}

impl WorldService {
    /// Move `world` onto a fresh worker thread and start draining the
    /// operation queue.
    pub fn spawn(world: World) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let name = world.info().name.clone();
        let worker = thread::Builder::new()
            .name("world-worker".to_string())
            .spawn(move || run_worker(world, rx))
            .context("failed to spawn world worker thread")?;
        info!("world service started for {name:?}");
        Ok(Self {
            handle: WorldHandle::new(tx, Arc::new(AtomicU64::new(0))),
            worker,
        })
    }

    /// A cloneable handle for submitting operations.
    pub fn handle(&self) -> WorldHandle {
        self.handle.clone()
    }

    /// Stop the worker: flush dirty chunks and join. Outstanding handles
    /// stop working once this returns. Dropping every handle without calling
    /// this flushes too; `shutdown` additionally surfaces a worker panic.
    pub fn shutdown(self) -> Result<()> {
        self.handle.send_stop();
        self.worker
            .join()
            .map_err(|_| anyhow::anyhow!("world worker thread panicked"))
    }
}

fn run_worker(mut world: World, mut rx: mpsc::UnboundedReceiver<ChunkOp>) {
    'running: while let Some(op) = rx.blocking_recv() {
        if apply(&mut world, op).is_break() {
            break 'running;
        }
        // Drain whatever is already queued before sweeping, so a burst of
        // tile operations on the same chunk loads it once.
        while let Ok(op) = rx.try_recv() {
            if apply(&mut world, op).is_break() {
                break 'running;
            }
        }
        world.sweep_orphans();
    }
    rx.close();
    let flushed = world.save_dirty();
    info!("world worker stopped; flushed {flushed} dirty chunks");
}

fn apply(world: &mut World, op: ChunkOp) -> ControlFlow<()> {
    trace!("applying {} op", op.kind());
    // Reply receivers may have been dropped; a failed send is not an error.
    match op {
        ChunkOp::Load {
            requester,
            positions,
            reply,
        } => {
            world.request_load_all(requester, &positions);
            let _ = reply.send(());
        }
        ChunkOp::Unload {
            requester,
            positions,
            reply,
        } => {
            world.request_unload_all(requester, &positions);
            let _ = reply.send(());
        }
        ChunkOp::GetTile { tile, reply } => {
            let result = world.tile_at(tile).map(|def| def.cloned());
            let _ = reply.send(result);
        }
        ChunkOp::SetTile { tile, id, reply } => {
            let _ = reply.send(world.set_tile_at(tile, &id));
        }
        ChunkOp::RemoveTile { tile, reply } => {
            let _ = reply.send(world.remove_tile_at(tile));
        }
        ChunkOp::IsEmptyTile { tile, reply } => {
            let _ = reply.send(world.is_empty_tile_at(tile));
        }
        ChunkOp::GetProperty { tile, name, reply } => {
            let result = world.property_at(tile, &name).map(|v| v.cloned());
            let _ = reply.send(result);
        }
        ChunkOp::SetProperty {
            tile,
            name,
            value,
            reply,
        } => {
            let _ = reply.send(world.set_property_at(tile, &name, value));
        }
        ChunkOp::EraseProperty { tile, name, reply } => {
            let _ = reply.send(world.erase_property_at(tile, &name));
        }
        ChunkOp::DirtyChunks { reply } => {
            let _ = reply.send(world.dirty_chunks());
        }
        ChunkOp::SaveAll { reply } => {
            let _ = reply.send(world.save());
        }
        ChunkOp::Stats { reply } => {
            let _ = reply.send(world.stats());
        }
        ChunkOp::Info { reply } => {
            let _ = reply.send(world.info().clone());
        }
        ChunkOp::RequesterCount { pos, reply } => {
            let _ = reply.send(world.requester_count(pos));
        }
        ChunkOp::IsResident { pos, reply } => {
            let _ = reply.send(world.is_resident(pos));
        }
        ChunkOp::Stop => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}
