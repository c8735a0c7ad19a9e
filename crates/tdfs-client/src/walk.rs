//! Parallel directory traversal with a bounded, work-stealing worker pool.
//!
//! A fixed number of workers consume directory paths from one shared FIFO
//! queue seeded with the start path. A pending-work counter tracks
//! directories that have been enqueued but not yet fully listed: it is
//! incremented at enqueue time and decremented only after a worker has
//! listed the whole directory (re-enqueuing its subdirectories first), so
//! the counter reaching zero proves no further work can appear. Per-file
//! visitor invocations run as spawned tasks tracked by a separate
//! completion counter; the coordinator joins the workers and then drains
//! that counter before returning.
//!
//! Partial-failure policy: a directory that fails to open or list is
//! logged and abandoned; the rest of the traversal continues.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinSet;

use crate::client::DfsClient;
use crate::error::ClientResult;
use tdfs_proto::FileInfo;

/// Called once for every file encountered during a traversal.
///
/// Visitors run as spawned tasks, so implementations must be cheap to
/// share and internally synchronized.
#[async_trait]
pub trait FileVisitor: Send + Sync + 'static {
    async fn visit(&self, file: FileInfo);
}

/// Counters reported by a completed traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalkStats {
    /// Directories fully listed (including the root).
    pub dirs_listed: u64,
    /// Files handed to the visitor.
    pub files_visited: u64,
    /// Directories abandoned after an open or read error.
    pub dirs_abandoned: u64,
}

struct WalkShared {
    /// FIFO of directory paths waiting for a worker.
    queue: Mutex<VecDeque<String>>,
    /// Directories enqueued but not yet fully listed.
    pending: AtomicUsize,
    /// Wakes idle workers when work arrives or the pending count drains.
    work_notify: Notify,
    /// Spawned visitor tasks that have not finished yet.
    visitors_inflight: AtomicUsize,
    visitor_notify: Notify,
    dirs_listed: AtomicU64,
    files_visited: AtomicU64,
    dirs_abandoned: AtomicU64,
}

impl WalkShared {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            pending: AtomicUsize::new(0),
            work_notify: Notify::new(),
            visitors_inflight: AtomicUsize::new(0),
            visitor_notify: Notify::new(),
            dirs_listed: AtomicU64::new(0),
            files_visited: AtomicU64::new(0),
            dirs_abandoned: AtomicU64::new(0),
        }
    }

    /// Add a directory to the queue. The pending counter goes up before
    /// the path becomes visible so an idle worker can never observe an
    /// empty queue with a stale zero count.
    fn enqueue(&self, path: String) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.queue.lock().push_back(path);
        self.work_notify.notify_waiters();
    }

    /// Mark one queued directory as fully processed.
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last pending directory: wake idle workers so they can exit.
            self.work_notify.notify_waiters();
        }
    }
}

/// A reusable traversal engine with a fixed worker pool.
pub struct Walker {
    workers: usize,
}

impl Walker {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Visit every file under `root` exactly once.
    ///
    /// Fails fast if the root itself cannot be opened; errors below the
    /// root abandon only the affected subtree.
    pub async fn walk(
        &self,
        client: Arc<DfsClient>,
        root: &str,
        visitor: Arc<dyn FileVisitor>,
    ) -> ClientResult<WalkStats> {
        let handle = client.open_dir(root).await?;

        let shared = Arc::new(WalkShared::new());
        shared.enqueue(handle);

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            let shared = Arc::clone(&shared);
            let client = Arc::clone(&client);
            let visitor = Arc::clone(&visitor);
            workers.spawn(async move {
                worker_loop(worker_id, shared, client, visitor).await;
            });
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "traversal worker panicked");
            }
        }

        // All directories are listed; wait for outstanding visitor tasks.
        loop {
            if shared.visitors_inflight.load(Ordering::Acquire) == 0 {
                break;
            }
            let notified = shared.visitor_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if shared.visitors_inflight.load(Ordering::Acquire) == 0 {
                break;
            }
            notified.await;
        }

        Ok(WalkStats {
            dirs_listed: shared.dirs_listed.load(Ordering::Acquire),
            files_visited: shared.files_visited.load(Ordering::Acquire),
            dirs_abandoned: shared.dirs_abandoned.load(Ordering::Acquire),
        })
    }
}

async fn worker_loop(
    worker_id: usize,
    shared: Arc<WalkShared>,
    client: Arc<DfsClient>,
    visitor: Arc<dyn FileVisitor>,
) {
    loop {
        let next = shared.queue.lock().pop_front();
        match next {
            Some(dir) => {
                process_directory(&shared, &client, &visitor, &dir).await;
                shared.finish_one();
            }
            None => {
                if shared.pending.load(Ordering::Acquire) == 0 {
                    break;
                }
                // Register for a wakeup, then re-check both conditions to
                // close the race against a concurrent enqueue/finish.
                let notified = shared.work_notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if shared.pending.load(Ordering::Acquire) == 0 {
                    break;
                }
                if !shared.queue.lock().is_empty() {
                    continue;
                }
                notified.await;
            }
        }
    }
    tracing::trace!(worker_id, "traversal worker exiting");
}

async fn process_directory(
    shared: &Arc<WalkShared>,
    client: &Arc<DfsClient>,
    visitor: &Arc<dyn FileVisitor>,
    dir: &str,
) {
    let handle = match client.open_dir(dir).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(dir, error = %e, "failed to open directory, abandoning subtree");
            shared.dirs_abandoned.fetch_add(1, Ordering::AcqRel);
            return;
        }
    };

    let mut index: i64 = 0;
    loop {
        match client.read_dir_entry(&handle, index, true).await {
            Ok(Some(entry)) => {
                if entry.is_dir {
                    // Subdirectories are enqueued before this directory is
                    // marked finished, keeping the pending count truthful.
                    shared.enqueue(entry.path.clone());
                } else {
                    spawn_visit(shared, visitor, entry);
                }
                index += 1;
            }
            Ok(None) => break,
            Err(e) => {
                // One broken directory must not abort the traversal.
                tracing::warn!(dir, index, error = %e, "directory read failed, abandoning remaining entries");
                shared.dirs_abandoned.fetch_add(1, Ordering::AcqRel);
                return;
            }
        }
    }
    shared.dirs_listed.fetch_add(1, Ordering::AcqRel);
}

/// Run the visitor as a tracked fire-and-forget task.
fn spawn_visit(shared: &Arc<WalkShared>, visitor: &Arc<dyn FileVisitor>, entry: FileInfo) {
    shared.files_visited.fetch_add(1, Ordering::AcqRel);
    shared.visitors_inflight.fetch_add(1, Ordering::AcqRel);
    let shared = Arc::clone(shared);
    let visitor = Arc::clone(visitor);
    tokio::spawn(async move {
        visitor.visit(entry).await;
        if shared.visitors_inflight.fetch_sub(1, Ordering::AcqRel) == 1 {
            shared.visitor_notify.notify_waiters();
        }
    });
}

/// Strictly sequential depth-first traversal with the same visit
/// semantics, used as the correctness reference and for small trees.
/// Unlike [`Walker::walk`], errors propagate to the caller.
pub async fn walk_sequential(
    client: &DfsClient,
    root: &str,
    visitor: Arc<dyn FileVisitor>,
) -> ClientResult<WalkStats> {
    let handle = client.open_dir(root).await?;
    let mut stats = WalkStats::default();
    walk_dir(client, &visitor, handle, &mut stats).await?;
    Ok(stats)
}

fn walk_dir<'a>(
    client: &'a DfsClient,
    visitor: &'a Arc<dyn FileVisitor>,
    dir: String,
    stats: &'a mut WalkStats,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ClientResult<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut index: i64 = 0;
        while let Some(entry) = client.read_dir_entry(&dir, index, true).await? {
            if entry.is_dir {
                walk_dir(client, visitor, entry.path.clone(), stats).await?;
            } else {
                stats.files_visited += 1;
                visitor.visit(entry).await;
            }
            index += 1;
        }
        stats.dirs_listed += 1;
        Ok(())
    })
}

/// Count occurrences of `word` across every file under `root`, running
/// each count on the storage node that owns the file.
pub async fn distributed_grep(
    client: Arc<DfsClient>,
    root: &str,
    word: &str,
) -> ClientResult<u64> {
    struct GrepVisitor {
        client: Arc<DfsClient>,
        word: String,
        total: AtomicU64,
    }

    #[async_trait]
    impl FileVisitor for GrepVisitor {
        async fn visit(&self, file: FileInfo) {
            let Some(node) = file.owner else {
                tracing::warn!(path = %file.path, "file entry has no owning node, skipping");
                return;
            };
            match self.client.grep_file(node, &file.path, &self.word).await {
                Ok(count) => {
                    self.total.fetch_add(count, Ordering::AcqRel);
                }
                Err(e) => {
                    tracing::warn!(path = %file.path, error = %e, "grep failed for file");
                }
            }
        }
    }

    let visitor = Arc::new(GrepVisitor {
        client: Arc::clone(&client),
        word: word.to_string(),
        total: AtomicU64::new(0),
    });

    let walker = Walker::new(client.config().walker_workers);
    walker.walk(client, root, visitor.clone() as Arc<dyn FileVisitor>).await?;

    Ok(visitor.total.load(Ordering::Acquire))
}
