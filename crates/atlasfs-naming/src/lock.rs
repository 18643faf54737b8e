//! Queued shared/exclusive locks and whole-path acquisition
//!
//! Every namespace node carries a [`NodeLock`]: one monitor holding the
//! reader count, the writer flag, and a FIFO wait queue behind a single
//! mutex. Requests suspend on a oneshot grant signal rather than spinning,
//! and grants are handed out in arrival order at the granularity of "runs
//! of shared requests" and individual exclusive requests.
//!
//! [`PathLockManager`] stacks node locks hand-over-hand along a path: root
//! first, shared on every intermediate, the caller's mode at the terminal.
//! Replication bookkeeping fires at the terminal while its lock is held.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use atlasfs_core::error::{DfsError, DfsResult};

use crate::replication::ReplicationController;
use crate::tree::NamespaceTree;

struct Waiter {
    exclusive: bool,
    grant: oneshot::Sender<()>,
}

#[derive(Default)]
struct LockState {
    shared: usize,
    exclusive: bool,
    queue: VecDeque<Waiter>,
}

/// A queued shared/exclusive lock for one namespace node.
///
/// Grant rules: exclusive is granted only when the node is idle; shared is
/// granted whenever no writer holds the node and no earlier request is
/// still queued. A queued exclusive request blocks every later request
/// from overtaking it, so writers cannot starve.
///
/// Unlike an RAII guard, a grant here survives the calling task: the lock
/// is held until some task calls [`release`]. That is what lets a lock
/// taken by one HTTP request be released by a later one.
///
/// [`release`]: NodeLock::release
#[derive(Default)]
pub struct NodeLock {
    state: Mutex<LockState>,
}

impl NodeLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until this node grants the requested mode.
    pub async fn acquire(&self, exclusive: bool) {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.guard();
            state.queue.push_back(Waiter {
                exclusive,
                grant: tx,
            });
            Self::process(&mut state);
        }
        // The sender stays queued until the grant fires and is never
        // dropped while the lock is alive, so completion means granted.
        let _ = rx.await;
    }

    /// Returns the mode acquired earlier. Releasing more than was held is
    /// tolerated; the reader count never goes below zero.
    pub fn release(&self, exclusive: bool) {
        let mut state = self.guard();
        if exclusive {
            state.exclusive = false;
        } else {
            state.shared = state.shared.saturating_sub(1);
        }
        Self::process(&mut state);
    }

    pub fn shared_count(&self) -> usize {
        self.guard().shared
    }

    pub fn is_exclusive(&self) -> bool {
        self.guard().exclusive
    }

    pub fn queue_len(&self) -> usize {
        self.guard().queue.len()
    }

    /// Grants whatever the head of the queue allows: one exclusive request
    /// from idle, or the whole run of consecutive shared requests when no
    /// writer holds the node. Stops at the first request it cannot grant.
    fn process(state: &mut LockState) {
        loop {
            let Some(head) = state.queue.front() else {
                return;
            };
            if head.exclusive {
                if state.shared == 0 && !state.exclusive {
                    if let Some(waiter) = state.queue.pop_front() {
                        state.exclusive = true;
                        if waiter.grant.send(()).is_err() {
                            // Requester abandoned the wait; undo and rescan.
                            state.exclusive = false;
                            continue;
                        }
                    }
                }
                return;
            }
            if state.exclusive {
                return;
            }
            // Wake the whole run of shared requests at the head together.
            while let Some(next) = state.queue.front() {
                if next.exclusive {
                    break;
                }
                if let Some(waiter) = state.queue.pop_front() {
                    state.shared += 1;
                    if waiter.grant.send(()).is_err() {
                        state.shared -= 1;
                    }
                }
            }
        }
    }

    fn guard(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Acquires and releases lock chains over whole paths.
///
/// Acquisition is root-to-leaf, each node fully granted before the next is
/// requested: the root shared (unless the operation targets the root
/// itself), every intermediate shared, the terminal in the caller's mode.
/// Release walks the same order. Terminal grants feed the
/// [`ReplicationController`] while the terminal lock is still held, so
/// replication decisions see a stable replica list.
pub struct PathLockManager {
    tree: Arc<NamespaceTree>,
    replication: ReplicationController,
}

impl PathLockManager {
    pub fn new(tree: Arc<NamespaceTree>, replication: ReplicationController) -> Self {
        Self { tree, replication }
    }

    /// Locks `path` for shared or exclusive access. Fails without touching
    /// any lock if the path is absent.
    pub async fn lock(&self, path: &str, exclusive: bool) -> DfsResult<()> {
        let Some(chain) = self.tree.resolve_chain(path) else {
            return Err(DfsError::FileNotFound(format!("{path} does not exist.")));
        };

        let root = self.tree.root();
        if chain.is_empty() {
            root.lock().acquire(exclusive).await;
            return Ok(());
        }

        root.lock().acquire(false).await;
        let last = chain.len() - 1;
        for (i, node) in chain.iter().enumerate() {
            let terminal = i == last;
            node.lock().acquire(terminal && exclusive).await;
            if terminal {
                if exclusive {
                    self.replication.on_exclusive_grant(path, node).await;
                } else {
                    self.replication.on_shared_grant(path, node).await;
                }
            }
        }
        Ok(())
    }

    /// Releases a chain taken by [`lock`] with the same path and mode.
    /// Release order matches acquisition (root first).
    ///
    /// [`lock`]: PathLockManager::lock
    pub async fn unlock(&self, path: &str, exclusive: bool) -> DfsResult<()> {
        let Some(chain) = self.tree.resolve_chain(path) else {
            return Err(DfsError::IllegalArgument(format!(
                "{path} does not exist."
            )));
        };

        let root = self.tree.root();
        if chain.is_empty() {
            root.lock().release(exclusive);
            return Ok(());
        }

        root.lock().release(false);
        let last = chain.len() - 1;
        for (i, node) in chain.iter().enumerate() {
            node.lock().release(i == last && exclusive);
        }
        Ok(())
    }
}
