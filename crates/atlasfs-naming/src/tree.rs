//! In-memory namespace tree
//!
//! One [`NamespaceNode`] per path component. The tree owns every node
//! reachable from the root; nodes are created on first reference and never
//! removed (deleting a file only purges storage bytes, the tree entry
//! stays). Structural mutation takes the root's exclusive lock for its
//! whole duration; traversal reads are unsynchronized snapshots the caller
//! is expected to guard with per-node locks.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use dashmap::DashMap;

use crate::lock::NodeLock;

/// A single directory or file in the namespace.
///
/// `sources` is the ordered replica list: element 0 is the primary copy,
/// identified by the storage node's client port. Directories carry a source
/// only as a bootstrap default for children created beneath them.
pub struct NamespaceNode {
    name: String,
    is_dir: AtomicBool,
    sources: Mutex<Vec<u16>>,
    read_pressure: AtomicU32,
    lock: NodeLock,
    children: DashMap<String, Arc<NamespaceNode>>,
}

impl NamespaceNode {
    pub fn new(name: impl Into<String>, is_dir: bool, source: u16) -> Self {
        Self {
            name: name.into(),
            is_dir: AtomicBool::new(is_dir),
            sources: Mutex::new(vec![source]),
            read_pressure: AtomicU32::new(0),
            lock: NodeLock::new(),
            children: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir.load(Ordering::SeqCst)
    }

    pub fn set_is_dir(&self, is_dir: bool) {
        self.is_dir.store(is_dir, Ordering::SeqCst);
    }

    pub fn child(&self, name: &str) -> Option<Arc<NamespaceNode>> {
        self.children.get(name).map(|c| Arc::clone(c.value()))
    }

    /// Names of all direct children, sorted for stable listings.
    pub fn child_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.children.iter().map(|c| c.key().clone()).collect();
        names.sort();
        names
    }

    pub(crate) fn insert_child(&self, name: impl Into<String>, node: Arc<NamespaceNode>) {
        self.children.insert(name.into(), node);
    }

    /// The queued shared/exclusive lock guarding this node.
    pub fn lock(&self) -> &NodeLock {
        &self.lock
    }

    pub fn sources_snapshot(&self) -> Vec<u16> {
        self.sources_guard().clone()
    }

    /// The authoritative copy, if any source is recorded.
    pub fn primary_source(&self) -> Option<u16> {
        self.sources_guard().first().copied()
    }

    pub fn append_source(&self, source: u16) {
        self.sources_guard().push(source);
    }

    /// Truncates the replica list to the primary and returns the removed
    /// extras, in order. Empty if there was at most one source.
    pub fn take_extra_sources(&self) -> Vec<u16> {
        let mut sources = self.sources_guard();
        if sources.len() > 1 {
            sources.split_off(1)
        } else {
            Vec::new()
        }
    }

    /// Counts one shared grant and returns the new pressure value.
    pub fn bump_read_pressure(&self) -> u32 {
        self.read_pressure.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Subtracts `amount` from the pressure counter, keeping any grants
    /// accrued above it.
    pub fn relieve_read_pressure(&self, amount: u32) {
        self.read_pressure.fetch_sub(amount, Ordering::SeqCst);
    }

    pub fn clear_read_pressure(&self) {
        self.read_pressure.store(0, Ordering::SeqCst);
    }

    pub fn read_pressure(&self) -> u32 {
        self.read_pressure.load(Ordering::SeqCst)
    }

    fn sources_guard(&self) -> std::sync::MutexGuard<'_, Vec<u16>> {
        self.sources.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for NamespaceNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceNode")
            .field("name", &self.name)
            .field("is_dir", &self.is_dir())
            .field("sources", &self.sources_snapshot())
            .field("read_pressure", &self.read_pressure())
            .field("children", &self.child_names())
            .finish()
    }
}

/// The whole namespace, rooted at `/`.
pub struct NamespaceTree {
    root: Arc<NamespaceNode>,
}

impl NamespaceTree {
    /// Builds an empty tree whose root carries `default_source` as the
    /// bootstrap replica source inherited by nodes created without one.
    pub fn new(default_source: u16) -> Self {
        Self {
            root: Arc::new(NamespaceNode::new("/", true, default_source)),
        }
    }

    pub fn root(&self) -> Arc<NamespaceNode> {
        Arc::clone(&self.root)
    }

    /// Resolves a sanitized path to its node. `/` resolves to the root;
    /// any absent segment fails the whole lookup.
    pub fn find(&self, path: &str) -> Option<Arc<NamespaceNode>> {
        let mut current = Arc::clone(&self.root);
        for segment in atlasfs_core::path::segments(path) {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Resolves every node along `path` below the root, in order. Returns
    /// an empty chain for `/` and `None` if any segment is absent.
    pub fn resolve_chain(&self, path: &str) -> Option<Vec<Arc<NamespaceNode>>> {
        let mut chain = Vec::new();
        let mut current = Arc::clone(&self.root);
        for segment in atlasfs_core::path::segments(path) {
            current = current.child(segment)?;
            chain.push(Arc::clone(&current));
        }
        Some(chain)
    }

    /// Inserts `path`, creating missing intermediates as directories.
    ///
    /// New nodes take `source` when given, otherwise they inherit the
    /// primary source of the nearest existing ancestor. The terminal node's
    /// directory flag is set to `is_dir` whether or not it already existed.
    /// Holds the root exclusively for the whole mutation.
    pub async fn add(&self, path: &str, is_dir: bool, source: Option<u16>) {
        self.root.lock().acquire(true).await;

        let segments: Vec<&str> = atlasfs_core::path::segments(path).collect();
        let mut current = Arc::clone(&self.root);
        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            let next = match current.child(segment) {
                Some(child) => child,
                None => {
                    let inherited = source
                        .or_else(|| current.primary_source())
                        .unwrap_or_default();
                    let child = Arc::new(NamespaceNode::new(*segment, i < last, inherited));
                    current.insert_child(*segment, Arc::clone(&child));
                    child
                }
            };
            current = next;
        }
        if !segments.is_empty() {
            current.set_is_dir(is_dir);
        }

        self.root.lock().release(true);
    }
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new(0)
    }
}
