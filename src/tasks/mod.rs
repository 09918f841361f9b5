//! Task collection and its synchronization with the server
//!
//! [`TaskSynchronizer`] owns the single in-memory copy of the user's tasks.
//! Edits, deletions and status changes are applied locally before the
//! request is issued, then either reconciled with the server's canonical
//! record or rolled back to a full snapshot taken just before the change.
//!
//! Calls on the same id are not serialized: if two are in flight, whichever
//! completes last decides the final value, and a rollback restores the
//! snapshot taken by its own call even if another call changed the
//! collection in the meantime.

mod gateway;
mod types;

use log::{debug, info};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::notice::{Notice, NoticeSink};

pub use gateway::*;
pub use types::*;

#[derive(Debug, Default)]
struct Collection {
    tasks: Vec<Task>,
    /// Bumped on every replacement of `tasks`
    version: u64,
    last_error: Option<String>,
}

impl Collection {
    fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.version += 1;
    }
}

struct Inner {
    api: Arc<dyn TaskApi>,
    sink: Arc<dyn NoticeSink>,
    collection: RwLock<Collection>,
    in_flight: AtomicUsize,
}

/// Marks an operation in flight until dropped
struct Busy<'a>(&'a AtomicUsize);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owner of the task collection. Cheap to clone; clones share state.
///
/// The collection is not tied to the session: after sign-out or a rejected
/// token it still holds the previous user's tasks until [`clear`] or the
/// next successful [`fetch_all`].
///
/// [`clear`]: TaskSynchronizer::clear
/// [`fetch_all`]: TaskSynchronizer::fetch_all
#[derive(Clone)]
pub struct TaskSynchronizer {
    inner: Arc<Inner>,
}

impl TaskSynchronizer {
    pub fn new(api: Arc<dyn TaskApi>, sink: Arc<dyn NoticeSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                sink,
                collection: RwLock::new(Collection::default()),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Collection> {
        self.inner
            .collection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Collection> {
        self.inner
            .collection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the collection, in arrival order
    pub fn tasks(&self) -> Vec<Task> {
        self.read().tasks.clone()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.read().tasks.iter().find(|task| task.id == id).cloned()
    }

    /// Tasks passing `filter`, in arrival order
    pub fn filtered(&self, filter: TaskFilter) -> Vec<Task> {
        filter.apply(&self.read().tasks).into_iter().cloned().collect()
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::of(&self.read().tasks)
    }

    /// Changes on every replacement of the collection
    pub fn version(&self) -> u64 {
        self.read().version
    }

    /// Advisory flag: some operation is in flight. Does not block new calls.
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Message of the most recent failed operation
    pub fn last_error(&self) -> Option<String> {
        self.read().last_error.clone()
    }

    /// Drop every task and the last error
    pub fn clear(&self) {
        let mut collection = self.write();
        collection.replace(Vec::new());
        collection.last_error = None;
    }

    fn begin(&self) -> Busy<'_> {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        self.write().last_error = None;
        Busy(&self.inner.in_flight)
    }

    fn record_failure(&self, err: &Error) {
        self.write().last_error = Some(err.user_message());
    }

    /// Replace the whole collection with the server's list
    pub async fn fetch_all(&self) -> Result<()> {
        let _busy = self.begin();
        match self.inner.api.list_all().await {
            Ok(tasks) => {
                debug!("Fetched {} tasks", tasks.len());
                self.write().replace(tasks);
                Ok(())
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Create a task. It joins the collection once the server returns it.
    pub async fn create(&self, title: &str, description: &str) -> Result<Task> {
        self.insert(NewTask::new(title, description)).await
    }

    /// Create a task with an initial status
    pub async fn create_with_status(
        &self,
        title: &str,
        description: &str,
        status: TaskStatus,
    ) -> Result<Task> {
        self.insert(NewTask::new(title, description).with_status(status))
            .await
    }

    async fn insert(&self, new_task: NewTask) -> Result<Task> {
        let _busy = self.begin();
        match self.inner.api.create(&new_task).await {
            Ok(task) => {
                info!("Created task {}", task.id);
                let mut collection = self.write();
                let mut tasks = collection.tasks.clone();
                tasks.push(task.clone());
                collection.replace(tasks);
                drop(collection);
                self.inner.sink.notify(Notice::success("Task created successfully!"));
                Ok(task)
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Edit title and/or description
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<()> {
        let api = self.inner.api.clone();
        let request = patch.clone();
        self.mutate(
            id,
            move |task| patch.apply_to(task),
            async move { api.update(id, &request).await },
            "Task updated successfully!",
        )
        .await
    }

    /// Move a task to any status, including the one it already has
    pub async fn set_status(&self, id: &str, status: TaskStatus) -> Result<()> {
        let api = self.inner.api.clone();
        self.mutate(
            id,
            move |task| task.status = status,
            async move { api.set_status(id, status).await },
            status.success_message(),
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let _busy = self.begin();
        let snapshot = {
            let mut collection = self.write();
            let snapshot = collection.tasks.clone();
            let remaining = snapshot.iter().filter(|task| task.id != id).cloned().collect();
            collection.replace(remaining);
            snapshot
        };
        debug!("Optimistically removed task {}", id);

        match self.inner.api.delete(id).await {
            Ok(()) => {
                info!("Deleted task {}", id);
                self.inner.sink.notify(Notice::success("Task deleted successfully!"));
                Ok(())
            }
            Err(err) => self.roll_back(id, snapshot, err),
        }
    }

    /// Apply `change` to the task locally, run `call`, then reconcile with
    /// the canonical record or restore the snapshot.
    async fn mutate<C, F>(&self, id: &str, change: C, call: F, success: &str) -> Result<()>
    where
        C: FnOnce(&mut Task),
        F: Future<Output = Result<Option<Task>>>,
    {
        let _busy = self.begin();
        let snapshot = {
            let mut collection = self.write();
            let snapshot = collection.tasks.clone();
            let mut tasks = snapshot.clone();
            if let Some(task) = tasks.iter_mut().find(|task| task.id == id) {
                change(task);
            }
            collection.replace(tasks);
            snapshot
        };
        debug!("Optimistically updated task {}", id);

        match call.await {
            Ok(canonical) => {
                if let Some(canonical) = canonical {
                    let mut collection = self.write();
                    let mut tasks = collection.tasks.clone();
                    if let Some(slot) = tasks.iter_mut().find(|task| task.id == id) {
                        *slot = canonical;
                    }
                    collection.replace(tasks);
                }
                self.inner.sink.notify(Notice::success(success));
                Ok(())
            }
            Err(err) => self.roll_back(id, snapshot, err),
        }
    }

    fn roll_back<T>(&self, id: &str, snapshot: Vec<Task>, err: Error) -> Result<T> {
        debug!("Rolling back task {} after failure: {}", id, err);
        let mut collection = self.write();
        collection.replace(snapshot);
        collection.last_error = Some(err.user_message());
        Err(err)
    }
}
