// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::RemoteError;
use crate::models::{Collection, Record, RecordId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::debug;

pub type OpId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created(RecordId),
    Updated,
    Deleted,
    Failed(RemoteError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub op: OpId,
    pub outcome: Outcome,
}

/// Remote persistence boundary. Writes never block: each call returns an op
/// id immediately and its eventual result arrives later as a `Completion`
/// drained by the caller's event pump. Update is an upsert; deleting an id
/// the remote no longer has is a success.
pub trait RemoteStore {
    fn create(&mut self, collection: Collection, fields: Record) -> OpId;
    fn update(&mut self, collection: Collection, id: &str, fields: Record) -> OpId;
    fn delete(&mut self, collection: Collection, id: &str) -> OpId;
    fn take_completions(&mut self) -> Vec<Completion>;
}

/// In-memory remote store for tests and the replay harness. Writes take
/// effect on its collections immediately; completions queue up until the
/// session pumps them, which is how tests interleave "the write resolved"
/// with other events. Failures are scripted per id.
pub struct MemoryRemote {
    collections: HashMap<Collection, Vec<Record>>,
    next_op: OpId,
    next_id: u64,
    completions: Vec<Completion>,
    fail_deletes: HashSet<RecordId>,
    fail_next_create: bool,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        MemoryRemote {
            collections: HashMap::new(),
            next_op: 0,
            next_id: 0,
            completions: Vec::new(),
            fail_deletes: HashSet::new(),
            fail_next_create: false,
        }
    }

    /// Install canonical records without going through `create`, keeping the
    /// ids as given. The id counter moves past any `rec-N` ids seeded.
    pub fn seed(&mut self, collection: Collection, records: Vec<Record>) {
        for record in &records {
            if let Some(n) = record
                .id
                .strip_prefix("rec-")
                .and_then(|s| s.parse::<u64>().ok())
            {
                self.next_id = self.next_id.max(n + 1);
            }
        }
        self.collections.insert(collection, records);
    }

    /// Current canonical state, as a stream snapshot would deliver it.
    pub fn records(&self, collection: Collection) -> Vec<Record> {
        self.collections.get(&collection).cloned().unwrap_or_default()
    }

    /// Script the next delete of `id` to fail with a transient error.
    pub fn fail_next_delete(&mut self, id: &str) {
        self.fail_deletes.insert(id.to_string());
    }

    /// Script the next create to fail with a transient error.
    pub fn fail_next_create(&mut self) {
        self.fail_next_create = true;
    }

    fn alloc_op(&mut self) -> OpId {
        let op = self.next_op;
        self.next_op += 1;
        op
    }

    fn push(&mut self, op: OpId, outcome: Outcome) -> OpId {
        self.completions.push(Completion { op, outcome });
        op
    }
}

impl RemoteStore for MemoryRemote {
    fn create(&mut self, collection: Collection, mut fields: Record) -> OpId {
        let op = self.alloc_op();
        if self.fail_next_create {
            self.fail_next_create = false;
            return self.push(op, Outcome::Failed(RemoteError::Transient("create refused".into())));
        }
        let id = format!("rec-{}", self.next_id);
        self.next_id += 1;
        fields.id = id.clone();
        debug!(collection = collection.as_str(), %id, "remote create");
        self.collections.entry(collection).or_default().push(fields);
        self.push(op, Outcome::Created(id))
    }

    fn update(&mut self, collection: Collection, id: &str, mut fields: Record) -> OpId {
        let op = self.alloc_op();
        fields.id = id.to_string();
        let records = self.collections.entry(collection).or_default();
        // Upsert: the client may be ahead of or behind the remote store.
        match records.iter_mut().find(|r| r.id == id) {
            Some(existing) => *existing = fields,
            None => records.push(fields),
        }
        self.push(op, Outcome::Updated)
    }

    fn delete(&mut self, collection: Collection, id: &str) -> OpId {
        let op = self.alloc_op();
        if self.fail_deletes.remove(id) {
            return self.push(op, Outcome::Failed(RemoteError::Transient("delete refused".into())));
        }
        if let Some(records) = self.collections.get_mut(&collection) {
            records.retain(|r| r.id != id);
        }
        debug!(collection = collection.as_str(), id, "remote delete");
        // Deleting an absent id is a success, not an error.
        self.push(op, Outcome::Deleted)
    }

    fn take_completions(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completions)
    }
}

/// Lets a test or harness keep a handle on the remote while the session owns
/// a `Box<dyn RemoteStore>` of the same instance.
impl RemoteStore for Rc<RefCell<MemoryRemote>> {
    fn create(&mut self, collection: Collection, fields: Record) -> OpId {
        self.borrow_mut().create(collection, fields)
    }

    fn update(&mut self, collection: Collection, id: &str, fields: Record) -> OpId {
        self.borrow_mut().update(collection, id, fields)
    }

    fn delete(&mut self, collection: Collection, id: &str) -> OpId {
        self.borrow_mut().delete(collection, id)
    }

    fn take_completions(&mut self) -> Vec<Completion> {
        self.borrow_mut().take_completions()
    }
}
