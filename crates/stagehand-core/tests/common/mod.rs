use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use stagehand_core::{
    CommitOutcome, ErrorCollector, ErrorKind, PendingUpdate, PendingUpdateTyped, Result,
    StagedError, Status, Versioned, VersionedStore,
};

/// Value produced by `MockPendingUpdate::apply`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockSnapshot {
    pub name: String,
    pub id: i64,
}

/// Reply the scripted store gives to the next compare-and-swap
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Someone else committed first: bump the version, report a conflict
    ConcurrentWrite,
    /// Apply the write, then lose the acknowledgement
    LostAck,
}

/// In-memory store whose next replies can be scripted
#[allow(dead_code)]
pub struct ScriptedStore {
    current: Mutex<Versioned<MockSnapshot>>,
    script: Mutex<VecDeque<Script>>,
    writes: Mutex<u32>,
}

#[allow(dead_code)]
impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(Versioned::new(1, MockSnapshot::default())),
            script: Mutex::new(VecDeque::new()),
            writes: Mutex::new(0),
        })
    }

    pub fn push(&self, script: Script) {
        self.script.lock().unwrap().push_back(script);
    }

    pub fn version(&self) -> u64 {
        self.current.lock().unwrap().version
    }

    pub fn snapshot(&self) -> MockSnapshot {
        self.current.lock().unwrap().value.clone()
    }

    /// Number of compare-and-swap calls received
    pub fn writes(&self) -> u32 {
        *self.writes.lock().unwrap()
    }
}

impl VersionedStore<MockSnapshot> for ScriptedStore {
    fn load(&self, _object_id: &str) -> Result<Versioned<MockSnapshot>> {
        Ok(self.current.lock().unwrap().clone())
    }

    fn compare_and_swap(
        &self,
        _object_id: &str,
        expected_version: u64,
        value: &MockSnapshot,
    ) -> Result<CommitOutcome> {
        *self.writes.lock().unwrap() += 1;
        let mut current = self.current.lock().unwrap();

        match self.script.lock().unwrap().pop_front() {
            Some(Script::ConcurrentWrite) => {
                current.version += 1;
                return Ok(CommitOutcome::Conflict {
                    expected: expected_version,
                    actual: Some(current.version),
                });
            }
            Some(Script::LostAck) => {
                current.version += 1;
                current.value = value.clone();
                return Ok(CommitOutcome::Unknown {
                    reason: "acknowledgement lost".to_string(),
                });
            }
            None => {}
        }

        if current.version != expected_version {
            return Ok(CommitOutcome::Conflict {
                expected: expected_version,
                actual: Some(current.version),
            });
        }
        current.version += 1;
        current.value = value.clone();
        Ok(CommitOutcome::Committed {
            version: current.version,
        })
    }
}

/// Staged update with two validated fields and an optional backing store
#[allow(dead_code)]
#[derive(Default)]
pub struct MockPendingUpdate {
    name: String,
    id: i64,
    store: Option<Arc<ScriptedStore>>,
    base_version: u64,
    should_fail: bool,
    commits: u32,
    errors: ErrorCollector,
}

#[allow(dead_code)]
impl MockPendingUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update whose commit writes to `store`, based on its current version
    pub fn against(store: Arc<ScriptedStore>) -> Self {
        let base_version = store.version();
        Self {
            store: Some(store),
            base_version,
            ..Self::default()
        }
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        if name.is_empty() {
            self.add_error(ErrorKind::InvalidArgument, "Name cannot be empty");
            return self;
        }
        if name.len() > 100 {
            self.add_error(ErrorKind::InvalidArgument, "Name cannot exceed 100 characters");
            return self;
        }
        self.name = name.to_string();
        self
    }

    pub fn set_id(&mut self, id: i64) -> &mut Self {
        if id < 0 {
            self.add_error(ErrorKind::InvalidArgument, "ID must be non-negative");
            return self;
        }
        self.id = id;
        self
    }

    pub fn set_should_fail(&mut self, fail: bool) {
        self.should_fail = fail;
    }

    pub fn record_external(&mut self, err: StagedError) {
        self.add_existing_error(err);
    }

    pub fn commits(&self) -> u32 {
        self.commits
    }
}

impl PendingUpdate for MockPendingUpdate {
    fn commit(&mut self) -> Status {
        self.check_errors()?;
        let snapshot = self.apply()?;

        if let Some(store) = &self.store {
            let outcome = store.compare_and_swap("mock", self.base_version, &snapshot)?;
            match &outcome {
                CommitOutcome::Committed { version } => self.base_version = *version,
                // re-derive from the refreshed base on the next attempt
                CommitOutcome::Conflict { .. } => self.base_version = store.version(),
                CommitOutcome::Unknown { .. } => {}
            }
            outcome.into_status()?;
        }

        self.commits += 1;
        Ok(())
    }
}

impl PendingUpdateTyped for MockPendingUpdate {
    type Output = MockSnapshot;

    fn apply(&self) -> Result<MockSnapshot> {
        self.check_errors()?;

        if self.should_fail {
            return Err(StagedError::validation_failed("Mock validation failed"));
        }
        Ok(MockSnapshot {
            name: self.name.clone(),
            id: self.id,
        })
    }

    fn collector(&self) -> &ErrorCollector {
        &self.errors
    }

    fn collector_mut(&mut self) -> &mut ErrorCollector {
        &mut self.errors
    }
}
