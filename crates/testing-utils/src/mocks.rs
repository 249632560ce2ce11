//! Mock implementations for repository traits
//!
//! In-memory mock that can be used for unit testing without an actual
//! database connection. The mock enforces the same
//! `(recurring_parent_id, due_date)` uniqueness rule as the real store,
//! so idempotence tests exercise the real contract.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use recur_core::{EngineError, EngineResult};
use recur_domain::entities::{SeriesState, Task};
use recur_domain::repositories::TaskRepository;

/// Mock implementation of TaskRepository for testing
#[derive(Debug, Clone, Default)]
pub struct MockTaskRepository {
    tasks: Arc<Mutex<HashMap<i64, Task>>>,
    next_id: Arc<Mutex<i64>>,
    /// Parent ids whose reads fail with StoreUnavailable, for isolation tests
    failing_parents: Arc<Mutex<HashSet<i64>>>,
}

impl MockTaskRepository {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
            failing_parents: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let mut task_map = HashMap::new();
        let mut max_id = 0;

        for task in tasks {
            if task.id > max_id {
                max_id = task.id;
            }
            task_map.insert(task.id, task);
        }

        Self {
            tasks: Arc::new(Mutex::new(task_map)),
            next_id: Arc::new(Mutex::new(max_id + 1)),
            failing_parents: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make reads for a given parent fail, simulating a broken series
    pub fn fail_reads_for(&self, parent_id: i64) {
        self.failing_parents.lock().unwrap().insert(parent_id);
    }

    pub fn clear(&self) {
        self.tasks.lock().unwrap().clear();
        *self.next_id.lock().unwrap() = 1;
    }

    pub fn count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn all_tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().values().cloned().collect()
    }

    /// All generated instances belonging to a parent
    pub fn instances_of(&self, parent_id: i64) -> Vec<Task> {
        self.tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.recurring_parent_id == Some(parent_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TaskRepository for MockTaskRepository {
    async fn create(&self, task: &Task) -> EngineResult<Task> {
        let mut tasks = self.tasks.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        let mut new_task = task.clone();
        new_task.id = *next_id;
        *next_id += 1;

        tasks.insert(new_task.id, new_task.clone());
        Ok(new_task)
    }

    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Task>> {
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks.get(&id).cloned())
    }

    async fn update(&self, task: &Task) -> EngineResult<()> {
        let mut tasks = self.tasks.lock().unwrap();
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> EngineResult<bool> {
        let mut tasks = self.tasks.lock().unwrap();
        Ok(tasks.remove(&id).is_some())
    }

    async fn get_active_recurring(&self) -> EngineResult<Vec<Task>> {
        let tasks = self.tasks.lock().unwrap();
        let mut parents: Vec<Task> = tasks
            .values()
            .filter(|t| t.is_recurring_parent() && t.series_state == SeriesState::Active)
            .cloned()
            .collect();
        parents.sort_by_key(|t| t.id);
        Ok(parents)
    }

    async fn get_latest_instance(&self, parent_id: i64) -> EngineResult<Option<Task>> {
        if self.failing_parents.lock().unwrap().contains(&parent_id) {
            return Err(EngineError::StoreUnavailable(format!(
                "mock store failure for parent {parent_id}"
            )));
        }

        let tasks = self.tasks.lock().unwrap();
        Ok(tasks
            .values()
            .filter(|t| t.recurring_parent_id == Some(parent_id))
            .max_by_key(|t| t.due_date)
            .cloned())
    }

    async fn create_instance(&self, instance: &Task) -> EngineResult<Task> {
        let mut tasks = self.tasks.lock().unwrap();

        // Same guard the real store enforces with a unique index
        if let (Some(parent_id), Some(due_date)) = (instance.recurring_parent_id, instance.due_date)
        {
            let duplicate = tasks
                .values()
                .any(|t| t.recurring_parent_id == Some(parent_id) && t.due_date == Some(due_date));
            if duplicate {
                return Err(EngineError::DuplicateOccurrence {
                    parent_id,
                    due_date,
                });
            }
        }

        let mut next_id = self.next_id.lock().unwrap();
        let mut new_task = instance.clone();
        new_task.id = *next_id;
        *next_id += 1;

        tasks.insert(new_task.id, new_task.clone());
        Ok(new_task)
    }

    async fn update_series_state(&self, task_id: i64, state: SeriesState) -> EngineResult<()> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get_mut(&task_id) {
            Some(task) => {
                task.series_state = state;
                Ok(())
            }
            None => Err(EngineError::TaskNotFound { id: task_id }),
        }
    }
}
