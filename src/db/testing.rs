//! Scripted SQL client used by unit tests: records every (sql, args) pair
//! and replays queued result sets.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::client::{RowSet, SqlConn, SqlPool};
use super::value::SqlValue;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub sql: String,
    pub batches: Vec<Vec<SqlValue>>,
    pub batch: bool,
}

#[derive(Default)]
pub(crate) struct MockState {
    responses: Mutex<VecDeque<Result<RowSet>>>,
    calls: Mutex<Vec<Call>>,
    acquired: Mutex<usize>,
}

impl MockState {
    fn record(&self, sql: &str, batches: Vec<Vec<SqlValue>>, batch: bool) -> Result<RowSet> {
        self.calls.lock().unwrap().push(Call {
            sql: sql.to_string(),
            batches,
            batch,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RowSet::empty()))
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockPool {
    state: Arc<MockState>,
}

impl MockPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, rows: RowSet) {
        self.state.responses.lock().unwrap().push_back(Ok(rows));
    }

    pub fn push_err(&self, err: Error) {
        self.state.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn acquired(&self) -> usize {
        *self.state.acquired.lock().unwrap()
    }

    /// A connection sharing this pool's script, for `Target::Scoped` tests.
    pub fn conn(&self) -> MockConn {
        MockConn {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl SqlPool for MockPool {
    type Conn = MockConn;

    async fn acquire(&self) -> Result<MockConn> {
        *self.state.acquired.lock().unwrap() += 1;
        Ok(self.conn())
    }
}

pub(crate) struct MockConn {
    state: Arc<MockState>,
}

#[async_trait]
impl SqlConn for MockConn {
    async fn query(&mut self, sql: &str, args: &[SqlValue]) -> Result<RowSet> {
        self.state.record(sql, vec![args.to_vec()], false)
    }

    async fn query_batch(&mut self, sql: &str, batches: &[Vec<SqlValue>]) -> Result<RowSet> {
        self.state.record(sql, batches.to_vec(), true)
    }
}
