//! Test double for the executor boundary.

#![allow(dead_code)]

use async_trait::async_trait;
use sqlmold::{Executor, OrmResult, Row, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Records every statement and answers queries from a queue of canned
/// result sets (an empty result once the queue runs dry).
#[derive(Default)]
pub struct RecordingExecutor {
    log: Mutex<Vec<(String, Vec<Value>)>>,
    results: Mutex<VecDeque<Vec<Row>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next `query` call.
    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) -> &Self {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(columns.clone(), values))
            .collect();
        self.results.lock().unwrap().push_back(rows);
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, args: &[Value]) {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), args.to_vec()));
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        self.record(sql, args);
        Ok(1)
    }

    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        self.record(sql, args);
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }
}
