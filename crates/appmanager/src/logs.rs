// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Bounded build-log ring buffer keyed by application id (spec.md §4.6
//! step 4: "stream stdout/stderr into a ring buffer keyed by app id for
//! GetLogs"; spec.md §5 caps it so a runaway build can't exhaust memory).

use std::collections::{HashMap, VecDeque};

use containarium_core::ApplicationId;
use parking_lot::Mutex;

pub const DEFAULT_MAX_LINES: usize = 2000;
pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024;

struct RingBuffer {
    lines: VecDeque<String>,
    bytes: usize,
    max_lines: usize,
    max_bytes: usize,
}

impl RingBuffer {
    fn new(max_lines: usize, max_bytes: usize) -> Self {
        Self { lines: VecDeque::new(), bytes: 0, max_lines, max_bytes }
    }

    fn push(&mut self, line: String) {
        self.bytes += line.len();
        self.lines.push_back(line);
        while self.lines.len() > self.max_lines || self.bytes > self.max_bytes {
            if let Some(evicted) = self.lines.pop_front() {
                self.bytes = self.bytes.saturating_sub(evicted.len());
            } else {
                break;
            }
        }
    }
}

pub struct BuildLogStore {
    max_lines: usize,
    max_bytes: usize,
    buffers: Mutex<HashMap<ApplicationId, RingBuffer>>,
}

impl Default for BuildLogStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES, DEFAULT_MAX_BYTES)
    }
}

impl BuildLogStore {
    pub fn new(max_lines: usize, max_bytes: usize) -> Self {
        Self { max_lines, max_bytes, buffers: Mutex::new(HashMap::new()) }
    }

    pub fn append(&self, app_id: &ApplicationId, line: impl Into<String>) {
        let mut buffers = self.buffers.lock();
        buffers.entry(app_id.clone()).or_insert_with(|| RingBuffer::new(self.max_lines, self.max_bytes)).push(line.into());
    }

    pub fn append_chunk(&self, app_id: &ApplicationId, chunk: &str) {
        for line in chunk.lines() {
            self.append(app_id, line.to_string());
        }
    }

    pub fn get(&self, app_id: &ApplicationId) -> Vec<String> {
        self.buffers.lock().get(app_id).map(|b| b.lines.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn clear(&self, app_id: &ApplicationId) {
        self.buffers.lock().remove(app_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_lines_past_the_cap() {
        let store = BuildLogStore::new(3, 1024 * 1024);
        let id = ApplicationId::new();
        for i in 0..5 {
            store.append(&id, format!("line {i}"));
        }
        let lines = store.get(&id);
        assert_eq!(lines, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn evicts_past_the_byte_cap() {
        let store = BuildLogStore::new(100, 10);
        let id = ApplicationId::new();
        store.append(&id, "123456");
        store.append(&id, "789012");
        let lines = store.get(&id);
        assert_eq!(lines, vec!["789012"]);
    }

    #[test]
    fn separate_apps_get_separate_buffers() {
        let store = BuildLogStore::default();
        let a = ApplicationId::new();
        let b = ApplicationId::new();
        store.append(&a, "from a");
        store.append(&b, "from b");
        assert_eq!(store.get(&a), vec!["from a"]);
        assert_eq!(store.get(&b), vec!["from b"]);
    }
}
