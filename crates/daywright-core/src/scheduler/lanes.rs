//! Focus and normal lanes with a burst ratio between them.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::schedule::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Focus,
    Normal,
}

/// A task waiting for (more) time.
#[derive(Debug, Clone)]
pub struct LaneEntry {
    pub task: Task,
    pub lane: Lane,
    /// Minutes still to place
    pub remaining: i64,
    /// Chunks placed so far; the first chunk lands on the task itself
    pub placed: u32,
}

impl LaneEntry {
    pub fn new(task: Task, lane: Lane, remaining: i64) -> Self {
        Self {
            task,
            lane,
            remaining,
            placed: 0,
        }
    }

    pub fn is_first_chunk(&self) -> bool {
        self.placed == 0
    }
}

/// Two FIFO lanes drained under a focus:normal burst ratio.
///
/// The focus lane gets up to `focus_burst` consecutive picks, then the
/// normal lane gets up to `normal_burst`. An empty lane yields to the
/// other one. An entry whose queued dependency has not had its first chunk
/// taken yet is held back; the first ready entry of the lane (or of the
/// other lane) goes instead. Only when nothing is ready, as happens on a
/// dependency cycle, does the plain burst order apply.
#[derive(Debug, Clone)]
pub struct LaneQueues {
    focus: VecDeque<LaneEntry>,
    normal: VecDeque<LaneEntry>,
    focus_burst: u32,
    normal_burst: u32,
    focus_left: u32,
    normal_left: u32,
    /// Tasks whose first chunk is still queued
    waiting: HashSet<String>,
}

impl LaneQueues {
    pub fn new(focus_burst: u32, normal_burst: u32) -> Self {
        let focus_burst = focus_burst.max(1);
        Self {
            focus: VecDeque::new(),
            normal: VecDeque::new(),
            focus_burst,
            normal_burst: normal_burst.max(1),
            focus_left: focus_burst,
            normal_left: 0,
            waiting: HashSet::new(),
        }
    }

    /// Append at the back of the entry's lane.
    pub fn push(&mut self, entry: LaneEntry) {
        if entry.is_first_chunk() {
            self.waiting.insert(entry.task.id.clone());
        }
        match entry.lane {
            Lane::Focus => self.focus.push_back(entry),
            Lane::Normal => self.normal.push_back(entry),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.focus.is_empty() && self.normal.is_empty()
    }

    fn lane(&self, lane: Lane) -> &VecDeque<LaneEntry> {
        match lane {
            Lane::Focus => &self.focus,
            Lane::Normal => &self.normal,
        }
    }

    fn is_ready(&self, entry: &LaneEntry) -> bool {
        entry
            .task
            .dependencies
            .iter()
            .all(|dep| *dep == entry.task.id || !self.waiting.contains(dep))
    }

    fn first_ready(&self, lane: Lane) -> Option<usize> {
        self.lane(lane).iter().position(|e| self.is_ready(e))
    }

    /// Take the next entry according to the burst ratio.
    pub fn pop(&mut self) -> Option<LaneEntry> {
        let focus = self.first_ready(Lane::Focus);
        let normal = self.first_ready(Lane::Normal);
        let (lane, index) = match (focus, normal) {
            (Some(i), _) if self.focus_left > 0 => (Lane::Focus, i),
            (_, Some(i)) => (Lane::Normal, i),
            (Some(i), None) => (Lane::Focus, i),
            (None, None) if self.is_empty() => return None,
            (None, None) => {
                tracing::debug!("no queued task is ready, taking the next in burst order");
                if !self.focus.is_empty() && (self.focus_left > 0 || self.normal.is_empty()) {
                    (Lane::Focus, 0)
                } else {
                    (Lane::Normal, 0)
                }
            }
        };
        self.take(lane, index)
    }

    fn take(&mut self, lane: Lane, index: usize) -> Option<LaneEntry> {
        let entry = match lane {
            Lane::Focus => {
                if self.focus_left > 0 {
                    self.focus_left -= 1;
                    if self.focus_left == 0 {
                        self.normal_left = self.normal_burst;
                    }
                }
                self.focus.remove(index)
            }
            Lane::Normal => {
                self.normal_left = self.normal_left.saturating_sub(1);
                if self.normal_left == 0 {
                    self.focus_left = self.focus_burst;
                }
                self.normal.remove(index)
            }
        }?;
        if entry.is_first_chunk() {
            self.waiting.remove(&entry.task.id);
        }
        Some(entry)
    }

    /// Everything still queued, focus lane first.
    pub fn drain(&mut self) -> impl Iterator<Item = LaneEntry> + '_ {
        self.waiting.clear();
        self.focus.drain(..).chain(self.normal.drain(..))
    }
}
