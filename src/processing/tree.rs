use std::collections::HashMap;

use serde::Serialize;

use crate::models::LogRecord;

/// Bucket for records whose context carries no task identifiers
const UNKNOWN_TASK_ID: &str = "unknown";

/// Logs emitted by a single task within a root group
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskGroup {
    /// Task identifier, `"unknown"` when the record carried none
    pub task_id: String,

    /// Task display name
    pub task_name: String,

    /// Immediate parent task, unset for the root task itself
    pub parent_task_id: Option<String>,

    /// Records belonging to this task, in encounter order
    pub logs: Vec<LogRecord>,
}

/// One top-level task in the reconstructed hierarchy, holding its child
/// task groups in first-seen order
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RootTaskGroup {
    /// Root task identifier
    pub root_task_id: String,

    /// Root task display name
    pub task_name: String,

    /// Child task groups, first-seen order
    pub children: Vec<TaskGroup>,
}

impl RootTaskGroup {
    /// Find a child task group by id
    pub fn child(&self, task_id: &str) -> Option<&TaskGroup> {
        self.children.iter().find(|child| child.task_id == task_id)
    }
}

/// Reconstruct the two-level task hierarchy from the flat log sequence.
///
/// Each record selects its root bucket from `context.root_task_id`,
/// falling back to its own `task_id`, then to `"unknown"`; its task
/// bucket within that root from `task_id` (or `"unknown"`). Groups are
/// created lazily on first sight and keep that order; records accumulate
/// in encounter order, which after merging is fetch order.
///
/// Rebuilding is O(n); callers that query the tree repeatedly are
/// expected to cache the result against the identity of the input
/// sequence.
pub fn build_log_tree(logs: &[LogRecord]) -> Vec<RootTaskGroup> {
    let mut roots: Vec<RootTaskGroup> = Vec::new();
    let mut root_index: HashMap<String, usize> = HashMap::new();
    // (root position, task id) -> child position
    let mut child_index: HashMap<(usize, String), usize> = HashMap::new();

    for record in logs {
        let context = record.context.clone().unwrap_or_default();

        let root_task_id = context
            .root_task_id
            .clone()
            .or_else(|| context.task_id.clone())
            .unwrap_or_else(|| UNKNOWN_TASK_ID.to_string());
        let task_id = context
            .task_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_TASK_ID.to_string());

        let root_pos = *root_index.entry(root_task_id.clone()).or_insert_with(|| {
            roots.push(RootTaskGroup {
                root_task_id,
                task_name: context
                    .task_name
                    .clone()
                    .unwrap_or_else(|| "Root Task".to_string()),
                children: Vec::new(),
            });
            roots.len() - 1
        });

        let child_pos = *child_index
            .entry((root_pos, task_id.clone()))
            .or_insert_with(|| {
                roots[root_pos].children.push(TaskGroup {
                    task_id,
                    task_name: context
                        .task_name
                        .clone()
                        .unwrap_or_else(|| "Task".to_string()),
                    parent_task_id: context.parent_task_id.clone(),
                    logs: Vec::new(),
                });
                roots[root_pos].children.len() - 1
            });

        roots[root_pos].children[child_pos].logs.push(record.clone());
    }

    roots
}
