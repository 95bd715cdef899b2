//! Analysis task graph placeholder.
//!
//! The analysis step does not define any tasks yet; the aggregate exists so
//! the document shape is stable when it does.

use serde::{Deserialize, Serialize};

/// The (currently empty) analysis task graph.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph;

impl TaskGraph {
    pub fn is_valid(&self) -> bool {
        true
    }

    pub fn to_data(&self) -> TaskGraphData {
        TaskGraphData {}
    }

    pub fn from_data(_data: &TaskGraphData) -> Self {
        Self
    }
}

/// Serializable task graph record; serializes as an empty object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGraphData {}
