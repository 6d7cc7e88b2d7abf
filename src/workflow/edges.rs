use crate::domain::{ClientStatus, StatusEdge};
use crate::errors::WorkflowError;

/// Allowed status changes, as listed in the `status_workflow` table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Workflow {
    edges: Vec<StatusEdge>,
}

impl Workflow {
    /// Built-in edge list matching the seeded reference table
    pub fn standard() -> Self {
        use ClientStatus::*;
        Self::from_edges(vec![
            StatusEdge::new(Cancelled, Pending),
            StatusEdge::new(Blocked, Pending),
            StatusEdge::new(Pending, Active),
            StatusEdge::new(Active, Pending),
            StatusEdge::new(Pending, Blocked),
            StatusEdge::new(Blocked, Cancelled),
            StatusEdge::new(Active, Blocked),
            StatusEdge::new(Active, Cancelled),
            StatusEdge::new(Pending, Cancelled),
        ])
    }

    /// Duplicate rows are dropped, first occurrence kept
    pub fn from_edges(edges: Vec<StatusEdge>) -> Self {
        let mut unique: Vec<StatusEdge> = Vec::with_capacity(edges.len());
        for edge in edges {
            if !unique.contains(&edge) {
                unique.push(edge);
            }
        }
        Self { edges: unique }
    }

    pub fn edges(&self) -> &[StatusEdge] {
        &self.edges
    }

    /// Staying put is always allowed
    pub fn allows(&self, from: ClientStatus, to: ClientStatus) -> bool {
        from == to || self.edges.contains(&StatusEdge::new(from, to))
    }

    pub fn check(&self, from: ClientStatus, to: ClientStatus) -> Result<(), WorkflowError> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(WorkflowError::EdgeMissing { from, to })
        }
    }

    /// Targets reachable in one step, in board column order
    pub fn next_statuses(&self, from: ClientStatus) -> Vec<ClientStatus> {
        let mut next: Vec<ClientStatus> = self
            .edges
            .iter()
            .filter(|edge| edge.current_status == from && edge.next_status != from)
            .map(|edge| edge.next_status)
            .collect();
        next.sort();
        next.dedup();
        next
    }
}
