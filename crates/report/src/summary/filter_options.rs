//! Options offered by the report's groups filter.

use serde::Serialize;

use super::filter::ALL_GROUPS;
use crate::models::CourseGroup;

/// Label of the "all groups" option.
pub const ALL_GROUPS_LABEL: &str = "All groups";

/// One selectable entry in the groups filter.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupOption {
    pub groupid: i64,
    pub groupname: String,
    pub checked: bool,
}

/// Available groups and the resolved selection.
#[derive(Debug, Clone, Serialize)]
pub struct GroupFilterOptions {
    options: Vec<GroupOption>,
    selected: Vec<i64>,
}

impl GroupFilterOptions {
    /// Build the options for a course's groups and the ids the caller asked for.
    ///
    /// An empty request, or one containing [`ALL_GROUPS`], selects all groups.
    /// Requested ids that are not groups of the course are dropped.
    pub fn prepare(groups: &[CourseGroup], requested: &[i64]) -> Self {
        let selected: Vec<i64> = if requested.is_empty() || requested.contains(&ALL_GROUPS) {
            vec![ALL_GROUPS]
        } else {
            groups
                .iter()
                .map(|g| g.id)
                .filter(|id| requested.contains(id))
                .collect()
        };

        // Nothing valid was requested.
        let selected = if selected.is_empty() {
            vec![ALL_GROUPS]
        } else {
            selected
        };

        let mut options = Vec::with_capacity(groups.len() + 1);
        options.push(GroupOption {
            groupid: ALL_GROUPS,
            groupname: ALL_GROUPS_LABEL.to_string(),
            checked: selected.contains(&ALL_GROUPS),
        });
        options.extend(groups.iter().map(|g| GroupOption {
            groupid: g.id,
            groupname: g.name.clone(),
            checked: selected.contains(&g.id),
        }));

        Self { options, selected }
    }

    /// Group ids to filter the report by.
    pub fn selected(&self) -> &[i64] {
        &self.selected
    }

    pub fn options(&self) -> &[GroupOption] {
        &self.options
    }

    /// Whether the selection places no restriction on users.
    pub fn is_all_groups(&self) -> bool {
        self.selected.contains(&ALL_GROUPS)
    }
}
