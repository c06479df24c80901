//! Report filters.
//!
//! Each filter knows which fragments it adds to the report query. Fragments
//! are only produced when the query is assembled, so a filter applied twice
//! simply replaces the earlier one in the query's filter map.

use sea_query::{Expr, Query, SimpleExpr};
use serde::{Deserialize, Serialize};

use super::error::ReportError;
use super::query_builder::{ForumDiscussion, ForumPost, Gm, GroupMember, P, U, Users};
use super::types::FilterKind;

/// Group id that stands for "all groups".
pub const ALL_GROUPS: i64 = 0;

/// A single report filter with its values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Filter {
    /// Only count posts in this forum.
    Forum(i64),
    /// Only count posts created at or after this Unix timestamp, and only
    /// list users with such a post.
    DateFrom(i64),
    /// Only count posts created at or before this Unix timestamp, and only
    /// list users with such a post.
    DateTo(i64),
    /// Only include members of any of these groups.
    ///
    /// Empty, or containing [`ALL_GROUPS`], means no restriction.
    Groups(Vec<i64>),
}

/// Fragments a filter adds to the assembled query.
#[derive(Debug, Clone, Default)]
pub struct FilterContribution {
    /// Extra selected expressions with their output names.
    pub fields: Vec<(SimpleExpr, &'static str)>,

    /// Conditions added to the post join's ON clause.
    pub post_join: Vec<SimpleExpr>,

    /// Conditions added to the WHERE clause.
    pub conditions: Vec<SimpleExpr>,

    /// Drop users without a post matching the post join.
    pub requires_post: bool,

    /// Bound parameters by name.
    pub params: Vec<(String, i64)>,
}

impl Filter {
    /// Build a filter of `kind` from raw values, validating arity.
    pub fn from_values(kind: FilterKind, values: &[i64]) -> Result<Self, ReportError> {
        match kind {
            FilterKind::Forum => Ok(Filter::Forum(single_value(kind, values)?)),
            FilterKind::DateFrom => Ok(Filter::DateFrom(single_value(kind, values)?)),
            FilterKind::DateTo => Ok(Filter::DateTo(single_value(kind, values)?)),
            FilterKind::Groups => Ok(Filter::Groups(values.to_vec())),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Forum(_) => FilterKind::Forum,
            Filter::DateFrom(_) => FilterKind::DateFrom,
            Filter::DateTo(_) => FilterKind::DateTo,
            Filter::Groups(_) => FilterKind::Groups,
        }
    }

    /// Fragments and parameters this filter adds to the query.
    pub fn contribution(&self) -> FilterContribution {
        let mut out = FilterContribution::default();

        match self {
            Filter::Forum(forum_id) => {
                out.fields.push((Expr::val(*forum_id).into(), "forum_id"));
                out.post_join
                    .push(Expr::col((P, ForumDiscussion::ForumId)).eq(*forum_id));
                out.params.push(("forumid".to_string(), *forum_id));
            }
            Filter::DateFrom(timestamp) => {
                out.post_join
                    .push(Expr::col((P, ForumPost::Created)).gte(*timestamp));
                out.requires_post = true;
                out.params.push(("datefrom".to_string(), *timestamp));
            }
            Filter::DateTo(timestamp) => {
                out.post_join
                    .push(Expr::col((P, ForumPost::Created)).lte(*timestamp));
                out.requires_post = true;
                out.params.push(("dateto".to_string(), *timestamp));
            }
            Filter::Groups(group_ids) => {
                if group_ids.is_empty() || group_ids.contains(&ALL_GROUPS) {
                    return out;
                }

                let members = Query::select()
                    .column((Gm, GroupMember::UserId))
                    .from_as(GroupMember::Table, Gm)
                    .and_where(Expr::col((Gm, GroupMember::GroupId)).is_in(group_ids.clone()))
                    .to_owned();

                out.conditions
                    .push(Expr::col((U, Users::Id)).in_subquery(members));
                out.params.extend(
                    group_ids
                        .iter()
                        .enumerate()
                        .map(|(i, id)| (format!("groupid{i}"), *id)),
                );
            }
        }

        out
    }
}

fn single_value(kind: FilterKind, values: &[i64]) -> Result<i64, ReportError> {
    match values {
        [value] => Ok(*value),
        _ => Err(ReportError::InvalidFilterArity {
            kind,
            expected: "exactly one",
            actual: values.len(),
        }),
    }
}
