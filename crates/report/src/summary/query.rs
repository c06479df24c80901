//! Report query state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::ReportError;
use super::filter::Filter;
use super::types::FilterKind;

/// A summary report query: the course being reported on plus the filters
/// applied to it.
///
/// The base scope is fixed at construction. Filters are keyed by kind, so
/// applying a kind again replaces the earlier values instead of stacking a
/// second predicate on top. Deserialised queries are checked to hold each
/// filter under its own kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "StoredQuery")]
pub struct ReportQuery {
    course_id: i64,
    filters: BTreeMap<FilterKind, Filter>,
}

/// Serialised shape of a [`ReportQuery`], before validation.
#[derive(Deserialize)]
struct StoredQuery {
    course_id: i64,
    #[serde(default)]
    filters: BTreeMap<FilterKind, Filter>,
}

impl TryFrom<StoredQuery> for ReportQuery {
    type Error = ReportError;

    fn try_from(stored: StoredQuery) -> Result<Self, Self::Error> {
        if let Some((key, filter)) = stored.filters.iter().find(|(k, f)| f.kind() != **k) {
            return Err(ReportError::MismatchedFilterKey {
                key: *key,
                filter: filter.kind(),
            });
        }

        Ok(Self {
            course_id: stored.course_id,
            filters: stored.filters,
        })
    }
}

impl ReportQuery {
    /// Start a query over every user enrolled in `course_id`.
    pub fn new(course_id: i64) -> Self {
        Self {
            course_id,
            filters: BTreeMap::new(),
        }
    }

    pub fn course_id(&self) -> i64 {
        self.course_id
    }

    /// Apply a filter, replacing any earlier filter of the same kind.
    pub fn add_filter(&mut self, kind: FilterKind, values: &[i64]) -> Result<(), ReportError> {
        let filter = Filter::from_values(kind, values)?;
        if let Some(previous) = self.filters.insert(kind, filter) {
            tracing::debug!(filter = %kind, ?previous, "replaced report filter");
        }
        Ok(())
    }

    /// Builder-style [`add_filter`](Self::add_filter).
    pub fn with_filter(mut self, kind: FilterKind, values: &[i64]) -> Result<Self, ReportError> {
        self.add_filter(kind, values)?;
        Ok(self)
    }

    /// Apply a filter given by name (e.g. `"datefrom"`).
    pub fn add_named_filter(&mut self, kind: &str, values: &[i64]) -> Result<(), ReportError> {
        self.add_filter(kind.parse()?, values)
    }

    /// Remove a filter, returning it if it was set.
    pub fn remove_filter(&mut self, kind: FilterKind) -> Option<Filter> {
        self.filters.remove(&kind)
    }

    pub fn filter(&self, kind: FilterKind) -> Option<&Filter> {
        self.filters.get(&kind)
    }

    /// Applied filters in assembly order.
    pub fn filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters.values()
    }

    /// The forum the report is narrowed to, if any.
    pub fn forum_id(&self) -> Option<i64> {
        match self.filters.get(&FilterKind::Forum) {
            Some(Filter::Forum(id)) => Some(*id),
            _ => None,
        }
    }

    /// Every bound parameter by name, base scope included.
    pub fn params(&self) -> BTreeMap<String, i64> {
        let mut params = BTreeMap::new();
        params.insert("courseid".to_string(), self.course_id);
        for filter in self.filters.values() {
            params.extend(filter.contribution().params);
        }
        params
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_query_has_only_the_course_param() {
        let query = ReportQuery::new(3);
        assert_eq!(query.course_id(), 3);
        assert_eq!(query.filters().count(), 0);
        assert_eq!(
            query.params().into_iter().collect::<Vec<_>>(),
            vec![("courseid".to_string(), 3)]
        );
    }

    #[test]
    fn reapplying_a_filter_kind_replaces_it() {
        let mut query = ReportQuery::new(1);
        query.add_filter(FilterKind::Groups, &[4]).unwrap();
        query.add_filter(FilterKind::Groups, &[5, 6]).unwrap();

        assert_eq!(query.filters().count(), 1);
        assert_eq!(
            query.filter(FilterKind::Groups),
            Some(&Filter::Groups(vec![5, 6]))
        );

        let params = query.params();
        assert_eq!(params.get("groupid0"), Some(&5));
        assert_eq!(params.get("groupid1"), Some(&6));
        assert!(!params.values().any(|v| *v == 4));
    }

    #[test]
    fn reapplying_matches_applying_once() {
        let twice = ReportQuery::new(1)
            .with_filter(FilterKind::DateFrom, &[100])
            .unwrap()
            .with_filter(FilterKind::DateFrom, &[200])
            .unwrap();
        let once = ReportQuery::new(1)
            .with_filter(FilterKind::DateFrom, &[200])
            .unwrap();

        assert_eq!(twice, once);
    }

    #[test]
    fn arity_error_leaves_query_unchanged() {
        let mut query = ReportQuery::new(1)
            .with_filter(FilterKind::Forum, &[9])
            .unwrap();
        let err = query.add_filter(FilterKind::Forum, &[]).unwrap_err();

        assert!(matches!(err, ReportError::InvalidFilterArity { .. }));
        assert_eq!(query.forum_id(), Some(9));
    }

    #[test]
    fn named_filters() {
        let mut query = ReportQuery::new(1);
        query.add_named_filter("dateto", &[50]).unwrap();
        assert_eq!(query.filter(FilterKind::DateTo), Some(&Filter::DateTo(50)));

        let err = query.add_named_filter("rating", &[1]).unwrap_err();
        assert!(matches!(err, ReportError::UnknownFilterKind(_)));
    }

    #[test]
    fn serialized_query_reads_back() {
        let query = ReportQuery::new(4)
            .with_filter(FilterKind::Forum, &[8])
            .unwrap()
            .with_filter(FilterKind::Groups, &[1, 2])
            .unwrap();
        let json = serde_json::to_string(&query).unwrap();

        let parsed: ReportQuery = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, query);
        assert_eq!(parsed.forum_id(), Some(8));
    }

    #[test]
    fn filter_under_another_kind_is_rejected() {
        let json = r#"{
            "course_id": 1,
            "filters": {"datefrom": {"kind": "dateto", "value": 5}}
        }"#;
        let err = serde_json::from_str::<ReportQuery>(json).unwrap_err();
        assert!(err.to_string().contains("stored under key 'datefrom'"), "{err}");
        assert!(
            ReportError::MismatchedFilterKey {
                key: FilterKind::DateFrom,
                filter: FilterKind::DateTo,
            }
            .is_contract_violation()
        );

        // Two kinds keyed the same way would otherwise both render.
        let json = r#"{
            "course_id": 1,
            "filters": {
                "datefrom": {"kind": "datefrom", "value": 5},
                "forum": {"kind": "datefrom", "value": 6}
            }
        }"#;
        assert!(serde_json::from_str::<ReportQuery>(json).is_err());
    }

    #[test]
    fn query_without_filters_deserializes() {
        let query: ReportQuery = serde_json::from_str(r#"{"course_id": 6}"#).unwrap();
        assert_eq!(query, ReportQuery::new(6));
    }

    #[test]
    fn remove_filter() {
        let mut query = ReportQuery::new(1)
            .with_filter(FilterKind::Forum, &[2])
            .unwrap();
        assert_eq!(query.remove_filter(FilterKind::Forum), Some(Filter::Forum(2)));
        assert_eq!(query.forum_id(), None);
    }
}
