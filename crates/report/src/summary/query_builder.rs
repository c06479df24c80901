//! Summary query builder using SeaQuery.
//!
//! Assembles the aggregate report statement from a [`ReportQuery`]:
//! - enrolled users of the course, left-joined against the course's posts
//! - conditional sums for discussions started and replies written
//! - filter fragments applied to the post join or the WHERE clause
//! - date filters keep only users with at least one matching post
//! - count-only and paged variants

use sea_query::{
    Alias, Cond, Expr, Func, Iden, JoinType, Order, PostgresQueryBuilder, Query, SelectStatement,
    Values,
};

use super::filter::FilterContribution;
use super::query::ReportQuery;
use super::types::{PageRequest, SortColumn, SortDirection};

#[derive(Iden)]
pub(super) enum Enrolment {
    Table,
    CourseId,
    UserId,
}

#[derive(Iden)]
pub(super) enum Users {
    Table,
    Id,
    Username,
    Firstname,
    Lastname,
}

#[derive(Iden)]
pub(super) enum Forum {
    Table,
    Id,
    CourseId,
}

#[derive(Iden)]
pub(super) enum ForumDiscussion {
    Table,
    Id,
    ForumId,
}

#[derive(Iden)]
pub(super) enum ForumPost {
    Table,
    Id,
    DiscussionId,
    ParentId,
    UserId,
    Created,
}

#[derive(Iden)]
pub(super) enum GroupMember {
    Table,
    GroupId,
    UserId,
}

/// Enrolment alias.
#[derive(Iden)]
#[iden = "e"]
pub(super) struct E;

/// Enrolled user alias.
#[derive(Iden)]
#[iden = "u"]
pub(super) struct U;

/// Alias of the course-posts subquery.
#[derive(Iden)]
#[iden = "p"]
pub(super) struct P;

#[derive(Iden)]
#[iden = "fp"]
struct Fp;

#[derive(Iden)]
#[iden = "fd"]
struct Fd;

#[derive(Iden)]
#[iden = "f"]
struct F;

/// Group membership alias.
#[derive(Iden)]
#[iden = "gm"]
pub(super) struct Gm;

/// Query builder for summary reports.
pub struct SummaryQueryBuilder<'a> {
    query: &'a ReportQuery,
    contributions: Vec<FilterContribution>,
}

impl<'a> SummaryQueryBuilder<'a> {
    pub fn new(query: &'a ReportQuery) -> Self {
        let contributions = query.filters().map(|f| f.contribution()).collect();
        Self {
            query,
            contributions,
        }
    }

    /// Build the aggregate SELECT for one page.
    pub fn build(&self, page: &PageRequest) -> SelectStatement {
        let mut select = self.build_unbounded(page.sort_column, page.sort_direction);
        select.limit(u64::from(page.page_size));
        select.offset(page.page_start);
        select
    }

    /// Build the aggregate SELECT over every row (for exports).
    pub fn build_unbounded(
        &self,
        sort_column: SortColumn,
        sort_direction: SortDirection,
    ) -> SelectStatement {
        let mut select = self.base_select();
        self.add_select_fields(&mut select);

        select
            .group_by_col((U, Users::Id))
            .group_by_col((U, Users::Username))
            .group_by_col((U, Users::Firstname))
            .group_by_col((U, Users::Lastname));

        add_sorts(&mut select, sort_column, sort_direction);
        select
    }

    /// Build the COUNT query used to size pagination.
    pub fn build_count(&self) -> SelectStatement {
        let mut select = self.base_select();
        select.expr(Func::count_distinct(Expr::col((U, Users::Id))));
        select
    }

    /// FROM, JOINs and WHERE shared by the count and row statements.
    fn base_select(&self) -> SelectStatement {
        let mut select = Query::select();

        select
            .from_as(Enrolment::Table, E)
            .join_as(
                JoinType::InnerJoin,
                Users::Table,
                U,
                Expr::col((U, Users::Id)).equals((E, Enrolment::UserId)),
            )
            .join_subquery(
                JoinType::LeftJoin,
                self.course_posts(),
                P,
                self.post_join_condition(),
            )
            .and_where(Expr::col((E, Enrolment::CourseId)).eq(self.query.course_id()));

        for contribution in &self.contributions {
            for condition in &contribution.conditions {
                select.and_where(condition.clone());
            }
        }

        // The post join already carries every bound, so a joined post is a
        // matching one. Shared with the count so totals agree with rows.
        if self.contributions.iter().any(|c| c.requires_post) {
            select.and_where(Expr::col((P, ForumPost::Id)).is_not_null());
        }

        select
    }

    /// Every post in the course's forums, with the forum it belongs to.
    fn course_posts(&self) -> SelectStatement {
        Query::select()
            .column((Fp, ForumPost::Id))
            .column((Fp, ForumPost::UserId))
            .column((Fp, ForumPost::ParentId))
            .column((Fp, ForumPost::Created))
            .column((Fd, ForumDiscussion::ForumId))
            .from_as(ForumPost::Table, Fp)
            .join_as(
                JoinType::InnerJoin,
                ForumDiscussion::Table,
                Fd,
                Expr::col((Fd, ForumDiscussion::Id)).equals((Fp, ForumPost::DiscussionId)),
            )
            .join_as(
                JoinType::InnerJoin,
                Forum::Table,
                F,
                Expr::col((F, Forum::Id)).equals((Fd, ForumDiscussion::ForumId)),
            )
            .and_where(Expr::col((F, Forum::CourseId)).eq(self.query.course_id()))
            .to_owned()
    }

    /// Posts match their author, narrowed by forum and date filters.
    fn post_join_condition(&self) -> Cond {
        let mut cond = Cond::all().add(Expr::col((P, ForumPost::UserId)).equals((U, Users::Id)));
        for contribution in &self.contributions {
            for expr in &contribution.post_join {
                cond = cond.add(expr.clone());
            }
        }
        cond
    }

    fn add_select_fields(&self, select: &mut SelectStatement) {
        select
            .expr_as(Expr::col((U, Users::Id)), Alias::new("user_id"))
            .column((U, Users::Username))
            .column((U, Users::Firstname))
            .column((U, Users::Lastname));

        let mut has_forum_field = false;
        for contribution in &self.contributions {
            for (expr, name) in &contribution.fields {
                has_forum_field |= *name == "forum_id";
                select.expr_as(expr.clone(), Alias::new(*name));
            }
        }
        if !has_forum_field {
            select.expr_as(Expr::cust("NULL::BIGINT"), Alias::new("forum_id"));
        }

        let started = Cond::all()
            .add(Expr::col((P, ForumPost::Id)).is_not_null())
            .add(Expr::col((P, ForumPost::ParentId)).is_null());
        select.expr_as(
            Func::sum(Expr::case(started, Expr::val(1)).finally(Expr::val(0))),
            Alias::new("post_count"),
        );

        let replied = Expr::col((P, ForumPost::ParentId)).is_not_null();
        select.expr_as(
            Func::sum(Expr::case(replied, Expr::val(1)).finally(Expr::val(0))),
            Alias::new("reply_count"),
        );
    }
}

/// Add ORDER BY clauses. The user id is always the final tie-break so that
/// paging is stable across requests.
fn add_sorts(select: &mut SelectStatement, column: SortColumn, direction: SortDirection) {
    let order = match direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };

    match column {
        SortColumn::Fullname => {
            select
                .order_by((U, Users::Firstname), order.clone())
                .order_by((U, Users::Lastname), order);
        }
        SortColumn::Firstname => {
            select.order_by((U, Users::Firstname), order);
        }
        SortColumn::Lastname => {
            select.order_by((U, Users::Lastname), order);
        }
        SortColumn::Username => {
            select.order_by((U, Users::Username), order);
        }
        SortColumn::PostCount => {
            select.order_by(Alias::new("post_count"), order);
        }
        SortColumn::ReplyCount => {
            select.order_by(Alias::new("reply_count"), order);
        }
    }

    select.order_by((U, Users::Id), Order::Asc);
}

/// Render a statement as parameterized PostgreSQL.
pub fn to_sql(statement: &SelectStatement) -> (String, Values) {
    statement.build(PostgresQueryBuilder)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::types::FilterKind;

    fn inline(statement: &SelectStatement) -> String {
        statement.to_string(PostgresQueryBuilder)
    }

    #[test]
    fn count_query_strips_fields_grouping_and_order() {
        let query = ReportQuery::new(5);
        let sql = inline(&SummaryQueryBuilder::new(&query).build_count());

        assert!(sql.contains("COUNT(DISTINCT \"u\".\"id\")"), "{sql}");
        assert!(sql.contains("FROM \"enrolment\" AS \"e\""), "{sql}");
        assert!(!sql.contains("GROUP BY"), "{sql}");
        assert!(!sql.contains("ORDER BY"), "{sql}");
        assert!(!sql.contains("LIMIT"), "{sql}");
        assert!(!sql.contains("post_count"), "{sql}");
    }

    #[test]
    fn page_query_left_joins_course_posts() {
        let query = ReportQuery::new(5);
        let sql = inline(&SummaryQueryBuilder::new(&query).build(&PageRequest::default()));

        assert!(sql.contains("LEFT JOIN (SELECT"), "{sql}");
        assert!(sql.contains("\"f\".\"course_id\" = 5"), "{sql}");
        assert!(sql.contains("\"e\".\"course_id\" = 5"), "{sql}");
        assert!(sql.contains("GROUP BY \"u\".\"id\""), "{sql}");
        assert!(sql.contains("AS \"post_count\""), "{sql}");
        assert!(sql.contains("AS \"reply_count\""), "{sql}");
        assert!(sql.contains("NULL::BIGINT AS \"forum_id\""), "{sql}");
        assert!(sql.contains("LIMIT 25"), "{sql}");
        assert!(sql.contains("OFFSET 0"), "{sql}");
    }

    #[test]
    fn default_order_is_display_name_ascending() {
        let query = ReportQuery::new(1);
        let sql = inline(&SummaryQueryBuilder::new(&query).build(&PageRequest::default()));

        assert!(
            sql.contains(
                "ORDER BY \"u\".\"firstname\" ASC, \"u\".\"lastname\" ASC, \"u\".\"id\" ASC"
            ),
            "{sql}"
        );
    }

    #[test]
    fn sort_by_aggregate_uses_output_column() {
        let query = ReportQuery::new(1);
        let page = PageRequest::new(10, 20).sorted_by(SortColumn::PostCount, SortDirection::Desc);
        let sql = inline(&SummaryQueryBuilder::new(&query).build(&page));

        assert!(sql.contains("ORDER BY \"post_count\" DESC"), "{sql}");
        assert!(sql.contains("LIMIT 10"), "{sql}");
        assert!(sql.contains("OFFSET 20"), "{sql}");
    }

    #[test]
    fn forum_and_date_filters_go_in_the_join() {
        let query = ReportQuery::new(1)
            .with_filter(FilterKind::Forum, &[42])
            .unwrap()
            .with_filter(FilterKind::DateFrom, &[1000])
            .unwrap()
            .with_filter(FilterKind::DateTo, &[2000])
            .unwrap();
        let sql = inline(&SummaryQueryBuilder::new(&query).build(&PageRequest::default()));

        let join_start = sql.find("AS \"p\" ON").expect("post join");
        let where_start = sql.rfind("WHERE").expect("where clause");
        let join_clause = &sql[join_start..where_start];

        assert!(join_clause.contains("\"p\".\"forum_id\" = 42"), "{sql}");
        assert!(join_clause.contains("\"p\".\"created\" >= 1000"), "{sql}");
        assert!(join_clause.contains("\"p\".\"created\" <= 2000"), "{sql}");
        assert!(sql.contains("42 AS \"forum_id\""), "{sql}");
        assert!(!sql.contains("NULL::BIGINT"), "{sql}");
    }

    #[test]
    fn date_filters_require_a_matching_post() {
        let query = ReportQuery::new(1)
            .with_filter(FilterKind::DateFrom, &[1000])
            .unwrap()
            .with_filter(FilterKind::DateTo, &[1000])
            .unwrap();
        let builder = SummaryQueryBuilder::new(&query);

        for sql in [
            inline(&builder.build_count()),
            inline(&builder.build(&PageRequest::default())),
        ] {
            let where_clause = &sql[sql.rfind("WHERE").expect("where clause")..];
            assert_eq!(
                where_clause.matches("\"p\".\"id\" IS NOT NULL").count(),
                1,
                "{sql}"
            );
        }
    }

    #[test]
    fn unfiltered_and_forum_reports_keep_every_enrolled_user() {
        let unfiltered = ReportQuery::new(1);
        let forum = ReportQuery::new(1)
            .with_filter(FilterKind::Forum, &[42])
            .unwrap();

        for query in [&unfiltered, &forum] {
            let sql = inline(&SummaryQueryBuilder::new(query).build_count());
            let where_clause = &sql[sql.rfind("WHERE").expect("where clause")..];
            assert!(!where_clause.contains("IS NOT NULL"), "{sql}");
        }
    }

    #[test]
    fn group_filter_restricts_users() {
        let query = ReportQuery::new(1)
            .with_filter(FilterKind::Groups, &[7, 8])
            .unwrap();
        let sql = inline(&SummaryQueryBuilder::new(&query).build_count());

        assert!(sql.contains("\"u\".\"id\" IN (SELECT \"gm\".\"user_id\""), "{sql}");
        assert!(sql.contains("\"gm\".\"group_id\" IN (7, 8)"), "{sql}");
    }

    #[test]
    fn all_groups_sentinel_leaves_query_unfiltered() {
        let unfiltered = ReportQuery::new(1);
        let sentinel = ReportQuery::new(1)
            .with_filter(FilterKind::Groups, &[0])
            .unwrap();
        let empty = ReportQuery::new(1)
            .with_filter(FilterKind::Groups, &[])
            .unwrap();

        let expected = inline(&SummaryQueryBuilder::new(&unfiltered).build_count());
        assert_eq!(inline(&SummaryQueryBuilder::new(&sentinel).build_count()), expected);
        assert_eq!(inline(&SummaryQueryBuilder::new(&empty).build_count()), expected);
    }

    #[test]
    fn reapplied_filter_renders_once() {
        let query = ReportQuery::new(1)
            .with_filter(FilterKind::Groups, &[3])
            .unwrap()
            .with_filter(FilterKind::Groups, &[4])
            .unwrap();
        let sql = inline(&SummaryQueryBuilder::new(&query).build_count());

        assert_eq!(sql.matches("\"gm\".\"group_id\"").count(), 1, "{sql}");
        assert!(sql.contains("IN (4)"), "{sql}");
        assert!(!sql.contains("IN (3)"), "{sql}");
    }

    #[test]
    fn parameterized_output_binds_values() {
        let query = ReportQuery::new(9)
            .with_filter(FilterKind::DateFrom, &[123])
            .unwrap();
        let (sql, values) = to_sql(&SummaryQueryBuilder::new(&query).build_count());

        assert!(sql.contains("$1"), "{sql}");
        assert!(!sql.contains("123"), "{sql}");
        assert!(!values.0.is_empty());
    }

    #[test]
    fn unbounded_query_has_no_limit() {
        let query = ReportQuery::new(1);
        let sql = inline(
            &SummaryQueryBuilder::new(&query)
                .build_unbounded(SortColumn::Username, SortDirection::Desc),
        );

        assert!(!sql.contains("LIMIT"), "{sql}");
        assert!(sql.contains("ORDER BY \"u\".\"username\" DESC"), "{sql}");
    }
}
