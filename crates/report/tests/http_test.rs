#![allow(clippy::unwrap_used, clippy::expect_used)]
//! HTTP integration tests driving the real router.
//!
//! Tests that read the database are ignored by default; see `common`.

mod common;

use axum::http::{StatusCode, header};
use serde_json::json;

use common::{TestApp, body_json, body_string};
use forumreport_test_utils::{TestCourse, assert, test_user};

const T: i64 = 1_700_000_000;

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn health_reports_postgres() {
    let pool = common::test_pool().await;
    let app = TestApp::new(pool);

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["postgres"], true);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn summary_page_as_json() {
    let pool = common::test_pool().await;
    let mut course = TestCourse::create(&pool).await.unwrap();
    let ada = course.enrol(test_user("Ada", "Lovelace")).await.unwrap();
    course.enrol(test_user("Bob", "Smith")).await.unwrap();
    let forum = course.forum("General").await.unwrap();
    course.discussion(forum, ada, "Hello", T).await.unwrap();

    let app = TestApp::new(pool);
    let response = app
        .get(&format!(
            "/forum/report/summary?courseid={}&perpage=1&tsort=postcount&tdir=desc",
            course.id
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    for key in ["title", "course_id", "forum_id", "filters", "rows", "total"] {
        assert::has_key(&body, key);
    }
    assert_eq!(body["title"], "Summary report - All forums");
    assert_eq!(body["total"], 2);
    assert_eq!(body["per_page"], 1);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["has_next"], true);
    assert_eq!(body["rows"].as_array().unwrap().len(), 1);
    assert_eq!(body["rows"][0]["user_id"], ada);
    assert_eq!(body["filters"]["groups"][0]["groupname"], "All groups");

    course.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn summary_download_as_csv() {
    let pool = common::test_pool().await;
    let mut course = TestCourse::create(&pool).await.unwrap();
    let ada = course
        .enrol(test_user("Ada", "Lovelace, Countess"))
        .await
        .unwrap();
    let forum = course.forum("General").await.unwrap();
    let (d, p) = course.discussion(forum, ada, "Hello", T).await.unwrap();
    course.reply(d, p, ada, T + 1).await.unwrap();

    let app = TestApp::new(pool);
    let response = app
        .get(&format!(
            "/forum/report/summary?forumid={forum}&download=csv"
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert::contains(&disposition, "forum_summary_report.csv");

    let body = body_string(response).await;
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("username,fullname,postcount,replycount"));
    let row = lines.next().unwrap();
    assert::contains(row, "\"Ada Lovelace, Countess\",1,1");

    course.cleanup().await.unwrap();
}

#[tokio::test]
async fn summary_rejects_bad_parameters() {
    let pool = common::lazy_pool();
    let app = TestApp::new(pool);

    for query in [
        "courseid=1&tsort=email",
        "courseid=1&tdir=up",
        "courseid=1&groups=a,b",
        "courseid=1&download=pdf",
        "courseid=abc",
    ] {
        let response = app.get(&format!("/forum/report/summary?{query}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
    }

    let response = app.get("/forum/report/summary").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert::contains(&body_string(response).await, "must be provided");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn unknown_forum_is_not_found() {
    let pool = common::test_pool().await;
    let app = TestApp::new(pool);

    let response = app
        .get(&format!("/forum/report/summary?forumid={}", i64::MAX))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert::contains(&body_string(response).await, "unable to find forum");

    let response = app.get(&format!("/forum/{}/export", i64::MAX)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn timestamps_endpoint_converts_dates() {
    let pool = common::lazy_pool();
    let app = TestApp::new(pool);

    let response = app
        .post_json(
            "/forum/report/summary/timestamps",
            &json!({
                "datefrom": {"day": 1, "month": 1, "year": 2020, "enabled": 1},
                "dateto": {"day": "1", "month": "1", "year": "2020", "enabled": true}
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["timestampfrom"], 1_577_836_800_i64);
    assert_eq!(body["timestampto"], 1_577_923_199_i64);
    assert_eq!(body["warnings"], json!([]));

    let response = app
        .post_json(
            "/forum/report/summary/timestamps",
            &json!({
                "datefrom": {"day": 2, "month": 1, "year": 2020, "enabled": 1},
                "dateto": {"day": 1, "month": 1, "year": 2020, "enabled": 1}
            }),
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(
        body["warnings"][0]["message"],
        "The 'From' date must be before the 'To' date."
    );
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn discussion_export_as_json() {
    let pool = common::test_pool().await;
    let mut course = TestCourse::create(&pool).await.unwrap();
    let ada = course.enrol(test_user("Ada", "Lovelace")).await.unwrap();
    let forum = course.forum("General").await.unwrap();
    let (_, first) = course.discussion(forum, ada, "Agenda", T).await.unwrap();

    let app = TestApp::new(pool);
    let response = app.get(&format!("/forum/{forum}/export?format=json")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert::contains(
        response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap(),
        "discussion.json",
    );

    let body = body_json(response).await;
    assert_eq!(
        body,
        json!([{"id": first, "subject": "Agenda", "message": "<p>Agenda</p>"}])
    );

    let response = app.get(&format!("/forum/{forum}/export?format=xml")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    course.cleanup().await.unwrap();
}
