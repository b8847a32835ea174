use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support::{self, bearer_token, json_request, read_json};

const TEACHER: i64 = 300;
const STUDENT: i64 = 400;

#[tokio::test]
async fn classroom_marking_and_listing() {
    let ctx = test_support::setup_test_context().await;
    let token = bearer_token(TEACHER, true, ctx.state.settings());
    let class = test_support::insert_lesson(ctx.state.db(), TEACHER, STUDENT).await;
    let uri = format!("/api/v1/students/{STUDENT}/mistakes");
    let body = json!({
        "surah_number": 67, "ayah_number": 1, "word_index": 2, "word_text": "ٱلْمُلْكُ",
        "class_id": class.id
    });

    for expected in 1..=2 {
        let response = ctx
            .app
            .clone()
            .oneshot(json_request(Method::POST, &uri, Some(&token), Some(body.clone())))
            .await
            .expect("record");
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(read_json(response).await["error_count"], expected);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::GET,
            &format!("{uri}?surah=67&with_occurrences=true"),
            Some(&token),
            None,
        ))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["occurrences"].as_array().map(Vec::len), Some(2));
    assert_eq!(listed[0]["occurrences"][0]["class_id"], class.id);

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::GET, &format!("{uri}?surah=1"), Some(&token), None))
        .await
        .expect("filtered list");
    assert_eq!(read_json(response).await.as_array().map(Vec::len), Some(0));

    let mistake_id = listed[0]["id"].as_i64().expect("mistake id");
    for expected in [1, 0] {
        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::DELETE,
                &format!("/api/v1/mistakes/{mistake_id}"),
                Some(&token),
                None,
            ))
            .await
            .expect("undo");
        assert_eq!(read_json(response).await["error_count"], expected);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::DELETE,
            &format!("/api/v1/mistakes/{mistake_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("undo missing");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_summarize_the_ledger() {
    let ctx = test_support::setup_test_context().await;
    let token = bearer_token(STUDENT, false, ctx.state.settings());
    let class = test_support::insert_lesson(ctx.state.db(), TEACHER, STUDENT).await;
    let mut tx = ctx.state.db().begin().await.expect("tx");
    for (surah, ayah, times) in [(2, 3, 3), (2, 4, 1), (112, 1, 2)] {
        let location = crate::repositories::mistakes::MistakeLocation {
            surah_number: surah,
            ayah_number: ayah,
            word_index: 0,
            char_index: None,
        };
        for _ in 0..times {
            crate::services::ledger::record_occurrence(
                &mut tx,
                STUDENT,
                location,
                "قُلْ",
                Some(class.id),
            )
            .await
            .expect("record");
        }
    }
    tx.commit().await.expect("commit");

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::GET,
            &format!("/api/v1/students/{STUDENT}/stats"),
            Some(&token),
            None,
        ))
        .await
        .expect("stats");
    assert_eq!(response.status(), StatusCode::OK);
    let stats = read_json(response).await;

    assert_eq!(stats["total_classes"], 1);
    assert_eq!(stats["total_unique_mistakes"], 3);
    assert_eq!(stats["repeated_mistakes"], 2);
    assert_eq!(stats["total_occurrences"], 6);
    assert_eq!(stats["mistakes_by_surah"][0], json!({ "surah_number": 2, "count": 4 }));
    assert_eq!(stats["top_repeated_mistakes"][0]["error_count"], 3);
    assert_eq!(stats["latest_class"]["id"], class.id);
}

#[tokio::test]
async fn ledger_is_private_to_student_and_their_teachers() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_lesson(ctx.state.db(), TEACHER, STUDENT).await;
    let uri = format!("/api/v1/students/{STUDENT}/mistakes");

    let stranger = bearer_token(STUDENT + 1, false, ctx.state.settings());
    let other_teacher = bearer_token(TEACHER + 1, true, ctx.state.settings());
    let teacher = bearer_token(TEACHER, true, ctx.state.settings());

    for (token, status) in [
        (&stranger, StatusCode::FORBIDDEN),
        (&other_teacher, StatusCode::FORBIDDEN),
        (&teacher, StatusCode::OK),
    ] {
        let response = ctx
            .app
            .clone()
            .oneshot(json_request(Method::GET, &uri, Some(token), None))
            .await
            .expect("list");
        assert_eq!(response.status(), status);
    }
}

#[tokio::test]
async fn test_classes_reject_classroom_marking() {
    let ctx = test_support::setup_test_context().await;
    let token = bearer_token(TEACHER, true, ctx.state.settings());
    let test = test_support::insert_test(ctx.state.db(), TEACHER, STUDENT).await;

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/students/{STUDENT}/mistakes"),
            Some(&token),
            Some(json!({
                "surah_number": 1, "ayah_number": 2, "word_index": 0, "word_text": "ٱلْحَمْدُ",
                "class_id": test.class_id
            })),
        ))
        .await
        .expect("record");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let occurrences: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mistake_occurrences")
        .fetch_one(ctx.state.db())
        .await
        .expect("count occurrences");
    assert_eq!(occurrences, 0);
}
