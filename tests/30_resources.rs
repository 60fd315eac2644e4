mod common;

use anyhow::Result;
use serde_json::json;

use campus_admin::models::{CourseCreate, StudentUpdate};
use campus_admin::resources::{raw, EnrollmentKey, Entity, ListQuery, RecordId};

#[tokio::test]
async fn list_sends_paging_and_filters() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let ctx = backend.context_with_token("t.o.k");

    let courses = ctx
        .api()
        .courses()
        .list(ListQuery::new().page(0, 2).filter("teacher_id", Some(8)))
        .await?;

    assert_eq!(courses.len(), 2);
    assert_eq!(courses[1].title, "Course 2");
    let seen = backend.last_request();
    assert_eq!(seen.path, "/courses/");
    assert_eq!(seen.query.as_deref(), Some("skip=0&limit=2&teacher_id=8"));
    assert_eq!(seen.header("authorization"), Some("Bearer t.o.k"));
    Ok(())
}

#[tokio::test]
async fn get_missing_record_is_http_error() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let ctx = backend.context_with_token("t.o.k");

    let course = ctx.api().courses().get(3).await?;
    assert_eq!(course.id, 3);
    assert_eq!(course.teacher_id, Some(8));

    let err = ctx.api().courses().get(404).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.message(), "Course not found");
    Ok(())
}

#[tokio::test]
async fn create_posts_typed_payload() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let ctx = backend.context_with_token("t.o.k");

    let created = ctx
        .api()
        .courses()
        .create(&CourseCreate {
            title: "Geometry".to_string(),
            description: "Shapes".to_string(),
            duration: 24,
            teacher_id: 8,
        })
        .await?;

    assert_eq!(created.id, 99);
    assert_eq!(created.title, "Geometry");
    let seen = backend.last_request();
    assert_eq!(seen.method, "POST");
    assert_eq!(
        seen.json(),
        json!({ "title": "Geometry", "description": "Shapes", "duration": 24, "teacher_id": 8 })
    );
    Ok(())
}

#[tokio::test]
async fn student_update_uses_patch_without_absent_fields() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let ctx = backend.context_with_token("t.o.k");

    let update = StudentUpdate {
        group_number: Some("B-12".to_string()),
        ..Default::default()
    };
    // The echo endpoint answers with a non-student document
    let _ = ctx.api().students().update(5, &update).await;

    let seen = backend.last_request();
    assert_eq!(seen.method, "PATCH");
    assert_eq!(seen.path, "/students/5");
    assert_eq!(seen.json(), json!({ "group_number": "B-12" }));
    Ok(())
}

#[tokio::test]
async fn delete_returns_server_message() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let ctx = backend.context_with_token("t.o.k");

    let result = ctx.api().courses().delete(4).await?;
    assert_eq!(result["message"], "Course deleted");
    assert_eq!(backend.last_request().method, "DELETE");
    Ok(())
}

#[tokio::test]
async fn enrollment_lookup_by_composite_key() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let ctx = backend.context_with_token("t.o.k");
    let enrollments = ctx.api().enrollments();

    let key: EnrollmentKey = "3:14".parse().expect("valid key");
    let found = enrollments.find(key).await?.expect("enrollment exists");
    assert_eq!(found.grade, Some(4.5));
    assert_eq!(
        backend.last_request().query.as_deref(),
        Some("student_id=3&course_id=14")
    );

    let absent = enrollments.find("9:9".parse().expect("valid key")).await?;
    assert!(absent.is_none());
    Ok(())
}

#[tokio::test]
async fn enrollment_grade_update_and_removal_use_query() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let ctx = backend.context_with_token("t.o.k");
    let key = EnrollmentKey { student_id: 3, course_id: 14 };

    // The echo endpoint does not answer with an enrollment
    let _ = ctx.api().enrollments().update_grade(key, Some(5.0)).await;
    let seen = backend.last_request();
    assert_eq!(seen.method, "PUT");
    assert_eq!(seen.query.as_deref(), Some("student_id=3&course_id=14"));
    assert_eq!(seen.json(), json!({ "grade": 5.0 }));

    ctx.api().enrollments().remove(key).await?;
    let seen = backend.last_request();
    assert_eq!(seen.method, "DELETE");
    assert_eq!(seen.path, "/enrollments/");
    assert_eq!(seen.query.as_deref(), Some("student_id=3&course_id=14"));
    Ok(())
}

#[tokio::test]
async fn raw_operations_route_by_entity() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let ctx = backend.context_with_token("t.o.k");
    let api = ctx.api();

    let rows = raw::select(api, Entity::Courses, None, ListQuery::new().page(0, 1)).await?;
    assert_eq!(rows.as_array().map(Vec::len), Some(1));

    let row = raw::select(api, Entity::Enrollments, Some("4:14".parse().expect("key")), ListQuery::new()).await?;
    assert_eq!(row["grade"], json!(3.0));

    let err = raw::select(api, Entity::Enrollments, Some("4:99".parse().expect("key")), ListQuery::new())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);

    let requests_before = backend.requests().len();
    let err = raw::delete(api, Entity::Enrollments, RecordId::Id(4)).await.unwrap_err();
    assert_eq!(err.status_code(), 0);
    let err = raw::delete(api, Entity::Users, "1:2".parse().expect("key")).await.unwrap_err();
    assert_eq!(err.status_code(), 0);
    assert_eq!(backend.requests().len(), requests_before);

    raw::update(api, Entity::Students, RecordId::Id(5), json!({ "first_name": "Ann" })).await?;
    assert_eq!(backend.last_request().method, "PATCH");
    assert_eq!(backend.last_request().path, "/students/5");

    raw::update(api, Entity::Courses, RecordId::Id(5), json!({ "title": "Renamed" })).await?;
    assert_eq!(backend.last_request().method, "PUT");
    Ok(())
}

#[tokio::test]
async fn photo_upload_is_multipart() -> Result<()> {
    let backend = common::MockBackend::start().await?;
    let ctx = backend.context_with_token("t.o.k");

    ctx.api()
        .users()
        .upload_photo(7, "me.png", vec![0x89, b'P', b'N', b'G'], "image/png")
        .await?;

    let seen = backend.last_request();
    assert_eq!(seen.path, "/users/7/upload-photo");
    let content_type = seen.header("content-type").unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"), "content-type: {content_type}");
    assert!(seen.body.contains("name=\"file\""));
    assert!(seen.body.contains("filename=\"me.png\""));
    Ok(())
}
