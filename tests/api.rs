use std::sync::Arc;

use argon2::Params;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use classroom_api::{
    setup::{build_router, AppConfig, AppState},
    utils::clock::ManualClock,
};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let config = AppConfig {
            argon2: Params::new(8, 1, 1, None).unwrap(),
            expose_reset_tokens: true,
            secure_cookies: false,
            ..AppConfig::default()
        };
        let state = AppState::in_memory(config, clock.clone());

        Self {
            router: build_router(state),
            clock,
        }
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|value| value.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        Reply {
            status,
            set_cookie,
            body,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    async fn signup(&self, username: &str, email: &str, role: &str) -> String {
        let reply = self
            .call(
                Method::POST,
                "/api/v1/auth/signup",
                None,
                Some(json!({
                    "username": username,
                    "email": email,
                    "password": "correct horse",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

        reply.body["user"]["id"].as_str().unwrap().to_string()
    }

    async fn signin(&self, email: &str, password: &str) -> Reply {
        self.call(
            Method::POST,
            "/api/v1/auth/signin",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    async fn token_for(&self, email: &str) -> String {
        let reply = self.signin(email, "correct horse").await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);

        reply.body["token"].as_str().unwrap().to_string()
    }
}

fn exam_body(title: &str) -> Value {
    json!({
        "title": title,
        "duration_minutes": 45,
        "total_marks": 60.0,
        "questions": [{ "prompt": "2 + 2", "answer": "4" }],
        "start_date": "2024-03-01T08:00:00Z",
        "end_date": "2024-03-01T12:00:00Z",
    })
}

#[tokio::test]
async fn signup_signin_and_me() {
    let app = TestApp::new();
    let user_id = app.signup("Jane", "Jane@Example.com", "student").await;

    let token = app.token_for("jane@example.com").await;
    let me = app.call(Method::GET, "/api/v1/auth/me", Some(&token), None).await;

    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["success"], json!(true));
    assert_eq!(me.body["user"]["id"], json!(user_id));
    assert_eq!(me.body["user"]["email"], json!("jane@example.com"));
    assert!(me.body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_signup_is_a_conflict() {
    let app = TestApp::new();
    app.signup("Jane", "jane@example.com", "student").await;

    let reply = app
        .call(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "username": "Other Jane",
                "email": "JANE@example.com",
                "password": "another password",
            })),
        )
        .await;

    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["success"], json!(false));
    assert_eq!(reply.body["error"], json!("Email Already Exists"));
}

#[tokio::test]
async fn invalid_payload_reports_field_messages() {
    let app = TestApp::new();

    let reply = app
        .call(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "username": "Jane",
                "email": "not-an-email",
                "password": "short",
            })),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], json!("Validation Error"));
    assert_eq!(
        reply.body["message"]["email"],
        json!(["The email address is invalid"])
    );
    assert!(reply.body["message"]["password"].is_array());
}

#[tokio::test]
async fn incomplete_body_is_answered_with_the_envelope() {
    let app = TestApp::new();

    let reply = app
        .call(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({ "email": "a@b.test" })),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["success"], json!(false));
    assert_eq!(reply.body["error"], json!("Malformed Request Body"));
    assert!(reply.body["message"].is_string());
}

#[tokio::test]
async fn unparseable_json_is_answered_with_the_envelope() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/signin")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let reply = app.send(request).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["success"], json!(false));
    assert_eq!(reply.body["error"], json!("Malformed Request Body"));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/signin")
        .body(Body::from(r#"{"email":"a@b.test","password":"x"}"#))
        .unwrap();
    let reply = app.send(request).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["success"], json!(false));
}

#[tokio::test]
async fn wrong_password_and_missing_session_are_rejected() {
    let app = TestApp::new();
    app.signup("Jane", "jane@example.com", "student").await;

    let reply = app.signin("jane@example.com", "wrong password").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], json!("Invalid Credentials"));

    let reply = app.call(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], json!("Missing Token"));

    let reply = app
        .call(Method::GET, "/api/v1/auth/me", Some("made-up-token-value"), None)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], json!("Invalid Session"));
}

#[tokio::test]
async fn session_cookie_authenticates_until_signout() {
    let app = TestApp::new();
    app.signup("Jane", "jane@example.com", "student").await;

    let reply = app.signin("jane@example.com", "correct horse").await;
    let set_cookie = reply.set_cookie.expect("signin sets the session cookie");
    assert!(set_cookie.starts_with("session_id="));
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let with_cookie = |method: Method, uri: &str| {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie.clone())
            .body(Body::empty())
            .unwrap()
    };

    let me = app.send(with_cookie(Method::GET, "/api/v1/auth/me")).await;
    assert_eq!(me.status, StatusCode::OK);

    let signout = app.send(with_cookie(Method::POST, "/api/v1/auth/signout")).await;
    assert_eq!(signout.status, StatusCode::OK);

    let me = app.send(with_cookie(Method::GET, "/api/v1/auth/me")).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sessions_expire_with_the_clock() {
    let app = TestApp::new();
    app.signup("Jane", "jane@example.com", "student").await;
    let token = app.token_for("jane@example.com").await;

    app.clock.advance(Duration::hours(24));

    let me = app.call(Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    assert_eq!(me.body["error"], json!("Invalid Session"));
}

#[tokio::test]
async fn password_reset_replaces_password_and_revokes_sessions() {
    let app = TestApp::new();
    app.signup("Jane", "jane@example.com", "student").await;
    let old_session = app.token_for("jane@example.com").await;

    let reply = app
        .call(
            Method::POST,
            "/api/v1/auth/password-reset-request",
            None,
            Some(json!({ "email": "JANE@example.com" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let reset_token = reply.body["reset_token"].as_str().unwrap().to_string();

    let reset = json!({ "token": reset_token, "new_password": "battery staple" });
    let reply = app
        .call(Method::POST, "/api/v1/auth/password-reset", None, Some(reset.clone()))
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);

    let reply = app
        .call(Method::POST, "/api/v1/auth/password-reset", None, Some(reset))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], json!("Invalid Or Expired Token"));

    let me = app
        .call(Method::GET, "/api/v1/auth/me", Some(&old_session), None)
        .await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    assert_eq!(
        app.signin("jane@example.com", "correct horse").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.signin("jane@example.com", "battery staple").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn reset_request_for_unknown_email_is_not_found() {
    let app = TestApp::new();

    let reply = app
        .call(
            Method::POST,
            "/api/v1/auth/password-reset-request",
            None,
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], json!("User Not Found"));
}

#[tokio::test]
async fn deleted_account_loses_access() {
    let app = TestApp::new();
    app.signup("Jane", "jane@example.com", "student").await;
    let token = app.token_for("jane@example.com").await;

    let reply = app.call(Method::DELETE, "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let me = app.call(Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.signin("jane@example.com", "correct horse").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn course_enrollment_and_exam_flow() {
    let app = TestApp::new();
    app.signup("Ms. Smith", "smith@school.test", "teacher").await;
    let student_id = app.signup("Jane", "jane@example.com", "student").await;
    let teacher = app.token_for("smith@school.test").await;
    let student = app.token_for("jane@example.com").await;

    // Course and enrollment
    let reply = app
        .call(
            Method::POST,
            "/api/v1/courses",
            Some(&teacher),
            Some(json!({ "name": "Algebra", "subject": "Math" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let course_id = reply.body["course"]["id"].as_str().unwrap().to_string();

    let enroll_uri = format!("/api/v1/courses/{course_id}/enroll");
    let enroll = json!({ "student_id": student_id });
    let reply = app
        .call(Method::POST, &enroll_uri, Some(&teacher), Some(enroll.clone()))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

    let reply = app
        .call(Method::POST, &enroll_uri, Some(&teacher), Some(enroll))
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["error"], json!("Already Enrolled"));

    let reply = app
        .call(Method::GET, "/api/v1/students/me/courses", Some(&student), None)
        .await;
    assert_eq!(reply.body["courses"][0]["name"], json!("Algebra"));

    // Exam creation and availability
    let reply = app
        .call(
            Method::POST,
            &format!("/api/v1/courses/{course_id}/exams"),
            Some(&teacher),
            Some(exam_body("Midterm")),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let exam_id = reply.body["exam"]["id"].as_str().unwrap().to_string();

    let reply = app
        .call(Method::GET, "/api/v1/exams/available", Some(&student), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["exams"][0]["id"], json!(exam_id));
    assert_eq!(reply.body["exams"][0]["course_name"], json!("Algebra"));
    assert_eq!(reply.body["exams"][0]["teacher_name"], json!("Ms. Smith"));

    // Submission happens exactly once
    let submit_uri = format!("/api/v1/exams/{exam_id}/submit");
    let sheet = json!({ "score": 45, "total_marks": 60, "answers": { "q1": "4" } });
    let reply = app
        .call(Method::POST, &submit_uri, Some(&student), Some(sheet.clone()))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["submission"]["percentage"].as_f64(), Some(75.0));
    let submission_id = reply.body["submission"]["id"].as_str().unwrap().to_string();

    let reply = app
        .call(Method::POST, &submit_uri, Some(&student), Some(sheet))
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["error"], json!("Already Submitted"));

    // Review and results
    let reply = app
        .call(
            Method::PUT,
            &format!("/api/v1/exams/{exam_id}/review"),
            Some(&teacher),
            Some(json!({
                "submission_id": submission_id,
                "submission_type": "registered",
                "student_id": student_id,
                "score": 54,
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["submission"]["reviewed"], json!(true));
    assert_eq!(reply.body["submission"]["percentage"].as_f64(), Some(90.0));

    let reply = app
        .call(
            Method::GET,
            &format!("/api/v1/courses/{course_id}/results/{student_id}"),
            Some(&student),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["results"][0]["score"].as_f64(), Some(54.0));

    // Students cannot read the merged result list
    let reply = app
        .call(
            Method::GET,
            &format!("/api/v1/exams/{exam_id}/results"),
            Some(&student),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn students_cannot_create_courses() {
    let app = TestApp::new();
    app.signup("Jane", "jane@example.com", "student").await;
    let student = app.token_for("jane@example.com").await;

    let reply = app
        .call(
            Method::POST,
            "/api/v1/courses",
            Some(&student),
            Some(json!({ "name": "Algebra" })),
        )
        .await;

    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["error"], json!("Teacher Required"));
}

#[tokio::test]
async fn public_exam_ranks_guests_with_registered_students() {
    let app = TestApp::new();
    app.signup("Ms. Smith", "smith@school.test", "teacher").await;
    app.signup("Jane", "jane@example.com", "student").await;
    let teacher = app.token_for("smith@school.test").await;
    let student = app.token_for("jane@example.com").await;

    let mut body = exam_body("Open quiz");
    body["subject"] = json!("Math");
    let reply = app
        .call(Method::POST, "/api/v1/public-exams", Some(&teacher), Some(body))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["exam"]["is_public"], json!(true));
    assert_eq!(reply.body["exam"]["subject"], json!("Math"));
    let exam_id = reply.body["exam"]["id"].as_str().unwrap().to_string();

    // No session needed to read or answer a public exam
    let reply = app
        .call(Method::GET, &format!("/api/v1/public-exams/{exam_id}"), None, None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["exam"]["title"], json!("Open quiz"));

    let guest_uri = format!("/api/v1/public-exams/{exam_id}/submit");
    let guest = json!({
        "student_info": { "name": "Guest Ali", "email": "ali@example.com" },
        "score": 90,
        "total_marks": 100,
    });
    let reply = app
        .call(Method::POST, &guest_uri, None, Some(guest))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["submission"]["submission_type"], json!("guest"));

    let same_guest = json!({
        "student_info": { "name": "  guest ali ", "email": "ALI@example.com" },
        "score": 10,
        "total_marks": 100,
    });
    let reply = app
        .call(Method::POST, &guest_uri, None, Some(same_guest))
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = app
        .call(
            Method::POST,
            &format!("/api/v1/exams/{exam_id}/submit"),
            Some(&student),
            Some(json!({ "score": 80, "total_marks": 100 })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

    let reply = app
        .call(
            Method::GET,
            &format!("/api/v1/exams/{exam_id}/results"),
            Some(&teacher),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let results = reply.body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["student_name"], json!("Guest Ali"));
    assert_eq!(results[1]["student_name"], json!("Jane"));

    let reply = app
        .call(
            Method::GET,
            &format!("/api/v1/public-exams/{exam_id}/submissions"),
            Some(&teacher),
            None,
        )
        .await;
    assert_eq!(reply.body["submissions"].as_array().unwrap().len(), 1);

    let reply = app
        .call(Method::GET, "/api/v1/teachers/me/public-exams", Some(&teacher), None)
        .await;
    assert_eq!(reply.body["exams"][0]["submission_count"], json!(1));
}

#[tokio::test]
async fn guests_need_a_name() {
    let app = TestApp::new();
    app.signup("Ms. Smith", "smith@school.test", "teacher").await;
    let teacher = app.token_for("smith@school.test").await;

    let reply = app
        .call(
            Method::POST,
            "/api/v1/public-exams",
            Some(&teacher),
            Some(exam_body("Open quiz")),
        )
        .await;
    let exam_id = reply.body["exam"]["id"].as_str().unwrap().to_string();

    let reply = app
        .call(
            Method::POST,
            &format!("/api/v1/public-exams/{exam_id}/submit"),
            None,
            Some(json!({
                "student_info": { "name": "   " },
                "score": 1,
                "total_marks": 10,
            })),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["message"]["name"].is_array());
}

#[tokio::test]
async fn guest_email_is_stored_lowercased() {
    let app = TestApp::new();
    app.signup("Ms. Smith", "smith@school.test", "teacher").await;
    let teacher = app.token_for("smith@school.test").await;

    let reply = app
        .call(
            Method::POST,
            "/api/v1/public-exams",
            Some(&teacher),
            Some(exam_body("Open quiz")),
        )
        .await;
    let exam_id = reply.body["exam"]["id"].as_str().unwrap().to_string();

    let reply = app
        .call(
            Method::POST,
            &format!("/api/v1/public-exams/{exam_id}/submit"),
            None,
            Some(json!({
                "student_info": { "name": "Sam", "email": "Sam@Example.COM" },
                "score": 5,
                "total_marks": 10,
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["submission"]["email"], json!("sam@example.com"));

    let reply = app
        .call(
            Method::GET,
            &format!("/api/v1/public-exams/{exam_id}/submissions"),
            Some(&teacher),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["submissions"][0]["email"], json!("sam@example.com"));
    assert_eq!(reply.body["submissions"][0]["name"], json!("Sam"));
}

#[tokio::test]
async fn duplicate_keeps_the_course_and_marks_the_title() {
    let app = TestApp::new();
    app.signup("Ms. Smith", "smith@school.test", "teacher").await;
    let teacher = app.token_for("smith@school.test").await;

    let reply = app
        .call(
            Method::POST,
            "/api/v1/courses",
            Some(&teacher),
            Some(json!({ "name": "Algebra" })),
        )
        .await;
    let course_id = reply.body["course"]["id"].as_str().unwrap().to_string();

    let reply = app
        .call(
            Method::POST,
            &format!("/api/v1/courses/{course_id}/exams"),
            Some(&teacher),
            Some(exam_body("Midterm")),
        )
        .await;
    let exam_id = reply.body["exam"]["id"].as_str().unwrap().to_string();

    let reply = app
        .call(
            Method::POST,
            &format!("/api/v1/exams/{exam_id}/duplicate"),
            Some(&teacher),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["exam"]["title"], json!("Midterm (Copy)"));
    assert_eq!(reply.body["exam"]["course_id"], json!(course_id));
    assert_eq!(reply.body["exam"]["is_public"], json!(false));

    let reply = app
        .call(Method::GET, "/api/v1/teachers/me/exams", Some(&teacher), None)
        .await;
    assert_eq!(reply.body["exams"].as_array().unwrap().len(), 2);
}
