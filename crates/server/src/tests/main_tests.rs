use super::*;
use axum::{
    body,
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use serde_json::Value;
use shared::{domain::RequestType, protocol::RegisterForm};
use tower::ServiceExt;

async fn test_app() -> (Router, ApiContext) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let api = ApiContext {
        storage,
        sessions: SessionKeys::new(b"router-test-secret", 600),
    };
    let app = build_router(Arc::new(AppState {
        api: api.clone(),
        secure_cookies: false,
    }));
    (app, api)
}

async fn seed_user(api: &ApiContext, phone: &str, resident: bool, staff: bool) {
    let form = RegisterForm {
        phone_number: phone.into(),
        password: "secret123".into(),
        full_name: "Irina Sokolova".into(),
        is_resident: if resident { "on".into() } else { String::new() },
        is_staff_member: if staff { "on".into() } else { String::new() },
    };
    server_api::register(api, &form).await.expect("register");
}

fn multipart(fields: &[(&str, &str)]) -> (String, Body) {
    let boundary = "hoa-test-boundary";
    let mut raw = String::new();
    for (name, value) in fields {
        raw.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    raw.push_str(&format!("--{boundary}--\r\n"));
    (
        format!("multipart/form-data; boundary={boundary}"),
        Body::from(raw),
    )
}

fn post_urlencoded(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn post_multipart(uri: &str, fields: &[(&str, &str)], cookie: &str) -> Request<Body> {
    let (content_type, body) = multipart(fields);
    Request::post(uri)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::COOKIE, cookie)
        .body(body)
        .expect("request")
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request")
}

async fn json_body(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Logs in through the router and returns the `name=value` cookie pair.
async fn login_cookie(app: &Router, phone: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_urlencoded(
            "/api/login",
            &format!("phoneNumber={phone}&password=secret123"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .expect("ascii")
        .to_string();
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _api) = test_app().await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn login_sets_http_only_session_cookie() {
    let (app, api) = test_app().await;
    seed_user(&api, "79990000001", false, true).await;

    let response = app
        .clone()
        .oneshot(post_urlencoded(
            "/api/login",
            "phoneNumber=79990000001&password=secret123",
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .expect("ascii")
        .to_string();
    assert!(set_cookie.starts_with("hoa_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=600"));
    assert!(!set_cookie.contains("Secure"));

    let body = json_body(response).await;
    assert_eq!(body["type"], "login");
    assert_eq!(body["message"], "79990000001");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let (app, api) = test_app().await;
    seed_user(&api, "79990000002", true, false).await;

    let response = app
        .oneshot(post_urlencoded(
            "/api/login",
            "phoneNumber=79990000002&password=wrongpass",
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "user not found");
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn staff_routes_require_a_staff_session() {
    let (app, api) = test_app().await;
    seed_user(&api, "79990000003", true, false).await;

    let anonymous = app
        .clone()
        .oneshot(Request::get("/api/staff/houses/list").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(anonymous).await["error"], "unauthorized");

    let tampered = app
        .clone()
        .oneshot(get_with_cookie("/api/staff/houses/list", "hoa_session=not-a-token"))
        .await
        .expect("response");
    assert_eq!(tampered.status(), StatusCode::UNAUTHORIZED);

    let cookie = login_cookie(&app, "79990000003").await;
    let resident = app
        .oneshot(get_with_cookie("/api/staff/houses/list", &cookie))
        .await
        .expect("response");
    assert_eq!(resident.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(resident).await["error"], "forbidden");
}

#[tokio::test]
async fn house_create_accepts_both_form_encodings_and_lists_with_meta() {
    let (app, api) = test_app().await;
    seed_user(&api, "79990000004", false, true).await;
    let cookie = login_cookie(&app, "79990000004").await;

    let created = app
        .clone()
        .oneshot(post_multipart(
            "/api/staff/houses/create",
            &[("address", "Lenina 1")],
            &cookie,
        ))
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::OK);
    assert_eq!(json_body(created).await["message"], "success");

    let created = app
        .clone()
        .oneshot(post_urlencoded(
            "/api/staff/houses/create",
            "address=Lenina+2",
            Some(&cookie),
        ))
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::OK);

    let duplicate = app
        .clone()
        .oneshot(post_urlencoded(
            "/api/staff/houses/create",
            "address=Lenina+2",
            Some(&cookie),
        ))
        .await
        .expect("response");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(duplicate).await["error"], "house already exists");

    let listed = app
        .oneshot(get_with_cookie("/api/staff/houses/list?page=1&limit=1&pattern=lenina", &cookie))
        .await
        .expect("response");
    assert_eq!(listed.status(), StatusCode::OK);
    let body = json_body(listed).await;
    assert_eq!(body["houses"].as_array().expect("houses").len(), 1);
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["meta"]["pages"], 2);
    assert_eq!(body["meta"]["limit"], 1);
}

#[tokio::test]
async fn missing_form_fields_are_validation_errors() {
    let (app, api) = test_app().await;
    seed_user(&api, "79990000005", false, true).await;
    let cookie = login_cookie(&app, "79990000005").await;

    let response = app
        .oneshot(post_multipart("/api/staff/organizations/create", &[], &cookie))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "name is required");
}

#[tokio::test]
async fn resident_files_request_and_staff_deletes_it_via_get_and_delete() {
    let (app, api) = test_app().await;
    seed_user(&api, "79990000006", true, false).await;
    seed_user(&api, "79990000007", false, true).await;

    let resident = api
        .storage
        .resident_by_phone("79990000006")
        .await
        .expect("lookup")
        .expect("resident");
    let house = api
        .storage
        .create_house("Mira 10")
        .await
        .expect("house")
        .expect("created");
    api.storage
        .link_resident_house(&resident.id, house.id)
        .await
        .expect("link");

    let resident_cookie = login_cookie(&app, "79990000006").await;
    let staff_cookie = login_cookie(&app, "79990000007").await;
    let house_id = house.id.to_string();

    let mut request_ids = Vec::new();
    for complaint in ["Leaking pipe", "Broken lift"] {
        let created = app
            .clone()
            .oneshot(post_multipart(
                "/api/resident/create-request",
                &[
                    ("houseID", house_id.as_str()),
                    ("requestType", RequestType::ApartmentInternal.as_str()),
                    ("complaint", complaint),
                ],
                &resident_cookie,
            ))
            .await
            .expect("response");
        assert_eq!(created.status(), StatusCode::OK);
        let record = json_body(created).await;
        assert_eq!(record["Complaint"], complaint);
        request_ids.push(record["ID"].as_str().expect("id").to_string());
    }

    let mine = app
        .clone()
        .oneshot(get_with_cookie("/api/resident/requests?sort=created_asc", &resident_cookie))
        .await
        .expect("response");
    let body = json_body(mine).await;
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["requests"][0]["Complaint"], "Leaking pipe");

    let via_get = app
        .clone()
        .oneshot(get_with_cookie(
            &format!("/api/staff/requests/panel/delete/{}", request_ids[0]),
            &staff_cookie,
        ))
        .await
        .expect("response");
    assert_eq!(via_get.status(), StatusCode::OK);
    assert_eq!(
        json_body(via_get).await["message"],
        format!("deleted {}", request_ids[0])
    );

    let via_delete = app
        .clone()
        .oneshot(
            Request::delete(format!("/api/staff/requests/panel/delete/{}", request_ids[1]))
                .header(header::COOKIE, &staff_cookie)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(via_delete.status(), StatusCode::OK);

    let again = app
        .oneshot(get_with_cookie(
            &format!("/api/staff/requests/panel/delete/{}", request_ids[1]),
            &staff_cookie,
        ))
        .await
        .expect("response");
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resident_cannot_file_for_foreign_house() {
    let (app, api) = test_app().await;
    seed_user(&api, "79990000008", true, false).await;
    let house = api
        .storage
        .create_house("Foreign 5")
        .await
        .expect("house")
        .expect("created");
    let cookie = login_cookie(&app, "79990000008").await;

    let response = app
        .oneshot(post_multipart(
            "/api/resident/create-request",
            &[
                ("houseID", house.id.to_string().as_str()),
                ("requestType", RequestType::HouseCommon.as_str()),
                ("complaint", "Roof"),
            ],
            &cookie,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn staff_deletes_user_and_details_disappear() {
    let (app, api) = test_app().await;
    seed_user(&api, "79990000009", false, true).await;
    seed_user(&api, "79990000010", true, true).await;
    let cookie = login_cookie(&app, "79990000009").await;

    let details = app
        .clone()
        .oneshot(get_with_cookie("/api/staff/users/info/79990000010", &cookie))
        .await
        .expect("response");
    let body = json_body(details).await;
    assert!(body.get("resident").is_some());
    assert!(body.get("staff").is_some());

    let deleted = app
        .clone()
        .oneshot(
            Request::delete("/api/staff/users/delete/79990000010")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(deleted.status(), StatusCode::OK);

    let details = app
        .clone()
        .oneshot(get_with_cookie("/api/staff/users/info/79990000010", &cookie))
        .await
        .expect("response");
    assert_eq!(json_body(details).await, serde_json::json!({}));

    let missing = app
        .oneshot(get_with_cookie("/api/staff/users/delete/79990000010", &cookie))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logout_clears_cookie_and_redirects() {
    let (app, _api) = test_app().await;
    let response = app
        .oneshot(Request::get("/logout").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).expect("location"),
        "/login"
    );
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .expect("ascii");
    assert!(cleared.starts_with("hoa_session=;"));
    assert!(cleared.contains("Max-Age=0"));
}

#[test]
fn cookie_lookup_skips_similar_names() {
    let request = Request::get("/")
        .header(header::COOKIE, "hoa_session_old=stale; hoa_session=fresh; theme=dark")
        .body(Body::empty())
        .expect("request");
    assert_eq!(
        session::extract_cookie(&request, "hoa_session").as_deref(),
        Some("fresh")
    );
    assert_eq!(session::extract_cookie(&request, "missing"), None);
}
