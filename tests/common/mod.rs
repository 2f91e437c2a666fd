#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use photoshare::config::{Cli, Config};
use photoshare::db;
use photoshare::routes;
use photoshare::state::AppState;

const BOUNDARY: &str = "photoshare-test-boundary";

pub struct TestApp {
    pub app: Router,
    pub config: Config,
    pub pool: photoshare::state::DbPool,
    _tmp: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub set_cookie: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A registered user with an open session.
pub struct TestUser {
    pub id: String,
    pub cookie: String,
}

impl TestApp {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let mut config = Config::load(&cli).unwrap();
        config.auth.bcrypt_cost = 4;

        let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");

        let app = routes::app(AppState {
            db: pool.clone(),
            config: config.clone(),
        });

        TestApp {
            app,
            config,
            pool,
            _tmp: tmp,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().to_string());
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            body,
            set_cookie,
            content_type,
            bytes,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
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

    pub async fn get(&self, uri: &str, user: &TestUser) -> TestResponse {
        self.request(Method::GET, uri, Some(&user.cookie), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Option<Value>) -> TestResponse {
        self.request(Method::POST, uri, Some(&user.cookie), body).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> TestResponse {
        self.request(Method::DELETE, uri, Some(&user.cookie), None).await
    }

    pub async fn register(&self, login_name: &str) -> TestUser {
        let response = self
            .request(
                Method::POST,
                "/user",
                None,
                Some(json!({
                    "login_name": login_name,
                    "password": "secret",
                    "first_name": login_name,
                    "last_name": "Tester",
                    "occupation": "photographer",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        TestUser {
            id: response.body["_id"].as_str().unwrap().to_string(),
            cookie: response.set_cookie.expect("registration sets a session cookie"),
        }
    }

    /// Upload a small fake image; `access` is sent verbatim as the access_list field.
    pub async fn upload(&self, user: &TestUser, access: Option<&str>) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"uploadedphoto\"; filename=\"pic.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"\xff\xd8\xff\xe0fake-jpeg");
        body.extend_from_slice(b"\r\n");
        if let Some(access) = access {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"access_list\"\r\n\r\n{access}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/photos/new")
            .header(header::COOKIE, &user.cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Upload and return the new photo's id and file name.
    pub async fn upload_photo(&self, user: &TestUser, access: Option<&str>) -> (String, String) {
        let response = self.upload(user, access).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        (
            response.body["_id"].as_str().unwrap().to_string(),
            response.body["file_name"].as_str().unwrap().to_string(),
        )
    }

    pub async fn comment(&self, user: &TestUser, photo_id: &str, text: &str) -> TestResponse {
        self.post(
            &format!("/commentsOfPhoto/{}", photo_id),
            user,
            Some(json!({ "comment": text })),
        )
        .await
    }

    pub fn count(&self, sql: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    pub fn upload_exists(&self, file_name: &str) -> bool {
        self.config.uploads_path().join(file_name).exists()
    }
}

pub fn ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["_id"].as_str().unwrap().to_string())
        .collect()
}
