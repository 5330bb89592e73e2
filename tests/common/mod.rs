#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use sea_orm::{Database, DatabaseConnection};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::{
    ai::{AiError, Generation, GenerativeModel, InlineImage, Part},
    create_app,
    entities::setup_schema,
    services::try_on::ImageFetcher,
    storage::LocalStorage,
    AppContext,
};

/// Model double: replays a fixed answer and records every call.
#[derive(Clone, Default)]
pub struct FakeModel {
    text: Arc<Mutex<Option<String>>>,
    image: Option<InlineImage>,
    fail: bool,
    calls: Arc<Mutex<Vec<(String, Vec<Part>)>>>,
}

impl FakeModel {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn answering(text: &str) -> Self {
        let model = Self::default();
        model.answer(text);
        model
    }

    /// Replaces the text returned by later calls.
    pub fn answer(&self, text: &str) {
        *self.text.lock().unwrap() = Some(text.to_string());
    }

    pub fn drawing(image: InlineImage) -> Self {
        Self {
            image: Some(image),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<Part>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for FakeModel {
    async fn generate(&self, model: &str, parts: Vec<Part>) -> Result<Generation, AiError> {
        self.calls.lock().unwrap().push((model.to_string(), parts));
        if self.fail {
            return Err(AiError::Api {
                status: 503,
                message: "model overloaded".to_string(),
            });
        }
        Ok(Generation {
            text: self.text.lock().unwrap().clone(),
            images: self.image.clone().into_iter().collect(),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<DatabaseConnection>,
    pub ai: FakeModel,
    pub upload_dir: PathBuf,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(FakeModel::failing(), None).await
}

/// Fresh SQLite file, schema applied, local image storage in a scratch dir.
pub async fn spawn_app_with(ai: FakeModel, admin_key: Option<&str>) -> TestApp {
    let scratch = std::env::temp_dir().join(format!("storefront-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&scratch).expect("create scratch dir");

    let url = format!("sqlite://{}?mode=rwc", scratch.join("test.db").display());
    let db = Database::connect(&url).await.expect("connect to sqlite");
    setup_schema(&db).await.expect("create schema");
    let db = Arc::new(db);

    let upload_dir = scratch.join("uploads");
    let ctx = AppContext {
        db: db.clone(),
        ai: Arc::new(ai.clone()),
        storage: Arc::new(LocalStorage::new(&upload_dir, "http://localhost:3000")),
        images: ImageFetcher::new().expect("http client"),
        admin_api_key: admin_key.map(Arc::from),
    };

    TestApp {
        router: create_app(ctx),
        db,
        ai,
        upload_dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(json_request(Method::GET, uri, None)).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, uri, Some(body))).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::PUT, uri, Some(body))).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(json_request(Method::DELETE, uri, None)).await
    }

    /// Creates an active product and returns its id.
    pub async fn product(&self, body: Value) -> String {
        let (status, body) = self.post("/api/products", body).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().expect("product id").to_string()
    }

    pub async fn simple_product(&self, name: &str, price: f64) -> String {
        self.product(json!({
            "name": name,
            "price": price,
            "stock": 25,
            "category": "T-shirts",
            "image_urls": [format!("/img/{name}.png")],
        }))
        .await
    }
}

pub fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub const BOUNDARY: &str = "storefront-test-boundary";

pub enum FormPart<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Hand-built `multipart/form-data` request.
pub fn multipart_request(method: Method, uri: &str, parts: &[FormPart<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            FormPart::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("multipart request")
}

/// A small opaque PNG.
pub fn png_bytes() -> Vec<u8> {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    let image = RgbImage::from_pixel(4, 4, Rgb([200, 30, 30]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}
