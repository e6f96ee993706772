use std::net::SocketAddr;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, redirect};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;

use autorealm_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ListingConfig, ServerConfig,
};
use autorealm_server::state::AppState;

pub mod routes {
    pub const REGISTER: &str = "/auth/register";
    pub const LOGIN: &str = "/auth/login";
    pub const ME: &str = "/auth/me";

    pub const CAR_ADS: &str = "/car-ads";
    pub const HOME: &str = "/car-ads/home";
    pub const CREATE: &str = "/car-ads/create";

    pub fn models(brand: &str) -> String {
        format!("/car-ads/models?brand={brand}")
    }

    pub fn details(id: impl std::fmt::Display) -> String {
        format!("/car-ads/details/{id}")
    }

    pub fn edit(id: impl std::fmt::Display) -> String {
        format!("/car-ads/edit/{id}")
    }

    pub fn delete(id: impl std::fmt::Display) -> String {
        format!("/car-ads/delete/{id}")
    }

    pub fn photo(id: impl std::fmt::Display) -> String {
        format!("/car-ads/{id}/photo")
    }
}

/// A running test server backed by a private in-memory SQLite database.
pub struct TestApp {
    pub addr: SocketAddr,
    /// Keeps cookies and never follows redirects.
    pub client: Client,
    pub db: DatabaseConnection,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub location: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

/// Fields of a car-ad form submission.
#[derive(Clone)]
pub struct AdFields {
    pub id: Option<String>,
    pub brand: String,
    pub model: String,
    pub year: String,
    pub price: String,
    pub mileage: String,
    pub city: String,
    pub description: String,
}

impl AdFields {
    pub fn porsche(model: &str) -> Self {
        Self {
            id: None,
            brand: "Porsche".into(),
            model: model.into(),
            year: "2019".into(),
            price: "89000".into(),
            mileage: "42000".into(),
            city: "Stuttgart".into(),
            description: "Garage kept".into(),
        }
    }

    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Multipart form with the fields, an optional file and an optional anti-forgery token.
    pub fn to_form(&self, file: Option<(&str, Vec<u8>)>, antiforgery: Option<&str>) -> Form {
        let mut form = Form::new()
            .text("brand", self.brand.clone())
            .text("model", self.model.clone())
            .text("year", self.year.clone())
            .text("price", self.price.clone())
            .text("mileage", self.mileage.clone())
            .text("city", self.city.clone())
            .text("description", self.description.clone());
        if let Some(id) = &self.id {
            form = form.text("id", id.clone());
        }
        if let Some(token) = antiforgery {
            form = form.text("__RequestVerificationToken", token.to_string());
        }
        if let Some((field, bytes)) = file {
            let part = Part::bytes(bytes)
                .file_name("car.jpg")
                .mime_str("image/jpeg")
                .expect("Failed to set MIME type");
            form = form.part(field.to_string(), part);
        }
        form
    }
}

pub fn jpeg_bytes(tag: u8) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend(std::iter::repeat_n(tag, 64));
    bytes
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(ListingConfig::default()).await
    }

    pub async fn spawn_with(listing: ListingConfig) -> Self {
        let db_url = "sqlite::memory:".to_string();
        let mut opts = ConnectOptions::new(&db_url);
        // One connection, otherwise every pool member sees its own empty database.
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to connect to test database");
        autorealm_server::database::sync_schema(&db)
            .await
            .expect("Failed to create schema");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: db_url,
                max_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
                token_ttl_hours: 1,
            },
            listing,
            catalog: Default::default(),
        };

        let app = autorealm_server::build_router(AppState::new(db.clone(), app_config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self { addr, client, db }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_multipart(&self, path: &str, form: Form, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart request");

        TestResponse::from_response(res).await
    }

    pub async fn post_urlencoded(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        token: &str,
    ) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .form(fields)
            .send()
            .await
            .expect("Failed to send form request");

        TestResponse::from_response(res).await
    }

    /// Register a user and log in, returning the auth token and user id.
    pub async fn create_authenticated_user(&self, username: &str) -> (String, i32) {
        let body = serde_json::json!({
            "username": username,
            "password": "securepass",
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let res = self.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        let token = res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string();
        let user_id = res.body["user_id"]
            .as_i64()
            .expect("Login response should contain a user id") as i32;
        (token, user_id)
    }

    /// Open the create form, which also stores the anti-forgery cookie.
    pub async fn antiforgery_token(&self, token: &str) -> String {
        let res = self.get_with_token(routes::CREATE, token).await;
        assert_eq!(res.status, 200, "Create form failed: {}", res.text);
        res.body["antiforgery_token"]
            .as_str()
            .expect("Form should carry an anti-forgery token")
            .to_string()
    }

    /// Create an ad through the API and return its `id`.
    pub async fn create_ad(&self, token: &str, fields: &AdFields, photo: Vec<u8>) -> i32 {
        let csrf = self.antiforgery_token(token).await;
        let form = fields.to_form(Some(("photo", photo)), Some(&csrf));
        let res = self.post_multipart(routes::CREATE, form, token).await;
        assert_eq!(res.status, 303, "create_ad failed: {}", res.text);
        self.latest_ad_id().await
    }

    /// Highest ad id in the listing.
    pub async fn latest_ad_id(&self) -> i32 {
        let list = self.get_without_token(routes::CAR_ADS).await;
        list.body["data"]
            .as_array()
            .and_then(|ads| ads.last())
            .and_then(|ad| ad["id"].as_i64())
            .expect("listing should not be empty") as i32
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let header = |name: reqwest::header::HeaderName| {
            res.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let location = header(reqwest::header::LOCATION);
        let content_type = header(reqwest::header::CONTENT_TYPE);
        let bytes = res.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            location,
            content_type,
            bytes,
            text,
            body,
        }
    }
}
