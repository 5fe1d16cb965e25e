#![allow(dead_code)]

use reqwest::{header, redirect, Client, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use storefront::{
    build_app,
    config::{AdminSeed, Config},
};
use tempfile::TempDir;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-pass-123";
pub const PASSWORD: &str = "s3cret-pass";

pub struct TestApp {
    pub address: String,
    pub client: Client,
    _dir: TempDir,
}

/// Starts the whole application on an ephemeral port over a fresh SQLite file.
pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config {
        database_url: format!("sqlite://{}?mode=rwc", dir.path().join("store.db").display()),
        secret: "integration-secret".into(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        media_root: dir.path().join("media"),
        token_ttl_hours: 1,
        admin: Some(AdminSeed {
            username: ADMIN_USERNAME.into(),
            password: ADMIN_PASSWORD.into(),
        }),
    };

    let app = build_app(config).await.expect("Failed to build app");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server crashed");
    });

    let client = Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to build client");

    TestApp {
        address,
        client,
        _dir: dir,
    }
}

pub fn registration(username: &str) -> Value {
    json!({
        "first_name": "Ana Souza",
        "last_name": "",
        "username": username,
        "email": format!("{username}@example.com"),
        "password1": PASSWORD,
        "password2": PASSWORD,
        "phone": "11987654321",
        "address": "Rua das Flores, 10",
    })
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

pub fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal encoded as string"))
        .expect("valid decimal")
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorized(self.client.get(self.url(path)), token)
    }

    pub fn post(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorized(self.client.post(self.url(path)), token)
    }

    pub fn patch(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorized(self.client.patch(self.url(path)), token)
    }

    pub fn delete(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorized(self.client.delete(self.url(path)), token)
    }

    /// Registers a user with a complete profile and returns its token.
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .post("/register/", None)
            .json(&registration(username))
            .send()
            .await
            .expect("Failed to register");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().expect("token in response").to_owned()
    }

    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.post("/login/", None)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to log in")
    }

    pub async fn admin_token(&self) -> String {
        let response = self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().expect("token in response").to_owned()
    }

    pub async fn create_category(&self, admin: &str, name: &str) -> Value {
        let response = self
            .post("/api/admin/category", Some(admin))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    pub async fn create_product(&self, admin: &str, category_id: i64, name: &str, price: &str) -> Value {
        let response = self
            .post("/api/admin/product", Some(admin))
            .json(&json!({
                "category_id": category_id,
                "name": name,
                "price": price,
                "featured": true,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    /// One category with one product priced `price`; returns the product.
    pub async fn seed_product(&self, name: &str, price: &str) -> Value {
        let admin = self.admin_token().await;
        let category = self.create_category(&admin, &format!("{name} category")).await;
        self.create_product(&admin, category["id"].as_i64().unwrap(), name, price)
            .await
    }
}

fn authorized(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}
