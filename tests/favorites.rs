mod common;

use common::{location, spawn_app};
use reqwest::{header, StatusCode};
use serde_json::Value;

async fn favorite_count(app: &common::TestApp, token: &str) -> usize {
    let profile: Value = app
        .get("/perfil/", Some(token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    profile["favorites"].as_array().unwrap().len()
}

#[tokio::test]
async fn test_add_favorite_is_idempotent() {
    let app = spawn_app().await;
    let product = app.seed_product("Caneca", "10.00").await;
    let product_id = product["id"].as_i64().unwrap();
    let token = app.register("maria").await;

    for _ in 0..2 {
        let response = app
            .post(&format!("/add-favorite/{product_id}/"), Some(&token))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    assert_eq!(favorite_count(&app, &token).await, 1);
}

#[tokio::test]
async fn test_favorite_redirects_to_referer() {
    let app = spawn_app().await;
    let product = app.seed_product("Caneca", "10.00").await;
    let product_id = product["id"].as_i64().unwrap();
    let token = app.register("maria").await;

    let response = app
        .get(&format!("/add-favorite/{product_id}/"), Some(&token))
        .header(header::REFERER, "/product/caneca/")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/product/caneca/");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Caneca added to favorites!");
}

#[tokio::test]
async fn test_remove_favorite() {
    let app = spawn_app().await;
    let product = app.seed_product("Caneca", "10.00").await;
    let product_id = product["id"].as_i64().unwrap();
    let token = app.register("maria").await;

    let missing = app
        .post(&format!("/remove-favorite/{product_id}/"), Some(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    app.post(&format!("/add-favorite/{product_id}/"), Some(&token))
        .send()
        .await
        .unwrap();
    let removed = app
        .post(&format!("/remove-favorite/{product_id}/"), Some(&token))
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), StatusCode::SEE_OTHER);
    assert_eq!(favorite_count(&app, &token).await, 0);
}

#[tokio::test]
async fn test_favorite_unknown_product_is_not_found() {
    let app = spawn_app().await;
    let token = app.register("maria").await;

    let response = app.post("/add-favorite/404/", Some(&token)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorite_ignores_foreign_referer() {
    let app = spawn_app().await;
    let product = app.seed_product("Caneca", "10.00").await;
    let product_id = product["id"].as_i64().unwrap();
    let token = app.register("maria").await;

    let foreign = app
        .get(&format!("/add-favorite/{product_id}/"), Some(&token))
        .header(header::REFERER, "https://evil.example/phish")
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&foreign), "/");

    let same_site = app
        .get(&format!("/remove-favorite/{product_id}/"), Some(&token))
        .header(header::REFERER, app.url("/product/caneca/"))
        .send()
        .await
        .unwrap();
    assert_eq!(same_site.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&same_site), "/product/caneca/");
}
