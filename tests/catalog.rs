mod common;

use common::{decimal, spawn_app};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{json, Value};

#[tokio::test]
async fn test_home_lists_available_products_by_category() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Canecas Térmicas").await;
    assert_eq!(category["slug"], "canecas-termicas");
    let category_id = category["id"].as_i64().unwrap();

    let shown = app.create_product(&admin, category_id, "Caneca Azul", "10.00").await;
    let hidden = app.create_product(&admin, category_id, "Caneca Velha", "5.00").await;
    let response = app
        .patch(&format!("/api/admin/product/{}", hidden["id"]), Some(&admin))
        .json(&json!({ "available": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let home: Value = app.get("/", None).send().await.unwrap().json().await.unwrap();
    assert_eq!(home["categories"][0]["slug"], "canecas-termicas");
    assert_eq!(home["categories"][0]["products"].as_array().unwrap().len(), 1);
    assert_eq!(home["all_products"][0]["id"], shown["id"]);
    assert_eq!(home["new_products"][0]["category"]["slug"], "canecas-termicas");
    assert_eq!(decimal(&home["all_products"][0]["price"]), Decimal::new(1000, 2));
}

#[tokio::test]
async fn test_category_listing() {
    let app = spawn_app().await;
    let product = app.seed_product("Caneca", "10.00").await;

    let listing: Value = app
        .get("/category/caneca-category/", None)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["category"]["slug"], "caneca-category");
    assert_eq!(listing["products"][0]["id"], product["id"]);

    let missing = app.get("/category/nope/", None).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_products_page_shows_featured() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Camisetas").await;
    let category_id = category["id"].as_i64().unwrap();

    app.create_product(&admin, category_id, "Camiseta Preta", "59.90").await;
    let response = app
        .post("/api/admin/product", Some(&admin))
        .json(&json!({
            "category_id": category_id,
            "name": "Camiseta Branca",
            "price": "49.90",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let listing: Value = app.get("/products/", None).send().await.unwrap().json().await.unwrap();
    let products = listing["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["slug"], "camiseta-preta");
}

#[tokio::test]
async fn test_product_detail_with_related() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Canecas").await;
    let category_id = category["id"].as_i64().unwrap();
    for i in 0..6 {
        app.create_product(&admin, category_id, &format!("Caneca {i}"), "10.00")
            .await;
    }

    let detail: Value = app
        .get("/product/caneca-2/", None)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["product"]["slug"], "caneca-2");
    let related = detail["related_products"].as_array().unwrap();
    assert_eq!(related.len(), 4);
    assert!(related.iter().all(|p| p["slug"] != "caneca-2"));

    let missing = app.get("/product/nope/", None).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = spawn_app().await;
    let payload = json!({ "name": "Canecas" });

    let anonymous = app
        .post("/api/admin/category", None)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let token = app.register("maria").await;
    let customer = app
        .post("/api/admin/category", Some(&token))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(customer.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_duplicate_slug_conflicts() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_category(&admin, "Canecas").await;

    let response = app
        .post("/api/admin/category", Some(&admin))
        .json(&json!({ "name": "Outra", "slug": "canecas" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_bulk_make_unavailable() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Canecas").await;
    let category_id = category["id"].as_i64().unwrap();
    let a = app.create_product(&admin, category_id, "Caneca A", "10.00").await;
    let b = app.create_product(&admin, category_id, "Caneca B", "10.00").await;

    let response = app
        .post("/api/admin/product/bulk", Some(&admin))
        .json(&json!({ "action": "make_unavailable", "ids": [a["id"], b["id"]] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["updated"], 2);

    let home: Value = app.get("/", None).send().await.unwrap().json().await.unwrap();
    assert!(home["all_products"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_product_clears_carts() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let product = app.seed_product("Caneca", "10.00").await;
    let product_id = product["id"].as_i64().unwrap();
    let token = app.register("maria").await;
    app.post(&format!("/add-to-cart/{product_id}/"), Some(&token))
        .send()
        .await
        .unwrap();

    let response = app
        .delete(&format!("/api/admin/product/{product_id}"), Some(&admin))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cart: Value = app
        .get("/cart/", Some(&token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(cart["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_slug_outside_slug_alphabet_is_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Canecas").await;
    let category_id = category["id"].as_i64().unwrap();

    let created = app
        .post("/api/admin/category", Some(&admin))
        .json(&json!({ "name": "Outra", "slug": "Not A/Slug!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::BAD_REQUEST);

    let patched = app
        .patch(&format!("/api/admin/category/{category_id}"), Some(&admin))
        .json(&json!({ "slug": "canecas?x=1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(patched.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_price_with_sub_cent_precision_is_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Canecas").await;

    let response = app
        .post("/api/admin/product", Some(&admin))
        .json(&json!({
            "category_id": category["id"],
            "name": "Caneca",
            "price": "10.005",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
