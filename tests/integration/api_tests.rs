//! API integration tests against a running server

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:5000/api";

/// Create a book with a unique isbn and return its `data` payload
async fn create_book(client: &Client, copies: i64) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "The Left Hand of Darkness",
            "author": "Ursula K. Le Guin",
            "genre": "FICTION",
            "isbn": format!("it-{}", Uuid::new_v4()),
            "description": "Gethen",
            "copies": copies
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"].clone()
}

fn due_in_days(days: i64) -> String {
    (Utc::now() + Duration::days(days)).to_rfc3339()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_reaches_store() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_create_and_get_book() {
    let client = Client::new();
    let book = create_book(&client, 2).await;
    assert_eq!(book["available"], true);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book["id"].as_str().unwrap()))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["isbn"], book["isbn"]);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn_rejected() {
    let client = Client::new();
    let book = create_book(&client, 1).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "Copy",
            "author": "Someone",
            "genre": "SCIENCE",
            "isbn": book["isbn"],
            "copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "ISBN already exists");
}

#[tokio::test]
#[ignore]
async fn test_list_books_with_filter() {
    let client = Client::new();
    create_book(&client, 1).await;

    let response = client
        .get(format!("{}/books?filter=FICTION&sortBy=title&sort=asc&limit=5", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    let books = body["data"].as_array().expect("data is not an array");
    assert!(!books.is_empty() && books.len() <= 5);
    assert!(books.iter().all(|b| b["genre"] == "FICTION"));
}

#[tokio::test]
#[ignore]
async fn test_borrow_decrements_stock() {
    let client = Client::new();
    let book = create_book(&client, 2).await;
    let id = book["id"].as_str().unwrap();

    let response = client
        .post(format!("{}/borrow", BASE_URL))
        .json(&json!({ "book": id, "quantity": 2, "dueDate": due_in_days(7) }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["copies"], 0);
    assert_eq!(body["data"]["available"], false);

    let response = client
        .post(format!("{}/borrow", BASE_URL))
        .json(&json!({ "book": id, "quantity": 1, "dueDate": due_in_days(7) }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_do_not_oversell() {
    let client = Client::new();
    let book = create_book(&client, 3).await;
    let id = book["id"].as_str().unwrap().to_string();

    let attempts = (0..10).map(|_| {
        let client = client.clone();
        let id = id.clone();
        tokio::spawn(async move {
            client
                .post(format!("{}/borrow", BASE_URL))
                .json(&json!({ "book": id, "quantity": 3, "dueDate": due_in_days(3) }))
                .send()
                .await
                .expect("Failed to send request")
                .status()
        })
    });

    let mut created = 0;
    for attempt in attempts.collect::<Vec<_>>() {
        if attempt.await.unwrap() == StatusCode::CREATED {
            created += 1;
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
#[ignore]
async fn test_borrow_summary() {
    let client = Client::new();
    let book = create_book(&client, 10).await;

    for quantity in [3, 2] {
        let response = client
            .post(format!("{}/borrow", BASE_URL))
            .json(&json!({ "book": book["id"], "quantity": quantity, "dueDate": due_in_days(1) }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = client
        .get(format!("{}/borrow", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    let entry = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["book"]["isbn"] == book["isbn"])
        .cloned()
        .expect("book missing from summary");
    assert_eq!(entry["totalQuantity"], 5);
}

#[tokio::test]
#[ignore]
async fn test_unknown_route() {
    let client = Client::new();

    let response = client
        .get(format!("{}/shelves", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Route not found");
    assert_eq!(body["error"], "Cannot GET /api/shelves");
}
