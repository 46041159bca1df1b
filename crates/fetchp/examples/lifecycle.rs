//! Example: walk a few calls through hooks, mocks and the cache
//!
//! Run with: cargo run -p fetchp --example lifecycle
//!
//! Uses a closure transport, so no network access is needed.

use fetchp::{Fetchp, Hook, RequestOptions, Response, UrlTemplate};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), fetchp::FetchpError> {
    println!("Fetchp lifecycle example");
    println!("========================\n");

    let network_calls = Arc::new(AtomicUsize::new(0));
    let counter = network_calls.clone();

    let client = Fetchp::builder()
        .base_url("https://api.example.com")
        .transport_fn(move |req| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(Response::json(json!({ "path": req.url().path() })))
            }
        })
        .build()?;

    client.hooks().add(Hook::state_change(|request, state| {
        let url = request.map(|r| r.url().to_string()).unwrap_or_default();
        println!("  [{state}] {url}");
        async { Ok(()) }
    }));

    client.mocks().add(
        "GET",
        UrlTemplate::new("/users/:id")?,
        Response::json(json!({"name": "mocked user"})),
    );

    println!("1. Mocked call");
    let user = client.request::<Value>("GET", "/users/1", RequestOptions::new());
    println!("   data: {:?}\n", user.data().await);

    println!("2. Two cached calls to the same URL");
    let options = RequestOptions::new().cache_request(true);
    let a = client.request::<Value>("GET", "/posts", options.clone());
    let b = client.request::<Value>("GET", "/posts", options);
    let (a, b) = tokio::join!(a.data(), b.data());
    println!("   data: {:?} / {:?}", a, b);
    println!(
        "   network calls so far: {}\n",
        network_calls.load(Ordering::SeqCst)
    );

    println!("3. Aborted call");
    let slow = client.request::<Value>("GET", "/slow", RequestOptions::new());
    slow.abort();
    println!("   final state: {}", slow.finished().await);

    Ok(())
}
