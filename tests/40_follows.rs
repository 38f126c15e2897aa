mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn follow_lifecycle_with_repeat_conflict() -> Result<()> {
    if !common::database_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }

    let server = common::ensure_server().await?;
    let client = common::client();

    let res = client
        .post(format!("{}/users", server.base_url))
        .json(&json!({ "username": common::unique("carol"), "password": "hunter2" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    // Follow a community, then see it in the session's follows.
    let res = client
        .put(format!("{}/follows/Maseeh", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/follows/session", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let follows: Vec<Value> = res.json().await?;
    assert_eq!(follows.len(), 1);
    assert_eq!(follows[0]["community"], json!("Maseeh"));

    // A second follow of the same community is a conflict.
    let res = client
        .put(format!("{}/follows/Maseeh", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await?;
    assert_eq!(
        body["error"],
        json!("You are already following this community.")
    );

    // Unknown community names are rejected before any write.
    let res = client
        .put(format!("{}/follows/Atlantis", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unfollow once, then the follow is gone.
    let res = client
        .delete(format!("{}/follows/Maseeh", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .delete(format!("{}/follows/Maseeh", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn follows_require_a_session() -> Result<()> {
    if !common::database_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }

    let server = common::ensure_server().await?;

    let res = common::client()
        .get(format!("{}/follows/session", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(
        body["error"],
        json!("You must be logged in to complete this action.")
    );

    Ok(())
}

#[tokio::test]
async fn followed_listings_is_explicitly_unsupported() -> Result<()> {
    if !common::database_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }

    let server = common::ensure_server().await?;
    let client = common::client();

    let res = client
        .post(format!("{}/users", server.base_url))
        .json(&json!({ "username": common::unique("dave"), "password": "hunter2" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(format!("{}/follows/listings", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    let body: Value = res.json().await?;
    assert_eq!(
        body["error"],
        json!("Listings from followed communities are not yet supported.")
    );

    Ok(())
}
