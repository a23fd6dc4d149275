//! Integration test for live commentary endpoint connectivity.

use parley_chess::{CommentaryClient, CommentaryConfig, SYSTEM_PROMPT, TextSource};

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
async fn test_endpoint_connectivity() {
    dotenvy::dotenv().ok();

    let config = CommentaryConfig::load("parley.toml").expect("config should load");
    let mut client = CommentaryClient::new(config);

    let response = client
        .request_text(
            SYSTEM_PROMPT,
            "Say a single short sentence about the opening move e4.",
        )
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}
