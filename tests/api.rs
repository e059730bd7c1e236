use std::net::SocketAddr;

use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use truth_or_dare::config::ServerConfig;
use truth_or_dare::content::ContentLibrary;
use truth_or_dare::game::Registry;
use truth_or_dare::{app, AppState};

async fn spawn_app() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState {
        registry: Registry::new(ServerConfig::default(), ContentLibrary::default()),
    };
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    addr
}

async fn post(client: &Client, url: String, body: Value) -> (u16, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

async fn get(client: &Client, url: String) -> (u16, Value) {
    let response = client.get(url).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let addr = spawn_app().await;
    let (status, body) = get(&Client::new(), format!("http://{}/api/health", addr)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_index_page() {
    let addr = spawn_app().await;
    let response = Client::new()
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.text().await.unwrap().contains("Truth or Dare"));
}

#[tokio::test]
async fn test_create_lobby_validation() {
    let addr = spawn_app().await;
    let client = Client::new();

    let (status, body) = post(
        &client,
        format!("http://{}/api/lobby", addr),
        json!({
            "player_name": "Alice",
            "game_mode": "sideways",
            "rules_mode": "with",
            "difficulty_setting": "all"
        }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().is_some());

    let (status, body) = post(
        &client,
        format!("http://{}/api/lobby", addr),
        json!({
            "player_name": "x".repeat(31),
            "game_mode": "clockwise",
            "rules_mode": "with",
            "difficulty_setting": "all"
        }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Name cannot exceed 30 characters");
}

#[tokio::test]
async fn test_unknown_lobby_and_game() {
    let addr = spawn_app().await;
    let client = Client::new();

    let (status, body) = post(
        &client,
        format!("http://{}/api/lobby/QQQQQQ/join", addr),
        json!({ "player_name": "Bob" }),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Lobby not found");

    let (status, _) = get(&client, format!("http://{}/api/game/nope", addr)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_full_game_flow() {
    let addr = spawn_app().await;
    let client = Client::new();

    // 1. Create a lobby
    let (status, created) = post(
        &client,
        format!("http://{}/api/lobby", addr),
        json!({
            "player_name": "Alice",
            "game_mode": "clockwise",
            "rules_mode": "with",
            "difficulty_setting": "safe"
        }),
    )
    .await;
    assert_eq!(status, 201);
    let lobby_id = created["lobby_id"].as_str().unwrap().to_string();
    let code = created["lobby_code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    // 2. Starting alone is refused
    let (status, body) = post(
        &client,
        format!("http://{}/api/lobby/{}/start", addr, lobby_id),
        json!({}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "At least 2 players are needed to start the game");

    // 3. Bob and Carol join
    for name in ["Bob", "Carol"] {
        let (status, _) = post(
            &client,
            format!("http://{}/api/lobby/{}/join", addr, code),
            json!({ "player_name": name }),
        )
        .await;
        assert_eq!(status, 200);
    }
    let (_, lobby) = get(&client, format!("http://{}/api/lobby/{}", addr, lobby_id)).await;
    assert_eq!(lobby["player_count"], 3);

    // 4. Start the game
    let (status, started) = post(
        &client,
        format!("http://{}/api/lobby/{}/start", addr, lobby_id),
        json!({}),
    )
    .await;
    assert_eq!(status, 200);
    let game_id = started["game_id"].as_str().unwrap().to_string();
    let (status, _) = get(&client, format!("http://{}/api/lobby/{}", addr, lobby_id)).await;
    assert_eq!(status, 404);

    let game_url = format!("http://{}/api/game/{}", addr, game_id);
    let (_, game) = get(&client, game_url.clone()).await;
    assert_eq!(game["current_player"]["name"], "Alice");
    assert_eq!(game["active"], true);

    // 5. Alice passes, Bob passes
    let (status, body) = post(&client, format!("{}/make-choice", game_url), json!({ "choice_type": "pass" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["current_player"], "Bob");
    let (status, _) = post(&client, format!("{}/make-choice", game_url), json!({ "choice_type": "pass" })).await;
    assert_eq!(status, 200);

    // 6. Carol picks truth for Alice
    let (status, body) = post(&client, format!("{}/make-choice", game_url), json!({ "choice_type": "truth" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["to_player"], "Alice");

    let (status, body) = post(&client, format!("{}/submit-task", game_url), json!({ "text": "x".repeat(201) })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Task cannot exceed 200 characters");

    let (status, body) = post(
        &client,
        format!("{}/submit-task", game_url),
        json!({ "text": "What's your biggest fear?" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["from_player"], "Carol");
    assert_eq!(body["content"], "What's your biggest fear?");

    // 7. Alice has no pass left
    let (status, body) = post(&client, format!("{}/make-choice", game_url), json!({ "choice_type": "pass" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "You have already used the maximum number of passes");

    // 8. Random resolves at once
    let (status, body) = post(&client, format!("{}/make-choice", game_url), json!({ "choice_type": "random" })).await;
    assert_eq!(status, 200);
    assert!(body["content"].as_str().is_some());
    assert_eq!(body["current_player_id"], game["players"][1]["id"]);

    let (_, game) = get(&client, game_url.clone()).await;
    assert_eq!(game["history"].as_array().unwrap().len(), 2);
    assert_eq!(game["passes_used"][game["players"][0]["id"].as_str().unwrap()], 1);

    // 9. End the game
    let (status, _) = post(&client, format!("{}/end", game_url), json!({})).await;
    assert_eq!(status, 200);
    let (status, _) = get(&client, game_url).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_anyone_mode_requires_target() {
    let addr = spawn_app().await;
    let client = Client::new();

    let (_, created) = post(
        &client,
        format!("http://{}/api/lobby", addr),
        json!({
            "player_name": "Alice",
            "game_mode": "anyone",
            "rules_mode": "without",
            "difficulty_setting": "all"
        }),
    )
    .await;
    let (_, joined) = post(
        &client,
        format!("http://{}/api/lobby/{}/join", addr, created["lobby_code"].as_str().unwrap()),
        json!({ "player_name": "Bob" }),
    )
    .await;
    let (_, started) = post(
        &client,
        format!("http://{}/api/lobby/{}/start", addr, created["lobby_id"].as_str().unwrap()),
        json!({}),
    )
    .await;
    let game_url = format!("http://{}/api/game/{}", addr, started["game_id"].as_str().unwrap());

    let (status, body) = post(&client, format!("{}/make-choice", game_url), json!({ "choice_type": "dare" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "A target player is required in \"anyone\" mode");

    let (status, body) = post(
        &client,
        format!("{}/make-choice", game_url),
        json!({ "choice_type": "dare", "target_player_id": joined["player_id"] }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["to_player"], "Bob");

    // Submitting is now the only valid move
    let (status, _) = post(&client, format!("{}/make-choice", game_url), json!({ "choice_type": "pass" })).await;
    assert_eq!(status, 400);
}
