// Signaling Server CLI Validation Tool
// Drives the wire protocol end to end: room creation, viewer joins,
// scripted validation scenarios and an interactive message console.

use clap::{Parser, Subcommand};
use colored::*;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::io::{self, Write};
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser)]
#[command(name = "signaling-cli")]
#[command(about = "Signaling Server CLI Validation Tool", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:8080)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// Get server configuration
    Config,

    /// List rooms known to the server
    Rooms,

    /// Delete a room by code
    DeleteRoom {
        /// Room code to delete
        #[arg(short, long)]
        room_code: String,
    },

    /// Test WebSocket connection
    Connect,

    /// Create a room as sharer
    Share {
        /// Keep connection alive (press Ctrl+C to exit)
        #[arg(short, long)]
        keep_alive: bool,
    },

    /// Join a room as viewer
    Watch {
        /// Room code to join
        #[arg(short, long)]
        room_code: String,
    },

    /// Run automated validation scenarios
    Validate {
        /// Run all validation tests
        #[arg(short, long)]
        all: bool,

        /// Test specific scenario
        #[arg(short, long)]
        scenario: Option<String>,
    },

    /// Interactive mode - send custom messages
    Interactive,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => {
            check_health(&cli.server).await;
        }
        Commands::Config => {
            check_config(&cli.server).await;
        }
        Commands::Rooms => {
            list_rooms(&cli.server).await;
        }
        Commands::DeleteRoom { room_code } => {
            delete_room(&cli.server, room_code).await;
        }
        Commands::Connect => {
            test_connection(&cli.server).await;
        }
        Commands::Share { keep_alive } => {
            share(&cli.server, *keep_alive).await;
        }
        Commands::Watch { room_code } => {
            watch(&cli.server, room_code).await;
        }
        Commands::Validate { all, scenario } => {
            if *all {
                run_all_validations(&cli.server).await;
            } else if let Some(s) = scenario {
                run_scenario(&cli.server, s).await;
            } else {
                println!("{}", "Use --all or --scenario <name>".yellow());
                list_scenarios();
            }
        }
        Commands::Interactive => {
            interactive_mode(&cli.server).await;
        }
    }
}

async fn check_health(server: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = format!("http://{}/health", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn check_config(server: &str) {
    println!("{}", "Fetching server configuration...".cyan());

    let url = format!("http://{}/config", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                println!("{} Config endpoint accessible", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("\nConfiguration:");
                    match serde_json::to_string_pretty(&body) {
                        Ok(pretty) => println!("{}", pretty),
                        Err(_) => println!("{}", body),
                    }
                }
            } else {
                println!("{} Config fetch failed: {}", "✗".red(), resp.status());
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn list_rooms(server: &str) {
    println!("{}", "Fetching room list...".cyan());

    let url = format!("http://{}/rooms", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            if !resp.status().is_success() {
                println!("{} Room listing failed: {}", "✗".red(), resp.status());
                return;
            }

            match resp.json::<serde_json::Value>().await {
                Ok(body) => {
                    let rooms = body.as_array().cloned().unwrap_or_default();
                    println!("{} {} room(s)", "✓".green(), rooms.len());
                    for room in rooms {
                        let code = room["room_code"].as_str().unwrap_or("??????");
                        let active = room["is_active"].as_bool().unwrap_or(false);
                        let viewers = room["viewer_count"].as_u64().unwrap_or(0);
                        let marker = if active { "●".green() } else { "○".yellow() };
                        println!("  {} {}  viewers: {}", marker, code.bold(), viewers);
                    }
                }
                Err(e) => {
                    println!("{} Could not parse room list: {}", "✗".red(), e);
                }
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn delete_room(server: &str, room_code: &str) {
    println!("{}", "Deleting room...".cyan());

    let url = format!("http://{}/rooms/{}", server, room_code);
    let client = reqwest::Client::new();

    match client.delete(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                println!("{} Room {} deleted", "✓".green(), room_code.bold());
            } else {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                println!("{} Delete failed ({}): {}", "✗".red(), status, body);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn test_connection(server: &str) {
    println!("{}", "Testing WebSocket connection...".cyan());

    let url = format!("ws://{}/signal", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} WebSocket connection established", "✓".green());
            println!("  URL: {}", url);
            drop(ws_stream);
            println!("{} Connection closed cleanly", "✓".green());
        }
        Err(e) => {
            println!("{} WebSocket connection failed: {}", "✗".red(), e);
        }
    }
}

async fn share(server: &str, keep_alive: bool) {
    println!("{}", "Creating room as sharer...".cyan());

    let url = format!("ws://{}/signal", server);

    let (ws_stream, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    let msg = json!({ "type": "create_room" });
    if write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send create_room message", "✗".red());
        return;
    }

    let room_code = match timeout(Duration::from_secs(5), read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(response) if response["type"] == "room_created" => {
                    let code = response["room_code"].as_str().unwrap_or("unknown").to_string();
                    println!("{} Room created successfully!", "✓".green());
                    println!("\n{}", "═".repeat(50).green());
                    println!("{} {}", "Room Code:".bold(), code.green().bold());
                    println!("{}", "═".repeat(50).green());
                    Some(code)
                }
                Ok(response) => {
                    println!("{} Unexpected response: {}", "✗".yellow(), response["type"]);
                    println!("{}", text);
                    None
                }
                Err(_) => None,
            }
        }
        Ok(Some(Ok(msg))) => {
            println!("{} Unexpected message type: {:?}", "✗".yellow(), msg);
            None
        }
        Ok(Some(Err(e))) => {
            println!("{} Error receiving message: {}", "✗".red(), e);
            None
        }
        Ok(None) => {
            println!("{} Connection closed by server", "✗".red());
            None
        }
        Err(_) => {
            println!("{} Timeout waiting for response", "✗".red());
            None
        }
    };

    let Some(room_code) = room_code else { return };

    if keep_alive {
        println!("\n{}", "Connection is being kept alive...".yellow());
        println!("Viewers can now join room: {}", room_code.green().bold());
        println!("Press {} to disconnect and deactivate the room.", "Ctrl+C".bold());

        loop {
            match timeout(Duration::from_secs(10), read.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => {
                    println!("{} {}", "◀".green(), text.bright_white());
                }
                Ok(Some(Ok(Message::Close(_)))) => {
                    println!("{} Server closed the connection", "✗".yellow());
                    break;
                }
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(e))) => {
                    println!("{} Connection error: {}", "✗".red(), e);
                    break;
                }
                Ok(None) => {
                    println!("{} Connection closed", "✗".yellow());
                    break;
                }
                Err(_) => {
                    // Heartbeat so the liveness sweeper leaves us alone
                    let ping = json!({ "type": "ping" });
                    if write.send(Message::Text(ping.to_string())).await.is_err() {
                        println!("{} Connection lost", "✗".red());
                        break;
                    }
                }
            }
        }
    } else {
        println!("\n{}", "⚠ Note: Connection closed. Room will deactivate.".yellow());
        println!("Use {} to keep the room active.", "--keep-alive".cyan());
    }
}

async fn watch(server: &str, room_code: &str) {
    println!("{}", "Joining room as viewer...".cyan());
    println!("  Room Code: {}", room_code);

    let url = format!("ws://{}/signal", server);

    let (ws_stream, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Cannot connect: {}", "✗".red(), e);
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    let msg = json!({
        "type": "join",
        "room_code": room_code,
        "role": "viewer",
    });
    if write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send join message", "✗".red());
        return;
    }

    println!("{} Join message sent, waiting for the server...", "✓".green());

    // The join may be queued while the server waits for a sharer, so
    // allow for the full wait window plus slack.
    match timeout(Duration::from_secs(10), read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(response) => match response["type"].as_str() {
                    Some("joined") => {
                        println!("{} Joined room {}", "✓".green(), room_code.bold());
                        println!("  Session: {}", response["session_id"]);
                        println!("  The server now expects an SDP offer from this viewer.");
                    }
                    Some("error") => {
                        println!(
                            "{} Join failed [{}]: {}",
                            "✗".red(),
                            response["kind"].as_str().unwrap_or("unknown"),
                            response["message"].as_str().unwrap_or("")
                        );
                    }
                    _ => {
                        println!("Response: {}", text);
                    }
                },
                Err(_) => println!("Response: {}", text),
            }
        }
        Ok(Some(Ok(msg))) => {
            println!("Received: {:?}", msg);
        }
        Ok(Some(Err(e))) => {
            println!("{} Error: {}", "✗".red(), e);
        }
        Ok(None) => {
            println!("{} Connection closed", "✗".red());
        }
        Err(_) => {
            println!("{} Timeout", "✗".red());
        }
    }
}

fn list_scenarios() {
    println!("\n{}", "Available Validation Scenarios:".bold());
    println!("  {} - Basic WebSocket connection test", "connection".cyan());
    println!("  {} - Room creation flow", "create-room".cyan());
    println!("  {} - Viewer join with live sharer", "join-room".cyan());
    println!("  {} - Viewer join with no sharer (bounded failure)", "no-sharer".cyan());
    println!("  {} - Unknown room join (immediate rejection)", "invalid-room".cyan());
    println!("  {} - Admin room listing", "room-listing".cyan());
    println!("\nExample: signaling-cli validate --scenario connection");
}

async fn run_scenario(server: &str, scenario: &str) {
    println!("\n{} {}", "Running scenario:".bold(), scenario.cyan());
    println!("{}", "─".repeat(60));

    let result = match scenario {
        "connection" => validate_connection(server).await,
        "create-room" => validate_create_room(server).await,
        "join-room" => validate_join_room(server).await,
        "no-sharer" => validate_no_sharer(server).await,
        "invalid-room" => validate_invalid_room(server).await,
        "room-listing" => validate_room_listing(server).await,
        _ => {
            println!("{} Unknown scenario: {}", "✗".red(), scenario);
            list_scenarios();
            return;
        }
    };

    if result {
        println!("\n{} Scenario passed", "✓".green().bold());
    } else {
        println!("\n{} Scenario failed", "✗".red().bold());
    }
}

async fn run_all_validations(server: &str) {
    println!("\n{}", "Running All Validation Tests".bold().green());
    println!("{}\n", "═".repeat(60).green());

    let scenarios = vec![
        "connection",
        "create-room",
        "join-room",
        "no-sharer",
        "invalid-room",
        "room-listing",
    ];

    let mut passed = 0;
    let mut failed = 0;

    for scenario in scenarios {
        println!("\n{} Testing: {}", "▶".cyan(), scenario.bold());
        println!("{}", "─".repeat(60));

        let result = match scenario {
            "connection" => validate_connection(server).await,
            "create-room" => validate_create_room(server).await,
            "join-room" => validate_join_room(server).await,
            "no-sharer" => validate_no_sharer(server).await,
            "invalid-room" => validate_invalid_room(server).await,
            "room-listing" => validate_room_listing(server).await,
            _ => false,
        };

        if result {
            passed += 1;
        } else {
            failed += 1;
        }

        sleep(Duration::from_millis(500)).await;
    }

    println!("\n{}", "═".repeat(60).green());
    println!("{}", "Validation Summary".bold());
    println!("{}", "═".repeat(60).green());
    println!("  {} Passed: {}", "✓".green(), passed.to_string().green());
    println!("  {} Failed: {}", "✗".red(), failed.to_string().red());
    println!("  Total: {}", passed + failed);

    if failed == 0 {
        println!("\n{}", "All validations passed! 🎉".green().bold());
    } else {
        println!("\n{}", "Some validations failed. Check output above.".yellow());
    }
}

async fn validate_connection(server: &str) -> bool {
    let url = format!("ws://{}/signal", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} WebSocket connection successful", "✓".green());
            drop(ws_stream);
            true
        }
        Err(e) => {
            println!("{} Connection failed: {}", "✗".red(), e);
            false
        }
    }
}

/// Connect as sharer and wait for the room_created reply. Returns the
/// open connection so callers can keep the room active.
async fn create_room_connection(
    server: &str,
) -> Option<(
    futures::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        Message,
    >,
    futures::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    >,
    String,
)> {
    let url = format!("ws://{}/signal", server);

    let (ws_stream, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Sharer connection failed: {}", "✗".red(), e);
            return None;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    let msg = json!({ "type": "create_room" });
    if write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send create_room message", "✗".red());
        return None;
    }

    match timeout(Duration::from_secs(3), read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            if let Ok(response) = serde_json::from_str::<serde_json::Value>(&text) {
                if response["type"] == "room_created" {
                    if let Some(code) = response["room_code"].as_str() {
                        return Some((write, read, code.to_string()));
                    }
                }
                println!("{} Unexpected response: {}", "✗".yellow(), text);
            }
            None
        }
        _ => {
            println!("{} No response received for create_room", "✗".red());
            None
        }
    }
}

async fn validate_create_room(server: &str) -> bool {
    match create_room_connection(server).await {
        Some((_write, _read, room_code)) => {
            println!("{} Room created: {}", "✓".green(), room_code);
            room_code.len() == 6
        }
        None => false,
    }
}

async fn validate_join_room(server: &str) -> bool {
    println!("  Step 1: Creating room (sharer connects)...");

    let Some((_sharer_write, mut sharer_read, room_code)) =
        create_room_connection(server).await
    else {
        return false;
    };
    println!("  {} Room created: {}", "✓".green(), room_code);

    println!("  Step 2: Viewer joining room...");
    let url = format!("ws://{}/signal", server);

    let (viewer_stream, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Viewer connection failed: {}", "✗".red(), e);
            return false;
        }
    };
    let (mut viewer_write, mut viewer_read) = viewer_stream.split();

    let msg = json!({
        "type": "join",
        "room_code": room_code,
        "role": "viewer",
    });
    if viewer_write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send join message", "✗".red());
        return false;
    }

    let joined = match timeout(Duration::from_secs(3), viewer_read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            if let Ok(response) = serde_json::from_str::<serde_json::Value>(&text) {
                if response["type"] == "joined" {
                    println!("{} Viewer joined successfully", "✓".green());
                    true
                } else {
                    println!("{} Unexpected response: {}", "✗".yellow(), text);
                    false
                }
            } else {
                false
            }
        }
        _ => {
            println!("{} No response received", "✗".red());
            false
        }
    };

    if !joined {
        return false;
    }

    // Step 3: the offer should reach the sharer
    println!("  Step 3: Relaying an SDP offer...");
    let offer = json!({ "type": "offer", "sdp": "v=0 cli-validation-offer" });
    if viewer_write.send(Message::Text(offer.to_string())).await.is_err() {
        println!("{} Failed to send offer", "✗".red());
        return false;
    }

    match timeout(Duration::from_secs(3), sharer_read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            if let Ok(response) = serde_json::from_str::<serde_json::Value>(&text) {
                if response["type"] == "offer" {
                    println!("{} Offer arrived at the sharer", "✓".green());
                    return true;
                }
                println!("{} Unexpected sharer message: {}", "✗".yellow(), text);
            }
            false
        }
        _ => {
            println!("{} Offer never reached the sharer", "✗".red());
            false
        }
    }
}

async fn validate_no_sharer(server: &str) -> bool {
    println!("  Creating a room, then disconnecting its sharer...");

    let Some((write, read, room_code)) = create_room_connection(server).await else {
        return false;
    };
    drop(write);
    drop(read);
    sleep(Duration::from_millis(300)).await;

    println!("  Viewer joining deactivated room {}...", room_code);
    let url = format!("ws://{}/signal", server);

    let (viewer_stream, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Viewer connection failed: {}", "✗".red(), e);
            return false;
        }
    };
    let (mut viewer_write, mut viewer_read) = viewer_stream.split();

    let msg = json!({
        "type": "join",
        "room_code": room_code,
        "role": "viewer",
    });
    if viewer_write.send(Message::Text(msg.to_string())).await.is_err() {
        return false;
    }

    // Wait window (5s default) plus slack: the failure must be definitive
    match timeout(Duration::from_secs(8), viewer_read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            if let Ok(response) = serde_json::from_str::<serde_json::Value>(&text) {
                if response["type"] == "error"
                    && response["kind"] == "sharer_not_available"
                {
                    println!("{} Received sharer_not_available within bounds", "✓".green());
                    return true;
                }
                println!("{} Unexpected response: {}", "✗".yellow(), text);
            }
            false
        }
        _ => {
            println!("{} No bounded failure received", "✗".red());
            false
        }
    }
}

async fn validate_invalid_room(server: &str) -> bool {
    println!("  Attempting to join non-existent room ZZ9999...");

    let url = format!("ws://{}/signal", server);

    let (ws_stream, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Connection failed: {}", "✗".red(), e);
            return false;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    let msg = json!({
        "type": "join",
        "room_code": "ZZ9999",
        "role": "viewer",
    });
    if write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send request", "✗".red());
        return false;
    }

    // Rejection is synchronous, no wait window applies
    match timeout(Duration::from_secs(2), read.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            if let Ok(response) = serde_json::from_str::<serde_json::Value>(&text) {
                if response["type"] == "error" && response["kind"] == "room_not_found" {
                    println!("{} Received immediate room_not_found", "✓".green());
                    return true;
                }
                println!("{} Unexpected response: {}", "✗".yellow(), text);
            }
            false
        }
        _ => {
            println!("{} No response received", "✗".red());
            false
        }
    }
}

async fn validate_room_listing(server: &str) -> bool {
    let Some((_write, _read, room_code)) = create_room_connection(server).await else {
        return false;
    };
    println!("  Room created for listing check: {}", room_code);

    let url = format!("http://{}/rooms", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            if !resp.status().is_success() {
                println!("{} Listing returned: {}", "✗".red(), resp.status());
                return false;
            }
            match resp.json::<serde_json::Value>().await {
                Ok(body) => {
                    let found = body
                        .as_array()
                        .map(|rooms| {
                            rooms
                                .iter()
                                .any(|r| r["room_code"].as_str() == Some(room_code.as_str()))
                        })
                        .unwrap_or(false);
                    if found {
                        println!("{} Created room appears in the listing", "✓".green());
                    } else {
                        println!("{} Created room missing from listing", "✗".red());
                    }
                    found
                }
                Err(e) => {
                    println!("{} Could not parse listing: {}", "✗".red(), e);
                    false
                }
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            false
        }
    }
}

async fn interactive_mode(server: &str) {
    println!("\n{}", "Interactive Mode".bold().green());
    println!("{}", "═".repeat(60).green());
    println!("Type {} for help, {} to quit\n", "help".cyan(), "quit".cyan());

    let url = format!("ws://{}/signal", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} Connected to server", "✓".green());

            let (mut write, mut read) = ws_stream.split();

            // Spawn task to receive messages
            let receive_task = tokio::spawn(async move {
                while let Some(Ok(msg)) = read.next().await {
                    if let Message::Text(text) = msg {
                        println!("\n{} {}", "◀".green(), text.bright_white());
                    }
                }
            });

            // Main input loop
            loop {
                print!("{} ", "►".cyan());
                let _ = io::stdout().flush();

                let mut input = String::new();
                if io::stdin().read_line(&mut input).is_err() {
                    break;
                }

                let input = input.trim();

                if input.is_empty() {
                    continue;
                }

                if input == "quit" || input == "exit" {
                    println!("Goodbye!");
                    break;
                }

                if input == "help" {
                    print_interactive_help();
                    continue;
                }

                // Try to parse as JSON and send
                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(input) {
                    if write.send(Message::Text(parsed.to_string())).await.is_ok() {
                        println!("{} Message sent", "✓".green());
                    } else {
                        println!("{} Failed to send message", "✗".red());
                        break;
                    }
                } else {
                    println!("{} Invalid JSON. Type 'help' for examples.", "✗".yellow());
                }
            }

            receive_task.abort();
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

fn print_interactive_help() {
    println!("\n{}", "Interactive Mode Commands".bold());
    println!("{}", "─".repeat(60));
    println!("Send JSON messages directly to the server.\n");

    println!("{}", "Example Messages:".bold());
    println!("\n{}:", "Create Room (sharer)".cyan());
    println!(r#"  {{"type":"create_room"}}"#);

    println!("\n{}:", "Join Room".cyan());
    println!(r#"  {{"type":"join","room_code":"AB12C3","role":"viewer"}}"#);
    println!(r#"  {{"type":"join","room_code":"AB12C3","role":"sharer"}}"#);

    println!("\n{}:", "Offer (viewer)".cyan());
    println!(r#"  {{"type":"offer","sdp":"v=0 ..."}}"#);

    println!("\n{}:", "Answer (sharer)".cyan());
    println!(r#"  {{"type":"answer","viewer_id":"s-abc123","sdp":"v=0 ..."}}"#);

    println!("\n{}:", "ICE Candidate".cyan());
    println!(r#"  {{"type":"ice","candidate":"candidate:...","sdp_mid":"0","sdp_mline_index":0}}"#);

    println!("\n{}:", "Established / Leave / Ping".cyan());
    println!(r#"  {{"type":"established"}}"#);
    println!(r#"  {{"type":"leave"}}"#);
    println!(r#"  {{"type":"ping"}}"#);

    println!("\n{}: quit, exit", "Commands".bold());
    println!();
}
