// Command-line behaviour of the client-board binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Binary isolated from the developer's environment and working directory
fn client_board(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("client-board").unwrap();
    cmd.current_dir(dir)
        .env_remove("CLIENT_BOARD_REMOTE__URL")
        .env_remove("CLIENT_BOARD_REMOTE__API_KEY")
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_ANON_KEY")
        .env_remove("RUST_LOG")
        .env("CLIENT_BOARD_SESSION__PATH", dir.join("session.json"));
    cmd
}

fn configured(dir: &Path, url: &str) -> Command {
    let mut cmd = client_board(dir);
    cmd.env("CLIENT_BOARD_REMOTE__URL", url)
        .env("CLIENT_BOARD_REMOTE__API_KEY", "anon-key")
        .env("CLIENT_BOARD_RETRY__MAX_ATTEMPTS", "1");
    cmd
}

fn write_session(dir: &Path, user_id: Uuid) {
    let session = json!({
        "access_token": "jwt-token",
        "refresh_token": "refresh",
        "expires_at": "2999-01-01T00:00:00Z",
        "user": { "id": user_id, "email": "ana@example.com" }
    });
    std::fs::write(dir.join("session.json"), session.to_string()).unwrap();
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    client_board(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("clients"))
        .stdout(predicate::str::contains("board"))
        .stdout(predicate::str::contains("lookup"));
}

#[test]
fn no_subcommand_shows_overview() {
    let dir = tempfile::tempdir().unwrap();
    client_board(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("CLIENT BOARD"))
        .stdout(predicate::str::contains("client-board board show"));
}

#[test]
fn missing_remote_configuration_is_explained() {
    let dir = tempfile::tempdir().unwrap();
    client_board(dir.path())
        .args(["board", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration Error"))
        .stderr(predicate::str::contains("CLIENT_BOARD_REMOTE__URL"));
}

#[test]
fn protected_commands_need_a_session() {
    let dir = tempfile::tempdir().unwrap();
    configured(dir.path(), "http://127.0.0.1:9")
        .args(["clients", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not Signed In"))
        .stderr(predicate::str::contains("client-board login"));
}

#[test]
fn open_redirects_to_sign_in_without_session() {
    let dir = tempfile::tempdir().unwrap();
    configured(dir.path(), "http://127.0.0.1:9")
        .args(["open", "/dashboard/clients"])
        .assert()
        .success()
        .stdout(predicate::str::contains("redirects to /auth"))
        .stdout(predicate::str::contains("client-board login"));
}

#[test]
fn settings_masks_the_api_key() {
    let dir = tempfile::tempdir().unwrap();
    client_board(dir.path())
        .env("CLIENT_BOARD_REMOTE__URL", "https://example.supabase.co")
        .env("CLIENT_BOARD_REMOTE__API_KEY", "abcdefghijklmnop")
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.supabase.co"))
        .stdout(predicate::str::contains("abcd…mnop"))
        .stdout(predicate::str::contains("abcdefghijklmnop").not());
}

#[test]
fn dotenv_file_is_read_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "CLIENT_BOARD_REMOTE__URL=https://dotenv.example.com\n",
    )
    .unwrap();

    client_board(dir.path())
        .args(["--log-level", "info", "settings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://dotenv.example.com"))
        .stderr(predicate::str::contains(
            "Loaded environment variables from .env file",
        ));
}

#[test]
fn invalid_status_argument_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    client_board(dir.path())
        .args(["clients", "list", "--status", "archived"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown status 'archived'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn login_stores_the_session() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-token",
            "refresh_token": "refresh",
            "expires_in": 3600,
            "user": { "id": user_id, "email": "ana@example.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dir_path = dir.path().to_path_buf();
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        configured(&dir_path, &uri)
            .args(["login", "--email", "ana@example.com", "--password", "secret1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Signed in"));
    })
    .await
    .unwrap();

    let stored = std::fs::read_to_string(dir.path().join("session.json")).unwrap();
    assert!(stored.contains("jwt-token"));
}

#[tokio::test(flavor = "multi_thread")]
async fn login_rejection_keeps_service_wording() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dir_path = dir.path().to_path_buf();
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        configured(&dir_path, &uri)
            .args(["login", "--email", "ana@example.com", "--password", "wrong-pass"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid login credentials"));
    })
    .await
    .unwrap();

    assert!(!dir.path().join("session.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn board_show_lists_cards_by_column() {
    let server = MockServer::start().await;
    let client_id = Uuid::new_v4();
    let approval_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_approvals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": approval_id,
            "client_id": client_id,
            "approval_status": "pending",
            "approved_by": null,
            "approved_at": null,
            "clients": {
                "id": client_id,
                "code": "C-042",
                "document_type": "cnpj",
                "document": "11222333000181",
                "razao_social": "Empresa Teste LTDA",
                "nome_fantasia": "Padaria Sol",
                "observacao": null,
                "status": "active",
                "client_contacts": []
            }
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/status_workflow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "current_status": "pending", "next_status": "active" },
            { "current_status": "pending", "next_status": "blocked" }
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_session(dir.path(), Uuid::new_v4());
    let dir_path = dir.path().to_path_buf();
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        configured(&dir_path, &uri)
            .args(["board", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("APPROVAL BOARD"))
            .stdout(predicate::str::contains("To release (1)"))
            .stdout(predicate::str::contains("C-042"))
            .stdout(predicate::str::contains("11.222.333/0001-81"))
            .stdout(predicate::str::contains(approval_id.to_string()));
    })
    .await
    .unwrap();
}
