// Public CNPJ lookup against a mock registry

use std::sync::Arc;
use std::time::Duration;

use client_board::config::{RateLimitConfig, RetryConfig};
use client_board::domain::{ClientInput, DocumentType};
use client_board::errors::LookupError;
use client_board::lookup::{fill_from_lookup, CnpjWsLookup, DocumentLookup};
use client_board::registry::{ClientFilter, ClientRegistry};
use client_board::remote::{MemoryBackend, RateLimitedHttpClient};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn lookup(server: &MockServer) -> CnpjWsLookup {
    let http = RateLimitedHttpClient::new(
        Duration::from_secs(5),
        &RetryConfig {
            max_attempts: 1,
            base_delay_ms: 5,
            max_delay_ms: 10,
        },
        &RateLimitConfig {
            requests_per_second: 100,
            burst_capacity: 100,
        },
    )
    .unwrap();
    CnpjWsLookup::new(&server.uri(), http, Duration::from_secs(60), 16)
}

#[tokio::test]
async fn returns_legal_and_trade_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "razao_social": "Empresa Teste LTDA",
            "estabelecimento": { "nome_fantasia": "Teste" }
        })))
        .mount(&server)
        .await;

    let result = lookup(&server).lookup("11222333000181").await.unwrap();
    assert_eq!(result.legal_name, "Empresa Teste LTDA");
    assert_eq!(result.trade_name, "Teste");
}

#[tokio::test]
async fn missing_trade_name_becomes_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "razao_social": "Empresa Teste LTDA",
            "estabelecimento": { "nome_fantasia": null }
        })))
        .mount(&server)
        .await;

    let result = lookup(&server).lookup("11222333000181").await.unwrap();
    assert_eq!(result.trade_name, "");
}

#[tokio::test]
async fn error_status_in_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ERROR",
            "message": "CNPJ inválido"
        })))
        .mount(&server)
        .await;

    let err = lookup(&server).lookup("11222333000181").await.unwrap_err();
    match err {
        LookupError::Rejected(message) => assert_eq!(message, "CNPJ inválido"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn not_found_is_rejected_with_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": 404,
            "message": "CNPJ não encontrado"
        })))
        .mount(&server)
        .await;

    let err = lookup(&server).lookup("11222333000181").await.unwrap_err();
    assert!(matches!(err, LookupError::Rejected(ref m) if m == "CNPJ não encontrado"));
}

#[tokio::test]
async fn answers_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "razao_social": "Empresa Teste LTDA",
            "estabelecimento": { "nome_fantasia": "Teste" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = lookup(&server);
    lookup.lookup("11222333000181").await.unwrap();
    lookup.lookup("11222333000181").await.unwrap();
}

#[tokio::test]
async fn form_is_filled_from_masked_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "razao_social": "Empresa Teste LTDA",
            "estabelecimento": { "nome_fantasia": "Teste" }
        })))
        .mount(&server)
        .await;

    let mut input = ClientInput {
        code: "C-001".to_string(),
        document_type: DocumentType::Cnpj,
        document: "11.222.333/0001-81".to_string(),
        ..Default::default()
    };
    let notice = fill_from_lookup(&lookup(&server), &mut input).await;

    assert!(!notice.is_error(), "{notice}");
    assert_eq!(input.legal_name.as_deref(), Some("Empresa Teste LTDA"));
    assert_eq!(input.trade_name, "Teste");
}

#[tokio::test]
async fn looked_up_client_is_saved_and_found_by_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cnpj/11222333000181"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "razao_social": "Empresa Teste LTDA",
            "estabelecimento": { "nome_fantasia": "Teste" }
        })))
        .mount(&server)
        .await;

    let mut input = ClientInput {
        code: "C-100".to_string(),
        document_type: DocumentType::Cnpj,
        document: "11222333000181".to_string(),
        ..Default::default()
    };
    assert!(!fill_from_lookup(&lookup(&server), &mut input).await.is_error());

    let registry = ClientRegistry::new(Arc::new(MemoryBackend::new()));
    registry.create(&input).await.unwrap();

    let filter = ClientFilter {
        search: Some("c-100".to_string()),
        status: None,
    };
    let views = registry.list(&filter).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].client.legal_name.as_deref(), Some("Empresa Teste LTDA"));
    assert_eq!(views[0].client.trade_name, "Teste");
}
