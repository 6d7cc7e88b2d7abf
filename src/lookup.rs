// Public CNPJ registry lookup used to pre-fill client names

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ClientBoardConfig;
use crate::document::{validate_document, DocumentType};
use crate::domain::ClientInput;
use crate::errors::{LookupError, RemoteError};
use crate::notice::Notice;
use crate::observability::remote_metrics;
use crate::remote::RateLimitedHttpClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub legal_name: String,
    pub trade_name: String,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DocumentLookup: Send + Sync {
    /// `cnpj` is the bare 14-digit number
    async fn lookup(&self, cnpj: &str) -> Result<LookupResult, LookupError>;
}

#[derive(Debug, Deserialize)]
struct CnpjWsResponse {
    #[serde(default)]
    status: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    razao_social: Option<String>,
    #[serde(default)]
    estabelecimento: Option<Establishment>,
}

#[derive(Debug, Deserialize)]
struct Establishment {
    #[serde(default)]
    nome_fantasia: Option<String>,
}

/// `publica.cnpj.ws` client with a TTL cache of successful answers
#[derive(Debug, Clone)]
pub struct CnpjWsLookup {
    http: RateLimitedHttpClient,
    base_url: String,
    cache: Cache<String, LookupResult>,
}

impl CnpjWsLookup {
    pub fn new(
        base_url: &str,
        http: RateLimitedHttpClient,
        cache_ttl: Duration,
        cache_capacity: u64,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(cache_capacity)
            .time_to_live(cache_ttl)
            .build();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    pub fn from_config(config: &ClientBoardConfig) -> Result<Self, RemoteError> {
        let http = RateLimitedHttpClient::new(
            Duration::from_secs(config.lookup.timeout_seconds),
            &config.retry,
            &config.rate_limit,
        )?;
        Ok(Self::new(
            &config.lookup.base_url,
            http,
            Duration::from_secs(config.lookup.cache_ttl_seconds),
            config.lookup.cache_capacity,
        ))
    }

    async fn fetch(&self, cnpj: &str) -> Result<LookupResult, LookupError> {
        let url = format!("{}/cnpj/{}", self.base_url, cnpj);
        let response = self
            .http
            .acquire()
            .await
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::Request(e.to_string()))?;

        let status = response.status();
        let body: Option<CnpjWsResponse> = response.json().await.ok();

        if !status.is_success() {
            remote_metrics().record_error();
            let message = body
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(LookupError::Rejected(message));
        }

        let body = body.ok_or_else(|| LookupError::Request("unreadable response".to_string()))?;
        let errored = body
            .status
            .as_ref()
            .and_then(|s| s.as_str())
            .is_some_and(|s| s.eq_ignore_ascii_case("error"));
        if errored {
            return Err(LookupError::Rejected(
                body.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let legal_name = body
            .razao_social
            .ok_or_else(|| LookupError::Request("response has no legal name".to_string()))?;
        let trade_name = body
            .estabelecimento
            .and_then(|e| e.nome_fantasia)
            .unwrap_or_default();

        Ok(LookupResult {
            legal_name,
            trade_name,
        })
    }
}

#[async_trait]
impl DocumentLookup for CnpjWsLookup {
    async fn lookup(&self, cnpj: &str) -> Result<LookupResult, LookupError> {
        if let Some(hit) = self.cache.get(cnpj).await {
            remote_metrics().record_cache_hit();
            debug!(cnpj, "Lookup served from cache");
            return Ok(hit);
        }
        remote_metrics().record_cache_miss();

        let result = self.fetch(cnpj).await?;
        self.cache.insert(cnpj.to_string(), result.clone()).await;
        info!(cnpj, "CNPJ lookup succeeded");
        Ok(result)
    }
}

impl ClientInput {
    /// Overwrite both names with a lookup answer
    pub fn apply_lookup(&mut self, result: &LookupResult) {
        self.legal_name = Some(result.legal_name.clone());
        self.trade_name = result.trade_name.clone();
    }
}

/// Look up the input's CNPJ and fill its names.
///
/// Any failure leaves `input` untouched and comes back as an error notice.
pub async fn fill_from_lookup(lookup: &dyn DocumentLookup, input: &mut ClientInput) -> Notice {
    if input.document_type != DocumentType::Cnpj {
        return Notice::error(LookupError::NotOrganization.to_string());
    }
    let digits = match validate_document(&input.document, DocumentType::Cnpj) {
        Ok(digits) => digits,
        Err(err) => return Notice::error(err.to_string()),
    };

    match lookup.lookup(&digits).await {
        Ok(result) => {
            input.apply_lookup(&result);
            Notice::success(format!("Found {}", result.legal_name))
        }
        Err(err) => Notice::error(format!(
            "{err}. Check the number and try again."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn cnpj_input() -> ClientInput {
        ClientInput {
            code: "C-001".to_string(),
            document_type: DocumentType::Cnpj,
            document: "11.222.333/0001-81".to_string(),
            trade_name: "typed by hand".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn success_overwrites_both_names() {
        let mut lookup = MockDocumentLookup::new();
        lookup
            .expect_lookup()
            .with(eq("11222333000181"))
            .times(1)
            .returning(|_| {
                Ok(LookupResult {
                    legal_name: "Empresa Teste LTDA".to_string(),
                    trade_name: "Teste".to_string(),
                })
            });

        let mut input = cnpj_input();
        let notice = fill_from_lookup(&lookup, &mut input).await;

        assert!(!notice.is_error());
        assert_eq!(input.legal_name.as_deref(), Some("Empresa Teste LTDA"));
        assert_eq!(input.trade_name, "Teste");
    }

    #[tokio::test]
    async fn failure_leaves_input_untouched() {
        let mut lookup = MockDocumentLookup::new();
        lookup
            .expect_lookup()
            .returning(|_| Err(LookupError::Rejected("CNPJ inválido".to_string())));

        let mut input = cnpj_input();
        let before = input.clone();
        let notice = fill_from_lookup(&lookup, &mut input).await;

        assert!(notice.is_error());
        assert_eq!(input, before);
    }

    #[tokio::test]
    async fn individuals_are_not_looked_up() {
        let mut lookup = MockDocumentLookup::new();
        lookup.expect_lookup().never();

        let mut input = ClientInput {
            document_type: DocumentType::Cpf,
            document: "52998224725".to_string(),
            ..Default::default()
        };
        let notice = fill_from_lookup(&lookup, &mut input).await;
        assert!(notice.is_error());
    }
}
