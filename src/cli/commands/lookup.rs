use super::AppContext;
use crate::document::{format_document, validate_document, DocumentType};
use crate::errors::AppError;
use crate::validation::ValidationError;

pub struct LookupCommand {
    cnpj: String,
}

impl LookupCommand {
    pub fn new(cnpj: String) -> Self {
        Self { cnpj }
    }

    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        let digits = validate_document(&self.cnpj, DocumentType::Cnpj)
            .map_err(|err| ValidationError::single("document", err.to_string()))?;

        println!(
            "🔍 Looking up CNPJ {}...",
            format_document(&digits, DocumentType::Cnpj)
        );
        let result = ctx.lookup().lookup(&digits).await?;

        println!("🏢 {}", result.legal_name);
        if result.trade_name.is_empty() {
            println!("   🏷️  No trade name registered");
        } else {
            println!("   🏷️  {}", result.trade_name);
        }
        Ok(())
    }
}
