// Brazilian tax documents (CPF / CNPJ) and phone numbers: normalization, masks, shape checks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of tax document a client is registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Individual taxpayer id (CPF), 11 digits
    Cpf,
    /// Organization id (CNPJ), 14 digits
    Cnpj,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document is required")]
    Empty,
    #[error("{kind} must have {expected} digits, got {actual}")]
    WrongLength {
        kind: DocumentType,
        expected: usize,
        actual: usize,
    },
    #[error("unknown document type '{0}' (expected cpf or cnpj)")]
    UnknownType(String),
}

impl DocumentType {
    pub fn expected_len(&self) -> usize {
        match self {
            DocumentType::Cpf => 11,
            DocumentType::Cnpj => 14,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Cpf => "CPF",
            DocumentType::Cnpj => "CNPJ",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Cpf => "cpf",
            DocumentType::Cnpj => "cnpj",
        }
    }

    /// Guess the type from a digit count
    pub fn detect(document: &str) -> Option<Self> {
        match digits_only(document).len() {
            11 => Some(DocumentType::Cpf),
            14 => Some(DocumentType::Cnpj),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentType {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpf" | "individual" => Ok(DocumentType::Cpf),
            "cnpj" | "organization" => Ok(DocumentType::Cnpj),
            other => Err(DocumentError::UnknownType(other.to_string())),
        }
    }
}

/// Strip every non-digit character
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Apply the display mask for a document.
///
/// CPF renders as `###.###.###-##`, CNPJ as `##.###.###/####-##`. Input whose
/// digit count does not match the type is returned as given.
pub fn format_document(document: &str, kind: DocumentType) -> String {
    let digits = digits_only(document);
    if digits.len() != kind.expected_len() {
        return document.to_string();
    }
    match kind {
        DocumentType::Cpf => format!(
            "{}.{}.{}-{}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..11]
        ),
        DocumentType::Cnpj => format!(
            "{}.{}.{}/{}-{}",
            &digits[0..2],
            &digits[2..5],
            &digits[5..8],
            &digits[8..12],
            &digits[12..14]
        ),
    }
}

/// Mask a phone number: `(##) #####-####` for mobiles, `(##) ####-####` for landlines
pub fn format_phone(phone: &str) -> String {
    let digits = digits_only(phone);
    match digits.len() {
        11 => format!("({}) {}-{}", &digits[0..2], &digits[2..7], &digits[7..11]),
        10 => format!("({}) {}-{}", &digits[0..2], &digits[2..6], &digits[6..10]),
        _ => phone.to_string(),
    }
}

/// Check the document shape against its declared type, returning the bare digits
pub fn validate_document(document: &str, kind: DocumentType) -> Result<String, DocumentError> {
    let digits = digits_only(document);
    if digits.is_empty() {
        return Err(DocumentError::Empty);
    }
    if digits.len() != kind.expected_len() {
        return Err(DocumentError::WrongLength {
            kind,
            expected: kind.expected_len(),
            actual: digits.len(),
        });
    }
    Ok(digits)
}

/// Phones are stored as 10 or 11 digits (area code included)
pub fn is_valid_phone(phone: &str) -> bool {
    matches!(digits_only(phone).len(), 10 | 11)
}
