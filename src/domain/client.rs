use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::document::{digits_only, DocumentType};
use crate::domain::status::ClientStatus;

/// Role a contact person plays for the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContactRole {
    #[serde(rename = "proprietario")]
    Owner,
    #[serde(rename = "socio")]
    Partner,
    #[default]
    #[serde(rename = "funcionario")]
    Employee,
}

impl ContactRole {
    pub fn label(&self) -> &'static str {
        match self {
            ContactRole::Owner => "Owner",
            ContactRole::Partner => "Partner",
            ContactRole::Employee => "Employee",
        }
    }
}

impl fmt::Display for ContactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContactRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" | "proprietario" => Ok(ContactRole::Owner),
            "partner" | "socio" => Ok(ContactRole::Partner),
            "employee" | "funcionario" | "" => Ok(ContactRole::Employee),
            other => Err(format!(
                "unknown contact role '{other}' (expected owner, partner or employee)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    /// Digits only; masked on display
    #[serde(rename = "whatsapp", default)]
    pub phone: String,
    #[serde(rename = "type", default)]
    pub role: ContactRole,
}

impl Contact {
    pub fn new(name: &str, phone: &str, role: ContactRole) -> Self {
        Self {
            name: name.to_string(),
            phone: phone.to_string(),
            role,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && digits_only(&self.phone).is_empty()
    }
}

/// Parses the CLI shorthand `name:phone[:role]`
impl FromStr for Contact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim();
        let phone = parts
            .next()
            .ok_or_else(|| format!("contact '{s}' must look like name:phone[:role]"))?
            .trim();
        let role = parts.next().unwrap_or_default().parse::<ContactRole>()?;
        Ok(Contact::new(name, phone, role))
    }
}

/// A registered client as stored remotely (`clients` joined with `client_contacts`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub code: String,
    pub document_type: DocumentType,
    pub document: String,
    #[serde(rename = "razao_social", default)]
    pub legal_name: Option<String>,
    #[serde(rename = "nome_fantasia")]
    pub trade_name: String,
    #[serde(rename = "observacao", default)]
    pub note: Option<String>,
    /// Baseline status written at creation; see `ClientView::effective_status`
    pub status: ClientStatus,
    #[serde(rename = "client_contacts", default)]
    pub contacts: Vec<Contact>,
}

/// Editable fields of a client, as filled in by a form or the CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInput {
    pub code: String,
    pub document_type: DocumentType,
    pub document: String,
    pub legal_name: Option<String>,
    pub trade_name: String,
    pub note: String,
    pub contacts: Vec<Contact>,
}

impl Default for ClientInput {
    fn default() -> Self {
        Self {
            code: String::new(),
            document_type: DocumentType::Cnpj,
            document: String::new(),
            legal_name: None,
            trade_name: String::new(),
            note: String::new(),
            contacts: Vec::new(),
        }
    }
}

impl ClientInput {
    pub fn from_client(client: &Client) -> Self {
        Self {
            code: client.code.clone(),
            document_type: client.document_type,
            document: client.document.clone(),
            legal_name: client.legal_name.clone(),
            trade_name: client.trade_name.clone(),
            note: client.note.clone().unwrap_or_default(),
            contacts: client.contacts.clone(),
        }
    }

    /// Canonical form sent to the remote service: trimmed text, digit-only
    /// document and phones, blank contacts dropped, no legal name for individuals.
    pub fn normalized(&self) -> Self {
        let legal_name = match self.document_type {
            DocumentType::Cpf => None,
            DocumentType::Cnpj => self
                .legal_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        };

        Self {
            code: self.code.trim().to_string(),
            document_type: self.document_type,
            document: digits_only(&self.document),
            legal_name,
            trade_name: self.trade_name.trim().to_string(),
            note: self.note.trim().to_string(),
            contacts: self
                .contacts
                .iter()
                .filter(|contact| !contact.is_blank())
                .map(|contact| Contact {
                    name: contact.name.trim().to_string(),
                    phone: digits_only(&contact.phone),
                    role: contact.role,
                })
                .collect(),
        }
    }
}

/// Row body for inserting or updating a client
#[derive(Debug, Clone, Serialize)]
pub struct ClientPayload {
    pub code: String,
    pub document_type: DocumentType,
    pub document: String,
    pub razao_social: Option<String>,
    pub nome_fantasia: String,
    pub observacao: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ClientStatus>,
}

impl ClientPayload {
    pub fn from_input(input: &ClientInput, status: Option<ClientStatus>) -> Self {
        Self {
            code: input.code.clone(),
            document_type: input.document_type,
            document: input.document.clone(),
            razao_social: input.legal_name.clone(),
            nome_fantasia: input.trade_name.clone(),
            observacao: input.note.clone(),
            status,
        }
    }
}

/// Row body for `client_contacts`
#[derive(Debug, Clone, Serialize)]
pub struct ContactPayload<'a> {
    pub client_id: Uuid,
    pub name: &'a str,
    pub whatsapp: &'a str,
    #[serde(rename = "type")]
    pub role: ContactRole,
}

impl<'a> ContactPayload<'a> {
    pub fn new(client_id: Uuid, contact: &'a Contact) -> Self {
        Self {
            client_id,
            name: &contact.name,
            whatsapp: &contact.phone,
            role: contact.role,
        }
    }
}
