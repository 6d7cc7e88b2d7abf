use uuid::Uuid;

use super::AppContext;
use crate::auth::Route;
use crate::cli::ClientArgs;
use crate::document::{format_document, format_phone, DocumentType};
use crate::domain::{ClientInput, ClientStatus, ClientView};
use crate::errors::AppError;
use crate::lookup::fill_from_lookup;
use crate::registry::{status_menu, ClientFilter, ClientRegistry};
use crate::workflow::Workflow;

impl ClientArgs {
    /// Overlay the given flags on `input`; contacts are replaced only when at
    /// least one `--contact` was passed
    pub fn apply_to(&self, input: &mut ClientInput) {
        if let Some(code) = &self.code {
            input.code = code.clone();
        }
        if let Some(document) = &self.document {
            input.document = document.clone();
            if self.document_type.is_none() {
                if let Some(detected) = DocumentType::detect(document) {
                    input.document_type = detected;
                }
            }
        }
        if let Some(kind) = self.document_type {
            input.document_type = kind;
        }
        if let Some(legal_name) = &self.legal_name {
            input.legal_name = Some(legal_name.clone());
        }
        if let Some(trade_name) = &self.trade_name {
            input.trade_name = trade_name.clone();
        }
        if let Some(note) = &self.note {
            input.note = note.clone();
        }
        if !self.contacts.is_empty() {
            input.contacts = self.contacts.clone();
        }
    }
}

async fn lookup_names(ctx: &AppContext, input: &mut ClientInput) {
    println!("🔍 Looking up {}...", format_document(&input.document, DocumentType::Cnpj));
    let notice = fill_from_lookup(ctx.lookup(), input).await;
    println!("   {notice}");
}

fn print_row(view: &ClientView) {
    let client = &view.client;
    let status = view.effective_status();
    println!(
        "{} {:<10} {:<32} {} {}",
        status.emoji(),
        client.code,
        client.trade_name,
        client.document_type.label(),
        format_document(&client.document, client.document_type)
    );
    println!("     🆔 {}  ({})", client.id, status.label());
}

fn print_details(view: &ClientView) {
    let client = &view.client;
    let status = view.effective_status();
    println!("🏢 {} - {}", client.code, client.trade_name);
    println!("{}", "=".repeat(client.code.chars().count() + client.trade_name.chars().count() + 5));
    println!("   🆔 {}", client.id);
    println!(
        "   📄 {}: {}",
        client.document_type.label(),
        format_document(&client.document, client.document_type)
    );
    if let Some(legal_name) = client.legal_name.as_deref().filter(|n| !n.is_empty()) {
        println!("   🏛️  Legal name: {legal_name}");
    }
    println!("   {} Status: {}", status.emoji(), status.label());
    if let Some(approval) = &view.approval {
        if let Some(by) = &approval.approved_by {
            let at = approval
                .approved_at
                .map(|at| at.format(" on %Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!("   ✅ Released by {by}{at}");
        }
    }
    if let Some(note) = client.note.as_deref().filter(|n| !n.is_empty()) {
        println!("   📝 {note}");
    }

    println!();
    if client.contacts.is_empty() {
        println!("📇 No contacts");
    } else {
        println!("📇 CONTACTS:");
        for contact in &client.contacts {
            println!(
                "   • {} ({}) {}",
                contact.name,
                contact.role,
                format_phone(&contact.phone)
            );
        }
    }
}

pub struct ListCommand {
    filter: ClientFilter,
}

impl ListCommand {
    pub fn new() -> Self {
        Self {
            filter: ClientFilter::default(),
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.filter.search = search;
        self
    }

    pub fn with_status(mut self, status: Option<ClientStatus>) -> Self {
        self.filter.status = status;
        self
    }

    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        let signed_in = ctx.signed_in(Route::Clients).await?;
        let views = ClientRegistry::new(signed_in.store).list(&self.filter).await?;

        println!("🏢 CLIENTS ({})", views.len());
        println!("===========");
        if views.is_empty() {
            println!("📋 No clients match");
            println!("   💡 Register one with: client-board clients add --code C-001 --document ...");
            return Ok(());
        }
        for view in &views {
            print_row(view);
        }
        Ok(())
    }
}

impl Default for ListCommand {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ShowCommand {
    id: Uuid,
}

impl ShowCommand {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }

    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        let signed_in = ctx.signed_in(Route::Clients).await?;
        let store = signed_in.store.clone();
        let registry = ClientRegistry::new(signed_in.store);
        let (view, edges) = tokio::try_join!(registry.get(self.id), async {
            store.list_workflow().await.map_err(AppError::from)
        })?;

        print_details(&view);

        let menu = status_menu(&view, &Workflow::from_edges(edges));
        if !menu.is_empty() {
            println!();
            println!("🔀 STATUS OPTIONS:");
            for target in menu {
                println!(
                    "   {} {:<8} client-board clients status {} {} --yes",
                    target.emoji(),
                    target.action_label(),
                    view.client.id,
                    target
                );
            }
        }
        Ok(())
    }
}

pub struct AddCommand {
    fields: ClientArgs,
}

impl AddCommand {
    pub fn new(fields: ClientArgs) -> Self {
        Self { fields }
    }

    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        let signed_in = ctx.signed_in(Route::Clients).await?;

        let mut input = ClientInput::default();
        self.fields.apply_to(&mut input);
        if self.fields.lookup {
            lookup_names(ctx, &mut input).await;
        }

        let client = ClientRegistry::new(signed_in.store).create(&input).await?;
        println!("✅ Client {} registered", client.code);
        println!("   🆔 {}", client.id);
        println!("   🟢 Status: {}", client.status.label());
        Ok(())
    }
}

pub struct EditCommand {
    id: Uuid,
    fields: ClientArgs,
    clear_contacts: bool,
}

impl EditCommand {
    pub fn new(id: Uuid, fields: ClientArgs) -> Self {
        Self {
            id,
            fields,
            clear_contacts: false,
        }
    }

    pub fn with_clear_contacts(mut self, clear: bool) -> Self {
        self.clear_contacts = clear;
        self
    }

    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        let signed_in = ctx.signed_in(Route::Clients).await?;
        let registry = ClientRegistry::new(signed_in.store);
        let current = registry.get(self.id).await?;

        let mut input = ClientInput::from_client(&current.client);
        if self.clear_contacts {
            input.contacts.clear();
        }
        self.fields.apply_to(&mut input);
        if self.fields.lookup {
            lookup_names(ctx, &mut input).await;
        }

        let client = registry.update(self.id, &input).await?;
        println!("✅ Client {} updated", client.code);
        println!("   📇 {} contact(s)", client.contacts.len());
        Ok(())
    }
}

pub struct DeleteCommand {
    id: Uuid,
    confirmed: bool,
}

impl DeleteCommand {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            confirmed: false,
        }
    }

    pub fn with_confirmation(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        let signed_in = ctx.signed_in(Route::Clients).await?;
        let registry = ClientRegistry::new(signed_in.store);
        let view = registry.get(self.id).await?;

        if !self.confirmed {
            println!(
                "⚠️  This deletes {} - {} and all of its contacts",
                view.client.code, view.client.trade_name
            );
            println!("   → Re-run with --yes to confirm");
            return Ok(());
        }

        registry.delete(self.id).await?;
        println!("🗑️  Client {} deleted", view.client.code);
        Ok(())
    }
}

pub struct StatusCommand {
    id: Uuid,
    target: ClientStatus,
    confirmed: bool,
}

impl StatusCommand {
    pub fn new(id: Uuid, target: ClientStatus) -> Self {
        Self {
            id,
            target,
            confirmed: false,
        }
    }

    pub fn with_confirmation(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        let signed_in = ctx.signed_in(Route::Clients).await?;
        let registry = ClientRegistry::new(signed_in.store.clone());

        if !self.confirmed {
            let view = registry.get(self.id).await?;
            println!(
                "⚠️  {} {} ({} → {})?",
                self.target.action_label(),
                view.client.trade_name,
                view.effective_status(),
                self.target
            );
            println!("   → Re-run with --yes to confirm");
            return Ok(());
        }

        let actor = ctx.actor_name(&signed_in).await;
        let view = registry.change_status(self.id, self.target, &actor).await?;
        println!(
            "{} {} is now {}",
            view.effective_status().emoji(),
            view.client.trade_name,
            view.effective_status().label()
        );
        Ok(())
    }
}
