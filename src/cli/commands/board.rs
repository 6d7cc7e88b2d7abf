use super::AppContext;
use crate::auth::Route;
use crate::cli::BoardAction;
use crate::document::format_document;
use crate::domain::ClientStatus;
use crate::errors::AppError;
use crate::notice::Notice;
use crate::workflow::ApprovalBoard;

pub struct BoardCommand {
    action: BoardAction,
}

impl BoardCommand {
    pub fn new(action: BoardAction) -> Self {
        Self { action }
    }

    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        let signed_in = ctx.signed_in(Route::Board).await?;
        let actor = match self.action {
            BoardAction::Confirm { .. } | BoardAction::Move { .. } => {
                ctx.actor_name(&signed_in).await
            }
            _ => String::new(),
        };

        let mut board = ApprovalBoard::new(signed_in.store, actor);
        board.load().await?;

        let notice = match &self.action {
            BoardAction::Show => {
                print_board(&board);
                return Ok(());
            }
            BoardAction::Release { id } => board.release(*id).await,
            BoardAction::Confirm { id } => board.confirm_release(*id).await,
            BoardAction::Restore { id } => board.restore(*id).await,
            BoardAction::Clear { id } => board.clear(*id).await,
            BoardAction::Move { id, status } => board.move_card(*id, *status).await,
        };
        report(&notice)
    }
}

/// Print a success or info notice; error notices become a failing exit status
fn report(notice: &Notice) -> Result<(), AppError> {
    if notice.is_error() {
        return Err(AppError::Action(notice.message.clone()));
    }
    println!("{notice}");
    Ok(())
}

fn print_board(board: &ApprovalBoard) {
    println!("📋 APPROVAL BOARD");
    println!("=================");

    for column in board.columns() {
        println!();
        let header = format!(
            "{} {} ({})",
            column.status.emoji(),
            column.title(),
            column.cards.len()
        );
        println!("{header}");
        println!("{}", "─".repeat(header.chars().count()));
        if column.cards.is_empty() {
            println!("   (empty)");
            continue;
        }
        for card in &column.cards {
            let client = &card.client;
            println!(
                "   • {:<10} {:<32} {}",
                client.code,
                client.trade_name,
                format_document(&client.document, client.document_type)
            );
            if let Some(by) = &card.approval.approved_by {
                println!("     ✅ Released by {by}");
            }
            println!("     🆔 {}", card.id());
            println!("     ➡️  {}", actions_for(board, column.status).join(" · "));
        }
    }
}

/// Button labels available on a card in `status`
fn actions_for(board: &ApprovalBoard, status: ClientStatus) -> Vec<String> {
    let mut actions = Vec::new();
    match status {
        ClientStatus::Cancelled | ClientStatus::Blocked => actions.push("release".to_string()),
        ClientStatus::Pending => actions.push("confirm".to_string()),
        ClientStatus::Active => actions.push("clear".to_string()),
    }
    if status != ClientStatus::Cancelled {
        actions.push("restore".to_string());
    }
    let targets: Vec<&str> = board
        .workflow()
        .next_statuses(status)
        .into_iter()
        .map(|s| s.as_str())
        .collect();
    if !targets.is_empty() {
        actions.push(format!("move → {}", targets.join("/")));
    }
    actions
}
