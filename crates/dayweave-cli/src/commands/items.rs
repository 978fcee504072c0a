//! Stored item commands for CLI.

use clap::Subcommand;
use dayweave_core::{Config, Item, ItemDb, ItemStore, WriteOutcome};

use super::resolve_user;

#[derive(Subcommand)]
pub enum ItemsAction {
    /// List active items in agenda order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move an item by hand; it keeps its place relative to calendar events
    Reorder {
        /// Item ID
        id: String,
        /// Position the item was dropped at
        ordering_id: u32,
    },
}

pub fn run(action: ItemsAction, user: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let db = ItemDb::open()?;
    match action {
        ItemsAction::List { json } => {
            let config = Config::load()?;
            let user = resolve_user(user, &config)?;
            let items = db.active_items(&user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("No active items.");
            } else {
                for item in &items {
                    println!("{}", describe(item));
                }
            }
        }
        ItemsAction::Reorder { id, ordering_id } => match db.mark_reordered(&id, ordering_id)? {
            WriteOutcome::Applied => println!("Item {id} moved to position {ordering_id}"),
            WriteOutcome::NotFound => return Err(format!("item not found: {id}").into()),
        },
    }
    Ok(())
}

/// One-line summary: position, kind, label and a marker for hand-placed items.
pub fn describe(item: &Item) -> String {
    let label = if item.title.is_empty() {
        item.id.as_str()
    } else {
        item.title.as_str()
    };
    let pin = if item.has_been_reordered { " *" } else { "" };
    format!(
        "{:>4}  {:<14}  {}{}  ({})",
        item.ordering_id,
        item.kind_tag().as_str(),
        label,
        pin,
        item.id
    )
}
