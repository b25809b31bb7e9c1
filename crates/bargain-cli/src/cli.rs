use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bargain")]
#[command(about = "Negotiate marketplace prices and manage discount codes")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the item catalog
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// Open a negotiation on an item
    Start {
        /// Buyer user ID
        #[arg(long)]
        buyer: String,
        /// Seller user ID
        #[arg(long)]
        seller: String,
        /// Item ID
        #[arg(long)]
        item: String,
        /// Optional opening message from the buyer
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Post a text message to a negotiation
    Message {
        /// Negotiation ID
        id: String,
        /// Sender user ID
        #[arg(long)]
        from: String,
        /// Message text
        text: String,
    },
    /// Post a price offer or counter-offer
    Offer {
        /// Negotiation ID
        id: String,
        /// Sender user ID
        #[arg(long)]
        from: String,
        /// Offered price
        amount: i64,
    },
    /// Accept the pending offer (seller only); prints the discount code
    Accept {
        /// Negotiation ID
        id: String,
        /// Seller user ID
        #[arg(long)]
        seller: String,
    },
    /// Walk away from a negotiation
    Reject {
        /// Negotiation ID
        id: String,
        /// Sender user ID
        #[arg(long)]
        from: String,
        /// Optional reason, recorded in the transcript
        #[arg(long)]
        reason: Option<String>,
    },
    /// Confirm the discounted purchase after payment
    Complete {
        /// Negotiation ID
        id: String,
        /// Payment ID that redeemed the discount code
        #[arg(long)]
        payment: String,
    },
    /// Show a negotiation and its transcript
    Show {
        /// Negotiation ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List negotiations for a user
    List {
        /// User ID (buyer or seller)
        user: String,
        /// Number of negotiations to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Price a discount code against a purchase without consuming it
    Validate {
        /// Discount code
        code: String,
        /// Buyer user ID
        #[arg(long)]
        buyer: String,
        /// Item ID
        #[arg(long)]
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Consume a discount code for a confirmed payment
    Redeem {
        /// Discount code
        code: String,
        /// Buyer user ID
        #[arg(long)]
        buyer: String,
        /// Payment ID
        #[arg(long)]
        payment: String,
    },
    /// Claim the first-time buyer welcome code
    ClaimWelcome {
        /// Buyer user ID
        buyer: String,
    },
    /// Expire overdue negotiations
    Sweep {
        /// Keep sweeping on an interval instead of running once
        #[arg(long)]
        watch: bool,
        /// Seconds between sweeps in watch mode
        #[arg(long, default_value = "60")]
        interval: u64,
    },
}

#[derive(Subcommand)]
pub enum ItemCommands {
    /// Insert or update an item's list price
    Add {
        /// Item ID
        id: String,
        /// List price
        price: i64,
    },
    /// List catalog items
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
