//! Double-entry ledger legs for reward transactions.
//!
//! A reward is booked as one transaction of four legs:
//!
//! | Account           | Debit        | Credit       |
//! |-------------------|--------------|--------------|
//! | `stock_inventory` | principal    |              |
//! | `cash`            |              | principal    |
//! | `fees_expense`    | total fees   |              |
//! | `cash`            |              | total fees   |
//!
//! Debits and credits of every transaction sum to the same amount.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fees::FeeBreakdown;
use super::ids::TransactionId;
use super::money::{Money, Quantity};

/// Ledger account a leg is posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Shares held on behalf of users (asset).
    StockInventory,
    /// Company cash (asset).
    Cash,
    /// Brokerage, STT and GST paid (expense).
    FeesExpense,
}

impl AccountType {
    /// Column value stored in `ledger_entries.account_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StockInventory => "stock_inventory",
            Self::Cash => "cash",
            Self::FeesExpense => "fees_expense",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stock_inventory" => Ok(Self::StockInventory),
            "cash" => Ok(Self::Cash),
            "fees_expense" => Ok(Self::FeesExpense),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// One debit or credit leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Row identifier.
    pub id: uuid::Uuid,
    /// Transaction grouping the legs of one economic event.
    pub transaction_id: TransactionId,
    /// Account the leg is posted to.
    pub account_type: AccountType,
    /// Stock symbol for inventory legs, empty otherwise.
    pub account_symbol: String,
    /// Debit amount (zero on credit legs).
    pub debit_amount: Money,
    /// Credit amount (zero on debit legs).
    pub credit_amount: Money,
    /// Shares moved; non-zero only on inventory legs.
    pub stock_quantity: Quantity,
    /// Human-readable narration.
    pub description: String,
    /// Idempotency key of the reward that produced the leg.
    pub reference_id: String,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row update time.
    pub updated_at: DateTime<Utc>,
}

/// Builds the four legs booking a stock reward.
#[must_use]
pub fn reward_legs(
    transaction_id: TransactionId,
    symbol: &str,
    quantity: Quantity,
    fees: &FeeBreakdown,
    reference_id: &str,
    at: DateTime<Utc>,
) -> Vec<LedgerEntry> {
    let leg = |account_type: AccountType,
               account_symbol: &str,
               debit_amount: Money,
               credit_amount: Money,
               stock_quantity: Quantity,
               description: String| LedgerEntry {
        id: uuid::Uuid::new_v4(),
        transaction_id,
        account_type,
        account_symbol: account_symbol.to_string(),
        debit_amount,
        credit_amount,
        stock_quantity,
        description,
        reference_id: reference_id.to_string(),
        created_at: at,
        updated_at: at,
    };

    vec![
        leg(
            AccountType::StockInventory,
            symbol,
            fees.principal,
            Money::ZERO,
            quantity,
            format!("Stock reward: {symbol} x {quantity}"),
        ),
        leg(
            AccountType::Cash,
            "",
            Money::ZERO,
            fees.principal,
            Quantity::ZERO,
            format!("Cash outflow for stock purchase: {symbol}"),
        ),
        leg(
            AccountType::FeesExpense,
            "",
            fees.total_fees,
            Money::ZERO,
            Quantity::ZERO,
            format!("Brokerage, STT, GST for {symbol}"),
        ),
        leg(
            AccountType::Cash,
            "",
            Money::ZERO,
            fees.total_fees,
            Quantity::ZERO,
            format!("Cash outflow for fees: {symbol}"),
        ),
    ]
}

/// Sum of debits and sum of credits across `entries`, or `None` if either
/// sum overflows.
#[must_use]
pub fn totals(entries: &[LedgerEntry]) -> Option<(Money, Money)> {
    let debits = Money::checked_sum(entries.iter().map(|e| e.debit_amount))?;
    let credits = Money::checked_sum(entries.iter().map(|e| e.credit_amount))?;
    Some((debits, credits))
}

/// `true` when every transaction among `entries` has equal debits and credits.
#[must_use]
pub fn is_balanced(entries: &[LedgerEntry]) -> bool {
    let mut per_tx: BTreeMap<TransactionId, Vec<LedgerEntry>> = BTreeMap::new();
    for entry in entries {
        per_tx
            .entry(entry.transaction_id)
            .or_default()
            .push(entry.clone());
    }
    per_tx
        .values()
        .all(|legs| matches!(totals(legs), Some((debits, credits)) if debits == credits))
}
