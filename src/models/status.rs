//! Status vocabularies for bookings, payments, and ledger entries.
//!
//! These are stored as plain text columns and validated at the edges through
//! `FromStr`, so a bad value is rejected before anything touches the
//! database.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Booking lifecycle status.
///
/// Any allowed value may follow any other; there is no enforced transition
/// graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    NoShow,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
            BookingStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "no_show" => Ok(BookingStatus::NoShow),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(format!(
                "Invalid booking status '{}'. Allowed values: pending, confirmed, cancelled, no_show, completed",
                other
            )),
        }
    }
}

/// Derived payment label on a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!(
                "Invalid payment status '{}'. Allowed values: pending, partial, paid",
                other
            )),
        }
    }
}

/// Kind of audit ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payment,
    Sale,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "payment",
            TransactionType::Sale => "sale",
            TransactionType::Refund => "refund",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(TransactionType::Payment),
            "sale" => Ok(TransactionType::Sale),
            "refund" => Ok(TransactionType::Refund),
            other => Err(format!(
                "Invalid transaction type '{}'. Allowed values: payment, sale, refund",
                other
            )),
        }
    }
}
