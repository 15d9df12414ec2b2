//! Defines the transaction record and the rules for turning raw input into one.

use std::{borrow::Cow, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::well_known::{Iso8601, Rfc3339},
    macros::format_description,
};
use uuid::Uuid;

use crate::{Error, user::UserId};

// ============================================================================
// MODELS
// ============================================================================

/// The opaque, unique identifier the store assigns to a transaction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Generate a new, random transaction ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The transaction ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether money was earned or spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money that was earned.
    Income,
    /// Money that was spent.
    Expense,
}

impl TransactionType {
    /// The lowercase name used in requests and in the persisted collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    /// Parses `income` or `expense`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("income") {
            Ok(TransactionType::Income)
        } else if s.eq_ignore_ascii_case("expense") {
            Ok(TransactionType::Expense)
        } else {
            Err(())
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Only the store creates transactions: it assigns `id` and `created_at`, the
/// rest comes from [normalize] or [merge].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that created, and exclusively owns, the transaction.
    pub user_id: UserId,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The amount of money spent or earned, never negative.
    pub amount: f64,
    /// The category of the transaction, e.g. "Groceries".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// A free text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// When the transaction was first stored.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The amount as sent by a client, before coercion to a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// A JSON number.
    Number(f64),
    /// A string that may hold a number, e.g. `"12.50"`.
    Text(String),
    /// Anything else, which is never a valid amount.
    Other(serde_json::Value),
}

impl AmountInput {
    /// Coerce the input to a finite number, if possible.
    pub fn to_finite(&self) -> Option<f64> {
        let amount = match self {
            AmountInput::Number(number) => *number,
            AmountInput::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                text.parse().ok()?
            }
            AmountInput::Other(_) => return None,
        };

        amount.is_finite().then_some(amount)
    }
}

impl From<f64> for AmountInput {
    fn from(value: f64) -> Self {
        AmountInput::Number(value)
    }
}

/// A text field as sent by a client, before coercion to a string.
///
/// Clients do not always send strings, e.g. a numeric category. Scalars are
/// coerced to their text, arrays and objects never satisfy a text rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldInput {
    /// A JSON string.
    Text(String),
    /// A JSON number.
    Number(serde_json::Number),
    /// A JSON boolean.
    Bool(bool),
    /// An array or an object.
    Other(serde_json::Value),
}

impl FieldInput {
    /// The field as text, or `None` for arrays and objects.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldInput::Text(text) => Some(Cow::Borrowed(text)),
            FieldInput::Number(number) => Some(Cow::Owned(number.to_string())),
            FieldInput::Bool(flag) => Some(Cow::Owned(flag.to_string())),
            FieldInput::Other(_) => None,
        }
    }
}

impl From<&str> for FieldInput {
    fn from(value: &str) -> Self {
        FieldInput::Text(value.to_owned())
    }
}

/// The raw fields of a transaction as sent by a client for a create or an update.
///
/// Every field is optional here so that all rule violations can be reported at
/// once. Unknown fields, as well as `id`, `userId`, `createdAt` and `updatedAt`,
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Either `income` or `expense`, in any case.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<FieldInput>,
    /// A non-negative, finite number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<AmountInput>,
    /// A category that is not blank after trimming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FieldInput>,
    /// A free text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<FieldInput>,
    /// An ISO 8601 timestamp, a calendar date or milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<FieldInput>,
}

impl TransactionInput {
    /// Create the input for a transaction with the required fields set.
    pub fn new(transaction_type: &str, amount: impl Into<AmountInput>) -> Self {
        Self {
            transaction_type: Some(transaction_type.into()),
            amount: Some(amount.into()),
            ..Default::default()
        }
    }

    /// Set the category.
    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the note.
    pub fn note(mut self, note: &str) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Set the date.
    pub fn date(mut self, date: &str) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// The outcome of checking a [TransactionInput] against the field rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    /// A message for every rule that was broken, in the order they were checked.
    pub errors: Vec<String>,
}

impl Validation {
    /// Whether no rules were broken.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A validated transaction that has not been given an ID or creation time yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTransaction {
    /// The user that owns the transaction.
    pub user_id: UserId,
    /// Whether the transaction is income or an expense.
    pub transaction_type: TransactionType,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// The trimmed category.
    pub category: Option<String>,
    /// A free text note.
    pub note: Option<String>,
    /// When the transaction happened.
    pub date: OffsetDateTime,
    /// When the transaction was last changed.
    pub updated_at: OffsetDateTime,
}

impl NormalizedTransaction {
    /// Attach the store assigned fields to create the stored record.
    pub fn into_transaction(self, id: TransactionId, created_at: OffsetDateTime) -> Transaction {
        Transaction {
            id,
            user_id: self.user_id,
            transaction_type: self.transaction_type,
            amount: self.amount,
            category: self.category,
            note: self.note,
            date: self.date,
            created_at,
            updated_at: self.updated_at,
        }
    }
}

// ============================================================================
// VALIDATION & NORMALIZATION
// ============================================================================

pub(crate) const INVALID_TYPE: &str = "type must be 'income' or 'expense'";
pub(crate) const INVALID_AMOUNT: &str = "amount must be zero or a positive number";
pub(crate) const BLANK_CATEGORY: &str = "category, if provided, must be a non-empty string";
pub(crate) const INVALID_DATE: &str = "Invalid date format; expected ISO or parsable string";

/// Check `input` against every field rule for a new transaction.
///
/// All broken rules are collected, rules are not short-circuited.
pub fn validate(input: &TransactionInput) -> Validation {
    match parse_fields(input, None) {
        Ok(_) => Validation::default(),
        Err(errors) => Validation { errors },
    }
}

/// Turn `input` into a canonical transaction owned by `user_id`.
///
/// The type is lowercased, the amount coerced to a number, the category
/// trimmed and the date defaults to `now` when absent. `updated_at` is set to
/// `now`.
///
/// # Errors
/// Returns [Error::Validation] with every broken rule if `input` is invalid.
pub fn normalize(
    user_id: &UserId,
    input: &TransactionInput,
    now: OffsetDateTime,
) -> Result<NormalizedTransaction, Error> {
    let fields = parse_fields(input, None).map_err(Error::Validation)?;

    Ok(NormalizedTransaction {
        user_id: user_id.clone(),
        transaction_type: fields.transaction_type,
        amount: fields.amount,
        category: fields.category,
        note: fields.note,
        date: fields.date.unwrap_or(now),
        updated_at: now,
    })
}

/// Apply the fields present in `updates` over `existing`, re-validating the result.
///
/// The ID, owner and creation time of `existing` are kept, `updated_at` is set
/// to `now`.
///
/// # Errors
/// Returns [Error::Validation] with every broken rule if the merged
/// transaction is invalid.
pub fn merge(
    existing: &Transaction,
    updates: &TransactionInput,
    now: OffsetDateTime,
) -> Result<Transaction, Error> {
    let fields = parse_fields(updates, Some(existing)).map_err(Error::Validation)?;

    Ok(Transaction {
        id: existing.id.clone(),
        user_id: existing.user_id.clone(),
        transaction_type: fields.transaction_type,
        amount: fields.amount,
        category: fields.category,
        note: fields.note,
        date: fields.date.unwrap_or(existing.date),
        created_at: existing.created_at,
        updated_at: now,
    })
}

struct ParsedFields {
    transaction_type: TransactionType,
    amount: f64,
    category: Option<String>,
    note: Option<String>,
    date: Option<OffsetDateTime>,
}

/// Parse every field of `input`, falling back to `base` for absent fields.
fn parse_fields(
    input: &TransactionInput,
    base: Option<&Transaction>,
) -> Result<ParsedFields, Vec<String>> {
    let mut errors = Vec::new();

    let transaction_type = match (&input.transaction_type, base) {
        (Some(field), _) => field
            .as_text()
            .and_then(|text| text.trim().parse::<TransactionType>().ok()),
        (None, Some(base)) => Some(base.transaction_type),
        (None, None) => None,
    };
    if transaction_type.is_none() {
        errors.push(INVALID_TYPE.to_owned());
    }

    let amount = match (&input.amount, base) {
        (Some(amount), _) => amount.to_finite().filter(|amount| *amount >= 0.0),
        (None, Some(base)) => Some(base.amount),
        (None, None) => None,
    };
    if amount.is_none() {
        errors.push(INVALID_AMOUNT.to_owned());
    }

    let category = match (&input.category, base) {
        (Some(field), _) => {
            let category = field
                .as_text()
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty());
            if category.is_none() {
                errors.push(BLANK_CATEGORY.to_owned());
            }
            category
        }
        (None, Some(base)) => base.category.clone(),
        (None, None) => None,
    };

    let note = match (&input.note, base) {
        (Some(FieldInput::Other(value)), _) => Some(value.to_string()),
        (Some(field), _) => field
            .as_text()
            .map(Cow::into_owned)
            .filter(|note| !note.is_empty()),
        (None, Some(base)) => base.note.clone(),
        (None, None) => None,
    };

    let date = match &input.date {
        Some(field) => {
            let date = match field {
                FieldInput::Text(text) => parse_timestamp(text),
                FieldInput::Number(millis) => millis.as_f64().and_then(timestamp_from_millis),
                FieldInput::Bool(_) | FieldInput::Other(_) => None,
            };
            if date.is_none() {
                errors.push(INVALID_DATE.to_owned());
            }
            date
        }
        None => None,
    };

    match (transaction_type, amount) {
        (Some(transaction_type), Some(amount)) if errors.is_empty() => Ok(ParsedFields {
            transaction_type,
            amount,
            category,
            note,
            date,
        }),
        _ => Err(errors),
    }
}

/// Parse an ISO 8601 timestamp into a UTC date-time.
///
/// Accepts date-times with an offset, date-times without an offset (taken to
/// be UTC) and plain calendar dates (midnight UTC). Returns `None` for
/// anything else, including years outside `0..=9999`.
pub fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();

    let date_time = OffsetDateTime::parse(text, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(text, &Iso8601::DEFAULT))
        .or_else(|_| {
            PrimitiveDateTime::parse(
                text,
                format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
                ),
            )
            .map(PrimitiveDateTime::assume_utc)
        })
        .or_else(|_| {
            PrimitiveDateTime::parse(text, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
                .map(PrimitiveDateTime::assume_utc)
        })
        .or_else(|_| {
            Date::parse(text, format_description!("[year]-[month]-[day]"))
                .map(|date| date.midnight().assume_utc())
        })
        .ok()?
        .to_offset(UtcOffset::UTC);

    within_supported_years(date_time)
}

/// Convert milliseconds since the Unix epoch to a UTC date-time, dropping
/// fractions of a millisecond.
fn timestamp_from_millis(millis: f64) -> Option<OffsetDateTime> {
    if !millis.is_finite() {
        return None;
    }

    let nanos = (millis.trunc() as i128).checked_mul(1_000_000)?;
    let date_time = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;

    within_supported_years(date_time)
}

fn within_supported_years(date_time: OffsetDateTime) -> Option<OffsetDateTime> {
    (0..=9999)
        .contains(&date_time.year())
        .then_some(date_time)
}
