use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value}; // Documents are field name -> JSON value maps
use std::fmt;
use std::str::FromStr;
use thiserror::Error; // For domain-specific errors

// --- Domain Errors ---
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Unsupported filter operator: '{0}'")]
    UnsupportedOperator(String),
    #[error("Invalid field value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },
    #[error("Missing required field '{0}'")]
    MissingField(String),
}

// --- Reserved bookkeeping fields ---
pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";
pub const IS_DELETED_FIELD: &str = "isDeleted";

/// Caller-supplied document payload.
pub type Fields = Map<String, Value>;

// --- Document ID ---
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}
impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
impl From<DocumentId> for String {
    fn from(doc_id: DocumentId) -> Self {
        doc_id.0
    }
}
impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Document ---

/// A stored record: caller fields plus the four reserved bookkeeping fields.
///
/// Serializes as a flat JSON object, exactly the shape callers see.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct Document {
    fields: Fields,
}

impl Document {
    /// Builds a fresh document. Reserved fields are assigned first and the
    /// caller data is spread on top; only `id` cannot be overridden.
    pub fn new(id: DocumentId, timestamp: &str, data: Fields) -> Self {
        let mut fields = Fields::new();
        fields.insert(ID_FIELD.to_string(), Value::String(id.0.clone()));
        fields.insert(CREATED_AT_FIELD.to_string(), Value::from(timestamp));
        fields.insert(UPDATED_AT_FIELD.to_string(), Value::from(timestamp));
        fields.insert(IS_DELETED_FIELD.to_string(), Value::Bool(false));
        fields.extend(data);
        fields.insert(ID_FIELD.to_string(), Value::String(id.0));
        Self { fields }
    }

    /// Shallow-merges `data` and re-stamps `updatedAt` after the merge.
    /// `id` and `createdAt` are immutable and silently kept. Once deleted, a
    /// document stays deleted: only `isDeleted: true` is accepted afterwards.
    pub fn merge(&mut self, data: Fields, timestamp: &str) {
        let was_deleted = self.is_deleted();
        for (name, value) in data {
            if name == ID_FIELD || name == CREATED_AT_FIELD {
                continue;
            }
            if was_deleted && name == IS_DELETED_FIELD && value != Value::Bool(true) {
                continue;
            }
            self.fields.insert(name, value);
        }
        self.fields
            .insert(UPDATED_AT_FIELD.to_string(), Value::from(timestamp));
    }

    pub fn id(&self) -> &str {
        self.str_field(ID_FIELD).unwrap_or_default()
    }

    pub fn document_id(&self) -> DocumentId {
        DocumentId::new(self.id())
    }

    pub fn created_at(&self) -> Option<&str> {
        self.str_field(CREATED_AT_FIELD)
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.str_field(UPDATED_AT_FIELD)
    }

    /// Only an explicit `true` counts as deleted.
    pub fn is_deleted(&self) -> bool {
        self.fields
            .get(IS_DELETED_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// Gets a specific field's value.
    pub fn get_field_value(&self, field_name: &str) -> Option<&Value> {
        self.fields.get(field_name)
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

// --- Query Options ---

/// Comparison applied by a [`FieldFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "==",
            FilterOperator::Ne => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(FilterOperator::Eq),
            "!=" => Ok(FilterOperator::Ne),
            ">" => Ok(FilterOperator::Gt),
            ">=" => Ok(FilterOperator::Gte),
            "<" => Ok(FilterOperator::Lt),
            "<=" => Ok(FilterOperator::Lte),
            other => Err(DomainError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl TryFrom<String> for FilterOperator {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FilterOperator> for String {
    fn from(op: FilterOperator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{field, operator, value}` condition. Filters in a query are AND-ed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

// Anything other than "desc" sorts ascending.
impl From<&str> for SortDirection {
    fn from(value: &str) -> Self {
        if value == "desc" {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

impl From<String> for SortDirection {
    fn from(value: String) -> Self {
        SortDirection::from(value.as_str())
    }
}

impl From<SortDirection> for String {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => "asc".to_string(),
            SortDirection::Desc => "desc".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)] // asc if not present in JSON
    pub direction: SortDirection,
}

/// Optional filter -> sort -> limit pipeline for bulk reads.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(default)]
    pub filters: Vec<FieldFilter>,
    #[serde(default)]
    pub order_by: Option<OrderBy>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(
        mut self,
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(FieldFilter::new(field, operator, value));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The truncation to apply, if any. A zero limit means "no limit".
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|n| *n > 0)
    }
}

// --- Finance records ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Income/expense entry as submitted by an entry form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl NewTransaction {
    pub fn new(
        date: NaiveDate,
        kind: TransactionKind,
        amount: f64,
        category: impl Into<String>,
    ) -> Self {
        Self {
            date,
            kind,
            amount,
            category: category.into(),
            description: String::new(),
            reference: None,
            status: TransactionStatus::default(),
            currency: default_currency(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_amount(self.amount)?;
        validate_category(&self.category)?;
        validate_currency(&self.currency)
    }

    /// Flattens the entry into document fields.
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("date".to_string(), Value::from(self.date.to_string()));
        fields.insert("type".to_string(), Value::from(self.kind.as_str()));
        fields.insert("amount".to_string(), Value::from(self.amount));
        fields.insert("category".to_string(), Value::from(self.category));
        fields.insert("description".to_string(), Value::from(self.description));
        fields.insert(
            "reference".to_string(),
            self.reference.map_or(Value::Null, Value::from),
        );
        fields.insert("status".to_string(), Value::from(self.status.as_str()));
        fields.insert("currency".to_string(), Value::from(self.currency));
        fields
    }
}

/// Partial edit of a stored transaction; only `Some` fields are written.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` (JSON `null`) clears the reference.
    #[serde(default, deserialize_with = "present_or_null")]
    pub reference: Option<Option<String>>,
    pub status: Option<TransactionStatus>,
    pub currency: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.kind.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.reference.is_none()
            && self.status.is_none()
            && self.currency.is_none()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        if let Some(currency) = &self.currency {
            validate_currency(currency)?;
        }
        Ok(())
    }

    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        if let Some(date) = self.date {
            fields.insert("date".to_string(), Value::from(date.to_string()));
        }
        if let Some(kind) = self.kind {
            fields.insert("type".to_string(), Value::from(kind.as_str()));
        }
        if let Some(amount) = self.amount {
            fields.insert("amount".to_string(), Value::from(amount));
        }
        if let Some(category) = self.category {
            fields.insert("category".to_string(), Value::from(category));
        }
        if let Some(description) = self.description {
            fields.insert("description".to_string(), Value::from(description));
        }
        if let Some(reference) = self.reference {
            fields.insert(
                "reference".to_string(),
                reference.map_or(Value::Null, Value::from),
            );
        }
        if let Some(status) = self.status {
            fields.insert("status".to_string(), Value::from(status.as_str()));
        }
        if let Some(currency) = self.currency {
            fields.insert("currency".to_string(), Value::from(currency));
        }
        fields
    }
}

// A present key, even `null`, becomes `Some`; an absent key stays `None` via `default`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn validate_amount(amount: f64) -> Result<(), DomainError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DomainError::InvalidFieldValue {
            field: "amount".to_string(),
            reason: format!("Expected a positive amount, got {}", amount),
        });
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<(), DomainError> {
    if category.trim().is_empty() {
        return Err(DomainError::MissingField("category".to_string()));
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result<(), DomainError> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(DomainError::InvalidFieldValue {
            field: "currency".to_string(),
            reason: format!("Expected a three-letter ISO code, got '{}'", currency),
        });
    }
    Ok(())
}

/// A transaction as read back from the store, bookkeeping fields included.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub is_deleted: bool,
}

impl TryFrom<Document> for Transaction {
    type Error = serde_json::Error;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        serde_json::from_value(Value::Object(document.into_fields()))
    }
}

/// Income/expense totals over a set of transactions.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub transaction_count: usize,
}

impl BalanceSummary {
    /// Tallies live entries; deleted and cancelled ones do not count.
    pub fn tally<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut summary = BalanceSummary::default();
        for txn in transactions {
            if txn.is_deleted || txn.status == TransactionStatus::Cancelled {
                continue;
            }
            match txn.kind {
                TransactionKind::Income => summary.total_income += txn.amount,
                TransactionKind::Expense => summary.total_expense += txn.amount,
            }
            summary.transaction_count += 1;
        }
        summary.balance = summary.total_income - summary.total_expense;
        summary
    }
}
