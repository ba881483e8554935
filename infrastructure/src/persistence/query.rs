use domain::{Document, FieldFilter, FilterOperator, OrderBy, QueryOptions, SortDirection};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::trace;

/// Runs the filter -> sort -> limit pipeline over `documents`, in that order.
/// Only surviving documents are cloned.
pub(crate) fn run_query<'a, I>(documents: I, options: &QueryOptions) -> Vec<Document>
where
    I: IntoIterator<Item = &'a Document>,
{
    // --- Step 1: Apply Filters ---
    let mut results: Vec<Document> = documents
        .into_iter()
        .filter(|doc| matches_filters(doc, &options.filters))
        .cloned()
        .collect();
    trace!(count = results.len(), "Documents after filtering");

    // --- Step 2: Apply Sorting ---
    if let Some(order_by) = &options.order_by {
        // Stable: equal keys with equal createdAt keep insertion order.
        results.sort_by(|a, b| compare_documents(a, b, order_by));
        trace!(field = %order_by.field, "Documents sorted");
    }

    // --- Step 3: Apply Limit ---
    if let Some(limit) = options.effective_limit() {
        results.truncate(limit);
    }
    results
}

/// All filters must hold.
pub(crate) fn matches_filters(doc: &Document, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|filter| matches_filter(doc, filter))
}

fn matches_filter(doc: &Document, filter: &FieldFilter) -> bool {
    let doc_value = doc.get_field_value(&filter.field);
    let is_equal = || doc_value.is_some_and(|value| values_equal(value, &filter.value));
    let ordering = || doc_value.and_then(|value| same_kind_ordering(value, &filter.value));

    match filter.operator {
        FilterOperator::Eq => is_equal(),
        FilterOperator::Ne => !is_equal(),
        FilterOperator::Gt => ordering() == Some(Ordering::Greater),
        FilterOperator::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        FilterOperator::Lt => ordering() == Some(Ordering::Less),
        FilterOperator::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
    }
}

/// Numbers compare by value, so `1 == 1.0`; everything else by JSON equality.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => na.as_f64() == nb.as_f64(),
        _ => a == b,
    }
}

/// Ordering between two values of the same kind. Mixed kinds are incomparable.
fn same_kind_ordering(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => na.as_f64()?.partial_cmp(&nb.as_f64()?),
        (Value::String(sa), Value::String(sb)) => Some(sa.cmp(sb)),
        (Value::Bool(ba), Value::Bool(bb)) => Some(ba.cmp(bb)),
        _ => None,
    }
}

/// Primary key per `order_by`, then newest `createdAt` first whatever the direction.
fn compare_documents(a: &Document, b: &Document, order_by: &OrderBy) -> Ordering {
    let primary = compare_option_values(
        a.get_field_value(&order_by.field),
        b.get_field_value(&order_by.field),
    );
    let primary = match order_by.direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    primary.then_with(|| b.created_at().cmp(&a.created_at()))
}

/// Helper function to compare Option<Value> for sorting
fn compare_option_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_values(a, b),
        (Some(_), None) => Ordering::Greater, // Values > missing
        (None, Some(_)) => Ordering::Less,    // missing < Values
        (None, None) => Ordering::Equal,
    }
}

/// Order over JSON values: by kind first, then within the kind.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => {
            let fa = na.as_f64().unwrap_or(0.0);
            let fb = nb.as_f64().unwrap_or(0.0);
            // JSON numbers are never NaN, so this only equates -0.0 and 0.0.
            fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
        }
        (Value::String(sa), Value::String(sb)) => sa.cmp(sb),
        (Value::Bool(ba), Value::Bool(bb)) => ba.cmp(bb),
        (Value::Array(aa), Value::Array(ab)) => aa.len().cmp(&ab.len()),
        (Value::Object(oa), Value::Object(ob)) => oa.len().cmp(&ob.len()),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
