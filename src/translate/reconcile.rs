use serde_json::Value;

use crate::error::{JimakuError, Result};
use crate::sanitize::extract_json_object;

/// Output of reconciliation: one text per input position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub texts: Vec<String>,
    /// Positions with no matching id in the response
    pub missing_ids: Vec<usize>,
}

/// Sanitize, parse and reconcile a raw model response against the source texts
pub fn reconcile_response(raw: &str, texts: &[String]) -> Result<Reconciled> {
    let cleaned = extract_json_object(raw);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| JimakuError::MalformedResponse(format!("Invalid JSON: {}", e)))?;

    let items = locate_items(&value)?;
    let reconciled = reconcile(texts, items);

    if reconciled.texts.len() != texts.len() {
        return Err(JimakuError::MalformedResponse(format!(
            "Mismatch (In: {}, Out: {})",
            texts.len(),
            reconciled.texts.len()
        )));
    }

    Ok(reconciled)
}

/// Find the item array: `translated_items` when present, otherwise the value of
/// the only top-level key. More than one candidate key is rejected.
pub fn locate_items(value: &Value) -> Result<&[Value]> {
    let object = value
        .as_object()
        .ok_or_else(|| JimakuError::MalformedResponse("Response is not a JSON object".to_string()))?;

    let items = match object.get("translated_items") {
        Some(items) => items,
        None => {
            let mut values = object.values();
            match (values.next(), values.next()) {
                (Some(only), None) => only,
                (None, _) => {
                    return Err(JimakuError::MalformedResponse("Response object is empty".to_string()));
                }
                (Some(_), Some(_)) => {
                    let keys: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
                    return Err(JimakuError::MalformedResponse(format!(
                        "No \"translated_items\" key and ambiguous keys: {}",
                        keys.join(", ")
                    )));
                }
            }
        }
    };

    items
        .as_array()
        .map(|a| a.as_slice())
        .ok_or_else(|| JimakuError::MalformedResponse("Item list is not an array".to_string()))
}

fn parse_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn item_text(item: &Value) -> String {
    match item.get("text") {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Rebuild a full-length output: position `i` takes the first item with
/// `id == i`, or the original text when no item carries that id. Extra and
/// id-less items are ignored.
pub fn reconcile(texts: &[String], items: &[Value]) -> Reconciled {
    let mut anchored: Vec<(u64, String)> = items
        .iter()
        .filter_map(|item| {
            let id = parse_id(item.get("id")?)?;
            Some((id, item_text(item)))
        })
        .collect();
    anchored.sort_by_key(|(id, _)| *id);

    let mut missing_ids = Vec::new();
    let translated = texts
        .iter()
        .enumerate()
        .map(|(i, original)| {
            match anchored.iter().find(|(id, _)| *id == i as u64) {
                Some((_, text)) => text.clone(),
                None => {
                    missing_ids.push(i);
                    original.clone()
                }
            }
        })
        .collect();

    Reconciled { texts: translated, missing_ids }
}
