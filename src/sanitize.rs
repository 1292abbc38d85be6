/// Pull a JSON object out of model output that may be wrapped in prose or a
/// code fence. The result is not validated; a bad extraction surfaces as a
/// JSON parse error downstream.
pub fn extract_json_object(raw: &str) -> String {
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start <= end {
            return raw[start..=end].to_string();
        }
    }

    let trimmed = raw.trim();
    if trimmed.starts_with("```") {
        let without_open = trimmed.split_once('\n').map_or(trimmed, |(_, rest)| rest);
        let without_close = without_open.rsplit_once('\n').map_or(without_open, |(body, _)| body);
        return without_close.trim().to_string();
    }

    trimmed.to_string()
}
