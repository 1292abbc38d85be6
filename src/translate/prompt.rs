use super::common::TranslationRequest;

const CONTEXT_HEAD_CHARS: usize = 3000;
const CONTEXT_MIDPOINT_THRESHOLD: usize = 5000;
const CONTEXT_MID_CHARS: usize = 2000;

/// Build the batch translation prompt around the serialized `{"items": [...]}` payload
pub fn build_translation_prompt(request: &TranslationRequest, payload_json: &str) -> String {
    let mut prompt = format!(
        "You are a professional subtitle translator.\n\
         Translate the \"text\" field in the JSON objects from {} to {}.\n\
         \n",
        request.source_lang, request.target_lang
    );

    if request.reasoning_enabled {
        prompt.push_str(
            "[MAX REASONING MODE: ON]\n\
             1. Before translating, DEEPLY ANALYZE the nuances, context, and speaker's intent for every line.\n\
             2. Consider the flow of the conversation step-by-step.\n\
             3. Prioritize naturalness and emotional accuracy over literal translation.\n\
             4. YOU MUST OUTPUT ONLY THE JSON.\n\
             \n",
        );
    }

    if let Some(guide) = &request.context_guide {
        prompt.push_str(&format!(
            "[CONTEXT & STYLE GUIDE]\n\
             (You must follow these rules strictly)\n\
             {}\n\
             --------------------------------------------------\n\
             \n",
            guide
        ));
    }

    prompt.push_str(&format!(
        "[INPUT JSON]\n\
         {}\n\
         \n\
         [CRITICAL RULES]\n\
         1. Output MUST be a valid JSON object with a key \"translated_items\".\n\
         2. \"translated_items\" is a list of objects: {{\"id\": integer, \"text\": \"translated_string\"}}.\n\
         3. You MUST preserve the \"id\" exactly as is.\n\
         4. Do NOT merge or split lines. One ID = One Line.\n\
         \n\
         [OUTPUT SCHEMA]\n\
         {{ \"translated_items\": [ {{\"id\": 0, \"text\": \"...\"}}, ... ] }}\n",
        payload_json
    ));

    prompt
}

/// Head of the document, plus a slice from the middle for long documents
pub fn sample_document(full_text: &str) -> String {
    let mut sample: String = full_text.chars().take(CONTEXT_HEAD_CHARS).collect();

    let total = full_text.chars().count();
    if total > CONTEXT_MIDPOINT_THRESHOLD {
        sample.push_str("\n...\n");
        sample.extend(full_text.chars().skip(total / 2).take(CONTEXT_MID_CHARS));
    }

    sample
}

pub fn build_context_prompt(sample: &str, source_lang: &str, target_lang: &str) -> String {
    format!(
        "Analyze the following subtitle sample to prepare for translation from {source} to {target}.\n\
         \n\
         [Subtitle Sample]\n\
         {sample}\n\
         \n\
         [Task]\n\
         Provide a \"System Context Guide\" for the translator AI.\n\
         \n\
         [Requirements]\n\
         1. **Genre & Tone**: Define the atmosphere.\n\
         2. **Character & Relationships**: Identify key characters. Who speaks formally/informally to whom?\n\
         3. **Consistency Rules (Glossary)**:\n   \
         - List ONLY technical terms, proper nouns, or ambiguous words that need consistency.\n   \
         - Do NOT list common words (e.g., \"farmer\", \"school\") unless they have a special hidden meaning.\n   \
         - Keep it minimal and strictly relevant.\n\
         \n\
         [Output Format]\n\
         Write a concise guide in {target}.\n",
        source = source_lang,
        target = target_lang,
        sample = sample,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::common::TranslationOptions;

    fn request(options: &TranslationOptions) -> TranslationRequest {
        TranslationRequest::new(&["Hello".to_string()], options)
    }

    #[test]
    fn test_plain_prompt_sections() {
        let req = request(&TranslationOptions::new("English", "Korean"));
        let payload = req.payload_json().unwrap();
        let prompt = build_translation_prompt(&req, &payload);

        assert!(prompt.contains("from English to Korean"));
        assert!(prompt.contains(&payload));
        assert!(prompt.contains("\"translated_items\""));
        assert!(prompt.contains("One ID = One Line"));
        assert!(!prompt.contains("MAX REASONING MODE"));
        assert!(!prompt.contains("CONTEXT & STYLE GUIDE"));
    }

    #[test]
    fn test_reasoning_block_precedes_input() {
        let req = request(&TranslationOptions::new("English", "Korean").with_reasoning(true));
        let prompt = build_translation_prompt(&req, "{}");

        let reasoning = prompt.find("[MAX REASONING MODE: ON]").unwrap();
        let input = prompt.find("[INPUT JSON]").unwrap();
        assert!(reasoning < input);
    }

    #[test]
    fn test_context_guide_injected_verbatim() {
        let guide = "Tone: noir.\nGlossary: Ray -> 레이";
        let req = request(&TranslationOptions::new("English", "Korean").with_context_guide(guide));
        let prompt = build_translation_prompt(&req, "{}");

        assert!(prompt.contains("(You must follow these rules strictly)"));
        assert!(prompt.contains(guide));
    }

    #[test]
    fn test_short_document_sample_is_head_only() {
        let text = "a".repeat(4000);
        assert_eq!(sample_document(&text), "a".repeat(3000));
    }

    #[test]
    fn test_long_document_sample_includes_midpoint() {
        let text = format!("{}{}", "a".repeat(3000), "b".repeat(3000));
        let sample = sample_document(&text);

        assert!(sample.starts_with(&"a".repeat(3000)));
        assert!(sample.ends_with(&format!("\n...\n{}", "b".repeat(2000))));
        assert_eq!(sample.chars().count(), 3000 + 5 + 2000);
    }

    #[test]
    fn test_context_prompt_targets_language() {
        let prompt = build_context_prompt("sample", "English", "Japanese");
        assert!(prompt.contains("from English to Japanese"));
        assert!(prompt.contains("Write a concise guide in Japanese."));
        assert!(prompt.contains("Do NOT list common words"));
    }

    #[test]
    fn test_glossary_rules_nested_under_item() {
        let prompt = build_context_prompt("sample", "English", "Korean");
        assert!(prompt.contains("(Glossary)**:\n   - List ONLY"));
        assert!(prompt.contains("\n   - Do NOT list common words"));
        assert!(prompt.contains("\n   - Keep it minimal and strictly relevant.\n"));
    }
}
