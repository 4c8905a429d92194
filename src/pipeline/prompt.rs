//! Prompt construction for lab-document extraction.

/// Human-readable language name for the owner's preferred language code.
/// Falls back to the code itself so an unknown code still produces a
/// usable instruction.
fn language_name(code: &str) -> &str {
    match code {
        "uk" => "Ukrainian",
        "en" => "English",
        "pl" => "Polish",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        _ => code,
    }
}

/// Builds the extraction instruction. The same prompt serves both the
/// image (multimodal) and the PDF-text path; for the latter the document
/// text is appended below the instruction.
pub fn extraction_prompt(language_code: &str) -> String {
    let language = language_name(language_code);
    format!(
        r#"You are analyzing a veterinary laboratory test document. Extract ALL measured metrics and return ONLY a JSON object, no prose, no markdown fences.

JSON shape:
{{
  "clinicName": string or null,
  "testType": string or null,
  "testDate": "YYYY-MM-DD" or null,
  "metrics": [
    {{
      "name": string,
      "value": number,
      "unit": string,
      "referenceMin": number or null,
      "referenceMax": number or null
    }}
  ]
}}

Rules:
1. Translate every metric name into {language}. Keep units exactly as printed.
2. A reference range like "5-10" becomes referenceMin: 5, referenceMax: 10.
3. An upper-bound-only range like "<10" becomes referenceMin: null, referenceMax: 10.
4. A lower-bound-only range like ">5" becomes referenceMin: 5, referenceMax: null.
5. Every value and reference bound must be a JSON number, never a string. Use null for anything missing, never an empty string.

Extract every metric present in the document, even ones you do not recognize."#
    )
}

/// Prompt for the PDF path: instruction plus the extracted text layer.
pub fn extraction_prompt_with_text(language_code: &str, document_text: &str) -> String {
    format!(
        "{}\n\nDocument text:\n{}",
        extraction_prompt(language_code),
        document_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_target_language() {
        let prompt = extraction_prompt("uk");
        assert!(prompt.contains("into Ukrainian"));
    }

    #[test]
    fn unknown_language_code_passes_through() {
        let prompt = extraction_prompt("cs");
        assert!(prompt.contains("into cs"));
    }

    #[test]
    fn text_variant_appends_document() {
        let prompt = extraction_prompt_with_text("en", "Hemoglobin 95 g/L");
        assert!(prompt.ends_with("Hemoglobin 95 g/L"));
    }
}
