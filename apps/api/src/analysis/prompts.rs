// All model prompt constants for the analysis pipeline.

use serde_json::Value;

/// Per-page text extraction instruction sent alongside each page image.
pub const EXTRACTION_INSTRUCTION: &str =
    "Extract the text present in the image, and provide the result in JSON format.";

/// Synthesis prompt template. Replace `{job_description}` and
/// `{extracted_text}` before sending.
const SYNTHESIS_PROMPT_TEMPLATE: &str = r#"You are an AI-powered Resume Analyzer Assistant. Analyse this resume against the job description below.

JOB DESCRIPTION:
{job_description}

EXTRACTED RESUME TEXT (one JSON object per page, in page order):
{extracted_text}

Return a JSON object with this EXACT schema (no extra fields):
{
  "overall_score": 85,
  "keyword_matching": ["Python", "Docker"],
  "missing_keywords": ["Kubernetes"],
  "suggestions": ["Add more detail about your cloud experience"],
  "important_keys": ["Skills & Certifications", "Experience & Work History"]
}

Rules:
- "overall_score" is a number from 0 to 100 measuring how well the resume matches the job description.
- "keyword_matching" lists keywords from the job description that appear in the resume.
- "missing_keywords" lists keywords from the job description absent from the resume.
- "suggestions" lists concrete, actionable improvements.
- Respond with valid JSON only. Do NOT use markdown code fences."#;

/// Builds the composite synthesis instruction embedding the literal job
/// description and the serialized per-page extraction list.
pub fn synthesis_prompt(job_description: &str, extracted_text: &Value) -> String {
    let serialized = serde_json::to_string_pretty(extracted_text).unwrap_or_default();
    SYNTHESIS_PROMPT_TEMPLATE
        .replace("{job_description}", job_description)
        .replace("{extracted_text}", &serialized)
}
