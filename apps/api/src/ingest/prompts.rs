// LLM prompt constants for the ingestion module.

/// System prompt for candidate profile extraction — enforces JSON-only output.
pub const PROFILE_EXTRACT_SYSTEM: &str =
    "You are an expert technical recruiter extracting structured candidate \
    metadata from resume text. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Profile extraction prompt template. Replace `{resume_text}` before sending.
pub const PROFILE_EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract structured candidate metadata from the resume text below.

Return a JSON object with this EXACT schema (no extra fields):
{
  "name": "Jane Doe",
  "email": "jane@example.com",
  "phone": "+49 151 0000000",
  "current_role": "Senior Backend Engineer",
  "current_company": "Acme Corp",
  "years_experience": 6.5,
  "domain": "fintech",
  "skills": ["Python", "Django", "PostgreSQL"],
  "technologies": ["Docker", "Kubernetes", "AWS"]
}

Rules:
- Every field is optional. Use null for any scalar you cannot determine and [] for lists.
- "years_experience" is a number (total professional years), not a string.
- "domain" is a single lowercase industry word or short phrase (e.g. "fintech", "healthcare", "e-commerce"). Pick the candidate's dominant industry.
- "skills" are competencies; "technologies" are concrete tools/platforms. Do not invent entries not supported by the text.
- "current_role" and "current_company" refer to the most recent position.

RESUME TEXT:
{resume_text}"#;
