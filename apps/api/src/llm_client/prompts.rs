// Prompt constants for the match-explanation call.

/// System prompt — enforces JSON-only output with the exact response shape.
pub const EXPLAIN_SYSTEM: &str = "You are an expert technical recruiter and resume reviewer. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include extra keys beyond the requested schema.";

/// Explanation prompt template.
/// Replace: {score}, {missing_skills}, {job_text}, {resume_text}
pub const EXPLAIN_PROMPT_TEMPLATE: &str = r#"Given the JOB DESCRIPTION and RESUME TEXT, produce:
- reasoning: short paragraph explaining the match score
- strengths: 3-7 bullets (with evidence from resume)
- candidate_suggestions: 6-10 actionable improvements to better match the JD

Return a JSON object with this EXACT schema (no extra fields):
{
  "reasoning": "...",
  "strengths": ["..."],
  "candidate_suggestions": ["..."]
}

match_score: {score}
missing_skills: {missing_skills}

JOB DESCRIPTION:
<<<{job_text}>>>

RESUME TEXT:
<<<{resume_text}>>>"#;
