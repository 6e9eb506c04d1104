// src/services/prompt.rs
//! Prompt construction for the document analysis pipeline

use tracing::info;

/// Job descriptions are truncated before prompting to bound request size
const MAX_JD_LENGTH: usize = 3000;

/// Strip non-ASCII characters and collapse runs of whitespace
pub fn clean_text(text: &str) -> String {
    let ascii: String = text.chars().filter(|c| c.is_ascii()).collect();
    let mut cleaned = String::with_capacity(ascii.len());
    let mut last_was_space = false;
    for c in ascii.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                cleaned.push(' ');
            }
            last_was_space = true;
        } else {
            cleaned.push(c);
            last_was_space = false;
        }
    }
    cleaned.trim().to_string()
}

/// Truncate to `max` characters, marking the cut with an ellipsis
pub fn abbreviate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    format!("{}...", &text[..max.saturating_sub(3)])
}

/// Build the analysis prompt from the job posting and extracted resume text
pub fn build_prompt(job_title: &str, job_description: &str, resume_text: &str) -> String {
    let cleaned_jd = clean_text(job_description);
    let trimmed_jd = abbreviate(&cleaned_jd, MAX_JD_LENGTH);

    info!(
        jd_chars = job_description.len(),
        trimmed_jd_chars = trimmed_jd.len(),
        resume_chars = resume_text.len(),
        "Building analysis prompt"
    );

    format!(
        r#"You are a career analysis assistant.

Return ONLY a valid JSON object with the exact format below.
For all arrays, select only the most critical and impactful items, adhering to the maximum number of items specified for each field.

{{
  "matchScore": number,
  "atsScore": number,
  "fluffAnalysis": {{
    "summary": "string (1-2 brief sentences)",
    "detected": [{{ "original": string, "suggestion": string }}]
  }},
  "roleFitAndAlignmentMetrics": {{
    "prediction": {{
      "verdict": "string (must be one of: 'Misfit', 'Developing', 'Strong', 'Optimal')",
      "reason": "string (concise reason for the verdict, 2-3 sentences)"
    }},
    "radarData": {{ "technicalSkills": number, "softSkills": number, "experienceLevel": number, "cultureFit": number }},
    "alignmentBreakdown": {{ "skills": number, "experience": number, "education": number, "keywords": number }}
  }},
  "keywordAnalysis": {{
    "matchedKeywords": string[],
    "missingKeywords": string[],
    "keywordDensityScore": number
  }},
  "resumeSuggestions": string[],
  "interviewPreparationTopics": string[]
}}

Limits: fluffAnalysis.detected max 5 items, matchedKeywords max 10, missingKeywords max 10, resumeSuggestions max 4, interviewPreparationTopics max 4.

Only respond with the JSON - no other commentary.

Job Title: {job_title}

Job Description:
{trimmed_jd}

Resume Text:
{resume_text}
"#
    )
}
