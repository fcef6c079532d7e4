// Shared prompt fragments. Each feature that calls the LLM keeps its own
// prompts.rs alongside it; only cross-cutting pieces live here.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction keeping generated questions anchored to the candidate's resume.
pub const RESUME_GROUNDING_INSTRUCTION: &str = "\
    Ground every question in the structured resume provided. Reference concrete \
    projects, skills, or experience from it. Do NOT invent employers, projects, or \
    technologies the candidate never mentioned.";
