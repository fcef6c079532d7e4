// LLM prompt constants for the interview module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for interviewer question generation.
pub const INTERVIEWER_SYSTEM: &str = "You are an experienced interviewer running a realistic \
    mock interview. You ask one clear question at a time and keep it conversational.";

pub const TECHNICAL_MODE: &str = "\
Mode: Technical interview.
Focus on skills, projects, tech stack depth, tradeoffs, and system thinking.
Ask a practical and contextual technical question grounded in the candidate resume.";

pub const HR_MODE: &str = "\
Mode: HR interview.
Focus on behavioral signals: leadership, conflict resolution, communication, and strengths/weaknesses.
Ask a realistic HR question grounded in the candidate profile.";

/// Opening question prompt. Replace: {grounding_instruction}, {mode_instructions},
/// {jd_context}, {resume_json}
pub const OPENING_QUESTION_PROMPT_TEMPLATE: &str = r#"Generate exactly one interview question.

Return only the question text, without numbering or commentary.

{grounding_instruction}

{mode_instructions}

{jd_context}

Structured resume JSON:
{resume_json}"#;

/// Follow-up prompt. Replace: {grounding_instruction}, {mode_instructions},
/// {jd_context}, {resume_json}, {previous_question}, {answer}
pub const FOLLOW_UP_PROMPT_TEMPLATE: &str = r#"You just asked the candidate a question and received their spoken answer (speech-to-text transcript, so ignore minor transcription noise).

{mode_instructions}

{grounding_instruction}

1. Score the answer from 0 to 100 for relevance, depth, structure, and clarity.
2. Give one or two sentences of direct, constructive feedback.
3. Ask exactly one follow-up question that probes deeper into the answer or moves to a related area of the resume. Do not repeat the previous question.

Return a JSON object with this EXACT schema (no extra fields):
{
  "score": 72,
  "feedback": "Clear overview of the migration; quantify the latency improvement next time.",
  "followUpQuestion": "How did you validate data consistency during the cutover?"
}

{jd_context}

Structured resume JSON:
{resume_json}

PREVIOUS QUESTION:
{previous_question}

CANDIDATE ANSWER:
{answer}"#;

/// Used in place of the JD block when no job description was supplied.
pub const NO_JD_CONTEXT: &str = "Job description context: not provided.";

pub const DEFAULT_FEEDBACK: &str = "No feedback available.";

/// Asked when the model returns no usable follow-up, so the interview never stalls.
pub const DEFAULT_FOLLOW_UP_QUESTION: &str =
    "Can you walk me through a specific example from your experience that shows this in more detail?";
