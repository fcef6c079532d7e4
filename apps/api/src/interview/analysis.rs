//! Answer analysis: deterministic scoring of a spoken-answer transcript and
//! aggregation of per-turn analyses into the final session report.
//!
//! Pure functions only: no I/O, no clock, no randomness. Every [0,100] score is
//! produced through `clamp_score`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::interview::session::InterviewType;

const FILLER_PHRASES: &[&str] = &[
    "um",
    "uh",
    "like",
    "you know",
    "basically",
    "actually",
    "literally",
    "kind of",
    "sort of",
];

const POSITIVE_WORDS: &[&str] = &[
    "confident",
    "delivered",
    "achieved",
    "improved",
    "led",
    "resolved",
    "success",
];

const NEGATIVE_WORDS: &[&str] = &[
    "maybe",
    "not sure",
    "guess",
    "probably",
    "fail",
    "failed",
    "difficult",
];

const TECHNICAL_KEYWORDS: &[&str] = &[
    "architecture",
    "scalable",
    "latency",
    "throughput",
    "database",
    "index",
    "cache",
    "api",
    "tradeoff",
    "complexity",
    "optimization",
    "microservice",
    "distributed",
    "system design",
];

const BEHAVIORAL_KEYWORDS: &[&str] = &[
    "team",
    "stakeholder",
    "conflict",
    "feedback",
    "communicated",
    "collaborated",
    "mentored",
    "ownership",
    "deadline",
    "prioritized",
    "learned",
    "customer",
    "situation",
    "result",
];

/// Average conversational pace used to estimate speaking time from word count.
const ASSUMED_WPM: f64 = 130.0;
/// Ten seconds, in minutes.
const MIN_SPEAKING_MINUTES: f64 = 1.0 / 6.0;
const TARGET_WORDS_PER_SENTENCE: f64 = 18.0;
const MAX_FINAL_SUGGESTIONS: usize = 6;

const TIP_REDUCE_FILLERS: &str = "Reduce filler words by adding short pauses before key points.";
const TIP_SPEED_UP: &str = "Increase speaking pace slightly to improve delivery energy.";
const TIP_SLOW_DOWN: &str = "Slow down a little to improve clarity and interviewer comprehension.";
const TIP_SHORTER_SENTENCES: &str = "Use shorter sentence structures and one idea per sentence.";
const TIP_TECHNICAL_DEPTH: &str =
    "Add deeper technical reasoning, tradeoffs, and measurable outcomes.";
const TIP_BEHAVIORAL_DEPTH: &str =
    "Structure answers as situation, action, and result, and name your specific contribution.";
const TIP_MAINTAIN: &str =
    "Maintain this structure and add one quantified impact metric per answer.";
const TIP_NO_ANSWERS: &str = "No analyzed answers available.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    /// Enumeration order doubles as the tie-break order when aggregating.
    const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    fn confidence_adjustment(self) -> f64 {
        match self {
            Sentiment::Positive => 10.0,
            Sentiment::Neutral => 0.0,
            Sentiment::Negative => -10.0,
        }
    }
}

/// Per-turn analysis of one answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerAnalysisReport {
    pub transcript: String,
    pub filler_words_count: u32,
    pub filler_word_breakdown: BTreeMap<String, u32>,
    pub speaking_speed_wpm: u32,
    pub sentence_clarity: u8,
    pub confidence_score: u8,
    pub sentiment: Sentiment,
    /// Technical depth for technical sessions, behavioral depth for HR sessions.
    pub domain_depth: u8,
    pub improvement_suggestions: Vec<String>,
}

/// One charting point per answered turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineMarker {
    pub marker: String,
    pub confidence: u8,
    pub clarity: u8,
    pub domain_depth: u8,
    pub filler_words: u32,
    pub speaking_speed_wpm: u32,
}

/// Session-level aggregate, computed once when the session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub confidence_score: u8,
    pub speaking_speed_wpm: u32,
    pub domain_depth: u8,
    /// Display label for `domain_depth`.
    pub depth_label: String,
    pub filler_words_count: u32,
    pub sentiment: Sentiment,
    pub improvement_suggestions: Vec<String>,
    pub timeline_markers: Vec<TimelineMarker>,
}

/// Rounds and clamps a raw score into [0, 100].
pub fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}

/// Analyzes a single answer transcript.
pub fn analyze(transcript: &str, session_type: InterviewType) -> AnswerAnalysisReport {
    let normalized = transcript.trim();
    let word_count = normalized.split_whitespace().count();

    if word_count == 0 {
        return AnswerAnalysisReport {
            improvement_suggestions: vec![TIP_MAINTAIN.to_string()],
            ..AnswerAnalysisReport::default()
        };
    }

    let tokens = tokenize(normalized);

    let mut filler_word_breakdown = BTreeMap::new();
    let mut filler_words_count = 0;
    for phrase in FILLER_PHRASES {
        let count = count_phrase(&tokens, phrase);
        if count > 0 {
            filler_word_breakdown.insert(phrase.to_string(), count);
            filler_words_count += count;
        }
    }

    let words = word_count as f64;
    let estimated_minutes = (words / ASSUMED_WPM).max(MIN_SPEAKING_MINUTES);
    let speaking_speed_wpm = (words / estimated_minutes).round() as u32;

    let sentence_count = normalized
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);
    let avg_words_per_sentence = words / sentence_count as f64;
    let filler_ratio = filler_words_count as f64 / words;

    let sentiment = classify_sentiment(&tokens);
    let sentence_clarity = clamp_score(
        100.0 - (avg_words_per_sentence - TARGET_WORDS_PER_SENTENCE).abs() * 2.0
            - filler_ratio * 120.0,
    );
    let confidence_score =
        clamp_score(75.0 - filler_ratio * 150.0 + sentiment.confidence_adjustment());

    let depth_signals = count_any(&tokens, depth_keywords(session_type));
    let domain_depth = clamp_score(depth_signals as f64 * 12.0 + (words / 8.0).min(25.0));

    let improvement_suggestions = suggestions_for(
        filler_words_count,
        speaking_speed_wpm,
        sentence_clarity,
        domain_depth,
        session_type,
    );

    AnswerAnalysisReport {
        transcript: normalized.to_string(),
        filler_words_count,
        filler_word_breakdown,
        speaking_speed_wpm,
        sentence_clarity,
        confidence_score,
        sentiment,
        domain_depth,
        improvement_suggestions,
    }
}

/// Aggregates per-turn analyses into the session's final report.
/// Analyses with an empty transcript are ignored.
pub fn finalize<'a, I>(analyses: I, session_type: InterviewType) -> FinalReport
where
    I: IntoIterator<Item = &'a AnswerAnalysisReport>,
{
    let valid: Vec<&AnswerAnalysisReport> = analyses
        .into_iter()
        .filter(|a| !a.transcript.trim().is_empty())
        .collect();

    if valid.is_empty() {
        return FinalReport {
            confidence_score: 0,
            speaking_speed_wpm: 0,
            domain_depth: 0,
            depth_label: session_type.depth_label().to_string(),
            filler_words_count: 0,
            sentiment: Sentiment::Neutral,
            improvement_suggestions: vec![TIP_NO_ANSWERS.to_string()],
            timeline_markers: Vec::new(),
        };
    }

    let count = valid.len() as f64;
    let average = |f: fn(&AnswerAnalysisReport) -> f64| -> f64 {
        (valid.iter().map(|a| f(a)).sum::<f64>() / count).round()
    };

    let mut seen = HashSet::new();
    let improvement_suggestions = valid
        .iter()
        .flat_map(|a| a.improvement_suggestions.iter())
        .filter(|s| seen.insert(s.as_str()))
        .take(MAX_FINAL_SUGGESTIONS)
        .cloned()
        .collect();

    let timeline_markers = valid
        .iter()
        .enumerate()
        .map(|(i, a)| TimelineMarker {
            marker: format!("Q{}", i + 1),
            confidence: a.confidence_score,
            clarity: a.sentence_clarity,
            domain_depth: a.domain_depth,
            filler_words: a.filler_words_count,
            speaking_speed_wpm: a.speaking_speed_wpm,
        })
        .collect();

    FinalReport {
        confidence_score: clamp_score(average(|a| a.confidence_score as f64)),
        speaking_speed_wpm: average(|a| a.speaking_speed_wpm as f64) as u32,
        domain_depth: clamp_score(average(|a| a.domain_depth as f64)),
        depth_label: session_type.depth_label().to_string(),
        filler_words_count: valid.iter().map(|a| a.filler_words_count).sum(),
        sentiment: dominant_sentiment(&valid),
        improvement_suggestions,
        timeline_markers,
    }
}

/// Majority vote; ties go to the earlier label in `Sentiment::ALL`.
fn dominant_sentiment(analyses: &[&AnswerAnalysisReport]) -> Sentiment {
    let mut best = Sentiment::Neutral;
    let mut best_count = 0;
    for label in Sentiment::ALL {
        let count = analyses.iter().filter(|a| a.sentiment == label).count();
        if count > best_count {
            best = label;
            best_count = count;
        }
    }
    best
}

fn depth_keywords(session_type: InterviewType) -> &'static [&'static str] {
    match session_type {
        InterviewType::Technical => TECHNICAL_KEYWORDS,
        InterviewType::Hr => BEHAVIORAL_KEYWORDS,
    }
}

fn classify_sentiment(tokens: &[Token]) -> Sentiment {
    let positive = count_any(tokens, POSITIVE_WORDS);
    let negative = count_any(tokens, NEGATIVE_WORDS);
    if positive > negative + 1 {
        Sentiment::Positive
    } else if negative > positive + 1 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Rule order is fixed; the output order follows it.
fn suggestions_for(
    filler_words_count: u32,
    speaking_speed_wpm: u32,
    sentence_clarity: u8,
    domain_depth: u8,
    session_type: InterviewType,
) -> Vec<String> {
    let mut tips = Vec::new();
    if filler_words_count > 5 {
        tips.push(TIP_REDUCE_FILLERS);
    }
    if speaking_speed_wpm < 110 {
        tips.push(TIP_SPEED_UP);
    } else if speaking_speed_wpm > 170 {
        tips.push(TIP_SLOW_DOWN);
    }
    if sentence_clarity < 65 {
        tips.push(TIP_SHORTER_SENTENCES);
    }
    if domain_depth < 55 {
        tips.push(match session_type {
            InterviewType::Technical => TIP_TECHNICAL_DEPTH,
            InterviewType::Hr => TIP_BEHAVIORAL_DEPTH,
        });
    }
    if tips.is_empty() {
        tips.push(TIP_MAINTAIN);
    }
    tips.into_iter().map(str::to_string).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Phrase matching
// ────────────────────────────────────────────────────────────────────────────

/// A lowercase word plus whether only whitespace separates it from the previous word.
#[derive(Debug)]
struct Token {
    word: String,
    whitespace_before: bool,
}

/// Splits text into runs of word characters. A multi-word phrase may only match
/// across separators made purely of whitespace.
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut gap_is_whitespace = false;

    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            word.extend(c.to_lowercase());
        } else {
            if !word.is_empty() {
                tokens.push(Token {
                    word: std::mem::take(&mut word),
                    whitespace_before: gap_is_whitespace,
                });
                gap_is_whitespace = true;
            }
            gap_is_whitespace &= c.is_whitespace();
        }
    }
    if !word.is_empty() {
        tokens.push(Token {
            word,
            whitespace_before: gap_is_whitespace,
        });
    }
    tokens
}

/// Counts non-overlapping, case-insensitive, whole-word occurrences of `phrase`.
fn count_phrase(tokens: &[Token], phrase: &str) -> u32 {
    let parts: Vec<&str> = phrase.split_whitespace().collect();
    if parts.is_empty() {
        return 0;
    }

    let mut count = 0;
    let mut i = 0;
    while i + parts.len() <= tokens.len() {
        let matched = parts.iter().enumerate().all(|(offset, part)| {
            let token = &tokens[i + offset];
            token.word == *part && (offset == 0 || token.whitespace_before)
        });
        if matched {
            count += 1;
            i += parts.len();
        } else {
            i += 1;
        }
    }
    count
}

fn count_any(tokens: &[Token], phrases: &[&str]) -> u32 {
    phrases.iter().map(|p| count_phrase(tokens, p)).sum()
}
