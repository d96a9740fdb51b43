//! Prompt construction for a single digest request.
//!
//! A query is either a link to summarize or a free-text topic. That choice
//! selects the task template; earlier turns of the conversation are replayed
//! ahead of it so follow-up questions keep their context.

use crate::model::Message;

/// Which task template a query is answered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Url,
    Topic,
}

/// Everything the model call needs besides the tool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub system_instruction: String,
    pub prompt: String,
    pub mode: QueryMode,
}

const SYSTEM_INSTRUCTION: &str = r#"You are ThreadDigest AI, an intelligent and helpful assistant specialized in summarizing online content.

Your goal is to provide clear, comprehensive, and easy-to-understand summaries.

GUIDELINES:
1. **Synthesize Information**: Read the provided content (or user query) and distill it into its most essential points. Do not simply repeat it.
2. **Add Value**: You MAY use your broad knowledge to explain technical terms, add necessary context, or clarify concepts mentioned in the thread if it helps the user understand better.
3. **Be Objective**: Report on the consensus and the conflicts within the discussion.

OUTPUT FORMATTING:
You MUST start your response with a single line containing the title, prefixed with "TITLE: ".
Example:
TITLE: Summary of Topic

After the title line, provide the Markdown summary."#;

const CONTEXT_HEADER: &str = "Previous Conversation Context:";

/// Only the prefix is inspected; nothing else about the query routes it.
pub fn classify(query: &str) -> QueryMode {
    if query.starts_with("http") {
        QueryMode::Url
    } else {
        QueryMode::Topic
    }
}

/// Renders earlier turns as `Actor: content` lines in transcript order.
pub fn serialize_context(turns: &[Message]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role.actor(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn system_instruction() -> &'static str {
    SYSTEM_INSTRUCTION
}

fn task_instruction(query: &str, mode: QueryMode) -> String {
    match mode {
        QueryMode::Url => format!(
            r#"Analyze the content at this URL: {query}

Task:
1. Extract the title.
2. Provide a "Deep Dive" summary of the discussion.

Structure:
# 🧐 Executive Summary
A high-level overview of the topic and the main sentiment.

## 🔑 Key Takeaways
*   Critical facts, arguments, and consensus points.
*   Highlight any interesting debates or unique perspectives.

## 💡 The Verdict
A final "TL;DR" conclusion."#
        ),
        QueryMode::Topic => format!(
            r#"Answer this query: "{query}"

Task:
1. Generate a clear title.
2. Provide a comprehensive answer using your knowledge and the context provided.

Structure:
# 🎯 Direct Answer
A clear, direct answer to the user's question.

## 📝 Details & Context
*   Elaborate on important details.
*   Provide examples or background info if helpful.

## 🔎 Conclusion
A brief wrap-up."#
        ),
    }
}

/// Builds the system instruction and user prompt for `query`.
///
/// `query` is expected to be trimmed and non-empty already.
pub fn build(query: &str, prior_turns: &[Message]) -> BuiltPrompt {
    let mode = classify(query);
    let context = serialize_context(prior_turns);
    let task = task_instruction(query, mode);

    let prompt = if context.is_empty() {
        task
    } else {
        format!("{}\n{}\n\n{}", CONTEXT_HEADER, context, task)
    };

    BuiltPrompt {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        prompt,
        mode,
    }
}
