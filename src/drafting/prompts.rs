//! Prompt construction for contract drafting.

use super::{RewriteRequest, SectionRequest};
use crate::job::Document;
use crate::provider::ChatMessage;

/// What the title prompt asks the model to answer when the request is not a contract.
pub const TITLE_SENTINEL: &str = "does not contain information to generate a contract title";

pub const MIN_OUTLINE_SECTIONS: usize = 10;

/// Only the head of a document is sent for suggestions.
pub const SUGGESTION_SOURCE_CHARS: usize = 2000;

pub fn title_messages(prompt: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a legal expert who names contracts."),
        ChatMessage::user(format!(
            "Write a title for the contract described below. Answer with a single line \
             and nothing else. If no contract title can be derived from the request, \
             answer exactly: {}\n\nRequest: {}",
            TITLE_SENTINEL, prompt
        )),
    ]
}

pub fn outline_messages(prompt: &str, title: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a meticulous legal paralegal."),
        ChatMessage::user(format!(
            "Produce the table of contents for the contract \"{}\".\n\
             Request: {}\n\n\
             Reply with a JSON array of at least {} section titles in document order \
             and no other text, for example:\n\
             [\"1. Introduction\", \"2. Definitions\", \"3. Confidentiality\", \"4. Termination\"]",
            title, prompt, MIN_OUTLINE_SECTIONS
        )),
    ]
}

pub fn section_messages(request: &SectionRequest) -> Vec<ChatMessage> {
    let outline = request
        .headings
        .iter()
        .enumerate()
        .map(|(i, heading)| {
            let marker = if i == request.index { ">" } else { "-" };
            format!("{} {}", marker, heading)
        })
        .collect::<Vec<_>>()
        .join("\n");
    let prior = if request.prior_summary.is_empty() {
        "(this is the first section)".to_string()
    } else {
        request.prior_summary.clone()
    };

    vec![
        ChatMessage::system(
            "You are senior legal counsel drafting a binding agreement. Use formal, \
             precise language, consistent numbering and sub-clauses where useful. \
             No placeholders and no markdown: return plain text only.",
        ),
        ChatMessage::user(format!(
            "Contract: {}\nRequest: {}\n\nOutline:\n{}\n\nAlready written:\n{}\n\n\
             Write only the section \"{}\". Do not repeat the heading.",
            request.title, request.prompt, outline, prior, request.heading
        )),
    ]
}

pub fn rewrite_messages(request: &RewriteRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a professional contract editor. Apply only the requested change, \
             keep the structure, clause numbers, headings, tone and formatting of the \
             contract, keep every modification legally sound, and propose an \
             alternative when a request would create a legal problem. Always return \
             the complete modified contract, never just the changed parts.",
        ),
        ChatMessage::user(format!(
            "Title: {}\n\nCurrent contract:\n{}\n\nEdit instruction: {}",
            request.title, request.content, request.instruction
        )),
    ]
}

pub fn suggestion_messages(document: &Document) -> Vec<ChatMessage> {
    let excerpt: String = document
        .content
        .chars()
        .take(SUGGESTION_SOURCE_CHARS)
        .collect();
    vec![
        ChatMessage::system("You are an expert contract reviewer."),
        ChatMessage::user(format!(
            "Suggest 3 to 5 common, practical improvements for the contract below, each \
             phrased as a short instruction a user could give an editor, such as \
             \"Add a force majeure clause\" or \"Clarify the termination conditions\". \
             Reply with a JSON array of strings only.\n\nTitle: {}\n\n{}",
            document.title, excerpt
        )),
    ]
}

/// Pull a JSON string array out of a model reply, tolerating code fences and chatter.
pub fn parse_string_array(reply: &str) -> Result<Vec<String>, String> {
    let start = reply
        .find('[')
        .ok_or_else(|| "reply contains no JSON array".to_string())?;
    let end = reply
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| "reply contains an unterminated JSON array".to_string())?;
    let items: Vec<String> = serde_json::from_str(&reply[start..=end])
        .map_err(|e| format!("reply is not a JSON string array: {}", e))?;
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

/// First non-empty line with heading marks and wrapping quotes removed.
pub fn clean_title(reply: &str) -> String {
    let line = reply
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let line = line.trim_start_matches('#').trim();
    let line = line
        .strip_prefix("Title:")
        .map(str::trim)
        .unwrap_or(line);
    line.trim_matches(|c| c == '"' || c == '*' || c == '\'')
        .trim()
        .to_string()
}
