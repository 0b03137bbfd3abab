//! Citation-grounded prompt construction.
//!
//! [`PromptBuilder::build`] is a pure function of the query, the source set
//! and the date: the same inputs always produce byte-identical prompts. Each
//! source is numbered by its position in the [`SourceSet`] (1-indexed), and
//! the backend is told to cite as `[n](link)` with the same numbering.

use chrono::NaiveDate;
use citewise_search::SourceSet;

use crate::message::ChatMessage;

/// Rendered in place of the source list when nothing could be fetched.
pub const NO_SOURCES_MARKER: &str = "(no sources could be retrieved for this query)";

/// A built prompt. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    system_instruction: String,
    user_content: String,
}

impl Prompt {
    /// The system-role instruction.
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// The user-role content: instruction, date, query and sources.
    pub fn user_content(&self) -> &str {
        &self.user_content
    }

    /// The two-message conversation sent to the backend.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_instruction.clone()),
            ChatMessage::user(self.user_content.clone()),
        ]
    }
}

/// Builds grounded prompts.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    max_sentences: u32,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self { max_sentences: 4 }
    }
}

impl PromptBuilder {
    /// Builder with a custom sentence limit.
    pub fn new(max_sentences: u32) -> Self {
        Self { max_sentences }
    }

    /// Build the prompt for `query` grounded in `sources` as of `date`.
    pub fn build(&self, query: &str, sources: &SourceSet, date: NaiveDate) -> Prompt {
        let system_instruction = format!(
            "Answer using only the provided sources. Respond in markdown format. \
             Cite the sources you used inline as [n](link), where n is the source number. \
             Maximum {} sentences.",
            self.max_sentences
        );

        let mut user_content = format!(
            "Provide me with the information I requested. Use the sources to give an \
             accurate response, citing each source you use as a markdown link by its \
             number at the end of the sentence (ex: [1](https://example.com)). \
             Give the answer and then stop. Today's date is {}.\n\n\
             Input:\n{}\n\nSources:\n",
            date.format("%Y-%m-%d"),
            query.trim()
        );

        if sources.is_empty() {
            user_content.push_str(NO_SOURCES_MARKER);
        } else {
            let rendered: Vec<String> = sources
                .cited()
                .map(|(n, source)| {
                    format!("[{n}] {} ({}):\n{}", source.title, source.link, source.text)
                })
                .collect();
            user_content.push_str(&rendered.join("\n\n"));
        }
        user_content.push_str("\n\nResponse:\n");

        Prompt {
            system_instruction,
            user_content,
        }
    }
}
