//! Prompt construction for message classification

use crate::model::HistoryEntry;

/// Label the model is told to answer with when nothing in the catalog fits
pub const NO_MATCH_LABEL: &str = "Unknown";

const SYSTEM_INSTRUCTIONS: &str = "You classify customer messages against a catalog of parts. \
Answer with the exact name of the single best-matching part, copied verbatim from the catalog. \
If no part fits, answer with Unknown. Reply with the name only: no punctuation, quotes or explanation.";

/// A two-message chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Combine the catalog, the labelled history and the message to classify
    pub fn build(part_names: &[String], history: &[HistoryEntry], text: &str) -> Self {
        let user = format!(
            "Parts catalog: {}\n\n\
Previously classified messages (newest first):\n{}\n\n\
Message to classify:\n\"{}\"",
            catalog_context(part_names),
            history_context(history),
            text
        );

        Self {
            system: SYSTEM_INSTRUCTIONS.to_string(),
            user,
        }
    }
}

/// Part names as one comma-separated line
pub fn catalog_context(part_names: &[String]) -> String {
    if part_names.is_empty() {
        return "(no parts defined)".to_string();
    }
    part_names.join(", ")
}

/// One `"<text>" → <label>` line per prior message
pub fn history_context(history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return "(none yet)".to_string();
    }

    history
        .iter()
        .map(|entry| {
            format!(
                "\"{}\" → {}",
                entry.text,
                entry.suggested_part.as_deref().unwrap_or("none")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
