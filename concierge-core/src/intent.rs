//! Keyword router deciding whether an utterance should drive the browser or
//! get a conversational reply.

use serde::Serialize;

const ACTION_KEYWORDS: &[&str] = &[
    "buy",
    "search",
    "browse",
    "go to",
    "click",
    "add to cart",
    "purchase",
    "show me",
    "open",
    "navigate",
];

pub const ACTION_ACK: &str = "I will get right on that.";
pub const GENERIC_REPLY: &str = "I can help with that.";
pub const WINTER_BIRTHDAY_REPLY: &str = "For a winter birthday party, I recommend warm yet stylish options. Velvet dresses, smart blazers with turtlenecks, or layered outfits are great. Would you like me to search for some options on Amazon?";
pub const SAP_REPLY: &str = "I can guide you through SAP. Are you looking to create a purchase requisition or check inventory levels? I can show you how to do it.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Hand `task` to the browser agent verbatim.
    Action { message: String, task: String },
    Conversation { message: String },
}

pub fn classify(query: &str) -> Intent {
    let lowered = query.to_lowercase();

    if ACTION_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return Intent::Action {
            message: ACTION_ACK.to_string(),
            task: query.to_string(),
        };
    }

    let message = if lowered.contains("birthday") && lowered.contains("winter") {
        WINTER_BIRTHDAY_REPLY
    } else if lowered.contains("sap") {
        SAP_REPLY
    } else {
        GENERIC_REPLY
    };

    Intent::Conversation {
        message: message.to_string(),
    }
}
