//! Prompt template, canned replies and the template renderer.

use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

use crate::types::ChatType;

pub const DEFAULT_PROMPT_TEMPLATE: &str = "这是一条系统消息，请不要对该消息本身进行回复，你应该依据以下情景进行回复:{username} 在{chat_type}戳了你，已经戳了{count}次，请你回复一下，回复要确保符合人设，切记不要重复发言，戳的次数越高你的反应应该要越来越强烈，考虑上下文，确保通顺不突兀。";

pub const DEFAULT_POKE_RESPONSES: &[&str] = &[
    "别戳啦！",
    "哎呀，还戳呀，别闹啦！",
    "别戳我啦，你要做什么，不理你了",
];

/// Reply when the canned list has no entry for the current count.
pub const DEFAULT_POKE_REPLY: &str = "别戳啦！";

/// Acknowledgement sent before a single poke-back.
pub const POKE_BACK_ACK: &str = "戳回去";

/// Acknowledgement sent before a super poke.
pub const SUPER_POKE_ACK: &str = "喜欢戳是吧";

/// `{{`, `}}` or a `{name}` placeholder.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Fill `{username}`, `{chat_type}` and `{count}`. Doubled braces collapse to
/// literal ones; any other placeholder is left as written.
pub fn render_prompt(template: &str, username: &str, chat_type: ChatType, count: u32) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            match (&caps[0], caps.get(1).map(|m| m.as_str())) {
                ("{{", _) => "{".to_string(),
                ("}}", _) => "}".to_string(),
                (_, Some("username")) => username.to_string(),
                (_, Some("chat_type")) => chat_type.to_string(),
                (_, Some("count")) => count.to_string(),
                (whole, _) => whole.to_string(),
            }
        })
        .into_owned()
}
