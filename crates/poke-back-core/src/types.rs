//! Core types — ChatType, PlatformId, PokeNotice, MemberInfo, LlmRequest.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Chat type ──

/// Where the poke happened. Displays as the label used in prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Group,
    Private,
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatType::Group => write!(f, "群聊"),
            ChatType::Private => write!(f, "私聊"),
        }
    }
}

// ── Platform ids ──

/// A user or group id exactly as the platform sent it (number or string).
/// Compared and keyed by its string form, so `10001` and `"10001"` match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformId(pub Value);

impl PlatformId {
    pub fn key(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// False for the values the platform uses to mean "no id".
    fn is_set(&self) -> bool {
        match &self.0 {
            Value::Null | Value::Bool(false) => false,
            Value::Number(n) => n.as_f64() != Some(0.0),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<i64> for PlatformId {
    fn from(id: i64) -> Self {
        Self(Value::from(id))
    }
}

impl From<&str> for PlatformId {
    fn from(id: &str) -> Self {
        Self(Value::from(id))
    }
}

// ── Notices ──

/// A poke aimed at the bot itself, extracted from a raw notice record.
#[derive(Debug, Clone, PartialEq)]
pub struct PokeNotice {
    pub sender: PlatformId,
    pub group: Option<PlatformId>,
}

impl PokeNotice {
    /// Returns `None` unless `raw` is an object describing a poke whose
    /// target is the bot (`target_id == self_id`).
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str);

        if text("post_type") != Some("notice")
            || text("notice_type") != Some("notify")
            || text("sub_type") != Some("poke")
        {
            return None;
        }

        let id = |key: &str| {
            obj.get(key)
                .filter(|v| !v.is_null())
                .map(|v| PlatformId(v.clone()))
        };

        let target = id("target_id")?;
        let self_id = id("self_id")?;
        if target.key() != self_id.key() {
            return None;
        }

        Some(Self {
            sender: id("user_id")?,
            group: id("group_id").filter(PlatformId::is_set),
        })
    }
}

// ── Host lookups ──

/// Subset of the platform's member / stranger info the handler reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Group card (per-group nickname)
    #[serde(default)]
    pub card: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl MemberInfo {
    /// Card, then nickname, then the raw id. Empty strings are skipped.
    pub fn display_name(&self, id: &PlatformId) -> String {
        [&self.card, &self.nickname]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| id.key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub history: Vec<Value>,
}

/// A reply the host's LLM subsystem should generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    /// Current conversation id, or the unified origin when there is none
    pub session_id: String,
    pub conversation: Option<Conversation>,
    pub image_urls: Vec<String>,
    /// Let the host attach its own tool manager
    pub use_host_tools: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn poke(extra: Value) -> Value {
        let mut raw = json!({
            "post_type": "notice",
            "notice_type": "notify",
            "sub_type": "poke",
            "self_id": 42,
            "target_id": 42,
            "user_id": 10001,
        });
        if let (Some(base), Some(extra)) = (raw.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        raw
    }

    #[test]
    fn test_private_poke() {
        let notice = PokeNotice::from_raw(&poke(json!({}))).unwrap();
        assert_eq!(notice.sender, PlatformId::from(10001));
        assert_eq!(notice.group, None);
    }

    #[test]
    fn test_group_poke_and_unset_group_ids() {
        let notice = PokeNotice::from_raw(&poke(json!({"group_id": 777}))).unwrap();
        assert_eq!(notice.group, Some(PlatformId::from(777)));

        for unset in [json!(null), json!(0), json!("")] {
            let notice = PokeNotice::from_raw(&poke(json!({ "group_id": unset }))).unwrap();
            assert_eq!(notice.group, None);
        }
    }

    #[test]
    fn test_target_compared_as_string() {
        assert!(PokeNotice::from_raw(&poke(json!({"target_id": "42"}))).is_some());
        assert!(PokeNotice::from_raw(&poke(json!({"target_id": 43}))).is_none());
        assert!(PokeNotice::from_raw(&poke(json!({"target_id": null}))).is_none());
    }

    #[test]
    fn test_non_poke_records_rejected() {
        assert!(PokeNotice::from_raw(&poke(json!({"sub_type": "honor"}))).is_none());
        assert!(PokeNotice::from_raw(&poke(json!({"post_type": "message"}))).is_none());
        assert!(PokeNotice::from_raw(&poke(json!({"notice_type": "group_increase"}))).is_none());
        assert!(PokeNotice::from_raw(&json!("poke")).is_none());
        assert!(PokeNotice::from_raw(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_display_name_fallbacks() {
        let id = PlatformId::from(10001);
        let full = MemberInfo {
            card: Some("card".into()),
            nickname: Some("nick".into()),
        };
        assert_eq!(full.display_name(&id), "card");

        let empty_card = MemberInfo {
            card: Some(String::new()),
            nickname: Some("nick".into()),
        };
        assert_eq!(empty_card.display_name(&id), "nick");

        assert_eq!(MemberInfo::default().display_name(&id), "10001");
    }

    #[test]
    fn test_chat_type_labels() {
        assert_eq!(ChatType::Group.to_string(), "群聊");
        assert_eq!(ChatType::Private.to_string(), "私聊");
    }
}
