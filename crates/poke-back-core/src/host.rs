//! Host seams — the event, platform client and conversation APIs the
//! handler is driven by. The host framework implements these.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::types::{Conversation, MemberInfo, PlatformId};

/// Anything a host call can fail with. Always logged, never propagated.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("platform action `{action}` failed: {message}")]
    Action { action: String, message: String },

    #[error("user lookup failed: {0}")]
    Lookup(String),

    #[error("conversation lookup failed: {0}")]
    Conversation(String),
}

/// The platform bot client (OneBot-style API).
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn get_group_member_info(
        &self,
        group_id: &PlatformId,
        user_id: &PlatformId,
        no_cache: bool,
    ) -> Result<MemberInfo, HostError>;

    async fn get_stranger_info(&self, user_id: &PlatformId) -> Result<MemberInfo, HostError>;

    /// Raw API action, e.g. `send_poke`.
    async fn call_action(&self, action: &str, params: Value) -> Result<Value, HostError>;
}

/// Capability of events from the one platform that delivers poke notices.
pub trait PokeSource: Send + Sync {
    /// The notice record as received, if the event carries one.
    fn raw_notice(&self) -> Option<&Value>;

    fn client(&self) -> &dyn PlatformClient;
}

/// An incoming host event.
pub trait MessageEvent: Send + Sync {
    /// Host-wide id of the chat the event came from.
    fn unified_origin(&self) -> &str;

    /// Only the poke-capable platform adapter overrides this.
    fn as_poke_source(&self) -> Option<&dyn PokeSource> {
        None
    }
}

/// The host's conversation manager.
#[async_trait]
pub trait ConversationHost: Send + Sync {
    async fn current_conversation_id(&self, origin: &str) -> Result<Option<String>, HostError>;

    async fn conversation(
        &self,
        origin: &str,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, HostError>;
}
