//! The poke handler — filter, count, reply, maybe poke back.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{clean_legacy_dirs, PokeConfig};
use crate::counter::PokeCounter;
use crate::events::PokeAction;
use crate::host::{ConversationHost, HostError, MessageEvent, PlatformClient};
use crate::prompts::{render_prompt, DEFAULT_POKE_REPLY, POKE_BACK_ACK, SUPER_POKE_ACK};
use crate::types::{ChatType, LlmRequest, PokeNotice};

/// Poke-back calls made by a super poke.
pub const SUPER_POKE_TIMES: usize = 10;

const SEND_POKE_ACTION: &str = "send_poke";

pub struct PokeHandler {
    config: PokeConfig,
    counter: Arc<PokeCounter>,
    conversations: Arc<dyn ConversationHost>,
}

impl PokeHandler {
    pub fn new(
        config: PokeConfig,
        counter: Arc<PokeCounter>,
        conversations: Arc<dyn ConversationHost>,
    ) -> Self {
        Self {
            config,
            counter,
            conversations,
        }
    }

    /// Load (or create) the config under `data_dir`, clear out legacy plugin
    /// directories, and build a handler with a fresh counter.
    pub fn bootstrap(data_dir: &Path, conversations: Arc<dyn ConversationHost>) -> Self {
        let config = PokeConfig::load_or_init(&PokeConfig::config_path(data_dir));
        clean_legacy_dirs(data_dir);
        let counter = Arc::new(PokeCounter::from_config(&config));
        Self::new(config, counter, conversations)
    }

    pub fn config(&self) -> &PokeConfig {
        &self.config
    }

    pub fn counter(&self) -> &Arc<PokeCounter> {
        &self.counter
    }

    pub async fn on_group_message(
        &self,
        event: &dyn MessageEvent,
        actions: &mpsc::UnboundedSender<PokeAction>,
    ) {
        self.handle(event, ChatType::Group, actions).await;
    }

    pub async fn on_private_message(
        &self,
        event: &dyn MessageEvent,
        actions: &mpsc::UnboundedSender<PokeAction>,
    ) {
        self.handle(event, ChatType::Private, actions).await;
    }

    /// Run [`handle`](Self::handle) and return everything it emitted.
    pub async fn collect(&self, event: &dyn MessageEvent, chat_type: ChatType) -> Vec<PokeAction> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.handle(event, chat_type, &tx).await;
        drop(tx);

        let mut actions = Vec::new();
        while let Some(action) = rx.recv().await {
            actions.push(action);
        }
        actions
    }

    /// Handle one host event. Actions are sent to `actions` as soon as they
    /// are ready; events that are not a poke at the bot emit nothing.
    pub async fn handle(
        &self,
        event: &dyn MessageEvent,
        chat_type: ChatType,
        actions: &mpsc::UnboundedSender<PokeAction>,
    ) {
        let Some(source) = event.as_poke_source() else {
            return;
        };
        let Some(notice) = source.raw_notice().and_then(PokeNotice::from_raw) else {
            debug!("Ignoring non-poke event from {}", event.unified_origin());
            return;
        };
        let client = source.client();

        let user_name = resolve_display_name(client, &notice).await;
        let count = self.counter.record(&notice.sender.key());
        let prompt = render_prompt(&self.config.llm_prompt_template, &user_name, chat_type, count);
        info!("[poke] user={} count={} prompt={}", user_name, count, prompt);

        if self.config.feature_switches.poke_response_enabled {
            let action = match self.llm_request(event.unified_origin(), prompt).await {
                Ok(request) => PokeAction::LlmRequest(request),
                Err(e) => {
                    error!("LLM request failed, using canned reply: {}", e);
                    PokeAction::reply(self.fallback_reply(count))
                }
            };
            emit(actions, action);
        }

        if self.config.feature_switches.poke_back_enabled {
            if let Some(times) = self.roll_poke_back() {
                let ack = if times > 1 { SUPER_POKE_ACK } else { POKE_BACK_ACK };
                emit(actions, PokeAction::reply(ack));
                poke_back(client, &notice, times).await;
            }
        }
    }

    /// Canned reply for the `count`-th poke, or the default when the list
    /// has no such entry.
    pub fn fallback_reply(&self, count: u32) -> &str {
        count
            .checked_sub(1)
            .and_then(|i| self.config.poke_responses.get(i as usize))
            .map(String::as_str)
            .unwrap_or(DEFAULT_POKE_REPLY)
    }

    async fn llm_request(&self, origin: &str, prompt: String) -> Result<LlmRequest, HostError> {
        let cid = self
            .conversations
            .current_conversation_id(origin)
            .await?
            .filter(|id| !id.is_empty());

        let conversation = match cid.as_deref() {
            Some(id) => self.conversations.conversation(origin, id).await?,
            None => None,
        };

        Ok(LlmRequest {
            prompt,
            session_id: cid.unwrap_or_else(|| origin.to_string()),
            conversation,
            image_urls: Vec::new(),
            use_host_tools: true,
        })
    }

    /// How many poke-back calls to make this time, if any.
    fn roll_poke_back(&self) -> Option<usize> {
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() >= self.config.poke_back_probability {
            return None;
        }
        if rng.gen::<f64>() < self.config.super_poke_probability {
            Some(SUPER_POKE_TIMES)
        } else {
            Some(1)
        }
    }
}

fn emit(actions: &mpsc::UnboundedSender<PokeAction>, action: PokeAction) {
    if actions.send(action).is_err() {
        debug!("Action receiver dropped, discarding action");
    }
}

async fn resolve_display_name(client: &dyn PlatformClient, notice: &PokeNotice) -> String {
    let info = match &notice.group {
        Some(group) => {
            client
                .get_group_member_info(group, &notice.sender, true)
                .await
        }
        None => client.get_stranger_info(&notice.sender).await,
    };

    match info {
        Ok(info) => info.display_name(&notice.sender),
        Err(e) => {
            warn!("Failed to resolve name of {}: {}", notice.sender, e);
            notice.sender.key()
        }
    }
}

async fn poke_back(client: &dyn PlatformClient, notice: &PokeNotice, times: usize) {
    let mut params = Map::new();
    params.insert("user_id".into(), notice.sender.0.clone());
    if let Some(group) = &notice.group {
        params.insert("group_id".into(), group.0.clone());
    }
    let params = Value::Object(params);

    for attempt in 1..=times {
        if let Err(e) = client.call_action(SEND_POKE_ACTION, params.clone()).await {
            warn!("send_poke failed ({}/{}): {}", attempt, times, e);
        }
    }
}
