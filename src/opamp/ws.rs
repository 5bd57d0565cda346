//! OpAMP WebSocket server (spec §4.7): binary frames carrying the
//! `AgentToServer`/`ServerToAgent` subset of the OpAMP protobuf, in the
//! split-sink/split-stream + `mpsc` forwarding shape the teacher pack's chat
//! server uses for its WebSocket handler.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use prost::Message as _;
use tokio::sync::mpsc;

use super::proto::{AgentRemoteConfig, AgentConfigMap, AgentToServer, ServerToAgent};
use super::state::AgentRegistry;

pub async fn handler(ws: WebSocketUpgrade, State(registry): State<AgentRegistry>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

async fn handle_socket(socket: WebSocket, registry: AgentRegistry) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerToAgent>(16);

    let forward_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Binary(msg.encode_to_vec().into())).await.is_err() {
                break;
            }
        }
    });

    let mut instance_id: Option<Vec<u8>> = None;

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Binary(bytes)) => {
                let Ok(req) = AgentToServer::decode(bytes.as_ref()) else {
                    tracing::warn!("dropped malformed OpAMP frame");
                    continue;
                };
                if req.instance_uid.is_empty() {
                    continue;
                }
                instance_id = Some(req.instance_uid.clone());
                on_agent_to_server(&registry, &req, &tx).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::warn!(error = %e, "opamp websocket error");
                break;
            }
            _ => {}
        }
    }

    if let Some(id) = instance_id {
        registry.mark_disconnected(&id);
        tracing::info!(instance_id = %crate::ids::hex_encode(&id), "opamp agent disconnected");
    }
    forward_handle.abort();
}

async fn on_agent_to_server(registry: &AgentRegistry, req: &AgentToServer, tx: &mpsc::Sender<ServerToAgent>) {
    let (mut agent_type, mut agent_version) = (String::new(), String::new());
    if let Some(desc) = &req.agent_description {
        for kv in &desc.identifying_attributes {
            match kv.key.as_str() {
                "service.name" => agent_type = kv.value.clone(),
                "service.version" => agent_version = kv.value.clone(),
                _ => {}
            }
        }
    }
    let effective_config = req.effective_config.as_ref().map(|c| c.config_body.clone());

    registry.upsert(req.instance_uid.clone(), agent_type, agent_version, effective_config);

    if let Some((config, hash)) = registry.take_pending(&req.instance_uid) {
        let mut config_map = std::collections::HashMap::new();
        config_map.insert(String::new(), config);
        let response = ServerToAgent {
            instance_uid: req.instance_uid.clone(),
            remote_config: Some(AgentRemoteConfig {
                config: Some(AgentConfigMap { config_map }),
                config_hash: hash,
            }),
        };
        let _ = tx.send(response).await;
    }
}
