//! `eventrelay` server: tiered event dispatch over HTTP (axum) and a
//! length-delimited `MsgPack` RPC transport, sharing one dispatcher.

pub mod cli;
pub mod network;
pub mod observability;
pub mod rpc;
pub mod service;

#[cfg(test)]
mod transport_equivalence {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use bytes::Bytes;
    use eventrelay_core::messages::{
        BatchReply, ErrorReply, ProcessReply, RejectKind, RpcReply, RpcResponse,
    };
    use eventrelay_core::{RoutingConfig, WireEvent};
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tower::ServiceExt;

    use crate::network::{build_router, AppState, NetworkConfig, ShutdownController};
    use crate::rpc::{framed, RpcClient, RpcConfig, RpcServer, RpcService, DEFAULT_MAX_FRAME_BYTES};
    use crate::service::test_support::{FakeBridge, FakeResult};
    use crate::service::{BatchCoordinator, Dispatcher, PlaceholderHandler};

    /// Both transports over one dispatcher and one shutdown controller.
    struct Transports {
        router: Router,
        rpc_port: u16,
        shutdown: Arc<ShutdownController>,
    }

    impl Transports {
        async fn start() -> Self {
            let dispatcher = Arc::new(Dispatcher::new(
                RoutingConfig::default(),
                Arc::new(FakeBridge::new(Duration::ZERO, FakeResult::Exit)),
                Arc::new(PlaceholderHandler::new(Duration::ZERO)),
                Duration::from_secs(1),
            ));
            let batch = BatchCoordinator::new(Arc::clone(&dispatcher), 1);
            let shutdown = Arc::new(ShutdownController::new());
            let config = NetworkConfig::default();
            let router = build_router(
                AppState {
                    dispatcher: Arc::clone(&dispatcher),
                    batch: batch.clone(),
                    shutdown: Arc::clone(&shutdown),
                    config: Arc::new(config.clone()),
                    start_time: std::time::Instant::now(),
                },
                &config,
            );

            let mut server = RpcServer::new(
                RpcConfig {
                    host: "127.0.0.1".to_string(),
                    ..RpcConfig::default()
                },
                RpcService::new(dispatcher, batch),
                Arc::clone(&shutdown),
            );
            let rpc_port = server.start().await.unwrap();
            tokio::spawn(server.serve());

            Self {
                router,
                rpc_port,
                shutdown,
            }
        }

        async fn client(&self) -> RpcClient {
            RpcClient::connect(("127.0.0.1", self.rpc_port)).await.unwrap()
        }

        async fn post(&self, uri: &str, body: impl Into<Body>) -> (StatusCode, Bytes) {
            let response = self
                .router
                .clone()
                .oneshot(
                    Request::post(uri)
                        .header("content-type", "application/json")
                        .body(body.into())
                        .unwrap(),
                )
                .await
                .unwrap();
            let status = response.status();
            (status, to_bytes(response.into_body(), usize::MAX).await.unwrap())
        }

        async fn http_reject_kind(&self, uri: &str, body: &'static str) -> RejectKind {
            let (status, body) = self.post(uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            serde_json::from_slice::<ErrorReply>(&body).unwrap().kind
        }
    }

    impl Drop for Transports {
        fn drop(&mut self) {
            self.shutdown.trigger_shutdown();
        }
    }

    fn wire(channel: &str) -> WireEvent {
        WireEvent {
            channel: Some(channel.to_string()),
            ..WireEvent::default()
        }
    }

    fn rpc_reject_kind(response: RpcResponse) -> RejectKind {
        match response {
            RpcResponse::Error(error) => error.kind,
            other => panic!("expected ERROR reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_and_rpc_agree_on_outcomes() {
        let transports = Transports::start().await;
        let mut client = transports.client().await;

        for channel in ["room:1", "ticker:BTC", "match:9", "", "tickerBTC"] {
            let event = wire(channel);

            let (status, body) = transports
                .post("/process", serde_json::to_vec(&event).unwrap())
                .await;
            let http_reply: ProcessReply = serde_json::from_slice(&body).unwrap();
            assert_eq!(status == StatusCode::OK, http_reply.processed, "{channel}");

            let RpcResponse::Process(rpc_reply) = client.process(event, None).await.unwrap() else {
                panic!("expected PROCESS reply for {channel:?}");
            };

            assert_eq!(http_reply.processed, rpc_reply.processed, "{channel}");
            assert_eq!(http_reply.error, rpc_reply.error, "{channel}");
        }
    }

    #[tokio::test]
    async fn http_and_rpc_agree_on_batch_accounting() {
        let transports = Transports::start().await;
        let mut client = transports.client().await;
        let events: Vec<WireEvent> = ["room:1", "match:1", "ticker:BTC", "chat", ""]
            .into_iter()
            .map(wire)
            .collect();

        let (status, body) = transports
            .post(
                "/process-batch",
                serde_json::to_vec(&serde_json::json!({ "events": events })).unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let http_reply: BatchReply = serde_json::from_slice(&body).unwrap();

        let RpcResponse::ProcessBatch(rpc_reply) = client.process_batch(events, None).await.unwrap()
        else {
            panic!("expected PROCESS_BATCH reply");
        };

        assert_eq!(http_reply.total, 5);
        assert_eq!(http_reply.total, rpc_reply.total);
        assert_eq!(http_reply.processed, rpc_reply.processed);
        assert_eq!(http_reply.failed, rpc_reply.failed);
        assert_eq!(http_reply.errors, rpc_reply.errors);
    }

    #[tokio::test]
    async fn http_and_rpc_agree_on_rejections() {
        let transports = Transports::start().await;
        let mut client = transports.client().await;

        let http = transports.http_reject_kind("/process", r#"{"id":"x"}"#).await;
        let rpc = rpc_reject_kind(client.process(WireEvent::default(), None).await.unwrap());
        assert_eq!(http, RejectKind::Validation);
        assert_eq!(http, rpc);

        let http = transports
            .http_reject_kind("/process-batch", r#"{"events":[]}"#)
            .await;
        let rpc = rpc_reject_kind(client.process_batch(Vec::new(), None).await.unwrap());
        assert_eq!(http, RejectKind::EmptyBatch);
        assert_eq!(http, rpc);

        // The typed client cannot emit a malformed request, so send raw bytes.
        let http = transports.http_reject_kind("/process", "{not json").await;
        let stream = TcpStream::connect(("127.0.0.1", transports.rpc_port))
            .await
            .unwrap();
        let mut raw = framed(stream, DEFAULT_MAX_FRAME_BYTES);
        let call = serde_json::json!({
            "callId": 11,
            "request": { "type": "PROCESS", "event": { "channel": 5 } },
        });
        raw.send(Bytes::from(rmp_serde::to_vec_named(&call).unwrap()))
            .await
            .unwrap();
        let reply = RpcReply::decode(&raw.next().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply.call_id, 11);
        assert_eq!(http, RejectKind::Decode);
        assert_eq!(http, rpc_reject_kind(reply.response));
    }
}
