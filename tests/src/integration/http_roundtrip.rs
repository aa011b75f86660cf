//! # Call Round Trips
//!
//! The request client with the reqwest transport against the mock server:
//! request shape, response unwrapping and HTTP error classification.

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::sync::Arc;

    use perun_rpc_client::{CallOutcome, ClientConfig, ClientFactory, ErrorKind};

    use crate::support::{MockRpcServer, Notification, RecordingEvents};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn factory_for(server: &MockRpcServer) -> ClientFactory {
        ClientFactory::from_config(ClientConfig::with_rpc_url(server.rpc_url())).unwrap()
    }

    // =============================================================================
    // REQUEST SHAPE
    // =============================================================================

    #[tokio::test]
    async fn test_payload_is_posted_as_json_object() {
        let server = MockRpcServer::start().await;
        server.route("usersManager/getUserById", |_| {
            (200, r#"{"id":42,"firstName":"Alice"}"#.to_string())
        });
        let factory = factory_for(&server);

        let mut client = factory.client();
        client.put("id", 42).unwrap();
        client.put("withAttributes", false).unwrap();
        let outcome = client.call("usersManager/getUserById").await;

        assert_eq!(
            outcome,
            CallOutcome::Finished(Some(json!({"id": 42, "firstName": "Alice"})))
        );

        let requests = server.requests_to("usersManager/getUserById");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body, r#"{"id":42,"withAttributes":false}"#);
        assert_eq!(requests[0].query, None);
    }

    #[tokio::test]
    async fn test_empty_payload_sends_empty_body() {
        let server = MockRpcServer::start().await;
        server.route("vosManager/getVos", |_| (200, "[]".to_string()));
        let factory = factory_for(&server);

        let outcome = factory.client().call("vosManager/getVos").await;

        assert_eq!(outcome, CallOutcome::Finished(Some(json!([]))));
        assert_eq!(server.requests()[0].body, "");
    }

    #[tokio::test]
    async fn test_recovery_call_sends_callback_token() {
        let server = MockRpcServer::start().await;
        server.route("vosManager/getVoById", |request| {
            let callback = request.callback().unwrap_or("missing").to_string();
            (200, format!("{}({{\"id\":1,\"name\":\"vo\"}});", callback))
        });
        let factory = factory_for(&server);

        let handle = factory.client_with_recovery().dispatch("vosManager/getVoById");
        let token = handle.token().clone();
        let outcome = handle.outcome().await;

        assert_eq!(outcome, CallOutcome::Finished(Some(json!({"id": 1, "name": "vo"}))));
        assert_eq!(server.requests()[0].callback(), Some(token.as_str()));
        assert_eq!(factory.tracker().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_wrapped_null_is_empty_success() {
        let server = MockRpcServer::start().await;
        server.route("groupsManager/deleteGroup", |request| {
            (200, format!("{}(null);", request.callback().unwrap_or_default()))
        });
        let factory = factory_for(&server);
        let events = Arc::new(RecordingEvents::default());

        let outcome = factory
            .client_with_recovery()
            .with_events(events.clone())
            .call("groupsManager/deleteGroup")
            .await;

        assert_eq!(outcome, CallOutcome::Finished(None));
        assert_eq!(
            events.seen(),
            vec![Notification::LoadingStart, Notification::Finished(None)]
        );
    }

    #[tokio::test]
    async fn test_path_is_uri_encoded() {
        let server = MockRpcServer::start().await;
        server.route("searcher/find%20users", |_| (200, "null".to_string()));
        let factory = factory_for(&server);

        let outcome = factory.client().call("searcher/find users").await;

        assert_eq!(outcome, CallOutcome::Finished(None));
        assert_eq!(server.requests()[0].path, "searcher/find%20users");
    }

    // =============================================================================
    // ERRORS
    // =============================================================================

    #[tokio::test]
    async fn test_application_error_from_200() {
        let server = MockRpcServer::start().await;
        server.route("membersManager/deleteMember", |_| {
            (
                200,
                r#"{"errorId":"1a2b","name":"MemberNotExistsException","message":"no such member"}"#
                    .to_string(),
            )
        });
        let factory = factory_for(&server);
        let events = Arc::new(RecordingEvents::default());

        let mut client = factory.client().with_events(events.clone());
        client.put("member", 9).unwrap();
        let outcome = client.call("membersManager/deleteMember").await;

        let error = outcome.error().unwrap();
        assert_eq!(error.kind, ErrorKind::Application);
        assert_eq!(error.error_id, "1a2b");
        assert!(error.is_named("MemberNotExistsException"));
        assert_eq!(error.post_data.as_deref(), Some(r#"{"member":9}"#));
        assert_eq!(
            error.request_url.as_deref(),
            Some(format!("{}membersManager/deleteMember", server.rpc_url()).as_str())
        );
        assert_eq!(events.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_http_status_categories() {
        let server = MockRpcServer::start().await;
        server.route("a/unauthorized", |_| (401, String::new()));
        server.route("a/forbidden", |_| (403, String::new()));
        server.route("a/unavailable", |_| (503, String::new()));
        server.route("a/broken", |_| (500, "stack trace".to_string()));
        server.route("a/gateway", |_| (502, String::new()));
        let factory = factory_for(&server);

        let kind_of = |outcome: CallOutcome| outcome.error().map(|error| error.kind);

        let expected = [
            ("a/unauthorized", ErrorKind::Unauthorized),
            ("a/forbidden", ErrorKind::Unauthorized),
            ("a/unavailable", ErrorKind::ServiceUnavailable),
            ("a/broken", ErrorKind::InternalError),
            ("a/missing", ErrorKind::NotFound),
        ];
        for (path, kind) in expected {
            assert_eq!(kind_of(factory.client().call(path).await), Some(kind), "{}", path);
        }

        let gateway = factory.client().call("a/gateway").await;
        let error = gateway.error().unwrap();
        assert_eq!(error.kind, ErrorKind::HttpStatus);
        assert_eq!(error.error_id, "502");
        assert_eq!(error.message, "Server responded with HTTP error: 502 - Bad Gateway");
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let server = MockRpcServer::start().await;
        server.route("a/html", |_| (200, "<html>login</html>".to_string()));
        let factory = factory_for(&server);

        let outcome = factory.client().call("a/html").await;
        assert_eq!(outcome.error().unwrap().kind, ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_failure() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let rpc_url = format!("http://127.0.0.1:{}/krb/rpc/json/", port);
        let factory = ClientFactory::from_config(ClientConfig::with_rpc_url(rpc_url)).unwrap();
        let outcome = factory.client().call("vosManager/getVos").await;

        let error = outcome.error().unwrap();
        assert_eq!(error.kind, ErrorKind::TransportFailure);
        assert_eq!(error.error_id, "0");
        assert!(error.request_url.is_some());
    }
}
