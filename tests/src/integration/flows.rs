//! # Integration Test Flows
//!
//! Modules created from a gateway configuration talking to each other over
//! the bus:
//!
//! 1. **hello_world → recorder**: timed publishes reach every other module
//! 2. **host → echo → recorder**: a module publishing from inside `receive`
//! 3. **teardown**: every module is detached and destroyed exactly once

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use gateway_runtime::modules::{ECHOED_BY_PROPERTY, HELLO_WORLD_CONTENT};
    use gateway_runtime::{Gateway, GatewayConfig, ModuleEntry};
    use gateway_types::{Message, Properties};
    use serde_json::json;

    use crate::integration::support::{recorder, registry_with_recorder, wait_until};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn config(modules: serde_json::Value) -> GatewayConfig {
        GatewayConfig::from_json(&json!({ "modules": modules }).to_string())
            .expect("valid test config")
    }

    // =============================================================================
    // FLOWS
    // =============================================================================

    #[tokio::test]
    async fn test_hello_world_reaches_every_recorder() {
        let (registry, created) = registry_with_recorder();
        let gateway = Gateway::create(
            config(json!([
                { "name": "hello", "kind": "hello_world", "args": { "interval_ms": 10 } },
                { "name": "a", "kind": "recorder", "args": "a" },
                { "name": "b", "kind": "recorder", "args": "b" }
            ])),
            &registry,
        )
        .await
        .unwrap();

        let a = recorder(&created, "a").unwrap();
        let b = recorder(&created, "b").unwrap();
        assert!(wait_until(|| a.seen_count() >= 2 && b.seen_count() >= 2).await);
        gateway.destroy().await;

        for message in a.seen().iter().chain(b.seen().iter()) {
            assert_eq!(message.content_str(), HELLO_WORLD_CONTENT);
            assert_eq!(message.property("source"), Some("hello_world"));
        }
    }

    #[tokio::test]
    async fn test_recorders_share_one_message_instance() {
        let (registry, created) = registry_with_recorder();
        let gateway = Gateway::create(
            config(json!([
                { "name": "a", "kind": "recorder", "args": "a" },
                { "name": "b", "kind": "recorder", "args": "b" }
            ])),
            &registry,
        )
        .await
        .unwrap();

        gateway
            .publish(Message::from_text("shared", Properties::new()))
            .unwrap();

        let a = recorder(&created, "a").unwrap();
        let b = recorder(&created, "b").unwrap();
        assert!(wait_until(|| a.seen_count() == 1 && b.seen_count() == 1).await);
        assert!(Arc::ptr_eq(&a.seen()[0], &b.seen()[0]));
        gateway.destroy().await;
    }

    #[tokio::test]
    async fn test_echo_republishes_to_others_once() {
        let (registry, created) = registry_with_recorder();
        let gateway = Gateway::create(
            config(json!([
                { "name": "echo", "kind": "echo" },
                { "name": "sink", "kind": "recorder", "args": "sink" }
            ])),
            &registry,
        )
        .await
        .unwrap();
        let echo_handle = gateway.module_handle("echo").unwrap();

        gateway
            .publish(Message::from_text("ping", Properties::new()).with_property("id", "7"))
            .unwrap();

        let sink = recorder(&created, "sink").unwrap();
        assert!(wait_until(|| sink.seen_count() >= 2).await);
        // Give a stray third message time to show up
        tokio::time::sleep(Duration::from_millis(50)).await;
        gateway.destroy().await;

        let seen = sink.seen();
        assert_eq!(seen.len(), 2);
        let echoed: Vec<_> = seen
            .iter()
            .filter(|m| m.property(ECHOED_BY_PROPERTY).is_some())
            .collect();
        assert_eq!(echoed.len(), 1);
        assert_eq!(echoed[0].content_str(), "ping");
        assert_eq!(echoed[0].property("id"), Some("7"));
        assert_eq!(
            echoed[0].property(ECHOED_BY_PROPERTY),
            Some(echo_handle.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_destroy_reaches_every_module() {
        let (registry, created) = registry_with_recorder();
        let names = ["r1", "r2", "r3"];
        let modules: Vec<_> = names
            .iter()
            .map(|n| json!({ "name": n, "kind": "recorder", "args": n }))
            .collect();
        let gateway = Gateway::create(config(json!(modules)), &registry)
            .await
            .unwrap();
        let bus = gateway.bus().clone();
        assert_eq!(bus.module_count(), 3);

        gateway.destroy().await;

        assert_eq!(bus.module_count(), 0);
        for name in names {
            assert!(recorder(&created, name).unwrap().is_destroyed());
        }
    }

    #[tokio::test]
    async fn test_removed_module_receives_nothing_more() {
        let (registry, created) = registry_with_recorder();
        let mut gateway = Gateway::create(
            config(json!([
                { "name": "keep", "kind": "recorder", "args": "keep" },
                { "name": "drop", "kind": "recorder", "args": "drop" }
            ])),
            &registry,
        )
        .await
        .unwrap();

        gateway.remove_module("drop").await.unwrap();
        let dropped = recorder(&created, "drop").unwrap();
        assert!(dropped.is_destroyed());

        assert_eq!(
            gateway
                .publish(Message::from_text("after", Properties::new()))
                .unwrap(),
            1
        );
        let keep = recorder(&created, "keep").unwrap();
        assert!(wait_until(|| keep.seen_count() == 1).await);
        assert_eq!(dropped.seen_count(), 0);

        // Add it back under the same name
        gateway
            .add_module(&ModuleEntry::new("drop", "recorder", json!("drop")), &registry)
            .await
            .unwrap();
        assert_eq!(gateway.module_names(), vec!["keep", "drop"]);
        gateway.destroy().await;
    }
}
