//! Engine-level tests driving the per-kind reconcilers through the injected
//! Terminal API and dependency resolver doubles, without a cluster.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use crate::common::{card, provisioning, ready, status_error, MockTerminal, StubResolver};
use terminal_operator::controller::drift::advance_phase;
use terminal_operator::controller::reconcile::{card as card_engine, order, subscription, token};
use terminal_operator::controller::{ReconcileError, Severity};
use terminal_operator::crd::{OrderPhase, OrderSpec, Reference};
use terminal_operator::terminal::TerminalApi;

fn reference(name: &str) -> Reference {
    Reference {
        kind: None,
        name: name.to_string(),
        namespace: None,
    }
}

fn order_spec() -> OrderSpec {
    OrderSpec {
        product_variant_id: "var_01JNH7GTF9FBA62Y0RT0WMK3BT".to_string(),
        quantity: 2,
        address_ref: reference("home"),
        card_ref: reference("visa"),
        profile_ref: None,
    }
}

mod card_registration {
    use super::*;

    #[tokio::test]
    async fn registers_a_new_card() {
        let terminal = MockTerminal::default();
        terminal.queue_create_card(Ok("crd_new".to_string()));

        let id = card_engine::register_card(&terminal, "tok_visa").await.unwrap();

        assert_eq!(id, "crd_new");
        assert_eq!(terminal.count("card.create"), 1);
        assert_eq!(terminal.count("card.list"), 0);
    }

    #[tokio::test]
    async fn already_exists_falls_back_to_the_card_list() {
        let terminal = MockTerminal::default();
        terminal.queue_create_card(Err(status_error(400, Some("already_exists"))));
        terminal.queue_list_cards(Ok(vec![card("crd_existing")]));

        let id = card_engine::register_card(&terminal, "tok_visa").await.unwrap();

        assert_eq!(id, "crd_existing");
        // Exactly one create attempt; the fallback lists instead of retrying.
        assert_eq!(terminal.count("card.create"), 1);
        assert_eq!(terminal.count("card.list"), 1);
    }

    #[tokio::test]
    async fn already_exists_with_empty_list_is_a_contract_violation() {
        let terminal = MockTerminal::default();
        terminal.queue_create_card(Err(status_error(400, Some("already_exists"))));
        terminal.queue_list_cards(Ok(Vec::new()));

        let err = card_engine::register_card(&terminal, "tok_visa")
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::ContractViolation(_)));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn plain_rejection_does_not_consult_the_list() {
        let terminal = MockTerminal::default();
        terminal.queue_create_card(Err(status_error(400, Some("validation"))));

        let err = card_engine::register_card(&terminal, "tok_bogus")
            .await
            .unwrap_err();

        assert!(err.is_permanent());
        assert_eq!(terminal.count("card.list"), 0);
    }
}

mod order_dependencies {
    use super::*;

    #[tokio::test]
    async fn processing_address_gates_the_order_with_a_15s_retry() {
        let terminal = MockTerminal::default();
        let resolver = StubResolver {
            address: Some(provisioning("Processing")),
            card: Some(ready("Registered", Some("crd_1"))),
            profile: None,
        };
        let mut flags = BTreeMap::new();

        // Mirror the reconcile flow: the external action only runs once
        // every gate holds.
        let err = match order::resolve_inputs(&resolver, "default", &order_spec(), &mut flags).await
        {
            Err(err) => err,
            Ok(inputs) => {
                terminal
                    .create_order(&inputs.address_id, &inputs.card_id, &order_spec().variants())
                    .await
                    .unwrap();
                panic!("gate should not have passed");
            }
        };

        assert!(matches!(err, ReconcileError::DependencyNotReady { .. }));
        assert_eq!(err.severity(), Severity::Transient(Duration::from_secs(15)));
        assert_eq!(flags.get("address"), Some(&false));
        assert_eq!(terminal.count("order.create"), 0);
    }

    #[tokio::test]
    async fn missing_address_retries_after_60s() {
        let resolver = StubResolver {
            address: None,
            card: Some(ready("Registered", Some("crd_1"))),
            profile: None,
        };
        let mut flags = BTreeMap::new();

        let err = order::resolve_inputs(&resolver, "default", &order_spec(), &mut flags)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::DependencyNotFound { .. }));
        assert_eq!(err.severity(), Severity::Transient(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn partial_readiness_is_recorded_incrementally() {
        let resolver = StubResolver {
            address: Some(ready("Verified", Some("shp_1"))),
            card: Some(provisioning("Pending")),
            profile: None,
        };
        let mut flags = BTreeMap::new();

        let err = order::resolve_inputs(&resolver, "default", &order_spec(), &mut flags)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::DependencyNotReady { .. }));
        // The address gate already passed and stays recorded.
        assert_eq!(flags.get("address"), Some(&true));
        assert_eq!(flags.get("card"), Some(&false));
    }

    #[tokio::test]
    async fn ready_dependencies_feed_the_order_create_call() {
        let terminal = MockTerminal::default();
        terminal.queue_create_order(Ok("ord_1".to_string()));
        let resolver = StubResolver {
            address: Some(ready("Verified", Some("shp_1"))),
            card: Some(ready("Registered", Some("crd_1"))),
            profile: None,
        };
        let mut flags = BTreeMap::new();

        let spec = order_spec();
        let inputs = order::resolve_inputs(&resolver, "default", &spec, &mut flags)
            .await
            .unwrap();
        let order_id = terminal
            .create_order(&inputs.address_id, &inputs.card_id, &spec.variants())
            .await
            .unwrap();

        assert_eq!(order_id, "ord_1");
        assert_eq!(flags.get("address"), Some(&true));
        assert_eq!(flags.get("card"), Some(&true));
        assert_eq!(
            terminal.calls(),
            vec!["order.create shp_1 crd_1 var_01JNH7GTF9FBA62Y0RT0WMK3BTx2".to_string()]
        );
    }

    #[tokio::test]
    async fn unsynced_profile_gates_the_order() {
        let resolver = StubResolver {
            address: Some(ready("Verified", Some("shp_1"))),
            card: Some(ready("Registered", Some("crd_1"))),
            profile: Some(provisioning("Pending")),
        };
        let mut spec = order_spec();
        spec.profile_ref = Some(reference("me"));
        let mut flags = BTreeMap::new();

        let err = order::resolve_inputs(&resolver, "default", &spec, &mut flags)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::DependencyNotReady { .. }));
        assert_eq!(flags.get("profile"), Some(&false));
    }
}

mod failure_classification {
    use super::*;

    #[test]
    fn missing_product_variant_is_permanent() {
        let mut spec = order_spec();
        spec.product_variant_id = String::new();
        let err = order::validate(&spec).unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn simulated_503_is_transient_with_60s_delay() {
        let terminal = MockTerminal::default();
        terminal.queue_create_order(Err(status_error(503, None)));

        let err = terminal
            .create_order("shp_1", "crd_1", &BTreeMap::from([("var_1".to_string(), 1)]))
            .await
            .map_err(ReconcileError::External)
            .unwrap_err();

        assert_eq!(err.severity(), Severity::Transient(Duration::from_secs(60)));
        assert!(!err.is_permanent());
    }
}

mod subscriptions {
    use super::*;
    use terminal_operator::crd::{SubscriptionSchedule, SubscriptionSpec};

    fn subscription_spec() -> SubscriptionSpec {
        SubscriptionSpec {
            product_variant_id: "var_cron".to_string(),
            quantity: 1,
            schedule: Some(SubscriptionSchedule::Weekly { interval: 2 }),
            address_ref: reference("home"),
            card_ref: reference("visa"),
        }
    }

    #[tokio::test]
    async fn creation_uses_resolved_identifiers() {
        let terminal = MockTerminal::default();
        terminal.queue_create_subscription(Ok("sub_1".to_string()));
        let resolver = StubResolver {
            address: Some(ready("Verified", Some("shp_1"))),
            card: Some(ready("Registered", Some("crd_1"))),
            profile: None,
        };
        let mut flags = BTreeMap::new();

        let spec = subscription_spec();
        let inputs = subscription::resolve_inputs(&resolver, "default", &spec, &mut flags)
            .await
            .unwrap();
        let id = terminal
            .create_subscription(&subscription::payload(&spec, &inputs))
            .await
            .unwrap();

        assert_eq!(id, "sub_1");
        assert_eq!(
            terminal.calls(),
            vec!["subscription.create shp_1 crd_1".to_string()]
        );
    }

    #[tokio::test]
    async fn pending_card_gates_the_subscription() {
        let resolver = StubResolver {
            address: Some(ready("Verified", Some("shp_1"))),
            card: Some(provisioning("Processing")),
            profile: None,
        };
        let mut flags = BTreeMap::new();

        let err =
            subscription::resolve_inputs(&resolver, "default", &subscription_spec(), &mut flags)
                .await
                .unwrap_err();

        assert_eq!(err.severity(), Severity::Transient(Duration::from_secs(15)));
        assert_eq!(flags.get("card"), Some(&false));
    }
}

mod drift_monotonicity {
    use super::*;
    use terminal_operator::terminal::OrderInfo;

    #[test]
    fn shipped_does_not_regress_without_tracking() {
        let external = OrderInfo {
            id: "ord_1".to_string(),
            tracking: None,
        };
        assert_eq!(
            advance_phase(OrderPhase::Shipped, &external),
            OrderPhase::Shipped
        );
    }

    #[tokio::test]
    async fn vanished_order_classifies_as_permanent() {
        let terminal = MockTerminal::default();
        terminal.queue_get_order(Err(status_error(404, None)));

        let err = terminal
            .get_order("ord_gone")
            .await
            .map_err(ReconcileError::External)
            .unwrap_err();

        assert!(err.is_permanent());
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn no_external_identifier_means_no_external_call() {
        let terminal = MockTerminal::default();

        card_engine::discard(&terminal, None).await;
        token::discard(&terminal, None).await;
        subscription::discard(&terminal, None).await;

        assert!(terminal.calls().is_empty());
    }

    #[tokio::test]
    async fn not_found_on_delete_counts_as_success() {
        let terminal = MockTerminal::default();
        terminal.queue_delete(Err(status_error(404, None)));

        card_engine::discard(&terminal, Some("crd_1")).await;

        assert_eq!(terminal.count("card.delete"), 1);
    }

    #[tokio::test]
    async fn server_errors_on_delete_do_not_block_removal() {
        let terminal = MockTerminal::default();
        terminal.queue_delete(Err(status_error(500, None)));

        // Swallowed after logging; removal proceeds.
        subscription::discard(&terminal, Some("sub_1")).await;

        assert_eq!(terminal.count("subscription.delete"), 1);
    }
}
