use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use multibank_core::{AppError, ProviderId};
use multibank_domain::{
    AccountClosure, Consent, ConsentScope, DomainEvent, NewAccount, NewCard, PaymentOrder,
    ProductClosure, ProductPurchase,
};
use rust_decimal::Decimal;
use serde_json::json;

use crate::consent_service::ConsentPolicy;
use crate::provider_ports::HttpMethod;
use crate::test_support::{
    FakeConsentStore, RecordingPublisher, ScriptedTransport, client_id, profile,
};
use crate::token_cache::TokenCachePolicy;

use super::ProviderClient;

struct Harness {
    client: ProviderClient,
    transport: Arc<ScriptedTransport>,
    events: Arc<RecordingPublisher>,
}

async fn harness(with_consents: bool) -> Harness {
    let transport = Arc::new(ScriptedTransport::default());
    let store = Arc::new(FakeConsentStore::default());
    let events = Arc::new(RecordingPublisher::default());

    if with_consents {
        store
            .seed(Consent::approved(
                ProviderId::Abank,
                client_id("team-1-1"),
                ConsentScope::default_account(),
                "account-consent",
                Utc::now(),
            ))
            .await;
        store
            .seed(Consent::approved(
                ProviderId::Abank,
                client_id("team-1-1"),
                ConsentScope::default_product(),
                "product-consent",
                Utc::now(),
            ))
            .await;
    }

    let profile = Arc::unwrap_or_clone(profile(ProviderId::Abank));
    let client = ProviderClient::new(
        profile,
        transport.clone(),
        store,
        events.clone(),
        TokenCachePolicy::default(),
        ConsentPolicy {
            poll_delay: StdDuration::ZERO,
            ..ConsentPolicy::default()
        },
    );

    Harness {
        client,
        transport,
        events,
    }
}

async fn script_accounts(transport: &ScriptedTransport) {
    transport
        .respond(
            HttpMethod::Get,
            "/accounts",
            json!({"data": {"account": [
                {"accountId": "acc-1", "status": "Enabled", "currency": "RUB"},
                {"accountId": "acc-2", "status": "Disabled", "currency": "RUB"}
            ]}}),
        )
        .await;
    for account_id in ["acc-1", "acc-2"] {
        transport
            .respond(
                HttpMethod::Get,
                &format!("/accounts/{account_id}/balances"),
                json!({"data": {"balance": [
                    {"type": "InterimAvailable", "amount": {"amount": "80.00", "currency": "RUB"}},
                    {"type": "InterimBooked", "dateTime": "2025-01-01T00:00:00Z",
                     "amount": {"amount": "100.00", "currency": "RUB"}}
                ]}}),
            )
            .await;
        transport
            .respond(
                HttpMethod::Get,
                &format!("/accounts/{account_id}/transactions"),
                json!({"data": {"transaction": [
                    {"transactionId": format!("{account_id}-tx"), "amount": {"amount": "5", "currency": "RUB"}}
                ]}}),
            )
            .await;
    }
}

#[tokio::test]
async fn fetch_accounts_merges_balances_and_transactions() {
    let harness = harness(true).await;
    script_accounts(&harness.transport).await;

    let accounts = harness
        .client
        .fetch_accounts(&client_id("team-1-1"))
        .await
        .unwrap_or_default();

    assert_eq!(accounts.len(), 2);
    let first = &accounts[0];
    assert_eq!(first.current_balance, Some(Decimal::new(100, 0)));
    assert_eq!(first.available_balance, Some(Decimal::new(80, 0)));
    assert!(first.last_updated.is_some());
    assert_eq!(first.transactions.len(), 1);
    assert_eq!(first.transactions[0].account_id, "acc-1");

    let listing = harness
        .transport
        .data_requests()
        .await
        .into_iter()
        .find(|request| request.path == "/accounts")
        .unwrap_or_else(|| unreachable!());
    assert_eq!(listing.header("x-consent-id"), Some("account-consent"));
    assert_eq!(listing.header("x-requesting-bank"), Some("team-1"));
    assert_eq!(listing.query_value("client_id"), Some("team-1-1"));
}

#[tokio::test]
async fn balance_failure_fails_the_whole_fetch() {
    let harness = harness(true).await;
    script_accounts(&harness.transport).await;
    harness
        .transport
        .fail(
            HttpMethod::Get,
            "/accounts/acc-2/balances",
            AppError::Provider {
                provider: ProviderId::Abank,
                status: Some(503),
                message: "unavailable".to_owned(),
            },
        )
        .await;

    let result = harness.client.fetch_accounts(&client_id("team-1-1")).await;
    assert!(matches!(
        result,
        Err(AppError::Provider {
            status: Some(503),
            ..
        })
    ));
}

#[tokio::test]
async fn missing_data_envelope_yields_no_accounts() {
    let harness = harness(true).await;
    harness
        .transport
        .respond(HttpMethod::Get, "/accounts", json!({"meta": {}}))
        .await;

    let accounts = harness.client.fetch_accounts(&client_id("team-1-1")).await;
    assert!(accounts.is_ok_and(|accounts| accounts.is_empty()));
}

#[tokio::test]
async fn pending_consent_aborts_before_data_calls() {
    let harness = harness(false).await;
    harness
        .transport
        .respond(
            HttpMethod::Post,
            "/account-consents/request",
            json!({"status": "pending", "request_id": "req-1"}),
        )
        .await;
    harness
        .transport
        .respond(
            HttpMethod::Get,
            "/account-consents/req-1",
            json!({"data": {"status": "AwaitingAuthorization"}}),
        )
        .await;

    let result = harness.client.fetch_accounts(&client_id("team-1-1")).await;

    assert!(result.as_ref().is_err_and(AppError::is_consent_pending));
    assert_eq!(harness.transport.count(HttpMethod::Get, "/accounts").await, 0);
}

#[tokio::test]
async fn create_account_publishes_account_opened() {
    let harness = harness(true).await;
    harness
        .transport
        .respond(
            HttpMethod::Post,
            "/accounts",
            json!({"data": {"accountId": "acc-new", "status": "Enabled", "account_number": "4081"}}),
        )
        .await;

    let account = harness
        .client
        .create_account(
            &client_id("team-1-1"),
            &NewAccount {
                account_type: "checking".to_owned(),
                initial_balance: Decimal::new(1000, 0),
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(account.account_number(), "4081");
    let events = harness.events.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type(), "account_opened");

    let request = harness
        .transport
        .data_requests()
        .await
        .into_iter()
        .find(|request| request.path == "/accounts")
        .unwrap_or_else(|| unreachable!());
    let body = request.body.unwrap_or_default();
    assert_eq!(body["initial_balance"], json!(1000.0));
}

#[tokio::test]
async fn failed_close_propagates_without_event() {
    let harness = harness(true).await;
    harness
        .transport
        .fail(
            HttpMethod::Put,
            "/accounts/acc-1/close",
            AppError::Provider {
                provider: ProviderId::Abank,
                status: Some(409),
                message: "balance not zero".to_owned(),
            },
        )
        .await;

    let closure = AccountClosure {
        account_id: "acc-1".to_owned(),
        action: "transfer".to_owned(),
        destination_account_id: Some("acc-2".to_owned()),
    };
    let result = harness
        .client
        .close_account(&client_id("team-1-1"), &closure)
        .await;

    assert!(result.is_err());
    assert!(harness.events.events().is_empty());
}

#[tokio::test]
async fn close_account_publishes_account_closed() {
    let harness = harness(true).await;
    harness
        .transport
        .respond(HttpMethod::Put, "/accounts/acc-1/close", json!({}))
        .await;

    let closure = AccountClosure {
        account_id: "acc-1".to_owned(),
        action: "transfer".to_owned(),
        destination_account_id: None,
    };
    let result = harness
        .client
        .close_account(&client_id("team-1-1"), &closure)
        .await;

    assert!(result.is_ok());
    let events = harness.events.events();
    assert!(matches!(
        events.first(),
        Some(DomainEvent::AccountClosed {
            provider: ProviderId::Abank,
            ..
        })
    ));
}

#[tokio::test]
async fn payment_uses_single_use_consent_and_posts_transaction() {
    let harness = harness(true).await;
    harness
        .transport
        .respond(
            HttpMethod::Post,
            "/payment-consents/request",
            json!({"status": "approved", "consent_id": "pay-consent"}),
        )
        .await;
    harness
        .transport
        .respond(
            HttpMethod::Post,
            "/payments",
            json!({"data": {"paymentId": "payment-1"}}),
        )
        .await;

    let order = PaymentOrder::new("4081", "4082", ProviderId::Vbank, Decimal::new(500, 0));
    let payment_id = harness
        .client
        .create_payment(&client_id("team-1-1"), &order)
        .await
        .unwrap_or_default();
    assert_eq!(payment_id, "payment-1");

    let request = harness
        .transport
        .data_requests()
        .await
        .into_iter()
        .find(|request| request.path == "/payments")
        .unwrap_or_else(|| unreachable!());
    assert_eq!(request.header("x-payment-consent-id"), Some("pay-consent"));
    let body = request.body.unwrap_or_default();
    assert_eq!(
        body["data"]["initiation"]["creditorAccount"]["bank_code"],
        "vbank"
    );

    match harness.events.events().first() {
        Some(DomainEvent::TransactionPosted { transaction, .. }) => {
            assert_eq!(transaction.transaction_id, "payment-1");
            assert_eq!(transaction.account_id, "4081");
            assert_eq!(transaction.credit_debit_indicator.as_deref(), Some("Debit"));
        }
        other => panic!("expected transaction event, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_payment_consent_skips_payment() {
    let harness = harness(true).await;
    harness
        .transport
        .respond(
            HttpMethod::Post,
            "/payment-consents/request",
            json!({"status": "rejected"}),
        )
        .await;

    let order = PaymentOrder::new("4081", "4082", ProviderId::Sbank, Decimal::new(10, 0));
    let result = harness
        .client
        .create_payment(&client_id("team-1-1"), &order)
        .await;

    assert!(matches!(result, Err(AppError::ConsentUnavailable { .. })));
    assert_eq!(harness.transport.count(HttpMethod::Post, "/payments").await, 0);
}

#[tokio::test]
async fn buy_product_publishes_agreement_from_client_list() {
    let harness = harness(true).await;
    harness
        .transport
        .respond(
            HttpMethod::Post,
            "/product-agreements",
            json!({"data": {"agreement_id": "agr-1"}}),
        )
        .await;
    harness
        .transport
        .respond(
            HttpMethod::Get,
            "/product-agreements",
            json!({"data": [
                {"product_id": "dep-1", "agreement_id": "agr-1", "status": "active", "amount": 5000}
            ]}),
        )
        .await;

    let purchase = ProductPurchase {
        product_id: "dep-1".to_owned(),
        product_type: Some("deposit".to_owned()),
        amount: Decimal::new(5000, 0),
        source_account_id: "acc-1".to_owned(),
    };
    let purchased = harness
        .client
        .buy_product(&client_id("team-1-1"), &purchase)
        .await
        .unwrap_or_default();

    assert_eq!(
        purchased.and_then(|product| product.agreement_id),
        Some("agr-1".to_owned())
    );
    assert_eq!(harness.events.events().len(), 1);

    let request = harness
        .transport
        .data_requests()
        .await
        .into_iter()
        .find(|request| request.path == "/product-agreements")
        .unwrap_or_else(|| unreachable!());
    assert_eq!(
        request.header("x-product-agreement-consent-id"),
        Some("product-consent")
    );
}

#[tokio::test]
async fn purchase_survives_failed_read_back() {
    let harness = harness(true).await;
    harness
        .transport
        .respond(HttpMethod::Post, "/product-agreements", json!({}))
        .await;
    harness
        .transport
        .fail(
            HttpMethod::Get,
            "/product-agreements",
            AppError::ProviderTimeout {
                provider: ProviderId::Abank,
                timeout_ms: 15_000,
            },
        )
        .await;

    let purchase = ProductPurchase {
        product_id: "dep-1".to_owned(),
        product_type: Some("deposit".to_owned()),
        amount: Decimal::new(5000, 0),
        source_account_id: "acc-1".to_owned(),
    };
    let purchased = harness
        .client
        .buy_product(&client_id("team-1-1"), &purchase)
        .await;

    assert!(matches!(purchased, Ok(None)));
    assert!(harness.events.events().is_empty());
}

#[tokio::test]
async fn purchase_above_consent_ceiling_is_rejected_locally() {
    let harness = harness(true).await;
    let purchase = ProductPurchase {
        product_id: "loan-1".to_owned(),
        product_type: None,
        amount: Decimal::new(2_000_000, 0),
        source_account_id: "acc-1".to_owned(),
    };

    let result = harness
        .client
        .buy_product(&client_id("team-1-1"), &purchase)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(harness.transport.data_requests().await.is_empty());
}

#[tokio::test]
async fn purchase_of_uncovered_product_type_is_rejected_locally() {
    let harness = harness(true).await;
    let purchase = ProductPurchase {
        product_id: "mort-1".to_owned(),
        product_type: Some("mortgage".to_owned()),
        amount: Decimal::new(5000, 0),
        source_account_id: "acc-1".to_owned(),
    };

    let result = harness
        .client
        .buy_product(&client_id("team-1-1"), &purchase)
        .await;

    assert!(
        matches!(result, Err(AppError::Validation(message)) if message.contains("mortgage"))
    );
    assert!(harness.transport.data_requests().await.is_empty());
    assert!(harness.events.events().is_empty());
}

#[tokio::test]
async fn rejected_bearer_is_exchanged_again() {
    let harness = harness(false).await;
    harness
        .transport
        .fail(
            HttpMethod::Get,
            "/products",
            AppError::Provider {
                provider: ProviderId::Abank,
                status: Some(401),
                message: "token expired".to_owned(),
            },
        )
        .await;
    harness
        .transport
        .respond(
            HttpMethod::Get,
            "/products",
            json!({"data": {"product": [{"productId": "dep-1", "productType": "deposit"}]}}),
        )
        .await;

    let first = harness.client.list_products_catalog().await;
    let second = harness.client.list_products_catalog().await;

    assert!(matches!(
        first,
        Err(AppError::Provider {
            status: Some(401),
            ..
        })
    ));
    assert!(second.is_ok_and(|catalog| catalog.len() == 1));
    assert_eq!(
        harness
            .transport
            .count(HttpMethod::Post, "/auth/bank-token")
            .await,
        2
    );
}

#[tokio::test]
async fn other_upstream_failures_keep_the_cached_bearer() {
    let harness = harness(false).await;
    harness
        .transport
        .fail(
            HttpMethod::Get,
            "/products",
            AppError::Provider {
                provider: ProviderId::Abank,
                status: Some(503),
                message: "maintenance".to_owned(),
            },
        )
        .await;

    assert!(harness.client.list_products_catalog().await.is_err());
    assert!(harness.client.list_products_catalog().await.is_err());

    assert_eq!(
        harness
            .transport
            .count(HttpMethod::Post, "/auth/bank-token")
            .await,
        1
    );
}

#[tokio::test]
async fn catalog_needs_no_consent() {
    let harness = harness(false).await;
    harness
        .transport
        .respond(
            HttpMethod::Get,
            "/products",
            json!({"data": {"product": [
                {"productId": "dep-1", "productType": "deposit", "minAmount": "1000", "maxAmount": "100000"},
                {"productId": "card-1", "productType": "card"}
            ]}}),
        )
        .await;

    let catalog = harness
        .client
        .list_products_catalog()
        .await
        .unwrap_or_default();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog[0].min_amount, Some(Decimal::new(1000, 0)));
    let requests = harness.transport.data_requests().await;
    assert!(requests.iter().all(|request| !request.path.contains("consent")));
}

#[tokio::test]
async fn cards_are_listed_and_read_with_defaults() {
    let harness = harness(true).await;
    harness
        .transport
        .respond(
            HttpMethod::Get,
            "/cards",
            json!({"data": {"cards": [{"card_id": "card-1", "status": "active"}]}}),
        )
        .await;
    harness
        .transport
        .respond(
            HttpMethod::Get,
            "/cards/card-1",
            json!({"data": {"cardId": "card-1", "limits": {"daily_limit": 1000}}}),
        )
        .await;

    let cards = harness
        .client
        .list_cards(&client_id("team-1-1"))
        .await
        .unwrap_or_default();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].card_type, "unknown");

    let card = harness
        .client
        .card_details(&client_id("team-1-1"), "card-1")
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(
        card.limits.and_then(|limits| limits.daily_limit),
        Some(Decimal::new(1000, 0))
    );
}

#[tokio::test]
async fn card_and_product_lifecycle_calls_hit_expected_paths() {
    let harness = harness(true).await;
    harness
        .transport
        .respond(
            HttpMethod::Post,
            "/cards",
            json!({"data": {"card_id": "card-9", "card_name": "Travel"}}),
        )
        .await;
    harness
        .transport
        .respond(HttpMethod::Delete, "/cards/card-9", json!({}))
        .await;
    harness
        .transport
        .respond(HttpMethod::Delete, "/product-agreements/agr-1", json!({}))
        .await;
    let client = client_id("team-1-1");

    let card = harness
        .client
        .create_card(
            &client,
            &NewCard {
                account_number: "4081".to_owned(),
                card_type: "debit".to_owned(),
                card_name: "Travel".to_owned(),
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(card.card_name, "Travel");

    assert!(harness.client.delete_card(&client, "card-9").await.is_ok());

    let closure = ProductClosure {
        agreement_id: "agr-1".to_owned(),
        repayment_account_id: "acc-1".to_owned(),
        repayment_amount: Decimal::new(100, 0),
    };
    assert!(harness.client.delete_product(&client, &closure).await.is_ok());

    let deletion = harness
        .transport
        .data_requests()
        .await
        .into_iter()
        .find(|request| request.path == "/product-agreements/agr-1")
        .unwrap_or_else(|| unreachable!());
    let body = deletion.body.unwrap_or_default();
    assert_eq!(body["repayment_account_id"], "acc-1");
}
