use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use dropship_engine::{
    db_types::{LedgerEntry, LedgerKind, Money, WithdrawalRequest, WithdrawalStatus},
    traits::{WalletApiError, WithdrawalDecision},
    WalletApi,
};
use serde_json::json;

use super::{
    helpers::{as_user, json, send_request},
    mocks::MockWalletManager,
};
use crate::routes::{
    MyBalanceRoute,
    MyWalletRoute,
    PendingWithdrawalsRoute,
    ProcessWithdrawalRoute,
    RequestWithdrawalRoute,
    SupplierWalletRoute,
    TopUpRoute,
    WalletAuditRoute,
};

#[actix_web::test]
async fn fetch_my_balance() {
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_balance().withf(|user_id| *user_id == 3).returning(|_| Ok(Money::from_cents(2_000)));
    let req = as_user(TestRequest::get().uri("/balance"), 3, "manager");
    let (status, body) = send_request(req, configure(wallets)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"user_id":3,"balance":2000}"#);
}

#[actix_web::test]
async fn fetch_my_wallet() {
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_ledger_entries().returning(|user_id| {
        Ok(vec![
            entry(2, user_id, LedgerKind::OrderPayment, -3_000, 2_000),
            entry(1, user_id, LedgerKind::Topup, 5_000, 5_000),
        ])
    });
    let req = as_user(TestRequest::get().uri("/wallet"), 3, "dropshipper");
    let (status, body) = send_request(req, configure(wallets)).await;
    assert_eq!(status, StatusCode::OK);
    let wallet = json(&body);
    assert_eq!(wallet["balance"], 2_000);
    assert_eq!(wallet["entries"][0]["kind"], "order_payment");
    assert_eq!(wallet["entries"][1]["amount"], 5_000);
}

#[actix_web::test]
async fn top_up_my_wallet() {
    let mut wallets = MockWalletManager::new();
    wallets
        .expect_top_up()
        .withf(|user_id, amount, note| {
            *user_id == 3 && *amount == Money::from_cents(5_000) && note.to_string() == "Manual top-up"
        })
        .returning(|user_id, amount, _| Ok(entry(1, user_id, LedgerKind::Topup, amount.value(), amount.value())));
    let req = as_user(TestRequest::post().uri("/wallet/topup"), 3, "dropshipper").set_json(json!({"amount": 5000}));
    let (status, body) = send_request(req, configure(wallets)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["balance_after"], 5_000);
}

#[actix_web::test]
async fn top_up_with_a_negative_amount() {
    let req = as_user(TestRequest::post().uri("/wallet/topup"), 3, "dropshipper").set_json(json!({"amount": -100}));
    let (status, body) = send_request(req, configure(MockWalletManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Amount must be positive"), "was: {body}");
}

#[actix_web::test]
async fn supplier_wallet() {
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_balance().returning(|_| Ok(Money::from_cents(1_500)));
    wallets.expect_fetch_pending_earnings().returning(|_| Ok(Money::from_cents(4_000)));
    wallets
        .expect_fetch_withdrawals_for_user()
        .withf(|user_id, limit| *user_id == 100 && *limit > 0)
        .returning(|user_id, _| Ok(vec![withdrawal(1, user_id, 500, WithdrawalStatus::Pending)]));
    let req = as_user(TestRequest::get().uri("/supplier/wallet"), 100, "supplier");
    let (status, body) = send_request(req, configure(wallets)).await;
    assert_eq!(status, StatusCode::OK);
    let wallet = json(&body);
    assert_eq!(wallet["available"], 1_500);
    assert_eq!(wallet["pending"], 4_000);
    assert_eq!(wallet["withdrawals"][0]["status"], "pending");
}

#[actix_web::test]
async fn request_withdrawal() {
    let mut wallets = MockWalletManager::new();
    wallets
        .expect_request_withdrawal()
        .withf(|_, amount, bank| *amount == Money::from_cents(1_000) && bank.to_string() == "NL91 ABNA 0417 1643 00")
        .returning(|user_id, amount, _| Ok(withdrawal(4, user_id, amount.value(), WithdrawalStatus::Pending)));
    let req = as_user(TestRequest::post().uri("/supplier/withdrawals"), 100, "supplier")
        .set_json(json!({"amount": 1000, "bank_details": " NL91 ABNA 0417 1643 00 "}));
    let (status, body) = send_request(req, configure(wallets)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json(&body)["id"], 4);
}

#[actix_web::test]
async fn withdraw_more_than_available() {
    let mut wallets = MockWalletManager::new();
    wallets.expect_request_withdrawal().returning(|_, amount, _| {
        Err(WalletApiError::InsufficientFunds { required: amount, available: Money::from_cents(10) })
    });
    let req = as_user(TestRequest::post().uri("/supplier/withdrawals"), 100, "supplier")
        .set_json(json!({"amount": 1000, "bank_details": "NL91"}));
    let (status, _) = send_request(req, configure(wallets)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[actix_web::test]
async fn withdrawals_are_for_managers_only() {
    let req = as_user(TestRequest::get().uri("/manager/withdrawals"), 100, "supplier,dropshipper");
    let (status, _) = send_request(req, configure(MockWalletManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn list_pending_withdrawals() {
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_pending_withdrawals().returning(|| {
        Ok(vec![
            withdrawal(1, 100, 500, WithdrawalStatus::Pending),
            withdrawal(2, 101, 700, WithdrawalStatus::Pending),
        ])
    });
    let req = as_user(TestRequest::get().uri("/manager/withdrawals"), 1, "manager");
    let (status, body) = send_request(req, configure(wallets)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body).as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn reject_a_withdrawal() {
    let mut wallets = MockWalletManager::new();
    wallets
        .expect_process_withdrawal()
        .withf(|id, decision| *id == 2 && *decision == WithdrawalDecision::Reject { reason: "Closed account".into() })
        .returning(|id, _| {
            let mut request = withdrawal(id, 101, 700, WithdrawalStatus::Rejected);
            request.rejection_reason = Some("Closed account".into());
            Ok(request)
        });
    let req = as_user(TestRequest::patch().uri("/manager/withdrawals/2"), 1, "manager")
        .set_json(json!({"action": "reject", "rejection_reason": "Closed account"}));
    let (status, body) = send_request(req, configure(wallets)).await;
    assert_eq!(status, StatusCode::OK);
    let request = json(&body);
    assert_eq!(request["status"], "rejected");
    assert_eq!(request["rejection_reason"], "Closed account");
}

#[actix_web::test]
async fn reject_without_a_reason() {
    let req = as_user(TestRequest::patch().uri("/manager/withdrawals/2"), 1, "manager")
        .set_json(json!({"action": "reject"}));
    let (status, body) = send_request(req, configure(MockWalletManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"A reason is required to reject a withdrawal"}"#);
}

#[actix_web::test]
async fn approve_a_processed_withdrawal() {
    let mut wallets = MockWalletManager::new();
    wallets
        .expect_process_withdrawal()
        .returning(|id, _| Err(WalletApiError::WithdrawalAlreadyProcessed { id, status: WithdrawalStatus::Approved }));
    let req = as_user(TestRequest::patch().uri("/manager/withdrawals/2"), 1, "manager")
        .set_json(json!({"action": "approve"}));
    let (status, body) = send_request(req, configure(wallets)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Withdrawal request #2 has already been approved"}"#);
}

#[actix_web::test]
async fn audit_a_wallet() {
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_balance().withf(|user_id| *user_id == 9).returning(|_| Ok(Money::from_cents(2_000)));
    wallets.expect_fetch_ledger_sum().withf(|user_id| *user_id == 9).returning(|_| Ok(Money::from_cents(2_500)));
    let req = as_user(TestRequest::get().uri("/manager/wallets/9/audit"), 1, "manager");
    let (status, body) = send_request(req, configure(wallets)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"user_id": 9, "snapshot": 2000, "replayed": 2500, "consistent": false}));
}

fn configure(wallets: MockWalletManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(WalletApi::new(wallets)))
            .service(MyBalanceRoute::<MockWalletManager>::new())
            .service(MyWalletRoute::<MockWalletManager>::new())
            .service(TopUpRoute::<MockWalletManager>::new())
            .service(SupplierWalletRoute::<MockWalletManager>::new())
            .service(RequestWithdrawalRoute::<MockWalletManager>::new())
            .service(PendingWithdrawalsRoute::<MockWalletManager>::new())
            .service(ProcessWithdrawalRoute::<MockWalletManager>::new())
            .service(WalletAuditRoute::<MockWalletManager>::new());
    }
}

fn entry(id: i64, user_id: i64, kind: LedgerKind, amount: i64, balance_after: i64) -> LedgerEntry {
    LedgerEntry {
        id,
        user_id,
        kind,
        amount: Money::from_cents(amount),
        balance_after: Money::from_cents(balance_after),
        note: kind.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    }
}

fn withdrawal(id: i64, user_id: i64, amount: i64, status: WithdrawalStatus) -> WithdrawalRequest {
    WithdrawalRequest {
        id,
        user_id,
        amount: Money::from_cents(amount),
        status,
        bank_details: "NL91 ABNA 0417 1643 00".to_string(),
        rejection_reason: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    }
}
