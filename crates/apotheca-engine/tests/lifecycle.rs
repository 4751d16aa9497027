//! End-to-end lifecycle tests: upload → review → billing → settlement,
//! plus the alert evaluators, against an in-memory database.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use apotheca_core::{
    CoreError, NotificationKind, PaymentStatus, PaymentType, PickupMethod, PrescriptionStatus,
    Priority, UserRole,
};
use apotheca_db::repository::bill::BillRepository;
use apotheca_db::{Database, DbConfig, NotificationFilter};
use apotheca_engine::{
    ApprovedItem, ChargeRequest, Engine, EngineError, GatewayError, NewMedicine, PaymentGateway,
    PaymentReceipt, SessionContext, StaffDirectory,
};

// =============================================================================
// Test Fixtures
// =============================================================================

struct OkGateway;

#[async_trait]
impl PaymentGateway for OkGateway {
    async fn charge(&self, _request: &ChargeRequest) -> Result<PaymentReceipt, GatewayError> {
        Ok(PaymentReceipt {
            transaction_id: "txn-777".to_string(),
        })
    }
}

struct DecliningGateway;

#[async_trait]
impl PaymentGateway for DecliningGateway {
    async fn charge(&self, _request: &ChargeRequest) -> Result<PaymentReceipt, GatewayError> {
        Err(GatewayError::Declined("insufficient funds".to_string()))
    }
}

struct SlowGateway;

#[async_trait]
impl PaymentGateway for SlowGateway {
    async fn charge(&self, _request: &ChargeRequest) -> Result<PaymentReceipt, GatewayError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(PaymentReceipt {
            transaction_id: "never".to_string(),
        })
    }
}

fn pharmacist() -> SessionContext {
    SessionContext::new("pharm-1", UserRole::Pharmacist)
}

fn customer() -> SessionContext {
    SessionContext::new("cust-1", UserRole::Customer)
}

async fn engine_with(gateway: Arc<dyn PaymentGateway>) -> (Engine, Database) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let staff = StaffDirectory::new(vec!["pharm-1".to_string()], vec!["admin-1".to_string()]);
    (Engine::new(db.clone(), staff, gateway), db)
}

async fn engine() -> (Engine, Database) {
    engine_with(Arc::new(OkGateway)).await
}

async fn seed_medicine(engine: &Engine, name: &str, price_cents: i64, quantity: i64) -> String {
    engine
        .inventory
        .add_medicine(
            &pharmacist(),
            NewMedicine {
                name: name.to_string(),
                quantity,
                reorder_level: 5,
                unit_price_cents: price_cents,
                expiry_date: None,
            },
        )
        .await
        .unwrap()
        .id
}

/// Uploads and approves a two-line prescription: 3 x $10 + 1 x $5.
async fn approved_prescription(engine: &Engine) -> (String, apotheca_core::Bill) {
    let ibuprofen = seed_medicine(engine, "Ibuprofen", 1000, 50).await;
    let vitamin_c = seed_medicine(engine, "Vitamin C", 500, 50).await;

    let rx = engine
        .prescriptions
        .upload(&customer(), "Dr. Mensah")
        .await
        .unwrap();
    let bill = engine
        .prescriptions
        .approve(
            &pharmacist(),
            &rx.id,
            &[
                ApprovedItem {
                    medicine_id: ibuprofen,
                    quantity: 3,
                    instructions: Some("After meals".to_string()),
                },
                ApprovedItem {
                    medicine_id: vitamin_c,
                    quantity: 1,
                    instructions: None,
                },
            ],
            apotheca_core::Money::zero(),
            apotheca_core::Money::zero(),
        )
        .await
        .unwrap();
    (rx.id, bill)
}

// =============================================================================
// Prescription Review
// =============================================================================

#[tokio::test]
async fn test_approval_generates_bill_and_notifications() {
    let (engine, _db) = engine().await;
    let (rx_id, bill) = approved_prescription(&engine).await;

    assert_eq!(bill.total_cents, 3500);
    assert_eq!(bill.subtotal_cents, 3500);
    assert!(bill.bill_number.starts_with("RX-"));
    assert_eq!(bill.payment_status, PaymentStatus::Pending);
    assert_eq!(bill.payment_type, PaymentType::Unset);

    let rx = engine.prescriptions.get(&pharmacist(), &rx_id).await.unwrap();
    assert_eq!(rx.status, PrescriptionStatus::Approved);
    assert!(rx.reviewed_at.is_some());

    // Staff heard about the upload; the customer heard about the outcome.
    let staff_inbox = engine
        .notifications
        .list_for_user("pharm-1", NotificationFilter::default())
        .await
        .unwrap();
    assert!(staff_inbox
        .iter()
        .any(|n| n.kind == NotificationKind::PrescriptionUploaded));

    let customer_inbox = engine
        .notifications
        .list_for_user("cust-1", NotificationFilter::default())
        .await
        .unwrap();
    let kinds: Vec<NotificationKind> = customer_inbox.iter().map(|n| n.kind).collect();
    assert!(kinds.contains(&NotificationKind::PrescriptionApproved));
    assert!(kinds.contains(&NotificationKind::BillGenerated));
    assert!(customer_inbox
        .iter()
        .any(|n| n.message.contains("$35.00")));
}

#[tokio::test]
async fn test_rejection_reason_reaches_customer() {
    let (engine, _db) = engine().await;
    let rx = engine
        .prescriptions
        .upload(&customer(), "Dr. Mensah")
        .await
        .unwrap();

    engine
        .prescriptions
        .reject(&pharmacist(), &rx.id, "illegible handwriting")
        .await
        .unwrap();

    let inbox = engine
        .notifications
        .list_for_user("cust-1", NotificationFilter::default())
        .await
        .unwrap();
    let rejection = inbox
        .iter()
        .find(|n| n.kind == NotificationKind::PrescriptionRejected)
        .expect("rejection notification");
    assert!(rejection.message.contains("illegible handwriting"));
    assert_eq!(rejection.priority, Priority::High);

    // REJECTED is terminal: no further review is possible.
    let err = engine
        .prescriptions
        .approve(&pharmacist(), &rx.id, &[], apotheca_core::Money::zero(), apotheca_core::Money::zero())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidStateTransition { .. })
    ));
}

#[tokio::test]
async fn test_customers_cannot_review() {
    let (engine, _db) = engine().await;
    let rx = engine
        .prescriptions
        .upload(&customer(), "Dr. Mensah")
        .await
        .unwrap();

    let err = engine
        .prescriptions
        .reject(&customer(), &rx.id, "self-service rejection")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

// =============================================================================
// Settlement
// =============================================================================

#[tokio::test]
async fn test_pickup_settlement_deducts_pays_and_dispenses() {
    let (engine, db) = engine().await;
    let (rx_id, bill) = approved_prescription(&engine).await;

    engine
        .billing
        .set_payment_type(&customer(), &bill.id, PaymentType::PayOnPickup)
        .await
        .unwrap();
    let settled = engine
        .billing
        .collect_pickup_payment(&pharmacist(), &bill.id, PickupMethod::Cash)
        .await
        .unwrap();

    assert_eq!(settled.payment_status, PaymentStatus::Paid);
    assert_eq!(settled.payment_reference.as_deref(), Some("cash"));
    assert!(settled.paid_at.is_some());

    let rx = engine.prescriptions.get(&pharmacist(), &rx_id).await.unwrap();
    assert_eq!(rx.status, PrescriptionStatus::Dispensed);

    // Stock moved with the payment: 50 - 3 and 50 - 1.
    let mut remaining = Vec::new();
    for item in db.bills().get_items(&settled.id).await.unwrap() {
        remaining.push(engine.inventory.get(&item.medicine_id).await.unwrap().quantity);
    }
    remaining.sort_unstable();
    assert_eq!(remaining, vec![47, 49]);

    // Payment confirmation for the customer.
    let inbox = engine
        .notifications
        .list_for_user("cust-1", NotificationFilter::default())
        .await
        .unwrap();
    assert!(inbox.iter().any(|n| {
        n.kind == NotificationKind::SystemAlert && n.title.contains("Payment received")
    }));

    engine.prescriptions.complete(&pharmacist(), &rx_id).await.unwrap();
    let rx = engine.prescriptions.get(&pharmacist(), &rx_id).await.unwrap();
    assert_eq!(rx.status, PrescriptionStatus::Completed);
}

#[tokio::test]
async fn test_insufficient_stock_rolls_back_everything() {
    let (engine, db) = engine().await;
    let medicine_id = seed_medicine(&engine, "Amoxicillin", 1200, 10).await;

    let rx = engine
        .prescriptions
        .upload(&customer(), "Dr. Mensah")
        .await
        .unwrap();
    let bill = engine
        .prescriptions
        .approve(
            &pharmacist(),
            &rx.id,
            &[ApprovedItem {
                medicine_id: medicine_id.clone(),
                quantity: 5,
                instructions: None,
            }],
            apotheca_core::Money::zero(),
            apotheca_core::Money::zero(),
        )
        .await
        .unwrap();
    engine
        .billing
        .set_payment_type(&customer(), &bill.id, PaymentType::PayOnPickup)
        .await
        .unwrap();

    // Stock drains to 2 between approval and pickup.
    engine
        .inventory
        .deduct(&pharmacist(), &medicine_id, 8)
        .await
        .unwrap();

    let err = engine
        .billing
        .collect_pickup_payment(&pharmacist(), &bill.id, PickupMethod::Cash)
        .await
        .unwrap_err();
    match err {
        EngineError::Core(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 2);
            assert_eq!(requested, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Nothing moved: bill still payable, stock untouched, rx approved.
    let bill = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
    assert_eq!(bill.payment_status, PaymentStatus::Pending);
    assert_eq!(engine.inventory.get(&medicine_id).await.unwrap().quantity, 2);
    let rx = engine.prescriptions.get(&pharmacist(), &rx.id).await.unwrap();
    assert_eq!(rx.status, PrescriptionStatus::Approved);
}

#[tokio::test]
async fn test_concurrent_collection_has_exactly_one_winner() {
    let (engine, _db) = engine().await;
    let (_rx_id, bill) = approved_prescription(&engine).await;
    engine
        .billing
        .set_payment_type(&customer(), &bill.id, PaymentType::PayOnPickup)
        .await
        .unwrap();

    // The session must outlive both un-awaited futures.
    let clerk = pharmacist();
    let first = engine
        .billing
        .collect_pickup_payment(&clerk, &bill.id, PickupMethod::Cash);
    let second = engine
        .billing
        .collect_pickup_payment(&clerk, &bill.id, PickupMethod::Card);
    let (a, b) = tokio::join!(first, second);

    assert_eq!(
        a.is_ok() as u8 + b.is_ok() as u8,
        1,
        "exactly one settlement must win"
    );
}

#[tokio::test]
async fn test_settlement_requires_matching_payment_type() {
    let (engine, _db) = engine().await;
    let (_rx_id, bill) = approved_prescription(&engine).await;

    // No payment type chosen yet: both settlement paths are closed.
    let err = engine
        .billing
        .collect_pickup_payment(&pharmacist(), &bill.id, PickupMethod::Cash)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidStateTransition { .. })
    ));

    // An online bill cannot be settled at the counter.
    engine
        .billing
        .set_payment_type(&customer(), &bill.id, PaymentType::Online)
        .await
        .unwrap();
    let err = engine
        .billing
        .collect_pickup_payment(&pharmacist(), &bill.id, PickupMethod::Cash)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidStateTransition { .. })
    ));
}

#[tokio::test]
async fn test_payment_type_cannot_be_reset_to_unset() {
    let (engine, db) = engine().await;
    let (_rx_id, bill) = approved_prescription(&engine).await;
    engine
        .billing
        .set_payment_type(&customer(), &bill.id, PaymentType::Online)
        .await
        .unwrap();

    // UNSET is the unchosen state, not a choice.
    let err = engine
        .billing
        .set_payment_type(&customer(), &bill.id, PaymentType::Unset)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::Validation(_))
    ));

    let bill = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
    assert_eq!(bill.payment_type, PaymentType::Online);
}

// =============================================================================
// Online Payment
// =============================================================================

#[tokio::test]
async fn test_pay_online_records_gateway_reference() {
    let (engine, _db) = engine().await;
    let (rx_id, bill) = approved_prescription(&engine).await;
    engine
        .billing
        .set_payment_type(&customer(), &bill.id, PaymentType::Online)
        .await
        .unwrap();

    let settled = engine
        .billing
        .pay_online(&customer(), &bill.id, "4242424242424242", "A Customer")
        .await
        .unwrap();

    assert_eq!(settled.payment_status, PaymentStatus::Paid);
    assert_eq!(settled.payment_reference.as_deref(), Some("txn-777"));

    let rx = engine.prescriptions.get(&pharmacist(), &rx_id).await.unwrap();
    assert_eq!(rx.status, PrescriptionStatus::Dispensed);
}

#[tokio::test]
async fn test_declined_charge_changes_nothing() {
    let (engine, db) = engine_with(Arc::new(DecliningGateway)).await;
    let (rx_id, bill) = approved_prescription(&engine).await;
    engine
        .billing
        .set_payment_type(&customer(), &bill.id, PaymentType::Online)
        .await
        .unwrap();

    let err = engine
        .billing
        .pay_online(&customer(), &bill.id, "4242424242424242", "A Customer")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PaymentDeclined(_)));

    let bill = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
    assert_eq!(bill.payment_status, PaymentStatus::Pending);
    let rx = engine.prescriptions.get(&pharmacist(), &rx_id).await.unwrap();
    assert_eq!(rx.status, PrescriptionStatus::Approved);
}

#[tokio::test]
async fn test_gateway_timeout_surfaces_before_any_state_change() {
    let (mut engine, db) = engine_with(Arc::new(SlowGateway)).await;
    engine.billing = engine
        .billing
        .clone()
        .with_gateway_timeout(Duration::from_millis(50));
    let (_rx_id, bill) = approved_prescription(&engine).await;
    engine
        .billing
        .set_payment_type(&customer(), &bill.id, PaymentType::Online)
        .await
        .unwrap();

    let err = engine
        .billing
        .pay_online(&customer(), &bill.id, "4242424242424242", "A Customer")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExternalService(_)));

    let bill = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
    assert_eq!(bill.payment_status, PaymentStatus::Pending);
}

// =============================================================================
// Alert Evaluators
// =============================================================================

#[tokio::test]
async fn test_low_stock_alert_is_debounced_per_day() {
    let (engine, _db) = engine().await;
    engine
        .inventory
        .add_medicine(
            &pharmacist(),
            NewMedicine {
                name: "Paracetamol".to_string(),
                quantity: 5,
                reorder_level: 10,
                unit_price_cents: 250,
                expiry_date: None,
            },
        )
        .await
        .unwrap();

    // One notification per staff recipient (pharmacist + admin).
    let created = engine.alerts.evaluate_low_stock().await.unwrap();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|n| n.kind == NotificationKind::LowStock));
    assert!(created.iter().all(|n| n.priority == Priority::Medium));

    // Same day, second run: silence.
    let created = engine.alerts.evaluate_low_stock().await.unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn test_out_of_stock_grades_high() {
    let (engine, _db) = engine().await;
    engine
        .inventory
        .add_medicine(
            &pharmacist(),
            NewMedicine {
                name: "Insulin".to_string(),
                quantity: 0,
                reorder_level: 10,
                unit_price_cents: 4500,
                expiry_date: None,
            },
        )
        .await
        .unwrap();

    let created = engine.alerts.evaluate_low_stock().await.unwrap();
    assert!(!created.is_empty());
    assert!(created.iter().all(|n| n.priority == Priority::High));
    assert!(created[0].title.contains("Out of stock"));
}

#[tokio::test]
async fn test_expiry_alerts_grade_expired_critical() {
    let (engine, _db) = engine().await;
    let today = Utc::now().date_naive();

    engine
        .inventory
        .add_medicine(
            &pharmacist(),
            NewMedicine {
                name: "Expired batch".to_string(),
                quantity: 20,
                reorder_level: 5,
                unit_price_cents: 100,
                expiry_date: Some(today - chrono::Duration::days(3)),
            },
        )
        .await
        .unwrap();
    engine
        .inventory
        .add_medicine(
            &pharmacist(),
            NewMedicine {
                name: "Expiring soon".to_string(),
                quantity: 20,
                reorder_level: 5,
                unit_price_cents: 100,
                expiry_date: Some(today + chrono::Duration::days(10)),
            },
        )
        .await
        .unwrap();

    let created = engine.alerts.evaluate_expiry(30).await.unwrap();
    let priorities: Vec<Priority> = created
        .iter()
        .filter(|n| n.recipient_id == "pharm-1")
        .map(|n| n.priority)
        .collect();
    assert!(priorities.contains(&Priority::Critical));
    assert!(priorities.contains(&Priority::High));
}

#[tokio::test]
async fn test_overdue_bills_are_expired_once() {
    let (engine, db) = engine().await;

    // A pending bill that has been sitting for ten days.
    let now = Utc::now();
    let stale = apotheca_core::Bill {
        id: "bill-stale".to_string(),
        prescription_id: None,
        customer_id: "cust-1".to_string(),
        bill_number: "RX-20260814-0001".to_string(),
        subtotal_cents: 1000,
        discount_cents: 0,
        tax_cents: 0,
        total_cents: 1000,
        payment_type: PaymentType::PayOnPickup,
        payment_status: PaymentStatus::Pending,
        payment_reference: None,
        created_at: now - chrono::Duration::days(10),
        paid_at: None,
    };
    let mut tx = db.begin().await.unwrap();
    BillRepository::insert_with_items_in_tx(&mut tx, &stale, &[]).await.unwrap();
    tx.commit().await.unwrap();

    let expired = engine.alerts.evaluate_overdue_bills(7).await.unwrap();
    assert_eq!(expired, vec!["bill-stale".to_string()]);

    let bill = db.bills().get_by_id("bill-stale").await.unwrap().unwrap();
    assert_eq!(bill.payment_status, PaymentStatus::Cancelled);

    let inbox = engine
        .notifications
        .list_for_user("cust-1", NotificationFilter::default())
        .await
        .unwrap();
    assert!(inbox.iter().any(|n| n.title.contains("expired")));

    // Same day, second run: the claim is spent.
    let expired = engine.alerts.evaluate_overdue_bills(7).await.unwrap();
    assert!(expired.is_empty());
}

#[tokio::test]
async fn test_expiry_leaves_bills_inside_the_payment_window() {
    let (engine, db) = engine().await;
    let (_rx_id, bill) = approved_prescription(&engine).await;

    // A bill created moments ago is not overdue, whoever asks.
    let expired = engine.billing.mark_expired(&bill.id, 7).await.unwrap();
    assert!(!expired);

    let bill = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
    assert_eq!(bill.payment_status, PaymentStatus::Pending);
}

// =============================================================================
// Notification Surface
// =============================================================================

#[tokio::test]
async fn test_mark_read_and_bulk_outcomes() {
    let (engine, _db) = engine().await;
    engine
        .prescriptions
        .upload(&customer(), "Dr. Mensah")
        .await
        .unwrap();

    let staff_inbox = engine
        .notifications
        .list_for_user("pharm-1", NotificationFilter::default())
        .await
        .unwrap();
    let id = staff_inbox[0].id.clone();

    engine.notifications.mark_read(&id).await.unwrap();
    engine.notifications.mark_read(&id).await.unwrap(); // idempotent

    let err = engine.notifications.mark_read("missing-id").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    let outcome = engine
        .notifications
        .bulk_mark_read(&[id.clone(), "missing-id".to_string()])
        .await
        .unwrap();
    assert_eq!(outcome.succeeded, vec![id.clone()]);
    assert_eq!(outcome.missing, vec!["missing-id".to_string()]);
    assert!(!outcome.is_complete());

    let outcome = engine.notifications.bulk_delete(&[id]).await.unwrap();
    assert!(outcome.is_complete());
    assert_eq!(engine.notifications.count_unread("pharm-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_user_registration_notifies_admins_only() {
    let (engine, _db) = engine().await;

    engine
        .notifications
        .dispatch(&apotheca_engine::DomainEvent::UserRegistered {
            user_id: "cust-9".to_string(),
            display_name: "Ama Boateng".to_string(),
        })
        .await
        .unwrap();

    let admin_inbox = engine
        .notifications
        .list_for_user("admin-1", NotificationFilter::default())
        .await
        .unwrap();
    assert_eq!(admin_inbox.len(), 1);
    assert_eq!(admin_inbox[0].kind, NotificationKind::UserRegistration);
    assert!(admin_inbox[0].message.contains("Ama Boateng"));

    let pharm_inbox = engine
        .notifications
        .list_for_user("pharm-1", NotificationFilter::default())
        .await
        .unwrap();
    assert!(pharm_inbox.is_empty());
}

#[tokio::test]
async fn test_mark_read_by_content_dismissal() {
    let (engine, _db) = engine().await;
    engine
        .prescriptions
        .upload(&customer(), "Dr. Osei")
        .await
        .unwrap();

    // Dismiss by keyword, case-insensitive, no id in hand.
    let marked = engine
        .notifications
        .mark_read_by_content("pharm-1", NotificationKind::PrescriptionUploaded, "DR. OSEI")
        .await
        .unwrap();
    assert!(marked);

    // No remaining match: silent no-op.
    let marked = engine
        .notifications
        .mark_read_by_content("pharm-1", NotificationKind::PrescriptionUploaded, "Dr. Osei")
        .await
        .unwrap();
    assert!(!marked);
}
