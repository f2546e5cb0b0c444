mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use common::{request, ticket_code, Fixture};
use venue_server::models::qr::QrPayload;
use venue_server::models::redeemable::{CreateRedeemable, RedeemableKind};
use venue_server::models::table::TableStatus;
use venue_server::models::ticket::{TicketOrigin, TicketStatus};
use venue_server::models::tier::{CreateTier, ProductKind};
use venue_server::services::issuance::IssueReceipt;
use venue_server::store::Store;

async fn sell(fx: &Fixture, tier_id: uuid::Uuid, quantity: i32) -> IssueReceipt {
    let guest = fx.client("Guest").await;
    let mut req = request(TicketOrigin::ManualSale, tier_id, quantity);
    req.user_id = Some(guest.user_id);
    fx.engine
        .issuance
        .issue(&fx.staff, req, Utc::now())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_group_ticket_admits_each_person_once() {
    let fx = Fixture::new().await;
    let tier = fx.tier(ProductKind::Ticket, 30, Some(50)).await;
    let receipt = sell(&fx, tier.id, 3).await;
    let code = ticket_code(receipt.ticket_id);
    let redemption = &fx.engine.redemption;
    let store = fx.engine.store();

    let expected = [
        (TicketStatus::PartiallyUsed, 2),
        (TicketStatus::PartiallyUsed, 1),
        (TicketStatus::Used, 0),
    ];
    for (i, (status, left)) in expected.into_iter().enumerate() {
        let result = redemption.scan(&fx.staff, &code, Utc::now()).await.unwrap();
        assert!(result.is_valid);
        assert_eq!(result.message, format!("Admission {} of 3", i + 1));
        let details = result.details.unwrap();
        assert_eq!(details.client_name.as_deref(), Some("Guest"));
        assert_eq!(details.admissions_left, Some(left));

        let ticket = store.get_ticket(receipt.ticket_id).await.unwrap().unwrap();
        assert_eq!(ticket.status, status);
    }

    let fourth = redemption.scan(&fx.staff, &code, Utc::now()).await.unwrap();
    assert!(!fourth.is_valid);
    assert_eq!(fourth.code, Some("ALREADY_REDEEMED"));

    let ticket = store.get_ticket(receipt.ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.redeemed_count, 3);
    assert_eq!(ticket.status, TicketStatus::Used);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_simultaneous_scans_never_exceed_quantity() {
    let fx = Fixture::new().await;
    let tier = fx.tier(ProductKind::Ticket, 30, None).await;
    let receipt = sell(&fx, tier.id, 5).await;
    let code = ticket_code(receipt.ticket_id);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let engine = fx.engine.clone();
        let staff = fx.staff;
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            engine.redemption.scan(&staff, &code, Utc::now()).await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        if result.is_valid {
            admitted += 1;
        } else {
            assert_eq!(result.code, Some("ALREADY_REDEEMED"));
        }
    }

    assert_eq!(admitted, 5);
    let ticket = fx
        .engine
        .store()
        .get_ticket(receipt.ticket_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ticket.redeemed_count, 5);
    assert_eq!(ticket.status, TicketStatus::Used);
}

#[tokio::test]
async fn test_unusable_codes_are_rejected_not_errors() {
    let fx = Fixture::new().await;
    let tier = fx.tier(ProductKind::Ticket, 30, None).await;
    let alice = fx.client("Alice").await;
    let pending = fx
        .engine
        .issuance
        .issue(&alice, request(TicketOrigin::SelfService, tier.id, 1), Utc::now())
        .await
        .unwrap();
    let redemption = &fx.engine.redemption;

    let codes = [
        "not a qr code".to_string(),
        r#"{"type":"coupon","id":"abc"}"#.to_string(),
        ticket_code(uuid::Uuid::new_v4()),
        ticket_code(pending.ticket_id),
    ];
    for code in codes {
        let result = redemption.scan(&fx.staff, &code, Utc::now()).await.unwrap();
        assert!(!result.is_valid, "{} should not scan", code);
        assert_eq!(result.code, Some("INVALID_CODE"));
        assert!(result.details.is_none());
    }
}

#[tokio::test]
async fn test_only_staff_can_scan() {
    let fx = Fixture::new().await;
    let tier = fx.tier(ProductKind::Ticket, 30, None).await;
    let receipt = sell(&fx, tier.id, 1).await;
    let alice = fx.client("Alice").await;

    let err = fx
        .engine
        .redemption
        .scan(&alice, &ticket_code(receipt.ticket_id), Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    let ticket = fx
        .engine
        .store()
        .get_ticket(receipt.ticket_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ticket.redeemed_count, 0);
}

#[tokio::test]
async fn test_partially_paid_ticket_admits_and_reports_balance() {
    let fx = Fixture::new().await;
    let tier = fx
        .tier_with(CreateTier {
            event_id: fx.event.id,
            name: "Table deposit".into(),
            price: Decimal::from(100),
            original_price: None,
            quantity: None,
            kind: ProductKind::Ticket,
            valid_until: None,
            allows_partial: true,
            partial_price: Some(Decimal::from(30)),
            consumption_credit: None,
            birthday_offer: false,
        })
        .await;
    let guest = fx.client("Dana").await;
    let mut req = request(TicketOrigin::ManualSale, tier.id, 1);
    req.user_id = Some(guest.user_id);
    req.payment_kind = venue_server::models::ticket::PaymentKind::Deposit;
    let receipt = fx
        .engine
        .issuance
        .issue(&fx.staff, req, Utc::now())
        .await
        .unwrap();
    assert_eq!(receipt.status, TicketStatus::PartiallyPaid);

    let result = fx
        .engine
        .redemption
        .scan(&fx.staff, &ticket_code(receipt.ticket_id), Utc::now())
        .await
        .unwrap();
    assert!(result.is_valid);
    assert_eq!(result.message, "Admission 1 of 1, balance due 70");
    assert_eq!(result.details.unwrap().balance_due, Some(Decimal::from(70)));
}

#[tokio::test]
async fn test_balance_stays_on_every_admission_of_a_group_deposit() {
    let fx = Fixture::new().await;
    let tier = fx
        .tier_with(CreateTier {
            event_id: fx.event.id,
            name: "Group deposit".into(),
            price: Decimal::from(100),
            original_price: None,
            quantity: None,
            kind: ProductKind::Ticket,
            valid_until: None,
            allows_partial: true,
            partial_price: Some(Decimal::from(30)),
            consumption_credit: Some(Decimal::from(10)),
            birthday_offer: false,
        })
        .await;
    let guest = fx.client("Group lead").await;
    let mut req = request(TicketOrigin::ManualSale, tier.id, 3);
    req.user_id = Some(guest.user_id);
    req.payment_kind = venue_server::models::ticket::PaymentKind::Deposit;
    let receipt = fx
        .engine
        .issuance
        .issue(&fx.staff, req, Utc::now())
        .await
        .unwrap();
    assert_eq!(receipt.status, TicketStatus::PartiallyPaid);
    let code = ticket_code(receipt.ticket_id);

    let first = fx
        .engine
        .redemption
        .scan(&fx.staff, &code, Utc::now())
        .await
        .unwrap();
    assert!(first.is_valid);
    assert_eq!(first.message, "Admission 1 of 3, balance due 210");
    let details = first.details.unwrap();
    assert_eq!(details.balance_due, Some(Decimal::from(210)));
    assert_eq!(details.consumption_credit, Some(Decimal::from(10)));

    let second = fx
        .engine
        .redemption
        .scan(&fx.staff, &code, Utc::now())
        .await
        .unwrap();
    assert_eq!(second.message, "Admission 2 of 3, balance due 210");

    let ticket = fx
        .engine
        .store()
        .get_ticket(receipt.ticket_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::PartiallyUsed);
}

#[tokio::test]
async fn test_products_and_rewards_redeem_once() {
    let fx = Fixture::new().await;
    let alice = fx.client("Alice").await;
    let catalogue = &fx.engine.catalogue;
    let product = catalogue
        .create_redeemable(
            &fx.staff,
            CreateRedeemable {
                kind: RedeemableKind::Product,
                user_id: alice.user_id,
                name: "Bottle service".into(),
            },
            Utc::now(),
        )
        .await
        .unwrap();
    let reward = catalogue
        .create_redeemable(
            &fx.staff,
            CreateRedeemable {
                kind: RedeemableKind::Reward,
                user_id: alice.user_id,
                name: "Free shot".into(),
            },
            Utc::now(),
        )
        .await
        .unwrap();
    let redemption = &fx.engine.redemption;

    // A product id presented as a reward is not a known reward.
    let wrong_kind = redemption
        .scan(&fx.staff, &QrPayload::Reward(product.id).encode(), Utc::now())
        .await
        .unwrap();
    assert_eq!(wrong_kind.code, Some("INVALID_CODE"));

    let first = redemption
        .scan(&fx.staff, &QrPayload::Product(product.id).encode(), Utc::now())
        .await
        .unwrap();
    assert!(first.is_valid);
    let details = first.details.unwrap();
    assert_eq!(details.product_name.as_deref(), Some("Bottle service"));
    assert_eq!(details.client_name.as_deref(), Some("Alice"));

    let second = redemption
        .scan(&fx.staff, &QrPayload::Product(product.id).encode(), Utc::now())
        .await
        .unwrap();
    assert_eq!(second.code, Some("ALREADY_REDEEMED"));

    let reward_scan = redemption
        .scan(&fx.staff, &QrPayload::Reward(reward.id).encode(), Utc::now())
        .await
        .unwrap();
    assert!(reward_scan.is_valid);
}

#[tokio::test]
async fn test_table_follows_its_ticket() {
    let fx = Fixture::new().await;
    let tier = fx.tier(ProductKind::VipTable, 400, Some(3)).await;
    let table = fx.table(12).await;
    let guest = fx.client("Evan").await;
    let mut req = request(TicketOrigin::ManualSale, tier.id, 4);
    req.user_id = Some(guest.user_id);
    req.table_id = Some(table.id);
    let receipt = fx
        .engine
        .issuance
        .issue(&fx.staff, req, Utc::now())
        .await
        .unwrap();
    let store = fx.engine.store();

    // A reserved table cannot be toggled by hand.
    let err = fx
        .engine
        .catalogue
        .set_table_availability(&fx.staff, table.id, false, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let scan = fx
        .engine
        .redemption
        .scan(&fx.staff, &ticket_code(receipt.ticket_id), Utc::now())
        .await
        .unwrap();
    assert!(scan.is_valid);
    assert!(scan.details.unwrap().is_vip);
    let occupied = store.get_table(table.id).await.unwrap().unwrap();
    assert_eq!(occupied.status, TableStatus::Occupied);

    let ticket = fx
        .engine
        .redemption
        .invalidate(&fx.staff, receipt.ticket_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Invalidated);

    let freed = store.get_table(table.id).await.unwrap().unwrap();
    assert_eq!(freed.status, TableStatus::Available);
    assert_eq!(freed.reservation_id, None);
    // The committed sale is not handed back to stock.
    assert_eq!(fx.remaining(tier.id).await, Some(2));

    let after = fx
        .engine
        .redemption
        .scan(&fx.staff, &ticket_code(receipt.ticket_id), Utc::now())
        .await
        .unwrap();
    assert_eq!(after.code, Some("INVALID_CODE"));
}

#[tokio::test]
async fn test_invalidating_a_pending_ticket_releases_its_hold() {
    let fx = Fixture::new().await;
    let tier = fx.tier(ProductKind::Ticket, 60, Some(5)).await;
    let alice = fx.client("Alice").await;
    let receipt = fx
        .engine
        .issuance
        .issue(&alice, request(TicketOrigin::SelfService, tier.id, 2), Utc::now())
        .await
        .unwrap();
    assert_eq!(fx.remaining(tier.id).await, Some(3));

    let err = fx
        .engine
        .redemption
        .invalidate(&alice, receipt.ticket_id, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    fx.engine
        .redemption
        .invalidate(&fx.staff, receipt.ticket_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(fx.remaining(tier.id).await, Some(5));

    // Invalidated is terminal.
    let err = fx
        .engine
        .redemption
        .invalidate(&fx.staff, receipt.ticket_id, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_attendance_confirmation_round_trip() {
    let fx = Fixture::new().await;
    let tier = fx.tier(ProductKind::Ticket, 30, None).await;
    let holder = fx.client("Holder").await;
    let mut req = request(TicketOrigin::ManualSale, tier.id, 2);
    req.user_id = Some(holder.user_id);
    let receipt = fx
        .engine
        .issuance
        .issue(&fx.staff, req, Utc::now())
        .await
        .unwrap();
    let redemption = &fx.engine.redemption;

    let err = redemption
        .confirm_attendance(&holder, receipt.ticket_id, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    redemption
        .mark_confirmation_sent(&fx.staff, receipt.ticket_id, Utc::now())
        .await
        .unwrap();

    let stranger = fx.client("Stranger").await;
    let err = redemption
        .confirm_attendance(&stranger, receipt.ticket_id, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    let ticket = redemption
        .confirm_attendance(&holder, receipt.ticket_id, Utc::now())
        .await
        .unwrap();
    assert!(ticket.confirmed_at.is_some());
    assert_eq!(ticket.redeemed_count, 0);
    assert_eq!(ticket.status, TicketStatus::Valid);
}

#[tokio::test]
async fn test_stale_tickets_are_expired_by_the_sweep() {
    let fx = Fixture::new().await;
    let now = Utc::now();
    let tier = fx
        .tier_with(CreateTier {
            event_id: fx.event.id,
            name: "Before midnight".into(),
            price: Decimal::from(15),
            original_price: None,
            quantity: None,
            kind: ProductKind::Ticket,
            valid_until: Some(now + Duration::hours(2)),
            allows_partial: false,
            partial_price: None,
            consumption_credit: None,
            birthday_offer: false,
        })
        .await;
    let receipt = sell(&fx, tier.id, 2).await;
    let used = sell(&fx, tier.id, 1).await;
    fx.engine
        .redemption
        .scan(&fx.staff, &ticket_code(used.ticket_id), now)
        .await
        .unwrap();

    let later = now + Duration::hours(3);
    let late_scan = fx
        .engine
        .redemption
        .scan(&fx.staff, &ticket_code(receipt.ticket_id), later)
        .await
        .unwrap();
    assert_eq!(late_scan.code, Some("INVALID_CODE"));

    assert_eq!(fx.engine.redemption.expire_stale(now).await.unwrap(), 0);
    assert_eq!(fx.engine.redemption.expire_stale(later).await.unwrap(), 1);

    let store = fx.engine.store();
    let expired = store.get_ticket(receipt.ticket_id).await.unwrap().unwrap();
    assert_eq!(expired.status, TicketStatus::Expired);
    let kept = store.get_ticket(used.ticket_id).await.unwrap().unwrap();
    assert_eq!(kept.status, TicketStatus::Used);
}
