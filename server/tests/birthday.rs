mod common;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use uuid::Uuid;

use common::Fixture;
use venue_server::models::caller::{Caller, Role};
use venue_server::models::event::Event;
use venue_server::models::qr::QrPayload;
use venue_server::services::birthday::ClaimBenefit;
use venue_server::store::Store;

/// Same day and month as the event, in a leap year so any date exists.
fn birthday_on(fx: &Fixture) -> NaiveDate {
    fx.event
        .start_time
        .date_naive()
        .with_year(1992)
        .unwrap()
}

async fn celebrant(fx: &Fixture) -> Caller {
    fx.user("Celebrant", Role::Client, Some(birthday_on(fx))).await
}

fn claim(event_id: Uuid, guest_limit: i32) -> ClaimBenefit {
    ClaimBenefit {
        event_id,
        guest_limit,
    }
}

#[tokio::test]
async fn test_guest_limit_can_change_twice() {
    let fx = Fixture::new().await;
    let me = celebrant(&fx).await;
    let birthdays = &fx.engine.birthdays;

    let payload = birthdays
        .claim(&me, claim(fx.event.id, 2), Utc::now())
        .await
        .unwrap();
    assert_eq!(payload.guest_limit, 2);
    assert_eq!(payload.updates_remaining, 2);
    assert_ne!(payload.entry_qr_id, payload.gift_qr_id);

    let first = birthdays
        .update_guest_limit(&me, payload.benefit_id, 3, Utc::now())
        .await
        .unwrap();
    assert_eq!((first.guest_limit, first.updates_remaining), (3, 1));

    let second = birthdays
        .update_guest_limit(&me, payload.benefit_id, 4, Utc::now())
        .await
        .unwrap();
    assert_eq!((second.guest_limit, second.updates_remaining), (4, 0));

    let err = birthdays
        .update_guest_limit(&me, payload.benefit_id, 5, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "GUEST_LIMIT_EXCEEDED");

    let stored = fx
        .engine
        .store()
        .get_benefit(payload.benefit_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.guest_limit, 4);
}

#[tokio::test]
async fn test_guest_limit_bounds() {
    let fx = Fixture::new().await;
    let me = celebrant(&fx).await;
    let birthdays = &fx.engine.birthdays;

    let err = birthdays
        .claim(&me, claim(fx.event.id, -1), Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NEGATIVE_GUESTS");

    let err = birthdays
        .claim(&me, claim(fx.event.id, 11), Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "GUEST_LIMIT_EXCEEDED");

    let payload = birthdays
        .claim(&me, claim(fx.event.id, 10), Utc::now())
        .await
        .unwrap();

    // Rejected edits do not use up an update.
    let err = birthdays
        .update_guest_limit(&me, payload.benefit_id, -3, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NEGATIVE_GUESTS");

    let someone_else = fx.client("Someone else").await;
    let err = birthdays
        .update_guest_limit(&someone_else, payload.benefit_id, 1, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    let by_staff = birthdays
        .update_guest_limit(&fx.staff, payload.benefit_id, 6, Utc::now())
        .await
        .unwrap();
    assert_eq!((by_staff.guest_limit, by_staff.updates_remaining), (6, 1));
}

#[tokio::test]
async fn test_one_claim_per_birthday_week() {
    let fx = Fixture::new().await;
    let me = celebrant(&fx).await;
    let birthdays = &fx.engine.birthdays;

    birthdays
        .claim(&me, claim(fx.event.id, 0), Utc::now())
        .await
        .unwrap();

    let err = birthdays
        .claim(&me, claim(fx.event.id, 3), Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ALREADY_CLAIMED");

    // A second event in the same week does not open a second claim.
    let now = Utc::now();
    let late_show = Event {
        id: Uuid::new_v4(),
        title: "Late show".into(),
        location: "Main Room".into(),
        start_time: fx.event.start_time + Duration::hours(1),
        end_time: None,
        created_at: now,
        updated_at: now,
    };
    fx.engine.store().insert_event(&late_show).await.unwrap();
    let err = birthdays
        .claim(&me, claim(late_show.id, 0), Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ALREADY_CLAIMED");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_claims_yield_one_benefit() {
    let fx = Fixture::new().await;
    let me = celebrant(&fx).await;

    let mut handles = Vec::new();
    for guests in 0..6 {
        let engine = fx.engine.clone();
        let event_id = fx.event.id;
        handles.push(tokio::spawn(async move {
            engine
                .birthdays
                .claim(&me, claim(event_id, guests), Utc::now())
                .await
        }));
    }

    let mut claimed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => claimed += 1,
            Err(e) => assert_eq!(e.code(), "ALREADY_CLAIMED"),
        }
    }
    assert_eq!(claimed, 1);
}

#[tokio::test]
async fn test_claims_outside_the_birthday_week() {
    let fx = Fixture::new().await;
    let birthdays = &fx.engine.birthdays;

    let far_off = (fx.event.start_time.date_naive() - Duration::days(60))
        .with_year(1992)
        .unwrap();
    let wrong_week = fx.user("Not yet", Role::Client, Some(far_off)).await;
    let err = birthdays
        .claim(&wrong_week, claim(fx.event.id, 1), Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "OUT_OF_WINDOW");

    let unknown = fx.client("No birth date").await;
    let err = birthdays
        .claim(&unknown, claim(fx.event.id, 1), Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "OUT_OF_WINDOW");

    let past = Fixture::starting_at(Utc::now() - Duration::days(3)).await;
    let me = celebrant(&past).await;
    let err = past
        .engine
        .birthdays
        .claim(&me, claim(past.event.id, 1), Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "OUT_OF_WINDOW");
}

#[tokio::test]
async fn test_entry_and_gift_codes_scan_independently() {
    let fx = Fixture::new().await;
    let me = celebrant(&fx).await;
    let payload = fx
        .engine
        .birthdays
        .claim(&me, claim(fx.event.id, 3), Utc::now())
        .await
        .unwrap();
    let redemption = &fx.engine.redemption;
    let entry = QrPayload::BirthdayEntry(payload.entry_qr_id).encode();
    let gift = QrPayload::BirthdayGift(payload.gift_qr_id).encode();

    let admitted = redemption.scan(&fx.staff, &entry, Utc::now()).await.unwrap();
    assert!(admitted.is_valid);
    assert_eq!(admitted.message, "Birthday party of 4 admitted");
    assert_eq!(admitted.details.unwrap().party_size, Some(4));

    let again = redemption.scan(&fx.staff, &entry, Utc::now()).await.unwrap();
    assert_eq!(again.code, Some("ALREADY_REDEEMED"));

    // Codes are not interchangeable.
    let swapped = QrPayload::BirthdayGift(payload.entry_qr_id).encode();
    let swapped = redemption.scan(&fx.staff, &swapped, Utc::now()).await.unwrap();
    assert_eq!(swapped.code, Some("INVALID_CODE"));

    let handed = redemption.scan(&fx.staff, &gift, Utc::now()).await.unwrap();
    assert!(handed.is_valid);
    let twice = redemption.scan(&fx.staff, &gift, Utc::now()).await.unwrap();
    assert_eq!(twice.code, Some("ALREADY_REDEEMED"));

    let stored = fx
        .engine
        .store()
        .get_benefit(payload.benefit_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.guests_entered, 4);
    assert!(stored.gift_redeemed_at.is_some());

    // The list is frozen once the party is in.
    let err = fx
        .engine
        .birthdays
        .update_guest_limit(&me, payload.benefit_id, 5, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_entry_code_lapses_after_the_event() {
    let fx = Fixture::new().await;
    let me = celebrant(&fx).await;
    let payload = fx
        .engine
        .birthdays
        .claim(&me, claim(fx.event.id, 1), Utc::now())
        .await
        .unwrap();
    let after = payload.expires_at + Duration::minutes(1);
    let redemption = &fx.engine.redemption;

    let entry = redemption
        .scan(
            &fx.staff,
            &QrPayload::BirthdayEntry(payload.entry_qr_id).encode(),
            after,
        )
        .await
        .unwrap();
    assert!(!entry.is_valid);
    assert_eq!(entry.code, Some("INVALID_CODE"));

    let gift = redemption
        .scan(
            &fx.staff,
            &QrPayload::BirthdayGift(payload.gift_qr_id).encode(),
            after,
        )
        .await
        .unwrap();
    assert!(gift.is_valid);

    let err = fx
        .engine
        .birthdays
        .update_guest_limit(&me, payload.benefit_id, 2, after)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "OUT_OF_WINDOW");
}
