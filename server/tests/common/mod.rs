#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use venue_server::config::Policy;
use venue_server::models::caller::{Caller, Role};
use venue_server::models::event::Event;
use venue_server::models::table::{CreateTable, Table};
use venue_server::models::ticket::{PaymentKind, TicketOrigin};
use venue_server::models::tier::{CreateTier, ProductKind, TicketTier};
use venue_server::models::user::User;
use venue_server::services::issuance::IssueRequest;
use venue_server::services::Engine;
use venue_server::store::{MemoryStore, Store};

pub struct Fixture<S = MemoryStore> {
    pub engine: Arc<Engine<S>>,
    pub staff: Caller,
    pub event: Event,
}

impl Fixture<MemoryStore> {
    pub async fn new() -> Self {
        Self::starting_at(Utc::now() + Duration::days(3)).await
    }

    pub async fn starting_at(start_time: DateTime<Utc>) -> Self {
        Self::with_store(MemoryStore::new(), start_time).await
    }
}

impl<S: Store> Fixture<S> {
    pub async fn with_store(store: S, start_time: DateTime<Utc>) -> Self {
        let engine = Arc::new(Engine::new(Arc::new(store), &Policy::default()));
        let now = Utc::now();

        let event = Event {
            id: Uuid::new_v4(),
            title: "Friday Night".into(),
            location: "Main Room".into(),
            start_time,
            end_time: None,
            created_at: now,
            updated_at: now,
        };
        engine.store().insert_event(&event).await.unwrap();

        let mut fixture = Self {
            engine,
            staff: Caller::new(Uuid::nil(), Role::Staff),
            event,
        };
        fixture.staff = fixture.user("Door Staff", Role::Staff, None).await;
        fixture
    }

    pub async fn user(&self, name: &str, role: Role, birth_date: Option<NaiveDate>) -> Caller {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            birth_date,
            created_at: now,
            updated_at: now,
        };
        self.engine.store().insert_user(&user).await.unwrap();
        Caller::new(user.id, role)
    }

    pub async fn client(&self, name: &str) -> Caller {
        self.user(name, Role::Client, None).await
    }

    pub async fn tier(&self, kind: ProductKind, price: i64, quantity: Option<i32>) -> TicketTier {
        self.tier_with(CreateTier {
            event_id: self.event.id,
            name: format!("{:?} {}", kind, price),
            price: Decimal::from(price),
            original_price: None,
            quantity,
            kind,
            valid_until: None,
            allows_partial: false,
            partial_price: None,
            consumption_credit: None,
            birthday_offer: false,
        })
        .await
    }

    pub async fn tier_with(&self, request: CreateTier) -> TicketTier {
        self.engine
            .catalogue
            .create_tier(&self.staff, request, Utc::now())
            .await
            .unwrap()
    }

    pub async fn table(&self, number: i32) -> Table {
        self.engine
            .catalogue
            .create_table(
                &self.staff,
                CreateTable {
                    event_id: self.event.id,
                    number,
                    category: "VIP".into(),
                    pos_x: 0.0,
                    pos_y: 0.0,
                },
                Utc::now(),
            )
            .await
            .unwrap()
    }

    pub async fn remaining(&self, tier_id: Uuid) -> Option<i32> {
        self.engine
            .store()
            .get_tier(tier_id)
            .await
            .unwrap()
            .unwrap()
            .remaining_quantity
    }
}

pub fn request(origin: TicketOrigin, tier_id: Uuid, quantity: i32) -> IssueRequest {
    IssueRequest {
        origin,
        tier_id,
        user_id: None,
        quantity,
        payment_kind: PaymentKind::Full,
        table_id: None,
        special_instructions: None,
        is_vip_access: false,
    }
}

pub fn ticket_code(id: Uuid) -> String {
    format!(r#"{{"type":"ticket","id":"{}"}}"#, id)
}
