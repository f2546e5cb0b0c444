//! The ticket and redemption engine.
//!
//! Every component is generic over the [`Store`] and takes the current time
//! explicitly, so the same code runs against PostgreSQL in production and the
//! in-memory store in tests.

use std::sync::Arc;

use crate::config::Policy;
use crate::store::Store;

pub mod birthday;
pub mod catalogue;
pub mod inventory;
pub mod issuance;
pub mod payment;
pub mod raffle;
pub mod redemption;

pub use birthday::BirthdayManager;
pub use catalogue::Catalogue;
pub use inventory::InventoryLedger;
pub use issuance::IssuanceService;
pub use payment::PaymentReconciler;
pub use raffle::RaffleAllocator;
pub use redemption::RedemptionService;

pub struct Engine<S> {
    pub catalogue: Catalogue<S>,
    pub inventory: InventoryLedger<S>,
    pub issuance: IssuanceService<S>,
    pub redemption: RedemptionService<S>,
    pub payments: PaymentReconciler<S>,
    pub raffles: RaffleAllocator<S>,
    pub birthdays: BirthdayManager<S>,
    store: Arc<S>,
}

impl<S: Store> Engine<S> {
    pub fn new(store: Arc<S>, policy: &Policy) -> Self {
        let inventory = InventoryLedger::new(Arc::clone(&store), policy.payment_hold);
        let birthdays = BirthdayManager::new(
            Arc::clone(&store),
            policy.birthday_max_guests,
            policy.birthday_cutoff_hour,
        );

        Self {
            catalogue: Catalogue::new(Arc::clone(&store)),
            issuance: IssuanceService::new(
                Arc::clone(&store),
                inventory.clone(),
                policy.payment_hold,
                policy.max_tickets_per_order,
            ),
            redemption: RedemptionService::new(
                Arc::clone(&store),
                inventory.clone(),
                birthdays.clone(),
            ),
            payments: PaymentReconciler::new(Arc::clone(&store), inventory.clone()),
            raffles: RaffleAllocator::new(Arc::clone(&store), policy.raffle_weights),
            inventory,
            birthdays,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
