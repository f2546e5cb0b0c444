pub mod birthday;
pub mod caller;
pub mod event;
pub mod payment;
pub mod qr;
pub mod raffle;
pub mod redeemable;
pub mod reservation;
pub mod table;
pub mod ticket;
pub mod tier;
pub mod user;
