// Shopper flows
pub mod cart;
pub mod checkout;
pub mod open_order;
pub mod payments;

// Back office
pub mod catalog;
pub mod orders;

// Accounts and news
pub mod accounts;
pub mod articles;
