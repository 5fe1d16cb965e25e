pub mod accounts;
pub mod avatar;
pub mod cart;
pub mod catalog;
pub mod favorites;
pub mod orders;
pub mod profiles;
pub mod slug;
