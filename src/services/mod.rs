pub mod catalog;
pub mod checkout;
pub mod inventory;
pub mod recommendation;
pub mod size_chart;
pub mod stats;
pub mod try_on;
