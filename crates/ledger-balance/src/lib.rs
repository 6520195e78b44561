pub mod balance;
pub mod resolve;
pub mod settlement;

pub use balance::compute_balances;
pub use resolve::{resolve_effective_expenses, EffectiveExpenses};
pub use settlement::{minimal_settlement, Transfer};
