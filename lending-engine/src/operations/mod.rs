pub mod accounts;
pub mod interest;
pub mod loans;
pub mod oracles;
pub mod risk;
pub mod staking;
