//! Command implementations.

pub mod show;
pub mod vote;

pub use self::show::execute_show;
pub use self::vote::execute_vote;
