pub mod farm;
pub mod session_flag;

pub use farm::StoredFarm;
pub use session_flag::SessionFlag;
