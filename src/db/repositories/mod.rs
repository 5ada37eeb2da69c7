pub mod farms;
pub mod session_flags;
