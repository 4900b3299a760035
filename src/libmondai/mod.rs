pub mod ai;
#[cfg(feature = "gui")]
pub mod gazou;
pub mod kotae;
pub mod mondai;
pub mod sagyou;
pub mod settei;
