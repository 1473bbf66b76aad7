pub mod scenario;
pub mod seirvd;
pub mod trajectory;
