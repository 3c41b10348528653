pub mod address;
pub mod field;
pub mod hash;
pub mod keys;

pub use address::{address_to_field, field_to_address};
pub use field::Fp;
pub use hash::{hash_fields, trade_key_field};
pub use keys::OperatorKey;
