pub mod allocation;
pub mod inverse;
pub mod mutation;
pub mod role_share;
pub mod validate;
