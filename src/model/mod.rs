pub mod allocation;
pub mod entitlement;
pub mod participant;
pub mod schedule;
