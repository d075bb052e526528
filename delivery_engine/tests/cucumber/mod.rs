mod delivery_world;
mod setups;
mod steps;

pub use delivery_world::DeliveryWorld;
