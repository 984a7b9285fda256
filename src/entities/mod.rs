//! sea-orm entities for the three procurement tables.
//!
//! The tables share `ack_number` as a natural join key but carry no foreign
//! keys; every row is scoped to the `user_id` that created it.

pub mod ack_production;
pub mod cmr_delivery;
pub mod enums;
pub mod lorry_freight;

pub use ack_production::{
    Entity as AckProduction, Model as AckProductionModel,
};
pub use cmr_delivery::{Entity as CmrDelivery, Model as CmrDeliveryModel};
pub use enums::{DeliveryStatus, DestinationPool, DumpingStatus, PaymentStatus, Variety};
pub use lorry_freight::{Entity as LorryFreight, Model as LorryFreightModel};
