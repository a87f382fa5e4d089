//! Repository layer: in-process stores for equipment, rental requests and
//! uploaded photos

pub mod equipment;
pub mod photos;
pub mod rentals;

/// Main repository struct holding every store
#[derive(Clone, Default)]
pub struct Repository {
    pub equipment: equipment::EquipmentRepository,
    pub rentals: rentals::RentalsRepository,
    pub photos: photos::PhotoRepository,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }
}
