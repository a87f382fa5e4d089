//! Equipment catalog service

use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Availability, CreateEquipment, Equipment, EquipmentQuery, EquipmentType, Rate, RateUnit},
    rental::validation::is_valid_phone,
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        Ok(self.repository.equipment.list(query).await)
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Equipment> {
        self.repository.equipment.get_by_id(id).await
    }

    pub async fn count(&self) -> usize {
        self.repository.equipment.count().await
    }

    /// List a new piece of equipment from the owner-facing form
    pub async fn create(&self, data: CreateEquipment) -> AppResult<Equipment> {
        let data = data.trimmed();
        data.validate()?;

        if !is_valid_phone(&data.contact_phone) {
            return Err(AppError::Validation("Phone number is invalid".to_string()));
        }
        if !data.terms_accepted {
            return Err(AppError::Validation(
                "You must accept the terms and conditions".to_string(),
            ));
        }
        let equipment_type = EquipmentType::from_str(&data.equipment_type)
            .map_err(|_| AppError::Validation(format!("Unknown equipment type '{}'", data.equipment_type)))?;
        let rate = Rate::parse(&data.rate, &data.rate_type).map_err(|e| AppError::Validation(e.to_string()))?;
        let availability = data
            .availability
            .as_deref()
            .map(Availability::from_label)
            .unwrap_or(Availability::Available);

        let equipment = self
            .repository
            .equipment
            .create(Equipment {
                id: 0,
                name: data.name,
                equipment_type,
                owner_name: data.owner_name,
                location: data.location,
                rate,
                availability,
                description: data.description,
                features: data.features,
                rating: 0.0,
                reviews: 0,
                listed_at: Some(Utc::now()),
            })
            .await;

        tracing::info!(equipment_id = equipment.id, name = %equipment.name, "Equipment listed");
        Ok(equipment)
    }

    /// Load the portal's sample listings into an empty catalog
    pub async fn seed_sample_catalog(&self) -> AppResult<usize> {
        if self.repository.equipment.count().await > 0 {
            return Ok(0);
        }
        let samples = sample_catalog();
        let count = samples.len();
        for equipment in samples {
            self.repository.equipment.create(equipment).await;
        }
        tracing::info!("Seeded {} sample equipment listings", count);
        Ok(count)
    }
}

#[allow(clippy::too_many_arguments)]
fn sample(
    name: &str,
    equipment_type: EquipmentType,
    owner_name: &str,
    daily_rate: i64,
    availability: &str,
    rating: f32,
    reviews: u32,
    description: &str,
    features: &[&str],
) -> Equipment {
    Equipment {
        id: 0,
        name: name.to_string(),
        equipment_type,
        owner_name: owner_name.to_string(),
        location: "Sonipat, Haryana".to_string(),
        rate: Rate::new(Decimal::from(daily_rate), RateUnit::Daily),
        availability: Availability::from_label(availability),
        description: description.to_string(),
        features: features.iter().map(|f| f.to_string()).collect(),
        rating,
        reviews,
        listed_at: None,
    }
}

fn sample_catalog() -> Vec<Equipment> {
    vec![
        sample(
            "John Deere 5310",
            EquipmentType::Tractor,
            "Rajesh Kumar",
            800,
            "Available",
            4.5,
            28,
            "Powerful 55 HP tractor suitable for all farming operations. Well-maintained with air-conditioned cabin and power steering.",
            &["55 HP Engine", "4WD", "Air Conditioned Cabin", "Power Steering", "Hydraulic System"],
        ),
        sample(
            "Mahindra Rotavator",
            EquipmentType::Implement,
            "Suresh Singh",
            400,
            "Available",
            4.2,
            15,
            "Heavy-duty rotavator for efficient soil preparation. Compatible with most tractor models above 35 HP.",
            &["48 Blades", "5 feet width", "Gear Driven", "Adjustable Depth", "Heavy Duty Construction"],
        ),
        sample(
            "Harvester Machine",
            EquipmentType::Harvester,
            "FPO Equipment Pool",
            2500,
            "Booked until 15 July",
            4.8,
            32,
            "Modern combine harvester for wheat, rice, and other grain crops. Includes operator in the rental price.",
            &["Self-Propelled", "Grain Tank", "AC Cabin", "GPS Navigation", "Crop Monitor"],
        ),
        sample(
            "Water Pump Set",
            EquipmentType::Irrigation,
            "Amit Verma",
            300,
            "Available",
            4.0,
            22,
            "5 HP electric water pump with pipes for irrigation. Energy efficient and easy to transport.",
            &["5 HP Motor", "Includes 100m Pipe", "Electric Operated", "Portable", "Low Maintenance"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> CreateEquipment {
        CreateEquipment {
            name: "Sonalika Seed Drill".to_string(),
            equipment_type: "implement".to_string(),
            rate: "₹350".to_string(),
            rate_type: "per day".to_string(),
            location: "Karnal, Haryana".to_string(),
            availability: None,
            description: "Nine-row seed drill".to_string(),
            features: vec!["9 Rows".to_string()],
            owner_name: "Vikram".to_string(),
            contact_phone: "9812345678".to_string(),
            contact_email: "vikram@example.com".to_string(),
            terms_accepted: true,
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let service = EquipmentService::new(Repository::new());
        assert_eq!(service.seed_sample_catalog().await.unwrap(), 4);
        assert_eq!(service.seed_sample_catalog().await.unwrap(), 0);

        let harvester = service.get_by_id(3).await.unwrap();
        assert_eq!(harvester.availability, Availability::Booked);
        assert_eq!(harvester.rate.amount, Decimal::from(2500));
    }

    #[tokio::test]
    async fn test_create_listing() {
        let service = EquipmentService::new(Repository::new());
        let equipment = service.create(listing()).await.unwrap();
        assert_eq!(equipment.id, 1);
        assert_eq!(equipment.equipment_type, EquipmentType::Implement);
        assert_eq!(equipment.rate, Rate::new(Decimal::from(350), RateUnit::Daily));
        assert_eq!(equipment.availability, Availability::Available);
        assert!(equipment.listed_at.is_some());
    }

    #[tokio::test]
    async fn test_create_listing_rejects_bad_input() {
        let service = EquipmentService::new(Repository::new());

        let mut data = listing();
        data.contact_phone = "12345".to_string();
        assert!(matches!(service.create(data).await, Err(AppError::Validation(_))));

        let mut data = listing();
        data.terms_accepted = false;
        assert!(matches!(service.create(data).await, Err(AppError::Validation(_))));

        let mut data = listing();
        data.equipment_type = "drone".to_string();
        assert!(matches!(service.create(data).await, Err(AppError::Validation(_))));

        let mut data = listing();
        data.rate = "negotiable".to_string();
        assert!(matches!(service.create(data).await, Err(AppError::Validation(_))));

        let mut data = listing();
        data.rate = "₹79228162514264337593543950335".to_string();
        assert!(matches!(service.create(data).await, Err(AppError::Validation(_))));

        assert_eq!(service.list(&EquipmentQuery::default()).await.unwrap().len(), 0);
    }
}
