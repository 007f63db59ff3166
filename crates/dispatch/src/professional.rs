use serde::{Deserialize, Serialize};

use tukangin_core::{DomainError, Entity, ProfessionalId};

/// A technician that can be assigned to orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
    pub id: ProfessionalId,
    pub name: String,
    pub speciality: String,
    pub photo_url: Option<String>,
    /// Running average of review ratings, 0.0 until the first review.
    pub rating: f64,
    pub review_count: u32,
    pub total_jobs: u32,
}

impl Entity for Professional {
    type Id = ProfessionalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfessional {
    pub name: String,
    pub speciality: String,
    pub photo_url: Option<String>,
}

impl Professional {
    pub fn create(input: NewProfessional) -> Result<Self, DomainError> {
        let name = input.name.trim();
        let speciality = input.speciality.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        if speciality.is_empty() {
            return Err(DomainError::validation("speciality is required"));
        }
        let photo_url = input
            .photo_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        if let Some(url) = &photo_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(DomainError::validation("photoUrl must be an http(s) URL"));
            }
        }

        Ok(Self {
            id: ProfessionalId::new(),
            name: name.to_string(),
            speciality: speciality.to_string(),
            photo_url,
            rating: 0.0,
            review_count: 0,
            total_jobs: 0,
        })
    }

    /// Fold a new 1..=5 rating into the running average.
    pub fn record_review(&mut self, rating: u8) {
        let total = self.rating * f64::from(self.review_count) + f64::from(rating);
        self.review_count += 1;
        self.rating = total / f64::from(self.review_count);
    }

    pub fn record_completed_job(&mut self) {
        self.total_jobs = self.total_jobs.saturating_add(1);
    }

    /// Rating rounded to one decimal, as shown to customers.
    pub fn display_rating(&self) -> f64 {
        (self.rating * 10.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn professional() -> Professional {
        Professional::create(NewProfessional {
            name: " Pak Joko ".into(),
            speciality: "AC".into(),
            photo_url: Some(String::new()),
        })
        .unwrap()
    }

    #[test]
    fn create_trims_and_drops_blank_photo() {
        let p = professional();
        assert_eq!(p.name, "Pak Joko");
        assert_eq!(p.photo_url, None);
        assert_eq!(p.review_count, 0);
    }

    #[test]
    fn create_requires_name() {
        let err = Professional::create(NewProfessional {
            name: "  ".into(),
            speciality: "AC".into(),
            photo_url: None,
        })
        .unwrap_err();
        assert_eq!(err, DomainError::validation("name is required"));
    }

    #[test]
    fn rating_is_running_average() {
        let mut p = professional();
        p.record_review(5);
        p.record_review(4);
        p.record_review(4);
        assert_eq!(p.review_count, 3);
        assert_eq!(p.display_rating(), 4.3);
    }

    #[test]
    fn completed_jobs_are_counted() {
        let mut p = professional();
        p.record_completed_job();
        p.record_completed_job();
        assert_eq!(p.total_jobs, 2);
    }
}
