pub mod availability;
pub mod doctor;
pub mod refresh;
pub mod seeder;

pub use availability::AvailabilityService;
pub use doctor::DoctorDirectoryService;
pub use refresh::AvailabilityRefreshService;
pub use seeder::SeederService;
