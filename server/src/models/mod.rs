// server/src/models/mod.rs

//! Domain types shared by the storage layer, the pipelines and the web layer.

pub mod account;
pub mod booking;
pub mod catalog;
pub mod dashboard;
pub mod payment;
pub mod review;
pub mod settings;

pub use account::{Account, Actor, Credentials, NewAccount, Role};
pub use booking::{Booking, BookingFilter, BookingStatus, NewBooking};
pub use catalog::{GiverSummary, ServiceInput, ServiceType};
pub use dashboard::{DashboardOverview, GiverStatusCount, KeyMetrics, MonthlyRevenue, ServiceUsage};
pub use payment::{NewPayment, Payment};
pub use review::{GiverReviews, NewReview, Rating, Review};
pub use settings::SettingsBatch;
