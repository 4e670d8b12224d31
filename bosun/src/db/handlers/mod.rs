//! Database repositories.
//!
//! One repository per entity, all implementing [`Repository`] where the usual
//! CRUD shape applies. Repositories borrow a connection, so multi-repository
//! workflows run inside a single caller-owned transaction.

pub mod audit;
pub mod bank_accounts;
pub mod categories;
pub mod crew_positions;
pub mod maintenance;
pub mod mareas;
pub mod members;
pub mod movements;
pub mod profiles;
pub mod recycle_bin;
pub mod reports;
pub mod repository;
pub mod suppliers;
pub mod users;
pub mod vessels;

pub use audit::AuditLog;
pub use bank_accounts::BankAccounts;
pub use categories::Categories;
pub use crew_positions::CrewPositions;
pub use maintenance::Maintenance;
pub use mareas::Mareas;
pub use members::Members;
pub use movements::Movements;
pub use profiles::Profiles;
pub use recycle_bin::RecycleBin;
pub use reports::Reports;
pub use repository::Repository;
pub use suppliers::Suppliers;
pub use users::Users;
pub use vessels::Vessels;
