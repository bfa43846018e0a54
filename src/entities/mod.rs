pub mod prelude;

pub mod cv_education;
pub mod cv_experience;
pub mod cv_level;
pub mod cv_license_certificate;
pub mod cv_portfolio;
pub mod cv_portfolio_url;
pub mod cv_profile;
pub mod cv_skill;
pub mod users;
