pub use super::cv_education::Entity as CvEducation;
pub use super::cv_experience::Entity as CvExperience;
pub use super::cv_level::Entity as CvLevel;
pub use super::cv_license_certificate::Entity as CvLicenseCertificate;
pub use super::cv_portfolio::Entity as CvPortfolio;
pub use super::cv_portfolio_url::Entity as CvPortfolioUrl;
pub use super::cv_profile::Entity as CvProfile;
pub use super::cv_skill::Entity as CvSkill;
pub use super::users::Entity as Users;
