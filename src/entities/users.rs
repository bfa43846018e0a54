use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "users")]
#[schema(as = User)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::cv_profile::Entity")]
    CvProfile,
    #[sea_orm(has_many = "super::cv_education::Entity")]
    CvEducation,
    #[sea_orm(has_many = "super::cv_experience::Entity")]
    CvExperience,
    #[sea_orm(has_many = "super::cv_portfolio::Entity")]
    CvPortfolio,
    #[sea_orm(has_many = "super::cv_skill::Entity")]
    CvSkill,
    #[sea_orm(has_many = "super::cv_license_certificate::Entity")]
    CvLicenseCertificate,
}

impl Related<super::cv_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CvProfile.def()
    }
}

impl Related<super::cv_education::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CvEducation.def()
    }
}

impl Related<super::cv_experience::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CvExperience.def()
    }
}

impl Related<super::cv_portfolio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CvPortfolio.def()
    }
}

impl Related<super::cv_skill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CvSkill.def()
    }
}

impl Related<super::cv_license_certificate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CvLicenseCertificate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
