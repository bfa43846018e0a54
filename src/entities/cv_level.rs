use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Proficiency scale shared by every skill, e.g. beginner / expert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "cv_level")]
#[schema(as = CvLevel)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    /// Higher means more proficient
    pub order: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cv_skill::Entity")]
    CvSkill,
}

impl Related<super::cv_skill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CvSkill.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
