use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "cv_skill")]
#[schema(as = CvSkill)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub users_id: i32,
    pub level_id: String,
    pub name: String,
    pub is_top_skill: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UsersId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::cv_level::Entity",
        from = "Column::LevelId",
        to = "super::cv_level::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    CvLevel,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::cv_level::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CvLevel.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
