use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "cv_portfolio_url")]
#[schema(as = CvPortfolioUrl)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub portfolio_id: String,
    pub users_id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub url: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cv_portfolio::Entity",
        from = "Column::PortfolioId",
        to = "super::cv_portfolio::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    CvPortfolio,
}

impl Related<super::cv_portfolio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CvPortfolio.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
