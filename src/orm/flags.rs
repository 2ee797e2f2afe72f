//! Flags entity
//!
//! One row per (tenant, feature, environment) triple, enforced by a unique
//! index. `strategy_value` holds the strategy-specific payload, e.g.
//! `{"percentage": 25}` for PERCENTAGE.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "flags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub feature_id: i32,
    pub environment: String,
    pub enabled: bool,
    pub strategy: String,
    pub strategy_value: Option<Json>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenants::Entity",
        from = "Column::TenantId",
        to = "super::tenants::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Tenant,
    #[sea_orm(
        belongs_to = "super::features::Entity",
        from = "Column::FeatureId",
        to = "super::features::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Feature,
}

impl Related<super::tenants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::features::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feature.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
