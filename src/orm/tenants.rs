//! Tenants entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::flags::Entity")]
    Flags,
}

impl Related<super::flags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
