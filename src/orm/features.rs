//! Features entity
//!
//! Features are shared across tenants and environments; their lifecycle is
//! managed by an external administrative path. This service only references
//! them from flags.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "features")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
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
