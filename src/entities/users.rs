use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Normalized (trimmed, lowercased) login email
    #[sea_orm(unique)]
    pub email: String,

    /// Opaque bearer token (64-char hex string)
    #[sea_orm(unique)]
    pub token: String,

    pub plan: String,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::searches::Entity")]
    Searches,
    #[sea_orm(has_many = "super::automations::Entity")]
    Automations,
}

impl Related<super::searches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Searches.def()
    }
}

impl Related<super::automations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Automations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
