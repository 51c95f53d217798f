use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users_table;
mod m20250101_000002_create_profiles_table;
mod m20250101_000003_create_user_roles_table;
mod m20250101_000004_create_organizations_table;
mod m20250101_000005_create_organization_admins_table;
mod m20250101_000006_create_items_table;
mod m20250101_000007_create_verification_requests_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users_table::Migration),
            Box::new(m20250101_000002_create_profiles_table::Migration),
            Box::new(m20250101_000003_create_user_roles_table::Migration),
            Box::new(m20250101_000004_create_organizations_table::Migration),
            Box::new(m20250101_000005_create_organization_admins_table::Migration),
            Box::new(m20250101_000006_create_items_table::Migration),
            Box::new(m20250101_000007_create_verification_requests_table::Migration),
        ]
    }
}
