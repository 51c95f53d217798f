use crate::error::AppResult;
use crate::models::{user, user_role, AppRole, User, UserRole};
use crate::services::auth::{create_account, normalize_email};
use crate::utils::hash_password;
use crate::utils::password::MIN_PASSWORD_LEN;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use std::env;

#[derive(Debug, Clone)]
pub struct BootstrapAdminConfig {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl BootstrapAdminConfig {
    pub fn from_env() -> Option<Self> {
        let enabled = env::var("BOOTSTRAP_ADMIN_ENABLED")
            .ok()
            .map(|v| v.trim().to_ascii_lowercase())
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes" | "y" | "on"))
            .unwrap_or(false);

        if !enabled {
            return None;
        }

        Some(Self {
            email: env::var("BOOTSTRAP_ADMIN_EMAIL").ok()?,
            password: env::var("BOOTSTRAP_ADMIN_PASSWORD").ok()?,
            full_name: env::var("BOOTSTRAP_ADMIN_NAME")
                .unwrap_or_else(|_| "Administrator".to_string()),
        })
    }
}

/// 启动时自动创建/提升平台管理员：
/// - 若库中已存在任意 admin：不做任何事
/// - 否则若配置的 email 已存在：授予 admin 角色
/// - 否则创建一个新的 admin 账号（含 profile）
pub async fn ensure_bootstrap_admin(db: &DatabaseConnection) -> AppResult<()> {
    let Some(cfg) = BootstrapAdminConfig::from_env() else {
        return Ok(());
    };
    if cfg.password.len() < MIN_PASSWORD_LEN {
        tracing::warn!(
            "BOOTSTRAP_ADMIN_PASSWORD must be at least {} characters, skipping bootstrap admin",
            MIN_PASSWORD_LEN
        );
        return Ok(());
    }

    let admin_exists = UserRole::find()
        .filter(user_role::Column::Role.eq(AppRole::Admin))
        .one(db)
        .await?
        .is_some();
    if admin_exists {
        return Ok(());
    }

    let email = normalize_email(&cfg.email);
    let existing = User::find()
        .filter(user::Column::Email.eq(email.clone()))
        .one(db)
        .await?;

    if let Some(user) = existing {
        user_role::ActiveModel {
            user_id: sea_orm::ActiveValue::Set(user.id),
            role: sea_orm::ActiveValue::Set(AppRole::Admin),
            created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        tracing::info!(user_id = user.id, "Bootstrap admin role granted");
        return Ok(());
    }

    let password_hash = hash_password(&cfg.password)?;
    let txn = db.begin().await?;
    let user = create_account(
        &txn,
        &email,
        password_hash,
        &cfg.full_name,
        None,
        AppRole::Admin,
    )
    .await?;
    txn.commit().await?;

    tracing::info!(user_id = user.id, "Bootstrap admin created");
    Ok(())
}
