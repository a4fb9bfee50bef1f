use crate::application::ApplicationError;
use crate::domain::model::{Role, UserId};
use crate::domain::port::RoleRepository;
use std::sync::Arc;

/// アカウントサービス
/// 利用者のロールの参照と、初回サインイン時の既定ロール付与を担当する
pub struct AccountService {
    role_repository: Arc<dyn RoleRepository>,
}

impl AccountService {
    pub fn new(role_repository: Arc<dyn RoleRepository>) -> Self {
        Self { role_repository }
    }

    /// ロールが未登録なら既定ロール（user）を付与し、登録済みのロールを返す
    /// 何度呼び出しても既存のロールは変更しない
    pub async fn ensure_account(&self, user_id: UserId) -> Result<Role, ApplicationError> {
        Ok(self
            .role_repository
            .insert_if_absent(user_id, Role::default())
            .await?)
    }

    /// 起動時の設定で指定された利用者に管理者ロールを付与する
    /// ロール登録済みの利用者は変更しない
    ///
    /// # Returns
    /// * `Ok(Vec<UserId>)` - 既に一般利用者として登録済みで、管理者にならなかった利用者
    pub async fn grant_admins(&self, user_ids: &[UserId]) -> Result<Vec<UserId>, ApplicationError> {
        let mut not_granted = Vec::new();
        for user_id in user_ids {
            let role = self
                .role_repository
                .insert_if_absent(*user_id, Role::Admin)
                .await?;
            if !role.is_admin() {
                not_granted.push(*user_id);
            }
        }
        Ok(not_granted)
    }

    /// 利用者のロールを取得
    ///
    /// # Returns
    /// * `Ok(Some(Role))` - 登録済みのロール
    /// * `Ok(None)` - ロール未登録
    pub async fn role_of(&self, user_id: UserId) -> Result<Option<Role>, ApplicationError> {
        Ok(self.role_repository.find_role(user_id).await?)
    }
}

/// 権限チェック
/// 呼び出し元の識別子は外部の認証ゲートウェイから渡される（未認証ならNone）
#[derive(Clone)]
pub struct AccessControl {
    role_repository: Arc<dyn RoleRepository>,
}

impl AccessControl {
    pub fn new(role_repository: Arc<dyn RoleRepository>) -> Self {
        Self { role_repository }
    }

    /// 認証済みの利用者であることを確認
    pub fn require_user(&self, caller: Option<UserId>) -> Result<UserId, ApplicationError> {
        caller.ok_or_else(|| ApplicationError::PermissionDenied("ログインが必要です".to_string()))
    }

    /// 管理者であることを確認する
    /// 未認証、ロール未登録、一般利用者はいずれも拒否
    pub async fn require_admin(&self, caller: Option<UserId>) -> Result<UserId, ApplicationError> {
        let user_id = self.require_user(caller)?;
        match self.role_repository.find_role(user_id).await? {
            Some(role) if role.is_admin() => Ok(user_id),
            _ => Err(ApplicationError::PermissionDenied(
                "管理者権限が必要です".to_string(),
            )),
        }
    }
}
