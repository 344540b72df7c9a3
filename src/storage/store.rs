use futures_util::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions},
    Client, Collection, IndexModel,
};
use tracing::{debug, info, warn};

use crate::error::{Result, TrackerError};
use crate::models::{AIDecision, User};
use crate::storage::aggregates;

/// 用户贡献数据的 MongoDB 存取层
///
/// 文档以 `user_handle` 为主键；所有派生统计都在写入前由
/// `aggregates` 重算，集合里不存在只改了一半的用户文档。
pub struct ContributionStore {
    collection: Collection<User>,
}

impl ContributionStore {
    /// 连接数据库并确保 `user_handle` 上有唯一索引
    pub async fn connect(host: &str, db_name: &str, collection_name: &str) -> Result<Self> {
        let client_options = ClientOptions::parse(host).await?;
        let client = Client::with_options(client_options)?;
        let collection = client.database(db_name).collection::<User>(collection_name);

        let index = IndexModel::builder()
            .keys(doc! { "user_handle": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("idx_user_handle".to_string())
                    .build(),
            )
            .build();

        if let Err(e) = collection.create_index(index, None).await {
            // 索引可能已存在，不阻断启动
            warn!("Failed to create user_handle index: {}", e);
        }

        info!("Connected to MongoDB collection {}.{}", db_name, collection_name);
        Ok(Self { collection })
    }

    pub async fn get_user(&self, user_handle: &str) -> Result<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "user_handle": user_handle }, None)
            .await?;
        Ok(user)
    }

    /// 新建用户，写入前校验结构
    pub async fn create_user(&self, user: &User) -> Result<()> {
        user.validate()?;

        if self.get_user(&user.user_handle).await?.is_some() {
            return Err(TrackerError::validation(format!(
                "User already exists: {}",
                user.user_handle
            )));
        }

        self.collection.insert_one(user, None).await?;
        info!("Created user {}", user.user_handle);
        Ok(())
    }

    /// 整文档替换既有用户
    pub async fn update_user(&self, user: &User) -> Result<()> {
        user.validate()?;

        let result = self
            .collection
            .replace_one(doc! { "user_handle": &user.user_handle }, user, None)
            .await?;

        if result.matched_count == 0 {
            return Err(TrackerError::storage(format!(
                "User not found: {}",
                user.user_handle
            )));
        }

        debug!("Updated user {}", user.user_handle);
        Ok(())
    }

    pub async fn delete_user(&self, user_handle: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "user_handle": user_handle }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    /// 把一轮新判定合并进用户的判定历史并重算统计
    ///
    /// 用户必须已存在；匹配与追加语义见 `aggregates::merge_decision_groups`。
    pub async fn merge_decisions(
        &self,
        user_handle: &str,
        new_decisions: Vec<AIDecision>,
    ) -> Result<User> {
        let mut user = self.get_user(user_handle).await?.ok_or_else(|| {
            TrackerError::storage(format!("User not found: {}", user_handle))
        })?;

        let groups = std::mem::take(&mut user.ai_decisions);
        user.ai_decisions = aggregates::merge_decision_groups(groups, new_decisions);
        aggregates::recompute(&mut user);

        self.update_user(&user).await?;
        Ok(user)
    }

    /// 从判定历史整体重算用户的派生统计
    pub async fn recompute_aggregates(&self, user_handle: &str) -> Result<User> {
        let mut user = self.get_user(user_handle).await?.ok_or_else(|| {
            TrackerError::storage(format!("User not found: {}", user_handle))
        })?;

        aggregates::recompute(&mut user);
        self.update_user(&user).await?;
        Ok(user)
    }

    pub async fn get_ai_decisions_by_user(
        &self,
        user_handle: &str,
    ) -> Result<Vec<Vec<AIDecision>>> {
        let user = self.get_user(user_handle).await?.ok_or_else(|| {
            TrackerError::storage(format!("User not found: {}", user_handle))
        })?;
        Ok(user.ai_decisions)
    }

    /// 取 `[since, until]` 闭区间内的判定，保持原有分组
    pub async fn get_ai_decisions_by_user_and_daterange(
        &self,
        user_handle: &str,
        since: &str,
        until: &str,
    ) -> Result<Vec<Vec<AIDecision>>> {
        let groups = self.get_ai_decisions_by_user(user_handle).await?;

        Ok(groups
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .filter(|d| d.date.as_str() >= since && d.date.as_str() <= until)
                    .collect::<Vec<_>>()
            })
            .filter(|group: &Vec<AIDecision>| !group.is_empty())
            .collect())
    }

    /// 删除全体用户在 `[since, until]` 闭区间内的判定
    ///
    /// 空组被丢弃；删光了全部判定的用户连文档一起删除，其余被
    /// 触碰的用户重算统计后回写。返回 (被删除的, 被更新的) handle。
    pub async fn delete_decisions_in_range(
        &self,
        since: &str,
        until: &str,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut cursor = self.collection.find(doc! {}, None).await?;
        let mut deleted = Vec::new();
        let mut updated = Vec::new();

        while let Some(mut user) = cursor.try_next().await? {
            let before = aggregates::count_all_decisions(&user.ai_decisions);

            let groups = std::mem::take(&mut user.ai_decisions);
            user.ai_decisions = groups
                .into_iter()
                .map(|group| {
                    group
                        .into_iter()
                        .filter(|d| d.date.as_str() < since || d.date.as_str() > until)
                        .collect::<Vec<_>>()
                })
                .filter(|group: &Vec<AIDecision>| !group.is_empty())
                .collect();

            let after = aggregates::count_all_decisions(&user.ai_decisions);
            if after == before {
                continue;
            }

            if after == 0 {
                self.delete_user(&user.user_handle).await?;
                info!(
                    "Deleted user {} (no decisions left after range delete)",
                    user.user_handle
                );
                deleted.push(user.user_handle);
            } else {
                aggregates::recompute(&mut user);
                self.update_user(&user).await?;
                updated.push(user.user_handle);
            }
        }

        Ok((deleted, updated))
    }
}
