use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 学员档案
///
/// 由种子数据加载，运行期只通过 `update_user_profile` 修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// 用户唯一标识
    pub user_id: String,
    /// 邮箱（不可修改）
    pub email: String,
    /// 显示名称
    pub name: String,
    /// 备考考试类型
    pub test_type: String,
    /// 目标分数
    pub target_score: u32,
    /// 基线分数
    pub baseline_score: Option<u32>,
    /// 当前水平
    pub current_level: String,
    /// 每周学习小时数
    pub study_hours_per_week: u32,
    /// 考试日期
    pub test_date: Option<NaiveDate>,
    /// 自由格式偏好设置
    #[serde(default)]
    pub preferences: Map<String, Value>,
}

impl User {
    /// 距离考试的天数，考试已过则为负数
    pub fn days_until_test(&self) -> Option<i64> {
        self.test_date
            .map(|date| (date - Utc::now().date_naive()).num_days())
    }

    /// 名字的第一个词，用于问候语
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("there")
    }
}

/// 可更新的档案字段
///
/// `user_id` 与 `email` 不在此列表中。
pub const UPDATABLE_FIELDS: &[&str] = &[
    "name",
    "test_type",
    "target_score",
    "baseline_score",
    "current_level",
    "study_hours_per_week",
    "test_date",
    "preferences",
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(name: &str, test_date: Option<NaiveDate>) -> User {
        User {
            user_id: "u1".into(),
            email: "u1@example.com".into(),
            name: name.into(),
            test_type: "SAT".into(),
            target_score: 1400,
            baseline_score: Some(1100),
            current_level: "beginner".into(),
            study_hours_per_week: 5,
            test_date,
            preferences: Map::new(),
        }
    }

    #[test]
    fn test_days_until_test() {
        let in_ten = Utc::now().date_naive() + Duration::days(10);
        assert_eq!(user("Ann", Some(in_ten)).days_until_test(), Some(10));
        assert_eq!(user("Ann", None).days_until_test(), None);
    }

    #[test]
    fn test_first_name() {
        assert_eq!(user("Ann Lee", None).first_name(), "Ann");
        assert_eq!(user("", None).first_name(), "there");
    }

    #[test]
    fn test_identity_fields_not_updatable() {
        assert!(!UPDATABLE_FIELDS.contains(&"user_id"));
        assert!(!UPDATABLE_FIELDS.contains(&"email"));
    }
}
