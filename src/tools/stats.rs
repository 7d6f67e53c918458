//! 统计辅助函数

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::QuizResponse;

/// 四舍五入到指定小数位
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// 百分比，分母为 0 时返回 0
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// 某个主题的作答计数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TopicTally {
    pub attempted: usize,
    pub correct: usize,
}

impl TopicTally {
    pub fn record(&mut self, is_correct: bool) {
        self.attempted += 1;
        if is_correct {
            self.correct += 1;
        }
    }

    /// 0.0 ~ 1.0
    pub fn ratio(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.correct as f64 / self.attempted as f64
        }
    }

    pub fn accuracy_pct(&self) -> f64 {
        percentage(self.correct, self.attempted)
    }
}

pub fn tally_by_topic<'a, I>(responses: I) -> BTreeMap<String, TopicTally>
where
    I: IntoIterator<Item = &'a QuizResponse>,
{
    let mut tallies: BTreeMap<String, TopicTally> = BTreeMap::new();
    for response in responses {
        tallies
            .entry(response.topic.clone())
            .or_default()
            .record(response.is_correct);
    }
    tallies
}

/// 连续学习天数
///
/// 从 `today` 开始按日期倒序计数，相邻两个计入日期间隔不超过一天。
pub fn study_streak(responses: &[QuizResponse], today: NaiveDate) -> u32 {
    let dates: BTreeSet<NaiveDate> = responses
        .iter()
        .map(|r| r.timestamp.date_naive())
        .collect();

    let mut streak = 0;
    let mut expected = today;
    for date in dates.into_iter().rev() {
        if (expected - date).num_days() <= 1 {
            streak += 1;
            expected = date;
        } else {
            break;
        }
    }
    streak
}

pub fn distinct_study_days(responses: &[QuizResponse]) -> usize {
    responses
        .iter()
        .map(|r| r.timestamp.date_naive())
        .collect::<BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    fn response_on(day_offset: i64, topic: &str, is_correct: bool) -> QuizResponse {
        let base = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        QuizResponse {
            response_id: format!("r{}", day_offset),
            quiz_id: "q".into(),
            question_id: "x".into(),
            user_answer: "A".into(),
            is_correct,
            time_spent: 60,
            timestamp: base - Duration::days(day_offset),
            topic: topic.into(),
            difficulty: Difficulty::Easy,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[rstest]
    #[case(vec![], 0)]
    #[case(vec![0], 1)]
    #[case(vec![0, 1, 2], 3)]
    #[case(vec![1, 2, 3], 3)]
    #[case(vec![0, 1, 3], 2)]
    #[case(vec![2, 3], 0)]
    #[case(vec![0, 0, 1], 2)]
    fn test_study_streak(#[case] offsets: Vec<i64>, #[case] expected: u32) {
        let responses: Vec<_> = offsets
            .into_iter()
            .map(|d| response_on(d, "algebra", true))
            .collect();
        assert_eq!(study_streak(&responses, today()), expected);
    }

    #[test]
    fn test_tally_by_topic() {
        let responses = vec![
            response_on(0, "algebra", true),
            response_on(0, "algebra", false),
            response_on(1, "geometry", true),
        ];
        let tallies = tally_by_topic(&responses);
        assert_eq!(tallies["algebra"].attempted, 2);
        assert_eq!(tallies["algebra"].accuracy_pct(), 50.0);
        assert_eq!(tallies["geometry"].ratio(), 1.0);
    }

    #[rstest]
    #[case(2, 3, 66.67)]
    #[case(1, 3, 33.33)]
    #[case(0, 0, 0.0)]
    #[case(7, 7, 100.0)]
    fn test_rounded_percentage(#[case] part: usize, #[case] total: usize, #[case] expected: f64) {
        assert_eq!(round_to(percentage(part, total), 2), expected);
    }
}
