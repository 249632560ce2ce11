use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use recur_core::EngineResult;
use recur_domain::entities::{RecurrenceRule, RecurrenceType};

/// 下次发生日期的纯计算器。
///
/// 所有运算基于公历日历日（NaiveDate），不涉及时刻与时长，
/// 因此夏令时和月长变化不会使预期的日历日漂移。
pub struct OccurrenceCalculator {
    rule: RecurrenceRule,
    /// weekly间隔语义的周纪元。规则自带series_start时采用它，
    /// 否则由调用方通过with_epoch提供序列的首个锚点
    epoch: Option<NaiveDate>,
}

impl OccurrenceCalculator {
    /// 创建计算器，规则不满足结构不变量时报InvalidRule
    pub fn new(rule: &RecurrenceRule) -> EngineResult<Self> {
        rule.validate()?;
        Ok(Self {
            rule: rule.clone(),
            epoch: rule.series_start,
        })
    }

    /// 创建计算器并为缺少series_start的规则补充周纪元。
    /// 纪元必须在序列整个生命周期内保持同一天，否则interval > 1的
    /// weekly节奏会随锚点漂移。
    pub fn with_epoch(rule: &RecurrenceRule, epoch: NaiveDate) -> EngineResult<Self> {
        rule.validate()?;
        Ok(Self {
            rule: rule.clone(),
            epoch: Some(rule.series_start.unwrap_or(epoch)),
        })
    }

    /// 验证循环规则是否有效
    pub fn validate_rule(rule: &RecurrenceRule) -> EngineResult<()> {
        rule.validate()
    }

    /// 从锚点日期计算下一个应该存在实例的日历日。
    /// 返回None表示序列没有后续发生（type为none，或候选日不早于end_date）。
    pub fn next_occurrence(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        self.next_occurrence_from(anchor, self.epoch.unwrap_or(anchor))
    }

    fn next_occurrence_from(&self, anchor: NaiveDate, epoch: NaiveDate) -> Option<NaiveDate> {
        let candidate = match self.rule.rule_type {
            RecurrenceType::None => return None,
            RecurrenceType::Daily => self.next_daily(anchor)?,
            RecurrenceType::Weekly => self.next_weekly(anchor, epoch)?,
            RecurrenceType::Monthly => self.next_monthly(anchor)?,
            RecurrenceType::MonthlyWeekday => self.next_monthly_weekday(anchor)?,
            RecurrenceType::MonthlyLastDay => self.next_monthly_last_day(anchor)?,
        };

        match self.rule.end_date {
            Some(end) if candidate >= end => {
                debug!(
                    "候选日期 {} 不早于终止日期 {}, 序列终止",
                    candidate, end
                );
                None
            }
            _ => Some(candidate),
        }
    }

    /// 从锚点开始连续推算多个发生日期，每个输出作为下一次的锚点。
    /// 纪元缺省时固定为整条链的起始锚点，保证链内周计数一致。
    pub fn upcoming(&self, anchor: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let epoch = self.epoch.unwrap_or(anchor);
        let mut dates = Vec::with_capacity(count);
        let mut cursor = anchor;
        for _ in 0..count {
            match self.next_occurrence_from(cursor, epoch) {
                Some(next) => {
                    dates.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        dates
    }

    fn next_daily(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        anchor.checked_add_signed(Duration::days(i64::from(self.rule.interval)))
    }

    /// 从锚点次日起逐日扫描，命中星期集合且所在周满足间隔对齐的第一天。
    /// 周从固定纪元按整7天计数，保证间隔语义在规则编辑后保持稳定。
    fn next_weekly(&self, anchor: NaiveDate, epoch: NaiveDate) -> Option<NaiveDate> {
        let interval = i64::from(self.rule.interval);

        let mut day = anchor.checked_add_signed(Duration::days(1))?;
        // 最多interval+1周内必然出现一个对齐周
        for _ in 0..(interval * 7 + 7) {
            if self.rule.contains_weekday(day.weekday()) {
                let week_index = (day - epoch).num_days().div_euclid(7);
                if interval == 1 || week_index % interval == 0 {
                    return Some(day);
                }
            }
            day = day.checked_add_signed(Duration::days(1))?;
        }
        None
    }

    /// 目标日号超出结果月份天数时收缩到月末，绝不滚动到下个月
    fn next_monthly(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        let target_day = self
            .rule
            .month_day
            .map(u32::from)
            .unwrap_or_else(|| anchor.day());
        let (year, month) = add_months(anchor, self.rule.interval);
        let day = target_day.min(days_in_month(year, month));
        NaiveDate::from_ymd_opt(year, month, day)
    }

    fn next_monthly_weekday(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        let weekday = *self.rule.weekdays.first()?;
        let week = self.rule.week_of_month?;
        let (year, month) = add_months(anchor, self.rule.interval);
        nth_weekday_of_month(year, month, weekday, week)
    }

    fn next_monthly_last_day(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        let (year, month) = add_months(anchor, self.rule.interval);
        NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))
    }
}

/// 按日历月推进，返回结果的(年, 月)
fn add_months(date: NaiveDate, months: u32) -> (i32, u32) {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

/// 月内第N个指定星期的日期。week为5时取当月最后一个该星期，
/// 即使该星期当月只出现4次也返回第4次（最后一次），不会越界。
fn nth_weekday_of_month(year: i32, month: u32, weekday: u8, week: u8) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let first_dow = first.weekday().num_days_from_sunday() as i64;
    let offset = (i64::from(weekday) - first_dow).rem_euclid(7);
    let first_hit = 1 + offset as u32;
    let month_days = days_in_month(year, month);

    let day = if week >= 5 {
        let mut last = first_hit;
        while last + 7 <= month_days {
            last += 7;
        }
        last
    } else {
        first_hit + 7 * (u32::from(week) - 1)
    };

    // 第1-4个该星期在任何月份都存在（first_hit <= 7）
    NaiveDate::from_ymd_opt(year, month, day)
}
