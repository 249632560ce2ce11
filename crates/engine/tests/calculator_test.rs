#[cfg(test)]
mod calculator_tests {
    use chrono::NaiveDate;
    use recur_engine::OccurrenceCalculator;
    use recur_testing_utils::RecurrenceRuleBuilder;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_interval_chain() {
        let rule = RecurrenceRuleBuilder::daily().with_interval(3).build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        let first = calc.next_occurrence(date(2024, 1, 1)).unwrap();
        assert_eq!(first, date(2024, 1, 4));

        let second = calc.next_occurrence(first).unwrap();
        assert_eq!(second, date(2024, 1, 7));
    }

    #[test]
    fn test_daily_default_interval() {
        let rule = RecurrenceRuleBuilder::daily().build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        assert_eq!(calc.next_occurrence(date(2024, 2, 28)), Some(date(2024, 2, 29)));
        assert_eq!(calc.next_occurrence(date(2024, 2, 29)), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_weekly_picks_next_listed_weekday() {
        // 2024-01-01 是星期一；weekdays 1=周一 3=周三 5=周五
        let rule = RecurrenceRuleBuilder::weekly(vec![1, 3, 5]).build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        assert_eq!(calc.next_occurrence(date(2024, 1, 1)), Some(date(2024, 1, 3)));
        assert_eq!(calc.next_occurrence(date(2024, 1, 3)), Some(date(2024, 1, 5)));
        // 周五之后回到下周一
        assert_eq!(calc.next_occurrence(date(2024, 1, 5)), Some(date(2024, 1, 8)));
    }

    #[test]
    fn test_weekly_weekend_rule() {
        // 0=周日 6=周六；2024-01-01 是周一，最近的是周六 01-06
        let rule = RecurrenceRuleBuilder::weekly(vec![0, 6]).build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        assert_eq!(calc.next_occurrence(date(2024, 1, 1)), Some(date(2024, 1, 6)));
        assert_eq!(calc.next_occurrence(date(2024, 1, 6)), Some(date(2024, 1, 7)));
    }

    #[test]
    fn test_weekly_biweekly_interval() {
        // 固定序列起点保证隔周节奏稳定
        let rule = RecurrenceRuleBuilder::weekly(vec![1])
            .with_interval(2)
            .with_series_start(date(2024, 1, 1))
            .build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        // 2024-01-01 是周一（第0周），下一个符合的周一在第2周
        assert_eq!(calc.next_occurrence(date(2024, 1, 1)), Some(date(2024, 1, 15)));
        assert_eq!(calc.next_occurrence(date(2024, 1, 15)), Some(date(2024, 1, 29)));
    }

    #[test]
    fn test_weekly_interval_without_series_start() {
        // 规则没有series_start时，upcoming把整条链的纪元固定在起始锚点，
        // 周计数不随每个输出重新归零
        let rule = RecurrenceRuleBuilder::weekly(vec![1, 3])
            .with_interval(2)
            .build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        // 2024-01-01 周一为第0周：周三01-03命中，随后跳过第1周，
        // 落到第2周的周一01-15和周三01-17，再到第4周的01-29
        assert_eq!(
            calc.upcoming(date(2024, 1, 1), 4),
            vec![
                date(2024, 1, 3),
                date(2024, 1, 15),
                date(2024, 1, 17),
                date(2024, 1, 29),
            ]
        );
    }

    #[test]
    fn test_weekly_interval_with_external_epoch() {
        // 调用方补充的纪元在逐次单步推算之间保持节奏稳定
        let rule = RecurrenceRuleBuilder::weekly(vec![1, 3])
            .with_interval(2)
            .build();
        let calc = OccurrenceCalculator::with_epoch(&rule, date(2024, 1, 1)).unwrap();

        assert_eq!(calc.next_occurrence(date(2024, 1, 1)), Some(date(2024, 1, 3)));
        // 没有固定纪元时这里会退化成01-08（每周节奏）
        assert_eq!(calc.next_occurrence(date(2024, 1, 3)), Some(date(2024, 1, 15)));
        assert_eq!(calc.next_occurrence(date(2024, 1, 15)), Some(date(2024, 1, 17)));
        assert_eq!(calc.next_occurrence(date(2024, 1, 17)), Some(date(2024, 1, 29)));
    }

    #[test]
    fn test_series_start_overrides_external_epoch() {
        // 规则自带series_start时以它为准，外部纪元只是缺省补充
        let rule = RecurrenceRuleBuilder::weekly(vec![1])
            .with_interval(2)
            .with_series_start(date(2024, 1, 1))
            .build();
        let calc = OccurrenceCalculator::with_epoch(&rule, date(2024, 1, 8)).unwrap();

        assert_eq!(calc.next_occurrence(date(2024, 1, 1)), Some(date(2024, 1, 15)));
    }

    #[test]
    fn test_monthly_day_clamps_to_month_end() {
        let rule = RecurrenceRuleBuilder::monthly().with_month_day(31).build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        // 4月只有30天，截断到月末
        assert_eq!(calc.next_occurrence(date(2024, 3, 31)), Some(date(2024, 4, 30)));
        // 2月（闰年）截断到29
        assert_eq!(calc.next_occurrence(date(2024, 1, 31)), Some(date(2024, 2, 29)));
        // 非闰年2月截断到28
        assert_eq!(calc.next_occurrence(date(2025, 1, 31)), Some(date(2025, 2, 28)));
    }

    #[test]
    fn test_monthly_preserves_anchor_day() {
        let rule = RecurrenceRuleBuilder::monthly().build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        assert_eq!(calc.next_occurrence(date(2024, 1, 15)), Some(date(2024, 2, 15)));
    }

    #[test]
    fn test_monthly_interval_crosses_year() {
        let rule = RecurrenceRuleBuilder::monthly().with_interval(3).build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        assert_eq!(calc.next_occurrence(date(2024, 11, 10)), Some(date(2025, 2, 10)));
    }

    #[test]
    fn test_monthly_weekday_second_tuesday() {
        // 2=周二，第2周
        let rule = RecurrenceRuleBuilder::monthly_weekday(2, 2).build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        // 2024年2月第2个周二是02-13
        assert_eq!(calc.next_occurrence(date(2024, 1, 9)), Some(date(2024, 2, 13)));
    }

    #[test]
    fn test_monthly_weekday_week_five_means_last() {
        // 5=最后一个；2024年2月只有4个周五，取第4个 02-23
        let rule = RecurrenceRuleBuilder::monthly_weekday(5, 5).build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        assert_eq!(calc.next_occurrence(date(2024, 1, 26)), Some(date(2024, 2, 23)));

        // 2024年2月有5个周四，最后一个是闰日 02-29
        let rule = RecurrenceRuleBuilder::monthly_weekday(4, 5).build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        assert_eq!(calc.next_occurrence(date(2024, 1, 25)), Some(date(2024, 2, 29)));
    }

    #[test]
    fn test_monthly_last_day() {
        let rule = RecurrenceRuleBuilder::monthly_last_day().build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        assert_eq!(calc.next_occurrence(date(2024, 1, 31)), Some(date(2024, 2, 29)));
        assert_eq!(calc.next_occurrence(date(2024, 2, 29)), Some(date(2024, 3, 31)));
    }

    #[test]
    fn test_end_date_terminates_series() {
        let rule = RecurrenceRuleBuilder::daily()
            .with_end_date(date(2024, 1, 5))
            .build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        // 01-04 < end_date，仍然生成
        assert_eq!(calc.next_occurrence(date(2024, 1, 3)), Some(date(2024, 1, 4)));
        // 01-05 >= end_date，序列终止
        assert_eq!(calc.next_occurrence(date(2024, 1, 4)), None);
    }

    #[test]
    fn test_upcoming_is_strictly_increasing() {
        let rule = RecurrenceRuleBuilder::weekly(vec![1, 3, 5]).build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        let dates = calc.upcoming(date(2024, 1, 1), 10);
        assert_eq!(dates.len(), 10);
        for pair in dates.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_completion_anchor_shifts_cadence() {
        // 浮动节奏：锚点是完成日而非原定到期日
        let rule = RecurrenceRuleBuilder::monthly().completion_based().build();
        let calc = OccurrenceCalculator::new(&rule).unwrap();

        // 原定02-01，实际02-10完成：下一个从完成日推
        assert_eq!(calc.next_occurrence(date(2024, 2, 10)), Some(date(2024, 3, 10)));
    }

    #[test]
    fn test_invalid_rules_rejected() {
        // weekly 无 weekdays
        let rule = RecurrenceRuleBuilder::weekly(vec![]).build();
        assert!(OccurrenceCalculator::new(&rule).is_err());

        // weekday 超出 0..=6
        let rule = RecurrenceRuleBuilder::weekly(vec![7]).build();
        assert!(OccurrenceCalculator::new(&rule).is_err());

        // interval 为 0
        let rule = RecurrenceRuleBuilder::daily().with_interval(0).build();
        assert!(OccurrenceCalculator::new(&rule).is_err());

        // monthly_weekday 缺少 week_of_month
        let rule = RecurrenceRuleBuilder::monthly_weekday(2, 2);
        let mut rule = rule.build();
        rule.week_of_month = None;
        assert!(OccurrenceCalculator::new(&rule).is_err());

        // month_day 超出 1..=31
        let rule = RecurrenceRuleBuilder::monthly().with_month_day(32).build();
        assert!(OccurrenceCalculator::new(&rule).is_err());
    }
}
