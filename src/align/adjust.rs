//! Timing adjustment pass.
//!
//! Transcript windows matched independently per unit can overlap or leave
//! small gaps.  One left-to-right walk over the matched units fixes both:
//!
//! ```text
//! overlap:   [ unit i      ]                 [ unit i  |
//!                   [ unit i+1 ]     ──▶              | unit i+1 ]
//!                                           boundary at overlap midpoint
//!
//! small gap: [ unit i ]  ·  [ unit i+1 ]  ──▶ [ unit i  |  unit i+1 ]
//!                        ≤ gap_fill_secs       boundary at gap midpoint
//! ```
//!
//! Finally the last matched unit is stretched to the end of the audio when
//! it stops within `tail_extend_secs` of it, covering trailing silence the
//! transcriber trimmed.  Unmatched units keep their zero timing and are
//! skipped.
//!
//! Afterwards, for consecutive matched units, `end[i] ≤ start[i+1]` and
//! every duration is non-negative.

use super::timing::UnitTiming;

/// Thresholds for [`adjust_timings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustLimits {
    pub gap_fill_secs: f64,
    pub tail_extend_secs: f64,
}

/// Apply the adjustment pass to `timings` in place.
pub fn adjust_timings(timings: &mut [UnitTiming], total_audio_duration: f64, limits: AdjustLimits) {
    let matched: Vec<usize> = timings
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_matched())
        .map(|(i, _)| i)
        .collect();

    for pair in matched.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let prev_start = timings[prev].start_time;
        let prev_end = timings[prev].end_time;
        let next_start = timings[next].start_time;

        if next_start < prev_end {
            // Never move the boundary before the earlier unit's own start.
            let boundary = ((prev_end + next_start) / 2.0).max(prev_start);
            log::debug!(
                "align: units {} and {} overlap by {:.3}s, boundary at {boundary:.3}",
                timings[prev].unit_index,
                timings[next].unit_index,
                prev_end - next_start
            );
            timings[prev].end_time = boundary;
            timings[next].start_time = boundary;
            if timings[next].end_time < boundary {
                timings[next].end_time = boundary;
            }
        } else {
            let gap = next_start - prev_end;
            if gap > 0.0 && gap <= limits.gap_fill_secs {
                let boundary = prev_end + gap / 2.0;
                timings[prev].end_time = boundary;
                timings[next].start_time = boundary;
            }
        }
    }

    if let Some(&last) = matched.last() {
        let tail = &mut timings[last];
        let distance = (total_audio_duration - tail.end_time).abs();
        if total_audio_duration >= tail.start_time && distance <= limits.tail_extend_secs {
            tail.end_time = total_audio_duration;
        }
    }

    for &i in &matched {
        let t = &mut timings[i];
        t.duration = (t.end_time - t.start_time).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: AdjustLimits = AdjustLimits {
        gap_fill_secs: 0.5,
        tail_extend_secs: 1.0,
    };

    fn timing(index: usize, start: f64, end: f64) -> UnitTiming {
        UnitTiming {
            unit_index: index,
            start_time: start,
            end_time: end,
            duration: end - start,
            confidence: 0.9,
            matched_text: String::new(),
        }
    }

    #[test]
    fn overlap_moves_boundary_to_midpoint() {
        let mut t = vec![timing(0, 0.0, 6.0), timing(1, 4.5, 12.0)];
        adjust_timings(&mut t, 30.0, LIMITS);
        assert_eq!(t[0].end_time, 5.25);
        assert_eq!(t[1].start_time, 5.25);
        assert_eq!(t[0].duration, 5.25);
        assert_eq!(t[1].duration, 6.75);
    }

    #[test]
    fn small_gap_is_split() {
        let mut t = vec![timing(0, 0.0, 5.0), timing(1, 5.4, 9.0)];
        adjust_timings(&mut t, 30.0, LIMITS);
        assert!((t[0].end_time - 5.2).abs() < 1e-9);
        assert!((t[1].start_time - 5.2).abs() < 1e-9);
    }

    #[test]
    fn large_gap_is_kept() {
        let mut t = vec![timing(0, 0.0, 5.0), timing(1, 6.0, 9.0)];
        adjust_timings(&mut t, 30.0, LIMITS);
        assert_eq!(t[0].end_time, 5.0);
        assert_eq!(t[1].start_time, 6.0);
    }

    #[test]
    fn tail_is_extended_to_audio_end() {
        let mut t = vec![timing(0, 0.0, 14.2)];
        adjust_timings(&mut t, 15.0, LIMITS);
        assert_eq!(t[0].end_time, 15.0);
        assert_eq!(t[0].duration, 15.0);
    }

    #[test]
    fn distant_tail_is_left_alone() {
        let mut t = vec![timing(0, 0.0, 10.0)];
        adjust_timings(&mut t, 15.0, LIMITS);
        assert_eq!(t[0].end_time, 10.0);
    }

    #[test]
    fn nested_unit_keeps_non_negative_durations() {
        // Unit 1 matched entirely inside unit 0.
        let mut t = vec![timing(0, 2.0, 10.0), timing(1, 0.5, 1.0)];
        adjust_timings(&mut t, 30.0, LIMITS);
        assert!(t[0].end_time <= t[1].start_time);
        assert!(t.iter().all(|x| x.duration >= 0.0));
        assert!(t.iter().all(|x| x.end_time >= x.start_time));
    }

    #[test]
    fn unmatched_units_are_skipped() {
        let mut t = vec![
            timing(0, 0.0, 6.0),
            UnitTiming::unmatched(1),
            timing(2, 5.0, 12.0),
        ];
        adjust_timings(&mut t, 12.5, LIMITS);

        assert_eq!(t[1], UnitTiming::unmatched(1));
        assert_eq!(t[0].end_time, 5.5);
        assert_eq!(t[2].start_time, 5.5);
        assert_eq!(t[2].end_time, 12.5);
    }

    #[test]
    fn chain_of_overlaps_is_ordered() {
        let mut t = vec![
            timing(0, 0.0, 4.0),
            timing(1, 3.0, 8.0),
            timing(2, 7.0, 11.0),
            timing(3, 10.9, 15.0),
        ];
        adjust_timings(&mut t, 15.0, LIMITS);
        for pair in t.windows(2) {
            assert!(pair[0].end_time <= pair[1].start_time);
        }
        assert_eq!(t[3].end_time, 15.0);
    }
}
