/// Whether the closed intervals `[start_a, end_a]` and `[start_b, end_b]` meet.
///
/// Both bounds are inclusive: a booking that ends at the instant another
/// begins still conflicts with it.
pub fn overlaps<T: PartialOrd>(start_a: &T, end_a: &T, start_b: &T, end_b: &T) -> bool {
    start_a <= end_b && end_a >= start_b
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_partial_overlap() {
        let (a0, a1) = (ts("2024-01-10T10:00:00Z"), ts("2024-01-10T12:00:00Z"));
        let (b0, b1) = (ts("2024-01-10T11:00:00Z"), ts("2024-01-10T13:00:00Z"));
        assert!(overlaps(&a0, &a1, &b0, &b1));
    }

    #[test]
    fn test_symmetry() {
        let cases = [
            (1, 3, 2, 4),
            (1, 2, 2, 3),
            (1, 2, 3, 4),
            (1, 10, 4, 5),
            (5, 6, 1, 2),
        ];
        for (a0, a1, b0, b1) in cases {
            assert_eq!(
                overlaps(&a0, &a1, &b0, &b1),
                overlaps(&b0, &b1, &a0, &a1),
                "asymmetric for ({a0},{a1}) vs ({b0},{b1})"
            );
        }
    }

    #[test]
    fn test_interval_overlaps_itself() {
        let (t0, t1) = (ts("2024-01-10T10:00:00Z"), ts("2024-01-10T12:00:00Z"));
        assert!(overlaps(&t0, &t1, &t0, &t1));
    }

    #[test]
    fn test_touching_intervals_conflict() {
        let t0 = ts("2024-01-10T10:00:00Z");
        let t1 = ts("2024-01-10T11:00:00Z");
        let t2 = ts("2024-01-10T12:00:00Z");
        assert!(overlaps(&t0, &t1, &t1, &t2));
        assert!(overlaps(&t1, &t2, &t0, &t1));
    }

    #[test]
    fn test_disjoint_intervals_do_not_conflict() {
        let t0 = ts("2024-01-10T10:00:00Z");
        let t1 = ts("2024-01-10T11:00:00Z");
        let t2 = ts("2024-01-10T11:00:01Z");
        let t3 = ts("2024-01-10T12:00:00Z");
        assert!(!overlaps(&t0, &t1, &t2, &t3));
        assert!(!overlaps(&t2, &t3, &t0, &t1));
    }

    #[test]
    fn test_containment() {
        assert!(overlaps(&1, &10, &4, &5));
        assert!(overlaps(&4, &5, &1, &10));
    }
}
