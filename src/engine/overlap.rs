use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub fn now_ms() -> Ms {
    chrono::Utc::now().timestamp_millis()
}

/// Reject empty/inverted ranges, then out-of-range or over-long ones.
pub(crate) fn validate_span(start: Ms, end: Ms) -> Result<Span, EngineError> {
    if start >= end {
        return Err(EngineError::InvalidArgument("start time must be before end time"));
    }
    if start < MIN_VALID_TIMESTAMP_MS || end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    let span = Span::new(start, end);
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("slot too long"));
    }
    Ok(span)
}

/// Half-open overlap test against every slot already on the venue.
/// Exact duplicates and nested ranges collide; touching endpoints do not.
pub(crate) fn check_no_overlap(
    index: &SlotIndex,
    venue_id: Ulid,
    span: &Span,
) -> Result<(), EngineError> {
    match index.overlapping(span).next() {
        Some((existing, _)) => Err(EngineError::Overlap {
            venue_id,
            existing: *existing,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: Ms = 3_600_000;
    const BASE: Ms = 1_767_225_600_000; // 2026-01-01T00:00:00Z

    fn index_with(spans: &[(Ms, Ms)]) -> (SlotIndex, Vec<Ulid>) {
        let mut idx = SlotIndex::default();
        let mut ids = Vec::new();
        for &(s, e) in spans {
            let id = Ulid::new();
            idx.insert(id, Span::new(s, e));
            ids.push(id);
        }
        (idx, ids)
    }

    #[test]
    fn validate_span_rejects_inverted_and_empty() {
        assert!(matches!(
            validate_span(BASE + H, BASE),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_span(BASE, BASE),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(validate_span(BASE, BASE + H).unwrap(), Span::new(BASE, BASE + H));
    }

    #[test]
    fn validate_span_limits() {
        assert!(matches!(
            validate_span(0, H),
            Err(EngineError::LimitExceeded(_))
        ));
        assert!(matches!(
            validate_span(BASE, BASE + MAX_SPAN_DURATION_MS + 1),
            Err(EngineError::LimitExceeded(_))
        ));
        assert!(validate_span(BASE, BASE + MAX_SPAN_DURATION_MS).is_ok());
    }

    #[test]
    fn partial_overlap_rejected() {
        let venue = Ulid::new();
        let (idx, ids) = index_with(&[(9 * H, 10 * H)]);
        let err = check_no_overlap(&idx, venue, &Span::new(9 * H + H / 2, 10 * H + H / 2));
        match err {
            Err(EngineError::Overlap { venue_id, existing }) => {
                assert_eq!(venue_id, venue);
                assert_eq!(existing, ids[0]);
            }
            other => panic!("expected overlap, got {other:?}"),
        }
    }

    #[test]
    fn exact_duplicate_and_nested_rejected() {
        let venue = Ulid::new();
        let (idx, _) = index_with(&[(9 * H, 12 * H)]);
        assert!(check_no_overlap(&idx, venue, &Span::new(9 * H, 12 * H)).is_err());
        assert!(check_no_overlap(&idx, venue, &Span::new(10 * H, 11 * H)).is_err());
        assert!(check_no_overlap(&idx, venue, &Span::new(8 * H, 13 * H)).is_err());
    }

    #[test]
    fn touching_endpoints_allowed() {
        let venue = Ulid::new();
        let (idx, _) = index_with(&[(9 * H, 10 * H), (12 * H, 13 * H)]);
        assert!(check_no_overlap(&idx, venue, &Span::new(10 * H, 11 * H)).is_ok());
        assert!(check_no_overlap(&idx, venue, &Span::new(10 * H, 12 * H)).is_ok());
        assert!(check_no_overlap(&idx, venue, &Span::new(8 * H, 9 * H)).is_ok());
    }

    #[test]
    fn overlap_iff_not_disjoint_grid() {
        // Creating B after A succeeds iff A.end <= B.start || B.end <= A.start
        let venue = Ulid::new();
        let a = (4, 8);
        let (idx, _) = index_with(&[a]);
        for b_start in 0..12 {
            for b_end in (b_start + 1)..=12 {
                let disjoint = a.1 <= b_start || b_end <= a.0;
                let result = check_no_overlap(&idx, venue, &Span::new(b_start, b_end));
                assert_eq!(result.is_ok(), disjoint, "B=[{b_start},{b_end})");
            }
        }
    }
}
