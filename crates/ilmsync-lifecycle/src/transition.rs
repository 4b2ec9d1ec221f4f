use ilmsync_common::time::{format_iso_date, parse_iso_date};

use crate::{
    expiration::{format_days_token, parse_days_token},
    spec::TransitionSpec,
    types::Transition,
};

/// Builds the structured transition from the first descriptor, if any.
///
/// `days` wins over `date`. A descriptor where neither parses collapses to
/// no transition instead of failing.
pub fn encode_transition(transitions: &[TransitionSpec]) -> Option<Transition> {
    let spec = transitions.first()?;
    let storage_class = spec.storage_class.clone();

    if let Some(days) = spec.days.as_deref().and_then(parse_days_token) {
        return Some(Transition::Days {
            days,
            storage_class,
        });
    }

    spec.date
        .as_deref()
        .and_then(parse_iso_date)
        .map(|date| Transition::Date {
            date,
            storage_class,
        })
}

pub fn decode_transition(transition: Option<&Transition>) -> Vec<TransitionSpec> {
    let Some(transition) = transition else {
        return Vec::new();
    };

    let spec = match transition {
        Transition::Days {
            days,
            storage_class,
        } => TransitionSpec {
            days: Some(format_days_token(*days)),
            date: None,
            storage_class: storage_class.clone(),
        },
        Transition::Date {
            date,
            storage_class,
        } => TransitionSpec {
            days: None,
            date: Some(format_iso_date(date)),
            storage_class: storage_class.clone(),
        },
    };
    vec![spec]
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{decode_transition, encode_transition};
    use crate::{spec::TransitionSpec, types::Transition};

    fn spec(days: Option<&str>, date: Option<&str>) -> TransitionSpec {
        TransitionSpec {
            days: days.map(str::to_string),
            date: date.map(str::to_string),
            storage_class: "GLACIER".to_string(),
        }
    }

    #[test]
    fn empty_list_has_no_transition() {
        assert_eq!(encode_transition(&[]), None);
        assert!(decode_transition(None).is_empty());
    }

    #[test]
    fn days_take_precedence_over_date() {
        let encoded = encode_transition(&[spec(Some("30d"), Some("2030-01-01"))]);
        assert_eq!(
            encoded,
            Some(Transition::Days {
                days: 30,
                storage_class: "GLACIER".to_string()
            })
        );
    }

    #[test]
    fn falls_back_to_date() {
        let encoded = encode_transition(&[spec(Some("soon"), Some("2030-01-01"))]);
        assert_eq!(
            encoded,
            Some(Transition::Date {
                date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                storage_class: "GLACIER".to_string()
            })
        );
    }

    #[test]
    fn unparseable_descriptor_collapses_to_none() {
        assert_eq!(encode_transition(&[spec(Some("soon"), None)]), None);
        assert_eq!(encode_transition(&[spec(None, None)]), None);
    }

    #[test]
    fn decode_mirrors_encode() {
        for input in [spec(Some("7d"), None), spec(None, Some("2031-06-15"))] {
            let encoded = encode_transition(std::slice::from_ref(&input));
            assert_eq!(decode_transition(encoded.as_ref()), vec![input]);
        }
    }
}
