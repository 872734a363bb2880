use kbatch_core::record::PersonRecord;

/// Normalise a record before it is written: both fields trimmed and
/// upper-cased.
pub fn process(record: PersonRecord) -> PersonRecord {
    PersonRecord::new(
        record.first_name.trim().to_uppercase(),
        record.last_name.trim().to_uppercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_cases_and_trims() {
        let out = process(PersonRecord::new(" Jane", "doe "));
        assert_eq!(out, PersonRecord::new("JANE", "DOE"));
    }
}
