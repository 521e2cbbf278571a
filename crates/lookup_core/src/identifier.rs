use std::collections::HashSet;

use crate::SubmitError;

const MAX_PREFIX_LEN: usize = 3;
const MAX_NUMBER_LEN: usize = 4;
const MIN_BARE_DIGITS: usize = 2;
const MAX_BARE_DIGITS: usize = MAX_PREFIX_LEN + MAX_NUMBER_LEN;

pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Accepts `LETTERS-DIGITS` and `DIGITS-DIGITS`, with or without the
/// separator, on an already normalized identifier.
///
/// Letter and digit prefixes are 1-3 characters, the serial part 1-4 digits.
pub fn is_valid_identifier(identifier: &str) -> bool {
    if let Some((prefix, number)) = identifier.split_once('-') {
        return (is_letter_prefix(prefix) || is_digit_prefix(prefix)) && is_serial(number);
    }

    let split = identifier
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(identifier.len());
    let (prefix, number) = identifier.split_at(split);
    if prefix.is_empty() {
        // Without a separator a DIGITS-DIGITS plate is just a run of digits.
        (MIN_BARE_DIGITS..=MAX_BARE_DIGITS).contains(&number.len()) && all_digits(number)
    } else {
        is_letter_prefix(prefix) && is_serial(number)
    }
}

/// Normalizes, validates and deduplicates a batch, keeping first-seen order.
///
/// Blank entries are skipped. Any malformed identifier rejects the whole
/// batch so nothing is silently dropped once the job runs.
pub fn prepare_batch<I, S>(raw: I) -> Result<Vec<String>, SubmitError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut batch = Vec::new();
    for entry in raw {
        let identifier = normalize_identifier(entry.as_ref());
        if identifier.is_empty() {
            continue;
        }
        if !is_valid_identifier(&identifier) {
            return Err(SubmitError::MalformedIdentifier { identifier });
        }
        if seen.insert(identifier.clone()) {
            batch.push(identifier);
        }
    }
    if batch.is_empty() {
        return Err(SubmitError::EmptyBatch);
    }
    Ok(batch)
}

fn is_letter_prefix(part: &str) -> bool {
    (1..=MAX_PREFIX_LEN).contains(&part.len()) && part.chars().all(|c| c.is_ascii_uppercase())
}

fn is_digit_prefix(part: &str) -> bool {
    (1..=MAX_PREFIX_LEN).contains(&part.len()) && all_digits(part)
}

fn is_serial(part: &str) -> bool {
    (1..=MAX_NUMBER_LEN).contains(&part.len()) && all_digits(part)
}

fn all_digits(part: &str) -> bool {
    part.chars().all(|c| c.is_ascii_digit())
}
