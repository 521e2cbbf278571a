use chrono::{DateTime, Utc};
use lookup_core::{FailureReason, VehicleRecord};
use lookup_logging::lookup_warn;
use scraper::{ElementRef, Html, Selector};

const DETAILS_TABLE: &str = "table.table.table-striped.table-condensed";
const REPORT_DATE_LABEL: &str = "Report Date";
const REGISTRATION_LABEL: &str = "Vehicle Registration Number";

/// The lookup form field; seeing it again means the service re-rendered the
/// search page instead of a result.
const LOOKUP_FORM: &str = "input[name=vehicleRegistrationNumber]";

const SESSION_MARKERS: &[&str] = &[
    "session has expired",
    "session expired",
    "session timed out",
    "please login",
    "please log in",
];

const NOT_FOUND_MARKERS: &[&str] = &[
    "no record",
    "not found",
    "no vehicle",
    "invalid vehicle",
];

/// Turns a decoded result page into a record, or classifies why it is not one.
///
/// - a details table with at least one known row is a record
/// - a login form or an expiry message means the session was rejected
/// - a re-rendered search form or a "no record" message means not found
/// - anything else is a parse error
pub fn parse_vehicle_page(
    html: &str,
    identifier: &str,
    retrieved_at: DateTime<Utc>,
) -> Result<VehicleRecord, FailureReason> {
    if html.trim().is_empty() {
        return Err(FailureReason::parse("empty response body"));
    }

    let doc = Html::parse_document(html);
    let mut record = VehicleRecord::empty(identifier, retrieved_at);

    let recognised_rows = match doc.select(&selector(DETAILS_TABLE)?).next() {
        Some(table) => Some(fill_from_table(table, &mut record)?),
        None => None,
    };

    if recognised_rows.is_some_and(|rows| rows > 0) {
        let labels = selector("label")?;
        record.report_date = labelled_value(&doc, &labels, REPORT_DATE_LABEL).unwrap_or_default();
        if let Some(registration) = labelled_value(&doc, &labels, REGISTRATION_LABEL) {
            if !registration.eq_ignore_ascii_case(identifier) {
                lookup_warn!(
                    "Vehicle number mismatch: requested {}, got {}",
                    identifier,
                    registration
                );
            }
        }
        return Ok(record);
    }

    let text = collapse(doc.root_element().text()).to_lowercase();
    let has_password_field = doc
        .select(&selector("input[type=password]")?)
        .next()
        .is_some();
    if has_password_field || SESSION_MARKERS.iter().any(|m| text.contains(m)) {
        return Err(FailureReason::SessionInvalid);
    }

    if recognised_rows == Some(0) {
        return Err(FailureReason::parse("details table has no recognised rows"));
    }

    let has_lookup_form = doc.select(&selector(LOOKUP_FORM)?).next().is_some();
    if has_lookup_form || NOT_FOUND_MARKERS.iter().any(|m| text.contains(m)) {
        return Err(FailureReason::NotFound);
    }

    Err(FailureReason::parse("unrecognised page layout"))
}

fn selector(css: &str) -> Result<Selector, FailureReason> {
    Selector::parse(css)
        .map_err(|err| FailureReason::internal(format!("invalid selector {css}: {err}")))
}

/// Rows carry the label in the first cell and the value in the third.
fn fill_from_table(table: ElementRef, record: &mut VehicleRecord) -> Result<usize, FailureReason> {
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let mut recognised = 0;
    for row in table.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 3 {
            continue;
        }
        let label = collapse(cells[0].text()).to_lowercase();
        let value = collapse(cells[2].text());
        if assign_field(record, &label, value) {
            recognised += 1;
        }
    }
    Ok(recognised)
}

fn assign_field(record: &mut VehicleRecord, label: &str, value: String) -> bool {
    let slot = if label.contains("name of the absolute ownership") || label.contains("mortgage if any")
    {
        &mut record.name_of_ownership
    } else if label.contains("engine number") {
        &mut record.engine_number
    } else if label.contains("vehicle class") {
        &mut record.vehicle_class
    } else if label.contains("conditions and notes") {
        &mut record.conditions_and_notes
    } else if label.contains("make") && !label.contains("year") {
        &mut record.make
    } else if label.contains("model") {
        &mut record.model
    } else if label.contains("year of manufacture") {
        &mut record.year_of_manufacture
    } else {
        return false;
    };
    *slot = value;
    true
}

/// Finds `<label>Name :</label> value` and returns the text after the colon
/// in the label's parent element.
fn labelled_value(doc: &Html, labels: &Selector, name: &str) -> Option<String> {
    let label = doc
        .select(labels)
        .find(|el| collapse(el.text()).starts_with(name))?;
    let parent = label.parent().and_then(ElementRef::wrap)?;
    let text = collapse(parent.text());
    let (_, rest) = text.split_once(name)?;
    let value = rest.trim_start().strip_prefix(':')?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
