//! Address fragment extraction for Australian street addresses.
//!
//! Search input usually looks like `"123 Example Street, Brisbane QLD 4000"`.
//! The helpers here pull out the house number, street, suburb, and postcode
//! with simple patterns so the synthetic generators can fill in parcel
//! attributes that resemble what the live layer returns.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Leading house number.
static HOUSE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("valid regex"));

/// First run of digits anywhere, for bumping to a neighbouring address.
static ANY_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Street after the house number, up to the first comma.
static STREET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s+([^,]+)").expect("valid regex"));

/// Text after the first comma, up to the next one.
static SUBURB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([^,]+)").expect("valid regex"));

/// Four-digit Australian postcode.
static POSTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid regex"));

/// Trailing state abbreviation and/or postcode on a suburb fragment.
static STATE_POSTCODE_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\s+(?:QLD|NSW|VIC|SA|WA|TAS|NT|ACT))?(?:\s+\d{4})?\s*$")
        .expect("valid regex")
});

/// Fragments recognised in a free-text address. Absent fragments are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    /// Leading house number.
    pub house_number: Option<String>,
    /// Street name and type, e.g. `"Example Street"`.
    pub street: Option<String>,
    /// Suburb without state or postcode.
    pub suburb: Option<String>,
    /// Four-digit postcode.
    pub postcode: Option<String>,
}

impl AddressParts {
    /// Returns `true` if no fragment was recognised.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.house_number.is_none()
            && self.street.is_none()
            && self.suburb.is_none()
            && self.postcode.is_none()
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Strips a trailing state abbreviation and postcode from a suburb.
///
/// `"Brisbane QLD 4000"` becomes `"Brisbane"`.
#[must_use]
pub fn clean_suburb(suburb: &str) -> String {
    STATE_POSTCODE_TAIL_RE
        .replace(suburb.trim(), "")
        .trim()
        .to_string()
}

/// Extracts the recognisable fragments of an address.
///
/// The postcode is the last four-digit group so a four-digit house number
/// is not mistaken for one.
#[must_use]
pub fn extract_parts(address: &str) -> AddressParts {
    let address = address.trim();

    let house_number = HOUSE_NUMBER_RE
        .captures(address)
        .and_then(|c| non_empty(&c[1]));
    let street = STREET_RE.captures(address).and_then(|c| non_empty(&c[1]));
    let suburb = SUBURB_RE
        .captures(address)
        .and_then(|c| non_empty(&clean_suburb(&c[1])));
    let postcode = POSTCODE_RE
        .captures_iter(address)
        .filter(|c| c.get(0).is_some_and(|m| m.start() > 0))
        .last()
        .and_then(|c| non_empty(&c[1]));

    AddressParts {
        house_number,
        street,
        suburb,
        postcode,
    }
}

fn first_attribute(attributes: &BTreeMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| attributes.get(*k).and_then(|v| non_empty(v)))
}

/// Reads address fragments from geocoder candidate attributes, filling any
/// gaps from the candidate's address text.
///
/// Understands both the short keys (`House`, `Street`, `City`, `Postal`)
/// and the World Geocoder's `AddNum` / `StName` + `StType` fields.
#[must_use]
pub fn parts_from_attributes(attributes: &BTreeMap<String, String>, address: &str) -> AddressParts {
    let parsed = extract_parts(address);

    let street = first_attribute(attributes, &["Street"]).or_else(|| {
        let name = first_attribute(attributes, &["StName"])?;
        Some(match first_attribute(attributes, &["StType"]) {
            Some(kind) => format!("{name} {kind}"),
            None => name,
        })
    });

    AddressParts {
        house_number: first_attribute(attributes, &["House", "AddNum"]).or(parsed.house_number),
        street: street.or(parsed.street),
        suburb: first_attribute(attributes, &["City", "Nbrhd"]).or(parsed.suburb),
        postcode: first_attribute(attributes, &["Postal"]).or(parsed.postcode),
    }
}

/// Replaces the first number in an address with that number plus `by`.
///
/// Returns the address unchanged when it has no number, or when the
/// number does not fit in a `u64`.
#[must_use]
pub fn bump_house_number(address: &str, by: u64) -> String {
    ANY_NUMBER_RE
        .find(address)
        .and_then(|m| {
            let bumped = m.as_str().parse::<u64>().ok()?.checked_add(by)?;
            Some(format!(
                "{}{bumped}{}",
                &address[..m.start()],
                &address[m.end()..]
            ))
        })
        .unwrap_or_else(|| address.to_string())
}

/// Splits a street into its base name and the remainder (the street type).
///
/// `"Example Street"` becomes `("Example", Some("Street"))`. The base is
/// what `CORRIDOR_NAME` holds on the parcel layer.
#[must_use]
pub fn split_street(street: &str) -> (String, Option<String>) {
    let street = street.trim();
    match street.split_once(char::is_whitespace) {
        Some((base, rest)) => (base.to_string(), non_empty(rest)),
        None => (street.to_string(), None),
    }
}
