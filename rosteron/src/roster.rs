//! Roster data model and roster page parsing

use crate::browser::ResponseEnvelope;
use crate::error::RosterError;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::cell::OnceCell;
use std::fmt;
use std::ops::Deref;

/// One item on the roster
///
/// Data in an `Item` is minimally structured: RosterOn instances format their
/// rows differently, so the detail is kept positionally, exactly as the row
/// presents it. Index-based access into [`Item::detail`] is deployment-specific.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    date: NaiveDate,
    title: String,
    detail: Vec<Option<String>>,
}

impl Item {
    /// Create a new item
    pub fn new(date: NaiveDate, title: impl Into<String>, detail: Vec<Option<String>>) -> Self {
        Self {
            date,
            title: title.into(),
            detail,
        }
    }

    /// The date heading this item was listed under
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The heading text after the date and its separator
    pub fn title(&self) -> &str {
        &self.title
    }

    /// One entry per `<p>` in the row, in order; `None` for an empty cell
    pub fn detail(&self) -> &[Option<String>] {
        &self.detail
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Item (date={}, title={:?}, detail=(", self.date, self.title)?;
        for (i, field) in self.detail.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match field {
                Some(value) => write!(f, "{:?}", value)?,
                None => f.write_str("None")?,
            }
        }
        f.write_str("))>")
    }
}

/// The state of a user's roster at one point in time
///
/// Dereferences to a slice of [`Item`]s in the order the roster page lists
/// them, so it supports `len`, indexing, slicing and iteration directly.
///
/// ```
/// use chrono::{NaiveDate, Utc};
/// use rosteron::{Item, Snapshot};
///
/// let date = NaiveDate::from_ymd_opt(2019, 6, 11).unwrap();
/// let item = Item::new(date, "ABCDE - Melbourne Office", vec![Some("10:30 - 18:06".into())]);
/// let snapshot = Snapshot::new(Utc::now(), None, vec![item.clone()]);
///
/// assert_eq!(snapshot.len(), 1);
/// assert_eq!(snapshot[0], item);
/// assert_eq!(snapshot[..1], [item]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    time: DateTime<Utc>,
    server_time: Option<DateTime<Utc>>,
    items: Vec<Item>,
}

impl Snapshot {
    /// Create a new snapshot
    pub fn new(time: DateTime<Utc>, server_time: Option<DateTime<Utc>>, items: Vec<Item>) -> Self {
        Self {
            time,
            server_time,
            items,
        }
    }

    /// Client time at which the roster request was started
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// The server's own timestamp for the roster response, if it sent one
    pub fn server_time(&self) -> Option<DateTime<Utc>> {
        self.server_time
    }

    /// The roster items
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Consume the snapshot, returning its items
    pub fn into_items(self) -> Vec<Item> {
        self.items
    }
}

impl Deref for Snapshot {
    type Target = [Item];

    fn deref(&self) -> &[Item] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for Snapshot {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Snapshot (time={}, len={})>",
            self.time.to_rfc3339(),
            self.items.len()
        )
    }
}

const PURPOSE: &str = "roster";

/// Parser for the roster list page with cached selectors
///
/// The roster is a jQuery Mobile list view. Divider rows carry the date and
/// title; every other row is one item under the most recent divider:
///
/// ```html
/// <ul data-role="listview">
///     <li data-role="list-divider">Tue 11/06/2019 - ABCDE - Melbourne Office</li>
///     <li><a href="..."><table>
///         <tr><td><p>10:30 - 18:06</p></td><td><p></p></td></tr>
///     </table></a></li>
/// </ul>
/// ```
#[derive(Debug, Default)]
pub(crate) struct RosterParser {
    listview_selector: OnceCell<Selector>,
    table_selector: OnceCell<Selector>,
    cell_selector: OnceCell<Selector>,
    divider_regex: OnceCell<Regex>,
}

impl RosterParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn listview_selector(&self) -> &Selector {
        self.listview_selector
            .get_or_init(|| Selector::parse(r#"[data-role="listview"]"#).unwrap())
    }

    fn table_selector(&self) -> &Selector {
        self.table_selector
            .get_or_init(|| Selector::parse("table").unwrap())
    }

    fn cell_selector(&self) -> &Selector {
        self.cell_selector.get_or_init(|| Selector::parse("p").unwrap())
    }

    /// `Tue 11/06/2019 - ABCDE - Melbourne Office`; the separator and title are
    /// both optional, and trimming may leave a bare trailing `-`
    fn divider_regex(&self) -> &Regex {
        self.divider_regex.get_or_init(|| {
            Regex::new(
                r"(?s)^(?P<date>\S+\s+\d{1,2}/\d{1,2}/\d{4})(?:\s+-(?:\s+(?P<title>.*))?)?$",
            )
            .unwrap()
        })
    }

    /// Parse a roster page into a snapshot
    ///
    /// A page whose list view is present but empty is an empty roster. A
    /// missing list view, or any row that can't be read, fails the whole
    /// call: skipping rows would under-report the roster.
    pub fn parse(&self, envelope: &ResponseEnvelope) -> Result<Snapshot, RosterError> {
        let list = envelope
            .content()
            .select(self.listview_selector())
            .next()
            .ok_or_else(|| RosterError::bad_response(PURPOSE, "no roster list view"))?;

        let mut items = Vec::new();
        let mut heading: Option<(NaiveDate, String)> = None;

        for (row, li) in list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "li")
            .enumerate()
        {
            if li.value().attr("data-role") == Some("list-divider") {
                heading = Some(self.parse_divider(li, row)?);
                continue;
            }

            let (date, title) = heading.as_ref().ok_or_else(|| {
                RosterError::bad_response(PURPOSE, format!("row {} has no date heading", row))
            })?;
            let detail = self.parse_detail(li, row)?;
            items.push(Item::new(*date, title.clone(), detail));
        }

        Ok(Snapshot::new(envelope.time, envelope.server_time, items))
    }

    fn parse_divider(&self, li: ElementRef<'_>, row: usize) -> Result<(NaiveDate, String), RosterError> {
        let text = element_text(li);
        let captures = self.divider_regex().captures(&text).ok_or_else(|| {
            RosterError::bad_response(PURPOSE, format!("row {}: unrecognised heading {:?}", row, text))
        })?;

        let raw_date = &captures["date"];
        let date = NaiveDate::parse_from_str(raw_date, "%a %d/%m/%Y").map_err(|e| {
            RosterError::bad_response(PURPOSE, format!("row {}: bad date {:?}: {}", row, raw_date, e))
        })?;
        let title = captures
            .name("title")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Ok((date, title))
    }

    fn parse_detail(&self, li: ElementRef<'_>, row: usize) -> Result<Vec<Option<String>>, RosterError> {
        let table = li.select(self.table_selector()).next().ok_or_else(|| {
            RosterError::bad_response(PURPOSE, format!("row {} has no detail table", row))
        })?;

        Ok(table
            .select(self.cell_selector())
            .map(|p| {
                let text = element_text(p);
                (!text.is_empty()).then_some(text)
            })
            .collect())
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
