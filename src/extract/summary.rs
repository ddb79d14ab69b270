use std::sync::LazyLock;

use regex::Regex;

use crate::core::model::{ExtractedTable, TableSummary};

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digit run regex"));

/// Digit runs of the first title mentioning `term`, joined with spaces.
pub fn extract_term(titles: &[String], term: &str) -> Option<String> {
    let title = titles.iter().find(|t| t.to_lowercase().contains(term))?;
    let digits: Vec<&str> = DIGITS.find_iter(title).map(|m| m.as_str()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits.join(" "))
    }
}

fn mentions(titles: &[String], term: &str) -> bool {
    titles.iter().any(|t| t.to_lowercase().contains(term))
}

/// Account codes and flags read from the titles above one table.
pub fn summarize(page_idx: usize, table: usize, titles: &[String]) -> TableSummary {
    TableSummary {
        page: page_idx + 1,
        table,
        demand_no: extract_term(titles, "demand no"),
        major_head: extract_term(titles, "major head"),
        head_of_account: extract_term(titles, "head of account"),
        detailed_account_no: extract_term(titles, "detailed account no"),
        detailed: mentions(titles, "detailed"),
        abstract_account: mentions(titles, "abstract"),
        filename: None,
    }
}

/// Fills codes a table does not repeat from the tables before it.
///
/// `major_head` falls back to the head of account of the same table before the fill.
pub fn forward_fill(tables: &mut [ExtractedTable]) {
    let mut demand_no: Option<String> = None;
    let mut major_head: Option<String> = None;
    for summary in tables.iter_mut().filter_map(|t| t.summary.as_mut()) {
        if summary.major_head.is_none() {
            summary.major_head = summary.head_of_account.clone();
        }
        match &summary.demand_no {
            Some(value) => demand_no = Some(value.clone()),
            None => summary.demand_no = demand_no.clone(),
        }
        match &summary.major_head {
            Some(value) => major_head = Some(value.clone()),
            None => summary.major_head = major_head.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn titles(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reads_codes_from_titles() {
        let summary = summarize(
            4,
            2,
            &titles(&[
                "DEMAND NO. 12 - Police",
                "DETAILED ACCOUNT No. 2055-00-101",
                "Major Head 2055",
            ]),
        );
        assert_eq!(summary.page, 5);
        assert_eq!(summary.demand_no.as_deref(), Some("12"));
        assert_eq!(summary.detailed_account_no.as_deref(), Some("2055 00 101"));
        assert_eq!(summary.major_head.as_deref(), Some("2055"));
        assert_eq!(summary.head_of_account, None);
        assert!(summary.detailed);
        assert!(!summary.abstract_account);
    }

    #[test]
    fn codes_carry_over_to_later_tables() {
        let table = |summary: TableSummary| ExtractedTable {
            page_idx: 0,
            table_idx: summary.table,
            title: None,
            header: None,
            rows: vec![],
            summary: Some(summary),
        };
        let mut tables = vec![
            table(summarize(0, 1, &titles(&["Demand No 7", "Head of Account 4059"]))),
            table(summarize(0, 2, &titles(&["ABSTRACT ACCOUNT"]))),
        ];

        forward_fill(&mut tables);

        let second = tables[1].summary.clone().unwrap_or_default();
        assert_eq!(second.demand_no.as_deref(), Some("7"));
        assert_eq!(second.major_head.as_deref(), Some("4059"));
    }
}
